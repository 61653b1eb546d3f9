use crate::error::{Error, Result};
use ahash::AHasher;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::{
    collections::HashMap,
    hash::BuildHasherDefault,
    io::{self, Write},
    path::{Path, PathBuf},
};
use tokio::{
    sync::{Mutex, RwLock},
    task,
};
use tracing::{debug, error, warn};

type Map = HashMap<String, Value, BuildHasherDefault<AHasher>>;

/// A JSON object on disk, held fully in memory.
///
/// Every mutation rewrites the whole file through a temporary file that is
/// renamed over the canonical path, so readers of the file only ever see a
/// complete document.
pub struct FlatStore {
    path: PathBuf,
    data: RwLock<Map>,
    // Held for the whole of a mutation, including the disk write.
    writer: Mutex<()>,
}

impl FlatStore {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let data = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| Error::Load {
                path: path.clone(),
                source: io::Error::new(io::ErrorKind::InvalidData, e),
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no store file yet, starting empty");
                Map::default()
            }
            Err(source) => return Err(Error::Load { path, source }),
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
            writer: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads `key` as `T`. A stored value of the wrong shape reads as absent.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.data.read().await.get(key).cloned()?;

        match serde_json::from_value(value) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, path = %self.path.display(), error = %e, "ignoring malformed store value");
                None
            }
        }
    }

    pub async fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).await.unwrap_or(default)
    }

    pub async fn put<T: Serialize + ?Sized>(&self, key: impl Into<String>, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        let _guard = self.writer.lock().await;

        let snapshot = {
            let mut data = self.data.write().await;
            data.insert(key.into(), value);
            serde_json::to_vec(&*data)?
        };

        self.persist(snapshot).await
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        let _guard = self.writer.lock().await;

        let snapshot = {
            let mut data = self.data.write().await;
            if data.remove(key).is_none() {
                return Err(Error::KeyNotFound(key.to_string()));
            }
            serde_json::to_vec(&*data)?
        };

        self.persist(snapshot).await
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.data.read().await.contains_key(key)
    }

    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.data.read().await.is_empty()
    }

    pub async fn keys(&self) -> Vec<String> {
        self.data.read().await.keys().cloned().collect()
    }

    /// Snapshot of every `(key, value)` pair.
    pub async fn entries(&self) -> Vec<(String, Value)> {
        self.data
            .read()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    async fn persist(&self, snapshot: Vec<u8>) -> Result<()> {
        let path = self.path.clone();

        let written = task::spawn_blocking(move || write_atomic(&path, &snapshot))
            .await
            .unwrap_or_else(|e| Err(io::Error::new(io::ErrorKind::Other, e)));

        written.map_err(|source| {
            error!(
                path = %self.path.display(),
                error = %source,
                "store write failed, memory is ahead of disk"
            );
            Error::Persistence {
                path: self.path.clone(),
                source,
            }
        })
    }
}

fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut temp = tempfile::Builder::new()
        .prefix(&format!(".{}.", name))
        .suffix(".tmp")
        .tempfile_in(dir)?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}
