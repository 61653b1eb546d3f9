use std::{io, path::PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or reserved input, e.g. an invalid regex prefix.
    #[error("{0}")]
    Validation(String),
    /// A configured limit would be exceeded.
    #[error("{0}")]
    Configuration(String),
    #[error("{0}")]
    NotFound(String),
    /// The author lacks the permission a command requires.
    #[error("You are not allowed to use this command.")]
    Forbidden,
    #[error("There is no entry called `{0}`.")]
    KeyNotFound(String),
    /// Writing or renaming the backing file failed. The in-memory state is
    /// ahead of the file on disk when this is returned.
    #[error("Failed to persist {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to load {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether the message can be shown to the user who invoked the command.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::Configuration(_)
                | Self::NotFound(_)
                | Self::Forbidden
                | Self::KeyNotFound(_)
        )
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_recoverable_errors_are_user_facing() {
        assert!(Error::Validation("bad".into()).is_user_facing());
        assert!(Error::Configuration("too many".into()).is_user_facing());
        assert!(Error::NotFound("gone".into()).is_user_facing());
        assert!(Error::KeyNotFound("a".into()).is_user_facing());
        assert!(Error::Forbidden.is_user_facing());

        let persistence = Error::Persistence {
            path: PathBuf::from("prefixes.json"),
            source: io::Error::new(io::ErrorKind::Other, "disk full"),
        };
        assert!(!persistence.is_user_facing());
        assert_eq!(
            persistence.to_string(),
            "Failed to persist prefixes.json: disk full"
        );
    }
}
