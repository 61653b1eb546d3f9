use serenity::model::id::ChannelId;
use std::{collections::HashMap, time::Duration};
use tokio::{sync::Mutex, time::Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockdownStatus {
    Open,
    Locked { remaining: Duration },
}

/// Channels where commands are temporarily limited to moderators.
pub struct Lockdown {
    channels: Mutex<HashMap<ChannelId, Instant>>,
    duration: Duration,
}

impl Lockdown {
    pub fn new(duration: Duration) -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
            duration,
        }
    }

    /// Turns the lockdown on or off, returning whether it is now on.
    pub async fn toggle(&self, channel_id: ChannelId) -> bool {
        let mut channels = self.channels.lock().await;

        if channels.remove(&channel_id).is_some() {
            false
        } else {
            channels.insert(channel_id, Instant::now());
            true
        }
    }

    /// Expired lockdowns are lifted as a side effect.
    pub async fn check(&self, channel_id: ChannelId) -> LockdownStatus {
        let mut channels = self.channels.lock().await;

        let started = match channels.get(&channel_id) {
            Some(started) => *started,
            None => return LockdownStatus::Open,
        };

        let elapsed = started.elapsed();
        if elapsed > self.duration {
            channels.remove(&channel_id);
            LockdownStatus::Open
        } else {
            LockdownStatus::Locked {
                remaining: self.duration - elapsed,
            }
        }
    }
}
