//! Interactive shell sessions.
//!
//! A session owns one channel. Its author's backtick-quoted messages are fed
//! in through an mpsc channel and evaluated one at a time; a session that
//! sees no input for its idle timeout closes itself.

use serenity::{
    async_trait,
    model::id::{ChannelId, UserId},
};
use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};
use tokio::{
    sync::{mpsc, Mutex},
    time::timeout,
};
use tracing::{debug, info};

const INPUT_BUFFER: usize = 16;

/// A message to post outside of a command reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outgoing {
    pub channel_id: ChannelId,
    pub content: String,
}

#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate(&self, code: &str) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Exited,
    TimedOut,
    Disconnected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    AwaitingInput,
    Executing(String),
    Closed(CloseReason),
}

pub struct Session<E> {
    channel_id: ChannelId,
    state: SessionState,
    inputs: mpsc::Receiver<String>,
    outbound: mpsc::UnboundedSender<Outgoing>,
    idle_timeout: Duration,
    evaluator: E,
}

impl<E: Evaluator> Session<E> {
    pub fn new(
        channel_id: ChannelId,
        inputs: mpsc::Receiver<String>,
        outbound: mpsc::UnboundedSender<Outgoing>,
        idle_timeout: Duration,
        evaluator: E,
    ) -> Self {
        Self {
            channel_id,
            state: SessionState::AwaitingInput,
            inputs,
            outbound,
            idle_timeout,
            evaluator,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Performs one transition.
    pub async fn step(&mut self) -> &SessionState {
        let state = std::mem::replace(&mut self.state, SessionState::AwaitingInput);

        self.state = match state {
            SessionState::AwaitingInput => {
                match timeout(self.idle_timeout, self.inputs.recv()).await {
                    Err(_) => SessionState::Closed(CloseReason::TimedOut),
                    Ok(None) => SessionState::Closed(CloseReason::Disconnected),
                    Ok(Some(raw)) => {
                        let code = cleanup_code(&raw);
                        if is_exit(&code) {
                            SessionState::Closed(CloseReason::Exited)
                        } else {
                            SessionState::Executing(code)
                        }
                    }
                }
            }
            SessionState::Executing(code) => {
                debug!(channel = self.channel_id.0, %code, "evaluating shell input");
                let output = self.evaluator.evaluate(&code).await;
                if !output.is_empty() {
                    self.post(output);
                }
                SessionState::AwaitingInput
            }
            closed @ SessionState::Closed(_) => closed,
        };

        &self.state
    }

    /// Drives the session until it closes.
    pub async fn run(mut self) -> CloseReason {
        loop {
            if let SessionState::Closed(reason) = self.step().await {
                let reason = *reason;
                info!(channel = self.channel_id.0, ?reason, "shell session closed");

                let notice = match reason {
                    CloseReason::Exited => "Exiting shell.".to_string(),
                    CloseReason::TimedOut => format!(
                        "Shell closed after {} seconds without input.",
                        self.idle_timeout.as_secs()
                    ),
                    CloseReason::Disconnected => "Shell closed.".to_string(),
                };
                self.post(notice);

                return reason;
            }
        }
    }

    fn post(&self, content: String) {
        // The posting task only goes away on shutdown.
        let _ = self.outbound.send(Outgoing {
            channel_id: self.channel_id,
            content,
        });
    }
}

/// Strips a surrounding code block, or surrounding backticks and spaces.
pub fn cleanup_code(content: &str) -> String {
    if content.len() >= 6 && content.starts_with("```") && content.ends_with("```") {
        let lines = content.split('\n').collect::<Vec<_>>();
        return lines
            .get(1..lines.len() - 1)
            .unwrap_or_default()
            .join("\n");
    }

    content
        .trim_matches(|c| c == '`' || c == ' ' || c == '\n')
        .to_string()
}

fn is_exit(code: &str) -> bool {
    matches!(code, "exit()" | "exit" | "quit")
}

struct SessionHandle {
    id: u64,
    author_id: UserId,
    inputs: mpsc::Sender<String>,
}

/// Open sessions, at most one per channel.
#[derive(Default)]
pub struct Sessions {
    open: Mutex<HashMap<ChannelId, SessionHandle>>,
    next_id: AtomicU64,
}

impl Sessions {
    /// Registers a session, or returns `None` if the channel already has one.
    /// The returned ID is what [`Sessions::close`] expects.
    pub async fn open(
        &self,
        channel_id: ChannelId,
        author_id: UserId,
    ) -> Option<(u64, mpsc::Receiver<String>)> {
        let mut open = self.open.lock().await;
        if open.contains_key(&channel_id) {
            return None;
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (inputs, receiver) = mpsc::channel(INPUT_BUFFER);
        open.insert(
            channel_id,
            SessionHandle {
                id,
                author_id,
                inputs,
            },
        );

        Some((id, receiver))
    }

    /// Unregisters session `id`. A newer session in the channel is left alone.
    pub async fn close(&self, channel_id: ChannelId, id: u64) {
        let mut open = self.open.lock().await;

        if open.get(&channel_id).map(|handle| handle.id) == Some(id) {
            open.remove(&channel_id);
        }
    }

    pub async fn is_open(&self, channel_id: ChannelId) -> bool {
        self.open.lock().await.contains_key(&channel_id)
    }

    /// Hands a message to the channel's session if it belongs there.
    pub async fn forward(&self, channel_id: ChannelId, author_id: UserId, content: &str) -> bool {
        if !content.starts_with('`') {
            return false;
        }

        let (id, inputs) = match self.open.lock().await.get(&channel_id) {
            Some(handle) if handle.author_id == author_id => (handle.id, handle.inputs.clone()),
            _ => return false,
        };

        if inputs.send(content.to_string()).await.is_err() {
            self.close(channel_id, id).await;
            return false;
        }

        true
    }
}
