//! Upload progress channel and its bounded log.
//!
//! # Design
//! - The backend pushes plain-text lines on `/ws/{client_id}`; each becomes a
//!   typed [`ProgressFrame`].
//! - Nothing is sent to the server after the handshake.
//! - The log keeps at most `capacity` lines; the oldest line is evicted first
//!   and evictions are counted.

use std::collections::VecDeque;
use std::time::Duration;

use cloudgallery_api_models::ProgressFrame;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, trace};
use url::Url;

use crate::error::{ClientError, ClientResult};
use crate::subscription::Subscription;

const FRAME_BUFFER: usize = 64;

/// Bounded, append-only list of progress lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressLog {
    lines: VecDeque<String>,
    capacity: usize,
    evicted: u64,
}

impl ProgressLog {
    /// Empty log holding at most `capacity` lines (minimum one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: VecDeque::with_capacity(capacity.min(FRAME_BUFFER)),
            capacity,
            evicted: 0,
        }
    }

    /// Append a line, evicting the oldest when full.
    pub fn push(&mut self, line: impl Into<String>) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
            self.evicted += 1;
        }
        self.lines.push_back(line.into());
    }

    /// Retained lines, oldest first.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    /// Retained lines as an owned list.
    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        self.lines.iter().cloned().collect()
    }

    /// Most recent line.
    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.lines.back().map(String::as_str)
    }

    /// Number of retained lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether no lines are retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Maximum number of retained lines.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Lines dropped since creation.
    #[must_use]
    pub const fn evicted(&self) -> u64 {
        self.evicted
    }

    /// Remove every line; the eviction counter is kept.
    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

/// Inbound progress stream for one upload session.
#[derive(Debug)]
pub struct ProgressChannel {
    frames: mpsc::Receiver<ProgressFrame>,
    reader: Subscription,
}

impl ProgressChannel {
    /// Connect, giving up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Channel`] when the handshake fails or times out.
    pub async fn connect(url: &Url, timeout: Duration) -> ClientResult<Self> {
        let (stream, _) = tokio::time::timeout(timeout, connect_async(url.as_str()))
            .await
            .map_err(|_| {
                ClientError::Channel(format!("timed out connecting to {url}"))
            })?
            .map_err(|err| ClientError::Channel(format!("{url}: {err}")))?;
        debug!(%url, "progress channel connected");

        let (sender, frames) = mpsc::channel(FRAME_BUFFER);
        let reader = Subscription::spawn("progress-reader", async move {
            let mut stream = stream;
            while let Some(message) = stream.next().await {
                match message {
                    Ok(Message::Text(text)) => {
                        if sender.send(ProgressFrame::from_text(&text)).await.is_err() {
                            break;
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(other) => trace!(kind = ?other, "ignoring non-text frame"),
                    Err(err) => {
                        debug!(error = %err, "progress channel read failed");
                        break;
                    }
                }
            }
            debug!("progress channel closed");
        });
        Ok(Self { frames, reader })
    }

    /// Next frame; `None` once the server closed the channel.
    pub async fn recv(&mut self) -> Option<ProgressFrame> {
        self.frames.recv().await
    }

    /// Frame already received, if any.
    pub fn try_recv(&mut self) -> Option<ProgressFrame> {
        self.frames.try_recv().ok()
    }

    /// Whether the reader task is still running.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.reader.is_active()
    }

    /// Tear the connection down.
    pub fn close(mut self) {
        self.reader.unsubscribe();
    }
}
