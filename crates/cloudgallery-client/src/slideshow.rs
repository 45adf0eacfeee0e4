//! Slideshow state machine and its autoplay driver.
//!
//! # Design
//! - [`Slideshow`] is plain data; every transition is a method call so the
//!   index arithmetic is tested without timers.
//! - `epoch` increments whenever the autoplay countdown must restart: on any
//!   index change and when playback resumes.
//! - [`SlideshowPlayer`] owns the timer task through a [`Subscription`], so
//!   dropping the player stops autoplay.

use std::time::Duration;

use cloudgallery_api_models::ImageRecord;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, sleep_until};
use tracing::debug;

use crate::error::{ClientError, ClientResult};
use crate::subscription::Subscription;

const COMMAND_BUFFER: usize = 16;

/// Playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    /// Advancing automatically.
    Playing,
    /// Waiting for manual navigation.
    Paused,
}

/// Input accepted by the slideshow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideshowCommand {
    /// Show the next image.
    Next,
    /// Show the previous image.
    Prev,
    /// Flip between playing and paused.
    Toggle,
    /// Leave the slideshow.
    Close,
}

impl SlideshowCommand {
    /// Map a key name to a command.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "ArrowRight" => Some(Self::Next),
            "ArrowLeft" => Some(Self::Prev),
            " " | "Space" | "Spacebar" => Some(Self::Toggle),
            "Escape" | "Esc" => Some(Self::Close),
            _ => None,
        }
    }
}

/// Text shown under the current image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caption {
    /// Description, or the filename when there is none.
    pub title: String,
    /// Capture date (`YYYY-MM-DD`) or `unknown`.
    pub date: String,
    /// Position as `i / n`, one-based.
    pub counter: String,
}

/// Full-screen viewer over a fixed image list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slideshow {
    images: Vec<ImageRecord>,
    index: usize,
    state: PlayState,
    closed: bool,
    epoch: u64,
}

impl Slideshow {
    /// Start playing at `start` (wrapped into range); `None` for an empty list.
    #[must_use]
    pub fn new(images: Vec<ImageRecord>, start: usize) -> Option<Self> {
        if images.is_empty() {
            return None;
        }
        let index = start % images.len();
        Some(Self {
            images,
            index,
            state: PlayState::Playing,
            closed: false,
            epoch: 0,
        })
    }

    /// Images in display order.
    #[must_use]
    pub fn images(&self) -> &[ImageRecord] {
        &self.images
    }

    /// Zero-based index of the current image.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Image currently shown.
    #[must_use]
    pub fn current(&self) -> &ImageRecord {
        &self.images[self.index]
    }

    /// Playback state.
    #[must_use]
    pub const fn state(&self) -> PlayState {
        self.state
    }

    /// Whether autoplay is active.
    #[must_use]
    pub const fn is_playing(&self) -> bool {
        matches!(self.state, PlayState::Playing) && !self.closed
    }

    /// Whether the overlay was dismissed.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Countdown generation.
    #[must_use]
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Advance with wrap-around.
    pub fn next(&mut self) {
        if self.closed {
            return;
        }
        self.index = (self.index + 1) % self.images.len();
        self.epoch += 1;
    }

    /// Retreat with wrap-around.
    pub fn prev(&mut self) {
        if self.closed {
            return;
        }
        let len = self.images.len();
        self.index = (self.index + len - 1) % len;
        self.epoch += 1;
    }

    /// Flip playing and paused.
    pub fn toggle(&mut self) {
        if self.closed {
            return;
        }
        self.state = match self.state {
            PlayState::Playing => PlayState::Paused,
            PlayState::Paused => {
                self.epoch += 1;
                PlayState::Playing
            }
        };
    }

    /// Dismiss the overlay; further transitions are ignored.
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Timer expiry: advance only while playing.
    pub fn tick(&mut self) {
        if self.is_playing() {
            self.next();
        }
    }

    /// Apply a command.
    pub fn apply(&mut self, command: SlideshowCommand) {
        match command {
            SlideshowCommand::Next => self.next(),
            SlideshowCommand::Prev => self.prev(),
            SlideshowCommand::Toggle => self.toggle(),
            SlideshowCommand::Close => self.close(),
        }
    }

    /// Apply the command bound to `key`; returns whether the key was handled.
    pub fn handle_key(&mut self, key: &str) -> bool {
        SlideshowCommand::from_key(key).is_some_and(|command| {
            self.apply(command);
            true
        })
    }

    /// Caption for the current image.
    #[must_use]
    pub fn caption(&self) -> Caption {
        let image = self.current();
        Caption {
            title: image.display_title().to_string(),
            date: image
                .capture_date
                .map_or_else(|| "unknown".to_string(), |date| date.format("%Y-%m-%d").to_string()),
            counter: format!("{} / {}", self.index + 1, self.images.len()),
        }
    }
}

/// Autoplay driver running a [`Slideshow`] on a tokio task.
#[derive(Debug)]
pub struct SlideshowPlayer {
    commands: mpsc::Sender<SlideshowCommand>,
    state: watch::Receiver<Slideshow>,
    task: Subscription,
}

impl SlideshowPlayer {
    /// Spawn the driver; the first advance happens after `interval`.
    #[must_use]
    pub fn start(slideshow: Slideshow, interval: Duration) -> Self {
        let (commands, inbox) = mpsc::channel(COMMAND_BUFFER);
        let (publisher, state) = watch::channel(slideshow.clone());
        let task = Subscription::spawn(
            "slideshow-autoplay",
            drive(slideshow, interval, inbox, publisher),
        );
        Self {
            commands,
            state,
            task,
        }
    }

    /// Send a command to the driver.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Channel`] once the slideshow has closed.
    pub async fn send(&self, command: SlideshowCommand) -> ClientResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ClientError::Channel("slideshow has closed".to_string()))
    }

    /// Latest published state.
    #[must_use]
    pub fn snapshot(&self) -> Slideshow {
        self.state.borrow().clone()
    }

    /// Observe state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Slideshow> {
        self.state.clone()
    }

    /// Whether the driver task is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.is_active()
    }

    /// Stop the driver immediately.
    pub fn close(mut self) {
        self.task.unsubscribe();
    }
}

async fn drive(
    mut show: Slideshow,
    interval: Duration,
    mut inbox: mpsc::Receiver<SlideshowCommand>,
    publisher: watch::Sender<Slideshow>,
) {
    let mut epoch = show.epoch();
    let mut deadline = Instant::now() + interval;
    while !show.is_closed() {
        tokio::select! {
            command = inbox.recv() => match command {
                Some(command) => show.apply(command),
                None => break,
            },
            () = sleep_until(deadline), if show.is_playing() => show.tick(),
        }
        if show.epoch() != epoch {
            epoch = show.epoch();
            deadline = Instant::now() + interval;
        }
        publisher.send_replace(show.clone());
    }
    debug!(index = show.index(), "slideshow driver stopped");
}
