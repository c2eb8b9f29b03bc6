//! Async event loop that owns the canonical text and drives a
//! [`SyncController`].

use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use crate::controller::SyncController;
use crate::document::{MutationEvent, StructuralDocument};

/// Default quiescence delay before a rebuild.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

/// Sync loop settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    /// How long text must stay unchanged before the form is rebuilt.
    pub debounce: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

impl SyncConfig {
    /// Default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the rebuild debounce.
    #[must_use]
    pub fn debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}

/// The sync loop has shut down.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("sync loop has shut down")]
pub struct SyncClosed;

#[derive(Debug)]
enum Command {
    SetText(String),
    EnterRawEditing,
    RawEdit(String),
    LeaveRawEditing,
    Shutdown,
}

/// Cloneable handle to a running [`SyncLoop`].
#[derive(Debug, Clone)]
pub struct SyncHandle {
    commands: mpsc::UnboundedSender<Command>,
    text: watch::Receiver<String>,
}

impl SyncHandle {
    fn send(&self, command: Command) -> Result<(), SyncClosed> {
        self.commands.send(command).map_err(|_| SyncClosed)
    }

    /// Replace the canonical text, e.g. with a freshly extracted blueprint.
    pub fn set_text(&self, text: impl Into<String>) -> Result<(), SyncClosed> {
        self.send(Command::SetText(text.into()))
    }

    /// Switch to raw text editing.
    pub fn enter_raw_editing(&self) -> Result<(), SyncClosed> {
        self.send(Command::EnterRawEditing)
    }

    /// Write raw-edited text straight to the canonical text.
    pub fn raw_edit(&self, text: impl Into<String>) -> Result<(), SyncClosed> {
        self.send(Command::RawEdit(text.into()))
    }

    /// Leave raw text editing; the form is rebuilt once.
    pub fn leave_raw_editing(&self) -> Result<(), SyncClosed> {
        self.send(Command::LeaveRawEditing)
    }

    /// Subscribe to canonical text changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.text.clone()
    }

    /// The current canonical text.
    #[must_use]
    pub fn text(&self) -> String {
        self.text.borrow().clone()
    }

    /// Ask the loop to tear down and exit.
    pub fn shutdown(&self) -> Result<(), SyncClosed> {
        self.send(Command::Shutdown)
    }
}

/// Owns a [`SyncController`] and processes commands, mutation events and
/// the rebuild timer one at a time.
///
/// ```no_run
/// # #[cfg(feature = "test-utils")]
/// # async fn demo() {
/// use blueprint_sync::{SyncConfig, SyncLoop, test_utils::MemoryDocument};
///
/// let (sync, handle) = SyncLoop::new(MemoryDocument::new(), SyncConfig::default());
/// let task = tokio::spawn(sync.run());
/// handle.set_text("Begin Object\nEnd Object").unwrap();
/// handle.shutdown().unwrap();
/// let _document = task.await.unwrap();
/// # }
/// ```
pub struct SyncLoop<D: StructuralDocument> {
    controller: SyncController<D>,
    commands: mpsc::UnboundedReceiver<Command>,
    mutations: mpsc::UnboundedReceiver<MutationEvent>,
    text: watch::Sender<String>,
}

impl<D: StructuralDocument> SyncLoop<D> {
    /// Create a loop over `document` and the handle that feeds it.
    pub fn new(document: D, config: SyncConfig) -> (Self, SyncHandle) {
        let (command_tx, commands) = mpsc::unbounded_channel();
        let (mutation_tx, mutations) = mpsc::unbounded_channel();
        let (text, text_rx) = watch::channel(String::new());

        let sync = Self {
            controller: SyncController::new(document, config.debounce, mutation_tx),
            commands,
            mutations,
            text,
        };
        let handle = SyncHandle {
            commands: command_tx,
            text: text_rx,
        };
        (sync, handle)
    }

    /// Run until [`SyncHandle::shutdown`] or until every handle is dropped,
    /// then tear down and return the document.
    pub async fn run(mut self) -> D {
        tracing::debug!("sync loop started");
        loop {
            let deadline = self.controller.deadline();

            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::SetText(text)) => self.arrive(text),
                    Some(Command::EnterRawEditing) => self.controller.enter_raw_editing(),
                    Some(Command::RawEdit(text)) => {
                        self.publish(&text);
                        self.controller.raw_edit(text, Instant::now());
                    }
                    Some(Command::LeaveRawEditing) => self.controller.leave_raw_editing(Instant::now()),
                    Some(Command::Shutdown) | None => break,
                },
                Some(event) = self.mutations.recv() => {
                    if let Some(text) = self.controller.mutation_observed(event) {
                        self.arrive(text);
                    }
                }
                () = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.controller.fire_timer(Instant::now());
                }
            }
        }
        self.controller.teardown()
    }

    /// Publish `text` as canonical and hand it to the controller.
    fn arrive(&mut self, text: String) {
        self.publish(&text);
        self.controller.text_arrived(text, Instant::now());
    }

    fn publish(&self, text: &str) {
        self.text.send_if_modified(|current| {
            if current == text {
                false
            } else {
                text.clone_into(current);
                true
            }
        });
    }
}
