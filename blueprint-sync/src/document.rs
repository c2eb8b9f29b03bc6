//! The structural view of a blueprint, as seen by the sync loop.

use std::fmt::Display;

use tokio::sync::mpsc;

/// A structural (non-textual) materialization of blueprint text, such as
/// a node-graph widget.
///
/// The sync loop treats forms as opaque: it builds one from text, reads text
/// back out of it, and tears it down. Forms report their own changes through
/// the [`MutationObserver`] attached with [`observe`](Self::observe).
pub trait StructuralDocument {
    /// One constructed form.
    type Handle;
    /// Construction or serialization failure.
    type Error: Display;

    /// Build a form from `text`.
    fn construct(&mut self, text: &str) -> Result<Self::Handle, Self::Error>;

    /// Serialize the current state of a form back to text.
    fn serialize(&self, handle: &Self::Handle) -> Result<String, Self::Error>;

    /// Attach `observer`; the form calls [`MutationObserver::notify`] on every
    /// content, structure or attribute change.
    fn observe(&mut self, handle: &Self::Handle, observer: MutationObserver);

    /// Tear a form down. Its observer must not be notified afterwards.
    fn destroy(&mut self, handle: Self::Handle);
}

/// A structural change reported by the form of one generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationEvent {
    /// Generation of the form that changed.
    pub generation: u64,
}

/// Sender handed to a form so it can report its changes.
///
/// Events carry the generation of the form the observer was attached to;
/// events from a form that is no longer the current one, or whose observer
/// was disconnected, are ignored by the receiver.
#[derive(Debug, Clone)]
pub struct MutationObserver {
    generation: u64,
    tx: mpsc::UnboundedSender<MutationEvent>,
}

impl MutationObserver {
    pub(crate) fn new(generation: u64, tx: mpsc::UnboundedSender<MutationEvent>) -> Self {
        Self { generation, tx }
    }

    /// Generation of the form this observer watches.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Report a change. Returns `false` once the sync loop has gone away.
    pub fn notify(&self) -> bool {
        self.tx
            .send(MutationEvent {
                generation: self.generation,
            })
            .is_ok()
    }
}
