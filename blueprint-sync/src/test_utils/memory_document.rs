//! MemoryDocument: a structural document whose forms are plain strings.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use crate::document::{MutationObserver, StructuralDocument};

/// Handle to one form of a [`MemoryDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MemoryHandle(u64);

/// Failures a [`MemoryDocument`] can be told to produce.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MemoryDocumentError {
    /// The handle refers to a destroyed form.
    #[error("form {0} was destroyed")]
    Destroyed(u64),
    /// Serialization was switched off with [`MemoryDocument::fail_serialization`].
    #[error("serialization failed")]
    Serialization,
}

struct Form {
    text: String,
    observer: Option<MutationObserver>,
}

#[derive(Default)]
struct Inner {
    forms: BTreeMap<MemoryHandle, Form>,
    next_id: u64,
    constructions: usize,
    destructions: usize,
    fail_serialization: bool,
}

/// Structural document that stores each form's text and counts rebuilds.
///
/// Clones share state, so a test can keep one clone while the sync loop
/// owns another, then inspect constructions or simulate a structural edit
/// with [`edit`](Self::edit).
#[derive(Clone, Default)]
pub struct MemoryDocument {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryDocument {
    /// Create a document with no forms.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of forms constructed so far.
    pub fn constructions(&self) -> usize {
        self.lock().constructions
    }

    /// Number of forms destroyed so far.
    pub fn destructions(&self) -> usize {
        self.lock().destructions
    }

    /// Number of forms not yet destroyed.
    pub fn live_forms(&self) -> usize {
        self.lock().forms.len()
    }

    /// Text of the newest live form.
    pub fn current_text(&self) -> Option<String> {
        self.lock().forms.values().next_back().map(|f| f.text.clone())
    }

    /// Observer generation of the newest live form.
    pub fn live_generation(&self) -> Option<u64> {
        self.lock()
            .forms
            .values()
            .next_back()
            .and_then(|f| f.observer.as_ref())
            .map(MutationObserver::generation)
    }

    /// Replace the newest live form's content, as a user editing the graph
    /// would, and notify its observer.
    ///
    /// Returns whether an observer was notified.
    pub fn edit(&self, text: impl Into<String>) -> bool {
        let observer = {
            let mut inner = self.lock();
            let Some(form) = inner.forms.values_mut().next_back() else {
                return false;
            };
            form.text = text.into();
            form.observer.clone()
        };
        observer.is_some_and(|o| o.notify())
    }

    /// Make every following serialization fail (or succeed again).
    pub fn fail_serialization(&self, fail: bool) {
        self.lock().fail_serialization = fail;
    }
}

impl std::fmt::Debug for MemoryDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("MemoryDocument")
            .field("live_forms", &inner.forms.len())
            .field("constructions", &inner.constructions)
            .field("destructions", &inner.destructions)
            .finish()
    }
}

impl StructuralDocument for MemoryDocument {
    type Handle = MemoryHandle;
    type Error = MemoryDocumentError;

    fn construct(&mut self, text: &str) -> Result<MemoryHandle, MemoryDocumentError> {
        let mut inner = self.lock();
        inner.next_id += 1;
        inner.constructions += 1;
        let handle = MemoryHandle(inner.next_id);
        inner.forms.insert(
            handle,
            Form {
                text: text.to_string(),
                observer: None,
            },
        );
        Ok(handle)
    }

    fn serialize(&self, handle: &MemoryHandle) -> Result<String, MemoryDocumentError> {
        let inner = self.lock();
        if inner.fail_serialization {
            return Err(MemoryDocumentError::Serialization);
        }
        inner
            .forms
            .get(handle)
            .map(|f| f.text.clone())
            .ok_or(MemoryDocumentError::Destroyed(handle.0))
    }

    fn observe(&mut self, handle: &MemoryHandle, observer: MutationObserver) {
        if let Some(form) = self.lock().forms.get_mut(handle) {
            form.observer = Some(observer);
        }
    }

    fn destroy(&mut self, handle: MemoryHandle) {
        let mut inner = self.lock();
        if inner.forms.remove(&handle).is_some() {
            inner.destructions += 1;
        }
    }
}
