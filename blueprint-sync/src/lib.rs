#![deny(missing_docs)]
//! Keeps blueprint text and its structural view in step.
//!
//! Text changes rebuild the structural form after a quiet period; edits made
//! in the structural form are serialized back to text. Each push comes back
//! as a text arrival and is absorbed, so neither side reacts to its own echo.
//!
//! [`SyncController`] is the synchronous state machine. [`SyncLoop`] runs it
//! on a tokio task and exposes it through a cloneable [`SyncHandle`].

pub mod controller;
pub mod debounce;
pub mod document;
pub mod driver;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use controller::{SyncController, SyncMode, SyncState};
pub use debounce::Debounce;
pub use document::{MutationEvent, MutationObserver, StructuralDocument};
pub use driver::{DEFAULT_DEBOUNCE, SyncClosed, SyncConfig, SyncHandle, SyncLoop};
