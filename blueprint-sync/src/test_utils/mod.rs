//! In-memory implementations for testing.
//!
//! Available behind the `test-utils` feature flag.

mod memory_document;

pub use memory_document::{MemoryDocument, MemoryDocumentError, MemoryHandle};
