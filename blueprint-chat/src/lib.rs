#![deny(missing_docs)]
//! Chat turns for the blueprint assistant.
//!
//! A [`ChatSession`] sends the transcript and the current blueprint to the
//! active provider, folds the streamed deltas into the running reply with a
//! [`DeltaAggregator`], and reports each new blueprint candidate found by the
//! [`BlueprintExtractor`] through a [`TurnObserver`].

pub mod aggregate;
pub mod error;
pub mod extract;
pub mod session;

pub use aggregate::DeltaAggregator;
pub use error::ChatError;
pub use extract::{BlueprintExtractor, END_MARKER, START_MARKER};
pub use session::{ChatSession, TurnObserver, TurnOutcome, TurnStatus};

// Re-export the provider layer so callers need a single dependency.
pub use blueprint_provider::{
    ChatClient, ConfigError, Message, ProviderConfig, ProviderError, ProviderKind,
    ProviderSettings, Role,
};
