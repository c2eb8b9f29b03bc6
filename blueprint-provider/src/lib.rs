#![doc = include_str!("../README.md")]

pub mod client;
pub mod config;
pub(crate) mod error;
pub mod mapping;
pub mod prompt;
pub mod types;

pub use client::{ChatClient, DeltaStream};
pub use config::{ConfigError, ProviderConfig, ProviderKind, ProviderSettings};
pub use error::ProviderError;
pub use types::{Message, Role};

// Re-export the wire layer for callers that decode bodies themselves.
pub use blueprint_wire::Dialect;
