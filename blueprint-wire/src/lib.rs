#![doc = include_str!("../README.md")]

pub mod dialect;
pub mod frame;
pub mod stream;

pub use dialect::Dialect;
pub use frame::{Frame, FrameDecoder, Framing};
pub use stream::decode_deltas;
