//! Transport adapters.

pub mod channel;

pub use channel::{channel, ChannelTransport, ProgressEvent, ProgressStream};
