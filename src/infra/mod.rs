//! Infrastructure adapters connecting the scheduler to request transports.

pub mod transport;

pub use transport::{channel, ChannelTransport, ProgressEvent, ProgressStream};
