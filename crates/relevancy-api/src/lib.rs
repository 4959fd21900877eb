// relevancy-api: Async Rust client for the realtime document store (REST + event stream)

pub mod client;
pub mod error;
pub mod events;
pub mod path;
pub mod transport;

pub use client::StoreClient;
pub use error::Error;
pub use events::{EventStreamHandle, ReconnectConfig, StoreEvent, StreamStatus};
pub use path::StorePath;
pub use transport::{TlsMode, TransportConfig};
