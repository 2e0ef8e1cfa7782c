// Adapters layer: concrete implementations of the domain ports.

pub mod http;
pub mod local;

pub use http::HttpTransport;
pub use local::{FileLocalStore, MemoryLocalStore};
