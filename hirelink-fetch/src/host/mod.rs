//! Host APIs used by the transports.
//!
//! - [`http`] - HTTP client with tracing and a cookie store

pub mod http;

pub use http::HttpClient;
