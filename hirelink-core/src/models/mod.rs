//! Domain models for Hirelink.
//!
//! ## Submodules
//!
//! - `connection` - Connectivity status types
//! - `request` - Request verbs

mod connection;
mod request;

pub use connection::{ConnectionSnapshot, ConnectionStatus};
pub use request::HttpMethod;
