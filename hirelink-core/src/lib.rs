// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `Hirelink` Core
//!
//! Core types and traits shared by the `Hirelink` connectivity crates.
//!
//! ## Key Types
//!
//! ### Requests
//! - [`HttpMethod`] - Request verbs understood by the dispatcher
//!
//! ### Connectivity
//! - [`ConnectionStatus`] - Tri-state reachability (unknown, connected, disconnected)
//! - [`ConnectionSnapshot`] - Last-known status plus the time of the last check
//!
//! ### Traits
//! - [`ConnectivitySink`] - Receives live request outcomes

pub mod error;
pub mod models;
pub mod traits;

pub use error::CoreError;

pub use models::{ConnectionSnapshot, ConnectionStatus, HttpMethod};

pub use traits::ConnectivitySink;
