// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Hirelink Fetch
//!
//! Transports and fallback dispatch for reaching the Hirelink API when the
//! direct path is obstructed.
//!
//! ## Transports
//!
//! The [`transports`] module provides four interchangeable ways to reach the
//! backend, all behind the [`transport::Transport`] trait:
//!
//! - [`transports::direct`] - Plain HTTP request, carries writes
//! - [`transports::script_relay`] - Payload delivered through a named callback
//! - [`transports::probe`] - Reachability only
//! - [`transports::public_relay`] - Third-party relay, last resort
//!
//! ## Dispatch
//!
//! - [`dispatcher::RequestDispatcher`] - Runs the fallback chain for reads
//! - [`response::TransportResponse`] - Uniform result of every transport
//! - [`context::TransportContext`] - Shared client, registry and settings
//!
//! ## Example
//!
//! ```ignore
//! use hirelink_core::HttpMethod;
//! use hirelink_fetch::{RequestDispatcher, TransportContext};
//!
//! let ctx = TransportContext::new()?;
//! let dispatcher = RequestDispatcher::from_context(base_url, &ctx)?;
//!
//! let jobs = dispatcher.dispatch(HttpMethod::Get, "/jobs", None).await?;
//! ```

pub mod context;
pub mod dispatcher;
pub mod error;
pub mod host;
pub mod relay;
pub mod response;
pub mod transport;
pub mod transports;

// Errors
pub use error::ApiError;

// Host APIs
pub use host::http::HttpClient;

// Transports
pub use context::{TransportContext, TransportContextBuilder, TransportSettings};
pub use relay::{PendingRelayCall, RelayCallbackRegistry};
pub use response::{ResponseBody, TransportResponse};
pub use transport::{Transport, TransportKind, TransportRequest};
pub use transports::{
    CrossOriginProbe, DirectTransport, PublicRelayTransport, ScriptLoader, ScriptRelayTransport,
};

// Dispatch
pub use dispatcher::{DispatchOutcome, RequestDispatcher, TransportAttempt};

#[cfg(test)]
mod dispatcher_tests;
