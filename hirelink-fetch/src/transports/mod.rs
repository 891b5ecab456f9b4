//! Transport implementations.
//!
//! - [`direct`] - Plain HTTP request, the only transport carrying writes
//! - [`script_relay`] - Payload delivered through a caller-named callback
//! - [`probe`] - Reachability only, never delivers data
//! - [`public_relay`] - Third-party relay, last resort for reads

pub mod direct;
pub mod probe;
pub mod public_relay;
pub mod script_relay;

pub use direct::DirectTransport;
pub use probe::CrossOriginProbe;
pub use public_relay::PublicRelayTransport;
pub use script_relay::{ScriptLoader, ScriptRelayTransport};
