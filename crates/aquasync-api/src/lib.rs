//! Signed HTTP client for the vendor IoT cloud API.
//!
//! This crate owns the authenticated-request subsystem:
//!
//! - **[`sign`]** — the vendor's HMAC-SHA256 request signature, a pure
//!   function with no I/O or shared state.
//! - **[`TokenCache`]** — the time-bounded bearer token, refreshed on
//!   demand with at most one issuance request in flight.
//! - **[`ApiClient`]** — signed GET/POST calls, vendor envelope
//!   unwrapping, and the domain operations (status, online state,
//!   specification, capability reads, commands, capability writes).
//!
//! State reconciliation lives in `aquasync-core`; this crate stops at
//! the wire.

pub mod client;
pub mod error;
pub mod sign;
pub mod token;
pub mod types;

pub use client::{ApiClient, REQUEST_TIMEOUT};
pub use error::Error;
pub use token::TokenCache;
pub use types::{
    CapabilityDescriptor, CapabilityValues, CodeValue, DeviceDetail, Envelope, Specification,
    TokenGrant, map_code_value,
};
