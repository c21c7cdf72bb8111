//! Device-state synchronization for a cloud-connected irrigation
//! controller.
//!
//! This crate owns the reconciliation layer between the vendor cloud
//! (`aquasync-api`) and UI consumers:
//!
//! - **[`SyncEngine`]** — session facade: [`start()`](SyncEngine::start)
//!   fetches the device specification, runs an initial poll cycle, then
//!   spawns the polling loop, the push bridge, and the command
//!   processor. The four command methods are fire-and-forget; the
//!   poll/push loop reconciles the confirmed state.
//!
//! - **[`StateStore`]** — the authoritative in-memory [`DeviceState`]
//!   snapshot with field-level merge semantics and `watch`-based change
//!   notification.
//!
//! - **[`Reconciler`]** — translates poll responses and push messages
//!   (named codes or raw capability indices, firmware-dependent) into
//!   store updates, with per-entry error isolation.
//!
//! State is in-memory only and rebuilt on startup; one
//! [`SessionConfig`] / engine instance exists per configured device.

pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod push;
pub mod reconcile;
pub mod store;

pub use config::{DpRegistry, SessionConfig};
pub use engine::{Command, EngineState, SyncEngine};
pub use error::CoreError;
pub use model::{DeviceState, StateDelta};
pub use push::PushEnvelope;
pub use reconcile::Reconciler;
pub use store::StateStore;

// Collaborators read the specification types straight through.
pub use aquasync_api::{CapabilityDescriptor, CapabilityValues, Specification};
