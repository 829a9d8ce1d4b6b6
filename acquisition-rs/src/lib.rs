//! # Crate acquisition-rs
//!
//! ## acquisition-rs
//!
//! The `acquisition-rs` crate is the asynchronous telemetry acquisition core
//! of the workspace: it gates hardware access behind the platform permission
//! state, merges readings arriving from independent hardware channels into
//! one coherent snapshot, resolves position fixes through an ordered
//! fallback chain, and ties every subscription to a bounded session
//! lifecycle so nothing leaks past the owner's lifetime.
//!
//! Features include:
//! - Permission gating with prompt coalescing (one platform prompt per
//!   capability, no matter how many concurrent requests).
//! - Hardware channel enumeration with static descriptors (vendor, power
//!   draw, version), cached for the process lifetime.
//! - Live monitoring sessions that merge per-channel readings into a
//!   replace-on-update snapshot, emitted to registered observers.
//! - Position resolution: cached satellite fix, else cached network fix,
//!   else a one-shot live subscription that tears itself down after the
//!   first event.
//! - Synchronous teardown of every subscription on session stop, resolver
//!   cancellation, or owner suspension.
//!
//! The platform side (sensor hardware, location providers, the consent
//! prompt) sits behind the traits in [`ports`]; `adapters` ships a
//! simulated device plus scripted mocks for tests.

pub mod adapters;
mod lifecycle;
mod merger;
pub mod models;
mod permission;
mod position;
pub mod ports;
mod registry;
pub mod services;

pub use lifecycle::{ManagedSession, SessionLifecycle};
pub use merger::SensorSession;
pub use models::errors::AcquisitionError;
pub use models::subscription::SubscriptionHandle;
pub use permission::PermissionGate;
pub use position::PositionResolver;
pub use registry::ChannelRegistry;
pub use services::TelemetryService;
