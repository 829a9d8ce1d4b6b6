//! Shared data model for the acquisition workspace.

#[doc(hidden)]
pub mod types;

// Re-export types
#[doc(inline)]
pub use types::{
    Capability, ChannelDescriptor, ChannelId, DenialReason, FixSource, PermissionDecision,
    PositionFix, ProviderId, Reading, ReadingValues, SessionState, Snapshot,
};
