//! Module errors

use common::types::capability::Capability;
use common::types::channel::ChannelId;

/// Represents the different types of errors that can occur in the
/// acquisition core.
#[derive(Debug, Clone, PartialEq)]
pub enum AcquisitionError {
    /// The user denied the capability required for the operation.
    PermissionDenied(Capability),

    /// The platform could not present a consent prompt.
    PromptUnavailable(Capability),

    /// The channel is not present on this device. Non-fatal when starting a
    /// session, where unavailable channels are skipped.
    ChannelUnavailable(ChannelId),

    /// The session handle is stopped; a new session must be created.
    SessionTerminated,

    /// The position fallback chain was exhausted or cancelled.
    NoFixAvailable,

    /// Platform-level failure reading a provider. Surfaced to the caller,
    /// never retried here.
    ProviderAccess(String),
}
