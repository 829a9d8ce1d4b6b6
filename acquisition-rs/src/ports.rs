use std::sync::Arc;

use async_trait::async_trait;

use common::types::capability::{Capability, PermissionDecision};
use common::types::channel::{ChannelDescriptor, ChannelId};
use common::types::position::{PositionFix, ProviderId};
use common::types::reading::Reading;

use crate::models::errors::AcquisitionError;
use crate::models::subscription::SubscriptionHandle;

/// Callback invoked by the platform for each delivered reading.
pub type ReadingCallback = Arc<dyn Fn(Reading) + Send + Sync>;

/// Callback invoked by the platform for each delivered position fix.
pub type FixCallback = Arc<dyn Fn(PositionFix) + Send + Sync>;

/// Callback invoked once with the user's decision on a consent prompt.
pub type DecisionCallback = Box<dyn FnOnce(PermissionDecision) + Send>;

/// Platform boundary for hardware channel inventory and event delivery.
///
/// Readings from one channel are delivered in order (non-decreasing
/// timestamps); no ordering holds across distinct channels.
#[async_trait]
pub trait ChannelSource: Send + Sync {
    /// Queries the device hardware inventory.
    async fn inventory(&self) -> Result<Vec<ChannelDescriptor>, AcquisitionError>;

    /// Registers a callback for readings from one channel.
    /// Returns `ChannelUnavailable` if the device does not carry it.
    fn subscribe(
        &self,
        channel: ChannelId,
        on_reading: ReadingCallback,
    ) -> Result<SubscriptionHandle, AcquisitionError>;

    /// Cancels a subscription. Unknown handles are ignored.
    fn unsubscribe(&self, handle: SubscriptionHandle);
}

/// Platform boundary for position providers.
pub trait LocationSource: Send + Sync {
    /// Whether the provider is enabled on this device.
    fn is_enabled(&self, provider: ProviderId) -> bool;

    /// Most recent cached fix from the provider, if any.
    fn last_known_fix(
        &self,
        provider: ProviderId,
    ) -> Result<Option<PositionFix>, AcquisitionError>;

    /// Registers a callback for live fixes from the provider, with no
    /// minimum distance or time filter.
    fn subscribe_live(
        &self,
        provider: ProviderId,
        on_fix: FixCallback,
    ) -> Result<SubscriptionHandle, AcquisitionError>;

    /// Cancels a live subscription. Unknown handles are ignored.
    fn unsubscribe(&self, handle: SubscriptionHandle);
}

/// Platform boundary for the permission subsystem.
pub trait PermissionBackend: Send + Sync {
    /// Current platform-reported state for the capability.
    fn current_state(&self, capability: Capability) -> bool;

    /// Presents the consent prompt and reports the decision through the
    /// callback. Returns `PromptUnavailable` if no prompt can be shown
    /// (e.g. no foreground context).
    fn prompt_user(
        &self,
        capability: Capability,
        on_decision: DecisionCallback,
    ) -> Result<(), AcquisitionError>;
}
