pub mod capability;
pub mod channel;
pub mod position;
pub mod reading;
pub mod session;
pub mod snapshot;

pub use capability::{Capability, DenialReason, PermissionDecision};
pub use channel::{ChannelDescriptor, ChannelId};
pub use position::{FixSource, PositionFix, ProviderId};
pub use reading::{Reading, ReadingValues};
pub use session::SessionState;
pub use snapshot::Snapshot;
