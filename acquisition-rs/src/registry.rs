use std::collections::HashMap;
use std::sync::Arc;

use log::info;
use tokio::sync::OnceCell;

use common::types::channel::{ChannelDescriptor, ChannelId};

use crate::models::errors::AcquisitionError;
use crate::ports::ChannelSource;

struct Inventory {
    ordered: Vec<ChannelDescriptor>,
    index: HashMap<ChannelId, usize>,
}

/// Enumerates the hardware channels of the device and their static
/// descriptors.
///
/// The hardware inventory does not change at runtime, so the platform is
/// queried once and the result is cached for the process lifetime.
pub struct ChannelRegistry {
    source: Arc<dyn ChannelSource>,
    inventory: OnceCell<Inventory>,
}

impl ChannelRegistry {
    pub fn new(source: Arc<dyn ChannelSource>) -> Self {
        Self {
            source,
            inventory: OnceCell::new(),
        }
    }

    async fn inventory(&self) -> Result<&Inventory, AcquisitionError> {
        self.inventory
            .get_or_try_init(|| async {
                let ordered = self.source.inventory().await?;
                let index = ordered
                    .iter()
                    .enumerate()
                    .map(|(idx, descriptor)| (descriptor.id, idx))
                    .collect();
                info!("Enumerated {} hardware channels", ordered.len());
                Ok(Inventory { ordered, index })
            })
            .await
    }

    /// Descriptors for every channel the platform reports, in inventory
    /// order. Includes unavailable channels with `available = false`.
    pub async fn list_available(&self) -> Result<&[ChannelDescriptor], AcquisitionError> {
        Ok(self.inventory().await?.ordered.as_slice())
    }

    /// Descriptor for a single channel, or `None` if the platform does not
    /// report it at all.
    pub async fn describe(
        &self,
        channel: ChannelId,
    ) -> Result<Option<&ChannelDescriptor>, AcquisitionError> {
        let inventory = self.inventory().await?;
        Ok(inventory
            .index
            .get(&channel)
            .map(|&idx| &inventory.ordered[idx]))
    }

    /// Whether the channel is present and usable on this device.
    pub async fn is_available(&self, channel: ChannelId) -> Result<bool, AcquisitionError> {
        Ok(self
            .describe(channel)
            .await?
            .map(|descriptor| descriptor.available)
            .unwrap_or(false))
    }
}
