//! Simulated platform device.
//!
//! Stands in for real hardware on all three ports: sensor channels emit
//! gaussian-noised readings on a fixed period, the location provider serves
//! configurable cached fixes and a delayed live fix, and consent prompts
//! resolve after a short delay.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use log::error;
use rand::thread_rng;
use rand_distr::{Distribution, Normal};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, Instant};

use common::types::capability::{Capability, DenialReason, PermissionDecision};
use common::types::channel::{ChannelDescriptor, ChannelId};
use common::types::position::{FixSource, PositionFix, ProviderId};
use common::types::reading::Reading;

use crate::models::errors::AcquisitionError;
use crate::models::subscription::SubscriptionHandle;
use crate::ports::{
    ChannelSource, DecisionCallback, FixCallback, LocationSource, PermissionBackend,
    ReadingCallback,
};

/// Configuration for the simulated device.
#[derive(Clone)]
pub struct SimulatedDeviceConfig {
    /// Period between consecutive readings on a subscribed channel.
    pub update_period_millis: u64,
    /// Adds gaussian noise to every sample when set.
    pub add_noise: bool,
    /// Hardware inventory reported by the device.
    pub inventory: Vec<ChannelDescriptor>,
    /// Capabilities granted before any prompt is shown.
    pub granted: Vec<Capability>,
    /// Capabilities the simulated user consents to when prompted.
    pub user_grants: Vec<Capability>,
    /// Cached fixes the location provider starts with.
    pub cached_fixes: Vec<(ProviderId, PositionFix)>,
    /// Delay before a live location subscription delivers its first fix.
    pub live_fix_delay_millis: u64,
}

impl Default for SimulatedDeviceConfig {
    fn default() -> Self {
        Self {
            update_period_millis: 100,
            add_noise: true,
            inventory: default_inventory(),
            granted: Vec::new(),
            user_grants: vec![
                Capability::Camera,
                Capability::Location,
                Capability::Notifications,
            ],
            cached_fixes: vec![(
                ProviderId::Satellite,
                PositionFix::new(41.3851, 2.1734, ProviderId::Satellite, FixSource::Cached)
                    .with_accuracy(12.0)
                    .with_altitude(27.0),
            )],
            live_fix_delay_millis: 300,
        }
    }
}

fn default_inventory() -> Vec<ChannelDescriptor> {
    vec![
        ChannelDescriptor::new(ChannelId::Accelerometer, "SimWorks", 0.23, 3, true),
        ChannelDescriptor::new(ChannelId::Gyroscope, "SimWorks", 0.61, 3, true),
        ChannelDescriptor::new(ChannelId::Magnetometer, "SimWorks", 0.45, 2, true),
        ChannelDescriptor::new(ChannelId::Light, "SimWorks", 0.07, 1, true),
        ChannelDescriptor::unavailable(ChannelId::Pressure),
        ChannelDescriptor::unavailable(ChannelId::Proximity),
        ChannelDescriptor::unavailable(ChannelId::Temperature),
    ]
}

/// In-process device implementing all three platform ports.
pub struct SimulatedDevice {
    config: SimulatedDeviceConfig,
    epoch: Instant,
    granted: Mutex<HashSet<Capability>>,
    tasks: DashMap<SubscriptionHandle, JoinHandle<()>>,
}

impl SimulatedDevice {
    pub fn new(config: SimulatedDeviceConfig) -> Self {
        let granted = config.granted.iter().copied().collect();
        Self {
            config,
            epoch: Instant::now(),
            granted: Mutex::new(granted),
            tasks: DashMap::new(),
        }
    }

    fn abort_task(&self, handle: SubscriptionHandle) {
        if let Some((_, task)) = self.tasks.remove(&handle) {
            task.abort();
        }
    }
}

impl Drop for SimulatedDevice {
    fn drop(&mut self) {
        for entry in self.tasks.iter() {
            entry.value().abort();
        }
    }
}

#[async_trait]
impl ChannelSource for SimulatedDevice {
    async fn inventory(&self) -> Result<Vec<ChannelDescriptor>, AcquisitionError> {
        Ok(self.config.inventory.clone())
    }

    fn subscribe(
        &self,
        channel: ChannelId,
        on_reading: ReadingCallback,
    ) -> Result<SubscriptionHandle, AcquisitionError> {
        let available = self
            .config
            .inventory
            .iter()
            .any(|descriptor| descriptor.id == channel && descriptor.available);
        if !available {
            return Err(AcquisitionError::ChannelUnavailable(channel));
        }

        let handle = SubscriptionHandle::new();
        let period = Duration::from_millis(self.config.update_period_millis.max(1));
        let add_noise = self.config.add_noise;
        let epoch = self.epoch;
        let task = tokio::spawn(async move {
            let mut clock = interval(period);
            loop {
                clock.tick().await;
                let timestamp = epoch.elapsed().as_secs_f64();
                let values = synthesize(channel, timestamp, add_noise);
                match Reading::try_new(channel, timestamp, values) {
                    Ok(reading) => on_reading(reading),
                    Err(e) => error!("Dropping malformed simulated reading: {}", e),
                }
            }
        });
        self.tasks.insert(handle, task);
        Ok(handle)
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        self.abort_task(handle);
    }
}

impl LocationSource for SimulatedDevice {
    fn is_enabled(&self, _provider: ProviderId) -> bool {
        true
    }

    fn last_known_fix(
        &self,
        provider: ProviderId,
    ) -> Result<Option<PositionFix>, AcquisitionError> {
        let fix = self
            .config
            .cached_fixes
            .iter()
            .find(|(cached_provider, _)| *cached_provider == provider)
            .map(|(_, fix)| fix.clone());
        Ok(fix)
    }

    fn subscribe_live(
        &self,
        provider: ProviderId,
        on_fix: FixCallback,
    ) -> Result<SubscriptionHandle, AcquisitionError> {
        let handle = SubscriptionHandle::new();
        let first_fix_delay = Duration::from_millis(self.config.live_fix_delay_millis);
        let period = Duration::from_millis(self.config.update_period_millis.max(1));
        let task = tokio::spawn(async move {
            sleep(first_fix_delay).await;
            let mut tick = 0u64;
            loop {
                // Slow drift around a fixed point, as a stationary receiver
                // would report.
                let drift = tick as f64 * 1.0e-6;
                let fix = PositionFix::new(41.3851 + drift, 2.1734 + drift, provider, FixSource::Live)
                    .with_accuracy(8.0 + noise(1.5))
                    .with_altitude(27.0 + noise(0.8))
                    .with_speed(0.0)
                    .with_bearing(0.0);
                on_fix(fix);
                tick += 1;
                sleep(period).await;
            }
        });
        self.tasks.insert(handle, task);
        Ok(handle)
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        self.abort_task(handle);
    }
}

impl PermissionBackend for SimulatedDevice {
    fn current_state(&self, capability: Capability) -> bool {
        self.granted.lock().unwrap().contains(&capability)
    }

    fn prompt_user(
        &self,
        capability: Capability,
        on_decision: DecisionCallback,
    ) -> Result<(), AcquisitionError> {
        let grants = self.config.user_grants.contains(&capability);
        if grants {
            self.granted.lock().unwrap().insert(capability);
        }
        tokio::spawn(async move {
            // Consent dialogs are never instantaneous.
            sleep(Duration::from_millis(25)).await;
            let decision = if grants {
                PermissionDecision::Granted
            } else {
                PermissionDecision::Denied(DenialReason::Declined)
            };
            on_decision(decision);
        });
        Ok(())
    }
}

fn synthesize(channel: ChannelId, timestamp: f64, add_noise: bool) -> Vec<f64> {
    let base = match channel {
        ChannelId::Accelerometer => vec![
            0.2 * timestamp.sin(),
            0.2 * (timestamp * 0.7).cos(),
            9.81,
        ],
        ChannelId::Gyroscope => vec![
            0.05 * (timestamp * 1.3).sin(),
            0.05 * timestamp.cos(),
            0.01,
        ],
        ChannelId::Magnetometer => vec![30.0, 1.5 * timestamp.sin(), -20.0],
        ChannelId::Light => vec![120.0 + 40.0 * (timestamp / 3.0).sin()],
        ChannelId::Pressure => vec![1013.25],
        ChannelId::Proximity => vec![5.0],
        ChannelId::Temperature => vec![21.5],
    };
    if !add_noise {
        return base;
    }
    base.into_iter()
        .map(|value| value + noise(0.01 * value.abs() + 0.02))
        .collect()
}

fn noise(sigma: f64) -> f64 {
    match Normal::new(0.0, sigma) {
        Ok(dist) => dist.sample(&mut thread_rng()),
        Err(_) => 0.0,
    }
}
