use std::sync::{Arc, Mutex};

use log::info;

use common::types::capability::{Capability, DenialReason, PermissionDecision};
use common::types::channel::ChannelId;
use common::types::position::PositionFix;

use crate::adapters::simulated::{SimulatedDevice, SimulatedDeviceConfig};
use crate::lifecycle::SessionLifecycle;
use crate::merger::SensorSession;
use crate::models::errors::AcquisitionError;
use crate::permission::PermissionGate;
use crate::position::PositionResolver;
use crate::ports::{ChannelSource, LocationSource, PermissionBackend};
use crate::registry::ChannelRegistry;

/// Facade over the acquisition core: permission gate, channel registry,
/// sensor monitoring sessions, position resolution and the owner lifecycle
/// binding, wired over the platform ports.
pub struct TelemetryService {
    gate: PermissionGate,
    registry: Arc<ChannelRegistry>,
    channel_source: Arc<dyn ChannelSource>,
    resolver: Arc<PositionResolver>,
    lifecycle: SessionLifecycle,
    sensor_session: Mutex<Option<Arc<SensorSession>>>,
}

impl TelemetryService {
    pub fn new(
        channel_source: Arc<dyn ChannelSource>,
        location_source: Arc<dyn LocationSource>,
        permission_backend: Arc<dyn PermissionBackend>,
    ) -> Self {
        let registry = Arc::new(ChannelRegistry::new(Arc::clone(&channel_source)));
        let resolver = PositionResolver::new(location_source);
        let lifecycle = SessionLifecycle::new();
        // A pending position resolution is bound to the owner's lifetime
        // just like a sensor session.
        lifecycle.bind(&resolver);

        Self {
            gate: PermissionGate::new(permission_backend),
            registry,
            channel_source,
            resolver,
            lifecycle,
            sensor_session: Mutex::new(None),
        }
    }

    pub fn permission_gate(&self) -> &PermissionGate {
        &self.gate
    }

    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    pub fn lifecycle(&self) -> &SessionLifecycle {
        &self.lifecycle
    }

    /// Starts a sensor monitoring session over the given channels.
    ///
    /// At most one sensor session is active per service: while one is
    /// active, repeated calls return the existing handle without touching
    /// the hardware again.
    pub async fn start_monitoring(
        &self,
        channels: &[ChannelId],
    ) -> Result<Arc<SensorSession>, AcquisitionError> {
        {
            let current = self.sensor_session.lock().unwrap();
            if let Some(session) = current.as_ref() {
                if session.state().is_active() {
                    info!("Monitoring already active, returning existing session");
                    return Ok(Arc::clone(session));
                }
            }
        }

        let session = SensorSession::new(
            Arc::clone(&self.channel_source),
            Arc::clone(&self.registry),
        );
        session.start(channels).await?;

        let mut current = self.sensor_session.lock().unwrap();
        if let Some(existing) = current.as_ref() {
            if existing.state().is_active() {
                // A concurrent start won the race; yield to it.
                session.stop();
                return Ok(Arc::clone(existing));
            }
        }
        self.lifecycle.bind(&session);
        *current = Some(Arc::clone(&session));
        Ok(session)
    }

    /// Stops the active sensor session, if any.
    pub fn stop_monitoring(&self) {
        if let Some(session) = self.sensor_session.lock().unwrap().take() {
            session.stop();
        }
    }

    /// Resolves a position fix, gating on the location permission: a denied
    /// capability triggers one consent prompt and the call proceeds only on
    /// grant.
    pub async fn resolve_position(&self) -> Result<PositionFix, AcquisitionError> {
        if !self.gate.is_granted(Capability::Location) {
            match self.gate.request_and_await(Capability::Location).await? {
                PermissionDecision::Granted => {}
                PermissionDecision::Denied(DenialReason::PromptUnavailable) => {
                    return Err(AcquisitionError::PromptUnavailable(Capability::Location));
                }
                PermissionDecision::Denied(_) => {
                    return Err(AcquisitionError::PermissionDenied(Capability::Location));
                }
            }
        }
        self.resolver.resolve().await
    }

    /// Cancels a pending position resolution.
    pub fn cancel_position(&self) {
        self.resolver.cancel();
    }

    /// Owner suspension hook. Must be called synchronously before the
    /// owning context is torn down; when it returns, no subscription
    /// created through this service is still registered.
    pub fn suspend(&self) {
        self.lifecycle.suspend();
    }
}

/// Builds a `TelemetryService` backed by the simulated device, which stands
/// in for the platform on all three ports.
///
/// Returns the service together with the device handle, allowing tests and
/// demos to reconfigure the simulated platform at runtime.
pub fn run_simulated_service(
    config: SimulatedDeviceConfig,
) -> (Arc<TelemetryService>, Arc<SimulatedDevice>) {
    let device = Arc::new(SimulatedDevice::new(config));
    let service = Arc::new(TelemetryService::new(
        Arc::clone(&device) as Arc<dyn ChannelSource>,
        Arc::clone(&device) as Arc<dyn LocationSource>,
        Arc::clone(&device) as Arc<dyn PermissionBackend>,
    ));
    (service, device)
}
