use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::{sleep, timeout};

use acquisition_rs::adapters::mock::{
    MockChannelSource, MockLocationSource, MockPermissionBackend, PromptBehavior,
};
use acquisition_rs::adapters::simulated::SimulatedDeviceConfig;
use acquisition_rs::services::{run_simulated_service, TelemetryService};
use acquisition_rs::AcquisitionError;
use common::types::capability::Capability;
use common::types::channel::{ChannelDescriptor, ChannelId};
use common::types::position::{FixSource, ProviderId};
use common::types::session::SessionState;
use common::types::snapshot::Snapshot;

fn fast_config() -> SimulatedDeviceConfig {
    SimulatedDeviceConfig {
        update_period_millis: 20,
        live_fix_delay_millis: 50,
        ..SimulatedDeviceConfig::default()
    }
}

fn mock_service() -> (
    Arc<TelemetryService>,
    Arc<MockChannelSource>,
    Arc<MockLocationSource>,
) {
    let channels = Arc::new(MockChannelSource::new(vec![
        ChannelDescriptor::new(ChannelId::Accelerometer, "MockWorks", 0.23, 2, true),
        ChannelDescriptor::new(ChannelId::Gyroscope, "MockWorks", 0.45, 1, true),
        ChannelDescriptor::unavailable(ChannelId::Pressure),
    ]));
    let location = Arc::new(MockLocationSource::new());
    let backend = Arc::new(MockPermissionBackend::new(PromptBehavior::GrantImmediately));
    let service = Arc::new(TelemetryService::new(
        channels.clone(),
        location.clone(),
        backend,
    ));
    (service, channels, location)
}

async fn wait_for<F>(mut condition: F)
where
    F: FnMut() -> bool,
{
    timeout(Duration::from_secs(2), async {
        while !condition() {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition never met");
}

#[tokio::test]
async fn test_simulated_monitoring_delivers_merged_snapshots() {
    let (service, _device) = run_simulated_service(fast_config());

    let session = service
        .start_monitoring(&[ChannelId::Accelerometer, ChannelId::Light])
        .await
        .unwrap();
    let received: Arc<Mutex<Vec<Snapshot>>> = Arc::new(Mutex::new(Vec::new()));
    {
        let received = Arc::clone(&received);
        session.register_observer(move |snapshot: Arc<Snapshot>| {
            received.lock().unwrap().push((*snapshot).clone());
        });
    }

    wait_for(|| {
        received
            .lock()
            .unwrap()
            .last()
            .map(|snapshot| snapshot.len() == 2)
            .unwrap_or(false)
    })
    .await;
    service.stop_monitoring();

    let received = received.lock().unwrap();
    let last = received.last().unwrap();
    let accel = last.latest(ChannelId::Accelerometer).unwrap();
    assert_eq!(accel.values().len(), 3);
    assert!(last.latest(ChannelId::Light).is_some());
}

#[tokio::test]
async fn test_unavailable_channels_are_skipped_at_start() {
    let (service, _device) = run_simulated_service(fast_config());

    // Pressure is in the simulated inventory but flagged unavailable.
    let session = service
        .start_monitoring(&[ChannelId::Accelerometer, ChannelId::Pressure])
        .await
        .unwrap();

    assert_eq!(session.subscribed_channels(), vec![ChannelId::Accelerometer]);
    service.stop_monitoring();
}

#[tokio::test]
async fn test_duplicate_start_returns_existing_session() {
    let (service, channels, _) = mock_service();

    let first = service
        .start_monitoring(&[ChannelId::Accelerometer])
        .await
        .unwrap();
    let second = service
        .start_monitoring(&[ChannelId::Gyroscope])
        .await
        .unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(channels.subscribe_calls(), 1);
}

#[tokio::test]
async fn test_monitoring_can_restart_after_stop() {
    let (service, channels, _) = mock_service();

    let first = service
        .start_monitoring(&[ChannelId::Accelerometer])
        .await
        .unwrap();
    service.stop_monitoring();
    assert_eq!(first.state(), SessionState::Stopped);

    // A fresh session replaces the terminated one.
    let second = service
        .start_monitoring(&[ChannelId::Accelerometer])
        .await
        .unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(second.state(), SessionState::Active);
    assert_eq!(channels.active_subscriptions(), 1);
}

#[tokio::test]
async fn test_inventory_lists_every_reported_channel() {
    let (service, _device) = run_simulated_service(fast_config());

    let inventory = service.registry().list_available().await.unwrap();
    assert_eq!(inventory.len(), 7);
    assert!(inventory.iter().any(|d| d.id == ChannelId::Accelerometer && d.available));
    assert!(inventory.iter().any(|d| d.id == ChannelId::Pressure && !d.available));
}

#[tokio::test]
async fn test_resolve_position_prompts_then_uses_cache() {
    let (service, _device) = run_simulated_service(fast_config());
    assert!(!service.permission_gate().is_granted(Capability::Location));

    let fix = service.resolve_position().await.unwrap();

    assert!(service.permission_gate().is_granted(Capability::Location));
    assert_eq!(fix.provider, ProviderId::Satellite);
    assert_eq!(fix.source, FixSource::Cached);
}

#[tokio::test]
async fn test_resolve_position_denied_by_user() {
    let config = SimulatedDeviceConfig {
        user_grants: vec![],
        ..fast_config()
    };
    let (service, _device) = run_simulated_service(config);

    let result = service.resolve_position().await;
    assert_eq!(
        result,
        Err(AcquisitionError::PermissionDenied(Capability::Location))
    );
}

#[tokio::test]
async fn test_resolve_position_falls_back_to_live_fix() {
    let config = SimulatedDeviceConfig {
        cached_fixes: vec![],
        ..fast_config()
    };
    let (service, _device) = run_simulated_service(config);

    let fix = timeout(Duration::from_secs(2), service.resolve_position())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fix.source, FixSource::Live);
}

#[tokio::test]
async fn test_cancel_position_fails_pending_resolution() {
    let (service, _, location) = mock_service();

    let task = tokio::spawn({
        let service = Arc::clone(&service);
        async move { service.resolve_position().await }
    });
    wait_for(|| location.active_live() == 1).await;

    service.cancel_position();
    assert_eq!(location.active_live(), 0);
    assert_eq!(
        task.await.unwrap(),
        Err(AcquisitionError::NoFixAvailable)
    );
}

#[tokio::test]
async fn test_suspend_tears_down_all_subscriptions() {
    let (service, channels, location) = mock_service();

    let session = service
        .start_monitoring(&[ChannelId::Accelerometer, ChannelId::Gyroscope])
        .await
        .unwrap();
    let resolve = tokio::spawn({
        let service = Arc::clone(&service);
        async move { service.resolve_position().await }
    });
    wait_for(|| location.active_live() == 1).await;

    service.suspend();

    // No hardware listener survives the owner.
    assert_eq!(channels.active_subscriptions(), 0);
    assert_eq!(location.active_live(), 0);
    assert_eq!(session.state(), SessionState::Stopped);
    assert_eq!(
        resolve.await.unwrap(),
        Err(AcquisitionError::NoFixAvailable)
    );

    // Suspension is terminal for the session.
    let result = session.start(&[ChannelId::Accelerometer]).await;
    assert_eq!(result, Err(AcquisitionError::SessionTerminated));
}
