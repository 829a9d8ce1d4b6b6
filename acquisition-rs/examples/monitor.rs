use std::sync::Arc;

use tokio::time::Duration;

use acquisition_rs::services::run_simulated_service;
use common::types::channel::ChannelId;
use common::types::snapshot::Snapshot;

#[tokio::main]
async fn main() {
    env_logger::init();

    let (service, _device) = run_simulated_service(Default::default());

    println!("Hardware inventory:");
    match service.registry().list_available().await {
        Ok(inventory) => {
            for descriptor in inventory {
                println!("  {}", descriptor);
            }
        }
        Err(e) => {
            eprintln!("Inventory query failed: {:?}", e);
            return;
        }
    }

    // Start monitoring sessions
    let session = match service
        .start_monitoring(&[
            ChannelId::Accelerometer,
            ChannelId::Gyroscope,
            ChannelId::Light,
        ])
        .await
    {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Could not start monitoring: {:?}", e);
            return;
        }
    };

    session.register_observer(|snapshot: Arc<Snapshot>| {
        for reading in snapshot.entries() {
            println!(
                "  {:>13} t={:.2}s {:?}",
                reading.channel().name(),
                reading.timestamp(),
                reading.values().as_slice()
            );
        }
        println!();
    });

    match service.resolve_position().await {
        Ok(fix) => println!(
            "Position: {:.4}, {:.4} via {} ({:?})",
            fix.latitude, fix.longitude, fix.provider, fix.source
        ),
        Err(e) => println!("Position unavailable: {:?}", e),
    }

    tokio::time::sleep(Duration::from_secs(2)).await;
    service.suspend();
}
