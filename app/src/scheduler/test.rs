use super::*;
use crate::models::{MemoryStore, Store};
use crate::testing::{
    announcement, build_hub_with, build_mocked_hub, plant, unreachable_address, BrokenStore,
    FakeDevice,
};
use chrono::Utc;
use std::time::Instant;

const MAC_A: &str = "84:F3:EB:96:DE:01";
const MAC_B: &str = "84:F3:EB:96:DE:02";

#[tokio::test]
async fn test_install_reachable_device() {
    // prepare
    let hub = build_mocked_hub();
    let device = FakeDevice::spawn().await;

    // execute
    let state = hub
        .scheduler
        .install("plantAAA", device.address(), Duration::from_millis(200), 1)
        .await;
    tokio::time::sleep(Duration::from_millis(700)).await;

    // validate
    assert_eq!(JobState::Scheduled, state);
    assert_eq!(JobState::Scheduled, hub.scheduler.state("plantAAA"));
    assert!(device.pulls() >= 2);
    assert_eq!(Some("plantAAA".to_owned()), device.last_plant_id());

    let now = Utc::now();
    let readings = hub
        .readings
        .for_plant(
            "plantAAA",
            now - chrono::Duration::minutes(1),
            now + chrono::Duration::minutes(1),
        )
        .await
        .unwrap();
    assert!(!readings.is_empty());
    assert_eq!(1, readings[0].sensor_index());
    let snapshot = &hub.scheduler.jobs()[0];
    assert!(snapshot.firings >= 2);
    assert!(snapshot.last_success_at.is_some());
}

#[tokio::test]
async fn test_first_firing_after_one_interval() {
    // prepare
    let hub = build_mocked_hub();
    let device = FakeDevice::spawn().await;

    // execute
    hub.scheduler
        .install("plantAAA", device.address(), Duration::from_secs(1), 0)
        .await;
    tokio::time::sleep(Duration::from_millis(500)).await;

    // validate
    assert_eq!(0, device.pulls());
}

#[tokio::test]
async fn test_install_twice_keeps_one_job() {
    // prepare
    let hub = build_mocked_hub();
    let device = FakeDevice::spawn().await;

    // execute
    for secs in [60, 30] {
        let state = hub
            .scheduler
            .install("plantAAA", device.address(), Duration::from_secs(secs), 0)
            .await;
        assert_eq!(JobState::Scheduled, state);
    }

    // validate
    assert_eq!(1, hub.scheduler.len());
    let target = hub.scheduler.target("plantAAA").unwrap();
    assert_eq!(Duration::from_secs(30), target.interval);
}

#[tokio::test]
async fn test_concurrent_installs_keep_one_job() {
    // prepare
    let hub = build_mocked_hub();
    let device = FakeDevice::spawn().await;

    // execute
    let installs = (1..=8).map(|secs| {
        let scheduler = hub.scheduler.clone();
        let address = device.address().to_owned();
        tokio::spawn(async move {
            scheduler
                .install("plantAAA", &address, Duration::from_secs(secs), 0)
                .await
        })
    });
    for res in futures::future::join_all(installs).await {
        assert_eq!(JobState::Scheduled, res.unwrap());
    }

    // validate
    assert_eq!(1, hub.scheduler.len());
}

#[tokio::test]
async fn test_install_unreachable_device() {
    // prepare
    let hub = build_mocked_hub();

    // execute
    let state = hub
        .scheduler
        .install("plantAAA", &unreachable_address(), Duration::from_secs(1), 0)
        .await;

    // validate
    assert_eq!(JobState::Absent, state);
    assert_eq!(0, hub.scheduler.len());
}

#[tokio::test]
async fn test_install_ping_timeout() {
    // prepare
    let hub = build_mocked_hub();
    let healthy = FakeDevice::spawn().await;
    let stuck = FakeDevice::builder()
        .ping_delay(Duration::from_secs(5))
        .spawn()
        .await;
    hub.scheduler
        .install("plantAAA", healthy.address(), Duration::from_secs(60), 0)
        .await;

    // execute
    let start = Instant::now();
    let state = hub
        .scheduler
        .install("plantBBB", stuck.address(), Duration::from_secs(60), 0)
        .await;

    // validate
    assert_eq!(JobState::Absent, state);
    assert!(start.elapsed() < Duration::from_secs(2));
    assert_eq!(1, stuck.pings());
    assert_eq!(1, hub.scheduler.len());
    assert_eq!(JobState::Scheduled, hub.scheduler.state("plantAAA"));
}

#[tokio::test]
async fn test_install_failing_ping_status() {
    // prepare
    let hub = build_mocked_hub();
    let device = FakeDevice::builder().ping_status(503).spawn().await;

    // execute
    let state = hub
        .scheduler
        .install("plantAAA", device.address(), Duration::from_secs(1), 0)
        .await;

    // validate
    assert_eq!(JobState::Absent, state);
}

#[tokio::test]
async fn test_reinstall_unreachable_drops_job() {
    // prepare
    let hub = build_mocked_hub();
    let device = FakeDevice::spawn().await;
    hub.scheduler
        .install("plantAAA", device.address(), Duration::from_secs(60), 0)
        .await;

    // execute
    let state = hub
        .scheduler
        .install("plantAAA", &unreachable_address(), Duration::from_secs(60), 0)
        .await;

    // validate
    assert_eq!(JobState::Absent, state);
    assert_eq!(0, hub.scheduler.len());
}

#[tokio::test]
async fn test_zero_interval_is_absent() {
    // prepare
    let hub = build_mocked_hub();
    let device = FakeDevice::spawn().await;

    // execute
    let state = hub
        .scheduler
        .install("plantAAA", device.address(), Duration::ZERO, 0)
        .await;

    // validate
    assert_eq!(JobState::Absent, state);
    assert_eq!(0, device.pings());
}

#[tokio::test]
async fn test_remove_stops_pulls() {
    // prepare
    let hub = build_mocked_hub();
    let device = FakeDevice::spawn().await;
    hub.scheduler
        .install("plantAAA", device.address(), Duration::from_secs(1), 0)
        .await;

    // execute
    let removed = hub.scheduler.remove("plantAAA").await;
    tokio::time::sleep(Duration::from_secs(3)).await;

    // validate
    assert!(removed);
    assert_eq!(0, device.pulls());
    assert_eq!(JobState::Absent, hub.scheduler.state("plantAAA"));
}

#[tokio::test]
async fn test_remove_is_idempotent() {
    // prepare
    let hub = build_mocked_hub();

    // execute
    let first = hub.scheduler.remove("plantAAA").await;
    let second = hub.scheduler.remove("plantAAA").await;

    // validate
    assert!(!first);
    assert!(!second);
    assert_eq!(0, hub.scheduler.len());
}

#[tokio::test]
async fn test_interval_change_applies_to_next_firing() {
    // prepare
    let hub = build_mocked_hub();
    let device = FakeDevice::spawn().await;
    hub.scheduler
        .install("plantAAA", device.address(), Duration::from_secs(60), 0)
        .await;

    // execute
    hub.scheduler
        .install("plantAAA", device.address(), Duration::from_millis(300), 0)
        .await;
    let installed = Instant::now();
    tokio::time::sleep(Duration::from_millis(1_000)).await;

    // validate
    let times = device.pull_times();
    assert!(times.len() >= 2);
    assert!(times[0] - installed >= Duration::from_millis(250));
    assert!(times[1] - times[0] < Duration::from_millis(600));
}

#[tokio::test]
async fn test_failed_pulls_keep_firing() {
    // prepare
    let hub = build_mocked_hub();
    let device = FakeDevice::builder().malformed_data().spawn().await;

    // execute
    hub.scheduler
        .install("plantAAA", device.address(), Duration::from_millis(200), 0)
        .await;
    tokio::time::sleep(Duration::from_millis(900)).await;

    // validate
    assert!(device.pulls() >= 2);
    let snapshot = &hub.scheduler.jobs()[0];
    assert!(snapshot.failures >= 2);
    assert!(snapshot.last_success_at.is_none());
}

#[tokio::test]
async fn test_reconcile_follows_stored_plant() {
    // prepare
    let store = Arc::new(MemoryStore::new());
    let hub = build_hub_with(store.clone());
    let device = FakeDevice::spawn().await;
    hub.devices
        .upsert(announcement(MAC_A, device.address()))
        .await
        .unwrap();
    let mut plant = plant("plantAAA", MAC_A, 60, true);
    store.insert_plant(&plant).await.unwrap();

    // execute
    let enabled = hub.scheduler.reconcile(&plant).await.unwrap();
    plant.polling_enabled = false;
    store.update_plant(&plant).await.unwrap();
    let disabled = hub.scheduler.reconcile(&plant).await.unwrap();

    // validate
    assert_eq!(JobState::Scheduled, enabled);
    assert_eq!(JobState::Absent, disabled);
    assert_eq!(0, hub.scheduler.len());
}

#[tokio::test]
async fn test_reconcile_missing_device() {
    // prepare
    let store = Arc::new(MemoryStore::new());
    let hub = build_hub_with(store.clone());
    let plant = plant("plantAAA", MAC_A, 60, true);
    store.insert_plant(&plant).await.unwrap();

    // execute
    let state = hub.scheduler.reconcile(&plant).await.unwrap();

    // validate
    assert_eq!(JobState::Absent, state);
    assert_eq!(0, hub.scheduler.len());
}

#[tokio::test]
async fn test_plant_locks_released() {
    // prepare
    let store = Arc::new(MemoryStore::new());
    let hub = build_hub_with(store.clone());
    let device = FakeDevice::spawn().await;
    hub.devices
        .upsert(announcement(MAC_B, device.address()))
        .await
        .unwrap();
    let orphan = plant("plantAAA", MAC_A, 60, true);
    let disabled = plant("plantBBB", MAC_B, 60, false);
    let enabled = plant("plantCCC", MAC_B, 60, true);
    for p in [&orphan, &disabled, &enabled] {
        store.insert_plant(p).await.unwrap();
    }

    // execute
    hub.scheduler
        .install("plantDDD", &unreachable_address(), Duration::from_secs(1), 0)
        .await;
    hub.scheduler
        .install("plantEEE", device.address(), Duration::ZERO, 0)
        .await;
    for p in [&orphan, &disabled, &enabled] {
        hub.scheduler.reconcile(p).await.unwrap();
    }

    // validate
    assert_eq!(1, hub.scheduler.len());
    assert_eq!(JobState::Scheduled, hub.scheduler.state("plantCCC"));
    assert!(hub.scheduler.plant_locks.lock().is_empty());
}

#[tokio::test]
async fn test_reconcile_deleted_plant() {
    // prepare
    let hub = build_mocked_hub();
    let device = FakeDevice::spawn().await;
    hub.devices
        .upsert(announcement(MAC_A, device.address()))
        .await
        .unwrap();
    hub.scheduler
        .install("plantAAA", device.address(), Duration::from_secs(60), 1)
        .await;

    // execute
    let state = hub
        .scheduler
        .reconcile(&plant("plantAAA", MAC_A, 60, true))
        .await
        .unwrap();

    // validate
    assert_eq!(JobState::Absent, state);
    assert_eq!(0, hub.scheduler.len());
}

#[tokio::test]
async fn test_reconcile_uses_latest_address() {
    // prepare
    let store = Arc::new(MemoryStore::new());
    let hub = build_hub_with(store.clone());
    let old = FakeDevice::spawn().await;
    let new = FakeDevice::spawn().await;
    hub.devices
        .upsert(announcement(MAC_A, old.address()))
        .await
        .unwrap();
    let plant = plant("plantAAA", MAC_A, 60, true);
    store.insert_plant(&plant).await.unwrap();
    hub.scheduler.reconcile(&plant).await.unwrap();

    // execute
    hub.devices
        .upsert(announcement(MAC_A, new.address()))
        .await
        .unwrap();
    hub.scheduler.reconcile(&plant).await.unwrap();

    // validate
    let target = hub.scheduler.target("plantAAA").unwrap();
    assert_eq!(new.address(), target.device_address);
    assert_eq!(1, hub.scheduler.len());
}

#[tokio::test]
async fn test_bootstrap_skips_unreachable() {
    // prepare
    let store = Arc::new(MemoryStore::new());
    let hub = build_hub_with(store.clone());
    let device = FakeDevice::spawn().await;
    hub.devices
        .upsert(announcement(MAC_A, device.address()))
        .await
        .unwrap();
    hub.devices
        .upsert(announcement(MAC_B, &unreachable_address()))
        .await
        .unwrap();
    store
        .insert_plant(&plant("plantAAA", MAC_A, 60, true))
        .await
        .unwrap();
    store
        .insert_plant(&plant("plantBBB", MAC_B, 60, true))
        .await
        .unwrap();
    store
        .insert_plant(&plant("plantCCC", MAC_A, 60, false))
        .await
        .unwrap();
    store
        .insert_plant(&plant("plantDDD", "84:F3:EB:96:DE:FF", 60, true))
        .await
        .unwrap();

    // execute
    let restored = hub.restore_jobs().await;

    // validate
    assert_eq!(1, restored);
    assert_eq!(1, hub.scheduler.len());
    assert_eq!(JobState::Scheduled, hub.scheduler.state("plantAAA"));
}

#[tokio::test]
async fn test_bootstrap_with_broken_store() {
    // prepare
    let hub = build_hub_with(Arc::new(BrokenStore));

    // execute
    let restored = hub.restore_jobs().await;

    // validate
    assert_eq!(0, restored);
    assert_eq!(0, hub.scheduler.len());
}

#[tokio::test]
async fn test_shutdown_cancels_all() {
    // prepare
    let hub = build_mocked_hub();
    let device = FakeDevice::spawn().await;
    for plant_id in ["plantAAA", "plantBBB"] {
        hub.scheduler
            .install(plant_id, device.address(), Duration::from_millis(300), 0)
            .await;
    }

    // execute
    hub.shutdown();
    tokio::time::sleep(Duration::from_millis(800)).await;

    // validate
    assert_eq!(0, hub.scheduler.len());
    assert_eq!(0, device.pulls());
}
