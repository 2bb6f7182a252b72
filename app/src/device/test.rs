use super::*;
use crate::models::MemoryStore;
use crate::testing::announcement;
use std::sync::Arc;

const MAC: &str = "84:F3:EB:96:DE:CC";

fn build_directory() -> (DeviceDirectory, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (DeviceDirectory::new(store.clone()), store)
}

#[tokio::test]
async fn test_upsert_is_idempotent() {
    // prepare
    let (directory, _store) = build_directory();

    // execute
    let first = directory
        .upsert(announcement(MAC, "192.168.0.12"))
        .await
        .unwrap();
    let second = directory
        .upsert(announcement(MAC, "192.168.0.12"))
        .await
        .unwrap();

    // validate
    assert_eq!(Upsert::Created, first);
    assert_eq!(Upsert::Unchanged, second);
    assert_eq!(1, directory.list().await.unwrap().len());
}

#[tokio::test]
async fn test_upsert_new_address() {
    // prepare
    let (directory, _store) = build_directory();
    directory
        .upsert(announcement(MAC, "192.168.0.12"))
        .await
        .unwrap();

    // execute
    let res = directory
        .upsert(announcement(&MAC.to_lowercase(), "192.168.0.40"))
        .await
        .unwrap();

    // validate
    assert_eq!(Upsert::Updated, res);
    let device = directory.lookup(MAC).await.unwrap();
    assert_eq!("192.168.0.40", device.latest_address().as_str());
    assert_eq!(1, directory.list().await.unwrap().len());
}

#[tokio::test]
async fn test_upsert_new_capabilities() {
    // prepare
    let (directory, _store) = build_directory();
    directory
        .upsert(announcement(MAC, "192.168.0.12"))
        .await
        .unwrap();
    let mut changed = announcement(MAC, "192.168.0.12");
    changed.capabilities = vec![2, 0, 1, 2];

    // execute
    let res = directory.upsert(changed).await.unwrap();

    // validate
    assert_eq!(Upsert::Updated, res);
    let device = directory.lookup(MAC).await.unwrap();
    assert_eq!(&vec![0, 1, 2], device.sensor_capabilities());
}

#[tokio::test]
async fn test_concurrent_first_contact() {
    // prepare
    let (directory, _store) = build_directory();

    // execute
    let upserts = (0..8).map(|_| {
        let directory = directory.clone();
        tokio::spawn(async move { directory.upsert(announcement(MAC, "192.168.0.12")).await })
    });
    let results: Vec<Upsert> = futures::future::join_all(upserts)
        .await
        .into_iter()
        .map(|res| res.unwrap().unwrap())
        .collect();

    // validate
    assert_eq!(1, results.iter().filter(|r| **r == Upsert::Created).count());
    assert_eq!(1, directory.list().await.unwrap().len());
}

#[tokio::test]
async fn test_upsert_validation() {
    // prepare
    let (directory, _store) = build_directory();
    let mut no_type = announcement(MAC, "192.168.0.12");
    no_type.dev_type = String::new();
    let mut negative_sensor = announcement(MAC, "192.168.0.12");
    negative_sensor.capabilities = vec![0, -1];

    // execute
    let bad_mac = directory.upsert(announcement("84:F3:EB", "192.168.0.12")).await;
    let no_address = directory.upsert(announcement(MAC, " ")).await;
    let no_type = directory.upsert(no_type).await;
    let negative_sensor = directory.upsert(negative_sensor).await;

    // validate
    assert!(matches!(
        bad_mac,
        Err(RegistryError::Validation(ValidationError::Malformed("mac", _)))
    ));
    assert!(matches!(
        no_address,
        Err(RegistryError::Validation(ValidationError::Missing("session_ip")))
    ));
    assert!(matches!(
        no_type,
        Err(RegistryError::Validation(ValidationError::Missing("dev_type")))
    ));
    assert!(matches!(
        negative_sensor,
        Err(RegistryError::Validation(ValidationError::Malformed(
            "sensors_detected",
            _
        )))
    ));
    assert!(directory.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_lookup_unknown() {
    // prepare
    let (directory, _store) = build_directory();

    // execute
    let res = directory.lookup("84-f3-eb-96-de-00").await;

    // validate
    assert!(matches!(res, Err(RegistryError::DeviceNotFound(mac)) if mac == "84:F3:EB:96:DE:00"));
}

#[test]
fn test_parse_mac() {
    assert_eq!(Ok(MAC.to_owned()), parse_mac("84-f3-eb-96-de-cc"));
    assert_eq!(Err(ValidationError::Missing("mac")), parse_mac(""));
    assert!(parse_mac("84:F3:EB:96:DE:CG").is_err());
    assert!(parse_mac("84:F3:EB:96:DE:CC:00").is_err());
}
