use domain::DeviceClass;
use relay_registry::{DeviceRegistry, RegistryError, placeholder_name};
use relay_storage::{
    DeviceStore, InMemoryDeviceStore, InMemoryStationStore, NewStationRecord, StationStore,
};
use std::sync::Arc;

struct Fixture {
    registry: DeviceRegistry,
    devices: Arc<InMemoryDeviceStore>,
    stations: Arc<InMemoryStationStore>,
}

fn fixture() -> Fixture {
    let devices = Arc::new(InMemoryDeviceStore::new());
    let stations = Arc::new(InMemoryStationStore::new());
    let registry = DeviceRegistry::new(devices.clone(), stations.clone());
    Fixture {
        registry,
        devices,
        stations,
    }
}

async fn create_station(stations: &InMemoryStationStore, code: &str) -> i64 {
    stations
        .create_station(NewStationRecord {
            name: format!("Station {code}"),
            code: code.to_string(),
            ..NewStationRecord::default()
        })
        .await
        .expect("station")
        .station_id
}

#[tokio::test]
async fn first_contact_registers_unbound_device() {
    let fx = fixture();
    let device = fx
        .registry
        .resolve_or_register("860000000000001", DeviceClass::Outdoor)
        .await
        .expect("register");
    assert_eq!(device.class, DeviceClass::Outdoor);
    assert_eq!(device.station_id, None);
    assert_eq!(device.name, placeholder_name("860000000000001"));
    assert!(device.last_seen_at_ms.is_some());
    assert_eq!(fx.devices.len(), 1);
}

#[tokio::test]
async fn existing_device_keeps_stored_class() {
    let fx = fixture();
    let first = fx
        .registry
        .resolve_or_register("1", DeviceClass::Indoor)
        .await
        .expect("register");
    let again = fx
        .registry
        .resolve_or_register("1", DeviceClass::Outdoor)
        .await
        .expect("resolve");
    assert_eq!(again.device_id, first.device_id);
    assert_eq!(again.class, DeviceClass::Indoor);
    assert_eq!(fx.devices.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_contact_creates_one_row() {
    let fx = fixture();
    let mut handles = Vec::new();
    for _ in 0..32 {
        let registry = fx.registry.clone();
        handles.push(tokio::spawn(async move {
            registry
                .resolve_or_register("race-imei", DeviceClass::Indoor)
                .await
                .expect("register")
                .device_id
        }));
    }
    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.expect("join"));
    }
    ids.dedup();
    assert_eq!(ids.len(), 1);
    assert_eq!(fx.devices.len(), 1);
}

#[tokio::test]
async fn bind_enforces_station_rules() {
    let fx = fixture();
    let s1 = create_station(&fx.stations, "S1").await;
    let s2 = create_station(&fx.stations, "S2").await;
    for (imei, class) in [
        ("in-1", DeviceClass::Indoor),
        ("in-2", DeviceClass::Indoor),
        ("out-1", DeviceClass::Outdoor),
    ] {
        fx.registry
            .resolve_or_register(imei, class)
            .await
            .expect("register");
    }

    let bound = fx.registry.bind("in-1", s1).await.expect("bind");
    assert_eq!(bound.station_id, Some(s1));
    fx.registry.bind("in-1", s1).await.expect("idempotent bind");

    let err = fx.registry.bind("in-2", s1).await.expect_err("indoor taken");
    assert!(matches!(err, RegistryError::IndoorTaken { imei, .. } if imei == "in-1"));

    let err = fx.registry.bind("in-1", s2).await.expect_err("already bound");
    assert!(matches!(err, RegistryError::AlreadyBound { station_id, .. } if station_id == s1));

    let err = fx.registry.bind("out-1", 999).await.expect_err("no station");
    assert!(matches!(err, RegistryError::StationNotFound(999)));

    let err = fx.registry.bind("ghost", s1).await.expect_err("no device");
    assert!(matches!(err, RegistryError::DeviceNotFound(_)));

    fx.registry.bind("out-1", s1).await.expect("outdoor bind");
    let unbound = fx.registry.unbind("in-1").await.expect("unbind");
    assert_eq!(unbound.station_id, None);
    fx.registry.bind("in-2", s1).await.expect("slot free after unbind");

    let outdoor = fx
        .devices
        .list_station_devices(s1, DeviceClass::Outdoor)
        .await
        .expect("list");
    assert_eq!(outdoor.len(), 1);
}

#[tokio::test]
async fn unbind_unknown_device_reports_not_found() {
    let fx = fixture();
    let err = fx.registry.unbind("ghost").await.expect_err("no device");
    assert!(matches!(err, RegistryError::DeviceNotFound(imei) if imei == "ghost"));
    assert!(fx.devices.is_empty());
}
