use domain::{DeviceClass, OnlineStatus};
use relay_storage::{
    DeviceStore, InMemoryDeviceStore, InMemoryStationStore, NewDeviceRecord, NewStationRecord,
    StationStore, StorageErrorKind,
};
use std::sync::Arc;

fn new_device(imei: &str, class: DeviceClass) -> NewDeviceRecord {
    NewDeviceRecord {
        imei: imei.to_string(),
        class,
        name: format!("device-{imei}"),
        station_id: None,
        last_seen_at_ms: Some(1_000),
        created_at_ms: 1_000,
    }
}

#[tokio::test]
async fn station_create_and_find() {
    let store = InMemoryStationStore::new();
    let created = store
        .create_station(NewStationRecord {
            name: "Station 1".to_string(),
            code: "S001".to_string(),
            ..NewStationRecord::default()
        })
        .await
        .expect("create");
    assert_eq!(created.status, 1);

    let found = store
        .find_station(created.station_id)
        .await
        .expect("find")
        .expect("station");
    assert_eq!(found.code, "S001");
    assert!(store.find_station(999).await.expect("find").is_none());

    let err = store
        .create_station(NewStationRecord {
            name: "Duplicate".to_string(),
            code: "S001".to_string(),
            ..NewStationRecord::default()
        })
        .await
        .expect_err("duplicate code");
    assert_eq!(err.kind(), StorageErrorKind::Conflict);
}

#[tokio::test]
async fn insert_if_absent_keeps_existing_row() {
    let store = InMemoryDeviceStore::new();
    let first = store
        .insert_device_if_absent(new_device("100", DeviceClass::Indoor))
        .await
        .expect("insert");
    assert!(first.inserted);
    assert_eq!(first.record.station_id, None);
    assert_eq!(first.record.battery_voltage, None);

    let second = store
        .insert_device_if_absent(new_device("100", DeviceClass::Outdoor))
        .await
        .expect("insert again");
    assert!(!second.inserted);
    assert_eq!(second.record.device_id, first.record.device_id);
    assert_eq!(second.record.class, DeviceClass::Indoor);
    assert_eq!(store.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_inserts_coalesce_to_one_row() {
    let store = Arc::new(InMemoryDeviceStore::new());
    let mut handles = Vec::new();
    for _ in 0..16 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .insert_device_if_absent(new_device("200", DeviceClass::Outdoor))
                .await
                .expect("insert")
        }));
    }
    let mut inserted = 0;
    for handle in handles {
        if handle.await.expect("join").inserted {
            inserted += 1;
        }
    }
    assert_eq!(inserted, 1);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn touch_updates_last_seen_and_optional_voltage() {
    let store = InMemoryDeviceStore::new();
    store
        .insert_device_if_absent(new_device("300", DeviceClass::Outdoor))
        .await
        .expect("insert");

    let touched = store
        .touch_device("300", 5_000, Some(3.1))
        .await
        .expect("touch")
        .expect("device");
    assert_eq!(touched.last_seen_at_ms, Some(5_000));
    assert_eq!(touched.battery_voltage, Some(3.1));

    // 未携带电压时保留上次值
    let touched = store
        .touch_device("300", 6_000, None)
        .await
        .expect("touch")
        .expect("device");
    assert_eq!(touched.last_seen_at_ms, Some(6_000));
    assert_eq!(touched.battery_voltage, Some(3.1));
    assert_eq!(touched.online_status(7_000, 10_000), OnlineStatus::Online);
    assert_eq!(touched.online_status(20_000, 10_000), OnlineStatus::Offline);

    assert!(store.touch_device("missing", 1, None).await.expect("touch").is_none());
}

#[tokio::test]
async fn station_allows_one_indoor_and_many_outdoor() {
    let store = InMemoryDeviceStore::new();
    for (imei, class) in [
        ("in-1", DeviceClass::Indoor),
        ("in-2", DeviceClass::Indoor),
        ("out-1", DeviceClass::Outdoor),
        ("out-2", DeviceClass::Outdoor),
    ] {
        store
            .insert_device_if_absent(new_device(imei, class))
            .await
            .expect("insert");
    }

    store.set_station("in-1", Some(7)).await.expect("bind indoor");
    store.set_station("out-2", Some(7)).await.expect("bind outdoor");
    store.set_station("out-1", Some(7)).await.expect("bind outdoor");

    let err = store
        .set_station("in-2", Some(7))
        .await
        .expect_err("second indoor");
    assert!(err.is_conflict());

    // 重复绑定同一台室内机不算冲突
    store.set_station("in-1", Some(7)).await.expect("rebind");

    let outdoor = store
        .list_station_devices(7, DeviceClass::Outdoor)
        .await
        .expect("list");
    let imeis: Vec<_> = outdoor.iter().map(|item| item.imei.as_str()).collect();
    assert_eq!(imeis, vec!["out-1", "out-2"]);

    let unbound = store
        .set_station("in-1", None)
        .await
        .expect("unbind")
        .expect("device");
    assert_eq!(unbound.station_id, None);
    store.set_station("in-2", Some(7)).await.expect("indoor slot free");
    assert!(store.set_station("missing", Some(7)).await.expect("set").is_none());
}
