//! Property tests for storing, querying and sweeping readings.

use airhub_store::{ReadingQuery, Store};
use airhub_types::{DeviceSnapshot, Reading, ReadingType};
use proptest::prelude::*;
use time::macros::datetime;
use time::{Duration, OffsetDateTime};

const NOW: OffsetDateTime = datetime!(2025-06-30 12:00:00 UTC);

fn arb_type() -> impl Strategy<Value = ReadingType> {
    prop::sample::select(ReadingType::ALL.to_vec())
}

/// A reading within 60 days before `NOW`, at whole-minute offsets so ties occur.
fn arb_reading() -> impl Strategy<Value = Reading> {
    (
        prop::sample::select(vec!["d1", "d2", "d3"]),
        0i64..(60 * 24 * 60),
        arb_type(),
        -40.0f64..1000.0,
        prop::option::of(prop::sample::select(vec!["Kitchen", "Bedroom"])),
    )
        .prop_map(|(device, minutes_ago, reading_type, value, room)| {
            let reading = Reading::new(
                device,
                format!("Sensor {}", device),
                NOW - Duration::minutes(minutes_ago),
                reading_type,
                value,
            );
            match room {
                Some(room) => reading.in_room(room),
                None => reading,
            }
        })
}

fn store_with(readings: &[Reading]) -> Store {
    let store = Store::open_in_memory().unwrap();
    let result = store.put_batch(readings).unwrap();
    assert!(result.is_complete());
    store
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn put_then_query_returns_the_reading(reading in arb_reading()) {
        let store = Store::open_in_memory().unwrap();
        store.put(&reading).unwrap();

        let query = ReadingQuery::new()
            .device(&reading.device_id)
            .reading_type(reading.reading_type)
            .range(reading.timestamp, reading.timestamp);
        let found = store.query(&query).unwrap();

        prop_assert_eq!(found, vec![reading]);
    }

    #[test]
    fn query_results_are_newest_first(
        readings in prop::collection::vec(arb_reading(), 0..60),
        device in prop::option::of(prop::sample::select(vec!["d1", "d2"])),
    ) {
        let store = store_with(&readings);
        let mut query = ReadingQuery::new();
        if let Some(device) = device {
            query = query.device(device);
        }

        let found = store.query(&query).unwrap();
        for pair in found.windows(2) {
            prop_assert!(pair[0].timestamp >= pair[1].timestamp);
        }
    }

    #[test]
    fn pages_concatenate_to_the_full_result(
        readings in prop::collection::vec(arb_reading(), 0..60),
        page_size in 1u32..8,
        types in prop::collection::vec(arb_type(), 0..3),
    ) {
        let store = store_with(&readings);
        let base = ReadingQuery::new().types(types);
        let full = store.query_stored(&base).unwrap();

        let mut paged = Vec::new();
        let mut offset = 0;
        loop {
            let page = store
                .query_stored(&base.clone().limit(page_size).offset(offset))
                .unwrap();
            prop_assert!(page.len() <= page_size as usize);
            let done = page.len() < page_size as usize;
            paged.extend(page);
            if done {
                break;
            }
            offset += page_size;
        }

        prop_assert_eq!(paged, full);
    }

    #[test]
    fn ingest_stores_one_reading_per_measurement(
        temperature in prop::option::of(-40.0f64..60.0),
        humidity in prop::option::of(0.0f64..100.0),
        pm25 in prop::option::of(0.0f64..500.0),
        voc_index in prop::option::of(1.0f64..500.0),
        minutes_ago in 0i64..(60 * 24 * 60),
    ) {
        let store = Store::open_in_memory().unwrap();
        let snapshot = DeviceSnapshot {
            temperature,
            humidity,
            pm25,
            voc_index,
            ..DeviceSnapshot::new("d1", "Sensor d1", NOW - Duration::minutes(minutes_ago))
        };
        let present = [temperature, humidity, pm25, voc_index]
            .iter()
            .filter(|v| v.is_some())
            .count();

        let result = store.ingest(&snapshot).unwrap();

        prop_assert!(result.is_complete());
        prop_assert_eq!(result.inserted_count(), present);
        prop_assert_eq!(store.count(Some("d1")).unwrap() as usize, present);
    }

    #[test]
    fn sweep_removes_exactly_the_expired_readings(
        readings in prop::collection::vec(arb_reading(), 0..60),
    ) {
        let store = store_with(&readings);
        let cutoff = NOW - Duration::days(30);

        let expected_deleted = readings.iter().filter(|r| r.timestamp <= cutoff).count();
        let deleted = store.sweep(NOW).unwrap();
        prop_assert_eq!(deleted as usize, expected_deleted);

        let remaining = store.query(&ReadingQuery::new()).unwrap();
        prop_assert_eq!(remaining.len(), readings.len() - expected_deleted);
        prop_assert!(remaining.iter().all(|r| r.timestamp > cutoff));
    }
}
