use std::collections::HashSet;
use std::time::Duration;

use board_common::command::Priority;
use board_common::{Quote, QuoteField};
use board_engine::{EngineConfig, QuoteStore, StoreEvent};

fn batch(prefix: &str, count: usize) -> Vec<Quote> {
    (0..count)
        .map(|i| {
            Quote::new(format!("{}{}", prefix, i))
                .with(QuoteField::MatchPrice, "10.5")
                .with(QuoteField::Ref, "10")
                .with(QuoteField::Ceiling, "11")
                .with(QuoteField::Floor, "9")
                .with(QuoteField::MatchChange, "0.5")
        })
        .collect()
}

fn started_store() -> QuoteStore {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = EngineConfig {
        chunk_size: 50,
        ..Default::default()
    };
    let mut store = QuoteStore::new(config).unwrap();
    store.initialize();
    assert!(!store.is_degraded());
    store
}

#[test]
fn newer_batch_wins_over_slow_older_one() {
    let mut store = started_store();
    // low priority stretches batch A over several chunk pauses
    store.set_priority(Priority::Low);
    let events = store.subscribe();

    let a = store.push_batch(batch("A", 200));
    let b = store.push_batch(batch("B", 50));
    assert!(a < b);
    assert!(store.wait_idle(Duration::from_secs(10)));

    let b_codes: HashSet<String> = (0..50).map(|i| format!("B{}", i)).collect();
    for code in &b_codes {
        assert!(store.styles(code).is_some(), "missing styles for {}", code);
    }
    for i in 0..200 {
        assert!(store.styles(&format!("A{}", i)).is_none());
    }

    let filtered: HashSet<String> = store.filtered().iter().map(|q| q.code.clone()).collect();
    assert_eq!(filtered, b_codes);
    let previous: HashSet<String> = store.previous_values().keys().cloned().collect();
    assert_eq!(previous, b_codes);

    let summary = store.metrics().color.clone().unwrap();
    assert_eq!(summary.batch_timestamp, b);
    assert_eq!(summary.stock_count, 50);
    assert_eq!(summary.chunk_count, 1);

    for event in events.try_iter() {
        match event {
            StoreEvent::StylesChanged { batch_timestamp, .. }
            | StoreEvent::BatchCompleted { batch_timestamp, .. }
            | StoreEvent::FilteredDataChanged { batch_timestamp, .. } => {
                assert_eq!(batch_timestamp, b)
            }
            _ => {}
        }
    }
    store.terminate();
}

#[test]
fn rapid_batches_settle_on_the_last_one() {
    let mut store = started_store();
    let mut last = 0;
    for round in 0..10 {
        last = store.push_batch(batch(&format!("R{}-", round), 120));
    }
    assert!(store.wait_idle(Duration::from_secs(10)));

    assert_eq!(store.metrics().color.as_ref().unwrap().batch_timestamp, last);
    assert_eq!(store.filtered().len(), 120);
    assert!(store.filtered().iter().all(|q| q.code.starts_with("R9-")));
    assert!(store.styles("R9-0").is_some());
    assert!(store.styles("R8-0").is_none());
    store.terminate();
}

#[test]
fn filter_changes_resolve_to_the_latest_query() {
    let mut store = started_store();
    store.push_batch(batch("S", 30));
    store.set_search_query("s1");
    store.set_search_query("s2");
    store.set_search_query("s29");
    assert!(store.wait_idle(Duration::from_secs(10)));

    let codes: Vec<&str> = store.filtered().iter().map(|q| q.code.as_str()).collect();
    assert_eq!(codes, vec!["S29"]);
    assert_eq!(store.metrics().filter.items_in, 30);
    assert_eq!(store.metrics().filter.items_out, 1);
    store.terminate();
}
