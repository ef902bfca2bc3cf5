use std::time::Duration;

use board_common::filters::{SortConfig, SortDirection};
use board_common::{Quote, QuoteField};
use board_engine::{EngineConfig, QuoteStore, StoreEvent};

fn quote(code: &str, price: &str, volume: &str) -> Quote {
    Quote::new(code)
        .with(QuoteField::MatchPrice, price)
        .with(QuoteField::Ref, "20")
        .with(QuoteField::Ceiling, "21.4")
        .with(QuoteField::Floor, "18.6")
        .with(QuoteField::TotalVolume, volume)
}

#[test]
fn workers_start_process_and_stop() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut store = QuoteStore::new(EngineConfig::default()).unwrap();
    store.initialize();
    assert!(!store.is_degraded());
    let events = store.subscribe();

    store.set_sort(SortConfig::by(QuoteField::TotalVolume, SortDirection::Desc));
    store.push_batch(vec![
        quote("VNM", "21.4", "1,200"),
        quote("FPT", "18.6", "5,000"),
        quote("HPG", "20", "--"),
    ]);
    assert!(store.wait_idle(Duration::from_secs(5)));

    let codes: Vec<&str> = store.filtered().iter().map(|q| q.code.as_str()).collect();
    assert_eq!(codes, vec!["FPT", "VNM", "HPG"]);
    let color = |code: &str| store.styles(code).unwrap().price_colors[&QuoteField::MatchPrice].clone();
    assert_eq!(color("VNM"), "text-fuchsia-500");
    assert_eq!(color("FPT"), "text-cyan-500");
    assert_eq!(color("HPG"), "text-yellow-500");

    let received: Vec<StoreEvent> = events.try_iter().collect();
    assert!(received.iter().any(|e| matches!(e, StoreEvent::BatchCompleted { stock_count: 3, .. })));

    // next batch animates against the previous one
    store.push_batch(vec![
        quote("VNM", "21", "1,500"),
        quote("FPT", "19", "5,000"),
        quote("HPG", "20", "--"),
    ]);
    assert!(store.wait_idle(Duration::from_secs(5)));
    let vnm = store.styles("VNM").unwrap();
    assert_eq!(vnm.animations[&QuoteField::MatchPrice], "price-down");
    assert_eq!(vnm.animations[&QuoteField::TotalVolume], "volume-up");
    assert_eq!(store.styles("FPT").unwrap().animations[&QuoteField::MatchPrice], "price-up");
    assert!(store.styles("HPG").unwrap().animations.is_empty());

    store.terminate();
    assert!(store.is_degraded());

    // after termination the same work runs inline
    store.push_batch(vec![quote("ACB", "20.5", "100")]);
    assert!(store.is_idle());
    assert_eq!(store.filtered().len(), 1);
    assert!(store.styles("ACB").is_some());
}

#[test]
fn theme_switch_recolors_through_the_worker() {
    let mut store = QuoteStore::new(EngineConfig::default()).unwrap();
    store.initialize();
    store.push_batch(vec![quote("VNM", "19", "100")]);
    assert!(store.wait_idle(Duration::from_secs(5)));
    assert_eq!(
        store.styles("VNM").unwrap().price_colors[&QuoteField::MatchPrice],
        "text-red-600"
    );

    store.set_dark_mode(true);
    assert!(store.wait_idle(Duration::from_secs(5)));
    let styles = store.styles("VNM").unwrap();
    assert_eq!(styles.price_colors[&QuoteField::MatchPrice], "text-red-400");
    assert!(styles.animations.is_empty());
}

#[test]
fn idle_wait_returns_at_once_when_nothing_is_pending() {
    let mut store = QuoteStore::new(EngineConfig::default()).unwrap();
    store.initialize();
    // nothing dispatched yet
    assert!(store.wait_idle(Duration::from_millis(1)));
}
