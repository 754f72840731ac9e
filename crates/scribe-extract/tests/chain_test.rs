use scribe_browser::fake::{FakeDom, FakePage};
use scribe_core::{AppConfig, Item, ItemId};
use scribe_extract::{ExtractionChain, Method};
use scribe_ledger::{EntryStatus, Ledger, SharedLedger};
use serde_json::json;
use tempfile::TempDir;

struct Fixture {
    _tmp: TempDir,
    config: AppConfig,
    ledger: SharedLedger,
    item: Item,
}

fn fixture() -> Fixture {
    let tmp = TempDir::new().expect("create temp dir");
    let mut config = AppConfig::default();
    config.paths.output_dir = tmp.path().join("downloads");
    config.download.strategy_gap_ms = 0;

    let item = Item::new(
        ItemId::new("Xk3jdP9qLm2AbCdEfGh").expect("valid id"),
        "Design review",
        "https://otter.ai/u/Xk3jdP9qLm2AbCdEfGh",
    );
    let mut ledger = Ledger::load(tmp.path().join("state.json"));
    ledger.register(&item).expect("register");

    Fixture {
        _tmp: tmp,
        config,
        ledger: SharedLedger::new(ledger),
        item,
    }
}

fn transcript() -> String {
    (0..10)
        .map(|i| format!("Speaker {i}: we should ship the thing on time"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[tokio::test]
async fn test_first_strategy_success_stops_the_chain() {
    let fx = fixture();
    let page = FakePage::with_dom(FakeDom::new().element(".otter-transcript-container", &transcript()));

    let harvest = ExtractionChain::sequential(&fx.config)
        .run(&page, &fx.item, &fx.ledger)
        .await
        .expect("chain runs")
        .expect("harvested");

    assert_eq!(harvest.method, Method::DirectText);
    assert_eq!(harvest.path.extension().unwrap(), "txt");
    assert!(harvest.path.exists());

    let ledger = fx.ledger.lock().await;
    let attempts = ledger.attempts(&fx.item.id);
    assert_eq!(attempts.len(), 1);
    assert!(attempts[0].success);

    let entry = ledger.entry(&fx.item.id).expect("entry");
    assert_eq!(entry.status, EntryStatus::Success);
    assert_eq!(entry.method_used.as_deref(), Some("direct_text"));
    assert_eq!(entry.file_size, Some(harvest.size));
}

#[tokio::test]
async fn test_structured_data_after_direct_text_declines() {
    let fx = fixture();
    let state = json!({
        "props": {"pageProps": {"transcript": "z".repeat(600)}},
        "buildId": "b".repeat(500),
    });
    let page = FakePage::with_dom(FakeDom::new().eval(json!(state.to_string())));

    let harvest = ExtractionChain::parallel(&fx.config)
        .run(&page, &fx.item, &fx.ledger)
        .await
        .expect("chain runs")
        .expect("harvested");
    assert_eq!(harvest.method, Method::StructuredData);

    let ledger = fx.ledger.lock().await;
    let attempts = ledger.attempts(&fx.item.id);
    let methods: Vec<_> = attempts.iter().map(|a| a.method.as_str()).collect();
    assert_eq!(methods, vec!["direct_text", "structured_data"]);
    assert!(!attempts[0].success);
    assert!(attempts[0].error.is_none());
}

#[tokio::test]
async fn test_screenshot_is_the_last_resort() {
    let fx = fixture();
    let page = FakePage::with_dom(FakeDom::new());

    let harvest = ExtractionChain::sequential(&fx.config)
        .run(&page, &fx.item, &fx.ledger)
        .await
        .expect("chain runs")
        .expect("harvested");
    assert_eq!(harvest.method, Method::Screenshot);
    assert_eq!(harvest.path.extension().unwrap(), "png");
    assert_eq!(fx.ledger.lock().await.attempts(&fx.item.id).len(), 3);
}

#[tokio::test]
async fn test_every_strategy_failing_records_one_attempt_each() {
    let fx = fixture();
    let page = FakePage::with_dom(FakeDom::new().screenshot_fails());

    let result = ExtractionChain::sequential(&fx.config)
        .run(&page, &fx.item, &fx.ledger)
        .await
        .expect("chain runs");
    assert!(result.is_none());

    let ledger = fx.ledger.lock().await;
    let attempts = ledger.attempts(&fx.item.id);
    let methods: Vec<_> = attempts.iter().map(|a| a.method.as_str()).collect();
    assert_eq!(methods, vec!["direct_text", "structured_data", "screenshot"]);
    assert!(attempts.iter().all(|a| !a.success));
    // declined strategies carry no error; a raised one does
    assert!(attempts[0].error.is_none());
    assert!(attempts[1].error.is_none());
    assert!(attempts[2].error.is_some());

    // the chain never decides final failure
    assert_eq!(
        ledger.entry(&fx.item.id).expect("entry").status,
        EntryStatus::Pending
    );
}
