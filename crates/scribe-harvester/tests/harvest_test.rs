use scribe_browser::fake::{FakeDom, FakeFactory, FakeSite};
use scribe_browser::Link;
use scribe_core::{AppConfig, Item, ItemId};
use scribe_harvester::{Credentials, HarvestError, Harvester, RunOptions};
use scribe_ledger::{EntryStatus, Ledger};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const LISTING: &str = "https://otter.ai/my-notes";
const SIGNIN: &str = "https://otter.ai/signin";

fn test_config(dir: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.paths.output_dir = dir.join("downloads");
    config.paths.state_file = dir.join("state.json");
    config.paths.session_file = dir.join("session.json");
    config.paths.progress_file = dir.join("progress.json");

    config.discovery.scroll_wait_ms = 0;
    config.discovery.stability_window = 3;
    config.download.settle_ms = 0;
    config.download.parallel_settle_ms = 0;
    config.download.strategy_gap_ms = 0;
    config.download.delay_between_items_ms = 0;
    config.download.backoff_base_ms = 0;
    config.auth.page_settle_ms = 0;
    config.auth.completion_wait_ms = 0;
    config.auth.listing_settle_ms = 0;
    config
}

fn item_url(id: &str) -> String {
    format!("https://otter.ai/u/{id}")
}

fn transcript_page(id: &str) -> FakeDom {
    let text = (0..20)
        .map(|i| format!("Speaker {}: notes for {id}, point number {i}", i % 3))
        .collect::<Vec<_>>()
        .join("\n");
    FakeDom::new().element(".otter-transcript-container", &text)
}

/// A page no strategy can harvest.
fn broken_page() -> FakeDom {
    FakeDom::new().screenshot_fails()
}

fn listing(ids: &[&str]) -> FakeDom {
    let links = ids
        .iter()
        .map(|id| Link {
            href: format!("/u/{id}"),
            text: format!("Meeting {id}"),
        })
        .collect();
    FakeDom::new()
        .element(".otter-main-content__container", "")
        .links(links)
}

fn site(good: &[&str], broken: &[&str]) -> FakeSite {
    let mut all: Vec<&str> = good.to_vec();
    all.extend_from_slice(broken);

    let mut site = FakeSite::new().page(LISTING, listing(&all));
    for id in good {
        site = site.page(&item_url(id), transcript_page(id));
    }
    for id in broken {
        site = site.page(&item_url(id), broken_page());
    }
    site
}

fn signin_form() -> FakeDom {
    FakeDom::new()
        .element("#otter-email-input", "")
        .element("#otter-sign-in", "Sign in")
        .element("#otter-password", "")
        .link_button("#otter-password-next", "Next", "https://otter.ai/home", true)
}

fn credentials() -> Credentials {
    Credentials::new("someone@example.com", "hunter2")
}

fn id(value: &str) -> ItemId {
    ItemId::new(value).expect("valid id")
}

fn downloaded_files(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter(|e| e.path().extension().is_some_and(|ext| ext == "txt"))
                .count()
        })
        .unwrap_or(0)
}

#[tokio::test]
async fn test_sequential_run_with_login_contains_item_failures() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());
    let site = site(&["alphaMeeting01", "gammaMeeting03"], &["betaMeeting002"])
        .require_login(SIGNIN)
        .page(SIGNIN, signin_form());
    let factory = Arc::new(FakeFactory::new(site));
    let harvester = Harvester::new(config.clone(), factory.clone()).with_credentials(credentials());

    let summary = harvester.run(&RunOptions::default()).await.unwrap();
    assert_eq!(summary.processed, 3);
    assert_eq!(summary.successful, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.stats.total, 3);
    assert_eq!(summary.stats.successful, 2);
    assert_eq!(summary.stats.failed, 1);
    assert_eq!(summary.stats.pending, 0);
    assert!(!summary.is_clean());

    assert_eq!(factory.launched(), 1);
    assert_eq!(factory.active(), 0);
    assert!(config.paths.session_file.exists());
    assert_eq!(downloaded_files(&config.paths.output_dir), 2);

    let ledger = Ledger::load(&config.paths.state_file);
    assert!(ledger.session_created().is_some());
    assert_eq!(ledger.run_history().len(), 1);

    let failed = ledger.entry(&id("betaMeeting002")).unwrap();
    assert_eq!(failed.status, EntryStatus::Failed);
    assert_eq!(failed.last_error.as_deref(), Some("failed after 3 attempts"));
    // three full passes over three strategies
    assert_eq!(ledger.attempts(&id("betaMeeting002")).len(), 9);

    let ok = ledger.entry(&id("alphaMeeting01")).unwrap();
    assert_eq!(ok.status, EntryStatus::Success);
    assert_eq!(ok.method_used.as_deref(), Some("direct_text"));
    assert!(ok.download_path.as_ref().is_some_and(|p| p.exists()));
}

#[tokio::test]
async fn test_failed_item_is_retried_by_the_next_run() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());

    let first = Harvester::new(
        config.clone(),
        Arc::new(FakeFactory::new(site(&["alphaMeeting01"], &["betaMeeting002"]))),
    );
    let summary = first.run(&RunOptions::default()).await.unwrap();
    assert_eq!(summary.failed, 1);

    let second = Harvester::new(
        config.clone(),
        Arc::new(FakeFactory::new(site(&["alphaMeeting01", "betaMeeting002"], &[]))),
    );
    let summary = second.run(&RunOptions::default()).await.unwrap();
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.successful, 1);
    assert!(summary.is_clean());

    let ledger = Ledger::load(&config.paths.state_file);
    assert_eq!(
        ledger.entry(&id("betaMeeting002")).unwrap().status,
        EntryStatus::Success
    );
    assert!(ledger.entry(&id("betaMeeting002")).unwrap().last_error.is_none());
    assert_eq!(ledger.attempts(&id("betaMeeting002")).len(), 10);
    // harvested items are never touched again
    assert_eq!(ledger.attempts(&id("alphaMeeting01")).len(), 1);
    assert_eq!(ledger.run_history().len(), 2);
}

#[tokio::test]
async fn test_navigation_failure_is_retried_with_backoff() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());
    let site = site(&["alphaMeeting01"], &[]).fail_navigation(&item_url("alphaMeeting01"), 1);
    let harvester = Harvester::new(config.clone(), Arc::new(FakeFactory::new(site)));

    let summary = harvester.run(&RunOptions::default()).await.unwrap();
    assert_eq!(summary.successful, 1);

    let ledger = Ledger::load(&config.paths.state_file);
    let methods: Vec<_> = ledger
        .attempts(&id("alphaMeeting01"))
        .iter()
        .map(|a| (a.method.clone(), a.success))
        .collect();
    assert_eq!(
        methods,
        vec![
            ("navigation".to_string(), false),
            ("direct_text".to_string(), true)
        ]
    );
}

#[tokio::test]
async fn test_limit_wins_over_quick_mode() {
    let tmp = TempDir::new().unwrap();
    let mut config = test_config(tmp.path());
    config.discovery.quick_item_limit = 3;
    let ids = ["item0000000001", "item0000000002", "item0000000003", "item0000000004"];

    let harvester = Harvester::new(config.clone(), Arc::new(FakeFactory::new(site(&ids, &[]))));
    let summary = harvester
        .run(&RunOptions {
            quick: true,
            limit: Some(1),
            ..RunOptions::default()
        })
        .await
        .unwrap();
    assert_eq!(summary.processed, 1);
    // everything discovered is registered even when not processed
    assert_eq!(summary.stats.total, 4);
    assert_eq!(summary.stats.pending, 3);

    let summary = harvester
        .run(&RunOptions {
            quick: true,
            ..RunOptions::default()
        })
        .await
        .unwrap();
    // the first item is already harvested
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.stats.pending, 1);
}

#[tokio::test]
async fn test_reset_reprocesses_everything() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());
    let harvester = Harvester::new(
        config.clone(),
        Arc::new(FakeFactory::new(site(&["alphaMeeting01", "gammaMeeting03"], &[]))),
    );

    harvester.run(&RunOptions::default()).await.unwrap();
    let again = harvester.run(&RunOptions::default()).await.unwrap();
    assert_eq!(again.processed, 0);

    let reset = harvester
        .run(&RunOptions {
            reset: true,
            ..RunOptions::default()
        })
        .await
        .unwrap();
    assert_eq!(reset.processed, 2);
    assert_eq!(Ledger::load(&config.paths.state_file).run_history().len(), 1);
}

#[tokio::test]
async fn test_empty_listing_is_a_session_error() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());
    let harvester = Harvester::new(config.clone(), Arc::new(FakeFactory::new(site(&[], &[]))));

    let err = harvester.run(&RunOptions::default()).await.unwrap_err();
    assert!(matches!(err, HarvestError::NoItemsDiscovered));
    assert!(config.paths.output_dir.join("debug_no_meetings.png").exists());
}

#[tokio::test]
async fn test_login_required_without_credentials() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());
    let site = site(&["alphaMeeting01"], &[]).require_login(SIGNIN);
    let factory = Arc::new(FakeFactory::new(site));
    let harvester = Harvester::new(config, factory.clone());

    let err = harvester.run(&RunOptions::default()).await.unwrap_err();
    assert!(matches!(err, HarvestError::Authentication(_)));
    assert_eq!(factory.active(), 0);
}

#[tokio::test]
async fn test_rejected_login_is_a_session_error() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());
    let site = site(&["alphaMeeting01"], &[])
        .require_login(SIGNIN)
        .page(SIGNIN, FakeDom::new().element("#otter-password", ""));
    let harvester =
        Harvester::new(config.clone(), Arc::new(FakeFactory::new(site))).with_credentials(credentials());

    let err = harvester.run(&RunOptions::default()).await.unwrap_err();
    assert!(matches!(err, HarvestError::Authentication(_)));
    assert!(config.paths.output_dir.join("debug_login_failed.png").exists());
    assert!(!config.paths.session_file.exists());
}

fn seed_ledger(config: &AppConfig, ids: &[String]) {
    let mut ledger = Ledger::load(&config.paths.state_file);
    for value in ids {
        let item = Item::new(id(value), format!("Meeting {value}"), item_url(value));
        ledger.register(&item).unwrap();
    }
}

#[tokio::test]
async fn test_parallel_run_harvests_every_pending_item() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());
    let ids: Vec<String> = (0..10).map(|i| format!("parallelItem{i:02}")).collect();
    seed_ledger(&config, &ids);

    let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    let factory = Arc::new(FakeFactory::new(site(&refs, &[])));
    let harvester = Harvester::new(config.clone(), factory.clone());

    let summary = harvester.run_parallel(4).await.unwrap();
    assert_eq!(summary.processed, 10);
    assert_eq!(summary.successful, 10);
    assert_eq!(summary.stats.successful, 10);
    assert!(summary.is_clean());

    assert_eq!(factory.launched(), 10);
    assert!(factory.peak() <= 4);
    assert_eq!(factory.active(), 0);

    // no lost updates across concurrent writers
    let ledger = Ledger::load(&config.paths.state_file);
    assert_eq!(ledger.stats().successful, 10);
    assert_eq!(ledger.stats().pending, 0);
    let successful_attempts: usize = ids
        .iter()
        .map(|value| {
            let attempts = ledger.attempts(&id(value));
            assert_eq!(attempts.len(), 1);
            attempts.iter().filter(|a| a.success).count()
        })
        .sum();
    assert_eq!(successful_attempts, 10);
    for value in &ids {
        let entry = ledger.entry(&id(value)).unwrap();
        assert_eq!(entry.status, EntryStatus::Success);
        assert_eq!(entry.method_used.as_deref(), Some("direct_text"));
    }
    assert_eq!(ledger.run_history().len(), 1);
    assert_eq!(downloaded_files(&config.paths.output_dir), 10);
}

#[tokio::test]
async fn test_parallel_failure_is_not_retried_within_the_run() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());
    let ids = vec!["alphaMeeting01".to_string(), "betaMeeting002".to_string()];
    seed_ledger(&config, &ids);

    let harvester = Harvester::new(
        config.clone(),
        Arc::new(FakeFactory::new(site(&["alphaMeeting01"], &["betaMeeting002"]))),
    );
    let summary = harvester.run_parallel(2).await.unwrap();
    assert_eq!(summary.successful, 1);
    assert_eq!(summary.failed, 1);

    let ledger = Ledger::load(&config.paths.state_file);
    let entry = ledger.entry(&id("betaMeeting002")).unwrap();
    assert_eq!(entry.status, EntryStatus::Failed);
    assert_eq!(entry.last_error.as_deref(), Some("no transcript content found"));
    // direct text and structured data only, once each
    assert_eq!(ledger.attempts(&id("betaMeeting002")).len(), 2);
    assert_eq!(ledger.pending().len(), 1);
}

#[tokio::test]
async fn test_parallel_workers_reuse_the_saved_session() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());

    let first = site(&["alphaMeeting01"], &["betaMeeting002"])
        .require_login(SIGNIN)
        .page(SIGNIN, signin_form());
    Harvester::new(config.clone(), Arc::new(FakeFactory::new(first)))
        .with_credentials(credentials())
        .run(&RunOptions::default())
        .await
        .unwrap();

    // no credentials: only the saved session can get past sign-in
    let second = site(&["alphaMeeting01", "betaMeeting002"], &[]).require_login(SIGNIN);
    let summary = Harvester::new(config.clone(), Arc::new(FakeFactory::new(second)))
        .run_parallel(2)
        .await
        .unwrap();
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.successful, 1);
    assert_eq!(summary.stats.successful, 2);
}

#[tokio::test]
async fn test_parallel_ledger_error_closes_every_session() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());
    let ids: Vec<String> = (0..6).map(|i| format!("parallelItem{i:02}")).collect();
    seed_ledger(&config, &ids);

    // a directory in place of the temp file makes every save fail
    let mut tmp_path = config.paths.state_file.clone().into_os_string();
    tmp_path.push(".tmp");
    std::fs::create_dir(&tmp_path).unwrap();

    let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    let factory = Arc::new(FakeFactory::new(site(&refs, &[])));
    let harvester = Harvester::new(config, factory.clone());

    let err = harvester.run_parallel(2).await.unwrap_err();
    assert!(matches!(
        err,
        HarvestError::Extract(_) | HarvestError::Ledger(_)
    ));
    // no new items start after the failure, and every started one is closed
    assert_eq!(factory.launched(), 2);
    assert_eq!(factory.active(), 0);
}
