use scribe_core::{Item, ItemId};
use scribe_ledger::{EntryStatus, Ledger};
use std::path::Path;
use tempfile::TempDir;

fn item(id: &str) -> Item {
    Item::new(
        ItemId::new(id).expect("valid id"),
        format!("Meeting {id}"),
        format!("https://otter.ai/u/{id}"),
    )
}

#[test]
fn test_missing_and_corrupt_files_start_fresh() {
    let tmp = TempDir::new().expect("create temp dir");
    let path = tmp.path().join("state.json");

    let ledger = Ledger::load(&path);
    assert_eq!(ledger.stats().total, 0);

    std::fs::write(&path, "{ this is not json").expect("write corrupt file");
    let mut ledger = Ledger::load(&path);
    assert_eq!(ledger.stats().total, 0);

    // a fresh ledger overwrites the corrupt file on first mutation
    ledger.register(&item("aaaaaaaaaa01")).expect("register");
    assert_eq!(Ledger::load(&path).stats().total, 1);
}

#[test]
fn test_tampered_ids_are_rejected_on_load() {
    let tmp = TempDir::new().expect("create temp dir");
    let path = tmp.path().join("state.json");
    std::fs::write(
        &path,
        r#"{
  "items": {
    "abcdefghijklmn\u00e9op": {
      "id": "abcdefghijklmn\u00e9op",
      "title": "Tampered",
      "url": "https://otter.ai/u/x",
      "status": "pending",
      "discovered_at": "2024-03-01T10:00:00Z"
    }
  }
}"#,
    )
    .expect("write tampered file");

    // treated like any other corrupt file
    let ledger = Ledger::load(&path);
    assert_eq!(ledger.stats().total, 0);
    assert!(ledger.pending().is_empty());
}

#[test]
fn test_files_missing_optional_fields_load() {
    let tmp = TempDir::new().expect("create temp dir");
    let path = tmp.path().join("state.json");
    std::fs::write(
        &path,
        r#"{
  "items": {
    "aaaaaaaaaa01": {
      "id": "aaaaaaaaaa01",
      "title": "Old entry",
      "url": "https://otter.ai/u/aaaaaaaaaa01",
      "status": "failed",
      "discovered_at": "2024-03-01T10:00:00Z"
    }
  },
  "failed": ["aaaaaaaaaa01"],
  "some_future_field": 7
}"#,
    )
    .expect("write legacy file");

    let ledger = Ledger::load(&path);
    let id = ItemId::new("aaaaaaaaaa01").expect("valid id");
    let entry = ledger.entry(&id).expect("entry loaded");
    assert_eq!(entry.status, EntryStatus::Failed);
    assert!(entry.download_path.is_none());
    assert!(ledger.attempts(&id).is_empty());
    assert_eq!(ledger.pending().len(), 1);
}

#[test]
fn test_failed_item_is_retried_by_a_later_run() {
    let tmp = TempDir::new().expect("create temp dir");
    let path = tmp.path().join("state.json");
    let flaky = item("flakyflaky01");

    {
        let mut first_run = Ledger::load(&path);
        first_run.register(&flaky).expect("register");
        first_run
            .mark_failure(&flaky.id, Some("navigation timeout".into()))
            .expect("mark failure");
        first_run.record_run(1, 0, 1).expect("record run");
    }

    let mut second_run = Ledger::load(&path);
    assert!(!second_run.register(&flaky).expect("register again"));
    assert!(!second_run.is_downloaded(&flaky.id));
    let pending: Vec<_> = second_run.pending().iter().map(|e| e.id.clone()).collect();
    assert_eq!(pending, vec![flaky.id.clone()]);

    second_run
        .mark_success(&flaky.id, Path::new("downloads/x.txt"), "direct_text", 512)
        .expect("mark success");
    let stats = second_run.stats();
    assert_eq!((stats.successful, stats.failed, stats.pending), (1, 0, 0));
    assert_eq!(Ledger::load(&path).run_history().len(), 1);
}
