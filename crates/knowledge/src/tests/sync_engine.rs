use super::support::{CountingEmbedder, Fixture, FlakyIndex};
use crate::manifest::Manifest;
use crate::sync::SyncOptions;
use crate::vector_index::{MemoryIndex, VectorIndex};
use std::sync::Arc;

#[tokio::test]
async fn test_second_run_does_no_work() {
    let fixture = Fixture::new();
    fixture.write("hr/general/leave.txt", "Annual leave is 25 days per year.");
    fixture.write("hr/manager/reviews.md", "Performance reviews happen in March.");

    let embedder = Arc::new(CountingEmbedder::new());
    let index = Arc::new(MemoryIndex::new("handbook"));
    let orchestrator = fixture.orchestrator(embedder.clone(), index.clone());

    let first = orchestrator.run(SyncOptions::default()).await.unwrap();
    assert_eq!(first.files_indexed, 2);
    let calls = embedder.calls();
    let writes = index.write_count();
    let points = index.count().await.unwrap();

    let second = orchestrator.run(SyncOptions::default()).await.unwrap();
    assert_eq!(second.files_indexed, 0);
    assert_eq!(second.files_skipped, 2);
    assert_eq!(embedder.calls(), calls);
    assert_eq!(index.write_count(), writes);
    assert_eq!(index.count().await.unwrap(), points);
}

#[tokio::test]
async fn test_touched_file_is_reindexed_without_duplicates() {
    let fixture = Fixture::new();
    fixture.write("sales/general/pricing.txt", "List prices are reviewed quarterly.");
    fixture.write("sales/general/travel.txt", "Book travel through the portal.");

    let embedder = Arc::new(CountingEmbedder::new());
    let index = Arc::new(MemoryIndex::new("handbook"));
    let orchestrator = fixture.orchestrator(embedder.clone(), index.clone());

    orchestrator.run(SyncOptions::default()).await.unwrap();
    let points = index.count().await.unwrap();
    let texts = embedder.texts();

    fixture.touch("sales/general/pricing.txt", 60);
    let report = orchestrator.run(SyncOptions::default()).await.unwrap();

    assert_eq!(report.files_indexed, 1);
    assert_eq!(report.files_skipped, 1);
    assert_eq!(embedder.texts(), texts + 1);
    assert_eq!(index.count().await.unwrap(), points);
}

#[tokio::test]
async fn test_edited_file_replaces_its_chunks() {
    let fixture = Fixture::new();
    fixture.write("ops/general/shifts.txt", "Night shifts start at 22:00.");

    let index = Arc::new(MemoryIndex::new("handbook"));
    let orchestrator = fixture.orchestrator(Arc::new(CountingEmbedder::new()), index.clone());
    orchestrator.run(SyncOptions::default()).await.unwrap();

    fixture.write("ops/general/shifts.txt", "Night shifts start at 23:00.");
    fixture.touch("ops/general/shifts.txt", 60);
    orchestrator.run(SyncOptions::default()).await.unwrap();

    assert_eq!(index.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_files_without_department_and_role_are_rejected() {
    let fixture = Fixture::new();
    fixture.write("orphan.txt", "No department here.");
    fixture.write("sales/pitch.txt", "No role here.");
    fixture.write("sales/general/pitch.txt", "Lead with the customer's problem.");

    let index = Arc::new(MemoryIndex::new("handbook"));
    let report = fixture
        .orchestrator(Arc::new(CountingEmbedder::new()), index.clone())
        .run(SyncOptions::default())
        .await
        .unwrap();

    assert_eq!(report.files_scanned, 3);
    assert_eq!(report.files_rejected, 2);
    assert_eq!(report.files_indexed, 1);
    assert!(!report.is_partial());
    assert_eq!(index.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_failed_upsert_leaves_file_pending() {
    let fixture = Fixture::new();
    fixture.write("finance/general/refunds.txt", "Refunds must be approved within 48 hours.");

    let index = Arc::new(FlakyIndex::new());
    let orchestrator = fixture.orchestrator(Arc::new(CountingEmbedder::new()), index.clone());

    index.set_failing(true);
    let failed = orchestrator.run(SyncOptions::default()).await.unwrap();
    assert!(failed.is_partial());
    assert_eq!(failed.failed_sources, vec!["finance/general/refunds.txt"]);
    assert!(Manifest::load(&fixture.manifest)
        .unwrap()
        .get("finance/general/refunds.txt")
        .is_none());

    index.set_failing(false);
    let retried = orchestrator.run(SyncOptions::default()).await.unwrap();
    assert_eq!(retried.files_indexed, 1);
    assert_eq!(index.count().await.unwrap(), 1);
    assert!(Manifest::load(&fixture.manifest)
        .unwrap()
        .get("finance/general/refunds.txt")
        .is_some());
}

#[tokio::test]
async fn test_unreadable_file_does_not_stop_the_run() {
    let fixture = Fixture::new();
    fixture.write("legal/general/broken.pdf", "this is not a pdf");
    fixture.write("legal/general/nda.txt", "NDAs are signed before the first meeting.");

    let index = Arc::new(MemoryIndex::new("handbook"));
    let report = fixture
        .orchestrator(Arc::new(CountingEmbedder::new()), index.clone())
        .run(SyncOptions::default())
        .await
        .unwrap();

    assert_eq!(report.files_indexed, 1);
    assert_eq!(report.files_failed, 1);
    assert_eq!(report.failed_sources, vec!["legal/general/broken.pdf"]);

    let manifest = Manifest::load(&fixture.manifest).unwrap();
    assert!(manifest.get("legal/general/broken.pdf").is_none());
    assert!(manifest.get("legal/general/nda.txt").is_some());
}

#[tokio::test]
async fn test_force_rebuilds_the_collection() {
    let fixture = Fixture::new();
    fixture.write("hr/general/leave.txt", "Annual leave is 25 days per year.");

    let embedder = Arc::new(CountingEmbedder::new());
    let index = Arc::new(MemoryIndex::new("handbook"));
    let orchestrator = fixture.orchestrator(embedder.clone(), index.clone());
    orchestrator.run(SyncOptions::default()).await.unwrap();

    let texts = embedder.texts();
    let report = orchestrator.run(SyncOptions { force: true }).await.unwrap();

    assert_eq!(report.files_indexed, 1);
    assert_eq!(embedder.texts(), texts + 1);
    assert_eq!(index.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_word_documents_are_indexed() {
    let fixture = Fixture::new();
    fixture.write_docx(
        "hr/general/handbook.docx",
        &["Welcome to the company.", "Badges must be worn on site."],
    );

    let index = Arc::new(MemoryIndex::new("handbook"));
    let report = fixture
        .orchestrator(Arc::new(CountingEmbedder::new()), index.clone())
        .run(SyncOptions::default())
        .await
        .unwrap();

    assert_eq!(report.files_indexed, 1);
    assert!(report.chunks_indexed >= 1);
}

#[tokio::test]
async fn test_failed_force_run_leaves_file_pending() {
    let fixture = Fixture::new();
    fixture.write("hr/general/leave.txt", "Annual leave is 25 days per year.");

    let index = Arc::new(FlakyIndex::new());
    let orchestrator = fixture.orchestrator(Arc::new(CountingEmbedder::new()), index.clone());
    orchestrator.run(SyncOptions::default()).await.unwrap();
    assert_eq!(index.count().await.unwrap(), 1);

    index.set_failing(true);
    let forced = orchestrator.run(SyncOptions { force: true }).await.unwrap();
    assert_eq!(forced.files_failed, 1);
    assert_eq!(index.count().await.unwrap(), 0);
    assert!(Manifest::load(&fixture.manifest).unwrap().is_empty());

    index.set_failing(false);
    let next = orchestrator.run(SyncOptions::default()).await.unwrap();
    assert_eq!(next.files_indexed, 1);
    assert_eq!(next.files_skipped, 0);
    assert_eq!(index.count().await.unwrap(), 1);
}
