/*!
 * End-to-end runs of the worker pool over a seeded SQLite file
 */

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use dbtranslate::app_config::RowFailurePolicy;
use dbtranslate::database::RowId;
use dbtranslate::errors::{AppError, StoreError};
use dbtranslate::pipeline::{PipelineDriver, PipelineOptions};
use dbtranslate::providers::mock::MockTranslator;
use dbtranslate::translation::{TitleCase, Verbatim};

use crate::common::{
    init_logging, open_store, read_column, seed_database, seed_numbered, service, tags, BrokenStore, RecordingStore,
};

fn options(workers: usize, step: i64) -> PipelineOptions {
    PipelineOptions::new(workers, step).with_stagger(Duration::from_millis(1))
}

#[tokio::test]
async fn test_run_withThreeRowsAndStepTwo_shouldFetchTwoPagesAndTranslateAll() {
    init_logging();
    let (_dir, path) = seed_database(&[
        (1, Some("archery"), true),
        (2, Some("boxing"), true),
        (3, Some("cycling"), true),
    ])
    .unwrap();
    let languages = tags(&["ru", "fr"]);
    let store = Arc::new(RecordingStore::new(open_store(&path, "", &languages).unwrap()));
    let driver = PipelineDriver::new(
        store.clone(),
        service(Arc::new(MockTranslator::working()), Box::new(TitleCase)),
        languages,
        options(2, 2),
    );

    let report = driver.run().await.unwrap();

    assert_eq!(store.fetched_offsets(), vec![0, 2]);
    assert_eq!(report.pages_fetched(), 2);
    assert_eq!(report.stats.rows_translated, 3);
    assert_eq!(read_column(&path, 1, "name_ru").unwrap().as_deref(), Some("Archery_ru"));
    assert_eq!(read_column(&path, 2, "name_fr").unwrap().as_deref(), Some("Boxing_fr"));
    assert_eq!(read_column(&path, 3, "name_ru").unwrap().as_deref(), Some("Cycling_ru"));
    // Untouched language column
    assert_eq!(read_column(&path, 3, "name_de").unwrap(), None);
}

#[tokio::test]
async fn test_run_withVerbatimFormatter_shouldStoreProviderOutput() {
    let (_dir, path) = seed_database(&[(1, Some("table tennis"), true)]).unwrap();
    let languages = tags(&["de"]);
    let store = Arc::new(open_store(&path, "", &languages).unwrap());
    let driver = PipelineDriver::new(
        store,
        service(Arc::new(MockTranslator::working()), Box::new(Verbatim)),
        languages,
        options(1, 10),
    );

    driver.run().await.unwrap();

    assert_eq!(read_column(&path, 1, "name_de").unwrap().as_deref(), Some("table tennis_de"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_run_withManyWorkers_shouldCoverEveryRowExactlyOnce() {
    init_logging();
    let (_dir, path) = seed_numbered(103).unwrap();
    let languages = tags(&["fr"]);
    let store = Arc::new(RecordingStore::new(open_store(&path, "", &languages).unwrap()));
    let mock = Arc::new(MockTranslator::working());
    let driver = PipelineDriver::new(
        store.clone(),
        service(mock.clone(), Box::new(Verbatim)),
        languages,
        options(5, 10),
    );

    let report = driver.run().await.unwrap();

    // ceil(103 / 10) pages, each offset once
    assert_eq!(store.fetched_offsets(), (0..11).map(|i| i * 10).collect::<Vec<_>>());
    assert_eq!(report.fetched_offsets(), store.fetched_offsets());

    let updated = store.updated_rows();
    let unique: HashSet<RowId> = updated.iter().cloned().collect();
    assert_eq!(updated.len(), 103);
    assert_eq!(unique.len(), 103);
    assert_eq!(mock.request_count(), 103);

    for id in [1, 50, 103] {
        assert_eq!(
            read_column(&path, id, "name_fr").unwrap(),
            Some(format!("discipline {:04}_fr", id))
        );
    }
}

#[tokio::test]
async fn test_run_withMoreWorkersThanPages_shouldLetIdleWorkersFinish() {
    let (_dir, path) = seed_numbered(4).unwrap();
    let languages = tags(&["ru"]);
    let store = Arc::new(RecordingStore::new(open_store(&path, "", &languages).unwrap()));
    let driver = PipelineDriver::new(
        store.clone(),
        service(Arc::new(MockTranslator::working()), Box::new(Verbatim)),
        languages,
        options(6, 3),
    );

    let report = driver.run().await.unwrap();

    assert_eq!(report.workers.len(), 6);
    assert_eq!(store.fetched_offsets(), vec![0, 3]);
    assert_eq!(report.pages_fetched(), 2);
    assert!(report.workers.iter().filter(|w| w.pages_fetched == 0).count() >= 4);
    assert_eq!(report.stats.rows_translated, 4);
}

#[tokio::test]
async fn test_run_withNoRowsInScope_shouldFinishWithoutFetching() {
    let (_dir, path) = seed_database(&[(1, Some("fencing"), false)]).unwrap();
    let languages = tags(&["ru"]);
    let store = Arc::new(RecordingStore::new(open_store(&path, "is_classic = 1", &languages).unwrap()));
    let mock = Arc::new(MockTranslator::working());
    let driver = PipelineDriver::new(store.clone(), service(mock.clone(), Box::new(Verbatim)), languages, options(3, 5));

    let report = driver.run().await.unwrap();

    assert_eq!(report.total_rows, 0);
    assert!(store.fetched_offsets().is_empty());
    assert_eq!(report.offsets_issued, 3);
    assert_eq!(mock.request_count(), 0);
}

#[tokio::test]
async fn test_run_withScopePredicate_shouldOnlyTranslateMatchingRows() {
    let (_dir, path) = seed_database(&[
        (1, Some("swimming"), true),
        (2, Some("fencing"), false),
        (3, Some("rowing"), true),
    ])
    .unwrap();
    let languages = tags(&["fr"]);
    let store = Arc::new(open_store(&path, "is_classic", &languages).unwrap());
    let driver = PipelineDriver::new(
        store,
        service(Arc::new(MockTranslator::working()), Box::new(Verbatim)),
        languages,
        options(2, 1),
    );

    let report = driver.run().await.unwrap();

    assert_eq!(report.total_rows, 2);
    assert_eq!(read_column(&path, 2, "name_fr").unwrap(), None);
    assert_eq!(read_column(&path, 3, "name_fr").unwrap().as_deref(), Some("rowing_fr"));
}

#[tokio::test]
async fn test_run_withFailingLanguageAndSkipPolicy_shouldLeaveRowsUntouched() {
    let (_dir, path) = seed_database(&[(1, Some("judo"), true), (2, Some("karate"), true)]).unwrap();
    let languages = tags(&["ru", "fr", "de"]);
    let store = Arc::new(open_store(&path, "", &languages).unwrap());
    let driver = PipelineDriver::new(
        store,
        service(Arc::new(MockTranslator::failing_for("fr")), Box::new(Verbatim)),
        languages,
        options(1, 10),
    );

    let report = driver.run().await.unwrap();

    assert_eq!(report.stats.rows_skipped, 2);
    assert_eq!(report.stats.rows_translated, 0);
    for id in [1, 2] {
        assert_eq!(read_column(&path, id, "name_ru").unwrap(), None);
        assert_eq!(read_column(&path, id, "name_de").unwrap(), None);
    }
}

#[tokio::test]
async fn test_run_withBlankSource_shouldCountItAndNotCallProvider() {
    let (_dir, path) = seed_database(&[(1, None, true), (2, Some("   "), true), (3, Some("polo"), true)]).unwrap();
    let languages = tags(&["ru"]);
    let store = Arc::new(open_store(&path, "", &languages).unwrap());
    let mock = Arc::new(MockTranslator::working());
    let driver = PipelineDriver::new(store, service(mock.clone(), Box::new(Verbatim)), languages, options(1, 10));

    let report = driver.run().await.unwrap();

    assert_eq!(report.stats.rows_blank, 2);
    assert_eq!(report.stats.rows_translated, 1);
    assert_eq!(mock.request_count(), 1);
}

#[tokio::test]
async fn test_run_withAbortPolicy_shouldReturnWorkerError() {
    let (_dir, path) = seed_numbered(6).unwrap();
    let languages = tags(&["ru"]);
    let store = Arc::new(open_store(&path, "", &languages).unwrap());
    let driver = PipelineDriver::new(
        store,
        service(Arc::new(MockTranslator::failing()), Box::new(Verbatim)),
        languages,
        options(2, 2).with_failure_policy(RowFailurePolicy::Abort),
    );

    let err = driver.run().await.unwrap_err();

    match err {
        AppError::Worker { source, .. } => {
            assert!(matches!(*source, AppError::RowTranslation { ref language, .. } if language == "ru"));
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(driver.cancellation_token().is_cancelled());
    assert_eq!(read_column(&path, 1, "name_ru").unwrap(), None);
}

#[tokio::test]
async fn test_run_withStoreFailure_shouldFailTheRun() {
    let driver = PipelineDriver::new(
        Arc::new(BrokenStore { total: 10 }),
        service(Arc::new(MockTranslator::working()), Box::new(Verbatim)),
        tags(&["ru"]),
        options(2, 5),
    );

    let err = driver.run().await.unwrap_err();

    match err {
        AppError::Worker { source, .. } => assert!(matches!(*source, AppError::Store(StoreError::Query(_)))),
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_run_whenCancelledUpFront_shouldReportCancellation() {
    let (_dir, path) = seed_numbered(5).unwrap();
    let languages = tags(&["ru"]);
    let store = Arc::new(RecordingStore::new(open_store(&path, "", &languages).unwrap()));
    let mock = Arc::new(MockTranslator::working());
    let driver = PipelineDriver::new(store.clone(), service(mock.clone(), Box::new(Verbatim)), languages, options(2, 2));
    driver.cancellation_token().cancel();

    let report = driver.run().await.unwrap();

    assert!(report.cancelled);
    assert!(store.fetched_offsets().is_empty());
    assert_eq!(mock.request_count(), 0);
}

#[tokio::test]
async fn test_run_whenCancelledDuringRow_shouldStopWithoutWriting() {
    init_logging();
    let (_dir, path) = seed_numbered(6).unwrap();
    let languages = tags(&["ru"]);
    let store = Arc::new(RecordingStore::new(open_store(&path, "", &languages).unwrap()));
    let mock = Arc::new(MockTranslator::slow(500));
    let driver = PipelineDriver::new(store.clone(), service(mock.clone(), Box::new(Verbatim)), languages, options(1, 1));

    let token = driver.cancellation_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
    });

    let report = driver.run().await.unwrap();

    assert!(report.cancelled);
    assert!(report.workers[0].cancelled);
    assert_eq!(store.fetched_offsets(), vec![0]);
    assert!(report.pages_fetched() < 6);
    assert_eq!(report.stats.rows_translated, 0);
    assert_eq!(mock.request_count(), 1);
    assert!(store.updated_rows().is_empty());
    assert_eq!(read_column(&path, 1, "name_ru").unwrap(), None);
}

#[tokio::test]
async fn test_run_withZeroWorkers_shouldRefuseToStart() {
    let (_dir, path) = seed_numbered(2).unwrap();
    let languages = tags(&["ru"]);
    let store = Arc::new(open_store(&path, "", &languages).unwrap());
    let driver = PipelineDriver::new(
        store,
        service(Arc::new(MockTranslator::working()), Box::new(Verbatim)),
        languages,
        PipelineOptions::new(0, 2),
    );

    assert!(matches!(driver.run().await, Err(AppError::Config(_))));
}
