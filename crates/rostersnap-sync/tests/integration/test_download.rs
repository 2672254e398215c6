//! Download phase: matching, validation, fallbacks

use rostersnap_core::domain::errors::RemoteError;
use rostersnap_core::ports::photo_store::IPhotoStore;
use rostersnap_sync::{DownloadSummary, SyncError, SyncPhase};

use crate::common::{self, FakeBucket, ProgressLog};

// ============================================================================
// Matching
// ============================================================================

#[tokio::test]
async fn test_downloads_missing_and_skips_present_across_extensions() {
    let (_dir, store) = common::store().await;
    store.write_download("alice.jpg", &common::jpeg(2048)).await.unwrap();

    let bucket = FakeBucket::with_objects(&[
        ("alice.png", common::png(2048)),
        ("bob.png", common::png(3000)),
    ]);
    let engine = common::engine(bucket.clone(), store.clone());

    let expected = common::names(&["alice", "bob"]);
    let summary = engine
        .download_missing(None, Some(&expected))
        .await
        .unwrap();

    assert_eq!(
        summary,
        DownloadSummary {
            downloaded: 1,
            skipped: 1,
            failed: 0
        }
    );
    assert_eq!(common::local_files(&store).await, vec!["alice.jpg", "bob.png"]);
    assert_eq!(bucket.count_calls("download:public:alice"), 0);
    // Downloads are never queued for upload.
    assert!(store.list_pending().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_local_jpg_satisfies_remote_png() {
    let (_dir, store) = common::store().await;
    store
        .write_download("janesmith.jpg", &common::jpeg(2048))
        .await
        .unwrap();
    let bucket = FakeBucket::with_objects(&[("janesmith.png", common::png(2048))]);
    let engine = common::engine(bucket.clone(), store.clone());

    let summary = engine.download_missing(None, None).await.unwrap();

    assert_eq!(summary.downloaded, 0);
    assert_eq!(summary.skipped, 1);
    assert_eq!(bucket.count_calls("download:"), 0);
}

#[tokio::test]
async fn test_remote_duplicates_first_match_wins() {
    let (_dir, store) = common::store().await;
    let bucket = FakeBucket::with_objects(&[
        ("x.png", common::png(2048)),
        ("x.jpg", common::jpeg(2048)),
    ]);
    let engine = common::engine(bucket.clone(), store.clone());

    let summary = engine.download_missing(None, None).await.unwrap();

    assert_eq!(summary.downloaded, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(common::local_files(&store).await, vec!["x.jpg"]);
    assert_eq!(bucket.count_calls("download:public:x.png"), 0);
}

#[tokio::test]
async fn test_remote_duplicate_falls_through_when_jpg_is_bad() {
    let (_dir, store) = common::store().await;
    let bucket = FakeBucket::with_objects(&[
        ("x.jpg", common::error_page()),
        ("x.png", common::png(2048)),
    ]);
    let engine = common::engine(bucket, store.clone());

    let summary = engine.download_missing(None, None).await.unwrap();

    assert_eq!(summary.downloaded, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(common::local_files(&store).await, vec!["x.png"]);
}

#[tokio::test]
async fn test_roster_filters_candidates() {
    let (_dir, store) = common::store().await;
    let bucket = FakeBucket::with_objects(&[
        ("alice.jpg", common::jpeg(2048)),
        ("mallory.jpg", common::jpeg(2048)),
    ]);
    let engine = common::engine(bucket, store.clone());

    let summary = engine
        .download_missing(None, Some(&common::names(&["Alice"])))
        .await
        .unwrap();

    assert_eq!(summary.downloaded, 1);
    assert_eq!(common::local_files(&store).await, vec!["alice.jpg"]);
}

#[tokio::test]
async fn test_naming_mismatch_downloads_everything() {
    let (_dir, store) = common::store().await;
    let bucket = FakeBucket::with_objects(&[("smith_jane.jpg", common::jpeg(2048))]);
    let engine = common::engine(bucket, store.clone());

    let summary = engine
        .download_missing(None, Some(&common::names(&["Jane Smith"])))
        .await
        .unwrap();

    assert_eq!(summary.downloaded, 1);
    assert_eq!(common::local_files(&store).await, vec!["smith_jane.jpg"]);
}

// ============================================================================
// Validation + endpoint fallback
// ============================================================================

#[tokio::test]
async fn test_error_page_is_deleted_and_counted_failed() {
    let (_dir, store) = common::store().await;
    let bucket = FakeBucket::with_objects(&[("carl.png", common::error_page())]);
    let engine = common::engine(bucket.clone(), store.clone());

    let summary = engine.download_missing(None, None).await.unwrap();

    assert_eq!(
        summary,
        DownloadSummary {
            downloaded: 0,
            skipped: 0,
            failed: 1
        }
    );
    assert!(common::local_files(&store).await.is_empty());
    // Public fetch rejected, authenticated fetch rejected: no third try.
    assert_eq!(bucket.count_calls("download:public:carl.png"), 1);
    assert_eq!(bucket.count_calls("download:authenticated:carl.png"), 1);
}

#[tokio::test]
async fn test_undersized_payload_is_rejected() {
    let (_dir, store) = common::store().await;
    let bucket = FakeBucket::with_objects(&[("tiny.jpg", common::jpeg(500))]);
    let engine = common::engine(bucket, store.clone());

    let summary = engine.download_missing(None, None).await.unwrap();

    assert_eq!(summary.failed, 1);
    assert!(common::local_files(&store).await.is_empty());
}

#[tokio::test]
async fn test_rejected_public_content_falls_back_to_authenticated() {
    let (_dir, store) = common::store().await;
    let real = common::jpeg(4096);
    let bucket = FakeBucket::with_objects(&[("dora.jpg", real.clone())]);
    bucket.serve_public("dora.jpg", common::error_page());
    let engine = common::engine(bucket.clone(), store.clone());

    let summary = engine.download_missing(None, None).await.unwrap();

    assert_eq!(summary.downloaded, 1);
    let path = store.root().join("dora.jpg");
    assert_eq!(tokio::fs::read(path).await.unwrap(), real);
    assert_eq!(bucket.count_calls("download:authenticated:dora.jpg"), 1);
}

#[tokio::test]
async fn test_private_bucket_uses_authenticated_endpoint() {
    let (_dir, store) = common::store().await;
    let bucket = FakeBucket::with_objects(&[("eve.png", common::png(2048))]);
    bucket.make_private("eve.png");
    let engine = common::engine(bucket.clone(), store.clone());

    let summary = engine.download_missing(None, None).await.unwrap();

    assert_eq!(summary.downloaded, 1);
    // 400 is permanent: one public attempt, no retries.
    assert_eq!(bucket.count_calls("download:public:eve.png"), 1);
}

// ============================================================================
// Empty-listing fallback
// ============================================================================

#[tokio::test]
async fn test_empty_listing_fetches_expected_names_directly() {
    let (_dir, store) = common::store().await;
    store.write_download("alice.jpg", &common::jpeg(2048)).await.unwrap();

    let bucket = FakeBucket::with_objects(&[("bob.png", common::png(2048))]);
    bucket.hide_listing();
    let engine = common::engine(bucket.clone(), store.clone());

    let expected = common::names(&["alice", "bob", "zed"]);
    let summary = engine
        .download_missing(None, Some(&expected))
        .await
        .unwrap();

    // zed exists under neither extension: not a failure.
    assert_eq!(
        summary,
        DownloadSummary {
            downloaded: 1,
            skipped: 1,
            failed: 0
        }
    );
    assert_eq!(common::local_files(&store).await, vec!["alice.jpg", "bob.png"]);
    assert_eq!(bucket.count_calls("download:public:bob.jpg"), 1);
    assert_eq!(bucket.count_calls("download:public:zed.png"), 1);
    assert_eq!(bucket.count_calls("download:public:alice"), 0);
}

#[tokio::test]
async fn test_empty_listing_direct_fetch_counts_bad_content() {
    let (_dir, store) = common::store().await;
    let bucket = FakeBucket::with_objects(&[("bob.jpg", common::error_page())]);
    bucket.hide_listing();
    let engine = common::engine(bucket, store.clone());

    let summary = engine
        .download_missing(None, Some(&common::names(&["bob"])))
        .await
        .unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.downloaded, 0);
    assert!(common::local_files(&store).await.is_empty());
}

#[tokio::test]
async fn test_direct_fetch_rejection_not_hidden_by_authenticated_miss() {
    let (_dir, store) = common::store().await;
    let bucket = FakeBucket::new();
    bucket.serve_public("bob.jpg", common::error_page());
    let engine = common::engine(bucket.clone(), store.clone());

    let summary = engine
        .download_missing(None, Some(&common::names(&["bob"])))
        .await
        .unwrap();

    assert_eq!(
        summary,
        DownloadSummary {
            downloaded: 0,
            skipped: 0,
            failed: 1
        }
    );
    assert!(common::local_files(&store).await.is_empty());
    assert_eq!(bucket.count_calls("download:authenticated:bob.jpg"), 1);
    assert_eq!(bucket.count_calls("download:public:bob.png"), 1);
}

#[tokio::test]
async fn test_empty_listing_without_roster_does_nothing() {
    let (_dir, store) = common::store().await;
    let bucket = FakeBucket::new();
    let engine = common::engine(bucket.clone(), store);

    let summary = engine.download_missing(None, None).await.unwrap();

    assert_eq!(summary, DownloadSummary::default());
    assert_eq!(bucket.calls(), vec!["list"]);
}

// ============================================================================
// Listing failures, progress, phase
// ============================================================================

#[tokio::test]
async fn test_permanent_listing_failure_propagates_without_retry() {
    let (_dir, store) = common::store().await;
    let bucket = FakeBucket::new();
    bucket.fail_listing(RemoteError::Status {
        status: 403,
        message: "Forbidden".into(),
    });
    let engine = common::engine(bucket.clone(), store);

    let err = engine.download_missing(None, None).await.unwrap_err();

    assert!(matches!(
        err,
        SyncError::ListFailed {
            status: Some(403),
            ..
        }
    ));
    assert_eq!(bucket.count_calls("list"), 1);
}

#[tokio::test]
async fn test_transient_listing_failure_is_retried() {
    let (_dir, store) = common::store().await;
    let bucket = FakeBucket::new();
    bucket.fail_listing(RemoteError::Status {
        status: 503,
        message: "Service Unavailable".into(),
    });
    let engine = common::engine(bucket.clone(), store);

    let err = engine.download_missing(None, None).await.unwrap_err();

    assert!(matches!(err, SyncError::ListFailed { .. }));
    assert_eq!(bucket.count_calls("list"), 3);
    assert_eq!(engine.phase(), SyncPhase::Idle);
}

#[tokio::test]
async fn test_progress_messages_and_idle_phase() {
    let (_dir, store) = common::store().await;
    let bucket = FakeBucket::with_objects(&[
        ("a.jpg", common::jpeg(2048)),
        ("b.jpg", common::jpeg(2048)),
    ]);
    let engine = common::engine(bucket, store);
    let log = ProgressLog::default();
    let callback = log.callback();

    engine.download_missing(Some(&callback), None).await.unwrap();

    assert_eq!(log.messages(), vec!["Downloading 1/2", "Downloading 2/2"]);
    assert_eq!(engine.phase(), SyncPhase::Idle);
}
