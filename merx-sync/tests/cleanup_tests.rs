mod common;

use std::sync::{Arc, Mutex};

use common::{draft, mock_config, waiting_object_json, Sequenced, BOOTS_HASH, KIDS_HASH};
use merx_client::PlatformClient;
use merx_sync::{CleanupStatistics, UnresolvedEntryCleanup, UNRESOLVED_CONTAINER};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn cleanup_against(server: &MockServer) -> UnresolvedEntryCleanup {
    UnresolvedEntryCleanup::new(Arc::new(PlatformClient::new(mock_config(server))))
}

fn container_path() -> String {
    format!("/test-project/custom-objects/{UNRESOLVED_CONTAINER}")
}

// ── Happy path ──────────────────────────────────────────────────

#[tokio::test]
async fn stale_entries_are_deleted_across_pages() {
    let server = MockServer::start().await;
    let kids = waiting_object_json(KIDS_HASH, &draft("kids"), &["clothing"]);
    let boots = waiting_object_json(BOOTS_HASH, &draft("boots"), &["shoes"]);

    Mock::given(method("GET"))
        .and(path(container_path()))
        .respond_with(Sequenced::new(vec![
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [kids.clone()],
                "next": "cursor-1",
            })),
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [boots.clone()],
            })),
        ]))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path(format!("{}/{KIDS_HASH}", container_path())))
        .respond_with(ResponseTemplate::new(200).set_body_json(kids))
        .expect(1)
        .mount(&server)
        .await;

    // Already gone still counts as deleted.
    Mock::given(method("DELETE"))
        .and(path(format!("{}/{BOOTS_HASH}", container_path())))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "message": "not found",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let statistics = cleanup_against(&server).cleanup(30).await;

    assert_eq!(statistics, CleanupStatistics { deleted: 2, failed: 0 });
    assert_eq!(
        statistics.report_message(),
        "Summary: 2 unresolved-reference records were deleted in total (0 failed to delete)."
    );
}

// ── Faults ──────────────────────────────────────────────────────

#[tokio::test]
async fn failed_deletions_are_counted_and_reported() {
    let server = MockServer::start().await;
    let kids = waiting_object_json(KIDS_HASH, &draft("kids"), &["clothing"]);

    Mock::given(method("GET"))
        .and(path(container_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "results": [kids],
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path(format!("{}/{KIDS_HASH}", container_path())))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
            "message": "boom",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let faults = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&faults);
    let statistics = cleanup_against(&server)
        .error_callback(move |fault| log.lock().unwrap().push(fault.to_string()))
        .cleanup(30)
        .await;

    assert_eq!(statistics, CleanupStatistics { deleted: 0, failed: 1 });
    assert_eq!(
        *faults.lock().unwrap(),
        ["transient fault (status 500): boom"]
    );
}

#[tokio::test]
async fn scan_fault_ends_the_run_with_partial_counters() {
    let server = MockServer::start().await;
    let kids = waiting_object_json(KIDS_HASH, &draft("kids"), &["clothing"]);

    Mock::given(method("GET"))
        .and(path(container_path()))
        .respond_with(Sequenced::new(vec![
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [kids.clone()],
                "next": "cursor-1",
            })),
            ResponseTemplate::new(503).set_body_json(serde_json::json!({
                "message": "scan broke",
            })),
        ]))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path(format!("{}/{KIDS_HASH}", container_path())))
        .respond_with(ResponseTemplate::new(200).set_body_json(kids))
        .expect(1)
        .mount(&server)
        .await;

    let faults = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&faults);
    let statistics = cleanup_against(&server)
        .error_callback(move |fault| log.lock().unwrap().push(fault.to_string()))
        .cleanup(30)
        .await;

    // The aborted scan is reported, not counted as a failed deletion.
    assert_eq!(statistics, CleanupStatistics { deleted: 1, failed: 0 });
    assert_eq!(
        *faults.lock().unwrap(),
        ["transient fault (status 503): scan broke"]
    );
}
