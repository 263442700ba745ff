mod common;

use common::{
    collaborators, fast_worker_config, DeadClient, FailOnceTransform, FakePages, FlakyClient,
    UppercaseTransform, WaitingClient,
};
use page_map_reduce_core::coordinator::Coordinator;
use page_map_reduce_core::coordinator_client::LocalCoordinatorClient;
use page_map_reduce_core::error::WorkerError;
use page_map_reduce_core::output_layout::OutputLayout;
use page_map_reduce_core::protocol::{CompletionReport, PollRequest};
use page_map_reduce_core::worker::Worker;
use std::sync::Arc;
use std::time::Duration;

fn two_documents() -> Arc<FakePages> {
    Arc::new(FakePages::new(&[
        ("docs/alpha.txt", &["first page", "second page", "third page"][..]),
        ("docs/beta.txt", &["only page"][..]),
    ]))
}

async fn discover(pages: &FakePages, lease: Duration) -> Arc<Coordinator> {
    let ids = vec!["docs/alpha.txt".to_string(), "docs/beta.txt".to_string()];
    Arc::new(Coordinator::discover(ids, pages, lease).await.unwrap())
}

#[tokio::test]
async fn test_workers_complete_the_job_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let layout = OutputLayout::new(dir.path());
    let pages = two_documents();
    let coordinator = discover(&pages, Duration::from_secs(30)).await;

    let mut handles = Vec::new();
    for i in 0..3 {
        let worker = Worker::new(
            format!("w{}", i),
            LocalCoordinatorClient::new(coordinator.clone()),
            collaborators(pages.clone(), Arc::new(UppercaseTransform), &layout),
            layout.clone(),
            fast_worker_config(dir.path()),
        );
        handles.push(tokio::spawn(worker.run()));
    }

    let mut maps = 0;
    let mut reduces = 0;
    for handle in handles {
        let summary = handle.await.unwrap().unwrap();
        maps += summary.maps_done;
        reduces += summary.reduces_done;
        assert_eq!(summary.abandoned, 0);
    }
    assert_eq!(maps, 4);
    assert_eq!(reduces, 2);
    assert!(coordinator.job_done());

    let page_two = std::fs::read_to_string(layout.page_output_path("docs/alpha.txt", 2)).unwrap();
    assert_eq!(page_two, "SECOND PAGE\n");

    let alpha = std::fs::read_to_string(layout.assembled_output_path("docs/alpha.txt")).unwrap();
    assert_eq!(alpha, "FIRST PAGE\nSECOND PAGE\nTHIRD PAGE\n");
    let beta = std::fs::read_to_string(dir.path().join("translated_beta.txt")).unwrap();
    assert_eq!(beta, "ONLY PAGE\n");
}

#[tokio::test]
async fn test_failed_page_is_abandoned_and_redone_after_lease() {
    let dir = tempfile::tempdir().unwrap();
    let layout = OutputLayout::new(dir.path());
    let pages = two_documents();
    let coordinator = discover(&pages, Duration::from_millis(50)).await;

    let worker = Worker::new(
        "solo",
        LocalCoordinatorClient::new(coordinator.clone()),
        collaborators(pages.clone(), Arc::new(FailOnceTransform::new(&[2])), &layout),
        layout.clone(),
        fast_worker_config(dir.path()),
    );
    let summary = tokio::time::timeout(Duration::from_secs(10), worker.run())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(summary.abandoned, 1);
    assert_eq!(summary.maps_done, 4);
    assert_eq!(summary.reduces_done, 2);
    assert!(coordinator.job_done());
    assert!(coordinator.progress().expired_leases >= 1);

    let alpha = std::fs::read_to_string(layout.assembled_output_path("docs/alpha.txt")).unwrap();
    assert_eq!(alpha, "FIRST PAGE\nSECOND PAGE\nTHIRD PAGE\n");
}

#[tokio::test]
async fn test_report_is_resent_after_transport_failure() {
    let dir = tempfile::tempdir().unwrap();
    let layout = OutputLayout::new(dir.path());
    let pages = two_documents();
    let coordinator = discover(&pages, Duration::from_secs(30)).await;

    // call 0 fetches page 1, call 1 carries its report and fails
    let client = Arc::new(FlakyClient::new(
        LocalCoordinatorClient::new(coordinator.clone()),
        &[1],
    ));
    let worker = Worker::new(
        "flaky",
        client.clone(),
        collaborators(pages.clone(), Arc::new(UppercaseTransform), &layout),
        layout.clone(),
        fast_worker_config(dir.path()),
    );
    let summary = worker.run().await.unwrap();

    assert_eq!(summary.transport_failures, 1);
    assert!(coordinator.job_done());

    let requests = client.requests.lock().unwrap();
    let first_report = PollRequest::with_report(CompletionReport::MapDone {
        doc_id: "docs/alpha.txt".to_string(),
        page: 1,
    });
    assert_eq!(requests[1], (first_report.clone(), false));
    assert_eq!(requests[2], (first_report, true));
}

#[tokio::test]
async fn test_worker_gives_up_on_unreachable_coordinator() {
    let dir = tempfile::tempdir().unwrap();
    let layout = OutputLayout::new(dir.path());
    let mut config = fast_worker_config(dir.path());
    config.give_up_after = 4;

    let worker = Worker::new(
        "lonely",
        DeadClient,
        collaborators(two_documents(), Arc::new(UppercaseTransform), &layout),
        layout,
        config,
    );

    let err = worker.run().await.unwrap_err();
    assert!(matches!(err, WorkerError::CoordinatorLost { attempts: 4, .. }));
}

#[tokio::test]
async fn test_worker_keeps_retrying_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let layout = OutputLayout::new(dir.path());
    let pages = two_documents();
    let coordinator = discover(&pages, Duration::from_secs(30)).await;

    // The coordinator is unreachable for the first 150 polls, then comes back
    let outage: Vec<usize> = (0..150).collect();
    let client = FlakyClient::new(LocalCoordinatorClient::new(coordinator.clone()), &outage);
    let worker = Worker::new(
        "persistent",
        client,
        collaborators(pages.clone(), Arc::new(UppercaseTransform), &layout),
        layout,
        fast_worker_config(dir.path()),
    );

    let summary = tokio::time::timeout(Duration::from_secs(10), worker.run())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(summary.transport_failures, 150);
    assert_eq!(summary.maps_done, 4);
    assert!(coordinator.job_done());
}

#[tokio::test]
async fn test_cancelled_worker_stops_polling() {
    let dir = tempfile::tempdir().unwrap();
    let layout = OutputLayout::new(dir.path());
    let mut config = fast_worker_config(dir.path());
    config.wait_interval_ms = 60_000;

    let worker = Worker::new(
        "patient",
        WaitingClient,
        collaborators(two_documents(), Arc::new(UppercaseTransform), &layout),
        layout,
        config,
    );
    let cancel = worker.cancellation_token();
    let handle = tokio::spawn(worker.run());

    tokio::time::sleep(Duration::from_millis(20)).await;
    cancel.cancel();

    let summary = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(summary.maps_done, 0);
}
