//! Terminal-outcome notification fan-out behavior.

mod common;

use std::sync::Arc;

use common::{params, BrokenPush, MemoryArtifacts, MockBinary, MockText};

use oremus::core::{Dependencies, OrchestratorOptions, PipelineOrchestrator, ProcessStore};

#[tokio::test]
async fn test_completion_notifies_process_then_global_topic() {
    let h = common::harness(MockText::new());

    let started = h
        .orchestrator
        .start_process(Some("p1".to_string()), params("gratitude"))
        .await
        .unwrap();
    started.wait().await;

    let sent = h.push.sent();
    assert_eq!(sent.len(), 2);

    // Process-specific topic first, global topic second
    assert_eq!(sent[0].0, "process.p1");
    assert_eq!(sent[1].0, "processes");

    for (_, payload) in &sent {
        assert_eq!(payload.kind, "completed");
        assert_eq!(payload.process_id, "p1");
        assert!(payload.result_ref.is_some());
        assert!(!payload.message.is_empty());
    }
}

#[tokio::test]
async fn test_failure_notifies_with_error_tag_and_no_result() {
    let h = common::harness(MockText::new().respond("titles", ""));

    let started = h
        .orchestrator
        .start_process(Some("p2".to_string()), params("gratitude"))
        .await
        .unwrap();
    started.wait().await;

    let sent = h.push.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].0, "process.p2");
    assert_eq!(sent[1].0, "processes");

    for (_, payload) in &sent {
        assert_eq!(payload.kind, "error");
        assert!(payload.result_ref.is_none());
        assert!(payload.message.contains("no usable candidates"));
    }
}

#[tokio::test]
async fn test_intermediate_stages_emit_no_notifications() {
    let h = common::harness(MockText::new());

    let started = h
        .orchestrator
        .start_process(Some("p3".to_string()), params("gratitude"))
        .await
        .unwrap();
    started.wait().await;

    // Seven stages ran, but only the terminal outcome was pushed
    let sent = h.push.sent();
    assert_eq!(sent.len(), 2);
}

#[tokio::test]
async fn test_push_failure_never_reaches_the_pipeline() {
    let store = Arc::new(ProcessStore::in_memory());
    let deps = Dependencies {
        text: Arc::new(MockText::new()),
        speech: Arc::new(MockBinary::ok("speech")),
        image: Arc::new(MockBinary::ok("image")),
        artifacts: Arc::new(MemoryArtifacts::new()),
        push: Arc::new(BrokenPush),
    };
    let orchestrator =
        PipelineOrchestrator::new(store.clone(), deps, OrchestratorOptions::default());

    let started = orchestrator
        .start_process(Some("p4".to_string()), params("gratitude"))
        .await
        .unwrap();
    started.wait().await;

    // Delivery failed on both topics, but the process is untouched
    let process = orchestrator.status("p4").await.unwrap();
    assert!(process.completed);
    assert_eq!(process.progress_percent, 100);
    assert!(process.result_ref.is_some());
}
