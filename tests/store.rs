//! Process store invariants under concurrent access.

use std::sync::Arc;

use oremus::core::ProcessStore;
use oremus::domain::{GenerationParams, PayloadField, PipelineError, ProcessPayload};

fn payload(topic: &str) -> ProcessPayload {
    let params = GenerationParams {
        topic: topic.to_string(),
        style: "reflective".to_string(),
        duration: "Padrão".to_string(),
        prayer_kind: "morning".to_string(),
        ..Default::default()
    };
    ProcessPayload::from_params(&params, "pt")
}

#[tokio::test]
async fn test_create_succeeds_exactly_once_per_id() {
    let store = ProcessStore::in_memory();

    store.create("p1", payload("a")).await.unwrap();
    assert!(matches!(
        store.create("p1", payload("b")).await,
        Err(PipelineError::AlreadyExists(_))
    ));

    // The original payload survived the rejected second create
    assert_eq!(store.payload("p1").await.unwrap().topic, "a");
}

#[tokio::test]
async fn test_progress_is_monotonic_over_lifetime() {
    let store = ProcessStore::in_memory();
    store.create("p1", payload("a")).await.unwrap();

    // The raw stage table reports a lower number after a higher one
    // (compilation after description); observers must never see it drop.
    let reported = [20u8, 45, 50, 70, 75, 80, 85, 90, 70, 80];
    let mut observed = Vec::new();

    for (i, percent) in reported.iter().enumerate() {
        store
            .update_status("p1", &format!("stage-{}", i), *percent)
            .await;
        observed.push(store.get("p1").await.unwrap().progress_percent);
    }

    for window in observed.windows(2) {
        assert!(window[1] >= window[0], "progress regressed: {:?}", observed);
    }
    assert_eq!(*observed.last().unwrap(), 90);
}

#[tokio::test]
async fn test_completed_always_implies_result_ref() {
    let store = ProcessStore::in_memory();
    store.create("p1", payload("a")).await.unwrap();

    // Completion without a result is refused outright
    assert!(store.mark_completed("p1", "Completed").await.is_err());
    assert!(!store.get("p1").await.unwrap().completed);

    store.set_result("p1", "doc-ref").await.unwrap();
    store.mark_completed("p1", "Completed").await.unwrap();

    let process = store.get("p1").await.unwrap();
    assert!(process.completed);
    assert_eq!(process.progress_percent, 100);
    assert!(process.result_ref.is_some());
}

#[tokio::test]
async fn test_last_updated_moves_on_every_mutation() {
    let store = ProcessStore::in_memory();
    store.create("p1", payload("a")).await.unwrap();

    let before = store.get("p1").await.unwrap().last_updated_at;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;

    store
        .set_field("p1", PayloadField::Content("text".to_string()))
        .await
        .unwrap();

    let after = store.get("p1").await.unwrap().last_updated_at;
    assert!(after > before);
}

#[tokio::test]
async fn test_concurrent_writers_on_distinct_processes() {
    let store = Arc::new(ProcessStore::in_memory());

    for i in 0..8 {
        store
            .create(&format!("p{}", i), payload("a"))
            .await
            .unwrap();
    }

    let mut tasks = Vec::new();
    for i in 0..8 {
        let store = store.clone();
        tasks.push(tokio::spawn(async move {
            let id = format!("p{}", i);
            for step in 1..=20u8 {
                store.update_status(&id, "working", step * 4).await;
                store
                    .set_field(&id, PayloadField::Content(format!("v{}", step)))
                    .await
                    .unwrap();
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    for i in 0..8 {
        let id = format!("p{}", i);
        let process = store.get(&id).await.unwrap();
        assert_eq!(process.progress_percent, 80);
        assert_eq!(
            store.payload(&id).await.unwrap().content.as_deref(),
            Some("v20")
        );
    }
}

#[tokio::test]
async fn test_failure_of_one_process_is_invisible_to_others() {
    let store = ProcessStore::in_memory();
    store.create("healthy", payload("a")).await.unwrap();
    store.create("broken", payload("b")).await.unwrap();

    store.update_status("healthy", "working", 60).await;
    store.mark_failed("broken", "backend exploded").await;

    let healthy = store.get("healthy").await.unwrap();
    assert_eq!(healthy.progress_percent, 60);
    assert!(!store.is_failed("healthy").await);
    assert!(store.is_failed("broken").await);
}

#[tokio::test]
async fn test_snapshot_round_trip_preserves_record() {
    let temp = tempfile::TempDir::new().unwrap();

    {
        let store = ProcessStore::persistent(temp.path());
        store.create("p1", payload("gratitude")).await.unwrap();
        store.update_status("p1", "Compiling final document", 80).await;
        store.set_result("p1", "p1/document-abc.md").await.unwrap();
        store.mark_completed("p1", "Completed").await.unwrap();
    }

    let reopened = ProcessStore::persistent(temp.path());

    let process = reopened.get("p1").await.unwrap();
    assert!(process.completed);
    assert_eq!(process.progress_percent, 100);
    assert_eq!(process.result_ref.as_deref(), Some("p1/document-abc.md"));

    let listed = reopened.list().await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].process_id, "p1");
}
