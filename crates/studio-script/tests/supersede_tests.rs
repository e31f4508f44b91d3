use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use studio_core::{ScriptConfig, ServiceError};
use studio_script::{BatchRequest, SceneBatchGenerator, ScriptError, ScriptRequest, ScriptService};
use tokio::sync::Notify;

/// Service whose first call blocks until released
struct GatedService {
    gate: Notify,
    calls: AtomicUsize,
}

#[async_trait]
impl ScriptService for GatedService {
    async fn generate_batch(&self, request: BatchRequest) -> Result<String, ServiceError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call == 0 {
            self.gate.notified().await;
        }
        let scenes: Vec<serde_json::Value> = (0..request.desired_count)
            .map(|i| {
                serde_json::json!({
                    "action": format!("call {call} scene {i}"),
                    "consistentContext": "same place",
                })
            })
            .collect();
        Ok(serde_json::Value::Array(scenes).to_string())
    }
}

#[tokio::test]
async fn stale_run_cannot_overwrite_newer_run() {
    let service = Arc::new(GatedService {
        gate: Notify::new(),
        calls: AtomicUsize::new(0),
    });
    let generator = Arc::new(SceneBatchGenerator::new(
        service.clone(),
        ScriptConfig {
            batch_delay_ms: 0,
            ..ScriptConfig::default()
        },
    ));

    let slow = {
        let generator = Arc::clone(&generator);
        tokio::spawn(async move { generator.generate(ScriptRequest::new("first", 5)).await })
    };
    // let the first run reach the gated call
    while service.calls.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }

    let fresh = generator
        .generate(ScriptRequest::new("second", 3))
        .await
        .unwrap();
    assert_eq!(fresh.scenes.len(), 3);

    service.gate.notify_one();
    let stale = slow.await.unwrap();
    assert!(matches!(stale, Err(ScriptError::Superseded(_))));

    let latest = generator.latest();
    assert_eq!(latest.run, fresh.run);
    assert_eq!(latest.scenes.len(), 3);
    assert!(latest.scenes.iter().all(|s| s.action.starts_with("call 1")));
}

#[tokio::test]
async fn rerun_restarts_numbering() {
    let service = Arc::new(GatedService {
        gate: Notify::new(),
        calls: AtomicUsize::new(1),
    });
    let generator = SceneBatchGenerator::new(
        service,
        ScriptConfig {
            batch_delay_ms: 0,
            ..ScriptConfig::default()
        },
    );

    let first = generator.generate(ScriptRequest::new("a", 4)).await.unwrap();
    let second = generator.generate(ScriptRequest::new("b", 2)).await.unwrap();
    assert!(second.run > first.run);
    let numbers: Vec<u32> = second.scenes.iter().map(|s| s.scene_number).collect();
    assert_eq!(numbers, vec![1, 2]);
}
