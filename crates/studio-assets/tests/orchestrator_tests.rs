use async_trait::async_trait;
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use studio_assets::{
    AspectRatio, AssetCache, AssetError, AssetService, RequestOutcome, SceneAssetOrchestrator,
    StyleProfile,
};
use studio_core::{AssetConfig, AssetKind, Scene, ServiceError, SlotKey};
use tokio::sync::Notify;

/// Image service that parks every call until released
#[derive(Default)]
struct GatedImages {
    gate: Notify,
    calls: AtomicUsize,
    prompts: parking_lot::Mutex<Vec<String>>,
}

#[async_trait]
impl AssetService for GatedImages {
    async fn generate_image(&self, prompt: &str, aspect: AspectRatio) -> Result<String, ServiceError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(prompt.to_string());
        self.gate.notified().await;
        Ok(format!("https://img/{n}/{aspect}"))
    }

    async fn generate_video(
        &self,
        _prompt: &str,
        _image_url: &str,
        _aspect: AspectRatio,
    ) -> Result<Vec<u8>, ServiceError> {
        Err(ServiceError::new("video disabled"))
    }

    async fn generate_speech(&self, _text: &str, _voice: Option<&str>) -> Result<Vec<u8>, ServiceError> {
        Err(ServiceError::new("speech disabled"))
    }
}

fn scenes() -> Vec<Scene> {
    (1..=3)
        .map(|n| Scene::new(n, format!("beat {n}"), format!("alpine hut, scene {n}")))
        .collect()
}

async fn wait_for_calls(service: &GatedImages, n: usize) {
    while service.calls.load(Ordering::SeqCst) < n {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn duplicate_request_while_loading_calls_service_once() {
    let service = Arc::new(GatedImages::default());
    let orch = Arc::new(SceneAssetOrchestrator::new(service.clone(), &AssetConfig::default()));
    let scenes = scenes();

    let first = orch.spawn_request(&scenes, 0, AssetKind::Image).unwrap();
    wait_for_calls(&service, 1).await;

    let second = orch.request_asset(&scenes, 0, AssetKind::Image).await.unwrap();
    assert_eq!(second, RequestOutcome::AlreadyLoading);

    service.gate.notify_one();
    let outcome = first.await.unwrap();
    assert_eq!(
        outcome,
        RequestOutcome::Completed {
            url: "https://img/0/16:9".into()
        }
    );
    assert_eq!(service.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn concurrent_slots_do_not_clobber_each_other() {
    let service = Arc::new(GatedImages::default());
    let orch = Arc::new(SceneAssetOrchestrator::new(service.clone(), &AssetConfig::default()));
    let scenes = scenes();

    let handles: Vec<_> = (0..3)
        .map(|i| orch.spawn_request(&scenes, i, AssetKind::Image).unwrap())
        .collect();
    wait_for_calls(&service, 3).await;
    for _ in 0..3 {
        service.gate.notify_one();
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_completed());
    }
    for i in 0..3 {
        let slot = orch.cache().get(&SlotKey::new(i, AssetKind::Image)).unwrap();
        assert!(slot.has_url());
        assert!(!slot.loading);
    }
}

#[tokio::test]
async fn completion_after_clear_is_discarded() {
    let service = Arc::new(GatedImages::default());
    let orch = Arc::new(SceneAssetOrchestrator::new(service.clone(), &AssetConfig::default()));
    let scenes = scenes();

    let pending = orch.spawn_request(&scenes, 1, AssetKind::Image).unwrap();
    wait_for_calls(&service, 1).await;
    orch.clear();

    service.gate.notify_one();
    assert_eq!(pending.await.unwrap(), RequestOutcome::Discarded);
    assert!(orch.cache().get(&SlotKey::new(1, AssetKind::Image)).is_none());
}

#[tokio::test]
async fn request_issued_before_clear_never_lands_in_new_script() {
    let service = Arc::new(GatedImages::default());
    let orch = Arc::new(SceneAssetOrchestrator::new(service.clone(), &AssetConfig::default()));
    let old_script = vec![Scene::new(1, "old beat", "old script context")];

    // current-thread runtime: the task has not started when clear() runs
    let handle = orch.spawn_request(&old_script, 0, AssetKind::Image).unwrap();
    orch.clear();

    let outcome = SceneAssetOrchestrator::join_request(handle).await.unwrap();
    assert_eq!(outcome, RequestOutcome::Discarded);
    assert_eq!(service.calls.load(Ordering::SeqCst), 0);
    assert!(orch.cache().get(&SlotKey::new(0, AssetKind::Image)).is_none());
}

#[tokio::test]
async fn request_tagged_with_old_epoch_is_discarded() {
    let service = Arc::new(GatedImages::default());
    let orch = SceneAssetOrchestrator::new(service.clone(), &AssetConfig::default());
    let issued = orch.cache().epoch();
    orch.clear();

    let outcome = orch
        .request_asset_at(issued, &scenes(), 0, AssetKind::Image)
        .await
        .unwrap();
    assert_eq!(outcome, RequestOutcome::Discarded);
    assert!(orch.cache().is_empty());
}

#[tokio::test]
async fn aborted_request_surfaces_as_task_error() {
    let service = Arc::new(GatedImages::default());
    let orch = Arc::new(SceneAssetOrchestrator::new(service.clone(), &AssetConfig::default()));

    let handle = orch.spawn_request(&scenes(), 0, AssetKind::Image).unwrap();
    wait_for_calls(&service, 1).await;
    handle.abort();

    let err = SceneAssetOrchestrator::join_request(handle).await.unwrap_err();
    assert!(matches!(err, AssetError::Task(_)));
}

#[tokio::test]
async fn prompt_uses_scene_context_and_panel_style() {
    let service = Arc::new(GatedImages::default());
    let orch = Arc::new(
        SceneAssetOrchestrator::new(service.clone(), &AssetConfig::default()).with_style(
            StyleProfile::new()
                .with_directive("muted palette")
                .with_aspect(AspectRatio::Portrait),
        ),
    );
    let handle = orch.spawn_request(&scenes(), 2, AssetKind::Image).unwrap();
    wait_for_calls(&service, 1).await;
    service.gate.notify_one();
    let outcome = handle.await.unwrap();

    assert_eq!(
        outcome,
        RequestOutcome::Completed {
            url: "https://img/0/9:16".into()
        }
    );
    let prompt = service.prompts.lock()[0].clone();
    assert!(prompt.starts_with("alpine hut, scene 3"));
    assert!(prompt.ends_with("Style: muted palette"));
}

proptest! {
    // Any interleaving of begin/complete on distinct keys leaves each slot
    // with exactly its own url.
    #[test]
    fn slots_are_independent(order in proptest::collection::vec(0usize..6, 1..40)) {
        let cache = AssetCache::new();
        let mut tickets = std::collections::HashMap::new();
        for index in order {
            let key = SlotKey::new(index, AssetKind::Image);
            match tickets.remove(&index) {
                Some(ticket) => {
                    let url = format!("url-{index}");
                    prop_assert!(cache.complete(&ticket, url));
                }
                None => {
                    if let Some(ticket) = cache.try_begin(&key) {
                        tickets.insert(index, ticket);
                    }
                }
            }
        }
        for index in 0..6 {
            if let Some(slot) = cache.get(&SlotKey::new(index, AssetKind::Image)) {
                prop_assert_eq!(slot.loading, tickets.contains_key(&index));
                if let Some(url) = slot.url {
                    prop_assert_eq!(url, format!("url-{index}"));
                }
            }
        }
    }
}
