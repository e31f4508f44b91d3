use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use studio_assets::RequestOutcome;
use studio_core::{AssetKind, NotificationLevel, SlotKey, StudioEvent, ToolId, ValidationError, DAY_MS};
use studio_script::FidelityMode;
use studio_session::{
    EventOutcome, PanelController, SessionError, StoryPanel, Studio, SurvivalPanel, STORY_TOOL,
    SURVIVAL_TOOL,
};
use studio_test_utils::{
    memory_vault, record_at, test_clock, test_config, FakeAssetService, FakeScriptService, Gate,
    TEST_NOW_MS,
};
use studio_vault::ProjectVault;

fn story_panel(
    script: FakeScriptService,
    assets: Arc<FakeAssetService>,
    vault: Arc<ProjectVault>,
) -> Arc<PanelController<StoryPanel>> {
    Arc::new(PanelController::with_services(
        StoryPanel,
        Arc::new(script),
        assets,
        vault,
        &test_config(),
    ))
}

fn survival_panel(vault: Arc<ProjectVault>) -> Arc<PanelController<SurvivalPanel>> {
    Arc::new(PanelController::with_services(
        SurvivalPanel,
        Arc::new(FakeScriptService::new()),
        Arc::new(FakeAssetService::new()),
        vault,
        &test_config(),
    ))
}

#[tokio::test]
async fn twenty_five_scenes_in_batches_of_ten() {
    let vault = memory_vault(test_clock());
    let panel = story_panel(FakeScriptService::new(), Arc::new(FakeAssetService::new()), vault);
    panel.set_master_prompt("A lighthouse keeper's last night");
    panel.set_scene_count(25);
    panel.update_settings(|s| s.fidelity = FidelityMode::HighFidelity);

    let run = panel.generate_script().await.unwrap();
    assert_eq!(run.batches, 3);
    let numbers: Vec<u32> = panel.scenes().iter().map(|s| s.scene_number).collect();
    assert_eq!(numbers, (1..=25).collect::<Vec<_>>());
}

#[tokio::test]
async fn blank_prompt_keeps_existing_state() {
    let vault = memory_vault(test_clock());
    let assets = Arc::new(FakeAssetService::new());
    let panel = story_panel(FakeScriptService::new(), assets.clone(), vault);
    panel.set_master_prompt("Harbour");
    panel.generate_script().await.unwrap();
    panel.request_asset(0, AssetKind::Image).await.unwrap();

    panel.set_master_prompt("   ");
    let err = panel.generate_script().await.unwrap_err();
    assert!(err.is_validation());
    assert_eq!(panel.scenes().len(), 10);
    assert_eq!(panel.assets().cache().len(), 1);
}

#[tokio::test]
async fn regeneration_replaces_scenes_and_clears_assets() {
    let vault = memory_vault(test_clock());
    let assets = Arc::new(FakeAssetService::new());
    let panel = story_panel(FakeScriptService::new(), assets.clone(), vault);

    panel.set_master_prompt("first idea");
    panel.generate_script().await.unwrap();
    let outcome = panel.request_asset(2, AssetKind::Image).await.unwrap();
    assert!(outcome.is_completed());

    panel.set_master_prompt("second idea");
    panel.set_scene_count(4);
    panel.generate_script().await.unwrap();

    let scenes = panel.scenes();
    assert_eq!(scenes.len(), 4);
    assert!(scenes.iter().all(|s| s.action.starts_with("second idea")));
    assert!(panel.assets().cache().is_empty());
    assert!(panel
        .assets()
        .cache()
        .get(&SlotKey::new(2, AssetKind::Image))
        .is_none());
}

#[tokio::test]
async fn failed_batch_keeps_partial_scenes_and_notifies() {
    let vault = memory_vault(test_clock());
    let mut events = vault.bus().subscribe();
    let panel = story_panel(
        FakeScriptService::new().failing_on(1),
        Arc::new(FakeAssetService::new()),
        vault,
    );
    panel.set_master_prompt("Storm at sea");
    panel.set_scene_count(25);
    panel.update_settings(|s| s.fidelity = FidelityMode::HighFidelity);

    let err = panel.generate_script().await.unwrap_err();
    assert!(!err.is_validation());
    assert_eq!(panel.scenes().len(), 10);

    match events.recv().await.unwrap() {
        StudioEvent::Notification(n) => {
            assert_eq!(n.level, NotificationLevel::Error);
            assert_eq!(n.tool, Some(ToolId::new(STORY_TOOL)));
            assert!(n.message.contains("quota exceeded"));
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn video_needs_image_and_failures_stay_in_their_scene() {
    let vault = memory_vault(test_clock());
    let assets = Arc::new(FakeAssetService::new().failing_when("beat 2"));
    let panel = story_panel(FakeScriptService::new(), assets.clone(), vault);
    panel.set_master_prompt("Desert crossing");
    panel.set_scene_count(3);
    panel.generate_script().await.unwrap();

    let video = panel.request_asset(0, AssetKind::Video).await.unwrap();
    assert_eq!(
        video,
        RequestOutcome::MissingPrerequisite {
            needs: AssetKind::Image
        }
    );
    assert_eq!(assets.total_calls(), 0);

    assert!(panel.request_asset(0, AssetKind::Image).await.unwrap().is_completed());
    assert!(matches!(
        panel.request_asset(1, AssetKind::Image).await.unwrap(),
        RequestOutcome::Failed { .. }
    ));
    assert!(panel.request_asset(0, AssetKind::Video).await.unwrap().is_completed());

    let cache = panel.assets().cache();
    assert!(cache.get(&SlotKey::new(0, AssetKind::Image)).unwrap().error.is_none());
    assert!(cache.get(&SlotKey::new(1, AssetKind::Image)).unwrap().error.is_some());
}

#[tokio::test]
async fn survival_panel_rejects_slots_it_does_not_offer() {
    let vault = memory_vault(test_clock());
    let panel = survival_panel(vault);
    panel.set_master_prompt("Build a snow shelter");
    panel.generate_script().await.unwrap();

    let err = panel.request_asset(0, AssetKind::Image).await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Validation(ValidationError::UnsupportedSlot(_))
    ));
    assert!(panel
        .request_asset(0, AssetKind::ImageMid)
        .await
        .unwrap()
        .is_completed());
}

#[tokio::test]
async fn save_then_load_round_trips_session_and_assets() {
    let vault = memory_vault(test_clock());
    let panel = story_panel(
        FakeScriptService::new(),
        Arc::new(FakeAssetService::new()),
        vault.clone(),
    );
    panel.set_master_prompt("Night market");
    panel.set_scene_count(5);
    panel.update_settings(|s| s.language = "Khmer".into());
    panel.generate_script().await.unwrap();
    panel.request_asset(3, AssetKind::Image).await.unwrap();

    let outcome = panel
        .handle_event(&StudioEvent::RequestSave {
            tool: ToolId::new(STORY_TOOL),
        })
        .unwrap();
    let EventOutcome::Saved(record) = outcome else {
        panic!("story panel should save");
    };
    assert_eq!(record.title, "Night market");
    assert_eq!(record.category, "story");

    let fresh = story_panel(
        FakeScriptService::new(),
        Arc::new(FakeAssetService::new()),
        vault.clone(),
    );
    let loaded = fresh
        .handle_event(&StudioEvent::LoadProject(Arc::new(record)))
        .unwrap();
    assert!(matches!(loaded, EventOutcome::Loaded(_)));
    assert_eq!(fresh.session(), panel.session());
    assert_eq!(
        fresh.assets().cache().snapshot(),
        panel.assets().cache().snapshot()
    );
}

#[tokio::test]
async fn old_record_restores_partially() {
    let vault = memory_vault(test_clock());
    let panel = story_panel(
        FakeScriptService::new(),
        Arc::new(FakeAssetService::new()),
        vault,
    );
    panel.set_master_prompt("current");
    panel.set_scene_count(7);
    panel.update_settings(|s| s.language = "French".into());

    let old = record_at(STORY_TOOL, "legacy", TEST_NOW_MS - DAY_MS);
    panel
        .handle_event(&StudioEvent::LoadProject(Arc::new(old)))
        .unwrap();

    let session = panel.session();
    assert_eq!(session.master_prompt, "legacy");
    assert_eq!(session.scene_count, 7);
    assert_eq!(session.settings.language, "French");
}

#[tokio::test]
async fn events_for_other_tools_are_ignored() {
    let vault = memory_vault(test_clock());
    let survival = survival_panel(vault.clone());
    survival.set_master_prompt("keep me");

    let save = StudioEvent::RequestSave {
        tool: ToolId::new(STORY_TOOL),
    };
    assert_eq!(survival.handle_event(&save).unwrap(), EventOutcome::Ignored);
    assert!(vault.is_empty().unwrap());

    let foreign = record_at(STORY_TOOL, "not yours", TEST_NOW_MS);
    assert_eq!(
        survival
            .handle_event(&StudioEvent::LoadProject(Arc::new(foreign)))
            .unwrap(),
        EventOutcome::Ignored
    );
    assert_eq!(survival.session().master_prompt, "keep me");
}

#[tokio::test]
async fn save_during_run_snapshots_partial_scenes() {
    let vault = memory_vault(test_clock());
    let gate = Arc::new(Gate::closed());
    let panel = story_panel(
        FakeScriptService::new().gated(gate.clone()),
        Arc::new(FakeAssetService::new()),
        vault,
    );
    panel.set_master_prompt("Long voyage");
    panel.set_scene_count(20);
    panel.update_settings(|s| s.fidelity = FidelityMode::HighFidelity);

    let running = {
        let panel = Arc::clone(&panel);
        tokio::spawn(async move { panel.generate_script().await })
    };
    gate.release(1);
    gate.wait_for(2).await;

    let record = panel.save().unwrap();
    let saved_scenes = record.data["scenes"].as_array().unwrap().len();
    assert_eq!(saved_scenes, 10);

    gate.release(1);
    let run = running.await.unwrap().unwrap();
    assert_eq!(run.scenes.len(), 20);
    assert_eq!(panel.scenes().len(), 20);
}

#[tokio::test]
async fn studio_routes_save_to_active_panel_only() {
    let clock = test_clock();
    let vault = memory_vault(clock);
    vault
        .import_merge(vec![
            record_at(SURVIVAL_TOOL, "expired", TEST_NOW_MS - 31 * DAY_MS),
            record_at(SURVIVAL_TOOL, "kept", TEST_NOW_MS - 29 * DAY_MS),
        ])
        .unwrap();

    let studio = Studio::start(vault.clone()).unwrap();
    assert_eq!(vault.len().unwrap(), 1);

    let story = story_panel(
        FakeScriptService::new(),
        Arc::new(FakeAssetService::new()),
        vault.clone(),
    );
    let survival = survival_panel(vault.clone());
    story.set_master_prompt("Story draft");
    let _story_task = story.listen();
    let _survival_task = survival.listen();

    studio.activate(ToolId::new(STORY_TOOL));
    assert_eq!(studio.request_save(), Some(ToolId::new(STORY_TOOL)));

    tokio::time::timeout(Duration::from_secs(5), async {
        while vault.len().unwrap() < 2 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();

    let records = vault.list().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].tool, STORY_TOOL);
    assert_eq!(records[0].title, "Story draft");
    assert_eq!(records[1].title, "kept");
}

#[tokio::test]
async fn second_generate_supersedes_first_in_session() {
    let vault = memory_vault(test_clock());
    let mut events = vault.bus().subscribe();
    let gate = Arc::new(Gate::closed());
    let panel = story_panel(
        FakeScriptService::new().gated(gate.clone()),
        Arc::new(FakeAssetService::new()),
        vault,
    );
    panel.set_scene_count(3);

    panel.set_master_prompt("first");
    let first = {
        let panel = Arc::clone(&panel);
        tokio::spawn(async move { panel.generate_script().await })
    };
    gate.wait_for(1).await;

    panel.set_master_prompt("second");
    let second = {
        let panel = Arc::clone(&panel);
        tokio::spawn(async move { panel.generate_script().await })
    };
    gate.wait_for(2).await;
    gate.release(2);

    let first = first.await.unwrap();
    let second = second.await.unwrap();
    assert!(first.unwrap_err().is_superseded());
    assert_eq!(second.unwrap().scenes.len(), 3);

    let actions: Vec<String> = panel.scenes().into_iter().map(|s| s.action).collect();
    assert_eq!(
        actions,
        vec!["second - beat 1", "second - beat 2", "second - beat 3"]
    );

    while let Ok(event) = events.try_recv() {
        if let StudioEvent::Notification(n) = event {
            assert_ne!(n.level, NotificationLevel::Error, "unexpected {n:?}");
        }
    }
}

#[tokio::test]
async fn restore_during_run_is_not_overwritten() {
    let vault = memory_vault(test_clock());
    let gate = Arc::new(Gate::closed());
    let panel = story_panel(
        FakeScriptService::new().gated(gate.clone()),
        Arc::new(FakeAssetService::new()),
        vault,
    );
    panel.set_master_prompt("Long voyage");
    panel.set_scene_count(20);
    panel.update_settings(|s| s.fidelity = FidelityMode::HighFidelity);

    let running = {
        let panel = Arc::clone(&panel);
        tokio::spawn(async move { panel.generate_script().await })
    };
    gate.release(1);
    gate.wait_for(2).await;
    assert_eq!(panel.scenes().len(), 10);

    panel
        .restore(&serde_json::json!({
            "scenes": [
                { "sceneNumber": 1, "action": "restored", "consistentContext": "saved cut" }
            ]
        }))
        .unwrap();

    gate.release(1);
    let run = running.await.unwrap().unwrap();
    assert_eq!(run.scenes.len(), 20);

    let actions: Vec<String> = panel.scenes().into_iter().map(|s| s.action).collect();
    assert_eq!(actions, vec!["restored"]);
}

#[tokio::test]
async fn scene_json_uses_current_panel_style() {
    let vault = memory_vault(test_clock());
    let panel = story_panel(FakeScriptService::new(), Arc::new(FakeAssetService::new()), vault);
    panel.set_master_prompt("Tea harvest");
    panel.set_scene_count(3);
    panel.generate_script().await.unwrap();
    panel.update_settings(|s| s.visual_style = "watercolor".into());

    let text = panel.scene_json(1).unwrap();
    assert!(text.starts_with("{\n  \"sceneNumber\": 2,\n  \"action\""));
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["action"], "Tea harvest - beat 2");
    let prompt = value["prompt"].as_str().unwrap();
    assert!(prompt.starts_with("Tea harvest / continuity"));
    assert!(prompt.ends_with("Style: watercolor"));

    let script: serde_json::Value = serde_json::from_str(&panel.script_json().unwrap()).unwrap();
    assert_eq!(script.as_array().unwrap().len(), 3);

    let err = panel.scene_json(7).unwrap_err();
    assert!(matches!(
        err,
        SessionError::Validation(ValidationError::SceneOutOfRange { index: 7, len: 3 })
    ));
}
