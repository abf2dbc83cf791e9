mod common;

use common::{
    config, settle, ReadScript, RecordingNotifier, ScriptedClient, Worksheet, DEBOUNCE,
    FLUSH_INTERVAL,
};
use scitrek_core::{
    Day1Answers, Hydration, ModuleId, ModuleSession, SaveNotice, SaveOptions, SaveOutcome,
    SaveState, SaveStatus, SaveTrigger, Visibility,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

async fn mount_worksheet(
    client: &Arc<ScriptedClient>,
    notifier: &Arc<RecordingNotifier>,
) -> ModuleSession<Worksheet> {
    ModuleSession::mount(
        ModuleId::new(1),
        client.clone(),
        notifier.clone(),
        config(),
    )
    .await
}

#[tokio::test(start_paused = true)]
async fn one_edit_yields_one_debounced_write() {
    let client = Arc::new(ScriptedClient::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let session = mount_worksheet(&client, &notifier).await;

    session.edit(|answers| answers.worksheet[0] = "gene".to_string());
    assert_eq!(session.state(), SaveState::Dirty);

    sleep(DEBOUNCE - Duration::from_millis(100)).await;
    settle().await;
    assert!(client.attempts().is_empty());

    sleep(Duration::from_millis(200)).await;
    settle().await;
    assert_eq!(
        client.attempts(),
        vec![json!({"worksheet": ["gene", "", "", ""]})]
    );
    assert_eq!(session.state(), SaveState::Clean);
    assert!(matches!(
        session.status(),
        SaveStatus::Saved { unsaved: false, .. }
    ));
    assert!(notifier.notices().is_empty());
}

#[tokio::test(start_paused = true)]
async fn burst_of_edits_collapses_into_one_write_with_latest_content() {
    let client = Arc::new(ScriptedClient::new());
    let session = mount_worksheet(&client, &Arc::new(RecordingNotifier::default())).await;

    for word in ["g", "ge", "gen", "gene"] {
        session
            .set("worksheet[0]", json!(word))
            .expect("path should be valid");
        sleep(Duration::from_millis(400)).await;
    }
    sleep(DEBOUNCE).await;
    settle().await;

    assert_eq!(
        client.attempts(),
        vec![json!({"worksheet": ["gene", "", "", ""]})]
    );
    assert_eq!(session.state(), SaveState::Clean);
}

#[tokio::test(start_paused = true)]
async fn edit_during_write_keeps_store_dirty_and_saves_again() {
    let client = Arc::new(ScriptedClient::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let session = mount_worksheet(&client, &notifier).await;

    client.hold_writes();
    session.edit(|answers| answers.worksheet[0] = "gene".to_string());
    let explicit =
        session
            .coordinator()
            .start_save(SaveTrigger::Explicit, SaveOptions::explicit(), false);
    client.wait_for_write_start().await;
    assert_eq!(session.state(), SaveState::Saving);

    session.edit(|answers| answers.worksheet[1] = "promoter".to_string());
    assert_eq!(session.state(), SaveState::SavingWhileDirty);

    client.resume_writes();
    assert_eq!(explicit.outcome().await, SaveOutcome::Saved);
    assert_eq!(session.state(), SaveState::Dirty);
    assert!(matches!(
        session.status(),
        SaveStatus::Saved { unsaved: true, .. }
    ));
    assert_eq!(
        client.attempts()[0],
        json!({"worksheet": ["gene", "", "", ""]})
    );
    assert_eq!(
        notifier.notices(),
        vec![SaveNotice::Saved {
            trigger: SaveTrigger::Explicit
        }]
    );

    sleep(DEBOUNCE + Duration::from_millis(100)).await;
    settle().await;
    assert_eq!(
        client.server_blob(),
        Some(json!({"worksheet": ["gene", "promoter", "", ""]}))
    );
    assert_eq!(session.state(), SaveState::Clean);
}

#[tokio::test(start_paused = true)]
async fn triggers_during_a_write_never_start_a_second_write() {
    let client = Arc::new(ScriptedClient::new());
    let session = mount_worksheet(&client, &Arc::new(RecordingNotifier::default())).await;

    client.hold_writes();
    session.edit(|answers| answers.worksheet[0] = "gene".to_string());
    let first = session.on_visibility_change(Visibility::Hidden);
    assert!(first.is_in_flight());
    client.wait_for_write_start().await;

    session.edit(|answers| answers.worksheet[2] = "codon".to_string());
    let explicit =
        session
            .coordinator()
            .start_save(SaveTrigger::Explicit, SaveOptions::explicit(), false);
    assert!(matches!(
        explicit.outcome().await,
        SaveOutcome::Dropped
    ));
    assert!(matches!(
        session.on_visibility_change(Visibility::Hidden).outcome().await,
        SaveOutcome::Dropped
    ));

    // Debounce and interval both fire while the write is held.
    sleep(FLUSH_INTERVAL + Duration::from_secs(1)).await;
    settle().await;
    assert_eq!(client.attempts().len(), 1);

    client.resume_writes();
    assert_eq!(first.outcome().await, SaveOutcome::Saved);
    assert_eq!(session.state(), SaveState::Dirty);

    sleep(FLUSH_INTERVAL).await;
    settle().await;
    assert_eq!(client.attempts().len(), 2);
    assert_eq!(client.max_in_flight(), 1);
    assert_eq!(session.state(), SaveState::Clean);
}

#[tokio::test(start_paused = true)]
async fn continuous_typing_is_bounded_by_the_periodic_flush() {
    let client = Arc::new(ScriptedClient::new());
    let session = mount_worksheet(&client, &Arc::new(RecordingNotifier::default())).await;

    // One keystroke every 900ms keeps re-arming the debouncer.
    for step in 0..17 {
        session.edit(|answers| answers.worksheet[3] = format!("draft {step}"));
        sleep(Duration::from_millis(900)).await;
    }
    settle().await;

    let attempts = client.attempts();
    assert_eq!(attempts.len(), 1);
    assert_eq!(
        attempts[0],
        json!({"worksheet": ["", "", "", "draft 16"]})
    );
}

#[tokio::test(start_paused = true)]
async fn clean_store_is_never_written_by_background_triggers() {
    let client = Arc::new(ScriptedClient::new());
    let session = mount_worksheet(&client, &Arc::new(RecordingNotifier::default())).await;

    sleep(FLUSH_INTERVAL * 4).await;
    let hidden = session.on_visibility_change(Visibility::Hidden);
    assert_eq!(hidden.outcome().await, SaveOutcome::Skipped);
    assert!(client.attempts().is_empty());
    assert!(!session.should_prompt_before_unload());
}

#[tokio::test(start_paused = true)]
async fn failed_background_writes_are_retried_until_saved() {
    let client = Arc::new(ScriptedClient::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let session = mount_worksheet(&client, &notifier).await;
    client.fail_next(2);

    session.edit(|answers| answers.worksheet[0] = "gene".to_string());
    sleep(DEBOUNCE + Duration::from_millis(100)).await;
    settle().await;
    assert_eq!(client.attempts().len(), 1);
    assert_eq!(session.state(), SaveState::Dirty);
    assert!(session.should_prompt_before_unload());

    session.edit(|answers| answers.worksheet[1] = "allele".to_string());
    sleep(FLUSH_INTERVAL * 2).await;
    settle().await;

    assert_eq!(session.state(), SaveState::Clean);
    let expected = serde_json::to_value(session.answers().as_ref()).expect("serializable");
    assert_eq!(client.server_blob(), Some(expected));
    assert!(client.attempts().len() >= 3);
    assert!(notifier.notices().is_empty());
}

#[tokio::test(start_paused = true)]
async fn explicit_failure_is_reported_to_the_user() {
    let client = Arc::new(ScriptedClient::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let session = mount_worksheet(&client, &notifier).await;
    client.fail_next(1);

    session.edit(|answers| answers.worksheet[0] = "gene".to_string());
    let outcome = session.save().await;

    assert!(matches!(outcome, SaveOutcome::Failed(_)));
    assert!(session.dirty_state().is_dirty);
    let notices = notifier.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].message(), "Error saving. Please try again.");
}

#[tokio::test(start_paused = true)]
async fn explicit_save_persists_even_when_clean() {
    let client = Arc::new(ScriptedClient::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let session = mount_worksheet(&client, &notifier).await;

    assert_eq!(session.save().await, SaveOutcome::Saved);
    assert_eq!(client.attempts().len(), 1);
    assert_eq!(notifier.notices()[0].message(), "Your work has been saved!");
}

#[tokio::test(start_paused = true)]
async fn hiding_the_page_flushes_before_the_debounce() {
    let client = Arc::new(ScriptedClient::new());
    let session = mount_worksheet(&client, &Arc::new(RecordingNotifier::default())).await;

    session.edit(|answers| answers.worksheet[0] = "gene".to_string());
    assert!(session.should_prompt_before_unload());
    assert_eq!(
        session.on_visibility_change(Visibility::Visible).outcome().await,
        SaveOutcome::Skipped
    );
    assert_eq!(
        session.on_visibility_change(Visibility::Hidden).outcome().await,
        SaveOutcome::Saved
    );
    assert!(!session.should_prompt_before_unload());

    // The debounce timer still fires, but finds nothing to save.
    sleep(DEBOUNCE * 2).await;
    settle().await;
    assert_eq!(client.attempts().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn saved_answers_are_merged_over_page_defaults() {
    let client = Arc::new(ScriptedClient::with_read(ReadScript::Found(json!({
        "worksheet": ["a gene", "", "", ""],
        "simOn": "glows"
    }))));
    let session: ModuleSession<Day1Answers> = ModuleSession::mount(
        ModuleId::new(1),
        client.clone(),
        Arc::new(RecordingNotifier::default()),
        config(),
    )
    .await;

    assert_eq!(session.hydration(), Hydration::Restored);
    let answers = session.answers();
    assert_eq!(answers.worksheet[0], "a gene");
    assert_eq!(answers.sim_on, "glows");
    assert_eq!(answers.exit_ticket, vec![String::new(); 3]);
    assert_eq!(answers.analogies.len(), 4);
    assert_eq!(session.state(), SaveState::Clean);

    sleep(FLUSH_INTERVAL * 2).await;
    settle().await;
    assert!(client.attempts().is_empty());
}

#[tokio::test(start_paused = true)]
async fn partially_matching_saved_answers_are_restored_and_written_back_whole() {
    let client = Arc::new(ScriptedClient::with_read(ReadScript::Found(json!({
        "worksheet": ["gene", null],
        "analogies": [{"analogy": "lock"}],
        "simOn": null,
        "legacyNotes": "keep me"
    }))));
    let session: ModuleSession<Day1Answers> = ModuleSession::mount(
        ModuleId::new(1),
        client.clone(),
        Arc::new(RecordingNotifier::default()),
        config(),
    )
    .await;

    assert_eq!(session.hydration(), Hydration::Restored);
    let answers = session.answers();
    assert_eq!(answers.worksheet, vec!["gene", "", "", ""]);
    assert_eq!(answers.analogies[0].analogy, "lock");
    assert_eq!(answers.analogies.len(), 4);
    assert_eq!(answers.sim_on, "");

    // Restored lists are padded, so indexed edits stay in bounds.
    session.edit(|answers| answers.worksheet[3] = "protein".to_string());
    assert_eq!(session.save().await, SaveOutcome::Saved);

    let written = client.server_blob().expect("explicit save writes");
    assert_eq!(written["worksheet"], json!(["gene", "", "", "protein"]));
    assert_eq!(written["analogies"][0], json!({"analogy": "lock", "why": ""}));
    assert_eq!(written["legacyNotes"], json!("keep me"));
}

#[tokio::test(start_paused = true)]
async fn undeclared_path_is_kept_by_a_typed_session() {
    let client = Arc::new(ScriptedClient::new());
    let session: ModuleSession<Day1Answers> = ModuleSession::mount(
        ModuleId::new(1),
        client.clone(),
        Arc::new(RecordingNotifier::default()),
        config(),
    )
    .await;

    session
        .set("bonus.note", json!("extra credit"))
        .expect("undeclared keys are carried");
    assert_eq!(
        session.get("bonus.note").expect("valid path"),
        Some(json!("extra credit"))
    );
    assert_eq!(session.state(), SaveState::Dirty);

    sleep(DEBOUNCE + Duration::from_millis(100)).await;
    settle().await;
    let written = client.server_blob().expect("debounced write");
    assert_eq!(written["bonus"], json!({"note": "extra credit"}));
    assert_eq!(written["worksheet"], json!(["", "", "", ""]));
}

#[tokio::test(start_paused = true)]
async fn undeclared_path_on_a_closed_shape_is_rejected() {
    let client = Arc::new(ScriptedClient::new());
    let session = mount_worksheet(&client, &Arc::new(RecordingNotifier::default())).await;

    assert!(session.set("newField", json!("lost")).is_err());
    assert_eq!(session.get("newField").expect("valid path"), None);
    assert_eq!(session.state(), SaveState::Clean);
}

#[tokio::test(start_paused = true)]
async fn first_visit_starts_from_defaults_without_saving() {
    let client = Arc::new(ScriptedClient::new());
    let session = mount_worksheet(&client, &Arc::new(RecordingNotifier::default())).await;

    assert_eq!(session.hydration(), Hydration::Fresh);
    assert_eq!(session.answers().worksheet, vec![String::new(); 4]);
    assert_eq!(session.progress_percent(), 0);
    assert_eq!(session.status().to_string(), "Ready");

    sleep(FLUSH_INTERVAL * 2).await;
    settle().await;
    assert!(client.attempts().is_empty());
}

#[tokio::test(start_paused = true)]
async fn unreadable_saved_answers_fall_back_to_defaults() {
    for read in [ReadScript::Fail, ReadScript::Found(json!({"worksheet": 5}))] {
        let client = Arc::new(ScriptedClient::with_read(read));
        let session = mount_worksheet(&client, &Arc::new(RecordingNotifier::default())).await;

        assert_eq!(session.hydration(), Hydration::Fallback);
        assert_eq!(session.answers().worksheet, vec![String::new(); 4]);
        assert_eq!(session.state(), SaveState::Clean);
    }
}

#[tokio::test(start_paused = true)]
async fn progress_tracks_filled_answers() {
    let client = Arc::new(ScriptedClient::new());
    let session = mount_worksheet(&client, &Arc::new(RecordingNotifier::default())).await;

    session.set("worksheet[0]", json!("gene")).expect("valid path");
    session.set("worksheet[1]", json!("   ")).expect("valid path");
    assert_eq!(session.progress_percent(), 25);
    assert_eq!(
        session.get("worksheet[0]").expect("valid path"),
        Some(json!("gene"))
    );
}

#[tokio::test(start_paused = true)]
async fn rejected_path_leaves_session_clean() {
    let client = Arc::new(ScriptedClient::new());
    let session = mount_worksheet(&client, &Arc::new(RecordingNotifier::default())).await;

    assert!(session.set("worksheet[", json!("x")).is_err());
    assert!(session.set("worksheet", json!(5)).is_err());
    assert_eq!(session.state(), SaveState::Clean);

    sleep(DEBOUNCE * 2).await;
    settle().await;
    assert!(client.attempts().is_empty());
}

#[tokio::test(start_paused = true)]
async fn unmount_flushes_dirty_answers_and_ignores_the_result() {
    let client = Arc::new(ScriptedClient::new());
    let session = mount_worksheet(&client, &Arc::new(RecordingNotifier::default())).await;
    let coordinator = session.coordinator().clone();

    session.edit(|answers| answers.worksheet[0] = "gene".to_string());
    let flush = session.unmount();
    assert!(flush.is_in_flight());
    assert_eq!(flush.outcome().await, SaveOutcome::Discarded);
    assert_eq!(
        client.attempts(),
        vec![json!({"worksheet": ["gene", "", "", ""]})]
    );
    assert_eq!(coordinator.state(), SaveState::Saving);

    sleep(FLUSH_INTERVAL * 2).await;
    settle().await;
    assert_eq!(client.attempts().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn unmount_mid_write_causes_no_transition() {
    let client = Arc::new(ScriptedClient::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let session = mount_worksheet(&client, &notifier).await;
    let coordinator = session.coordinator().clone();

    client.hold_writes();
    session.edit(|answers| answers.worksheet[0] = "gene".to_string());
    let explicit = coordinator.start_save(SaveTrigger::Explicit, SaveOptions::explicit(), false);
    client.wait_for_write_start().await;

    session.edit(|answers| answers.worksheet[1] = "late".to_string());
    assert_eq!(session.unmount().outcome().await, SaveOutcome::Dropped);

    client.resume_writes();
    assert_eq!(explicit.outcome().await, SaveOutcome::Discarded);
    assert_eq!(coordinator.state(), SaveState::SavingWhileDirty);
    assert!(notifier.notices().is_empty());
    assert!(!coordinator.is_live());
}

#[tokio::test(start_paused = true)]
async fn dropped_session_stops_its_timers() {
    let client = Arc::new(ScriptedClient::new());
    let session = mount_worksheet(&client, &Arc::new(RecordingNotifier::default())).await;
    let coordinator = session.coordinator().clone();

    session.edit(|answers| answers.worksheet[0] = "gene".to_string());
    drop(session);

    sleep(FLUSH_INTERVAL * 2).await;
    settle().await;
    assert!(client.attempts().is_empty());
    assert!(!coordinator.is_live());
}
