//! Integration Tests: End-to-End Quest Flows
//!
//! Full playthrough on the bundled dialogue trees, the wrong-item delivery
//! path, save/load through `SQLite`, and the real-time driver.

use std::time::Duration;

use guildhall_core::config::{DialogueConfig, PersistenceConfig, StoreBackend};
use guildhall_core::persistence::{MemoryStore, SqliteStore};
use guildhall_core::progression::SaveSlot;
use guildhall_core::progression::tracker::OPEN_WORLD_FLAG;
use guildhall_core::types::{GameTime, Indicator, ItemId, NpcId, ObjectiveId, Position};
use guildhall_session::coordinator::SYNC_FLAG;
use guildhall_session::{
    DeliveryRejection, Difficulty, EngineEvent, FinalePhase, QuestSession, SessionConfig, drive,
};

fn fast_config() -> SessionConfig {
    let mut config = SessionConfig {
        seed: Some(42),
        ..SessionConfig::default()
    };
    config.quest.dialogue = DialogueConfig {
        ms_per_char: 0,
        auto_advance_ms: 0,
        auto_close_ms: 0,
        ..DialogueConfig::default()
    };
    config
}

fn memory_session(config: SessionConfig) -> QuestSession {
    let slot = SaveSlot::new(Box::new(MemoryStore::new()), "save", "1.0.0");
    QuestSession::new(config, slot, GameTime::ZERO)
}

fn npc(s: &str) -> NpcId {
    NpcId::new(s)
}

fn item(s: &str) -> ItemId {
    ItemId::new(s)
}

/// Test clock; every step ticks the session one millisecond later.
struct Clock(u64);

impl Clock {
    fn step(&mut self, session: &mut QuestSession) -> GameTime {
        self.0 += 1;
        let now = GameTime(self.0);
        session.tick(now);
        now
    }
}

fn talk(session: &mut QuestSession, clock: &mut Clock, who: &str) {
    let now = clock.step(session);
    assert!(session.interact(&npc(who), now), "could not talk to {who}");
    clock.step(session);
}

fn choose(session: &mut QuestSession, clock: &mut Clock, option: &str) {
    let now = GameTime(clock.0);
    session.choose(option, now);
    clock.step(session);
}

fn deliver(session: &mut QuestSession, clock: &mut Clock, what: &str) {
    let now = clock.step(session);
    let outcome = session.attempt_item_delivery(&item(what), now);
    assert!(outcome.is_success(), "delivery of {what} failed: {outcome:?}");
    clock.step(session);
}

// ---------------------------------------------------------------------------
// Full playthrough
// ---------------------------------------------------------------------------

#[test]
fn full_quest_reaches_open_world() {
    let mut s = memory_session(fast_config());
    let mut clock = Clock(0);
    assert!(!s.load_or_initialize(GameTime::ZERO));

    talk(&mut s, &mut clock, "elder_guide");
    choose(&mut s, &mut clock, "ready");
    assert!(s.inventory().has_item(&item("primordial_code")));
    assert!(s.npcs().get(&npc("librarian")).expect("librarian").is_unlocked());
    choose(&mut s, &mut clock, "go");
    assert!(!s.dialogue().is_active());

    talk(&mut s, &mut clock, "librarian");
    choose(&mut s, &mut clock, "code");
    assert!(s.is_inventory_open());
    deliver(&mut s, &mut clock, "primordial_code");
    assert!(s.progress().has_flag("librarian_activated"));
    assert!(!s.dialogue().is_active());

    talk(&mut s, &mut clock, "requirements_scribe");
    choose(&mut s, &mut clock, "key");
    deliver(&mut s, &mut clock, "activation_key_alpha");
    assert!(s.progress().has_flag("plan_written"));

    talk(&mut s, &mut clock, "artisan");
    choose(&mut s, &mut clock, "yes");
    deliver(&mut s, &mut clock, "execution_core_beta");
    let artisan = s.npcs().get(&npc("artisan")).expect("artisan");
    assert_eq!(artisan.indicator(), Indicator::Working);

    talk(&mut s, &mut clock, "critic");
    choose(&mut s, &mut clock, "show");
    deliver(&mut s, &mut clock, "optimization_module_gamma");
    choose(&mut s, &mut clock, "accept");
    assert!(s.progress().has_flag("accepted_refinement"));

    talk(&mut s, &mut clock, "elder_guide");
    assert_eq!(s.active_dialogue().expect("open").tree, "guide_final");
    choose(&mut s, &mut clock, "give");
    deliver(&mut s, &mut clock, "synchronization_protocol_omega");
    assert_eq!(s.finale_phase(), FinalePhase::Running);
    assert!(s.npcs().iter().all(|n| n.indicator() == Indicator::Working));

    s.tick(GameTime(clock.0 + 3_000));
    assert_eq!(s.finale_phase(), FinalePhase::Done);
    assert!(s.progress().has_flag(OPEN_WORLD_FLAG));
    assert!(s.progress().has_flag(SYNC_FLAG));
    assert!(s.progress().quest().completed);
    assert_eq!(s.progress().title(), "Conductor");
    assert_eq!(s.progress().level(), 5);
    assert_eq!(s.progress().xp_to_next_level(), 0);
    assert!(s.npcs().iter().all(guildhall_core::npc::Npc::is_unlocked));
    assert!(s.inventory().has_item(&item("collective_consciousness")));

    let events = s.drain_events();
    for expected in [
        EngineEvent::FinaleStarted,
        EngineEvent::FinaleCompleted,
        EngineEvent::ObjectiveCompleted {
            id: ObjectiveId::new("return_to_guide"),
        },
    ] {
        assert!(events.contains(&expected), "missing {expected:?}");
    }
}

#[test]
fn easy_difficulty_scales_dialogue_xp() {
    let mut config = fast_config();
    config.difficulty = Difficulty::Easy;
    let mut s = memory_session(config);
    let mut clock = Clock(0);
    talk(&mut s, &mut clock, "elder_guide");
    choose(&mut s, &mut clock, "ready");
    assert_eq!(s.progress().xp(), 30);
}

#[test]
fn closing_the_first_guide_talk_early_does_not_strand_the_quest() {
    let mut s = memory_session(fast_config());
    let mut clock = Clock(0);

    talk(&mut s, &mut clock, "elder_guide");
    s.close_dialogue(GameTime(clock.0));
    clock.step(&mut s);
    assert!(!s.inventory().has_item(&item("primordial_code")));

    talk(&mut s, &mut clock, "elder_guide");
    assert_eq!(s.active_dialogue().expect("open").tree, "guide_intro");
    choose(&mut s, &mut clock, "ready");
    s.close_dialogue(GameTime(clock.0));
    clock.step(&mut s);
    assert!(s.inventory().has_item(&item("primordial_code")));
    assert!(s.npcs().get(&npc("librarian")).expect("librarian").is_unlocked());

    talk(&mut s, &mut clock, "librarian");
    choose(&mut s, &mut clock, "code");
    deliver(&mut s, &mut clock, "primordial_code");
    let now = clock.step(&mut s);
    assert!(s.interact(&npc("elder_guide"), now));
    assert_eq!(s.active_dialogue().expect("open").tree, "guide_waiting");
    s.close_dialogue(now);
    clock.step(&mut s);

    talk(&mut s, &mut clock, "requirements_scribe");
    choose(&mut s, &mut clock, "key");
    deliver(&mut s, &mut clock, "activation_key_alpha");
    talk(&mut s, &mut clock, "artisan");
    choose(&mut s, &mut clock, "yes");
    deliver(&mut s, &mut clock, "execution_core_beta");
    talk(&mut s, &mut clock, "critic");
    choose(&mut s, &mut clock, "show");
    deliver(&mut s, &mut clock, "optimization_module_gamma");
    choose(&mut s, &mut clock, "accept");

    talk(&mut s, &mut clock, "elder_guide");
    choose(&mut s, &mut clock, "give");
    deliver(&mut s, &mut clock, "synchronization_protocol_omega");
    s.tick(GameTime(clock.0 + 3_000));
    assert_eq!(s.finale_phase(), FinalePhase::Done);
    assert!(s.progress().quest().completed);
}

// ---------------------------------------------------------------------------
// Wrong delivery
// ---------------------------------------------------------------------------

#[test]
fn wrong_item_leaves_request_open() {
    let mut s = memory_session(fast_config());
    let mut clock = Clock(0);
    talk(&mut s, &mut clock, "elder_guide");
    choose(&mut s, &mut clock, "ready");
    choose(&mut s, &mut clock, "go");
    s.receive_item_from_npc(&item("archive_ink"), None);

    talk(&mut s, &mut clock, "librarian");
    choose(&mut s, &mut clock, "code");
    s.drain_events();
    let inventory_before = s.inventory().snapshot();
    let flags_before = s.progress().flags().clone();

    let outcome = s.attempt_item_delivery(&item("archive_ink"), GameTime(clock.0));
    assert!(!outcome.is_success());
    assert_eq!(s.inventory().snapshot(), inventory_before);
    assert_eq!(s.progress().flags(), &flags_before);
    assert_eq!(s.pending_delivery().map(|p| p.item.clone()), Some(item("primordial_code")));
    let events = s.drain_events();
    assert_eq!(events.len(), 1);
    assert!(matches!(
        &events[0],
        EngineEvent::DeliveryRejected { reason: DeliveryRejection::WrongItem { .. }, .. }
    ));

    deliver(&mut s, &mut clock, "primordial_code");
    assert!(s.progress().has_flag("librarian_activated"));
}

#[test]
fn scribe_refuses_the_primordial_code() {
    let mut s = memory_session(fast_config());
    s.receive_item_from_npc(&item("primordial_code"), None);
    s.receive_item_from_npc(&item("activation_key_alpha"), None);
    s.request_item_for_npc(&item("activation_key_alpha"), &npc("requirements_scribe"));
    let before = s.inventory().snapshot();

    let outcome = s.attempt_item_delivery(&item("primordial_code"), GameTime(1));
    assert!(!outcome.is_success());
    let pending = s.pending_delivery().expect("still pending");
    assert_eq!(pending.npc, npc("requirements_scribe"));
    assert_eq!(pending.item, item("activation_key_alpha"));
    assert_eq!(s.inventory().snapshot(), before);
}

// ---------------------------------------------------------------------------
// Save / load
// ---------------------------------------------------------------------------

#[test]
fn sqlite_save_survives_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("guildhall.db");
    let persistence = PersistenceConfig {
        backend: StoreBackend::Sqlite,
        path: path.to_string_lossy().into_owned(),
        ..PersistenceConfig::default()
    };
    let mut config = fast_config();
    config.quest.persistence = persistence.clone();

    let mut clock = Clock(0);
    {
        let mut s = QuestSession::from_config(config.clone(), GameTime::ZERO).expect("session");
        assert!(!s.load_or_initialize(GameTime::ZERO));
        talk(&mut s, &mut clock, "elder_guide");
        choose(&mut s, &mut clock, "ready");
        choose(&mut s, &mut clock, "go");
        s.move_player_to(Position::new(300.0, 300.0), GameTime(clock.0));
        s.tick(GameTime(clock.0 + 10_000));
        assert!(s.save_now());
    }

    let store = SqliteStore::open(&path, &persistence).expect("reopen");
    assert!(store.integrity_check().expect("integrity"));
    drop(store);

    let mut s = QuestSession::from_config(config, GameTime::ZERO).expect("session");
    assert!(s.load_or_initialize(GameTime::ZERO));
    assert!(s.inventory().has_item(&item("primordial_code")));
    assert!(s.npcs().get(&npc("librarian")).expect("librarian").is_unlocked());
    assert!(!s.npcs().get(&npc("critic")).expect("critic").is_unlocked());
    assert_eq!(s.progress().xp(), 50);
    assert!(s.progress().has_flag("talked_to_elder_guide"));
    assert_eq!(s.player().position(), Position::new(300.0, 300.0));
    let done = s.progress().quest().completed_ids();
    assert!(done.contains(&ObjectiveId::new("talk_to_guide")));
    assert!(done.contains(&ObjectiveId::new("receive_primordial_code")));
}

#[test]
fn progress_calls_are_saved_immediately() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("guildhall.db");
    let persistence = PersistenceConfig {
        backend: StoreBackend::Sqlite,
        path: path.to_string_lossy().into_owned(),
        ..PersistenceConfig::default()
    };
    let mut config = fast_config();
    config.quest.persistence = persistence.clone();
    let mut s = QuestSession::from_config(config, GameTime::ZERO).expect("session");
    s.start_new_quest(GameTime::ZERO);

    let stored = || {
        SaveSlot::from_config(&persistence)
            .expect("second handle")
            .read()
            .into_state()
            .expect("saved")
    };

    s.set_flag("lanterns_lit", true, GameTime(1));
    assert_eq!(stored().flags.get("lanterns_lit"), Some(&true));

    s.complete_objective(&ObjectiveId::new("talk_to_guide"));
    assert!(
        stored()
            .player
            .completed_objectives
            .contains(&ObjectiveId::new("talk_to_guide"))
    );

    assert!(s.unlock_npc(&npc("artisan"), GameTime(2)));
    assert!(stored().player.unlocked_npcs.contains(&npc("artisan")));
}

#[test]
fn loading_restarts_the_autosave_timer() {
    let mut s = memory_session(fast_config());
    s.tick(GameTime(20_000));
    assert!(s.save_now());
    assert!(s.load_or_initialize(GameTime(20_000)));
    assert_eq!(s.next_scheduled(), Some(GameTime(50_000)));
    s.tick(GameTime(30_000));
    s.drain_events();
    s.tick(GameTime(50_000));
    assert!(s.drain_events().contains(&EngineEvent::Saved));
    assert_eq!(s.next_scheduled(), Some(GameTime(80_000)));
}

#[test]
fn mismatched_version_starts_fresh() {
    let mut s = memory_session(fast_config());
    let mut clock = Clock(0);
    talk(&mut s, &mut clock, "elder_guide");
    choose(&mut s, &mut clock, "ready");
    assert!(s.save_now());

    let save = s.progress().to_save("0.9.0", Position::new(1.0, 1.0), s.inventory().snapshot());
    let bytes = serde_json::to_vec(&save).expect("encode");
    let mut slot = SaveSlot::new(Box::new(MemoryStore::new()), "save", "1.0.0");
    slot.write_raw(&bytes).expect("raw write");
    let mut fresh = QuestSession::new(fast_config(), slot, GameTime::ZERO);
    assert!(!fresh.load_or_initialize(GameTime::ZERO));
    assert!(fresh.inventory().items().is_empty());
    assert!(
        fresh
            .drain_events()
            .iter()
            .any(|e| matches!(e, EngineEvent::SaveDiscarded { .. }))
    );
}

#[test]
fn corrupt_save_starts_fresh() {
    let mut slot = SaveSlot::new(Box::new(MemoryStore::new()), "save", "1.0.0");
    slot.write_raw(b"{ not json").expect("raw write");
    let mut s = QuestSession::new(fast_config(), slot, GameTime::ZERO);
    assert!(!s.load_or_initialize(GameTime::ZERO));
    assert_eq!(s.progress().xp(), 0);
    assert!(s.npcs().get(&npc("elder_guide")).expect("guide").is_unlocked());
}

#[test]
fn reload_mid_finale_restarts_it() {
    let mut s = memory_session(fast_config());
    s.set_flag("critic_activated", true, GameTime(0));
    s.set_flag(SYNC_FLAG, true, GameTime(0));
    assert!(s.save_now());
    assert_eq!(s.finale_phase(), FinalePhase::Running);

    assert!(s.load_or_initialize(GameTime(10)));
    assert_eq!(s.finale_phase(), FinalePhase::Running);
    s.tick(GameTime(3_010));
    assert_eq!(s.finale_phase(), FinalePhase::Done);
}

#[test]
fn autosave_fires_on_interval() {
    let mut s = memory_session(fast_config());
    s.drain_events();
    s.tick(GameTime(29_999));
    assert!(!s.drain_events().contains(&EngineEvent::Saved));
    s.tick(GameTime(30_000));
    assert!(s.drain_events().contains(&EngineEvent::Saved));
    assert_eq!(s.next_scheduled(), Some(GameTime(60_000)));
}

#[test]
fn new_quest_wipes_progress() {
    let mut s = memory_session(fast_config());
    let mut clock = Clock(0);
    talk(&mut s, &mut clock, "elder_guide");
    choose(&mut s, &mut clock, "ready");
    s.start_new_quest(GameTime(clock.0));
    assert_eq!(s.progress().xp(), 0);
    assert!(s.inventory().items().is_empty());
    assert!(!s.npcs().get(&npc("librarian")).expect("librarian").is_unlocked());
    assert!(s.load_or_initialize(GameTime(clock.0)));
    assert_eq!(s.progress().xp(), 0);
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn driver_runs_dialogue_timers_in_real_time() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let mut config = SessionConfig {
        seed: Some(9),
        ..SessionConfig::default()
    };
    config.quest.dialogue.ms_per_char = 1;
    let mut s = memory_session(config);
    assert!(s.interact(&npc("elder_guide"), GameTime::ZERO));
    assert!(s.active_dialogue().expect("open").is_typing);

    let mut frames = 0_u32;
    let stats = drive(
        &mut s,
        GameTime::ZERO,
        Duration::from_millis(50),
        |_, _| frames += 1,
        tokio::time::sleep(Duration::from_millis(1_000)),
    )
    .await;

    assert_eq!(u64::from(frames), stats.ticks);
    assert!(stats.last >= GameTime(900));
    let dialogue = s.active_dialogue().expect("still open");
    assert!(!dialogue.is_typing);
    assert_eq!(dialogue.node, "start");
}
