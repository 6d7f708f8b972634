//! Property-Based Tests for guildhall-core
//!
//! Uses `proptest` to check the invariants the session layer relies on:
//! wanderers stay inside their radius, XP and level never go down, objective
//! completion is idempotent, and a save reproduces the state it came from.

use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

use guildhall_core::config::{InventoryConfig, ProgressionConfig, WanderParams};
use guildhall_core::inventory::{InventoryStore, ItemCatalog};
use guildhall_core::npc::Wanderer;
use guildhall_core::persistence::MemoryStore;
use guildhall_core::progression::{ProgressTracker, Quest, SaveSlot};
use guildhall_core::types::{GameTime, ItemId, NpcId, ObjectiveId, Position};

// ---------------------------------------------------------------------------
// Strategy helpers
// ---------------------------------------------------------------------------

const EPSILON: f32 = 2.0;

fn arb_params() -> impl Strategy<Value = WanderParams> {
    (5.0_f32..200.0, 0.5_f32..10.0, 0_u64..3_000).prop_map(|(radius, speed, delay_ms)| WanderParams {
        radius,
        speed,
        delay_ms,
    })
}

fn arb_objective() -> impl Strategy<Value = ObjectiveId> {
    prop::sample::select(
        Quest::standard()
            .objectives
            .into_iter()
            .map(|o| o.id)
            .collect::<Vec<_>>(),
    )
}

fn arb_flag() -> impl Strategy<Value = String> {
    "[a-z_]{1,16}"
}

fn tracker() -> ProgressTracker {
    ProgressTracker::new(&ProgressionConfig::default(), Quest::standard())
}

proptest! {
    // -----------------------------------------------------------------------
    // Wandering
    // -----------------------------------------------------------------------

    #[test]
    fn wanderer_stays_within_radius(
        params in arb_params(),
        seed in any::<u64>(),
        home_bias in 0.0_f64..1.0,
        tick_ms in 10_u64..200,
        freezes in prop::collection::vec((0_u64..60_000, 0_u64..5_000), 0..4),
    ) {
        let home = Position::new(400.0, 300.0);
        let mut w = Wanderer::new(home, params, GameTime::ZERO);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut now = 0;
        while now < 60_000 {
            for (at, len) in &freezes {
                if *at >= now && *at < now + tick_ms {
                    w.freeze(GameTime(now), *len);
                }
            }
            w.step(GameTime(now), &mut rng, EPSILON, home_bias);
            prop_assert!(
                w.position().distance(&home) <= params.radius + EPSILON,
                "{:?} left radius {}", w.position(), params.radius
            );
            now += tick_ms;
        }
    }

    // -----------------------------------------------------------------------
    // Progression
    // -----------------------------------------------------------------------

    #[test]
    fn xp_and_level_never_decrease(grants in prop::collection::vec(0_u64..600, 0..40)) {
        let mut t = tracker();
        let (mut xp, mut level) = (t.xp(), t.level());
        for amount in grants {
            t.grant_xp(amount);
            prop_assert!(t.xp() >= xp);
            prop_assert!(t.level() >= level);
            prop_assert!(t.level() <= 5);
            if t.level() == 5 {
                prop_assert_eq!(t.xp_to_next_level(), 0);
            }
            xp = t.xp();
            level = t.level();
        }
    }

    #[test]
    fn completing_twice_equals_completing_once(ids in prop::collection::vec(arb_objective(), 0..20)) {
        let mut once = tracker();
        let mut twice = tracker();
        for id in &ids {
            once.complete_objective(id);
            twice.complete_objective(id);
            twice.complete_objective(id);
        }
        prop_assert_eq!(once.quest(), twice.quest());
        prop_assert_eq!(once.xp(), twice.xp());
        prop_assert_eq!(once.flags(), twice.flags());
        prop_assert_eq!(once.completed_quests().len(), usize::from(once.quest().completed));
    }

    #[test]
    fn save_round_trip_reproduces_progress(
        xp in 0_u64..2_000,
        ids in prop::collection::vec(arb_objective(), 0..10),
        flags in prop::collection::btree_map(arb_flag(), any::<bool>(), 0..8),
        talked in prop::sample::subsequence(vec!["librarian", "artisan", "critic"], 0..=3),
        items in prop::sample::subsequence(vec!["primordial_code", "archive_ink", "focus_tonic"], 0..=3),
        x in 50.0_f32..900.0,
        y in 50.0_f32..700.0,
    ) {
        let mut t = tracker();
        t.grant_xp(xp);
        for id in &ids {
            t.complete_objective(id);
        }
        for (flag, value) in &flags {
            t.set_flag(flag, *value);
        }
        for npc in &talked {
            t.mark_npc_unlocked(&NpcId::new(*npc));
            t.on_npc_interaction(&NpcId::new(*npc));
        }
        let mut inv = InventoryStore::new(ItemCatalog::standard(), &InventoryConfig::default());
        for item in &items {
            inv.add_item(&ItemId::new(*item), None).expect("add");
        }

        let save = t.to_save("1.0.0", Position::new(x, y), inv.snapshot());
        let mut slot = SaveSlot::new(Box::new(MemoryStore::new()), "save", "1.0.0");
        prop_assert!(slot.write(&save));
        let loaded = slot.read().into_state().expect("loaded");

        let mut restored = tracker();
        restored.restore(&loaded);
        let mut restored_inv = InventoryStore::new(ItemCatalog::standard(), &InventoryConfig::default());
        restored_inv.restore(loaded.player.inventory.clone());

        prop_assert_eq!(restored.xp(), t.xp());
        prop_assert_eq!(restored.level(), t.level());
        prop_assert_eq!(restored.title(), t.title());
        prop_assert_eq!(restored.flags(), t.flags());
        prop_assert_eq!(restored.quest().completed_ids(), t.quest().completed_ids());
        prop_assert_eq!(restored.unlocked_npcs(), t.unlocked_npcs());
        prop_assert_eq!(restored_inv.snapshot(), inv.snapshot());
        prop_assert_eq!(loaded.player.position, Position::new(x, y));
    }
}
