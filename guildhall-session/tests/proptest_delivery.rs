//! Property-Based Tests for the delivery saga.
//!
//! Whatever is offered, a rejected delivery changes nothing, and a session
//! never holds more than one pending request.

use proptest::prelude::*;

use guildhall_core::persistence::MemoryStore;
use guildhall_core::progression::SaveSlot;
use guildhall_core::types::{GameTime, ItemId, NpcId};
use guildhall_session::{DeliveryRejection, QuestSession, SessionConfig};

const ITEMS: &[&str] = &[
    "primordial_code",
    "activation_key_alpha",
    "execution_core_beta",
    "optimization_module_gamma",
    "synchronization_protocol_omega",
    "archive_ink",
    "focus_tonic",
    "spark_wafer",
    "not_an_item",
];

const NPCS: &[&str] = &["elder_guide", "librarian", "requirements_scribe", "artisan", "critic"];

fn session() -> QuestSession {
    let config = SessionConfig {
        seed: Some(3),
        ..SessionConfig::default()
    };
    let slot = SaveSlot::new(Box::new(MemoryStore::new()), "save", "1.0.0");
    QuestSession::new(config, slot, GameTime::ZERO)
}

fn arb_item() -> impl Strategy<Value = ItemId> {
    prop::sample::select(ITEMS).prop_map(ItemId::new)
}

fn arb_npc() -> impl Strategy<Value = NpcId> {
    prop::sample::select(NPCS).prop_map(NpcId::new)
}

proptest! {
    #[test]
    fn rejected_delivery_is_a_no_op(
        held in prop::collection::vec(arb_item(), 0..6),
        wanted in arb_item(),
        npc in arb_npc(),
        offered in arb_item(),
    ) {
        prop_assume!(wanted != offered);
        let mut s = session();
        for item in &held {
            s.receive_item_from_npc(item, None);
        }
        s.request_item_for_npc(&wanted, &npc);
        let inventory = s.inventory().snapshot();
        let flags = s.progress().flags().clone();
        let unlocked = s.progress().unlocked_npcs();

        let outcome = s.attempt_item_delivery(&offered, GameTime(5));
        prop_assert!(!outcome.is_success());
        prop_assert_eq!(s.inventory().snapshot(), inventory);
        prop_assert_eq!(s.progress().flags(), &flags);
        prop_assert_eq!(s.progress().unlocked_npcs(), unlocked);
        let pending = s.pending_delivery().expect("request kept");
        prop_assert_eq!(&pending.item, &wanted);
        prop_assert_eq!(&pending.npc, &npc);
    }

    #[test]
    fn last_request_wins(requests in prop::collection::vec((arb_item(), arb_npc()), 1..8)) {
        let mut s = session();
        for (item, npc) in &requests {
            s.request_item_for_npc(item, npc);
        }
        let (item, npc) = requests.last().expect("non-empty");
        let pending = s.pending_delivery().expect("pending");
        prop_assert_eq!(&pending.item, item);
        prop_assert_eq!(&pending.npc, npc);
    }

    #[test]
    fn nothing_pending_means_nothing_happens(offered in arb_item()) {
        let mut s = session();
        s.drain_events();
        let outcome = s.attempt_item_delivery(&offered, GameTime(1));
        prop_assert_eq!(
            outcome,
            guildhall_session::DeliveryOutcome::Rejected(DeliveryRejection::NoPendingRequest)
        );
        prop_assert!(s.drain_events().is_empty());
    }
}
