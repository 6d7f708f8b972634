//! Engine events published to the UI.
//!
//! The session queues one [`EngineEvent`] per observable change; the host
//! drains the queue once per frame with [`crate::QuestSession::drain_events`].

use guildhall_core::inventory::GiveError;
use guildhall_core::progression::ProgressEvent;
use guildhall_core::types::{ItemId, NpcId, ObjectiveId};

/// Why a delivery attempt was turned down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryRejection {
    /// No NPC is waiting for an item.
    NoPendingRequest,
    /// The NPC is waiting for something else.
    WrongItem {
        /// What the NPC asked for.
        expected: ItemId,
        /// What was offered.
        offered: ItemId,
    },
    /// The inventory refused the hand-over.
    Refused(GiveError),
}

/// Something the UI may want to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A conversation opened.
    DialogueStarted {
        /// NPC spoken to.
        npc: NpcId,
        /// Tree in use.
        tree: String,
    },
    /// A conversation closed.
    DialogueClosed {
        /// NPC spoken to.
        npc: NpcId,
    },
    /// An NPC became available.
    NpcUnlocked {
        /// The NPC.
        npc: NpcId,
    },
    /// A locked NPC was clicked.
    NpcDiscovered {
        /// The NPC.
        npc: NpcId,
    },
    /// An item entered the inventory.
    ItemReceived {
        /// Item id.
        item: ItemId,
        /// Giver, if an NPC.
        from: Option<NpcId>,
    },
    /// An item was handed to the NPC waiting for it.
    ItemDelivered {
        /// Item id.
        item: ItemId,
        /// Recipient.
        npc: NpcId,
        /// Reward granted in return.
        reward: Option<ItemId>,
    },
    /// A delivery attempt failed; nothing changed.
    DeliveryRejected {
        /// Item offered.
        item: ItemId,
        /// NPC waiting, if any.
        npc: Option<NpcId>,
        /// Why.
        reason: DeliveryRejection,
    },
    /// The inventory panel opened.
    InventoryOpened {
        /// NPC waiting for a delivery, when opened in delivery mode.
        delivery_for: Option<NpcId>,
    },
    /// The inventory panel closed.
    InventoryClosed,
    /// An objective was completed.
    ObjectiveCompleted {
        /// Objective id.
        id: ObjectiveId,
    },
    /// The quest was completed.
    QuestCompleted {
        /// Quest id.
        quest: String,
        /// Title granted.
        title: Option<String>,
    },
    /// Experience was gained.
    XpGained {
        /// Amount.
        amount: u64,
        /// New total.
        total: u64,
    },
    /// A new level was reached.
    LevelUp {
        /// Level reached.
        level: u32,
    },
    /// A progression flag became true.
    FlagSet {
        /// Flag name.
        flag: String,
    },
    /// Every NPC went to work on the finale.
    FinaleStarted,
    /// The finale finished.
    FinaleCompleted,
    /// An NPC began its scripted work.
    ScriptedSequenceStarted {
        /// The NPC.
        npc: NpcId,
    },
    /// An NPC finished working.
    WorkFinished {
        /// The NPC.
        npc: NpcId,
        /// What it says about it.
        phrase: String,
    },
    /// A stored save could not be used and a fresh game started.
    SaveDiscarded {
        /// What was wrong with it.
        reason: String,
    },
    /// The game was saved.
    Saved,
}

impl From<ProgressEvent> for EngineEvent {
    fn from(event: ProgressEvent) -> Self {
        match event {
            ProgressEvent::ObjectiveCompleted { id } => Self::ObjectiveCompleted { id },
            ProgressEvent::QuestCompleted { quest, title } => Self::QuestCompleted { quest, title },
            ProgressEvent::XpGained { amount, total } => Self::XpGained { amount, total },
            ProgressEvent::LevelUp { level } => Self::LevelUp { level },
            ProgressEvent::FlagSet { flag } => Self::FlagSet { flag },
        }
    }
}

impl EngineEvent {
    /// Whether the UI should raise a notification for this event.
    #[must_use]
    pub fn is_notable(&self) -> bool {
        matches!(
            self,
            Self::NpcUnlocked { .. }
                | Self::ItemReceived { .. }
                | Self::ItemDelivered { .. }
                | Self::DeliveryRejected { .. }
                | Self::ObjectiveCompleted { .. }
                | Self::QuestCompleted { .. }
                | Self::LevelUp { .. }
                | Self::FinaleCompleted
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_events_convert() {
        let event: EngineEvent = ProgressEvent::LevelUp { level: 3 }.into();
        assert_eq!(event, EngineEvent::LevelUp { level: 3 });
        assert!(event.is_notable());
        assert!(!EngineEvent::Saved.is_notable());
    }
}
