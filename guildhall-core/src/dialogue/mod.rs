//! Dialogue trees and the dialogue engine.
//!
//! A tree is pure data: a map of node id → [`DialogueNode`], entered at the
//! node named [`START_NODE`]. Trees live in a [`DialogueTable`] loaded from a
//! bundled JSON asset; sessions refer to trees and nodes by id only, so the
//! table can be swapped while a conversation is open.
//!
//! The [`DialogueEngine`] never touches other components. Everything a node
//! or option does outside the conversation comes back as
//! [`DialogueEffect`] values for the caller to apply.

pub mod engine;
pub mod table;

use serde::{Deserialize, Serialize};

use crate::types::{ItemId, NpcId, ObjectiveId};

pub use engine::{ActiveDialogue, DialogueEffect, DialogueEngine, DialogueState, FlagSource};
pub use table::{DialogueTable, TreeIssue, TreeRule};

/// Entry node of every tree.
pub const START_NODE: &str = "start";

/// Node a tree continues at once a requested item has been handed over.
pub const ITEM_RECEIVED_NODE: &str = "item_received";

/// Who speaks a node's line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    /// The NPC the session is with.
    #[default]
    Npc,
    /// The player.
    Player,
}

/// Side effect attached to a node or an option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DialogueAction {
    /// Unlock another NPC.
    UnlockNpc {
        /// NPC to unlock.
        target: NpcId,
    },
    /// The speaking NPC hands the player an item.
    GiveItem {
        /// Template id of the item.
        item: ItemId,
    },
    /// An NPC asks the player for an item; the conversation waits for it.
    RequestItem {
        /// Item the NPC expects.
        item: ItemId,
        /// NPC that will receive it.
        npc: NpcId,
    },
    /// Mark a quest objective complete.
    CompleteObjective {
        /// Objective id.
        objective: ObjectiveId,
    },
    /// Start the speaking NPC's scripted work animation.
    StartScriptedSequence,
    /// Set a progression flag.
    SetFlag {
        /// Flag name.
        flag: String,
        /// Value to store.
        #[serde(default = "default_flag_value")]
        value: bool,
    },
}

fn default_flag_value() -> bool {
    true
}

/// One selectable reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueOption {
    /// Identifier, unique within its node.
    pub id: String,
    /// Button text.
    pub text: String,
    /// Node to jump to; `None` closes the conversation.
    #[serde(default)]
    pub next: Option<String>,
    /// XP granted on selection.
    #[serde(default)]
    pub xp: Option<u32>,
    /// Flag set to `true` on selection.
    #[serde(default)]
    pub flag: Option<String>,
    /// Action executed on selection.
    #[serde(default)]
    pub action: Option<DialogueAction>,
}

/// One line of a tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueNode {
    /// Who speaks.
    #[serde(default)]
    pub speaker: Speaker,
    /// Line text; its length sets the reveal time.
    pub text: String,
    /// Replies offered once the text is revealed.
    #[serde(default)]
    pub options: Vec<DialogueOption>,
    /// Automatic follow-up when there are no options.
    #[serde(default)]
    pub next: Option<String>,
    /// Action executed once on entry.
    #[serde(default)]
    pub action: Option<DialogueAction>,
}

impl DialogueNode {
    /// Whether the node waits for an item delivery after its reveal.
    #[must_use]
    pub fn awaits_item(&self) -> bool {
        self.options.is_empty()
            && self.next.is_none()
            && matches!(self.action, Some(DialogueAction::RequestItem { .. }))
    }

    /// Whether the node ends the conversation after its reveal.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.options.is_empty() && self.next.is_none() && !self.awaits_item()
    }

    /// Ids of every node this one can lead to.
    pub fn successors(&self) -> impl Iterator<Item = &str> {
        let awaiting = self.awaits_item().then_some(ITEM_RECEIVED_NODE);
        self.options
            .iter()
            .filter_map(|o| o.next.as_deref())
            .chain(self.next.as_deref())
            .chain(awaiting)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_json_shape() {
        let action: DialogueAction = serde_json::from_str(
            r#"{"type":"request_item","item":"primordial_code","npc":"librarian"}"#,
        )
        .expect("parse");
        assert_eq!(
            action,
            DialogueAction::RequestItem {
                item: ItemId::new("primordial_code"),
                npc: NpcId::new("librarian"),
            }
        );
        let flag: DialogueAction =
            serde_json::from_str(r#"{"type":"set_flag","flag":"x"}"#).expect("parse");
        assert_eq!(flag, DialogueAction::SetFlag { flag: "x".into(), value: true });
    }

    #[test]
    fn node_classification() {
        let terminal: DialogueNode = serde_json::from_str(r#"{"text":"bye"}"#).expect("parse");
        assert!(terminal.is_terminal());
        let awaiting: DialogueNode = serde_json::from_str(
            r#"{"text":"hand it over","action":{"type":"request_item","item":"a","npc":"b"}}"#,
        )
        .expect("parse");
        assert!(awaiting.awaits_item());
        assert!(!awaiting.is_terminal());
        assert_eq!(awaiting.successors().collect::<Vec<_>>(), vec![ITEM_RECEIVED_NODE]);
    }
}
