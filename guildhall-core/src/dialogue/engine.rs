//! The dialogue engine: one active session, timed text reveal, auto-advance.
//!
//! ```text
//!  Idle ──start──▶ Revealing ──reveal done──┬─▶ WaitingForChoice ──choose──▶ (enter next | close)
//!                                           ├─▶ AutoAdvancing ──pause──▶ enter `next`
//!                                           ├─▶ AwaitingExternalEvent ──item received──▶ enter `item_received`
//!                                           └─▶ AutoClosing ──pause──▶ Idle
//! ```
//!
//! Timers are deadlines checked by [`DialogueEngine::update`]; each follow-up
//! deadline is computed from the previous one, not from the tick that noticed
//! it, so a late tick never stretches the script.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::table::DialogueTable;
use super::{DialogueAction, DialogueNode, DialogueOption, ITEM_RECEIVED_NODE, START_NODE, Speaker};
use crate::config::DialogueConfig;
use crate::npc::Npc;
use crate::types::{GameTime, NpcId};

// ---------------------------------------------------------------------------
// Flags
// ---------------------------------------------------------------------------

/// Read access to progression flags, used for tree selection.
pub trait FlagSource {
    /// Whether `flag` is set to `true`.
    fn has_flag(&self, flag: &str) -> bool;
}

impl FlagSource for BTreeMap<String, bool> {
    fn has_flag(&self, flag: &str) -> bool {
        self.get(flag).copied().unwrap_or(false)
    }
}

impl FlagSource for HashMap<String, bool> {
    fn has_flag(&self, flag: &str) -> bool {
        self.get(flag).copied().unwrap_or(false)
    }
}

// ---------------------------------------------------------------------------
// Effects and views
// ---------------------------------------------------------------------------

/// Something the engine needs applied outside the conversation.
#[derive(Debug, Clone, PartialEq)]
pub enum DialogueEffect {
    /// A session began.
    Started {
        /// NPC spoken to.
        npc: NpcId,
        /// Tree chosen for this conversation.
        tree: String,
    },
    /// A node was entered.
    NodeEntered {
        /// NPC spoken to.
        npc: NpcId,
        /// Tree id.
        tree: String,
        /// Node id.
        node: String,
    },
    /// A node or option action fired.
    Action {
        /// NPC the session is with.
        npc: NpcId,
        /// What to do.
        action: DialogueAction,
    },
    /// An option granted XP.
    GrantXp {
        /// Amount before any difficulty scaling.
        amount: u32,
    },
    /// An option set a flag.
    SetFlag {
        /// Flag name; the value is always `true`.
        flag: String,
    },
    /// The session ended.
    Closed {
        /// NPC the session was with.
        npc: NpcId,
    },
}

/// Observable engine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogueState {
    /// No session.
    Idle,
    /// Text is still typing out.
    Revealing,
    /// Options are selectable.
    WaitingForChoice,
    /// Will jump to `next` after a pause.
    AutoAdvancing,
    /// Will close after a pause.
    AutoClosing,
    /// Waiting for an item delivery.
    AwaitingExternalEvent,
}

/// What the dialogue UI renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveDialogue {
    /// NPC spoken to.
    pub npc: NpcId,
    /// NPC display name.
    pub npc_name: String,
    /// Tree id.
    pub tree: String,
    /// Node id.
    pub node: String,
    /// Who speaks the line.
    pub speaker: Speaker,
    /// Line text.
    pub text: String,
    /// Options snapshot; hidden by the UI while `is_typing`.
    pub options: Vec<DialogueOption>,
    /// Whether the reveal is still running.
    pub is_typing: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum Phase {
    Revealing { done_at: GameTime },
    WaitingForChoice,
    AutoAdvancing { at: GameTime, target: String },
    AutoClosing { at: GameTime },
    AwaitingItem,
}

#[derive(Debug, Clone)]
struct Session {
    view: ActiveDialogue,
    phase: Phase,
    next: Option<String>,
    awaits_item: bool,
}

enum Due {
    FinishReveal(GameTime),
    Advance(GameTime, String),
    Close,
}

// ---------------------------------------------------------------------------
// DialogueEngine
// ---------------------------------------------------------------------------

/// Walks dialogue trees for at most one conversation at a time.
#[derive(Debug)]
pub struct DialogueEngine {
    table: DialogueTable,
    timing: DialogueConfig,
    session: Option<Session>,
    history: Vec<String>,
}

impl DialogueEngine {
    /// Create an idle engine over `table`.
    #[must_use]
    pub fn new(table: DialogueTable, timing: DialogueConfig) -> Self {
        Self {
            table,
            timing,
            session: None,
            history: Vec::new(),
        }
    }

    /// The tree table in use.
    #[must_use]
    pub fn table(&self) -> &DialogueTable {
        &self.table
    }

    /// Swap the tree table.
    ///
    /// An open session keeps its on-screen snapshot; its next transition
    /// resolves against the new table by tree and node id.
    pub fn replace_table(&mut self, table: DialogueTable) {
        debug!(trees = table.len(), "dialogue table replaced");
        self.table = table;
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> DialogueState {
        match self.session.as_ref().map(|s| &s.phase) {
            None => DialogueState::Idle,
            Some(Phase::Revealing { .. }) => DialogueState::Revealing,
            Some(Phase::WaitingForChoice) => DialogueState::WaitingForChoice,
            Some(Phase::AutoAdvancing { .. }) => DialogueState::AutoAdvancing,
            Some(Phase::AutoClosing { .. }) => DialogueState::AutoClosing,
            Some(Phase::AwaitingItem) => DialogueState::AwaitingExternalEvent,
        }
    }

    /// Whether a session is open.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// The open session, if any.
    #[must_use]
    pub fn active(&self) -> Option<&ActiveDialogue> {
        self.session.as_ref().map(|s| &s.view)
    }

    /// Earliest pending timer deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<GameTime> {
        match self.session.as_ref().map(|s| &s.phase)? {
            Phase::Revealing { done_at } => Some(*done_at),
            Phase::AutoAdvancing { at, .. } | Phase::AutoClosing { at } => Some(*at),
            Phase::WaitingForChoice | Phase::AwaitingItem => None,
        }
    }

    /// Transcript lines, oldest first.
    #[must_use]
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Forget the transcript.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Open a conversation with `npc`, replacing any open one.
    ///
    /// The tree is chosen by the table's rules for this NPC, falling back to
    /// the NPC's default tree. A missing tree or start node leaves the
    /// engine idle.
    pub fn start(&mut self, npc: &Npc, flags: &dyn FlagSource, now: GameTime) -> Vec<DialogueEffect> {
        let mut effects = self.close();
        let tree = self
            .table
            .select_tree(npc.id(), npc.dialogue_tree(), flags)
            .to_string();
        if self.table.node(&tree, START_NODE).is_none() {
            warn!(npc = %npc.id(), %tree, "dialogue tree or start node missing");
            return effects;
        }

        self.session = Some(Session {
            view: ActiveDialogue {
                npc: npc.id().clone(),
                npc_name: npc.name().to_string(),
                tree: tree.clone(),
                node: String::new(),
                speaker: Speaker::Npc,
                text: String::new(),
                options: Vec::new(),
                is_typing: true,
            },
            phase: Phase::WaitingForChoice,
            next: None,
            awaits_item: false,
        });
        debug!(npc = %npc.id(), %tree, "dialogue started");
        effects.push(DialogueEffect::Started {
            npc: npc.id().clone(),
            tree,
        });
        self.enter_node(START_NODE, now, &mut effects);
        effects
    }

    /// Select an option of the current node.
    ///
    /// Ignored (with a warning) while text is typing or if the option id is
    /// not on screen.
    pub fn choose(&mut self, option_id: &str, now: GameTime) -> Vec<DialogueEffect> {
        let mut effects = Vec::new();
        let Some(session) = self.session.as_ref() else {
            warn!(option = option_id, "choice with no active dialogue");
            return effects;
        };
        if session.phase != Phase::WaitingForChoice {
            warn!(option = option_id, "choice while options are not selectable");
            return effects;
        }
        let Some(option) = session.view.options.iter().find(|o| o.id == option_id).cloned() else {
            warn!(option = option_id, node = %session.view.node, "unknown dialogue option");
            return effects;
        };
        let npc = session.view.npc.clone();

        self.push_history(format!("You: {}", option.text));
        if let Some(amount) = option.xp {
            effects.push(DialogueEffect::GrantXp { amount });
        }
        if let Some(flag) = option.flag {
            effects.push(DialogueEffect::SetFlag { flag });
        }
        if let Some(action) = option.action {
            effects.push(DialogueEffect::Action { npc, action });
        }
        match option.next {
            Some(next) => self.enter_node(&next, now, &mut effects),
            None => effects.extend(self.close()),
        }
        effects
    }

    /// Finish the current reveal immediately.
    pub fn skip_reveal(&mut self, now: GameTime) {
        if let Some(session) = self.session.as_mut() {
            if let Phase::Revealing { done_at } = session.phase {
                Self::finish_reveal(session, done_at.min(now), &self.timing);
            }
        }
    }

    /// Continue a conversation that is waiting for an item from `npc`.
    ///
    /// Jumps to the tree's `item_received` node. Calls that do not match the
    /// open session are ignored.
    pub fn trigger_item_received(&mut self, npc: &NpcId, now: GameTime) -> Vec<DialogueEffect> {
        let mut effects = Vec::new();
        let Some(session) = self.session.as_ref() else {
            debug!(npc = %npc, "item received with no open dialogue");
            return effects;
        };
        if &session.view.npc != npc {
            debug!(npc = %npc, open = %session.view.npc, "item received for a different NPC");
            return effects;
        }
        self.enter_node(ITEM_RECEIVED_NODE, now, &mut effects);
        effects
    }

    /// Close the open session. Safe to call at any time.
    pub fn close(&mut self) -> Vec<DialogueEffect> {
        match self.session.take() {
            Some(session) => {
                debug!(npc = %session.view.npc, node = %session.view.node, "dialogue closed");
                vec![DialogueEffect::Closed { npc: session.view.npc }]
            }
            None => Vec::new(),
        }
    }

    /// Fire every timer due at or before `now`.
    pub fn update(&mut self, now: GameTime) -> Vec<DialogueEffect> {
        let mut effects = Vec::new();
        loop {
            let due = match self.session.as_ref().map(|s| &s.phase) {
                Some(Phase::Revealing { done_at }) if now >= *done_at => Due::FinishReveal(*done_at),
                Some(Phase::AutoAdvancing { at, target }) if now >= *at => {
                    Due::Advance(*at, target.clone())
                }
                Some(Phase::AutoClosing { at }) if now >= *at => Due::Close,
                _ => break,
            };
            match due {
                Due::FinishReveal(at) => {
                    if let Some(session) = self.session.as_mut() {
                        Self::finish_reveal(session, at, &self.timing);
                    }
                }
                Due::Advance(at, target) => self.enter_node(&target, at, &mut effects),
                Due::Close => effects.extend(self.close()),
            }
        }
        effects
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn enter_node(&mut self, node_id: &str, now: GameTime, effects: &mut Vec<DialogueEffect>) {
        let Some(session) = self.session.as_ref() else { return };
        let tree = session.view.tree.clone();
        let Some(node) = self.table.node(&tree, node_id).cloned() else {
            warn!(%tree, node = node_id, "dialogue node missing, closing");
            effects.extend(self.close());
            return;
        };
        let reveal_ms = self.reveal_ms(&node);
        let Some(session) = self.session.as_mut() else { return };

        session.view.node = node_id.to_string();
        session.view.speaker = node.speaker;
        session.view.text.clone_from(&node.text);
        session.view.options.clone_from(&node.options);
        session.view.is_typing = true;
        session.phase = Phase::Revealing {
            done_at: now.after(reveal_ms),
        };
        session.next.clone_from(&node.next);
        session.awaits_item = node.awaits_item();

        let npc = session.view.npc.clone();
        let line = match node.speaker {
            Speaker::Npc => format!("{}: {}", session.view.npc_name, node.text),
            Speaker::Player => format!("You: {}", node.text),
        };
        debug!(npc = %npc, %tree, node = node_id, reveal_ms, "dialogue node entered");
        self.push_history(line);

        effects.push(DialogueEffect::NodeEntered {
            npc: npc.clone(),
            tree,
            node: node_id.to_string(),
        });
        if let Some(action) = node.action {
            effects.push(DialogueEffect::Action { npc, action });
        }
    }

    fn finish_reveal(session: &mut Session, at: GameTime, timing: &DialogueConfig) {
        session.view.is_typing = false;
        session.phase = if !session.view.options.is_empty() {
            Phase::WaitingForChoice
        } else if let Some(target) = session.next.clone() {
            Phase::AutoAdvancing {
                at: at.after(timing.auto_advance_ms),
                target,
            }
        } else if session.awaits_item {
            Phase::AwaitingItem
        } else {
            Phase::AutoClosing {
                at: at.after(timing.auto_close_ms),
            }
        };
    }

    fn reveal_ms(&self, node: &DialogueNode) -> u64 {
        let chars = node.text.chars().count() as u64;
        chars.saturating_mul(self.timing.ms_per_char)
    }

    fn push_history(&mut self, line: String) {
        self.history.push(line);
        let limit = self.timing.history_limit;
        if self.history.len() > limit {
            let excess = self.history.len() - limit;
            self.history.drain(..excess);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
