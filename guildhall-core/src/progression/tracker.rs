//! Quest/progression state: objectives, XP, flags and per-NPC records.
//!
//! Every mutating call returns the [`ProgressEvent`]s it caused and bumps
//! [`ProgressTracker::revision`]; the owner decides when to persist.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use tracing::{debug, info, warn};

use super::save::{NpcRecord, PlayerState, QuestProgress, SaveState};
use super::{LevelTable, ObjectiveKind, Quest};
use crate::config::ProgressionConfig;
use crate::dialogue::FlagSource;
use crate::inventory::InventorySnapshot;
use crate::types::{NpcId, ObjectiveId, Position};

/// Flag set when the main quest is finished.
pub const OPEN_WORLD_FLAG: &str = "open_world_unlocked";

/// Something that changed in the player's progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// An objective was marked done.
    ObjectiveCompleted {
        /// Objective id.
        id: ObjectiveId,
    },
    /// Every required objective is done.
    QuestCompleted {
        /// Quest id.
        quest: String,
        /// Title granted, if any.
        title: Option<String>,
    },
    /// Experience was added.
    XpGained {
        /// Amount added.
        amount: u64,
        /// New total.
        total: u64,
    },
    /// A level was reached.
    LevelUp {
        /// The new level.
        level: u32,
    },
    /// A flag became true.
    FlagSet {
        /// Flag name.
        flag: String,
    },
}

/// Owns the active quest and everything the save records about the player
/// apart from position and inventory.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    template: Quest,
    quest: Quest,
    levels: LevelTable,
    xp: u64,
    title: String,
    initial_title: String,
    flags: BTreeMap<String, bool>,
    npc_records: BTreeMap<NpcId, NpcRecord>,
    completed_quests: Vec<String>,
    revision: u64,
}

impl ProgressTracker {
    /// Fresh progress on `quest`.
    #[must_use]
    pub fn new(config: &ProgressionConfig, quest: Quest) -> Self {
        Self {
            template: quest.clone(),
            quest,
            levels: LevelTable::new(config.xp_thresholds.clone()),
            xp: 0,
            title: config.initial_title.clone(),
            initial_title: config.initial_title.clone(),
            flags: BTreeMap::new(),
            npc_records: BTreeMap::new(),
            completed_quests: Vec::new(),
            revision: 0,
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// The active quest.
    #[must_use]
    pub fn quest(&self) -> &Quest {
        &self.quest
    }

    /// The current objective, if any.
    #[must_use]
    pub fn current_objective(&self) -> Option<&super::Objective> {
        self.quest.current_objective()
    }

    /// Current level, derived from XP.
    #[must_use]
    pub fn level(&self) -> u32 {
        self.levels.level_for(self.xp)
    }

    /// Cumulative XP.
    #[must_use]
    pub fn xp(&self) -> u64 {
        self.xp
    }

    /// XP still needed for the next level; 0 at the top.
    #[must_use]
    pub fn xp_to_next_level(&self) -> u64 {
        self.levels.xp_to_next(self.xp)
    }

    /// Player title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// All flags.
    #[must_use]
    pub fn flags(&self) -> &BTreeMap<String, bool> {
        &self.flags
    }

    /// Whether a flag is set.
    #[must_use]
    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.get(flag).copied().unwrap_or(false)
    }

    /// What the player has done with one NPC.
    #[must_use]
    pub fn npc_record(&self, npc: &NpcId) -> Option<&NpcRecord> {
        self.npc_records.get(npc)
    }

    /// NPCs recorded as unlocked.
    #[must_use]
    pub fn unlocked_npcs(&self) -> BTreeSet<NpcId> {
        self.npc_records
            .iter()
            .filter(|(_, r)| r.unlocked)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Finished quest ids.
    #[must_use]
    pub fn completed_quests(&self) -> &[String] {
        &self.completed_quests
    }

    /// Monotonic change counter.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    // ------------------------------------------------------------------
    // Objectives
    // ------------------------------------------------------------------

    /// Mark an objective done. Already-done or unknown ids change nothing.
    ///
    /// Completing the last required objective completes the quest, which
    /// grants the reward XP and title and sets [`OPEN_WORLD_FLAG`].
    pub fn complete_objective(&mut self, id: &ObjectiveId) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        let Some(objective) = self.quest.objectives.iter_mut().find(|o| &o.id == id) else {
            warn!(objective = %id, "unknown objective");
            return events;
        };
        if objective.completed {
            return events;
        }
        objective.completed = true;
        self.quest.recompute_current();
        self.revision += 1;
        info!(
            objective = %id,
            next = ?self.quest.current_objective().map(|o| o.id.as_str()),
            "objective completed"
        );
        events.push(ProgressEvent::ObjectiveCompleted { id: id.clone() });

        if !self.quest.completed && self.quest.required_done() {
            self.complete_quest(&mut events);
        }
        events
    }

    /// Complete the current objective if it is a `complete` step about
    /// `target`.
    pub fn complete_current_targeting(&mut self, target: &str) -> Vec<ProgressEvent> {
        match self.quest.current_objective() {
            Some(o) if o.kind == ObjectiveKind::Complete && o.targets(target) => {
                let id = o.id.clone();
                self.complete_objective(&id)
            }
            _ => Vec::new(),
        }
    }

    /// Complete the first open objective about `target`, current or not.
    pub fn complete_open_targeting(&mut self, target: &str) -> Vec<ProgressEvent> {
        let id = self
            .quest
            .objectives
            .iter()
            .find(|o| !o.completed && o.targets(target))
            .map(|o| o.id.clone());
        id.map(|id| self.complete_objective(&id)).unwrap_or_default()
    }

    fn complete_quest(&mut self, events: &mut Vec<ProgressEvent>) {
        self.quest.completed = true;
        self.completed_quests.push(self.quest.id.clone());
        let reward = self.quest.reward.clone();
        if let Some(title) = &reward.title {
            self.title.clone_from(title);
        }
        info!(quest = %self.quest.id, xp = reward.xp, title = ?reward.title, "quest completed");
        events.push(ProgressEvent::QuestCompleted {
            quest: self.quest.id.clone(),
            title: reward.title,
        });
        if self.set_flag(OPEN_WORLD_FLAG, true) {
            events.push(ProgressEvent::FlagSet {
                flag: OPEN_WORLD_FLAG.to_string(),
            });
        }
        events.extend(self.grant_xp(reward.xp));
    }

    // ------------------------------------------------------------------
    // XP and flags
    // ------------------------------------------------------------------

    /// Add experience, possibly crossing several levels.
    pub fn grant_xp(&mut self, amount: u64) -> Vec<ProgressEvent> {
        if amount == 0 {
            return Vec::new();
        }
        let before = self.level();
        self.xp = self.xp.saturating_add(amount);
        let after = self.level();
        self.revision += 1;

        let mut events = vec![ProgressEvent::XpGained {
            amount,
            total: self.xp,
        }];
        for level in before + 1..=after {
            info!(level, xp = self.xp, "level up");
            events.push(ProgressEvent::LevelUp { level });
        }
        debug!(amount, total = self.xp, to_next = self.xp_to_next_level(), "xp granted");
        events
    }

    /// Set a flag. Returns whether the stored value changed.
    pub fn set_flag(&mut self, flag: &str, value: bool) -> bool {
        if self.flags.get(flag) == Some(&value) {
            return false;
        }
        self.flags.insert(flag.to_string(), value);
        self.revision += 1;
        debug!(flag, value, "flag set");
        true
    }

    // ------------------------------------------------------------------
    // NPC records
    // ------------------------------------------------------------------

    /// Record that `npc` is unlocked. Returns `true` the first time.
    pub fn mark_npc_unlocked(&mut self, npc: &NpcId) -> bool {
        let record = self.npc_records.entry(npc.clone()).or_default();
        if record.unlocked {
            return false;
        }
        record.unlocked = true;
        self.revision += 1;
        true
    }

    /// Record a conversation with `npc`.
    ///
    /// Sets `talked_to_<npc>`, bumps the interaction count and completes the
    /// current objective if it is a `talk` step about this NPC.
    pub fn on_npc_interaction(&mut self, npc: &NpcId) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        let flag = format!("talked_to_{npc}");
        if self.set_flag(&flag, true) {
            events.push(ProgressEvent::FlagSet { flag });
        }
        self.npc_records.entry(npc.clone()).or_default().interactions += 1;
        self.revision += 1;

        if let Some(o) = self.quest.current_objective() {
            if o.kind == ObjectiveKind::Talk && o.targets(npc.as_str()) {
                let id = o.id.clone();
                events.extend(self.complete_objective(&id));
            }
        }
        events
    }

    /// Remember the last node shown for `npc`.
    pub fn record_dialogue_node(&mut self, npc: &NpcId, node: &str) {
        let record = self.npc_records.entry(npc.clone()).or_default();
        if record.last_node.as_deref() != Some(node) {
            record.last_node = Some(node.to_string());
            self.revision += 1;
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Back to a fresh game.
    pub fn reset(&mut self) {
        self.quest = self.template.clone();
        self.xp = 0;
        self.title.clone_from(&self.initial_title);
        self.flags.clear();
        self.npc_records.clear();
        self.completed_quests.clear();
        self.revision += 1;
        debug!(quest = %self.quest.id, "progress reset");
    }

    /// Build a save from this progress plus the parts owned elsewhere.
    #[must_use]
    pub fn to_save(&self, version: &str, position: Position, inventory: InventorySnapshot) -> SaveState {
        SaveState {
            version: version.to_string(),
            timestamp: Utc::now(),
            player: PlayerState {
                position,
                level: self.level(),
                xp: self.xp,
                xp_to_next_level: self.xp_to_next_level(),
                title: self.title.clone(),
                unlocked_npcs: self.unlocked_npcs(),
                completed_objectives: self.quest.completed_ids(),
                inventory,
            },
            quest_progress: QuestProgress {
                quest_id: self.quest.id.clone(),
                current_objective: self.quest.current,
                completed_quests: self.completed_quests.clone(),
            },
            npc_states: self.npc_records.clone(),
            flags: self.flags.clone(),
        }
    }

    /// Replace progress with a save. Level is recomputed from XP.
    pub fn restore(&mut self, save: &SaveState) {
        self.reset();
        if save.quest_progress.quest_id != self.quest.id {
            warn!(
                saved = %save.quest_progress.quest_id,
                active = %self.quest.id,
                "save is for a different quest, objectives not restored"
            );
        } else {
            for id in &save.player.completed_objectives {
                match self.quest.objectives.iter_mut().find(|o| &o.id == id) {
                    Some(o) => o.completed = true,
                    None => warn!(objective = %id, "save references unknown objective"),
                }
            }
        }
        self.quest.recompute_current();
        self.completed_quests.clone_from(&save.quest_progress.completed_quests);
        self.quest.completed =
            self.completed_quests.contains(&self.quest.id) || self.quest.required_done();

        self.xp = save.player.xp;
        self.title.clone_from(&save.player.title);
        self.flags.clone_from(&save.flags);
        self.npc_records.clone_from(&save.npc_states);
        for npc in &save.player.unlocked_npcs {
            self.npc_records.entry(npc.clone()).or_default().unlocked = true;
        }
        self.revision += 1;
        info!(level = self.level(), xp = self.xp, "progress restored");
    }
}

impl FlagSource for ProgressTracker {
    fn has_flag(&self, flag: &str) -> bool {
        ProgressTracker::has_flag(self, flag)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> ProgressTracker {
        ProgressTracker::new(&ProgressionConfig::default(), Quest::standard())
    }

    fn oid(s: &str) -> ObjectiveId {
        ObjectiveId::new(s)
    }

    #[test]
    fn grant_250_reaches_level_two() {
        let mut t = tracker();
        let events = t.grant_xp(250);
        assert_eq!(t.level(), 2);
        assert_eq!(t.xp_to_next_level(), 50);
        assert!(events.contains(&ProgressEvent::LevelUp { level: 2 }));
    }

    #[test]
    fn multi_level_grant_reports_each_level() {
        let mut t = tracker();
        let levels: Vec<_> = t
            .grant_xp(650)
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::LevelUp { level } => Some(level),
                _ => None,
            })
            .collect();
        assert_eq!(levels, vec![2, 3, 4]);
        t.grant_xp(10_000);
        assert_eq!(t.level(), 5);
        assert_eq!(t.xp_to_next_level(), 0);
    }

    #[test]
    fn complete_objective_is_idempotent() {
        let mut t = tracker();
        assert_eq!(t.complete_objective(&oid("talk_to_guide")).len(), 1);
        let rev = t.revision();
        assert!(t.complete_objective(&oid("talk_to_guide")).is_empty());
        assert!(t.complete_objective(&oid("no_such_step")).is_empty());
        assert_eq!(t.revision(), rev);
        assert_eq!(
            t.current_objective().map(|o| o.id.as_str()),
            Some("receive_primordial_code")
        );
    }

    #[test]
    fn quest_completes_exactly_once() {
        let mut t = tracker();
        let ids: Vec<_> = t.quest().objectives.iter().map(|o| o.id.clone()).collect();
        let mut completions = 0;
        for id in ids.iter().chain(ids.iter()) {
            completions += t
                .complete_objective(id)
                .iter()
                .filter(|e| matches!(e, ProgressEvent::QuestCompleted { .. }))
                .count();
        }
        assert_eq!(completions, 1);
        assert!(t.has_flag(OPEN_WORLD_FLAG));
        assert_eq!(t.title(), "Conductor");
        assert_eq!(t.xp(), 1000);
    }

    #[test]
    fn optional_objective_not_required() {
        let mut t = tracker();
        for o in Quest::standard().objectives.iter().filter(|o| !o.optional) {
            t.complete_objective(&o.id);
        }
        assert!(t.quest().completed);
        assert!(!t.quest().objective(&oid("study_archives")).expect("optional").completed);
    }

    #[test]
    fn talking_completes_only_the_current_talk_step() {
        let mut t = tracker();
        t.on_npc_interaction(&NpcId::new("librarian"));
        assert!(!t.quest().objective(&oid("talk_to_guide")).expect("step").completed);
        let events = t.on_npc_interaction(&NpcId::new("elder_guide"));
        assert!(events.contains(&ProgressEvent::ObjectiveCompleted { id: oid("talk_to_guide") }));
        assert!(t.has_flag("talked_to_elder_guide"));
        assert_eq!(t.npc_record(&NpcId::new("elder_guide")).expect("record").interactions, 1);
    }

    #[test]
    fn targeted_completion() {
        let mut t = tracker();
        t.complete_objective(&oid("talk_to_guide"));
        assert!(t.complete_current_targeting("librarian").is_empty());
        assert_eq!(t.complete_open_targeting("primordial_code").len(), 1);
        assert_eq!(t.complete_current_targeting("librarian").len(), 1);
    }

    #[test]
    fn save_restore_round_trip() {
        let mut t = tracker();
        t.on_npc_interaction(&NpcId::new("elder_guide"));
        t.grant_xp(120);
        t.mark_npc_unlocked(&NpcId::new("librarian"));
        t.record_dialogue_node(&NpcId::new("elder_guide"), "gift");
        let save = t.to_save("1.0.0", Position::new(3.0, 4.0), InventorySnapshot::default());

        let mut fresh = tracker();
        fresh.restore(&save);
        assert_eq!(fresh.level(), 2);
        assert_eq!(fresh.flags(), t.flags());
        assert_eq!(fresh.quest().current, t.quest().current);
        assert!(fresh.unlocked_npcs().contains(&NpcId::new("librarian")));
        assert_eq!(
            fresh.npc_record(&NpcId::new("elder_guide")).and_then(|r| r.last_node.as_deref()),
            Some("gift")
        );
    }

    #[test]
    fn reset_clears_everything() {
        let mut t = tracker();
        t.grant_xp(500);
        t.set_flag("x", true);
        t.reset();
        assert_eq!(t.xp(), 0);
        assert_eq!(t.level(), 1);
        assert!(t.flags().is_empty());
        assert_eq!(t.title(), "Initiate");
    }
}
