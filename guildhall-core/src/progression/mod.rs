//! Quest objectives, XP levels and the save format.
//!
//! - [`Quest`] / [`Objective`]: the single active quest and its ordered steps.
//! - [`LevelTable`]: level as a pure function of cumulative XP.
//! - [`ProgressTracker`]: owns quest, XP, flags and per-NPC records.
//! - [`SaveState`] / [`SaveSlot`]: the all-or-nothing persisted snapshot.

pub mod save;
pub mod tracker;

use serde::{Deserialize, Serialize};

use crate::inventory::catalog::MAIN_QUEST;
use crate::types::{ItemId, ObjectiveId};

pub use save::{LoadOutcome, NpcRecord, PlayerState, QuestProgress, SaveSlot, SaveState};
pub use tracker::{ProgressEvent, ProgressTracker};

// ---------------------------------------------------------------------------
// Objectives
// ---------------------------------------------------------------------------

/// What kind of step an objective is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveKind {
    /// Speak to an NPC.
    Talk,
    /// Produce something.
    Create,
    /// Improve something.
    Refine,
    /// Reach a state (deliver, receive, finish).
    Complete,
}

/// One quest step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    /// Identifier.
    pub id: ObjectiveId,
    /// Journal text.
    pub text: String,
    /// Kind of step.
    pub kind: ObjectiveKind,
    /// NPC or item id the step is about.
    #[serde(default)]
    pub target: Option<String>,
    /// Done.
    #[serde(default)]
    pub completed: bool,
    /// Skippable; never becomes current.
    #[serde(default)]
    pub optional: bool,
}

impl Objective {
    fn new(id: &str, text: &str, kind: ObjectiveKind, target: Option<&str>) -> Self {
        Self {
            id: ObjectiveId::new(id),
            text: text.to_string(),
            kind,
            target: target.map(str::to_string),
            completed: false,
            optional: false,
        }
    }

    fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Whether this step is about `target`.
    #[must_use]
    pub fn targets(&self, target: &str) -> bool {
        self.target.as_deref() == Some(target)
    }
}

/// What finishing the quest grants.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QuestReward {
    /// Experience.
    pub xp: u64,
    /// Items added to the inventory.
    #[serde(default)]
    pub items: Vec<ItemId>,
    /// Feature or NPC unlock ids.
    #[serde(default)]
    pub unlocks: Vec<String>,
    /// New player title.
    #[serde(default)]
    pub title: Option<String>,
}

/// A quest: ordered objectives plus a reward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quest {
    /// Identifier.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Steps in order.
    pub objectives: Vec<Objective>,
    /// Index of the first open required objective.
    pub current: Option<usize>,
    /// Every required objective done.
    pub completed: bool,
    /// Completion reward.
    pub reward: QuestReward,
}

impl Quest {
    /// Build a quest and compute its current objective.
    #[must_use]
    pub fn new(id: &str, title: &str, objectives: Vec<Objective>, reward: QuestReward) -> Self {
        let mut quest = Self {
            id: id.to_string(),
            title: title.to_string(),
            objectives,
            current: None,
            completed: false,
            reward,
        };
        quest.recompute_current();
        quest
    }

    /// The guild hall's main quest: wake each companion in turn and return
    /// the last key to the guide.
    #[must_use]
    pub fn standard() -> Self {
        use ObjectiveKind::{Complete, Refine, Talk};
        Self::new(
            MAIN_QUEST,
            "Awaken the Guild",
            vec![
                Objective::new("talk_to_guide", "Speak with the Guide", Talk, Some("elder_guide")),
                Objective::new(
                    "receive_primordial_code",
                    "Receive the primordial code",
                    Complete,
                    Some("primordial_code"),
                ),
                Objective::new(
                    "activate_librarian",
                    "Wake the Librarian with the primordial code",
                    Complete,
                    Some("librarian"),
                ),
                Objective::new(
                    "activate_scribe",
                    "Bring the activation key to the Scribe",
                    Complete,
                    Some("requirements_scribe"),
                ),
                Objective::new(
                    "activate_artisan",
                    "Hand the execution core to the Artisan",
                    Complete,
                    Some("artisan"),
                ),
                Objective::new(
                    "activate_critic",
                    "Let the Critic review the optimization module",
                    Complete,
                    Some("critic"),
                ),
                Objective::new("study_archives", "Study the archives", Refine, Some("librarian")).optional(),
                Objective::new("return_to_guide", "Return the protocol to the Guide", Complete, None),
            ],
            QuestReward {
                xp: 1000,
                items: Vec::new(),
                unlocks: vec!["open_world".to_string()],
                title: Some("Conductor".to_string()),
            },
        )
    }

    /// Recompute [`Quest::current`] from completion marks.
    pub fn recompute_current(&mut self) {
        self.current = self.objectives.iter().position(|o| !o.completed && !o.optional);
    }

    /// The current objective.
    #[must_use]
    pub fn current_objective(&self) -> Option<&Objective> {
        self.current.and_then(|i| self.objectives.get(i))
    }

    /// Look up an objective.
    #[must_use]
    pub fn objective(&self, id: &ObjectiveId) -> Option<&Objective> {
        self.objectives.iter().find(|o| &o.id == id)
    }

    /// Whether every non-optional objective is done.
    #[must_use]
    pub fn required_done(&self) -> bool {
        self.objectives.iter().all(|o| o.completed || o.optional)
    }

    /// Ids of completed objectives, in quest order.
    #[must_use]
    pub fn completed_ids(&self) -> Vec<ObjectiveId> {
        self.objectives
            .iter()
            .filter(|o| o.completed)
            .map(|o| o.id.clone())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Levels
// ---------------------------------------------------------------------------

/// Cumulative XP thresholds; entry `i` is the XP needed for level `i + 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelTable {
    thresholds: Vec<u64>,
}

impl LevelTable {
    /// Build from thresholds, sorting them and forcing level 1 at 0 XP.
    #[must_use]
    pub fn new(mut thresholds: Vec<u64>) -> Self {
        thresholds.sort_unstable();
        thresholds.dedup();
        if thresholds.first() != Some(&0) {
            thresholds.insert(0, 0);
        }
        Self { thresholds }
    }

    /// Highest level.
    #[must_use]
    pub fn max_level(&self) -> u32 {
        u32::try_from(self.thresholds.len()).unwrap_or(u32::MAX)
    }

    /// Level reached with `xp` total experience.
    #[must_use]
    pub fn level_for(&self, xp: u64) -> u32 {
        let reached = self.thresholds.iter().take_while(|t| **t <= xp).count();
        u32::try_from(reached).unwrap_or(u32::MAX).max(1)
    }

    /// XP still missing for the next level; 0 at the top.
    #[must_use]
    pub fn xp_to_next(&self, xp: u64) -> u64 {
        let level = self.level_for(xp) as usize;
        self.thresholds.get(level).map_or(0, |next| next.saturating_sub(xp))
    }
}

impl Default for LevelTable {
    fn default() -> Self {
        Self::new(vec![0, 100, 300, 600, 1000])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_table_matches_thresholds() {
        let table = LevelTable::default();
        assert_eq!(table.level_for(0), 1);
        assert_eq!(table.level_for(99), 1);
        assert_eq!(table.level_for(250), 2);
        assert_eq!(table.xp_to_next(250), 50);
        assert_eq!(table.level_for(5000), 5);
        assert_eq!(table.xp_to_next(5000), 0);
    }

    #[test]
    fn unsorted_thresholds_are_normalised() {
        let table = LevelTable::new(vec![300, 100]);
        assert_eq!(table.max_level(), 3);
        assert_eq!(table.level_for(150), 2);
    }

    #[test]
    fn optional_objectives_never_become_current() {
        let mut quest = Quest::standard();
        for o in &mut quest.objectives {
            if !o.optional && o.id.as_str() != "return_to_guide" {
                o.completed = true;
            }
        }
        quest.recompute_current();
        assert_eq!(
            quest.current_objective().map(|o| o.id.as_str()),
            Some("return_to_guide")
        );
        quest.objectives.last_mut().expect("last").completed = true;
        quest.recompute_current();
        assert!(quest.current.is_none());
        assert!(quest.required_done());
    }
}
