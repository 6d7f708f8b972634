//! The persisted snapshot and the slot it lives in.
//!
//! A save is one JSON document under one key. Loading is strict: a blob
//! whose `version` differs from the running version is treated as absent.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::PersistenceConfig;
use crate::error::Result;
use crate::inventory::InventorySnapshot;
use crate::persistence::{SaveStore, open_store};
use crate::types::{NpcId, ObjectiveId, Position};

/// Player-facing progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    /// Where the player stands.
    pub position: Position,
    /// Current level.
    pub level: u32,
    /// Cumulative experience.
    pub xp: u64,
    /// Experience still needed for the next level.
    pub xp_to_next_level: u64,
    /// Display title.
    pub title: String,
    /// NPCs unlocked so far.
    pub unlocked_npcs: BTreeSet<NpcId>,
    /// Objectives completed so far.
    pub completed_objectives: Vec<ObjectiveId>,
    /// Bag contents.
    pub inventory: InventorySnapshot,
}

/// Where the active quest stands.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QuestProgress {
    /// Active quest id.
    pub quest_id: String,
    /// Index of the current objective.
    pub current_objective: Option<usize>,
    /// Finished quests.
    #[serde(default)]
    pub completed_quests: Vec<String>,
}

/// Per-NPC memory of the player's visits.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NpcRecord {
    /// Unlock state.
    pub unlocked: bool,
    /// Conversations started.
    #[serde(default)]
    pub interactions: u32,
    /// Last dialogue node shown.
    #[serde(default)]
    pub last_node: Option<String>,
}

/// Everything written to the save slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveState {
    /// Format version.
    pub version: String,
    /// Write time.
    pub timestamp: DateTime<Utc>,
    /// Player progress.
    pub player: PlayerState,
    /// Quest progress.
    pub quest_progress: QuestProgress,
    /// Per-NPC records.
    pub npc_states: BTreeMap<NpcId, NpcRecord>,
    /// Progression flags.
    pub flags: BTreeMap<String, bool>,
}

/// Result of reading the slot.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// A usable save.
    Loaded(Box<SaveState>),
    /// Nothing stored, or the store could not be read.
    Missing,
    /// Stored bytes are not a valid save.
    Corrupt(String),
    /// A save from another format version.
    VersionMismatch {
        /// Version found in the blob.
        found: String,
    },
}

impl LoadOutcome {
    /// The save, if usable.
    #[must_use]
    pub fn into_state(self) -> Option<SaveState> {
        match self {
            Self::Loaded(state) => Some(*state),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// SaveSlot
// ---------------------------------------------------------------------------

/// A store plus the fixed key and version the game saves under.
pub struct SaveSlot {
    store: Box<dyn SaveStore>,
    key: String,
    version: String,
}

impl std::fmt::Debug for SaveSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaveSlot")
            .field("key", &self.key)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl SaveSlot {
    /// Wrap `store`.
    #[must_use]
    pub fn new(store: Box<dyn SaveStore>, key: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            version: version.into(),
        }
    }

    /// Open the configured store with the configured key and version.
    ///
    /// # Errors
    /// Store open failures.
    pub fn from_config(config: &PersistenceConfig) -> Result<Self> {
        Ok(Self::new(open_store(config)?, &config.save_key, &config.save_version))
    }

    /// Version stamped into writes.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Key the save lives under.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read and validate the stored save.
    #[must_use]
    pub fn read(&self) -> LoadOutcome {
        let bytes = match self.store.get(&self.key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return LoadOutcome::Missing,
            Err(e) => {
                error!(key = %self.key, error = %e, "failed to read save");
                return LoadOutcome::Missing;
            }
        };

        let value: serde_json::Value = match serde_json::from_slice(&bytes) {
            Ok(v) => v,
            Err(e) => {
                warn!(key = %self.key, error = %e, "save is not valid JSON");
                return LoadOutcome::Corrupt(e.to_string());
            }
        };
        let found = value.get("version").and_then(serde_json::Value::as_str).unwrap_or("");
        if found != self.version {
            warn!(key = %self.key, found, expected = %self.version, "save version mismatch, ignoring save");
            return LoadOutcome::VersionMismatch {
                found: found.to_string(),
            };
        }

        match serde_json::from_value::<SaveState>(value) {
            Ok(state) => {
                debug!(key = %self.key, bytes = bytes.len(), "save loaded");
                LoadOutcome::Loaded(Box::new(state))
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "save does not match the current format");
                LoadOutcome::Corrupt(e.to_string())
            }
        }
    }

    /// Write `state`. Failures are logged and reported as `false`.
    pub fn write(&mut self, state: &SaveState) -> bool {
        let bytes = match serde_json::to_vec(state) {
            Ok(b) => b,
            Err(e) => {
                error!(error = %e, "failed to encode save");
                return false;
            }
        };
        match self.write_raw(&bytes) {
            Ok(()) => {
                info!(key = %self.key, bytes = bytes.len(), level = state.player.level, "game saved");
                true
            }
            Err(e) => {
                error!(key = %self.key, error = %e, "failed to write save");
                false
            }
        }
    }

    /// Delete the stored save. Failures are logged and reported as `false`.
    pub fn clear(&mut self) -> bool {
        match self.store.remove(&self.key) {
            Ok(existed) => existed,
            Err(e) => {
                error!(key = %self.key, error = %e, "failed to clear save");
                false
            }
        }
    }

    /// Store raw bytes under the slot key, bypassing encoding.
    ///
    /// # Errors
    /// Store failures.
    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.store.set(&self.key, bytes)
    }
}
