//! Configuration for the guildhall engine.
//!
//! Maps directly to `guildhall.toml`. Every field has a default, so an empty
//! file (or no file at all) yields the stock tuning.

use serde::{Deserialize, Serialize};

use crate::types::PersonalityTrait;

/// Top-level engine configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestConfig {
    /// Dialogue reveal and auto-advance timing.
    #[serde(default)]
    pub dialogue: DialogueConfig,
    /// Inventory capacity and log limits.
    #[serde(default)]
    pub inventory: InventoryConfig,
    /// NPC wandering parameters.
    #[serde(default)]
    pub wandering: WanderingConfig,
    /// NPC presentation timers and hit-testing.
    #[serde(default)]
    pub npc: NpcConfig,
    /// XP table and quest titles.
    #[serde(default)]
    pub progression: ProgressionConfig,
    /// Player movement tuning and map bounds.
    #[serde(default)]
    pub movement: MovementConfig,
    /// Save slot settings.
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl QuestConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `QuestError::Config` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> crate::error::Result<Self> {
        toml::from_str(toml_str).map_err(|e| crate::QuestError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Dialogue timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueConfig {
    /// Delay per revealed character.
    #[serde(default = "default_30")]
    pub ms_per_char: u64,
    /// Pause between the end of a reveal and an automatic `next` jump.
    #[serde(default = "default_2000")]
    pub auto_advance_ms: u64,
    /// Pause between the end of a terminal node's reveal and closing.
    #[serde(default = "default_2000")]
    pub auto_close_ms: u64,
    /// Maximum number of lines kept in the dialogue history.
    #[serde(default = "default_200_usize")]
    pub history_limit: usize,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            ms_per_char: 30,
            auto_advance_ms: 2000,
            auto_close_ms: 2000,
            history_limit: 200,
        }
    }
}

/// Inventory capacity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryConfig {
    /// Number of slots in a fresh inventory.
    #[serde(default = "default_20_usize")]
    pub max_slots: usize,
    /// Quantity cap for stackable items.
    #[serde(default = "default_99")]
    pub max_stack: u32,
    /// Re-sort by rarity after every new item.
    #[serde(default = "default_true")]
    pub auto_sort: bool,
    /// Transaction log capacity; the oldest entries are evicted first.
    #[serde(default = "default_100_usize")]
    pub transaction_log_cap: usize,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            max_slots: 20,
            max_stack: 99,
            auto_sort: true,
            transaction_log_cap: 100,
        }
    }
}

/// Radius/speed/delay triple for one personality.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WanderParams {
    /// Maximum distance from home, in pixels.
    pub radius: f32,
    /// Distance covered per tick while moving.
    pub speed: f32,
    /// Idle time after arriving before the next move.
    pub delay_ms: u64,
}

/// Per-personality wandering table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WanderingConfig {
    /// Arrival threshold: closer than this counts as "at target".
    #[serde(default = "default_epsilon")]
    pub epsilon: f32,
    /// Probability of heading back home instead of a random point.
    #[serde(default = "default_home_bias")]
    pub home_bias: f64,
    /// Parameters for [`PersonalityTrait::Wise`].
    #[serde(default = "default_wise")]
    pub wise: WanderParams,
    /// Parameters for [`PersonalityTrait::Methodical`].
    #[serde(default = "default_methodical")]
    pub methodical: WanderParams,
    /// Parameters for [`PersonalityTrait::Energetic`].
    #[serde(default = "default_energetic")]
    pub energetic: WanderParams,
    /// Parameters for [`PersonalityTrait::Refined`].
    #[serde(default = "default_refined")]
    pub refined: WanderParams,
    /// Parameters for [`PersonalityTrait::Scholarly`].
    #[serde(default = "default_scholarly")]
    pub scholarly: WanderParams,
}

impl WanderingConfig {
    /// Look up the parameters for a personality.
    #[must_use]
    pub fn params_for(&self, personality: PersonalityTrait) -> WanderParams {
        match personality {
            PersonalityTrait::Wise => self.wise,
            PersonalityTrait::Methodical => self.methodical,
            PersonalityTrait::Energetic => self.energetic,
            PersonalityTrait::Refined => self.refined,
            PersonalityTrait::Scholarly => self.scholarly,
        }
    }
}

impl Default for WanderingConfig {
    fn default() -> Self {
        Self {
            epsilon: default_epsilon(),
            home_bias: default_home_bias(),
            wise: default_wise(),
            methodical: default_methodical(),
            energetic: default_energetic(),
            refined: default_refined(),
            scholarly: default_scholarly(),
        }
    }
}

/// NPC presentation timers and hit-testing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NpcConfig {
    /// How long the `talk` indicator stays up after an unlock.
    #[serde(default = "default_10000")]
    pub unlock_indicator_ms: u64,
    /// Click radius around an NPC.
    #[serde(default = "default_interaction_radius")]
    pub interaction_radius: f32,
}

impl Default for NpcConfig {
    fn default() -> Self {
        Self {
            unlock_indicator_ms: 10_000,
            interaction_radius: default_interaction_radius(),
        }
    }
}

/// XP thresholds and player titles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressionConfig {
    /// Cumulative XP needed for each level; index 0 is level 1.
    #[serde(default = "default_thresholds")]
    pub xp_thresholds: Vec<u64>,
    /// Title of a fresh player.
    #[serde(default = "default_initial_title")]
    pub initial_title: String,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            xp_thresholds: default_thresholds(),
            initial_title: default_initial_title(),
        }
    }
}

/// Player movement tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementConfig {
    /// Walking speed in pixels per second.
    #[serde(default = "default_speed")]
    pub speed: f32,
    /// Lowest accepted walking speed.
    #[serde(default = "default_min_speed")]
    pub min_speed: f32,
    /// Highest accepted walking speed.
    #[serde(default = "default_max_speed")]
    pub max_speed: f32,
    /// Canvas width in pixels.
    #[serde(default = "default_canvas_width")]
    pub canvas_width: f32,
    /// Canvas height in pixels.
    #[serde(default = "default_canvas_height")]
    pub canvas_height: f32,
    /// Margin kept between the player and the canvas edge.
    #[serde(default = "default_margin")]
    pub margin: f32,
    /// Duration of one walk-cycle frame.
    #[serde(default = "default_100")]
    pub frame_ms: u64,
    /// Where a fresh player stands.
    #[serde(default = "default_start_x")]
    pub start_x: f32,
    /// Where a fresh player stands.
    #[serde(default = "default_start_y")]
    pub start_y: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            speed: default_speed(),
            min_speed: default_min_speed(),
            max_speed: default_max_speed(),
            canvas_width: default_canvas_width(),
            canvas_height: default_canvas_height(),
            margin: default_margin(),
            frame_ms: 100,
            start_x: default_start_x(),
            start_y: default_start_y(),
        }
    }
}

/// Backing store for the save slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Volatile in-process map.
    Memory,
    /// `SQLite` database at [`PersistenceConfig::path`].
    #[default]
    Sqlite,
}

/// Save slot settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Which store to open.
    #[serde(default)]
    pub backend: StoreBackend,
    /// Database path for the `SQLite` backend.
    #[serde(default = "default_db_path")]
    pub path: String,
    /// Single key the whole game state is written under.
    #[serde(default = "default_save_key")]
    pub save_key: String,
    /// Format version stamped into every save; loads require an exact match.
    #[serde(default = "default_save_version")]
    pub save_version: String,
    /// Enable WAL journaling.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
    /// Store and verify a CRC-32 next to each blob.
    #[serde(default = "default_true")]
    pub checksum_enabled: bool,
    /// Interval between periodic saves.
    #[serde(default = "default_30000")]
    pub autosave_interval_ms: u64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_db_path(),
            save_key: default_save_key(),
            save_version: default_save_version(),
            wal_mode: true,
            checksum_enabled: true,
            autosave_interval_ms: 30_000,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

fn default_true() -> bool {
    true
}
fn default_20_usize() -> usize {
    20
}
fn default_100_usize() -> usize {
    100
}
fn default_200_usize() -> usize {
    200
}
fn default_30() -> u64 {
    30
}
fn default_99() -> u32 {
    99
}
fn default_100() -> u64 {
    100
}
fn default_2000() -> u64 {
    2000
}
fn default_10000() -> u64 {
    10_000
}
fn default_30000() -> u64 {
    30_000
}
fn default_epsilon() -> f32 {
    1.0
}
fn default_home_bias() -> f64 {
    0.4
}
fn default_wise() -> WanderParams {
    WanderParams {
        radius: 30.0,
        speed: 0.5,
        delay_ms: 8000,
    }
}
fn default_methodical() -> WanderParams {
    WanderParams {
        radius: 40.0,
        speed: 0.8,
        delay_ms: 6000,
    }
}
fn default_energetic() -> WanderParams {
    WanderParams {
        radius: 80.0,
        speed: 1.6,
        delay_ms: 2500,
    }
}
fn default_refined() -> WanderParams {
    WanderParams {
        radius: 35.0,
        speed: 0.6,
        delay_ms: 7000,
    }
}
fn default_scholarly() -> WanderParams {
    WanderParams {
        radius: 25.0,
        speed: 0.4,
        delay_ms: 9000,
    }
}
fn default_interaction_radius() -> f32 {
    60.0
}
fn default_thresholds() -> Vec<u64> {
    vec![0, 100, 300, 600, 1000]
}
fn default_initial_title() -> String {
    "Initiate".to_string()
}
fn default_speed() -> f32 {
    200.0
}
fn default_min_speed() -> f32 {
    50.0
}
fn default_max_speed() -> f32 {
    500.0
}
fn default_canvas_width() -> f32 {
    1024.0
}
fn default_canvas_height() -> f32 {
    768.0
}
fn default_margin() -> f32 {
    50.0
}
fn default_start_x() -> f32 {
    512.0
}
fn default_start_y() -> f32 {
    400.0
}
fn default_db_path() -> String {
    "guildhall_save.db".to_string()
}
fn default_save_key() -> String {
    "guildhall_quest_save".to_string()
}
fn default_save_version() -> String {
    "1.0.0".to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let config = QuestConfig::from_toml("").expect("parse");
        assert_eq!(config.inventory.max_slots, 20);
        assert_eq!(config.progression.xp_thresholds, vec![0, 100, 300, 600, 1000]);
        assert_eq!(config.persistence.save_version, "1.0.0");
        assert_eq!(config.dialogue.ms_per_char, 30);
    }

    #[test]
    fn partial_override() {
        let config = QuestConfig::from_toml(
            r#"
            [inventory]
            max_slots = 8

            [wandering.energetic]
            radius = 10.0
            speed = 2.0
            delay_ms = 100

            [persistence]
            backend = "memory"
            "#,
        )
        .expect("parse");
        assert_eq!(config.inventory.max_slots, 8);
        assert_eq!(config.inventory.max_stack, 99);
        assert_eq!(config.persistence.backend, StoreBackend::Memory);
        let energetic = config.wandering.params_for(PersonalityTrait::Energetic);
        assert!((energetic.radius - 10.0).abs() < f32::EPSILON);
        assert_eq!(config.wandering.params_for(PersonalityTrait::Wise), default_wise());
    }

    #[test]
    fn invalid_toml_is_config_error() {
        let err = QuestConfig::from_toml("[inventory]\nmax_slots = \"many\"").expect_err("invalid");
        assert!(matches!(err, crate::QuestError::Config(_)));
    }

    #[test]
    fn from_file_reads_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("guildhall.toml");
        std::fs::write(&path, "[dialogue]\nms_per_char = 5\n").expect("write");
        let config = QuestConfig::from_file(&path).expect("load");
        assert_eq!(config.dialogue.ms_per_char, 5);
    }
}
