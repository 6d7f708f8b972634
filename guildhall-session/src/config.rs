//! Session-level configuration: difficulty profiles and saga timings on top
//! of the core [`QuestConfig`].

use serde::{Deserialize, Serialize};

use guildhall_core::QuestConfig;
use guildhall_core::error::{QuestError, Result};

// ---------------------------------------------------------------------------
// Difficulty
// ---------------------------------------------------------------------------

/// Difficulty profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    /// More XP, hints, skippable text.
    Easy,
    /// Baseline.
    #[default]
    Normal,
    /// Less XP, no hints.
    Hard,
}

impl Difficulty {
    /// Factor applied to XP from dialogue and the finale.
    #[must_use]
    pub fn xp_multiplier(self) -> f64 {
        match self {
            Self::Easy => 1.5,
            Self::Normal => 1.0,
            Self::Hard => 0.8,
        }
    }

    /// Whether the UI should show hints.
    #[must_use]
    pub fn hints_enabled(self) -> bool {
        !matches!(self, Self::Hard)
    }

    /// Whether text reveals may be skipped.
    #[must_use]
    pub fn skip_enabled(self) -> bool {
        matches!(self, Self::Easy)
    }

    /// Scale `amount` by [`Difficulty::xp_multiplier`], rounding to nearest.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn scale_xp(self, amount: u32) -> u64 {
        (f64::from(amount) * self.xp_multiplier()).round() as u64
    }

    /// Scale a large XP amount.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn scale_xp_u64(self, amount: u64) -> u64 {
        (amount as f64 * self.xp_multiplier()).round() as u64
    }
}

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Everything a [`crate::QuestSession`] needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Core component tuning.
    #[serde(default)]
    pub quest: QuestConfig,
    /// Difficulty profile.
    #[serde(default)]
    pub difficulty: Difficulty,
    /// Delay between the final delivery and the finale completing.
    #[serde(default = "default_finale_delay_ms")]
    pub finale_delay_ms: u64,
    /// XP granted when the finale completes, before difficulty scaling.
    #[serde(default = "default_finale_xp")]
    pub finale_xp: u64,
    /// How long an NPC stays put once a conversation starts.
    #[serde(default = "default_dialogue_freeze_ms")]
    pub dialogue_freeze_ms: u64,
    /// Length of a scripted work sequence.
    #[serde(default = "default_creation_work_ms")]
    pub creation_work_ms: u64,
    /// Seed for NPC wandering; `None` picks one from the clock.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            quest: QuestConfig::default(),
            difficulty: Difficulty::default(),
            finale_delay_ms: default_finale_delay_ms(),
            finale_xp: default_finale_xp(),
            dialogue_freeze_ms: default_dialogue_freeze_ms(),
            creation_work_ms: default_creation_work_ms(),
            seed: None,
        }
    }
}

impl SessionConfig {
    /// Config for a difficulty with stock tuning otherwise.
    #[must_use]
    pub fn for_difficulty(difficulty: Difficulty) -> Self {
        Self {
            difficulty,
            ..Self::default()
        }
    }

    /// Parse from TOML. Core sections sit under `[quest.*]`.
    ///
    /// # Errors
    /// [`QuestError::Config`] on invalid TOML.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| QuestError::Config(e.to_string()))
    }

    /// Read and parse a TOML file.
    ///
    /// # Errors
    /// I/O or parse failures.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// The wandering seed, drawn from the clock when unset.
    #[must_use]
    pub fn resolved_seed(&self) -> u64 {
        self.seed.unwrap_or_else(|| {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map_or(0, |d| d.as_secs() ^ u64::from(d.subsec_nanos()))
        })
    }
}

fn default_finale_delay_ms() -> u64 {
    3000
}
fn default_finale_xp() -> u64 {
    1000
}
fn default_dialogue_freeze_ms() -> u64 {
    30_000
}
fn default_creation_work_ms() -> u64 {
    3000
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
