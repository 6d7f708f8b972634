//! NPC registry.
//!
//! Owns every NPC record for the session: lock state, indicator bubble,
//! working timers and the [`Wanderer`] that owns the NPC's position.
//! Positions are only handed out as copies ([`NpcView`]); nothing outside
//! the registry holds a mutable reference across a tick.
//!
//! ## Sections
//!
//! - [`Npc`]: one record
//! - [`NpcRegistry`]: lookup, unlock, indicators, freeze, hit-testing, tick
//! - [`NpcNotice`]: timer-driven changes reported by [`NpcRegistry::update`]

pub mod roster;
pub mod wander;

use ordered_float::OrderedFloat;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{NpcConfig, WanderingConfig};
use crate::types::{GameTime, Indicator, NpcId, Position};

pub use roster::{NpcDefinition, Personality, guild_roster};
pub use wander::{WanderPhase, WanderTransition, Wanderer};

// ---------------------------------------------------------------------------
// Npc
// ---------------------------------------------------------------------------

/// A single NPC.
#[derive(Debug, Clone)]
pub struct Npc {
    definition: NpcDefinition,
    unlocked: bool,
    indicator: Indicator,
    indicator_reset_at: Option<GameTime>,
    working_until: Option<GameTime>,
    wanderer: Wanderer,
}

impl Npc {
    fn from_definition(definition: NpcDefinition, wandering: &WanderingConfig, now: GameTime) -> Self {
        let params = wandering.params_for(definition.personality.trait_kind);
        let wanderer = Wanderer::new(definition.home, params, now);
        Self {
            unlocked: definition.unlocked,
            indicator: Indicator::None,
            indicator_reset_at: None,
            working_until: None,
            wanderer,
            definition,
        }
    }

    /// Identifier.
    #[must_use]
    pub fn id(&self) -> &NpcId {
        &self.definition.id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// Display title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.definition.title
    }

    /// Default dialogue tree id.
    #[must_use]
    pub fn dialogue_tree(&self) -> &str {
        &self.definition.dialogue_tree
    }

    /// Personality and flavour text.
    #[must_use]
    pub fn personality(&self) -> &Personality {
        &self.definition.personality
    }

    /// Whether the player has unlocked this NPC.
    #[must_use]
    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    /// Current indicator bubble.
    #[must_use]
    pub fn indicator(&self) -> Indicator {
        self.indicator
    }

    /// Current position.
    #[must_use]
    pub fn position(&self) -> Position {
        self.wanderer.position()
    }

    /// Read-only access to the wandering automaton.
    #[must_use]
    pub fn wanderer(&self) -> &Wanderer {
        &self.wanderer
    }

    /// Copy of the state a renderer needs.
    #[must_use]
    pub fn view(&self) -> NpcView {
        NpcView {
            id: self.definition.id.clone(),
            name: self.definition.name.clone(),
            position: self.wanderer.position(),
            indicator: self.indicator,
            unlocked: self.unlocked,
            frozen: self.wanderer.is_frozen(),
        }
    }
}

/// Snapshot of one NPC for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpcView {
    /// Identifier.
    pub id: NpcId,
    /// Display name.
    pub name: String,
    /// Position at snapshot time.
    pub position: Position,
    /// Indicator bubble.
    pub indicator: Indicator,
    /// Lock state.
    pub unlocked: bool,
    /// Whether wandering is suspended.
    pub frozen: bool,
}

/// Timer-driven change reported by [`NpcRegistry::update`].
#[derive(Debug, Clone, PartialEq)]
pub enum NpcNotice {
    /// The post-unlock `talk` bubble timed out.
    IndicatorCleared {
        /// Affected NPC.
        npc: NpcId,
    },
    /// A working period ended.
    WorkFinished {
        /// Affected NPC.
        npc: NpcId,
        /// The NPC's success line.
        phrase: String,
    },
    /// A freeze expired on its own.
    Unfrozen {
        /// Affected NPC.
        npc: NpcId,
    },
}

// ---------------------------------------------------------------------------
// NpcRegistry
// ---------------------------------------------------------------------------

/// All NPCs of a session plus the shared wandering RNG.
#[derive(Debug)]
pub struct NpcRegistry {
    npcs: Vec<Npc>,
    definitions: Vec<NpcDefinition>,
    wandering: WanderingConfig,
    config: NpcConfig,
    rng: StdRng,
}

impl NpcRegistry {
    /// Build the registry from static definitions.
    ///
    /// `seed` makes wandering reproducible.
    #[must_use]
    pub fn new(
        definitions: Vec<NpcDefinition>,
        wandering: &WanderingConfig,
        config: &NpcConfig,
        seed: u64,
        now: GameTime,
    ) -> Self {
        let npcs = definitions
            .iter()
            .cloned()
            .map(|d| Npc::from_definition(d, wandering, now))
            .collect();
        Self {
            npcs,
            definitions,
            wandering: wandering.clone(),
            config: config.clone(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Look up an NPC.
    #[must_use]
    pub fn get(&self, id: &NpcId) -> Option<&Npc> {
        self.npcs.iter().find(|n| n.id() == id)
    }

    fn get_mut(&mut self, id: &NpcId) -> Option<&mut Npc> {
        self.npcs.iter_mut().find(|n| n.id() == id)
    }

    /// All NPCs in definition order.
    pub fn iter(&self) -> impl Iterator<Item = &Npc> {
        self.npcs.iter()
    }

    /// Ids of every registered NPC.
    #[must_use]
    pub fn ids(&self) -> Vec<NpcId> {
        self.npcs.iter().map(|n| n.id().clone()).collect()
    }

    /// NPCs the player has unlocked.
    #[must_use]
    pub fn unlocked(&self) -> Vec<&Npc> {
        self.npcs.iter().filter(|n| n.unlocked).collect()
    }

    /// Ids that start unlocked in a fresh game.
    #[must_use]
    pub fn initially_unlocked(&self) -> Vec<NpcId> {
        self.definitions
            .iter()
            .filter(|d| d.unlocked)
            .map(|d| d.id.clone())
            .collect()
    }

    /// Unlock an NPC and raise its `talk` bubble for a while.
    ///
    /// Returns `true` only when the NPC was locked before. Unknown ids are
    /// logged and ignored. Unlocking is never undone within a session.
    pub fn unlock(&mut self, id: &NpcId, now: GameTime) -> bool {
        let reset_ms = self.config.unlock_indicator_ms;
        let Some(npc) = self.get_mut(id) else {
            warn!(npc = %id, "unlock requested for unknown NPC");
            return false;
        };
        if npc.unlocked {
            return false;
        }
        npc.unlocked = true;
        npc.indicator = Indicator::Talk;
        npc.indicator_reset_at = Some(now.after(reset_ms));
        npc.wanderer.unfreeze(now);
        info!(npc = %id, "NPC unlocked");
        true
    }

    /// Mark NPCs unlocked without the indicator flourish (save restore).
    pub fn restore_unlocked<'a>(&mut self, ids: impl IntoIterator<Item = &'a NpcId>) {
        for id in ids {
            if let Some(npc) = self.get_mut(id) {
                npc.unlocked = true;
            } else {
                warn!(npc = %id, "save references unknown NPC");
            }
        }
    }

    /// Replace an NPC's indicator. Returns `false` for unknown ids.
    pub fn set_indicator(&mut self, id: &NpcId, indicator: Indicator) -> bool {
        let Some(npc) = self.get_mut(id) else {
            warn!(npc = %id, "indicator change for unknown NPC");
            return false;
        };
        npc.indicator = indicator;
        npc.indicator_reset_at = None;
        if indicator != Indicator::Working {
            npc.working_until = None;
        }
        debug!(npc = %id, %indicator, "indicator set");
        true
    }

    /// Show the NPC as busy for `duration_ms`, then report its success line.
    pub fn set_working(&mut self, id: &NpcId, duration_ms: u64, now: GameTime) -> bool {
        let Some(npc) = self.get_mut(id) else {
            warn!(npc = %id, "working state for unknown NPC");
            return false;
        };
        npc.indicator = Indicator::Working;
        npc.indicator_reset_at = None;
        npc.working_until = Some(now.after(duration_ms));
        true
    }

    /// Suspend an NPC's wandering for `duration_ms`. Last call wins.
    pub fn freeze(&mut self, id: &NpcId, duration_ms: u64, now: GameTime) -> bool {
        let Some(npc) = self.get_mut(id) else {
            warn!(npc = %id, "freeze requested for unknown NPC");
            return false;
        };
        npc.wanderer.freeze(now, duration_ms);
        debug!(npc = %id, duration_ms, "NPC frozen");
        true
    }

    /// Lift a freeze early.
    pub fn unfreeze(&mut self, id: &NpcId, now: GameTime) -> bool {
        let Some(npc) = self.get_mut(id) else {
            warn!(npc = %id, "unfreeze requested for unknown NPC");
            return false;
        };
        npc.wanderer.unfreeze(now);
        true
    }

    /// Nearest NPC (locked or not) within the interaction radius of `point`.
    #[must_use]
    pub fn hit_test(&self, point: Position) -> Option<&Npc> {
        let radius = self.config.interaction_radius;
        self.npcs
            .iter()
            .map(|n| (n, n.position().distance(&point)))
            .filter(|(_, d)| *d <= radius)
            .min_by_key(|(_, d)| OrderedFloat(*d))
            .map(|(n, _)| n)
    }

    /// Nearest unlocked NPC within the interaction radius of `point`.
    #[must_use]
    pub fn nearby(&self, point: Position) -> Option<&Npc> {
        let radius = self.config.interaction_radius;
        self.npcs
            .iter()
            .filter(|n| n.unlocked)
            .map(|n| (n, n.position().distance(&point)))
            .filter(|(_, d)| *d <= radius)
            .min_by_key(|(_, d)| OrderedFloat(*d))
            .map(|(n, _)| n)
    }

    /// Every NPC within `radius` of `center`, nearest first.
    #[must_use]
    pub fn in_radius(&self, center: Position, radius: f32) -> Vec<&Npc> {
        let mut hits: Vec<_> = self
            .npcs
            .iter()
            .map(|n| (n, n.position().distance(&center)))
            .filter(|(_, d)| *d <= radius)
            .collect();
        hits.sort_by_key(|(_, d)| OrderedFloat(*d));
        hits.into_iter().map(|(n, _)| n).collect()
    }

    /// Advance wandering and presentation timers to `now`.
    ///
    /// Locked NPCs stay put.
    pub fn update(&mut self, now: GameTime) -> Vec<NpcNotice> {
        let mut notices = Vec::new();
        let epsilon = self.wandering.epsilon;
        let home_bias = self.wandering.home_bias;
        for npc in &mut self.npcs {
            if npc.indicator_reset_at.is_some_and(|t| now >= t) {
                npc.indicator_reset_at = None;
                if npc.indicator == Indicator::Talk {
                    npc.indicator = Indicator::None;
                    notices.push(NpcNotice::IndicatorCleared { npc: npc.id().clone() });
                }
            }
            if npc.working_until.is_some_and(|t| now >= t) {
                npc.working_until = None;
                npc.indicator = Indicator::None;
                notices.push(NpcNotice::WorkFinished {
                    npc: npc.id().clone(),
                    phrase: npc.definition.personality.success_phrase.clone(),
                });
            }
            if !npc.unlocked {
                continue;
            }
            if let Some(WanderTransition::Unfrozen) =
                npc.wanderer.step(now, &mut self.rng, epsilon, home_bias)
            {
                notices.push(NpcNotice::Unfrozen { npc: npc.id().clone() });
            }
        }
        notices
    }

    /// Views of every NPC for the renderer.
    #[must_use]
    pub fn snapshot(&self) -> Vec<NpcView> {
        self.npcs.iter().map(Npc::view).collect()
    }

    /// Return every NPC to its initial definition: lock state, home position,
    /// no indicator, no timers.
    pub fn reset(&mut self, now: GameTime) {
        for (npc, def) in self.npcs.iter_mut().zip(&self.definitions) {
            npc.unlocked = def.unlocked;
            npc.indicator = Indicator::None;
            npc.indicator_reset_at = None;
            npc.working_until = None;
            npc.wanderer.reset(now);
        }
        debug!(count = self.npcs.len(), "NPC registry reset");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
