//! Per-NPC wandering automaton.
//!
//! Two states, stepped once per animation tick:
//!
//! ```text
//!            now >= next_move && !frozen
//!   Idle ───────────────────────────────▶ Moving { target }
//!    ▲                                        │
//!    └──── dist(position, target) < ε ────────┘   next_move = now + delay
//! ```
//!
//! Targets always lie inside the disk of `radius` around home and motion is
//! a straight segment between points of that disk, so the position never
//! leaves it.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::WanderParams;
use crate::types::{GameTime, Position};

/// Automaton state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WanderPhase {
    /// Standing still until `next_move`.
    Idle,
    /// Walking towards `target`.
    Moving {
        /// Destination of the current leg.
        target: Position,
    },
}

/// Transition reported by [`Wanderer::step`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WanderTransition {
    /// Left `Idle` for a new target.
    Departed {
        /// Chosen destination.
        target: Position,
    },
    /// Reached the target and went idle.
    Arrived,
    /// A freeze deadline expired.
    Unfrozen,
}

/// Wandering state for one NPC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wanderer {
    home: Position,
    position: Position,
    params: WanderParams,
    phase: WanderPhase,
    next_move: GameTime,
    frozen_until: Option<GameTime>,
}

impl Wanderer {
    /// Create an idle wanderer standing at `home`; its first move is due one
    /// delay after `now`.
    #[must_use]
    pub fn new(home: Position, params: WanderParams, now: GameTime) -> Self {
        Self {
            home,
            position: home,
            params,
            phase: WanderPhase::Idle,
            next_move: now.after(params.delay_ms),
            frozen_until: None,
        }
    }

    /// Current position.
    #[must_use]
    pub fn position(&self) -> Position {
        self.position
    }

    /// Home position.
    #[must_use]
    pub fn home(&self) -> Position {
        self.home
    }

    /// Fixed wandering parameters.
    #[must_use]
    pub fn params(&self) -> WanderParams {
        self.params
    }

    /// Current automaton state.
    #[must_use]
    pub fn phase(&self) -> WanderPhase {
        self.phase
    }

    /// When the next idle→moving transition may fire.
    #[must_use]
    pub fn next_move(&self) -> GameTime {
        self.next_move
    }

    /// Whether transitions are suspended.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen_until.is_some()
    }

    /// Deadline of the active freeze, if any.
    #[must_use]
    pub fn frozen_until(&self) -> Option<GameTime> {
        self.frozen_until
    }

    /// Advance the automaton to `now`.
    ///
    /// While frozen nothing happens except the automatic unfreeze once the
    /// deadline has passed.
    pub fn step<R: Rng + ?Sized>(
        &mut self,
        now: GameTime,
        rng: &mut R,
        epsilon: f32,
        home_bias: f64,
    ) -> Option<WanderTransition> {
        if let Some(deadline) = self.frozen_until {
            if now >= deadline {
                self.unfreeze(now);
                return Some(WanderTransition::Unfrozen);
            }
            return None;
        }

        match self.phase {
            WanderPhase::Idle => {
                if now < self.next_move {
                    return None;
                }
                let target = self.pick_target(rng, home_bias);
                self.phase = WanderPhase::Moving { target };
                trace!(x = target.x, y = target.y, "wander departed");
                Some(WanderTransition::Departed { target })
            }
            WanderPhase::Moving { target } => {
                let dist = self.position.distance(&target);
                if dist < epsilon {
                    self.phase = WanderPhase::Idle;
                    self.next_move = now.after(self.params.delay_ms);
                    return Some(WanderTransition::Arrived);
                }
                let (dx, dy) = self.position.direction_to(&target);
                let step = self.params.speed.min(dist);
                self.position = self.position.offset(dx * step, dy * step);
                None
            }
        }
    }

    /// Cancel any motion and suspend transitions until `now + duration_ms`.
    ///
    /// A later call replaces the deadline of an earlier one.
    pub fn freeze(&mut self, now: GameTime, duration_ms: u64) {
        self.phase = WanderPhase::Idle;
        self.frozen_until = Some(now.after(duration_ms));
    }

    /// Lift a freeze and schedule the next move one delay after `now`.
    pub fn unfreeze(&mut self, now: GameTime) {
        self.frozen_until = None;
        self.next_move = now.after(self.params.delay_ms);
    }

    /// Put the wanderer back home, idle and unfrozen.
    pub fn reset(&mut self, now: GameTime) {
        self.position = self.home;
        self.phase = WanderPhase::Idle;
        self.frozen_until = None;
        self.next_move = now.after(self.params.delay_ms);
    }

    fn pick_target<R: Rng + ?Sized>(&self, rng: &mut R, home_bias: f64) -> Position {
        if rng.gen_bool(home_bias.clamp(0.0, 1.0)) {
            return self.home;
        }
        let radius = rng.gen_range(0.0..=self.params.radius.max(0.0));
        let angle = rng.gen_range(0.0..std::f32::consts::TAU);
        self.home.offset(radius * angle.cos(), radius * angle.sin())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
