//! Per-tick systems.
//!
//! Standalone functions the session runs in a fixed order each tick:
//!
//! | System            | Input            | Output                  |
//! |-------------------|------------------|-------------------------|
//! | Player movement   | path, `now`      | new player position     |
//! | NPC wandering     | registry, `now`  | [`EngineEvent`]s        |
//! | Dialogue timers   | engine, `now`    | [`DialogueEffect`]s     |
//! | Scheduler         | schedule, `now`  | due [`ScheduledTask`]s  |
//!
//! None of them reach across components; the session applies what they
//! return.

use tracing::debug;

use guildhall_core::GameTime;
use guildhall_core::dialogue::{DialogueEffect, DialogueEngine};
use guildhall_core::movement::PlayerMovement;
use guildhall_core::npc::{NpcNotice, NpcRegistry};

use crate::events::EngineEvent;
use crate::schedule::{Schedule, ScheduledTask};

/// Advance the player along its current path.
pub fn run_player_movement(player: &mut PlayerMovement, now: GameTime) {
    player.update(now);
}

/// Step every NPC's wandering and presentation timers.
pub fn run_wandering(npcs: &mut NpcRegistry, now: GameTime) -> Vec<EngineEvent> {
    npcs.update(now)
        .into_iter()
        .filter_map(|notice| match notice {
            NpcNotice::WorkFinished { npc, phrase } => Some(EngineEvent::WorkFinished { npc, phrase }),
            NpcNotice::IndicatorCleared { npc } | NpcNotice::Unfrozen { npc } => {
                debug!(npc = %npc, "npc timer expired");
                None
            }
        })
        .collect()
}

/// Fire due dialogue reveal, advance and close timers.
pub fn run_dialogue_timers(dialogue: &mut DialogueEngine, now: GameTime) -> Vec<DialogueEffect> {
    dialogue.update(now)
}

/// Pop every session task due by `now`.
pub fn run_scheduler(schedule: &mut Schedule, now: GameTime) -> Vec<(GameTime, ScheduledTask)> {
    schedule.pop_due(now)
}
