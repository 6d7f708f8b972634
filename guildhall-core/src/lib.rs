//! # Guildhall Core Library
//!
//! Game-agnostic state engine for a small guild-hall adventure: a handful of
//! NPCs drift around a shared hall, talk through branching dialogue trees,
//! trade key items with the player and advance a single quest.
//!
//! The crate is organised as independent components that never call each
//! other. Cross-component sequencing lives one layer up (see the
//! `guildhall-session` crate), which consumes the effect values these
//! components return.
//!
//! - [`npc`]: NPC registry, unlock state and the per-NPC wandering automaton
//! - [`movement`]: player position and eased path interpolation
//! - [`dialogue`]: dialogue trees, the bundled tree table and the engine
//! - [`inventory`]: item catalog, slot/stack accounting, transaction log
//! - [`progression`]: quest objectives, XP/levels, flags, save snapshots
//! - [`persistence`]: key→blob save stores (in-memory and `SQLite`)
//!
//! ## Time
//!
//! Every time-dependent operation takes an explicit [`GameTime`] (milliseconds
//! on a monotonic clock supplied by the host). Nothing in this crate reads the
//! wall clock except audit timestamps.

#![deny(clippy::unwrap_used)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod dialogue;
pub mod error;
pub mod inventory;
pub mod movement;
pub mod npc;
pub mod persistence;
pub mod progression;
pub mod types;

pub use config::QuestConfig;
pub use error::QuestError;
pub use types::*;
