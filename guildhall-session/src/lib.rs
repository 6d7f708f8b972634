//! # guildhall-session: Quest Session Layer
//!
//! Sits on top of the component library in `guildhall-core` and is the only
//! place where several components are touched in one operation.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 host / UI                     │
//! │   clicks ──► hooks        frame ◄── FrameView │
//! │  ┌────────────────────────────────────────┐  │
//! │  │            QuestSession                │  │
//! │  │  delivery saga · finale · autosave     │  │
//! │  │        │ effects / events ▲            │  │
//! │  │        ▼                  │            │  │
//! │  │  ┌──────────────────────────────────┐  │  │
//! │  │  │          guildhall-core          │  │  │
//! │  │  │ npc · dialogue · inventory · ... │  │  │
//! │  │  └──────────────────────────────────┘  │  │
//! │  └────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `coordinator`: [`QuestSession`], the delivery saga and scripted finale
//! - `config`: [`SessionConfig`] and [`Difficulty`] profiles
//! - `events`: [`EngineEvent`]s drained by the UI each frame
//! - `systems`: per-tick system functions
//! - `schedule`: deadline queue for the finale and autosave timers
//! - `hooks`: click routing and the per-frame render snapshot
//! - `driver`: real-time `tokio` loop

#![deny(clippy::unwrap_used)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod coordinator;
pub mod driver;
pub mod events;
pub mod hooks;
pub mod schedule;
pub mod systems;

pub use config::{Difficulty, SessionConfig};
pub use coordinator::{DeliveryOutcome, FinalePhase, PendingDelivery, QuestSession};
pub use driver::{DriveStats, drive};
pub use events::{DeliveryRejection, EngineEvent};
pub use hooks::{ClickAction, FrameView, frame_view, on_click, route_click};
