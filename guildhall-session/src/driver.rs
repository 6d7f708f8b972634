//! Real-time driver.
//!
//! Pumps a [`QuestSession`] from a `tokio` interval until a shutdown future
//! resolves. Game time is the elapsed wall time since the driver started,
//! offset by `start`; the session itself never reads a clock.

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use guildhall_core::GameTime;

use crate::coordinator::QuestSession;
use crate::events::EngineEvent;

/// Counters reported when the driver stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveStats {
    /// Ticks run.
    pub ticks: u64,
    /// Game time of the last tick.
    pub last: GameTime,
}

/// Tick `session` every `period` until `shutdown` completes, handing each
/// frame's events to `on_frame`. Saves once on the way out.
pub async fn drive<F, H>(
    session: &mut QuestSession,
    start: GameTime,
    period: Duration,
    mut on_frame: H,
    shutdown: F,
) -> DriveStats
where
    F: Future<Output = ()>,
    H: FnMut(&QuestSession, Vec<EngineEvent>),
{
    let origin = Instant::now();
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    let mut stats = DriveStats { ticks: 0, last: start };
    info!(period_ms = period.as_millis(), "driver started");
    loop {
        tokio::select! {
            biased;
            () = &mut shutdown => {
                info!(ticks = stats.ticks, "driver shutting down");
                break;
            }
            tick = interval.tick() => {
                let elapsed = u64::try_from(tick.duration_since(origin).as_millis()).unwrap_or(u64::MAX);
                let now = start.after(elapsed);
                session.tick(now);
                stats.ticks += 1;
                stats.last = now;
                let events = session.drain_events();
                if !events.is_empty() {
                    debug!(count = events.len(), %now, "frame events");
                }
                on_frame(session, events);
            }
        }
    }
    session.save_now();
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use guildhall_core::persistence::MemoryStore;
    use guildhall_core::progression::SaveSlot;

    #[tokio::test(start_paused = true)]
    async fn stops_on_shutdown_and_saves() {
        let config = SessionConfig {
            seed: Some(1),
            ..SessionConfig::default()
        };
        let slot = SaveSlot::new(Box::new(MemoryStore::new()), "save", "1.0.0");
        let mut session = QuestSession::new(config, slot, GameTime::ZERO);
        let mut saved = false;
        let stats = drive(
            &mut session,
            GameTime::ZERO,
            Duration::from_millis(16),
            |_, _| {},
            tokio::time::sleep(Duration::from_millis(100)),
        )
        .await;
        for event in session.drain_events() {
            saved |= event == EngineEvent::Saved;
        }
        assert!(saved);
        assert!(stats.ticks >= 6);
        assert!(stats.last <= GameTime(100));
    }
}
