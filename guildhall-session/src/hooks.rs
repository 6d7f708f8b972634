//! Integration points with the host's renderer and input handling.
//!
//! The renderer reads a [`FrameView`] each frame; canvas clicks go through
//! [`on_click`], which decides between talking to an NPC and walking.

use serde::Serialize;

use guildhall_core::dialogue::ActiveDialogue;
use guildhall_core::movement::PlayerView;
use guildhall_core::npc::NpcView;
use guildhall_core::types::{GameTime, NpcId, Position};

use crate::coordinator::QuestSession;

/// What a click on the canvas means.
#[derive(Debug, Clone, PartialEq)]
pub enum ClickAction {
    /// Open a conversation.
    Interact(NpcId),
    /// A locked NPC was clicked.
    Discovered(NpcId),
    /// Walk to the point.
    MoveTo(Position),
    /// A modal panel is open; the click does nothing.
    Ignored,
}

/// Decide what a click at `point` means without changing anything.
///
/// NPCs win over movement when the click lands inside the interaction
/// radius, locked ones included.
#[must_use]
pub fn route_click(session: &QuestSession, point: Position) -> ClickAction {
    if session.dialogue().is_active() || session.is_inventory_open() {
        return ClickAction::Ignored;
    }
    match session.npcs().hit_test(point) {
        Some(npc) if npc.is_unlocked() => ClickAction::Interact(npc.id().clone()),
        Some(npc) => ClickAction::Discovered(npc.id().clone()),
        None => ClickAction::MoveTo(point),
    }
}

/// Route a click and apply it.
pub fn on_click(session: &mut QuestSession, point: Position, now: GameTime) -> ClickAction {
    let action = route_click(session, point);
    match &action {
        ClickAction::Interact(npc) | ClickAction::Discovered(npc) => {
            session.interact(npc, now);
        }
        ClickAction::MoveTo(target) => {
            session.move_player_to(*target, now);
        }
        ClickAction::Ignored => {}
    }
    action
}

/// Everything the renderer draws for one frame.
#[derive(Debug, Clone, Serialize)]
pub struct FrameView {
    /// NPC sprites.
    pub npcs: Vec<NpcView>,
    /// Player sprite.
    pub player: PlayerView,
    /// Dialogue box, when open.
    pub dialogue: Option<ActiveDialogue>,
    /// Whether the inventory panel is open.
    pub inventory_open: bool,
    /// NPC waiting for a delivery.
    pub delivery_for: Option<NpcId>,
}

/// Snapshot the session for rendering.
#[must_use]
pub fn frame_view(session: &QuestSession) -> FrameView {
    FrameView {
        npcs: session.npcs().snapshot(),
        player: session.player().view(),
        dialogue: session.active_dialogue().cloned(),
        inventory_open: session.is_inventory_open(),
        delivery_for: session.pending_delivery().map(|p| p.npc.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use guildhall_core::persistence::MemoryStore;
    use guildhall_core::progression::SaveSlot;

    fn session() -> QuestSession {
        let config = SessionConfig {
            seed: Some(5),
            ..SessionConfig::default()
        };
        let slot = SaveSlot::new(Box::new(MemoryStore::new()), "save", "1.0.0");
        QuestSession::new(config, slot, GameTime::ZERO)
    }

    fn position_of(session: &QuestSession, id: &str) -> Position {
        session
            .npcs()
            .get(&NpcId::new(id))
            .expect("npc")
            .position()
    }

    #[test]
    fn click_on_locked_npc_is_discovery() {
        let mut s = session();
        let at = position_of(&s, "critic");
        let action = on_click(&mut s, at, GameTime(0));
        assert_eq!(action, ClickAction::Discovered(NpcId::new("critic")));
        assert!(!s.dialogue().is_active());
    }

    #[test]
    fn click_on_guide_opens_dialogue_and_blocks_further_clicks() {
        let mut s = session();
        let at = position_of(&s, "elder_guide");
        let action = on_click(&mut s, at, GameTime(0));
        assert_eq!(action, ClickAction::Interact(NpcId::new("elder_guide")));
        assert!(s.dialogue().is_active());
        assert_eq!(route_click(&s, Position::new(5.0, 5.0)), ClickAction::Ignored);
        let frame = frame_view(&s);
        assert_eq!(frame.dialogue.expect("dialogue").npc, NpcId::new("elder_guide"));
    }

    #[test]
    fn empty_floor_click_walks() {
        let s = session();
        let far = Position::new(-10_000.0, -10_000.0);
        assert_eq!(route_click(&s, far), ClickAction::MoveTo(far));
    }
}
