//! The quest session: owns every core component and sequences work that
//! spans more than one of them.
//!
//! Components never call each other. The dialogue engine hands back
//! [`DialogueEffect`]s, the tracker hands back [`ProgressEvent`]s, and this
//! type applies them in order. Three sagas live here:
//!
//! - **Delivery.** An NPC requests an item, the inventory opens in delivery
//!   mode, and a matching item completes the hand-over: flags, dependent
//!   unlocks, reward item, objective, dialogue continuation.
//! - **Finale.** The final flag sends every NPC to work; after a fixed delay
//!   the last objective completes and the open world unlocks.
//! - **Persistence.** State is saved whenever the inventory or progress
//!   changed during an operation, and on a periodic autosave timer.

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use guildhall_core::dialogue::{
    ActiveDialogue, DialogueAction, DialogueEffect, DialogueEngine, DialogueTable, TreeIssue,
};
use guildhall_core::error::Result;
use guildhall_core::inventory::{
    GiveReceipt, InventoryStore, ItemCatalog, RemoveError, RemoveOutcome, SortMode, UseError,
    UseOutcome,
};
use guildhall_core::movement::PlayerMovement;
use guildhall_core::npc::{NpcRegistry, guild_roster};
use guildhall_core::progression::tracker::OPEN_WORLD_FLAG;
use guildhall_core::progression::{LoadOutcome, ProgressEvent, ProgressTracker, Quest, SaveSlot};
use guildhall_core::types::{GameTime, Indicator, ItemId, NpcId, ObjectiveId, Position};

use crate::config::SessionConfig;
use crate::events::{DeliveryRejection, EngineEvent};
use crate::schedule::{Schedule, ScheduledTask};
use crate::systems;

// ---------------------------------------------------------------------------
// Saga tables
// ---------------------------------------------------------------------------

/// Flag that starts the finale.
pub const SYNC_FLAG: &str = "synchronization_complete";

/// Objective the finale completes.
pub const FINAL_OBJECTIVE: &str = "return_to_guide";

/// Flag set when each key item reaches its NPC.
const DELIVERY_FLAGS: &[(&str, &str)] = &[
    ("primordial_code", "librarian_activated"),
    ("activation_key_alpha", "scribe_activated"),
    ("execution_core_beta", "artisan_activated"),
    ("optimization_module_gamma", "critic_activated"),
    ("synchronization_protocol_omega", SYNC_FLAG),
];

/// NPC unlocked when a delivery flag is set.
const DEPENDENT_UNLOCKS: &[(&str, &str)] = &[
    ("librarian_activated", "requirements_scribe"),
    ("scribe_activated", "artisan"),
    ("artisan_activated", "critic"),
];

fn delivery_flag(item: &ItemId) -> Option<&'static str> {
    DELIVERY_FLAGS
        .iter()
        .find(|(i, _)| item == i)
        .map(|(_, flag)| *flag)
}

fn dependent_unlock(flag: &str) -> Option<NpcId> {
    DEPENDENT_UNLOCKS
        .iter()
        .find(|(f, _)| *f == flag)
        .map(|(_, npc)| NpcId::new(*npc))
}

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// The single outstanding item request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDelivery {
    /// NPC waiting.
    pub npc: NpcId,
    /// Item it wants.
    pub item: ItemId,
}

/// Result of [`QuestSession::attempt_item_delivery`].
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryOutcome {
    /// The hand-over went through.
    Delivered(GiveReceipt),
    /// Nothing changed.
    Rejected(DeliveryRejection),
}

impl DeliveryOutcome {
    /// Whether the item was handed over.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Delivered(_))
    }
}

/// Where the finale stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FinalePhase {
    /// Not triggered.
    #[default]
    Idle,
    /// NPCs are working; completion is scheduled.
    Running,
    /// Finished.
    Done,
}

// ---------------------------------------------------------------------------
// QuestSession
// ---------------------------------------------------------------------------

/// One player's game.
#[derive(Debug)]
pub struct QuestSession {
    config: SessionConfig,
    npcs: NpcRegistry,
    player: PlayerMovement,
    dialogue: DialogueEngine,
    inventory: InventoryStore,
    progress: ProgressTracker,
    slot: SaveSlot,
    schedule: Schedule,
    pending: Option<PendingDelivery>,
    inventory_open: bool,
    finale: FinalePhase,
    events: Vec<EngineEvent>,
    saved_revisions: (u64, u64),
}

impl QuestSession {
    /// Assemble a session with the bundled dialogue trees and item catalog.
    ///
    /// The session starts as a fresh game; call
    /// [`QuestSession::load_or_initialize`] to pick up a save.
    #[must_use]
    pub fn new(config: SessionConfig, slot: SaveSlot, now: GameTime) -> Self {
        let quest = &config.quest;
        let npcs = NpcRegistry::new(
            guild_roster(),
            &quest.wandering,
            &quest.npc,
            config.resolved_seed(),
            now,
        );
        let mut session = Self {
            npcs,
            player: PlayerMovement::new(&quest.movement),
            dialogue: DialogueEngine::new(DialogueTable::bundled(), quest.dialogue.clone()),
            inventory: InventoryStore::new(ItemCatalog::standard(), &quest.inventory),
            progress: ProgressTracker::new(&quest.progression, Quest::standard()),
            slot,
            schedule: Schedule::new(),
            pending: None,
            inventory_open: false,
            finale: FinalePhase::Idle,
            events: Vec::new(),
            saved_revisions: (0, 0),
            config,
        };
        session.reset_state(now);
        session
    }

    /// Open the configured save store and assemble a session on it.
    ///
    /// # Errors
    /// Store open failures.
    pub fn from_config(config: SessionConfig, now: GameTime) -> Result<Self> {
        let slot = SaveSlot::from_config(&config.quest.persistence)?;
        Ok(Self::new(config, slot, now))
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Session configuration.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// NPC registry.
    #[must_use]
    pub fn npcs(&self) -> &NpcRegistry {
        &self.npcs
    }

    /// Player movement.
    #[must_use]
    pub fn player(&self) -> &PlayerMovement {
        &self.player
    }

    /// Dialogue engine.
    #[must_use]
    pub fn dialogue(&self) -> &DialogueEngine {
        &self.dialogue
    }

    /// Open conversation, if any.
    #[must_use]
    pub fn active_dialogue(&self) -> Option<&ActiveDialogue> {
        self.dialogue.active()
    }

    /// Inventory.
    #[must_use]
    pub fn inventory(&self) -> &InventoryStore {
        &self.inventory
    }

    /// Progress tracker.
    #[must_use]
    pub fn progress(&self) -> &ProgressTracker {
        &self.progress
    }

    /// Outstanding item request.
    #[must_use]
    pub fn pending_delivery(&self) -> Option<&PendingDelivery> {
        self.pending.as_ref()
    }

    /// Whether the inventory panel is open.
    #[must_use]
    pub fn is_inventory_open(&self) -> bool {
        self.inventory_open
    }

    /// Finale state.
    #[must_use]
    pub fn finale_phase(&self) -> FinalePhase {
        self.finale
    }

    /// Earliest session timer deadline.
    #[must_use]
    pub fn next_scheduled(&self) -> Option<GameTime> {
        self.schedule.next_due()
    }

    /// Take every queued event.
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Restore the stored save, or start fresh if there is none usable.
    ///
    /// Returns `true` when a save was loaded.
    pub fn load_or_initialize(&mut self, now: GameTime) -> bool {
        self.reset_state(now);
        let save = match self.slot.read() {
            LoadOutcome::Loaded(save) => save,
            LoadOutcome::Missing => {
                info!("no save found, starting a new game");
                return false;
            }
            LoadOutcome::Corrupt(reason) => {
                self.events.push(EngineEvent::SaveDiscarded { reason });
                return false;
            }
            LoadOutcome::VersionMismatch { found } => {
                self.events.push(EngineEvent::SaveDiscarded {
                    reason: format!("save version {found} is not {}", self.slot.version()),
                });
                return false;
            }
        };

        self.progress.restore(&save);
        self.inventory.restore(save.player.inventory.clone());
        let unlocked: BTreeSet<NpcId> = self
            .progress
            .unlocked_npcs()
            .into_iter()
            .chain(self.npcs.initially_unlocked())
            .collect();
        self.npcs.restore_unlocked(&unlocked);
        for npc in &unlocked {
            self.progress.mark_npc_unlocked(npc);
        }
        self.player.teleport(save.player.position);
        self.arm_autosave(now);

        if self.progress.has_flag(OPEN_WORLD_FLAG) {
            self.finale = FinalePhase::Done;
        } else if self.progress.has_flag(SYNC_FLAG) {
            self.start_finale(now);
        }
        self.mark_saved();
        info!(
            level = self.progress.level(),
            items = self.inventory.used_slots(),
            unlocked = unlocked.len(),
            "save loaded"
        );
        true
    }

    /// Throw away all progress, start over and save.
    pub fn start_new_quest(&mut self, now: GameTime) {
        self.reset_state(now);
        self.slot.clear();
        info!("new quest started");
        self.save_now();
    }

    fn reset_state(&mut self, now: GameTime) {
        self.dialogue.close();
        self.dialogue.clear_history();
        self.npcs.reset(now);
        self.inventory.reset();
        self.progress.reset();
        for npc in self.npcs.initially_unlocked() {
            self.progress.mark_npc_unlocked(&npc);
        }
        self.player = PlayerMovement::new(&self.config.quest.movement);
        self.schedule.clear();
        self.pending = None;
        self.inventory_open = false;
        self.finale = FinalePhase::Idle;
        self.events.clear();
        self.arm_autosave(now);
        self.mark_saved();
    }

    /// Restart the autosave timer from `from`.
    fn arm_autosave(&mut self, from: GameTime) {
        self.schedule.cancel(ScheduledTask::Autosave);
        let interval = self.config.quest.persistence.autosave_interval_ms;
        if interval > 0 {
            self.schedule.schedule(from.after(interval), ScheduledTask::Autosave);
        }
    }

    /// Write the current state. Returns whether the write succeeded.
    pub fn save_now(&mut self) -> bool {
        let state = self.progress.to_save(
            self.slot.version(),
            self.player.position(),
            self.inventory.snapshot(),
        );
        let ok = self.slot.write(&state);
        if ok {
            self.mark_saved();
            self.events.push(EngineEvent::Saved);
        }
        ok
    }

    fn mark_saved(&mut self) {
        self.saved_revisions = (self.inventory.revision(), self.progress.revision());
    }

    fn persist_if_changed(&mut self) {
        if (self.inventory.revision(), self.progress.revision()) != self.saved_revisions {
            self.save_now();
        }
    }

    // ------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------

    /// Advance every timer to `now`.
    pub fn tick(&mut self, now: GameTime) {
        systems::run_player_movement(&mut self.player, now);
        let npc_events = systems::run_wandering(&mut self.npcs, now);
        self.events.extend(npc_events);

        let effects = systems::run_dialogue_timers(&mut self.dialogue, now);
        self.apply_effects(effects, now);

        for (due, task) in systems::run_scheduler(&mut self.schedule, now) {
            match task {
                ScheduledTask::Finale => self.complete_finale(),
                ScheduledTask::Autosave => {
                    debug!(%due, "autosave");
                    self.save_now();
                    if !self.schedule.is_scheduled(ScheduledTask::Autosave) {
                        let interval = self.config.quest.persistence.autosave_interval_ms;
                        self.schedule.schedule(due.after(interval).max(now.after(1)), ScheduledTask::Autosave);
                    }
                }
            }
        }
        self.persist_if_changed();
    }

    // ------------------------------------------------------------------
    // Dialogue
    // ------------------------------------------------------------------

    /// Talk to an NPC.
    ///
    /// Locked NPCs only produce [`EngineEvent::NpcDiscovered`]. Returns
    /// whether a conversation opened.
    pub fn interact(&mut self, npc_id: &NpcId, now: GameTime) -> bool {
        let Some(npc) = self.npcs.get(npc_id) else {
            warn!(npc = %npc_id, "interaction with unknown NPC");
            return false;
        };
        if !npc.is_unlocked() {
            debug!(npc = %npc_id, "locked NPC clicked");
            self.events.push(EngineEvent::NpcDiscovered { npc: npc_id.clone() });
            return false;
        }

        let effects = self.dialogue.start(npc, &self.progress, now);
        let opened = effects
            .iter()
            .any(|e| matches!(e, DialogueEffect::Started { .. }));
        if opened {
            let progress = self.progress.on_npc_interaction(npc_id);
            self.absorb(progress);
        }
        self.apply_effects(effects, now);
        self.persist_if_changed();
        opened
    }

    /// Pick a dialogue option.
    pub fn choose(&mut self, option_id: &str, now: GameTime) {
        let effects = self.dialogue.choose(option_id, now);
        self.apply_effects(effects, now);
        self.persist_if_changed();
    }

    /// Finish the current text reveal early, when the difficulty allows it.
    /// Returns whether the skip was honoured.
    pub fn skip_reveal(&mut self, now: GameTime) -> bool {
        if !self.config.difficulty.skip_enabled() {
            return false;
        }
        self.dialogue.skip_reveal(now);
        true
    }

    /// Close the conversation.
    pub fn close_dialogue(&mut self, now: GameTime) {
        let effects = self.dialogue.close();
        self.apply_effects(effects, now);
    }

    /// Swap the dialogue tree table. The open conversation continues by id.
    ///
    /// Returns whatever [`DialogueTable::validate`] found; the table is
    /// installed regardless.
    pub fn replace_dialogue_table(&mut self, table: DialogueTable) -> Vec<TreeIssue> {
        let issues = table.validate();
        if !issues.is_empty() {
            warn!(count = issues.len(), "installed dialogue table has issues");
        }
        self.dialogue.replace_table(table);
        issues
    }

    fn apply_effects(&mut self, effects: Vec<DialogueEffect>, now: GameTime) {
        for effect in effects {
            match effect {
                DialogueEffect::Started { npc, tree } => {
                    self.npcs.freeze(&npc, self.config.dialogue_freeze_ms, now);
                    self.events.push(EngineEvent::DialogueStarted { npc, tree });
                }
                DialogueEffect::NodeEntered { npc, node, .. } => {
                    self.progress.record_dialogue_node(&npc, &node);
                }
                DialogueEffect::Action { npc, action } => self.apply_action(&npc, action, now),
                DialogueEffect::GrantXp { amount } => {
                    let scaled = self.config.difficulty.scale_xp(amount);
                    let events = self.progress.grant_xp(scaled);
                    self.absorb(events);
                }
                DialogueEffect::SetFlag { flag } => self.apply_flag(&flag, true, now),
                DialogueEffect::Closed { npc } => {
                    self.npcs.unfreeze(&npc, now);
                    self.events.push(EngineEvent::DialogueClosed { npc });
                }
            }
        }
    }

    fn apply_action(&mut self, speaker: &NpcId, action: DialogueAction, now: GameTime) {
        debug!(npc = %speaker, ?action, "dialogue action");
        match action {
            DialogueAction::UnlockNpc { target } => {
                self.apply_unlock(&target, now);
            }
            DialogueAction::GiveItem { item } => {
                self.receive_item_from_npc(&item, Some(speaker));
            }
            DialogueAction::RequestItem { item, npc } => self.request_item_for_npc(&item, &npc),
            DialogueAction::CompleteObjective { objective } => self.apply_objective(&objective),
            DialogueAction::StartScriptedSequence => {
                self.npcs.set_working(speaker, self.config.creation_work_ms, now);
                self.events.push(EngineEvent::ScriptedSequenceStarted { npc: speaker.clone() });
            }
            DialogueAction::SetFlag { flag, value } => self.apply_flag(&flag, value, now),
        }
    }

    // ------------------------------------------------------------------
    // Progress
    // ------------------------------------------------------------------

    /// Unlock an NPC and save. Returns `true` the first time.
    pub fn unlock_npc(&mut self, npc: &NpcId, now: GameTime) -> bool {
        let unlocked = self.apply_unlock(npc, now);
        self.persist_if_changed();
        unlocked
    }

    /// Mark an objective complete and save.
    pub fn complete_objective(&mut self, id: &ObjectiveId) {
        self.apply_objective(id);
        self.persist_if_changed();
    }

    /// Set a flag and save; setting [`SYNC_FLAG`] starts the finale.
    pub fn set_flag(&mut self, flag: &str, value: bool, now: GameTime) {
        self.apply_flag(flag, value, now);
        self.persist_if_changed();
    }

    fn apply_unlock(&mut self, npc: &NpcId, now: GameTime) -> bool {
        if !self.npcs.unlock(npc, now) {
            return false;
        }
        self.progress.mark_npc_unlocked(npc);
        self.events.push(EngineEvent::NpcUnlocked { npc: npc.clone() });
        true
    }

    fn apply_objective(&mut self, id: &ObjectiveId) {
        let events = self.progress.complete_objective(id);
        self.absorb(events);
    }

    fn apply_flag(&mut self, flag: &str, value: bool, now: GameTime) {
        if !self.progress.set_flag(flag, value) {
            return;
        }
        if value {
            self.events.push(EngineEvent::FlagSet { flag: flag.to_string() });
            if flag == SYNC_FLAG {
                self.start_finale(now);
            }
        }
    }

    fn absorb(&mut self, events: Vec<ProgressEvent>) {
        self.events.extend(events.into_iter().map(EngineEvent::from));
    }

    // ------------------------------------------------------------------
    // Inventory and delivery
    // ------------------------------------------------------------------

    /// Expect `item` for `npc` and open the inventory in delivery mode.
    pub fn request_item_for_npc(&mut self, item: &ItemId, npc: &NpcId) {
        info!(item = %item, npc = %npc, "item requested");
        self.pending = Some(PendingDelivery {
            npc: npc.clone(),
            item: item.clone(),
        });
        self.inventory_open = true;
        self.inventory.select(item);
        self.events.push(EngineEvent::InventoryOpened {
            delivery_for: Some(npc.clone()),
        });
    }

    /// Offer `item` to the NPC waiting for one.
    ///
    /// A mismatched item, a missing request or an inventory refusal changes
    /// nothing. A match runs the whole hand-over and closes the inventory.
    pub fn attempt_item_delivery(&mut self, item: &ItemId, now: GameTime) -> DeliveryOutcome {
        let Some(pending) = self.pending.clone() else {
            debug!(item = %item, "delivery attempted with no pending request");
            return DeliveryOutcome::Rejected(DeliveryRejection::NoPendingRequest);
        };
        if &pending.item != item {
            warn!(offered = %item, expected = %pending.item, npc = %pending.npc, "wrong item offered");
            return self.reject(
                item,
                &pending.npc,
                DeliveryRejection::WrongItem {
                    expected: pending.item,
                    offered: item.clone(),
                },
            );
        }
        let receipt = match self.inventory.give_item_to_npc(item, &pending.npc) {
            Ok(receipt) => receipt,
            Err(e) => {
                warn!(item = %item, npc = %pending.npc, error = %e, "inventory refused delivery");
                return self.reject(item, &pending.npc, DeliveryRejection::Refused(e));
            }
        };
        let npc = pending.npc;
        info!(item = %item, npc = %npc, reward = ?receipt.reward.as_ref().map(|r| &r.id), "item delivered");
        self.events.push(EngineEvent::ItemDelivered {
            item: item.clone(),
            npc: npc.clone(),
            reward: receipt.reward.as_ref().map(|r| r.id.clone()),
        });

        if let Some(flag) = delivery_flag(item) {
            self.apply_flag(flag, true, now);
            if let Some(dependent) = dependent_unlock(flag) {
                self.apply_unlock(&dependent, now);
            }
        }
        if let Some(reward) = &receipt.reward {
            self.events.push(EngineEvent::ItemReceived {
                item: reward.id.clone(),
                from: Some(npc.clone()),
            });
            let unlocks: Vec<NpcId> = reward.npc_unlocks().collect();
            for target in unlocks {
                self.apply_unlock(&target, now);
            }
        }
        let completed = self.progress.complete_current_targeting(npc.as_str());
        self.absorb(completed);

        let effects = self.dialogue.trigger_item_received(&npc, now);
        self.apply_effects(effects, now);
        self.pending = None;
        self.close_inventory();
        self.persist_if_changed();
        DeliveryOutcome::Delivered(receipt)
    }

    fn reject(&mut self, item: &ItemId, npc: &NpcId, reason: DeliveryRejection) -> DeliveryOutcome {
        self.events.push(EngineEvent::DeliveryRejected {
            item: item.clone(),
            npc: Some(npc.clone()),
            reason: reason.clone(),
        });
        DeliveryOutcome::Rejected(reason)
    }

    /// Add an item handed over by an NPC (or by the game when `from` is
    /// `None`) and complete any open objective about it.
    pub fn receive_item_from_npc(&mut self, item: &ItemId, from: Option<&NpcId>) -> bool {
        match self.inventory.add_item(item, from) {
            Ok(outcome) => {
                info!(item = %item, from = ?from.map(NpcId::as_str), ?outcome, "item received");
                self.events.push(EngineEvent::ItemReceived {
                    item: item.clone(),
                    from: from.cloned(),
                });
                let events = self.progress.complete_open_targeting(item.as_str());
                self.absorb(events);
                self.persist_if_changed();
                true
            }
            Err(e) => {
                warn!(item = %item, error = %e, "item not received");
                false
            }
        }
    }

    /// Open the inventory for browsing.
    pub fn open_inventory(&mut self) {
        if !self.inventory_open {
            self.inventory_open = true;
            self.events.push(EngineEvent::InventoryOpened { delivery_for: None });
        }
    }

    /// Close the inventory; any pending request is dropped.
    pub fn close_inventory(&mut self) {
        self.pending = None;
        self.inventory.clear_selection();
        if self.inventory_open {
            self.inventory_open = false;
            self.events.push(EngineEvent::InventoryClosed);
        }
    }

    /// Use a consumable.
    ///
    /// # Errors
    /// [`UseError`] from the inventory.
    pub fn use_item(&mut self, item: &ItemId) -> std::result::Result<UseOutcome, UseError> {
        let outcome = self.inventory.use_item(item)?;
        self.persist_if_changed();
        Ok(outcome)
    }

    /// Destroy `quantity` of an item.
    ///
    /// # Errors
    /// [`RemoveError`] from the inventory.
    pub fn remove_item(&mut self, item: &ItemId, quantity: u32) -> std::result::Result<RemoveOutcome, RemoveError> {
        let outcome = self.inventory.remove_item(item, quantity)?;
        self.persist_if_changed();
        Ok(outcome)
    }

    /// Reorder the inventory.
    pub fn sort_inventory(&mut self, mode: SortMode) {
        self.inventory.sort(mode);
    }

    /// Clear an item's "new" marker.
    pub fn mark_item_seen(&mut self, item: &ItemId) -> bool {
        let seen = self.inventory.mark_seen(item);
        self.persist_if_changed();
        seen
    }

    // ------------------------------------------------------------------
    // Movement
    // ------------------------------------------------------------------

    /// Walk the player towards `target`. Returns the clamped destination.
    pub fn move_player_to(&mut self, target: Position, now: GameTime) -> Position {
        self.player.move_to(target, now)
    }

    /// Apply a canvas resize.
    pub fn resize(&mut self, width: f32, height: f32) {
        let margin = self.config.quest.movement.margin;
        self.player.update_bounds(width, height, margin);
    }

    // ------------------------------------------------------------------
    // Finale
    // ------------------------------------------------------------------

    /// Send every NPC to work and schedule the finale. Runs at most once.
    pub fn start_finale(&mut self, now: GameTime) {
        if self.finale != FinalePhase::Idle {
            return;
        }
        self.finale = FinalePhase::Running;
        let delay = self.config.finale_delay_ms;
        for npc in self.npcs.ids() {
            self.npcs.set_working(&npc, delay, now);
        }
        self.schedule
            .schedule(now.after(delay), ScheduledTask::Finale);
        info!(delay_ms = delay, "finale started");
        self.events.push(EngineEvent::FinaleStarted);
    }

    fn complete_finale(&mut self) {
        if self.finale != FinalePhase::Running {
            return;
        }
        self.finale = FinalePhase::Done;
        self.apply_objective(&ObjectiveId::new(FINAL_OBJECTIVE));
        for flag in [OPEN_WORLD_FLAG, SYNC_FLAG] {
            if self.progress.set_flag(flag, true) {
                self.events.push(EngineEvent::FlagSet { flag: flag.to_string() });
            }
        }
        let xp = self.config.difficulty.scale_xp_u64(self.config.finale_xp);
        let events = self.progress.grant_xp(xp);
        self.absorb(events);
        for npc in self.npcs.ids() {
            self.npcs.set_indicator(&npc, Indicator::None);
        }
        info!(xp = self.progress.xp(), level = self.progress.level(), "finale completed");
        self.events.push(EngineEvent::FinaleCompleted);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
