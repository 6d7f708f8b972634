//! Slot-accounted inventory store with an audit log.
//!
//! Every operation validates first and mutates second; a rejected call leaves
//! the store untouched. Each mutation appends an [`ItemTransaction`] to a
//! bounded log (oldest entries evicted) and bumps [`InventoryStore::revision`].

use std::cmp::Reverse;
use std::collections::{BTreeSet, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{InventoryItem, ItemCatalog, ItemType};
use crate::config::InventoryConfig;
use crate::types::{ItemId, NpcId};

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

/// What happened to an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// A new instance entered the bag.
    Receive,
    /// Quantity merged into an existing stack.
    Stack,
    /// Handed to an NPC.
    Give,
    /// Used (consumables).
    Use,
    /// Removed for good.
    Destroy,
}

/// One audit-log entry. Never replayed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemTransaction {
    /// Unique id.
    pub id: String,
    /// Wall-clock time of the change.
    pub timestamp: DateTime<Utc>,
    /// Kind of change.
    pub kind: TransactionKind,
    /// Item affected.
    pub item: ItemId,
    /// Quantity moved.
    pub quantity: u32,
    /// Source party.
    pub from: Option<String>,
    /// Destination party.
    pub to: Option<String>,
    /// Free-form note.
    pub reason: String,
}

const PLAYER: &str = "player";

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Successful [`InventoryStore::add_item`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// Took a new slot.
    Added,
    /// Merged into an existing stack.
    Stacked {
        /// Stack size afterwards.
        quantity: u32,
    },
}

/// Rejected [`InventoryStore::add_item`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddError {
    /// No free slot.
    #[error("inventory full ({used}/{capacity} slots)")]
    Full {
        /// Slots in use.
        used: usize,
        /// Usable slots.
        capacity: usize,
    },
    /// A non-stackable copy is already held.
    #[error("already holding non-stackable item {0}")]
    Duplicate(ItemId),
    /// The catalog has no such template.
    #[error("unknown item template {0}")]
    UnknownTemplate(ItemId),
}

/// Successful [`InventoryStore::remove_item`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// Stack shrank.
    Decremented {
        /// Quantity left.
        remaining: u32,
    },
    /// Instance removed and slot freed.
    Removed,
}

/// Rejected [`InventoryStore::remove_item`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoveError {
    /// Not held.
    #[error("item {0} not in inventory")]
    NotFound(ItemId),
    /// The item refuses destruction.
    #[error("item {0} cannot be destroyed")]
    NotDestroyable(ItemId),
}

/// Successful [`InventoryStore::give_item_to_npc`].
#[derive(Debug, Clone, PartialEq)]
pub struct GiveReceipt {
    /// Item handed over.
    pub item: ItemId,
    /// Recipient.
    pub npc: NpcId,
    /// Whether the item stayed in the bag (non-destroyable keys).
    pub kept: bool,
    /// Reward item added in return, if any.
    pub reward: Option<InventoryItem>,
}

/// Rejected [`InventoryStore::give_item_to_npc`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GiveError {
    /// Not held.
    #[error("item {0} not in inventory")]
    NotFound(ItemId),
    /// The item cannot change hands.
    #[error("item {0} is not tradeable")]
    NotTradeable(ItemId),
    /// The item is meant for someone else.
    #[error("item {item} is meant for {expected}, not {offered_to}")]
    WrongRecipient {
        /// Item offered.
        item: ItemId,
        /// Intended recipient.
        expected: NpcId,
        /// NPC it was offered to.
        offered_to: NpcId,
    },
}

/// Successful [`InventoryStore::use_item`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UseOutcome {
    /// Used up and removed (or one removed from a stack).
    Consumed,
    /// One charge spent.
    Used {
        /// Charges spent so far.
        uses: u32,
        /// Total charges.
        max_uses: u32,
    },
}

/// Rejected [`InventoryStore::use_item`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UseError {
    /// Not held.
    #[error("item {0} not in inventory")]
    NotFound(ItemId),
    /// Only consumables can be used.
    #[error("item {0} is not consumable")]
    NotConsumable(ItemId),
}

/// Ordering for [`InventoryStore::sort`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    /// Category, then rarity (rarest first), then name.
    Type,
    /// Rarity (rarest first), then category, then name.
    #[default]
    Rarity,
    /// Name only.
    Name,
}

/// Persisted part of the inventory.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InventorySnapshot {
    /// Items in display order.
    pub items: Vec<InventoryItem>,
    /// Slot count.
    pub max_slots: usize,
    /// Unusable slot indices.
    #[serde(default)]
    pub locked_slots: Vec<usize>,
}

// ---------------------------------------------------------------------------
// InventoryStore
// ---------------------------------------------------------------------------

/// The player's bag.
#[derive(Debug, Clone)]
pub struct InventoryStore {
    items: Vec<InventoryItem>,
    max_slots: usize,
    locked_slots: BTreeSet<usize>,
    transactions: VecDeque<ItemTransaction>,
    selected: Option<ItemId>,
    catalog: ItemCatalog,
    config: InventoryConfig,
    revision: u64,
}

impl InventoryStore {
    /// Empty bag backed by `catalog`.
    #[must_use]
    pub fn new(catalog: ItemCatalog, config: &InventoryConfig) -> Self {
        Self {
            items: Vec::new(),
            max_slots: config.max_slots,
            locked_slots: BTreeSet::new(),
            transactions: VecDeque::new(),
            selected: None,
            catalog,
            config: config.clone(),
            revision: 0,
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Items in display order.
    #[must_use]
    pub fn items(&self) -> &[InventoryItem] {
        &self.items
    }

    /// Slots in use; always equals the number of held instances.
    #[must_use]
    pub fn used_slots(&self) -> usize {
        self.items.len()
    }

    /// Total slots.
    #[must_use]
    pub fn max_slots(&self) -> usize {
        self.max_slots
    }

    /// Slots that may hold items (total minus locked).
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.max_slots.saturating_sub(self.locked_slots.len())
    }

    /// Whether no further instance fits.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.used_slots() >= self.capacity()
    }

    /// Whether the item is held.
    #[must_use]
    pub fn has_item(&self, id: &ItemId) -> bool {
        self.items.iter().any(|i| &i.id == id)
    }

    /// Look up a held item.
    #[must_use]
    pub fn item(&self, id: &ItemId) -> Option<&InventoryItem> {
        self.items.iter().find(|i| &i.id == id)
    }

    /// Quantity held, zero if absent.
    #[must_use]
    pub fn item_count(&self, id: &ItemId) -> u32 {
        self.item(id).map_or(0, |i| i.quantity)
    }

    /// Number of items not yet looked at.
    #[must_use]
    pub fn unseen_count(&self) -> usize {
        self.items.iter().filter(|i| i.metadata.is_new).count()
    }

    /// Template catalog.
    #[must_use]
    pub fn catalog(&self) -> &ItemCatalog {
        &self.catalog
    }

    /// Monotonic change counter.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Most recent transactions first, at most `limit`.
    #[must_use]
    pub fn transaction_history(&self, limit: usize) -> Vec<&ItemTransaction> {
        self.transactions.iter().rev().take(limit).collect()
    }

    /// Currently highlighted item.
    #[must_use]
    pub fn selected(&self) -> Option<&InventoryItem> {
        self.selected.as_ref().and_then(|id| self.item(id))
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Grant one instance of a catalog template.
    ///
    /// # Errors
    /// [`AddError`] when the bag is full, the template is unknown, or a
    /// non-stackable copy is already held.
    pub fn add_item(&mut self, id: &ItemId, from: Option<&NpcId>) -> Result<AddOutcome, AddError> {
        if self.is_full() {
            return Err(self.full_error());
        }
        let item = self
            .catalog
            .instantiate(id)
            .ok_or_else(|| AddError::UnknownTemplate(id.clone()))?;
        self.add_instance(item, from)
    }

    /// Add an already-built item.
    ///
    /// # Errors
    /// [`AddError::Full`] or [`AddError::Duplicate`].
    pub fn add_instance(&mut self, mut item: InventoryItem, from: Option<&NpcId>) -> Result<AddOutcome, AddError> {
        if self.is_full() {
            return Err(self.full_error());
        }
        let from = from.map(ToString::to_string);
        let max_stack = self.config.max_stack;

        if let Some(existing) = self.items.iter_mut().find(|i| i.id == item.id) {
            if !existing.stackable {
                debug!(item = %item.id, "duplicate non-stackable add rejected");
                return Err(AddError::Duplicate(item.id));
            }
            let before = existing.quantity;
            existing.quantity = existing.quantity.saturating_add(item.quantity).min(max_stack);
            let quantity = existing.quantity;
            let added = quantity.saturating_sub(before);
            self.record(TransactionKind::Stack, &item.id, added, from, Some(PLAYER.into()), "stacked");
            return Ok(AddOutcome::Stacked { quantity });
        }

        item.metadata.is_new = true;
        item.quantity = item.quantity.clamp(1, max_stack.max(1));
        let id = item.id.clone();
        let quantity = item.quantity;
        self.items.push(item);
        self.record(TransactionKind::Receive, &id, quantity, from, Some(PLAYER.into()), "received");
        if self.config.auto_sort {
            self.sort(SortMode::Rarity);
        }
        Ok(AddOutcome::Added)
    }

    /// Remove `quantity` of an item.
    ///
    /// # Errors
    /// [`RemoveError::NotFound`] or [`RemoveError::NotDestroyable`].
    pub fn remove_item(&mut self, id: &ItemId, quantity: u32) -> Result<RemoveOutcome, RemoveError> {
        let Some(idx) = self.index_of(id) else {
            return Err(RemoveError::NotFound(id.clone()));
        };
        if !self.items[idx].destroyable {
            warn!(item = %id, "refusing to destroy non-destroyable item");
            return Err(RemoveError::NotDestroyable(id.clone()));
        }
        let requested = quantity.max(1);
        let held = &self.items[idx];
        let moved = if held.stackable && held.quantity > requested {
            requested
        } else {
            held.quantity
        };
        let outcome = self.take(idx, requested);
        self.record(TransactionKind::Destroy, id, moved, Some(PLAYER.into()), None, "removed");
        Ok(outcome)
    }

    /// Hand an item to an NPC.
    ///
    /// Non-destroyable items stay in the bag. The first entry of the item's
    /// unlock list, if it names a template, is granted as a reward.
    ///
    /// # Errors
    /// [`GiveError`] when the item is missing, untradeable, or meant for a
    /// different NPC.
    pub fn give_item_to_npc(&mut self, id: &ItemId, npc: &NpcId) -> Result<GiveReceipt, GiveError> {
        let Some(idx) = self.index_of(id) else {
            return Err(GiveError::NotFound(id.clone()));
        };
        let item = &self.items[idx];
        if !item.tradeable {
            return Err(GiveError::NotTradeable(id.clone()));
        }
        if let Some(expected) = &item.metadata.npc_target {
            if expected != npc {
                return Err(GiveError::WrongRecipient {
                    item: id.clone(),
                    expected: expected.clone(),
                    offered_to: npc.clone(),
                });
            }
        }

        let kept = !item.destroyable;
        let reward_id = item.metadata.unlocks.first().map(|u| ItemId::new(u.clone()));
        if !kept {
            self.take(idx, 1);
        }
        self.record(
            TransactionKind::Give,
            id,
            1,
            Some(PLAYER.into()),
            Some(npc.to_string()),
            "delivered",
        );

        let reward = reward_id.and_then(|rid| {
            if !self.catalog.contains(&rid) {
                debug!(item = %id, unlock = %rid, "unlock entry is not an item template");
                return None;
            }
            match self.add_item(&rid, Some(npc)) {
                Ok(_) => self.item(&rid).cloned(),
                Err(e) => {
                    warn!(item = %id, reward = %rid, error = %e, "reward item not granted");
                    None
                }
            }
        });

        debug!(item = %id, npc = %npc, kept, reward = ?reward.as_ref().map(|r| &r.id), "item given");
        Ok(GiveReceipt {
            item: id.clone(),
            npc: npc.clone(),
            kept,
            reward,
        })
    }

    /// Use a consumable.
    ///
    /// # Errors
    /// [`UseError::NotFound`] or [`UseError::NotConsumable`].
    pub fn use_item(&mut self, id: &ItemId) -> Result<UseOutcome, UseError> {
        let Some(idx) = self.index_of(id) else {
            return Err(UseError::NotFound(id.clone()));
        };
        if self.items[idx].item_type != ItemType::Consumable {
            return Err(UseError::NotConsumable(id.clone()));
        }

        let meta = &mut self.items[idx].metadata;
        let outcome = match (meta.uses, meta.max_uses) {
            (Some(uses), Some(max_uses)) => {
                let uses = uses.saturating_add(1);
                meta.uses = Some(uses);
                if uses >= max_uses {
                    self.take(idx, 1);
                    UseOutcome::Consumed
                } else {
                    UseOutcome::Used { uses, max_uses }
                }
            }
            _ => {
                self.take(idx, 1);
                UseOutcome::Consumed
            }
        };
        self.record(TransactionKind::Use, id, 1, Some(PLAYER.into()), None, "used");
        Ok(outcome)
    }

    /// Reorder items.
    pub fn sort(&mut self, mode: SortMode) {
        match mode {
            SortMode::Rarity => self
                .items
                .sort_by(|a, b| (Reverse(a.rarity), a.item_type, &a.name).cmp(&(Reverse(b.rarity), b.item_type, &b.name))),
            SortMode::Type => self
                .items
                .sort_by(|a, b| (a.item_type, Reverse(a.rarity), &a.name).cmp(&(b.item_type, Reverse(b.rarity), &b.name))),
            SortMode::Name => self.items.sort_by(|a, b| a.name.cmp(&b.name)),
        }
    }

    /// Clear the "new" marker of one item. Returns `false` if not held.
    pub fn mark_seen(&mut self, id: &ItemId) -> bool {
        match self.items.iter_mut().find(|i| &i.id == id) {
            Some(item) => {
                item.metadata.is_new = false;
                self.revision += 1;
                true
            }
            None => false,
        }
    }

    /// Clear every "new" marker.
    pub fn mark_all_seen(&mut self) {
        for item in &mut self.items {
            item.metadata.is_new = false;
        }
        self.revision += 1;
    }

    /// Add `extra` slots.
    pub fn expand(&mut self, extra: usize) {
        self.max_slots = self.max_slots.saturating_add(extra);
        self.revision += 1;
        debug!(max_slots = self.max_slots, "inventory expanded");
    }

    /// Make slot `index` unusable.
    pub fn lock_slot(&mut self, index: usize) {
        if self.locked_slots.insert(index) {
            self.revision += 1;
        }
    }

    /// Make slot `index` usable again.
    pub fn unlock_slot(&mut self, index: usize) {
        if self.locked_slots.remove(&index) {
            self.revision += 1;
        }
    }

    /// Remove every destroyable item. Returns how many instances went.
    pub fn clear_destroyable(&mut self) -> usize {
        let doomed: Vec<(ItemId, u32)> = self
            .items
            .iter()
            .filter(|i| i.destroyable)
            .map(|i| (i.id.clone(), i.quantity))
            .collect();
        self.items.retain(|i| !i.destroyable);
        for (id, quantity) in &doomed {
            self.record(TransactionKind::Destroy, id, *quantity, Some(PLAYER.into()), None, "cleared");
        }
        if self.selected.as_ref().is_some_and(|id| !self.has_item(id)) {
            self.selected = None;
        }
        doomed.len()
    }

    /// Highlight a held item. Returns `false` if not held.
    pub fn select(&mut self, id: &ItemId) -> bool {
        if self.has_item(id) {
            self.selected = Some(id.clone());
            true
        } else {
            false
        }
    }

    /// Drop the highlight.
    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Empty the bag and restore the configured slot count.
    pub fn reset(&mut self) {
        self.items.clear();
        self.transactions.clear();
        self.locked_slots.clear();
        self.selected = None;
        self.max_slots = self.config.max_slots;
        self.revision += 1;
    }

    /// Persistable copy.
    #[must_use]
    pub fn snapshot(&self) -> InventorySnapshot {
        InventorySnapshot {
            items: self.items.clone(),
            max_slots: self.max_slots,
            locked_slots: self.locked_slots.iter().copied().collect(),
        }
    }

    /// Replace contents with a snapshot. The transaction log starts empty.
    pub fn restore(&mut self, snapshot: InventorySnapshot) {
        self.items = snapshot.items;
        self.max_slots = snapshot.max_slots;
        self.locked_slots = snapshot.locked_slots.into_iter().collect();
        self.transactions.clear();
        self.selected = None;
        self.revision += 1;
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn index_of(&self, id: &ItemId) -> Option<usize> {
        self.items.iter().position(|i| &i.id == id)
    }

    fn full_error(&self) -> AddError {
        AddError::Full {
            used: self.used_slots(),
            capacity: self.capacity(),
        }
    }

    /// Take `quantity` from the item at `idx`, removing it when the stack runs out.
    fn take(&mut self, idx: usize, quantity: u32) -> RemoveOutcome {
        let item = &mut self.items[idx];
        if item.stackable && item.quantity > quantity {
            item.quantity -= quantity;
            return RemoveOutcome::Decremented { remaining: item.quantity };
        }
        let removed = self.items.remove(idx);
        if self.selected.as_ref() == Some(&removed.id) {
            self.selected = None;
        }
        RemoveOutcome::Removed
    }

    fn record(
        &mut self,
        kind: TransactionKind,
        item: &ItemId,
        quantity: u32,
        from: Option<String>,
        to: Option<String>,
        reason: &str,
    ) {
        let txn = ItemTransaction {
            id: format!("txn_{}", Uuid::new_v4().simple()),
            timestamp: Utc::now(),
            kind,
            item: item.clone(),
            quantity,
            from,
            to,
            reason: reason.to_string(),
        };
        debug!(txn = %txn.id, item = %item, ?kind, quantity, "inventory transaction");
        self.transactions.push_back(txn);
        while self.transactions.len() > self.config.transaction_log_cap {
            self.transactions.pop_front();
        }
        self.revision += 1;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
