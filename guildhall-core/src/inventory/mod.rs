//! Player inventory: item model, template catalog and the slot-accounted store.
//!
//! Item instances are created from catalog templates when granted. Key items
//! are usually `destroyable = false`: handing one to an NPC records the trade
//! but the key stays in the bag.

pub mod catalog;
pub mod store;

use serde::{Deserialize, Serialize};

use crate::types::{ItemId, NpcId};

pub use catalog::ItemCatalog;
pub use store::{
    AddError, AddOutcome, GiveError, GiveReceipt, InventorySnapshot, InventoryStore, RemoveError,
    RemoveOutcome, SortMode, TransactionKind, ItemTransaction, UseError, UseOutcome,
};

/// Broad item category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    /// Opens or activates something.
    Key,
    /// Written material.
    Document,
    /// Reusable equipment.
    Tool,
    /// Crafted or found object of note.
    Artifact,
    /// Quest-only item.
    Quest,
    /// Used up on use.
    Consumable,
}

/// Rarity tier, ordered from least to most rare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    /// Tier 1.
    Common,
    /// Tier 2.
    Uncommon,
    /// Tier 3.
    Rare,
    /// Tier 4.
    Epic,
    /// Tier 5.
    Legendary,
    /// Tier 6.
    Mythic,
}

/// Particle style of a [`VisualEffect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Particles {
    /// Small twinkles.
    Sparkles,
    /// Pixel noise.
    Digital,
    /// Falling glyphs.
    Matrix,
    /// Embers.
    Fire,
    /// Arcs.
    Electric,
}

/// Renderer hints for an item icon.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VisualEffect {
    /// Glow colour, CSS-style.
    #[serde(default)]
    pub glow: Option<String>,
    /// Pulsing animation.
    #[serde(default)]
    pub pulse: bool,
    /// Slow rotation.
    #[serde(default)]
    pub rotation: bool,
    /// Particle emitter.
    #[serde(default)]
    pub particles: Option<Particles>,
}

/// Quest bookkeeping attached to an item.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ItemMetadata {
    /// Quest the item belongs to.
    #[serde(default)]
    pub quest_id: Option<String>,
    /// The only NPC that accepts this item, when set.
    #[serde(default)]
    pub npc_target: Option<NpcId>,
    /// What handing this item over unlocks. The first entry names the reward
    /// item; entries of the form `npc_<id>` unlock NPCs.
    #[serde(default)]
    pub unlocks: Vec<String>,
    /// Times used so far.
    #[serde(default)]
    pub uses: Option<u32>,
    /// Uses before the item is spent.
    #[serde(default)]
    pub max_uses: Option<u32>,
    /// Not yet looked at by the player.
    #[serde(default)]
    pub is_new: bool,
}

/// One item in the inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    /// Template id; also the instance identity.
    pub id: ItemId,
    /// Display name.
    pub name: String,
    /// Flavour text.
    pub description: String,
    /// Icon glyph or asset name.
    pub icon: String,
    /// Category.
    pub item_type: ItemType,
    /// Rarity tier.
    pub rarity: Rarity,
    /// Whether the item may be removed.
    pub destroyable: bool,
    /// Whether the item may be handed to NPCs.
    pub tradeable: bool,
    /// Whether copies merge into one slot.
    pub stackable: bool,
    /// Stack size.
    pub quantity: u32,
    /// Quest bookkeeping.
    #[serde(default)]
    pub metadata: ItemMetadata,
    /// Renderer hints.
    #[serde(default)]
    pub visual_effect: Option<VisualEffect>,
}

impl InventoryItem {
    /// NPC ids named by `npc_<id>` entries of the unlock list.
    pub fn npc_unlocks(&self) -> impl Iterator<Item = NpcId> + '_ {
        self.metadata
            .unlocks
            .iter()
            .filter_map(|u| u.strip_prefix("npc_"))
            .map(NpcId::new)
    }
}
