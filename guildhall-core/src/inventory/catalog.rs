//! Item templates.

use std::collections::HashMap;

use super::{InventoryItem, ItemMetadata, ItemType, Particles, Rarity, VisualEffect};
use crate::types::{ItemId, NpcId};

/// Templates items are instantiated from.
#[derive(Debug, Clone, Default)]
pub struct ItemCatalog {
    templates: HashMap<ItemId, InventoryItem>,
}

impl ItemCatalog {
    /// Empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a template.
    pub fn insert(&mut self, template: InventoryItem) {
        self.templates.insert(template.id.clone(), template);
    }

    /// Whether a template exists.
    #[must_use]
    pub fn contains(&self, id: &ItemId) -> bool {
        self.templates.contains_key(id)
    }

    /// Number of templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Fresh instance of a template, marked new, quantity 1.
    #[must_use]
    pub fn instantiate(&self, id: &ItemId) -> Option<InventoryItem> {
        self.templates.get(id).map(|t| {
            let mut item = t.clone();
            item.quantity = 1;
            item.metadata.is_new = true;
            item
        })
    }

    /// The guild hall's items: the activation key chain plus a couple of
    /// everyday supplies.
    #[must_use]
    pub fn standard() -> Self {
        let mut catalog = Self::new();
        for template in [
            key(
                "primordial_code",
                "Primordial Code",
                "The first key. It hums with the memory of the archive.",
                Rarity::Mythic,
                "librarian",
                &["activation_key_alpha"],
                Some(Particles::Matrix),
            ),
            key(
                "activation_key_alpha",
                "Activation Key Alpha",
                "Sealed inside the archive. The Scribe's plans answer to it.",
                Rarity::Epic,
                "requirements_scribe",
                &["execution_core_beta", "npc_requirements_scribe"],
                Some(Particles::Digital),
            ),
            key(
                "execution_core_beta",
                "Execution Core Beta",
                "A plan made solid. Only the forge can use it.",
                Rarity::Epic,
                "artisan",
                &["optimization_module_gamma", "npc_artisan"],
                Some(Particles::Fire),
            ),
            InventoryItem {
                item_type: ItemType::Tool,
                ..key(
                    "optimization_module_gamma",
                    "Optimization Module Gamma",
                    "Forged work awaiting a discerning eye.",
                    Rarity::Rare,
                    "critic",
                    &["synchronization_protocol_omega", "npc_critic"],
                    Some(Particles::Electric),
                )
            },
            key(
                "synchronization_protocol_omega",
                "Synchronization Protocol Omega",
                "The last key. It binds the companions into one guild.",
                Rarity::Legendary,
                "elder_guide",
                &["collective_consciousness"],
                Some(Particles::Sparkles),
            ),
            InventoryItem {
                id: ItemId::new("collective_consciousness"),
                name: "Collective Consciousness".to_string(),
                description: "The guild, speaking with one voice.".to_string(),
                icon: "🌐".to_string(),
                item_type: ItemType::Artifact,
                rarity: Rarity::Mythic,
                destroyable: false,
                tradeable: false,
                stackable: false,
                quantity: 1,
                metadata: ItemMetadata {
                    quest_id: Some(MAIN_QUEST.to_string()),
                    ..ItemMetadata::default()
                },
                visual_effect: Some(VisualEffect {
                    glow: Some("#ffd700".to_string()),
                    pulse: true,
                    rotation: true,
                    particles: Some(Particles::Sparkles),
                }),
            },
            InventoryItem {
                id: ItemId::new("archive_ink"),
                name: "Archive Ink".to_string(),
                description: "Ink that remembers what it wrote.".to_string(),
                icon: "🖋".to_string(),
                item_type: ItemType::Document,
                rarity: Rarity::Common,
                destroyable: true,
                tradeable: true,
                stackable: true,
                quantity: 1,
                metadata: ItemMetadata::default(),
                visual_effect: None,
            },
            InventoryItem {
                id: ItemId::new("focus_tonic"),
                name: "Focus Tonic".to_string(),
                description: "Three sips of clarity.".to_string(),
                icon: "🧪".to_string(),
                item_type: ItemType::Consumable,
                rarity: Rarity::Uncommon,
                destroyable: true,
                tradeable: false,
                stackable: false,
                quantity: 1,
                metadata: ItemMetadata {
                    uses: Some(0),
                    max_uses: Some(3),
                    ..ItemMetadata::default()
                },
                visual_effect: None,
            },
            InventoryItem {
                id: ItemId::new("spark_wafer"),
                name: "Spark Wafer".to_string(),
                description: "Gone in one bite.".to_string(),
                icon: "🍪".to_string(),
                item_type: ItemType::Consumable,
                rarity: Rarity::Common,
                destroyable: true,
                tradeable: true,
                stackable: false,
                quantity: 1,
                metadata: ItemMetadata::default(),
                visual_effect: None,
            },
        ] {
            catalog.insert(template);
        }
        catalog
    }
}

/// Quest id the key chain belongs to.
pub const MAIN_QUEST: &str = "awaken_the_guild";

fn key(
    id: &str,
    name: &str,
    description: &str,
    rarity: Rarity,
    target: &str,
    unlocks: &[&str],
    particles: Option<Particles>,
) -> InventoryItem {
    InventoryItem {
        id: ItemId::new(id),
        name: name.to_string(),
        description: description.to_string(),
        icon: "🔑".to_string(),
        item_type: ItemType::Key,
        rarity,
        destroyable: false,
        tradeable: true,
        stackable: false,
        quantity: 1,
        metadata: ItemMetadata {
            quest_id: Some(MAIN_QUEST.to_string()),
            npc_target: Some(NpcId::new(target)),
            unlocks: unlocks.iter().map(|s| (*s).to_string()).collect(),
            ..ItemMetadata::default()
        },
        visual_effect: Some(VisualEffect {
            glow: None,
            pulse: true,
            rotation: false,
            particles,
        }),
    }
}
