//! Static NPC definitions for the guild hall.

use serde::{Deserialize, Serialize};

use crate::types::{NpcId, PersonalityTrait, Position};

/// Flavour text attached to an NPC's personality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Personality {
    /// Drives wandering parameters.
    pub trait_kind: PersonalityTrait,
    /// How the NPC opens a conversation.
    pub greeting_style: String,
    /// Lines shown while the NPC is busy.
    pub working_phrases: Vec<String>,
    /// Line shown when a job finishes.
    pub success_phrase: String,
}

/// Blueprint an [`super::Npc`] is built from at registry initialisation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpcDefinition {
    /// Stable identifier.
    pub id: NpcId,
    /// Display name.
    pub name: String,
    /// Display title.
    pub title: String,
    /// Spawn point and wandering anchor.
    pub home: Position,
    /// Whether the NPC starts unlocked.
    pub unlocked: bool,
    /// Default dialogue tree.
    pub dialogue_tree: String,
    /// Personality and flavour text.
    pub personality: Personality,
}

fn phrases(lines: &[&str]) -> Vec<String> {
    lines.iter().map(|s| (*s).to_string()).collect()
}

/// The five residents of the guild hall.
#[must_use]
pub fn guild_roster() -> Vec<NpcDefinition> {
    vec![
        NpcDefinition {
            id: NpcId::new("elder_guide"),
            name: "The Guide".to_string(),
            title: "Keeper of the Hall".to_string(),
            home: Position::new(512.0, 400.0),
            unlocked: true,
            dialogue_tree: "guide_intro".to_string(),
            personality: Personality {
                trait_kind: PersonalityTrait::Wise,
                greeting_style: "Welcome, traveller. The hall has been waiting for you.".to_string(),
                working_phrases: phrases(&["Gathering the threads...", "Listening to the hall..."]),
                success_phrase: "It is done. The guild breathes as one.".to_string(),
            },
        },
        NpcDefinition {
            id: NpcId::new("librarian"),
            name: "The Librarian".to_string(),
            title: "Warden of the Archives".to_string(),
            home: Position::new(200.0, 520.0),
            unlocked: false,
            dialogue_tree: "librarian_intro".to_string(),
            personality: Personality {
                trait_kind: PersonalityTrait::Scholarly,
                greeting_style: "Shh. The archives are listening.".to_string(),
                working_phrases: phrases(&["Cross-referencing...", "Dusting off the old tomes..."]),
                success_phrase: "Catalogued and shelved.".to_string(),
            },
        },
        NpcDefinition {
            id: NpcId::new("requirements_scribe"),
            name: "The Scribe".to_string(),
            title: "Keeper of Plans".to_string(),
            home: Position::new(300.0, 300.0),
            unlocked: false,
            dialogue_tree: "scribe_plan".to_string(),
            personality: Personality {
                trait_kind: PersonalityTrait::Methodical,
                greeting_style: "Let us begin with what you actually need.".to_string(),
                working_phrases: phrases(&["Outlining the requirements...", "Numbering the steps..."]),
                success_phrase: "The plan is complete and in order.".to_string(),
            },
        },
        NpcDefinition {
            id: NpcId::new("artisan"),
            name: "The Artisan".to_string(),
            title: "Mistress of the Forge".to_string(),
            home: Position::new(700.0, 300.0),
            unlocked: false,
            dialogue_tree: "artisan_forge".to_string(),
            personality: Personality {
                trait_kind: PersonalityTrait::Energetic,
                greeting_style: "Finally, something to build!".to_string(),
                working_phrases: phrases(&["*hammering*", "Sparks flying!", "Almost there..."]),
                success_phrase: "Done! Look at that beauty!".to_string(),
            },
        },
        NpcDefinition {
            id: NpcId::new("critic"),
            name: "The Critic".to_string(),
            title: "Curator of the Gallery".to_string(),
            home: Position::new(512.0, 200.0),
            unlocked: false,
            dialogue_tree: "critic_review".to_string(),
            personality: Personality {
                trait_kind: PersonalityTrait::Refined,
                greeting_style: "Show me. Slowly.".to_string(),
                working_phrases: phrases(&["Considering the composition...", "Weighing every word..."]),
                success_phrase: "Now it is excellent.".to_string(),
            },
        },
    ]
}
