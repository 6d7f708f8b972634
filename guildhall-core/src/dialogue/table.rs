//! Dialogue tree table: loading, per-NPC tree selection and validation.
//!
//! Asset format:
//!
//! ```json
//! {
//!   "trees": { "guide_intro": { "start": { "text": "...", "options": [...] } } },
//!   "rules": { "elder_guide": [ { "tree": "guide_final", "when": ["critic_activated"] } ] }
//! }
//! ```

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{DialogueNode, START_NODE};
use super::engine::FlagSource;
use crate::error::{QuestError, Result};
use crate::types::NpcId;

const BUNDLED_TREES: &str = include_str!("../../assets/dialogue_trees.json");

/// Node id → node.
pub type DialogueTree = BTreeMap<String, DialogueNode>;

/// One tree-selection rule for an NPC. Rules are checked in order and the
/// first match wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeRule {
    /// Tree to use when the rule matches.
    pub tree: String,
    /// Flags that must all be set.
    #[serde(default)]
    pub when: Vec<String>,
    /// Flags that must all be unset.
    #[serde(default)]
    pub unless: Vec<String>,
}

impl TreeRule {
    fn matches(&self, flags: &dyn FlagSource) -> bool {
        self.when.iter().all(|f| flags.has_flag(f)) && !self.unless.iter().any(|f| flags.has_flag(f))
    }
}

/// Structural problem found by [`DialogueTable::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeIssue {
    /// The tree has no `start` node.
    MissingStart {
        /// Tree id.
        tree: String,
    },
    /// An option or `next` points at a node that does not exist.
    DanglingTarget {
        /// Tree id.
        tree: String,
        /// Node holding the reference.
        node: String,
        /// Missing target.
        target: String,
    },
    /// A reachable node from which no terminal or awaiting node can be reached.
    Deadlock {
        /// Tree id.
        tree: String,
        /// Offending node.
        node: String,
    },
    /// A selection rule names a tree that does not exist.
    UnknownRuleTree {
        /// NPC the rule belongs to.
        npc: NpcId,
        /// Missing tree.
        tree: String,
    },
}

/// Every dialogue tree plus the per-NPC selection rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DialogueTable {
    #[serde(default)]
    trees: BTreeMap<String, DialogueTree>,
    #[serde(default)]
    rules: BTreeMap<NpcId, Vec<TreeRule>>,
}

impl DialogueTable {
    /// Parse a table from JSON.
    ///
    /// # Errors
    /// Returns [`QuestError::Serialization`] if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| QuestError::Serialization(e.to_string()))
    }

    /// Load a table from a JSON file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// The table shipped with the crate, or [`DialogueTable::fallback`] if
    /// the bundled asset fails to parse.
    #[must_use]
    pub fn bundled() -> Self {
        match Self::from_json(BUNDLED_TREES) {
            Ok(table) => {
                info!(trees = table.trees.len(), "bundled dialogue trees loaded");
                table
            }
            Err(e) => {
                warn!(error = %e, "bundled dialogue trees unreadable, using fallback set");
                Self::fallback()
            }
        }
    }

    /// Minimal built-in table: one farewell line per default tree.
    #[must_use]
    pub fn fallback() -> Self {
        let lines = [
            ("guide_intro", "Welcome to the guild hall. The archives are quiet today; come back later."),
            ("librarian_intro", "The archives are closed for cataloguing."),
            ("scribe_plan", "My plans are not ready yet."),
            ("artisan_forge", "The forge is cold. Come back later!"),
            ("critic_review", "There is nothing to review yet."),
        ];
        let trees = lines
            .iter()
            .map(|(tree, text)| {
                let node = DialogueNode {
                    speaker: super::Speaker::Npc,
                    text: (*text).to_string(),
                    options: Vec::new(),
                    next: None,
                    action: None,
                };
                ((*tree).to_string(), BTreeMap::from([(START_NODE.to_string(), node)]))
            })
            .collect();
        Self {
            trees,
            rules: BTreeMap::new(),
        }
    }

    /// Add or replace a tree.
    pub fn insert_tree(&mut self, id: impl Into<String>, tree: DialogueTree) {
        self.trees.insert(id.into(), tree);
    }

    /// Replace the selection rules of one NPC.
    pub fn set_rules(&mut self, npc: NpcId, rules: Vec<TreeRule>) {
        self.rules.insert(npc, rules);
    }

    /// Look up a tree.
    #[must_use]
    pub fn tree(&self, id: &str) -> Option<&DialogueTree> {
        self.trees.get(id)
    }

    /// Look up a node.
    #[must_use]
    pub fn node(&self, tree: &str, node: &str) -> Option<&DialogueNode> {
        self.trees.get(tree).and_then(|t| t.get(node))
    }

    /// Ids of every tree.
    pub fn tree_ids(&self) -> impl Iterator<Item = &str> {
        self.trees.keys().map(String::as_str)
    }

    /// Number of trees.
    #[must_use]
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    /// Whether the table has no trees.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Pick the tree for `npc`: the first matching rule, else `default`.
    #[must_use]
    pub fn select_tree<'a>(&'a self, npc: &NpcId, default: &'a str, flags: &dyn FlagSource) -> &'a str {
        self.rules
            .get(npc)
            .and_then(|rules| rules.iter().find(|r| r.matches(flags)))
            .map_or(default, |r| r.tree.as_str())
    }

    /// Check every tree for missing start nodes, dangling references and
    /// reachable nodes that can never end the conversation.
    #[must_use]
    pub fn validate(&self) -> Vec<TreeIssue> {
        let mut issues = Vec::new();
        for (tree_id, tree) in &self.trees {
            validate_tree(tree_id, tree, &mut issues);
        }
        for (npc, rules) in &self.rules {
            for rule in rules {
                if !self.trees.contains_key(&rule.tree) {
                    issues.push(TreeIssue::UnknownRuleTree {
                        npc: npc.clone(),
                        tree: rule.tree.clone(),
                    });
                }
            }
        }
        issues
    }
}

fn validate_tree(tree_id: &str, tree: &DialogueTree, issues: &mut Vec<TreeIssue>) {
    if !tree.contains_key(START_NODE) {
        issues.push(TreeIssue::MissingStart { tree: tree_id.to_string() });
        return;
    }

    let mut reachable = BTreeSet::new();
    let mut queue = VecDeque::from([START_NODE]);
    while let Some(id) = queue.pop_front() {
        if !reachable.insert(id) {
            continue;
        }
        let Some(node) = tree.get(id) else { continue };
        for target in node.successors() {
            if tree.contains_key(target) {
                queue.push_back(target);
            } else {
                issues.push(TreeIssue::DanglingTarget {
                    tree: tree_id.to_string(),
                    node: id.to_string(),
                    target: target.to_string(),
                });
            }
        }
    }

    // Fixpoint: a node can finish if it is terminal, awaits an item, or has
    // a successor that can finish.
    let mut can_finish: BTreeSet<&str> = tree
        .iter()
        .filter(|(_, n)| n.is_terminal() || n.awaits_item())
        .map(|(id, _)| id.as_str())
        .collect();
    loop {
        let before = can_finish.len();
        for (id, node) in tree {
            if !can_finish.contains(id.as_str()) && node.successors().any(|s| can_finish.contains(s)) {
                can_finish.insert(id.as_str());
            }
        }
        if can_finish.len() == before {
            break;
        }
    }

    for id in reachable {
        if tree.contains_key(id) && !can_finish.contains(id) {
            issues.push(TreeIssue::Deadlock {
                tree: tree_id.to_string(),
                node: id.to_string(),
            });
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap as Map;

    #[test]
    fn bundled_table_parses_and_validates() {
        let table = DialogueTable::from_json(BUNDLED_TREES).expect("bundled asset parses");
        assert!(table.tree("guide_intro").is_some());
        assert_eq!(table.validate(), Vec::new());
    }

    #[test]
    fn fallback_is_valid() {
        let table = DialogueTable::fallback();
        assert_eq!(table.len(), 5);
        assert!(table.validate().is_empty());
    }

    #[test]
    fn first_matching_rule_wins() {
        let table = DialogueTable::from_json(
            r#"{
              "trees": {
                "a": {"start": {"text": "a"}},
                "b": {"start": {"text": "b"}},
                "c": {"start": {"text": "c"}}
              },
              "rules": {
                "guide": [
                  {"tree": "c", "when": ["final"]},
                  {"tree": "b", "when": ["met"], "unless": ["banned"]}
                ]
              }
            }"#,
        )
        .expect("parse");
        let guide = NpcId::new("guide");
        let mut flags: Map<String, bool> = Map::new();
        assert_eq!(table.select_tree(&guide, "a", &flags), "a");
        flags.insert("met".into(), true);
        assert_eq!(table.select_tree(&guide, "a", &flags), "b");
        flags.insert("final".into(), true);
        assert_eq!(table.select_tree(&guide, "a", &flags), "c");
        flags.remove("final");
        flags.insert("banned".into(), true);
        assert_eq!(table.select_tree(&guide, "a", &flags), "a");
    }

    #[test]
    fn validation_finds_dangling_and_deadlocked_nodes() {
        let table = DialogueTable::from_json(
            r#"{
              "trees": {
                "loop": {
                  "start": {"text": "x", "next": "spin"},
                  "spin": {"text": "y", "next": "start"}
                },
                "broken": {
                  "start": {"text": "x", "options": [{"id": "o", "text": "go", "next": "nowhere"}]}
                },
                "headless": {"middle": {"text": "x"}}
              },
              "rules": {"npc": [{"tree": "ghost"}]}
            }"#,
        )
        .expect("parse");
        let issues = table.validate();
        assert!(issues.contains(&TreeIssue::MissingStart { tree: "headless".into() }));
        assert!(issues.contains(&TreeIssue::DanglingTarget {
            tree: "broken".into(),
            node: "start".into(),
            target: "nowhere".into(),
        }));
        assert!(issues.contains(&TreeIssue::Deadlock { tree: "loop".into(), node: "spin".into() }));
        assert!(issues.contains(&TreeIssue::UnknownRuleTree {
            npc: NpcId::new("npc"),
            tree: "ghost".into(),
        }));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            DialogueTable::from_json("{ not json"),
            Err(QuestError::Serialization(_))
        ));
    }
}
