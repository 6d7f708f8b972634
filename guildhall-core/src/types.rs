//! Core type definitions shared by every guildhall component.
//!
//! Identifiers are string newtypes because NPCs, items and objectives are
//! authored by hand in data files (`"elder_guide"`, `"primordial_code"`).

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Identity Types
// ---------------------------------------------------------------------------

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Wrap a raw identifier.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the raw identifier.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

string_id!(
    /// Identifier of a non-player character (`"elder_guide"`).
    NpcId
);
string_id!(
    /// Identifier of an item template and of its instances (`"primordial_code"`).
    ItemId
);
string_id!(
    /// Identifier of a quest objective (`"talk_to_guide"`).
    ObjectiveId
);

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// Monotonic engine time in milliseconds.
///
/// The host decides where zero is; only differences matter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GameTime(pub u64);

impl GameTime {
    /// Time zero.
    pub const ZERO: Self = Self(0);

    /// Build from a millisecond count.
    #[must_use]
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    /// Milliseconds since time zero.
    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// The instant `ms` milliseconds after `self`.
    #[must_use]
    pub const fn after(self, ms: u64) -> Self {
        Self(self.0.saturating_add(ms))
    }

    /// Milliseconds elapsed from `earlier` to `self`, zero if `earlier` is later.
    #[must_use]
    pub const fn since(self, earlier: Self) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for GameTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

// ---------------------------------------------------------------------------
// Spatial
// ---------------------------------------------------------------------------

/// A 2D position on the hall canvas, in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// X coordinate.
    pub x: f32,
    /// Y coordinate.
    pub y: f32,
}

impl Position {
    /// Create a new position.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another position.
    #[must_use]
    pub fn distance(&self, other: &Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Unit vector pointing from `self` towards `target`.
    ///
    /// Returns the zero vector when both points coincide.
    #[must_use]
    pub fn direction_to(&self, target: &Self) -> (f32, f32) {
        let dx = target.x - self.x;
        let dy = target.y - self.y;
        let len = (dx * dx + dy * dy).sqrt();
        if len <= f32::EPSILON {
            (0.0, 0.0)
        } else {
            (dx / len, dy / len)
        }
    }

    /// Linear interpolation, `t = 0` is `self` and `t = 1` is `other`.
    #[must_use]
    pub fn lerp(&self, other: &Self, t: f32) -> Self {
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }

    /// Position shifted by `(dx, dy)`.
    #[must_use]
    pub fn offset(&self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

// ---------------------------------------------------------------------------
// NPC presentation
// ---------------------------------------------------------------------------

/// Status bubble drawn above an NPC.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    /// Nothing shown.
    #[default]
    None,
    /// The NPC has something to say.
    Talk,
    /// The NPC offers or awaits a quest step.
    Quest,
    /// The NPC is busy.
    Working,
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Talk => "talk",
            Self::Quest => "quest",
            Self::Working => "working",
        };
        f.write_str(s)
    }
}

/// Personality trait; selects the wandering parameters and dialogue flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonalityTrait {
    /// Slow, deliberate, stays near home.
    Wise,
    /// Regular, measured movement.
    Methodical,
    /// Restless; wide and frequent wandering.
    Energetic,
    /// Unhurried, contemplative.
    Refined,
    /// Rarely leaves the shelves.
    Scholarly,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_is_unit_length() {
        let a = Position::new(0.0, 0.0);
        let b = Position::new(3.0, 4.0);
        let (dx, dy) = a.direction_to(&b);
        assert!(((dx * dx + dy * dy).sqrt() - 1.0).abs() < 1e-6);
        assert!((a.distance(&b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn direction_to_self_is_zero() {
        let a = Position::new(7.0, 7.0);
        assert_eq!(a.direction_to(&a), (0.0, 0.0));
    }

    #[test]
    fn game_time_arithmetic_saturates() {
        let t = GameTime::from_millis(100);
        assert_eq!(t.after(50).as_millis(), 150);
        assert_eq!(t.since(GameTime::from_millis(400)), 0);
        assert_eq!(GameTime(u64::MAX).after(1), GameTime(u64::MAX));
    }

    #[test]
    fn ids_compare_with_str() {
        let id = NpcId::new("critic");
        assert_eq!(id, "critic");
        assert_eq!(id.to_string(), "critic");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"critic\"");
    }
}
