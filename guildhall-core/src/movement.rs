//! Player movement tracker.
//!
//! Click-to-move with an ease-out-quad path, clamped to the hall bounds.
//! The tracker owns the player's position; the renderer reads a
//! [`PlayerView`] copy each frame.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::MovementConfig;
use crate::types::{GameTime, Position};

/// Facing used to pick the sprite row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    /// Standing still.
    #[default]
    Idle,
    /// Walking towards smaller y.
    Up,
    /// Walking towards larger y.
    Down,
    /// Walking towards smaller x.
    Left,
    /// Walking towards larger x.
    Right,
}

/// Rectangle the player may stand in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapBounds {
    /// Smallest x.
    pub min_x: f32,
    /// Largest x.
    pub max_x: f32,
    /// Smallest y.
    pub min_y: f32,
    /// Largest y.
    pub max_y: f32,
}

impl MapBounds {
    /// Bounds for a canvas with a margin on every side.
    #[must_use]
    pub fn from_canvas(width: f32, height: f32, margin: f32) -> Self {
        Self {
            min_x: margin,
            max_x: (width - margin).max(margin),
            min_y: margin,
            max_y: (height - margin).max(margin),
        }
    }

    /// Clamp a point into the rectangle.
    #[must_use]
    pub fn clamp(&self, p: Position) -> Position {
        Position::new(p.x.clamp(self.min_x, self.max_x), p.y.clamp(self.min_y, self.max_y))
    }
}

#[derive(Debug, Clone, Copy)]
struct Path {
    from: Position,
    to: Position,
    started: GameTime,
    duration_ms: u64,
}

/// Snapshot of the player for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerView {
    /// Current position.
    pub position: Position,
    /// Sprite facing.
    pub facing: Facing,
    /// Walk-cycle frame, `0..4`.
    pub frame: u8,
    /// Whether a path is in progress.
    pub moving: bool,
}

/// Owns the player's position and active path.
#[derive(Debug, Clone)]
pub struct PlayerMovement {
    position: Position,
    path: Option<Path>,
    facing: Facing,
    frame: u8,
    speed: f32,
    min_speed: f32,
    max_speed: f32,
    frame_ms: u64,
    bounds: MapBounds,
}

impl PlayerMovement {
    /// Player standing at the configured start point.
    #[must_use]
    pub fn new(config: &MovementConfig) -> Self {
        let bounds = MapBounds::from_canvas(config.canvas_width, config.canvas_height, config.margin);
        Self {
            position: bounds.clamp(Position::new(config.start_x, config.start_y)),
            path: None,
            facing: Facing::Idle,
            frame: 0,
            speed: config.speed.clamp(config.min_speed, config.max_speed),
            min_speed: config.min_speed,
            max_speed: config.max_speed,
            frame_ms: config.frame_ms.max(1),
            bounds,
        }
    }

    /// Current position.
    #[must_use]
    pub fn position(&self) -> Position {
        self.position
    }

    /// Current facing.
    #[must_use]
    pub fn facing(&self) -> Facing {
        self.facing
    }

    /// Whether a path is active.
    #[must_use]
    pub fn is_moving(&self) -> bool {
        self.path.is_some()
    }

    /// Walking speed in pixels per second.
    #[must_use]
    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Active bounds.
    #[must_use]
    pub fn bounds(&self) -> MapBounds {
        self.bounds
    }

    /// Renderer snapshot.
    #[must_use]
    pub fn view(&self) -> PlayerView {
        PlayerView {
            position: self.position,
            facing: self.facing,
            frame: self.frame,
            moving: self.path.is_some(),
        }
    }

    /// Start walking to `target` (clamped to the bounds).
    ///
    /// Returns the clamped destination.
    pub fn move_to(&mut self, target: Position, now: GameTime) -> Position {
        let to = self.bounds.clamp(target);
        let distance = self.position.distance(&to);
        if distance < 1.0 {
            self.stop();
            return to;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let duration_ms = ((distance / self.speed) * 1000.0).round().max(1.0) as u64;
        self.facing = facing_towards(self.position, to);
        self.path = Some(Path {
            from: self.position,
            to,
            started: now,
            duration_ms,
        });
        debug!(x = to.x, y = to.y, duration_ms, "player path started");
        to
    }

    /// Walk by a relative offset.
    pub fn move_relative(&mut self, dx: f32, dy: f32, now: GameTime) -> Position {
        let target = self.position.offset(dx, dy);
        self.move_to(target, now)
    }

    /// Jump to `target` without animation.
    pub fn teleport(&mut self, target: Position) {
        self.position = self.bounds.clamp(target);
        self.stop();
    }

    /// Abort the active path where the player currently stands.
    pub fn stop(&mut self) {
        self.path = None;
        self.facing = Facing::Idle;
        self.frame = 0;
    }

    /// Change walking speed; clamped to the configured range.
    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed.clamp(self.min_speed, self.max_speed);
    }

    /// Recompute bounds after the canvas was resized and pull the player
    /// back inside.
    pub fn update_bounds(&mut self, width: f32, height: f32, margin: f32) {
        self.bounds = MapBounds::from_canvas(width, height, margin);
        self.position = self.bounds.clamp(self.position);
        if let Some(path) = &mut self.path {
            path.to = self.bounds.clamp(path.to);
        }
    }

    /// Advance the active path to `now`.
    pub fn update(&mut self, now: GameTime) -> Position {
        let Some(path) = self.path else {
            return self.position;
        };
        let elapsed = now.since(path.started);
        #[allow(clippy::cast_precision_loss)]
        let t = (elapsed as f32 / path.duration_ms as f32).clamp(0.0, 1.0);
        self.position = path.from.lerp(&path.to, ease_out_quad(t));
        if t >= 1.0 {
            self.position = path.to;
            self.stop();
        } else {
            #[allow(clippy::cast_possible_truncation)]
            let frame = ((elapsed / self.frame_ms) % 4) as u8;
            self.frame = frame;
        }
        self.position
    }
}

fn ease_out_quad(t: f32) -> f32 {
    t * (2.0 - t)
}

fn facing_towards(from: Position, to: Position) -> Facing {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    if dx.abs() > dy.abs() {
        if dx > 0.0 { Facing::Right } else { Facing::Left }
    } else if dy > 0.0 {
        Facing::Down
    } else {
        Facing::Up
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
