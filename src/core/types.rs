//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};

/// Unique identifier for simulated entities
///
/// Allocated by the entity registry in spawn order, never reused within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

/// Unique identifier for transient effects
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EffectId(pub u64);

/// Simulation tick counter
pub type Tick = u64;

/// Simulation time in seconds since the simulation started
pub type SimTime = f64;

/// Horizontal facing of a creature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Facing {
    #[default]
    Right,
    Left,
}

impl Facing {
    pub fn sign(&self) -> f32 {
        match self {
            Facing::Right => 1.0,
            Facing::Left => -1.0,
        }
    }

    pub fn flipped(&self) -> Self {
        match self {
            Facing::Right => Facing::Left,
            Facing::Left => Facing::Right,
        }
    }
}

/// 2D position in terminal cell units
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

impl std::ops::Add for Vec2 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self { x: self.x + rhs.x, y: self.y + rhs.y }
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self { x: self.x - rhs.x, y: self.y - rhs.y }
    }
}

impl std::ops::Mul<f32> for Vec2 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self { x: self.x * rhs, y: self.y * rhs }
    }
}

/// Drawable area of the aquarium, in terminal cells
///
/// Rows `0..surface_row()` are sky, the surface is two rows of waves,
/// and the ocean runs down to `floor_row()`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    /// Smallest area the simulation lays itself out in
    pub const MIN_WIDTH: f32 = 20.0;
    pub const MIN_HEIGHT: f32 = 12.0;

    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width: width.max(Self::MIN_WIDTH),
            height: height.max(Self::MIN_HEIGHT),
        }
    }

    /// First row of the wave surface
    pub fn surface_row(&self) -> f32 {
        4.0
    }

    /// First fully underwater row
    pub fn ocean_top(&self) -> f32 {
        self.surface_row() + 2.0
    }

    /// Row just above the sandy floor
    pub fn floor_row(&self) -> f32 {
        self.height - 2.0
    }

    pub fn ocean_mid(&self) -> f32 {
        (self.ocean_top() + self.floor_row()) / 2.0
    }

    pub fn contains_x(&self, x: f32, margin: f32) -> bool {
        x >= -margin && x <= self.width + margin
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::new(100.0, 30.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_ordering() {
        assert!(EntityId(1) < EntityId(2));
        assert_eq!(EntityId(7), EntityId(7));
    }

    #[test]
    fn test_facing_flip() {
        assert_eq!(Facing::Right.flipped(), Facing::Left);
        assert_eq!(Facing::Left.flipped(), Facing::Right);
        assert_eq!(Facing::Left.sign(), -1.0);
    }

    #[test]
    fn test_bounds_are_clamped_to_minimum() {
        let b = Bounds::new(5.0, 3.0);
        assert_eq!(b.width, Bounds::MIN_WIDTH);
        assert_eq!(b.height, Bounds::MIN_HEIGHT);
        assert!(b.ocean_top() < b.floor_row());
    }

    #[test]
    fn test_vec2_ops() {
        let a = Vec2::new(1.0, 2.0);
        let b = Vec2::new(4.0, 6.0);
        assert!((a.distance(&b) - 5.0).abs() < 1e-6);
        let c = (b - a) * 2.0;
        assert_eq!(c, Vec2::new(6.0, 8.0));
    }
}
