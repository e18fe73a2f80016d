//! 2D positions

use serde::{Deserialize, Serialize};

/// A point or offset on the canvas plane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: Vec2) -> f64 {
        self.distance_squared(other).sqrt()
    }

    pub fn distance_squared(&self, other: Vec2) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    pub fn midpoint(&self, other: Vec2) -> Vec2 {
        Vec2::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    /// Point at `distance` from `self` in direction `angle` (radians)
    pub fn offset_polar(&self, angle: f64, distance: f64) -> Vec2 {
        Vec2::new(self.x + angle.cos() * distance, self.y + angle.sin() * distance)
    }

    /// Arithmetic mean of a set of points.
    ///
    /// Returns `None` for an empty set.
    pub fn centroid<I>(points: I) -> Option<Vec2>
    where
        I: IntoIterator<Item = Vec2>,
    {
        let mut count = 0usize;
        let mut sum = Vec2::ZERO;
        for p in points {
            sum = sum + p;
            count += 1;
        }
        if count == 0 {
            None
        } else {
            Some(sum * (1.0 / count as f64))
        }
    }

    /// Serialize-friendly `[x, y]` pair
    pub fn to_array(self) -> [f64; 2] {
        [self.x, self.y]
    }
}

impl std::ops::Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Mul<f64> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl std::fmt::Display for Vec2 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.1}, {:.1})", self.x, self.y)
    }
}
