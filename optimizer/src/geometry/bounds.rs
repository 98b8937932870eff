//! Bounding volumes computed from position data.

use crate::math::Vec3;

use super::buffer::AttributeBuffer;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    /// An inverted box that any point expands.
    pub fn empty() -> Self {
        Self {
            min: Vec3::repeat(f32::INFINITY),
            max: Vec3::repeat(f32::NEG_INFINITY),
        }
    }

    /// Check if no point has been added yet.
    pub fn is_empty(&self) -> bool {
        self.max.x < self.min.x || self.max.y < self.min.y || self.max.z < self.min.z
    }

    /// Grow the box to include `point`.
    pub fn expand_by_point(&mut self, point: &Vec3) {
        self.min = self.min.inf(point);
        self.max = self.max.sup(point);
    }

    /// Grow the box to include another box.
    pub fn union(&mut self, other: &BoundingBox) {
        if other.is_empty() {
            return;
        }
        self.expand_by_point(&other.min);
        self.expand_by_point(&other.max);
    }

    /// Center of the box.
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Edge lengths of the box.
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Box around every item of a position attribute.
    pub fn from_positions(positions: &AttributeBuffer) -> Self {
        let mut bounds = Self::empty();
        for i in 0..positions.count() {
            bounds.expand_by_point(&position_at(positions, i));
        }
        bounds
    }
}

/// Bounding sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    /// Check if a point lies inside or on the sphere.
    pub fn contains_point(&self, point: &Vec3) -> bool {
        (point - self.center).norm() <= self.radius
    }
}

/// Read item `index` of a position attribute as a 3D point.
///
/// Attributes with fewer than three components are padded with zero.
pub(crate) fn position_at(positions: &AttributeBuffer, index: usize) -> Vec3 {
    let c = |component| positions.get(index, component).unwrap_or(0.0) as f32;
    Vec3::new(c(0), c(1), c(2))
}
