//! CPU-side geometry: named attributes, optional index, draw groups and morph targets.

use super::bounds::{position_at, BoundingBox, BoundingSphere};
use super::buffer::AttributeBuffer;

/// Well-known attribute names.
pub mod names {
    pub const POSITION: &str = "position";
    pub const NORMAL: &str = "normal";
    pub const UV: &str = "uv";
    pub const SKIN_INDEX: &str = "skin_index";
    pub const SKIN_WEIGHT: &str = "skin_weight";
}

/// Index format for indexed drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndexFormat {
    /// 16-bit unsigned integers (max 65535 vertices).
    #[default]
    Uint16,
    /// 32-bit unsigned integers (max ~4 billion vertices).
    Uint32,
}

impl IndexFormat {
    /// Get the size in bytes of each index.
    pub fn size(&self) -> usize {
        match self {
            Self::Uint16 => 2,
            Self::Uint32 => 4,
        }
    }

    /// Smallest format able to address `vertex_count` vertices.
    pub fn for_vertex_count(vertex_count: usize) -> Self {
        if vertex_count > u16::MAX as usize {
            Self::Uint32
        } else {
            Self::Uint16
        }
    }
}

/// Triangle list indices. Values are kept widened to `u32`; `format` records the
/// storage width so it survives compaction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IndexBuffer {
    format: IndexFormat,
    indices: Vec<u32>,
}

impl IndexBuffer {
    /// Create an index buffer stored as `format`.
    pub fn new(format: IndexFormat, indices: Vec<u32>) -> Self {
        Self { format, indices }
    }

    /// Create a 16-bit index buffer.
    pub fn from_u16(indices: &[u16]) -> Self {
        Self::new(
            IndexFormat::Uint16,
            indices.iter().map(|&i| i as u32).collect(),
        )
    }

    /// Create a 32-bit index buffer.
    pub fn from_u32(indices: Vec<u32>) -> Self {
        Self::new(IndexFormat::Uint32, indices)
    }

    pub fn format(&self) -> IndexFormat {
        self.format
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn get(&self, position: usize) -> Option<u32> {
        self.indices.get(position).copied()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Size of the index data in bytes, according to `format`.
    pub fn byte_len(&self) -> usize {
        self.indices.len() * self.format.size()
    }
}

/// A contiguous run of draw entries rendered with one material.
///
/// `start` and `count` address index-buffer entries for indexed geometry and
/// vertices for non-indexed geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Group {
    pub start: usize,
    pub count: usize,
    pub material_index: usize,
}

impl Group {
    pub fn new(start: usize, count: usize, material_index: usize) -> Self {
        Self {
            start,
            count,
            material_index,
        }
    }
}

/// Summary of a geometry's size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GeometryStats {
    pub vertex_count: usize,
    pub index_count: usize,
    pub triangle_count: usize,
    pub attribute_count: usize,
    pub morph_target_count: usize,
    pub byte_len: usize,
}

/// Mesh geometry.
///
/// Attributes and morph attributes keep their insertion order. Morph
/// attributes are keyed by the base attribute they displace (e.g. `position`)
/// and hold one buffer per morph target.
#[derive(Debug, Clone, Default)]
pub struct Geometry {
    attributes: Vec<(String, AttributeBuffer)>,
    index: Option<IndexBuffer>,
    groups: Vec<Group>,
    morph_attributes: Vec<(String, Vec<AttributeBuffer>)>,
    /// Morph target values are offsets from the base attribute rather than absolute.
    pub morph_targets_relative: bool,
    bounding_box: Option<BoundingBox>,
    bounding_sphere: Option<BoundingSphere>,
    label: Option<String>,
}

impl Geometry {
    /// Create an empty geometry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an attribute.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, attribute: AttributeBuffer) -> Self {
        self.set_attribute(name, attribute);
        self
    }

    /// Set the index buffer.
    #[must_use]
    pub fn with_index(mut self, index: IndexBuffer) -> Self {
        self.index = Some(index);
        self
    }

    /// Append a draw group.
    #[must_use]
    pub fn with_group(mut self, start: usize, count: usize, material_index: usize) -> Self {
        self.groups.push(Group::new(start, count, material_index));
        self
    }

    /// Set the morph targets for one base attribute.
    #[must_use]
    pub fn with_morph_attribute(
        mut self,
        name: impl Into<String>,
        targets: Vec<AttributeBuffer>,
    ) -> Self {
        self.set_morph_attribute(name, targets);
        self
    }

    /// Set a debug label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Add or replace an attribute, keeping its original slot when replacing.
    pub fn set_attribute(&mut self, name: impl Into<String>, attribute: AttributeBuffer) {
        let name = name.into();
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = attribute,
            None => self.attributes.push((name, attribute)),
        }
    }

    /// Remove an attribute, returning it.
    pub fn remove_attribute(&mut self, name: &str) -> Option<AttributeBuffer> {
        let pos = self.attributes.iter().position(|(n, _)| n == name)?;
        Some(self.attributes.remove(pos).1)
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeBuffer> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, a)| a)
    }

    pub fn attribute_mut(&mut self, name: &str) -> Option<&mut AttributeBuffer> {
        self.attributes
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, a)| a)
    }

    /// Iterate attributes in insertion order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &AttributeBuffer)> {
        self.attributes.iter().map(|(n, a)| (n.as_str(), a))
    }

    /// Add or replace the morph targets of one base attribute.
    pub fn set_morph_attribute(&mut self, name: impl Into<String>, targets: Vec<AttributeBuffer>) {
        let name = name.into();
        match self.morph_attributes.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = targets,
            None => self.morph_attributes.push((name, targets)),
        }
    }

    pub fn morph_attribute(&self, name: &str) -> Option<&[AttributeBuffer]> {
        self.morph_attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t.as_slice())
    }

    /// Iterate morph attributes in insertion order.
    pub fn morph_attributes(&self) -> impl Iterator<Item = (&str, &[AttributeBuffer])> {
        self.morph_attributes
            .iter()
            .map(|(n, t)| (n.as_str(), t.as_slice()))
    }

    /// Number of morph targets (the longest target list across attributes).
    pub fn morph_target_count(&self) -> usize {
        self.morph_attributes
            .iter()
            .map(|(_, t)| t.len())
            .max()
            .unwrap_or(0)
    }

    pub fn set_index(&mut self, index: Option<IndexBuffer>) {
        self.index = index;
    }

    pub fn index(&self) -> Option<&IndexBuffer> {
        self.index.as_ref()
    }

    /// Check if this geometry uses indexed drawing.
    pub fn is_indexed(&self) -> bool {
        self.index.is_some()
    }

    pub fn add_group(&mut self, start: usize, count: usize, material_index: usize) {
        self.groups.push(Group::new(start, count, material_index));
    }

    pub fn clear_groups(&mut self) {
        self.groups.clear();
    }

    /// Declared draw groups (possibly empty).
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Draw groups, or a single group with material 0 spanning the whole draw
    /// range when none are declared.
    pub fn groups_or_default(&self) -> Vec<Group> {
        if self.groups.is_empty() {
            vec![Group::new(0, self.draw_count(), 0)]
        } else {
            self.groups.clone()
        }
    }

    /// Number of vertices: the position count, or the first attribute's count
    /// for geometry without positions.
    pub fn vertex_count(&self) -> usize {
        self.attribute(names::POSITION)
            .or_else(|| self.attributes.first().map(|(_, a)| a))
            .map_or(0, AttributeBuffer::count)
    }

    /// Number of vertices present in every attribute and morph target.
    ///
    /// Smaller than [`vertex_count`](Self::vertex_count) when buffers disagree
    /// in length; only these vertices can be copied out whole.
    pub fn complete_vertex_count(&self) -> usize {
        self.attributes
            .iter()
            .map(|(_, a)| a.count())
            .chain(
                self.morph_attributes
                    .iter()
                    .flat_map(|(_, targets)| targets.iter().map(AttributeBuffer::count)),
            )
            .min()
            .unwrap_or(0)
    }

    /// Number of draw entries: index count when indexed, vertex count otherwise.
    pub fn draw_count(&self) -> usize {
        match &self.index {
            Some(index) => index.len(),
            None => self.vertex_count(),
        }
    }

    /// Number of whole triangles in the draw range.
    pub fn triangle_count(&self) -> usize {
        self.draw_count() / 3
    }

    /// Check if there is at least one position to draw.
    pub fn has_positions(&self) -> bool {
        self.attribute(names::POSITION)
            .is_some_and(|p| !p.is_empty())
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn bounding_box(&self) -> Option<&BoundingBox> {
        self.bounding_box.as_ref()
    }

    pub fn bounding_sphere(&self) -> Option<&BoundingSphere> {
        self.bounding_sphere.as_ref()
    }

    /// Recompute the bounding box from positions, including morphed positions.
    ///
    /// Leaves the box unset when there are no positions.
    pub fn compute_bounding_box(&mut self) {
        let Some(positions) = self.attribute(names::POSITION) else {
            self.bounding_box = None;
            return;
        };
        let mut bounds = BoundingBox::from_positions(positions);

        for target in self.morph_attribute(names::POSITION).unwrap_or_default() {
            let mut target_bounds = BoundingBox::empty();
            for i in 0..target.count() {
                let mut point = position_at(target, i);
                if self.morph_targets_relative {
                    point += position_at(positions, i);
                }
                target_bounds.expand_by_point(&point);
            }
            bounds.union(&target_bounds);
        }

        self.bounding_box = (!bounds.is_empty()).then_some(bounds);
    }

    /// Recompute the bounding sphere: centered on the bounding box, with the
    /// radius reaching the farthest base or morphed position.
    pub fn compute_bounding_sphere(&mut self) {
        self.compute_bounding_box();
        let (Some(bounds), Some(positions)) =
            (self.bounding_box, self.attribute(names::POSITION))
        else {
            self.bounding_sphere = None;
            return;
        };

        let center = bounds.center();
        let mut max_sq: f32 = 0.0;
        for i in 0..positions.count() {
            max_sq = max_sq.max((position_at(positions, i) - center).norm_squared());
        }
        for target in self.morph_attribute(names::POSITION).unwrap_or_default() {
            for i in 0..target.count() {
                let mut point = position_at(target, i);
                if self.morph_targets_relative {
                    point += position_at(positions, i);
                }
                max_sq = max_sq.max((point - center).norm_squared());
            }
        }

        self.bounding_sphere = Some(BoundingSphere {
            center,
            radius: max_sq.sqrt(),
        });
    }

    /// Size summary.
    pub fn stats(&self) -> GeometryStats {
        let attribute_bytes: usize = self.attributes.iter().map(|(_, a)| a.byte_len()).sum();
        let morph_bytes: usize = self
            .morph_attributes
            .iter()
            .flat_map(|(_, t)| t.iter())
            .map(AttributeBuffer::byte_len)
            .sum();
        GeometryStats {
            vertex_count: self.vertex_count(),
            index_count: self.index.as_ref().map_or(0, IndexBuffer::len),
            triangle_count: self.triangle_count(),
            attribute_count: self.attributes.len(),
            morph_target_count: self.morph_target_count(),
            byte_len: attribute_bytes
                + morph_bytes
                + self.index.as_ref().map_or(0, IndexBuffer::byte_len),
        }
    }
}
