//! Index compaction: extracting the vertices referenced by a set of draw
//! groups into tight, renumbered buffers.

use std::collections::HashMap;

use crate::geometry::{AttributeBuffer, Geometry, Group, IndexBuffer, IndexFormat};
use crate::profiling::profile_function;

/// Insertion-ordered mapping from source vertex index to compacted index.
#[derive(Debug, Clone, Default)]
pub struct IndexMapper {
    slots: HashMap<u32, u32>,
    order: Vec<u32>,
}

impl IndexMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compacted index of `source`, allocating the next slot on first sight.
    /// The flag tells whether the slot is new.
    pub fn map(&mut self, source: u32) -> (u32, bool) {
        if let Some(&slot) = self.slots.get(&source) {
            return (slot, false);
        }
        let slot = self.order.len() as u32;
        self.slots.insert(source, slot);
        self.order.push(source);
        (slot, true)
    }

    pub fn get(&self, source: u32) -> Option<u32> {
        self.slots.get(&source).copied()
    }

    /// Source indices in slot order.
    pub fn sources(&self) -> &[u32] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Output of index compaction.
#[derive(Debug, Clone)]
pub struct Compacted {
    /// Attributes holding only the referenced vertices, in slot order.
    pub attributes: Vec<(String, AttributeBuffer)>,
    /// Morph targets compacted the same way.
    pub morph_attributes: Vec<(String, Vec<AttributeBuffer>)>,
    /// Triangle list over the compacted vertices.
    pub indices: IndexBuffer,
    pub mapper: IndexMapper,
}

impl Compacted {
    /// Number of compacted vertices.
    pub fn vertex_count(&self) -> usize {
        self.mapper.len()
    }

    /// Check if a non-empty position attribute survived compaction.
    pub fn has_positions(&self) -> bool {
        self.attributes
            .iter()
            .any(|(name, a)| name == crate::geometry::names::POSITION && !a.is_empty())
    }

    /// Build a geometry from the compacted buffers. The morph mode is taken
    /// from `source`; the result has no groups and no cached bounds.
    pub fn into_geometry(self, source: &Geometry) -> Geometry {
        let mut geometry = Geometry::new();
        for (name, attribute) in self.attributes {
            geometry.set_attribute(name, attribute);
        }
        for (name, targets) in self.morph_attributes {
            geometry.set_morph_attribute(name, targets);
        }
        geometry.morph_targets_relative = source.morph_targets_relative;
        geometry.set_index(Some(self.indices));
        geometry
    }
}

/// Incremental compactor over one source geometry.
///
/// Push every group drawn with the same material, then [`finish`](Self::finish).
/// Vertices are copied the first time a triangle references them; every
/// visit appends the vertex's slot to the index list, so winding and
/// degenerate triangles are kept.
pub struct IndexCompactor<'a> {
    geometry: &'a Geometry,
    vertex_count: usize,
    attributes: Vec<(String, AttributeBuffer)>,
    morph_attributes: Vec<(String, Vec<AttributeBuffer>)>,
    indices: Vec<u32>,
    mapper: IndexMapper,
}

impl<'a> IndexCompactor<'a> {
    pub fn new(geometry: &'a Geometry) -> Self {
        let attributes = geometry
            .attributes()
            .map(|(name, a)| (name.to_string(), labeled_like(a)))
            .collect();
        let morph_attributes = geometry
            .morph_attributes()
            .map(|(name, targets)| {
                (name.to_string(), targets.iter().map(labeled_like).collect())
            })
            .collect();
        let vertex_count = geometry.complete_vertex_count();
        if vertex_count < geometry.vertex_count() {
            log::warn!(
                "Attribute lengths differ, compacting only the first {} of {} vertices",
                vertex_count,
                geometry.vertex_count()
            );
        }
        Self {
            geometry,
            vertex_count,
            attributes,
            morph_attributes,
            indices: Vec::new(),
            mapper: IndexMapper::new(),
        }
    }

    /// Append the triangles of `group`.
    pub fn push_group(&mut self, group: &Group) {
        let draw_count = self.geometry.draw_count();
        let start = group.start.min(draw_count);
        let end = group.start.saturating_add(group.count).min(draw_count);
        if end - start != group.count {
            log::warn!(
                "Group {}..{} exceeds draw range {}, clamping",
                group.start,
                group.start.saturating_add(group.count),
                draw_count
            );
        }
        let usable = (end - start) / 3 * 3;
        if usable != end - start {
            log::warn!(
                "Group at {} has {} trailing entries that do not form a triangle",
                group.start,
                end - start - usable
            );
        }

        let mut dropped = 0;
        for first in (start..start + usable).step_by(3) {
            let triangle = [
                self.source_index(first),
                self.source_index(first + 1),
                self.source_index(first + 2),
            ];
            if triangle.iter().any(|&v| v as usize >= self.vertex_count) {
                dropped += 1;
                continue;
            }
            for v in triangle {
                let (slot, fresh) = self.mapper.map(v);
                if fresh {
                    let copied = self.copy_vertex(v as usize);
                    debug_assert!(copied, "vertex {v} is below the complete vertex count");
                }
                self.indices.push(slot);
            }
        }
        if dropped > 0 {
            log::warn!(
                "Group at {}: dropped {} triangles referencing vertices past {}",
                group.start,
                dropped,
                self.vertex_count
            );
        }
    }

    fn source_index(&self, position: usize) -> u32 {
        match self.geometry.index() {
            Some(index) => index.get(position).unwrap_or(u32::MAX),
            None => position as u32,
        }
    }

    /// Append vertex `v` of every source buffer. Returns `false` if any
    /// buffer could not supply it.
    fn copy_vertex(&mut self, v: usize) -> bool {
        let mut complete = true;
        for ((_, out), (_, src)) in self.attributes.iter_mut().zip(self.geometry.attributes()) {
            complete &= out.push_item_from(src, v);
        }
        for ((_, outs), (_, srcs)) in self
            .morph_attributes
            .iter_mut()
            .zip(self.geometry.morph_attributes())
        {
            for (out, src) in outs.iter_mut().zip(srcs) {
                complete &= out.push_item_from(src, v);
            }
        }
        complete
    }

    /// Finish compaction. An indexed source keeps its index format; otherwise
    /// the smallest format for the compacted vertex count is used.
    pub fn finish(self) -> Compacted {
        let format = match self.geometry.index() {
            Some(index) => index.format(),
            None => IndexFormat::for_vertex_count(self.mapper.len()),
        };
        Compacted {
            attributes: self.attributes,
            morph_attributes: self.morph_attributes,
            indices: IndexBuffer::new(format, self.indices),
            mapper: self.mapper,
        }
    }
}

fn labeled_like(source: &AttributeBuffer) -> AttributeBuffer {
    let mut out = source.empty_like(0);
    out.name = source.name.clone();
    out
}

/// Compact the vertices referenced by `groups` of `geometry`.
pub fn compact(geometry: &Geometry, groups: &[Group]) -> Compacted {
    profile_function!();

    let mut compactor = IndexCompactor::new(geometry);
    for group in groups {
        compactor.push_group(group);
    }
    let compacted = compactor.finish();
    log::debug!(
        "Compacted {} groups: {} of {} vertices, {} indices",
        groups.len(),
        compacted.vertex_count(),
        geometry.vertex_count(),
        compacted.indices.len()
    );
    compacted
}
