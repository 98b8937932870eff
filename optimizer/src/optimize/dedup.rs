//! Vertex deduplication: turning a non-indexed triangle soup into indexed
//! geometry by merging vertices that are equal within a tolerance.

use std::collections::HashMap;

use crate::geometry::{names, AttributeBuffer, Geometry, IndexBuffer, IndexFormat};
use crate::profiling::{profile_function, profile_plot};

use super::options::sanitize_tolerance;

/// Spatial hash cell of a vertex's key attribute (up to three components).
type CellKey = [i64; 3];

/// Merge vertices whose attributes all agree within `tolerance` and return the
/// equivalent indexed geometry.
///
/// Two vertices are merged when every component of every attribute and of
/// every morph target differs by at most `tolerance`. Merged vertices are
/// numbered in order of first occurrence and keep the values of that first
/// occurrence. The resulting index buffer has one entry per input vertex, so
/// draw groups carry over unchanged.
///
/// Geometry that already has an index is returned as an unchanged copy.
/// A negative or NaN tolerance is treated as zero.
pub fn indexify(geometry: &Geometry, tolerance: f32) -> Geometry {
    profile_function!();

    if geometry.is_indexed() {
        log::debug!("Geometry is already indexed, skipping deduplication");
        return geometry.clone();
    }
    let tolerance = sanitize_tolerance(tolerance);

    let channels = Channels::new(geometry);
    let vertex_count = channels.vertex_count();
    let mut welder = Welder::new(&channels, tolerance);
    let indices: Vec<u32> = (0..vertex_count).map(|v| welder.insert(v)).collect();
    let representatives = welder.into_representatives();
    profile_plot!("welded_vertices", representatives.len());

    let mut result = Geometry::new();
    for (name, attribute) in geometry.attributes() {
        result.set_attribute(name, gather(attribute, &representatives));
    }
    for (name, targets) in geometry.morph_attributes() {
        let targets = targets
            .iter()
            .map(|target| gather(target, &representatives))
            .collect();
        result.set_morph_attribute(name, targets);
    }
    result.morph_targets_relative = geometry.morph_targets_relative;
    for group in geometry.groups() {
        result.add_group(group.start, group.count, group.material_index);
    }
    if let Some(label) = geometry.label() {
        result = result.with_label(label);
    }
    result.set_index(Some(IndexBuffer::new(
        IndexFormat::for_vertex_count(representatives.len()),
        indices,
    )));

    log::debug!(
        "Deduplicated {} vertices into {} (tolerance {})",
        vertex_count,
        representatives.len(),
        tolerance
    );
    result
}

/// Expand indexed geometry back into a triangle soup with one vertex per
/// index entry. Non-indexed geometry is returned as a copy.
///
/// Triangles referencing a vertex out of range are dropped; draw groups are
/// shifted to match.
pub fn deindex(geometry: &Geometry) -> Geometry {
    profile_function!();

    let Some(index) = geometry.index() else {
        return geometry.clone();
    };
    let vertex_count = geometry.complete_vertex_count();
    let triangles = index.len() / 3;

    // emitted[t] = output vertices written before triangle t
    let mut emitted = Vec::with_capacity(triangles + 1);
    let mut order = Vec::with_capacity(triangles * 3);
    let mut dropped = 0;
    for triangle in index.indices().chunks_exact(3) {
        emitted.push(order.len());
        if triangle.iter().any(|&i| i as usize >= vertex_count) {
            dropped += 1;
            continue;
        }
        order.extend(triangle.iter().map(|&i| i as usize));
    }
    emitted.push(order.len());
    if dropped > 0 {
        log::warn!("Dropped {dropped} triangles referencing missing vertices");
    }

    let mut result = Geometry::new();
    for (name, attribute) in geometry.attributes() {
        result.set_attribute(name, gather(attribute, &order));
    }
    for (name, targets) in geometry.morph_attributes() {
        let targets = targets.iter().map(|target| gather(target, &order)).collect();
        result.set_morph_attribute(name, targets);
    }
    result.morph_targets_relative = geometry.morph_targets_relative;
    for group in geometry.groups() {
        let first = (group.start / 3).min(triangles);
        let last = ((group.start + group.count) / 3).min(triangles);
        result.add_group(emitted[first], emitted[last] - emitted[first], group.material_index);
    }
    if let Some(label) = geometry.label() {
        result = result.with_label(label);
    }
    result
}

/// Copy the items at `order` out of `source`, keeping its layout and name.
fn gather(source: &AttributeBuffer, order: &[usize]) -> AttributeBuffer {
    let mut out = source.empty_like(order.len());
    out.name = source.name.clone();
    for &v in order {
        out.push_item_from(source, v);
    }
    out
}

/// Every buffer that takes part in the vertex comparison.
struct Channels<'a> {
    buffers: Vec<&'a AttributeBuffer>,
    /// Buffer used to bucket vertices spatially.
    key: Option<&'a AttributeBuffer>,
}

impl<'a> Channels<'a> {
    fn new(geometry: &'a Geometry) -> Self {
        let buffers: Vec<&AttributeBuffer> = geometry
            .attributes()
            .map(|(_, a)| a)
            .chain(geometry.morph_attributes().flat_map(|(_, t)| t.iter()))
            .collect();
        let key = geometry
            .attribute(names::POSITION)
            .or_else(|| buffers.first().copied());
        Self { buffers, key }
    }

    /// Vertices present in every buffer.
    fn vertex_count(&self) -> usize {
        let count = self
            .buffers
            .iter()
            .map(|b| b.count())
            .min()
            .unwrap_or(0);
        if self.buffers.iter().any(|b| b.count() != count) {
            log::warn!(
                "Attribute lengths differ, deduplicating only the first {count} vertices"
            );
        }
        count
    }

    fn equal(&self, a: usize, b: usize, tolerance: f64) -> bool {
        self.buffers.iter().all(|buffer| {
            (0..buffer.item_size()).all(|c| match (buffer.get(a, c), buffer.get(b, c)) {
                (Some(x), Some(y)) => (x - y).abs() <= tolerance,
                _ => false,
            })
        })
    }
}

/// Assigns each vertex to the first earlier vertex it matches.
struct Welder<'c, 'a> {
    channels: &'c Channels<'a>,
    tolerance: f32,
    /// First vertex of each merged class, in class order.
    representatives: Vec<usize>,
    cells: HashMap<CellKey, Vec<u32>>,
}

impl<'c, 'a> Welder<'c, 'a> {
    fn new(channels: &'c Channels<'a>, tolerance: f32) -> Self {
        Self {
            channels,
            tolerance,
            representatives: Vec::new(),
            cells: HashMap::new(),
        }
    }

    fn dims(&self) -> usize {
        self.channels.key.map_or(0, |k| k.item_size().min(3))
    }

    fn cell_of(&self, vertex: usize) -> CellKey {
        let mut cell = [0i64; 3];
        let Some(key) = self.channels.key else {
            return cell;
        };
        for (c, slot) in cell.iter_mut().enumerate().take(self.dims()) {
            let value = key.get(vertex, c).unwrap_or(0.0);
            *slot = if self.tolerance > 0.0 {
                (value / self.tolerance as f64).floor() as i64
            } else {
                (value as f32 + 0.0).to_bits() as i64
            };
        }
        cell
    }

    /// Cells that may hold a match for a vertex in `cell`.
    fn neighborhood(&self, cell: CellKey) -> Vec<CellKey> {
        if self.tolerance == 0.0 {
            return vec![cell];
        }
        let mut out = vec![cell];
        for dim in 0..self.dims() {
            let mut next = Vec::with_capacity(out.len() * 3);
            for base in &out {
                for offset in [-1i64, 0, 1] {
                    let mut neighbor = *base;
                    neighbor[dim] = neighbor[dim].saturating_add(offset);
                    next.push(neighbor);
                }
            }
            out = next;
        }
        out
    }

    fn insert(&mut self, vertex: usize) -> u32 {
        let cell = self.cell_of(vertex);
        let tolerance = self.tolerance as f64;
        let found = self
            .neighborhood(cell)
            .iter()
            .filter_map(|n| self.cells.get(n))
            .flatten()
            .copied()
            .filter(|&class| {
                self.channels
                    .equal(self.representatives[class as usize], vertex, tolerance)
            })
            .min();
        if let Some(class) = found {
            return class;
        }

        let class = self.representatives.len() as u32;
        self.representatives.push(vertex);
        self.cells.entry(cell).or_default().push(class);
        class
    }

    fn into_representatives(self) -> Vec<usize> {
        self.representatives
    }
}
