//! Geometry generators for common shapes.
//!
//! Used by tests, benchmarks and the demo to build inputs without a file
//! loader.

use std::f32::consts::PI;

use super::buffer::AttributeBuffer;
use super::data::{names, Geometry, IndexBuffer, IndexFormat};

/// Corner `i` of a box: bit 0 selects +X, bit 1 +Y, bit 2 +Z.
fn box_corner(i: u32, half: f32) -> [f32; 3] {
    let sign = |bit: u32| if i & bit != 0 { half } else { -half };
    [sign(1), sign(2), sign(4)]
}

/// Two counter-clockwise triangles per face, in the order +X, -X, +Y, -Y, +Z, -Z.
const BOX_FACES: [[u32; 6]; 6] = [
    [1, 3, 7, 1, 7, 5],
    [0, 4, 6, 0, 6, 2],
    [2, 6, 7, 2, 7, 3],
    [0, 1, 5, 0, 5, 4],
    [4, 5, 7, 4, 7, 6],
    [0, 2, 3, 0, 3, 1],
];

/// Generate an 8-vertex indexed box with one draw group per face.
///
/// Faces are emitted in the order +X, -X, +Y, -Y, +Z, -Z; `face_materials`
/// gives the material index of each face's group. Corners are shared between
/// faces, so the box carries positions only.
///
/// # Arguments
///
/// * `half_extent` - Half the edge length
/// * `face_materials` - Material index per face
pub fn generate_box(half_extent: f32, face_materials: [usize; 6]) -> Geometry {
    let positions: Vec<f32> = (0..8).flat_map(|i| box_corner(i, half_extent)).collect();
    let indices: Vec<u32> = BOX_FACES.iter().flatten().copied().collect();

    let mut geometry = Geometry::new()
        .with_attribute(names::POSITION, AttributeBuffer::from_f32(positions, 3))
        .with_index(IndexBuffer::new(IndexFormat::Uint16, indices))
        .with_label("box");
    for (face, &material) in face_materials.iter().enumerate() {
        geometry.add_group(face * 6, 6, material);
    }
    geometry
}

/// Generate a UV sphere with positions, normals and texture coordinates.
///
/// The mesh has `(rings + 1) * (segments + 1)` vertices and
/// `rings * segments * 6` indices and declares no groups.
///
/// # Arguments
///
/// * `radius` - Sphere radius
/// * `segments` - Number of longitudinal segments (around the equator)
/// * `rings` - Number of latitudinal rings (from pole to pole)
pub fn generate_sphere(radius: f32, segments: u32, rings: u32) -> Geometry {
    let vertex_count = ((rings + 1) * (segments + 1)) as usize;
    let mut positions = Vec::with_capacity(vertex_count * 3);
    let mut normals = Vec::with_capacity(vertex_count * 3);
    let mut uvs = Vec::with_capacity(vertex_count * 2);
    let mut indices = Vec::new();

    for ring in 0..=rings {
        let theta = ring as f32 * PI / rings as f32;
        let sin_theta = theta.sin();
        let cos_theta = theta.cos();

        for segment in 0..=segments {
            let phi = segment as f32 * 2.0 * PI / segments as f32;
            let x = sin_theta * phi.cos();
            let y = cos_theta;
            let z = sin_theta * phi.sin();

            positions.extend_from_slice(&[x * radius, y * radius, z * radius]);
            normals.extend_from_slice(&[x, y, z]);
            uvs.extend_from_slice(&[segment as f32 / segments as f32, ring as f32 / rings as f32]);
        }
    }

    for ring in 0..rings {
        for segment in 0..segments {
            let current = ring * (segments + 1) + segment;
            let next = current + segments + 1;

            indices.extend_from_slice(&[current, next, current + 1]);
            indices.extend_from_slice(&[current + 1, next, next + 1]);
        }
    }

    Geometry::new()
        .with_attribute(names::POSITION, AttributeBuffer::from_f32(positions, 3))
        .with_attribute(names::NORMAL, AttributeBuffer::from_f32(normals, 3))
        .with_attribute(names::UV, AttributeBuffer::from_f32(uvs, 2))
        .with_index(IndexBuffer::new(
            IndexFormat::for_vertex_count(vertex_count),
            indices,
        ))
        .with_label("sphere")
}
