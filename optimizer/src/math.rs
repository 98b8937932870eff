//! Math type aliases and helper functions.

pub use nalgebra;

/// 3D vector (f32).
pub type Vec3 = nalgebra::Vector3<f32>;

/// 4x4 matrix (f32).
pub type Mat4 = nalgebra::Matrix4<f32>;

/// Quaternion (f32). Stored as `[x, y, z, w]` in memory.
/// Use [`quat_from_array`] or `Quaternion::new(w, x, y, z)` to construct.
pub type Quat = nalgebra::Quaternion<f32>;

/// Build a 4x4 TRS matrix from scale, rotation (quaternion), and translation.
pub fn mat4_from_scale_rotation_translation(
    scale: Vec3,
    rotation: Quat,
    translation: Vec3,
) -> Mat4 {
    let r = nalgebra::UnitQuaternion::new_normalize(rotation);
    let m = r.to_rotation_matrix();
    let rm = m.matrix();
    #[rustfmt::skip]
    let result = Mat4::new(
        rm[(0, 0)] * scale.x, rm[(0, 1)] * scale.y, rm[(0, 2)] * scale.z, translation.x,
        rm[(1, 0)] * scale.x, rm[(1, 1)] * scale.y, rm[(1, 2)] * scale.z, translation.y,
        rm[(2, 0)] * scale.x, rm[(2, 1)] * scale.y, rm[(2, 2)] * scale.z, translation.z,
        0.0,                  0.0,                  0.0,                  1.0,
    );
    result
}

/// Create a quaternion from a `[x, y, z, w]` array.
pub fn quat_from_array(a: [f32; 4]) -> Quat {
    nalgebra::Quaternion::new(a[3], a[0], a[1], a[2])
}

/// Invert a matrix, falling back to identity for singular input.
pub fn inverse_or_identity(m: &Mat4) -> Mat4 {
    m.try_inverse().unwrap_or_else(|| {
        log::warn!("Singular matrix has no inverse, using identity");
        Mat4::identity()
    })
}
