//! Conversions between the file's Z-X-Y axis order and a right-handed
//! X-Y-Z host convention.
//!
//! The codec itself never converts; these are for consumers placing decoded
//! geometry into a scene, or preparing scene geometry for [`crate::builder`].

use crate::io::Vec3;
use crate::records::Transform;

/// File Z becomes host X, file X becomes host Y, file Y becomes host Z.
pub fn zxy_to_xyz(v: Vec3) -> Vec3 {
    [v[2], v[0], v[1]]
}

/// Inverse of [`zxy_to_xyz`].
pub fn xyz_to_zxy(v: Vec3) -> Vec3 {
    [v[1], v[2], v[0]]
}

/// Texture V runs downwards in the file.
pub fn flip_uv(uv: [f32; 2]) -> [f32; 2] {
    [uv[0], 1.0 - uv[1]]
}

/// Column-major 4x4 host matrix for a stored transform.
///
/// Column `k` is the stored axis that maps onto host axis `k`, converted
/// with [`zxy_to_xyz`]; column 3 is the converted position.
pub fn transform_matrix(t: &Transform) -> [[f32; 4]; 4] {
    let [x, y, z] = t.axes;
    let col = |v: Vec3, w: f32| {
        let [a, b, c] = zxy_to_xyz(v);
        [a, b, c, w]
    };
    [col(z, 0.0), col(x, 0.0), col(y, 0.0), col(t.position, 1.0)]
}

/// Inverse of [`transform_matrix`]. The bottom row is ignored.
pub fn transform_from_matrix(m: &[[f32; 4]; 4]) -> Transform {
    let col = |k: usize| xyz_to_zxy([m[k][0], m[k][1], m[k][2]]);
    Transform {
        axes: [col(1), col(2), col(0)],
        position: col(3),
    }
}
