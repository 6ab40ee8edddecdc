//! Transform math shared by the codecs.
//!
//! Decoded joints carry their transforms as explicit translation/rotation/
//! scale triples ([`Trs`]); legacy formats that store a single flattened
//! matrix go through [`decompose_mtx4`] to recover them.

use glam::{Mat3, Mat4, Quat, Vec3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Scales below this are treated as degenerate rather than divided by.
const SCALE_EPSILON: f32 = 1e-6;

/// A translation/rotation/scale transform.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Trs {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Trs {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Decompose an affine matrix into a [`Trs`].
    pub fn from_mtx4(matrix: &Mat4) -> Self {
        let (translation, rotation, scale) = decompose_mtx4(matrix);
        Self {
            translation,
            rotation,
            scale,
        }
    }
}

impl Default for Trs {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Decompose an affine matrix into translation, rotation and scale.
///
/// Unlike a naive decomposition this never divides by a near-zero scale:
/// a degenerate axis reports scale 0.0 and the rotation falls back to
/// identity instead of going NaN.
pub fn decompose_mtx4(matrix: &Mat4) -> (Vec3, Quat, Vec3) {
    let translation = matrix.w_axis.truncate();

    let x_axis = matrix.x_axis.truncate();
    let y_axis = matrix.y_axis.truncate();
    let z_axis = matrix.z_axis.truncate();

    let mut sx = x_axis.length();
    let sy = y_axis.length();
    let sz = z_axis.length();

    // A negative determinant means one axis is mirrored; fold the sign
    // into the x scale so the rotation stays proper.
    if Mat3::from_cols(x_axis, y_axis, z_axis).determinant() < 0.0 {
        sx = -sx;
    }

    if sx.abs() < SCALE_EPSILON || sy < SCALE_EPSILON || sz < SCALE_EPSILON {
        let clamp = |s: f32| if s.abs() < SCALE_EPSILON { 0.0 } else { s };
        return (
            translation,
            Quat::IDENTITY,
            Vec3::new(clamp(sx), clamp(sy), clamp(sz)),
        );
    }

    let rotation = Quat::from_mat3(&Mat3::from_cols(
        x_axis / sx,
        y_axis / sy,
        z_axis / sz,
    ))
    .normalize();

    (translation, rotation, Vec3::new(sx, sy, sz))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decompose_pure_translation() {
        let m = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let (t, r, s) = decompose_mtx4(&m);

        assert_eq!(t, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(r, Quat::IDENTITY);
        assert_eq!(s, Vec3::ONE);
    }

    #[test]
    fn test_decompose_rotation_and_scale() {
        let rotation = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let m = Mat4::from_scale_rotation_translation(
            Vec3::new(2.0, 2.0, 2.0),
            rotation,
            Vec3::new(0.5, 0.0, -1.0),
        );
        let (t, r, s) = decompose_mtx4(&m);

        assert!((t - Vec3::new(0.5, 0.0, -1.0)).length() < 1e-5);
        assert!((s - Vec3::splat(2.0)).length() < 1e-5);
        assert!(r.dot(rotation).abs() > 0.9999);
    }

    #[test]
    fn test_decompose_degenerate_scale_no_nan() {
        let m = Mat4::from_scale(Vec3::new(0.0, 1.0, 1.0));
        let (t, r, s) = decompose_mtx4(&m);

        assert_eq!(t, Vec3::ZERO);
        assert_eq!(r, Quat::IDENTITY);
        assert_eq!(s, Vec3::new(0.0, 1.0, 1.0));
        assert!(s.is_finite());
    }
}
