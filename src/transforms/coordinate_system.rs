use std::collections::BTreeMap;
use std::fmt;

use glam::{DMat4, DVec3};

use crate::transforms::FrameMap;

/// Origin and axes of a frame expressed in the laboratory system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateSystem {
    pub origin: DVec3,
    pub x_axis: DVec3,
    pub y_axis: DVec3,
    pub z_axis: DVec3,
}

impl CoordinateSystem {
    pub fn from_matrix(matrix: &DMat4) -> Self {
        Self {
            origin: matrix.transform_point3(DVec3::ZERO),
            x_axis: matrix.transform_vector3(DVec3::X),
            y_axis: matrix.transform_vector3(DVec3::Y),
            z_axis: matrix.transform_vector3(DVec3::Z),
        }
    }
}

impl fmt::Display for CoordinateSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "origin {:.6} x {:.6} y {:.6} z {:.6}",
            self.origin, self.x_axis, self.y_axis, self.z_axis
        )
    }
}

/// Coordinate system of the primary matrix of every frame.
pub fn coordinate_systems(frames: &FrameMap) -> BTreeMap<String, CoordinateSystem> {
    frames
        .iter()
        .map(|(name, frame)| (name.clone(), CoordinateSystem::from_matrix(&frame.primary())))
        .collect()
}

/// Angle between two vectors in radians, or NaN when either has zero length.
pub fn angle_between(a: DVec3, b: DVec3) -> f64 {
    let (a, b) = (a.normalize(), b.normalize());
    a.dot(b).clamp(-1.0, 1.0).acos()
}

#[cfg(test)]
mod test {
    use std::f64::consts::FRAC_PI_2;

    use super::*;

    #[test]
    fn axes_follow_the_matrix() {
        let matrix = DMat4::from_translation(DVec3::new(1.0, 2.0, 3.0))
            * DMat4::from_rotation_z(FRAC_PI_2);
        let system = CoordinateSystem::from_matrix(&matrix);

        assert!(system.origin.abs_diff_eq(DVec3::new(1.0, 2.0, 3.0), 1e-12));
        assert!(system.x_axis.abs_diff_eq(DVec3::Y, 1e-12));
        assert!(system.y_axis.abs_diff_eq(DVec3::NEG_X, 1e-12));
        assert!(system.z_axis.abs_diff_eq(DVec3::Z, 1e-12));
    }

    #[test]
    fn angles_are_clamped() {
        assert_eq!(angle_between(DVec3::X, DVec3::X * 3.0), 0.0);
        assert!((angle_between(DVec3::X, DVec3::Y) - FRAC_PI_2).abs() < 1e-12);
        assert!(angle_between(DVec3::ZERO, DVec3::X).is_nan());
    }
}
