use glam::{DMat4, DVec3, DVec4};

use crate::config::Handedness;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformKind {
    Translation,
    Rotation,
}

impl TransformKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "translation" => Some(Self::Translation),
            "rotation" => Some(Self::Rotation),
            _ => None,
        }
    }
}

// Swaps the y and z basis vectors; its own inverse.
const SWAP_YZ: DMat4 = DMat4::from_cols(DVec4::X, DVec4::Z, DVec4::Y, DVec4::W);

/// Rotation by `angle` radians about `axis`, followed by a shift by `offset`.
///
/// The axis is normalized first. Returns `None` for a zero or non-finite axis.
pub fn rotation(angle: f64, axis: DVec3, offset: DVec3) -> Option<DMat4> {
    let axis = axis.try_normalize()?;
    let mut matrix = DMat4::from_axis_angle(axis, angle);
    matrix.w_axis = offset.extend(1.0);

    Some(matrix)
}

pub fn translation(translation: DVec3, offset: DVec3) -> DMat4 {
    DMat4::from_translation(translation + offset)
}

/// Builds the local matrix of a single transformation step.
///
/// For translations `magnitude` scales the (unnormalized) axis, for rotations
/// it is the angle in radians.
pub fn affine(
    kind: TransformKind,
    axis: DVec3,
    magnitude: f64,
    offset: DVec3,
    handedness: Handedness,
) -> Option<DMat4> {
    let matrix = match kind {
        TransformKind::Translation => translation(axis * magnitude, offset),
        TransformKind::Rotation => rotation(magnitude, axis, offset)?,
    };

    Some(match handedness {
        Handedness::Right => matrix,
        Handedness::Left => SWAP_YZ * matrix * SWAP_YZ,
    })
}

pub fn is_affine(matrix: &DMat4) -> bool {
    matrix.row(3) == DVec4::W
}
