pub mod affine;
pub mod bounds;

pub use affine::TransformKind;
pub use bounds::AABB;
