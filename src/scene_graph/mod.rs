pub mod node;
pub mod scene;

pub use node::{NodeId, SceneNode};
pub use scene::{GeometryId, GeometrySource, Instance, Scene};
