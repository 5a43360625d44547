use glam::Mat4;
use id_arena::Id;

use crate::scene_graph::scene::{GeometryId, Scene};

pub type NodeId = Id<SceneNode>;

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub name: String,
    /// Local matrix; `None` leaves the node at its parent's origin.
    pub matrix: Option<Mat4>,
    pub geometry_id: Option<GeometryId>,
    pub parent_id: Option<NodeId>,
    pub child_ids: Vec<NodeId>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_matrix(mut self, matrix: Mat4) -> Self {
        self.matrix = Some(matrix);
        self
    }

    pub fn with_geometry(mut self, geometry_id: GeometryId) -> Self {
        self.geometry_id = Some(geometry_id);
        self
    }

    pub fn local_matrix(&self) -> Mat4 {
        self.matrix.unwrap_or(Mat4::IDENTITY)
    }

    pub fn children<'a, 'b>(&'a self, scene: &'b Scene) -> impl Iterator<Item = &'b SceneNode> + 'b
    where
        'a: 'b,
    {
        self.child_ids.iter().filter_map(move |id| scene.get_node(*id))
    }
}

impl Default for SceneNode {
    fn default() -> Self {
        Self {
            name: String::new(),
            matrix: None,
            geometry_id: None,
            parent_id: None,
            child_ids: Vec::new(),
        }
    }
}
