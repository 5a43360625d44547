use std::collections::HashMap;
use std::path::PathBuf;

use glam::Mat4;
use id_arena::{Arena, Id};

use crate::error::Result;
use crate::geometry::{Geometry, Shape};
use crate::scene_graph::node::{NodeId, SceneNode};

pub type GeometryId = Id<Geometry>;

/// Where a geometry comes from. Nodes asking for the same source share one
/// geometry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GeometrySource {
    Shape(Shape),
    Mesh { path: PathBuf, unit: Option<String> },
    Beam,
}

/// A node instantiating a geometry at its world matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Instance {
    pub node_id: NodeId,
    pub geometry_id: GeometryId,
    pub world_matrix: Mat4,
}

#[derive(Default)]
pub struct Scene {
    pub nodes: Arena<SceneNode>,
    pub geometries: Arena<Geometry>,
    geometry_by_source: HashMap<GeometrySource, GeometryId>,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            nodes: Arena::new(),
            geometries: Arena::new(),
            geometry_by_source: HashMap::new(),
        }
    }

    pub fn add_node(&mut self, node: SceneNode) -> NodeId {
        self.nodes.alloc(node)
    }

    pub fn add_child(&mut self, parent_id: NodeId, mut node: SceneNode) -> NodeId {
        node.parent_id = Some(parent_id);
        let node_id = self.add_node(node);
        if let Some(parent) = self.nodes.get_mut(parent_id) {
            parent.child_ids.push(node_id);
        }
        node_id
    }

    pub fn get_node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id)
    }

    pub fn get_node_by_name(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|(_, node)| node.name == name)
            .map(|(id, _)| id)
    }

    /// Nodes without a parent, in insertion order.
    pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .filter(|(_, node)| node.parent_id.is_none())
            .map(|(id, _)| id)
    }

    /// Returns the geometry registered for `source`, loading it on first use.
    pub fn geometry_for(
        &mut self,
        source: GeometrySource,
        load: impl FnOnce() -> Result<Geometry>,
    ) -> Result<GeometryId> {
        if let Some(&geometry_id) = self.geometry_by_source.get(&source) {
            return Ok(geometry_id);
        }

        let geometry = load()?;
        log::debug!(
            "Added geometry `{}` ({} vertices) for {:?}",
            geometry.name,
            geometry.vertices.len(),
            source
        );

        let geometry_id = self.geometries.alloc(geometry);
        self.geometry_by_source.insert(source, geometry_id);

        Ok(geometry_id)
    }

    pub fn geometry(&self, id: GeometryId) -> Option<&Geometry> {
        self.geometries.get(id)
    }

    /// Geometries in the order they were added.
    pub fn geometries(&self) -> impl Iterator<Item = (GeometryId, &Geometry)> {
        self.geometries.iter()
    }

    /// Every node carrying a geometry, depth first from the roots.
    pub fn instances(&self) -> Vec<Instance> {
        let mut instances = Vec::new();
        for root_id in self.roots() {
            self.collect_instances(root_id, Mat4::IDENTITY, &mut instances);
        }
        instances
    }

    fn collect_instances(&self, node_id: NodeId, parent_world: Mat4, instances: &mut Vec<Instance>) {
        let Some(node) = self.get_node(node_id) else {
            return;
        };

        let world_matrix = parent_world * node.local_matrix();
        if let Some(geometry_id) = node.geometry_id {
            instances.push(Instance {
                node_id,
                geometry_id,
                world_matrix,
            });
        }

        for &child_id in &node.child_ids {
            self.collect_instances(child_id, world_matrix, instances);
        }
    }
}
