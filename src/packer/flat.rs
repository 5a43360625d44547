use glam::Vec3;

use crate::error::Result;
use crate::geometry::stl::stl_bytes;
use crate::geometry::{Geometry, PrimitiveMode};
use crate::math::AABB;
use crate::scene_graph::Scene;

/// Where one placed instance ended up in the fused mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshInfo {
    pub name: String,
    pub index_count: usize,
    pub first_index: usize,
    pub vertex_offset: usize,
    pub bounds: Option<AABB>,
}

pub struct BakedMesh {
    pub geometry: Geometry,
    pub meshes: Vec<MeshInfo>,
}

/// Transforms every triangle geometry placed in the scene into world space
/// and fuses them into one indexed mesh. Line geometries are skipped.
pub fn bake_scene(scene: &Scene) -> Result<BakedMesh> {
    let mut vertices: Vec<Vec3> = Vec::new();
    let mut indices: Vec<u32> = Vec::new();
    let mut meshes = Vec::new();

    for instance in scene.instances() {
        let Some(geometry) = scene.geometry(instance.geometry_id) else {
            continue;
        };
        if geometry.mode != PrimitiveMode::Triangles {
            continue;
        }

        let placed = geometry.transformed(&instance.world_matrix);
        let vertex_offset = vertices.len();
        let first_index = indices.len();

        vertices.extend(placed.vertices.iter());
        indices.extend(placed.indices.iter().map(|i| i + vertex_offset as u32));

        meshes.push(MeshInfo {
            name: scene
                .get_node(instance.node_id)
                .map_or_else(String::new, |node| node.name.clone()),
            index_count: placed.indices.len(),
            first_index,
            vertex_offset,
            bounds: placed.bounds(),
        });
    }

    let geometry = Geometry::new("scene", PrimitiveMode::Triangles, &indices, vertices)?;

    Ok(BakedMesh { geometry, meshes })
}

/// The whole scene as one binary STL file.
pub fn pack(scene: &Scene) -> Result<Vec<u8>> {
    let baked = bake_scene(scene)?;

    for mesh in &baked.meshes {
        log::debug!(
            "Placed `{}`: {} triangles from vertex {}",
            mesh.name,
            mesh.index_count / 3,
            mesh.vertex_offset
        );
    }

    stl_bytes(&baked.geometry.triangles())
}

#[cfg(test)]
mod test {
    use glam::Mat4;

    use super::*;
    use crate::geometry::stl::parse_stl;
    use crate::geometry::{beam, cube, Shape};
    use crate::scene_graph::{GeometrySource, SceneNode};

    fn two_cubes_and_a_beam() -> Scene {
        let mut scene = Scene::new();
        let cube_id = scene
            .geometry_for(GeometrySource::Shape(Shape::Cube), || Ok(cube(1.0)))
            .unwrap();
        let beam_id = scene
            .geometry_for(GeometrySource::Beam, || Ok(beam(Vec3::NEG_Z)))
            .unwrap();

        scene.add_node(SceneNode::new("a").with_geometry(cube_id));
        scene.add_node(
            SceneNode::new("b")
                .with_geometry(cube_id)
                .with_matrix(Mat4::from_translation(Vec3::X * 5.0)),
        );
        scene.add_node(SceneNode::new("beam").with_geometry(beam_id));
        scene
    }

    #[test]
    fn instances_are_fused_in_world_space() {
        let baked = bake_scene(&two_cubes_and_a_beam()).unwrap();

        assert_eq!(baked.meshes.len(), 2);
        assert_eq!(baked.geometry.vertices.len(), 16);
        assert_eq!(baked.meshes[1].first_index, 36);
        assert_eq!(baked.meshes[1].vertex_offset, 8);

        let bounds = baked.geometry.bounds().unwrap();
        assert_eq!(bounds.min.x, -0.5);
        assert_eq!(bounds.max.x, 5.5);
    }

    #[test]
    fn stl_holds_every_triangle() {
        let bytes = pack(&two_cubes_and_a_beam()).unwrap();
        let triangles = parse_stl(&bytes).unwrap();

        assert_eq!(triangles.len(), 24);
    }
}
