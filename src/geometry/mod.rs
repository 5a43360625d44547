//! Vertex/index data for everything that can be placed in a scene: the
//! built-in placeholder solids, the beam line and meshes read from STL files.

mod indexing;
mod shapes;
pub mod stl;

pub use indexing::IndexWidth;
pub use shapes::{beam, cone, cube, Shape};

use glam::{Mat4, Vec3};
use itertools::Itertools;

use crate::error::{ConversionError, Result};
use crate::math::AABB;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveMode {
    Triangles,
    Lines,
}

impl PrimitiveMode {
    pub fn vertices_per_primitive(self) -> usize {
        match self {
            PrimitiveMode::Triangles => 3,
            PrimitiveMode::Lines => 2,
        }
    }
}

/// Index data stored at the narrowest width that fits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Indices {
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl Indices {
    pub fn width(&self) -> IndexWidth {
        match self {
            Indices::U8(_) => IndexWidth::U8,
            Indices::U16(_) => IndexWidth::U16,
            Indices::U32(_) => IndexWidth::U32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Indices::U8(indices) => indices.len(),
            Indices::U16(indices) => indices.len(),
            Indices::U32(indices) => indices.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Indices::U8(indices) => indices.as_slice(),
            Indices::U16(indices) => bytemuck::cast_slice(indices),
            Indices::U32(indices) => bytemuck::cast_slice(indices),
        }
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = u32> + '_> {
        match self {
            Indices::U8(indices) => Box::new(indices.iter().map(|&i| u32::from(i))),
            Indices::U16(indices) => Box::new(indices.iter().map(|&i| u32::from(i))),
            Indices::U32(indices) => Box::new(indices.iter().copied()),
        }
    }

    pub fn min_max(&self) -> Option<(u32, u32)> {
        self.iter().minmax().into_option()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub name: String,
    pub mode: PrimitiveMode,
    pub indices: Indices,
    pub vertices: Vec<Vec3>,
}

impl Geometry {
    /// Builds a geometry from wide indices, narrowing them to the smallest width that fits.
    pub fn new(
        name: impl Into<String>,
        mode: PrimitiveMode,
        indices: &[u32],
        vertices: Vec<Vec3>,
    ) -> Result<Self> {
        let name = name.into();

        if indices.len() % mode.vertices_per_primitive() != 0 {
            return Err(ConversionError::geometry_mismatch(format!(
                "`{name}` has {} indices, not a multiple of {}",
                indices.len(),
                mode.vertices_per_primitive()
            )));
        }

        if let Some(&out_of_range) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(ConversionError::geometry_mismatch(format!(
                "`{name}` references vertex {out_of_range} but has only {} vertices",
                vertices.len()
            )));
        }

        let indices = IndexWidth::narrowest_for(&name, vertices.len())?.narrow(indices);

        Ok(Self {
            name,
            mode,
            indices,
            vertices,
        })
    }

    pub fn bounds(&self) -> Option<AABB> {
        AABB::from_points(self.vertices.iter().copied())
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Expands the indexed representation back into one corner triple per triangle.
    pub fn triangles(&self) -> Vec<[Vec3; 3]> {
        if self.mode != PrimitiveMode::Triangles {
            return Vec::new();
        }

        self.indices
            .iter()
            .map(|i| self.vertices[i as usize])
            .tuples()
            .map(|(a, b, c)| [a, b, c])
            .collect()
    }

    pub fn transformed(&self, matrix: &Mat4) -> Geometry {
        Geometry {
            name: self.name.clone(),
            mode: self.mode,
            indices: self.indices.clone(),
            vertices: self
                .vertices
                .iter()
                .map(|&vertex| matrix.transform_point3(vertex))
                .collect(),
        }
    }

    pub fn scaled(mut self, factor: f32) -> Geometry {
        for vertex in &mut self.vertices {
            *vertex *= factor;
        }
        self
    }
}
