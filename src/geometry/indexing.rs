use std::collections::HashMap;

use glam::Vec3;

use crate::error::{ConversionError, Result};
use crate::geometry::{Geometry, Indices, PrimitiveMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IndexWidth {
    U8,
    U16,
    U32,
}

impl IndexWidth {
    pub fn byte_size(self) -> usize {
        match self {
            IndexWidth::U8 => 1,
            IndexWidth::U16 => 2,
            IndexWidth::U32 => 4,
        }
    }

    /// Narrowest width whose maximum value is still above every index of a
    /// mesh with `vertex_count` vertices. The all-ones value of each width is
    /// reserved as the primitive restart marker, so it is never used.
    pub fn narrowest_for(name: &str, vertex_count: usize) -> Result<IndexWidth> {
        let max_index = vertex_count.saturating_sub(1);

        [IndexWidth::U8, IndexWidth::U16, IndexWidth::U32]
            .into_iter()
            .find(|width| max_index < width.max_value())
            .ok_or_else(|| ConversionError::IndexDomainOverflow {
                name: name.to_string(),
                vertex_count,
            })
    }

    fn max_value(self) -> usize {
        match self {
            IndexWidth::U8 => u8::MAX as usize,
            IndexWidth::U16 => u16::MAX as usize,
            IndexWidth::U32 => u32::MAX as usize,
        }
    }

    /// Converts indices already known to fit this width.
    pub(crate) fn narrow(self, indices: &[u32]) -> Indices {
        match self {
            IndexWidth::U8 => Indices::U8(indices.iter().map(|&i| i as u8).collect()),
            IndexWidth::U16 => Indices::U16(indices.iter().map(|&i| i as u16).collect()),
            IndexWidth::U32 => Indices::U32(indices.to_vec()),
        }
    }
}

// Bit pattern key; -0.0 is folded into 0.0 so both land on the same vertex.
fn vertex_key(vertex: Vec3) -> [u32; 3] {
    (vertex + Vec3::ZERO).to_array().map(f32::to_bits)
}

impl Geometry {
    /// Rebuilds an indexed mesh from a triangle soup, merging corners whose
    /// three coordinates are identical.
    pub fn from_triangle_soup(name: impl Into<String>, triangles: &[[Vec3; 3]]) -> Result<Self> {
        let name = name.into();

        let mut unique: HashMap<[u32; 3], usize> = HashMap::new();
        let mut vertices = Vec::new();
        let mut indices = Vec::with_capacity(triangles.len() * 3);

        for &corner in triangles.iter().flatten() {
            let index = *unique.entry(vertex_key(corner)).or_insert_with(|| {
                vertices.push(corner);
                vertices.len() - 1
            });
            indices.push(index);
        }

        let width = IndexWidth::narrowest_for(&name, vertices.len())?;
        let indices = match width {
            IndexWidth::U8 => Indices::U8(indices.iter().map(|&i| i as u8).collect()),
            IndexWidth::U16 => Indices::U16(indices.iter().map(|&i| i as u16).collect()),
            IndexWidth::U32 => Indices::U32(indices.iter().map(|&i| i as u32).collect()),
        };

        log::debug!(
            "Indexed `{}`: {} triangles, {} unique vertices, {:?} indices",
            name,
            triangles.len(),
            vertices.len(),
            width
        );

        Ok(Self {
            name,
            mode: PrimitiveMode::Triangles,
            indices,
            vertices,
        })
    }
}
