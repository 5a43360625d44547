use glam::Vec3;

use crate::error::{ConversionError, Result};
use crate::geometry::{Geometry, IndexWidth, Indices};
use crate::math::AABB;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub offset: usize,
    pub length: usize,
}

/// Where one geometry's blobs ended up, plus what an accessor needs to know about them.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferEntry {
    pub indices: ByteRange,
    pub vertices: ByteRange,
    pub index_width: IndexWidth,
    pub index_count: usize,
    pub index_min: u32,
    pub index_max: u32,
    pub vertex_count: usize,
    pub bounds: AABB,
}

#[derive(Debug, Clone, Default)]
pub struct PackedBuffer {
    pub data: Vec<u8>,
    pub entries: Vec<BufferEntry>,
}

impl PackedBuffer {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Concatenates each index blob and its vertex blob into one buffer.
///
/// Between an index blob and the following vertex blob sit
/// `index_bytes % vertex_bytes` zero bytes.
pub fn pack_blobs(indices: &[&Indices], vertices: &[&[Vec3]]) -> Result<PackedBuffer> {
    if indices.len() != vertices.len() {
        return Err(ConversionError::geometry_mismatch(format!(
            "{} index arrays but {} vertex arrays",
            indices.len(),
            vertices.len()
        )));
    }

    let mut buffer = PackedBuffer::default();

    for (position, (&indices, &vertices)) in indices.iter().zip(vertices).enumerate() {
        let index_bytes = indices.as_bytes();
        let vertex_bytes: &[u8] = bytemuck::cast_slice(vertices);

        let (Some((index_min, index_max)), Some(bounds)) =
            (indices.min_max(), AABB::from_points(vertices.iter().copied()))
        else {
            return Err(ConversionError::geometry_mismatch(format!(
                "geometry {position} has {} indices and {} vertices",
                indices.len(),
                vertices.len()
            )));
        };

        let index_offset = buffer.data.len();
        buffer.data.extend_from_slice(index_bytes);

        let padding = index_bytes.len() % vertex_bytes.len();
        buffer.data.resize(buffer.data.len() + padding, 0);

        let vertex_offset = buffer.data.len();
        buffer.data.extend_from_slice(vertex_bytes);

        buffer.entries.push(BufferEntry {
            indices: ByteRange {
                offset: index_offset,
                length: index_bytes.len(),
            },
            vertices: ByteRange {
                offset: vertex_offset,
                length: vertex_bytes.len(),
            },
            index_width: indices.width(),
            index_count: indices.len(),
            index_min,
            index_max,
            vertex_count: vertices.len(),
            bounds,
        });
    }

    Ok(buffer)
}

pub fn pack_geometries<'a>(geometries: impl IntoIterator<Item = &'a Geometry>) -> Result<PackedBuffer> {
    let (indices, vertices): (Vec<&Indices>, Vec<&[Vec3]>) = geometries
        .into_iter()
        .map(|geometry| (&geometry.indices, geometry.vertices.as_slice()))
        .unzip();

    pack_blobs(&indices, &vertices)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geometry::{beam, cone, cube};

    #[test]
    fn blobs_are_laid_out_back_to_back() {
        let geometries = [cube(1.0), cone(1.0), beam(Vec3::NEG_Z)];
        let buffer = pack_geometries(&geometries).unwrap();

        // cube: 36 index bytes, 36 % 96 = 36 padding bytes, 96 vertex bytes
        let cube = &buffer.entries[0];
        assert_eq!(cube.indices, ByteRange { offset: 0, length: 36 });
        assert_eq!(cube.vertices, ByteRange { offset: 72, length: 96 });

        // cone: 30 index bytes, 30 % 132 = 30 padding bytes
        let cone = &buffer.entries[1];
        assert_eq!(cone.indices, ByteRange { offset: 168, length: 30 });
        assert_eq!(cone.vertices, ByteRange { offset: 228, length: 132 });

        // beam: 2 index bytes, 2 % 24 = 2 padding bytes
        let beam = &buffer.entries[2];
        assert_eq!(beam.indices, ByteRange { offset: 360, length: 2 });
        assert_eq!(beam.vertices, ByteRange { offset: 364, length: 24 });

        assert_eq!(buffer.len(), 388);
    }

    #[test]
    fn padding_is_zeroed_and_data_is_verbatim() {
        let cube = cube(1.0);
        let buffer = pack_geometries([&cube]).unwrap();

        assert_eq!(&buffer.data[..36], cube.indices.as_bytes());
        assert!(buffer.data[36..72].iter().all(|&byte| byte == 0));
        assert_eq!(&buffer.data[72..], cube.vertex_bytes());
    }

    #[test]
    fn accessor_metadata_is_collected() {
        let buffer = pack_geometries([&cube(2.0)]).unwrap();
        let entry = &buffer.entries[0];

        assert_eq!(entry.index_width, IndexWidth::U8);
        assert_eq!(entry.index_count, 36);
        assert_eq!((entry.index_min, entry.index_max), (0, 7));
        assert_eq!(entry.vertex_count, 8);
        assert_eq!(entry.bounds.min, Vec3::new(-1.0, -2.0, -4.0));
        assert_eq!(entry.bounds.max, Vec3::new(1.0, 2.0, 4.0));
    }

    #[test]
    fn mismatched_lists_are_rejected() {
        let cube = cube(1.0);
        let error = pack_blobs(&[&cube.indices], &[]).unwrap_err();

        assert!(matches!(error, ConversionError::GeometryMismatch { .. }));
    }

    #[test]
    fn empty_vertex_blob_is_rejected() {
        let cube = cube(1.0);
        let error = pack_blobs(&[&cube.indices], &[&[]]).unwrap_err();

        assert!(matches!(error, ConversionError::GeometryMismatch { .. }));
    }
}
