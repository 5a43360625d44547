//! STL triangle soups.
//!
//! Reading understands both the binary and the ASCII flavour; writing always
//! produces binary STL:
//!
//! ```text
//! UINT8[80]    – Header
//! UINT32       – Number of triangles
//! foreach triangle
//!     REAL32[3] – Normal vector
//!     REAL32[3] – Vertex 1
//!     REAL32[3] – Vertex 2
//!     REAL32[3] – Vertex 3
//!     UINT16    – Attribute byte count (0)
//! end
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;

use glam::Vec3;

use crate::error::{ConversionError, Result};

const HEADER_SIZE: usize = 80;

const TRIANGLE_SIZE: usize = 50;

const HEADER_TEXT: &[u8] = b"binary STL written by instrument-scene";

pub type Triangle = [Vec3; 3];

pub fn read_stl(path: impl AsRef<Path>) -> Result<Vec<Triangle>> {
    let path = path.as_ref();
    let mut data = Vec::new();
    BufReader::new(File::open(path)?).read_to_end(&mut data)?;

    parse_stl(&data).map_err(|reason| ConversionError::InvalidMesh {
        path: path.to_path_buf(),
        reason,
    })
}

/// Parses STL content, telling ASCII and binary apart by the expected binary size.
pub fn parse_stl(data: &[u8]) -> std::result::Result<Vec<Triangle>, String> {
    if data.len() >= HEADER_SIZE + 4 {
        let count = u32::from_le_bytes([
            data[HEADER_SIZE],
            data[HEADER_SIZE + 1],
            data[HEADER_SIZE + 2],
            data[HEADER_SIZE + 3],
        ]) as usize;

        // ASCII files start with "solid" too, but almost never match the binary size exactly.
        if data.len() == HEADER_SIZE + 4 + count * TRIANGLE_SIZE {
            return Ok(parse_binary(&data[HEADER_SIZE + 4..], count));
        }
    }

    let text = String::from_utf8_lossy(data);
    if text.trim_start().starts_with("solid") {
        return parse_ascii(text.as_bytes());
    }

    Err(format!(
        "neither binary nor ASCII STL ({} bytes)",
        data.len()
    ))
}

fn read_vec3(buf: &[u8]) -> Vec3 {
    let x = f32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
    let y = f32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
    let z = f32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]);
    Vec3::new(x, y, z)
}

fn parse_binary(body: &[u8], count: usize) -> Vec<Triangle> {
    body.chunks_exact(TRIANGLE_SIZE)
        .take(count)
        .map(|triangle| {
            // Skip the stored normal, it is recomputed on write.
            [
                read_vec3(&triangle[12..24]),
                read_vec3(&triangle[24..36]),
                read_vec3(&triangle[36..48]),
            ]
        })
        .collect()
}

fn parse_ascii<R: BufRead>(reader: R) -> std::result::Result<Vec<Triangle>, String> {
    let mut triangles = Vec::new();
    let mut corners: Vec<Vec3> = Vec::with_capacity(3);

    for (line_number, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| e.to_string())?;
        let mut parts = line.split_whitespace();

        match parts.next() {
            Some("vertex") => {
                let coords = parts
                    .map(str::parse::<f32>)
                    .collect::<std::result::Result<Vec<f32>, _>>()
                    .map_err(|e| format!("line {}: {e}", line_number + 1))?;

                if coords.len() != 3 {
                    return Err(format!(
                        "line {}: expected 3 coordinates, found {}",
                        line_number + 1,
                        coords.len()
                    ));
                }
                corners.push(Vec3::from_slice(&coords));
            }
            Some("endfacet") => {
                let [a, b, c] = corners[..] else {
                    return Err(format!(
                        "line {}: facet with {} vertices",
                        line_number + 1,
                        corners.len()
                    ));
                };
                triangles.push([a, b, c]);
                corners.clear();
            }
            _ => {}
        }
    }

    Ok(triangles)
}

fn face_normal([a, b, c]: &Triangle) -> Vec3 {
    (*b - *a).cross(*c - *a).normalize_or_zero()
}

pub fn write_stl<W: Write>(mut writer: W, triangles: &[Triangle]) -> Result<()> {
    let mut header = [0u8; HEADER_SIZE];
    header[..HEADER_TEXT.len()].copy_from_slice(HEADER_TEXT);
    writer.write_all(&header)?;

    let count = u32::try_from(triangles.len()).map_err(|_| {
        ConversionError::geometry_mismatch(format!(
            "{} triangles do not fit into a binary STL",
            triangles.len()
        ))
    })?;
    writer.write_all(&count.to_le_bytes())?;

    for triangle in triangles {
        for vector in std::iter::once(face_normal(triangle)).chain(triangle.iter().copied()) {
            for component in vector.to_array() {
                writer.write_all(&component.to_le_bytes())?;
            }
        }
        writer.write_all(&0u16.to_le_bytes())?;
    }

    Ok(())
}

pub fn stl_bytes(triangles: &[Triangle]) -> Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity(HEADER_SIZE + 4 + triangles.len() * TRIANGLE_SIZE);
    write_stl(&mut bytes, triangles)?;
    Ok(bytes)
}
