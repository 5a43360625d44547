//! Read-only view of the hierarchical metadata file.
//!
//! The resolver only ever needs three things from a container: the
//! attributes of a record, the primary dataset of a record, and a walk over
//! every path. Paths are `/` separated and compared without a leading `/`.

#[cfg(feature = "hdf5")]
mod hdf5_file;
mod memory;

#[cfg(feature = "hdf5")]
pub use hdf5_file::Hdf5Container;
pub use memory::MemoryContainer;

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use glam::DVec3;
use serde::Deserialize;

use crate::error::Result;

const HDF5_SIGNATURE: [u8; 8] = *b"\x89HDF\r\n\x1a\n";

/// A dataset or attribute value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Scalar(f64),
    Array(Vec<f64>),
    Grid(Vec<Vec<f64>>),
}

impl Value {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_vec3(&self) -> Option<DVec3> {
        match self {
            Value::Array(values) if values.len() == 3 => Some(DVec3::from_slice(values)),
            // Some writers store vectors as a single row.
            Value::Grid(rows) if rows.len() == 1 && rows[0].len() == 3 => {
                Some(DVec3::from_slice(&rows[0]))
            }
            _ => None,
        }
    }

    pub fn describe_shape(&self) -> String {
        match self {
            Value::Text(_) => "a text value".to_string(),
            Value::Scalar(_) => "a scalar".to_string(),
            Value::Array(values) => format!("a 1-D array of length {}", values.len()),
            Value::Grid(rows) => format!(
                "a 2-D array of shape ({}, {})",
                rows.len(),
                rows.first().map_or(0, Vec::len)
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Text(text.to_string())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Scalar(value)
    }
}

impl From<Vec<f64>> for Value {
    fn from(values: Vec<f64>) -> Self {
        Value::Array(values)
    }
}

impl<const N: usize> From<[f64; N]> for Value {
    fn from(values: [f64; N]) -> Self {
        Value::Array(values.to_vec())
    }
}

pub trait Container {
    fn get_attribute(&self, path: &str, name: &str) -> Option<&Value>;

    fn get_dataset(&self, path: &str) -> Option<&Value>;

    fn contains(&self, path: &str) -> bool;

    /// Every path in the container, parents before children.
    fn iter_paths(&self) -> Box<dyn Iterator<Item = &str> + '_>;
}

pub fn normalize_path(path: &str) -> &str {
    path.trim_matches('/')
}

/// Parent group of `path`, or the empty string for top level paths.
pub fn parent_path(path: &str) -> &str {
    normalize_path(path)
        .rsplit_once('/')
        .map_or("", |(parent, _)| parent)
}

pub fn join_path(parent: &str, name: &str) -> String {
    let parent = normalize_path(parent);
    let name = normalize_path(name);

    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

/// Looks for the HDF5 superblock signature. It sits at offset 0 or, when a
/// user block precedes it, at 512 bytes times a power of two.
pub fn is_hdf5(path: &Path) -> Result<bool> {
    let mut file = File::open(path)?;
    let length = file.metadata()?.len();

    let mut offset = 0;
    while offset + HDF5_SIGNATURE.len() as u64 <= length {
        let mut signature = [0u8; 8];
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(&mut signature)?;
        if signature == HDF5_SIGNATURE {
            return Ok(true);
        }

        offset = if offset == 0 { 512 } else { offset * 2 };
    }

    Ok(false)
}

/// Opens `path` as HDF5 when it carries the signature, and as the JSON
/// description otherwise.
pub fn open_container(path: &Path) -> Result<Box<dyn Container>> {
    if is_hdf5(path)? {
        return open_hdf5(path);
    }

    Ok(Box::new(MemoryContainer::open(path)?))
}

#[cfg(feature = "hdf5")]
fn open_hdf5(path: &Path) -> Result<Box<dyn Container>> {
    Ok(Box::new(Hdf5Container::open(path)?))
}

#[cfg(not(feature = "hdf5"))]
fn open_hdf5(path: &Path) -> Result<Box<dyn Container>> {
    Err(crate::error::ConversionError::InvalidInput {
        path: path.to_path_buf(),
        reason: "HDF5 input needs a build with the `hdf5` feature".to_string(),
    })
}

#[cfg(test)]
mod test {
    use super::*;

    fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn path_helpers() {
        assert_eq!(normalize_path("/entry/sample/"), "entry/sample");
        assert_eq!(parent_path("/entry/sample/transformations/x"), "entry/sample/transformations");
        assert_eq!(parent_path("entry"), "");
        assert_eq!(join_path("entry/sample", "depends_on"), "entry/sample/depends_on");
        assert_eq!(join_path("", "/entry"), "entry");
    }

    #[test]
    fn values_deserialize_by_shape() {
        let values: Vec<Value> =
            serde_json::from_str(r#"["rotation", 2.5, [1.0, 0.0, 0.0], [[1.0, 2.0], [3.0, 4.0]]]"#)
                .unwrap();

        assert_eq!(values[0].as_text(), Some("rotation"));
        assert_eq!(values[1], Value::Scalar(2.5));
        assert_eq!(values[2].as_vec3(), Some(DVec3::X));
        assert_eq!(values[3].describe_shape(), "a 2-D array of shape (2, 2)");
    }

    #[test]
    fn hdf5_signature_is_found_behind_a_user_block() {
        let dir = tempfile::tempdir().unwrap();

        let mut bytes = HDF5_SIGNATURE.to_vec();
        bytes.resize(64, 0);
        let plain = write_file(dir.path(), "plain.nxs", &bytes);

        let mut bytes = vec![0u8; 1024];
        bytes.extend_from_slice(&HDF5_SIGNATURE);
        bytes.resize(2048, 0);
        let with_user_block = write_file(dir.path(), "user_block.nxs", &bytes);

        let mut bytes = vec![0u8; 700];
        bytes.extend_from_slice(&HDF5_SIGNATURE);
        let misplaced = write_file(dir.path(), "misplaced.nxs", &bytes);

        let json = write_file(dir.path(), "entry.json", br#"{"entry": {}}"#);

        assert!(is_hdf5(&plain).unwrap());
        assert!(is_hdf5(&with_user_block).unwrap());
        assert!(!is_hdf5(&misplaced).unwrap());
        assert!(!is_hdf5(&json).unwrap());
    }

    #[test]
    fn json_input_opens_in_memory() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "entry.json",
            br#"{"entry/sample/depends_on": {"value": "."}}"#,
        );

        let container = open_container(&path).unwrap();
        assert_eq!(
            container.iter_paths().collect::<Vec<_>>(),
            ["entry", "entry/sample", "entry/sample/depends_on"]
        );
    }

    #[cfg(not(feature = "hdf5"))]
    #[test]
    fn hdf5_input_needs_the_feature() {
        use crate::error::ConversionError;

        let dir = tempfile::tempdir().unwrap();
        let mut bytes = HDF5_SIGNATURE.to_vec();
        bytes.resize(64, 0);
        let path = write_file(dir.path(), "experiment.nxs", &bytes);

        match open_container(&path) {
            Err(ConversionError::InvalidInput { path: reported, reason }) => {
                assert_eq!(reported, path);
                assert!(reason.contains("hdf5"), "{reason}");
            }
            Err(other) => panic!("expected invalid input, got {other:?}"),
            Ok(_) => panic!("expected invalid input"),
        }
    }
}
