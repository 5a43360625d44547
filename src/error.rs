use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConversionError>;

/// Everything that can go wrong between reading the container and writing the scene.
///
/// Each variant carries the record path, file or extension it is about, so the
/// driver can point at the offending piece of metadata.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("`{attribute}` attribute not found in {path}")]
    MissingAttribute { attribute: String, path: String },

    #[error("found `offset` attribute in {path} but no `offset_units` could be found")]
    MissingUnit { path: String },

    #[error("no field value found in {path}")]
    MissingField { path: String },

    #[error("only scalar and 1-D numeric fields are supported, but {path} holds {shape}")]
    UnsupportedFieldShape { path: String, shape: String },

    #[error("unknown transformation type `{kind}` in {path}")]
    UnknownTransformKind { kind: String, path: String },

    #[error("invalid `{attribute}` attribute in {path}: {reason}")]
    InvalidAttribute {
        attribute: String,
        path: String,
        reason: String,
    },

    #[error("{path} depends on `{target}`, which does not exist")]
    UnresolvedReference { path: String, target: String },

    #[error("dependency chain revisits {path}")]
    CyclicDependency { path: String },

    #[error("unknown unit `{unit}`")]
    UnknownUnit { unit: String },

    #[error("geometry mismatch: {reason}")]
    GeometryMismatch { reason: String },

    #[error("the mesh `{name}` has {vertex_count} distinct vertices, too many for 32 bit indices")]
    IndexDomainOverflow { name: String, vertex_count: usize },

    #[error("invalid mesh file {path}: {reason}")]
    InvalidMesh { path: PathBuf, reason: String },

    #[error("unsupported file format `{extension}` in output file {path}")]
    UnsupportedOutputFormat { extension: String, path: PathBuf },

    #[error("{feature} is not supported for {format} files")]
    UnsupportedFeatureForFormat {
        feature: &'static str,
        format: &'static str,
    },

    #[error("invalid input file {path}: {reason}")]
    InvalidInput { path: PathBuf, reason: String },

    #[error("invalid value for `{option}`: {reason}")]
    InvalidOption {
        option: &'static str,
        reason: String,
    },

    #[error("file {0} already exists")]
    OutputExists(PathBuf),

    #[error("scene serialization failed: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "hdf5")]
    #[error("HDF5 error: {0}")]
    Hdf5(#[from] hdf5::Error),
}

impl ConversionError {
    pub fn missing_attribute(attribute: impl Into<String>, path: impl Into<String>) -> Self {
        Self::MissingAttribute {
            attribute: attribute.into(),
            path: path.into(),
        }
    }

    pub fn invalid_attribute(
        attribute: impl Into<String>,
        path: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidAttribute {
            attribute: attribute.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn geometry_mismatch(reason: impl Into<String>) -> Self {
        Self::GeometryMismatch {
            reason: reason.into(),
        }
    }
}
