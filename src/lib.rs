//! Turns the `depends_on` transformation chains of an instrument metadata
//! container into a viewable 3D scene (STL, GLB or glTF).

pub mod config;
pub mod container;
pub mod conversion;
pub mod error;
pub mod geometry;
pub mod math;
pub mod packer;
pub mod placement;
pub mod reference;
pub mod scene_graph;
pub mod transforms;
pub mod units;

pub use config::{
    AxisCorrection, Composition, ConversionConfig, Convention, FailurePolicy, Handedness,
    ResolverOptions,
};
pub use conversion::{convert, load_frames, ConversionReport};
pub use error::{ConversionError, Result};
pub use packer::{OutputFormat, PackedScene, SceneOptions, ScenePacker};
pub use reference::{write_reference_scenes, ReferenceConfig};
pub use transforms::{resolve_frames, FrameMap, ResolvedFrame};
