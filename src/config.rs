use std::path::PathBuf;

use glam::{DMat4, DVec3};

use crate::geometry::Shape;

/// Orientation of the coordinate system local transforms are built in.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handedness {
    #[default]
    Right,
    /// y and z are swapped, both in the rotation block and in the offset.
    Left,
}

/// Correction applied to every resolved matrix after the chains are composed.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisCorrection {
    #[default]
    None,
    /// Rotates the scene by -90° about x so z-up metadata shows up y-up in Blender.
    Blender,
}

/// Order in which a node's local matrix is combined with its parent's cumulative matrix.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Composition {
    /// cumulative = parent * local
    #[default]
    ParentFirst,
    /// cumulative = local * parent
    LocalFirst,
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Convention {
    pub handedness: Handedness,
    pub correction: AxisCorrection,
    pub composition: Composition,
}

impl Convention {
    pub fn compose(&self, parent: DMat4, local: DMat4) -> DMat4 {
        match self.composition {
            Composition::ParentFirst => parent * local,
            Composition::LocalFirst => local * parent,
        }
    }

    pub fn correct(&self, matrix: DMat4) -> DMat4 {
        match self.correction {
            AxisCorrection::None => matrix,
            AxisCorrection::Blender => DMat4::from_rotation_x((-90.0f64).to_radians()) * matrix,
        }
    }

    /// Direction of the reference beam line in the emitted scene.
    pub fn beam_direction(&self) -> DVec3 {
        match self.correction {
            AxisCorrection::None => DVec3::NEG_Z,
            AxisCorrection::Blender => DVec3::NEG_Y,
        }
    }
}

/// What to do when a single frame fails to resolve.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    #[default]
    Abort,
    /// Log the failure and leave the frame out of the scene.
    Skip,
}

#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// Name of the top level group frame names are made relative to.
    pub root: String,
    pub include_process: bool,
    pub store_intermediate: bool,
    pub convention: Convention,
    pub failure_policy: FailurePolicy,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            root: "entry".to_string(),
            include_process: false,
            store_intermediate: false,
            convention: Convention::default(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConversionConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub placements: Option<PathBuf>,
    /// Side length of the placeholder solids in metres.
    pub size: f64,
    pub shape: Shape,
    pub show_beam: bool,
    pub force: bool,
    pub resolver: ResolverOptions,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output: PathBuf::from("experiment.glb"),
            placements: None,
            size: 0.1,
            shape: Shape::Cone,
            show_beam: true,
            force: false,
            resolver: ResolverOptions::default(),
        }
    }
}
