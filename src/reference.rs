//! Calibration scenes with one frame rotated about, or shifted along, each
//! axis. Opening them shows how a viewer maps the axes.

use std::path::{Path, PathBuf};

use glam::DVec3;

use crate::conversion::write_scene;
use crate::error::{ConversionError, Result};
use crate::math::affine::{rotation, translation};
use crate::packer::{OutputFormat, SceneOptions};
use crate::placement::Placements;
use crate::transforms::{FrameMap, ResolvedFrame};

const AXES: [(&str, DVec3); 3] = [("x", DVec3::X), ("y", DVec3::Y), ("z", DVec3::Z)];

/// Frames `rot_<axis>_<angle>` rotated by `angle` degrees about each axis.
pub fn rotation_frames(angle: f64) -> FrameMap {
    AXES.iter()
        .filter_map(|&(name, axis)| {
            let matrix = rotation(angle.to_radians(), axis, DVec3::ZERO)?;
            Some((format!("rot_{name}_{angle}"), ResolvedFrame::Single(matrix)))
        })
        .collect()
}

/// Frames `trans_<axis>_<distance>` shifted by `distance` metres along each axis.
pub fn translation_frames(distance: f64) -> FrameMap {
    AXES.iter()
        .map(|&(name, axis)| {
            let matrix = translation(axis * distance, DVec3::ZERO);
            (format!("trans_{name}_{distance}"), ResolvedFrame::Single(matrix))
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct ReferenceConfig {
    pub directory: PathBuf,
    /// Rotation angle in degrees.
    pub angle: f64,
    /// Translation distance in metres.
    pub distance: f64,
    pub format: OutputFormat,
    pub scene: SceneOptions,
    pub force: bool,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            angle: 20.0,
            distance: 0.1,
            format: OutputFormat::Glb,
            scene: SceneOptions::default(),
            force: false,
        }
    }
}

/// Writes `rot.<ext>` and `trans.<ext>` into the configured directory.
pub fn write_reference_scenes(config: &ReferenceConfig) -> Result<Vec<PathBuf>> {
    if !config.directory.is_dir() {
        return Err(ConversionError::InvalidInput {
            path: config.directory.clone(),
            reason: "not a directory".to_string(),
        });
    }

    let scenes = [
        ("rot", rotation_frames(config.angle)),
        ("trans", translation_frames(config.distance)),
    ];

    let placements = Placements::new();
    scenes
        .iter()
        .map(|(stem, frames)| {
            let path = config
                .directory
                .join(Path::new(stem).with_extension(config.format.extension()));
            write_scene(frames, &placements, config.scene.clone(), &path, config.force)?;
            Ok(path)
        })
        .collect()
}
