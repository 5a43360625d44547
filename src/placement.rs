//! Per-frame overrides read from a JSON file:
//!
//! ```json
//! {
//!   "sample": { "file": "sample_holder.stl", "unit": "mm", "z": 0.01, "rot_x": 90 },
//!   "instrument/electronanalyser": { "shape": "cube" }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use glam::{DMat4, DVec3};
use serde::Deserialize;

use crate::error::Result;
use crate::geometry::Shape;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Placement {
    /// STL mesh drawn instead of the placeholder shape.
    pub file: Option<PathBuf>,
    /// Length unit the mesh file is written in, metres if absent.
    pub unit: Option<String>,
    pub shape: Option<Shape>,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub z: f64,
    /// Rotations in degrees.
    #[serde(default)]
    pub rot_x: f64,
    #[serde(default)]
    pub rot_y: f64,
    #[serde(default)]
    pub rot_z: f64,
}

impl Placement {
    /// Shift followed by the rotations about x, y and z, in the frame's own system.
    pub fn matrix(&self) -> DMat4 {
        DMat4::from_translation(DVec3::new(self.x, self.y, self.z))
            * DMat4::from_rotation_z(self.rot_z.to_radians())
            * DMat4::from_rotation_y(self.rot_y.to_radians())
            * DMat4::from_rotation_x(self.rot_x.to_radians())
    }

    pub fn apply(&self, frame: DMat4) -> DMat4 {
        frame * self.matrix()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Placements {
    by_frame: BTreeMap<String, Placement>,
}

impl Placements {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads placements from a file. Mesh paths are taken relative to the
    /// directory the file lives in.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));

        let placements = Self::from_reader(reader, base_dir)?;
        log::info!("Loaded {} placements from {}", placements.len(), path.display());

        Ok(placements)
    }

    pub fn from_reader<R: Read>(reader: R, base_dir: &Path) -> Result<Self> {
        let mut by_frame: BTreeMap<String, Placement> = serde_json::from_reader(reader)?;

        for placement in by_frame.values_mut() {
            if let Some(file) = placement.file.as_mut() {
                *file = base_dir.join(&*file);
            }
        }

        Ok(Self { by_frame })
    }

    pub fn insert(&mut self, frame: impl Into<String>, placement: Placement) {
        self.by_frame.insert(frame.into(), placement);
    }

    pub fn get(&self, frame: &str) -> Option<&Placement> {
        self.by_frame.get(frame)
    }

    pub fn len(&self) -> usize {
        self.by_frame.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_frame.is_empty()
    }
}
