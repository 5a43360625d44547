//! Turns resolved frames into a scene and serializes it.

pub mod buffer;
pub mod flat;
pub mod gltf_scene;

use std::fs;
use std::path::{Path, PathBuf};

use glam::{DMat4, Vec3};

use crate::error::{ConversionError, Result};
use crate::geometry::stl::read_stl;
use crate::geometry::{beam, Geometry, Shape};
use crate::placement::{Placement, Placements};
use crate::scene_graph::{GeometryId, GeometrySource, Scene, SceneNode};
use crate::transforms::{clean_link_name, FrameMap, ResolvedFrame};
use crate::units::UnitNormalizer;

/// Name of the extra chain node carrying a placement override.
pub const PLACEMENT_NODE: &str = "stl_shift";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// One fused triangle soup, no hierarchy.
    Flat,
    Hierarchical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Stl,
    Glb,
    Gltf,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|extension| extension.to_str())
            .unwrap_or_default();

        match extension.to_ascii_lowercase().as_str() {
            "stl" => Ok(OutputFormat::Stl),
            "glb" => Ok(OutputFormat::Glb),
            "gltf" => Ok(OutputFormat::Gltf),
            _ => Err(ConversionError::UnsupportedOutputFormat {
                extension: format!(".{extension}"),
                path: path.to_path_buf(),
            }),
        }
    }

    pub fn capability(self) -> Capability {
        match self {
            OutputFormat::Stl => Capability::Flat,
            OutputFormat::Glb | OutputFormat::Gltf => Capability::Hierarchical,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Stl => "stl",
            OutputFormat::Glb => "glb",
            OutputFormat::Gltf => "gltf",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            OutputFormat::Stl => "STL",
            OutputFormat::Glb => "GLB",
            OutputFormat::Gltf => "glTF",
        }
    }
}

fn staging_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map_or_else(|| "scene".into(), |name| name.to_string_lossy());
    target.with_file_name(format!(".{name}.partial"))
}

/// Serialized output, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub enum PackedScene {
    Stl(Vec<u8>),
    Glb(Vec<u8>),
    /// JSON document plus the buffer it references by `buffer_uri`.
    Gltf {
        json: Vec<u8>,
        buffer: Vec<u8>,
        buffer_uri: String,
    },
}

impl PackedScene {
    /// Writes the scene to `path`; `.gltf` output also writes its buffer
    /// next to it. Files are staged under a temporary name and moved into
    /// place once every one of them has been written, so a failed write
    /// leaves no output behind.
    pub fn write(&self, path: &Path) -> Result<()> {
        let files = match self {
            PackedScene::Stl(bytes) | PackedScene::Glb(bytes) => vec![(path.to_path_buf(), bytes)],
            PackedScene::Gltf {
                json,
                buffer,
                buffer_uri,
            } => vec![
                (path.with_file_name(buffer_uri), buffer),
                (path.to_path_buf(), json),
            ],
        };

        let staged: Vec<(PathBuf, PathBuf)> = files
            .iter()
            .map(|(target, _)| (staging_path(target), target.clone()))
            .collect();
        let discard = |staged: &[(PathBuf, PathBuf)]| {
            for (staging, _) in staged {
                // The file may not exist if staging failed early.
                let _ = fs::remove_file(staging);
            }
        };

        let written = staged
            .iter()
            .zip(&files)
            .try_for_each(|((staging, _), (_, bytes))| fs::write(staging, bytes));
        if let Err(error) = written {
            discard(&staged[..]);
            return Err(error.into());
        }

        for (position, (staging, target)) in staged.iter().enumerate() {
            if let Err(error) = fs::rename(staging, target) {
                discard(&staged[position..]);
                for (_, moved) in &staged[..position] {
                    let _ = fs::remove_file(moved);
                }
                return Err(error.into());
            }
        }

        Ok(())
    }

    pub fn len(&self) -> usize {
        match self {
            PackedScene::Stl(bytes) | PackedScene::Glb(bytes) => bytes.len(),
            PackedScene::Gltf { json, buffer, .. } => json.len() + buffer.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
pub struct SceneOptions {
    /// Placeholder drawn for frames without an override.
    pub shape: Shape,
    /// Side length of the placeholder in metres.
    pub size: f64,
    /// Direction of the beam line, `None` to leave it out.
    pub beam: Option<Vec3>,
    /// Root group stripped from chain link names.
    pub root: String,
}

impl Default for SceneOptions {
    fn default() -> Self {
        Self {
            shape: Shape::default(),
            size: 0.1,
            beam: Some(Vec3::NEG_Z),
            root: "entry".to_string(),
        }
    }
}

fn load_mesh(path: &Path, unit: Option<&str>, units: &dyn UnitNormalizer) -> Result<Geometry> {
    let triangles = read_stl(path)?;
    let name = path
        .file_stem()
        .map_or_else(|| "mesh".to_string(), |stem| stem.to_string_lossy().into_owned());

    let geometry = Geometry::from_triangle_soup(name, &triangles)?;

    Ok(match unit {
        Some(unit) => geometry.scaled(units.scale_to_si(unit)? as f32),
        None => geometry,
    })
}

struct SceneBuilder<'a> {
    scene: Scene,
    options: &'a SceneOptions,
    units: &'a dyn UnitNormalizer,
}

impl SceneBuilder<'_> {
    fn geometry(&mut self, placement: Option<&Placement>) -> Result<GeometryId> {
        let source = match placement {
            Some(Placement {
                file: Some(path),
                unit,
                ..
            }) => GeometrySource::Mesh {
                path: path.clone(),
                unit: unit.clone(),
            },
            _ => GeometrySource::Shape(
                placement
                    .and_then(|placement| placement.shape)
                    .unwrap_or(self.options.shape),
            ),
        };

        let scale = (self.options.size / 2.0) as f32;
        let beam_direction = self.options.beam.unwrap_or(Vec3::NEG_Z);
        let units = self.units;
        self.scene.geometry_for(source.clone(), || match &source {
            GeometrySource::Shape(shape) => Ok(shape.geometry(scale)),
            GeometrySource::Mesh { path, unit } => load_mesh(path, unit.as_deref(), units),
            GeometrySource::Beam => Ok(beam(beam_direction)),
        })
    }

    fn add_frame(
        &mut self,
        name: &str,
        frame: &ResolvedFrame,
        placement: Option<&Placement>,
    ) -> Result<()> {
        let geometry_id = self.geometry(placement)?;

        let Some(links) = frame.chain() else {
            let matrix = match placement {
                Some(placement) => placement.apply(frame.primary()),
                None => frame.primary(),
            };

            self.scene.add_node(
                SceneNode::new(name)
                    .with_geometry(geometry_id)
                    .with_matrix(matrix.as_mat4()),
            );
            return Ok(());
        };

        let parent = self
            .scene
            .add_node(SceneNode::new(name).with_geometry(geometry_id));

        for (position, link) in links.iter().enumerate() {
            let matrix = link.matrices.first().copied().unwrap_or(DMat4::IDENTITY);
            let link_name = clean_link_name(&link.path, name, &self.options.root);

            self.scene.add_child(
                parent,
                SceneNode::new(format!("{position}-{link_name}"))
                    .with_geometry(geometry_id)
                    .with_matrix(matrix.as_mat4()),
            );
        }

        if let Some(placement) = placement {
            self.scene.add_child(
                parent,
                SceneNode::new(format!("{}-{PLACEMENT_NODE}", links.len()))
                    .with_geometry(geometry_id)
                    .with_matrix(placement.apply(frame.primary()).as_mat4()),
            );
        }

        Ok(())
    }

    fn add_beam(&mut self, direction: Vec3) -> Result<()> {
        let geometry_id = self
            .scene
            .geometry_for(GeometrySource::Beam, || Ok(beam(direction)))?;
        self.scene
            .add_node(SceneNode::new("beam").with_geometry(geometry_id));
        Ok(())
    }
}

/// Builds one node per frame, in frame name order, followed by the beam.
///
/// Chain frames become a parent node named after the frame with one child
/// per chain link. Families are placed with their first sample.
pub fn build_scene(
    frames: &FrameMap,
    placements: &Placements,
    options: &SceneOptions,
    units: &dyn UnitNormalizer,
) -> Result<Scene> {
    let mut builder = SceneBuilder {
        scene: Scene::new(),
        options,
        units,
    };

    for (name, frame) in frames {
        builder.add_frame(name, frame, placements.get(name))?;
    }

    if let Some(direction) = options.beam {
        builder.add_beam(direction)?;
    }

    log::debug!(
        "Built scene with {} nodes and {} geometries",
        builder.scene.nodes.len(),
        builder.scene.geometries.len()
    );

    Ok(builder.scene)
}

/// Packs frames into one output format.
pub struct ScenePacker {
    format: OutputFormat,
    options: SceneOptions,
}

impl ScenePacker {
    pub fn new(format: OutputFormat, options: SceneOptions) -> Self {
        Self { format, options }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// `output` only names the buffer file of `.gltf` output; nothing is written.
    pub fn pack(
        &self,
        frames: &FrameMap,
        placements: &Placements,
        units: &dyn UnitNormalizer,
        output: &Path,
    ) -> Result<PackedScene> {
        match self.format.capability() {
            Capability::Flat => {
                if frames.values().any(ResolvedFrame::is_chain) {
                    return Err(ConversionError::UnsupportedFeatureForFormat {
                        feature: "storing intermediate matrices",
                        format: self.format.name(),
                    });
                }

                let options = SceneOptions {
                    beam: None,
                    ..self.options.clone()
                };
                let scene = build_scene(frames, placements, &options, units)?;

                Ok(PackedScene::Stl(flat::pack(&scene)?))
            }
            Capability::Hierarchical => {
                let scene = build_scene(frames, placements, &self.options, units)?;

                match self.format {
                    OutputFormat::Gltf => {
                        let buffer_uri = buffer_file_name(output);
                        let (root, packed) = gltf_scene::pack(&scene, Some(buffer_uri.clone()))?;

                        Ok(PackedScene::Gltf {
                            json: serde_json::to_vec_pretty(&root)?,
                            buffer: packed.data,
                            buffer_uri,
                        })
                    }
                    _ => {
                        let (root, packed) = gltf_scene::pack(&scene, None)?;
                        Ok(PackedScene::Glb(gltf_scene::glb_bytes(&root, packed.data)?))
                    }
                }
            }
        }
    }
}

/// Name of the buffer file written next to `.gltf` output.
pub fn buffer_file_name(output: &Path) -> String {
    match output.file_stem() {
        Some(stem) => format!("{}.bin", stem.to_string_lossy()),
        None => "scene.bin".to_string(),
    }
}
