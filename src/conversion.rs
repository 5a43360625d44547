use std::path::{Path, PathBuf};

use crate::config::ConversionConfig;
use crate::container::open_container;
use crate::error::{ConversionError, Result};
use crate::packer::{
    buffer_file_name, Capability, OutputFormat, PackedScene, SceneOptions, ScenePacker,
};
use crate::placement::Placements;
use crate::transforms::{resolve_frames, FrameMap};
use crate::units::SiUnits;

#[derive(Debug, Clone, PartialEq)]
pub struct ConversionReport {
    pub output: PathBuf,
    pub format: OutputFormat,
    pub frame_count: usize,
    pub byte_count: usize,
}

fn check_input(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(ConversionError::InvalidInput {
            path: path.to_path_buf(),
            reason: "file does not exist".to_string(),
        });
    }

    if !path.is_file() {
        return Err(ConversionError::InvalidInput {
            path: path.to_path_buf(),
            reason: "not a file".to_string(),
        });
    }

    Ok(())
}

fn check_placements(path: &Path) -> Result<()> {
    check_input(path)?;

    let is_json = path
        .extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("json"));
    if !is_json {
        return Err(ConversionError::InvalidInput {
            path: path.to_path_buf(),
            reason: "placements must be a .json file".to_string(),
        });
    }

    Ok(())
}

/// Refuses to touch an existing file unless `force` is set. For `.gltf`
/// output the buffer file written next to it counts as well.
pub fn check_output(path: &Path, force: bool) -> Result<OutputFormat> {
    let format = OutputFormat::from_path(path)?;
    if force {
        return Ok(format);
    }

    let sidecar =
        (format == OutputFormat::Gltf).then(|| path.with_file_name(buffer_file_name(path)));
    if let Some(existing) = std::iter::once(path.to_path_buf())
        .chain(sidecar)
        .find(|candidate| candidate.exists())
    {
        return Err(ConversionError::OutputExists(existing));
    }

    Ok(format)
}

fn check_capability(format: OutputFormat, config: &ConversionConfig) -> Result<()> {
    if config.resolver.store_intermediate && format.capability() == Capability::Flat {
        return Err(ConversionError::UnsupportedFeatureForFormat {
            feature: "storing intermediate matrices",
            format: format.name(),
        });
    }

    Ok(())
}

pub fn scene_options(config: &ConversionConfig) -> SceneOptions {
    SceneOptions {
        shape: config.shape,
        size: config.size,
        beam: config
            .show_beam
            .then(|| config.resolver.convention.beam_direction().as_vec3()),
        root: config.resolver.root.clone(),
    }
}

/// Reads the input container and resolves every frame in it.
pub fn load_frames(config: &ConversionConfig) -> Result<FrameMap> {
    check_input(&config.input)?;

    let container = open_container(&config.input)?;
    log::debug!(
        "Read {} paths from {}",
        container.iter_paths().count(),
        config.input.display()
    );

    resolve_frames(container.as_ref(), &SiUnits, &config.resolver)
}

/// Packs `frames` and writes them to `output`. The file is only created
/// once the whole payload has been built.
pub fn write_scene(
    frames: &FrameMap,
    placements: &Placements,
    options: SceneOptions,
    output: &Path,
    force: bool,
) -> Result<PackedScene> {
    let format = check_output(output, force)?;

    let packed = ScenePacker::new(format, options).pack(frames, placements, &SiUnits, output)?;
    packed.write(output)?;

    log::info!(
        "Wrote {} frames to {} ({} bytes)",
        frames.len(),
        output.display(),
        packed.len()
    );

    Ok(packed)
}

/// Runs the whole pipeline: container in, scene file out.
pub fn convert(config: &ConversionConfig) -> Result<ConversionReport> {
    if !config.size.is_finite() || config.size <= 0.0 {
        return Err(ConversionError::InvalidOption {
            option: "size",
            reason: format!("{} is not a valid size, it needs to be > 0", config.size),
        });
    }

    check_input(&config.input)?;
    let format = check_output(&config.output, config.force)?;
    check_capability(format, config)?;

    let placements = match &config.placements {
        Some(path) => {
            check_placements(path)?;
            Placements::load(path)?
        }
        None => Placements::new(),
    };

    let frames = load_frames(config)?;
    let packed = write_scene(
        &frames,
        &placements,
        scene_options(config),
        &config.output,
        config.force,
    )?;

    Ok(ConversionReport {
        output: config.output.clone(),
        format,
        frame_count: frames.len(),
        byte_count: packed.len(),
    })
}
