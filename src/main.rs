use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use instrument_scene::config::{
    AxisCorrection, ConversionConfig, Convention, FailurePolicy, Handedness, ResolverOptions,
};
use instrument_scene::conversion::{convert, load_frames, scene_options};
use instrument_scene::geometry::Shape;
use instrument_scene::packer::OutputFormat;
use instrument_scene::reference::{write_reference_scenes, ReferenceConfig};
use instrument_scene::transforms::{angle_between, coordinate_systems};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a metadata container into an STL, GLB or glTF scene.
    Convert(ConvertArgs),
    /// Print the coordinate system of every resolved frame.
    Frames(FramesArgs),
    /// Write calibration scenes for checking a viewer's axis conventions.
    Reference(ReferenceArgs),
}

#[derive(Args, Debug)]
struct ResolveArgs {
    /// Metadata container: an HDF5/NeXus file, or its JSON description.
    input: PathBuf,

    /// Group frame names are made relative to.
    #[arg(long, default_value = "entry")]
    root: String,

    /// Also resolve frames below `<root>/process`.
    #[arg(long)]
    include_process: bool,

    /// Rotate the scene so it shows up upright in Blender.
    #[arg(long)]
    blender: bool,

    /// Build local matrices in a left handed coordinate system.
    #[arg(short, long)]
    left_handed: bool,

    /// Leave out frames that fail to resolve instead of aborting.
    #[arg(long)]
    skip_failures: bool,
}

impl ResolveArgs {
    fn resolver_options(&self, store_intermediate: bool) -> ResolverOptions {
        ResolverOptions {
            root: self.root.clone(),
            include_process: self.include_process,
            store_intermediate,
            convention: Convention {
                handedness: if self.left_handed {
                    Handedness::Left
                } else {
                    Handedness::Right
                },
                correction: if self.blender {
                    AxisCorrection::Blender
                } else {
                    AxisCorrection::None
                },
                ..Default::default()
            },
            failure_policy: if self.skip_failures {
                FailurePolicy::Skip
            } else {
                FailurePolicy::Abort
            },
        }
    }
}

#[derive(Args, Debug)]
struct ConvertArgs {
    #[command(flatten)]
    resolve: ResolveArgs,

    /// Output file; the extension picks the format (.stl, .glb or .gltf).
    #[arg(short, long, default_value = "experiment.glb")]
    output: PathBuf,

    /// JSON file with per-frame placement overrides.
    #[arg(short = 'c', long = "config")]
    placements: Option<PathBuf>,

    /// Side length of the placeholder solids in metres.
    #[arg(short, long, default_value_t = 0.1)]
    size: f64,

    /// Placeholder solid for frames without a placement.
    #[arg(long, value_enum, default_value_t = Shape::Cone)]
    shape: Shape,

    /// Emit every link of each dependency chain as a nested node.
    #[arg(long)]
    store_intermediate: bool,

    /// Leave out the beam line.
    #[arg(long)]
    no_beam: bool,

    /// Overwrite the output file if it exists.
    #[arg(short, long)]
    force: bool,
}

#[derive(Args, Debug)]
struct FramesArgs {
    #[command(flatten)]
    resolve: ResolveArgs,

    /// Also print the angle between the z axes of these two frames.
    #[arg(long, num_args = 2, value_names = ["FRAME", "FRAME"])]
    angle: Option<Vec<String>>,
}

#[derive(Args, Debug)]
struct ReferenceArgs {
    /// Directory the scenes are written to.
    #[arg(default_value = ".")]
    directory: PathBuf,

    /// Rotation angle in degrees.
    #[arg(short, long, default_value_t = 20.0)]
    angle: f64,

    /// Translation distance in metres.
    #[arg(short, long, default_value_t = 0.1)]
    distance: f64,

    /// Write .gltf files instead of .glb.
    #[arg(long)]
    gltf: bool,

    /// Overwrite existing scenes.
    #[arg(short, long)]
    force: bool,
}

fn run_convert(args: ConvertArgs) -> Result<()> {
    let config = ConversionConfig {
        input: args.resolve.input.clone(),
        output: args.output,
        placements: args.placements,
        size: args.size,
        shape: args.shape,
        show_beam: !args.no_beam,
        force: args.force,
        resolver: args.resolve.resolver_options(args.store_intermediate),
    };

    let report = convert(&config)
        .with_context(|| format!("Failed to convert {}", config.input.display()))?;

    println!(
        "Wrote {} frames to {} ({}, {} bytes)",
        report.frame_count,
        report.output.display(),
        report.format.name(),
        report.byte_count
    );

    Ok(())
}

fn run_frames(args: FramesArgs) -> Result<()> {
    let config = ConversionConfig {
        input: args.resolve.input.clone(),
        resolver: args.resolve.resolver_options(false),
        ..Default::default()
    };

    let frames = load_frames(&config)
        .with_context(|| format!("Failed to resolve frames in {}", config.input.display()))?;
    let systems = coordinate_systems(&frames);

    for (name, system) in &systems {
        println!("{name}: {system}");
    }

    if let Some(names) = args.angle {
        let [a, b] = names.as_slice() else {
            return Err(anyhow!("--angle takes exactly two frame names"));
        };
        let lookup = |name: &String| {
            systems
                .get(name)
                .ok_or_else(|| anyhow!("No frame named `{name}`"))
        };
        let angle = angle_between(lookup(a)?.z_axis, lookup(b)?.z_axis);
        println!("angle between {a} and {b}: {:.3}°", angle.to_degrees());
    }

    Ok(())
}

fn run_reference(args: ReferenceArgs) -> Result<()> {
    let config = ReferenceConfig {
        directory: args.directory,
        angle: args.angle,
        distance: args.distance,
        format: if args.gltf {
            OutputFormat::Gltf
        } else {
            OutputFormat::Glb
        },
        scene: scene_options(&ConversionConfig::default()),
        force: args.force,
    };

    let written = write_reference_scenes(&config).with_context(|| {
        format!(
            "Failed to write reference scenes to {}",
            config.directory.display()
        )
    })?;

    for path in written {
        println!("Wrote {}", path.display());
    }

    Ok(())
}

fn main() -> Result<()> {
    pretty_env_logger::init();

    match Cli::parse().command {
        Command::Convert(args) => run_convert(args),
        Command::Frames(args) => run_frames(args),
        Command::Reference(args) => run_reference(args),
    }
}
