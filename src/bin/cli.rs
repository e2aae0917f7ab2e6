// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! brushcsg command line

use anyhow::{Context, Result};
use brushcsg::cli::{run_sweep, Reporter};
use brushcsg::geometry::analytics::analyze;
use brushcsg::geometry::mesh_utils::validate_mesh;
use brushcsg::{io, BooleanOp, Brush, Evaluator, Kernel, KernelConfig, ScenePreset};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::Level;

#[derive(Parser)]
#[command(name = "brushcsg")]
#[command(about = "Boolean evaluation of triangulated solids", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

/// Scene selection shared by `render` and `sweep`
#[derive(Args)]
struct SceneArgs {
    /// TOML config file (defaults to $BRUSHCSG_CONFIG, then built-ins)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Scene preset
    #[arg(short, long, value_enum)]
    preset: Option<ScenePreset>,

    /// Boolean operator (union, subtraction, intersection)
    #[arg(long)]
    operation: Option<String>,

    /// Tool angle in degrees
    #[arg(long)]
    angle: Option<f64>,

    /// Tool offset
    #[arg(long)]
    offset: Option<f64>,

    /// Emit a single ungrouped triangle list
    #[arg(long)]
    no_groups: bool,

    /// Run on a single thread
    #[arg(long)]
    sequential: bool,

    /// Reject open operands and unclosed results
    #[arg(long)]
    strict: bool,
}

impl SceneArgs {
    fn resolve(&self) -> Result<KernelConfig> {
        let mut config = match &self.config {
            Some(path) => KernelConfig::from_file(path)?,
            None => KernelConfig::load()?,
        };
        if let Some(preset) = self.preset {
            config.preset = preset;
        }
        if let Some(operation) = &self.operation {
            config.operation = operation.clone();
        }
        if let Some(angle) = self.angle {
            config.params.angle = angle;
        }
        if let Some(offset) = self.offset {
            config.params.offset = offset;
        }
        if self.no_groups {
            config.params.use_groups = false;
        }
        if self.sequential {
            config.evaluator.parallel = false;
        }
        if self.strict {
            config.evaluator.strict = true;
        }
        config.params = config.params.clamped();
        config.evaluator.use_groups = config.params.use_groups;
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a scene preset, or two mesh files, and export the result
    Render {
        #[command(flatten)]
        scene: SceneArgs,

        /// First operand mesh (.stl or .json) instead of a preset
        #[arg(long, requires = "tool")]
        base: Option<PathBuf>,

        /// Second operand mesh (.stl or .json)
        #[arg(long, requires = "base")]
        tool: Option<PathBuf>,

        /// Output file (.stl, .gltf, .glb or .json)
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print analytics of a mesh file
    Stats {
        /// Input mesh (.stl or .json)
        input: PathBuf,
    },

    /// Sweep the tool angle over its range and report timings
    Sweep {
        #[command(flatten)]
        scene: SceneArgs,

        /// Number of frames
        #[arg(short, long, default_value_t = 30)]
        frames: usize,
    },

    /// Write the effective configuration as TOML
    Config {
        #[command(flatten)]
        scene: SceneArgs,

        /// Output file
        output: PathBuf,
    },

    /// Show version information
    Version,
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(error) = run(cli.command) {
        Reporter::report_error(&format!("{:#}", error));
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Render {
            scene,
            base,
            tool,
            output,
        } => render_command(&scene, base, tool, &output),
        Commands::Stats { input } => stats_command(&input),
        Commands::Sweep { scene, frames } => {
            let summary = run_sweep(&scene.resolve()?, frames)?;
            Reporter::report_sweep(&summary);
            if !summary.deterministic {
                anyhow::bail!("sweep results were not reproducible");
            }
            Ok(())
        }
        Commands::Config { scene, output } => {
            scene.resolve()?.save(&output)?;
            Reporter::success(&format!("Wrote {}", output.display()));
            Ok(())
        }
        Commands::Version => {
            println!("brushcsg v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn render_command(
    scene: &SceneArgs,
    base: Option<PathBuf>,
    tool: Option<PathBuf>,
    output: &Path,
) -> Result<()> {
    let config = scene.resolve()?;
    let op: BooleanOp = config.operation()?;

    let (label, mesh, stats) = match (base, tool) {
        (Some(base), Some(tool)) => {
            let a = io::import(&base)?;
            let b = io::import(&tool)?;
            tracing::info!(base = %base.display(), tool = %tool.display(), %op, "evaluating files");
            let evaluator = Evaluator::new(config.evaluator);
            let (mesh, stats) = evaluator
                .evaluate_with_stats(&Brush::from(a), &Brush::from(b), op, None)
                .context("Boolean evaluation failed")?;
            (format!("{} / {}", base.display(), tool.display()), mesh, stats)
        }
        _ => {
            tracing::info!(preset = %config.preset, %op, angle = config.params.angle, "evaluating preset");
            let mut kernel = Kernel::from_config(&config)?;
            let view = kernel
                .update_frame(&config.params)
                .context("Boolean evaluation failed")?;
            let (mesh, stats) = (view.result.clone(), view.stats.clone());
            (config.preset.to_string(), mesh, stats)
        }
    };

    Reporter::report_evaluation(&label, op, &stats, &analyze(&mesh));
    io::export(&mesh, output)?;
    Reporter::success(&format!("Exported {}", output.display()));
    Ok(())
}

fn stats_command(input: &Path) -> Result<()> {
    let mesh = io::import(input)?;
    let stats = analyze(&mesh);
    stats.print();

    let validation = validate_mesh(&mesh);
    if validation.boundary_edge_count > 0 || validation.non_manifold_edge_count > 0 {
        tracing::warn!(
            boundary = validation.boundary_edge_count,
            non_manifold = validation.non_manifold_edge_count,
            "mesh is not a closed manifold"
        );
    }
    Ok(())
}
