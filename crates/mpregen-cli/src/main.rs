//! mpregen CLI
//!
//! Regenerates the MicroPython genhdr artifacts (qstr, root-pointer and
//! module tables) for a Keil MDK project, standing in for the work the
//! runtime's own Makefile build would do.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use mpregen_core::{ArchProfile, GenhdrLayout};
use mpregen_pipeline::{
    CPreprocessor, ConfigSource, Pipeline, PyToolGenerator, UvprojxSource,
};

#[derive(Parser)]
#[command(name = "mpregen")]
#[command(author, version, about = "Regenerate MicroPython genhdr artifacts from a Keil project", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DescriptorArgs {
    /// Keil project descriptor (paths inside it are relative to its directory)
    #[arg(long, value_name = "FILE", default_value = "MDK-ARM/mp_threadx.uvprojx")]
    uvprojx: PathBuf,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Args)]
struct ToolchainArgs {
    /// Path to armclang (or any clang-compatible driver, used as preprocessor)
    #[arg(long, value_name = "PATH", default_value = "armclang")]
    cc: PathBuf,

    /// Python interpreter for the runtime's generator tools
    #[arg(long, value_name = "PATH", default_value = "python3")]
    python: PathBuf,

    /// Target triple
    #[arg(long, default_value = "arm-arm-none-eabi")]
    target: String,

    /// CPU name
    #[arg(long, default_value = "cortex-m4")]
    cpu: String,

    /// Disable Thumb mode
    #[arg(long)]
    no_thumb: bool,

    /// FPU variant
    #[arg(long, default_value = "fpv4-sp-d16")]
    fpu: String,

    /// Float calling convention
    #[arg(long, default_value = "hard")]
    float_abi: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full regeneration pipeline
    Regen {
        #[command(flatten)]
        descriptor: DescriptorArgs,

        #[command(flatten)]
        toolchain: ToolchainArgs,
    },

    /// Print the extracted build configuration as JSON
    Config {
        #[command(flatten)]
        descriptor: DescriptorArgs,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let verbose = match &cli.command {
        Commands::Regen { descriptor, .. } | Commands::Config { descriptor } => descriptor.verbose,
    };
    init_tracing(verbose);

    match cli.command {
        Commands::Regen {
            descriptor,
            toolchain,
        } => cmd_regen(&descriptor, &toolchain),
        Commands::Config { descriptor } => cmd_config(&descriptor),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Keil keeps the descriptor one level below the project workspace
/// (`MDK-ARM/<project>.uvprojx`), so the workspace root is its grandparent.
fn workspace_root(uvprojx: &Path) -> Result<PathBuf> {
    let absolute = uvprojx
        .canonicalize()
        .with_context(|| format!("project descriptor not found: {}", uvprojx.display()))?;
    absolute
        .parent()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .with_context(|| format!("cannot locate workspace root above {}", absolute.display()))
}

fn cmd_regen(descriptor: &DescriptorArgs, toolchain: &ToolchainArgs) -> Result<()> {
    // A missing preprocessor fails before any output file is touched.
    CPreprocessor::probe_tool(&toolchain.cc)?;

    let config = UvprojxSource::new(&descriptor.uvprojx).load()?;
    info!(
        sources = config.sources.len(),
        "loaded build configuration from {}",
        descriptor.uvprojx.display()
    );
    let layout = GenhdrLayout::new(&workspace_root(&descriptor.uvprojx)?);

    let profile = ArchProfile {
        target: toolchain.target.clone(),
        cpu: toolchain.cpu.clone(),
        thumb: !toolchain.no_thumb,
        fpu: toolchain.fpu.clone(),
        float_abi: toolchain.float_abi.clone(),
    };

    let preprocessor = CPreprocessor::new(&toolchain.cc, &profile, &config);
    let generator = PyToolGenerator::new(&toolchain.python, &layout);

    let pipeline = Pipeline::new(layout, config, &preprocessor, &generator);
    let report = pipeline.run()?;

    println!("Regenerated MicroPython genhdr:");
    for path in &report.generated {
        println!("- {}", path.display());
    }
    Ok(())
}

fn cmd_config(descriptor: &DescriptorArgs) -> Result<()> {
    let config = UvprojxSource::new(&descriptor.uvprojx).load()?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
