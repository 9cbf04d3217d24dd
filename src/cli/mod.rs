// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and hands off to Layer 2.
// Reports are printed as pretty JSON on stdout; logs go
// through tracing on stderr.
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::{bail, Result};
use burn::backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, NdArray, Wgpu};
use clap::Parser;
use commands::{Backend, Commands, InitArgs, InspectArgs, PlanArgs};
use std::path::Path;

use crate::application::{
    inspect_use_case::{InspectConfig, InspectReport, InspectUseCase},
    plan_use_case::{plan, PlanUseCase},
};
use crate::domain::{settings::ModelSettings, traits::Persistable};

#[derive(Parser, Debug)]
#[command(
    name = "fusion-transformers",
    version,
    about = "Assemble multi-source transformer fusion models from a settings file."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Init(args)    => run_init(args),
            Commands::Plan(args)    => run_plan(args),
            Commands::Inspect(args) => run_inspect(args),
        }
    }
}

fn run_init(args: InitArgs) -> Result<()> {
    if Path::new(&args.output).exists() && !args.force {
        bail!("'{}' already exists; pass --force to overwrite", args.output);
    }

    let settings = args.kind.map(ModelSettings::for_kind).unwrap_or_default();
    plan(&settings)?;
    settings.save(&args.output)?;

    println!("Wrote {} settings to {}", settings.kind, args.output);
    Ok(())
}

fn run_plan(args: PlanArgs) -> Result<()> {
    let report = PlanUseCase::new(args.settings, args.kind).execute()?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_inspect(args: InspectArgs) -> Result<()> {
    let config = InspectConfig::from(&args);
    tracing::info!("Inspecting on the {:?} backend", args.backend);

    let report: InspectReport = match args.backend {
        Backend::Ndarray => {
            InspectUseCase::new(config).execute::<NdArray>(&NdArrayDevice::default())?
        }
        Backend::Wgpu => InspectUseCase::new(config).execute::<Wgpu>(&WgpuDevice::default())?,
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
