// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Three subcommands:
//
//   init     write a settings file filled with defaults
//   plan     resolve a settings file into per-source layouts
//   inspect  build the model and run one random batch through it
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand, ValueEnum};

use crate::application::inspect_use_case::InspectConfig;
use crate::domain::settings::ModelKind;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a default settings file
    Init(InitArgs),

    /// Show how a settings file resolves into input sources
    Plan(PlanArgs),

    /// Build the configured model and run a random sample batch
    Inspect(InspectArgs),
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Where to write the settings JSON
    #[arg(long, default_value = "settings.json")]
    pub output: String,

    /// Architecture to write into the file
    #[arg(long)]
    pub kind: Option<ModelKind>,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Settings JSON; defaults are used when omitted
    #[arg(long)]
    pub settings: Option<String>,

    /// Override the kind named in the settings file
    #[arg(long)]
    pub kind: Option<ModelKind>,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Settings JSON; defaults are used when omitted
    #[arg(long)]
    pub settings: Option<String>,

    /// Override the kind named in the settings file
    #[arg(long)]
    pub kind: Option<ModelKind>,

    /// Samples in the random batch
    #[arg(long, default_value_t = 4)]
    pub batch_size: usize,

    /// Seed for weights and sample data
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Tensor backend to run on
    #[arg(long, value_enum, default_value_t = Backend::Ndarray)]
    pub backend: Backend,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    /// CPU, ndarray
    Ndarray,
    /// GPU through wgpu
    Wgpu,
}

impl From<&InspectArgs> for InspectConfig {
    fn from(a: &InspectArgs) -> Self {
        InspectConfig {
            settings_path: a.settings.clone(),
            kind:          a.kind,
            batch_size:    a.batch_size,
            seed:          a.seed,
        }
    }
}
