// ============================================================
// Layer 2 — PlanUseCase
// ============================================================
// Loads a settings file, applies an optional kind override and
// resolves it into per-source layouts without building a model.
//
//   Step 1: Load settings        (Layer 6 - infra)
//   Step 2: Override kind        (optional)
//   Step 3: Resolve layouts      (Layer 3 - domain)

use anyhow::{Context, Result};
use serde::Serialize;

use crate::domain::settings::{ModelKind, ModelSettings, SourceLayout};
use crate::infra::settings_store::load_or_default;

/// What a settings file turns into once every list is broadcast.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanReport {
    pub kind:         ModelKind,
    pub sources:      Vec<SourceLayout>,
    pub output_width: usize,
}

pub struct PlanUseCase {
    settings_path: Option<String>,
    kind:          Option<ModelKind>,
}

impl PlanUseCase {
    pub fn new(settings_path: Option<String>, kind: Option<ModelKind>) -> Self {
        Self { settings_path, kind }
    }

    /// Load the settings this use case points at, with any kind override applied.
    pub fn settings(&self) -> Result<ModelSettings> {
        let mut settings = load_or_default(self.settings_path.as_deref())?;
        if let Some(kind) = self.kind {
            tracing::debug!("Overriding kind {} with {}", settings.kind, kind);
            settings.kind = kind;
        }
        Ok(settings)
    }

    pub fn execute(&self) -> Result<PlanReport> {
        let settings = self.settings()?;
        plan(&settings)
    }
}

/// Resolve `settings`, including the structural checks of its kind.
pub fn plan(settings: &ModelSettings) -> Result<PlanReport> {
    let sources = settings
        .resolve()
        .with_context(|| format!("Settings for {} do not resolve", settings.kind))?;

    let output_width = settings
        .output_width()
        .context("output_ff_layers must name at least one layer")?;

    tracing::info!("Planned {} over {} sources", settings.kind, sources.len());
    Ok(PlanReport { kind: settings.kind, sources, output_width })
}
