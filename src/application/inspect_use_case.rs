// ============================================================
// Layer 2 — InspectUseCase
// ============================================================
// Builds the configured model on a chosen backend and runs one
// seeded random batch through it end to end:
//
//   Step 1: Plan the settings           (PlanUseCase)
//   Step 2: Seed backend + sample RNG
//   Step 3: Random samples              (Layer 4 - data)
//   Step 4: Build the model             (Layer 5 - ml)
//   Step 5: Forward pass + MSE loss     (Layer 5 - ml)
//
// Nothing is trained or written to disk; the report only says
// whether the architecture assembles and what it produces.

use anyhow::{bail, Result};
use burn::prelude::*;
use burn::tensor::ElementConversion;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;

use crate::application::plan_use_case::{plan, PlanUseCase};
use crate::data::batcher::{SourceBatcher, SourceSample};
use crate::domain::settings::{ModelKind, SourceLayout};
use crate::ml::factory::build_model;

#[derive(Debug, Clone, Serialize)]
pub struct InspectReport {
    pub kind:        ModelKind,
    pub sources:     Vec<SourceLayout>,
    pub num_params:  usize,
    pub output_dims: Vec<usize>,
    pub loss:        f32,
}

#[derive(Debug, Clone)]
pub struct InspectConfig {
    pub settings_path: Option<String>,
    pub kind:          Option<ModelKind>,
    pub batch_size:    usize,
    pub seed:          u64,
}

impl Default for InspectConfig {
    fn default() -> Self {
        Self {
            settings_path: None,
            kind:          None,
            batch_size:    4,
            seed:          42,
        }
    }
}

pub struct InspectUseCase {
    config: InspectConfig,
}

impl InspectUseCase {
    pub fn new(config: InspectConfig) -> Self {
        Self { config }
    }

    pub fn execute<B: Backend>(&self, device: &B::Device) -> Result<InspectReport> {
        let cfg = &self.config;
        if cfg.batch_size == 0 {
            bail!("batch size must be at least 1");
        }

        // ── Step 1: Settings → layouts ────────────────────────────────────────
        let settings = PlanUseCase::new(cfg.settings_path.clone(), cfg.kind).settings()?;
        let planned  = plan(&settings)?;

        // ── Step 2: Seed everything ───────────────────────────────────────────
        B::seed(cfg.seed);
        let mut rng = StdRng::seed_from_u64(cfg.seed);

        // ── Step 3: Sample batch ──────────────────────────────────────────────
        let samples = random_samples(&mut rng, &planned.sources, planned.output_width, cfg.batch_size);
        let batcher = SourceBatcher::<B>::new(device.clone(), planned.sources.clone(), planned.output_width);
        let batch   = batcher.try_batch(samples)?;

        // ── Step 4: Build ─────────────────────────────────────────────────────
        let model = build_model::<B>(&settings, device)?;

        // ── Step 5: Forward + loss ────────────────────────────────────────────
        let (loss, output) = model.forward_loss(batch.sources.clone(), batch.sources, batch.targets)?;
        let loss: f32 = loss.into_scalar().elem();

        tracing::info!(
            "Sample run of {} on batch {} gave output {:?}, loss {:.4}",
            planned.kind,
            cfg.batch_size,
            output.dims(),
            loss
        );

        Ok(InspectReport {
            kind:        planned.kind,
            sources:     planned.sources,
            num_params:  model.num_params(),
            output_dims: output.dims().to_vec(),
            loss,
        })
    }
}

/// Uniform values in [-1, 1) for every source and target.
fn random_samples(
    rng:          &mut StdRng,
    layouts:      &[SourceLayout],
    target_width: usize,
    batch_size:   usize,
) -> Vec<SourceSample> {
    (0..batch_size)
        .map(|_| SourceSample {
            features: layouts
                .iter()
                .map(|l| (0..l.input_len).map(|_| rng.gen_range(-1.0f32..1.0)).collect())
                .collect(),
            target: (0..target_width).map(|_| rng.gen_range(-1.0f32..1.0)).collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{settings::ModelSettings, traits::Persistable};
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn small_settings(dir: &tempfile::TempDir, kind: ModelKind) -> String {
        let settings = ModelSettings {
            kind,
            inputs_lengths:    vec![12, 4],
            d_model:           crate::domain::settings::OneOrMany::One(8),
            attention_heads:   2,
            d_ff:              16,
            output_ff_layers:  vec![6, 1],
            rnn_hidden:        5,
            mul_hidden:        3,
            ..ModelSettings::default()
        };
        let path = dir.path().join("settings.json");
        let path = path.to_str().unwrap().to_string();
        settings.save(&path).unwrap();
        path
    }

    #[test]
    fn test_inspect_reports_output_and_loss() {
        let dir  = tempfile::tempdir().unwrap();
        let path = small_settings(&dir, ModelKind::MultiTransformersPlusMulAttention);
        let config = InspectConfig { settings_path: Some(path), batch_size: 3, ..Default::default() };

        let report = InspectUseCase::new(config).execute::<TestBackend>(&Default::default()).unwrap();
        assert_eq!(report.kind, ModelKind::MultiTransformersPlusMulAttention);
        assert_eq!(report.output_dims, vec![3, 1]);
        assert_eq!(report.sources.len(), 2);
        assert!(report.num_params > 0);
        assert!(report.loss.is_finite() && report.loss >= 0.0);
    }

    #[test]
    fn test_kind_override_reaches_the_model() {
        let dir  = tempfile::tempdir().unwrap();
        let path = small_settings(&dir, ModelKind::MultiTransformersPlusLinear);
        let config = InspectConfig {
            settings_path: Some(path),
            kind:          Some(ModelKind::FlexibleTransformer),
            ..Default::default()
        };

        let report = InspectUseCase::new(config).execute::<TestBackend>(&Default::default()).unwrap();
        assert_eq!(report.kind, ModelKind::FlexibleTransformer);
        assert_eq!(report.output_dims, vec![4, 1]);
    }

    #[test]
    fn test_random_samples_are_seeded() {
        let layouts = ModelSettings::default().resolve().unwrap();
        let a = random_samples(&mut StdRng::seed_from_u64(7), &layouts, 1, 2);
        let b = random_samples(&mut StdRng::seed_from_u64(7), &layouts, 1, 2);
        assert_eq!(a, b);
        assert_eq!(a[0].features[0].len(), 96);
    }

    #[test]
    fn test_zero_batch_is_rejected() {
        let config = InspectConfig { batch_size: 0, ..Default::default() };
        assert!(InspectUseCase::new(config).execute::<TestBackend>(&Default::default()).is_err());
    }
}
