// ============================================================
// Layer 4 — Source Batcher
// ============================================================
// Implements Burn's Batcher trait to turn a Vec<SourceSample>
// into one tensor per input source.
//
// A sample carries each source as ONE flat feature vector of
// length input_len. The batcher folds it into the layout the
// models expect:
//
//   source i, flat:  [x_0, x_1, ..., x_(input_len-1)]
//   source i, batch: [batch, n_feature_type_i, d_input_i]
//
// Row r of the folded source holds x_(r*d_input) .. x_((r+1)*d_input - 1).
//
// Reference: Burn Book §4 (Batcher)

use anyhow::{bail, Result};
use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::domain::settings::SourceLayout;

// ─── SourceSample ─────────────────────────────────────────────────────────────
/// One training example: a flat feature vector per source and its target.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSample {
    pub features: Vec<Vec<f32>>,
    pub target:   Vec<f32>,
}

impl SourceSample {
    /// Check this sample against the resolved source layouts and target width.
    pub fn check(&self, layouts: &[SourceLayout], target_width: usize) -> Result<()> {
        if self.features.len() != layouts.len() {
            bail!(
                "Sample has {} sources, settings describe {}",
                self.features.len(),
                layouts.len()
            );
        }
        for (index, (values, layout)) in self.features.iter().zip(layouts).enumerate() {
            if values.len() != layout.input_len {
                bail!(
                    "Source {index} has {} values, expected {}",
                    values.len(),
                    layout.input_len
                );
            }
        }
        if self.target.len() != target_width {
            bail!(
                "Target has {} values, expected {}",
                self.target.len(),
                target_width
            );
        }
        Ok(())
    }
}

// ─── SourceBatch ──────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct SourceBatch<B: Backend> {
    /// One `[batch, n_feature_type, d_input]` tensor per source
    pub sources: Vec<Tensor<B, 3>>,
    /// `[batch, target_width]`
    pub targets: Tensor<B, 2>,
}

// ─── SourceBatcher ────────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct SourceBatcher<B: Backend> {
    pub device:       B::Device,
    pub layouts:      Vec<SourceLayout>,
    pub target_width: usize,
}

impl<B: Backend> SourceBatcher<B> {
    pub fn new(device: B::Device, layouts: Vec<SourceLayout>, target_width: usize) -> Self {
        Self { device, layouts, target_width }
    }

    /// Validate every sample, then batch them.
    pub fn try_batch(&self, items: Vec<SourceSample>) -> Result<SourceBatch<B>> {
        if items.is_empty() {
            bail!("Cannot batch zero samples");
        }
        for (i, item) in items.iter().enumerate() {
            item.check(&self.layouts, self.target_width)
                .map_err(|e| e.context(format!("Sample {i} does not match the settings")))?;
        }
        Ok(self.batch(items))
    }
}

impl<B: Backend> Batcher<SourceSample, SourceBatch<B>> for SourceBatcher<B> {
    /// Samples are assumed valid; use `try_batch` for unchecked input.
    fn batch(&self, items: Vec<SourceSample>) -> SourceBatch<B> {
        let batch_size = items.len();

        let sources = self
            .layouts
            .iter()
            .enumerate()
            .map(|(i, layout)| {
                let flat: Vec<f32> = items
                    .iter()
                    .flat_map(|s| s.features[i].iter().copied())
                    .collect();
                let data = TensorData::new(
                    flat,
                    [batch_size, layout.n_feature_type, layout.d_input],
                );
                Tensor::<B, 3>::from_data(data, &self.device)
            })
            .collect();

        let targets: Vec<f32> = items.iter().flat_map(|s| s.target.iter().copied()).collect();
        let targets = Tensor::<B, 2>::from_data(
            TensorData::new(targets, [batch_size, self.target_width]),
            &self.device,
        );

        SourceBatch { sources, targets }
    }
}
