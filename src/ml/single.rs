// ============================================================
// Layer 5 — Single-Stack Models
// ============================================================
// Both models here run every input through ONE transformer.
//
//   TransformerPlusLinear
//     one source → shared input projection (src and trg)
//                → transformer → flatten → OutputFeedForward
//
//   FlexibleTransformer
//     source i → its own projection d_input_i → d_model
//     all projected sources concatenated along the sequence
//     axis → transformer → flatten → OutputFeedForward
//
// Neither model uses attention masks; every source position
// is real data.

use burn::{
    nn::Linear,
    prelude::*,
};

use crate::domain::{error::ModelError, settings::ModelKind};
use crate::ml::{
    fusion::{check_sources, FusionModel},
    output::{OutputFeedForward, OutputFeedForwardConfig},
    transformer::{Transformer, TransformerConfig},
    init::linear,
};

// ─── TransformerPlusLinear ────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct TransformerPlusLinearConfig {
    pub transformer:    TransformerConfig,
    pub d_input:        usize,
    pub n_feature_type: usize,
    pub output_layers:  Vec<usize>,
}

impl TransformerPlusLinearConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> TransformerPlusLinear<B> {
        let d_model = self.transformer.d_model;
        TransformerPlusLinear {
            input_linear:   linear(self.d_input, d_model, device),
            transformer:    self.transformer.init(device),
            out:            OutputFeedForwardConfig::new(
                d_model,
                self.n_feature_type,
                self.output_layers.clone(),
            )
            .with_dropout(self.transformer.dropout)
            .init(device),
            d_input:        self.d_input,
            n_feature_type: self.n_feature_type,
        }
    }
}

#[derive(Module, Debug)]
pub struct TransformerPlusLinear<B: Backend> {
    pub input_linear:   Linear<B>,
    pub transformer:    Transformer<B>,
    pub out:            OutputFeedForward<B>,
    pub d_input:        usize,
    pub n_feature_type: usize,
}

impl<B: Backend> TransformerPlusLinear<B> {
    /// `[batch, n_feature_type, d_input]` twice → `[batch, output_width]`
    pub fn forward_pair(&self, src: Tensor<B, 3>, trg: Tensor<B, 3>) -> Tensor<B, 2> {
        let src = self.input_linear.forward(src);
        let trg = self.input_linear.forward(trg);
        let flat_d_output = self.transformer.forward(src, trg, None, None);
        self.out.forward(flat_d_output)
    }
}

impl<B: Backend> FusionModel<B> for TransformerPlusLinear<B> {
    fn kind(&self) -> ModelKind {
        ModelKind::TransformerPlusLinear
    }

    fn forward(
        &self,
        src_list: Vec<Tensor<B, 3>>,
        trg_list: Vec<Tensor<B, 3>>,
    ) -> Result<Tensor<B, 2>, ModelError> {
        let shape = [(self.n_feature_type, self.d_input)];
        check_sources(&src_list, &shape)?;
        check_sources(&trg_list, &shape)?;

        match (src_list.into_iter().next(), trg_list.into_iter().next()) {
            (Some(src), Some(trg)) => Ok(self.forward_pair(src, trg)),
            _ => Err(ModelError::NoSources),
        }
    }

    fn num_params(&self) -> usize {
        <Self as Module<B>>::num_params(self)
    }
}

// ─── FlexibleTransformer ──────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct FlexibleTransformerConfig {
    pub transformer:     TransformerConfig,
    pub d_inputs:        Vec<usize>,
    pub n_feature_types: Vec<usize>,
    pub output_layers:   Vec<usize>,
}

impl FlexibleTransformerConfig {
    pub fn init<B: Backend>(
        &self,
        device: &B::Device,
    ) -> Result<FlexibleTransformer<B>, ModelError> {
        if self.d_inputs.is_empty() {
            return Err(ModelError::NoSources);
        }
        if self.n_feature_types.len() != self.d_inputs.len() {
            return Err(ModelError::ListLengthMismatch {
                field:    "n_feature_types",
                expected: self.d_inputs.len(),
                actual:   self.n_feature_types.len(),
            });
        }

        let d_model = self.transformer.d_model;
        let linear_layers = self
            .d_inputs
            .iter()
            .map(|&d_input| linear(d_input, d_model, device))
            .collect();

        let total_rows: usize = self.n_feature_types.iter().sum();
        let out = OutputFeedForwardConfig::new(d_model * total_rows, 1, self.output_layers.clone())
            .with_dropout(self.transformer.dropout)
            .init(device);

        Ok(FlexibleTransformer {
            linear_layers,
            transformer:     self.transformer.init(device),
            out,
            d_inputs:        self.d_inputs.clone(),
            n_feature_types: self.n_feature_types.clone(),
        })
    }
}

#[derive(Module, Debug)]
pub struct FlexibleTransformer<B: Backend> {
    pub linear_layers:   Vec<Linear<B>>,
    pub transformer:     Transformer<B>,
    pub out:             OutputFeedForward<B>,
    pub d_inputs:        Vec<usize>,
    pub n_feature_types: Vec<usize>,
}

impl<B: Backend> FlexibleTransformer<B> {
    fn source_shapes(&self) -> Vec<(usize, usize)> {
        self.n_feature_types
            .iter()
            .copied()
            .zip(self.d_inputs.iter().copied())
            .collect()
    }

    /// Project every source and concatenate along the sequence axis.
    fn project(&self, sources: Vec<Tensor<B, 3>>) -> Tensor<B, 3> {
        let projected: Vec<Tensor<B, 3>> = self
            .linear_layers
            .iter()
            .zip(sources)
            .map(|(linear, source)| linear.forward(source))
            .collect();
        Tensor::cat(projected, 1)
    }
}

impl<B: Backend> FusionModel<B> for FlexibleTransformer<B> {
    fn kind(&self) -> ModelKind {
        ModelKind::FlexibleTransformer
    }

    fn forward(
        &self,
        src_list: Vec<Tensor<B, 3>>,
        trg_list: Vec<Tensor<B, 3>>,
    ) -> Result<Tensor<B, 2>, ModelError> {
        let shapes = self.source_shapes();
        check_sources(&src_list, &shapes)?;
        check_sources(&trg_list, &shapes)?;

        let final_src = self.project(src_list);
        let final_trg = self.project(trg_list);
        let flat_d_output = self.transformer.forward(final_src, final_trg, None, None);
        Ok(self.out.forward(flat_d_output))
    }

    fn num_params(&self) -> usize {
        <Self as Module<B>>::num_params(self)
    }
}
