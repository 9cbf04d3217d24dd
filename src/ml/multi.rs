// ============================================================
// Layer 5 — Multi-Stack Models and Fusion Heads
// ============================================================
// MultiTransformers gives every input source its own input
// projection and its own transformer:
//
//   source i: [batch, n_i, d_input_i]
//       │  linear d_input_i → d_model_i
//       ▼
//   transformer i  (src and trg of the same source)
//       │
//       ▼
//   [batch, n_i * d_model_i]   (flat) or [batch, n_i, d_model_i]
//
// The four heads below differ only in how they fuse those
// per-source outputs into a single prediction:
//
//   PlusLinear        concat flat outputs → OutputFeedForward
//   PlusSdpAttention  last source attends over the others
//   PlusRnn           LSTM over every source's rows
//   PlusMulAttention  outer product of the others with the last
//
// Reference: Vaswani et al. (2017), Hochreiter & Schmidhuber (1997)

use burn::{
    nn::{Linear, Lstm, LstmConfig, LstmState},
    prelude::*,
    tensor::Distribution,
};

use crate::domain::{
    error::ModelError,
    settings::{ModelKind, SourceLayout},
};
use crate::ml::{
    fusion::{check_sources, FusionModel},
    output::{
        OutputAttentionLayer, OutputAttentionLayerConfig, OutputFeedForward,
        OutputFeedForwardConfig,
    },
    transformer::{Transformer, TransformerConfig},
    init::{linear, reset_lstm_biases, xavier},
};

// ─── Configuration ────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct MultiTransformersConfig {
    pub d_inputs:        Vec<usize>,
    pub d_models:        Vec<usize>,
    pub n_feature_types: Vec<usize>,
    pub n_layers:        usize,
    pub heads:           usize,
    pub output_layers:   Vec<usize>,
    #[config(default = 0.1)]
    pub dropout:         f64,
    #[config(default = 2048)]
    pub d_ff:            usize,
    #[config(default = 1e-6)]
    pub norm_eps:        f64,
    #[config(default = 200)]
    pub rnn_hidden:      usize,
    #[config(default = 20)]
    pub mul_hidden:      usize,
}

impl MultiTransformersConfig {
    /// Per-source layouts implied by the three per-source lists.
    pub fn layouts(&self) -> Result<Vec<SourceLayout>, ModelError> {
        let n = self.d_inputs.len();
        if n == 0 {
            return Err(ModelError::NoSources);
        }
        for (field, len) in [("d_models", self.d_models.len()), ("n_feature_types", self.n_feature_types.len())] {
            if len != n {
                return Err(ModelError::ListLengthMismatch { field, expected: n, actual: len });
            }
        }

        Ok(self
            .d_inputs
            .iter()
            .zip(&self.d_models)
            .zip(&self.n_feature_types)
            .map(|((&d_input, &d_model), &n_feature_type)| SourceLayout {
                input_len: d_input * n_feature_type,
                n_feature_type,
                d_input,
                d_model,
            })
            .collect())
    }

    fn transformer(&self, d_model: usize) -> TransformerConfig {
        TransformerConfig::new(d_model, self.n_layers, self.heads)
            .with_dropout(self.dropout)
            .with_d_ff(self.d_ff)
            .with_norm_eps(self.norm_eps)
    }

    fn output(&self, h: usize, w: usize) -> OutputFeedForwardConfig {
        OutputFeedForwardConfig::new(h, w, self.output_layers.clone()).with_dropout(self.dropout)
    }

    /// The shared per-source stacks without any fusion head.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<MultiTransformers<B>, ModelError> {
        let layouts = self.layouts()?;

        let linear_layers = layouts
            .iter()
            .map(|l| linear(l.d_input, l.d_model, device))
            .collect();
        let transformers = layouts
            .iter()
            .map(|l| self.transformer(l.d_model).init(device))
            .collect();

        Ok(MultiTransformers {
            linear_layers,
            transformers,
            d_inputs:        self.d_inputs.clone(),
            d_models:        self.d_models.clone(),
            n_feature_types: self.n_feature_types.clone(),
        })
    }

    pub fn init_plus_linear<B: Backend>(
        &self,
        device: &B::Device,
    ) -> Result<MultiTransformersPlusLinear<B>, ModelError> {
        let layouts = self.layouts()?;
        ModelKind::MultiTransformersPlusLinear.check_sources(&layouts)?;

        let out_input_length: usize = layouts.iter().map(SourceLayout::flat_output_len).sum();
        Ok(MultiTransformersPlusLinear {
            base: self.init(device)?,
            out:  self.output(out_input_length, 1).init(device),
        })
    }

    pub fn init_plus_sdp_attention<B: Backend>(
        &self,
        device: &B::Device,
    ) -> Result<MultiTransformersPlusSdpAttention<B>, ModelError> {
        let layouts = self.layouts()?;
        ModelKind::MultiTransformersPlusSdpAttention.check_sources(&layouts)?;

        let first = layouts[0];
        let last  = layouts[layouts.len() - 1];
        Ok(MultiTransformersPlusSdpAttention {
            base:        self.init(device)?,
            output_attn: OutputAttentionLayerConfig::new(first.d_model, last.d_model).init(device),
            out:         self.output(last.n_feature_type, last.d_model).init(device),
        })
    }

    pub fn init_plus_rnn<B: Backend>(
        &self,
        device: &B::Device,
    ) -> Result<MultiTransformersPlusRnn<B>, ModelError> {
        let layouts = self.layouts()?;
        ModelKind::MultiTransformersPlusRnn.check_sources(&layouts)?;

        let total_rows: usize = layouts.iter().map(|l| l.n_feature_type).sum();
        let mut rnn = LstmConfig::new(layouts[0].d_model, self.rnn_hidden, true)
            .with_initializer(xavier())
            .init(device);
        reset_lstm_biases(&mut rnn, self.rnn_hidden);

        Ok(MultiTransformersPlusRnn {
            base:        self.init(device)?,
            rnn,
            out:         self.output(total_rows, self.rnn_hidden).init(device),
            hidden_size: self.rnn_hidden,
        })
    }

    pub fn init_plus_mul_attention<B: Backend>(
        &self,
        device: &B::Device,
    ) -> Result<MultiTransformersPlusMulAttention<B>, ModelError> {
        let layouts = self.layouts()?;
        ModelKind::MultiTransformersPlusMulAttention.check_sources(&layouts)?;

        let (memory, last) = layouts.split_at(layouts.len() - 1);
        let memory_rows: usize = memory.iter().map(|l| l.n_feature_type).sum();
        Ok(MultiTransformersPlusMulAttention {
            base:        self.init(device)?,
            linear:      linear(memory[0].d_model, self.mul_hidden, device),
            out:         self.output(memory_rows * self.mul_hidden, last[0].flat_output_len())
                .init(device),
            hidden_size: self.mul_hidden,
        })
    }
}

// ─── MultiTransformers ────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct MultiTransformers<B: Backend> {
    pub linear_layers:   Vec<Linear<B>>,
    pub transformers:    Vec<Transformer<B>>,
    pub d_inputs:        Vec<usize>,
    pub d_models:        Vec<usize>,
    pub n_feature_types: Vec<usize>,
}

impl<B: Backend> MultiTransformers<B> {
    fn source_shapes(&self) -> Vec<(usize, usize)> {
        self.n_feature_types
            .iter()
            .copied()
            .zip(self.d_inputs.iter().copied())
            .collect()
    }

    /// Per-source decoder outputs, `[batch, n_i, d_model_i]` each.
    pub fn forward_sequences(
        &self,
        src_list: Vec<Tensor<B, 3>>,
        trg_list: Vec<Tensor<B, 3>>,
    ) -> Result<Vec<Tensor<B, 3>>, ModelError> {
        let shapes = self.source_shapes();
        check_sources(&src_list, &shapes)?;
        check_sources(&trg_list, &shapes)?;

        Ok(self
            .linear_layers
            .iter()
            .zip(&self.transformers)
            .zip(src_list.into_iter().zip(trg_list))
            .map(|((linear, transformer), (src, trg))| {
                let src = linear.forward(src);
                let trg = linear.forward(trg);
                transformer.forward_sequence(src, trg, None, None)
            })
            .collect())
    }

    /// Per-source outputs flattened to `[batch, n_i * d_model_i]`.
    pub fn forward(
        &self,
        src_list: Vec<Tensor<B, 3>>,
        trg_list: Vec<Tensor<B, 3>>,
    ) -> Result<Vec<Tensor<B, 2>>, ModelError> {
        Ok(self
            .forward_sequences(src_list, trg_list)?
            .into_iter()
            .map(flatten_rows)
            .collect())
    }
}

/// `[batch, rows, width]` → `[batch, rows * width]`
fn flatten_rows<B: Backend>(x: Tensor<B, 3>) -> Tensor<B, 2> {
    let [batch_size, rows, width] = x.dims();
    x.reshape([batch_size, rows * width])
}

/// Split the per-source outputs into (all but last stacked on the row axis, last).
fn split_last<B: Backend>(mut outputs: Vec<Tensor<B, 3>>) -> Result<(Tensor<B, 3>, Tensor<B, 3>), ModelError> {
    let actual = outputs.len();
    match outputs.pop() {
        Some(last) if !outputs.is_empty() => Ok((Tensor::cat(outputs, 1), last)),
        _ => Err(ModelError::SourceCountMismatch { expected: 2, actual }),
    }
}

// ─── MultiTransformersPlusLinear ──────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct MultiTransformersPlusLinear<B: Backend> {
    pub base: MultiTransformers<B>,
    pub out:  OutputFeedForward<B>,
}

impl<B: Backend> FusionModel<B> for MultiTransformersPlusLinear<B> {
    fn kind(&self) -> ModelKind {
        ModelKind::MultiTransformersPlusLinear
    }

    fn forward(
        &self,
        src_list: Vec<Tensor<B, 3>>,
        trg_list: Vec<Tensor<B, 3>>,
    ) -> Result<Tensor<B, 2>, ModelError> {
        let output_list = self.base.forward(src_list, trg_list)?;
        let cat_output  = Tensor::cat(output_list, 1);
        Ok(self.out.forward(cat_output))
    }

    fn num_params(&self) -> usize {
        <Self as Module<B>>::num_params(self)
    }
}

// ─── MultiTransformersPlusSdpAttention ────────────────────────────────────────
#[derive(Module, Debug)]
pub struct MultiTransformersPlusSdpAttention<B: Backend> {
    pub base:        MultiTransformers<B>,
    pub output_attn: OutputAttentionLayer<B>,
    pub out:         OutputFeedForward<B>,
}

impl<B: Backend> FusionModel<B> for MultiTransformersPlusSdpAttention<B> {
    fn kind(&self) -> ModelKind {
        ModelKind::MultiTransformersPlusSdpAttention
    }

    fn forward(
        &self,
        src_list: Vec<Tensor<B, 3>>,
        trg_list: Vec<Tensor<B, 3>>,
    ) -> Result<Tensor<B, 2>, ModelError> {
        let outputs = self.base.forward_sequences(src_list, trg_list)?;
        let (cat_output, query) = split_last(outputs)?;
        let attn_output = self.output_attn.forward(query, cat_output);
        Ok(self.out.forward(flatten_rows(attn_output)))
    }

    fn num_params(&self) -> usize {
        <Self as Module<B>>::num_params(self)
    }
}

// ─── MultiTransformersPlusRnn ─────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct MultiTransformersPlusRnn<B: Backend> {
    pub base:        MultiTransformers<B>,
    pub rnn:         Lstm<B>,
    pub out:         OutputFeedForward<B>,
    pub hidden_size: usize,
}

impl<B: Backend> FusionModel<B> for MultiTransformersPlusRnn<B> {
    fn kind(&self) -> ModelKind {
        ModelKind::MultiTransformersPlusRnn
    }

    fn forward(
        &self,
        src_list: Vec<Tensor<B, 3>>,
        trg_list: Vec<Tensor<B, 3>>,
    ) -> Result<Tensor<B, 2>, ModelError> {
        let outputs    = self.base.forward_sequences(src_list, trg_list)?;
        let cat_output = Tensor::cat(outputs, 1);

        // The recurrence starts from a random normal state on every call.
        let [batch_size, _, _] = cat_output.dims();
        let device = cat_output.device();
        let state = LstmState::new(
            Tensor::random([batch_size, self.hidden_size], Distribution::Normal(0.0, 1.0), &device),
            Tensor::random([batch_size, self.hidden_size], Distribution::Normal(0.0, 1.0), &device),
        );

        let (rnn_output, _) = self.rnn.forward(cat_output, Some(state));
        Ok(self.out.forward(flatten_rows(rnn_output)))
    }

    fn num_params(&self) -> usize {
        <Self as Module<B>>::num_params(self)
    }
}

// ─── MultiTransformersPlusMulAttention ────────────────────────────────────────
#[derive(Module, Debug)]
pub struct MultiTransformersPlusMulAttention<B: Backend> {
    pub base:        MultiTransformers<B>,
    pub linear:      Linear<B>,
    pub out:         OutputFeedForward<B>,
    pub hidden_size: usize,
}

impl<B: Backend> FusionModel<B> for MultiTransformersPlusMulAttention<B> {
    fn kind(&self) -> ModelKind {
        ModelKind::MultiTransformersPlusMulAttention
    }

    fn forward(
        &self,
        src_list: Vec<Tensor<B, 3>>,
        trg_list: Vec<Tensor<B, 3>>,
    ) -> Result<Tensor<B, 2>, ModelError> {
        let outputs = self.base.forward_sequences(src_list, trg_list)?;
        let (cat_output, last) = split_last(outputs)?;

        // [batch, H, d] → [batch, H * hidden, 1]
        let projected = flatten_rows(self.linear.forward(cat_output));
        let [batch_size, left_len] = projected.dims();
        let left = projected.reshape([batch_size, left_len, 1]);

        // [batch, n_last, d_last] → [batch, 1, n_last * d_last]
        let right = flatten_rows(last);
        let [_, right_len] = right.dims();
        let right = right.reshape([batch_size, 1, right_len]);

        let mul_output = left.matmul(right);
        Ok(self.out.forward(flatten_rows(mul_output)))
    }

    fn num_params(&self) -> usize {
        <Self as Module<B>>::num_params(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use burn::tensor::ElementConversion;

    type TestBackend = NdArray;

    /// Two sources: 3 rows of 5 features and 1 row of 4 features, both 8 wide.
    fn config() -> MultiTransformersConfig {
        MultiTransformersConfig::new(vec![5, 4], vec![8, 8], vec![3, 1], 1, 2, vec![6, 1])
            .with_d_ff(16)
            .with_dropout(0.0)
            .with_rnn_hidden(10)
            .with_mul_hidden(4)
    }

    fn inputs<B: Backend>(batch: usize, device: &B::Device) -> Vec<Tensor<B, 3>> {
        vec![
            Tensor::random([batch, 3, 5], Distribution::Default, device),
            Tensor::random([batch, 1, 4], Distribution::Default, device),
        ]
    }

    #[test]
    fn test_base_returns_one_flat_output_per_source() {
        let device = Default::default();
        let base = config().init::<TestBackend>(&device).unwrap();
        assert_eq!(base.transformers.len(), 2);

        let x = inputs::<TestBackend>(2, &device);
        let outputs = base.forward(x.clone(), x).unwrap();
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0].dims(), [2, 24]);
        assert_eq!(outputs[1].dims(), [2, 8]);
    }

    #[test]
    fn test_inconsistent_lists_are_rejected() {
        let device = Default::default();
        let cfg = MultiTransformersConfig::new(vec![5, 4], vec![8], vec![3, 1], 1, 2, vec![1]);
        assert_eq!(
            cfg.init::<TestBackend>(&device).unwrap_err(),
            ModelError::ListLengthMismatch { field: "d_models", expected: 2, actual: 1 }
        );
    }

    #[test]
    fn test_plus_linear_head() {
        let device = Default::default();
        let model = config().init_plus_linear::<TestBackend>(&device).unwrap();
        assert_eq!(model.out.linears[0].weight.dims(), [24 + 8, 6]);

        let x = inputs::<TestBackend>(3, &device);
        assert_eq!(FusionModel::forward(&model, x.clone(), x).unwrap().dims(), [3, 1]);
    }

    #[test]
    fn test_plus_sdp_attention_head() {
        let device = Default::default();
        let model = config().init_plus_sdp_attention::<TestBackend>(&device).unwrap();
        // Query is the single-row last source: 1 * 8 inputs
        assert_eq!(model.out.linears[0].weight.dims(), [8, 6]);

        let x = inputs::<TestBackend>(3, &device);
        assert_eq!(FusionModel::forward(&model, x.clone(), x).unwrap().dims(), [3, 1]);
    }

    #[test]
    fn test_plus_rnn_head() {
        let device = Default::default();
        let model = config().init_plus_rnn::<TestBackend>(&device).unwrap();
        // (3 + 1) rows of 10 hidden units
        assert_eq!(model.out.linears[0].weight.dims(), [40, 6]);

        let x = inputs::<TestBackend>(2, &device);
        assert_eq!(FusionModel::forward(&model, x.clone(), x).unwrap().dims(), [2, 1]);
    }

    #[test]
    fn test_plus_rnn_rejects_mixed_widths() {
        let device = Default::default();
        let mut cfg = config();
        cfg.d_models = vec![8, 4];
        assert_eq!(
            cfg.init_plus_rnn::<TestBackend>(&device).unwrap_err(),
            ModelError::MixedWidths { kind: ModelKind::MultiTransformersPlusRnn, widths: vec![8, 4] }
        );
    }

    #[test]
    fn test_plus_mul_attention_head() {
        let device = Default::default();
        let model = config().init_plus_mul_attention::<TestBackend>(&device).unwrap();
        // 3 memory rows * 4 hidden, times 1 * 8 query features
        assert_eq!(model.out.linears[0].weight.dims(), [3 * 4 * 8, 6]);

        let x = inputs::<TestBackend>(2, &device);
        assert_eq!(FusionModel::forward(&model, x.clone(), x).unwrap().dims(), [2, 1]);
    }

    /// Memory source of 3 rows, 8 wide; last source of 2 rows, 4 wide.
    fn wide_memory_config() -> MultiTransformersConfig {
        MultiTransformersConfig::new(vec![5, 3], vec![8, 4], vec![3, 2], 1, 2, vec![6, 1])
            .with_d_ff(16)
            .with_dropout(0.0)
            .with_mul_hidden(4)
    }

    fn wide_memory_inputs(batch: usize, device: &<TestBackend as Backend>::Device) -> Vec<Tensor<TestBackend, 3>> {
        vec![
            Tensor::random([batch, 3, 5], Distribution::Default, device),
            Tensor::random([batch, 2, 3], Distribution::Default, device),
        ]
    }

    #[test]
    fn test_sdp_attention_with_multi_row_narrow_query() {
        let device = Default::default();
        let model = wide_memory_config().init_plus_sdp_attention::<TestBackend>(&device).unwrap();

        // Keys and values map the 8-wide memory onto the 4-wide query
        assert_eq!(model.output_attn.key.weight.dims(), [8, 4]);
        // 2 query rows * 4 features
        assert_eq!(model.out.linears[0].weight.dims(), [2 * 4, 6]);

        let x = wide_memory_inputs(2, &device);
        assert_eq!(FusionModel::forward(&model, x.clone(), x).unwrap().dims(), [2, 1]);
    }

    #[test]
    fn test_mul_attention_with_multi_row_narrow_last_source() {
        let device = Default::default();
        let model = wide_memory_config().init_plus_mul_attention::<TestBackend>(&device).unwrap();

        // Projection reads the memory width, not the last source's
        assert_eq!(model.linear.weight.dims(), [8, 4]);
        // 3 memory rows * 4 hidden, times 2 * 4 last-source features
        assert_eq!(model.out.linears[0].weight.dims(), [3 * 4 * 2 * 4, 6]);

        let x = wide_memory_inputs(2, &device);
        assert_eq!(FusionModel::forward(&model, x.clone(), x).unwrap().dims(), [2, 1]);
    }

    #[test]
    fn test_projection_biases_use_fan_in_bound() {
        let device = Default::default();
        let base = config().init::<TestBackend>(&device).unwrap();

        for (linear, d_input) in base.linear_layers.iter().zip([5usize, 4]) {
            let bias = linear.bias.as_ref().unwrap().val();
            let max: f32 = bias.abs().max().into_scalar().elem();
            assert!(max as f64 <= 1.0 / (d_input as f64).sqrt() + 1e-6);
        }
    }

    #[test]
    fn test_attention_heads_need_two_sources() {
        let device = Default::default();
        let cfg = MultiTransformersConfig::new(vec![5], vec![8], vec![3], 1, 2, vec![1]);
        assert!(matches!(
            cfg.init_plus_sdp_attention::<TestBackend>(&device),
            Err(ModelError::TooFewSources { min: 2, actual: 1, .. })
        ));
    }

    #[test]
    fn test_loss_gradients_reach_every_source_projection() {
        type AdBackend = Autodiff<TestBackend>;
        let device = Default::default();
        let model = config().init_plus_linear::<AdBackend>(&device).unwrap();

        let x = inputs::<AdBackend>(4, &device);
        let targets = Tensor::<AdBackend, 2>::zeros([4, 1], &device);
        let (loss, output) = model.forward_loss(x.clone(), x, targets).unwrap();
        assert_eq!(output.dims(), [4, 1]);

        let grads = loss.backward();
        for linear in &model.base.linear_layers {
            assert!(linear.weight.grad(&grads).is_some());
        }
    }
}
