// ============================================================
// Layer 5 — Output Heads
// ============================================================
// OutputFeedForward is the final MLP of every model. It takes
// a flat [batch, h * w] input and walks through the widths in
// `d_layers`; the last entry is the prediction width (1 for a
// scalar regression target).
//
//   h*w → d_layers[0] → relu/dropout → d_layers[1] → ... → d_layers[n-1]
//
// OutputAttentionLayer is a single-head scaled dot-product
// attention used by the SDP fusion head: query rows from one
// source attend over memory rows stacked from the others.

use burn::{
    nn::{Dropout, DropoutConfig, Linear},
    prelude::*,
    tensor::activation,
};

use crate::ml::init::linear;

// ─── OutputFeedForward ────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct OutputFeedForwardConfig {
    pub h:        usize,
    pub w:        usize,
    pub d_layers: Vec<usize>,
    #[config(default = 0.1)]
    pub dropout:  f64,
}

impl OutputFeedForwardConfig {
    pub fn d_input(&self) -> usize {
        self.h * self.w
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> OutputFeedForward<B> {
        let widths: Vec<usize> = std::iter::once(self.d_input())
            .chain(self.d_layers.iter().copied())
            .collect();

        let linears = widths
            .windows(2)
            .map(|pair| linear(pair[0], pair[1], device))
            .collect();
        let dropouts = (1..self.d_layers.len())
            .map(|_| DropoutConfig::new(self.dropout).init())
            .collect();

        OutputFeedForward { linears, dropouts }
    }
}

#[derive(Module, Debug)]
pub struct OutputFeedForward<B: Backend> {
    pub linears:  Vec<Linear<B>>,
    pub dropouts: Vec<Dropout>,
}

impl<B: Backend> OutputFeedForward<B> {
    /// `[batch, h * w]` → `[batch, d_layers.last()]`
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let last = self.linears.len().saturating_sub(1);
        let mut x = x;
        for (i, linear) in self.linears.iter().enumerate() {
            x = linear.forward(x);
            if i < last {
                x = self.dropouts[i].forward(activation::relu(x));
            }
        }
        x
    }
}

// ─── OutputAttentionLayer ─────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct OutputAttentionLayerConfig {
    /// Width of the memory rows (the stacked sources)
    pub d_memory: usize,
    /// Width of the query rows (the last source)
    pub d_query:  usize,
}

impl OutputAttentionLayerConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> OutputAttentionLayer<B> {
        OutputAttentionLayer {
            key:     linear(self.d_memory, self.d_query, device),
            value:   linear(self.d_memory, self.d_query, device),
            d_query: self.d_query,
        }
    }
}

#[derive(Module, Debug)]
pub struct OutputAttentionLayer<B: Backend> {
    pub key:     Linear<B>,
    pub value:   Linear<B>,
    pub d_query: usize,
}

impl<B: Backend> OutputAttentionLayer<B> {
    /// `query: [batch, n_q, d_query]`, `memory: [batch, n_m, d_memory]` → `[batch, n_q, d_query]`
    pub fn forward(&self, query: Tensor<B, 3>, memory: Tensor<B, 3>) -> Tensor<B, 3> {
        self.forward_with_weights(query, memory).0
    }

    /// Same as `forward`, also returning the `[batch, n_q, n_m]` attention weights.
    pub fn forward_with_weights(
        &self,
        query:  Tensor<B, 3>,
        memory: Tensor<B, 3>,
    ) -> (Tensor<B, 3>, Tensor<B, 3>) {
        let keys   = self.key.forward(memory.clone());
        let values = self.value.forward(memory);

        let scores = query
            .matmul(keys.swap_dims(1, 2))
            .div_scalar((self.d_query as f64).sqrt());
        let weights = activation::softmax(scores, 2);

        (weights.clone().matmul(values), weights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::{Distribution, ElementConversion};

    type TestBackend = NdArray;

    #[test]
    fn test_feed_forward_walks_every_width() {
        let device = Default::default();
        let head = OutputFeedForwardConfig::new(3, 8, vec![32, 16, 1]).init::<TestBackend>(&device);

        assert_eq!(head.linears.len(), 3);
        assert_eq!(head.dropouts.len(), 2);

        let x = Tensor::<TestBackend, 2>::random([5, 24], Distribution::Default, &device);
        assert_eq!(head.forward(x).dims(), [5, 1]);
    }

    #[test]
    fn test_single_width_is_one_linear_layer() {
        let device = Default::default();
        let head = OutputFeedForwardConfig::new(10, 1, vec![4]).init::<TestBackend>(&device);
        assert_eq!(head.linears.len(), 1);
        assert!(head.dropouts.is_empty());

        // No activation after the final layer, so negative outputs survive
        let x = Tensor::<TestBackend, 2>::random([64, 10], Distribution::Normal(0.0, 1.0), &device);
        let out = head.forward(x);
        let min: f32 = out.min().into_scalar().elem();
        assert!(min < 0.0);
    }

    #[test]
    fn test_attention_weights_are_a_distribution() {
        let device = Default::default();
        let attn = OutputAttentionLayerConfig::new(12, 8).init::<TestBackend>(&device);

        let query  = Tensor::<TestBackend, 3>::random([2, 1, 8], Distribution::Default, &device);
        let memory = Tensor::<TestBackend, 3>::random([2, 5, 12], Distribution::Default, &device);
        let (out, weights) = attn.forward_with_weights(query, memory);

        assert_eq!(out.dims(), [2, 1, 8]);
        assert_eq!(weights.dims(), [2, 1, 5]);

        let sums = weights.sum_dim(2).reshape([2]);
        sums.into_data()
            .assert_approx_eq(&TensorData::from([1.0f32, 1.0]), 4);
    }
}
