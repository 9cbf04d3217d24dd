// ============================================================
// Layer 5 — Transformer Sublayers
// ============================================================
// The blocks every Encoder/Decoder stack is cloned from.
//
//   FeedForward   — position-wise MLP: linear → relu → dropout → linear
//   EncoderLayer  — self-attention + feed-forward
//   DecoderLayer  — self-attention + cross-attention + feed-forward
//
// Both layers are pre-norm: each sublayer sees a normalised
// copy of its input and its output is added back residually.
//
//   x = x + dropout(sublayer(norm(x)))
//
// The stacks in transformer.rs apply one more norm at the end.
//
// Reference: Vaswani et al. (2017) Attention Is All You Need
//            Burn Book §3 (Building Blocks)

use burn::{
    nn::{
        attention::{MhaInput, MultiHeadAttention},
        Dropout, DropoutConfig, LayerNorm, Linear,
    },
    prelude::*,
    tensor::{activation, Bool},
};

use crate::ml::init::linear;

// ─── FeedForward ──────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct FeedForwardConfig {
    pub d_model: usize,
    pub d_ff:    usize,
    #[config(default = 0.1)]
    pub dropout: f64,
}

impl FeedForwardConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> FeedForward<B> {
        FeedForward {
            linear_1: linear(self.d_model, self.d_ff, device),
            dropout:  DropoutConfig::new(self.dropout).init(),
            linear_2: linear(self.d_ff, self.d_model, device),
        }
    }
}

#[derive(Module, Debug)]
pub struct FeedForward<B: Backend> {
    pub linear_1: Linear<B>,
    pub dropout:  Dropout,
    pub linear_2: Linear<B>,
}

impl<B: Backend> FeedForward<B> {
    /// `[batch, seq, d_model]` → `[batch, seq, d_model]`
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let x = activation::relu(self.linear_1.forward(x));
        self.linear_2.forward(self.dropout.forward(x))
    }
}

// ─── EncoderLayer ─────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct EncoderLayer<B: Backend> {
    pub norm_1:    LayerNorm<B>,
    pub norm_2:    LayerNorm<B>,
    pub attn:      MultiHeadAttention<B>,
    pub ff:        FeedForward<B>,
    pub dropout_1: Dropout,
    pub dropout_2: Dropout,
}

impl<B: Backend> EncoderLayer<B> {
    /// `mask` is a padding mask of shape `[batch, seq]`; `true` marks a
    /// position that must not be attended to.
    pub fn forward(&self, x: Tensor<B, 3>, mask: Option<Tensor<B, 2, Bool>>) -> Tensor<B, 3> {
        let x2 = self.norm_1.forward(x.clone());
        let mut input = MhaInput::self_attn(x2);
        if let Some(mask) = mask {
            input = input.mask_pad(mask);
        }
        let x = x + self.dropout_1.forward(self.attn.forward(input).context);

        let x2 = self.norm_2.forward(x.clone());
        x + self.dropout_2.forward(self.ff.forward(x2))
    }
}

// ─── DecoderLayer ─────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct DecoderLayer<B: Backend> {
    pub norm_1:    LayerNorm<B>,
    pub norm_2:    LayerNorm<B>,
    pub norm_3:    LayerNorm<B>,
    pub attn_1:    MultiHeadAttention<B>,
    pub attn_2:    MultiHeadAttention<B>,
    pub ff:        FeedForward<B>,
    pub dropout_1: Dropout,
    pub dropout_2: Dropout,
    pub dropout_3: Dropout,
}

impl<B: Backend> DecoderLayer<B> {
    /// * `e_outputs` — encoder output, `[batch, src_seq, d_model]`
    /// * `src_mask`  — padding mask over the encoder positions, `[batch, src_seq]`
    /// * `trg_mask`  — attention mask over target positions, `[batch, trg_seq, trg_seq]`
    pub fn forward(
        &self,
        x:         Tensor<B, 3>,
        e_outputs: Tensor<B, 3>,
        src_mask:  Option<Tensor<B, 2, Bool>>,
        trg_mask:  Option<Tensor<B, 3, Bool>>,
    ) -> Tensor<B, 3> {
        let x2 = self.norm_1.forward(x.clone());
        let mut self_input = MhaInput::self_attn(x2);
        if let Some(mask) = trg_mask {
            self_input = self_input.mask_attn(mask);
        }
        let x = x + self.dropout_1.forward(self.attn_1.forward(self_input).context);

        let x2 = self.norm_2.forward(x.clone());
        let mut cross_input = MhaInput::new(x2, e_outputs.clone(), e_outputs);
        if let Some(mask) = src_mask {
            cross_input = cross_input.mask_pad(mask);
        }
        let x = x + self.dropout_2.forward(self.attn_2.forward(cross_input).context);

        let x2 = self.norm_3.forward(x.clone());
        x + self.dropout_3.forward(self.ff.forward(x2))
    }
}
