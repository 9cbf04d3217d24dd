// ============================================================
// Layer 5 — Encoder / Decoder / Transformer
// ============================================================
// N cloned encoder layers followed by a LayerNorm, and the
// same for the decoder. The Transformer runs the encoder over
// `src`, the decoder over `trg` (attending to the encoder
// output) and hands back the decoder output flattened to
// [batch, seq * d_model], which is what every output head
// in this crate consumes.

use burn::{
    nn::{
        attention::{MultiHeadAttention, MultiHeadAttentionConfig},
        DropoutConfig, LayerNorm, LayerNormConfig,
    },
    prelude::*,
    tensor::Bool,
};

use crate::ml::{
    init::{reset_attention_biases, xavier},
    layers::{DecoderLayer, EncoderLayer, FeedForward, FeedForwardConfig},
};

#[derive(Config, Debug)]
pub struct TransformerConfig {
    pub d_model:  usize,
    pub n_layers: usize,
    pub heads:    usize,
    #[config(default = 0.1)]
    pub dropout:  f64,
    #[config(default = 2048)]
    pub d_ff:     usize,
    #[config(default = 1e-6)]
    pub norm_eps: f64,
}

impl TransformerConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Transformer<B> {
        let encoder = Encoder {
            layers: (0..self.n_layers).map(|_| self.build_encoder_layer(device)).collect(),
            norm:   self.build_norm(device),
        };
        let decoder = Decoder {
            layers: (0..self.n_layers).map(|_| self.build_decoder_layer(device)).collect(),
            norm:   self.build_norm(device),
        };
        Transformer { encoder, decoder }
    }

    pub fn build_encoder_layer<B: Backend>(&self, device: &B::Device) -> EncoderLayer<B> {
        EncoderLayer {
            norm_1:    self.build_norm(device),
            norm_2:    self.build_norm(device),
            attn:      self.build_attention(device),
            ff:        self.build_feed_forward(device),
            dropout_1: DropoutConfig::new(self.dropout).init(),
            dropout_2: DropoutConfig::new(self.dropout).init(),
        }
    }

    pub fn build_decoder_layer<B: Backend>(&self, device: &B::Device) -> DecoderLayer<B> {
        DecoderLayer {
            norm_1:    self.build_norm(device),
            norm_2:    self.build_norm(device),
            norm_3:    self.build_norm(device),
            attn_1:    self.build_attention(device),
            attn_2:    self.build_attention(device),
            ff:        self.build_feed_forward(device),
            dropout_1: DropoutConfig::new(self.dropout).init(),
            dropout_2: DropoutConfig::new(self.dropout).init(),
            dropout_3: DropoutConfig::new(self.dropout).init(),
        }
    }

    fn build_norm<B: Backend>(&self, device: &B::Device) -> LayerNorm<B> {
        LayerNormConfig::new(self.d_model)
            .with_epsilon(self.norm_eps)
            .init(device)
    }

    fn build_attention<B: Backend>(&self, device: &B::Device) -> MultiHeadAttention<B> {
        let mut attn = MultiHeadAttentionConfig::new(self.d_model, self.heads)
            .with_dropout(self.dropout)
            .with_initializer(xavier())
            .init(device);
        reset_attention_biases(&mut attn, self.d_model);
        attn
    }

    fn build_feed_forward<B: Backend>(&self, device: &B::Device) -> FeedForward<B> {
        FeedForwardConfig::new(self.d_model, self.d_ff)
            .with_dropout(self.dropout)
            .init(device)
    }
}

// ─── Encoder ──────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct Encoder<B: Backend> {
    pub layers: Vec<EncoderLayer<B>>,
    pub norm:   LayerNorm<B>,
}

impl<B: Backend> Encoder<B> {
    pub fn forward(&self, src: Tensor<B, 3>, mask: Option<Tensor<B, 2, Bool>>) -> Tensor<B, 3> {
        let mut x = src;
        for layer in &self.layers {
            x = layer.forward(x, mask.clone());
        }
        self.norm.forward(x)
    }
}

// ─── Decoder ──────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct Decoder<B: Backend> {
    pub layers: Vec<DecoderLayer<B>>,
    pub norm:   LayerNorm<B>,
}

impl<B: Backend> Decoder<B> {
    pub fn forward(
        &self,
        trg:       Tensor<B, 3>,
        e_outputs: Tensor<B, 3>,
        src_mask:  Option<Tensor<B, 2, Bool>>,
        trg_mask:  Option<Tensor<B, 3, Bool>>,
    ) -> Tensor<B, 3> {
        let mut x = trg;
        for layer in &self.layers {
            x = layer.forward(x, e_outputs.clone(), src_mask.clone(), trg_mask.clone());
        }
        self.norm.forward(x)
    }
}

// ─── Transformer ──────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct Transformer<B: Backend> {
    pub encoder: Encoder<B>,
    pub decoder: Decoder<B>,
}

impl<B: Backend> Transformer<B> {
    /// Decoder output before flattening: `[batch, trg_seq, d_model]`.
    pub fn forward_sequence(
        &self,
        src:      Tensor<B, 3>,
        trg:      Tensor<B, 3>,
        src_mask: Option<Tensor<B, 2, Bool>>,
        trg_mask: Option<Tensor<B, 3, Bool>>,
    ) -> Tensor<B, 3> {
        let e_outputs = self.encoder.forward(src, src_mask.clone());
        self.decoder.forward(trg, e_outputs, src_mask, trg_mask)
    }

    /// `[batch, src_seq, d_model]`, `[batch, trg_seq, d_model]` → `[batch, trg_seq * d_model]`
    pub fn forward(
        &self,
        src:      Tensor<B, 3>,
        trg:      Tensor<B, 3>,
        src_mask: Option<Tensor<B, 2, Bool>>,
        trg_mask: Option<Tensor<B, 3, Bool>>,
    ) -> Tensor<B, 2> {
        let d_output = self.forward_sequence(src, trg, src_mask, trg_mask);
        let [batch_size, seq_len, d_model] = d_output.dims();
        d_output.reshape([batch_size, seq_len * d_model])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::Distribution;

    type TestBackend = NdArray;

    #[test]
    fn test_stacks_have_n_layers() {
        let device = Default::default();
        let model = TransformerConfig::new(16, 3, 4)
            .with_d_ff(32)
            .init::<TestBackend>(&device);
        assert_eq!(model.encoder.layers.len(), 3);
        assert_eq!(model.decoder.layers.len(), 3);
    }

    #[test]
    fn test_output_is_flattened_decoder_sequence() {
        let device = Default::default();
        let model = TransformerConfig::new(16, 2, 4)
            .with_d_ff(32)
            .init::<TestBackend>(&device);

        let src = Tensor::<TestBackend, 3>::random([4, 3, 16], Distribution::Default, &device);
        let trg = Tensor::<TestBackend, 3>::random([4, 3, 16], Distribution::Default, &device);

        let seq = model.forward_sequence(src.clone(), trg.clone(), None, None);
        assert_eq!(seq.dims(), [4, 3, 16]);

        let flat = model.forward(src, trg, None, None);
        assert_eq!(flat.dims(), [4, 48]);
    }

    #[test]
    fn test_causal_target_mask_is_accepted() {
        let device = Default::default();
        let model = TransformerConfig::new(8, 1, 2)
            .with_d_ff(16)
            .init::<TestBackend>(&device);

        let src = Tensor::<TestBackend, 3>::random([2, 4, 8], Distribution::Default, &device);
        let trg = Tensor::<TestBackend, 3>::random([2, 4, 8], Distribution::Default, &device);
        let causal = Tensor::<TestBackend, 2, Bool>::triu_mask([4, 4], 1, &device)
            .unsqueeze::<3>()
            .expand([2, 4, 4]);

        assert_eq!(model.forward(src, trg, None, Some(causal)).dims(), [2, 32]);
    }
}
