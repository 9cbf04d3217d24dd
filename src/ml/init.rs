// ============================================================
// Layer 5 — Parameter Initialisation
// ============================================================
// Weight matrices are Xavier-uniform. Bias vectors keep the
// usual fan-in default instead:
//
//   weight [d_in, d_out]  ~ XavierUniform(gain = 1)
//   bias   [d_out]        ~ U(-1/sqrt(fan_in), 1/sqrt(fan_in))
//
// Burn hands one Initializer to every parameter of a layer, so
// the layer is built with Xavier and its biases are redrawn
// here afterwards.

use burn::{
    nn::{attention::MultiHeadAttention, Initializer, Linear, LinearConfig, Lstm},
    prelude::*,
};

pub fn xavier() -> Initializer {
    Initializer::XavierUniform { gain: 1.0 }
}

/// `1 / sqrt(fan_in)`
pub fn fan_in_bound(fan_in: usize) -> f64 {
    1.0 / (fan_in as f64).sqrt()
}

/// Xavier weight, fan-in bias.
pub fn linear<B: Backend>(d_input: usize, d_output: usize, device: &B::Device) -> Linear<B> {
    let mut linear = LinearConfig::new(d_input, d_output)
        .with_initializer(xavier())
        .init(device);
    reset_bias(&mut linear, fan_in_bound(d_input));
    linear
}

/// Redraw `linear`'s bias, if it has one, from `U(-bound, bound)`.
pub fn reset_bias<B: Backend>(linear: &mut Linear<B>, bound: f64) {
    let (d_output, device) = match linear.bias.as_ref() {
        Some(bias) => {
            let bias = bias.val();
            (bias.dims()[0], bias.device())
        }
        None => return,
    };
    linear.bias = Some(Initializer::Uniform { min: -bound, max: bound }.init([d_output], &device));
}

/// Fan-in biases on the query, key, value and output projections.
pub fn reset_attention_biases<B: Backend>(attn: &mut MultiHeadAttention<B>, d_model: usize) {
    let bound = fan_in_bound(d_model);
    for projection in [&mut attn.query, &mut attn.key, &mut attn.value, &mut attn.output] {
        reset_bias(projection, bound);
    }
}

/// Every gate bias of `lstm` drawn from `U(-1/sqrt(d_hidden), 1/sqrt(d_hidden))`.
pub fn reset_lstm_biases<B: Backend>(lstm: &mut Lstm<B>, d_hidden: usize) {
    let bound = fan_in_bound(d_hidden);
    for gate in [
        &mut lstm.input_gate,
        &mut lstm.forget_gate,
        &mut lstm.output_gate,
        &mut lstm.cell_gate,
    ] {
        reset_bias(&mut gate.input_transform, bound);
        reset_bias(&mut gate.hidden_transform, bound);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::nn::{attention::MultiHeadAttentionConfig, LstmConfig};
    use burn::tensor::ElementConversion;

    type TestBackend = NdArray;

    fn max_abs(t: Tensor<TestBackend, 1>) -> f32 {
        t.abs().max().into_scalar().elem()
    }

    fn bias_of(linear: &Linear<TestBackend>) -> Tensor<TestBackend, 1> {
        linear.bias.as_ref().map(|b| b.val()).unwrap()
    }

    #[test]
    fn test_linear_bias_stays_within_fan_in_bound() {
        let device = Default::default();
        // Xavier bound for 64 → 64 is sqrt(6 / 128) ≈ 0.2165; fan-in bound is 0.125
        let layer = linear::<TestBackend>(64, 64, &device);

        assert_eq!(bias_of(&layer).dims(), [64]);
        assert!(max_abs(bias_of(&layer)) <= 0.125 + 1e-6);

        // The weight matrix still spreads past the bias bound
        let w: f32 = layer.weight.val().abs().max().into_scalar().elem();
        assert!(w > 0.125 && w <= 0.2166);
    }

    #[test]
    fn test_attention_biases_follow_model_width() {
        let device = Default::default();
        let mut attn = MultiHeadAttentionConfig::new(64, 4)
            .with_initializer(xavier())
            .init::<TestBackend>(&device);
        reset_attention_biases(&mut attn, 64);

        for projection in [&attn.query, &attn.key, &attn.value, &attn.output] {
            assert!(max_abs(bias_of(projection)) <= 0.125 + 1e-6);
        }
    }

    #[test]
    fn test_lstm_biases_follow_hidden_width() {
        let device = Default::default();
        let mut lstm = LstmConfig::new(8, 100, true)
            .with_initializer(xavier())
            .init::<TestBackend>(&device);
        reset_lstm_biases(&mut lstm, 100);

        for gate in [&lstm.input_gate, &lstm.forget_gate, &lstm.output_gate, &lstm.cell_gate] {
            assert!(max_abs(bias_of(&gate.input_transform)) <= 0.1 + 1e-6);
            assert!(max_abs(bias_of(&gate.hidden_transform)) <= 0.1 + 1e-6);
        }
    }
}
