// ============================================================
// Layer 3 — Model Errors
// ============================================================
// Every consistency check that guards model construction or
// the entry of a forward pass ends up as one ModelError variant.
//
// Shape errors raised inside Burn itself (e.g. a matmul on
// incompatible tensors) are not caught here; they panic
// inside the framework exactly as they would anywhere else.
//
// Reference: Rust Book §9 (Recoverable Errors with Result)
//            thiserror crate documentation

use thiserror::Error;

use crate::domain::settings::ModelKind;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("no input sources configured")]
    NoSources,

    #[error("`{field}` lists {actual} values but there are {expected} sources")]
    ListLengthMismatch {
        field:    &'static str,
        expected: usize,
        actual:   usize,
    },

    #[error("`{0}` must be greater than zero")]
    ZeroDimension(&'static str),

    #[error("source {index}: d_model {d_model} is not divisible by {heads} attention heads")]
    HeadsDoNotDivide {
        index:   usize,
        d_model: usize,
        heads:   usize,
    },

    #[error("attention dropout must lie in [0, 1), got {0}")]
    InvalidDropout(f64),

    #[error(
        "source {index}: input length {input_len} is not divisible by {n_feature_type} feature types"
    )]
    InputNotDivisible {
        index:          usize,
        input_len:      usize,
        n_feature_type: usize,
    },

    #[error("output feed-forward layers must not be empty")]
    EmptyOutputLayers,

    #[error("expected {expected} input sources, got {actual}")]
    SourceCountMismatch { expected: usize, actual: usize },

    #[error("{kind} needs at least {min} sources, got {actual}")]
    TooFewSources {
        kind:   ModelKind,
        min:    usize,
        actual: usize,
    },

    #[error("{kind} needs every fused source to share one d_model, got {widths:?}")]
    MixedWidths { kind: ModelKind, widths: Vec<usize> },

    #[error("{kind} cannot be built by {path}")]
    UnsupportedKind { kind: ModelKind, path: &'static str },

    #[error("source {index}: expected [batch, {seq_len}, {features}], got {actual:?}")]
    SourceShapeMismatch {
        index:    usize,
        seq_len:  usize,
        features: usize,
        actual:   Vec<usize>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_values() {
        let err = ModelError::HeadsDoNotDivide { index: 1, d_model: 30, heads: 8 };
        assert_eq!(
            err.to_string(),
            "source 1: d_model 30 is not divisible by 8 attention heads"
        );

        let err = ModelError::TooFewSources {
            kind:   ModelKind::MultiTransformersPlusSdpAttention,
            min:    2,
            actual: 1,
        };
        assert!(err.to_string().starts_with("multi_transformers_plus_sdp_attention needs"));
    }
}
