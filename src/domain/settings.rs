// ============================================================
// Layer 3 — Model Settings
// ============================================================
// The settings file every model is assembled from.
//
// A few fields accept either one value or a list:
//   "d_model": 64           → every source gets width 64
//   "d_model": [64, 32]     → source 0 gets 64, source 1 gets 32
// resolve() turns the settings into one SourceLayout per
// input source and runs every consistency check up front,
// so no model is ever built from inconsistent settings.
//
// Each source arrives as a flat feature vector of length
// inputs_lengths[i]. It is viewed as n_feature_type[i] rows
// of d_input = inputs_lengths[i] / n_feature_type[i] features,
// i.e. a short sequence the transformer can attend over.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::domain::error::ModelError;

// ─── ModelKind ────────────────────────────────────────────────────────────────
/// Which architecture the factory assembles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// One input, one shared projection, one transformer.
    TransformerPlusLinear,
    /// Many inputs projected separately, concatenated, one shared transformer.
    FlexibleTransformer,
    /// One transformer per input, concatenated flat outputs.
    MultiTransformersPlusLinear,
    /// One transformer per input, last source attends over the others.
    MultiTransformersPlusSdpAttention,
    /// One transformer per input, LSTM over the stacked outputs.
    MultiTransformersPlusRnn,
    /// One transformer per input, outer product of the others with the last.
    MultiTransformersPlusMulAttention,
}

impl ModelKind {
    pub const ALL: [ModelKind; 6] = [
        ModelKind::TransformerPlusLinear,
        ModelKind::FlexibleTransformer,
        ModelKind::MultiTransformersPlusLinear,
        ModelKind::MultiTransformersPlusSdpAttention,
        ModelKind::MultiTransformersPlusRnn,
        ModelKind::MultiTransformersPlusMulAttention,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::TransformerPlusLinear             => "transformer_plus_linear",
            ModelKind::FlexibleTransformer               => "flexible_transformer",
            ModelKind::MultiTransformersPlusLinear       => "multi_transformers_plus_linear",
            ModelKind::MultiTransformersPlusSdpAttention => "multi_transformers_plus_sdp_attention",
            ModelKind::MultiTransformersPlusRnn          => "multi_transformers_plus_rnn",
            ModelKind::MultiTransformersPlusMulAttention => "multi_transformers_plus_mul_attention",
        }
    }

    /// True for the kinds that run one transformer per source.
    pub fn is_multi(&self) -> bool {
        !matches!(self, ModelKind::TransformerPlusLinear | ModelKind::FlexibleTransformer)
    }

    /// Structural requirements each architecture places on its sources.
    pub fn check_sources(&self, sources: &[SourceLayout]) -> Result<(), ModelError> {
        match self {
            ModelKind::TransformerPlusLinear => {
                if sources.len() != 1 {
                    return Err(ModelError::SourceCountMismatch {
                        expected: 1,
                        actual:   sources.len(),
                    });
                }
            }
            ModelKind::FlexibleTransformer | ModelKind::MultiTransformersPlusRnn => {
                self.shared_width(sources)?;
            }
            ModelKind::MultiTransformersPlusLinear => {}
            ModelKind::MultiTransformersPlusSdpAttention
            | ModelKind::MultiTransformersPlusMulAttention => {
                if sources.len() < 2 {
                    return Err(ModelError::TooFewSources {
                        kind:   *self,
                        min:    2,
                        actual: sources.len(),
                    });
                }
                // The last source is the query; the rest are stacked together.
                self.shared_width(&sources[..sources.len() - 1])?;
            }
        }
        Ok(())
    }

    /// The single d_model shared by `sources`, or MixedWidths.
    pub fn shared_width(&self, sources: &[SourceLayout]) -> Result<usize, ModelError> {
        let widths: Vec<usize> = sources.iter().map(|s| s.d_model).collect();
        match widths.first() {
            None => Err(ModelError::NoSources),
            Some(&first) if widths.iter().all(|&w| w == first) => Ok(first),
            Some(_) => Err(ModelError::MixedWidths { kind: *self, widths }),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = ModelKind::ALL.iter().map(|k| k.as_str()).collect();
                format!("unknown model kind '{s}', expected one of: {}", known.join(", "))
            })
    }
}

// ─── OneOrMany ────────────────────────────────────────────────────────────────
/// A settings value given either once for every source or once per source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T: Copy> OneOrMany<T> {
    /// Expand to exactly `n` values.
    pub fn broadcast(&self, n: usize, field: &'static str) -> Result<Vec<T>, ModelError> {
        match self {
            OneOrMany::One(v) => Ok(vec![*v; n]),
            OneOrMany::Many(vs) if vs.len() == n => Ok(vs.clone()),
            OneOrMany::Many(vs) => Err(ModelError::ListLengthMismatch {
                field,
                expected: n,
                actual:   vs.len(),
            }),
        }
    }
}

// ─── SourceLayout ─────────────────────────────────────────────────────────────
/// Resolved shape of one input source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLayout {
    /// Length of the flat feature vector the source arrives as
    pub input_len: usize,
    /// Rows (sequence positions) the vector is split into
    pub n_feature_type: usize,
    /// Features per row, the width of the input projection
    pub d_input: usize,
    /// Width the source is projected to
    pub d_model: usize,
}

impl SourceLayout {
    /// Length of the flattened transformer output for this source.
    pub fn flat_output_len(&self) -> usize {
        self.n_feature_type * self.d_model
    }
}

// ─── ModelSettings ────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub kind:              ModelKind,
    pub inputs_lengths:    Vec<usize>,
    pub d_model:           OneOrMany<usize>,
    pub n_feature_type:    OneOrMany<usize>,
    pub n_layers:          usize,
    pub attention_heads:   usize,
    pub attention_dropout: f64,
    pub d_ff:              usize,
    pub norm_eps:          f64,
    pub output_ff_layers:  Vec<usize>,
    pub rnn_hidden:        usize,
    pub mul_hidden:        usize,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            kind:              ModelKind::MultiTransformersPlusLinear,
            inputs_lengths:    vec![96, 32],
            d_model:           OneOrMany::One(64),
            n_feature_type:    OneOrMany::Many(vec![3, 1]),
            n_layers:          1,
            attention_heads:   8,
            attention_dropout: 0.2,
            d_ff:              2048,
            norm_eps:          1e-6,
            output_ff_layers:  vec![256, 64, 1],
            rnn_hidden:        200,
            mul_hidden:        20,
        }
    }
}

impl ModelSettings {
    /// Defaults shaped for `kind`: the single-source kind keeps only
    /// the first default source, every other kind keeps both.
    pub fn for_kind(kind: ModelKind) -> Self {
        let defaults = Self { kind, ..Self::default() };
        match kind {
            ModelKind::TransformerPlusLinear => Self {
                inputs_lengths: vec![96],
                n_feature_type: OneOrMany::One(3),
                ..defaults
            },
            _ => defaults,
        }
    }

    /// Width of the final prediction.
    pub fn output_width(&self) -> Option<usize> {
        self.output_ff_layers.last().copied()
    }

    /// Validate the settings and compute one layout per source.
    pub fn resolve(&self) -> Result<Vec<SourceLayout>, ModelError> {
        let n = self.inputs_lengths.len();
        if n == 0 {
            return Err(ModelError::NoSources);
        }

        for (value, field) in [
            (self.n_layers,        "n_layers"),
            (self.attention_heads, "attention_heads"),
            (self.d_ff,            "d_ff"),
            (self.rnn_hidden,      "rnn_hidden"),
            (self.mul_hidden,      "mul_hidden"),
        ] {
            if value == 0 {
                return Err(ModelError::ZeroDimension(field));
            }
        }

        if !(0.0..1.0).contains(&self.attention_dropout) {
            return Err(ModelError::InvalidDropout(self.attention_dropout));
        }
        if self.output_ff_layers.is_empty() {
            return Err(ModelError::EmptyOutputLayers);
        }
        if self.output_ff_layers.contains(&0) {
            return Err(ModelError::ZeroDimension("output_ff_layers"));
        }

        let d_models   = self.d_model.broadcast(n, "d_model")?;
        let n_features = self.n_feature_type.broadcast(n, "n_feature_type")?;

        let mut sources = Vec::with_capacity(n);
        for (index, ((&input_len, &d_model), &n_feature_type)) in self
            .inputs_lengths
            .iter()
            .zip(&d_models)
            .zip(&n_features)
            .enumerate()
        {
            if input_len == 0 {
                return Err(ModelError::ZeroDimension("inputs_lengths"));
            }
            if d_model == 0 {
                return Err(ModelError::ZeroDimension("d_model"));
            }
            if n_feature_type == 0 {
                return Err(ModelError::ZeroDimension("n_feature_type"));
            }
            if d_model % self.attention_heads != 0 {
                return Err(ModelError::HeadsDoNotDivide {
                    index,
                    d_model,
                    heads: self.attention_heads,
                });
            }
            if input_len % n_feature_type != 0 {
                return Err(ModelError::InputNotDivisible { index, input_len, n_feature_type });
            }
            sources.push(SourceLayout {
                input_len,
                n_feature_type,
                d_input: input_len / n_feature_type,
                d_model,
            });
        }

        self.kind.check_sources(&sources)?;

        tracing::debug!("Resolved {} sources for {}", sources.len(), self.kind);
        Ok(sources)
    }
}
