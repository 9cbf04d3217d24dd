// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All Burn modules live here. Outside this layer only the
// FusionModel trait and the factory functions are used.
//
//   init.rs        — Xavier weights, fan-in biases
//   layers.rs      — FeedForward, EncoderLayer, DecoderLayer
//   transformer.rs — Encoder / Decoder stacks and the Transformer
//   output.rs      — OutputFeedForward and OutputAttentionLayer
//   single.rs      — TransformerPlusLinear, FlexibleTransformer
//   multi.rs       — MultiTransformers and its four fusion heads
//   fusion.rs      — the FusionModel trait shared by every model
//   factory.rs     — settings → boxed FusionModel
//
// Reference: Burn Book §3 (Building Blocks)
//            Vaswani et al. (2017) Attention Is All You Need

/// Xavier weights and fan-in biases
pub mod init;

/// Transformer sublayers
pub mod layers;

/// Encoder, Decoder and Transformer stacks
pub mod transformer;

/// Output feed-forward and output attention heads
pub mod output;

/// Models that share one transformer across every source
pub mod single;

/// Models with one transformer per source
pub mod multi;

/// The FusionModel trait
pub mod fusion;

/// Building a model from ModelSettings
pub mod factory;
