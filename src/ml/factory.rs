// ============================================================
// Layer 5 — Model Factory
// ============================================================
// Turns ModelSettings into a ready-to-run model.
//
//   get_model         → single-stack kinds (one transformer)
//   get_multi_models  → multi-stack kinds (one transformer per source)
//   build_model       → whichever of the two the settings ask for
//
// Every path resolves the settings first, so all consistency
// checks (list lengths, head divisibility, dropout range, ...)
// run before a single parameter is allocated. Weight matrices
// are Xavier-uniform initialised by the configs themselves.

use burn::prelude::*;

use crate::domain::{
    error::ModelError,
    settings::{ModelKind, ModelSettings, SourceLayout},
};
use crate::ml::{
    fusion::FusionModel,
    multi::MultiTransformersConfig,
    single::{FlexibleTransformerConfig, TransformerPlusLinearConfig},
    transformer::TransformerConfig,
};

/// Build whichever architecture `settings.kind` names.
pub fn build_model<B: Backend>(
    settings: &ModelSettings,
    device:   &B::Device,
) -> Result<Box<dyn FusionModel<B>>, ModelError> {
    let model = if settings.kind.is_multi() {
        get_multi_models(settings, device)?
    } else {
        get_model(settings, device)?
    };

    tracing::info!(
        "Built {} with {} sources and {} parameters",
        model.kind(),
        settings.inputs_lengths.len(),
        model.num_params(),
    );
    Ok(model)
}

/// Single-stack path: `transformer_plus_linear` or `flexible_transformer`.
pub fn get_model<B: Backend>(
    settings: &ModelSettings,
    device:   &B::Device,
) -> Result<Box<dyn FusionModel<B>>, ModelError> {
    if settings.kind.is_multi() {
        return Err(ModelError::UnsupportedKind { kind: settings.kind, path: "get_model" });
    }
    let layouts = settings.resolve()?;
    let d_model = settings.kind.shared_width(&layouts)?;
    let transformer = transformer_config(settings, d_model);

    match settings.kind {
        ModelKind::TransformerPlusLinear => {
            let source = layouts[0];
            let model = TransformerPlusLinearConfig::new(
                transformer,
                source.d_input,
                source.n_feature_type,
                settings.output_ff_layers.clone(),
            )
            .init::<B>(device);
            Ok(Box::new(model))
        }
        ModelKind::FlexibleTransformer => {
            let model = FlexibleTransformerConfig::new(
                transformer,
                layouts.iter().map(|l| l.d_input).collect(),
                layouts.iter().map(|l| l.n_feature_type).collect(),
                settings.output_ff_layers.clone(),
            )
            .init::<B>(device)?;
            Ok(Box::new(model))
        }
        kind => Err(ModelError::UnsupportedKind { kind, path: "get_model" }),
    }
}

/// Multi-stack path: one transformer per source plus the configured fusion head.
pub fn get_multi_models<B: Backend>(
    settings: &ModelSettings,
    device:   &B::Device,
) -> Result<Box<dyn FusionModel<B>>, ModelError> {
    if !settings.kind.is_multi() {
        return Err(ModelError::UnsupportedKind { kind: settings.kind, path: "get_multi_models" });
    }
    let layouts = settings.resolve()?;
    let config  = multi_config(settings, &layouts);

    let model: Box<dyn FusionModel<B>> = match settings.kind {
        ModelKind::MultiTransformersPlusLinear => Box::new(config.init_plus_linear::<B>(device)?),
        ModelKind::MultiTransformersPlusSdpAttention => {
            Box::new(config.init_plus_sdp_attention::<B>(device)?)
        }
        ModelKind::MultiTransformersPlusRnn => Box::new(config.init_plus_rnn::<B>(device)?),
        ModelKind::MultiTransformersPlusMulAttention => {
            Box::new(config.init_plus_mul_attention::<B>(device)?)
        }
        kind => return Err(ModelError::UnsupportedKind { kind, path: "get_multi_models" }),
    };
    Ok(model)
}

fn transformer_config(settings: &ModelSettings, d_model: usize) -> TransformerConfig {
    TransformerConfig::new(d_model, settings.n_layers, settings.attention_heads)
        .with_dropout(settings.attention_dropout)
        .with_d_ff(settings.d_ff)
        .with_norm_eps(settings.norm_eps)
}

fn multi_config(settings: &ModelSettings, layouts: &[SourceLayout]) -> MultiTransformersConfig {
    MultiTransformersConfig::new(
        layouts.iter().map(|l| l.d_input).collect(),
        layouts.iter().map(|l| l.d_model).collect(),
        layouts.iter().map(|l| l.n_feature_type).collect(),
        settings.n_layers,
        settings.attention_heads,
        settings.output_ff_layers.clone(),
    )
    .with_dropout(settings.attention_dropout)
    .with_d_ff(settings.d_ff)
    .with_norm_eps(settings.norm_eps)
    .with_rnn_hidden(settings.rnn_hidden)
    .with_mul_hidden(settings.mul_hidden)
}
