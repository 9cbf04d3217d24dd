// ============================================================
// Layer 6 — Settings Store
// ============================================================
// Reads and writes ModelSettings as pretty-printed JSON.
//
// A settings file may be partial: any field it leaves out
// takes its default (see ModelSettings::default), so
//
//   { "kind": "multi_transformers_plus_rnn" }
//
// is a complete, valid settings file.
//
// Reference: Rust Book §9 (Error Handling)
//            serde_json crate documentation

use anyhow::{Context, Result};
use std::{fs, path::Path};

use crate::domain::{settings::ModelSettings, traits::Persistable};

impl Persistable for ModelSettings {
    fn save(&self, path: &str) -> Result<()> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Cannot create directory '{}'", parent.display()))?;
            }
        }

        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("Cannot write settings to '{path}'"))?;

        tracing::debug!("Saved model settings to '{}'", path);
        Ok(())
    }

    fn load(path: &str) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read settings from '{path}'"))?;

        serde_json::from_str(&json)
            .with_context(|| format!("Settings file '{path}' is not valid settings JSON"))
    }
}

/// Load the settings file at `path`, or the defaults when no path is given.
pub fn load_or_default(path: Option<&str>) -> Result<ModelSettings> {
    match path {
        Some(path) => {
            tracing::info!("Loading model settings from '{}'", path);
            ModelSettings::load(path)
        }
        None => {
            tracing::info!("No settings file given, using defaults");
            Ok(ModelSettings::default())
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::settings::{ModelKind, OneOrMany};

    #[test]
    fn test_save_then_load_restores_settings() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let path = path.to_str().unwrap();

        let settings = ModelSettings {
            kind:    ModelKind::MultiTransformersPlusMulAttention,
            d_model: OneOrMany::Many(vec![32, 16]),
            ..ModelSettings::default()
        };
        settings.save(path).unwrap();

        assert_eq!(ModelSettings::load(path).unwrap(), settings);
    }

    #[test]
    fn test_partial_file_takes_defaults() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "kind": "flexible_transformer", "d_model": 32 }"#).unwrap();

        let settings = load_or_default(path.to_str()).unwrap();
        assert_eq!(settings.kind, ModelKind::FlexibleTransformer);
        assert_eq!(settings.d_model, OneOrMany::One(32));
        assert_eq!(settings.inputs_lengths, ModelSettings::default().inputs_lengths);
    }

    #[test]
    fn test_missing_file_names_the_path() {
        let err = ModelSettings::load("does/not/exist.json").unwrap_err();
        assert!(err.to_string().contains("does/not/exist.json"));
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "kind": "transformer_xl" }"#).unwrap();

        assert!(ModelSettings::load(path.to_str().unwrap()).is_err());
    }
}
