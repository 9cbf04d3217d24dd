// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// File-system concerns that don't belong in any business layer.
//
//   settings_store.rs — ModelSettings ⇄ JSON on disk
//                       (implements domain::traits::Persistable)
//
// Reference: Rust Book §9 (Error Handling with anyhow)

/// Model settings saving and loading
pub mod settings_store;
