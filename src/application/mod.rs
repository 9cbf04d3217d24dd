// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Coordinates the other layers; holds no model math and does
// no printing (that's Layer 1).
//
//   plan_use_case.rs    — settings → resolved source layouts
//   inspect_use_case.rs — settings → model → one random batch
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

/// Settings resolution without building a model
pub mod plan_use_case;

/// Build a model and run a seeded random batch through it
pub mod inspect_use_case;
