// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types describing what a model IS before any
// tensor exists: the settings it is built from, the resolved
// per-source layouts, and the errors construction can raise.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits

/// Construction and forward-entry errors
pub mod error;

/// Model settings, model kinds and per-source layouts
pub mod settings;

/// Core abstractions (traits) that other layers implement
pub mod traits;
