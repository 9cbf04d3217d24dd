// ============================================================
// Layer 3 — Domain Traits
// ============================================================
// Seams that stay free of Burn. Traits that touch tensors
// (FusionModel) belong to the ml layer instead.

use anyhow::Result;

/// A value that round-trips through a file on disk.
///
/// `ModelSettings` implements this as JSON in `infra::settings_store`.
pub trait Persistable: Sized {
    /// Write `self` to `path`, creating parent directories as needed.
    fn save(&self, path: &str) -> Result<()>;

    /// Read a value back from `path`.
    fn load(path: &str) -> Result<Self>;
}
