// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Turns per-sample feature vectors into model-ready batches.
//
//   SourceSample   → one flat vector per source + target
//       │
//       ▼
//   SourceBatcher  → one [batch, n_feature_type, d_input]
//                    tensor per source, targets [batch, width]
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Implements Burn's Batcher trait for multi-source samples
pub mod batcher;
