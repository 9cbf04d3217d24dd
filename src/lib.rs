#![recursion_limit = "256"]

//! Multi-source transformer fusion models on Burn.
//!
//! Layers, outermost first:
//!
//! | Layer | Module        | Role                                   |
//! |-------|---------------|----------------------------------------|
//! | 1     | `cli`         | clap commands, JSON output             |
//! | 2     | `application` | plan / inspect use cases               |
//! | 3     | `domain`      | settings, errors, traits               |
//! | 4     | `data`        | samples → per-source tensor batches    |
//! | 5     | `ml`          | transformer blocks, fusion heads       |
//! | 6     | `infra`       | settings file I/O                      |

pub mod application;
pub mod cli;
pub mod data;
pub mod domain;
pub mod infra;
pub mod ml;
