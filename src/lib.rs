//! Heuristic cutting layouts for rectangular parts on fixed-size slabs.
//!
//! Parts are expanded into single pieces, padded by the kerf, sorted largest
//! first and placed onto slabs with a guillotine free-space tracker. The
//! engine is exposed as a library and through the HTTP service in [`api`].

pub mod api;
pub mod config;
pub mod error;
pub mod free_space;
pub mod geometry;
pub mod layout;
pub mod model;
pub mod normalizer;
pub mod optimizer;
pub mod ordering;
pub mod parts_csv;
pub mod render;
pub mod slab;
pub mod types;
pub mod units;

pub use error::{PackingError, Result};
pub use layout::{Layout, LayoutMetrics};
pub use model::{PartSpec, PlacedPart};
pub use parts_csv::{parse_parts_csv, read_parts_csv};
pub use optimizer::{PackEvent, PackingConfig, pack_best_of, pack_parts, pack_parts_with_progress};
