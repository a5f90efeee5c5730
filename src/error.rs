//! Error types for the packing engine.

use thiserror::Error;

/// Result type alias for packing operations.
pub type Result<T> = std::result::Result<T, PackingError>;

/// Errors that abort a packing run.
///
/// All variants are deterministic input failures; none is retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PackingError {
    /// A part specification has a non-positive dimension or quantity.
    #[error("Invalid part #{index} ('{label}'): {reason}")]
    InvalidPart {
        index: usize,
        label: String,
        reason: String,
    },

    /// A part does not fit an empty slab in either orientation.
    #[error(
        "Part '{label}' (unit {unit_id}) needs {width:.3} x {height:.3} including kerf, \
         which does not fit a {slab_width:.3} x {slab_height:.3} slab in either orientation"
    )]
    PartTooLarge {
        unit_id: usize,
        label: String,
        width: f64,
        height: f64,
        slab_width: f64,
        slab_height: f64,
    },

    /// The quantities add up to more units than one run accepts.
    #[error("Request expands to {count} units, more than the limit of {limit} per run")]
    TooManyUnits { count: u64, limit: usize },

    /// Slab size, kerf or unit factor are unusable.
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl PackingError {
    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            PackingError::InvalidPart { .. } => "invalid_part",
            PackingError::PartTooLarge { .. } => "part_too_large",
            PackingError::TooManyUnits { .. } => "too_many_units",
            PackingError::Configuration(_) => "invalid_configuration",
        }
    }
}
