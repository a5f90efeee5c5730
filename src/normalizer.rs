//! Part normalizer: quantity expansion, unit conversion and kerf padding.
//!
//! Every `PartSpec` turns into `quantity` atomic units. Dimensions are first
//! scaled by the unit factor, then padded by the kerf on both axes:
//! `width' = width * factor + kerf`, `height' = length * factor + kerf`.
//! Each piece thereby carries its own share of the cut margin and the free-space
//! tracker lets padded footprints touch.

use log::debug;

use crate::error::{PackingError, Result};
use crate::model::{AtomicUnit, PartSpec};
use crate::types::validation;

/// Largest number of atomic units a single run expands to.
///
/// Checked against the summed quantities before any unit is allocated.
pub const MAX_UNITS: usize = 10_000;

/// Expands part specifications into padded atomic units.
///
/// Units are numbered from 0 in input order; all validation happens before
/// any unit is produced, including the [`MAX_UNITS`] limit.
///
/// # Parameters
/// * `specs` - Parts in caller order
/// * `kerf` - Blade gap, `>= 0`
/// * `unit_factor` - Factor from part units to slab units, `> 0`
///
/// # Returns
/// The atomic units, `InvalidPart` for the first bad spec, or `TooManyUnits`
pub fn normalize_parts(specs: &[PartSpec], kerf: f64, unit_factor: f64) -> Result<Vec<AtomicUnit>> {
    validation::validate_non_negative(kerf, "Kerf").map_err(PackingError::Configuration)?;
    validation::validate_dimension(unit_factor, "Unit conversion factor")
        .map_err(PackingError::Configuration)?;

    for (index, spec) in specs.iter().enumerate() {
        spec.validate(index)?;
    }

    let total: u64 = specs.iter().map(|s| u64::from(s.quantity)).sum();
    if total > MAX_UNITS as u64 {
        return Err(PackingError::TooManyUnits {
            count: total,
            limit: MAX_UNITS,
        });
    }
    let mut units = Vec::with_capacity(total as usize);

    for (spec_index, spec) in specs.iter().enumerate() {
        let cut_width = spec.width * unit_factor;
        let cut_height = spec.length * unit_factor;
        for _ in 0..spec.quantity {
            units.push(AtomicUnit {
                id: units.len(),
                spec_index,
                label: spec.label.clone(),
                width: cut_width + kerf,
                height: cut_height + kerf,
                cut_width,
                cut_height,
            });
        }
    }

    debug!(
        "Normalized {} part specs into {} units (kerf {}, factor {})",
        specs.len(),
        units.len(),
        kerf,
        unit_factor
    );
    Ok(units)
}
