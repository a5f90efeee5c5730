//! Geometric checks on placed parts.
//!
//! Provides the overlap and bounds predicates used to verify a finished layout
//! and by the tests of every packing component.

use crate::model::PlacedPart;
use crate::types::{Rect, Vec2};

/// Checks whether the padded footprints of two placed parts intersect.
///
/// Uses an axis-aligned separation test: two footprints do NOT intersect
/// when they are separated on at least one axis. Shared edges are allowed.
///
/// # Parameters
/// * `a` - First placed part
/// * `b` - Second placed part
///
/// # Returns
/// `true` if the footprints share interior area
pub fn intersects(a: &PlacedPart, b: &PlacedPart) -> bool {
    !(a.x + a.placed_width <= b.x
        || b.x + b.placed_width <= a.x
        || a.y + a.placed_height <= b.y
        || b.y + b.placed_height <= a.y)
}

/// Calculates the overlap of two intervals on one axis.
///
/// # Returns
/// Length of the overlap, at least 0.0
///
/// # Example
/// ```
/// use slab_optimizer::geometry::overlap_1d;
///
/// assert_eq!(overlap_1d(0.0, 5.0, 3.0, 8.0), 2.0);
/// ```
pub fn overlap_1d(a1: f64, a2: f64, b1: f64, b2: f64) -> f64 {
    (a2.min(b2) - a1.max(b1)).max(0.0)
}

/// Overlap area of two padded footprints.
pub fn overlap_area(a: &PlacedPart, b: &PlacedPart) -> f64 {
    let overlap_x = overlap_1d(a.x, a.x + a.placed_width, b.x, b.x + b.placed_width);
    let overlap_y = overlap_1d(a.y, a.y + a.placed_height, b.y, b.y + b.placed_height);
    overlap_x * overlap_y
}

/// Checks that the padded footprint lies inside `[0, slab_w] × [0, slab_h]`.
pub fn within_slab(part: &PlacedPart, slab_dims: Vec2, tolerance: f64) -> bool {
    part.footprint()
        .is_within(&Rect::from_position_and_dims(Vec2::zero(), slab_dims), tolerance)
}

/// Returns every pair of indices in `parts` whose footprints intersect.
///
/// Overlaps smaller than `tolerance` in area are ignored.
pub fn find_overlaps(parts: &[PlacedPart], tolerance: f64) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    for i in 0..parts.len() {
        for j in (i + 1)..parts.len() {
            if intersects(&parts[i], &parts[j]) && overlap_area(&parts[i], &parts[j]) > tolerance {
                pairs.push((i, j));
            }
        }
    }
    pairs
}
