//! Slabs opened during a packing run.

use crate::free_space::{Fit, FitPolicy, FreeRect, FreeSpaceTracker, SplitRule};
use crate::model::{AtomicUnit, PlacedPart};
use crate::types::{Dimensional, Vec2};

/// One sheet of stock material.
///
/// Owns its free-space tracker and the parts placed on it. A slab is never
/// removed once opened.
#[derive(Clone, Debug)]
pub struct Slab {
    pub index: usize,
    pub width: f64,
    pub height: f64,
    free_space: FreeSpaceTracker,
    placed: Vec<PlacedPart>,
}

impl Slab {
    /// Creates an empty slab whose free space is the whole sheet.
    pub fn new(index: usize, width: f64, height: f64) -> Self {
        Self {
            index,
            width,
            height,
            free_space: FreeSpaceTracker::new(width, height),
            placed: Vec::new(),
        }
    }

    #[inline]
    pub fn dims(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    pub fn placed(&self) -> &[PlacedPart] {
        &self.placed
    }

    pub fn free_regions(&self) -> &[FreeRect] {
        self.free_space.regions()
    }

    /// Delegates to the slab's free-space tracker.
    pub fn try_fit(&self, unit: &AtomicUnit, policy: FitPolicy, allow_rotation: bool) -> Option<Fit> {
        self.free_space.try_fit(unit, policy, allow_rotation)
    }

    /// Records `unit` at `fit` and carves the used region.
    ///
    /// `fit` must come from [`Slab::try_fit`] on this slab with no placement
    /// in between.
    pub fn place(&mut self, unit: &AtomicUnit, fit: &Fit, rule: SplitRule) -> &PlacedPart {
        self.free_space.carve(fit, rule);
        self.placed
            .push(PlacedPart::new(unit, self.index, fit.position, fit.orientation, fit.footprint));
        &self.placed[self.placed.len() - 1]
    }

    /// Finished (unpadded) area of all parts on this slab.
    pub fn used_area(&self) -> f64 {
        self.placed.iter().map(PlacedPart::cut_area).sum()
    }

    /// Area reserved by padded footprints.
    pub fn padded_area(&self) -> f64 {
        self.placed.iter().map(|p| p.area()).sum()
    }

    pub fn total_area(&self) -> f64 {
        self.width * self.height
    }

    /// Area still tracked as free.
    pub fn free_area(&self) -> f64 {
        self.free_space.free_area()
    }

    /// Percentage of the slab covered by finished parts (0.0 to 100.0).
    pub fn utilization_percent(&self) -> f64 {
        let total = self.total_area();
        if total <= 0.0 {
            return 0.0;
        }
        (self.used_area() / total) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Orientation;

    fn unit(id: usize, cut_w: f64, cut_h: f64, kerf: f64) -> AtomicUnit {
        AtomicUnit {
            id,
            spec_index: 0,
            label: format!("p{id}"),
            width: cut_w + kerf,
            height: cut_h + kerf,
            cut_width: cut_w,
            cut_height: cut_h,
        }
    }

    #[test]
    fn place_records_part_and_shrinks_free_space() {
        let mut slab = Slab::new(2, 10.0, 10.0);
        let u = unit(4, 3.0, 5.0, 0.0);
        let fit = slab.try_fit(&u, FitPolicy::BestFit, true).unwrap();
        let placed = slab.place(&u, &fit, SplitRule::Horizontal).clone();

        assert_eq!(placed.slab_index, 2);
        assert_eq!(placed.unit_id, 4);
        assert_eq!((placed.x, placed.y), (0.0, 0.0));
        assert_eq!(slab.placed().len(), 1);
        assert!((slab.free_area() - 85.0).abs() < 1e-9);
    }

    #[test]
    fn areas_distinguish_cut_and_padded() {
        let mut slab = Slab::new(0, 20.0, 10.0);
        let u = unit(0, 4.0, 4.0, 1.0);
        let fit = slab.try_fit(&u, FitPolicy::FirstFit, true).unwrap();
        assert_eq!(fit.orientation, Orientation::Upright);
        slab.place(&u, &fit, SplitRule::Horizontal);

        assert!((slab.used_area() - 16.0).abs() < 1e-9);
        assert!((slab.padded_area() - 25.0).abs() < 1e-9);
        assert!((slab.utilization_percent() - 8.0).abs() < 1e-9);
        assert!((slab.free_area() + slab.padded_area() - slab.total_area()).abs() < 1e-9);
    }
}
