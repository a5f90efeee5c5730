//! Layout accumulation and derived metrics.
//!
//! The accumulator owns the slabs of a run while parts are being placed;
//! `finish` freezes them into a [`Layout`] with its [`LayoutMetrics`].

use serde::Serialize;
use utoipa::ToSchema;

use crate::geometry::{find_overlaps, within_slab};
use crate::model::{PartSpec, PlacedPart};
use crate::slab::Slab;
use crate::types::{EPSILON_GENERAL, Vec2};

/// Summary figures of a finished layout.
///
/// `total_part_area` counts finished (unpadded) parts; `waste_area` is
/// therefore everything else on the used slabs, kerf included.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, ToSchema)]
pub struct LayoutMetrics {
    pub slab_count: usize,
    pub total_part_area: f64,
    pub total_slab_area: f64,
    pub waste_area: f64,
    /// Average utilization of all slabs in percent.
    pub average_utilization: f64,
}

impl LayoutMetrics {
    /// Computes the metrics of `slab_count` slabs of `slab_dims` holding `total_part_area`.
    ///
    /// # Panics
    /// If the waste comes out negative, which means the area accounting is broken.
    pub fn compute(slab_count: usize, slab_dims: Vec2, total_part_area: f64) -> Self {
        let total_slab_area = slab_count as f64 * slab_dims.area();
        let waste_area = total_slab_area - total_part_area;
        assert!(
            waste_area >= -EPSILON_GENERAL * total_slab_area.max(1.0),
            "negative waste area {waste_area} (slabs {total_slab_area}, parts {total_part_area})"
        );

        let average_utilization = if total_slab_area > 0.0 {
            (total_part_area / total_slab_area) * 100.0
        } else {
            0.0
        };

        Self {
            slab_count,
            total_part_area,
            total_slab_area,
            waste_area: waste_area.max(0.0),
            average_utilization,
        }
    }
}

/// Collects slabs and placements during a run.
#[derive(Debug)]
pub struct LayoutAccumulator {
    slab_dims: Vec2,
    slabs: Vec<Slab>,
}

impl LayoutAccumulator {
    pub fn new(slab_width: f64, slab_height: f64) -> Self {
        Self {
            slab_dims: Vec2::new(slab_width, slab_height),
            slabs: Vec::new(),
        }
    }

    /// Open slabs in creation order.
    pub fn slabs(&self) -> &[Slab] {
        &self.slabs
    }

    pub fn slab_mut(&mut self, index: usize) -> &mut Slab {
        &mut self.slabs[index]
    }

    pub fn slab_count(&self) -> usize {
        self.slabs.len()
    }

    /// Opens a new empty slab with the next index.
    pub fn open_slab(&mut self) -> &mut Slab {
        let index = self.slabs.len();
        self.slabs
            .push(Slab::new(index, self.slab_dims.x, self.slab_dims.y));
        &mut self.slabs[index]
    }

    /// Freezes the slabs into a layout.
    ///
    /// # Parameters
    /// * `specs` - The part specifications of the run
    /// * `unit_factor` - Factor used to convert them to slab units
    pub fn finish(self, specs: &[PartSpec], unit_factor: f64) -> Layout {
        let total_part_area = specs.iter().map(|s| s.total_area(unit_factor)).sum();
        let metrics = LayoutMetrics::compute(self.slabs.len(), self.slab_dims, total_part_area);
        Layout {
            slab_width: self.slab_dims.x,
            slab_height: self.slab_dims.y,
            slabs: self.slabs,
            metrics,
        }
    }
}

/// Result of a packing run.
#[derive(Clone, Debug)]
pub struct Layout {
    pub slab_width: f64,
    pub slab_height: f64,
    pub slabs: Vec<Slab>,
    pub metrics: LayoutMetrics,
}

impl Layout {
    /// All placed parts, slab by slab, in placement order.
    pub fn placed_parts(&self) -> impl Iterator<Item = &PlacedPart> {
        self.slabs.iter().flat_map(|s| s.placed().iter())
    }

    pub fn part_count(&self) -> usize {
        self.slabs.iter().map(|s| s.placed().len()).sum()
    }

    pub fn slab_count(&self) -> usize {
        self.slabs.len()
    }

    /// Checks bounds and pairwise overlap of every slab.
    ///
    /// # Returns
    /// A description of the first violation found
    pub fn verify(&self) -> Result<(), String> {
        let dims = Vec2::new(self.slab_width, self.slab_height);
        for slab in &self.slabs {
            if let Some(part) = slab
                .placed()
                .iter()
                .find(|p| !within_slab(p, dims, EPSILON_GENERAL))
            {
                return Err(format!(
                    "slab {}: unit {} at ({}, {}) exceeds the slab",
                    slab.index, part.unit_id, part.x, part.y
                ));
            }
            if let Some(&(a, b)) = find_overlaps(slab.placed(), EPSILON_GENERAL).first() {
                return Err(format!(
                    "slab {}: units {} and {} overlap",
                    slab.index,
                    slab.placed()[a].unit_id,
                    slab.placed()[b].unit_id
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_for_empty_layout_are_zero() {
        let metrics = LayoutMetrics::compute(0, Vec2::new(64.0, 127.0), 0.0);
        assert_eq!(metrics.slab_count, 0);
        assert_eq!(metrics.total_slab_area, 0.0);
        assert_eq!(metrics.waste_area, 0.0);
        assert_eq!(metrics.average_utilization, 0.0);
    }

    #[test]
    fn metrics_derive_waste_and_utilization() {
        let metrics = LayoutMetrics::compute(2, Vec2::new(10.0, 10.0), 150.0);
        assert_eq!(metrics.total_slab_area, 200.0);
        assert_eq!(metrics.waste_area, 50.0);
        assert!((metrics.average_utilization - 75.0).abs() < 1e-9);
    }

    #[test]
    #[should_panic(expected = "negative waste area")]
    fn negative_waste_is_an_assertion_failure() {
        LayoutMetrics::compute(1, Vec2::new(10.0, 10.0), 101.0);
    }

    #[test]
    fn accumulator_opens_slabs_with_increasing_index() {
        let mut acc = LayoutAccumulator::new(10.0, 20.0);
        assert_eq!(acc.open_slab().index, 0);
        assert_eq!(acc.open_slab().index, 1);
        assert_eq!(acc.slab_count(), 2);

        let layout = acc.finish(&[PartSpec::new("A", 2.0, 3.0, 4)], 1.0);
        assert_eq!(layout.metrics.slab_count, 2);
        assert_eq!(layout.metrics.total_part_area, 24.0);
        assert_eq!(layout.metrics.waste_area, 376.0);
        assert_eq!(layout.part_count(), 0);
        assert!(layout.verify().is_ok());
    }
}
