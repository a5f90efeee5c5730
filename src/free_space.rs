//! Free-space tracking for a single slab.
//!
//! A slab's unused area is described by a list of pairwise disjoint free
//! rectangles. Placing a part inside a region replaces that region by at most
//! two guillotine children, which keeps the list disjoint at every step. The
//! description may under-approximate the truly free area, but it never
//! contains space that is already occupied.
//!
//! ```text
//!  +-----------------------+
//!  |          top          |
//!  +--------+--------------+
//!  |  part  |    right     |
//!  +--------+--------------+
//! ```

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::{AtomicUnit, Orientation};
use crate::types::{EPSILON_FIT, EPSILON_GENERAL, Rect, Vec2};

/// Axis-aligned free region on a slab.
///
/// Invariant: `width > 0` and `height > 0`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FreeRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl FreeRect {
    /// Creates a region, or `None` when it is thinner than the tolerance.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Option<Self> {
        if width > EPSILON_GENERAL && height > EPSILON_GENERAL {
            Some(Self { x, y, width, height })
        } else {
            None
        }
    }

    #[inline]
    pub fn origin(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    #[inline]
    pub fn dims(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    #[inline]
    pub fn as_rect(&self) -> Rect {
        Rect::from_position_and_dims(self.origin(), self.dims())
    }
}

/// How a region is chosen among all regions that can hold a unit.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FitPolicy {
    /// First region (in scan order) and orientation that fits.
    FirstFit,
    /// Region and orientation with the smallest leftover area.
    #[default]
    BestFit,
}

impl FitPolicy {
    pub const ALL: [FitPolicy; 2] = [FitPolicy::FirstFit, FitPolicy::BestFit];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "first_fit" | "first" => Some(FitPolicy::FirstFit),
            "best_fit" | "best" => Some(FitPolicy::BestFit),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FitPolicy::FirstFit => "first_fit",
            FitPolicy::BestFit => "best_fit",
        }
    }
}

/// Which guillotine cut separates the leftover of a region.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SplitRule {
    /// Right child as tall as the part, top child spans the full region width.
    #[default]
    Horizontal,
    /// Pick horizontal or vertical, whichever keeps the larger single child.
    MaximizeArea,
}

impl SplitRule {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "horizontal" => Some(SplitRule::Horizontal),
            "maximize_area" | "max_area" => Some(SplitRule::MaximizeArea),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SplitRule::Horizontal => "horizontal",
            SplitRule::MaximizeArea => "maximize_area",
        }
    }
}

/// A fitting region/orientation pair returned by [`FreeSpaceTracker::try_fit`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Fit {
    /// Index of the region in the tracker's current list.
    pub region_index: usize,
    pub orientation: Orientation,
    /// Lower-left corner where the part goes.
    pub position: Vec2,
    /// Padded footprint after orientation, never larger than the region.
    pub footprint: Vec2,
    /// Region area not covered by the footprint.
    pub leftover: f64,
}

/// Free regions of one slab.
#[derive(Clone, Debug)]
pub struct FreeSpaceTracker {
    regions: Vec<FreeRect>,
}

impl FreeSpaceTracker {
    /// A tracker whose only region covers the whole slab.
    pub fn new(slab_width: f64, slab_height: f64) -> Self {
        Self {
            regions: FreeRect::new(0.0, 0.0, slab_width, slab_height)
                .into_iter()
                .collect(),
        }
    }

    pub fn regions(&self) -> &[FreeRect] {
        &self.regions
    }

    /// Sum of all free region areas.
    pub fn free_area(&self) -> f64 {
        self.regions.iter().map(FreeRect::area).sum()
    }

    /// Looks for a region that holds `unit`.
    ///
    /// Regions are scanned in list order; for each region the upright
    /// orientation is tested before the rotated one. A footprint that exceeds
    /// a region only by rounding error is snapped to the region edge.
    ///
    /// # Returns
    /// `None` if no region/orientation combination fits
    pub fn try_fit(&self, unit: &AtomicUnit, policy: FitPolicy, allow_rotation: bool) -> Option<Fit> {
        let mut best: Option<Fit> = None;

        for (region_index, region) in self.regions.iter().enumerate() {
            let tolerance = EPSILON_FIT * region.width.max(region.height).max(1.0);
            for &orientation in unit.candidate_orientations(allow_rotation) {
                let footprint = orientation.apply(unit.working_dims());
                if !footprint.fits_within(&region.dims(), tolerance) {
                    continue;
                }
                let footprint = footprint.clamped_to(&region.dims());

                let candidate = Fit {
                    region_index,
                    orientation,
                    position: region.origin(),
                    footprint,
                    leftover: region.area() - footprint.area(),
                };

                match policy {
                    FitPolicy::FirstFit => return Some(candidate),
                    FitPolicy::BestFit => {
                        let improves = best
                            .as_ref()
                            .is_none_or(|current| candidate.leftover + EPSILON_GENERAL < current.leftover);
                        if improves {
                            best = Some(candidate);
                        }
                    }
                }
            }
        }

        best
    }

    /// Replaces the region of `fit` by its guillotine children.
    ///
    /// Children without positive area are dropped. The children take the
    /// parent's place in the list, right child first.
    pub fn carve(&mut self, fit: &Fit, rule: SplitRule) {
        let region = self.regions.remove(fit.region_index);
        let (first, second) = split(&region, fit.footprint, rule);

        let mut insert_at = fit.region_index;
        for child in [first, second].into_iter().flatten() {
            self.regions.insert(insert_at, child);
            insert_at += 1;
        }
    }
}

/// Guillotine split of `region` around a part of size `used` in its lower-left corner.
fn split(region: &FreeRect, used: Vec2, rule: SplitRule) -> (Option<FreeRect>, Option<FreeRect>) {
    let used = used.clamped_to(&region.dims());
    let right_w = region.width - used.x;
    let top_h = region.height - used.y;

    // |  top (full width)   |      | top |               |
    // | part |    right     |  or  | part|    right      |
    let horizontal = (
        FreeRect::new(region.x + used.x, region.y, right_w, used.y),
        FreeRect::new(region.x, region.y + used.y, region.width, top_h),
    );

    match rule {
        SplitRule::Horizontal => horizontal,
        SplitRule::MaximizeArea => {
            let vertical = (
                FreeRect::new(region.x + used.x, region.y, right_w, region.height),
                FreeRect::new(region.x, region.y + used.y, used.x, top_h),
            );
            let largest = |pair: &(Option<FreeRect>, Option<FreeRect>)| {
                [pair.0, pair.1]
                    .into_iter()
                    .flatten()
                    .map(|r| r.area())
                    .fold(0.0, f64::max)
            };
            if largest(&vertical) > largest(&horizontal) + EPSILON_GENERAL {
                vertical
            } else {
                horizontal
            }
        }
    }
}
