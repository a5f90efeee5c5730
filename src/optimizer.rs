//! Packing engine: places atomic units onto as few slabs as possible.
//!
//! The run is a single pass over the ordered units:
//! - every open slab is asked for a fit, in creation order
//! - the first slab that fits receives the unit
//! - if none fits, a new slab is opened; a unit that does not fit an empty
//!   slab aborts the run
//!
//! Identical parts and configuration always produce the identical layout.

use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{PackingError, Result};
use crate::free_space::{FitPolicy, SplitRule};
use crate::layout::{Layout, LayoutAccumulator};
use crate::model::{AtomicUnit, PartSpec, PlacedPart};
use crate::normalizer::normalize_parts;
use crate::ordering::{OrderingKey, order_units};
use crate::slab::Slab;
use crate::types::validation;

/// Configuration of one packing run.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PackingConfig {
    /// Slab extent along x
    pub slab_width: f64,
    /// Slab extent along y (the slab length)
    pub slab_height: f64,
    /// Blade gap added once to both dimensions of every part
    pub kerf: f64,
    /// Factor from part units to slab units
    pub unit_factor: f64,
    pub ordering_key: OrderingKey,
    pub fit_policy: FitPolicy,
    pub split_rule: SplitRule,
    pub allow_rotation: bool,
}

impl PackingConfig {
    pub const DEFAULT_SLAB_WIDTH: f64 = 64.0;
    pub const DEFAULT_SLAB_HEIGHT: f64 = 127.0;
    pub const DEFAULT_KERF: f64 = 0.5;
    pub const DEFAULT_UNIT_FACTOR: f64 = 12.0;
    pub const DEFAULT_ALLOW_ROTATION: bool = true;
    /// Per-run limit on the summed part quantities.
    pub const MAX_UNITS: usize = crate::normalizer::MAX_UNITS;

    /// Creates a builder for custom configuration.
    pub fn builder() -> PackingConfigBuilder {
        PackingConfigBuilder::default()
    }

    /// Checks slab size, kerf and unit factor.
    pub fn validate(&self) -> Result<()> {
        validation::validate_dimension(self.slab_width, "Slab width")
            .and_then(|_| validation::validate_dimension(self.slab_height, "Slab height"))
            .and_then(|_| validation::validate_non_negative(self.kerf, "Kerf"))
            .and_then(|_| validation::validate_dimension(self.unit_factor, "Unit conversion factor"))
            .map_err(PackingError::Configuration)
    }
}

impl Default for PackingConfig {
    fn default() -> Self {
        Self {
            slab_width: Self::DEFAULT_SLAB_WIDTH,
            slab_height: Self::DEFAULT_SLAB_HEIGHT,
            kerf: Self::DEFAULT_KERF,
            unit_factor: Self::DEFAULT_UNIT_FACTOR,
            ordering_key: OrderingKey::default(),
            fit_policy: FitPolicy::default(),
            split_rule: SplitRule::default(),
            allow_rotation: Self::DEFAULT_ALLOW_ROTATION,
        }
    }
}

/// Builder for PackingConfig.
#[derive(Clone, Debug, Default)]
pub struct PackingConfigBuilder {
    config: PackingConfig,
}

impl PackingConfigBuilder {
    /// Sets both slab dimensions.
    pub fn slab(mut self, width: f64, height: f64) -> Self {
        self.config.slab_width = width;
        self.config.slab_height = height;
        self
    }

    pub fn kerf(mut self, kerf: f64) -> Self {
        self.config.kerf = kerf;
        self
    }

    pub fn unit_factor(mut self, factor: f64) -> Self {
        self.config.unit_factor = factor;
        self
    }

    pub fn ordering_key(mut self, key: OrderingKey) -> Self {
        self.config.ordering_key = key;
        self
    }

    pub fn fit_policy(mut self, policy: FitPolicy) -> Self {
        self.config.fit_policy = policy;
        self
    }

    pub fn split_rule(mut self, rule: SplitRule) -> Self {
        self.config.split_rule = rule;
        self
    }

    pub fn allow_rotation(mut self, allow: bool) -> Self {
        self.config.allow_rotation = allow;
        self
    }

    /// Creates the final configuration.
    pub fn build(self) -> PackingConfig {
        self.config
    }
}

/// Events emitted while packing, for live visualization.
#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(tag = "type")]
pub enum PackEvent {
    /// A new slab was opened.
    SlabOpened { index: usize, width: f64, height: f64 },
    /// A part was placed.
    PartPlaced {
        slab_index: usize,
        unit_id: usize,
        label: String,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        rotated: bool,
    },
    /// Packing completed.
    Finished { slabs: usize, parts: usize },
}

impl PackEvent {
    fn placed(part: &PlacedPart) -> Self {
        PackEvent::PartPlaced {
            slab_index: part.slab_index,
            unit_id: part.unit_id,
            label: part.label.clone(),
            x: part.x,
            y: part.y,
            width: part.placed_width,
            height: part.placed_height,
            rotated: part.orientation.is_rotated(),
        }
    }
}

/// Packs `specs` onto slabs.
///
/// # Parameters
/// * `specs` - Parts in caller order
/// * `config` - Slab size, kerf, unit factor and heuristic choices
///
/// # Returns
/// The layout, or the first error that aborted the run
pub fn pack_parts(specs: &[PartSpec], config: &PackingConfig) -> Result<Layout> {
    pack_parts_with_progress(specs, config, |_| {})
}

/// Like [`pack_parts`], calling `on_event` for every opened slab and placed part.
pub fn pack_parts_with_progress(
    specs: &[PartSpec],
    config: &PackingConfig,
    mut on_event: impl FnMut(&PackEvent),
) -> Result<Layout> {
    config.validate()?;
    let units = normalize_parts(specs, config.kerf, config.unit_factor)?;
    let units = order_units(units, config.ordering_key);

    let mut layout = LayoutAccumulator::new(config.slab_width, config.slab_height);
    for unit in &units {
        let placed = match place_in_open_slab(&mut layout, unit, config) {
            Some(placed) => placed,
            None => open_slab_for(&mut layout, unit, config, &mut on_event)?,
        };
        on_event(&PackEvent::placed(&placed));
    }

    let layout = layout.finish(specs, config.unit_factor);
    debug_assert_eq!(layout.part_count(), units.len());

    on_event(&PackEvent::Finished {
        slabs: layout.slab_count(),
        parts: layout.part_count(),
    });
    info!(
        "Packed {} parts onto {} slabs ({:.1}% utilization, {} / {} / {})",
        layout.part_count(),
        layout.slab_count(),
        layout.metrics.average_utilization,
        config.ordering_key.as_str(),
        config.fit_policy.as_str(),
        config.split_rule.as_str(),
    );
    Ok(layout)
}

/// Placement heuristic: the first open slab, in creation order, that fits `unit`.
fn place_in_open_slab(
    layout: &mut LayoutAccumulator,
    unit: &AtomicUnit,
    config: &PackingConfig,
) -> Option<PlacedPart> {
    let (index, fit) = layout.slabs().iter().enumerate().find_map(|(idx, slab)| {
        slab.try_fit(unit, config.fit_policy, config.allow_rotation)
            .map(|fit| (idx, fit))
    })?;

    Some(
        layout
            .slab_mut(index)
            .place(unit, &fit, config.split_rule)
            .clone(),
    )
}

/// Bin allocator: opens a slab and places `unit` on it.
///
/// The slab is opened only when the unit fits an empty slab, so a failed run
/// never leaves an empty slab behind.
fn open_slab_for(
    layout: &mut LayoutAccumulator,
    unit: &AtomicUnit,
    config: &PackingConfig,
    on_event: &mut impl FnMut(&PackEvent),
) -> Result<PlacedPart> {
    let empty = Slab::new(layout.slab_count(), config.slab_width, config.slab_height);
    let Some(fit) = empty.try_fit(unit, config.fit_policy, config.allow_rotation) else {
        return Err(PackingError::PartTooLarge {
            unit_id: unit.id,
            label: unit.label.clone(),
            width: unit.width,
            height: unit.height,
            slab_width: config.slab_width,
            slab_height: config.slab_height,
        });
    };

    let slab = layout.open_slab();
    debug!("Opened slab {} for unit {} ('{}')", slab.index, unit.id, unit.label);
    on_event(&PackEvent::SlabOpened {
        index: slab.index,
        width: slab.width,
        height: slab.height,
    });
    Ok(slab.place(unit, &fit, config.split_rule).clone())
}

/// One evaluated heuristic variant of [`pack_best_of`].
#[derive(Clone, Debug)]
pub struct VariantOutcome {
    pub config: PackingConfig,
    pub layout: Layout,
}

/// Packs with every ordering key and fit policy and keeps the fewest slabs.
///
/// Variants run in parallel; each is an independent engine run. Ties go to
/// the earliest variant in `OrderingKey::ALL × FitPolicy::ALL` order, so the
/// choice does not depend on scheduling.
pub fn pack_best_of(specs: &[PartSpec], base: &PackingConfig) -> Result<VariantOutcome> {
    base.validate()?;

    let variants: Vec<PackingConfig> = OrderingKey::ALL
        .iter()
        .flat_map(|&key| {
            FitPolicy::ALL.iter().map(move |&policy| PackingConfig {
                ordering_key: key,
                fit_policy: policy,
                ..*base
            })
        })
        .collect();

    let outcomes: Vec<Result<VariantOutcome>> = variants
        .into_par_iter()
        .map(|config| pack_parts(specs, &config).map(|layout| VariantOutcome { config, layout }))
        .collect();

    let mut best: Option<VariantOutcome> = None;
    for outcome in outcomes {
        let outcome = outcome?;
        debug!(
            "Variant {} / {}: {} slabs",
            outcome.config.ordering_key.as_str(),
            outcome.config.fit_policy.as_str(),
            outcome.layout.slab_count()
        );
        let better = best
            .as_ref()
            .is_none_or(|current| outcome.layout.slab_count() < current.layout.slab_count());
        if better {
            best = Some(outcome);
        }
    }

    // `variants` is never empty, so at least one outcome was seen.
    best.ok_or_else(|| PackingError::Configuration("no heuristic variant was evaluated".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Orientation;

    fn raw_config(width: f64, height: f64, kerf: f64) -> PackingConfig {
        PackingConfig::builder()
            .slab(width, height)
            .kerf(kerf)
            .unit_factor(1.0)
            .build()
    }

    #[test]
    fn single_part_lands_in_corner() {
        let specs = vec![PartSpec::new("A", 5.0, 3.0, 1)];
        let layout = pack_parts(&specs, &raw_config(10.0, 10.0, 0.0)).unwrap();

        assert_eq!(layout.slab_count(), 1);
        let parts: Vec<_> = layout.placed_parts().collect();
        assert_eq!(parts.len(), 1);
        assert_eq!((parts[0].x, parts[0].y), (0.0, 0.0));
        let footprint = (parts[0].placed_width, parts[0].placed_height);
        assert!(footprint == (3.0, 5.0) || footprint == (5.0, 3.0));
    }

    #[test]
    fn two_large_squares_need_two_slabs() {
        let specs = vec![PartSpec::new("A", 6.0, 6.0, 1), PartSpec::new("B", 6.0, 6.0, 1)];
        let layout = pack_parts(&specs, &raw_config(10.0, 10.0, 0.0)).unwrap();
        assert_eq!(layout.slab_count(), 2);
        assert_eq!(layout.slabs[0].placed()[0].label, "A");
        assert_eq!(layout.slabs[1].placed()[0].label, "B");
    }

    #[test]
    fn near_fit_parts_never_overlap_later_parts() {
        // "F" is 9e-7 taller than the region right of "E"; it must not be squeezed in there.
        let specs = vec![
            PartSpec::new("E", 5.0, 6.0, 1),
            PartSpec::new("F", 5.0000009, 4.0, 1),
            PartSpec::new("G", 1.9, 10.0, 1),
        ];
        let layout = pack_parts(&specs, &raw_config(10.0, 10.0, 0.0)).unwrap();

        assert_eq!(layout.part_count(), 3);
        assert!(layout.verify().is_ok());
        for slab in &layout.slabs {
            let parts = slab.placed();
            for (i, a) in parts.iter().enumerate() {
                assert!(a.footprint().max.x <= slab.width && a.footprint().max.y <= slab.height);
                for b in &parts[i + 1..] {
                    assert!(
                        !crate::geometry::intersects(a, b),
                        "{} and {} overlap",
                        a.label,
                        b.label
                    );
                }
            }
        }
    }

    #[test]
    fn quantity_above_unit_limit_is_rejected() {
        let specs = vec![PartSpec::new("tile", 1.0, 1.0, u32::MAX)];
        let err = pack_parts(&specs, &raw_config(10.0, 10.0, 0.0)).unwrap_err();
        assert!(matches!(
            err,
            PackingError::TooManyUnits { limit, .. } if limit == PackingConfig::MAX_UNITS
        ));
    }

    #[test]
    fn oversized_part_fails_the_run() {
        let specs = vec![PartSpec::new("long", 200.0, 1.0, 1)];
        let err = pack_parts(&specs, &raw_config(127.0, 64.0, 0.0)).unwrap_err();
        assert!(matches!(err, PackingError::PartTooLarge { unit_id: 0, .. }));
    }

    #[test]
    fn zero_quantity_fails_the_run() {
        let specs = vec![PartSpec::new("A", 5.0, 3.0, 0)];
        let err = pack_parts(&specs, &raw_config(10.0, 10.0, 0.0)).unwrap_err();
        assert!(matches!(err, PackingError::InvalidPart { .. }));
    }

    #[test]
    fn invalid_slab_is_a_configuration_error() {
        let specs = vec![PartSpec::new("A", 1.0, 1.0, 1)];
        for config in [
            raw_config(0.0, 10.0, 0.0),
            raw_config(10.0, -1.0, 0.0),
            raw_config(10.0, 10.0, -0.5),
        ] {
            assert!(matches!(
                pack_parts(&specs, &config),
                Err(PackingError::Configuration(_))
            ));
        }
    }

    #[test]
    fn empty_input_uses_no_slabs() {
        let mut events = Vec::new();
        let layout = pack_parts_with_progress(&[], &PackingConfig::default(), |e| {
            events.push(e.clone())
        })
        .unwrap();
        assert_eq!(layout.slab_count(), 0);
        assert_eq!(layout.metrics.waste_area, 0.0);
        assert!(matches!(events.as_slice(), [PackEvent::Finished { slabs: 0, parts: 0 }]));
    }

    #[test]
    fn earlier_slabs_are_filled_first() {
        // 6x6 opens slab 0, 6x6 opens slab 1, the 4x4 pieces fill slab 0 first.
        let specs = vec![
            PartSpec::new("big", 6.0, 6.0, 2),
            PartSpec::new("small", 4.0, 4.0, 2),
        ];
        let layout = pack_parts(&specs, &raw_config(10.0, 10.0, 0.0)).unwrap();
        assert_eq!(layout.slab_count(), 2);
        let first: Vec<_> = layout.slabs[0].placed().iter().map(|p| p.label.as_str()).collect();
        assert_eq!(first, vec!["big", "small", "small"]);
    }

    #[test]
    fn kerf_pads_footprints() {
        // Padded width 4.75 + 0.25 = 5, so two pieces exactly fill the 10 wide slab.
        let specs = vec![PartSpec::new("A", 9.75, 4.75, 2)];
        let layout = pack_parts(&specs, &raw_config(10.0, 10.0, 0.25)).unwrap();
        assert_eq!(layout.slab_count(), 1);
        let parts: Vec<_> = layout.placed_parts().collect();
        assert_eq!(parts[0].placed_width, 5.0);
        assert_eq!(parts[1].x, 5.0);
        assert_eq!(parts[1].cut_width, 4.75);

        let wider = vec![PartSpec::new("A", 9.75, 4.8, 2)];
        let layout = pack_parts(&wider, &raw_config(10.0, 10.0, 0.25)).unwrap();
        assert_eq!(layout.slab_count(), 2);
    }

    #[test]
    fn rotation_can_be_disabled() {
        let specs = vec![PartSpec::new("A", 3.0, 8.0, 1)];
        let allowed = pack_parts(&specs, &raw_config(8.0, 4.0, 0.0)).unwrap();
        assert_eq!(allowed.slabs[0].placed()[0].orientation, Orientation::Upright);

        let tall = vec![PartSpec::new("A", 8.0, 3.0, 1)];
        let rotated = pack_parts(&tall, &raw_config(8.0, 4.0, 0.0)).unwrap();
        assert_eq!(rotated.slabs[0].placed()[0].orientation, Orientation::Rotated);

        let mut fixed = raw_config(8.0, 4.0, 0.0);
        fixed.allow_rotation = false;
        assert!(matches!(
            pack_parts(&tall, &fixed),
            Err(PackingError::PartTooLarge { .. })
        ));
    }

    #[test]
    fn progress_events_follow_placements() {
        let specs = vec![PartSpec::new("A", 6.0, 6.0, 2)];
        let mut events = Vec::new();
        pack_parts_with_progress(&specs, &raw_config(10.0, 10.0, 0.0), |e| events.push(e.clone()))
            .unwrap();

        let kinds: Vec<_> = events
            .iter()
            .map(|e| match e {
                PackEvent::SlabOpened { .. } => "open",
                PackEvent::PartPlaced { .. } => "place",
                PackEvent::Finished { .. } => "finish",
            })
            .collect();
        assert_eq!(kinds, vec!["open", "place", "open", "place", "finish"]);
    }

    #[test]
    fn default_units_convert_feet_to_inches() {
        // 7 ft x 3.5 ft island top on the default 64 x 127 inch slab.
        let specs = vec![PartSpec::new("island top", 7.0, 3.5, 1)];
        let layout = pack_parts(&specs, &PackingConfig::default()).unwrap();
        let part = &layout.slabs[0].placed()[0];
        assert_eq!((part.cut_width, part.cut_height), (42.0, 84.0));
        assert_eq!((part.placed_width, part.placed_height), (42.5, 84.5));
        assert!((layout.metrics.total_part_area - 42.0 * 84.0).abs() < 1e-9);
    }

    #[test]
    fn best_of_never_uses_more_slabs_than_default() {
        let specs = vec![
            PartSpec::new("island top", 7.0, 3.5, 8),
            PartSpec::new("island side", 3.0, 3.5, 16),
            PartSpec::new("kitchen 1", 2.75, 2.0, 8),
            PartSpec::new("kitchen 2", 5.5, 2.0, 8),
            PartSpec::new("bath 1", 9.1, 1.75, 8),
            PartSpec::new("bath 2", 2.0, 1.75, 8),
        ];
        let config = PackingConfig::default();
        let single = pack_parts(&specs, &config).unwrap();
        let best = pack_best_of(&specs, &config).unwrap();
        assert!(best.layout.slab_count() <= single.slab_count());
        assert_eq!(best.layout.part_count(), 56);
        assert!(best.layout.verify().is_ok());

        let again = pack_best_of(&specs, &config).unwrap();
        assert_eq!(again.config, best.config);
        assert_eq!(again.layout.slab_count(), best.layout.slab_count());
    }

    #[test]
    fn best_of_reports_part_errors() {
        let specs = vec![PartSpec::new("long", 200.0, 1.0, 1)];
        let config = raw_config(127.0, 64.0, 0.0);
        assert!(matches!(
            pack_best_of(&specs, &config),
            Err(PackingError::PartTooLarge { .. })
        ));
    }
}
