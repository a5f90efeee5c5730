//! Layout properties checked on fixed and randomized part lists.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use test_case::test_case;

use slab_optimizer::free_space::{FitPolicy, SplitRule};
use slab_optimizer::geometry::{find_overlaps, within_slab};
use slab_optimizer::model::{Orientation, PartSpec};
use slab_optimizer::ordering::OrderingKey;
use slab_optimizer::types::Vec2;
use slab_optimizer::{Layout, PackingConfig, pack_best_of, pack_parts};

const TOLERANCE: f64 = 1e-6;

fn kitchen_order() -> Vec<PartSpec> {
    vec![
        PartSpec::new("island top", 7.0, 3.5, 8),
        PartSpec::new("island side", 3.0, 3.5, 16),
        PartSpec::new("kitchen 1", 2.75, 2.0, 8),
        PartSpec::new("kitchen 2", 5.5, 2.0, 8),
        PartSpec::new("bath 1", 9.1, 1.75, 8),
        PartSpec::new("bath 2", 2.0, 1.75, 8),
    ]
}

fn random_specs(rng: &mut SmallRng, max_dim: f64) -> Vec<PartSpec> {
    let count = rng.random_range(1..=12);
    (0..count)
        .map(|i| {
            PartSpec::new(
                format!("part {i}"),
                rng.random_range(0.5..max_dim),
                rng.random_range(0.5..max_dim),
                rng.random_range(1..=4),
            )
        })
        .collect()
}

/// Asserts every structural property of a finished layout.
fn assert_valid_layout(layout: &Layout, specs: &[PartSpec], config: &PackingConfig) {
    let expected_units: u32 = specs.iter().map(|s| s.quantity).sum();
    assert_eq!(layout.part_count(), expected_units as usize, "every unit placed exactly once");

    let mut unit_ids: Vec<usize> = layout.placed_parts().map(|p| p.unit_id).collect();
    unit_ids.sort_unstable();
    assert_eq!(unit_ids, (0..expected_units as usize).collect::<Vec<_>>());

    let slab_dims = Vec2::new(config.slab_width, config.slab_height);
    for (index, slab) in layout.slabs.iter().enumerate() {
        assert_eq!(slab.index, index);
        assert!(!slab.placed().is_empty(), "slab {index} was opened but never used");

        for part in slab.placed() {
            assert_eq!(part.slab_index, index);
            assert!(within_slab(part, slab_dims, TOLERANCE), "unit {} leaves the slab", part.unit_id);
            if !config.allow_rotation {
                assert_eq!(part.orientation, Orientation::Upright);
            }
        }

        assert!(
            find_overlaps(slab.placed(), TOLERANCE).is_empty(),
            "slab {index} has overlapping parts"
        );

        for region in slab.free_regions() {
            assert!(region.width > 0.0 && region.height > 0.0);
            for part in slab.placed() {
                assert!(
                    region.as_rect().overlap_area(&part.footprint()) <= TOLERANCE,
                    "free region overlaps unit {}",
                    part.unit_id
                );
            }
        }
    }

    assert!(layout.verify().is_ok());
    assert!(layout.metrics.waste_area >= 0.0);
    assert_eq!(layout.metrics.slab_count, layout.slab_count());
}

/// Placed footprint must be the padded unit, upright or turned.
fn assert_orientations_match(layout: &Layout, specs: &[PartSpec], config: &PackingConfig) {
    let mut spec_of_unit = Vec::new();
    for spec in specs {
        for _ in 0..spec.quantity {
            spec_of_unit.push(spec);
        }
    }

    for part in layout.placed_parts() {
        let spec = spec_of_unit[part.unit_id];
        assert_eq!(part.label, spec.label);
        let width = spec.width * config.unit_factor + config.kerf;
        let height = spec.length * config.unit_factor + config.kerf;
        let (expected_w, expected_h) = match part.orientation {
            Orientation::Upright => (width, height),
            Orientation::Rotated => (height, width),
        };
        assert!((part.placed_width - expected_w).abs() < TOLERANCE);
        assert!((part.placed_height - expected_h).abs() < TOLERANCE);
        assert!((part.placed_width - part.cut_width - config.kerf).abs() < TOLERANCE);
    }
}

#[test_case(OrderingKey::Area, FitPolicy::BestFit; "area best fit")]
#[test_case(OrderingKey::Area, FitPolicy::FirstFit; "area first fit")]
#[test_case(OrderingKey::Perimeter, FitPolicy::BestFit; "perimeter best fit")]
#[test_case(OrderingKey::MaxDimension, FitPolicy::FirstFit; "max dimension first fit")]
fn kitchen_order_packs_onto_default_slab(key: OrderingKey, policy: FitPolicy) {
    let specs = kitchen_order();
    let config = PackingConfig::builder()
        .ordering_key(key)
        .fit_policy(policy)
        .build();
    let layout = pack_parts(&specs, &config).unwrap();

    assert_valid_layout(&layout, &specs, &config);
    assert_orientations_match(&layout, &specs, &config);

    // 56 pieces with about 93 800 square inches of stone need at least 12 slabs of 8128.
    assert!(layout.slab_count() >= 12);
    let part_area: f64 = specs.iter().map(|s| s.total_area(12.0)).sum();
    assert!((layout.metrics.total_part_area - part_area).abs() < 1e-6);
}

#[test_case(SplitRule::Horizontal; "horizontal")]
#[test_case(SplitRule::MaximizeArea; "maximize area")]
fn randomized_layouts_are_valid(rule: SplitRule) {
    for seed in 0..40 {
        let mut rng = SmallRng::seed_from_u64(seed);
        let specs = random_specs(&mut rng, 15.0);
        let config = PackingConfig::builder()
            .slab(20.0, 30.0)
            .kerf(rng.random_range(0.0..0.5))
            .unit_factor(1.0)
            .split_rule(rule)
            .allow_rotation(rng.random_bool(0.8))
            .build();

        let layout = pack_parts(&specs, &config)
            .unwrap_or_else(|err| panic!("seed {seed} failed: {err}"));
        assert_valid_layout(&layout, &specs, &config);
        assert_orientations_match(&layout, &specs, &config);
    }
}

#[test]
fn identical_input_gives_identical_layout() {
    let mut rng = SmallRng::seed_from_u64(7);
    let specs = random_specs(&mut rng, 12.0);
    let config = PackingConfig::builder().slab(20.0, 20.0).kerf(0.25).unit_factor(1.0).build();

    let first = pack_parts(&specs, &config).unwrap();
    let second = pack_parts(&specs, &config).unwrap();
    let first_parts: Vec<_> = first.placed_parts().cloned().collect();
    let second_parts: Vec<_> = second.placed_parts().cloned().collect();
    assert_eq!(first_parts, second_parts);
    assert_eq!(first.metrics, second.metrics);
}

#[test]
fn best_of_is_valid_and_never_worse() {
    for seed in 100..110 {
        let mut rng = SmallRng::seed_from_u64(seed);
        let specs = random_specs(&mut rng, 14.0);
        let config = PackingConfig::builder().slab(20.0, 25.0).kerf(0.1).unit_factor(1.0).build();

        let best = pack_best_of(&specs, &config).unwrap();
        assert_valid_layout(&best.layout, &specs, &best.config);

        for key in OrderingKey::ALL {
            for policy in FitPolicy::ALL {
                let variant = PackingConfig {
                    ordering_key: key,
                    fit_policy: policy,
                    ..config
                };
                let single = pack_parts(&specs, &variant).unwrap();
                assert!(best.layout.slab_count() <= single.slab_count());
            }
        }
    }
}

#[test]
fn rotation_is_needed_for_long_parts() {
    // 25 long pieces only fit a 30 wide, 20 long slab when turned.
    let specs = vec![PartSpec::new("strip", 25.0, 2.0, 3)];
    let mut config = PackingConfig::builder().slab(30.0, 20.0).kerf(0.0).unit_factor(1.0).build();

    let layout = pack_parts(&specs, &config).unwrap();
    assert!(layout.placed_parts().all(|p| p.orientation == Orientation::Rotated));
    assert_valid_layout(&layout, &specs, &config);

    config.allow_rotation = false;
    assert!(pack_parts(&specs, &config).is_err());
}
