//! Ordering policy: the placement sequence of atomic units.
//!
//! Units are placed largest first under exactly one heuristic key per run.
//! Equal keys keep the input order (unit id), so the sequence is reproducible.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::AtomicUnit;

/// Heuristic key used to sort units in descending order.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderingKey {
    /// Padded `width * height`.
    #[default]
    Area,
    /// Padded `2 * (width + height)`.
    Perimeter,
    /// Padded `max(width, height)`.
    MaxDimension,
}

impl OrderingKey {
    /// All keys in their fixed enumeration order.
    pub const ALL: [OrderingKey; 3] = [
        OrderingKey::Area,
        OrderingKey::Perimeter,
        OrderingKey::MaxDimension,
    ];

    /// Key value of a unit.
    pub fn value(self, unit: &AtomicUnit) -> f64 {
        let dims = unit.working_dims();
        match self {
            OrderingKey::Area => dims.area(),
            OrderingKey::Perimeter => dims.perimeter(),
            OrderingKey::MaxDimension => dims.max_component(),
        }
    }

    /// Parses the names used in environment variables.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "area" => Some(OrderingKey::Area),
            "perimeter" => Some(OrderingKey::Perimeter),
            "max_dimension" | "max_dim" | "maxdimension" => Some(OrderingKey::MaxDimension),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderingKey::Area => "area",
            OrderingKey::Perimeter => "perimeter",
            OrderingKey::MaxDimension => "max_dimension",
        }
    }
}

/// Sorts units by descending key, ties by ascending unit id.
pub fn order_units(mut units: Vec<AtomicUnit>, key: OrderingKey) -> Vec<AtomicUnit> {
    units.sort_by(|a, b| {
        key.value(b)
            .partial_cmp(&key.value(a))
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    units
}
