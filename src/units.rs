//! Length units accepted for part and slab dimensions.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Unit in which a caller states lengths.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LengthUnit {
    Inches,
    Feet,
    Millimeters,
    Centimeters,
    Meters,
}

impl LengthUnit {
    /// Length of one unit in hundredths of a millimeter.
    ///
    /// All values are integers, so ratios like feet to inches come out exact.
    fn in_centi_millimeters(self) -> f64 {
        match self {
            LengthUnit::Inches => 2_540.0,
            LengthUnit::Feet => 30_480.0,
            LengthUnit::Millimeters => 100.0,
            LengthUnit::Centimeters => 1_000.0,
            LengthUnit::Meters => 100_000.0,
        }
    }

    /// Parses the names used in environment variables (`ft`, `inch`, `mm`, ...).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "in" | "inch" | "inches" => Some(LengthUnit::Inches),
            "ft" | "foot" | "feet" => Some(LengthUnit::Feet),
            "mm" | "millimeter" | "millimeters" => Some(LengthUnit::Millimeters),
            "cm" | "centimeter" | "centimeters" => Some(LengthUnit::Centimeters),
            "m" | "meter" | "meters" => Some(LengthUnit::Meters),
            _ => None,
        }
    }
}

/// Factor that turns a length given in `from` into a length in `to`.
///
/// # Examples
/// ```
/// use slab_optimizer::units::{LengthUnit, conversion_factor};
///
/// assert_eq!(conversion_factor(LengthUnit::Feet, LengthUnit::Inches), 12.0);
/// ```
pub fn conversion_factor(from: LengthUnit, to: LengthUnit) -> f64 {
    if from == to {
        return 1.0;
    }
    from.in_centi_millimeters() / to.in_centi_millimeters()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feet_to_inches_is_twelve() {
        assert_eq!(conversion_factor(LengthUnit::Feet, LengthUnit::Inches), 12.0);
    }

    #[test]
    fn identity_is_exactly_one() {
        for unit in [
            LengthUnit::Inches,
            LengthUnit::Feet,
            LengthUnit::Millimeters,
            LengthUnit::Centimeters,
            LengthUnit::Meters,
        ] {
            assert_eq!(conversion_factor(unit, unit), 1.0);
        }
    }

    #[test]
    fn metric_factors() {
        assert!((conversion_factor(LengthUnit::Meters, LengthUnit::Millimeters) - 1000.0).abs() < 1e-9);
        assert!((conversion_factor(LengthUnit::Millimeters, LengthUnit::Centimeters) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn parse_accepts_short_and_long_names() {
        assert_eq!(LengthUnit::parse("ft"), Some(LengthUnit::Feet));
        assert_eq!(LengthUnit::parse(" Inches "), Some(LengthUnit::Inches));
        assert_eq!(LengthUnit::parse("MM"), Some(LengthUnit::Millimeters));
        assert_eq!(LengthUnit::parse("yard"), None);
    }

    #[test]
    fn deserializes_snake_case() {
        let unit: LengthUnit = serde_json::from_str("\"centimeters\"").unwrap();
        assert_eq!(unit, LengthUnit::Centimeters);
    }
}
