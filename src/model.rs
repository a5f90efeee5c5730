//! Data models for slab cutting layouts.
//!
//! This module defines the records that flow through the packing engine:
//! - `PartSpec`: a part requested by the caller, with a quantity
//! - `AtomicUnit`: one physical piece after quantity expansion and kerf padding
//! - `Orientation`: how a unit is turned on the slab
//! - `PlacedPart`: a unit with its final slab, position and footprint

use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use utoipa::ToSchema;

use crate::error::PackingError;
use crate::types::{Dimensional, Positioned, Rect, Vec2, validation};

/// A part requested by the caller.
///
/// Lengths are given in the caller's part unit; they are converted to slab
/// units by the normalizer.
///
/// # Fields
/// * `label` - Free text name, not required to be unique
/// * `length` - Extent that ends up along the slab length when not rotated
/// * `width` - Extent that ends up along the slab width when not rotated
/// * `quantity` - Number of identical pieces
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({"label": "island top", "length": 7.0, "width": 3.5, "quantity": 2}))]
pub struct PartSpec {
    pub label: String,
    pub length: f64,
    pub width: f64,
    pub quantity: u32,
}

impl PartSpec {
    /// Creates a part specification without validating it.
    pub fn new(label: impl Into<String>, length: f64, width: f64, quantity: u32) -> Self {
        Self {
            label: label.into(),
            length,
            width,
            quantity,
        }
    }

    /// Checks dimensions and quantity.
    ///
    /// # Parameters
    /// * `index` - Position of this spec in the caller's list, used in the error
    ///
    /// # Returns
    /// `Err(PackingError::InvalidPart)` naming the offending spec
    pub fn validate(&self, index: usize) -> Result<(), PackingError> {
        let invalid = |reason: String| PackingError::InvalidPart {
            index,
            label: self.label.clone(),
            reason,
        };

        validation::validate_dimension(self.length, "Length").map_err(invalid)?;
        validation::validate_dimension(self.width, "Width").map_err(invalid)?;
        if self.quantity == 0 {
            return Err(invalid("Quantity must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Unpadded area of all pieces of this spec after unit conversion.
    pub fn total_area(&self, unit_factor: f64) -> f64 {
        self.length * unit_factor * self.width * unit_factor * f64::from(self.quantity)
    }
}

/// One physical piece to place.
///
/// `width`/`height` are the working dimensions including kerf padding;
/// `cut_width`/`cut_height` are the dimensions of the finished piece.
#[derive(Clone, Debug, PartialEq)]
pub struct AtomicUnit {
    pub id: usize,
    pub spec_index: usize,
    pub label: String,
    pub width: f64,
    pub height: f64,
    pub cut_width: f64,
    pub cut_height: f64,
}

impl AtomicUnit {
    /// Working footprint (padded) in the upright orientation.
    #[inline]
    pub fn working_dims(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    /// Finished footprint (unpadded) in the upright orientation.
    #[inline]
    pub fn cut_dims(&self) -> Vec2 {
        Vec2::new(self.cut_width, self.cut_height)
    }

    /// A square unit looks the same in both orientations.
    #[inline]
    pub fn is_square(&self) -> bool {
        self.width == self.height
    }

    /// Orientations worth testing for this unit, upright first.
    pub fn candidate_orientations(&self, allow_rotation: bool) -> &'static [Orientation] {
        if allow_rotation && !self.is_square() {
            &[Orientation::Upright, Orientation::Rotated]
        } else {
            &[Orientation::Upright]
        }
    }
}

impl Dimensional for AtomicUnit {
    fn dimensions(&self) -> Vec2 {
        self.working_dims()
    }
}

/// How a unit lies on the slab.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// Unit width along the slab width.
    Upright,
    /// Turned by 90°: unit width along the slab length.
    Rotated,
}

impl Orientation {
    /// Applies the orientation to an upright footprint.
    #[inline]
    pub fn apply(self, dims: Vec2) -> Vec2 {
        match self {
            Orientation::Upright => dims,
            Orientation::Rotated => dims.swapped(),
        }
    }

    #[inline]
    pub fn is_rotated(self) -> bool {
        matches!(self, Orientation::Rotated)
    }
}

/// A unit placed on a slab.
///
/// `(x, y)` is the lower-left corner in slab coordinates; x runs along the slab
/// width, y along the slab length. `placed_width`/`placed_height` is the padded
/// footprint after orientation, `cut_width`/`cut_height` the finished piece in
/// the same orientation.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct PlacedPart {
    pub unit_id: usize,
    pub label: String,
    pub slab_index: usize,
    pub x: f64,
    pub y: f64,
    pub placed_width: f64,
    pub placed_height: f64,
    pub cut_width: f64,
    pub cut_height: f64,
    pub orientation: Orientation,
}

impl PlacedPart {
    /// Creates the placement record for `unit` at `position`.
    ///
    /// `footprint` is the padded size the slab reserved, which may be snapped
    /// a rounding error below the unit's own size. The cut piece never exceeds it.
    pub fn new(
        unit: &AtomicUnit,
        slab_index: usize,
        position: Vec2,
        orientation: Orientation,
        footprint: Vec2,
    ) -> Self {
        let placed = orientation.apply(unit.working_dims()).clamped_to(&footprint);
        let cut = orientation.apply(unit.cut_dims()).clamped_to(&placed);
        Self {
            unit_id: unit.id,
            label: unit.label.clone(),
            slab_index,
            x: position.x,
            y: position.y,
            placed_width: placed.x,
            placed_height: placed.y,
            cut_width: cut.x,
            cut_height: cut.y,
            orientation,
        }
    }

    /// Padded footprint on the slab.
    #[inline]
    pub fn footprint(&self) -> Rect {
        Rect::from_position_and_dims(self.position(), self.dimensions())
    }

    /// Finished piece on the slab, anchored at the same corner as the footprint.
    #[inline]
    pub fn cut_rect(&self) -> Rect {
        Rect::from_position_and_dims(self.position(), Vec2::new(self.cut_width, self.cut_height))
    }

    /// Area of the finished piece.
    #[inline]
    pub fn cut_area(&self) -> f64 {
        self.cut_width * self.cut_height
    }
}

impl Positioned for PlacedPart {
    fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

impl Dimensional for PlacedPart {
    fn dimensions(&self) -> Vec2 {
        Vec2::new(self.placed_width, self.placed_height)
    }
}
