//! Common types and traits for planar slab geometry.
//!
//! This module defines the small value types shared by the packing engine,
//! the renderer and the HTTP layer: a 2D vector, an axis-aligned rectangle,
//! and trait abstractions for anything with a footprint or a position.

use std::ops::{Add, Mul, Sub};

/// Global numerical tolerance for floating-point comparisons.
///
/// Used when deciding whether a leftover sliver is thick enough to be kept as
/// a free region and when checking finished layouts.
pub const EPSILON_GENERAL: f64 = 1e-6;

/// Relative tolerance for the fit test.
///
/// Only absorbs floating-point rounding; scaled by the larger region side.
pub const EPSILON_FIT: f64 = 1e-9;

/// Represents a 2D vector or point on a slab.
///
/// `x` runs along the slab width, `y` along the slab length.
///
/// # Examples
/// ```
/// use slab_optimizer::types::Vec2;
///
/// let corner = Vec2::new(3.0, 5.0);
/// let size = Vec2::new(10.0, 4.0);
/// let far = corner + size;
/// assert_eq!(far, Vec2::new(13.0, 9.0));
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    /// Creates a new 2D vector.
    ///
    /// # Parameters
    /// * `x` - X component (along the slab width)
    /// * `y` - Y component (along the slab length)
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Creates a zero vector (origin).
    #[inline]
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0)
    }

    /// Converts to tuple format for API compatibility.
    #[inline]
    pub const fn as_tuple(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    /// Creates from tuple format.
    #[inline]
    pub const fn from_tuple(tuple: (f64, f64)) -> Self {
        Self::new(tuple.0, tuple.1)
    }

    /// Area spanned by a dimension vector.
    #[inline]
    pub fn area(&self) -> f64 {
        self.x * self.y
    }

    /// Perimeter of the rectangle described by a dimension vector.
    #[inline]
    pub fn perimeter(&self) -> f64 {
        2.0 * (self.x + self.y)
    }

    /// The larger of both components.
    #[inline]
    pub fn max_component(&self) -> f64 {
        self.x.max(self.y)
    }

    /// The vector with both components swapped (a 90° turn of a footprint).
    #[inline]
    pub const fn swapped(&self) -> Self {
        Self::new(self.y, self.x)
    }

    /// Checks if the vector fits within another vector (component-wise <=).
    ///
    /// # Parameters
    /// * `outer` - The outer vector (e.g. free region dimensions)
    /// * `tolerance` - Numerical tolerance for the comparison
    #[inline]
    pub fn fits_within(&self, outer: &Self, tolerance: f64) -> bool {
        self.x <= outer.x + tolerance && self.y <= outer.y + tolerance
    }

    /// Component-wise minimum with `outer`.
    #[inline]
    pub fn clamped_to(&self, outer: &Self) -> Self {
        Self::new(self.x.min(outer.x), self.y.min(outer.y))
    }
}

impl Add for Vec2 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Self;

    #[inline]
    fn mul(self, scalar: f64) -> Self::Output {
        Self::new(self.x * scalar, self.y * scalar)
    }
}

impl From<(f64, f64)> for Vec2 {
    #[inline]
    fn from(tuple: (f64, f64)) -> Self {
        Self::from_tuple(tuple)
    }
}

impl From<Vec2> for (f64, f64) {
    #[inline]
    fn from(vec: Vec2) -> Self {
        vec.as_tuple()
    }
}

/// Trait for objects with a rectangular footprint.
pub trait Dimensional {
    /// Returns the footprint (width, height) of the object.
    fn dimensions(&self) -> Vec2;

    /// Calculates the footprint area.
    fn area(&self) -> f64 {
        self.dimensions().area()
    }
}

/// Trait for objects with a position on a slab.
pub trait Positioned {
    /// Returns the position (lower left corner).
    fn position(&self) -> Vec2;
}

/// Axis-aligned rectangle given by its minimum and maximum corner.
///
/// Used for overlap tests between placed parts and for bounds checks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    /// Minimum corner (position)
    pub min: Vec2,
    /// Maximum corner (position + dimensions)
    pub max: Vec2,
}

impl Rect {
    /// Creates a new rectangle.
    #[inline]
    pub const fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Creates a rectangle from position and dimensions.
    #[inline]
    pub fn from_position_and_dims(position: Vec2, dims: Vec2) -> Self {
        Self {
            min: position,
            max: position + dims,
        }
    }

    /// Checks if two rectangles share interior area.
    ///
    /// Touching edges do not count as an intersection.
    #[inline]
    pub fn intersects(&self, other: &Self) -> bool {
        !(self.max.x <= other.min.x
            || other.max.x <= self.min.x
            || self.max.y <= other.min.y
            || other.max.y <= self.min.y)
    }

    #[inline]
    fn overlap_1d(a_min: f64, a_max: f64, b_min: f64, b_max: f64) -> f64 {
        (a_max.min(b_max) - a_min.max(b_min)).max(0.0)
    }

    /// Calculates the overlap area with another rectangle.
    #[inline]
    pub fn overlap_area(&self, other: &Self) -> f64 {
        let overlap_x = Self::overlap_1d(self.min.x, self.max.x, other.min.x, other.max.x);
        let overlap_y = Self::overlap_1d(self.min.y, self.max.y, other.min.y, other.max.y);
        overlap_x * overlap_y
    }

    /// Checks if this rectangle lies inside `outer`, allowing `tolerance` on each edge.
    #[inline]
    pub fn is_within(&self, outer: &Self, tolerance: f64) -> bool {
        self.min.x >= outer.min.x - tolerance
            && self.min.y >= outer.min.y - tolerance
            && self.max.x <= outer.max.x + tolerance
            && self.max.y <= outer.max.y + tolerance
    }

    /// Returns the center point.
    #[inline]
    pub fn center(&self) -> Vec2 {
        Vec2::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
        )
    }

    /// Returns the dimensions (width, height).
    #[inline]
    pub fn dimensions(&self) -> Vec2 {
        self.max - self.min
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.dimensions().area()
    }
}

/// Validation helpers shared by part and slab checks.
pub mod validation {

    /// Validates a single length.
    ///
    /// # Parameters
    /// * `value` - The value to validate
    /// * `name` - Name of the dimension for error messages
    ///
    /// # Returns
    /// `Ok(())` for valid values, otherwise error text
    pub fn validate_dimension(value: f64, name: &str) -> Result<(), String> {
        if value.is_nan() {
            return Err(format!("{} must not be NaN", name));
        }
        if value.is_infinite() {
            return Err(format!("{} must not be infinite", name));
        }
        if value <= 0.0 {
            return Err(format!("{} must be positive, got: {}", name, value));
        }
        Ok(())
    }

    /// Validates a length that may be zero (kerf).
    pub fn validate_non_negative(value: f64, name: &str) -> Result<(), String> {
        if !value.is_finite() {
            return Err(format!("{} must be a finite number, got: {}", name, value));
        }
        if value < 0.0 {
            return Err(format!("{} must not be negative, got: {}", name, value));
        }
        Ok(())
    }
}
