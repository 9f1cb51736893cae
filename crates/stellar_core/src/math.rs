//! Fixed-point math utilities for deterministic turn generation.
//!
//! Galaxy coordinates, distances and travel geometry use fixed-point
//! arithmetic so that two servers given the same seed and orders produce
//! bit-identical universes. Floating-point operations can produce different
//! results on different CPUs.

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647
/// Precision: approximately 0.00000000023
pub type Fixed = I32F32;

/// Fixed-point 2D vector, in light-years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec2Fixed {
    /// X coordinate.
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Y coordinate.
    #[serde(with = "fixed_serde")]
    pub y: Fixed,
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

impl Vec2Fixed {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Create a vector from whole light-year coordinates.
    #[must_use]
    pub fn from_ints(x: i32, y: i32) -> Self {
        Self::new(Fixed::from_num(x), Fixed::from_num(y))
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
    };

    /// Calculate squared distance (avoids sqrt for comparisons).
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy))
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> Fixed {
        fixed_sqrt(self.distance_squared(other))
    }

    /// Dot product of two vectors.
    #[must_use]
    pub fn dot(self, other: Self) -> Fixed {
        self.x * other.x + self.y * other.y
    }

    /// Vector length.
    #[must_use]
    pub fn length(self) -> Fixed {
        fixed_sqrt(self.dot(self))
    }

    /// Scale both components.
    #[must_use]
    pub fn scale(self, factor: Fixed) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    /// Normalize vector using fixed-point math.
    #[must_use]
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len == Fixed::ZERO {
            return Self::ZERO;
        }

        Self::new(self.x / len, self.y / len)
    }

    /// Point reached after travelling `dist` from `self` toward `target`.
    ///
    /// Never overshoots: if `dist` covers the whole way, returns `target`
    /// exactly so that arrival checks compare equal.
    #[must_use]
    pub fn move_toward(self, target: Self, dist: Fixed) -> Self {
        let total = self.distance(target);
        if dist >= total || total == Fixed::ZERO {
            return target;
        }
        let direction = (target - self).normalize();
        self + direction.scale(dist)
    }
}

/// Computes the square root of a fixed-point number using binary search.
#[must_use]
pub fn fixed_sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }

    let mut low = Fixed::ZERO;
    let mut high = if value > Fixed::ONE { value } else { Fixed::ONE };

    for _ in 0..64 {
        let mid = low + (high - low) / Fixed::from_num(2);
        let mid_sq = mid.saturating_mul(mid);

        if mid_sq <= value {
            low = mid;
        } else {
            high = mid;
        }
        if high - low <= Fixed::DELTA {
            break;
        }
    }

    low
}

/// Integer square root (floor) for wide counts such as mine totals.
#[must_use]
pub fn isqrt_u64(value: u64) -> u64 {
    if value < 2 {
        return value;
    }
    let mut x = value;
    let mut y = (x + 1) / 2;
    while y < x {
        x = y;
        y = (x + value / x) / 2;
    }
    x
}

/// Distance along a travel segment where it enters and leaves a circle.
///
/// Returns `None` when the segment from `start` to `end` never touches the
/// circle. Both distances are clamped to `0..=|end - start|`; a start point
/// already inside the circle enters at distance zero.
#[must_use]
pub fn segment_circle_span(
    start: Vec2Fixed,
    end: Vec2Fixed,
    center: Vec2Fixed,
    radius: Fixed,
) -> Option<(Fixed, Fixed)> {
    let path = end - start;
    let length = path.length();
    let offset = start - center;
    let radius_sq = radius.saturating_mul(radius);

    if length == Fixed::ZERO {
        return (offset.dot(offset) <= radius_sq).then_some((Fixed::ZERO, Fixed::ZERO));
    }

    let direction = path.normalize();
    let b = offset.dot(direction);
    let c = offset.dot(offset) - radius_sq;
    let discriminant = b.saturating_mul(b) - c;
    if discriminant < Fixed::ZERO {
        return None;
    }

    let root = fixed_sqrt(discriminant);
    let enter = -b - root;
    let exit = -b + root;
    if exit < Fixed::ZERO || enter > length {
        return None;
    }

    Some((enter.max(Fixed::ZERO), exit.min(length)))
}

impl std::ops::Add for Vec2Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::Sub for Vec2Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl std::fmt::Display for Vec2Fixed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec2_distance_squared() {
        let a = Vec2Fixed::from_ints(3, 0);
        let b = Vec2Fixed::from_ints(0, 4);
        // 3² + 4² = 25
        assert_eq!(a.distance_squared(b), Fixed::from_num(25));
    }

    #[test]
    fn test_distance_of_pythagorean_triple() {
        let a = Vec2Fixed::from_ints(0, 0);
        let b = Vec2Fixed::from_ints(30, 40);
        let dist = a.distance(b);
        let epsilon = Fixed::ONE / Fixed::from_num(10000);
        assert!((dist - Fixed::from_num(50)).abs() < epsilon, "got {dist}");
    }

    #[test]
    fn test_fixed_determinism() {
        let a = Fixed::from_num(1) / Fixed::from_num(3);
        let b = Fixed::from_num(1) / Fixed::from_num(3);
        assert_eq!(a * Fixed::from_num(7), b * Fixed::from_num(7));
    }

    #[test]
    fn test_move_toward_never_overshoots() {
        let start = Vec2Fixed::from_ints(0, 0);
        let target = Vec2Fixed::from_ints(10, 0);
        assert_eq!(start.move_toward(target, Fixed::from_num(25)), target);

        let partial = start.move_toward(target, Fixed::from_num(4));
        let epsilon = Fixed::ONE / Fixed::from_num(1000);
        assert!((partial.x - Fixed::from_num(4)).abs() < epsilon);
        assert_eq!(partial.y, Fixed::ZERO);
    }

    #[test]
    fn test_isqrt_u64() {
        assert_eq!(isqrt_u64(0), 0);
        assert_eq!(isqrt_u64(1), 1);
        assert_eq!(isqrt_u64(99), 9);
        assert_eq!(isqrt_u64(100), 10);
        assert_eq!(isqrt_u64(10_000_000_000), 100_000);
    }

    #[test]
    fn test_segment_circle_span_crossing() {
        // Path along the x axis through a circle of radius 10 centred at x = 50.
        let span = segment_circle_span(
            Vec2Fixed::from_ints(0, 0),
            Vec2Fixed::from_ints(100, 0),
            Vec2Fixed::from_ints(50, 0),
            Fixed::from_num(10),
        )
        .unwrap();
        let epsilon = Fixed::ONE / Fixed::from_num(1000);
        assert!((span.0 - Fixed::from_num(40)).abs() < epsilon);
        assert!((span.1 - Fixed::from_num(60)).abs() < epsilon);
    }

    #[test]
    fn test_segment_circle_span_miss_and_inside() {
        assert!(segment_circle_span(
            Vec2Fixed::from_ints(0, 0),
            Vec2Fixed::from_ints(100, 0),
            Vec2Fixed::from_ints(50, 30),
            Fixed::from_num(10),
        )
        .is_none());

        // Stops short of the circle.
        assert!(segment_circle_span(
            Vec2Fixed::from_ints(0, 0),
            Vec2Fixed::from_ints(30, 0),
            Vec2Fixed::from_ints(50, 0),
            Fixed::from_num(10),
        )
        .is_none());

        let inside = segment_circle_span(
            Vec2Fixed::from_ints(50, 0),
            Vec2Fixed::from_ints(100, 0),
            Vec2Fixed::from_ints(50, 0),
            Fixed::from_num(10),
        )
        .unwrap();
        assert_eq!(inside.0, Fixed::ZERO);
    }
}
