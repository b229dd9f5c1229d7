//! Floating point helpers shared by the grid and the planner.
//!
//! The planner relies on exact tie-breaking between accumulated path costs, so
//! all comparisons go through [equals], [less] and [greater], which treat two
//! infinite operands as equal instead of subtracting them.
use num_traits::Float;

/// Sentinel for "no known path" and for impassable edges.
pub const INF: f64 = f64::INFINITY;
pub const PI: f64 = std::f64::consts::PI;
pub const SQRT2: f64 = std::f64::consts::SQRT_2;
/// Default precision of [equals], [less] and [greater].
pub const EPSILON: f64 = 1e-15;

fn both_infinite<F: Float>(a: F, b: F) -> bool {
    a.is_infinite() && b.is_infinite() && a.signum() == b.signum()
}

/// Checks whether `a` and `b` lie within `precision` of each other.
pub fn equals_within<F: Float>(a: F, b: F, precision: F) -> bool {
    if both_infinite(a, b) {
        return true;
    }
    (a - b).abs() < precision
}

/// Checks whether `a` exceeds `b` by more than `precision`.
pub fn greater_within<F: Float>(a: F, b: F, precision: F) -> bool {
    if both_infinite(a, b) {
        return false;
    }
    a - precision > b
}

/// Checks whether `a` falls short of `b` by more than `precision`.
pub fn less_within<F: Float>(a: F, b: F, precision: F) -> bool {
    if both_infinite(a, b) {
        return false;
    }
    a + precision < b
}

pub fn equals(a: f64, b: f64) -> bool {
    equals_within(a, b, EPSILON)
}

pub fn greater(a: f64, b: f64) -> bool {
    greater_within(a, b, EPSILON)
}

pub fn less(a: f64, b: f64) -> bool {
    less_within(a, b, EPSILON)
}

pub fn deg2rad(degrees: f64) -> f64 {
    degrees * PI / 180.0
}

pub fn rad2deg(radians: f64) -> f64 {
    radians * 180.0 / PI
}

/// Wraps an angle in degrees into (-180, 180].
pub fn deg2signed(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

/// Wraps an angle in radians into (-PI, PI].
pub fn rad2signed(radians: f64) -> f64 {
    let wrapped = radians.rem_euclid(2.0 * PI);
    if wrapped > PI {
        wrapped - 2.0 * PI
    } else {
        wrapped
    }
}

pub fn euclidean(dx: f64, dy: f64) -> f64 {
    dx.hypot(dy)
}

/// Cost of the cheapest 8-connected route over a unit-cost grid: as many
/// diagonal steps as possible, then straight.
pub fn octile(dx: f64, dy: f64) -> f64 {
    let (dx, dy) = (dx.abs(), dy.abs());
    (SQRT2 - 1.0) * dx.min(dy) + dx.max(dy)
}
