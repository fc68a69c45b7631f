// Centralized tolerances and fixed constants for the geometry core.

/// Transform scale bounds. Requests outside this range are rejected
/// outright (no clamp) so repeated wheel zooms cannot run away.
pub const MIN_SCALE: f64 = 1e-6;
pub const MAX_SCALE: f64 = 1e5;

pub const EPS_LEN: f64 = 1e-9; // zero-length vector threshold
pub const EPS_DENOM: f64 = 1e-12; // denominator guard for ratios

/// Below this tip-to-base distance an arrowhead is degenerate and
/// produces no shape.
pub const MIN_ARROW_LEN: f64 = 1e-3;

/// Total arrow opening angle, degrees. Fixed for every edge; the
/// half-angle tangent/cosine below are derived once from it.
pub const ARROW_ANGLE_DEG: f64 = 30.0;

/// tan(15 deg)
pub const HALF_ARROW_ANGLE_TAN: f64 = 0.267_949_192_431_122_7;
/// cos(15 deg)
pub const HALF_ARROW_ANGLE_COS: f64 = 0.965_925_826_289_068_3;

/// Hit tolerance in inches of screen distance; divided by the current
/// scale it yields a zoom-invariant graph-space radius.
pub const HIT_TOLERANCE_INCHES: f64 = 0.05;

/// Stroke thickness and dash length, inches on the physical display.
pub const PATH_THICKNESS_INCHES: f64 = 0.016;
pub const DASH_SIZE_INCHES: f64 = 0.05;

// Adaptive flattening cap
pub const MAX_FLATTEN_DEPTH: u32 = 16;

/// Chord tolerance used when flattening curves for hit-testing and
/// bounding boxes, graph units.
pub const FLATTEN_TOL: f64 = 0.25;

#[inline]
pub fn clamp(x: f64, lo: f64, hi: f64) -> f64 {
    x.max(lo).min(hi)
}

#[inline]
pub fn near_zero(x: f64, eps: f64) -> bool {
    x.abs() <= eps
}

#[inline]
pub fn norm2(mut x: f64, mut y: f64) -> ((f64, f64), f64) {
    let len = (x * x + y * y).sqrt();
    if len > EPS_LEN {
        x /= len;
        y /= len;
        ((x, y), len)
    } else {
        ((0.0, 0.0), 0.0)
    }
}

#[inline]
pub fn safe_div(num: f64, den: f64, fallback: f64) -> f64 {
    if den.abs() <= EPS_DENOM {
        fallback
    } else {
        num / den
    }
}

#[inline]
pub fn scale_out_of_range(scale: f64) -> bool {
    !(MIN_SCALE..=MAX_SCALE).contains(&scale) || !scale.is_finite()
}
