// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Numeric helpers shared by all angle and length math.
//!
//! Every trigonometric and square-root evaluation in the crate goes through
//! this module, which forwards to the software implementations in [`libm`].
//! Platform intrinsics (and combined operations such as `hypot`) are never
//! used, so the same inputs produce bit-identical matrices on every target.
//!
//! [`sin`] and [`cos`] return exact values at quarter turns, so a 90° rotation
//! yields a matrix with exact zeros instead of `6.1e-17` residue.

use core::f64::consts::{FRAC_PI_2, PI};

/// Determinants with an absolute value below this are treated as singular.
pub const SINGULAR_EPSILON: f64 = 1e-10;

/// Tolerance used when comparing geometric quantities for "no change".
pub const GEOMETRY_EPSILON: f64 = 1e-9;

/// Converts degrees to radians.
#[inline]
#[must_use]
pub fn to_radians(degrees: f64) -> f64 {
    degrees * (PI / 180.0)
}

/// Converts radians to degrees.
#[inline]
#[must_use]
pub fn to_degrees(radians: f64) -> f64 {
    radians * (180.0 / PI)
}

/// Sine of `radians`, exact at multiples of π/2.
#[must_use]
pub fn sin(radians: f64) -> f64 {
    if radians == 0.0 {
        return 0.0;
    }
    let sign = if radians < 0.0 { -1.0 } else { 1.0 };
    let slice = radians / FRAC_PI_2;
    if slice == 1.0 || slice == -1.0 {
        return sign;
    }
    if slice == 2.0 || slice == -2.0 {
        return 0.0;
    }
    if slice == 3.0 || slice == -3.0 {
        return -sign;
    }
    libm::sin(radians)
}

/// Cosine of `radians`, exact at multiples of π/2.
#[must_use]
pub fn cos(radians: f64) -> f64 {
    if radians == 0.0 {
        return 1.0;
    }
    let slice = radians.abs() / FRAC_PI_2;
    if slice == 1.0 || slice == 3.0 {
        return 0.0;
    }
    if slice == 2.0 {
        return -1.0;
    }
    libm::cos(radians)
}

/// Tangent of `radians`.
#[inline]
#[must_use]
pub fn tan(radians: f64) -> f64 {
    libm::tan(radians)
}

/// Four-quadrant arctangent of `y / x`.
#[inline]
#[must_use]
pub fn atan2(y: f64, x: f64) -> f64 {
    libm::atan2(y, x)
}

/// Square root.
#[inline]
#[must_use]
pub fn sqrt(value: f64) -> f64 {
    libm::sqrt(value)
}

/// Euclidean length of `(x, y)`, computed from the squared components.
#[inline]
#[must_use]
pub fn length(x: f64, y: f64) -> f64 {
    sqrt(x * x + y * y)
}

/// Rounds up to the next integer.
#[inline]
#[must_use]
pub fn ceil(value: f64) -> f64 {
    libm::ceil(value)
}

/// Rounds down to the previous integer.
#[inline]
#[must_use]
pub fn floor(value: f64) -> f64 {
    libm::floor(value)
}

/// Rounds half away from zero.
#[inline]
#[must_use]
pub fn round(value: f64) -> f64 {
    libm::round(value)
}

/// Returns `true` if `a` and `b` differ by at most `epsilon`.
#[inline]
#[must_use]
pub fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() <= epsilon
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarter_turns_are_exact() {
        assert_eq!(cos(FRAC_PI_2), 0.0);
        assert_eq!(sin(FRAC_PI_2), 1.0);
        assert_eq!(cos(PI), -1.0);
        assert_eq!(sin(PI), 0.0);
        assert_eq!(sin(-FRAC_PI_2), -1.0);
        assert_eq!(cos(3.0 * FRAC_PI_2), 0.0);
        assert_eq!(sin(3.0 * FRAC_PI_2), -1.0);
    }

    #[test]
    fn degree_round_trip() {
        assert!(approx_eq(to_degrees(to_radians(37.5)), 37.5, 1e-12));
        assert_eq!(to_radians(90.0), FRAC_PI_2);
    }

    #[test]
    fn general_angles_match_libm() {
        let r = to_radians(30.0);
        assert!(approx_eq(sin(r), 0.5, 1e-12));
        assert!(approx_eq(cos(r), sqrt(3.0) / 2.0, 1e-12));
    }

    #[test]
    fn length_uses_squared_components() {
        assert_eq!(length(3.0, 4.0), 5.0);
        assert_eq!(length(0.0, 0.0), 0.0);
    }
}
