// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Composition and decomposition of 2×3 affine matrices.
//!
//! Matrices are [`kurbo::Affine`] values with coefficients `[a, b, c, d, e, f]`
//! mapping `(x, y)` to `(a·x + c·y + e, b·x + d·y + f)`, the same layout used
//! by canvas `setTransform`.
//!
//! # Composition order
//!
//! [`compose`] builds `translate × rotate × (scale-and-flip × skewX × skewY)`.
//! Rotation therefore happens in the object's own unskewed frame. Changing the
//! order changes the visual result.
//!
//! # Decomposition bias
//!
//! A matrix with shear cannot be split into a unique skew/scale pair.
//! [`decompose`] always returns `skew_y == 0` and attributes all shear to
//! `skew_x`. A negative determinant is reported as `flip_y = true` with
//! non-negative scales; `flip_x` is never produced. Angles are in degrees.

use kurbo::{Affine, Point};

use crate::error::{Result, SceneError};
use crate::numeric;

/// Input to [`compose`] and output of [`decompose`].
///
/// Angles are in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransformProps {
    /// Horizontal translation.
    pub translate_x: f64,
    /// Vertical translation.
    pub translate_y: f64,
    /// Horizontal scale.
    pub scale_x: f64,
    /// Vertical scale.
    pub scale_y: f64,
    /// Horizontal shear angle.
    pub skew_x: f64,
    /// Vertical shear angle.
    pub skew_y: f64,
    /// Rotation angle, clockwise in a y-down space.
    pub angle: f64,
    /// Mirror along the vertical axis.
    pub flip_x: bool,
    /// Mirror along the horizontal axis.
    pub flip_y: bool,
}

impl TransformProps {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        translate_x: 0.0,
        translate_y: 0.0,
        scale_x: 1.0,
        scale_y: 1.0,
        skew_x: 0.0,
        skew_y: 0.0,
        angle: 0.0,
        flip_x: false,
        flip_y: false,
    };
}

impl Default for TransformProps {
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Builds the pure rotation matrix for `angle` degrees.
#[must_use]
pub fn rotate_matrix(angle: f64) -> Affine {
    if angle == 0.0 {
        return Affine::IDENTITY;
    }
    let theta = numeric::to_radians(angle);
    let (cos, sin) = (numeric::cos(theta), numeric::sin(theta));
    Affine::new([cos, sin, -sin, cos, 0.0, 0.0])
}

/// Builds the scale, flip, and skew part of a transform.
///
/// Skew is applied as `scale × skewX × skewY`.
#[must_use]
pub fn dimensions_matrix(props: &TransformProps) -> Affine {
    let sx = if props.flip_x {
        -props.scale_x
    } else {
        props.scale_x
    };
    let sy = if props.flip_y {
        -props.scale_y
    } else {
        props.scale_y
    };
    let mut m = Affine::new([sx, 0.0, 0.0, sy, 0.0, 0.0]);
    if props.skew_x != 0.0 {
        let t = numeric::tan(numeric::to_radians(props.skew_x));
        m = multiply(m, Affine::new([1.0, 0.0, t, 1.0, 0.0, 0.0]));
    }
    if props.skew_y != 0.0 {
        let t = numeric::tan(numeric::to_radians(props.skew_y));
        m = multiply(m, Affine::new([1.0, t, 0.0, 1.0, 0.0, 0.0]));
    }
    m
}

/// Composes a matrix from transform properties.
#[must_use]
pub fn compose(props: &TransformProps) -> Affine {
    let mut m = Affine::new([1.0, 0.0, 0.0, 1.0, props.translate_x, props.translate_y]);
    if props.angle != 0.0 {
        m = multiply(m, rotate_matrix(props.angle));
    }
    let has_dimensions = props.scale_x != 1.0
        || props.scale_y != 1.0
        || props.skew_x != 0.0
        || props.skew_y != 0.0
        || props.flip_x
        || props.flip_y;
    if has_dimensions {
        m = multiply(m, dimensions_matrix(props));
    }
    m
}

/// Decomposes a matrix into transform properties.
///
/// See the [module docs](self) for the canonical bias applied to shear and
/// mirroring.
#[must_use]
pub fn decompose(m: Affine) -> TransformProps {
    let [a, b, c, d, e, f] = m.as_coeffs();
    let denom = a * a + b * b;
    let angle = numeric::to_degrees(numeric::atan2(b, a));
    let scale_x = numeric::sqrt(denom);
    if scale_x == 0.0 {
        // Degenerate first column: nothing sensible to recover beyond translation.
        return TransformProps {
            translate_x: e,
            translate_y: f,
            scale_x: 0.0,
            scale_y: numeric::length(c, d),
            ..TransformProps::IDENTITY
        };
    }
    let signed_scale_y = (a * d - c * b) / scale_x;
    let skew_x = numeric::to_degrees(numeric::atan2(a * c + b * d, denom));
    TransformProps {
        translate_x: e,
        translate_y: f,
        scale_x,
        scale_y: signed_scale_y.abs(),
        skew_x,
        skew_y: 0.0,
        angle,
        flip_x: false,
        flip_y: signed_scale_y < 0.0,
    }
}

/// Returns `a × b`: `b` is applied first, then `a`.
#[inline]
#[must_use]
pub fn multiply(a: Affine, b: Affine) -> Affine {
    a * b
}

/// Inverts a matrix.
///
/// # Errors
///
/// Returns [`SceneError::SingularMatrix`] when `|det| < 1e-10`.
pub fn invert(m: Affine) -> Result<Affine> {
    let [a, b, c, d, e, f] = m.as_coeffs();
    let det = a * d - b * c;
    if det.abs() < numeric::SINGULAR_EPSILON {
        return Err(SceneError::SingularMatrix { determinant: det });
    }
    let r = 1.0 / det;
    Ok(Affine::new([
        d * r,
        -b * r,
        -c * r,
        a * r,
        (c * f - d * e) * r,
        (b * e - a * f) * r,
    ]))
}

/// Applies `m` to `p`.
#[inline]
#[must_use]
pub fn transform_point(m: Affine, p: Point) -> Point {
    m * p
}

/// Returns `m` with its translation removed.
#[inline]
#[must_use]
pub fn linear_part(m: Affine) -> Affine {
    let [a, b, c, d, _, _] = m.as_coeffs();
    Affine::new([a, b, c, d, 0.0, 0.0])
}

/// Returns `true` if every coefficient of `a` is within `epsilon` of `b`.
#[must_use]
pub fn approx_eq(a: Affine, b: Affine, epsilon: f64) -> bool {
    a.as_coeffs()
        .iter()
        .zip(b.as_coeffs().iter())
        .all(|(x, y)| numeric::approx_eq(*x, *y, epsilon))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    fn props(angle: f64, scale_x: f64, scale_y: f64) -> TransformProps {
        TransformProps {
            translate_x: 12.5,
            translate_y: -7.0,
            scale_x,
            scale_y,
            angle,
            ..TransformProps::IDENTITY
        }
    }

    fn assert_props_close(a: &TransformProps, b: &TransformProps) {
        assert!(numeric::approx_eq(a.translate_x, b.translate_x, EPS), "{a:?} vs {b:?}");
        assert!(numeric::approx_eq(a.translate_y, b.translate_y, EPS), "{a:?} vs {b:?}");
        assert!(numeric::approx_eq(a.scale_x, b.scale_x, EPS), "{a:?} vs {b:?}");
        assert!(numeric::approx_eq(a.scale_y, b.scale_y, EPS), "{a:?} vs {b:?}");
        assert!(numeric::approx_eq(a.skew_x, b.skew_x, EPS), "{a:?} vs {b:?}");
        assert!(numeric::approx_eq(a.angle, b.angle, EPS), "{a:?} vs {b:?}");
        assert_eq!(a.flip_y, b.flip_y, "{a:?} vs {b:?}");
    }

    #[test]
    fn identity_props_compose_to_identity() {
        assert_eq!(compose(&TransformProps::IDENTITY), Affine::IDENTITY);
    }

    #[test]
    fn decompose_inverts_compose_without_skew() {
        for &(angle, sx, sy) in &[
            (0.0, 1.0, 1.0),
            (30.0, 2.0, 0.5),
            (-45.0, 1.5, 3.0),
            (90.0, 1.0, 2.0),
            (135.0, 0.25, 4.0),
            (179.0, 10.0, 0.1),
        ] {
            let p = props(angle, sx, sy);
            assert_props_close(&decompose(compose(&p)), &p);
        }
    }

    #[test]
    fn skew_x_survives_round_trip() {
        let p = TransformProps {
            skew_x: 20.0,
            ..props(15.0, 2.0, 1.5)
        };
        assert_props_close(&decompose(compose(&p)), &p);
    }

    #[test]
    fn skew_y_is_folded_into_canonical_form() {
        let p = TransformProps {
            skew_y: 25.0,
            ..props(10.0, 1.0, 1.0)
        };
        let m = compose(&p);
        let d = decompose(m);
        assert_eq!(d.skew_y, 0.0);
        // The canonical form still reproduces the same matrix.
        assert!(approx_eq(compose(&d), m, 1e-9));
    }

    #[test]
    fn negative_determinant_becomes_flip_y() {
        let p = TransformProps {
            flip_x: true,
            ..props(20.0, 2.0, 3.0)
        };
        let m = compose(&p);
        let d = decompose(m);
        assert!(d.flip_y, "mirroring must be preserved as flip_y");
        assert!(!d.flip_x);
        assert!(d.scale_x >= 0.0 && d.scale_y >= 0.0);
        assert!(approx_eq(compose(&d), m, 1e-9));
    }

    #[test]
    fn scale_rotate_flip_maps_unit_x() {
        // compose = R(90) · diag(-2, 1). (1, 0) → (-2, 0) → rotated by +90°
        // (x, y) ↦ (-y, x) gives (0, -2).
        let p = TransformProps {
            scale_x: 2.0,
            angle: 90.0,
            flip_x: true,
            ..TransformProps::IDENTITY
        };
        let q = transform_point(compose(&p), Point::new(1.0, 0.0));
        assert!(numeric::approx_eq(q.x, 0.0, EPS), "{q:?}");
        assert!(numeric::approx_eq(q.y, -2.0, EPS), "{q:?}");
    }

    #[test]
    fn rotation_coefficients_follow_canvas_layout() {
        let m = compose(&TransformProps {
            angle: 90.0,
            scale_x: 3.0,
            ..TransformProps::IDENTITY
        });
        assert_eq!(m.as_coeffs(), [0.0, 3.0, -1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn double_inverse_is_identity_operation() {
        let m = compose(&TransformProps {
            skew_x: 12.0,
            ..props(33.0, 1.7, 0.4)
        });
        let back = invert(invert(m).unwrap()).unwrap();
        assert!(approx_eq(back, m, 1e-9));
    }

    #[test]
    fn inverse_undoes_transform() {
        let m = compose(&props(60.0, 2.0, 3.0));
        let p = Point::new(4.0, -9.0);
        let q = transform_point(invert(m).unwrap(), transform_point(m, p));
        assert!(numeric::approx_eq(p.x, q.x, 1e-9) && numeric::approx_eq(p.y, q.y, 1e-9));
    }

    #[test]
    fn singular_matrix_is_reported() {
        let m = compose(&props(10.0, 0.0, 1.0));
        assert!(matches!(
            invert(m),
            Err(SceneError::SingularMatrix { .. })
        ));
    }

    #[test]
    fn multiply_applies_right_operand_first() {
        let t = Affine::translate((10.0, 0.0));
        let s = Affine::scale(2.0);
        let p = transform_point(multiply(t, s), Point::new(1.0, 1.0));
        assert_eq!(p, Point::new(12.0, 2.0));
    }
}
