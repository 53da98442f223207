// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Corner points, bounding boxes, and hit testing.
//!
//! A node's local geometry is the box `[-w/2, w/2] × [-h/2, h/2]`, where `w`
//! and `h` include the stroke width. Corners are always derived from the
//! current absolute matrix; they are never stored.

use alloc::vec::Vec;

use kurbo::{Affine, Point, Rect, Vec2};

use super::id::{INVALID, NodeId, NodeKind};
use super::store::Scene;
use crate::error::Result;
use crate::matrix;
use crate::numeric::GEOMETRY_EPSILON;
use crate::props::{NodeOptions, Origin, PropertySet};

/// The four corners of a node's box in absolute space, plus its center.
///
/// Corners are listed clockwise from the top-left of the unrotated box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Corners {
    /// Top-left.
    pub tl: Point,
    /// Top-right.
    pub tr: Point,
    /// Bottom-right.
    pub br: Point,
    /// Bottom-left.
    pub bl: Point,
    /// Center.
    pub center: Point,
}

impl Corners {
    /// Maps the corners of `local` through `m`.
    #[must_use]
    pub fn from_box(m: Affine, local: Rect) -> Self {
        Self {
            tl: m * Point::new(local.x0, local.y0),
            tr: m * Point::new(local.x1, local.y0),
            br: m * Point::new(local.x1, local.y1),
            bl: m * Point::new(local.x0, local.y1),
            center: m * local.center(),
        }
    }

    /// The corner points, clockwise from top-left.
    #[must_use]
    pub fn points(&self) -> [Point; 4] {
        [self.tl, self.tr, self.br, self.bl]
    }

    /// Axis-aligned bounding box of the corners.
    #[must_use]
    pub fn bounding_box(&self) -> Rect {
        bounding_box(&self.points())
    }

    /// Returns `true` if `point` lies inside or on the quad.
    ///
    /// A quad with no area contains nothing.
    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        let pts = self.points();
        let mut positive = false;
        let mut negative = false;
        let mut area = 0.0;
        for i in 0..4 {
            let a = pts[i];
            let b = pts[(i + 1) % 4];
            area += a.to_vec2().cross(b.to_vec2());
            let side = (b - a).cross(point - a);
            if side > GEOMETRY_EPSILON {
                positive = true;
            } else if side < -GEOMETRY_EPSILON {
                negative = true;
            }
        }
        area.abs() > GEOMETRY_EPSILON && !(positive && negative)
    }

    /// Separating-axis test against an axis-aligned rectangle. Touching
    /// counts as intersecting.
    #[must_use]
    pub fn intersects(&self, rect: Rect) -> bool {
        let quad = self.points();
        let boxed = [
            Point::new(rect.x0, rect.y0),
            Point::new(rect.x1, rect.y0),
            Point::new(rect.x1, rect.y1),
            Point::new(rect.x0, rect.y1),
        ];
        let perp = |v: Vec2| Vec2::new(-v.y, v.x);
        let axes = [
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, 1.0),
            perp(quad[1] - quad[0]),
            perp(quad[3] - quad[0]),
        ];
        for axis in axes {
            if axis.hypot2() == 0.0 {
                continue;
            }
            let (a_min, a_max) = project(&quad, axis);
            let (b_min, b_max) = project(&boxed, axis);
            if a_max < b_min || b_max < a_min {
                return false;
            }
        }
        true
    }
}

fn project(points: &[Point; 4], axis: Vec2) -> (f64, f64) {
    points.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
        let d = p.to_vec2().dot(axis);
        (lo.min(d), hi.max(d))
    })
}

/// Axis-aligned bounding box of a point set.
///
/// Coincident points produce a zero-width or zero-height box, never an empty
/// result. An empty slice yields [`Rect::ZERO`].
#[must_use]
pub fn bounding_box(points: &[Point]) -> Rect {
    let Some(first) = points.first() else {
        return Rect::ZERO;
    };
    points
        .iter()
        .fold(Rect::from_points(*first, *first), |r, p| {
            Rect::new(r.x0.min(p.x), r.y0.min(p.y), r.x1.max(p.x), r.y1.max(p.y))
        })
}

impl Scene {
    /// Returns the node's centered local box.
    #[must_use]
    pub fn local_box(&self, id: NodeId) -> Rect {
        self.validate(id);
        self.local_box_at(id.idx)
    }

    /// Returns the centered local box at raw slot `idx`.
    #[must_use]
    pub fn local_box_at(&self, idx: u32) -> Rect {
        let half = self.box_size_at(idx).to_vec2() / 2.0;
        Rect::new(-half.x, -half.y, half.x, half.y)
    }

    /// Returns the node's absolute corners.
    ///
    /// # Errors
    ///
    /// [`SceneError::CyclicHierarchy`](crate::error::SceneError::CyclicHierarchy)
    /// if the parent chain loops.
    pub fn corners(&mut self, id: NodeId) -> Result<Corners> {
        self.validate(id);
        let m = self.resolve_absolute(id.idx)?;
        Ok(Corners::from_box(m, self.local_box_at(id.idx)))
    }

    /// Returns the corners at raw slot `idx` as of the last evaluation.
    #[must_use]
    pub fn corners_at(&self, idx: u32) -> Corners {
        Corners::from_box(self.absolute_matrix_at(idx), self.local_box_at(idx))
    }

    /// Returns the axis-aligned bounding box of the node's absolute corners.
    ///
    /// # Errors
    ///
    /// As for [`corners`](Self::corners).
    pub fn bounding_rect(&mut self, id: NodeId) -> Result<Rect> {
        Ok(self.corners(id)?.bounding_box())
    }

    /// Tests whether an absolute-space point lies in the node's box.
    ///
    /// The point is mapped into local space through the inverse absolute
    /// matrix and compared against the local box.
    ///
    /// # Errors
    ///
    /// [`SceneError::SingularMatrix`](crate::error::SceneError::SingularMatrix)
    /// if the node is collapsed to zero scale, or a cyclic-hierarchy error.
    pub fn contains_point(&mut self, id: NodeId, point: Point) -> Result<bool> {
        self.validate(id);
        let inverse = matrix::invert(self.resolve_absolute(id.idx)?)?;
        let local = matrix::transform_point(inverse, point);
        let b = self.local_box_at(id.idx);
        Ok(local.x >= b.x0 - GEOMETRY_EPSILON
            && local.x <= b.x1 + GEOMETRY_EPSILON
            && local.y >= b.y0 - GEOMETRY_EPSILON
            && local.y <= b.y1 + GEOMETRY_EPSILON)
    }

    /// Tests whether the node's absolute quad intersects `rect`.
    ///
    /// # Errors
    ///
    /// As for [`corners`](Self::corners).
    pub fn intersects_rect(&mut self, id: NodeId, rect: Rect) -> Result<bool> {
        Ok(self.corners(id)?.intersects(rect))
    }

    /// Tests whether all four absolute corners lie inside `rect`.
    ///
    /// # Errors
    ///
    /// As for [`corners`](Self::corners).
    pub fn is_contained_within(&mut self, id: NodeId, rect: Rect) -> Result<bool> {
        let corners = self.corners(id)?;
        Ok(corners.points().iter().all(|p| {
            p.x >= rect.x0 && p.x <= rect.x1 && p.y >= rect.y0 && p.y <= rect.y1
        }))
    }

    /// Returns the topmost visible node under `point`.
    ///
    /// With `deep == false` only root-level nodes are candidates. With
    /// `deep == true` groups are searched and the deepest hit child is
    /// returned; a group whose box contains the point but no child is hit
    /// returns the group itself. Collapsed nodes are never hit.
    ///
    /// # Errors
    ///
    /// As for [`corners`](Self::corners).
    pub fn find_target(&mut self, point: Point, deep: bool) -> Result<Option<NodeId>> {
        let roots: Vec<u32> = self.roots().iter().map(|r| r.idx).collect();
        for &root in roots.iter().rev() {
            if let Some(hit) = self.hit_subtree(root, point, deep)? {
                return Ok(Some(self.id_at(hit)));
            }
        }
        Ok(None)
    }

    fn hit_subtree(&mut self, idx: u32, point: Point, deep: bool) -> Result<Option<u32>> {
        if !self.visible[idx as usize] {
            return Ok(None);
        }
        if deep && self.kind[idx as usize] == NodeKind::Group {
            let mut child = self.last_child(idx);
            while child != INVALID {
                if let Some(hit) = self.hit_subtree(child, point, deep)? {
                    return Ok(Some(hit));
                }
                child = self.prev_sibling[child as usize];
            }
        }
        let m = self.resolve_absolute(idx)?;
        let hit = Corners::from_box(m, self.local_box_at(idx)).contains(point);
        Ok(hit.then_some(idx))
    }

    // -- Origin-relative positioning --

    /// Returns the node's center in its parent's space.
    #[must_use]
    pub fn center_point(&self, id: NodeId) -> Point {
        self.validate(id);
        self.center_at(id.idx)
    }

    /// Returns the parent-space position of the point selected by
    /// `(origin_x, origin_y)` within the node's box.
    #[must_use]
    pub fn point_by_origin(&self, id: NodeId, origin_x: Origin, origin_y: Origin) -> Point {
        self.validate(id);
        let idx = id.idx;
        self.center_at(idx) + self.origin_vector(idx, origin_x.offset(), origin_y.offset())
    }

    /// Moves the node so that the point selected by `(origin_x, origin_y)`
    /// lands on `point`, keeping its own origin. Returns the properties that
    /// changed.
    pub fn set_position_by_origin(
        &mut self,
        id: NodeId,
        point: Point,
        origin_x: Origin,
        origin_y: Origin,
    ) -> PropertySet {
        self.validate(id);
        let idx = id.idx;
        let center = point - self.origin_vector(idx, origin_x.offset(), origin_y.offset());
        let p = self.placement[idx as usize];
        let at = center + self.origin_vector(idx, p.origin_x.offset(), p.origin_y.offset());
        self.set(id, &NodeOptions::new().position(at.x, at.y))
    }
}
