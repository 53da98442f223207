// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Group layout: fixed frames and fit-content frames.
//!
//! A fit-content group's frame is the bounding box of its children in the
//! group's local space. When that box moves, every child is shifted by the
//! opposite amount and the group's center moves by the same amount in the
//! parent's space, so absolute placements of the children do not change.
//!
//! Layout runs eagerly whenever membership changes or a child's geometry
//! changes, and continues upward through fit-content ancestors until a frame
//! comes out unchanged. A group being laid out is in
//! [`LayoutState::Recomputing`]; reading its frame in that state is an error.

use kurbo::{Point, Rect, Size, Vec2};

use super::id::{INVALID, NodeId, NodeKind};
use super::store::Scene;
use crate::dirty;
use crate::error::{Result, SceneError};
use crate::numeric;
use crate::props::{PropertyName, PropertySet};
use crate::trace::LayoutEvent;

/// Properties that resize a node's box.
pub(crate) const RESIZE: PropertySet = PropertySet::EMPTY
    .with(PropertyName::Width)
    .with(PropertyName::Height)
    .with(PropertyName::StrokeWidth);

/// How a group's frame is determined.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LayoutMode {
    /// The frame is the bounding box of the children and is recomputed
    /// whenever they change.
    #[default]
    FitContent,
    /// The frame is set explicitly; children may extend past it.
    Fixed,
}

/// Whether a group is in the middle of a layout pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LayoutState {
    /// No layout pass is running.
    #[default]
    Idle,
    /// The group's frame is being recomputed.
    Recomputing,
}

/// A node's frame: the position of its origin point in the parent's space and
/// its intrinsic size.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Frame {
    /// Horizontal position of the origin point.
    pub left: f64,
    /// Vertical position of the origin point.
    pub top: f64,
    /// Intrinsic width.
    pub width: f64,
    /// Intrinsic height.
    pub height: f64,
}

impl Frame {
    /// Returns `true` if every field of `self` is within `epsilon` of `other`.
    #[must_use]
    pub fn approx_eq(&self, other: &Self, epsilon: f64) -> bool {
        numeric::approx_eq(self.left, other.left, epsilon)
            && numeric::approx_eq(self.top, other.top, epsilon)
            && numeric::approx_eq(self.width, other.width, epsilon)
            && numeric::approx_eq(self.height, other.height, epsilon)
    }
}

impl Scene {
    /// Returns the layout discipline of a node. Leaves report
    /// [`LayoutMode::Fixed`].
    #[must_use]
    pub fn layout_mode(&self, id: NodeId) -> LayoutMode {
        self.validate(id);
        self.layout_mode[id.idx as usize]
    }

    /// Returns whether a layout pass is running on the node.
    #[must_use]
    pub fn layout_state(&self, id: NodeId) -> LayoutState {
        self.validate(id);
        self.layout_state[id.idx as usize]
    }

    /// Switches a group's layout discipline. Switching to
    /// [`LayoutMode::FitContent`] lays the group out immediately.
    ///
    /// # Errors
    ///
    /// [`SceneError::NotAGroup`] if the node is a leaf.
    pub fn set_layout_mode(&mut self, id: NodeId, mode: LayoutMode) -> Result<()> {
        self.validate(id);
        let idx = id.idx;
        if self.kind[idx as usize] != NodeKind::Group {
            return Err(SceneError::NotAGroup { node: idx });
        }
        self.layout_mode[idx as usize] = mode;
        if mode == LayoutMode::FitContent {
            self.run_layout_chain(idx);
        }
        Ok(())
    }

    /// Lays out a group again. Fixed groups are left untouched.
    ///
    /// Repeating the request converges: a second pass finds nothing to move.
    ///
    /// # Errors
    ///
    /// - [`SceneError::NotAGroup`] if the node is a leaf.
    /// - [`SceneError::InvalidLayoutState`] if the group is already being
    ///   laid out.
    pub fn request_layout(&mut self, id: NodeId) -> Result<()> {
        self.validate(id);
        let idx = id.idx;
        if self.kind[idx as usize] != NodeKind::Group {
            return Err(SceneError::NotAGroup { node: idx });
        }
        if self.layout_state[idx as usize] == LayoutState::Recomputing {
            return Err(SceneError::InvalidLayoutState { group: idx });
        }
        self.run_layout_chain(idx);
        Ok(())
    }

    /// Returns the node's frame.
    ///
    /// # Errors
    ///
    /// [`SceneError::InvalidLayoutState`] if the node is a group in the middle
    /// of a layout pass.
    pub fn frame(&self, id: NodeId) -> Result<Frame> {
        self.validate(id);
        let idx = id.idx;
        if self.layout_state[idx as usize] == LayoutState::Recomputing {
            return Err(SceneError::InvalidLayoutState { group: idx });
        }
        Ok(self.frame_at(idx))
    }

    pub(crate) fn frame_at(&self, idx: u32) -> Frame {
        let p = &self.placement[idx as usize];
        let size = self.size[idx as usize];
        Frame {
            left: p.left,
            top: p.top,
            width: size.width,
            height: size.height,
        }
    }

    pub(crate) fn is_fit_content_group(&self, idx: u32) -> bool {
        self.kind[idx as usize] == NodeKind::Group
            && self.layout_mode[idx as usize] == LayoutMode::FitContent
    }

    /// Lays out `start` and then each fit-content ancestor whose child's frame
    /// changed.
    pub(crate) fn run_layout_chain(&mut self, start: u32) {
        let mut idx = start;
        while idx != INVALID {
            if !self.is_fit_content_group(idx)
                || self.layout_state[idx as usize] == LayoutState::Recomputing
            {
                break;
            }
            if !self.layout_group(idx) {
                break;
            }
            idx = self.parent[idx as usize];
        }
    }

    /// Recomputes the frame of a fit-content group. Returns whether it changed.
    fn layout_group(&mut self, g: u32) -> bool {
        let previous = self.frame_at(g);
        self.layout_state[g as usize] = LayoutState::Recomputing;

        let mut min = Point::new(f64::INFINITY, f64::INFINITY);
        let mut max = Point::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        let mut children = 0_u32;
        let mut child = self.first_child[g as usize];
        while child != INVALID {
            let own = self.resolve_own(child);
            let local = self.local_box_at(child);
            for corner in [
                Point::new(local.x0, local.y0),
                Point::new(local.x1, local.y0),
                Point::new(local.x1, local.y1),
                Point::new(local.x0, local.y1),
            ] {
                let p = own * corner;
                min = Point::new(min.x.min(p.x), min.y.min(p.y));
                max = Point::new(max.x.max(p.x), max.y.max(p.y));
            }
            children += 1;
            child = self.next_sibling[child as usize];
        }

        let (shift, extent) = if children == 0 {
            (Vec2::ZERO, Size::ZERO)
        } else {
            let bounds = Rect::from_points(min, max);
            (bounds.center().to_vec2(), bounds.size())
        };

        let new_center = self.resolve_own(g) * shift.to_point();
        if shift != Vec2::ZERO {
            let mut child = self.first_child[g as usize];
            while child != INVALID {
                let p = &mut self.placement[child as usize];
                p.left -= shift.x;
                p.top -= shift.y;
                self.mark_matrix_dirty(child);
                child = self.next_sibling[child as usize];
            }
        }

        let stroke = self.stroke_width[g as usize];
        self.size[g as usize] = Size::new(
            (extent.width - stroke).max(0.0),
            (extent.height - stroke).max(0.0),
        );
        self.set_center(g, new_center);
        self.mark_matrix_dirty(g);
        self.layout_state[g as usize] = LayoutState::Idle;

        let next = self.frame_at(g);
        self.tracer.layout(&LayoutEvent {
            group: g,
            children,
            previous_width: previous.width,
            previous_height: previous.height,
            width: next.width,
            height: next.height,
            shift_x: shift.x,
            shift_y: shift.y,
        });

        if next.approx_eq(&previous, numeric::GEOMETRY_EPSILON) {
            return false;
        }
        self.dirty.mark(g, dirty::LAYOUT);
        let id = self.id_at(g);
        self.observers.bounds_changed(id);
        let mut changed = PropertySet::single(PropertyName::Left).with(PropertyName::Top);
        if !numeric::approx_eq(next.width, previous.width, numeric::GEOMETRY_EPSILON) {
            changed.insert(PropertyName::Width);
        }
        if !numeric::approx_eq(next.height, previous.height, numeric::GEOMETRY_EPSILON) {
            changed.insert(PropertyName::Height);
        }
        let _ = self.invalidate_for_change(g, changed);
        true
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;
    use crate::props::{NodeOptions, Origin};
    use crate::scene::Corners;

    const EPS: f64 = 1e-9;

    fn square(scene: &mut Scene, left: f64, top: f64) -> NodeId {
        scene.create_leaf(&NodeOptions::new().position(left, top).size(100.0, 100.0))
    }

    fn assert_frame(actual: Frame, left: f64, top: f64, width: f64, height: f64) {
        let expected = Frame {
            left,
            top,
            width,
            height,
        };
        assert!(actual.approx_eq(&expected, EPS), "{actual:?} != {expected:?}");
    }

    fn assert_corners_eq(a: &Corners, b: &Corners) {
        for (p, q) in a.points().iter().zip(b.points().iter()) {
            assert!((*p - *q).hypot() < 1e-6, "{a:?} != {b:?}");
        }
    }

    #[test]
    fn fit_content_wraps_two_squares() {
        let mut scene = Scene::new();
        let group = scene.create_group(LayoutMode::FitContent, &NodeOptions::new());
        let a = square(&mut scene, 0.0, 0.0);
        let b = square(&mut scene, 100.0, 0.0);
        scene.add_child(group, a).unwrap();
        scene.add_child(group, b).unwrap();
        assert_frame(scene.frame(group).unwrap(), 0.0, 0.0, 200.0, 100.0);

        let before = scene.corners(a).unwrap();
        scene.remove_child(b).unwrap();
        assert_frame(scene.frame(group).unwrap(), 0.0, 0.0, 100.0, 100.0);
        assert_corners_eq(&scene.corners(a).unwrap(), &before);

        // The removed square stays where it was drawn.
        assert_frame(scene.frame(b).unwrap(), 100.0, 0.0, 100.0, 100.0);
    }

    #[test]
    fn layout_is_invisible_to_children() {
        let mut scene = Scene::new();
        let group = scene.create_group(
            LayoutMode::FitContent,
            &NodeOptions::new().position(40.0, -10.0).angle(30.0).scale(1.5, 0.5),
        );
        let leaves: Vec<NodeId> = [(0.0, 0.0, 0.0), (120.0, 30.0, 45.0), (-50.0, 80.0, -20.0)]
            .iter()
            .map(|&(x, y, angle)| {
                scene.create_leaf(
                    &NodeOptions::new()
                        .position(x, y)
                        .size(60.0, 20.0)
                        .angle(angle)
                        .origin(Origin::Center, Origin::End),
                )
            })
            .collect();
        for &leaf in &leaves {
            let before = scene.corners(leaf).unwrap();
            scene.add_child(group, leaf).unwrap();
            assert_corners_eq(&scene.corners(leaf).unwrap(), &before);
        }
        let snapshot: Vec<Corners> = leaves.iter().map(|&l| scene.corners(l).unwrap()).collect();
        scene.remove_child(leaves[1]).unwrap();
        assert_corners_eq(&scene.corners(leaves[0]).unwrap(), &snapshot[0]);
        assert_corners_eq(&scene.corners(leaves[2]).unwrap(), &snapshot[2]);
        assert_corners_eq(&scene.corners(leaves[1]).unwrap(), &snapshot[1]);
    }

    #[test]
    fn child_geometry_change_relayouts_parent() {
        let mut scene = Scene::new();
        let group = scene.create_group(LayoutMode::FitContent, &NodeOptions::new());
        let a = square(&mut scene, 0.0, 0.0);
        scene.add_child(group, a).unwrap();
        let _ = scene.set(a, &NodeOptions::new().size(300.0, 100.0));
        let frame = scene.frame(group).unwrap();
        assert!(numeric::approx_eq(frame.width, 300.0, EPS), "{frame:?}");
    }

    #[test]
    fn nested_groups_propagate_upward() {
        let mut scene = Scene::new();
        let outer = scene.create_group(LayoutMode::FitContent, &NodeOptions::new());
        let inner = scene.create_group(LayoutMode::FitContent, &NodeOptions::new());
        let a = square(&mut scene, 0.0, 0.0);
        scene.add_child(inner, a).unwrap();
        scene.add_child(outer, inner).unwrap();
        let _ = scene.set(a, &NodeOptions::new().size(100.0, 250.0));
        let inner_frame = scene.frame(inner).unwrap();
        assert!(numeric::approx_eq(inner_frame.height, 250.0, EPS), "{inner_frame:?}");
        // The square grew downward from its top-left origin, so the outer
        // frame keeps its position.
        assert_frame(scene.frame(outer).unwrap(), 0.0, 0.0, 100.0, 250.0);
    }

    #[test]
    fn fixed_group_keeps_its_frame() {
        let mut scene = Scene::new();
        let group = scene.create_group(LayoutMode::Fixed, &NodeOptions::new().size(10.0, 10.0));
        let a = square(&mut scene, 500.0, 500.0);
        scene.add_child(group, a).unwrap();
        assert_frame(scene.frame(group).unwrap(), 0.0, 0.0, 10.0, 10.0);
        scene.set_layout_mode(group, LayoutMode::FitContent).unwrap();
        assert_frame(scene.frame(group).unwrap(), 500.0, 500.0, 100.0, 100.0);
    }

    #[test]
    fn last_child_removed_leaves_zero_size_group() {
        let mut scene = Scene::new();
        let group = scene.create_group(LayoutMode::FitContent, &NodeOptions::new());
        let a = square(&mut scene, 20.0, 30.0);
        scene.add_child(group, a).unwrap();
        scene.remove_child(a).unwrap();
        let frame = scene.frame(group).unwrap();
        assert_eq!((frame.width, frame.height), (0.0, 0.0));
        // The center is kept: the empty group sits where its content was.
        assert!(numeric::approx_eq(frame.left, 70.0, EPS), "{frame:?}");
        assert!(numeric::approx_eq(frame.top, 80.0, EPS), "{frame:?}");
    }

    #[test]
    fn zero_area_child_still_contributes() {
        let mut scene = Scene::new();
        let group = scene.create_group(LayoutMode::FitContent, &NodeOptions::new());
        let a = square(&mut scene, 0.0, 0.0);
        let line = scene.create_leaf(&NodeOptions::new().position(300.0, 50.0).size(0.0, 0.0));
        scene.add_child(group, a).unwrap();
        scene.add_child(group, line).unwrap();
        assert_frame(scene.frame(group).unwrap(), 0.0, 0.0, 300.0, 100.0);
    }

    #[test]
    fn request_layout_is_idempotent() {
        let mut scene = Scene::new();
        let group = scene.create_group(LayoutMode::FitContent, &NodeOptions::new());
        let a = square(&mut scene, 10.0, 10.0);
        scene.add_child(group, a).unwrap();
        let first = scene.frame(group).unwrap();
        scene.request_layout(group).unwrap();
        scene.request_layout(group).unwrap();
        assert_eq!(scene.frame(group).unwrap(), first);
        assert_eq!(
            scene.request_layout(a),
            Err(SceneError::NotAGroup { node: a.idx })
        );
    }

    #[test]
    fn frame_query_during_recompute_is_rejected() {
        let mut scene = Scene::new();
        let group = scene.create_group(LayoutMode::FitContent, &NodeOptions::new());
        scene.layout_state[group.idx as usize] = LayoutState::Recomputing;
        assert_eq!(
            scene.frame(group),
            Err(SceneError::InvalidLayoutState { group: group.idx })
        );
        assert_eq!(
            scene.request_layout(group),
            Err(SceneError::InvalidLayoutState { group: group.idx })
        );
    }
}
