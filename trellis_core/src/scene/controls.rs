// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Resize and rotate handles around a selected node.
//!
//! Handles follow the node's corner quad in absolute space. Padding and the
//! rotation-handle offset are screen-space distances: they are applied along
//! the quad's edge directions and do not scale with the node.

use kurbo::{Point, Vec2};

use super::geometry::Corners;
use super::id::NodeId;
use super::store::Scene;
use crate::error::Result;
use crate::numeric;

/// One of the nine manipulation handles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Control {
    /// Top-left corner.
    TopLeft,
    /// Middle of the top edge.
    MiddleTop,
    /// Top-right corner.
    TopRight,
    /// Middle of the right edge.
    MiddleRight,
    /// Bottom-right corner.
    BottomRight,
    /// Middle of the bottom edge.
    MiddleBottom,
    /// Bottom-left corner.
    BottomLeft,
    /// Middle of the left edge.
    MiddleLeft,
    /// Rotation handle above the top edge.
    Rotate,
}

impl Control {
    /// All handles, clockwise from the top-left, rotation handle last.
    pub const ALL: [Self; 9] = [
        Self::TopLeft,
        Self::MiddleTop,
        Self::TopRight,
        Self::MiddleRight,
        Self::BottomRight,
        Self::MiddleBottom,
        Self::BottomLeft,
        Self::MiddleLeft,
        Self::Rotate,
    ];

    /// Handles in hit-test priority order: rotation, corners, then edges.
    const HIT_ORDER: [Self; 9] = [
        Self::Rotate,
        Self::TopLeft,
        Self::TopRight,
        Self::BottomRight,
        Self::BottomLeft,
        Self::MiddleTop,
        Self::MiddleRight,
        Self::MiddleBottom,
        Self::MiddleLeft,
    ];

    /// Short key (`tl`, `mt`, ..., `mtr`).
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::TopLeft => "tl",
            Self::MiddleTop => "mt",
            Self::TopRight => "tr",
            Self::MiddleRight => "mr",
            Self::BottomRight => "br",
            Self::MiddleBottom => "mb",
            Self::BottomLeft => "bl",
            Self::MiddleLeft => "ml",
            Self::Rotate => "mtr",
        }
    }

    /// Parses a short key.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.key() == key)
    }
}

/// Handle sizing, in screen pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ControlConfig {
    /// Side of each square handle.
    pub corner_size: f64,
    /// Distance of the rotation handle above the top edge.
    pub rotation_offset: f64,
    /// Gap between the node's quad and the handle frame.
    pub padding: f64,
}

impl ControlConfig {
    /// The default handle sizing.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            corner_size: 13.0,
            rotation_offset: 40.0,
            padding: 0.0,
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Returns the absolute position of every handle, in [`Control::ALL`]
    /// order.
    ///
    /// # Errors
    ///
    /// [`SceneError::CyclicHierarchy`](crate::error::SceneError::CyclicHierarchy)
    /// if the parent chain loops.
    pub fn control_coords(
        &mut self,
        id: NodeId,
        config: &ControlConfig,
    ) -> Result<[(Control, Point); 9]> {
        let corners = self.corners(id)?;
        Ok(handle_points(&corners, config))
    }

    /// Returns the handle under `point`, if any.
    ///
    /// Each handle is a `corner_size` square centered on its position and
    /// aligned with the node's top edge.
    ///
    /// # Errors
    ///
    /// [`SceneError::CyclicHierarchy`](crate::error::SceneError::CyclicHierarchy)
    /// if the parent chain loops.
    pub fn control_at(
        &mut self,
        id: NodeId,
        point: Point,
        config: &ControlConfig,
    ) -> Result<Option<Control>> {
        let corners = self.corners(id)?;
        let coords = handle_points(&corners, config);
        let (ux, _) = edge_axes(&corners);
        let normal = Vec2::new(-ux.y, ux.x);
        let half = config.corner_size / 2.0;
        let hit = Control::HIT_ORDER.into_iter().find(|control| {
            let center = coords[*control as usize].1;
            let d = point - center;
            d.dot(ux).abs() <= half && d.dot(normal).abs() <= half
        });
        Ok(hit)
    }
}

/// Unit vectors along the top edge and the left edge of the quad.
///
/// Collapsed edges fall back to the screen axes, or to the perpendicular of
/// the other edge.
fn edge_axes(corners: &Corners) -> (Vec2, Vec2) {
    let unit = |v: Vec2| {
        let len = numeric::length(v.x, v.y);
        (len > numeric::GEOMETRY_EPSILON).then(|| v / len)
    };
    let ux = unit(corners.tr - corners.tl);
    let uy = unit(corners.bl - corners.tl);
    match (ux, uy) {
        (Some(ux), Some(uy)) => (ux, uy),
        (Some(ux), None) => (ux, Vec2::new(-ux.y, ux.x)),
        (None, Some(uy)) => (Vec2::new(uy.y, -uy.x), uy),
        (None, None) => (Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0)),
    }
}

fn handle_points(corners: &Corners, config: &ControlConfig) -> [(Control, Point); 9] {
    let (ux, uy) = edge_axes(corners);
    let p = config.padding;
    let tl = corners.tl - ux * p - uy * p;
    let tr = corners.tr + ux * p - uy * p;
    let br = corners.br + ux * p + uy * p;
    let bl = corners.bl - ux * p + uy * p;
    let mt = tl.midpoint(tr);
    [
        (Control::TopLeft, tl),
        (Control::MiddleTop, mt),
        (Control::TopRight, tr),
        (Control::MiddleRight, tr.midpoint(br)),
        (Control::BottomRight, br),
        (Control::MiddleBottom, br.midpoint(bl)),
        (Control::BottomLeft, bl),
        (Control::MiddleLeft, bl.midpoint(tl)),
        (Control::Rotate, mt - uy * config.rotation_offset),
    ]
}
