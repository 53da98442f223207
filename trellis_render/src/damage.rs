// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Spatial damage tracking for partial re-rendering.

use alloc::vec::Vec;

use kurbo::Rect;

/// Outset applied to zero-width or zero-height rectangles.
const DEGENERATE_OUTSET: f64 = 1.0;

/// A region of the canvas that needs re-rendering.
///
/// Backends can use this to redraw only the areas that changed since the
/// last frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum DamageRegion {
    /// The entire canvas needs redrawing.
    #[default]
    Full,
    /// Axis-aligned rectangles in canvas space that need redrawing.
    Rects(Vec<Rect>),
    /// Nothing changed; the previous frame can be reused.
    None,
}

impl DamageRegion {
    /// Returns `true` if no region needs redrawing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Adds one rectangle.
    ///
    /// A rectangle collapsed to a line or a point is outset by one pixel so
    /// its antialiased edge is still redrawn. Non-finite rectangles are
    /// ignored.
    pub fn add_rect(&mut self, rect: Rect) {
        if !rect.is_finite() {
            return;
        }
        let rect = rect.abs();
        let rect = if rect.width() <= 0.0 || rect.height() <= 0.0 {
            rect.inflate(DEGENERATE_OUTSET, DEGENERATE_OUTSET)
        } else {
            rect
        };
        match self {
            Self::Full => {}
            Self::Rects(rects) => rects.push(rect),
            Self::None => *self = Self::Rects(alloc::vec![rect]),
        }
    }

    /// Merges another damage region into this one.
    pub fn merge(&mut self, other: &Self) {
        match (&*self, other) {
            (Self::Full, _) | (_, Self::Full) => *self = Self::Full,
            (Self::None, _) => *self = other.clone(),
            (_, Self::None) => {}
            (Self::Rects(a), Self::Rects(b)) => {
                let mut merged = a.clone();
                merged.extend_from_slice(b);
                *self = Self::Rects(merged);
            }
        }
    }

    /// Returns the smallest rectangle covering the damage, or `None` if the
    /// region is empty or unbounded.
    #[must_use]
    pub fn bounds(&self) -> Option<Rect> {
        match self {
            Self::Rects(rects) => rects.iter().copied().reduce(|a, b| a.union(b)),
            Self::Full | Self::None => None,
        }
    }
}
