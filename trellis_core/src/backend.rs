// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Drawing contract for raster backends.
//!
//! The scene knows where things are; a [`Painter`] knows how to draw them.
//! A backend provides:
//!
//! - **Shape drawing**: paint one node's local box under a transform, either
//!   to the screen or into a cache surface.
//! - **Surfaces**: allocate and free offscreen bitmaps sized by the cache
//!   planner ([`CacheSize`]).
//! - **Blitting**: draw a cache surface to the screen under a transform.
//!
//! Shape-specific drawing (fills, strokes, text) lives entirely behind this
//! trait. Whatever the backend draws must stay inside the node's local box,
//! which is what bounding geometry and cache sizing assume.
//!
//! # Render loop pseudocode
//!
//! ```rust,ignore
//! fn on_frame(scene: &mut Scene, painter: &mut impl Painter) {
//!     let changes = scene.evaluate();
//!     let plan = scene.plan_caches();
//!     for &idx in scene.traversal_order() {
//!         // Cached nodes: repaint into the surface if invalid, commit, blit.
//!         // Everything else: paint directly under absolute_matrix_at(idx).
//!     }
//! }
//! ```

use kurbo::{Affine, Rect};

use crate::cache::CacheSize;
use crate::scene::NodeId;

/// Where a [`Painter::paint`] call draws.
#[derive(Debug)]
pub enum PaintTarget<'a, S> {
    /// The visible canvas.
    Screen,
    /// An offscreen cache surface.
    Cache(&'a mut S),
}

/// Draws nodes and manages cache surfaces for one backend.
pub trait Painter {
    /// Offscreen bitmap type.
    type Surface;

    /// Allocates a surface of `size.width × size.height` pixels.
    fn create_surface(&mut self, size: &CacheSize) -> Self::Surface;

    /// Frees a surface.
    fn release_surface(&mut self, surface: Self::Surface) {
        drop(surface);
    }

    /// Paints `node`, whose centered local box is `local_box`, under
    /// `transform`.
    fn paint(
        &mut self,
        target: PaintTarget<'_, Self::Surface>,
        node: NodeId,
        local_box: Rect,
        transform: Affine,
    );

    /// Draws a cache surface to the screen under `transform`, which maps
    /// surface pixels to canvas space.
    fn blit(&mut self, surface: &Self::Surface, transform: Affine, node: NodeId);
}
