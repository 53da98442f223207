// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render plan: an ordered record of what was drawn in one frame.

use alloc::vec::Vec;

use kurbo::Affine;
use trellis_core::cache::CacheSize;

/// How a render item reached the screen.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ItemSource {
    /// The node was painted straight to the screen.
    Direct,
    /// The node's cache surface was blitted.
    Cache {
        /// Surface size used this frame.
        size: CacheSize,
        /// Whether the surface was repainted before blitting.
        redrawn: bool,
    },
}

/// A single draw on the screen.
///
/// Items are produced in back-to-front order, matching the scene's traversal
/// order. Nodes painted into an ancestor's cache produce no item.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderItem {
    /// Raw slot index of the node.
    pub node: u32,
    /// Transform the draw was issued with: the absolute matrix for direct
    /// draws, the blit transform for cached ones.
    pub transform: Affine,
    /// Direct draw or cache blit.
    pub source: ItemSource,
}

/// The draws of one frame.
#[derive(Clone, Debug, Default)]
pub struct RenderPlan {
    /// Scene frame index the plan was produced for.
    pub frame_index: u64,
    /// Draw items in back-to-front order.
    pub items: Vec<RenderItem>,
}

impl RenderPlan {
    /// Clears the plan for reuse.
    pub fn clear(&mut self) {
        self.frame_index = 0;
        self.items.clear();
    }

    /// Number of cache surfaces repainted this frame.
    #[must_use]
    pub fn redrawn_caches(&self) -> usize {
        self.items
            .iter()
            .filter(|item| matches!(item.source, ItemSource::Cache { redrawn: true, .. }))
            .count()
    }
}
