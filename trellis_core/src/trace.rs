// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for scene updates.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! scene calls as it lays out groups, invalidates and sizes caches, and
//! evaluates frames. All method bodies default to no-ops, so implementing
//! only the events you care about is fine.
//!
//! [`Tracer`] owns an optional boxed sink and is stored in the
//! [`Scene`](crate::scene::Scene). When the `trace` feature is **off**, every
//! `Tracer` method compiles to nothing (zero overhead). When **on**, each
//! method performs a single `Option` branch before dispatching.
//!
//! # Crate features
//!
//! - `trace`: enables the `Tracer` method bodies (one branch per call).

use alloc::boxed::Box;

use crate::props::PropertySet;

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when the layout manager recomputes a group's frame.
#[derive(Clone, Copy, Debug)]
pub struct LayoutEvent {
    /// Slot index of the group.
    pub group: u32,
    /// Number of children measured.
    pub children: u32,
    /// Frame width before recomputation.
    pub previous_width: f64,
    /// Frame height before recomputation.
    pub previous_height: f64,
    /// Frame width after recomputation.
    pub width: f64,
    /// Frame height after recomputation.
    pub height: f64,
    /// Horizontal offset subtracted from every child, in group-local units.
    pub shift_x: f64,
    /// Vertical offset subtracted from every child, in group-local units.
    pub shift_y: f64,
}

/// Emitted when a node's cache flips from valid to invalid.
#[derive(Clone, Copy, Debug)]
pub struct CacheInvalidatedEvent {
    /// Slot index of the node.
    pub node: u32,
    /// The cache-affecting properties that changed.
    pub changed: PropertySet,
}

/// Emitted after cache sizes are planned against the budget.
#[derive(Clone, Copy, Debug)]
pub struct CachePlanEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Number of nodes that keep their own cache.
    pub caching_nodes: u32,
    /// Summed side-capped natural area.
    pub requested_area: u64,
    /// Configured budget.
    pub max_total_area: u64,
    /// Per-side scale factor applied (`1.0` within budget).
    pub side_factor: f64,
}

/// Emitted when a redrawn bitmap is committed against the budget.
#[derive(Clone, Copy, Debug)]
pub struct CacheCommitEvent {
    /// Slot index of the node.
    pub node: u32,
    /// Bitmap width in pixels.
    pub width: u32,
    /// Bitmap height in pixels.
    pub height: u32,
    /// Summed committed area after this commit.
    pub allocated_area: u64,
}

/// Emitted when a bitmap is released.
#[derive(Clone, Copy, Debug)]
pub struct CacheReleaseEvent {
    /// Slot index of the node.
    pub node: u32,
    /// Area returned to the budget.
    pub area: u64,
    /// Summed committed area after the release.
    pub allocated_area: u64,
}

/// Emitted at the end of [`Scene::evaluate`](crate::scene::Scene::evaluate).
#[derive(Clone, Copy, Debug)]
pub struct EvaluateEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Nodes whose absolute matrix was resolved.
    pub transforms: u32,
    /// Groups whose frame was recomputed since the last evaluation.
    pub layouts: u32,
    /// Caches invalidated since the last evaluation.
    pub cache_invalidations: u32,
    /// Whether the traversal order was rebuilt.
    pub topology_changed: bool,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the scene.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called after a group's frame is recomputed.
    fn on_layout(&mut self, e: &LayoutEvent) {
        _ = e;
    }

    /// Called when a cache flips to invalid.
    fn on_cache_invalidated(&mut self, e: &CacheInvalidatedEvent) {
        _ = e;
    }

    /// Called after cache sizes are planned.
    fn on_cache_plan(&mut self, e: &CachePlanEvent) {
        _ = e;
    }

    /// Called when a bitmap is committed.
    fn on_cache_commit(&mut self, e: &CacheCommitEvent) {
        _ = e;
    }

    /// Called when a bitmap is released.
    fn on_cache_release(&mut self, e: &CacheReleaseEvent) {
        _ = e;
    }

    /// Called at the end of each frame evaluation.
    fn on_evaluate(&mut self, e: &EvaluateEvent) {
        _ = e;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin owner of an optional boxed [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing and
/// installed sinks are dropped immediately.
#[derive(Default)]
pub struct Tracer {
    #[cfg(feature = "trace")]
    sink: Option<Box<dyn TraceSink>>,
}

impl core::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl Tracer {
    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Installs `sink`, returning the previous one.
    pub fn set_sink(&mut self, sink: Box<dyn TraceSink>) -> Option<Box<dyn TraceSink>> {
        #[cfg(feature = "trace")]
        {
            self.sink.replace(sink)
        }
        #[cfg(not(feature = "trace"))]
        {
            drop(sink);
            None
        }
    }

    /// Removes and returns the installed sink.
    pub fn take_sink(&mut self) -> Option<Box<dyn TraceSink>> {
        #[cfg(feature = "trace")]
        {
            self.sink.take()
        }
        #[cfg(not(feature = "trace"))]
        {
            None
        }
    }

    /// Emits a [`LayoutEvent`].
    #[inline]
    pub fn layout(&mut self, e: &LayoutEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_layout(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`CacheInvalidatedEvent`].
    #[inline]
    pub fn cache_invalidated(&mut self, e: &CacheInvalidatedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_cache_invalidated(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`CachePlanEvent`].
    #[inline]
    pub fn cache_plan(&mut self, e: &CachePlanEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_cache_plan(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`CacheCommitEvent`].
    #[inline]
    pub fn cache_commit(&mut self, e: &CacheCommitEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_cache_commit(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`CacheReleaseEvent`].
    #[inline]
    pub fn cache_release(&mut self, e: &CacheReleaseEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_cache_release(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits an [`EvaluateEvent`].
    #[inline]
    pub fn evaluate(&mut self, e: &EvaluateEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_evaluate(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }
}
