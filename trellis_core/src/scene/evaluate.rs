// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame evaluation and change tracking.
//!
//! Matrices are resolved lazily on read, so evaluation is mostly a flush:
//!
//! 1. **TOPOLOGY**: Rebuild the traversal order if membership changed.
//! 2. **TRANSFORM**: Drain dirty indices, resolve every matrix that is not
//!    [`Clean`](super::MatrixState::Clean) in parent-before-child order, and
//!    recompute `effective_visible` as `parent_visible && visible`.
//! 3. **LAYOUT** / **CACHE**: Drain dirty indices. Layout already ran
//!    eagerly and caches were flipped at invalidation time; evaluation only
//!    reports them.
//!
//! [`FrameChanges`] uses raw slot indices (`u32`) rather than [`NodeId`]
//! handles so that renderers can index directly into the scene's SoA arrays
//! via the `*_at()` accessors (e.g.
//! [`absolute_matrix_at`](super::Scene::absolute_matrix_at)) without paying
//! for generation checks on every access.
//!
//! [`NodeId`]: super::NodeId

use alloc::vec::Vec;

use super::id::INVALID;
use super::store::Scene;
use super::transform::MatrixState;
use crate::dirty;
use crate::trace::EvaluateEvent;

/// The set of changes produced by a single [`Scene::evaluate`] call.
#[derive(Clone, Debug, Default)]
pub struct FrameChanges {
    /// Nodes whose own or inherited transform changed.
    pub transforms: Vec<u32>,
    /// Groups whose frame was recomputed by the layout manager.
    pub layouts: Vec<u32>,
    /// Nodes whose cache flipped from valid to invalid.
    pub cache_invalidated: Vec<u32>,
    /// Nodes that became effectively invisible.
    pub hidden: Vec<u32>,
    /// Nodes that became effectively visible again.
    pub shown: Vec<u32>,
    /// Nodes created since the last evaluate.
    pub added: Vec<u32>,
    /// Nodes destroyed since the last evaluate.
    pub removed: Vec<u32>,
    /// Whether the tree topology changed (traversal order was rebuilt).
    pub topology_changed: bool,
}

impl FrameChanges {
    /// Clears all change lists.
    pub fn clear(&mut self) {
        self.transforms.clear();
        self.layouts.clear();
        self.cache_invalidated.clear();
        self.hidden.clear();
        self.shown.clear();
        self.added.clear();
        self.removed.clear();
        self.topology_changed = false;
    }

    /// Returns `true` if nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
            && self.layouts.is_empty()
            && self.cache_invalidated.is_empty()
            && self.hidden.is_empty()
            && self.shown.is_empty()
            && self.added.is_empty()
            && self.removed.is_empty()
            && !self.topology_changed
    }
}

impl Scene {
    /// Evaluates the scene, resolving dirty matrices and returning the set of
    /// changes since the previous call.
    pub fn evaluate(&mut self) -> FrameChanges {
        let mut changes = FrameChanges::default();
        self.evaluate_into(&mut changes);
        changes
    }

    /// Like [`evaluate`](Self::evaluate), but reuses a caller-provided buffer
    /// to avoid allocation.
    pub fn evaluate_into(&mut self, changes: &mut FrameChanges) {
        changes.clear();
        self.frame_index += 1;

        if self.traversal_dirty {
            self.rebuild_traversal_order();
            changes.topology_changed = true;
            self.traversal_dirty = false;
        }

        changes.transforms = self
            .dirty
            .drain(dirty::TRANSFORM)
            .affected()
            .deterministic()
            .run()
            .filter(|idx| !self.free_list.contains(idx))
            .collect();

        let order = core::mem::take(&mut self.traversal_order);
        for &idx in &order {
            let i = idx as usize;
            if self.matrix_state[i] != MatrixState::Clean {
                // Nodes reachable from a root have acyclic parent chains.
                let _ = self.resolve_absolute(idx);
            }
            let p = self.parent[i];
            let parent_visible = p == INVALID || self.effective_visible[p as usize];
            let now = parent_visible && self.visible[i];
            if now != self.effective_visible[i] {
                if now {
                    changes.shown.push(idx);
                } else {
                    changes.hidden.push(idx);
                }
                self.effective_visible[i] = now;
            }
        }
        self.traversal_order = order;

        changes.layouts = self.dirty.drain(dirty::LAYOUT).deterministic().run().collect();
        changes.cache_invalidated = self.dirty.drain(dirty::CACHE).deterministic().run().collect();

        // Drain TOPOLOGY (the traversal order was already rebuilt above).
        let _: Vec<u32> = self.dirty.drain(dirty::TOPOLOGY).deterministic().run().collect();

        core::mem::swap(&mut self.pending_added, &mut changes.added);
        core::mem::swap(&mut self.pending_removed, &mut changes.removed);

        self.tracer.evaluate(&EvaluateEvent {
            frame_index: self.frame_index,
            transforms: count(&changes.transforms),
            layouts: count(&changes.layouts),
            cache_invalidations: count(&changes.cache_invalidated),
            topology_changed: changes.topology_changed,
        });
    }

    /// Returns the current traversal order (depth-first pre-order, roots in
    /// creation order, children back to front).
    ///
    /// Only valid after [`evaluate`](Self::evaluate) has been called at least
    /// once.
    #[must_use]
    pub fn traversal_order(&self) -> &[u32] {
        &self.traversal_order
    }

    /// Returns the number of completed evaluations.
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    fn rebuild_traversal_order(&mut self) {
        self.traversal_order.clear();
        for idx in 0..self.len {
            if self.parent[idx as usize] == INVALID && !self.free_list.contains(&idx) {
                let subtree = self.subtree(idx);
                self.traversal_order.extend(subtree);
            }
        }
    }
}

fn count(list: &[u32]) -> u32 {
    u32::try_from(list.len()).unwrap_or(u32::MAX)
}
