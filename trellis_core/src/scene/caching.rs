// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-node render-cache bookkeeping.
//!
//! A node keeps its own cache when caching is enabled for it and no ancestor
//! keeps one: nested content is drawn into the outermost caching ancestor's
//! bitmap. Each cache carries a validity flag, a content revision, and the
//! key of the committed bitmap.
//!
//! Invalidation flips the flag at most once per redraw. Position, rotation,
//! and scale are applied when the bitmap is drawn and do not invalidate by
//! default; scale still reaches the cache through its effective resolution,
//! which is part of the key checked by [`Scene::plan_caches`].

use alloc::vec::Vec;

use super::id::{INVALID, NodeId};
use super::store::Scene;
use crate::cache::{CacheKey, CacheSize, CacheStats};
use crate::dirty;
use crate::matrix;
use crate::props::{PropertyName, PropertySet};
use crate::trace::{CacheCommitEvent, CacheInvalidatedEvent, CachePlanEvent, CacheReleaseEvent};

/// A snapshot of one node's cache bookkeeping.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CacheStatus {
    /// Caching is enabled for the node.
    pub enabled: bool,
    /// The node keeps its own cache (enabled and no caching ancestor).
    pub caching: bool,
    /// The committed bitmap matches the current content.
    pub valid: bool,
    /// Content revision.
    pub revision: u64,
    /// Size chosen by the last plan, if the node is cached this frame.
    pub target: Option<CacheSize>,
    /// Size of the committed bitmap, if any.
    pub allocated: Option<CacheSize>,
    /// Frame index at which the bitmap was last redrawn.
    pub valid_since: Option<u64>,
}

/// Result of [`Scene::plan_caches`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CachePlan {
    /// Slots that keep a cache this frame, in traversal order.
    pub nodes: Vec<u32>,
    /// Slots whose key changed (size or zoom) and were invalidated.
    pub invalidated: Vec<u32>,
    /// Summed side-capped natural area.
    pub requested_area: u64,
    /// Per-side factor applied to every cache.
    pub side_factor: f64,
}

impl Scene {
    /// Returns whether caching is enabled for the node.
    #[must_use]
    pub fn object_caching(&self, id: NodeId) -> bool {
        self.validate(id);
        self.cache[id.idx as usize].enabled
    }

    /// Enables or disables the node's own cache. Disabling releases the
    /// bitmap's share of the budget.
    pub fn set_object_caching(&mut self, id: NodeId, enabled: bool) {
        self.validate(id);
        self.set_caching_enabled(id.idx, enabled);
    }

    pub(crate) fn set_caching_enabled(&mut self, idx: u32, enabled: bool) {
        let entry = &mut self.cache[idx as usize];
        if entry.enabled == enabled {
            return;
        }
        entry.enabled = enabled;
        if !enabled {
            entry.target = None;
            let _ = self.release_cache_at(idx);
        }
    }

    /// Returns the node's declared cache-affecting properties.
    #[must_use]
    pub fn cache_properties(&self, id: NodeId) -> PropertySet {
        self.validate(id);
        self.cache[id.idx as usize].properties
    }

    /// Replaces the node's declared cache-affecting properties.
    pub fn set_cache_properties(&mut self, id: NodeId, properties: PropertySet) {
        self.validate(id);
        self.cache[id.idx as usize].properties = properties;
    }

    /// Reports a change of properties owned by the drawing collaborator
    /// (fill, stroke, content, ...).
    ///
    /// The node's cache is invalidated when `changed` meets its declared
    /// cache-affecting set, and caching ancestors are invalidated for any
    /// change. Returns whether any cache flipped from valid to invalid.
    pub fn mark_cache_dirty(&mut self, id: NodeId, changed: PropertySet) -> bool {
        self.validate(id);
        self.invalidate_for_change(id.idx, changed)
    }

    /// Returns the node's cache bookkeeping.
    #[must_use]
    pub fn cache_status(&self, id: NodeId) -> CacheStatus {
        self.validate(id);
        let idx = id.idx;
        let entry = &self.cache[idx as usize];
        CacheStatus {
            enabled: entry.enabled,
            caching: self.should_cache_at(idx),
            valid: entry.valid,
            revision: entry.revision,
            target: entry.target,
            allocated: entry.allocated,
            valid_since: entry.valid_since,
        }
    }

    /// Returns whether the node's cached bitmap is valid.
    #[must_use]
    pub fn is_cache_valid(&self, id: NodeId) -> bool {
        self.validate(id);
        self.cache[id.idx as usize].valid
    }

    /// Returns the current viewport zoom.
    #[must_use]
    pub fn viewport_zoom(&self) -> f64 {
        self.viewport_zoom
    }

    /// Sets the viewport zoom. Caches are re-sized at the next
    /// [`plan_caches`](Self::plan_caches); those whose key changes are
    /// invalidated then.
    pub fn set_viewport_zoom(&mut self, zoom: f64) {
        self.viewport_zoom = zoom;
    }

    /// Returns the budget counters.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.budget.stats()
    }

    /// Clears the budget and forgets every committed bitmap, so every cache
    /// is redrawn on the next render pass.
    pub fn reset_cache_budget(&mut self) {
        self.budget.reset();
        for entry in &mut self.cache {
            entry.valid = false;
            entry.key = None;
            entry.allocated = None;
            entry.valid_since = None;
        }
    }

    /// Chooses a bitmap size for every visible caching node and fits the sum
    /// into the area budget.
    ///
    /// Reads matrices as of the last [`evaluate`](Self::evaluate).
    pub fn plan_caches(&mut self) -> CachePlan {
        let zoom = self.viewport_zoom;
        let order = core::mem::take(&mut self.traversal_order);
        let mut capped: Vec<(u32, CacheSize)> = Vec::new();
        for &idx in &order {
            self.cache[idx as usize].target = None;
            if !self.effective_visible[idx as usize] || !self.should_cache_at(idx) {
                continue;
            }
            let scale = matrix::decompose(self.absolute_matrix[idx as usize]);
            let size = self.box_size_at(idx);
            let natural = self.budget.natural_size(
                size.width,
                size.height,
                scale.scale_x * zoom,
                scale.scale_y * zoom,
            );
            capped.push((idx, self.budget.cap_side(natural)));
        }
        self.traversal_order = order;

        let requested_area = capped.iter().map(|(_, s)| s.area()).sum();
        let side_factor = self.budget.plan(requested_area);
        let mut plan = CachePlan {
            requested_area,
            side_factor,
            ..CachePlan::default()
        };
        for (idx, size) in capped {
            let target = self.budget.fit(size);
            if target.is_empty() {
                continue;
            }
            let entry = &self.cache[idx as usize];
            if entry.valid && entry.key != Some(CacheKey::new(&target, entry.revision)) {
                let _ = self.invalidate_cache(idx, PropertySet::EMPTY);
                plan.invalidated.push(idx);
            }
            self.cache[idx as usize].target = Some(target);
            plan.nodes.push(idx);
        }

        self.tracer.cache_plan(&CachePlanEvent {
            frame_index: self.frame_index,
            caching_nodes: u32::try_from(plan.nodes.len()).unwrap_or(u32::MAX),
            requested_area,
            max_total_area: self.budget.config().max_total_area,
            side_factor,
        });
        plan
    }

    /// Returns the size chosen by the last plan at raw slot `idx`.
    #[must_use]
    pub fn cache_target_at(&self, idx: u32) -> Option<CacheSize> {
        self.cache[idx as usize].target
    }

    /// Returns whether the cache at raw slot `idx` is valid.
    #[must_use]
    pub fn cache_valid_at(&self, idx: u32) -> bool {
        self.cache[idx as usize].valid
    }

    /// Records that the bitmap at raw slot `idx` was redrawn at its planned
    /// size, swapping its budget share and marking it valid.
    ///
    /// Returns `None` (and changes nothing) if the slot has no planned size.
    pub fn commit_cache_at(&mut self, idx: u32) -> Option<CacheSize> {
        let entry = &mut self.cache[idx as usize];
        let target = entry.target?;
        self.budget.commit(entry.allocated.as_ref(), &target);
        entry.allocated = Some(target);
        entry.key = Some(CacheKey::new(&target, entry.revision));
        entry.valid = true;
        entry.valid_since = Some(self.frame_index);
        self.tracer.cache_commit(&CacheCommitEvent {
            node: idx,
            width: target.width,
            height: target.height,
            allocated_area: self.budget.stats().allocated_area,
        });
        Some(target)
    }

    /// Records that the node's bitmap was redrawn. See
    /// [`commit_cache_at`](Self::commit_cache_at).
    pub fn commit_cache(&mut self, id: NodeId) -> Option<CacheSize> {
        self.validate(id);
        self.commit_cache_at(id.idx)
    }

    /// Releases the bitmap at raw slot `idx`, returning its area to the
    /// budget. Returns the released size, or `None` if nothing was committed.
    pub fn release_cache_at(&mut self, idx: u32) -> Option<CacheSize> {
        let entry = &mut self.cache[idx as usize];
        let previous = entry.allocated.take()?;
        entry.valid = false;
        entry.key = None;
        entry.valid_since = None;
        self.budget.release(&previous);
        self.tracer.cache_release(&CacheReleaseEvent {
            node: idx,
            area: previous.area(),
            allocated_area: self.budget.stats().allocated_area,
        });
        Some(previous)
    }

    /// Releases the node's bitmap. See [`release_cache_at`](Self::release_cache_at).
    pub fn release_cache(&mut self, id: NodeId) -> Option<CacheSize> {
        self.validate(id);
        self.release_cache_at(id.idx)
    }

    // -- Internal helpers --

    /// Whether `idx` keeps its own cache.
    pub(crate) fn should_cache_at(&self, idx: u32) -> bool {
        self.cache[idx as usize].enabled
            && !self.ancestors(idx).any(|a| self.cache[a as usize].enabled)
    }

    /// Applies the cache consequences of a property change on `idx`.
    pub(crate) fn invalidate_for_change(&mut self, idx: u32, changed: PropertySet) -> bool {
        if changed.is_empty() {
            return false;
        }
        let own = changed.intersection(self.cache[idx as usize].properties);
        let mut flipped = false;
        if !own.is_empty() {
            flipped |= self.invalidate_cache(idx, own);
        }
        let p = self.parent[idx as usize];
        if p != INVALID {
            flipped |= self.invalidate_upward(p, changed);
        }
        flipped
    }

    /// Invalidates every enabled cache from `start` up to the root.
    pub(crate) fn invalidate_upward(&mut self, start: u32, changed: PropertySet) -> bool {
        let mut chain = Vec::new();
        chain.push(start);
        chain.extend(self.ancestors(start));
        let mut flipped = false;
        for idx in chain {
            if self.cache[idx as usize].enabled {
                flipped |= self.invalidate_cache(idx, changed);
            }
        }
        flipped
    }

    /// Bumps the revision and flips the cache invalid. Returns `true` only on
    /// the valid-to-invalid transition.
    pub(crate) fn invalidate_cache(&mut self, idx: u32, changed: PropertySet) -> bool {
        let entry = &mut self.cache[idx as usize];
        entry.revision += 1;
        if !entry.valid {
            return false;
        }
        entry.valid = false;
        self.dirty.mark(idx, dirty::CACHE);
        self.tracer.cache_invalidated(&CacheInvalidatedEvent { node: idx, changed });
        let id = self.id_at(idx);
        self.observers.cache_invalidated(id, changed);
        true
    }
}

/// Properties a drawing collaborator typically reports through
/// [`Scene::mark_cache_dirty`].
pub const PAINT_PROPERTIES: PropertySet = PropertySet::EMPTY
    .with(PropertyName::Fill)
    .with(PropertyName::Stroke)
    .with(PropertyName::Opacity)
    .with(PropertyName::Content);
