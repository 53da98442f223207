// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Typed publish/subscribe for per-node notifications.
//!
//! Observers are owned by the scene and keyed by the node they watch. All
//! subscriptions of a node are dropped when the node is destroyed, so no
//! listener outlives its subject.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use super::id::NodeId;
use crate::props::PropertySet;

/// Receives notifications about one node.
///
/// Both methods default to no-ops.
pub trait NodeObserver {
    /// The node's own frame (position, size, or transform) changed, either by
    /// a property update or by a layout pass.
    fn on_bounds_changed(&mut self, node: NodeId) {
        _ = node;
    }

    /// The node's cached bitmap became invalid.
    fn on_cache_invalidated(&mut self, node: NodeId, changed: PropertySet) {
        _ = (node, changed);
    }
}

/// Handle returned by [`Scene::subscribe`](super::Scene::subscribe).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

struct Subscription {
    id: SubscriptionId,
    node: u32,
    observer: Box<dyn NodeObserver>,
}

/// The scene's subscription table.
#[derive(Default)]
pub(crate) struct Observers {
    entries: Vec<Subscription>,
    next_id: u64,
}

impl fmt::Debug for Observers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("subscriptions", &self.entries.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}

impl Observers {
    pub(crate) fn subscribe(&mut self, node: u32, observer: Box<dyn NodeObserver>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.entries.push(Subscription { id, node, observer });
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|s| s.id != id);
        self.entries.len() != before
    }

    /// Drops every subscription on `node`.
    pub(crate) fn drop_node(&mut self, node: u32) {
        self.entries.retain(|s| s.node != node);
    }

    pub(crate) fn count(&self, node: u32) -> usize {
        self.entries.iter().filter(|s| s.node == node).count()
    }

    pub(crate) fn bounds_changed(&mut self, node: NodeId) {
        for s in self.entries.iter_mut().filter(|s| s.node == node.idx) {
            s.observer.on_bounds_changed(node);
        }
    }

    pub(crate) fn cache_invalidated(&mut self, node: NodeId, changed: PropertySet) {
        for s in self.entries.iter_mut().filter(|s| s.node == node.idx) {
            s.observer.on_cache_invalidated(node, changed);
        }
    }
}
