// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree traversal utilities.

use super::id::{INVALID, NodeId};
use super::store::Scene;

/// An iterator over the direct children of a group, back to front.
///
/// Created by [`Scene::children`].
#[derive(Debug)]
pub struct Children<'a> {
    scene: &'a Scene,
    current: u32,
}

impl<'a> Children<'a> {
    pub(crate) fn new(scene: &'a Scene, first: u32) -> Self {
        Self {
            scene,
            current: first,
        }
    }
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        self.current = self.scene.next_sibling[idx as usize];
        Some(NodeId {
            idx,
            generation: self.scene.generation[idx as usize],
        })
    }
}

impl Scene {
    /// Collects the slot indices of the subtree rooted at `idx` (inclusive),
    /// depth-first pre-order.
    pub(crate) fn subtree(&self, idx: u32) -> alloc::vec::Vec<u32> {
        let mut out = alloc::vec::Vec::new();
        let mut stack = alloc::vec![idx];
        while let Some(i) = stack.pop() {
            out.push(i);
            // Push children in reverse so the first child is visited first.
            let mut child = self.last_child(i);
            while child != INVALID {
                stack.push(child);
                child = self.prev_sibling[child as usize];
            }
        }
        out
    }

    /// Returns the last child of `idx`, or [`INVALID`].
    pub(crate) fn last_child(&self, idx: u32) -> u32 {
        let mut last = self.first_child[idx as usize];
        if last == INVALID {
            return INVALID;
        }
        while self.next_sibling[last as usize] != INVALID {
            last = self.next_sibling[last as usize];
        }
        last
    }

    /// Iterates over the strict ancestors of `idx`, nearest first.
    pub(crate) fn ancestors(&self, idx: u32) -> Ancestors<'_> {
        Ancestors {
            scene: self,
            current: self.parent[idx as usize],
        }
    }
}

/// Iterator over the ancestor slots of a node.
#[derive(Debug)]
pub(crate) struct Ancestors<'a> {
    scene: &'a Scene,
    current: u32,
}

impl Iterator for Ancestors<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        self.current = self.scene.parent[idx as usize];
        Some(idx)
    }
}
