// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Lazy own/absolute matrix resolution.
//!
//! Each node moves through three states:
//!
//! - [`MatrixState::MatrixDirty`]: a placement property changed; the own
//!   matrix must be recomposed.
//! - [`MatrixState::AbsoluteDirty`]: the own matrix is current but the node
//!   or an ancestor moved, so the absolute matrix must be re-multiplied.
//! - [`MatrixState::Clean`]: both matrices are current.
//!
//! Invariant: a node that is not `Clean` has no `Clean` descendants. Marking
//! a clean node dirty therefore walks its subtree once; marking an already
//! dirty node is O(1).

use alloc::collections::BTreeSet;
use alloc::vec::Vec;

use kurbo::{Affine, Point, Vec2};
use understory_dirty::EagerPolicy;

use super::id::{INVALID, NodeId};
use super::store::Scene;
use crate::dirty;
use crate::error::{Result, SceneError};
use crate::matrix;

/// Resolution state of a node's matrices.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MatrixState {
    /// Own and absolute matrices are current.
    Clean,
    /// The own matrix must be recomposed from the placement.
    #[default]
    MatrixDirty,
    /// The own matrix is current; the absolute matrix is not.
    AbsoluteDirty,
}

impl Scene {
    /// Returns the matrix state of a node.
    #[must_use]
    pub fn matrix_state(&self, id: NodeId) -> MatrixState {
        self.validate(id);
        self.matrix_state[id.idx as usize]
    }

    /// Returns the node's own matrix, mapping its centered local box into
    /// its parent's space.
    pub fn own_matrix(&mut self, id: NodeId) -> Affine {
        self.validate(id);
        self.resolve_own(id.idx)
    }

    /// Returns the node's absolute matrix: the product of all ancestor own
    /// matrices and its own, outermost first.
    ///
    /// # Errors
    ///
    /// [`SceneError::CyclicHierarchy`] if the parent chain loops.
    pub fn absolute_matrix(&mut self, id: NodeId) -> Result<Affine> {
        self.validate(id);
        self.resolve_absolute(id.idx)
    }

    pub(crate) fn resolve_own(&mut self, idx: u32) -> Affine {
        let i = idx as usize;
        if self.matrix_state[i] == MatrixState::MatrixDirty {
            self.own_matrix[i] = self.compose_own(idx);
            self.matrix_state[i] = MatrixState::AbsoluteDirty;
        }
        self.own_matrix[i]
    }

    pub(crate) fn resolve_absolute(&mut self, idx: u32) -> Result<Affine> {
        let mut chain = Vec::new();
        let mut visited = BTreeSet::new();
        let mut cur = idx;
        while cur != INVALID {
            if !visited.insert(cur) {
                return Err(SceneError::CyclicHierarchy { node: cur });
            }
            if self.matrix_state[cur as usize] == MatrixState::Clean {
                break;
            }
            chain.push(cur);
            cur = self.parent[cur as usize];
        }

        let mut acc = if cur == INVALID {
            Affine::IDENTITY
        } else {
            self.absolute_matrix[cur as usize]
        };
        for &i in chain.iter().rev() {
            let own = self.resolve_own(i);
            acc = matrix::multiply(acc, own);
            self.absolute_matrix[i as usize] = acc;
            self.matrix_state[i as usize] = MatrixState::Clean;
        }
        Ok(self.absolute_matrix[idx as usize])
    }

    /// Composes the own matrix of `idx` from its placement.
    fn compose_own(&self, idx: u32) -> Affine {
        let center = self.center_at(idx);
        matrix::compose(&self.placement[idx as usize].transform_props(center))
    }

    /// The node's center in parent space, derived from `left`/`top` and the
    /// origin.
    pub(crate) fn center_at(&self, idx: u32) -> Point {
        let p = &self.placement[idx as usize];
        let to_origin = self.origin_vector(idx, p.origin_x.offset(), p.origin_y.offset());
        Point::new(p.left, p.top) - to_origin
    }

    /// Vector from the center to the point at fractional offsets `(fx, fy)`
    /// of the box, in parent space.
    pub(crate) fn origin_vector(&self, idx: u32, fx: f64, fy: f64) -> Vec2 {
        let size = self.box_size_at(idx);
        let local = Point::new(fx * size.width, fy * size.height);
        (self.placement[idx as usize].linear() * local).to_vec2()
    }

    /// Moves `idx` so that its center lands on `center`, keeping the origin.
    pub(crate) fn set_center(&mut self, idx: u32, center: Point) {
        let (ox, oy) = {
            let p = &self.placement[idx as usize];
            (p.origin_x.offset(), p.origin_y.offset())
        };
        let at = center + self.origin_vector(idx, ox, oy);
        let p = &mut self.placement[idx as usize];
        p.left = at.x;
        p.top = at.y;
    }

    /// Marks the own matrix of `idx` dirty and cascades to descendants.
    pub(crate) fn mark_matrix_dirty(&mut self, idx: u32) {
        if self.matrix_state[idx as usize] == MatrixState::Clean {
            self.cascade_absolute_dirty(idx);
        }
        self.matrix_state[idx as usize] = MatrixState::MatrixDirty;
        self.dirty.mark_with(idx, dirty::TRANSFORM, &EagerPolicy);
    }

    /// Marks `idx` and its subtree absolute-dirty after a topology change.
    pub(crate) fn mark_absolute_dirty_subtree(&mut self, idx: u32) {
        for i in self.subtree(idx) {
            if self.matrix_state[i as usize] == MatrixState::Clean {
                self.matrix_state[i as usize] = MatrixState::AbsoluteDirty;
            }
        }
        self.dirty.mark_with(idx, dirty::TRANSFORM, &EagerPolicy);
    }

    fn cascade_absolute_dirty(&mut self, idx: u32) {
        for i in self.subtree(idx).into_iter().skip(1) {
            if self.matrix_state[i as usize] == MatrixState::Clean {
                self.matrix_state[i as usize] = MatrixState::AbsoluteDirty;
            }
        }
    }
}
