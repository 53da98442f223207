// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error taxonomy for matrix, hierarchy, and layout failures.
//!
//! Geometry errors are always surfaced to the caller. A render loop may choose
//! to skip a node that fails, but the core never substitutes a fallback value:
//! an identity matrix in place of a failed inversion would corrupt hit-testing
//! without any visible symptom.
//!
//! Misuse of handles (a stale [`NodeId`](crate::scene::NodeId), destroying a
//! node that still owns children) is a programming error and panics instead.

use thiserror::Error;

/// Convenience alias used by fallible scene operations.
pub type Result<T> = core::result::Result<T, SceneError>;

/// Errors produced by the matrix algebra and the scene.
#[derive(Clone, Copy, Debug, PartialEq, Error)]
pub enum SceneError {
    /// A matrix inversion was attempted on a matrix whose determinant is
    /// (nearly) zero.
    #[error("matrix is not invertible (determinant {determinant:e})")]
    SingularMatrix {
        /// The determinant that failed the check.
        determinant: f64,
    },
    /// A parent chain loops back on itself.
    #[error("cyclic hierarchy detected at node slot {node}")]
    CyclicHierarchy {
        /// Slot index of the node where the cycle was observed.
        node: u32,
    },
    /// A group's frame was read while its layout was being recomputed.
    #[error("group slot {group} queried while its layout is recomputing")]
    InvalidLayoutState {
        /// Slot index of the group.
        group: u32,
    },
    /// A group-only operation was applied to a leaf.
    #[error("node slot {node} is not a group")]
    NotAGroup {
        /// Slot index of the offending node.
        node: u32,
    },
    /// The node already belongs to a group; remove it first.
    #[error("node slot {node} already has a parent")]
    AlreadyParented {
        /// Slot index of the offending node.
        node: u32,
    },
    /// The node is not a member of any group.
    #[error("node slot {node} has no parent")]
    NoParent {
        /// Slot index of the offending node.
        node: u32,
    },
}
