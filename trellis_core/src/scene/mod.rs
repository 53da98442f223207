// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene graph data model.
//!
//! A *node* is either a leaf shape or a group. Each node has:
//!
//! - An identity ([`NodeId`]): a generational handle that becomes stale when
//!   the node is destroyed, preventing use-after-free bugs at the API level.
//! - Topology: parent, first-child, and sibling links forming an ordered
//!   tree. Sibling order is paint order, back to front.
//! - **Placement** set by the caller ([`Placement`]): position of the origin
//!   point, scale, skew, angle, flips, plus size and stroke width.
//! - **Derived state**: the own and absolute matrices
//!   ([`Scene::own_matrix`], [`Scene::absolute_matrix`]), corners and
//!   bounding boxes, group frames recomputed by the layout manager, and
//!   render-cache bookkeeping.
//!
//! Nodes are stored in struct-of-arrays layout with index-based handles
//! for cache-friendly traversal.
//!
//! # Dirty tracking
//!
//! Matrices are resolved lazily through [`MatrixState`]. In parallel, the
//! [`dirty`](crate::dirty) channels record what changed for the next
//! [`evaluate`](Scene::evaluate):
//!
//! - **TRANSFORM**: propagates to all descendants.
//! - **CACHE** / **LAYOUT**: local-only.
//! - **TOPOLOGY**: structural changes that trigger a traversal rebuild.

mod caching;
mod controls;
mod evaluate;
mod geometry;
mod id;
mod layout;
mod observer;
mod store;
mod transform;
mod traverse;

pub use caching::{CachePlan, CacheStatus, PAINT_PROPERTIES};
pub use controls::{Control, ControlConfig};
pub use evaluate::FrameChanges;
pub use geometry::{Corners, bounding_box};
pub use id::{INVALID, NodeId, NodeKind};
pub use layout::{Frame, LayoutMode, LayoutState};
pub use observer::{NodeObserver, SubscriptionId};
pub use store::{Placement, Scene, SceneConfig};
pub use transform::MatrixState;
pub use traverse::Children;
