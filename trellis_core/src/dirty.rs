// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel constants.
//!
//! The scene uses multi-channel dirty tracking (via [`understory_dirty`]) to
//! report, once per frame, which nodes changed and how. Lazy matrix
//! resolution does not depend on these channels; they exist so that
//! [`Scene::evaluate`](crate::scene::Scene::evaluate) can hand the render pass
//! a precise change list.
//!
//! # Propagation semantics
//!
//! - **Propagating**: [`TRANSFORM`] uses
//!   [`EagerPolicy`](understory_dirty::EagerPolicy) with dependency edges from
//!   child to parent. Marking a group marks every descendant, because their
//!   absolute matrices are derived from it.
//!
//! - **Local-only**: [`CACHE`] and [`LAYOUT`] mark just the node concerned:
//!   a flipped cache, or a group whose frame was recomputed.
//!
//! - **Structural**: [`TOPOLOGY`] is marked on membership changes and node
//!   creation or destruction, and triggers a traversal-order rebuild.

use understory_dirty::Channel;

/// Own or inherited transform changed.
pub const TRANSFORM: Channel = Channel::new(0);

/// Cached bitmap became invalid.
pub const CACHE: Channel = Channel::new(1);

/// Group frame was recomputed by the layout manager.
pub const LAYOUT: Channel = Channel::new(2);

/// Tree topology changed.
pub const TOPOLOGY: Channel = Channel::new(3);
