// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene graph, transform model, layout, and render-cache bookkeeping for
//! interactive 2D canvases.
//!
//! `trellis_core` keeps a tree of positionable shapes and groups and answers
//! geometric questions about it: where each node is on the canvas, what its
//! corners and bounding box are, which node sits under a point, and how big
//! its offscreen render cache may be. It is `no_std` compatible (with
//! `alloc`) and uses array-based struct-of-arrays storage with index handles
//! for cache-friendly traversal.
//!
//! # Architecture
//!
//! ```text
//!   Scene::set / add_child / ...
//!       │  marks matrices dirty, runs layout, invalidates caches
//!       ▼
//!   Scene::evaluate() ──► FrameChanges
//!       │
//!       ▼
//!   Scene::plan_caches() ──► CachePlan ──► renderer paints, then
//!                                          Scene::commit_cache_at()
//! ```
//!
//! **[`matrix`]**: 2D affine compose/decompose/invert with a canonical
//! decomposition.
//!
//! **[`props`]**: Placement options, origin keywords, and property-name sets.
//!
//! **[`scene`]**: Struct-of-arrays node tree with generational handles, lazy
//! matrix resolution, fit-content layout, hit testing, and manipulation
//! handles.
//!
//! **[`cache`]**: Cache sizing and the global pixel-area budget.
//!
//! **[`dirty`]**: Multi-channel dirty tracking via `understory_dirty`.
//!
//! **[`backend`]**: The [`Painter`](backend::Painter) trait that drawing
//! backends implement.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! layout and cache instrumentation, with a zero-overhead
//! [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod backend;
pub mod cache;
pub mod dirty;
pub mod error;
pub mod matrix;
pub mod numeric;
pub mod props;
pub mod scene;
pub mod trace;
