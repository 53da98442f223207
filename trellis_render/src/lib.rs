// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render pass and damage tracking for trellis scenes.
//!
//! This crate sits between [`trellis_core`]'s scene evaluation and a
//! backend-specific [`Painter`](trellis_core::backend::Painter). It provides:
//!
//! - [`Renderer`]: owns cache surfaces across frames and draws one frame
//! - [`RenderPlan`] / [`RenderItem`]: what was drawn, back to front
//! - [`DamageRegion`]: spatial damage tracking for partial re-rendering

#![no_std]
#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate alloc;

mod damage;
mod plan;
mod renderer;

pub use damage::DamageRegion;
pub use plan::{ItemSource, RenderItem, RenderPlan};
pub use renderer::{CacheBitmap, Renderer};
