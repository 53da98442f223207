// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pretty-printed tracing and JSON snapshots for trellis diagnostics.
//!
//! - [`pretty::PrettyPrintSink`]: a [`TraceSink`](trellis_core::trace::TraceSink)
//!   writing one human-readable line per layout or cache event.
//! - [`snapshot::scene_json`]: a `serde_json` dump of the whole tree.

pub mod pretty;
pub mod snapshot;
