// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr).

use std::io::Write;

use trellis_core::props::{PropertyName, PropertySet};
use trellis_core::trace::{
    CacheCommitEvent, CacheInvalidatedEvent, CachePlanEvent, CacheReleaseEvent, EvaluateEvent,
    LayoutEvent, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink and returns its writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn keys(set: PropertySet) -> String {
    if set.is_empty() {
        return "-".into();
    }
    set.iter().map(PropertyName::key).collect::<Vec<_>>().join(",")
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_layout(&mut self, e: &LayoutEvent) {
        let _ = writeln!(
            self.writer,
            "[layout] group={} children={} {:.1}x{:.1} -> {:.1}x{:.1} shift=({:.1},{:.1})",
            e.group,
            e.children,
            e.previous_width,
            e.previous_height,
            e.width,
            e.height,
            e.shift_x,
            e.shift_y,
        );
    }

    fn on_cache_invalidated(&mut self, e: &CacheInvalidatedEvent) {
        let _ = writeln!(
            self.writer,
            "[cache:invalid] node={} changed={}",
            e.node,
            keys(e.changed),
        );
    }

    fn on_cache_plan(&mut self, e: &CachePlanEvent) {
        let _ = writeln!(
            self.writer,
            "[cache:plan] frame={} nodes={} requested={}px² budget={}px² factor={:.3}",
            e.frame_index, e.caching_nodes, e.requested_area, e.max_total_area, e.side_factor,
        );
    }

    fn on_cache_commit(&mut self, e: &CacheCommitEvent) {
        let _ = writeln!(
            self.writer,
            "[cache:commit] node={} {}x{} allocated={}px²",
            e.node, e.width, e.height, e.allocated_area,
        );
    }

    fn on_cache_release(&mut self, e: &CacheReleaseEvent) {
        let _ = writeln!(
            self.writer,
            "[cache:release] node={} area={}px² allocated={}px²",
            e.node, e.area, e.allocated_area,
        );
    }

    fn on_evaluate(&mut self, e: &EvaluateEvent) {
        let topology = if e.topology_changed { " topology" } else { "" };
        let _ = writeln!(
            self.writer,
            "[eval] frame={} transforms={} layouts={} invalidations={}{topology}",
            e.frame_index, e.transforms, e.layouts, e.cache_invalidations,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pretty_print_layout() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_layout(&LayoutEvent {
            group: 3,
            children: 2,
            previous_width: 100.0,
            previous_height: 100.0,
            width: 200.0,
            height: 100.0,
            shift_x: 50.0,
            shift_y: 0.0,
        });
        let output = String::from_utf8(sink.into_inner()).unwrap();
        assert!(output.contains("[layout]"), "got: {output}");
        assert!(output.contains("100.0x100.0 -> 200.0x100.0"), "got: {output}");
    }

    #[test]
    fn invalidation_lists_property_keys() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_cache_invalidated(&CacheInvalidatedEvent {
            node: 1,
            changed: PropertySet::single(PropertyName::Fill),
        });
        let output = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(output, "[cache:invalid] node=1 changed=fill\n");
    }

    #[test]
    fn scene_events_reach_the_sink() {
        use std::cell::RefCell;
        use std::rc::Rc;

        use trellis_core::props::NodeOptions;
        use trellis_core::scene::Scene;

        #[derive(Clone, Default)]
        struct Shared(Rc<RefCell<Vec<u8>>>);

        impl Write for Shared {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.borrow_mut().write(buf)
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let shared = Shared::default();
        let mut scene = Scene::new();
        let _ = scene.set_trace_sink(Box::new(PrettyPrintSink::with_writer(shared.clone())));
        let id = scene.create_leaf(&NodeOptions::new().size(10.0, 10.0));
        let _ = scene.evaluate();
        let _ = scene.plan_caches();
        let _ = scene.commit_cache(id);

        let output = String::from_utf8(shared.0.borrow().clone()).unwrap();
        assert!(output.contains("[eval] frame=1"), "got: {output}");
        assert!(output.contains("[cache:plan]"), "got: {output}");
        assert!(output.contains("[cache:commit] node=0 12x12"), "got: {output}");
    }
}
