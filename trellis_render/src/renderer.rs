// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The render pass: cache surface management and draw ordering.
//!
//! Each [`Renderer::render`] call evaluates the scene, plans cache sizes, and
//! walks the tree back to front:
//!
//! - A node with a planned cache is repainted into its surface when the
//!   cache is invalid (or the surface size changed), committed, and then
//!   blitted. Its descendants are painted into the same surface and are not
//!   visited again.
//! - Any other visible leaf is painted straight to the screen under its
//!   absolute matrix. Groups only recurse.
//!
//! Surfaces whose node no longer caches (destroyed, hidden, opted out, or
//! nested under a new caching ancestor) are freed through the painter and
//! their budget share is returned to the scene.

use alloc::vec::Vec;

use kurbo::{Affine, Rect};
use trellis_core::backend::{PaintTarget, Painter};
use trellis_core::cache::CacheSize;
use trellis_core::scene::{FrameChanges, INVALID, NodeId, NodeKind, Scene};

use crate::damage::DamageRegion;
use crate::plan::{ItemSource, RenderItem, RenderPlan};

/// An allocated cache surface.
#[derive(Debug)]
struct CacheSurface<S> {
    surface: S,
    size: CacheSize,
}

/// A cache surface as seen by callers of [`Renderer::cache_bitmap`].
#[derive(Debug)]
pub struct CacheBitmap<'a, S> {
    /// The backend surface.
    pub surface: &'a S,
    /// Pixel size and zoom the surface was painted at.
    pub size: CacheSize,
    /// Whether the surface matches the node's current content.
    pub valid: bool,
}

/// Owns cache surfaces across frames and produces one [`RenderPlan`] per
/// frame.
#[derive(Debug)]
pub struct Renderer<S> {
    surfaces: Vec<Option<CacheSurface<S>>>,
    previous_bounds: Vec<Option<Rect>>,
    changes: FrameChanges,
    plan: RenderPlan,
    damage: DamageRegion,
    first_frame: bool,
}

impl<S> Default for Renderer<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Renderer<S> {
    /// Creates a renderer with no surfaces.
    #[must_use]
    pub fn new() -> Self {
        Self {
            surfaces: Vec::new(),
            previous_bounds: Vec::new(),
            changes: FrameChanges::default(),
            plan: RenderPlan::default(),
            damage: DamageRegion::Full,
            first_frame: true,
        }
    }

    /// Renders one frame and returns what was drawn.
    pub fn render<P>(&mut self, scene: &mut Scene, painter: &mut P) -> &RenderPlan
    where
        P: Painter<Surface = S>,
    {
        scene.evaluate_into(&mut self.changes);
        self.plan.clear();
        self.plan.frame_index = scene.frame_index();

        for i in 0..self.changes.removed.len() {
            let idx = self.changes.removed[i];
            self.free_surface(scene, painter, idx);
        }

        let cache_plan = scene.plan_caches();
        for idx in 0..self.surfaces.len() {
            let slot = u32::try_from(idx).unwrap_or(INVALID);
            if self.surfaces[idx].is_some() && !cache_plan.nodes.contains(&slot) {
                self.free_surface(scene, painter, slot);
            }
        }

        self.collect_damage(scene);

        for root in scene.roots() {
            self.draw(scene, painter, root.index());
        }
        &self.plan
    }

    /// Returns the plan produced by the last [`render`](Self::render).
    #[must_use]
    pub fn plan(&self) -> &RenderPlan {
        &self.plan
    }

    /// Returns the damage accumulated by the last [`render`](Self::render).
    ///
    /// Covers the old and new bounds of every node that moved, appeared,
    /// disappeared, or whose cache was invalidated. Paint-only changes on
    /// uncached nodes are not visible to the scene; report them with
    /// [`add_damage`](Self::add_damage).
    #[must_use]
    pub fn damage(&self) -> &DamageRegion {
        &self.damage
    }

    /// Adds a canvas-space rectangle to the current damage.
    pub fn add_damage(&mut self, rect: Rect) {
        self.damage.add_rect(rect);
    }

    /// Returns the cache surface held for raw slot `idx`.
    #[must_use]
    pub fn cache_surface(&self, idx: u32) -> Option<&S> {
        self.surfaces
            .get(idx as usize)
            .and_then(Option::as_ref)
            .map(|c| &c.surface)
    }

    /// Returns the node's cache surface and whether it still matches the
    /// node's content.
    ///
    /// An invalid bitmap is repainted on the next [`render`](Self::render).
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn cache_bitmap(&self, scene: &Scene, id: NodeId) -> Option<CacheBitmap<'_, S>> {
        let valid = scene.is_cache_valid(id);
        self.surfaces
            .get(id.index() as usize)
            .and_then(Option::as_ref)
            .map(|c| CacheBitmap {
                surface: &c.surface,
                size: c.size,
                valid,
            })
    }

    /// Frees every surface and resets the scene's cache budget. The next frame
    /// repaints every cache and reports full damage.
    pub fn reset<P>(&mut self, scene: &mut Scene, painter: &mut P)
    where
        P: Painter<Surface = S>,
    {
        for slot in &mut self.surfaces {
            if let Some(cached) = slot.take() {
                painter.release_surface(cached.surface);
            }
        }
        self.previous_bounds.clear();
        self.first_frame = true;
        scene.reset_cache_budget();
    }

    fn free_surface<P>(&mut self, scene: &mut Scene, painter: &mut P, idx: u32)
    where
        P: Painter<Surface = S>,
    {
        if let Some(cached) = self.surfaces.get_mut(idx as usize).and_then(Option::take) {
            painter.release_surface(cached.surface);
        }
        // Destroyed nodes have already returned their share.
        let _ = scene.release_cache_at(idx);
    }

    fn collect_damage(&mut self, scene: &Scene) {
        let bound = self.slot_bound(scene);
        if self.previous_bounds.len() < bound {
            self.previous_bounds.resize(bound, None);
        }
        let mut live = alloc::vec![false; bound];
        for &idx in scene.traversal_order() {
            live[idx as usize] = true;
        }

        let c = &self.changes;
        let mut touched: Vec<u32> = c
            .removed
            .iter()
            .chain(&c.added)
            .chain(&c.transforms)
            .chain(&c.layouts)
            .chain(&c.cache_invalidated)
            .chain(&c.hidden)
            .chain(&c.shown)
            .copied()
            .collect();
        touched.sort_unstable();
        touched.dedup();

        let mut damage = if self.first_frame {
            DamageRegion::Full
        } else {
            DamageRegion::None
        };
        self.first_frame = false;
        for idx in touched {
            let i = idx as usize;
            if let Some(old) = self.previous_bounds[i] {
                damage.add_rect(old);
            }
            let now = (live[i] && scene.effective_visible_at(idx))
                .then(|| scene.corners_at(idx).bounding_box());
            if let Some(rect) = now {
                damage.add_rect(rect);
            }
            self.previous_bounds[i] = now;
        }
        self.damage = damage;
    }

    fn slot_bound(&self, scene: &Scene) -> usize {
        scene
            .traversal_order()
            .iter()
            .chain(&self.changes.removed)
            .map(|&idx| idx as usize + 1)
            .max()
            .unwrap_or(0)
    }

    fn draw<P>(&mut self, scene: &mut Scene, painter: &mut P, idx: u32)
    where
        P: Painter<Surface = S>,
    {
        if !scene.effective_visible_at(idx) {
            return;
        }
        if let Some(target) = scene.cache_target_at(idx) {
            self.draw_cached(scene, painter, idx, target);
            return;
        }
        if scene.kind_at(idx) == NodeKind::Leaf {
            let transform = scene.absolute_matrix_at(idx);
            painter.paint(
                PaintTarget::Screen,
                scene.id_at(idx),
                scene.local_box_at(idx),
                transform,
            );
            self.plan.items.push(RenderItem {
                node: idx,
                transform,
                source: ItemSource::Direct,
            });
        }
        let mut child = scene.first_child_at(idx);
        while child != INVALID {
            self.draw(scene, painter, child);
            child = scene.next_sibling_at(child);
        }
    }

    fn draw_cached<P>(&mut self, scene: &mut Scene, painter: &mut P, idx: u32, target: CacheSize)
    where
        P: Painter<Surface = S>,
    {
        let i = idx as usize;
        if self.surfaces.len() <= i {
            self.surfaces.resize_with(i + 1, || None);
        }

        let mut cached = match self.surfaces[i].take() {
            Some(cached) if cached.size.width == target.width && cached.size.height == target.height => {
                cached
            }
            other => {
                if let Some(stale) = other {
                    painter.release_surface(stale.surface);
                }
                CacheSurface {
                    surface: painter.create_surface(&target),
                    size: target,
                }
            }
        };

        let redrawn = !scene.cache_valid_at(idx) || cached.size != target;
        if redrawn {
            cached.size = target;
            paint_subtree(scene, painter, &mut cached.surface, idx, target.paint_transform());
            let _ = scene.commit_cache_at(idx);
        }

        let transform = target.blit_transform(scene.absolute_matrix_at(idx));
        painter.blit(&cached.surface, transform, scene.id_at(idx));
        self.surfaces[i] = Some(cached);
        self.plan.items.push(RenderItem {
            node: idx,
            transform,
            source: ItemSource::Cache {
                size: target,
                redrawn,
            },
        });
    }
}

/// Paints `idx` and its visible descendants into a cache surface. `transform`
/// maps the local space of `idx` into surface pixels.
fn paint_subtree<P: Painter>(
    scene: &Scene,
    painter: &mut P,
    surface: &mut P::Surface,
    idx: u32,
    transform: Affine,
) {
    if !scene.effective_visible_at(idx) {
        return;
    }
    if scene.kind_at(idx) == NodeKind::Leaf {
        painter.paint(
            PaintTarget::Cache(surface),
            scene.id_at(idx),
            scene.local_box_at(idx),
            transform,
        );
    }
    let mut child = scene.first_child_at(idx);
    while child != INVALID {
        paint_subtree(
            scene,
            painter,
            surface,
            child,
            transform * scene.own_matrix_at(child),
        );
        child = scene.next_sibling_at(child);
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use trellis_core::cache::CacheConfig;
    use trellis_core::props::{NodeOptions, PropertyName, PropertySet};
    use trellis_core::scene::{LayoutMode, SceneConfig};

    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    enum Op {
        Create(u32, u32),
        Release(u32, u32),
        Paint { node: NodeId, cached: bool, transform: Affine },
        Blit { node: NodeId, transform: Affine },
    }

    #[derive(Debug)]
    struct Surface {
        width: u32,
        height: u32,
        paints: u32,
    }

    #[derive(Debug, Default)]
    struct MockPainter {
        ops: Vec<Op>,
    }

    impl MockPainter {
        fn take(&mut self) -> Vec<Op> {
            core::mem::take(&mut self.ops)
        }
    }

    impl Painter for MockPainter {
        type Surface = Surface;

        fn create_surface(&mut self, size: &CacheSize) -> Surface {
            self.ops.push(Op::Create(size.width, size.height));
            Surface {
                width: size.width,
                height: size.height,
                paints: 0,
            }
        }

        fn release_surface(&mut self, surface: Surface) {
            self.ops.push(Op::Release(surface.width, surface.height));
        }

        fn paint(
            &mut self,
            target: PaintTarget<'_, Surface>,
            node: NodeId,
            _local_box: Rect,
            transform: Affine,
        ) {
            let cached = match target {
                PaintTarget::Screen => false,
                PaintTarget::Cache(surface) => {
                    surface.paints += 1;
                    true
                }
            };
            self.ops.push(Op::Paint {
                node,
                cached,
                transform,
            });
        }

        fn blit(&mut self, _surface: &Surface, transform: Affine, node: NodeId) {
            self.ops.push(Op::Blit { node, transform });
        }
    }

    fn uncached_scene() -> Scene {
        Scene::with_config(SceneConfig {
            object_caching: false,
            ..SceneConfig::default()
        })
    }

    #[test]
    fn uncached_leaves_paint_directly() {
        let mut scene = uncached_scene();
        let a = scene.create_leaf(&NodeOptions::new().size(10.0, 10.0));
        let b = scene.create_leaf(&NodeOptions::new().position(20.0, 0.0).size(10.0, 10.0));
        let mut renderer = Renderer::new();
        let mut painter = MockPainter::default();

        let plan = renderer.render(&mut scene, &mut painter);
        assert_eq!(plan.items.len(), 2);
        assert!(plan.items.iter().all(|i| i.source == ItemSource::Direct));
        assert_eq!(
            painter.take(),
            vec![
                Op::Paint {
                    node: a,
                    cached: false,
                    transform: scene.absolute_matrix_at(a.index()),
                },
                Op::Paint {
                    node: b,
                    cached: false,
                    transform: scene.absolute_matrix_at(b.index()),
                },
            ]
        );
    }

    #[test]
    fn valid_cache_is_only_blitted() {
        let mut scene = Scene::new();
        let id = scene.create_leaf(&NodeOptions::new().size(50.0, 40.0));
        let mut renderer = Renderer::new();
        let mut painter = MockPainter::default();

        let _ = renderer.render(&mut scene, &mut painter);
        let first = painter.take();
        assert_eq!(first[0], Op::Create(52, 42));
        assert!(matches!(first[1], Op::Paint { cached: true, .. }));
        assert!(matches!(first[2], Op::Blit { .. }));
        assert!(scene.is_cache_valid(id));

        let plan = renderer.render(&mut scene, &mut painter);
        assert_eq!(plan.redrawn_caches(), 0);
        let second = painter.take();
        assert_eq!(second.len(), 1);
        assert!(matches!(second[0], Op::Blit { .. }));
    }

    #[test]
    fn invalidated_cache_is_repainted_in_place() {
        let mut scene = Scene::new();
        let id = scene.create_leaf(&NodeOptions::new().size(50.0, 40.0));
        let mut renderer = Renderer::new();
        let mut painter = MockPainter::default();
        let _ = renderer.render(&mut scene, &mut painter);
        let _ = painter.take();

        let _ = scene.mark_cache_dirty(id, PropertySet::single(PropertyName::Fill));
        let plan = renderer.render(&mut scene, &mut painter);
        assert_eq!(plan.redrawn_caches(), 1);
        let ops = painter.take();
        assert!(!ops.iter().any(|op| matches!(op, Op::Create(..))));
        assert_eq!(renderer.cache_surface(id.index()).map(|s| s.paints), Some(2));
    }

    #[test]
    fn moving_a_cached_node_only_changes_the_blit() {
        let mut scene = Scene::new();
        let id = scene.create_leaf(&NodeOptions::new().size(50.0, 40.0));
        let mut renderer = Renderer::new();
        let mut painter = MockPainter::default();
        let _ = renderer.render(&mut scene, &mut painter);
        let _ = painter.take();

        let _ = scene.set(id, &NodeOptions::new().position(100.0, 100.0));
        let _ = renderer.render(&mut scene, &mut painter);
        let ops = painter.take();
        assert_eq!(ops.len(), 1);
        let Op::Blit { transform, .. } = ops[0] else {
            panic!("expected a blit, got {ops:?}");
        };
        // Surface pixel (1, 1) is the box's top-left corner (margin 2).
        let corner = transform * kurbo::Point::new(1.0, 1.0);
        assert!((corner - kurbo::Point::new(100.0, 100.0)).hypot() < 1e-9);
    }

    #[test]
    fn group_children_paint_into_group_surface() {
        let mut scene = Scene::new();
        let group = scene.create_group(LayoutMode::FitContent, &NodeOptions::new());
        let a = scene.create_leaf(&NodeOptions::new().size(10.0, 10.0));
        let b = scene.create_leaf(&NodeOptions::new().position(30.0, 0.0).size(10.0, 10.0));
        scene.add_child(group, a).unwrap();
        scene.add_child(group, b).unwrap();
        let mut renderer = Renderer::new();
        let mut painter = MockPainter::default();

        let plan = renderer.render(&mut scene, &mut painter);
        assert_eq!(plan.items.len(), 1);
        assert_eq!(plan.items[0].node, group.index());

        let target = scene.cache_target_at(group.index()).unwrap();
        let ops = painter.take();
        assert_eq!(
            ops[1],
            Op::Paint {
                node: a,
                cached: true,
                transform: target.paint_transform() * scene.own_matrix_at(a.index()),
            }
        );
        assert!(matches!(ops[2], Op::Paint { node, cached: true, .. } if node == b));
        assert_eq!(renderer.cache_surface(a.index()).map(|s| s.paints), None);
    }

    #[test]
    fn destroyed_node_frees_its_surface() {
        let mut scene = Scene::new();
        let id = scene.create_leaf(&NodeOptions::new().size(50.0, 40.0));
        let mut renderer = Renderer::new();
        let mut painter = MockPainter::default();
        let _ = renderer.render(&mut scene, &mut painter);
        let _ = painter.take();

        scene.destroy_node(id);
        let plan = renderer.render(&mut scene, &mut painter);
        assert!(plan.items.is_empty());
        assert_eq!(painter.take(), vec![Op::Release(52, 42)]);
        assert_eq!(scene.cache_stats().allocated_area, 0);
        assert!(renderer.cache_surface(id.index()).is_none());
    }

    #[test]
    fn opting_out_switches_to_direct_paint() {
        let mut scene = Scene::new();
        let id = scene.create_leaf(&NodeOptions::new().size(50.0, 40.0));
        let mut renderer = Renderer::new();
        let mut painter = MockPainter::default();
        let _ = renderer.render(&mut scene, &mut painter);
        let _ = painter.take();

        scene.set_object_caching(id, false);
        let plan = renderer.render(&mut scene, &mut painter);
        assert_eq!(plan.items[0].source, ItemSource::Direct);
        let ops = painter.take();
        assert_eq!(ops[0], Op::Release(52, 42));
        assert!(matches!(ops[1], Op::Paint { cached: false, .. }));
    }

    #[test]
    fn surfaces_stay_within_budget() {
        let mut scene = Scene::with_config(SceneConfig {
            cache: CacheConfig::with_budget(10_000),
            ..SceneConfig::default()
        });
        let a = scene.create_leaf(&NodeOptions::new().size(100.0, 80.0));
        let b = scene.create_leaf(&NodeOptions::new().position(200.0, 0.0).size(80.0, 100.0));
        let mut renderer = Renderer::new();
        let mut painter = MockPainter::default();
        let _ = renderer.render(&mut scene, &mut painter);

        let area = |id: NodeId| {
            let bitmap = renderer.cache_bitmap(&scene, id).unwrap();
            assert!(bitmap.valid, "freshly painted cache should be valid");
            bitmap.size.area()
        };
        assert!(area(a) + area(b) <= 10_000);
        assert!(scene.cache_stats().allocated_area <= 10_000);
    }

    #[test]
    fn damage_covers_old_and_new_bounds() {
        let mut scene = uncached_scene();
        let id = scene.create_leaf(&NodeOptions::new().size(10.0, 10.0));
        let mut renderer = Renderer::new();
        let mut painter = MockPainter::default();

        let _ = renderer.render(&mut scene, &mut painter);
        assert_eq!(renderer.damage(), &DamageRegion::Full);
        let _ = renderer.render(&mut scene, &mut painter);
        assert!(renderer.damage().is_empty());

        let _ = scene.set(id, &NodeOptions::new().position(50.0, 0.0));
        let _ = renderer.render(&mut scene, &mut painter);
        assert_eq!(
            renderer.damage().bounds(),
            Some(Rect::new(0.0, 0.0, 60.0, 10.0))
        );
    }

    #[test]
    fn moving_a_flat_line_is_damaged() {
        let mut scene = uncached_scene();
        let id = scene.create_leaf(&NodeOptions::new().size(10.0, 0.0).stroke_width(0.0));
        let mut renderer = Renderer::new();
        let mut painter = MockPainter::default();
        let _ = renderer.render(&mut scene, &mut painter);

        let _ = scene.set(id, &NodeOptions::new().position(0.0, 50.0));
        let _ = renderer.render(&mut scene, &mut painter);
        assert_eq!(
            renderer.damage().bounds(),
            Some(Rect::new(-1.0, -1.0, 11.0, 51.0))
        );
    }

    #[test]
    fn reset_repaints_everything() {
        let mut scene = Scene::new();
        let _id = scene.create_leaf(&NodeOptions::new().size(50.0, 40.0));
        let mut renderer = Renderer::new();
        let mut painter = MockPainter::default();
        let _ = renderer.render(&mut scene, &mut painter);

        renderer.reset(&mut scene, &mut painter);
        assert_eq!(scene.cache_stats().allocated_area, 0);
        let plan = renderer.render(&mut scene, &mut painter);
        assert_eq!(plan.redrawn_caches(), 1);
    }
}
