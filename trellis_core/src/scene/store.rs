// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays node storage with allocation, topology, and property management.

use alloc::boxed::Box;
use alloc::vec::Vec;

use kurbo::{Affine, Point, Size};
use understory_dirty::{CycleHandling, DirtyTracker, EagerPolicy};

use super::id::{INVALID, NodeId, NodeKind};
use super::layout::{LayoutMode, LayoutState};
use super::observer::{NodeObserver, Observers, SubscriptionId};
use super::transform::MatrixState;
use super::traverse::Children;
use crate::cache::{CacheBudget, CacheConfig, CacheEntry};
use crate::dirty;
use crate::error::{Result, SceneError};
use crate::matrix::{self, TransformProps};
use crate::props::{NodeOptions, Origin, PropertyName, PropertySet};
use crate::trace::{TraceSink, Tracer};

/// Scene-wide configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneConfig {
    /// Render-cache sizing and budget.
    pub cache: CacheConfig,
    /// Initial viewport zoom applied to cache resolution.
    pub viewport_zoom: f64,
    /// Whether newly created nodes may keep their own render cache.
    pub object_caching: bool,
}

impl SceneConfig {
    /// The default configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cache: CacheConfig::new(),
            viewport_zoom: 1.0,
            object_caching: true,
        }
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// The placement properties of a node: where its origin point sits in the
/// parent's space and how the node is scaled, sheared, rotated, and mirrored
/// around it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    /// Horizontal position of the origin point.
    pub left: f64,
    /// Vertical position of the origin point.
    pub top: f64,
    /// Horizontal scale (`>= 0`).
    pub scale_x: f64,
    /// Vertical scale (`>= 0`).
    pub scale_y: f64,
    /// Horizontal shear in degrees.
    pub skew_x: f64,
    /// Vertical shear in degrees.
    pub skew_y: f64,
    /// Rotation in degrees.
    pub angle: f64,
    /// Horizontal mirroring.
    pub flip_x: bool,
    /// Vertical mirroring.
    pub flip_y: bool,
    /// Horizontal origin.
    pub origin_x: Origin,
    /// Vertical origin.
    pub origin_y: Origin,
}

impl Placement {
    /// Unit placement at `(0, 0)` with a top-left origin.
    pub const DEFAULT: Self = Self {
        left: 0.0,
        top: 0.0,
        scale_x: 1.0,
        scale_y: 1.0,
        skew_x: 0.0,
        skew_y: 0.0,
        angle: 0.0,
        flip_x: false,
        flip_y: false,
        origin_x: Origin::Start,
        origin_y: Origin::Start,
    };

    /// Transform properties of this placement translated to `center`.
    #[must_use]
    pub fn transform_props(&self, center: Point) -> TransformProps {
        TransformProps {
            translate_x: center.x,
            translate_y: center.y,
            scale_x: self.scale_x,
            scale_y: self.scale_y,
            skew_x: self.skew_x,
            skew_y: self.skew_y,
            angle: self.angle,
            flip_x: self.flip_x,
            flip_y: self.flip_y,
        }
    }

    /// The rotate × scale-and-skew part of the placement, without translation.
    #[must_use]
    pub fn linear(&self) -> Affine {
        matrix::compose(&self.transform_props(Point::ORIGIN))
    }
}

impl Default for Placement {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Struct-of-arrays storage for every node of a 2D scene.
///
/// Nodes are addressed by [`NodeId`] handles. Internally, each node occupies
/// a slot in parallel arrays. Destroyed nodes are recycled via a free list,
/// and generation counters prevent stale handle access.
///
/// Property updates mark matrices dirty; matrices and corners are resolved on
/// read. Group frames are recomputed eagerly by the layout manager whenever a
/// child's bounds or the membership change.
#[derive(Debug)]
pub struct Scene {
    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,
    pub(crate) prev_sibling: Vec<u32>,
    pub(crate) kind: Vec<NodeKind>,

    // -- Local properties (set by callers) --
    pub(crate) placement: Vec<Placement>,
    pub(crate) size: Vec<Size>,
    pub(crate) stroke_width: Vec<f64>,
    pub(crate) visible: Vec<bool>,

    // -- Matrices (resolved lazily) --
    pub(crate) matrix_state: Vec<MatrixState>,
    pub(crate) own_matrix: Vec<Affine>,
    pub(crate) absolute_matrix: Vec<Affine>,
    pub(crate) effective_visible: Vec<bool>,

    // -- Layout --
    pub(crate) layout_mode: Vec<LayoutMode>,
    pub(crate) layout_state: Vec<LayoutState>,

    // -- Render cache --
    pub(crate) cache: Vec<CacheEntry>,
    pub(crate) budget: CacheBudget,
    pub(crate) viewport_zoom: f64,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,

    // -- Dirty tracking --
    pub(crate) dirty: DirtyTracker<u32>,

    // -- Traversal cache --
    pub(crate) traversal_order: Vec<u32>,
    pub(crate) traversal_dirty: bool,

    // -- Lifecycle tracking --
    pub(crate) pending_added: Vec<u32>,
    pub(crate) pending_removed: Vec<u32>,
    pub(crate) frame_index: u64,

    // -- Collaborators --
    pub(crate) observers: Observers,
    pub(crate) tracer: Tracer,
    pub(crate) config: SceneConfig,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Creates an empty scene with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(SceneConfig::default())
    }

    /// Creates an empty scene with the given configuration.
    #[must_use]
    pub fn with_config(config: SceneConfig) -> Self {
        Self {
            parent: Vec::new(),
            first_child: Vec::new(),
            next_sibling: Vec::new(),
            prev_sibling: Vec::new(),
            kind: Vec::new(),
            placement: Vec::new(),
            size: Vec::new(),
            stroke_width: Vec::new(),
            visible: Vec::new(),
            matrix_state: Vec::new(),
            own_matrix: Vec::new(),
            absolute_matrix: Vec::new(),
            effective_visible: Vec::new(),
            layout_mode: Vec::new(),
            layout_state: Vec::new(),
            cache: Vec::new(),
            budget: CacheBudget::new(config.cache),
            viewport_zoom: config.viewport_zoom,
            generation: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            traversal_order: Vec::new(),
            traversal_dirty: true,
            pending_added: Vec::new(),
            pending_removed: Vec::new(),
            frame_index: 0,
            observers: Observers::default(),
            tracer: Tracer::none(),
            config,
        }
    }

    /// Returns the configuration the scene was created with.
    #[must_use]
    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// Installs a trace sink, returning the previous one.
    ///
    /// Events are only delivered when the `trace` feature is enabled.
    pub fn set_trace_sink(&mut self, sink: Box<dyn TraceSink>) -> Option<Box<dyn TraceSink>> {
        self.tracer.set_sink(sink)
    }

    /// Removes and returns the installed trace sink.
    pub fn take_trace_sink(&mut self) -> Option<Box<dyn TraceSink>> {
        self.tracer.take_sink()
    }

    // -- Allocation API --

    /// Creates a leaf shape and applies `options` to it.
    pub fn create_leaf(&mut self, options: &NodeOptions) -> NodeId {
        let id = self.allocate(NodeKind::Leaf, LayoutMode::Fixed);
        let _ = self.apply_options(id.idx, options);
        id
    }

    /// Creates an empty group with the given layout discipline and applies
    /// `options` to it.
    pub fn create_group(&mut self, mode: LayoutMode, options: &NodeOptions) -> NodeId {
        let id = self.allocate(NodeKind::Group, mode);
        let _ = self.apply_options(id.idx, options);
        id
    }

    fn allocate(&mut self, kind: NodeKind, mode: LayoutMode) -> NodeId {
        let caching = self.config.object_caching;
        let idx = if let Some(idx) = self.free_list.pop() {
            // Reuse a freed slot.
            let i = idx as usize;
            self.parent[i] = INVALID;
            self.first_child[i] = INVALID;
            self.next_sibling[i] = INVALID;
            self.prev_sibling[i] = INVALID;
            self.kind[i] = kind;
            self.placement[i] = Placement::DEFAULT;
            self.size[i] = Size::ZERO;
            self.stroke_width[i] = 0.0;
            self.visible[i] = true;
            self.matrix_state[i] = MatrixState::MatrixDirty;
            self.own_matrix[i] = Affine::IDENTITY;
            self.absolute_matrix[i] = Affine::IDENTITY;
            self.effective_visible[i] = true;
            self.layout_mode[i] = mode;
            self.layout_state[i] = LayoutState::Idle;
            self.cache[i] = CacheEntry::new(caching);
            idx
        } else {
            // Allocate a new slot.
            let idx = self.len;
            self.len += 1;
            self.parent.push(INVALID);
            self.first_child.push(INVALID);
            self.next_sibling.push(INVALID);
            self.prev_sibling.push(INVALID);
            self.kind.push(kind);
            self.placement.push(Placement::DEFAULT);
            self.size.push(Size::ZERO);
            self.stroke_width.push(0.0);
            self.visible.push(true);
            self.matrix_state.push(MatrixState::MatrixDirty);
            self.own_matrix.push(Affine::IDENTITY);
            self.absolute_matrix.push(Affine::IDENTITY);
            self.effective_visible.push(true);
            self.layout_mode.push(mode);
            self.layout_state.push(LayoutState::Idle);
            self.cache.push(CacheEntry::new(caching));
            self.generation.push(0);
            idx
        };

        self.traversal_dirty = true;
        self.pending_added.push(idx);
        self.dirty.mark(idx, dirty::TOPOLOGY);
        self.dirty.mark(idx, dirty::TRANSFORM);

        NodeId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Destroys a node, freeing its slot for reuse.
    ///
    /// A node still inside a group is removed from it first (the group is
    /// laid out again). The node's cache allocation is returned to the budget
    /// and all its subscriptions are dropped.
    ///
    /// # Panics
    ///
    /// Panics if the node has children (remove them first) or if the handle
    /// is stale.
    pub fn destroy_node(&mut self, id: NodeId) {
        self.validate(id);
        let idx = id.idx;
        assert!(
            self.first_child[idx as usize] == INVALID,
            "cannot destroy node with children"
        );

        let p = self.parent[idx as usize];
        if p != INVALID {
            self.unlink_from_parent(idx);
            self.dirty.mark(p, dirty::TOPOLOGY);
            let _ = self.invalidate_upward(p, PropertySet::single(PropertyName::Content));
            self.run_layout_chain(p);
        }

        let _ = self.release_cache_at(idx);
        self.observers.drop_node(idx);

        // Remove dirty tracking dependencies.
        self.dirty.remove_key(idx);

        // Bump generation so old handles immediately fail validation.
        self.generation[idx as usize] += 1;

        self.free_list.push(idx);
        self.traversal_dirty = true;
        self.pending_removed.push(idx);
        self.dirty.mark(idx, dirty::TOPOLOGY);
    }

    /// Returns whether the given handle refers to a live node.
    #[must_use]
    pub fn is_alive(&self, id: NodeId) -> bool {
        (id.idx < self.len)
            && self.generation[id.idx as usize] == id.generation
            && !self.free_list.contains(&id.idx)
    }

    /// Returns the variant of a node.
    #[must_use]
    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.validate(id);
        self.kind[id.idx as usize]
    }

    // -- Topology API --

    /// Adds `child` as the topmost child of `group`.
    ///
    /// The child keeps its on-screen placement: its absolute matrix is
    /// re-expressed in the group's local space. A fit-content group is then
    /// laid out again.
    ///
    /// # Errors
    ///
    /// - [`SceneError::NotAGroup`] if `group` is a leaf.
    /// - [`SceneError::AlreadyParented`] if `child` already has a parent.
    /// - [`SceneError::CyclicHierarchy`] if `child` is `group` or one of its
    ///   ancestors.
    /// - [`SceneError::SingularMatrix`] if the group's absolute matrix cannot
    ///   be inverted.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale.
    pub fn add_child(&mut self, group: NodeId, child: NodeId) -> Result<()> {
        self.validate(group);
        self.validate(child);
        self.attach(group.idx, child.idx, INVALID)
    }

    /// Inserts `child` directly below `sibling` in `sibling`'s group.
    ///
    /// # Errors
    ///
    /// [`SceneError::NoParent`] if `sibling` is not in a group, otherwise as
    /// for [`add_child`](Self::add_child).
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale.
    pub fn insert_before(&mut self, child: NodeId, sibling: NodeId) -> Result<()> {
        self.validate(child);
        self.validate(sibling);
        let p = self.parent[sibling.idx as usize];
        if p == INVALID {
            return Err(SceneError::NoParent { node: sibling.idx });
        }
        self.attach(p, child.idx, sibling.idx)
    }

    /// Removes `child` from its group.
    ///
    /// The child keeps its on-screen placement: its absolute matrix becomes
    /// its own placement. A fit-content group is then laid out again.
    ///
    /// # Errors
    ///
    /// [`SceneError::NoParent`] if the node is not in a group.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn remove_child(&mut self, child: NodeId) -> Result<()> {
        self.validate(child);
        let c = child.idx;
        let p = self.parent[c as usize];
        if p == INVALID {
            return Err(SceneError::NoParent { node: c });
        }
        let absolute = self.resolve_absolute(c)?;

        self.unlink_from_parent(c);
        self.dirty.remove_dependency(c, p, dirty::TRANSFORM);
        self.place_from_matrix(c, absolute);
        self.mark_absolute_dirty_subtree(c);
        self.traversal_dirty = true;
        self.dirty.mark(p, dirty::TOPOLOGY);

        let _ = self.invalidate_upward(p, PropertySet::single(PropertyName::Content));
        self.run_layout_chain(p);
        Ok(())
    }

    /// Moves `child` into `group`, removing it from its current group first.
    ///
    /// # Errors
    ///
    /// As for [`add_child`](Self::add_child), except that an existing parent is
    /// not an error. All checks run before the child is detached.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale.
    pub fn reparent(&mut self, child: NodeId, group: NodeId) -> Result<()> {
        self.validate(child);
        self.validate(group);
        let (c, g) = (child.idx, group.idx);
        self.check_group(g)?;
        self.check_acyclic(g, c)?;
        // Layout of the old group only translates `group`, so invertibility
        // is the same before and after the removal.
        let group_abs = self.resolve_absolute(g)?;
        let _ = matrix::invert(group_abs)?;

        if self.parent[c as usize] != INVALID {
            self.remove_child(child)?;
        }
        self.attach(g, c, INVALID)
    }

    /// Returns the group containing a node, if any.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.validate(id);
        let p = self.parent[id.idx as usize];
        (p != INVALID).then(|| self.id_at(p))
    }

    /// Returns an iterator over the direct children of a node, back to front.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Children<'_> {
        self.validate(id);
        Children::new(self, self.first_child[id.idx as usize])
    }

    /// Returns the nodes that have no parent, in slot order.
    #[must_use]
    pub fn roots(&self) -> Vec<NodeId> {
        (0..self.len)
            .filter(|&idx| self.parent[idx as usize] == INVALID && !self.free_list.contains(&idx))
            .map(|idx| self.id_at(idx))
            .collect()
    }

    // -- Property getters --

    /// Returns the placement properties of a node.
    #[must_use]
    pub fn placement(&self, id: NodeId) -> Placement {
        self.validate(id);
        self.placement[id.idx as usize]
    }

    /// Returns the intrinsic (unscaled) size of a node.
    #[must_use]
    pub fn size(&self, id: NodeId) -> Size {
        self.validate(id);
        self.size[id.idx as usize]
    }

    /// Returns the stroke width of a node.
    #[must_use]
    pub fn stroke_width(&self, id: NodeId) -> f64 {
        self.validate(id);
        self.stroke_width[id.idx as usize]
    }

    /// Returns the node's own visibility flag.
    #[must_use]
    pub fn visible(&self, id: NodeId) -> bool {
        self.validate(id);
        self.visible[id.idx as usize]
    }

    /// Returns the non-transformed box size: intrinsic size plus stroke width.
    #[must_use]
    pub fn box_size(&self, id: NodeId) -> Size {
        self.validate(id);
        self.box_size_at(id.idx)
    }

    // -- Mutation API (auto-marks dirty) --

    /// Applies a partial property update and returns the properties whose
    /// value actually changed.
    ///
    /// Geometry changes mark the node's matrix dirty, cascade to descendants,
    /// notify bounds observers, and lay out the containing fit-content group.
    /// Changes in the node's cache-affecting set invalidate its render cache,
    /// and any change invalidates the caches of caching ancestors.
    pub fn set(&mut self, id: NodeId, options: &NodeOptions) -> PropertySet {
        self.validate(id);
        let idx = id.idx;
        let changed = self.apply_options(idx, options);
        self.properties_changed(idx, changed);
        changed
    }

    // -- Observers --

    /// Subscribes `observer` to notifications about `id`.
    pub fn subscribe(&mut self, id: NodeId, observer: Box<dyn NodeObserver>) -> SubscriptionId {
        self.validate(id);
        self.observers.subscribe(id.idx, observer)
    }

    /// Drops a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&mut self, subscription: SubscriptionId) -> bool {
        self.observers.unsubscribe(subscription)
    }

    /// Returns the number of live subscriptions on `id`.
    #[must_use]
    pub fn subscription_count(&self, id: NodeId) -> usize {
        self.validate(id);
        self.observers.count(id.idx)
    }

    // -- Raw-index accessors for the render pass --
    //
    // These accept raw slot indices (as found in `FrameChanges` or
    // `traversal_order()`) rather than `NodeId` handles, skipping generation
    // validation. Matrix values are only current after `evaluate`.

    /// Returns the live handle for raw slot `idx`.
    #[must_use]
    pub fn id_at(&self, idx: u32) -> NodeId {
        NodeId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Returns the variant at raw slot `idx`.
    #[must_use]
    pub fn kind_at(&self, idx: u32) -> NodeKind {
        self.kind[idx as usize]
    }

    /// Returns the own matrix at raw slot `idx` as of the last evaluation.
    #[must_use]
    pub fn own_matrix_at(&self, idx: u32) -> Affine {
        self.own_matrix[idx as usize]
    }

    /// Returns the absolute matrix at raw slot `idx` as of the last evaluation.
    #[must_use]
    pub fn absolute_matrix_at(&self, idx: u32) -> Affine {
        self.absolute_matrix[idx as usize]
    }

    /// Returns whether the node and all its ancestors are visible, as of the
    /// last evaluation.
    #[must_use]
    pub fn effective_visible_at(&self, idx: u32) -> bool {
        self.effective_visible[idx as usize]
    }

    /// Returns the non-transformed box size at raw slot `idx`.
    #[must_use]
    pub fn box_size_at(&self, idx: u32) -> Size {
        let size = self.size[idx as usize];
        let stroke = self.stroke_width[idx as usize];
        Size::new(size.width + stroke, size.height + stroke)
    }

    /// Returns the first child at raw slot `idx`, or [`INVALID`].
    #[must_use]
    pub fn first_child_at(&self, idx: u32) -> u32 {
        self.first_child[idx as usize]
    }

    /// Returns the next sibling at raw slot `idx`, or [`INVALID`].
    #[must_use]
    pub fn next_sibling_at(&self, idx: u32) -> u32 {
        self.next_sibling[idx as usize]
    }

    // -- Internal helpers --

    /// Panics if the handle is stale.
    pub(crate) fn validate(&self, id: NodeId) {
        assert!(
            id.idx < self.len && self.generation[id.idx as usize] == id.generation,
            "stale NodeId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }

    fn check_group(&self, g: u32) -> Result<()> {
        if self.kind[g as usize] == NodeKind::Group {
            Ok(())
        } else {
            Err(SceneError::NotAGroup { node: g })
        }
    }

    /// Fails if `c` is `g` or one of its ancestors.
    fn check_acyclic(&self, g: u32, c: u32) -> Result<()> {
        if g == c || self.ancestors(g).any(|a| a == c) {
            Err(SceneError::CyclicHierarchy { node: c })
        } else {
            Ok(())
        }
    }

    /// Links `c` into `g` before `before` (or on top when [`INVALID`]),
    /// preserving the child's absolute placement.
    fn attach(&mut self, g: u32, c: u32, before: u32) -> Result<()> {
        self.check_group(g)?;
        if self.parent[c as usize] != INVALID {
            return Err(SceneError::AlreadyParented { node: c });
        }
        self.check_acyclic(g, c)?;
        let child_abs = self.resolve_absolute(c)?;
        let group_abs = self.resolve_absolute(g)?;
        let local = matrix::multiply(matrix::invert(group_abs)?, child_abs);

        self.link(c, g, before);
        self.place_from_matrix(c, local);
        self.mark_absolute_dirty_subtree(c);
        // Child depends on parent for TRANSFORM.
        let _ = self.dirty.add_dependency(c, g, dirty::TRANSFORM);
        self.traversal_dirty = true;
        self.dirty.mark(g, dirty::TOPOLOGY);

        let _ = self.invalidate_upward(g, PropertySet::single(PropertyName::Content));
        self.run_layout_chain(g);
        Ok(())
    }

    fn link(&mut self, c: u32, p: u32, before: u32) {
        self.parent[c as usize] = p;
        if before == INVALID {
            self.prev_sibling[c as usize] = INVALID;
            self.next_sibling[c as usize] = INVALID;
            let last = self.last_child(p);
            if last == INVALID {
                self.first_child[p as usize] = c;
            } else {
                self.next_sibling[last as usize] = c;
                self.prev_sibling[c as usize] = last;
            }
        } else {
            let prev = self.prev_sibling[before as usize];
            self.next_sibling[c as usize] = before;
            self.prev_sibling[c as usize] = prev;
            if prev != INVALID {
                self.next_sibling[prev as usize] = c;
            } else {
                // `before` was the first child.
                self.first_child[p as usize] = c;
            }
            self.prev_sibling[before as usize] = c;
        }
    }

    /// Removes `idx` from its parent's child list without touching dirty state.
    fn unlink_from_parent(&mut self, idx: u32) {
        let p = self.parent[idx as usize];
        let prev = self.prev_sibling[idx as usize];
        let next = self.next_sibling[idx as usize];

        if prev != INVALID {
            self.next_sibling[prev as usize] = next;
        } else {
            // Was first child.
            self.first_child[p as usize] = next;
        }

        if next != INVALID {
            self.prev_sibling[next as usize] = prev;
        }

        self.parent[idx as usize] = INVALID;
        self.prev_sibling[idx as usize] = INVALID;
        self.next_sibling[idx as usize] = INVALID;
    }

    /// Rewrites the placement of `idx` so that its own matrix equals `m`.
    ///
    /// The canonical decomposition is used, so shear ends up in `skew_x` and
    /// mirroring in `flip_y`.
    pub(crate) fn place_from_matrix(&mut self, idx: u32, m: Affine) {
        let props = matrix::decompose(m);
        let p = &mut self.placement[idx as usize];
        p.scale_x = props.scale_x;
        p.scale_y = props.scale_y;
        p.skew_x = props.skew_x;
        p.skew_y = props.skew_y;
        p.angle = props.angle;
        p.flip_x = props.flip_x;
        p.flip_y = props.flip_y;
        self.set_center(idx, Point::new(props.translate_x, props.translate_y));
        self.mark_matrix_dirty(idx);
        let id = self.id_at(idx);
        self.observers.bounds_changed(id);
    }

    /// Writes `options` into the slot and returns what changed.
    pub(crate) fn apply_options(&mut self, idx: u32, options: &NodeOptions) -> PropertySet {
        fn update<T: PartialEq + Copy>(
            slot: &mut T,
            value: Option<T>,
            name: PropertyName,
            changed: &mut PropertySet,
        ) {
            if let Some(v) = value {
                if *slot != v {
                    *slot = v;
                    changed.insert(name);
                }
            }
        }
        fn non_negative(v: f64) -> f64 {
            if v > 0.0 { v } else { 0.0 }
        }

        let i = idx as usize;
        let mut changed = PropertySet::EMPTY;
        let p = &mut self.placement[i];
        update(&mut p.left, options.left, PropertyName::Left, &mut changed);
        update(&mut p.top, options.top, PropertyName::Top, &mut changed);
        let scale_x = options.scale_x.map(non_negative);
        let scale_y = options.scale_y.map(non_negative);
        update(&mut p.scale_x, scale_x, PropertyName::ScaleX, &mut changed);
        update(&mut p.scale_y, scale_y, PropertyName::ScaleY, &mut changed);
        update(&mut p.skew_x, options.skew_x, PropertyName::SkewX, &mut changed);
        update(&mut p.skew_y, options.skew_y, PropertyName::SkewY, &mut changed);
        update(&mut p.angle, options.angle, PropertyName::Angle, &mut changed);
        update(&mut p.flip_x, options.flip_x, PropertyName::FlipX, &mut changed);
        update(&mut p.flip_y, options.flip_y, PropertyName::FlipY, &mut changed);
        update(&mut p.origin_x, options.origin_x, PropertyName::OriginX, &mut changed);
        update(&mut p.origin_y, options.origin_y, PropertyName::OriginY, &mut changed);

        let s = &mut self.size[i];
        update(&mut s.width, options.width.map(non_negative), PropertyName::Width, &mut changed);
        update(&mut s.height, options.height.map(non_negative), PropertyName::Height, &mut changed);
        update(
            &mut self.stroke_width[i],
            options.stroke_width.map(non_negative),
            PropertyName::StrokeWidth,
            &mut changed,
        );
        update(&mut self.visible[i], options.visible, PropertyName::Visible, &mut changed);

        if let Some(enabled) = options.object_caching {
            self.set_caching_enabled(idx, enabled);
        }
        if changed.intersects(PropertySet::GEOMETRY) {
            self.mark_matrix_dirty(idx);
        }
        changed
    }

    /// Runs the invalidation and layout consequences of a property update.
    pub(crate) fn properties_changed(&mut self, idx: u32, changed: PropertySet) {
        if changed.is_empty() {
            return;
        }
        let geometry = changed.intersects(PropertySet::GEOMETRY);
        if geometry {
            let id = self.id_at(idx);
            self.observers.bounds_changed(id);
        }
        if changed.contains(PropertyName::Visible) {
            self.dirty.mark_with(idx, dirty::TRANSFORM, &EagerPolicy);
        }
        let _ = self.invalidate_for_change(idx, changed);

        if geometry {
            let own_frame_derived = self.is_fit_content_group(idx)
                && self.first_child[idx as usize] != INVALID
                && changed.intersects(super::layout::RESIZE);
            if own_frame_derived {
                self.run_layout_chain(idx);
            } else {
                let p = self.parent[idx as usize];
                if p != INVALID {
                    self.run_layout_chain(p);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    fn leaf(scene: &mut Scene, left: f64, top: f64) -> NodeId {
        scene.create_leaf(&NodeOptions::new().position(left, top).size(10.0, 10.0))
    }

    #[test]
    fn create_and_destroy() {
        let mut scene = Scene::new();
        let id = leaf(&mut scene, 0.0, 0.0);
        assert!(scene.is_alive(id));
        scene.destroy_node(id);
        assert!(!scene.is_alive(id));
    }

    #[test]
    fn generation_prevents_stale_access() {
        let mut scene = Scene::new();
        let id1 = leaf(&mut scene, 0.0, 0.0);
        scene.destroy_node(id1);
        let id2 = leaf(&mut scene, 0.0, 0.0);
        // id2 reuses the same slot but has a different generation.
        assert!(!scene.is_alive(id1));
        assert!(scene.is_alive(id2));
        assert_eq!(id1.idx, id2.idx);
        assert_ne!(id1.generation, id2.generation);
    }

    #[test]
    fn reused_slot_starts_from_defaults() {
        let mut scene = Scene::new();
        let id1 = scene.create_leaf(&NodeOptions::new().angle(30.0).size(4.0, 4.0));
        scene.destroy_node(id1);
        let id2 = scene.create_leaf(&NodeOptions::new());
        assert_eq!(scene.placement(id2), Placement::DEFAULT);
        assert_eq!(scene.size(id2), Size::ZERO);
    }

    #[test]
    fn options_are_clamped_and_reported() {
        let mut scene = Scene::new();
        let id = scene.create_leaf(&NodeOptions::new());
        let changed = scene.set(id, &NodeOptions::new().scale(-2.0, 3.0).size(-1.0, 5.0));
        assert_eq!(scene.placement(id).scale_x, 0.0);
        assert_eq!(scene.placement(id).scale_y, 3.0);
        assert_eq!(scene.size(id), Size::new(0.0, 5.0));
        assert!(changed.contains(PropertyName::ScaleX));
        assert!(changed.contains(PropertyName::Height));
        assert!(!changed.contains(PropertyName::Width), "0 -> 0 is not a change");
    }

    #[test]
    fn add_child_and_query() {
        let mut scene = Scene::new();
        let group = scene.create_group(LayoutMode::Fixed, &NodeOptions::new());
        let child1 = leaf(&mut scene, 0.0, 0.0);
        let child2 = leaf(&mut scene, 5.0, 0.0);

        scene.add_child(group, child1).unwrap();
        scene.add_child(group, child2).unwrap();

        assert_eq!(scene.parent(child1), Some(group));
        assert_eq!(scene.parent(child2), Some(group));

        let kids: Vec<_> = scene.children(group).collect();
        assert_eq!(kids, vec![child1, child2]);
    }

    #[test]
    fn remove_child_works() {
        let mut scene = Scene::new();
        let group = scene.create_group(LayoutMode::Fixed, &NodeOptions::new());
        let child = leaf(&mut scene, 0.0, 0.0);

        scene.add_child(group, child).unwrap();
        scene.remove_child(child).unwrap();
        assert_eq!(scene.parent(child), None);
        assert!(scene.children(group).next().is_none());
        assert_eq!(
            scene.remove_child(child),
            Err(SceneError::NoParent { node: child.idx })
        );
    }

    #[test]
    fn insert_before_works() {
        let mut scene = Scene::new();
        let group = scene.create_group(LayoutMode::Fixed, &NodeOptions::new());
        let a = leaf(&mut scene, 0.0, 0.0);
        let b = leaf(&mut scene, 0.0, 0.0);
        let c = leaf(&mut scene, 0.0, 0.0);

        scene.add_child(group, a).unwrap();
        scene.add_child(group, c).unwrap();
        scene.insert_before(b, c).unwrap();

        let kids: Vec<_> = scene.children(group).collect();
        assert_eq!(kids, vec![a, b, c]);

        let loose = leaf(&mut scene, 0.0, 0.0);
        let other = leaf(&mut scene, 0.0, 0.0);
        assert_eq!(
            scene.insert_before(loose, other),
            Err(SceneError::NoParent { node: other.idx })
        );
    }

    #[test]
    fn reparent_works() {
        let mut scene = Scene::new();
        let g1 = scene.create_group(LayoutMode::Fixed, &NodeOptions::new());
        let g2 = scene.create_group(LayoutMode::Fixed, &NodeOptions::new());
        let child = leaf(&mut scene, 0.0, 0.0);

        scene.add_child(g1, child).unwrap();
        scene.reparent(child, g2).unwrap();
        assert_eq!(scene.parent(child), Some(g2));
        assert!(scene.children(g1).next().is_none());
    }

    #[test]
    fn membership_errors() {
        let mut scene = Scene::new();
        let outer = scene.create_group(LayoutMode::Fixed, &NodeOptions::new());
        let inner = scene.create_group(LayoutMode::Fixed, &NodeOptions::new());
        let a = leaf(&mut scene, 0.0, 0.0);
        let b = leaf(&mut scene, 0.0, 0.0);

        assert_eq!(
            scene.add_child(a, b),
            Err(SceneError::NotAGroup { node: a.idx })
        );
        scene.add_child(outer, inner).unwrap();
        scene.add_child(inner, a).unwrap();
        assert_eq!(
            scene.add_child(outer, a),
            Err(SceneError::AlreadyParented { node: a.idx })
        );
        assert_eq!(
            scene.reparent(outer, inner),
            Err(SceneError::CyclicHierarchy { node: outer.idx })
        );
        assert_eq!(
            scene.reparent(outer, outer),
            Err(SceneError::CyclicHierarchy { node: outer.idx })
        );
        // The failed reparent left the tree untouched.
        assert_eq!(scene.parent(inner), Some(outer));
    }

    #[test]
    fn add_to_singular_group_fails_without_linking() {
        let mut scene = Scene::new();
        let group = scene.create_group(LayoutMode::Fixed, &NodeOptions::new().scale(0.0, 1.0));
        let child = leaf(&mut scene, 0.0, 0.0);
        assert!(matches!(
            scene.add_child(group, child),
            Err(SceneError::SingularMatrix { .. })
        ));
        assert_eq!(scene.parent(child), None);
    }

    #[test]
    fn roots_returns_parentless_nodes() {
        let mut scene = Scene::new();
        let a = scene.create_group(LayoutMode::Fixed, &NodeOptions::new());
        let b = leaf(&mut scene, 0.0, 0.0);
        let c = leaf(&mut scene, 0.0, 0.0);

        scene.add_child(a, c).unwrap();

        let roots = scene.roots();
        assert!(roots.contains(&a));
        assert!(roots.contains(&b));
        assert!(!roots.contains(&c));
    }

    #[test]
    #[should_panic(expected = "cannot destroy node with children")]
    fn destroy_with_children_panics() {
        let mut scene = Scene::new();
        let group = scene.create_group(LayoutMode::Fixed, &NodeOptions::new());
        let child = leaf(&mut scene, 0.0, 0.0);
        scene.add_child(group, child).unwrap();
        scene.destroy_node(group);
    }

    #[test]
    fn destroy_detaches_from_group() {
        let mut scene = Scene::new();
        let group = scene.create_group(LayoutMode::FitContent, &NodeOptions::new());
        let child = leaf(&mut scene, 0.0, 0.0);
        scene.add_child(group, child).unwrap();
        scene.destroy_node(child);
        assert!(scene.children(group).next().is_none());
        assert_eq!(scene.size(group), Size::ZERO);
    }

    #[test]
    #[should_panic(expected = "stale NodeId")]
    fn destroyed_handle_panics_on_set() {
        let mut scene = Scene::new();
        let id = leaf(&mut scene, 0.0, 0.0);
        scene.destroy_node(id);
        let _ = scene.set(id, &NodeOptions::new().angle(10.0));
    }

    #[test]
    #[should_panic(expected = "stale NodeId")]
    fn destroyed_handle_panics_on_add_child() {
        let mut scene = Scene::new();
        let group = scene.create_group(LayoutMode::Fixed, &NodeOptions::new());
        let id = leaf(&mut scene, 0.0, 0.0);
        scene.destroy_node(id);
        let _ = scene.add_child(group, id);
    }

    #[test]
    #[should_panic(expected = "stale NodeId")]
    fn destroyed_handle_panics_on_parent() {
        let mut scene = Scene::new();
        let id = leaf(&mut scene, 0.0, 0.0);
        scene.destroy_node(id);
        let _ = scene.parent(id);
    }
}
