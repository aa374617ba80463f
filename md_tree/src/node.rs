//! Holds the tree node variants: event-owning leaf boxes and grid boxes that
//! partition their extents into a uniform grid of children.
//!
//! A node starts life as a leaf. Once its event count passes the controller's
//! split threshold it is converted in place into a grid and its events are
//! re-routed into fresh leaf children; there is no merge back. Extents are
//! immutable after construction, only contents and cached aggregates mutate.
//!
//! Cached `signal`/`error_squared`/`num_events` are only valid after a
//! `refresh_cache` pass. Bulk insertion leaves them stale on purpose; that
//! staleness is part of the contract, not a bug.

use crate::controller::BoxController;
use crate::error::Error;
use crate::event::{MDEvent, MAX_ND};
use crate::extents::{ImplicitFunction, MDExtents};
use crate::io::EventBackend;
use log::warn;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Relative slack allowed when asserting that an event lands inside its leaf.
/// Routing clamps boundary coordinates into edge cells, so edge-cell events
/// may sit a rounding error outside the cell's exact bounds.
pub const CONTAINMENT_REL_TOL: f32 = 1e-4;

#[derive(Debug)]
pub enum MDNode {
    Leaf(MDBox),
    Grid(MDGridBox),
}

impl MDNode {
    pub fn id(&self) -> u64 {
        match self {
            MDNode::Leaf(b) => b.id,
            MDNode::Grid(g) => g.id,
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            MDNode::Leaf(b) => b.depth,
            MDNode::Grid(g) => g.depth,
        }
    }

    pub fn extents(&self) -> &MDExtents {
        match self {
            MDNode::Leaf(b) => &b.extents,
            MDNode::Grid(g) => &g.extents,
        }
    }

    pub fn signal(&self) -> f64 {
        match self {
            MDNode::Leaf(b) => b.signal,
            MDNode::Grid(g) => g.signal,
        }
    }

    pub fn error_squared(&self) -> f64 {
        match self {
            MDNode::Leaf(b) => b.error_squared,
            MDNode::Grid(g) => g.error_squared,
        }
    }

    pub fn num_events(&self) -> usize {
        match self {
            MDNode::Leaf(b) => b.num_events,
            MDNode::Grid(g) => g.num_events,
        }
    }

    pub fn is_leaf(&self) -> bool {
        return matches!(self, MDNode::Leaf(_));
    }

    /// Routes the event down to the leaf responsible for its coordinates.
    /// Splitting of the routed-into leaf happens on the way back up; callers
    /// inserting into a root leaf apply [`maybe_split_in_place`] themselves.
    pub fn add_event(&mut self, event: MDEvent, controller: &BoxController) {
        match self {
            MDNode::Leaf(leaf) => leaf.add_event(event),
            MDNode::Grid(grid) => grid.add_event(event, controller),
        }
    }

    /// Bulk insertion with no split checks along the way: events are routed
    /// straight to their leaves. Pair with
    /// [`split_all_if_needed`](Self::split_all_if_needed) once the fill is
    /// done.
    pub fn add_events(&mut self, events: &[MDEvent]) {
        match self {
            MDNode::Leaf(leaf) => leaf.add_events(events),
            MDNode::Grid(grid) => {
                for event in events {
                    let index = grid.route(&event.coords);
                    grid.children[index].add_events(std::slice::from_ref(event));
                }
            }
        }
    }

    /// Recomputes cached aggregates bottom-up. Calling it twice with no
    /// mutation in between yields identical values.
    pub fn refresh_cache(&mut self) {
        match self {
            MDNode::Leaf(leaf) => leaf.refresh_cache(),
            MDNode::Grid(grid) => grid.refresh_cache(),
        }
    }

    /// Same result as [`refresh_cache`](Self::refresh_cache) with sibling
    /// subtrees refreshed on the rayon pool. Each worker owns a disjoint
    /// subtree, so the cache writes never alias; the join is the only
    /// synchronization.
    pub fn refresh_cache_parallel(&mut self) {
        match self {
            MDNode::Leaf(leaf) => leaf.refresh_cache(),
            MDNode::Grid(grid) => {
                grid.children
                    .par_iter_mut()
                    .for_each(|child| child.refresh_cache_parallel());
                grid.sum_children();
            }
        }
    }

    /// Depth-first, depth-bounded collection of descendant boxes whose
    /// extents intersect the filter. Returns references in discovery order;
    /// callers must not depend on that order. A grid sitting at the depth
    /// bound is returned as the frontier box even in `leaf_only` mode.
    pub fn get_boxes<'a>(
        &'a self,
        filter: Option<&dyn ImplicitFunction>,
        max_depth_from_here: usize,
        leaf_only: bool,
        out: &mut Vec<&'a MDNode>,
    ) {
        if let Some(f) = filter {
            if !f.intersects(self.extents()) {
                return;
            }
        }

        match self {
            MDNode::Leaf(_) => out.push(self),
            MDNode::Grid(grid) => {
                if !leaf_only {
                    out.push(self);
                }
                if max_depth_from_here == 0 {
                    if leaf_only {
                        out.push(self);
                    }
                    return;
                }
                for child in &grid.children {
                    child.get_boxes(filter, max_depth_from_here - 1, leaf_only, out);
                }
            }
        }
    }

    /// Applies `f` to every leaf, fanning out across sibling subtrees on the
    /// rayon pool. The cancellation flag is polled before each leaf; already
    /// processed leaves keep their finished state. `progress` counts
    /// completed leaves for coarse external observation.
    pub fn for_each_leaf_mut<F>(&mut self, f: &F, cancel: &AtomicBool, progress: &AtomicU64)
    where
        F: Fn(&mut MDBox) + Send + Sync,
    {
        match self {
            MDNode::Leaf(leaf) => {
                if cancel.load(Ordering::Relaxed) {
                    return;
                }
                f(leaf);
                progress.fetch_add(1, Ordering::Relaxed);
            }
            MDNode::Grid(grid) => {
                grid.children
                    .par_iter_mut()
                    .for_each(|child| child.for_each_leaf_mut(f, cancel, progress));
            }
        }
    }

    /// Serial fallible leaf walk, used for backing-file traffic where writes
    /// to one file must not interleave.
    pub fn try_for_each_leaf_mut(
        &mut self,
        f: &mut dyn FnMut(&mut MDBox) -> Result<(), Error>,
    ) -> Result<(), Error> {
        match self {
            MDNode::Leaf(leaf) => f(leaf),
            MDNode::Grid(grid) => {
                for child in &mut grid.children {
                    child.try_for_each_leaf_mut(f)?;
                }
                Ok(())
            }
        }
    }

    /// Leaf responsible for `coords` under the routing rule.
    pub fn leaf_containing(&self, coords: &[f32; MAX_ND]) -> &MDBox {
        let mut current = self;
        loop {
            match current {
                MDNode::Leaf(leaf) => return leaf,
                MDNode::Grid(grid) => {
                    current = &grid.children[grid.route(coords)];
                }
            }
        }
    }

    /// Walks the tree converting any oversized leaf into a grid. Intended for
    /// use after bulk buffer fills that bypassed per-insert checks.
    pub fn split_all_if_needed(&mut self, controller: &BoxController) {
        maybe_split_in_place(self, controller);
        if let MDNode::Grid(grid) = self {
            for child in &mut grid.children {
                child.split_all_if_needed(controller);
            }
        }
    }

    pub fn is_masked(&self) -> bool {
        match self {
            MDNode::Leaf(leaf) => leaf.is_masked(),
            MDNode::Grid(grid) => grid.children.iter().all(|c| c.is_masked()),
        }
    }

    pub fn clear_masking(&mut self) {
        match self {
            MDNode::Leaf(leaf) => leaf.set_masked(false),
            MDNode::Grid(grid) => {
                for child in &mut grid.children {
                    child.clear_masking();
                }
            }
        }
    }
}

/// One-way, one-time leaf-to-grid transition, done in place so the parent's
/// child slot (and the box id) stay stable.
pub fn maybe_split_in_place(node: &mut MDNode, controller: &BoxController) {
    if let MDNode::Leaf(leaf) = node {
        if let Some(grid) = leaf.split_if_needed(controller) {
            *node = MDNode::Grid(grid);
        }
    }
}

/// Tree node directly owning a collection of events.
#[derive(Debug)]
pub struct MDBox {
    pub extents: MDExtents,
    pub depth: usize,
    pub id: u64,
    pub signal: f64,
    pub error_squared: f64,
    pub num_events: usize,
    events: Vec<MDEvent>,
    masked: bool,
    resident: bool,
    depth_warned: bool,
}

impl MDBox {
    pub fn new(extents: MDExtents, depth: usize, id: u64) -> Self {
        return Self {
            extents,
            depth,
            id,
            signal: 0.0,
            error_squared: 0.0,
            num_events: 0,
            events: Vec::new(),
            masked: false,
            resident: true,
            depth_warned: false,
        };
    }

    /// Appends one event. Cached aggregates are deliberately not updated;
    /// call `refresh_cache` before trusting them. The caller guarantees the
    /// coordinates belong to this box (violations are a routing bug upstream,
    /// caught here in debug builds only).
    pub fn add_event(&mut self, event: MDEvent) {
        debug_assert!(
            self.resident,
            "insertion into evicted box {} (load it first)",
            self.id
        );
        debug_assert!(
            self.extents
                .contains_with_tolerance(&event.coords, CONTAINMENT_REL_TOL),
            "event routed into box {} lies outside its extents",
            self.id
        );
        self.events.push(event);
    }

    /// Bulk variant of [`add_event`](Self::add_event), same caching deferral.
    pub fn add_events(&mut self, events: &[MDEvent]) {
        debug_assert!(self.resident);
        self.events.extend_from_slice(events);
    }

    /// Number of events currently buffered in memory.
    pub fn len(&self) -> usize {
        return self.events.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.events.is_empty();
    }

    /// One pass over the buffer recomputing the cached aggregates. Masked
    /// leaves contribute zero signal but their event count still counts.
    /// A refresh on an evicted leaf keeps the values cached at eviction time.
    pub fn refresh_cache(&mut self) {
        if !self.resident {
            return;
        }

        self.num_events = self.events.len();
        if self.masked {
            self.signal = 0.0;
            self.error_squared = 0.0;
            return;
        }

        let mut signal = 0.0;
        let mut error_squared = 0.0;
        for event in &self.events {
            signal += event.signal;
            error_squared += event.error_squared;
        }
        self.signal = signal;
        self.error_squared = error_squared;
    }

    /// Converts this leaf into a grid if the controller says so, moving every
    /// owned event into the correct child. Returns the replacement grid, or
    /// `None` when no split happens (under threshold, at max depth, or the
    /// buffer is evicted). The grid keeps this box's id.
    pub fn split_if_needed(&mut self, controller: &BoxController) -> Option<MDGridBox> {
        if !self.resident {
            return None;
        }

        if !controller.should_split(self.events.len(), self.depth) {
            // safety valve: clustered events at max depth stay in this leaf
            if self.events.len() > controller.split_threshold
                && self.depth >= controller.max_depth
                && !self.depth_warned
            {
                warn!(
                    "box {} at max depth {} holds {} events and will not split further",
                    self.id,
                    self.depth,
                    self.events.len()
                );
                self.depth_warned = true;
            }
            return None;
        }

        let events = std::mem::take(&mut self.events);
        let mut grid = MDGridBox::new(self.extents.clone(), self.depth, self.id, controller);
        for event in events {
            grid.add_event(event, controller);
        }

        return Some(grid);
    }

    /// Direct read access to the buffer; fails if it is evicted.
    pub fn events(&self) -> Result<&[MDEvent], Error> {
        match self.resident {
            true => Ok(&self.events),
            false => Err(Error::EventsNotResident(self.id)),
        }
    }

    /// Exclusive access for in-place mutation (e.g. a correction factor pass);
    /// fails if the buffer is evicted. The borrow is the release. Passes that
    /// must reach evicted buffers go through the workspace's
    /// `for_each_leaf_events_mut`, which loads them first.
    pub fn events_mut(&mut self) -> Result<&mut Vec<MDEvent>, Error> {
        match self.resident {
            true => Ok(&mut self.events),
            false => Err(Error::EventsNotResident(self.id)),
        }
    }

    /// Flushes the buffer to the backing store and drops it from memory.
    /// Aggregates are refreshed first so they stay valid while evicted.
    /// Returns the number of events flushed.
    pub fn evict(&mut self, backend: &mut dyn EventBackend) -> Result<usize, Error> {
        if !self.resident {
            return Ok(0);
        }

        self.refresh_cache();
        backend.flush(self.id, &self.events)?;

        let flushed = self.events.len();
        self.events = Vec::new();
        self.resident = false;

        return Ok(flushed);
    }

    /// Reloads an evicted buffer. Either the load fully succeeds and the box
    /// becomes resident again, or it fails and the box stays evicted.
    /// Returns whether a load actually happened.
    pub fn load_if_evicted(&mut self, backend: &mut dyn EventBackend) -> Result<bool, Error> {
        if self.resident {
            return Ok(false);
        }

        let events = backend.load(self.id)?;
        self.events = events;
        self.resident = true;

        return Ok(true);
    }

    pub fn is_resident(&self) -> bool {
        return self.resident;
    }

    /// Masking takes effect on the cached aggregates at the next
    /// `refresh_cache`. On an evicted leaf that refresh is deferred until the
    /// buffer is loaded again, so the cached values keep their eviction-time
    /// state until then.
    pub fn set_masked(&mut self, masked: bool) {
        self.masked = masked;
    }

    pub fn is_masked(&self) -> bool {
        return self.masked;
    }
}

/// Tree node owning a uniform N-dimensional grid of child boxes.
#[derive(Debug)]
pub struct MDGridBox {
    pub extents: MDExtents,
    pub depth: usize,
    pub id: u64,
    pub signal: f64,
    pub error_squared: f64,
    pub num_events: usize,
    split_into: Vec<usize>,
    cell_width: [f32; MAX_ND],
    children: Vec<MDNode>,
}

impl MDGridBox {
    /// Builds the grid with one empty leaf child per cell. Child extents
    /// evenly partition this box's extents; child depth is this depth + 1.
    pub fn new(extents: MDExtents, depth: usize, id: u64, controller: &BoxController) -> Self {
        let nd = extents.nd;

        let split_into: Vec<usize> = (0..nd).map(|d| controller.split_into(d)).collect();
        let mut cell_width = [0f32; MAX_ND];
        for d in 0..nd {
            cell_width[d] = extents.width(d) / split_into[d] as f32;
        }

        let num_cells = controller.num_cells();
        let mut children = Vec::with_capacity(num_cells);
        for flat in 0..num_cells {
            let cell = cell_of_flat(flat, &split_into);
            let sub = extents.cell_sub_extents(&split_into, &cell);
            children.push(MDNode::Leaf(MDBox::new(sub, depth + 1, controller.allocate_id())));
        }

        return Self {
            extents,
            depth,
            id,
            signal: 0.0,
            error_squared: 0.0,
            num_events: 0,
            split_into,
            cell_width,
            children,
        };
    }

    /// Flat child index for a coordinate, dimension 0 fastest.
    ///
    /// Per dimension: `floor((coord - min) / cell_width)` clamped into
    /// `[0, split_into - 1]`. A coordinate exactly on an interior boundary
    /// lands in the higher cell; one on or past the upper extent clamps to
    /// the last cell. The clamp absorbs floating-point boundary mismatch and
    /// is deliberate leniency, not silent data loss.
    pub fn route(&self, coords: &[f32; MAX_ND]) -> usize {
        let mut flat = 0usize;
        let mut stride = 1usize;

        for d in 0..self.extents.nd {
            let raw = ((coords[d] - self.extents.min[d]) / self.cell_width[d]).floor();
            let mut cell = raw as isize;
            if cell < 0 {
                cell = 0;
            }
            let last = self.split_into[d] as isize - 1;
            if cell > last {
                cell = last;
            }

            flat += cell as usize * stride;
            stride *= self.split_into[d];
        }

        return flat;
    }

    /// Routes the event to the right child and converts that child to a grid
    /// in place if the insertion pushed it past the split threshold.
    pub fn add_event(&mut self, event: MDEvent, controller: &BoxController) {
        let index = self.route(&event.coords);

        let inserted_into_leaf = match &mut self.children[index] {
            MDNode::Leaf(leaf) => {
                leaf.add_event(event);
                true
            }
            MDNode::Grid(grid) => {
                grid.add_event(event, controller);
                false
            }
        };

        if inserted_into_leaf {
            maybe_split_in_place(&mut self.children[index], controller);
        }
    }

    pub fn refresh_cache(&mut self) {
        for child in &mut self.children {
            child.refresh_cache();
        }
        self.sum_children();
    }

    fn sum_children(&mut self) {
        let mut signal = 0.0;
        let mut error_squared = 0.0;
        let mut num_events = 0;
        for child in &self.children {
            signal += child.signal();
            error_squared += child.error_squared();
            num_events += child.num_events();
        }
        self.signal = signal;
        self.error_squared = error_squared;
        self.num_events = num_events;
    }

    pub fn children(&self) -> &[MDNode] {
        return &self.children;
    }

    pub fn children_mut(&mut self) -> &mut [MDNode] {
        return &mut self.children;
    }

    pub fn split_into(&self, d: usize) -> usize {
        return self.split_into[d];
    }
}

fn cell_of_flat(flat: usize, split_into: &[usize]) -> [usize; MAX_ND] {
    let mut cell = [0usize; MAX_ND];
    let mut rem = flat;
    for (d, s) in split_into.iter().enumerate() {
        cell[d] = rem % s;
        rem /= s;
    }
    return cell;
}
