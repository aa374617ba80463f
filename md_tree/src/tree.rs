//! Workspace-level API over the box tree: creation, bulk ingestion, cache
//! refresh, spatial queries, masking, cancellable parallel passes, and the
//! file-backing entry points.

use crate::controller::BoxController;
use crate::error::Error;
use crate::event::{MDEvent, MAX_ND};
use crate::extents::{ImplicitFunction, MDExtents};
use crate::io::EventFilePager;
use crate::node::{maybe_split_in_place, MDBox, MDNode};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::File;
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct WorkspaceConfig {
    pub directory: String,
    pub nd: usize,
    pub split_threshold: usize,
    pub max_depth: usize,
    /// Children per dimension when a leaf splits, uniform across dimensions.
    pub split_into: usize,
    /// Per-dimension override of `split_into`; must have `nd` entries.
    pub split_into_per_dim: Option<Vec<usize>>,
    /// Default extents range applied to every dimension of the root box.
    pub lower_extent: f32,
    pub upper_extent: f32,
    pub file_backed: bool,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        return Self {
            directory: "/tmp/md_tree".to_string(),
            nd: 3,
            split_threshold: 1000,
            max_depth: 20,
            split_into: 5,
            split_into_per_dim: None,
            lower_extent: -10.0,
            upper_extent: 10.0,
            file_backed: false,
        };
    }
}

impl WorkspaceConfig {
    pub fn from_file(filename: &str) -> Result<Self, Error> {
        let serialized = fs::read_to_string(filename)?;
        let deserialized: Self = serde_yaml::from_str(&serialized)
            .map_err(|e| Error::Config(format!("bad config file {}: {}", filename, e)))?;
        return Ok(deserialized);
    }

    pub fn to_file(&self, filename: &str) -> Result<(), Error> {
        let serialized = serde_yaml::to_string(&self)
            .map_err(|e| Error::Config(format!("unserializable config: {}", e)))?;
        let mut file = File::create(filename)?;
        file.write_all(serialized.as_bytes())?;
        Ok(())
    }

    pub fn get_events_filename(&self) -> String {
        return self.directory.clone() + "/events";
    }

    pub fn get_config_filename(&self) -> String {
        return self.directory.clone() + "/config.yaml";
    }
}

/// How a cancellable tree-wide pass ended. Cancellation is a distinct,
/// non-error outcome: already-processed leaves keep their finished state and
/// the tree stays structurally intact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    Completed { leaves_visited: u64 },
    Cancelled { leaves_visited: u64 },
}

impl PassOutcome {
    pub fn is_complete(&self) -> bool {
        return matches!(self, PassOutcome::Completed { .. });
    }
}

/// The multi-dimensional event workspace: a box tree plus its controller and
/// optional backing store.
///
/// Two phases must not overlap on the same subtree: bulk mutation (insertion,
/// correction passes) and read-only aggregation/query. The workspace's `&mut`
/// methods make that barrier discipline explicit at the type level.
#[derive(Debug)]
pub struct MDEventWorkspace {
    pub config: WorkspaceConfig,
    controller: BoxController,
    root: MDNode,
    backend: Option<Mutex<EventFilePager>>,
    progress: Arc<AtomicU64>,
}

impl MDEventWorkspace {
    /// Builds an empty workspace from a validated configuration. All
    /// configuration errors surface here and are fatal to this call only.
    pub fn create(config: WorkspaceConfig) -> Result<Self, Error> {
        let controller = BoxController::from_config(&config)?;

        if config.lower_extent >= config.upper_extent {
            return Err(Error::Config(format!(
                "default extents inverted: [{}, {})",
                config.lower_extent, config.upper_extent
            )));
        }
        let extents = MDExtents::uniform(config.nd, config.lower_extent, config.upper_extent)?;

        let backend = match controller.is_file_backed() {
            true => {
                fs::create_dir_all(&config.directory)?;
                config.to_file(&config.get_config_filename())?;
                Some(Mutex::new(EventFilePager::create(
                    &config.get_events_filename(),
                    config.nd,
                )?))
            }
            false => None,
        };

        let root = MDNode::Leaf(MDBox::new(extents, 0, controller.allocate_id()));

        info!(
            "created {}d workspace (split_threshold={}, max_depth={}, file_backed={})",
            config.nd, config.split_threshold, config.max_depth, config.file_backed
        );

        return Ok(Self {
            config,
            controller,
            root,
            backend,
            progress: Arc::new(AtomicU64::new(0)),
        });
    }

    /// Convenience constructor with default policy for `nd` dimensions.
    pub fn with_defaults(nd: usize) -> Result<Self, Error> {
        let mut config = WorkspaceConfig::default();
        config.nd = nd;
        return Self::create(config);
    }

    pub fn nd(&self) -> usize {
        return self.config.nd;
    }

    pub fn controller(&self) -> &BoxController {
        return &self.controller;
    }

    pub fn root(&self) -> &MDNode {
        return &self.root;
    }

    /// Inserts one event, splitting boxes along the insertion path as the
    /// controller dictates. Cached aggregates go stale until the next
    /// `refresh_cache`.
    pub fn add_event(&mut self, event: MDEvent) {
        self.root.add_event(event, &self.controller);
        maybe_split_in_place(&mut self.root, &self.controller);
    }

    /// Bulk ingestion entry point used by loaders: events go straight to
    /// their leaves, then one tree-wide split pass converts whatever
    /// overflowed. Cheaper than per-event split checks for large fills.
    pub fn add_events(&mut self, events: &[MDEvent]) {
        self.root.add_events(events);
        self.split_all_if_needed();
    }

    /// Recomputes every cached aggregate bottom-up. Call once per bulk
    /// mutation phase, not per event.
    pub fn refresh_cache(&mut self) {
        self.root.refresh_cache();
    }

    /// Parallel variant; same result, sibling subtrees refreshed on the
    /// rayon pool.
    pub fn refresh_cache_parallel(&mut self) {
        self.root.refresh_cache_parallel();
    }

    pub fn num_events(&self) -> usize {
        return self.root.num_events();
    }

    pub fn signal(&self) -> f64 {
        return self.root.signal();
    }

    pub fn error_squared(&self) -> f64 {
        return self.root.error_squared();
    }

    /// The query primitive reduction and visualization build on: every
    /// descendant box intersecting the filter, by reference.
    pub fn get_boxes(
        &self,
        filter: Option<&dyn ImplicitFunction>,
        leaf_only: bool,
    ) -> Vec<&MDNode> {
        return self.get_boxes_to_depth(filter, usize::MAX, leaf_only);
    }

    pub fn get_boxes_to_depth(
        &self,
        filter: Option<&dyn ImplicitFunction>,
        max_depth: usize,
        leaf_only: bool,
    ) -> Vec<&MDNode> {
        let mut out = Vec::new();
        self.root.get_boxes(filter, max_depth, leaf_only, &mut out);
        return out;
    }

    pub fn get_leaves(&self) -> Vec<&MDNode> {
        return self.get_boxes(None, true);
    }

    /// Cached signal of the leaf responsible for `coords`.
    pub fn signal_at(&self, coords: &[f32]) -> f64 {
        let mut padded = [0f32; MAX_ND];
        padded[..coords.len().min(MAX_ND)]
            .copy_from_slice(&coords[..coords.len().min(MAX_ND)]);
        return self.root.leaf_containing(&padded).signal;
    }

    /// Converts any oversized leaf into a grid, tree-wide. Useful after bulk
    /// buffer fills that bypassed the per-insert checks.
    pub fn split_all_if_needed(&mut self) {
        self.root.split_all_if_needed(&self.controller);
    }

    /// Resets masking flags tree-wide.
    pub fn clear_masking(&mut self) {
        self.root.clear_masking();
    }

    /// Runs `f` over every leaf in parallel, polling `cancel` between leaves.
    /// Partial progress on cancellation is reported, not rolled back;
    /// idempotent reapplication is the caller's concern. The closure has no
    /// error channel, so passes that must reach evicted event buffers use
    /// [`for_each_leaf_events_mut`](Self::for_each_leaf_events_mut) instead.
    pub fn for_each_leaf_mut<F>(&mut self, f: F, cancel: &AtomicBool) -> PassOutcome
    where
        F: Fn(&mut MDBox) + Send + Sync,
    {
        self.progress.store(0, Ordering::Relaxed);
        self.root.for_each_leaf_mut(&f, cancel, &self.progress);

        let leaves_visited = self.progress.load(Ordering::Relaxed);
        return match cancel.load(Ordering::Relaxed) {
            true => PassOutcome::Cancelled { leaves_visited },
            false => PassOutcome::Completed { leaves_visited },
        };
    }

    /// Shareable completed-leaf counter for observing a running pass.
    pub fn progress_handle(&self) -> Arc<AtomicU64> {
        return Arc::clone(&self.progress);
    }

    /// Runs `f` over every leaf's event buffer, loading evicted buffers from
    /// the backing store first. Loaded leaves stay resident afterwards; call
    /// `evict_leaves` again to push them back out. Serial because backing-file
    /// reads must not interleave; I/O errors abort the walk, and a failed
    /// load leaves that leaf evicted and untouched.
    pub fn for_each_leaf_events_mut<F>(&mut self, mut f: F) -> Result<(), Error>
    where
        F: FnMut(&mut Vec<MDEvent>),
    {
        match &self.backend {
            Some(backend) => {
                let mut pager = backend.lock().expect("backing file mutex poisoned");
                self.root.try_for_each_leaf_mut(&mut |leaf: &mut MDBox| {
                    leaf.load_if_evicted(&mut *pager)?;
                    f(leaf.events_mut()?);
                    Ok(())
                })
            }
            None => self.root.try_for_each_leaf_mut(&mut |leaf: &mut MDBox| {
                f(leaf.events_mut()?);
                Ok(())
            }),
        }
    }

    /// Flushes every resident leaf buffer to the backing store and evicts it.
    /// Aggregates are refreshed per leaf first, so queries on cached values
    /// stay correct while the buffers live on disk. Returns events flushed.
    pub fn evict_leaves(&mut self) -> Result<usize, Error> {
        let backend = match &self.backend {
            Some(b) => b,
            None => return Err(Error::NotFileBacked),
        };
        let mut pager = backend.lock().expect("backing file mutex poisoned");

        let mut flushed = 0;
        self.root.try_for_each_leaf_mut(&mut |leaf: &mut MDBox| {
            flushed += leaf.evict(&mut *pager)?;
            Ok(())
        })?;

        return Ok(flushed);
    }

    /// Reloads every evicted leaf buffer. Returns the number of leaves
    /// loaded. A failed load aborts the walk leaving untouched leaves
    /// evicted; no leaf is ever left half-loaded.
    pub fn load_leaves(&mut self) -> Result<usize, Error> {
        let backend = match &self.backend {
            Some(b) => b,
            None => return Err(Error::NotFileBacked),
        };
        let mut pager = backend.lock().expect("backing file mutex poisoned");

        let mut loaded = 0;
        self.root.try_for_each_leaf_mut(&mut |leaf: &mut MDBox| {
            if leaf.load_if_evicted(&mut *pager)? {
                loaded += 1;
            }
            Ok(())
        })?;

        return Ok(loaded);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use kdam::tqdm;
    use rand::Rng;

    fn scenario_config() -> WorkspaceConfig {
        let mut config = WorkspaceConfig::default();
        config.nd = 2;
        config.split_threshold = 4;
        config.max_depth = 5;
        config.split_into = 2;
        config.lower_extent = 0.0;
        config.upper_extent = 10.0;
        return config;
    }

    fn event_at(signal: f64, coords: &[f32]) -> MDEvent {
        return MDEvent::new(signal, signal, coords);
    }

    #[test]
    fn quick_conservation_over_random_inserts() {
        let mut config = WorkspaceConfig::default();
        config.nd = 3;
        config.split_threshold = 50;

        let mut ws = MDEventWorkspace::create(config).unwrap();

        let mut rng = rand::thread_rng();
        let mut expected_signal = 0.0f64;
        let n = 20_000;

        for _ in tqdm!(0..n) {
            let mut event = MDEvent::random(3, -10.0, 10.0);
            event.signal = rng.gen_range(0.0..2.0);
            expected_signal += event.signal;
            ws.add_event(event);
        }

        ws.refresh_cache();
        assert_eq!(ws.num_events(), n);
        assert_approx_eq!(ws.signal(), expected_signal, 1e-6);
    }

    #[test]
    fn quick_parallel_refresh_matches_serial() {
        let mut config = WorkspaceConfig::default();
        config.nd = 2;
        config.split_threshold = 20;

        let mut ws = MDEventWorkspace::create(config).unwrap();
        for _ in 0..5000 {
            ws.add_event(MDEvent::random(2, -10.0, 10.0));
        }

        ws.refresh_cache();
        let serial = (ws.num_events(), ws.signal(), ws.error_squared());

        ws.refresh_cache_parallel();
        let parallel = (ws.num_events(), ws.signal(), ws.error_squared());

        assert_eq!(serial.0, parallel.0);
        assert_approx_eq!(serial.1, parallel.1, 1e-9);
        assert_approx_eq!(serial.2, parallel.2, 1e-9);
    }

    #[test]
    fn quick_every_leaf_contains_its_events() {
        let mut config = WorkspaceConfig::default();
        config.nd = 2;
        config.split_threshold = 10;

        let mut ws = MDEventWorkspace::create(config).unwrap();
        for _ in 0..3000 {
            ws.add_event(MDEvent::random(2, -10.0, 10.0));
        }

        let mut seen = 0;
        for node in ws.get_leaves() {
            if let MDNode::Leaf(leaf) = node {
                for event in leaf.events().unwrap() {
                    assert!(leaf
                        .extents
                        .contains_with_tolerance(&event.coords, crate::node::CONTAINMENT_REL_TOL));
                    seen += 1;
                }
            }
        }
        assert_eq!(seen, 3000);
    }

    #[test]
    fn quick_split_threshold_converts_root() {
        let mut ws = MDEventWorkspace::create(scenario_config()).unwrap();

        for i in 0..4 {
            ws.add_event(event_at(1.0, &[1.0 + i as f32 * 2.0, 3.0]));
        }
        assert!(ws.root().is_leaf());

        ws.add_event(event_at(1.0, &[8.0, 8.0]));
        assert!(!ws.root().is_leaf());

        ws.refresh_cache();
        assert_eq!(ws.num_events(), 5);

        if let MDNode::Grid(grid) = ws.root() {
            let total: usize = grid.children().iter().map(|c| c.num_events()).sum();
            assert_eq!(total, 5);
            for child in grid.children() {
                assert!(child.num_events() <= 5);
            }
        } else {
            panic!("root should have split");
        }
    }

    #[test]
    fn quick_concrete_2d_scenario() {
        let mut ws = MDEventWorkspace::create(scenario_config()).unwrap();

        ws.add_event(event_at(1.0, &[1.0, 1.0]));
        ws.add_event(event_at(1.0, &[1.0, 2.0]));
        ws.add_event(event_at(1.0, &[9.0, 9.0]));
        ws.add_event(event_at(1.0, &[9.0, 8.0]));
        ws.add_event(event_at(1.0, &[5.0, 5.0]));

        ws.refresh_cache();
        assert_eq!(ws.num_events(), 5);

        // 5 > 4 forces a root split into 2x2 children
        let grid = match ws.root() {
            MDNode::Grid(g) => g,
            MDNode::Leaf(_) => panic!("root should have split"),
        };
        assert_eq!(grid.children().len(), 4);

        // dimension 0 is the fastest-varying child index:
        //   child 0 = [0,5)x[0,5), child 3 = [5,10)x[5,10)
        // (1,1) and (1,2) land in child 0; (9,9), (9,8) and the boundary
        // point (5,5) all land in child 3 under the clamp-up routing rule.
        let counts: Vec<usize> = grid.children().iter().map(|c| c.num_events()).collect();
        assert_eq!(counts, vec![2, 0, 0, 3]);

        let child0 = &grid.children()[0];
        assert_eq!(child0.extents().min[0], 0.0);
        assert_eq!(child0.extents().max[0], 5.0);
        let child3 = &grid.children()[3];
        assert_eq!(child3.extents().min[0], 5.0);
        assert_eq!(child3.extents().max[1], 10.0);

        assert_eq!(ws.signal_at(&[1.0, 1.5]), 2.0);
        assert_eq!(ws.signal_at(&[7.0, 7.0]), 3.0);
    }

    #[test]
    fn quick_coincident_events_respect_depth_bound() {
        let _ = env_logger::builder().is_test(true).try_init();

        let mut config = scenario_config();
        config.split_threshold = 2;
        config.max_depth = 3;

        let mut ws = MDEventWorkspace::create(config).unwrap();
        for _ in 0..50 {
            ws.add_event(event_at(1.0, &[4.2, 4.2]));
        }

        ws.refresh_cache();
        assert_eq!(ws.num_events(), 50);

        for node in ws.get_leaves() {
            assert!(node.depth() <= 3);
        }
    }

    #[test]
    fn quick_refresh_is_idempotent() {
        let mut ws = MDEventWorkspace::create(scenario_config()).unwrap();
        for _ in 0..100 {
            ws.add_event(MDEvent::random(2, 0.0, 10.0));
        }

        ws.refresh_cache();
        let first = (ws.num_events(), ws.signal(), ws.error_squared());

        ws.refresh_cache();
        let second = (ws.num_events(), ws.signal(), ws.error_squared());

        assert_eq!(first.0, second.0);
        assert_eq!(first.1, second.1);
        assert_eq!(first.2, second.2);
    }

    #[test]
    fn quick_eviction_round_trip() {
        let mut config = scenario_config();
        config.file_backed = true;
        config.directory = "/tmp/md_tree_ws_evict".to_string();
        let _ = fs::remove_dir_all(&config.directory);

        let mut ws = MDEventWorkspace::create(config).unwrap();
        for _ in 0..200 {
            ws.add_event(MDEvent::random(2, 0.0, 10.0));
        }
        ws.refresh_cache();

        let mut before: Vec<(u64, Vec<MDEvent>)> = Vec::new();
        for node in ws.get_leaves() {
            if let MDNode::Leaf(leaf) = node {
                before.push((leaf.id, leaf.events().unwrap().to_vec()));
            }
        }

        let flushed = ws.evict_leaves().unwrap();
        assert_eq!(flushed, 200);

        for node in ws.get_leaves() {
            if let MDNode::Leaf(leaf) = node {
                assert!(!leaf.is_resident());
                assert!(leaf.events().is_err());
            }
        }

        // cached aggregates survive eviction
        ws.refresh_cache();
        assert_eq!(ws.num_events(), 200);

        ws.load_leaves().unwrap();

        let mut after: Vec<(u64, Vec<MDEvent>)> = Vec::new();
        for node in ws.get_leaves() {
            if let MDNode::Leaf(leaf) = node {
                assert!(leaf.is_resident());
                after.push((leaf.id, leaf.events().unwrap().to_vec()));
            }
        }
        assert_eq!(before, after);
    }

    #[test]
    fn quick_events_pass_reloads_evicted_buffers() {
        let mut config = scenario_config();
        config.file_backed = true;
        config.directory = "/tmp/md_tree_ws_reload".to_string();
        let _ = fs::remove_dir_all(&config.directory);

        let mut ws = MDEventWorkspace::create(config).unwrap();
        for _ in 0..100 {
            ws.add_event(event_at(1.0, &rand_coords()));
        }
        ws.refresh_cache();
        let baseline = ws.signal();

        ws.evict_leaves().unwrap();

        ws.for_each_leaf_events_mut(|events| {
            for event in events {
                event.signal *= 2.0;
            }
        })
        .unwrap();

        for node in ws.get_leaves() {
            if let MDNode::Leaf(leaf) = node {
                assert!(leaf.is_resident());
            }
        }

        ws.refresh_cache();
        assert_approx_eq!(ws.signal(), baseline * 2.0, 1e-9);
        assert_eq!(ws.num_events(), 100);
    }

    #[test]
    fn quick_bulk_ingest_splits_after_fill() {
        let mut ws = MDEventWorkspace::create(scenario_config()).unwrap();

        let events: Vec<MDEvent> = (0..2000).map(|_| MDEvent::random(2, 0.0, 10.0)).collect();
        ws.add_events(&events);

        ws.refresh_cache();
        assert_eq!(ws.num_events(), 2000);
        assert!(!ws.root().is_leaf());

        for node in ws.get_leaves() {
            if let MDNode::Leaf(leaf) = node {
                assert!(leaf.len() <= 4 || node.depth() == 5);
            }
        }
    }

    #[test]
    fn quick_masking_evicted_leaf_waits_for_reload() {
        let mut config = scenario_config();
        config.file_backed = true;
        config.directory = "/tmp/md_tree_ws_mask_evict".to_string();
        let _ = fs::remove_dir_all(&config.directory);

        let mut ws = MDEventWorkspace::create(config).unwrap();
        for _ in 0..100 {
            ws.add_event(event_at(1.0, &rand_coords()));
        }
        ws.refresh_cache();
        let baseline = ws.signal();

        ws.evict_leaves().unwrap();

        // masking an evicted leaf leaves its eviction-time cache in place
        let cancel = AtomicBool::new(false);
        ws.for_each_leaf_mut(|leaf| leaf.set_masked(true), &cancel);
        ws.refresh_cache();
        assert_approx_eq!(ws.signal(), baseline, 1e-9);

        ws.load_leaves().unwrap();
        ws.refresh_cache();
        assert_eq!(ws.signal(), 0.0);
        assert_eq!(ws.num_events(), 100);
    }

    #[test]
    fn quick_eviction_requires_backing_store() {
        let mut ws = MDEventWorkspace::create(scenario_config()).unwrap();
        match ws.evict_leaves() {
            Err(Error::NotFileBacked) => {}
            other => panic!("expected NotFileBacked, got {:?}", other),
        }
    }

    #[test]
    fn quick_correction_pass_and_cancellation() {
        let mut config = scenario_config();
        config.split_threshold = 8;

        let mut ws = MDEventWorkspace::create(config).unwrap();
        for _ in 0..500 {
            ws.add_event(event_at(1.0, &rand_coords()));
        }
        ws.refresh_cache();
        let baseline = ws.signal();

        // pre-cancelled pass touches nothing
        let cancel = AtomicBool::new(true);
        let outcome = ws.for_each_leaf_mut(
            |leaf| {
                for event in leaf.events_mut().unwrap() {
                    event.signal *= 2.0;
                }
            },
            &cancel,
        );
        assert_eq!(outcome, PassOutcome::Cancelled { leaves_visited: 0 });

        ws.refresh_cache();
        assert_approx_eq!(ws.signal(), baseline, 1e-9);

        // full pass doubles the total signal
        let cancel = AtomicBool::new(false);
        let outcome = ws.for_each_leaf_mut(
            |leaf| {
                for event in leaf.events_mut().unwrap() {
                    event.signal *= 2.0;
                }
            },
            &cancel,
        );
        assert!(outcome.is_complete());

        ws.refresh_cache_parallel();
        assert_approx_eq!(ws.signal(), baseline * 2.0, 1e-9);
        assert_eq!(ws.num_events(), 500);
    }

    #[test]
    fn quick_masking_cleared_workspace_wide() {
        let mut ws = MDEventWorkspace::create(scenario_config()).unwrap();
        for _ in 0..100 {
            ws.add_event(event_at(1.0, &rand_coords()));
        }

        let cancel = AtomicBool::new(false);
        ws.for_each_leaf_mut(|leaf| leaf.set_masked(true), &cancel);
        ws.refresh_cache();
        assert_eq!(ws.signal(), 0.0);
        assert_eq!(ws.num_events(), 100);

        ws.clear_masking();
        ws.refresh_cache();
        assert_approx_eq!(ws.signal(), 100.0, 1e-9);
    }

    #[test]
    fn quick_config_yaml_round_trip() {
        let dir = "/tmp/md_tree_ws_config";
        let _ = fs::remove_dir_all(dir);
        fs::create_dir_all(dir).unwrap();

        let mut config = scenario_config();
        config.split_into_per_dim = Some(vec![2, 3]);
        config.directory = dir.to_string();

        let filename = config.get_config_filename();
        config.to_file(&filename).unwrap();

        let back = WorkspaceConfig::from_file(&filename).unwrap();
        assert_eq!(back.nd, config.nd);
        assert_eq!(back.split_threshold, config.split_threshold);
        assert_eq!(back.split_into_per_dim, config.split_into_per_dim);
        assert_eq!(back.lower_extent, config.lower_extent);
    }

    #[test]
    fn quick_bad_config_rejected_at_creation() {
        let mut config = scenario_config();
        config.nd = 12;
        assert!(MDEventWorkspace::create(config).is_err());

        let mut config = scenario_config();
        config.lower_extent = 5.0;
        config.upper_extent = 5.0;
        assert!(MDEventWorkspace::create(config).is_err());
    }

    fn rand_coords() -> [f32; 2] {
        let mut rng = rand::thread_rng();
        return [rng.gen_range(0.0..10.0), rng.gen_range(0.0..10.0)];
    }
}
