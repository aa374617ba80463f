//! Per-workspace split policy and box id allocation.
//!
//! One controller is shared by every box of a workspace. Insertion code only
//! reads it; the single concurrently-mutated piece of state is the id
//! counter, which is atomic so parallel splitting can allocate ids without a
//! lock.

use crate::error::Error;
use crate::event::MAX_ND;
use crate::tree::WorkspaceConfig;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug)]
pub struct BoxController {
    pub nd: usize,
    pub split_threshold: usize,
    pub max_depth: usize,
    split_into: Vec<usize>,
    file_backed: bool,
    next_id: AtomicU64,
}

impl BoxController {
    /// Validates the configuration; the one place configuration errors are
    /// reported (fatal to workspace creation, harmless to anything else).
    pub fn from_config(config: &WorkspaceConfig) -> Result<Self, Error> {
        if config.nd == 0 || config.nd > MAX_ND {
            return Err(Error::Config(format!(
                "nd must be between 1 and {}, got {}",
                MAX_ND, config.nd
            )));
        }
        if config.split_threshold == 0 {
            return Err(Error::Config("split_threshold must be at least 1".to_string()));
        }
        if config.max_depth == 0 {
            return Err(Error::Config("max_depth must be at least 1".to_string()));
        }

        let split_into = match &config.split_into_per_dim {
            Some(v) => {
                if v.len() != config.nd {
                    return Err(Error::Config(format!(
                        "split_into_per_dim has {} entries for nd={}",
                        v.len(),
                        config.nd
                    )));
                }
                v.clone()
            }
            None => vec![config.split_into; config.nd],
        };

        for (d, s) in split_into.iter().enumerate() {
            if *s < 2 {
                return Err(Error::Config(format!(
                    "split_into must be at least 2, got {} in dimension {}",
                    s, d
                )));
            }
        }

        return Ok(Self {
            nd: config.nd,
            split_threshold: config.split_threshold,
            max_depth: config.max_depth,
            split_into,
            file_backed: config.file_backed,
            next_id: AtomicU64::new(0),
        });
    }

    /// Fresh unique box id. Monotonic, never reused within the workspace's
    /// lifetime, safe to call from parallel splitting code.
    pub fn allocate_id(&self) -> u64 {
        return self.next_id.fetch_add(1, Ordering::Relaxed);
    }

    /// How many ids have been handed out so far.
    pub fn num_boxes_allocated(&self) -> u64 {
        return self.next_id.load(Ordering::Relaxed);
    }

    pub fn should_split(&self, num_events: usize, depth: usize) -> bool {
        return num_events > self.split_threshold && depth < self.max_depth;
    }

    /// Number of children along dimension `d` when a leaf splits.
    pub fn split_into(&self, d: usize) -> usize {
        return self.split_into[d];
    }

    /// Total child count of one split.
    pub fn num_cells(&self) -> usize {
        return self.split_into.iter().product();
    }

    pub fn is_file_backed(&self) -> bool {
        return self.file_backed;
    }
}
