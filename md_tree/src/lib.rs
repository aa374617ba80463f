//! Implementation of an out-of-core N-dimensional event tree for very large
//! measurement datasets.
//!
//! Events are lightweight records (a signal/error pair plus up to 9
//! coordinates) owned by leaf boxes of a recursive spatial tree. A leaf that
//! grows past the controller's split threshold is converted in place into a
//! grid box whose children evenly partition its extents, so dense regions of
//! coordinate space get finer boxes while sparse regions stay coarse. Leaf
//! event buffers can be flushed to a backing file and evicted from memory,
//! letting a workspace hold many more events than fit in RAM.
//!
//! Aggregate signal per box is cached and only trustworthy after a
//! `refresh_cache` pass; bulk insertion deliberately leaves the caches stale
//! so loaders can stream millions of events without per-event bookkeeping.

pub mod controller;
pub mod error;
pub mod event;
pub mod extents;
pub mod io;
pub mod layout;
pub mod node;
pub mod tree;
