//! Sets constants for the on-disk layout of serialized events
//!
//! All multi-byte fields are big-endian. An event record is fixed-size for a
//! given dimensionality, so a leaf's buffer position on disk is fully
//! determined by its byte offset and event count.

pub const SIGNAL_START: usize = 0;
pub const SIGNAL_SIZE: usize = 8;

pub const ERROR_SQUARED_START: usize = SIGNAL_START + SIGNAL_SIZE;
pub const ERROR_SQUARED_SIZE: usize = 8;

pub const RUN_INDEX_START: usize = ERROR_SQUARED_START + ERROR_SQUARED_SIZE;
pub const RUN_INDEX_SIZE: usize = 2;

pub const DETECTOR_ID_START: usize = RUN_INDEX_START + RUN_INDEX_SIZE;
pub const DETECTOR_ID_SIZE: usize = 4;

pub const COORDS_START: usize = DETECTOR_ID_START + DETECTOR_ID_SIZE;
pub const COORD_SIZE: usize = 4;

/// Serialized size of one event with `nd` active coordinates.
pub fn event_size(nd: usize) -> usize {
    COORDS_START + nd * COORD_SIZE
}

//for the whole backing file
pub const HEADER_CURSOR_START: usize = 0;
pub const HEADER_CURSOR_SIZE: usize = 8;

pub const FILE_DATA_START: usize = HEADER_CURSOR_START + HEADER_CURSOR_SIZE;
