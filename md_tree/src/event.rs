//! Holds the event record type and its fixed-length byte representation
//!
//! Events can be sent to and from fixed-length byte arrays to be swapped back
//! and forth from disk by the file-backing pager.

use crate::error::Error;
use crate::layout;
use byteorder::{BigEndian, ByteOrder};
use rand::Rng;

/// Highest dimensionality the engine supports. Coordinate storage is a
/// fixed-capacity array sized to this, with a workspace's active `nd` deciding
/// how many entries are meaningful.
pub const MAX_ND: usize = 9;

/// Smallest stored unit: a signal/error pair plus N-dimensional coordinates.
///
/// `run_index` and `detector_id` carry provenance for "fat" use; loaders that
/// do not track provenance leave them at the defaults. Events have no identity
/// beyond their position in the owning box's buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MDEvent {
    pub signal: f64,
    pub error_squared: f64,
    pub coords: [f32; MAX_ND],
    pub run_index: u16,
    pub detector_id: i32,
}

impl MDEvent {
    pub fn new(signal: f64, error_squared: f64, coords: &[f32]) -> Self {
        assert!(coords.len() <= MAX_ND);

        let mut arr = [0f32; MAX_ND];
        arr[..coords.len()].copy_from_slice(coords);

        return Self {
            signal,
            error_squared,
            coords: arr,
            run_index: 0,
            detector_id: -1,
        };
    }

    pub fn with_provenance(
        signal: f64,
        error_squared: f64,
        coords: &[f32],
        run_index: u16,
        detector_id: i32,
    ) -> Self {
        let mut event = Self::new(signal, error_squared, coords);
        event.run_index = run_index;
        event.detector_id = detector_id;
        return event;
    }

    /// Unit-signal event at random coordinates inside `[lo, hi)` per dimension.
    pub fn random(nd: usize, lo: f32, hi: f32) -> Self {
        let mut rng = rand::thread_rng();
        let mut coords = [0f32; MAX_ND];
        for coord in coords.iter_mut().take(nd) {
            *coord = rng.gen_range(lo..hi);
        }

        return Self {
            signal: 1.0,
            error_squared: 1.0,
            coords,
            run_index: 0,
            detector_id: -1,
        };
    }

    pub fn to_vec(&self, nd: usize) -> Vec<u8> {
        let mut vec = vec![0u8; layout::event_size(nd)];

        BigEndian::write_f64(
            &mut vec[layout::SIGNAL_START..layout::SIGNAL_START + layout::SIGNAL_SIZE],
            self.signal,
        );
        BigEndian::write_f64(
            &mut vec[layout::ERROR_SQUARED_START
                ..layout::ERROR_SQUARED_START + layout::ERROR_SQUARED_SIZE],
            self.error_squared,
        );
        BigEndian::write_u16(
            &mut vec[layout::RUN_INDEX_START..layout::RUN_INDEX_START + layout::RUN_INDEX_SIZE],
            self.run_index,
        );
        BigEndian::write_i32(
            &mut vec
                [layout::DETECTOR_ID_START..layout::DETECTOR_ID_START + layout::DETECTOR_ID_SIZE],
            self.detector_id,
        );

        for d in 0..nd {
            let start = layout::COORDS_START + d * layout::COORD_SIZE;
            BigEndian::write_f32(&mut vec[start..start + layout::COORD_SIZE], self.coords[d]);
        }

        return vec;
    }

    pub fn from_slice(slice: &[u8], nd: usize) -> Result<Self, Error> {
        if slice.len() < layout::event_size(nd) {
            return Err(Error::CorruptBackingFile(format!(
                "event record truncated: {} bytes for nd={}",
                slice.len(),
                nd
            )));
        }

        let signal = BigEndian::read_f64(&slice[layout::SIGNAL_START..]);
        let error_squared = BigEndian::read_f64(&slice[layout::ERROR_SQUARED_START..]);
        let run_index = BigEndian::read_u16(&slice[layout::RUN_INDEX_START..]);
        let detector_id = BigEndian::read_i32(&slice[layout::DETECTOR_ID_START..]);

        let mut coords = [0f32; MAX_ND];
        for (d, coord) in coords.iter_mut().enumerate().take(nd) {
            let start = layout::COORDS_START + d * layout::COORD_SIZE;
            *coord = BigEndian::read_f32(&slice[start..]);
        }

        return Ok(Self {
            signal,
            error_squared,
            coords,
            run_index,
            detector_id,
        });
    }
}
