//! Handles read and write of evicted leaf event buffers on disk
//!
//! The tree never assumes an on-disk layout; it talks to the backing store
//! through [`EventBackend`] and only relies on the load/flush contract: a
//! flush followed by a load returns the same events, and a failed load leaves
//! nothing half-replaced. Writes to one backing file must be serialized by
//! the owner (the workspace keeps the pager behind a mutex); loads of
//! already-resident leaves never touch the backend at all.

use crate::error::Error;
use crate::event::MDEvent;
use crate::layout;
use byteorder::{BigEndian, ByteOrder};
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};

/// Where a flushed buffer lives in the backing file. `capacity` is the event
/// count the slot was sized for; a buffer that shrank can be rewritten in
/// place, one that grew gets a fresh slot at the end of the file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiskLocation {
    pub offset: u64,
    pub num_events: usize,
    pub capacity: usize,
}

/// Contract between the tree and its file-backing collaborator.
pub trait EventBackend: Send {
    fn flush(&mut self, id: u64, events: &[MDEvent]) -> Result<(), Error>;
    fn load(&mut self, id: u64) -> Result<Vec<MDEvent>, Error>;
    fn location(&self, id: u64) -> Option<DiskLocation>;
    fn num_buffers(&self) -> usize;
}

/// File-backed implementation: one data file per workspace, a u64 cursor in
/// the header recording the next free byte, and an in-memory index from box
/// id to slot.
#[derive(Debug)]
pub struct EventFilePager {
    path: String,
    nd: usize,
    next_free_offset: u64,
    index: HashMap<u64, DiskLocation>,
}

impl EventFilePager {
    pub fn create(path: &str, nd: usize) -> Result<Self, Error> {
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut cursor_arr = [0u8; layout::HEADER_CURSOR_SIZE];
        BigEndian::write_u64(&mut cursor_arr, layout::FILE_DATA_START as u64);
        file.seek(SeekFrom::Start(layout::HEADER_CURSOR_START as u64))?;
        file.write_all(&cursor_arr)?;

        return Ok(Self {
            path: path.to_string(),
            nd,
            next_free_offset: layout::FILE_DATA_START as u64,
            index: HashMap::new(),
        });
    }

    fn event_size(&self) -> usize {
        return layout::event_size(self.nd);
    }

    fn write_header_cursor(&self) -> Result<(), Error> {
        let mut file = OpenOptions::new().write(true).open(&self.path)?;

        let mut cursor_arr = [0u8; layout::HEADER_CURSOR_SIZE];
        BigEndian::write_u64(&mut cursor_arr, self.next_free_offset);
        file.seek(SeekFrom::Start(layout::HEADER_CURSOR_START as u64))?;
        file.write_all(&cursor_arr)?;

        Ok(())
    }
}

impl EventBackend for EventFilePager {
    /// Persists a buffer for `id`, reusing its previous slot when it still
    /// fits. The index entry is only updated after a fully successful write.
    fn flush(&mut self, id: u64, events: &[MDEvent]) -> Result<(), Error> {
        let record_size = self.event_size();

        let location = match self.index.get(&id) {
            Some(old) if events.len() <= old.capacity => DiskLocation {
                offset: old.offset,
                num_events: events.len(),
                capacity: old.capacity,
            },
            _ => {
                let offset = self.next_free_offset;
                DiskLocation {
                    offset,
                    num_events: events.len(),
                    capacity: events.len(),
                }
            }
        };

        let mut data: Vec<u8> = Vec::with_capacity(events.len() * record_size);
        for event in events {
            data.extend_from_slice(&event.to_vec(self.nd));
        }

        let mut file = OpenOptions::new().write(true).open(&self.path)?;
        file.seek(SeekFrom::Start(location.offset))?;
        file.write_all(&data)?;

        let slot_end = location.offset + (location.capacity * record_size) as u64;
        if slot_end > self.next_free_offset {
            self.next_free_offset = slot_end;
        }
        self.write_header_cursor()?;

        self.index.insert(id, location);

        Ok(())
    }

    /// Reads the whole buffer for `id`. Either a complete vector comes back
    /// or an error does; no partial buffer is ever returned.
    fn load(&mut self, id: u64) -> Result<Vec<MDEvent>, Error> {
        let location = match self.index.get(&id) {
            Some(x) => *x,
            None => return Err(Error::BoxNotOnDisk(id)),
        };

        let record_size = self.event_size();
        let mut data = vec![0u8; location.num_events * record_size];

        let mut file = OpenOptions::new().read(true).open(&self.path)?;
        file.seek(SeekFrom::Start(location.offset))?;
        file.read_exact(&mut data).map_err(|_| {
            Error::CorruptBackingFile(format!(
                "short read for box {}: expected {} events at offset {}",
                id, location.num_events, location.offset
            ))
        })?;

        let mut events = Vec::with_capacity(location.num_events);
        for i in 0..location.num_events {
            let start = i * record_size;
            events.push(MDEvent::from_slice(&data[start..start + record_size], self.nd)?);
        }

        return Ok(events);
    }

    fn location(&self, id: u64) -> Option<DiskLocation> {
        return self.index.get(&id).copied();
    }

    fn num_buffers(&self) -> usize {
        return self.index.len();
    }
}
