//! Error taxonomy for the event tree.
//!
//! Configuration problems are caught at workspace creation, I/O problems come
//! from the file-backing collaborator and surface to whichever call triggered
//! the load or flush. Caller routing bugs (inserting far outside a box's
//! extents) are debug assertions, not variants here.

use std::fmt;

#[derive(Debug)]
pub enum Error {
    /// Bad workspace parameters, reported synchronously at creation time.
    Config(String),
    /// Propagated from the backing file.
    Io(std::io::Error),
    /// A file-backing operation was requested on a workspace created without
    /// a backing store.
    NotFileBacked,
    /// The backing store has no buffer recorded for this box id.
    BoxNotOnDisk(u64),
    /// The event buffer for this box is evicted and must be loaded before
    /// direct access.
    EventsNotResident(u64),
    /// The backing file contents disagree with the recorded buffer size.
    CorruptBackingFile(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "invalid workspace configuration: {}", msg),
            Error::Io(e) => write!(f, "backing file i/o error: {}", e),
            Error::NotFileBacked => write!(f, "workspace has no backing store"),
            Error::BoxNotOnDisk(id) => write!(f, "no on-disk buffer for box {}", id),
            Error::EventsNotResident(id) => {
                write!(f, "event buffer for box {} is evicted", id)
            }
            Error::CorruptBackingFile(msg) => write!(f, "corrupt backing file: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error {
        Error::Io(e)
    }
}
