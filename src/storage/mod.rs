//! The flat-file record store: fixed-width codec, locked file access and per-entity
//! repositories.

mod codec;
mod locked_file;
mod repository;

pub use self::codec::Record;
pub use self::locked_file::{FileGuard, LockMode, LockWait, LockedFile};
pub use self::repository::{LockedRecords, Repository, Scan};
