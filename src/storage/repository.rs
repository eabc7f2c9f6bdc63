//! Record-level operations over one data file.
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use super::codec::Record;
use super::locked_file::{FileGuard, LockMode, LockWait, LockedFile};
use crate::{RegistryError, Result};

/// All records of one type, stored back to back in a single file.
///
/// Every operation takes the file lock for its whole duration and re-reads the file; nothing
/// is cached between calls.
#[derive(Debug)]
pub struct Repository<R> {
    file: LockedFile,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> Repository<R> {
    /// opens the repository stored at `path`, creating an empty file if needed
    ///
    /// # Errors
    /// `StorageUnavailable` if the file cannot be created
    pub fn open(path: impl Into<PathBuf>, wait: LockWait) -> Result<Self> {
        let file = LockedFile::new(path, wait);
        file.create()?;
        Ok(Repository {
            file,
            _record: PhantomData,
        })
    }

    /// path of the backing file
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Lazily reads every record, paired with its byte offset, starting at offset 0.
    ///
    /// The returned [`Scan`] holds shared access until it is dropped.
    pub fn scan(&self) -> Result<Scan<'_, R>> {
        let mut guard = self.file.acquire(LockMode::Shared)?;
        let mut reader = guard.file().try_clone()?;
        reader.seek(SeekFrom::Start(0))?;
        Ok(Scan {
            records: RecordReader::new(reader),
            _guard: guard,
        })
    }

    /// every record, in file order
    pub fn all(&self) -> Result<Vec<R>> {
        self.scan()?
            .map(|entry| entry.map(|(_, record)| record))
            .collect()
    }

    /// whether the file holds no records
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.scan()?.next().is_none())
    }

    /// the record with the given identifier
    ///
    /// # Errors
    /// `NotFound` if there is no such record
    pub fn find_by_id(&self, id: &str) -> Result<R> {
        for entry in self.scan()? {
            let (_, record) = entry?;
            if record.key() == id {
                return Ok(record);
            }
        }
        Err(RegistryError::not_found(R::ENTITY, id))
    }

    /// appends `record` to the file
    ///
    /// # Errors
    /// `DuplicateKey` if a record with the same identifier already exists
    #[instrument(
        level = "debug",
        skip(self, record),
        fields(entity = R::ENTITY, id = record.key())
    )]
    pub fn insert(&self, record: &R) -> Result<()> {
        let mut records = self.lock_exclusive()?;
        if records.find(record.key())?.is_some() {
            return Err(RegistryError::DuplicateKey {
                entity: R::ENTITY,
                id: record.key().to_string(),
            });
        }
        records.append(record)?;
        debug!("record inserted");
        Ok(())
    }

    /// Applies `mutate` to the record with the given identifier and overwrites that single
    /// record in place. Returns the updated record.
    ///
    /// Nothing is written if `mutate` fails.
    ///
    /// # Errors
    /// `NotFound` if there is no such record, or whatever `mutate` returns
    #[instrument(level = "debug", skip(self, mutate), fields(entity = R::ENTITY))]
    pub fn update_in_place<F>(&self, id: &str, mutate: F) -> Result<R>
    where
        F: FnOnce(&mut R) -> Result<()>,
    {
        let mut records = self.lock_exclusive()?;
        let (offset, mut record) = records
            .find(id)?
            .ok_or_else(|| RegistryError::not_found(R::ENTITY, id))?;
        mutate(&mut record)?;
        records.write_at(offset, &record)?;
        debug!(offset, "record updated");
        Ok(record)
    }

    /// Removes every record matching `predicate` by streaming the survivors into a temporary
    /// file and renaming it over the original. Returns how many records were removed.
    ///
    /// Scan, rewrite and rename happen under a single exclusive lock.
    #[instrument(level = "debug", skip(self, predicate), fields(entity = R::ENTITY))]
    pub fn delete_where<P>(&self, predicate: P) -> Result<usize>
    where
        P: FnMut(&R) -> bool,
    {
        self.lock_exclusive()?.delete_where(predicate)
    }

    /// Offers every record to `mutate`, rewriting the ones it reports as changed. Returns the
    /// number of rewritten records.
    #[instrument(level = "debug", skip(self, mutate), fields(entity = R::ENTITY))]
    pub fn patch_all<F>(&self, mutate: F) -> Result<usize>
    where
        F: FnMut(&mut R) -> bool,
    {
        self.lock_exclusive()?.patch_all(mutate)
    }

    /// Takes exclusive access to the file, for read-modify-write sequences that have to span
    /// more than one call.
    pub fn lock_exclusive(&self) -> Result<LockedRecords<'_, R>> {
        Ok(LockedRecords {
            guard: self.file.acquire(LockMode::Exclusive)?,
            _record: PhantomData,
        })
    }
}

/// Exclusive access to a repository's records. The lock is released on drop.
#[derive(Debug)]
pub struct LockedRecords<'a, R> {
    guard: FileGuard<'a>,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> LockedRecords<'_, R> {
    /// the record with identifier `id` and its byte offset
    pub fn find(&mut self, id: &str) -> Result<Option<(u64, R)>> {
        for entry in self.iter()? {
            let (offset, record) = entry?;
            if record.key() == id {
                return Ok(Some((offset, record)));
            }
        }
        Ok(None)
    }

    /// overwrites the record stored at `offset`
    pub fn write_at(&mut self, offset: u64, record: &R) -> Result<()> {
        let block = record.encode()?;
        let file = self.guard.file();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(&block)?;
        Ok(())
    }

    /// appends `record` at the end of the file
    pub fn append(&mut self, record: &R) -> Result<()> {
        let block = record.encode()?;
        let file = self.guard.file();
        file.seek(SeekFrom::End(0))?;
        file.write_all(&block)?;
        Ok(())
    }

    /// see [`Repository::patch_all`]
    pub fn patch_all<F>(&mut self, mut mutate: F) -> Result<usize>
    where
        F: FnMut(&mut R) -> bool,
    {
        let mut changed = Vec::new();
        for entry in self.iter()? {
            let (offset, mut record) = entry?;
            if mutate(&mut record) {
                changed.push((offset, record));
            }
        }
        for (offset, record) in &changed {
            self.write_at(*offset, record)?;
        }
        debug!(changed = changed.len(), "records patched");
        Ok(changed.len())
    }

    /// Removes the records matching `predicate`, see [`Repository::delete_where`].
    ///
    /// The rename replaces the file this guard has open, so the guard is consumed and the lock
    /// is released once the new file is in place.
    pub fn delete_where<P>(mut self, mut predicate: P) -> Result<usize>
    where
        P: FnMut(&R) -> bool,
    {
        let path = self.guard.path().to_path_buf();
        let temp_path = temp_path(&path);

        let removed = match self.copy_survivors(&temp_path, &mut predicate) {
            Ok(removed) => removed,
            Err(e) => {
                let _ = fs::remove_file(&temp_path);
                return Err(e);
            }
        };
        if removed == 0 {
            let _ = fs::remove_file(&temp_path);
            return Ok(0);
        }
        fs::rename(&temp_path, &path).map_err(|e| RegistryError::storage(&path, e))?;
        debug!(removed, "file rewritten");
        Ok(removed)
    }

    /// streams every record not matching `predicate` into `temp_path` and syncs it
    fn copy_survivors<P>(&mut self, temp_path: &Path, predicate: &mut P) -> Result<usize>
    where
        P: FnMut(&R) -> bool,
    {
        let temp = File::create(temp_path).map_err(|e| RegistryError::storage(temp_path, e))?;
        let mut writer = BufWriter::new(temp);
        let mut removed = 0;
        for entry in self.iter()? {
            let (_, record) = entry?;
            if predicate(&record) {
                removed += 1;
            } else {
                writer.write_all(&record.encode()?)?;
            }
        }
        let temp = writer.into_inner().map_err(|e| e.into_error())?;
        temp.sync_all()?;
        Ok(removed)
    }

    fn iter(&mut self) -> Result<RecordReader<&mut File, R>> {
        let file = self.guard.file();
        file.seek(SeekFrom::Start(0))?;
        Ok(RecordReader::new(file))
    }
}

/// A lazy, shared-locked pass over a repository. Yields `(offset, record)` pairs.
pub struct Scan<'a, R> {
    records: RecordReader<File, R>,
    _guard: FileGuard<'a>,
}

impl<R: Record> Iterator for Scan<'_, R> {
    type Item = Result<(u64, R)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.records.next()
    }
}

/// Decodes consecutive fixed-size blocks from a reader positioned at a record boundary.
struct RecordReader<Rd, R> {
    reader: BufReader<Rd>,
    offset: u64,
    block: Vec<u8>,
    done: bool,
    _record: PhantomData<fn() -> R>,
}

impl<Rd: Read, R: Record> RecordReader<Rd, R> {
    fn new(inner: Rd) -> Self {
        RecordReader {
            reader: BufReader::new(inner),
            offset: 0,
            block: vec![0; R::SIZE],
            done: false,
            _record: PhantomData,
        }
    }

    fn read_block(&mut self) -> io::Result<usize> {
        let mut filled = 0;
        while filled < self.block.len() {
            match self.reader.read(&mut self.block[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }
}

impl<Rd: Read, R: Record> Iterator for RecordReader<Rd, R> {
    type Item = Result<(u64, R)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let filled = match self.read_block() {
            Ok(filled) => filled,
            Err(e) => {
                self.done = true;
                return Some(Err(e.into()));
            }
        };
        if filled == 0 {
            self.done = true;
            return None;
        }
        if filled < R::SIZE {
            self.done = true;
            return Some(Err(RegistryError::CorruptRecord(format!(
                "trailing partial {} record of {} bytes at offset {}",
                R::ENTITY,
                filled,
                self.offset
            ))));
        }

        let offset = self.offset;
        self.offset += R::SIZE as u64;
        Some(R::decode(&self.block).map(|record| (offset, record)))
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}
