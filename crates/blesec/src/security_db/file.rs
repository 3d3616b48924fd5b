//! Flat file backend
//!
//! Records sit at fixed offsets (see [`layout`](super::layout)) so a single
//! field can be rewritten in place. The version is stored at both ends of
//! the file; a size or version mismatch on load discards the content.

use super::backend::SecurityDbBackend;
use super::layout::*;
use super::types::*;
use crate::error::BleResult;
use crate::smp::Csrk;
use log::{debug, warn};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

pub struct FileSecurityDb {
    file: File,
    path: PathBuf,
}

impl FileSecurityDb {
    /// Open or create the database file at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> BleResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_at(&mut self, offset: u64, bytes: &[u8]) -> BleResult<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(bytes)?;
        Ok(())
    }

    fn read_at(&mut self, offset: u64, len: usize) -> BleResult<Vec<u8>> {
        let mut bytes = vec![0u8; len];
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(&mut bytes)?;
        Ok(bytes)
    }

    fn read_version_at(&mut self, offset: u64) -> BleResult<u16> {
        decode_u16(&self.read_at(offset, 2)?)
    }
}

impl SecurityDbBackend for FileSecurityDb {
    fn load(&mut self, max_entries: usize) -> BleResult<Option<PersistedDb>> {
        let size = self.file.metadata()?.len();
        if size != file_size(max_entries) {
            warn!(
                "security db file {} has size {}, expected {}",
                self.path.display(),
                size,
                file_size(max_entries)
            );
            return Ok(None);
        }

        let version = self.read_version_at(VERSION_OFFSET)?;
        let trailer = self.read_version_at(trailer_offset(max_entries))?;
        if version != DB_VERSION || trailer != DB_VERSION {
            warn!(
                "security db file {} has version {}/{}, expected {}",
                self.path.display(),
                version,
                trailer,
                DB_VERSION
            );
            return Ok(None);
        }

        let header = self.read_at(0, ENTRIES_OFFSET as usize)?;
        let restore = header[RESTORE_OFFSET as usize] != 0;
        let identity = decode_identity(&header[LOCAL_IDENTITY_OFFSET as usize..])?;
        let csrk = decode_csrk(&header[LOCAL_CSRK_OFFSET as usize..])?;
        let sign_counter = decode_u32(&header[LOCAL_SIGN_COUNTER_OFFSET as usize..])?;

        let table = self.read_at(ENTRIES_OFFSET, max_entries * ENTRY_SIZE)?;
        let entries = decode_entries(&table, max_entries)?;

        debug!("loaded {} security db entries from {}", entries.len(), self.path.display());
        Ok(Some(PersistedDb {
            restore,
            local: LocalSecurity {
                identity,
                csrk,
                sign_counter,
            },
            entries,
        }))
    }

    fn reset(&mut self, max_entries: usize) -> BleResult<()> {
        debug!("reinitializing security db file {}", self.path.display());
        self.file.set_len(0)?;
        self.file.set_len(file_size(max_entries))?;

        let version = encode_u16(DB_VERSION)?;
        self.write_at(VERSION_OFFSET, &version)?;
        self.write_at(trailer_offset(max_entries), &version)?;
        self.flush()
    }

    fn write_restore(&mut self, restore: bool) -> BleResult<()> {
        self.write_at(RESTORE_OFFSET, &[u8::from(restore)])
    }

    fn write_local_identity(&mut self, identity: &SecurityEntryIdentity) -> BleResult<()> {
        self.write_at(LOCAL_IDENTITY_OFFSET, &encode_identity(identity)?)
    }

    fn write_local_csrk(&mut self, local: &LocalSecurity) -> BleResult<()> {
        let mut bytes = Vec::with_capacity(Csrk::LEN + 4);
        bytes.extend_from_slice(local.csrk.as_bytes());
        bytes.extend_from_slice(&encode_u32(local.sign_counter)?);
        self.write_at(LOCAL_CSRK_OFFSET, &bytes)
    }

    fn write_sign_counter(&mut self, counter: u32) -> BleResult<()> {
        self.write_at(LOCAL_SIGN_COUNTER_OFFSET, &encode_u32(counter)?)
    }

    fn write_record(&mut self, index: usize, record: EntryRecord<'_>) -> BleResult<()> {
        let offset = entry_offset(index) + record_offset(&record) as u64;
        self.write_at(offset, &encode_record(&record)?)
    }

    fn write_entry(&mut self, index: usize, entry: &SecurityEntry) -> BleResult<()> {
        self.write_at(entry_offset(index), &encode_entry(entry)?)
    }

    fn read_entry(&mut self, index: usize) -> BleResult<Option<SecurityEntry>> {
        let bytes = self.read_at(entry_offset(index), ENTRY_SIZE)?;
        decode_entry(&bytes).map(Some)
    }

    fn flush(&mut self) -> BleResult<()> {
        self.file.flush()?;
        self.file.sync_data()?;
        Ok(())
    }
}
