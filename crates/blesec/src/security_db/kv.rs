//! Key-value store backend
//!
//! The entry table is one blob whose key embeds the number of entries, so a
//! table written with another capacity is never picked up. The local
//! identity and counters are small keys of their own.

use super::backend::SecurityDbBackend;
use super::layout::*;
use super::types::*;
use crate::error::{BleError, BleResult};
use crate::smp::Csrk;
use log::{debug, warn};
use std::collections::HashMap;

pub const KV_VERSION_KEY: &str = "blesec_version";
pub const KV_RESTORE_KEY: &str = "blesec_restore";
pub const KV_LOCAL_IDENTITY_KEY: &str = "blesec_local_identity";
pub const KV_LOCAL_CSRK_KEY: &str = "blesec_local_csrk";
pub const KV_LOCAL_SIGN_COUNTER_KEY: &str = "blesec_local_sign_counter";

/// Largest table the single digit key suffix can name
pub const KV_MAX_ENTRIES: usize = 9;

/// Key of the entry table blob
pub fn entries_key(max_entries: usize) -> String {
    format!("blesec_entries_{}", max_entries)
}

/// Minimal key-value store interface
pub trait KvStore {
    fn get(&self, key: &str) -> BleResult<Option<Vec<u8>>>;

    fn set(&mut self, key: &str, value: &[u8]) -> BleResult<()>;

    fn remove(&mut self, key: &str) -> BleResult<()>;
}

/// In-memory [`KvStore`]
#[derive(Debug, Default, Clone)]
pub struct MemoryKvStore {
    values: HashMap<String, Vec<u8>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> BleResult<Option<Vec<u8>>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &[u8]) -> BleResult<()> {
        self.values.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> BleResult<()> {
        self.values.remove(key);
        Ok(())
    }
}

/// Bond table stored in a [`KvStore`]
pub struct KvSecurityDb<S: KvStore> {
    store: S,
    /// Working copy of the entry table blob
    table: Vec<u8>,
    max_entries: usize,
    dirty: bool,
}

impl<S: KvStore> KvSecurityDb<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            table: Vec::new(),
            max_entries: 0,
            dirty: false,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Give the store back, dropping unflushed entry changes
    pub fn into_store(self) -> S {
        self.store
    }

    fn check_capacity(max_entries: usize) -> BleResult<()> {
        if max_entries == 0 || max_entries > KV_MAX_ENTRIES {
            return Err(BleError::InvalidParameter(format!(
                "key-value security db holds 1..={} entries, not {}",
                KV_MAX_ENTRIES, max_entries
            )));
        }
        Ok(())
    }

    fn table_range(&self, index: usize, offset: usize, len: usize) -> BleResult<std::ops::Range<usize>> {
        if index >= self.max_entries {
            return Err(BleError::InvalidState);
        }
        let start = index * ENTRY_SIZE + offset;
        Ok(start..start + len)
    }
}

impl<S: KvStore> SecurityDbBackend for KvSecurityDb<S> {
    fn load(&mut self, max_entries: usize) -> BleResult<Option<PersistedDb>> {
        Self::check_capacity(max_entries)?;

        let version = match self.store.get(KV_VERSION_KEY)? {
            Some(bytes) => decode_u16(&bytes)?,
            None => return Ok(None),
        };
        if version != DB_VERSION {
            warn!("key-value security db version {}, expected {}", version, DB_VERSION);
            return Ok(None);
        }

        let table = match self.store.get(&entries_key(max_entries))? {
            Some(table) if table.len() == max_entries * ENTRY_SIZE => table,
            _ => {
                warn!("key-value security db has no table of {} entries", max_entries);
                return Ok(None);
            }
        };

        let restore = self
            .store
            .get(KV_RESTORE_KEY)?
            .is_some_and(|bytes| bytes.first().is_some_and(|b| *b != 0));
        let identity = match self.store.get(KV_LOCAL_IDENTITY_KEY)? {
            Some(bytes) => decode_identity(&bytes)?,
            None => SecurityEntryIdentity::default(),
        };
        let csrk = match self.store.get(KV_LOCAL_CSRK_KEY)? {
            Some(bytes) => decode_csrk(&bytes)?,
            None => Csrk::default(),
        };
        let sign_counter = match self.store.get(KV_LOCAL_SIGN_COUNTER_KEY)? {
            Some(bytes) => decode_u32(&bytes)?,
            None => 0,
        };

        let entries = decode_entries(&table, max_entries)?;
        self.table = table;
        self.max_entries = max_entries;
        self.dirty = false;

        debug!("loaded {} key-value security db entries", entries.len());
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
        Self::check_capacity(max_entries)?;

        self.table = vec![0u8; max_entries * ENTRY_SIZE];
        self.max_entries = max_entries;
        self.dirty = false;

        let local = LocalSecurity::default();
        self.store.set(KV_VERSION_KEY, &encode_u16(DB_VERSION)?)?;
        self.store.set(KV_RESTORE_KEY, &[0])?;
        self.write_local_identity(&local.identity)?;
        self.write_local_csrk(&local)?;
        self.store.set(&entries_key(max_entries), &self.table)
    }

    fn write_restore(&mut self, restore: bool) -> BleResult<()> {
        self.store.set(KV_RESTORE_KEY, &[u8::from(restore)])
    }

    fn write_local_identity(&mut self, identity: &SecurityEntryIdentity) -> BleResult<()> {
        self.store.set(KV_LOCAL_IDENTITY_KEY, &encode_identity(identity)?)
    }

    fn write_local_csrk(&mut self, local: &LocalSecurity) -> BleResult<()> {
        self.store.set(KV_LOCAL_CSRK_KEY, local.csrk.as_bytes())?;
        self.write_sign_counter(local.sign_counter)
    }

    fn write_sign_counter(&mut self, counter: u32) -> BleResult<()> {
        self.store.set(KV_LOCAL_SIGN_COUNTER_KEY, &encode_u32(counter)?)
    }

    fn write_record(&mut self, index: usize, record: EntryRecord<'_>) -> BleResult<()> {
        let bytes = encode_record(&record)?;
        let range = self.table_range(index, record_offset(&record), bytes.len())?;
        self.table[range].copy_from_slice(&bytes);
        self.dirty = true;
        Ok(())
    }

    fn read_entry(&mut self, index: usize) -> BleResult<Option<SecurityEntry>> {
        let range = self.table_range(index, 0, ENTRY_SIZE)?;
        decode_entry(&self.table[range]).map(Some)
    }

    fn flush(&mut self) -> BleResult<()> {
        if self.dirty {
            self.store.set(&entries_key(self.max_entries), &self.table)?;
            self.dirty = false;
        }
        Ok(())
    }
}
