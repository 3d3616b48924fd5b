//! Volatile backend

use super::backend::SecurityDbBackend;
use super::types::*;
use crate::error::BleResult;

/// Keeps nothing: the bond table lives only as long as the process
#[derive(Debug, Default)]
pub struct MemorySecurityDb;

impl MemorySecurityDb {
    pub fn new() -> Self {
        Self
    }
}

impl SecurityDbBackend for MemorySecurityDb {
    fn load(&mut self, _max_entries: usize) -> BleResult<Option<PersistedDb>> {
        Ok(None)
    }

    fn reset(&mut self, _max_entries: usize) -> BleResult<()> {
        Ok(())
    }

    fn write_restore(&mut self, _restore: bool) -> BleResult<()> {
        Ok(())
    }

    fn write_local_identity(&mut self, _identity: &SecurityEntryIdentity) -> BleResult<()> {
        Ok(())
    }

    fn write_local_csrk(&mut self, _local: &LocalSecurity) -> BleResult<()> {
        Ok(())
    }

    fn write_sign_counter(&mut self, _counter: u32) -> BleResult<()> {
        Ok(())
    }

    fn write_record(&mut self, _index: usize, _record: EntryRecord<'_>) -> BleResult<()> {
        Ok(())
    }

    fn read_entry(&mut self, _index: usize) -> BleResult<Option<SecurityEntry>> {
        Ok(None)
    }

    fn flush(&mut self) -> BleResult<()> {
        Ok(())
    }
}
