//! Persistence strategy of the bond table

use super::types::*;
use crate::error::BleResult;

/// Storage behind a [`SecurityDb`](super::SecurityDb)
///
/// The database keeps the working copy in memory and pushes individual
/// records through this trait; `flush` makes everything written so far
/// durable.
pub trait SecurityDbBackend {
    /// Read back stored state; `None` when nothing valid is stored
    fn load(&mut self, max_entries: usize) -> BleResult<Option<PersistedDb>>;

    /// Replace the stored state with an empty table of `max_entries`
    fn reset(&mut self, max_entries: usize) -> BleResult<()>;

    fn write_restore(&mut self, restore: bool) -> BleResult<()>;

    fn write_local_identity(&mut self, identity: &SecurityEntryIdentity) -> BleResult<()>;

    fn write_local_csrk(&mut self, local: &LocalSecurity) -> BleResult<()>;

    fn write_sign_counter(&mut self, counter: u32) -> BleResult<()>;

    fn write_record(&mut self, index: usize, record: EntryRecord<'_>) -> BleResult<()>;

    /// Stored copy of one entry, if the backend keeps one
    fn read_entry(&mut self, index: usize) -> BleResult<Option<SecurityEntry>>;

    fn flush(&mut self) -> BleResult<()>;

    fn write_entry(&mut self, index: usize, entry: &SecurityEntry) -> BleResult<()> {
        for record in EntryRecord::all(entry) {
            self.write_record(index, record)?;
        }
        Ok(())
    }
}
