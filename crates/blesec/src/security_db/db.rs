//! Bond table
//!
//! Entries are opened when a peer connects and filled in as keys are
//! distributed. Every change is written through the backend right away;
//! `sync` rewrites whole entries and the local sign counter, then flushes.

use super::backend::SecurityDbBackend;
use super::memory::MemorySecurityDb;
use super::types::*;
use crate::error::{BleError, BleResult};
use crate::gap::{AddressType, BdAddr, Whitelist};
use crate::smp::{Csrk, Ediv, Irk, Ltk, Rand};
use log::{debug, trace, warn};

/// Part of an entry a setter changed
#[derive(Debug, Clone, Copy)]
enum EntryPart {
    Flags,
    LocalKeys,
    PeerKeys,
    PeerIdentity,
    PeerSigning,
}

/// Bonded peers and local identity
pub struct SecurityDb {
    backend: Box<dyn SecurityDbBackend>,
    entries: Vec<SecurityEntry>,
    local: LocalSecurity,
    restore: bool,
    whitelist: Option<Whitelist>,
}

impl SecurityDb {
    /// Empty table of `max_entries`; call [`restore`](Self::restore) to load stored bonds
    pub fn new(backend: Box<dyn SecurityDbBackend>, max_entries: usize) -> Self {
        Self {
            backend,
            entries: vec![SecurityEntry::default(); max_entries],
            local: LocalSecurity::default(),
            restore: false,
            whitelist: None,
        }
    }

    /// Table that is never persisted
    pub fn in_memory(max_entries: usize) -> Self {
        Self::new(Box::new(MemorySecurityDb::new()), max_entries)
    }

    pub fn max_entries(&self) -> usize {
        self.entries.len()
    }

    fn entry(&self, handle: EntryHandle) -> Option<&SecurityEntry> {
        self.entries.get(handle.0)
    }

    fn entry_mut(&mut self, handle: EntryHandle) -> BleResult<&mut SecurityEntry> {
        let max = self.entries.len();
        self.entries.get_mut(handle.0).ok_or_else(|| {
            BleError::InvalidParameter(format!("entry handle {} outside 0..{}", handle.0, max))
        })
    }

    //
    // Entry lifecycle
    //

    /// Entry for a peer that just connected
    ///
    /// A disconnected entry bonded with this address (or with this identity
    /// for identity address types) is reused, otherwise a free one is
    /// allocated. Returns `None` when every entry is in use.
    pub fn open_entry(&mut self, peer_address_type: AddressType, peer_address: BdAddr) -> Option<EntryHandle> {
        if let Some(index) = self
            .entries
            .iter()
            .position(|e| e.flags.is_connected() && e.flags.matches_address(peer_address_type, &peer_address))
        {
            return Some(EntryHandle(index));
        }

        let index = self
            .find_disconnected(peer_address_type, &peer_address)
            .or_else(|| self.get_free_entry())?;

        let flags = &mut self.entries[index].flags;
        flags.peer_address = peer_address;
        flags.peer_address_is_public = peer_address_type.is_public();
        flags.flags.insert(DistributionFlags::CONNECTED);

        debug!("opened security entry {} for {}", index, peer_address);
        Some(EntryHandle(index))
    }

    fn find_disconnected(&self, peer_address_type: AddressType, peer_address: &BdAddr) -> Option<usize> {
        let by_address = self.entries.iter().position(|e| {
            !e.flags.is_connected() && e.flags.matches_address(peer_address_type, peer_address)
        });
        if by_address.is_some() || !peer_address_type.is_identity() {
            return by_address;
        }

        self.entries.iter().position(|e| {
            !e.flags.is_connected()
                && e.flags.flags.contains(DistributionFlags::IRK_STORED)
                && e.peer_identity.identity_address == *peer_address
                && e.peer_identity.identity_address_is_public == peer_address_type.is_public()
        })
    }

    /// Free entry, an unused one first, else a disconnected bond which is wiped
    fn get_free_entry(&mut self) -> Option<usize> {
        let index = self
            .entries
            .iter()
            .position(|e| !e.flags.is_connected() && !e.flags.has_keys())
            .or_else(|| self.entries.iter().position(|e| !e.flags.is_connected()))?;

        let evicted = self.entries[index].flags.has_keys();
        self.entries[index] = SecurityEntry::default();
        if evicted {
            debug!("evicting bond in security entry {}", index);
            if let Err(e) = self.backend.write_entry(index, &self.entries[index]) {
                warn!("failed to erase evicted security entry {}: {}", index, e);
            }
        }
        Some(index)
    }

    /// Mark the entry disconnected and persist it; entries without keys are released
    pub fn close_entry(&mut self, handle: EntryHandle) -> BleResult<()> {
        let entry = self.entry_mut(handle)?;
        entry.flags.flags.remove(DistributionFlags::CONNECTED);
        if !entry.flags.has_keys() {
            *entry = SecurityEntry::default();
        }
        self.sync(Some(handle))
    }

    pub fn reset_entry(&mut self, handle: EntryHandle) -> BleResult<()> {
        *self.entry_mut(handle)? = SecurityEntry::default();
        self.backend.write_entry(handle.0, &self.entries[handle.0])
    }

    /// Erase the bond with an identity
    pub fn remove_entry(&mut self, peer_identity_address_type: AddressType, peer_identity_address: BdAddr) -> BleResult<()> {
        let Some(index) = self.entries.iter().position(|e| {
            e.flags.flags.contains(DistributionFlags::IRK_STORED)
                && e.peer_identity.identity_address == peer_identity_address
                && e.peer_identity.identity_address_is_public == peer_identity_address_type.is_public()
        }) else {
            trace!("no bond with {} to remove", peer_identity_address);
            return Ok(());
        };

        self.entries[index] = SecurityEntry::default();
        self.backend.write_entry(index, &self.entries[index])?;
        self.backend.flush()
    }

    /// Erase every bond and the local identity
    pub fn clear_entries(&mut self) -> BleResult<()> {
        for entry in self.entries.iter_mut() {
            *entry = SecurityEntry::default();
        }
        self.local = LocalSecurity::default();
        self.whitelist = None;

        self.backend.reset(self.entries.len())?;
        self.backend.write_restore(self.restore)?;
        self.backend.flush()
    }

    //
    // Key lookup
    //

    /// Local LTK matching `ediv`/`rand`
    ///
    /// When the entry guessed from the connection address holds another
    /// key, the bond owning the key takes over the connection and `handle`
    /// is moved to it.
    pub fn get_entry_local_keys(&mut self, handle: &mut EntryHandle, ediv: Ediv, rand: Rand) -> Option<SecurityEntryKeys> {
        let current = self.entry(*handle)?;
        if current.flags.flags.contains(DistributionFlags::LTK_SENT) && current.local_keys.matches(ediv, &rand) {
            return Some(current.local_keys);
        }
        let connection = current.flags;

        let index = self.entries.iter().enumerate().position(|(index, e)| {
            index != handle.0
                && !e.flags.is_connected()
                && e.flags.flags.contains(DistributionFlags::LTK_SENT)
                && e.local_keys.matches(ediv, &rand)
        })?;

        debug!("security entry {} moves to bond {}", handle.0, index);
        let target = &mut self.entries[index].flags;
        target.peer_address = connection.peer_address;
        target.peer_address_is_public = connection.peer_address_is_public;
        target.flags.insert(DistributionFlags::CONNECTED);

        let original = &mut self.entries[handle.0];
        if original.flags.has_keys() {
            original.flags.flags.remove(DistributionFlags::CONNECTED);
            original.flags.peer_address = BdAddr::default();
        } else {
            *original = SecurityEntry::default();
        }

        if let Err(e) = self.backend.write_entry(handle.0, &self.entries[handle.0]) {
            warn!("failed to store retired security entry {}: {}", handle.0, e);
        }
        *handle = EntryHandle(index);
        if let Err(e) = self.write_back(*handle, EntryPart::Flags) {
            warn!("failed to store security entry {}: {}", index, e);
        }
        Some(self.entries[index].local_keys)
    }

    /// Local LTK of a Secure Connections bond
    pub fn get_entry_local_keys_sc(&self, handle: EntryHandle) -> Option<SecurityEntryKeys> {
        let entry = self.entry(handle)?;
        let wanted = DistributionFlags::LTK_SENT | DistributionFlags::SECURE_CONNECTIONS_PAIRED;
        entry.flags.flags.contains(wanted).then_some(entry.local_keys)
    }

    pub fn get_entry_peer_keys(&self, handle: EntryHandle) -> Option<&SecurityEntryKeys> {
        let entry = self.entry(handle)?;
        entry
            .flags
            .flags
            .contains(DistributionFlags::LTK_STORED)
            .then_some(&entry.peer_keys)
    }

    pub fn get_entry_identity(&self, handle: EntryHandle) -> Option<&SecurityEntryIdentity> {
        let entry = self.entry(handle)?;
        entry
            .flags
            .flags
            .contains(DistributionFlags::IRK_STORED)
            .then_some(&entry.peer_identity)
    }

    pub fn get_entry_peer_csrk(&self, handle: EntryHandle) -> Option<&SecurityEntrySigning> {
        let entry = self.entry(handle)?;
        entry
            .flags
            .flags
            .contains(DistributionFlags::CSRK_STORED)
            .then_some(&entry.peer_signing)
    }

    pub fn get_distribution_flags(&self, handle: EntryHandle) -> Option<&SecurityDistributionFlags> {
        self.entry(handle).map(|e| &e.flags)
    }

    /// Replace the distribution state; the connected flag is kept
    pub fn set_distribution_flags(&mut self, handle: EntryHandle, flags: SecurityDistributionFlags) -> BleResult<()> {
        let entry = self.entry_mut(handle)?;
        let connected = entry.flags.is_connected();
        entry.flags = flags;
        entry.flags.flags.set(DistributionFlags::CONNECTED, connected);
        self.write_back(handle, EntryPart::Flags)
    }

    //
    // Key distribution
    //

    pub fn set_entry_local_ltk(&mut self, handle: EntryHandle, ltk: Ltk) -> BleResult<()> {
        let entry = self.entry_mut(handle)?;
        entry.local_keys.ltk = ltk;
        entry.flags.flags.insert(DistributionFlags::LTK_SENT);
        self.write_back(handle, EntryPart::LocalKeys)
    }

    pub fn set_entry_local_ediv_rand(&mut self, handle: EntryHandle, ediv: Ediv, rand: Rand) -> BleResult<()> {
        let entry = self.entry_mut(handle)?;
        entry.local_keys.ediv = ediv;
        entry.local_keys.rand = rand;
        self.write_back(handle, EntryPart::LocalKeys)
    }

    pub fn set_entry_peer_ltk(&mut self, handle: EntryHandle, ltk: Ltk) -> BleResult<()> {
        let entry = self.entry_mut(handle)?;
        entry.peer_keys.ltk = ltk;
        entry.flags.flags.insert(DistributionFlags::LTK_STORED);
        self.write_back(handle, EntryPart::PeerKeys)
    }

    pub fn set_entry_peer_ediv_rand(&mut self, handle: EntryHandle, ediv: Ediv, rand: Rand) -> BleResult<()> {
        let entry = self.entry_mut(handle)?;
        entry.peer_keys.ediv = ediv;
        entry.peer_keys.rand = rand;
        self.write_back(handle, EntryPart::PeerKeys)
    }

    pub fn set_entry_peer_irk(&mut self, handle: EntryHandle, irk: Irk) -> BleResult<()> {
        let entry = self.entry_mut(handle)?;
        entry.peer_identity.irk = irk;
        entry.flags.flags.insert(DistributionFlags::IRK_STORED);
        self.write_back(handle, EntryPart::PeerIdentity)
    }

    pub fn set_entry_peer_bdaddr(&mut self, handle: EntryHandle, address_is_public: bool, address: BdAddr) -> BleResult<()> {
        let entry = self.entry_mut(handle)?;
        entry.peer_identity.identity_address = address;
        entry.peer_identity.identity_address_is_public = address_is_public;
        self.write_back(handle, EntryPart::PeerIdentity)
    }

    pub fn set_entry_peer_csrk(&mut self, handle: EntryHandle, csrk: Csrk) -> BleResult<()> {
        let entry = self.entry_mut(handle)?;
        entry.peer_signing.csrk = csrk;
        entry.flags.flags.insert(DistributionFlags::CSRK_STORED);
        self.write_back(handle, EntryPart::PeerSigning)
    }

    pub fn set_entry_peer_sign_counter(&mut self, handle: EntryHandle, counter: u32) -> BleResult<()> {
        self.entry_mut(handle)?.peer_signing.counter = counter;
        self.write_back(handle, EntryPart::PeerSigning)
    }

    /// Write the changed part of an entry, and its flags, to the backend
    fn write_back(&mut self, handle: EntryHandle, part: EntryPart) -> BleResult<()> {
        let entry = &self.entries[handle.0];
        let record = match part {
            EntryPart::Flags => EntryRecord::Flags(&entry.flags),
            EntryPart::LocalKeys => EntryRecord::LocalKeys(&entry.local_keys),
            EntryPart::PeerKeys => EntryRecord::PeerKeys(&entry.peer_keys),
            EntryPart::PeerIdentity => EntryRecord::PeerIdentity(&entry.peer_identity),
            EntryPart::PeerSigning => EntryRecord::PeerSigning(&entry.peer_signing),
        };
        if !matches!(part, EntryPart::Flags) {
            self.backend.write_record(handle.0, EntryRecord::Flags(&entry.flags))?;
        }
        self.backend.write_record(handle.0, record)
    }

    //
    // Reload from storage
    //

    fn read_in_entry<F>(&mut self, handle: EntryHandle, copy: F) -> BleResult<()>
    where
        F: FnOnce(&mut SecurityEntry, &SecurityEntry),
    {
        self.entry_mut(handle)?;
        if let Some(stored) = self.backend.read_entry(handle.0)? {
            copy(&mut self.entries[handle.0], &stored);
        }
        Ok(())
    }

    /// Replace the local keys of an entry with the stored ones
    pub fn read_in_entry_local_keys(&mut self, handle: EntryHandle) -> BleResult<()> {
        self.read_in_entry(handle, |entry, stored| entry.local_keys = stored.local_keys)
    }

    pub fn read_in_entry_peer_keys(&mut self, handle: EntryHandle) -> BleResult<()> {
        self.read_in_entry(handle, |entry, stored| entry.peer_keys = stored.peer_keys)
    }

    pub fn read_in_entry_identity(&mut self, handle: EntryHandle) -> BleResult<()> {
        self.read_in_entry(handle, |entry, stored| entry.peer_identity = stored.peer_identity)
    }

    pub fn read_in_entry_peer_signing(&mut self, handle: EntryHandle) -> BleResult<()> {
        self.read_in_entry(handle, |entry, stored| entry.peer_signing = stored.peer_signing)
    }

    //
    // Identities and whitelist
    //

    /// Identities of every peer that distributed an IRK
    pub fn get_identity_list(&self) -> Vec<SecurityEntryIdentity> {
        self.entries
            .iter()
            .filter(|e| e.flags.flags.contains(DistributionFlags::IRK_STORED))
            .map(|e| e.peer_identity)
            .collect()
    }

    /// Fill `whitelist` with the connection and identity addresses of bonded peers
    pub fn generate_whitelist_from_bond_table(&self, whitelist: &mut Whitelist) -> BleResult<()> {
        for entry in self
            .entries
            .iter()
            .filter(|e| e.flags.flags.contains(DistributionFlags::IRK_STORED))
        {
            if whitelist.is_full() {
                break;
            }
            whitelist.push(
                AddressType::from_public_flag(entry.flags.peer_address_is_public),
                entry.flags.peer_address,
            )?;

            if whitelist.is_full() {
                break;
            }
            whitelist.push(
                entry.peer_identity.address_type(),
                entry.peer_identity.identity_address,
            )?;
        }
        Ok(())
    }

    pub fn get_whitelist(&self) -> Option<&Whitelist> {
        self.whitelist.as_ref()
    }

    pub fn set_whitelist(&mut self, whitelist: Whitelist) {
        self.whitelist = Some(whitelist);
    }

    //
    // Local identity
    //

    pub fn get_local_identity(&self) -> &SecurityEntryIdentity {
        &self.local.identity
    }

    pub fn set_local_identity(&mut self, irk: Irk, identity_address: BdAddr, public_address: bool) -> BleResult<()> {
        self.local.identity = SecurityEntryIdentity {
            irk,
            identity_address,
            identity_address_is_public: public_address,
        };
        self.backend.write_local_identity(&self.local.identity)
    }

    pub fn get_local_csrk(&self) -> &Csrk {
        &self.local.csrk
    }

    pub fn set_local_csrk(&mut self, csrk: Csrk) -> BleResult<()> {
        self.local.csrk = csrk;
        self.backend.write_local_csrk(&self.local)
    }

    pub fn get_local_sign_counter(&self) -> u32 {
        self.local.sign_counter
    }

    /// Update the counter; it is written on the next `sync`
    pub fn set_local_sign_counter(&mut self, counter: u32) {
        self.local.sign_counter = counter;
    }

    //
    // Persistence
    //

    /// Load the stored bonds if the restore flag was left set, else start empty
    pub fn restore(&mut self) -> BleResult<()> {
        let max_entries = self.entries.len();

        match self.backend.load(max_entries)? {
            Some(stored) if stored.restore => {
                debug!("restoring security db");
                self.local = stored.local;
                self.entries = stored.entries;
                self.entries.resize(max_entries, SecurityEntry::default());
                for entry in self.entries.iter_mut() {
                    entry.flags.flags.remove(DistributionFlags::CONNECTED);
                }
                self.restore = true;
                Ok(())
            }
            _ => {
                debug!("security db starts empty");
                for entry in self.entries.iter_mut() {
                    *entry = SecurityEntry::default();
                }
                self.local = LocalSecurity::default();
                self.restore = false;
                self.backend.reset(max_entries)
            }
        }
    }

    /// Write entries through the backend
    ///
    /// With a handle only that entry is written, without one every
    /// connected entry; disconnected entries were written when closed.
    pub fn sync(&mut self, handle: Option<EntryHandle>) -> BleResult<()> {
        match handle {
            Some(handle) => {
                let entry = self.entry(handle).copied().ok_or_else(|| {
                    BleError::InvalidParameter(format!("entry handle {} out of range", handle.0))
                })?;
                self.backend.write_entry(handle.0, &entry)?;
            }
            None => {
                for (index, entry) in self.entries.iter().enumerate() {
                    if entry.flags.is_connected() {
                        self.backend.write_entry(index, entry)?;
                    }
                }
            }
        }

        self.backend.write_sign_counter(self.local.sign_counter)?;
        self.backend.flush()
    }

    /// Whether the next `restore` reloads the stored bonds
    pub fn set_restore(&mut self, restore: bool) -> BleResult<()> {
        self.restore = restore;
        self.backend.write_restore(restore)?;
        self.backend.flush()
    }
}
