//! Binary layout of the persisted bond table
//!
//! ```text
//! 0   version (u16)
//! 2   restore flag (u8)
//! 4   local identity (24)
//! 28  local CSRK (16)
//! 44  local sign counter (u32)
//! 48  entries, ENTRY_SIZE each
//! ..  version (u16)
//! ```
//!
//! All integers are little endian and every record is padded to 4 bytes.

use super::types::*;
use crate::error::{BleError, BleResult};
use crate::gap::BdAddr;
use crate::smp::{Csrk, Ediv, Irk, Ltk, Rand};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read, Write};

/// Layout revision; stored data with another version is discarded
pub const DB_VERSION: u16 = 1;

pub const VERSION_OFFSET: u64 = 0;
pub const RESTORE_OFFSET: u64 = 2;
pub const LOCAL_IDENTITY_OFFSET: u64 = 4;
pub const LOCAL_CSRK_OFFSET: u64 = LOCAL_IDENTITY_OFFSET + IDENTITY_SIZE as u64;
pub const LOCAL_SIGN_COUNTER_OFFSET: u64 = LOCAL_CSRK_OFFSET + Csrk::LEN as u64;
pub const ENTRIES_OFFSET: u64 = LOCAL_SIGN_COUNTER_OFFSET + 4;

pub const FLAGS_SIZE: usize = padded(6 + 1 + 1 + 2);
pub const KEYS_SIZE: usize = padded(Ltk::LEN + 2 + Rand::LEN);
pub const IDENTITY_SIZE: usize = padded(Irk::LEN + 6 + 1);
pub const SIGNING_SIZE: usize = padded(Csrk::LEN + 4);
pub const ENTRY_SIZE: usize = FLAGS_SIZE + 2 * KEYS_SIZE + IDENTITY_SIZE + SIGNING_SIZE;

const _: () = assert!(ENTRIES_OFFSET == 48);
const _: () = assert!(ENTRY_SIZE == 112);

const fn padded(size: usize) -> usize {
    (size + 3) & !3
}

/// Offset of the trailing version copy
pub const fn trailer_offset(max_entries: usize) -> u64 {
    ENTRIES_OFFSET + (max_entries * ENTRY_SIZE) as u64
}

/// Expected size of a store holding `max_entries`
pub const fn file_size(max_entries: usize) -> u64 {
    trailer_offset(max_entries) + 2
}

pub const fn entry_offset(index: usize) -> u64 {
    ENTRIES_OFFSET + (index * ENTRY_SIZE) as u64
}

/// Offset of a record inside its entry
pub fn record_offset(record: &EntryRecord<'_>) -> usize {
    match record {
        EntryRecord::Flags(_) => 0,
        EntryRecord::LocalKeys(_) => FLAGS_SIZE,
        EntryRecord::PeerKeys(_) => FLAGS_SIZE + KEYS_SIZE,
        EntryRecord::PeerIdentity(_) => FLAGS_SIZE + 2 * KEYS_SIZE,
        EntryRecord::PeerSigning(_) => FLAGS_SIZE + 2 * KEYS_SIZE + IDENTITY_SIZE,
    }
}

fn pad(buf: &mut Vec<u8>, size: usize) {
    buf.resize(size, 0);
}

pub fn encode_record(record: &EntryRecord<'_>) -> BleResult<Vec<u8>> {
    let mut buf = Vec::with_capacity(KEYS_SIZE);
    match record {
        EntryRecord::Flags(flags) => {
            buf.write_all(flags.peer_address.as_slice())?;
            buf.write_u8(u8::from(flags.peer_address_is_public))?;
            buf.write_u8(flags.encryption_key_size)?;
            buf.write_u16::<LittleEndian>(flags.flags.bits())?;
            pad(&mut buf, FLAGS_SIZE);
        }
        EntryRecord::LocalKeys(keys) | EntryRecord::PeerKeys(keys) => {
            buf.write_all(keys.ltk.as_bytes())?;
            buf.write_u16::<LittleEndian>(keys.ediv.0)?;
            buf.write_all(keys.rand.as_bytes())?;
            pad(&mut buf, KEYS_SIZE);
        }
        EntryRecord::PeerIdentity(identity) => {
            buf.extend_from_slice(&encode_identity(identity)?);
        }
        EntryRecord::PeerSigning(signing) => {
            buf.write_all(signing.csrk.as_bytes())?;
            buf.write_u32::<LittleEndian>(signing.counter)?;
            pad(&mut buf, SIGNING_SIZE);
        }
    }
    Ok(buf)
}

pub fn encode_entry(entry: &SecurityEntry) -> BleResult<Vec<u8>> {
    let mut buf = Vec::with_capacity(ENTRY_SIZE);
    for record in EntryRecord::all(entry) {
        buf.extend_from_slice(&encode_record(&record)?);
    }
    Ok(buf)
}

pub fn encode_identity(identity: &SecurityEntryIdentity) -> BleResult<Vec<u8>> {
    let mut buf = Vec::with_capacity(IDENTITY_SIZE);
    buf.write_all(identity.irk.as_bytes())?;
    buf.write_all(identity.identity_address.as_slice())?;
    buf.write_u8(u8::from(identity.identity_address_is_public))?;
    pad(&mut buf, IDENTITY_SIZE);
    Ok(buf)
}

fn read_array<const N: usize>(cursor: &mut Cursor<&[u8]>) -> BleResult<[u8; N]> {
    let mut bytes = [0u8; N];
    cursor.read_exact(&mut bytes)?;
    Ok(bytes)
}

fn skip_to(cursor: &mut Cursor<&[u8]>, position: usize) {
    cursor.set_position(position as u64);
}

fn read_keys(cursor: &mut Cursor<&[u8]>) -> BleResult<SecurityEntryKeys> {
    let start = cursor.position() as usize;
    let ltk = Ltk::new(read_array(cursor)?);
    let ediv = Ediv(cursor.read_u16::<LittleEndian>()?);
    let rand = Rand::new(read_array(cursor)?);
    skip_to(cursor, start + KEYS_SIZE);
    Ok(SecurityEntryKeys { ltk, ediv, rand })
}

fn read_identity(cursor: &mut Cursor<&[u8]>) -> BleResult<SecurityEntryIdentity> {
    let start = cursor.position() as usize;
    let irk = Irk::new(read_array(cursor)?);
    let identity_address = BdAddr::new(read_array(cursor)?);
    let identity_address_is_public = cursor.read_u8()? != 0;
    skip_to(cursor, start + IDENTITY_SIZE);
    Ok(SecurityEntryIdentity {
        irk,
        identity_address,
        identity_address_is_public,
    })
}

pub fn decode_identity(bytes: &[u8]) -> BleResult<SecurityEntryIdentity> {
    read_identity(&mut Cursor::new(bytes))
}

pub fn decode_entry(bytes: &[u8]) -> BleResult<SecurityEntry> {
    let mut cursor = Cursor::new(bytes);

    let peer_address = BdAddr::new(read_array(&mut cursor)?);
    let peer_address_is_public = cursor.read_u8()? != 0;
    let encryption_key_size = cursor.read_u8()?;
    let flags = DistributionFlags::from_bits_truncate(cursor.read_u16::<LittleEndian>()?);
    skip_to(&mut cursor, FLAGS_SIZE);

    let local_keys = read_keys(&mut cursor)?;
    let peer_keys = read_keys(&mut cursor)?;
    let peer_identity = read_identity(&mut cursor)?;

    let csrk = Csrk::new(read_array(&mut cursor)?);
    let counter = cursor.read_u32::<LittleEndian>()?;

    Ok(SecurityEntry {
        flags: SecurityDistributionFlags {
            peer_address,
            peer_address_is_public,
            encryption_key_size,
            flags,
        },
        local_keys,
        peer_keys,
        peer_identity,
        peer_signing: SecurityEntrySigning { csrk, counter },
    })
}

/// Decode a table of `max_entries` consecutive entries
pub fn decode_entries(bytes: &[u8], max_entries: usize) -> BleResult<Vec<SecurityEntry>> {
    if bytes.len() != max_entries * ENTRY_SIZE {
        return Err(BleError::CorruptData(format!(
            "entry table of {} bytes, expected {}",
            bytes.len(),
            max_entries * ENTRY_SIZE
        )));
    }
    bytes.chunks_exact(ENTRY_SIZE).map(decode_entry).collect()
}

pub fn encode_u16(value: u16) -> BleResult<Vec<u8>> {
    let mut buf = Vec::with_capacity(2);
    buf.write_u16::<LittleEndian>(value)?;
    Ok(buf)
}

pub fn encode_u32(value: u32) -> BleResult<Vec<u8>> {
    let mut buf = Vec::with_capacity(4);
    buf.write_u32::<LittleEndian>(value)?;
    Ok(buf)
}

pub fn decode_u16(bytes: &[u8]) -> BleResult<u16> {
    Ok(Cursor::new(bytes).read_u16::<LittleEndian>()?)
}

pub fn decode_u32(bytes: &[u8]) -> BleResult<u32> {
    Ok(Cursor::new(bytes).read_u32::<LittleEndian>()?)
}

pub fn decode_csrk(bytes: &[u8]) -> BleResult<Csrk> {
    Ok(Csrk::new(read_array(&mut Cursor::new(bytes))?))
}
