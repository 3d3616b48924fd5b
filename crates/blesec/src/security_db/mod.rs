//! Security database
//!
//! Keys and identities of bonded peers, indexed by the address a peer
//! connects with or by its identity, with pluggable persistence:
//! - [`MemorySecurityDb`]: nothing survives the process
//! - [`FileSecurityDb`]: a single flat file with fixed offsets
//! - [`KvSecurityDb`]: any [`KvStore`]

mod backend;
mod db;
mod file;
mod kv;
pub mod layout;
mod memory;
mod types;

pub use self::backend::SecurityDbBackend;
pub use self::db::SecurityDb;
pub use self::file::FileSecurityDb;
pub use self::kv::{entries_key, KvSecurityDb, KvStore, MemoryKvStore, KV_MAX_ENTRIES};
pub use self::memory::MemorySecurityDb;
pub use self::types::*;
