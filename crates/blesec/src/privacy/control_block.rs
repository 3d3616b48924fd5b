//! Queued privacy operations
//!
//! Resolving list commands and host address resolutions are serialized: a
//! single block is in flight at a time and the rest wait in FIFO order.

use super::types::ResolvingListEntry;
use crate::error::{BleError, BleResult};
use crate::gap::{AddressType, BdAddr};
use crate::smp::Irk;
use std::collections::VecDeque;

/// A single unit of privacy work
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum ControlBlock {
    AddDevice {
        entry: ResolvingListEntry,
        local_irk: Irk,
    },
    RemoveDevice {
        peer_address_type: AddressType,
        peer_identity_address: BdAddr,
    },
    ClearResolvingList,
    SetAddressResolution(bool),
    /// Walk of the resolving list; restarts from the first entry once invalidated
    ResolveAddress {
        address: BdAddr,
        index: usize,
        invalidated: bool,
    },
}

impl ControlBlock {
    pub(super) fn resolve(address: BdAddr) -> Self {
        ControlBlock::ResolveAddress {
            address,
            index: 0,
            invalidated: false,
        }
    }

    /// Completed by `ResolvingListActionComplete`
    pub(super) fn is_list_command(&self) -> bool {
        !matches!(self, ControlBlock::ResolveAddress { .. })
    }

    fn resolves(&self, target: &BdAddr) -> bool {
        matches!(self, ControlBlock::ResolveAddress { address, .. } if address == target)
    }
}

/// FIFO of control blocks with one in flight
#[derive(Debug)]
pub(super) struct ControlBlockQueue {
    in_flight: Option<ControlBlock>,
    pending: VecDeque<ControlBlock>,
    capacity: usize,
}

impl ControlBlockQueue {
    pub(super) fn new(capacity: usize) -> Self {
        Self {
            in_flight: None,
            pending: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub(super) fn is_full(&self) -> bool {
        self.pending.len() >= self.capacity
    }

    pub(super) fn push(&mut self, block: ControlBlock) -> BleResult<()> {
        if self.is_full() {
            return Err(BleError::NoMemory);
        }
        self.pending.push_back(block);
        Ok(())
    }

    /// Nothing in flight and nothing waiting
    pub(super) fn is_idle(&self) -> bool {
        self.in_flight.is_none() && self.pending.is_empty()
    }

    pub(super) fn pop_pending(&mut self) -> Option<ControlBlock> {
        self.pending.pop_front()
    }

    pub(super) fn in_flight(&self) -> Option<&ControlBlock> {
        self.in_flight.as_ref()
    }

    pub(super) fn take_in_flight(&mut self) -> Option<ControlBlock> {
        self.in_flight.take()
    }

    pub(super) fn set_in_flight(&mut self, block: ControlBlock) {
        self.in_flight = Some(block);
    }

    /// Whether `address` is already being resolved or waiting to be
    pub(super) fn is_resolving(&self, address: &BdAddr) -> bool {
        self.in_flight.iter().chain(self.pending.iter()).any(|b| b.resolves(address))
    }

    /// Mark the running resolution stale; queued ones start from scratch anyway
    pub(super) fn invalidate_resolution(&mut self) {
        if let Some(ControlBlock::ResolveAddress { invalidated, .. }) = self.in_flight.as_mut() {
            *invalidated = true;
        }
    }

    pub(super) fn len(&self) -> usize {
        self.pending.len() + usize::from(self.in_flight.is_some())
    }
}
