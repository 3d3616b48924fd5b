//! Private address controller
//!
//! Owns the local private addresses and the resolving list. Depending on the
//! controller capabilities the resolving list lives in the link layer (every
//! change is queued as a control block) or on the host, in which case
//! scanned private addresses are resolved here by walking the list one IRK
//! at a time.

use super::cache::ResolutionCache;
use super::control_block::{ControlBlock, ControlBlockQueue};
use super::driver::{PrivacyDriver, PrivacyDriverEvent, RotationTimer};
use super::handler::PrivateAddressEventHandlerHandle;
use super::types::*;
use crate::config::{FeatureSupport, SecurityConfig};
use crate::error::{BleError, BleResult};
use crate::gap::{AddressType, BdAddr, NON_RESOLVABLE_PRIVATE_ADDRESS_BITS, RANDOM_ADDRESS_TYPE_MASK};
use crate::smp::Irk;
use log::{debug, error, trace, warn};
use rand::Rng;
use std::time::Duration;

/// Private address generation and resolution
pub struct PrivateAddressController<D: PrivacyDriver, T: RotationTimer> {
    driver: D,
    timer: T,
    features: FeatureSupport,
    event_handler: Option<PrivateAddressEventHandlerHandle>,

    local_irk: Irk,
    resolvable_address: Option<BdAddr>,
    non_resolvable_address: Option<BdAddr>,
    rpa_generation_pending: bool,
    /// The IRK changed while a generation was outstanding
    rpa_regeneration_requested: bool,

    rotation_timeout: Duration,
    rotation: RotationState,

    /// Host copy of the resolving list, one slot per bond
    resolving_list: Vec<Option<ResolvingListEntry>>,
    cache: ResolutionCache,
    queue: ControlBlockQueue,
}

impl<D: PrivacyDriver, T: RotationTimer> PrivateAddressController<D, T> {
    pub fn new(driver: D, timer: T, config: &SecurityConfig) -> Self {
        Self {
            driver,
            timer,
            features: config.features,
            event_handler: None,
            local_irk: Irk::default(),
            resolvable_address: None,
            non_resolvable_address: None,
            rpa_generation_pending: false,
            rpa_regeneration_requested: false,
            rotation_timeout: config.rotation_timeout,
            rotation: RotationState::Stopped,
            resolving_list: vec![None; config.max_bonds],
            cache: ResolutionCache::new(config.resolution_cache_size),
            queue: ControlBlockQueue::new(config.max_pending_privacy_operations),
        }
    }

    pub fn set_event_handler(&mut self, handler: Option<PrivateAddressEventHandlerHandle>) {
        self.event_handler = handler;
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    //
    // Local addresses
    //

    /// Store the local IRK and derive a new RPA from it
    pub fn set_local_irk(&mut self, irk: Irk) -> BleResult<()> {
        self.local_irk = irk;
        if self.rpa_generation_pending {
            self.rpa_regeneration_requested = true;
            return Ok(());
        }
        self.generate_resolvable_private_address()
    }

    pub fn local_irk(&self) -> &Irk {
        &self.local_irk
    }

    /// Last RPA generated from the local IRK
    pub fn resolvable_private_address(&self) -> Option<BdAddr> {
        self.resolvable_address
    }

    pub fn non_resolvable_private_address(&self) -> Option<BdAddr> {
        self.non_resolvable_address
    }

    /// Ask the driver for a new RPA; completion arrives as an event
    pub fn generate_resolvable_private_address(&mut self) -> BleResult<()> {
        if self.rpa_generation_pending {
            return Err(BleError::InvalidState);
        }
        if self.local_irk.is_zero() {
            warn!("local IRK not set, resolvable private address not generated");
            return Ok(());
        }

        self.driver.generate_resolvable_private_address(&self.local_irk)?;
        self.rpa_generation_pending = true;
        Ok(())
    }

    /// Draw a new NRPA and report it to the handler
    pub fn generate_non_resolvable_private_address(&mut self) -> BdAddr {
        let address = random_non_resolvable_address();
        debug!("new non resolvable private address {}", address);
        self.non_resolvable_address = Some(address);

        match self.event_handler.as_mut() {
            Some(handler) => handler.on_non_resolvable_private_addresses_generated(address),
            None => trace!("no privacy event handler, NRPA {} not reported", address),
        }
        address
    }

    /// Start periodic rotation of the private addresses
    pub fn start_private_address_generation(&mut self) {
        if self.rotation == RotationState::Running {
            return;
        }

        self.generate_non_resolvable_private_address();
        self.timer.attach(self.rotation_timeout);
        self.rotation = RotationState::Running;
        debug!("private address rotation started, period {:?}", self.rotation_timeout);
    }

    pub fn stop_private_address_generation(&mut self) {
        if self.rotation == RotationState::Stopped {
            return;
        }

        self.timer.detach();
        self.rotation = RotationState::Stopped;
        debug!("private address rotation stopped");
    }

    pub fn rotation_state(&self) -> RotationState {
        self.rotation
    }

    /// Change the rotation period; a running rotation restarts with it
    pub fn set_timeout(&mut self, timeout: Duration) -> BleResult<()> {
        if timeout.is_zero() {
            return Err(BleError::InvalidParameter(
                "rotation timeout must be non-zero".into(),
            ));
        }

        self.rotation_timeout = timeout;
        if self.driver.is_ll_privacy_supported() {
            self.driver.set_ll_resolvable_private_address_timeout(timeout)?;
        }

        if self.rotation == RotationState::Running {
            self.stop_private_address_generation();
            self.start_private_address_generation();
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        self.rotation_timeout
    }

    //
    // Resolving list
    //

    pub fn is_controller_privacy_supported(&self) -> bool {
        self.driver.is_ll_privacy_supported()
    }

    /// Where resolving list operations go
    pub fn resolution_mode(&self) -> BleResult<ResolutionMode> {
        if !self.features.privacy {
            Err(BleError::NotImplemented)
        } else if self.driver.is_ll_privacy_supported() {
            Ok(ResolutionMode::Controller)
        } else if self.features.host_based_resolution {
            Ok(ResolutionMode::Host)
        } else {
            Err(BleError::NotImplemented)
        }
    }

    pub fn read_resolving_list_capacity(&self) -> BleResult<usize> {
        match self.resolution_mode()? {
            ResolutionMode::Controller => Ok(self.driver.read_resolving_list_capacity()),
            ResolutionMode::Host => Ok(self.resolving_list.len()),
        }
    }

    /// Number of peers currently in the resolving list
    pub fn resolving_list_size(&self) -> usize {
        self.resolving_list.iter().flatten().count()
    }

    pub fn resolving_list(&self) -> impl Iterator<Item = &ResolvingListEntry> {
        self.resolving_list.iter().flatten()
    }

    /// Add a bonded peer; adding the exact same peer twice is a no-op
    pub fn add_device_to_resolving_list(
        &mut self,
        peer_address_type: AddressType,
        peer_identity_address: BdAddr,
        peer_irk: Irk,
    ) -> BleResult<()> {
        if self.local_irk.is_zero() {
            return Err(BleError::InvalidState);
        }
        let mode = self.resolution_mode()?;

        let entry = ResolvingListEntry::new(peer_address_type, peer_identity_address, peer_irk);
        if self.resolving_list.iter().flatten().any(|e| *e == entry) {
            return Ok(());
        }

        let slot = self
            .resolving_list
            .iter()
            .position(Option::is_none)
            .ok_or(BleError::NoMemory)?;

        if mode == ResolutionMode::Controller {
            self.submit(ControlBlock::AddDevice {
                entry,
                local_irk: self.local_irk,
            })?;
        }

        debug!("adding {} to the resolving list", peer_identity_address);
        self.resolving_list[slot] = Some(entry);
        self.cache.clear_unresolved();
        self.queue.invalidate_resolution();
        Ok(())
    }

    pub fn remove_device_from_resolving_list(
        &mut self,
        peer_address_type: AddressType,
        peer_identity_address: BdAddr,
    ) -> BleResult<()> {
        let mode = self.resolution_mode()?;

        let Some(slot) = self
            .resolving_list
            .iter()
            .position(|e| e.is_some_and(|e| e.matches(peer_address_type, &peer_identity_address)))
        else {
            debug!("{} not in the resolving list", peer_identity_address);
            return Ok(());
        };

        if mode == ResolutionMode::Controller {
            self.submit(ControlBlock::RemoveDevice {
                peer_address_type,
                peer_identity_address,
            })?;
        }

        self.resolving_list[slot] = None;
        self.cache.remove_identity(&ResolvedIdentity {
            address_type: peer_address_type,
            address: peer_identity_address,
        });
        self.queue.invalidate_resolution();
        Ok(())
    }

    pub fn clear_resolving_list(&mut self) -> BleResult<()> {
        if self.resolution_mode()? == ResolutionMode::Controller {
            self.submit(ControlBlock::ClearResolvingList)?;
        }

        for slot in self.resolving_list.iter_mut() {
            *slot = None;
        }
        self.cache.clear();
        self.queue.invalidate_resolution();
        Ok(())
    }

    /// Turn link layer address resolution on or off
    pub fn enable_controller_address_resolution(&mut self, enable: bool) -> BleResult<()> {
        if self.resolution_mode()? != ResolutionMode::Controller {
            return Err(BleError::NotImplemented);
        }
        self.submit(ControlBlock::SetAddressResolution(enable))
    }

    /// Resolve a scanned private address on the host
    ///
    /// Cached answers return immediately; otherwise a resolution is queued
    /// and its outcome reported through `on_address_resolution_completed`.
    pub fn resolve_private_address(&mut self, address: BdAddr) -> BleResult<AddressResolution> {
        if self.resolution_mode()? != ResolutionMode::Host {
            return Err(BleError::NotImplemented);
        }

        if let Some(identity) = self.cache.get(&address) {
            return Ok(AddressResolution::Resolved(identity));
        }
        if self.resolving_list_size() == 0 || self.cache.is_unresolvable(&address) {
            return Ok(AddressResolution::Unresolved);
        }

        if !self.queue.is_resolving(&address) {
            self.queue.push(ControlBlock::resolve(address))?;
            self.process_control_blocks(false);
        }
        Ok(AddressResolution::Pending)
    }

    /// Number of queued control blocks, including the one in flight
    pub fn pending_operations(&self) -> usize {
        self.queue.len()
    }

    //
    // Event dispatch
    //

    /// Handle one indication from the lower layer
    pub fn on_driver_event(&mut self, event: PrivacyDriverEvent) -> BleResult<()> {
        match event {
            PrivacyDriverEvent::ResolvablePrivateAddressGenerated(address) => {
                self.on_resolvable_private_address_generated(address)
            }
            PrivacyDriverEvent::PrivateAddressResolved(resolved) => {
                self.on_private_address_resolved(resolved);
                Ok(())
            }
            PrivacyDriverEvent::ResolvingListActionComplete => {
                if self.queue.in_flight().is_some_and(ControlBlock::is_list_command) {
                    self.process_control_blocks(true);
                } else {
                    debug!("unexpected resolving list completion");
                }
                Ok(())
            }
            PrivacyDriverEvent::RotationTimeout => self.on_rotation_timeout(),
        }
    }

    fn on_resolvable_private_address_generated(&mut self, address: BdAddr) -> BleResult<()> {
        self.rpa_generation_pending = false;
        self.resolvable_address = Some(address);
        debug!("new resolvable private address {}", address);

        match self.event_handler.as_mut() {
            Some(handler) => handler.on_resolvable_private_addresses_generated(address),
            None => trace!("no privacy event handler, RPA {} not reported", address),
        }

        if self.rpa_regeneration_requested {
            self.rpa_regeneration_requested = false;
            self.generate_resolvable_private_address()?;
        }
        Ok(())
    }

    fn on_rotation_timeout(&mut self) -> BleResult<()> {
        if self.rotation == RotationState::Stopped {
            trace!("rotation timeout while stopped");
            return Ok(());
        }

        match self.generate_resolvable_private_address() {
            Err(BleError::InvalidState) => debug!("previous RPA still being generated"),
            result => result?,
        }
        self.generate_non_resolvable_private_address();
        Ok(())
    }

    fn on_private_address_resolved(&mut self, resolved: bool) {
        let Some(block) = self.queue.take_in_flight() else {
            debug!("address resolution result without a pending resolution");
            return;
        };

        let (address, index, invalidated) = match block {
            ControlBlock::ResolveAddress {
                address,
                index,
                invalidated,
            } => (address, index, invalidated),
            other => {
                debug!("address resolution result while {:?} in flight", other);
                self.queue.set_in_flight(other);
                return;
            }
        };

        let index = if invalidated {
            0
        } else if resolved {
            let entry = self.resolving_list.get(index).copied().flatten();
            let identity = entry.as_ref().map(ResolvedIdentity::from);
            self.complete_resolution(address, identity);
            self.process_control_blocks(false);
            return;
        } else {
            index + 1
        };

        let mut block = ControlBlock::ResolveAddress {
            address,
            index,
            invalidated: false,
        };
        if self.execute(&mut block) {
            self.process_control_blocks(false);
        } else {
            self.queue.set_in_flight(block);
        }
    }

    /// Issue `block` right away when nothing is queued, otherwise queue it
    ///
    /// A command issued right away reports the driver error to the caller,
    /// which then leaves the host copy of the list untouched.
    fn submit(&mut self, mut block: ControlBlock) -> BleResult<()> {
        if !self.queue.is_idle() {
            return self.queue.push(block);
        }
        if !self.issue(&mut block)? {
            self.queue.set_in_flight(block);
        }
        Ok(())
    }

    /// Run the next blocks; `completed` retires the block in flight
    fn process_control_blocks(&mut self, completed: bool) {
        if completed {
            self.queue.take_in_flight();
        } else if self.queue.in_flight().is_some() {
            return;
        }

        while let Some(mut block) = self.queue.pop_pending() {
            if !self.execute(&mut block) {
                self.queue.set_in_flight(block);
                break;
            }
        }
    }

    /// Issue a queued block; true when it needs no completion event
    ///
    /// Nobody is left to return a driver error to, so it is logged and a
    /// failed resolution is reported as unresolved.
    fn execute(&mut self, block: &mut ControlBlock) -> bool {
        match self.issue(block) {
            Ok(completed) => completed,
            Err(e) => {
                error!("privacy command {:?} failed: {}", block, e);
                if let ControlBlock::ResolveAddress { address, .. } = block {
                    let address = *address;
                    self.report_resolution(address, None);
                }
                true
            }
        }
    }

    /// Send the command of `block` to the driver; true when it completed synchronously
    fn issue(&mut self, block: &mut ControlBlock) -> BleResult<bool> {
        let result = match block {
            ControlBlock::AddDevice { entry, local_irk } => self.driver.add_device_to_resolving_list(
                entry.peer_address_type,
                &entry.peer_identity_address,
                &entry.peer_irk,
                local_irk,
            ),
            ControlBlock::RemoveDevice {
                peer_address_type,
                peer_identity_address,
            } => self
                .driver
                .remove_device_from_resolving_list(*peer_address_type, peer_identity_address),
            ControlBlock::ClearResolvingList => self.driver.clear_resolving_list(),
            ControlBlock::SetAddressResolution(enable) => self.driver.set_ll_address_resolution(*enable),
            ControlBlock::ResolveAddress { address, index, .. } => {
                let next = self
                    .resolving_list
                    .iter()
                    .enumerate()
                    .skip(*index)
                    .find_map(|(i, e)| e.map(|e| (i, e)));

                let Some((next_index, entry)) = next else {
                    let address = *address;
                    self.complete_resolution(address, None);
                    return Ok(true);
                };

                *index = next_index;
                self.driver.resolve_private_address(address, &entry.peer_irk)
            }
        };

        result.map(|()| false)
    }

    /// Cache the outcome and report it
    fn complete_resolution(&mut self, address: BdAddr, identity: Option<ResolvedIdentity>) {
        match identity {
            Some(identity) => self.cache.insert_resolved(address, identity),
            None => self.cache.insert_unresolved(address),
        }
        self.report_resolution(address, identity);
    }

    fn report_resolution(&mut self, address: BdAddr, identity: Option<ResolvedIdentity>) {
        let Some(handler) = self.event_handler.as_mut() else {
            trace!("no privacy event handler, resolution of {} not reported", address);
            return;
        };
        handler.on_address_resolution_completed(
            address,
            identity.is_some(),
            identity.map(|i| (i.address_type, i.address)),
        );
    }
}

/// Random address with the two most significant bits cleared
fn random_non_resolvable_address() -> BdAddr {
    let mut rng = rand::thread_rng();
    loop {
        let mut bytes: [u8; 6] = rng.gen();
        bytes[5] = (bytes[5] & !RANDOM_ADDRESS_TYPE_MASK) | NON_RESOLVABLE_PRIVATE_ADDRESS_BITS;

        // the random part may be neither all zeros nor all ones
        let all_zero = bytes[..5].iter().all(|b| *b == 0x00) && bytes[5] == 0x00;
        let all_ones = bytes[..5].iter().all(|b| *b == 0xFF) && bytes[5] == !RANDOM_ADDRESS_TYPE_MASK;
        if !all_zero && !all_ones {
            return BdAddr::new(bytes);
        }
    }
}
