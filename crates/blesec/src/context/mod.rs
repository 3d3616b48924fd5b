//! Security context
//!
//! Owns the bond table, the security manager and the private address
//! controller, built from a single [`SecurityConfig`]. On initialization
//! the stored local keys are handed to the lower layers and every bonded
//! identity is loaded into the resolving list.


use crate::config::SecurityConfig;
use crate::error::{BleError, BleResult};
use crate::gap::BdAddr;
use crate::privacy::{PrivacyDriver, PrivateAddressController, RotationTimer};
use crate::security_db::{SecurityDb, SecurityDbBackend};
use crate::smp::{Csrk, Irk, SmpDriver, SmpManager};
use log::{debug, warn};

/// The security subsystem of one host stack instance
pub struct SecurityContext<D: SmpDriver, P: PrivacyDriver, T: RotationTimer> {
    config: SecurityConfig,
    db: SecurityDb,
    smp: SmpManager<D>,
    privacy: PrivateAddressController<P, T>,
}

impl<D: SmpDriver, P: PrivacyDriver, T: RotationTimer> SecurityContext<D, P, T> {
    pub fn new(
        config: SecurityConfig,
        backend: Box<dyn SecurityDbBackend>,
        smp_driver: D,
        privacy_driver: P,
        timer: T,
    ) -> Self {
        Self {
            db: SecurityDb::new(backend, config.max_bonds),
            smp: SmpManager::new(smp_driver, config.features, config.max_connections),
            privacy: PrivateAddressController::new(privacy_driver, timer, &config),
            config,
        }
    }

    pub fn config(&self) -> &SecurityConfig {
        &self.config
    }

    pub fn security_db(&self) -> &SecurityDb {
        &self.db
    }

    pub fn security_db_mut(&mut self) -> &mut SecurityDb {
        &mut self.db
    }

    pub fn smp(&self) -> &SmpManager<D> {
        &self.smp
    }

    pub fn smp_mut(&mut self) -> &mut SmpManager<D> {
        &mut self.smp
    }

    pub fn privacy(&self) -> &PrivateAddressController<P, T> {
        &self.privacy
    }

    pub fn privacy_mut(&mut self) -> &mut PrivateAddressController<P, T> {
        &mut self.privacy
    }

    /// Restore stored bonds and install the local keys
    pub fn initialize(&mut self) -> BleResult<()> {
        self.db.restore()?;
        self.smp.initialize()?;

        let identity = *self.db.get_local_identity();
        if self.config.features.privacy && !identity.irk.is_zero() {
            self.install_identity(identity.irk, identity.identity_address, identity.identity_address_is_public)?;
            self.populate_resolving_list()?;
        }

        let csrk = *self.db.get_local_csrk();
        if self.config.features.signing && !csrk.is_zero() {
            self.smp.set_csrk(csrk, self.db.get_local_sign_counter())?;
        }

        debug!("security context initialized");
        Ok(())
    }

    /// Stop address rotation and write back connected entries
    pub fn terminate(&mut self) -> BleResult<()> {
        self.privacy.stop_private_address_generation();
        self.db.sync(None)?;
        self.smp.terminate()
    }

    /// Store a new local identity and hand it to the lower layers
    pub fn set_local_identity(&mut self, irk: Irk, identity_address: BdAddr, public_address: bool) -> BleResult<()> {
        if !self.config.features.privacy {
            return Err(BleError::NotImplemented);
        }
        self.db.set_local_identity(irk, identity_address, public_address)?;
        self.install_identity(irk, identity_address, public_address)
    }

    /// Store a new local CSRK, restarting the sign counter
    pub fn set_local_csrk(&mut self, csrk: Csrk) -> BleResult<()> {
        self.smp.set_csrk(csrk, 0)?;
        self.db.set_local_sign_counter(0);
        self.db.set_local_csrk(csrk)
    }

    fn install_identity(&mut self, irk: Irk, identity_address: BdAddr, public_address: bool) -> BleResult<()> {
        self.smp.set_irk(irk)?;
        self.smp.set_identity_address(identity_address, public_address)?;
        self.privacy.set_local_irk(irk)
    }

    /// Add every bonded identity to the resolving list
    ///
    /// Returns the number of identities in the list afterwards. Without
    /// address resolution support nothing is added.
    pub fn populate_resolving_list(&mut self) -> BleResult<usize> {
        match self.privacy.resolution_mode() {
            Ok(_) => {}
            Err(BleError::NotImplemented) => {
                debug!("no address resolution, resolving list left empty");
                return Ok(0);
            }
            Err(e) => return Err(e),
        }

        let identities = self.db.get_identity_list();
        for (loaded, identity) in identities.iter().enumerate() {
            match self.privacy.add_device_to_resolving_list(
                identity.address_type(),
                identity.identity_address,
                identity.irk,
            ) {
                Ok(()) => {}
                Err(BleError::NoMemory) => {
                    warn!(
                        "resolving list full, {} of {} bonded identities loaded",
                        loaded,
                        identities.len()
                    );
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(self.privacy.resolving_list_size())
    }
}
