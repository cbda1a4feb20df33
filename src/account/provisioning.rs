use std::time::Duration;

use thiserror::Error;

use crate::account::identity::{AccountIdentity, PlatformCapabilities};

pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(2000);

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Registry unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syncability {
    Unknown,
    NotSyncable,
    Syncable,
}

impl Syncability {
    pub fn as_flag(&self) -> i64 {
        match self {
            Syncability::Unknown => -1,
            Syncability::NotSyncable => 0,
            Syncability::Syncable => 1,
        }
    }

    pub fn from_flag(flag: i64) -> Self {
        match flag {
            f if f < 0 => Syncability::Unknown,
            0 => Syncability::NotSyncable,
            _ => Syncability::Syncable,
        }
    }
}

/// Platform registry of account identities.
#[cfg_attr(test, mockall::automock)]
pub trait AccountRegistry {
    /// Returns `Ok(false)` when the registry declined, which includes the
    /// account already being present.
    fn register(&self, identity: &AccountIdentity) -> Result<bool, RegistryError>;

    fn set_sync_automatically(
        &self,
        identity: &AccountIdentity,
        authority: &str,
        enabled: bool,
    ) -> Result<(), RegistryError>;

    fn set_syncable(
        &self,
        identity: &AccountIdentity,
        authority: &str,
        syncable: Syncability,
    ) -> Result<(), RegistryError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Wait was interrupted")]
pub struct DelayInterrupted;

/// Blocking wait used after registration.
#[cfg_attr(test, mockall::automock)]
pub trait Delay {
    fn wait(&self, duration: Duration) -> Result<(), DelayInterrupted>;
}

/// Sleeps the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadDelay;

impl Delay for ThreadDelay {
    fn wait(&self, duration: Duration) -> Result<(), DelayInterrupted> {
        std::thread::sleep(duration);
        Ok(())
    }
}

/// Returns immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl Delay for NoDelay {
    fn wait(&self, _duration: Duration) -> Result<(), DelayInterrupted> {
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ProvisioningError {
    #[error("Registry declined the account; it may already be registered")]
    RegistrationRejected,
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("Interrupted while waiting for the account to settle")]
    Interrupted(#[from] DelayInterrupted),
}

#[derive(Debug)]
pub enum ProvisioningOutcome {
    NotRequired,
    Registered,
    SoftFailure(ProvisioningError),
}

impl ProvisioningOutcome {
    pub fn is_soft_failure(&self) -> bool {
        matches!(self, ProvisioningOutcome::SoftFailure(_))
    }
}

/// Makes sure the account identity exists before calendars are created.
pub struct AccountProvisioner<R, D> {
    registry: R,
    delay: D,
    identity: AccountIdentity,
    authority: String,
    capabilities: PlatformCapabilities,
    settle_delay: Duration,
}

impl<R: AccountRegistry, D: Delay> AccountProvisioner<R, D> {
    pub fn new(
        registry: R,
        delay: D,
        identity: AccountIdentity,
        authority: impl Into<String>,
        capabilities: PlatformCapabilities,
    ) -> Self {
        Self {
            registry,
            delay,
            identity,
            authority: authority.into(),
            capabilities,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }

    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    pub fn identity(&self) -> &AccountIdentity {
        &self.identity
    }

    pub fn capabilities(&self) -> PlatformCapabilities {
        self.capabilities
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Never fails; problems are logged and reported as a soft failure so the
    /// caller can go on optimistically.
    pub fn ensure_account_ready(&self) -> ProvisioningOutcome {
        if !self.capabilities.requires_explicit_account_provisioning {
            return ProvisioningOutcome::NotRequired;
        }

        tracing::debug!(
            "Registering account {} ({})",
            self.identity.name,
            self.identity.account_type
        );

        match self.registry.register(&self.identity) {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(
                    "Registry declined account {}; continuing in case it already exists",
                    self.identity.name
                );
                return ProvisioningOutcome::SoftFailure(ProvisioningError::RegistrationRejected);
            }
            Err(e) => {
                tracing::warn!("Failed to register account {}: {}", self.identity.name, e);
                return ProvisioningOutcome::SoftFailure(e.into());
            }
        }

        tracing::info!("Account {} was added", self.identity.name);

        let mut outcome = ProvisioningOutcome::Registered;
        if let Err(e) = self.disable_sync() {
            tracing::warn!("Could not disable sync for {}: {}", self.identity.name, e);
            outcome = ProvisioningOutcome::SoftFailure(e.into());
        }

        // registration propagates asynchronously inside the registry
        match self.delay.wait(self.settle_delay) {
            Ok(()) => tracing::debug!("Account settle wait finished"),
            Err(e) => {
                tracing::error!("Account settle wait failed: {}", e);
                outcome = ProvisioningOutcome::SoftFailure(e.into());
            }
        }

        outcome
    }

    fn disable_sync(&self) -> Result<(), RegistryError> {
        self.registry
            .set_sync_automatically(&self.identity, &self.authority, false)?;
        self.registry
            .set_syncable(&self.identity, &self.authority, Syncability::NotSyncable)
    }
}
