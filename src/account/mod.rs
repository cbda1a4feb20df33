pub mod identity;
pub mod provisioning;

pub use identity::{
    AccountIdentity, PlatformCapabilities, DEFAULT_ACCOUNT_NAME, DEFAULT_CONTENT_AUTHORITY,
    DEFAULT_CUSTOM_ACCOUNT_TYPE, LOCAL_ACCOUNT_TYPE,
};
pub use provisioning::{
    AccountProvisioner, AccountRegistry, Delay, DelayInterrupted, NoDelay, ProvisioningError,
    ProvisioningOutcome, RegistryError, Syncability, ThreadDelay, DEFAULT_SETTLE_DELAY,
};
