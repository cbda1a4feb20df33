use serde::{Deserialize, Serialize};

pub const DEFAULT_ACCOUNT_NAME: &str = "Local Calendar";
pub const DEFAULT_CUSTOM_ACCOUNT_TYPE: &str = "org.localcalendar.account";
/// Account type the provider accepts without a registry entry, where supported.
pub const LOCAL_ACCOUNT_TYPE: &str = "LOCAL";
pub const DEFAULT_CONTENT_AUTHORITY: &str = "com.android.calendar";

/// Platform features the registrar branches on, resolved once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlatformCapabilities {
    pub requires_explicit_account_provisioning: bool,
}

impl PlatformCapabilities {
    pub fn with_local_account_type() -> Self {
        Self {
            requires_explicit_account_provisioning: false,
        }
    }

    pub fn without_local_account_type() -> Self {
        Self {
            requires_explicit_account_provisioning: true,
        }
    }
}

/// The synthetic owner of every calendar the registrar creates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountIdentity {
    pub name: String,
    pub account_type: String,
}

impl AccountIdentity {
    pub fn new(name: impl Into<String>, account_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            account_type: account_type.into(),
        }
    }

    /// Picks the account type for the platform: the native local type when it
    /// exists, otherwise the custom type that has to be registered.
    pub fn resolve(name: &str, custom_type: &str, capabilities: PlatformCapabilities) -> Self {
        let account_type = if capabilities.requires_explicit_account_provisioning {
            custom_type
        } else {
            LOCAL_ACCOUNT_TYPE
        };
        Self::new(name, account_type)
    }

    pub fn is_local_type(&self) -> bool {
        self.account_type == LOCAL_ACCOUNT_TYPE
    }
}
