use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::account::{
    AccountIdentity, PlatformCapabilities, DEFAULT_ACCOUNT_NAME, DEFAULT_CONTENT_AUTHORITY,
    DEFAULT_CUSTOM_ACCOUNT_TYPE,
};

const APP_DIR: &str = "local-calendar";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub account: AccountConfig,
    pub platform: PlatformConfig,
    pub provider: ProviderConfig,
    pub registrar: RegistrarConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountConfig {
    pub name: String,
    pub custom_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlatformConfig {
    pub requires_explicit_account_provisioning: bool,
    pub registration_settle_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderConfig {
    pub authority: String,
    pub database: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegistrarConfig {
    pub verify_updates: bool,
    pub rollback_on_verification_failure: bool,
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::from)
    }

    pub fn load_or_create() -> Result<Self, ConfigError> {
        Self::load_or_create_at(&Self::config_path())
    }

    pub fn load_or_create_at(config_path: &std::path::Path) -> Result<Self, ConfigError> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            Self::from_toml(&content)
        } else {
            let config = Self::default();
            config.save_to(config_path)?;
            Ok(config)
        }
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    pub fn save_to(&self, config_path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;

        Ok(())
    }

    pub fn capabilities(&self) -> PlatformCapabilities {
        PlatformCapabilities {
            requires_explicit_account_provisioning: self
                .platform
                .requires_explicit_account_provisioning,
        }
    }

    pub fn identity(&self) -> AccountIdentity {
        AccountIdentity::resolve(
            &self.account.name,
            &self.account.custom_type,
            self.capabilities(),
        )
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.platform.registration_settle_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            account: AccountConfig {
                name: DEFAULT_ACCOUNT_NAME.to_string(),
                custom_type: DEFAULT_CUSTOM_ACCOUNT_TYPE.to_string(),
            },
            platform: PlatformConfig {
                requires_explicit_account_provisioning: false,
                registration_settle_ms: 2000,
            },
            provider: ProviderConfig {
                authority: DEFAULT_CONTENT_AUTHORITY.to_string(),
                database: Self::config_dir().join("calendars.db"),
            },
            registrar: RegistrarConfig {
                verify_updates: false,
                rollback_on_verification_failure: true,
            },
        }
    }
}
