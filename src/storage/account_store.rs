use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};

use crate::account::{AccountIdentity, AccountRegistry, RegistryError, Syncability};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    pub sync_automatically: bool,
    pub syncable: Syncability,
}

/// SQLite-backed account registry.
pub struct SqliteAccountRegistry {
    conn: Connection,
}

impl SqliteAccountRegistry {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn open(path: &Path) -> Result<Self, RegistryError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let registry = Self::new(Connection::open(path)?);
        registry.initialize()?;
        Ok(registry)
    }

    pub fn open_in_memory() -> Result<Self, RegistryError> {
        let registry = Self::new(Connection::open_in_memory()?);
        registry.initialize()?;
        Ok(registry)
    }

    pub fn initialize(&self) -> Result<(), RegistryError> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS accounts (
                name TEXT NOT NULL,
                account_type TEXT NOT NULL,
                registered_at TEXT NOT NULL,
                PRIMARY KEY (name, account_type)
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS sync_settings (
                account_name TEXT NOT NULL,
                account_type TEXT NOT NULL,
                authority TEXT NOT NULL,
                sync_automatically INTEGER NOT NULL DEFAULT 1,
                syncable INTEGER NOT NULL DEFAULT -1,
                PRIMARY KEY (account_name, account_type, authority)
            )",
            [],
        )?;

        Ok(())
    }

    pub fn registered_at(&self, identity: &AccountIdentity) -> Result<Option<DateTime<Utc>>, RegistryError> {
        let stamp: Option<String> = self
            .conn
            .query_row(
                "SELECT registered_at FROM accounts WHERE name = ?1 AND account_type = ?2",
                [&identity.name, &identity.account_type],
                |row| row.get(0),
            )
            .optional()?;

        Ok(stamp
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc)))
    }

    pub fn is_registered(&self, identity: &AccountIdentity) -> Result<bool, RegistryError> {
        Ok(self.registered_at(identity)?.is_some())
    }

    pub fn sync_settings(
        &self,
        identity: &AccountIdentity,
        authority: &str,
    ) -> Result<Option<SyncSettings>, RegistryError> {
        let settings = self
            .conn
            .query_row(
                "SELECT sync_automatically, syncable FROM sync_settings
                 WHERE account_name = ?1 AND account_type = ?2 AND authority = ?3",
                rusqlite::params![&identity.name, &identity.account_type, authority],
                |row| {
                    let automatic: i64 = row.get(0)?;
                    let syncable: i64 = row.get(1)?;
                    Ok(SyncSettings {
                        sync_automatically: automatic != 0,
                        syncable: Syncability::from_flag(syncable),
                    })
                },
            )
            .optional()?;
        Ok(settings)
    }

    fn ensure_settings_row(&self, identity: &AccountIdentity, authority: &str) -> Result<(), RegistryError> {
        self.conn.execute(
            "INSERT OR IGNORE INTO sync_settings (account_name, account_type, authority)
             VALUES (?1, ?2, ?3)",
            rusqlite::params![&identity.name, &identity.account_type, authority],
        )?;
        Ok(())
    }
}

impl AccountRegistry for SqliteAccountRegistry {
    fn register(&self, identity: &AccountIdentity) -> Result<bool, RegistryError> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO accounts (name, account_type, registered_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![&identity.name, &identity.account_type, Utc::now().to_rfc3339()],
        )?;
        Ok(inserted == 1)
    }

    fn set_sync_automatically(
        &self,
        identity: &AccountIdentity,
        authority: &str,
        enabled: bool,
    ) -> Result<(), RegistryError> {
        self.ensure_settings_row(identity, authority)?;
        self.conn.execute(
            "UPDATE sync_settings SET sync_automatically = ?1
             WHERE account_name = ?2 AND account_type = ?3 AND authority = ?4",
            rusqlite::params![enabled as i64, &identity.name, &identity.account_type, authority],
        )?;
        Ok(())
    }

    fn set_syncable(
        &self,
        identity: &AccountIdentity,
        authority: &str,
        syncable: Syncability,
    ) -> Result<(), RegistryError> {
        self.ensure_settings_row(identity, authority)?;
        self.conn.execute(
            "UPDATE sync_settings SET syncable = ?1
             WHERE account_name = ?2 AND account_type = ?3 AND authority = ?4",
            rusqlite::params![syncable.as_flag(), &identity.name, &identity.account_type, authority],
        )?;
        Ok(())
    }
}
