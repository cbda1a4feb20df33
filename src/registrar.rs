use thiserror::Error;

use crate::account::{
    AccountIdentity, AccountProvisioner, AccountRegistry, Delay, ProvisioningOutcome,
    DEFAULT_CONTENT_AUTHORITY,
};
use crate::calendar::{CalendarEntry, PROJECTION, build_calendar_values, internal_name};
use crate::provider::uri::{ACCOUNT_NAME_PARAM, ACCOUNT_TYPE_PARAM, CALLER_IS_SYNCADAPTER};
use crate::provider::{CalendarProvider, Column, ProviderError, ProviderUri, Selection};

/// Read-back projection; the verification key sits next to the listing columns.
const VERIFY_PROJECTION: [Column; 4] = [Column::Id, Column::Name, Column::DisplayName, Column::Color];
const VERIFY_ID_INDEX: usize = 0;
const VERIFY_DISPLAY_NAME_INDEX: usize = 2;
const VERIFY_COLOR_INDEX: usize = 3;

#[derive(Debug, Error)]
pub enum RegistrarError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Calendar {internal_name} is not visible after writing it")]
    VerificationFailed { internal_name: String },
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

impl RegistrarError {
    /// Message suitable for showing to the end user, for errors that are
    /// environmental rather than programming mistakes.
    pub fn user_hint(&self) -> Option<&'static str> {
        match self {
            RegistrarError::VerificationFailed { .. } => Some(
                "The calendar could not be read back after saving it. \
                 Check privacy or permission settings that restrict calendar access for this app.",
            ),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrarOptions {
    pub authority: String,
    pub verify_updates: bool,
    pub rollback_on_verification_failure: bool,
}

impl Default for RegistrarOptions {
    fn default() -> Self {
        Self {
            authority: DEFAULT_CONTENT_AUTHORITY.to_string(),
            verify_updates: false,
            rollback_on_verification_failure: true,
        }
    }
}

/// Creates, updates, and deletes the calendars owned by one local account.
pub struct CalendarRegistrar<P, R, D> {
    provider: P,
    provisioner: AccountProvisioner<R, D>,
    options: RegistrarOptions,
}

impl<P, R, D> CalendarRegistrar<P, R, D>
where
    P: CalendarProvider,
    R: AccountRegistry,
    D: Delay,
{
    pub fn new(provider: P, provisioner: AccountProvisioner<R, D>, options: RegistrarOptions) -> Self {
        Self {
            provider,
            provisioner,
            options,
        }
    }

    pub fn identity(&self) -> &AccountIdentity {
        self.provisioner.identity()
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn provisioner(&self) -> &AccountProvisioner<R, D> {
        &self.provisioner
    }

    /// Calendars uri scoped to this account, with the trusted-adapter flag set.
    pub fn calendars_uri(&self) -> ProviderUri {
        let identity = self.identity();
        ProviderUri::calendars(self.options.authority.clone())
            .with_param(CALLER_IS_SYNCADAPTER, "true")
            .with_param(ACCOUNT_NAME_PARAM, identity.name.clone())
            .with_param(ACCOUNT_TYPE_PARAM, identity.account_type.clone())
    }

    /// Inserts a calendar and reads it back.
    ///
    /// An accepted insert is not trusted on its own: privacy layers can drop
    /// the write or hide reads without reporting an error, so success means
    /// the row was seen again under its internal name.
    ///
    /// Any string is a valid display name, the empty one included.
    ///
    /// # Errors
    /// - `InvalidArgument` for a missing display name (before any other call)
    ///   or when the provider rejects the insert.
    /// - `VerificationFailed` when the inserted row cannot be read back.
    /// - `Provider` when the provider itself fails.
    pub fn create_calendar<'a>(
        &self,
        display_name: impl Into<Option<&'a str>>,
        color: i32,
    ) -> Result<CalendarEntry, RegistrarError> {
        let Some(display_name) = display_name.into() else {
            return Err(RegistrarError::InvalidArgument(
                "display name is required".to_string(),
            ));
        };

        if let ProvisioningOutcome::SoftFailure(e) = self.provisioner.ensure_account_ready() {
            tracing::debug!("Continuing without confirmed account: {}", e);
        }

        let values = build_calendar_values(self.identity(), display_name, color);
        let uri = self.calendars_uri();

        tracing::info!("Adding calendar {}", display_name);
        tracing::debug!("INSERT {} with values: {:?}", uri, values);

        let inserted = self.provider.insert(&uri, &values)?.ok_or_else(|| {
            tracing::error!("Provider rejected calendar {}", display_name);
            RegistrarError::InvalidArgument(format!("provider rejected calendar {}", display_name))
        })?;

        let name = internal_name(display_name);
        match self.read_back(&uri, &name, inserted.id())? {
            Some(entry) => {
                tracing::info!("Calendar {} created with ID: {}", display_name, entry.id);
                Ok(entry)
            }
            None => {
                tracing::error!(
                    "Query is empty after inserting {}; calendar read or write access may be blocked",
                    name
                );
                if self.options.rollback_on_verification_failure {
                    self.roll_back(&inserted);
                }
                Err(RegistrarError::VerificationFailed { internal_name: name })
            }
        }
    }

    /// Rewrites display name and color of calendar `id`. Unknown ids are a
    /// no-op on the provider side; the display name is passed through as is.
    pub fn update_calendar(&self, id: i64, display_name: &str, color: i32) -> Result<(), RegistrarError> {
        validate_id(id)?;

        let values = build_calendar_values(self.identity(), display_name, color);
        let uri = self.calendars_uri().with_appended_id(id);

        tracing::info!("Updating calendar {}: {}", id, display_name);
        tracing::debug!("UPDATE {} with values: {:?}", uri, values);

        let updated = self.provider.update(&uri, &values, &Selection::All)?;
        tracing::debug!("Update of calendar {} affected {} rows", id, updated);

        if self.options.verify_updates {
            self.verify_update(&uri, display_name, color)?;
        }
        Ok(())
    }

    /// Returns `true` iff exactly one row was removed.
    pub fn delete_calendar(&self, id: i64) -> Result<bool, RegistrarError> {
        validate_id(id)?;

        let uri = self.calendars_uri().with_appended_id(id);
        let deleted = self.provider.delete(&uri, &Selection::All)?;

        if deleted == 1 {
            tracing::info!("Calendar {} deleted", id);
        } else {
            tracing::warn!("Deleting calendar {} affected {} rows", id, deleted);
        }
        Ok(deleted == 1)
    }

    pub fn list_calendars(&self) -> Result<Vec<CalendarEntry>, RegistrarError> {
        let Some(rows) = self
            .provider
            .query(&self.calendars_uri(), &PROJECTION, &Selection::All)?
        else {
            tracing::warn!("Provider returned no result set for calendar listing");
            return Ok(Vec::new());
        };

        let entries = rows
            .into_rows()
            .iter()
            .map(CalendarEntry::from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Looks the calendar up by internal name. Display names are not unique,
    /// so when the insert reported a row id only that row counts.
    fn read_back(
        &self,
        uri: &ProviderUri,
        name: &str,
        inserted_id: Option<i64>,
    ) -> Result<Option<CalendarEntry>, RegistrarError> {
        let selection = Selection::equals(Column::Name, name);
        let Some(mut rows) = self.provider.query(uri, &VERIFY_PROJECTION, &selection)? else {
            return Ok(None);
        };

        let mut positioned = rows.move_to_first();
        while positioned {
            if let Some(row) = rows.current() {
                let entry = CalendarEntry::from_row_at(
                    row,
                    VERIFY_ID_INDEX,
                    VERIFY_DISPLAY_NAME_INDEX,
                    VERIFY_COLOR_INDEX,
                )?;
                if inserted_id.is_none_or(|id| id == entry.id) {
                    return Ok(Some(entry));
                }
            }
            positioned = rows.move_to_next();
        }
        Ok(None)
    }

    fn verify_update(&self, uri: &ProviderUri, display_name: &str, color: i32) -> Result<(), RegistrarError> {
        let stored = match self.provider.query(uri, &PROJECTION, &Selection::All)? {
            Some(mut rows) if !rows.is_empty() => {
                rows.move_to_first();
                rows.current().map(CalendarEntry::from_row).transpose()?
            }
            _ => None,
        };

        match stored {
            Some(entry) if entry.display_name == display_name && entry.color == color => Ok(()),
            _ => {
                tracing::error!("Calendar update is not visible at {}", uri);
                Err(RegistrarError::VerificationFailed {
                    internal_name: internal_name(display_name),
                })
            }
        }
    }

    fn roll_back(&self, inserted: &ProviderUri) {
        let Some(id) = inserted.id() else {
            tracing::warn!("Insert result {} has no row id; nothing to roll back", inserted);
            return;
        };

        let uri = self.calendars_uri().with_appended_id(id);
        match self.provider.delete(&uri, &Selection::All) {
            Ok(deleted) => tracing::info!("Rolled back calendar {} ({} rows)", id, deleted),
            Err(e) => tracing::warn!("Could not roll back calendar {}: {}", id, e),
        }
    }
}

fn validate_id(id: i64) -> Result<(), RegistrarError> {
    if id < 0 {
        return Err(RegistrarError::InvalidArgument(format!(
            "calendar id must not be negative: {}",
            id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::provisioning::{MockAccountRegistry, MockDelay};
    use crate::account::{NoDelay, PlatformCapabilities, Syncability};
    use crate::provider::content::MockCalendarProvider;
    use crate::provider::{Row, RowSet, Value, ValueSet};
    use crate::storage::{SqliteAccountRegistry, SqliteCalendarProvider};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const AUTHORITY: &str = "com.android.calendar";

    fn local_identity() -> AccountIdentity {
        AccountIdentity::new("Local Calendar", "LOCAL")
    }

    fn mock_registrar(
        provider: MockCalendarProvider,
    ) -> CalendarRegistrar<MockCalendarProvider, MockAccountRegistry, MockDelay> {
        let provisioner = AccountProvisioner::new(
            MockAccountRegistry::new(),
            MockDelay::new(),
            local_identity(),
            AUTHORITY,
            PlatformCapabilities::with_local_account_type(),
        );
        CalendarRegistrar::new(provider, provisioner, RegistrarOptions::default())
    }

    fn sqlite_registrar(
        capabilities: PlatformCapabilities,
        options: RegistrarOptions,
    ) -> CalendarRegistrar<SqliteCalendarProvider, SqliteAccountRegistry, NoDelay> {
        let identity = AccountIdentity::resolve("Local Calendar", "org.localcalendar.account", capabilities);
        let provisioner = AccountProvisioner::new(
            SqliteAccountRegistry::open_in_memory().unwrap(),
            NoDelay,
            identity,
            AUTHORITY,
            capabilities,
        );
        CalendarRegistrar::new(
            SqliteCalendarProvider::open_in_memory(AUTHORITY).unwrap(),
            provisioner,
            options,
        )
    }

    fn local_registrar() -> CalendarRegistrar<SqliteCalendarProvider, SqliteAccountRegistry, NoDelay> {
        sqlite_registrar(PlatformCapabilities::with_local_account_type(), RegistrarOptions::default())
    }

    fn row_uri(id: i64) -> ProviderUri {
        ProviderUri::calendars(AUTHORITY).with_appended_id(id)
    }

    fn verify_row(id: i64, name: &str, color: i32) -> Row {
        Row::new(vec![
            Value::Integer(id),
            Value::from(internal_name(name)),
            Value::from(name),
            Value::from(color),
        ])
    }

    fn counted(rows: RowSet, releases: &Arc<AtomicUsize>) -> RowSet {
        let releases = Arc::clone(releases);
        rows.with_release_hook(move || {
            releases.fetch_add(1, Ordering::SeqCst);
        })
    }

    /// Accepts writes, hides every row from readers.
    struct HiddenReadsProvider {
        inner: SqliteCalendarProvider,
        releases: Arc<AtomicUsize>,
    }

    impl CalendarProvider for HiddenReadsProvider {
        fn insert(&self, uri: &ProviderUri, values: &ValueSet) -> Result<Option<ProviderUri>, ProviderError> {
            self.inner.insert(uri, values)
        }

        fn query(
            &self,
            _uri: &ProviderUri,
            _projection: &[Column],
            _selection: &Selection,
        ) -> Result<Option<RowSet>, ProviderError> {
            Ok(Some(counted(RowSet::empty(), &self.releases)))
        }

        fn update(
            &self,
            uri: &ProviderUri,
            values: &ValueSet,
            selection: &Selection,
        ) -> Result<usize, ProviderError> {
            self.inner.update(uri, values, selection)
        }

        fn delete(&self, uri: &ProviderUri, selection: &Selection) -> Result<usize, ProviderError> {
            self.inner.delete(uri, selection)
        }
    }

    fn hidden_reads_registrar(
        rollback: bool,
    ) -> CalendarRegistrar<HiddenReadsProvider, SqliteAccountRegistry, NoDelay> {
        let provisioner = AccountProvisioner::new(
            SqliteAccountRegistry::open_in_memory().unwrap(),
            NoDelay,
            local_identity(),
            AUTHORITY,
            PlatformCapabilities::with_local_account_type(),
        );
        let provider = HiddenReadsProvider {
            inner: SqliteCalendarProvider::open_in_memory(AUTHORITY).unwrap(),
            releases: Arc::new(AtomicUsize::new(0)),
        };
        let options = RegistrarOptions {
            rollback_on_verification_failure: rollback,
            ..RegistrarOptions::default()
        };
        CalendarRegistrar::new(provider, provisioner, options)
    }

    fn stored_rows(provider: &SqliteCalendarProvider, identity: &AccountIdentity) -> usize {
        let uri = ProviderUri::calendars(AUTHORITY)
            .with_param(ACCOUNT_NAME_PARAM, identity.name.clone())
            .with_param(ACCOUNT_TYPE_PARAM, identity.account_type.clone());
        provider
            .query(&uri, &PROJECTION, &Selection::All)
            .unwrap()
            .map_or(0, |rows| rows.len())
    }

    #[test]
    fn calendars_uri_carries_account_and_adapter_flag() {
        let registrar = local_registrar();

        let uri = registrar.calendars_uri();

        assert!(uri.is_sync_adapter());
        assert_eq!(uri.account(), Some(("Local Calendar", "LOCAL")));
    }

    #[test]
    fn create_returns_verified_entry() {
        let registrar = local_registrar();

        let entry = registrar.create_calendar("Work", 0xFF0000).unwrap();

        assert_eq!(entry.display_name, "Work");
        assert_eq!(entry.color, 0xFF0000);
        assert!(entry.id > 0);
    }

    #[test]
    fn created_calendar_is_found_by_internal_name() {
        let registrar = local_registrar();
        registrar.create_calendar("Work", 0xFF0000).unwrap();

        let rows = registrar
            .provider()
            .query(
                &registrar.calendars_uri(),
                &[Column::DisplayName, Column::Color, Column::AccessLevel, Column::OwnerAccount],
                &Selection::equals(Column::Name, "local_Work"),
            )
            .unwrap()
            .unwrap()
            .into_rows();

        assert_eq!(
            rows,
            vec![Row::new(vec![
                Value::from("Work"),
                Value::Integer(0xFF0000),
                Value::Integer(700),
                Value::from("Local Calendar"),
            ])]
        );
    }

    #[test]
    fn missing_display_name_fails_before_any_provider_call() {
        let mut provider = MockCalendarProvider::new();
        provider.expect_insert().never();
        provider.expect_query().never();
        let registrar = mock_registrar(provider);

        let result = registrar.create_calendar(None, 0);

        assert!(matches!(result, Err(RegistrarError::InvalidArgument(_))));
    }

    #[test]
    fn missing_display_name_skips_provisioning() {
        let mut registry = MockAccountRegistry::new();
        registry.expect_register().never();
        let mut delay = MockDelay::new();
        delay.expect_wait().never();
        let provisioner = AccountProvisioner::new(
            registry,
            delay,
            AccountIdentity::new("Local Calendar", "org.localcalendar.account"),
            AUTHORITY,
            PlatformCapabilities::without_local_account_type(),
        );
        let registrar = CalendarRegistrar::new(MockCalendarProvider::new(), provisioner, RegistrarOptions::default());

        assert!(matches!(
            registrar.create_calendar(None, 0),
            Err(RegistrarError::InvalidArgument(_))
        ));
    }

    #[test]
    fn blank_display_names_are_created() {
        let registrar = local_registrar();

        let empty = registrar.create_calendar("", 1).unwrap();
        let blank = registrar.create_calendar(" ", 2).unwrap();

        assert_eq!(empty.display_name, "");
        assert_eq!(blank.display_name, " ");
        assert_ne!(empty.id, blank.id);
    }

    #[test]
    fn duplicate_display_name_returns_the_new_row() {
        let registrar = local_registrar();

        let first = registrar.create_calendar("Work", 1).unwrap();
        let second = registrar.create_calendar("Work", 2).unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(second.color, 2);
        let ids: Vec<i64> = registrar
            .list_calendars()
            .unwrap()
            .into_iter()
            .map(|entry| entry.id)
            .collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }

    #[test]
    fn read_back_picks_the_inserted_id_among_name_matches() {
        let mut provider = MockCalendarProvider::new();
        provider.expect_insert().returning(|_, _| Ok(Some(row_uri(2))));
        provider.expect_query().times(1).returning(|_, _, _| {
            Ok(Some(RowSet::new(vec![
                verify_row(1, "Work", 1),
                verify_row(2, "Work", 2),
            ])))
        });

        let entry = mock_registrar(provider).create_calendar("Work", 2).unwrap();

        assert_eq!(
            entry,
            CalendarEntry {
                id: 2,
                display_name: "Work".to_string(),
                color: 2,
            }
        );
    }

    #[test]
    fn read_back_without_inserted_row_is_verification_failure() {
        let mut provider = MockCalendarProvider::new();
        provider.expect_insert().returning(|_, _| Ok(Some(row_uri(5))));
        provider
            .expect_query()
            .returning(|_, _, _| Ok(Some(RowSet::new(vec![verify_row(1, "Work", 1)]))));
        provider
            .expect_delete()
            .withf(|uri, _| uri.id() == Some(5))
            .times(1)
            .returning(|_, _| Ok(0));

        let result = mock_registrar(provider).create_calendar("Work", 2);

        assert!(matches!(result, Err(RegistrarError::VerificationFailed { .. })));
    }

    #[test]
    fn insert_result_without_id_reads_back_first_match() {
        let mut provider = MockCalendarProvider::new();
        provider
            .expect_insert()
            .returning(|_, _| Ok(Some(ProviderUri::calendars(AUTHORITY))));
        provider.expect_query().returning(|_, _, _| {
            Ok(Some(RowSet::new(vec![
                verify_row(3, "Work", 1),
                verify_row(4, "Work", 1),
            ])))
        });

        let entry = mock_registrar(provider).create_calendar("Work", 1).unwrap();

        assert_eq!(entry.id, 3);
    }

    #[test]
    fn rejected_insert_is_invalid_argument_without_verification() {
        let mut provider = MockCalendarProvider::new();
        provider.expect_insert().times(1).returning(|_, _| Ok(None));
        provider.expect_query().never();
        let registrar = mock_registrar(provider);

        let result = registrar.create_calendar("Work", 0xFF0000);

        assert!(matches!(result, Err(RegistrarError::InvalidArgument(_))));
    }

    #[test]
    fn insert_is_scoped_and_carries_full_value_set() {
        let mut provider = MockCalendarProvider::new();
        provider
            .expect_insert()
            .withf(|uri, values| {
                uri.is_sync_adapter()
                    && uri.account() == Some(("Local Calendar", "LOCAL"))
                    && values.get_text(Column::Name) == Some("local_Home")
                    && values.get_integer(Column::AccessLevel) == Some(700)
                    && values.get_integer(Column::Visible) == Some(1)
            })
            .times(1)
            .returning(|_, _| Ok(Some(row_uri(4))));
        provider
            .expect_query()
            .withf(|uri, _, selection| {
                uri.id().is_none() && *selection == Selection::equals(Column::Name, "local_Home")
            })
            .times(1)
            .returning(|_, _, _| Ok(Some(RowSet::new(vec![verify_row(4, "Home", 7)]))));
        let registrar = mock_registrar(provider);

        let entry = registrar.create_calendar("Home", 7).unwrap();

        assert_eq!(entry.id, 4);
    }

    #[test]
    fn provider_failure_on_insert_propagates() {
        let mut provider = MockCalendarProvider::new();
        provider
            .expect_insert()
            .returning(|_, _| Err(ProviderError::NotSyncAdapter("calendars".to_string())));
        provider.expect_query().never();
        let registrar = mock_registrar(provider);

        assert!(matches!(
            registrar.create_calendar("Work", 1),
            Err(RegistrarError::Provider(ProviderError::NotSyncAdapter(_)))
        ));
    }

    #[test]
    fn missing_result_set_is_verification_failure() {
        let mut provider = MockCalendarProvider::new();
        provider.expect_insert().returning(|_, _| Ok(Some(row_uri(0))));
        provider.expect_query().times(1).returning(|_, _, _| Ok(None));
        provider.expect_delete().times(1).returning(|_, _| Ok(0));
        let registrar = mock_registrar(provider);

        let err = registrar.create_calendar("Work", 1).unwrap_err();

        assert!(matches!(
            &err,
            RegistrarError::VerificationFailed { internal_name } if internal_name == "local_Work"
        ));
        assert!(err.user_hint().is_some());
    }

    #[test]
    fn verification_releases_result_set_on_success_and_failure() {
        let releases = Arc::new(AtomicUsize::new(0));

        let mut provider = MockCalendarProvider::new();
        provider.expect_insert().returning(|_, _| Ok(Some(row_uri(1))));
        let hook = Arc::clone(&releases);
        provider
            .expect_query()
            .times(1)
            .returning(move |_, _, _| Ok(Some(counted(RowSet::new(vec![verify_row(1, "Work", 1)]), &hook))));
        mock_registrar(provider).create_calendar("Work", 1).unwrap();

        let mut provider = MockCalendarProvider::new();
        provider.expect_insert().returning(|_, _| Ok(Some(row_uri(2))));
        let hook = Arc::clone(&releases);
        provider
            .expect_query()
            .times(1)
            .returning(move |_, _, _| Ok(Some(counted(RowSet::empty(), &hook))));
        provider.expect_delete().returning(|_, _| Ok(1));
        assert!(mock_registrar(provider).create_calendar("Work", 1).is_err());

        assert_eq!(releases.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn malformed_read_back_row_is_provider_error_and_released() {
        let releases = Arc::new(AtomicUsize::new(0));
        let hook = Arc::clone(&releases);

        let mut provider = MockCalendarProvider::new();
        provider.expect_insert().returning(|_, _| Ok(Some(row_uri(1))));
        provider.expect_query().returning(move |_, _, _| {
            Ok(Some(counted(
                RowSet::new(vec![Row::new(vec![Value::Null, Value::Null, Value::Null, Value::Null])]),
                &hook,
            )))
        });

        let result = mock_registrar(provider).create_calendar("Work", 1);

        assert!(matches!(
            result,
            Err(RegistrarError::Provider(ProviderError::MissingValue(Column::Id)))
        ));
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn hidden_write_is_rolled_back() {
        let registrar = hidden_reads_registrar(true);

        let result = registrar.create_calendar("Work", 1);

        assert!(matches!(result, Err(RegistrarError::VerificationFailed { .. })));
        assert_eq!(stored_rows(&registrar.provider().inner, &local_identity()), 0);
        assert_eq!(registrar.provider().releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn hidden_write_is_kept_when_rollback_is_disabled() {
        let registrar = hidden_reads_registrar(false);

        let result = registrar.create_calendar("Work", 1);

        assert!(matches!(result, Err(RegistrarError::VerificationFailed { .. })));
        assert_eq!(stored_rows(&registrar.provider().inner, &local_identity()), 1);
    }

    #[test]
    fn rollback_failure_keeps_verification_error() {
        let mut provider = MockCalendarProvider::new();
        provider.expect_insert().returning(|_, _| Ok(Some(row_uri(9))));
        provider.expect_query().returning(|_, _, _| Ok(Some(RowSet::empty())));
        provider
            .expect_delete()
            .withf(|uri, _| uri.id() == Some(9))
            .times(1)
            .returning(|_, _| Err(ProviderError::NotSyncAdapter("calendars".to_string())));

        let result = mock_registrar(provider).create_calendar("Work", 1);

        assert!(matches!(result, Err(RegistrarError::VerificationFailed { .. })));
    }

    #[test]
    fn create_registers_account_when_platform_requires_it() {
        let registrar = sqlite_registrar(
            PlatformCapabilities::without_local_account_type(),
            RegistrarOptions::default(),
        );

        registrar.create_calendar("Work", 1).unwrap();

        let registry = registrar.provisioner().registry();
        let identity = registrar.identity();
        assert!(registry.is_registered(identity).unwrap());
        let settings = registry.sync_settings(identity, AUTHORITY).unwrap().unwrap();
        assert!(!settings.sync_automatically);
        assert_eq!(settings.syncable, Syncability::NotSyncable);
    }

    #[test]
    fn second_create_proceeds_when_account_already_exists() {
        let registrar = sqlite_registrar(
            PlatformCapabilities::without_local_account_type(),
            RegistrarOptions::default(),
        );

        registrar.create_calendar("Work", 1).unwrap();
        let second = registrar.create_calendar("Home", 2).unwrap();

        assert_eq!(second.display_name, "Home");
        assert_eq!(registrar.list_calendars().unwrap().len(), 2);
    }

    #[test]
    fn create_waits_after_successful_registration() {
        let mut registry = MockAccountRegistry::new();
        registry.expect_register().times(1).returning(|_| Ok(true));
        registry.expect_set_sync_automatically().returning(|_, _, _| Ok(()));
        registry.expect_set_syncable().returning(|_, _, _| Ok(()));
        let mut delay = MockDelay::new();
        delay.expect_wait().times(1).returning(|_| Ok(()));

        let mut provider = MockCalendarProvider::new();
        provider.expect_insert().returning(|_, _| Ok(Some(row_uri(1))));
        provider
            .expect_query()
            .returning(|_, _, _| Ok(Some(RowSet::new(vec![verify_row(1, "Work", 1)]))));

        let provisioner = AccountProvisioner::new(
            registry,
            delay,
            AccountIdentity::new("Local Calendar", "org.localcalendar.account"),
            AUTHORITY,
            PlatformCapabilities::without_local_account_type(),
        );
        let registrar = CalendarRegistrar::new(provider, provisioner, RegistrarOptions::default());

        assert!(registrar.create_calendar("Work", 1).is_ok());
    }

    #[test]
    fn update_changes_name_and_color_but_not_ownership() {
        let registrar = local_registrar();
        let created = registrar.create_calendar("Personal", 0x00FF00).unwrap();

        registrar.update_calendar(created.id, "Work", 0xFF0000).unwrap();

        let rows = registrar
            .provider()
            .query(
                &registrar.calendars_uri().with_appended_id(created.id),
                &[
                    Column::DisplayName,
                    Column::Color,
                    Column::AccessLevel,
                    Column::OwnerAccount,
                    Column::AccountType,
                    Column::Visible,
                ],
                &Selection::All,
            )
            .unwrap()
            .unwrap()
            .into_rows();
        assert_eq!(
            rows,
            vec![Row::new(vec![
                Value::from("Work"),
                Value::Integer(0xFF0000),
                Value::Integer(700),
                Value::from("Local Calendar"),
                Value::from("LOCAL"),
                Value::Integer(1),
            ])]
        );
    }

    #[test]
    fn update_of_unknown_id_is_ok_without_verification() {
        let registrar = local_registrar();

        assert!(registrar.update_calendar(99, "Work", 1).is_ok());
    }

    #[test]
    fn update_of_unknown_id_fails_with_verification_enabled() {
        let registrar = sqlite_registrar(
            PlatformCapabilities::with_local_account_type(),
            RegistrarOptions {
                verify_updates: true,
                ..RegistrarOptions::default()
            },
        );

        let result = registrar.update_calendar(99, "Work", 1);

        assert!(matches!(result, Err(RegistrarError::VerificationFailed { .. })));
    }

    #[test]
    fn verified_update_succeeds_for_existing_row() {
        let registrar = sqlite_registrar(
            PlatformCapabilities::with_local_account_type(),
            RegistrarOptions {
                verify_updates: true,
                ..RegistrarOptions::default()
            },
        );
        let created = registrar.create_calendar("Home", 1).unwrap();

        assert!(registrar.update_calendar(created.id, "Cottage", 2).is_ok());
    }

    #[test]
    fn update_passes_blank_display_name_through() {
        let registrar = local_registrar();
        let created = registrar.create_calendar("Work", 1).unwrap();

        registrar.update_calendar(created.id, "", 1).unwrap();

        assert_eq!(registrar.list_calendars().unwrap()[0].display_name, "");
    }

    #[test]
    fn update_rejects_negative_id_without_provider_call() {
        let mut provider = MockCalendarProvider::new();
        provider.expect_update().never();
        let registrar = mock_registrar(provider);

        assert!(matches!(
            registrar.update_calendar(-1, "Work", 1),
            Err(RegistrarError::InvalidArgument(_))
        ));
    }

    #[test]
    fn delete_returns_true_for_existing_row() {
        let registrar = local_registrar();
        let created = registrar.create_calendar("Work", 1).unwrap();

        assert!(registrar.delete_calendar(created.id).unwrap());
        assert!(registrar.list_calendars().unwrap().is_empty());
    }

    #[test]
    fn delete_of_missing_row_returns_false_and_keeps_storage() {
        let registrar = local_registrar();
        registrar.create_calendar("Work", 1).unwrap();

        assert!(!registrar.delete_calendar(1234).unwrap());
        assert_eq!(registrar.list_calendars().unwrap().len(), 1);
    }

    #[test]
    fn delete_rejects_negative_id_without_provider_call() {
        let mut provider = MockCalendarProvider::new();
        provider.expect_delete().never();
        let registrar = mock_registrar(provider);

        assert!(matches!(
            registrar.delete_calendar(-1),
            Err(RegistrarError::InvalidArgument(_))
        ));
    }

    #[test]
    fn delete_treats_multiple_affected_rows_as_failure() {
        let mut provider = MockCalendarProvider::new();
        provider.expect_delete().times(1).returning(|_, _| Ok(2));
        let registrar = mock_registrar(provider);

        assert!(!registrar.delete_calendar(3).unwrap());
    }

    #[test]
    fn list_returns_entries_in_provider_order() {
        let registrar = local_registrar();
        registrar.create_calendar("Work", 1).unwrap();
        registrar.create_calendar("Home", 2).unwrap();

        let names: Vec<String> = registrar
            .list_calendars()
            .unwrap()
            .into_iter()
            .map(|entry| entry.display_name)
            .collect();

        assert_eq!(names, vec!["Work".to_string(), "Home".to_string()]);
    }

    #[test]
    fn list_without_result_set_is_empty() {
        let mut provider = MockCalendarProvider::new();
        provider.expect_query().returning(|_, _, _| Ok(None));

        assert!(mock_registrar(provider).list_calendars().unwrap().is_empty());
    }

    proptest! {
        #[test]
        fn created_calendar_reads_back_with_same_name_and_color(
            display_name in "[A-Za-z0-9 ]{0,24}",
            color in any::<i32>(),
        ) {
            let registrar = local_registrar();

            registrar.create_calendar(display_name.as_str(), color).unwrap();

            let rows = registrar
                .provider()
                .query(
                    &registrar.calendars_uri(),
                    &PROJECTION,
                    &Selection::equals(Column::Name, internal_name(&display_name)),
                )
                .unwrap()
                .unwrap()
                .into_rows();
            prop_assert_eq!(rows.len(), 1);
            let entry = CalendarEntry::from_row(&rows[0]).unwrap();
            prop_assert_eq!(entry.display_name, display_name);
            prop_assert_eq!(entry.color, color);
        }
    }
}
