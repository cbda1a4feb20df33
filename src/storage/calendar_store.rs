use std::path::Path;

use rusqlite::{Connection, Result as SqliteResult, params_from_iter, types::Value as SqlValue};

use crate::provider::uri::CALENDARS_PATH;
use crate::provider::{
    CalendarProvider, Column, ProviderError, ProviderUri, Row, RowSet, Selection, Value, ValueSet,
};

/// SQLite-backed calendar provider.
///
/// Every call is scoped by the account named in the uri. Inserts and deletes
/// are only honoured for callers flagged as trusted sync adapters.
pub struct SqliteCalendarProvider {
    conn: Connection,
    authority: String,
}

impl SqliteCalendarProvider {
    pub fn new(conn: Connection, authority: impl Into<String>) -> Self {
        Self {
            conn,
            authority: authority.into(),
        }
    }

    pub fn open(path: &Path, authority: impl Into<String>) -> Result<Self, ProviderError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let provider = Self::new(Connection::open(path)?, authority);
        provider.initialize()?;
        Ok(provider)
    }

    pub fn open_in_memory(authority: impl Into<String>) -> Result<Self, ProviderError> {
        let provider = Self::new(Connection::open_in_memory()?, authority);
        provider.initialize()?;
        Ok(provider)
    }

    pub fn initialize(&self) -> Result<(), ProviderError> {
        // AUTOINCREMENT keeps deleted ids from being handed out again
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS calendars (
                _id INTEGER PRIMARY KEY AUTOINCREMENT,
                account_name TEXT NOT NULL,
                account_type TEXT NOT NULL,
                name TEXT,
                calendar_displayName TEXT,
                calendar_color INTEGER,
                calendar_access_level INTEGER,
                ownerAccount TEXT,
                visible INTEGER NOT NULL DEFAULT 1,
                sync_events INTEGER NOT NULL DEFAULT 0
            )",
            [],
        )?;
        Ok(())
    }

    pub fn table_exists(&self, table_name: &str) -> bool {
        let result: SqliteResult<i32> = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
            [table_name],
            |row| row.get(0),
        );
        result.unwrap_or(0) > 0
    }

    fn check_uri(&self, uri: &ProviderUri) -> Result<(), ProviderError> {
        if uri.authority() != self.authority || uri.path() != CALENDARS_PATH {
            return Err(ProviderError::UnsupportedUri(uri.to_string()));
        }
        Ok(())
    }

    fn require_sync_adapter(&self, uri: &ProviderUri) -> Result<(), ProviderError> {
        if !uri.is_sync_adapter() {
            return Err(ProviderError::NotSyncAdapter(uri.to_string()));
        }
        Ok(())
    }

    fn check_account(&self, uri: &ProviderUri, values: &ValueSet) -> Result<(), ProviderError> {
        let name = values
            .get_text(Column::AccountName)
            .ok_or(ProviderError::MissingValue(Column::AccountName))?;
        let account_type = values
            .get_text(Column::AccountType)
            .ok_or(ProviderError::MissingValue(Column::AccountType))?;

        if let Some((uri_name, uri_type)) = uri.account()
            && (uri_name != name || uri_type != account_type)
        {
            return Err(ProviderError::AccountMismatch {
                expected: format!("{}/{}", uri_name, uri_type),
                actual: format!("{}/{}", name, account_type),
            });
        }
        Ok(())
    }
}

fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Integer(v) => SqlValue::Integer(*v),
        Value::Text(v) => SqlValue::Text(v.clone()),
    }
}

fn from_sql(column: Column, value: SqlValue) -> Result<Value, ProviderError> {
    match value {
        SqlValue::Null => Ok(Value::Null),
        SqlValue::Integer(v) => Ok(Value::Integer(v)),
        SqlValue::Text(v) => Ok(Value::Text(v)),
        _ => Err(ProviderError::UnexpectedValue(column)),
    }
}

/// Builds the WHERE clause shared by query, update, and delete.
fn scope(uri: &ProviderUri, selection: &Selection) -> (String, Vec<SqlValue>) {
    let mut clauses = Vec::new();
    let mut args = Vec::new();

    if let Some(id) = uri.id() {
        clauses.push(format!("{} = ?", Column::Id.as_str()));
        args.push(SqlValue::Integer(id));
    }
    if let Some((name, account_type)) = uri.account() {
        clauses.push(format!(
            "{} = ? AND {} = ?",
            Column::AccountName.as_str(),
            Column::AccountType.as_str()
        ));
        args.push(SqlValue::Text(name.to_string()));
        args.push(SqlValue::Text(account_type.to_string()));
    }
    if let Selection::Equals(column, value) = selection {
        clauses.push(format!("{} = ?", column.as_str()));
        args.push(to_sql(value));
    }

    if clauses.is_empty() {
        (String::new(), args)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), args)
    }
}

fn writable(values: &ValueSet) -> Vec<(Column, SqlValue)> {
    values
        .iter()
        .filter(|(column, _)| **column != Column::Id)
        .map(|(column, value)| (*column, to_sql(value)))
        .collect()
}

impl CalendarProvider for SqliteCalendarProvider {
    fn insert(&self, uri: &ProviderUri, values: &ValueSet) -> Result<Option<ProviderUri>, ProviderError> {
        self.check_uri(uri)?;
        self.require_sync_adapter(uri)?;
        self.check_account(uri, values)?;

        let columns = writable(values);
        let names: Vec<&str> = columns.iter().map(|(c, _)| c.as_str()).collect();
        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO calendars ({}) VALUES ({})",
            names.join(", "),
            placeholders
        );

        let inserted = self
            .conn
            .execute(&sql, params_from_iter(columns.into_iter().map(|(_, v)| v)))?;
        if inserted == 0 {
            return Ok(None);
        }

        let id = self.conn.last_insert_rowid();
        tracing::debug!("Inserted calendar row {}", id);
        Ok(Some(ProviderUri::calendars(self.authority.clone()).with_appended_id(id)))
    }

    fn query(
        &self,
        uri: &ProviderUri,
        projection: &[Column],
        selection: &Selection,
    ) -> Result<Option<RowSet>, ProviderError> {
        self.check_uri(uri)?;

        let projection: Vec<Column> = if projection.is_empty() {
            Column::ALL.to_vec()
        } else {
            projection.to_vec()
        };
        let names: Vec<&str> = projection.iter().map(Column::as_str).collect();
        let (where_clause, args) = scope(uri, selection);
        let sql = format!(
            "SELECT {} FROM calendars{} ORDER BY {}",
            names.join(", "),
            where_clause,
            Column::Id.as_str()
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let raw_rows = stmt
            .query_map(params_from_iter(args), |row| {
                (0..projection.len())
                    .map(|i| row.get::<_, SqlValue>(i))
                    .collect::<SqliteResult<Vec<_>>>()
            })?
            .collect::<SqliteResult<Vec<_>>>()?;

        let rows = raw_rows
            .into_iter()
            .map(|raw| {
                raw.into_iter()
                    .zip(projection.iter())
                    .map(|(value, column)| from_sql(*column, value))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Row::new)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(RowSet::new(rows)))
    }

    fn update(
        &self,
        uri: &ProviderUri,
        values: &ValueSet,
        selection: &Selection,
    ) -> Result<usize, ProviderError> {
        self.check_uri(uri)?;
        self.check_account(uri, values)?;

        let columns = writable(values);
        if columns.is_empty() {
            return Ok(0);
        }
        let assignments: Vec<String> = columns
            .iter()
            .map(|(c, _)| format!("{} = ?", c.as_str()))
            .collect();
        let (where_clause, scope_args) = scope(uri, selection);
        let sql = format!(
            "UPDATE calendars SET {}{}",
            assignments.join(", "),
            where_clause
        );

        let args = columns.into_iter().map(|(_, v)| v).chain(scope_args);
        let updated = self.conn.execute(&sql, params_from_iter(args))?;
        Ok(updated)
    }

    fn delete(&self, uri: &ProviderUri, selection: &Selection) -> Result<usize, ProviderError> {
        self.check_uri(uri)?;
        self.require_sync_adapter(uri)?;

        let (where_clause, args) = scope(uri, selection);
        let sql = format!("DELETE FROM calendars{}", where_clause);
        let deleted = self.conn.execute(&sql, params_from_iter(args))?;
        Ok(deleted)
    }
}
