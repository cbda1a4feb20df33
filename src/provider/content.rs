use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::provider::uri::ProviderUri;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Caller is not a trusted sync adapter for {0}")]
    NotSyncAdapter(String),
    #[error("Account mismatch: uri is scoped to {expected}, values name {actual}")]
    AccountMismatch { expected: String, actual: String },
    #[error("Unsupported uri: {0}")]
    UnsupportedUri(String),
    #[error("Missing value for column {0}")]
    MissingValue(Column),
    #[error("Unexpected value in column {0}")]
    UnexpectedValue(Column),
}

/// Calendar table columns known to this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Column {
    Id,
    AccountName,
    AccountType,
    Name,
    DisplayName,
    Color,
    AccessLevel,
    OwnerAccount,
    Visible,
    SyncEvents,
}

impl Column {
    pub const ALL: [Column; 10] = [
        Column::Id,
        Column::AccountName,
        Column::AccountType,
        Column::Name,
        Column::DisplayName,
        Column::Color,
        Column::AccessLevel,
        Column::OwnerAccount,
        Column::Visible,
        Column::SyncEvents,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Column::Id => "_id",
            Column::AccountName => "account_name",
            Column::AccountType => "account_type",
            Column::Name => "name",
            Column::DisplayName => "calendar_displayName",
            Column::Color => "calendar_color",
            Column::AccessLevel => "calendar_access_level",
            Column::OwnerAccount => "ownerAccount",
            Column::Visible => "visible",
            Column::SyncEvents => "sync_events",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Null,
    Integer(i64),
    Text(String),
}

impl Value {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(value as i64)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

/// Column/value pairs written by an insert or update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueSet {
    values: BTreeMap<Column, Value>,
}

impl ValueSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, column: Column, value: impl Into<Value>) {
        self.values.insert(column, value.into());
    }

    pub fn get(&self, column: Column) -> Option<&Value> {
        self.values.get(&column)
    }

    pub fn get_text(&self, column: Column) -> Option<&str> {
        self.get(column).and_then(Value::as_text)
    }

    pub fn get_integer(&self, column: Column) -> Option<i64> {
        self.get(column).and_then(Value::as_integer)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Column, &Value)> {
        self.values.iter()
    }
}

/// Row filter. Only equality predicates are needed by the registrar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    All,
    Equals(Column, Value),
}

impl Selection {
    pub fn equals(column: Column, value: impl Into<Value>) -> Self {
        Selection::Equals(column, value.into())
    }
}

/// One result row, holding values in projection order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn get_integer(&self, index: usize) -> Option<i64> {
        self.get(index).and_then(Value::as_integer)
    }

    pub fn get_text(&self, index: usize) -> Option<&str> {
        self.get(index).and_then(Value::as_text)
    }
}

type ReleaseHook = Box<dyn FnOnce() + Send>;

/// Query result handed out by a provider.
///
/// The set is released exactly once: on [`RowSet::close`] or when dropped,
/// whichever comes first. Providers holding external resources attach a
/// release hook.
pub struct RowSet {
    rows: Vec<Row>,
    position: Option<usize>,
    release: Option<ReleaseHook>,
    closed: bool,
}

impl RowSet {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows,
            position: None,
            release: None,
            closed: false,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn with_release_hook(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.release = Some(Box::new(hook));
        self
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn move_to_first(&mut self) -> bool {
        if self.closed || self.rows.is_empty() {
            return false;
        }
        self.position = Some(0);
        true
    }

    pub fn move_to_next(&mut self) -> bool {
        if self.closed {
            return false;
        }
        let next = self.position.map_or(0, |p| p + 1);
        if next < self.rows.len() {
            self.position = Some(next);
            true
        } else {
            self.position = Some(self.rows.len());
            false
        }
    }

    pub fn current(&self) -> Option<&Row> {
        if self.closed {
            return None;
        }
        self.position.and_then(|p| self.rows.get(p))
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.position = None;
        if let Some(release) = self.release.take() {
            release();
        }
    }

    /// Takes the remaining rows and releases the set.
    pub fn into_rows(mut self) -> Vec<Row> {
        let rows = std::mem::take(&mut self.rows);
        self.close();
        rows
    }
}

impl Drop for RowSet {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for RowSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowSet")
            .field("rows", &self.rows)
            .field("position", &self.position)
            .field("closed", &self.closed)
            .finish()
    }
}

/// Shared calendar storage owned by an external service.
///
/// Implementations decide visibility on their own; an accepted insert is not
/// a promise that a following query will see the row.
#[cfg_attr(test, mockall::automock)]
pub trait CalendarProvider {
    /// Returns the uri of the new row, or `None` when the write was rejected.
    fn insert(&self, uri: &ProviderUri, values: &ValueSet)
        -> Result<Option<ProviderUri>, ProviderError>;

    /// Returns `None` when the provider refuses to produce a result set.
    fn query(
        &self,
        uri: &ProviderUri,
        projection: &[Column],
        selection: &Selection,
    ) -> Result<Option<RowSet>, ProviderError>;

    /// Returns the number of rows affected.
    fn update(
        &self,
        uri: &ProviderUri,
        values: &ValueSet,
        selection: &Selection,
    ) -> Result<usize, ProviderError>;

    /// Returns the number of rows affected.
    fn delete(&self, uri: &ProviderUri, selection: &Selection) -> Result<usize, ProviderError>;
}
