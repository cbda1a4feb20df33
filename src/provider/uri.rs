use std::collections::BTreeMap;
use std::fmt;

pub const CONTENT_SCHEME: &str = "content";
pub const CALENDARS_PATH: &str = "calendars";

pub const CALLER_IS_SYNCADAPTER: &str = "caller_is_syncadapter";
pub const ACCOUNT_NAME_PARAM: &str = "account_name";
pub const ACCOUNT_TYPE_PARAM: &str = "account_type";

/// Address of a table (or a single row) inside the provider, plus the query
/// parameters the provider reads caller identity from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderUri {
    authority: String,
    path: String,
    id: Option<i64>,
    params: BTreeMap<String, String>,
}

impl ProviderUri {
    pub fn new(authority: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            authority: authority.into(),
            path: path.into(),
            id: None,
            params: BTreeMap::new(),
        }
    }

    pub fn calendars(authority: impl Into<String>) -> Self {
        Self::new(authority, CALENDARS_PATH)
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_appended_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn is_sync_adapter(&self) -> bool {
        self.param(CALLER_IS_SYNCADAPTER)
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false)
    }

    /// Returns the account named by the query parameters, if both halves are present.
    pub fn account(&self) -> Option<(&str, &str)> {
        Some((self.param(ACCOUNT_NAME_PARAM)?, self.param(ACCOUNT_TYPE_PARAM)?))
    }
}

impl fmt::Display for ProviderUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}/{}", CONTENT_SCHEME, self.authority, self.path)?;
        if let Some(id) = self.id {
            write!(f, "/{}", id)?;
        }
        let mut separator = '?';
        for (key, value) in &self.params {
            write!(f, "{}{}={}", separator, key, value)?;
            separator = '&';
        }
        Ok(())
    }
}
