pub mod content;
pub mod uri;

pub use content::{CalendarProvider, Column, ProviderError, Row, RowSet, Selection, Value, ValueSet};
pub use uri::ProviderUri;
