pub mod account_store;
pub mod calendar_store;
pub mod config;

pub use account_store::{SqliteAccountRegistry, SyncSettings};
pub use calendar_store::SqliteCalendarProvider;
