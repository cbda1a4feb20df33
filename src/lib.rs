pub mod account;
pub mod calendar;
pub mod provider;
pub mod registrar;
pub mod storage;

pub use account::{AccountIdentity, PlatformCapabilities};
pub use calendar::{CalendarEntry, INTERNAL_NAME_PREFIX, PROJECTION};
pub use registrar::{CalendarRegistrar, RegistrarError, RegistrarOptions};
