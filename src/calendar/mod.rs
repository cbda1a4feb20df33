pub mod calendar_type;
pub mod values;

pub use calendar_type::{
    AccessLevel, CalendarEntry, PROJECTION, PROJECTION_COLOR_INDEX, PROJECTION_DISPLAY_NAME_INDEX,
    PROJECTION_ID_INDEX,
};
pub use values::{build_calendar_values, internal_name, INTERNAL_NAME_PREFIX};
