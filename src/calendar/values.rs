use crate::account::AccountIdentity;
use crate::calendar::calendar_type::AccessLevel;
use crate::provider::{Column, ValueSet};

/// Prepended to the display name to form the provider-level calendar name.
pub const INTERNAL_NAME_PREFIX: &str = "local_";

pub fn internal_name(display_name: &str) -> String {
    format!("{}{}", INTERNAL_NAME_PREFIX, display_name)
}

/// Full value set for a calendar row. Ownership, visibility, and access
/// columns are the same on every write.
pub fn build_calendar_values(identity: &AccountIdentity, display_name: &str, color: i32) -> ValueSet {
    let mut values = ValueSet::new();
    values.put(Column::AccountName, identity.name.as_str());
    values.put(Column::AccountType, identity.account_type.as_str());
    values.put(Column::Name, internal_name(display_name));
    values.put(Column::DisplayName, display_name);
    values.put(Column::Color, color);
    values.put(Column::AccessLevel, AccessLevel::Owner.level());
    values.put(Column::OwnerAccount, identity.name.as_str());
    values.put(Column::Visible, 1_i64);
    values.put(Column::SyncEvents, 1_i64);
    values
}
