use serde::{Deserialize, Serialize};

use crate::provider::{Column, ProviderError, Row};

/// Columns every listing reads, in this order.
pub const PROJECTION: [Column; 3] = [Column::Id, Column::DisplayName, Column::Color];

pub const PROJECTION_ID_INDEX: usize = 0;
pub const PROJECTION_DISPLAY_NAME_INDEX: usize = 1;
pub const PROJECTION_COLOR_INDEX: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEntry {
    pub id: i64,
    pub display_name: String,
    pub color: i32,
}

impl CalendarEntry {
    /// Reads an entry from a row laid out like [`PROJECTION`].
    pub fn from_row(row: &Row) -> Result<Self, ProviderError> {
        Self::from_row_at(
            row,
            PROJECTION_ID_INDEX,
            PROJECTION_DISPLAY_NAME_INDEX,
            PROJECTION_COLOR_INDEX,
        )
    }

    pub(crate) fn from_row_at(
        row: &Row,
        id_index: usize,
        display_name_index: usize,
        color_index: usize,
    ) -> Result<Self, ProviderError> {
        let id = row
            .get_integer(id_index)
            .ok_or(ProviderError::MissingValue(Column::Id))?;
        let display_name = row
            .get_text(display_name_index)
            .ok_or(ProviderError::MissingValue(Column::DisplayName))?
            .to_string();
        let color = row
            .get_integer(color_index)
            .ok_or(ProviderError::MissingValue(Column::Color))?;
        let color = i32::try_from(color).map_err(|_| ProviderError::UnexpectedValue(Column::Color))?;

        Ok(Self {
            id,
            display_name,
            color,
        })
    }

    pub fn color_hex(&self) -> String {
        format!("#{:08X}", self.color as u32)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessLevel {
    None,
    FreeBusy,
    Read,
    Respond,
    Override,
    Contributor,
    Editor,
    Owner,
    Root,
}

impl AccessLevel {
    pub fn level(&self) -> i64 {
        match self {
            AccessLevel::None => 0,
            AccessLevel::FreeBusy => 100,
            AccessLevel::Read => 200,
            AccessLevel::Respond => 300,
            AccessLevel::Override => 400,
            AccessLevel::Contributor => 500,
            AccessLevel::Editor => 600,
            AccessLevel::Owner => 700,
            AccessLevel::Root => 800,
        }
    }
}
