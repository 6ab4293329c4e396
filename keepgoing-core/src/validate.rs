//! Input guards applied before any store mutation.

use crate::error::{Error, Result};
use crate::models::{MAX_NAME_LEN, WEEK_DAYS};

pub fn habit_id(id: i64) -> Result<()> {
    if id < 1 {
        return Err(Error::Validation("Invalid habit id".into()));
    }
    Ok(())
}

/// Returns the trimmed form, which is what gets stored.
pub fn habit_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.chars().count() > MAX_NAME_LEN {
        return Err(Error::Validation("Invalid habit name".into()));
    }
    Ok(trimmed.to_string())
}

pub fn days_checked(days: &[bool]) -> Result<[bool; WEEK_DAYS]> {
    days.try_into()
        .map_err(|_| Error::Validation("Invalid daysChecked array".into()))
}
