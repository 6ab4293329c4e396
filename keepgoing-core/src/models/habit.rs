use serde::{Deserialize, Serialize};

/// Days in a tracked week. Index 0 is Sunday, index 6 is Saturday.
pub const WEEK_DAYS: usize = 7;

/// Maximum habit name length, counted in characters after trimming.
pub const MAX_NAME_LEN: usize = 100;

/// A tracked habit. Only the current week's vector is kept; the streak is the
/// count of consecutive weeks the vector was driven to all-true by an update.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    pub id: i64,
    pub name: String,
    pub days_checked: [bool; WEEK_DAYS],
    pub streak: u32,
}

impl Habit {
    /// Days completed so far this week.
    pub fn days_done(&self) -> usize {
        self.days_checked.iter().filter(|done| **done).count()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateHabitInput {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateHabitInput {
    pub days_checked: Vec<bool>,
    pub name: Option<String>,
}
