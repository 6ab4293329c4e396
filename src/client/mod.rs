//! HTTP replica of the habit store, used for remote mode.
//!
//! The client keeps a transient local view of the habit list. The server is
//! always the authority: successful responses replace cached records whole
//! (streaks are server-derived and never computed here), and optimistic
//! edits are rolled back whenever a request fails.

use std::path::Path;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use keepgoing_core::models::{Habit, WEEK_DAYS};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("server returned {status}: {message}")]
    Api { status: StatusCode, message: String },

    #[error("no habit with id {0} in the local view")]
    UnknownHabit(i64),

    #[error("day index {0} is out of range")]
    BadDay(usize),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Error envelope shared by all endpoints, including the import variant that
/// also carries `success: false`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

pub struct SyncClient {
    http: reqwest::Client,
    base_url: String,
    habits: Vec<Habit>,
}

impl SyncClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url: String = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            http: reqwest::Client::new(),
            base_url,
            habits: Vec::new(),
        }
    }

    /// The current local view. Possibly stale; `refresh` to resynchronize.
    pub fn habits(&self) -> &[Habit] {
        &self.habits
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn slot(&self, id: i64) -> Result<usize, ClientError> {
        self.habits
            .iter()
            .position(|habit| habit.id == id)
            .ok_or(ClientError::UnknownHabit(id))
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.error)
            .unwrap_or_else(|| status.to_string());
        Err(ClientError::Api { status, message })
    }

    /// Replaces the whole local view with the server's.
    pub async fn refresh(&mut self) -> Result<&[Habit], ClientError> {
        let response = Self::check(self.http.get(self.url("/habits")).send().await?).await?;
        self.habits = response.json().await?;
        Ok(&self.habits)
    }

    /// Creates a habit. The local view is only touched once the server
    /// confirms the record.
    pub async fn add(&mut self, name: &str) -> Result<Habit, ClientError> {
        let response = Self::check(
            self.http
                .post(self.url("/habits"))
                .json(&json!({ "name": name }))
                .send()
                .await?,
        )
        .await?;
        let habit: Habit = response.json().await?;
        self.habits.push(habit.clone());
        Ok(habit)
    }

    /// Marks one day done or not done, applying the new vector locally while
    /// the request is in flight. On failure the previous vector is restored;
    /// on success the cached record is replaced with the server's, which
    /// carries the authoritative streak.
    pub async fn set_day(
        &mut self,
        id: i64,
        day: usize,
        done: bool,
    ) -> Result<Habit, ClientError> {
        if day >= WEEK_DAYS {
            return Err(ClientError::BadDay(day));
        }
        let slot = self.slot(id)?;
        let before = self.habits[slot].days_checked;
        let mut days = before;
        days[day] = done;
        self.habits[slot].days_checked = days;

        let result = self.send_update(id, &days).await;
        match result {
            Ok(habit) => {
                self.habits[slot] = habit.clone();
                Ok(habit)
            }
            Err(err) => {
                debug!(id, day, "rolling back optimistic day edit");
                self.habits[slot].days_checked = before;
                Err(err)
            }
        }
    }

    async fn send_update(&self, id: i64, days: &[bool; WEEK_DAYS]) -> Result<Habit, ClientError> {
        let response = Self::check(
            self.http
                .put(self.url("/habits/update"))
                .json(&json!({ "id": id, "daysChecked": days }))
                .send()
                .await?,
        )
        .await?;
        Ok(response.json().await?)
    }

    /// Flips one day of the cached vector.
    pub async fn toggle_day(&mut self, id: i64, day: usize) -> Result<Habit, ClientError> {
        if day >= WEEK_DAYS {
            return Err(ClientError::BadDay(day));
        }
        let slot = self.slot(id)?;
        let done = !self.habits[slot].days_checked[day];
        self.set_day(id, day, done).await
    }

    /// Renames a habit. Not optimistic: the cached record is replaced on
    /// success only. The rename rides the update operation, so the streak
    /// transition applies to the vector sent alongside it.
    pub async fn rename(&mut self, id: i64, name: &str) -> Result<Habit, ClientError> {
        let slot = self.slot(id)?;
        let days = self.habits[slot].days_checked;
        let response = Self::check(
            self.http
                .put(self.url("/habits/update"))
                .json(&json!({ "id": id, "daysChecked": days, "name": name }))
                .send()
                .await?,
        )
        .await?;
        let habit: Habit = response.json().await?;
        self.habits[slot] = habit.clone();
        Ok(habit)
    }

    /// Deletes a habit, removing it from the local view immediately and
    /// reinserting it at its old position if the server refuses.
    pub async fn remove(&mut self, id: i64) -> Result<(), ClientError> {
        let slot = self.slot(id)?;
        let removed = self.habits.remove(slot);

        let result = async {
            Self::check(
                self.http
                    .delete(self.url("/habits/delete"))
                    .json(&json!({ "id": id }))
                    .send()
                    .await?,
            )
            .await
        }
        .await;

        if let Err(err) = result {
            debug!(id, "rolling back optimistic delete");
            self.habits.insert(slot, removed);
            return Err(err);
        }
        Ok(())
    }

    /// Downloads the whole store to a file. Returns the byte count.
    pub async fn export_to(&self, path: &Path) -> Result<u64, ClientError> {
        let response = Self::check(
            self.http
                .get(self.url("/habits/export"))
                .send()
                .await?,
        )
        .await?;
        let bytes = response.bytes().await?;
        std::fs::write(path, &bytes)?;
        Ok(bytes.len() as u64)
    }

    /// Uploads a snapshot file, replacing the entire server dataset, then
    /// reloads the local view; import is an opaque whole-dataset replace that
    /// cannot be reconciled incrementally. Returns the habit count afterward.
    pub async fn import_from(&mut self, path: &Path) -> Result<usize, ClientError> {
        let bytes = std::fs::read(path)?;
        self.import_bytes(bytes).await
    }

    pub async fn import_bytes(&mut self, bytes: Vec<u8>) -> Result<usize, ClientError> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name("habits.sqlite");
        let form = reqwest::multipart::Form::new().part("file", part);
        Self::check(
            self.http
                .post(self.url("/habits/import"))
                .multipart(form)
                .send()
                .await?,
        )
        .await?;
        self.refresh().await?;
        Ok(self.habits.len())
    }
}
