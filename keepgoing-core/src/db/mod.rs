mod schema;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use directories::ProjectDirs;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::models::{CreateHabitInput, Habit, UpdateHabitInput, WEEK_DAYS};
use crate::{streak, validate};

/// Handle to the habit store.
///
/// Clones share one SQLite connection behind a mutex, so every operation
/// serializes and sees one consistent view of the table. Snapshot import
/// swaps the backing file while holding that same lock, so a reader can
/// never observe a partially written file.
#[derive(Clone)]
pub struct Database {
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Database {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(Inner {
                conn,
                path: Some(path.to_path_buf()),
            })),
        })
    }

    /// Opens the database at the platform data directory.
    pub fn open_default() -> Result<Self> {
        let dirs = ProjectDirs::from("", "", "keepgoing").ok_or_else(|| {
            Error::Io(std::io::Error::other("could not resolve a data directory"))
        })?;
        Self::open(dirs.data_dir().join("habits.sqlite"))
    }

    /// In-memory store, used by tests. Has no backing file, so the snapshot
    /// operations are unavailable.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            inner: Arc::new(Mutex::new(Inner { conn, path: None })),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let inner = self.lock();
        migrate_conn(&inner.conn)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every habit in id order, which is insertion order for this table.
    pub fn all_habits(&self) -> Result<Vec<Habit>> {
        let inner = self.lock();
        let mut stmt = inner
            .conn
            .prepare("SELECT id, name, daysChecked, streak FROM habits ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<i64>>(3)?,
            ))
        })?;
        let mut habits = Vec::new();
        for row in rows {
            let (id, name, days_text, streak) = row?;
            habits.push(parse_habit(id, name, &days_text, streak)?);
        }
        Ok(habits)
    }

    pub fn get_habit(&self, id: i64) -> Result<Option<Habit>> {
        validate::habit_id(id)?;
        let inner = self.lock();
        habit_row(&inner.conn, id)
    }

    pub fn create_habit(&self, input: &CreateHabitInput) -> Result<Habit> {
        let name = validate::habit_name(&input.name)?;
        let inner = self.lock();
        inner.conn.execute(
            "INSERT INTO habits (name, daysChecked, streak) VALUES (?1, ?2, 0)",
            params![name, encode_days(&[false; WEEK_DAYS])?],
        )?;
        let id = inner.conn.last_insert_rowid();
        debug!(id, name = %name, "created habit");
        habit_row(&inner.conn, id)?.ok_or(Error::NotFound(id))
    }

    /// Persists the new week vector (and name, when given), then applies the
    /// streak transition in the same transaction. Returns the re-read record.
    ///
    /// An unknown id is an explicit error; nothing is written in that case.
    pub fn update_habit(&self, id: i64, input: &UpdateHabitInput) -> Result<Habit> {
        validate::habit_id(id)?;
        let days = validate::days_checked(&input.days_checked)?;
        let name = input.name.as_deref().map(validate::habit_name).transpose()?;

        let mut guard = self.lock();
        let inner = &mut *guard;
        let tx = inner.conn.transaction()?;
        let previous = tx
            .query_row(
                "SELECT streak FROM habits WHERE id = ?1",
                params![id],
                |row| row.get::<_, Option<i64>>(0),
            )
            .optional()?
            .ok_or(Error::NotFound(id))?;
        let previous = u32::try_from(previous.unwrap_or(0)).unwrap_or(0);

        if let Some(name) = &name {
            tx.execute(
                "UPDATE habits SET name = ?1 WHERE id = ?2",
                params![name, id],
            )?;
        }
        let next = streak::next_streak(previous, &days);
        tx.execute(
            "UPDATE habits SET daysChecked = ?1, streak = ?2 WHERE id = ?3",
            params![encode_days(&days)?, next, id],
        )?;
        tx.commit()?;
        debug!(id, streak = next, "updated habit");

        habit_row(&inner.conn, id)?.ok_or(Error::NotFound(id))
    }

    /// Removes a habit. Deleting an id that is already gone still succeeds
    /// and changes nothing.
    pub fn delete_habit(&self, id: i64) -> Result<()> {
        validate::habit_id(id)?;
        let inner = self.lock();
        let removed = inner
            .conn
            .execute("DELETE FROM habits WHERE id = ?1", params![id])?;
        debug!(id, removed, "deleted habit");
        Ok(())
    }

    /// A consistent byte image of the whole database file.
    ///
    /// Goes through `VACUUM INTO` a staging file so the copy is a complete,
    /// committed database regardless of journal state.
    pub fn export_snapshot(&self) -> Result<Vec<u8>> {
        let inner = self.lock();
        let path = backing_path(&inner)?;
        let staging = path.with_extension("sqlite.export");
        if staging.exists() {
            fs::remove_file(&staging)?;
        }
        inner.conn.execute(
            "VACUUM INTO ?1",
            params![staging.to_string_lossy().into_owned()],
        )?;
        let bytes = fs::read(&staging)?;
        fs::remove_file(&staging)?;
        info!(bytes = bytes.len(), "exported snapshot");
        Ok(bytes)
    }

    /// Atomically replaces the entire backing file with the supplied bytes.
    ///
    /// The bytes are staged next to the live file and verified to be a SQLite
    /// database with a readable `habits` table before the rename; a rejected
    /// snapshot leaves the store untouched. The store lock is held across the
    /// whole swap, so no operation can interleave with it.
    pub fn import_snapshot(&self, bytes: &[u8]) -> Result<()> {
        let mut inner = self.lock();
        let path = backing_path(&inner)?.to_path_buf();
        let staging = path.with_extension("sqlite.import");
        fs::write(&staging, bytes)?;
        if let Err(err) = verify_snapshot(&staging) {
            let _ = fs::remove_file(&staging);
            return Err(err);
        }

        // Close our handle before renaming over the live file, then reopen
        // whatever ends up at the path so a failed rename falls back to the
        // previous file.
        let placeholder = Connection::open_in_memory()?;
        drop(std::mem::replace(&mut inner.conn, placeholder));
        let swap = fs::rename(&staging, &path);
        inner.conn = Connection::open(&path)?;
        migrate_conn(&inner.conn)?;
        swap?;

        info!(bytes = bytes.len(), path = %path.display(), "imported snapshot");
        Ok(())
    }
}

fn migrate_conn(conn: &Connection) -> Result<()> {
    conn.execute_batch(schema::SCHEMA)?;
    // Snapshots that predate streak tracking lack the column.
    let mut stmt = conn.prepare("PRAGMA table_info(habits)")?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    if !columns.iter().any(|column| column == "streak") {
        conn.execute(
            "ALTER TABLE habits ADD COLUMN streak INTEGER NOT NULL DEFAULT 0",
            [],
        )?;
    }
    Ok(())
}

fn backing_path(inner: &Inner) -> Result<&PathBuf> {
    inner.path.as_ref().ok_or_else(|| {
        Error::Io(std::io::Error::other(
            "in-memory store has no backing file to exchange",
        ))
    })
}

fn verify_snapshot(path: &Path) -> Result<()> {
    let check = || -> rusqlite::Result<()> {
        let probe = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        probe
            .prepare("SELECT id, name, daysChecked FROM habits LIMIT 1")
            .map(|_| ())
    };
    check().map_err(|err| Error::BadSnapshot(format!("not a habits database: {err}")))
}

fn habit_row(conn: &Connection, id: i64) -> Result<Option<Habit>> {
    let row = conn
        .query_row(
            "SELECT id, name, daysChecked, streak FROM habits WHERE id = ?1",
            params![id],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<i64>>(3)?,
                ))
            },
        )
        .optional()?;
    row.map(|(id, name, days_text, streak)| parse_habit(id, name, &days_text, streak))
        .transpose()
}

fn parse_habit(id: i64, name: String, days_text: &str, streak: Option<i64>) -> Result<Habit> {
    let days_checked = serde_json::from_str::<[bool; WEEK_DAYS]>(days_text)
        .map_err(|err| Error::Corrupt(format!("habit {id}: bad daysChecked: {err}")))?;
    // NULL or out-of-range streaks from foreign snapshots read as 0.
    let streak = streak.and_then(|raw| u32::try_from(raw).ok()).unwrap_or(0);
    Ok(Habit {
        id,
        name,
        days_checked,
        streak,
    })
}

fn encode_days(days: &[bool; WEEK_DAYS]) -> Result<String> {
    Ok(serde_json::to_string(days)?)
}
