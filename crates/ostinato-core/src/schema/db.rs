use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::error::{Error, Result};
use crate::model::{Artist, Friendship, ListenEvent, Tag, TaggingEvent, User};

use super::migrations::MIGRATIONS;

/// How a write resolves an existing row with the same (composite) key.
///
/// The policy is applied uniformly across every entity table so a
/// re-import behaves the same way everywhere.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Keep the stored row, ignore the incoming one.
    #[default]
    Skip,
    /// Update the stored row in place with the incoming values.
    Overwrite,
}

/// A database connection with CRUD methods for the listening-history
/// entities.
///
/// Each caller holds its own `Database`; a single connection is never
/// shared mutably across concurrent callers.
#[derive(Debug)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) a database at the given path and apply migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Open an in-memory database (for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        // SQLite does not enforce foreign keys unless asked, per
        // connection.
        conn.pragma_update(None, "foreign_keys", true)?;
        let db = Self { conn };
        db.apply_migrations()?;
        Ok(db)
    }

    /// Get a reference to the underlying connection (for advanced queries).
    #[must_use]
    pub const fn conn(&self) -> &Connection {
        &self.conn
    }

    fn apply_migrations(&self) -> Result<()> {
        // Create migrations table if it doesn't exist
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
            [],
        )?;

        // Get applied migrations
        let mut stmt = self
            .conn
            .prepare("SELECT version FROM schema_migrations ORDER BY version")?;
        let applied: Vec<u32> = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        // Apply pending migrations
        for migration in MIGRATIONS {
            if !applied.contains(&migration.version) {
                log::info!(
                    "Applying migration {} ({})",
                    migration.version,
                    migration.name
                );
                self.conn.execute_batch(migration.sql)?;
                self.conn.execute(
                    "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
                    rusqlite::params![migration.version, migration.name],
                )?;
            }
        }

        Ok(())
    }

    /// Run a closure inside a single transaction.
    ///
    /// The importer stages rows in memory and flushes them through
    /// here, one commit per batch. If the closure fails the
    /// transaction is dropped without committing, so a failed batch
    /// never lands partially.
    pub fn batch<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        let tx = self.conn.unchecked_transaction()?;
        let value = f(self)?;
        tx.commit()?;
        Ok(value)
    }

    /// Verify the store is usable: the connection answers a trivial
    /// query and foreign-key enforcement is on.
    pub fn health_check(&self) -> Result<()> {
        let one: i64 = self.conn.query_row("SELECT 1", [], |row| row.get(0))?;
        if one != 1 {
            return Err(Error::InvalidData("store returned nonsense".into()));
        }
        let fk: i64 = self
            .conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))?;
        if fk != 1 {
            return Err(Error::InvalidData(
                "foreign key enforcement is disabled on this connection".into(),
            ));
        }
        Ok(())
    }
}

// Artist writes
impl Database {
    /// Insert an artist. Returns `true` if a row was written.
    pub fn insert_artist(&self, artist: &Artist, on_conflict: ConflictPolicy) -> Result<bool> {
        let sql = match on_conflict {
            ConflictPolicy::Skip => {
                "INSERT INTO artists (id, name, url, picture_url)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO NOTHING"
            }
            ConflictPolicy::Overwrite => {
                "INSERT INTO artists (id, name, url, picture_url)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                     name = excluded.name,
                     url = excluded.url,
                     picture_url = excluded.picture_url"
            }
        };
        let changed = self.conn.execute(
            sql,
            rusqlite::params![artist.id, artist.name, artist.url, artist.picture_url],
        )?;
        Ok(changed > 0)
    }

    /// Administrative cleanup: delete an artist and, via cascade, all
    /// listens and taggings referencing it.
    pub fn delete_artist(&self, artist_id: i64) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM artists WHERE id = ?1", [artist_id])?;
        Ok(changed > 0)
    }
}

// User writes
impl Database {
    /// Idempotently make sure a user row exists.
    ///
    /// Users are never declared in the source data; every relation row
    /// that references a user id goes through here first. Returns
    /// `true` if the row was newly created.
    pub fn ensure_user(&self, user: User) -> Result<bool> {
        let changed = self.conn.execute(
            "INSERT INTO users (user_id) VALUES (?1) ON CONFLICT DO NOTHING",
            [user.user_id],
        )?;
        Ok(changed > 0)
    }

    /// Administrative cleanup: delete a user and, via cascade, all
    /// listens, taggings, and friendship edges referencing it.
    pub fn delete_user(&self, user_id: i64) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM users WHERE user_id = ?1", [user_id])?;
        Ok(changed > 0)
    }
}

// Tag writes
impl Database {
    /// Insert a tag. Returns `true` if a row was written.
    ///
    /// Tag text is unique; a later tag carrying an already-seen value
    /// is skipped regardless of the conflict policy, never silently
    /// overwritten.
    pub fn insert_tag(&self, tag: &Tag) -> Result<bool> {
        let changed = self.conn.execute(
            "INSERT INTO tags (tag_id, tag_value) VALUES (?1, ?2) ON CONFLICT DO NOTHING",
            rusqlite::params![tag.tag_id, tag.tag_value],
        )?;
        Ok(changed > 0)
    }

    /// Administrative cleanup: delete a tag and, via cascade, all
    /// taggings referencing it.
    pub fn delete_tag(&self, tag_id: i64) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM tags WHERE tag_id = ?1", [tag_id])?;
        Ok(changed > 0)
    }
}

// Relation writes
impl Database {
    /// Insert a listen event. Returns `true` if a row was written.
    pub fn insert_listen(&self, listen: &ListenEvent, on_conflict: ConflictPolicy) -> Result<bool> {
        let sql = match on_conflict {
            ConflictPolicy::Skip => {
                "INSERT INTO user_artists (user_id, artist_id, weight)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(user_id, artist_id) DO NOTHING"
            }
            ConflictPolicy::Overwrite => {
                "INSERT INTO user_artists (user_id, artist_id, weight)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(user_id, artist_id) DO UPDATE SET weight = excluded.weight"
            }
        };
        let changed = self.conn.execute(
            sql,
            rusqlite::params![listen.user_id, listen.artist_id, listen.weight],
        )?;
        Ok(changed > 0)
    }

    /// Insert a tagging event. Returns `true` if a row was written.
    pub fn insert_tagging(
        &self,
        tagging: &TaggingEvent,
        on_conflict: ConflictPolicy,
    ) -> Result<bool> {
        let sql = match on_conflict {
            ConflictPolicy::Skip => {
                "INSERT INTO user_taggedartists
                     (user_id, artist_id, tag_id, timestamp, day, month, year)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(user_id, artist_id, tag_id, timestamp) DO NOTHING"
            }
            ConflictPolicy::Overwrite => {
                "INSERT INTO user_taggedartists
                     (user_id, artist_id, tag_id, timestamp, day, month, year)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(user_id, artist_id, tag_id, timestamp) DO UPDATE SET
                     day = excluded.day,
                     month = excluded.month,
                     year = excluded.year"
            }
        };
        let changed = self.conn.execute(
            sql,
            rusqlite::params![
                tagging.user_id,
                tagging.artist_id,
                tagging.tag_id,
                tagging.timestamp,
                tagging.date.map(|d| i64::from(d.day)),
                tagging.date.map(|d| i64::from(d.month)),
                tagging.date.map(|d| i64::from(d.year)),
            ],
        )?;
        Ok(changed > 0)
    }

    /// Insert a directed friendship edge. Returns `true` if a row was
    /// written. The edge has no non-key attributes, so both conflict
    /// policies reduce to skipping the duplicate.
    pub fn insert_friendship(&self, edge: &Friendship) -> Result<bool> {
        let changed = self.conn.execute(
            "INSERT INTO user_friends (user_id, friend_id)
             VALUES (?1, ?2)
             ON CONFLICT(user_id, friend_id) DO NOTHING",
            rusqlite::params![edge.user_id, edge.friend_id],
        )?;
        Ok(changed > 0)
    }
}

// Entity counts and id sets (used by the importer for referential
// checks and by the final statistics report)
impl Database {
    fn count(&self, sql: &str) -> Result<i64> {
        Ok(self.conn.query_row(sql, [], |row| row.get(0))?)
    }

    pub fn count_artists(&self) -> Result<i64> {
        self.count("SELECT COUNT(*) FROM artists")
    }

    pub fn count_users(&self) -> Result<i64> {
        self.count("SELECT COUNT(*) FROM users")
    }

    pub fn count_tags(&self) -> Result<i64> {
        self.count("SELECT COUNT(*) FROM tags")
    }

    pub fn count_listens(&self) -> Result<i64> {
        self.count("SELECT COUNT(*) FROM user_artists")
    }

    pub fn count_taggings(&self) -> Result<i64> {
        self.count("SELECT COUNT(*) FROM user_taggedartists")
    }

    pub fn count_friendships(&self) -> Result<i64> {
        self.count("SELECT COUNT(*) FROM user_friends")
    }

    /// Taggings whose timestamp is present but produced no calendar
    /// date: the measure of how much temporal data was unusable.
    pub fn count_undated_taggings(&self) -> Result<i64> {
        self.count(
            "SELECT COUNT(*) FROM user_taggedartists
             WHERE day IS NULL AND month IS NULL AND year IS NULL",
        )
    }

    /// All artist ids currently in the store.
    pub fn artist_ids(&self) -> Result<HashSet<i64>> {
        let mut stmt = self.conn.prepare("SELECT id FROM artists")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<HashSet<_>>>()?;
        Ok(ids)
    }

    /// All tag ids currently in the store.
    pub fn tag_ids(&self) -> Result<HashSet<i64>> {
        let mut stmt = self.conn.prepare("SELECT tag_id FROM tags")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<HashSet<_>>>()?;
        Ok(ids)
    }
}
