/// A schema migration.
#[derive(Debug)]
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub sql: &'static str,
}

const MIGRATION_001: &str = r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Artists (ids are the stable integers from the source data)
CREATE TABLE IF NOT EXISTS artists (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    url TEXT,
    picture_url TEXT
);

CREATE INDEX IF NOT EXISTS idx_artists_name ON artists(name);

-- Users (derived: synthesized the first time an id is referenced)
CREATE TABLE IF NOT EXISTS users (
    user_id INTEGER PRIMARY KEY
);

-- Tags (tag text is unique across the table)
CREATE TABLE IF NOT EXISTS tags (
    tag_id INTEGER PRIMARY KEY,
    tag_value TEXT NOT NULL UNIQUE
);

-- Listen events: one row per (user, artist), cumulative play count
CREATE TABLE IF NOT EXISTS user_artists (
    user_id INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    artist_id INTEGER NOT NULL REFERENCES artists(id) ON DELETE CASCADE,
    weight INTEGER NOT NULL CHECK (weight >= 0),
    PRIMARY KEY (user_id, artist_id)
);

CREATE INDEX IF NOT EXISTS idx_user_artists_artist_id ON user_artists(artist_id);

-- Tagging events: timestamp is part of the key and never NULL;
-- day/month/year are NULL when the timestamp could not be decoded
CREATE TABLE IF NOT EXISTS user_taggedartists (
    user_id INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    artist_id INTEGER NOT NULL REFERENCES artists(id) ON DELETE CASCADE,
    tag_id INTEGER NOT NULL REFERENCES tags(tag_id) ON DELETE CASCADE,
    timestamp INTEGER NOT NULL,
    day INTEGER,
    month INTEGER,
    year INTEGER,
    PRIMARY KEY (user_id, artist_id, tag_id, timestamp)
);

CREATE INDEX IF NOT EXISTS idx_user_taggedartists_artist_id ON user_taggedartists(artist_id);
CREATE INDEX IF NOT EXISTS idx_user_taggedartists_tag_id ON user_taggedartists(tag_id);

-- Friendships: stored directed as given by the source; symmetry is a
-- query-time concern
CREATE TABLE IF NOT EXISTS user_friends (
    user_id INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    friend_id INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    PRIMARY KEY (user_id, friend_id)
);

CREATE INDEX IF NOT EXISTS idx_user_friends_friend_id ON user_friends(friend_id);
"#;

pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: MIGRATION_001,
}];
