//! Read-only queries over the populated store.
//!
//! Everything here is safe for concurrent callers as long as each one
//! holds its own [`Database`]; nothing mutates the store.

use rusqlite::OptionalExtension;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::error::Result;
use crate::model::{Artist, ListenEvent};
use crate::schema::Database;

/// How a multi-tag filter combines its tag criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// The artist must carry every requested tag.
    #[default]
    All,
    /// Any one of the requested tags is enough.
    Any,
}

/// An artist ranked by summed listening weight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedArtist {
    pub artist_id: i64,
    pub name: String,
    pub total_weight: i64,
}

/// Global statistics over the whole store.
///
/// `superstar_share` is the fraction of all listening weight held by
/// the top decile of listened artists; a value near 1.0 means a few
/// superstars dominate and everything else is long tail.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalStats {
    pub artists: i64,
    pub users: i64,
    pub tags: i64,
    pub listens: i64,
    pub tag_applications: i64,
    pub friendships: i64,
    pub undated_taggings: i64,
    pub total_weight: i64,
    pub superstar_share: f64,
}

/// A tag ranked by how many times it has been applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedTag {
    pub tag_id: i64,
    pub tag_value: String,
    pub uses: i64,
}

/// A user ranked by number of listen rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActiveUser {
    pub user_id: i64,
    pub listen_count: i64,
}

/// Per-user activity summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserStats {
    pub user_id: i64,
    pub listen_count: i64,
    pub tagging_count: i64,
    pub friend_count: i64,
    pub top_artists: Vec<RankedArtist>,
}

/// Per-artist popularity summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtistStats {
    pub artist_id: i64,
    pub name: String,
    pub total_weight: i64,
    pub listener_count: i64,
    pub tagging_count: i64,
    pub top_tags: Vec<(String, i64)>,
}

const ARTIST_COLUMNS: &str = "id, name, url, picture_url";

fn row_to_artist(row: &rusqlite::Row) -> rusqlite::Result<Artist> {
    Ok(Artist {
        id: row.get(0)?,
        name: row.get(1)?,
        url: row.get(2)?,
        picture_url: row.get(3)?,
    })
}

// Lookups
impl Database {
    /// Look up a single artist by id.
    pub fn artist(&self, artist_id: i64) -> Result<Option<Artist>> {
        let artist = self
            .conn()
            .query_row(
                &format!("SELECT {ARTIST_COLUMNS} FROM artists WHERE id = ?1"),
                [artist_id],
                row_to_artist,
            )
            .optional()?;
        Ok(artist)
    }

    /// Case-insensitive name substring search, ordered by id.
    pub fn artists_by_name(&self, fragment: &str) -> Result<Vec<Artist>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {ARTIST_COLUMNS} FROM artists
             WHERE name LIKE '%' || ?1 || '%'
             ORDER BY id"
        ))?;
        let artists = stmt
            .query_map([fragment], row_to_artist)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(artists)
    }

    pub fn user_exists(&self, user_id: i64) -> Result<bool> {
        let found: Option<i64> = self
            .conn()
            .query_row("SELECT user_id FROM users WHERE user_id = ?1", [user_id], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(found.is_some())
    }
}

// Multi-criteria filter
impl Database {
    /// Artists matching a set of tag values and/or a minimum aggregate
    /// listen weight, ordered by id.
    ///
    /// With no tags and no weight floor this degenerates to the full
    /// artist listing.
    pub fn artists_matching(
        &self,
        tag_values: &[String],
        min_total_weight: Option<i64>,
        mode: MatchMode,
    ) -> Result<Vec<Artist>> {
        let mut candidates: Option<HashSet<i64>> = None;
        for value in tag_values {
            let tagged = self.artists_with_tag(value)?;
            candidates = Some(match (candidates, mode) {
                (None, _) => tagged,
                (Some(acc), MatchMode::All) => acc.intersection(&tagged).copied().collect(),
                (Some(acc), MatchMode::Any) => acc.union(&tagged).copied().collect(),
            });
        }

        let totals = if min_total_weight.is_some() {
            self.artist_total_weights()?
        } else {
            HashMap::new()
        };

        let mut stmt = self
            .conn()
            .prepare(&format!("SELECT {ARTIST_COLUMNS} FROM artists ORDER BY id"))?;
        let artists = stmt
            .query_map([], row_to_artist)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(artists
            .into_iter()
            .filter(|artist| {
                candidates
                    .as_ref()
                    .is_none_or(|ids| ids.contains(&artist.id))
            })
            .filter(|artist| {
                min_total_weight.is_none_or(|min| {
                    totals.get(&artist.id).copied().unwrap_or(0) >= min
                })
            })
            .collect())
    }

    /// Distinct artists carrying a tag value (case-insensitive).
    fn artists_with_tag(&self, tag_value: &str) -> Result<HashSet<i64>> {
        let mut stmt = self.conn().prepare(
            "SELECT DISTINCT uta.artist_id
             FROM user_taggedartists uta
             JOIN tags t ON t.tag_id = uta.tag_id
             WHERE t.tag_value = ?1 COLLATE NOCASE",
        )?;
        let ids = stmt
            .query_map([tag_value], |row| row.get(0))?
            .collect::<rusqlite::Result<HashSet<_>>>()?;
        Ok(ids)
    }

    /// Summed listen weight per artist, for every artist with at least
    /// one listen.
    pub fn artist_total_weights(&self) -> Result<HashMap<i64, i64>> {
        let mut stmt = self.conn().prepare(
            "SELECT artist_id, SUM(weight) FROM user_artists GROUP BY artist_id",
        )?;
        let totals = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<HashMap<_, _>>>()?;
        Ok(totals)
    }
}

// Aggregations
impl Database {
    /// Entity counts plus the weight-distribution summary.
    pub fn global_stats(&self) -> Result<GlobalStats> {
        let totals = self.artist_total_weights()?;
        let total_weight: i64 = totals.values().sum();

        let superstar_share = if total_weight > 0 {
            let mut weights: Vec<i64> = totals.values().copied().collect();
            weights.sort_unstable_by(|a, b| b.cmp(a));
            // Top decile, at least one artist
            let top = weights.len().div_ceil(10);
            let top_weight: i64 = weights.iter().take(top).sum();
            top_weight as f64 / total_weight as f64
        } else {
            0.0
        };

        Ok(GlobalStats {
            artists: self.count_artists()?,
            users: self.count_users()?,
            tags: self.count_tags()?,
            listens: self.count_listens()?,
            tag_applications: self.count_taggings()?,
            friendships: self.count_friendships()?,
            undated_taggings: self.count_undated_taggings()?,
            total_weight,
            superstar_share,
        })
    }

    /// Top `n` artists by summed weight, optionally restricted to
    /// artists carrying a tag. Ties break by ascending artist id.
    pub fn top_artists(&self, n: usize, within_tag: Option<&str>) -> Result<Vec<RankedArtist>> {
        let ranked = match within_tag {
            None => {
                let mut stmt = self.conn().prepare(
                    "SELECT a.id, a.name, SUM(ua.weight) AS total
                     FROM artists a
                     JOIN user_artists ua ON ua.artist_id = a.id
                     GROUP BY a.id
                     ORDER BY total DESC, a.id ASC
                     LIMIT ?1",
                )?;
                let rows = stmt
                    .query_map([n as i64], |row| {
                        Ok(RankedArtist {
                            artist_id: row.get(0)?,
                            name: row.get(1)?,
                            total_weight: row.get(2)?,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            }
            Some(tag_value) => {
                let mut stmt = self.conn().prepare(
                    "SELECT a.id, a.name, SUM(ua.weight) AS total
                     FROM artists a
                     JOIN user_artists ua ON ua.artist_id = a.id
                     WHERE a.id IN (
                         SELECT uta.artist_id
                         FROM user_taggedartists uta
                         JOIN tags t ON t.tag_id = uta.tag_id
                         WHERE t.tag_value = ?1 COLLATE NOCASE
                     )
                     GROUP BY a.id
                     ORDER BY total DESC, a.id ASC
                     LIMIT ?2",
                )?;
                let rows = stmt
                    .query_map(rusqlite::params![tag_value, n as i64], |row| {
                        Ok(RankedArtist {
                            artist_id: row.get(0)?,
                            name: row.get(1)?,
                            total_weight: row.get(2)?,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            }
        };
        Ok(ranked)
    }

    /// Top `n` tags across the whole store by application count. Ties
    /// break by ascending tag id. Tags nobody has applied do not rank.
    pub fn top_tags(&self, n: usize) -> Result<Vec<RankedTag>> {
        let mut stmt = self.conn().prepare(
            "SELECT t.tag_id, t.tag_value, COUNT(*) AS uses
             FROM tags t
             JOIN user_taggedartists uta ON uta.tag_id = t.tag_id
             GROUP BY t.tag_id
             ORDER BY uses DESC, t.tag_id ASC
             LIMIT ?1",
        )?;
        let tags = stmt
            .query_map([n as i64], |row| {
                Ok(RankedTag {
                    tag_id: row.get(0)?,
                    tag_value: row.get(1)?,
                    uses: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tags)
    }

    /// Top `n` users by number of listen rows. Ties break by ascending
    /// user id. Users with no listens do not rank.
    pub fn most_active_users(&self, n: usize) -> Result<Vec<ActiveUser>> {
        let mut stmt = self.conn().prepare(
            "SELECT user_id, COUNT(*) AS listens
             FROM user_artists
             GROUP BY user_id
             ORDER BY listens DESC, user_id ASC
             LIMIT ?1",
        )?;
        let users = stmt
            .query_map([n as i64], |row| {
                Ok(ActiveUser {
                    user_id: row.get(0)?,
                    listen_count: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(users)
    }

    /// Most-applied tags for an artist: `(tag_value, application
    /// count)` ordered by count, then tag id.
    pub fn artist_tags(&self, artist_id: i64) -> Result<Vec<(String, i64)>> {
        let mut stmt = self.conn().prepare(
            "SELECT t.tag_value, COUNT(*) AS uses
             FROM user_taggedartists uta
             JOIN tags t ON t.tag_id = uta.tag_id
             WHERE uta.artist_id = ?1
             GROUP BY t.tag_id
             ORDER BY uses DESC, t.tag_id ASC",
        )?;
        let tags = stmt
            .query_map([artist_id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tags)
    }

    /// Activity summary for a user, `None` if the user is unknown.
    pub fn user_stats(&self, user_id: i64) -> Result<Option<UserStats>> {
        if !self.user_exists(user_id)? {
            return Ok(None);
        }

        let listen_count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM user_artists WHERE user_id = ?1",
            [user_id],
            |row| row.get(0),
        )?;
        let tagging_count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM user_taggedartists WHERE user_id = ?1",
            [user_id],
            |row| row.get(0),
        )?;
        let friend_count = self.friend_circle(user_id)?.len() as i64;

        let mut stmt = self.conn().prepare(
            "SELECT a.id, a.name, ua.weight
             FROM user_artists ua
             JOIN artists a ON a.id = ua.artist_id
             WHERE ua.user_id = ?1
             ORDER BY ua.weight DESC, a.id ASC
             LIMIT 5",
        )?;
        let top_artists = stmt
            .query_map([user_id], |row| {
                Ok(RankedArtist {
                    artist_id: row.get(0)?,
                    name: row.get(1)?,
                    total_weight: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Some(UserStats {
            user_id,
            listen_count,
            tagging_count,
            friend_count,
            top_artists,
        }))
    }

    /// Popularity summary for an artist, `None` if unknown.
    pub fn artist_stats(&self, artist_id: i64) -> Result<Option<ArtistStats>> {
        let Some(artist) = self.artist(artist_id)? else {
            return Ok(None);
        };

        let (total_weight, listener_count): (i64, i64) = self.conn().query_row(
            "SELECT COALESCE(SUM(weight), 0), COUNT(*)
             FROM user_artists WHERE artist_id = ?1",
            [artist_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let tagging_count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM user_taggedartists WHERE artist_id = ?1",
            [artist_id],
            |row| row.get(0),
        )?;

        let mut top_tags = self.artist_tags(artist_id)?;
        top_tags.truncate(5);

        Ok(Some(ArtistStats {
            artist_id,
            name: artist.name,
            total_weight,
            listener_count,
            tagging_count,
            top_tags,
        }))
    }
}

// Social graph
impl Database {
    /// The friend circle of a user: the union of both directions of
    /// the stored relation, sorted ascending, self excluded.
    pub fn friend_circle(&self, user_id: i64) -> Result<Vec<i64>> {
        let mut stmt = self.conn().prepare(
            "SELECT friend_id FROM user_friends WHERE user_id = ?1
             UNION
             SELECT user_id FROM user_friends WHERE friend_id = ?1
             ORDER BY 1",
        )?;
        let circle = stmt
            .query_map([user_id], |row| row.get::<_, i64>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(circle.into_iter().filter(|id| *id != user_id).collect())
    }
}

// Listening and tagging profiles (used by the recommendation engine)
impl Database {
    /// All listen events for a user.
    pub fn user_listens(&self, user_id: i64) -> Result<Vec<ListenEvent>> {
        let mut stmt = self.conn().prepare(
            "SELECT user_id, artist_id, weight FROM user_artists
             WHERE user_id = ?1 ORDER BY artist_id",
        )?;
        let listens = stmt
            .query_map([user_id], |row| {
                Ok(ListenEvent {
                    user_id: row.get(0)?,
                    artist_id: row.get(1)?,
                    weight: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(listens)
    }

    /// The distinct tag ids a user has ever applied.
    pub fn user_tag_vocabulary(&self, user_id: i64) -> Result<HashSet<i64>> {
        let mut stmt = self.conn().prepare(
            "SELECT DISTINCT tag_id FROM user_taggedartists WHERE user_id = ?1",
        )?;
        let vocab = stmt
            .query_map([user_id], |row| row.get(0))?
            .collect::<rusqlite::Result<HashSet<_>>>()?;
        Ok(vocab)
    }

    /// The distinct tag ids anyone has applied to an artist.
    pub fn artist_tag_ids(&self, artist_id: i64) -> Result<HashSet<i64>> {
        let mut stmt = self.conn().prepare(
            "SELECT DISTINCT tag_id FROM user_taggedartists WHERE artist_id = ?1",
        )?;
        let ids = stmt
            .query_map([artist_id], |row| row.get(0))?
            .collect::<rusqlite::Result<HashSet<_>>>()?;
        Ok(ids)
    }

    /// Users who applied the same tag to the same artist as the given
    /// user, with the number of shared `(artist, tag)` applications.
    pub fn taggers_sharing_applications(&self, user_id: i64) -> Result<HashMap<i64, i64>> {
        let mut stmt = self.conn().prepare(
            "SELECT b.user_id, COUNT(*)
             FROM (SELECT DISTINCT user_id, artist_id, tag_id FROM user_taggedartists) a
             JOIN (SELECT DISTINCT user_id, artist_id, tag_id FROM user_taggedartists) b
               ON a.artist_id = b.artist_id AND a.tag_id = b.tag_id
             WHERE a.user_id = ?1 AND b.user_id <> ?1
             GROUP BY b.user_id",
        )?;
        let shared = stmt
            .query_map([user_id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<HashMap<_, _>>>()?;
        Ok(shared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Artist, Friendship, ListenEvent, Tag, TaggingEvent, User};
    use crate::schema::ConflictPolicy;

    fn store() -> Database {
        let db = Database::open_in_memory().unwrap();
        for (id, name) in [(1, "Depeche Mode"), (2, "Moby"), (3, "Enigma")] {
            db.insert_artist(&Artist::new(id, name), ConflictPolicy::Skip)
                .unwrap();
        }
        db.insert_tag(&Tag::new(1, "electronic")).unwrap();
        db.insert_tag(&Tag::new(2, "ambient")).unwrap();
        for user in [10, 20, 30] {
            db.ensure_user(User::new(user)).unwrap();
        }
        for (user, artist, weight) in [(10, 1, 100), (10, 2, 5), (20, 1, 50), (20, 2, 80)] {
            db.insert_listen(&ListenEvent::new(user, artist, weight), ConflictPolicy::Skip)
                .unwrap();
        }
        db.insert_tagging(&TaggingEvent::new(10, 1, 1, 1_238_536_800_000), ConflictPolicy::Skip)
            .unwrap();
        db.insert_tagging(&TaggingEvent::new(20, 2, 2, 1_238_536_800_000), ConflictPolicy::Skip)
            .unwrap();
        db.insert_friendship(&Friendship::new(10, 20)).unwrap();
        db
    }

    #[test]
    fn test_artist_lookup() {
        let db = store();
        assert_eq!(db.artist(1).unwrap().unwrap().name, "Depeche Mode");
        assert!(db.artist(99).unwrap().is_none());
    }

    #[test]
    fn test_artists_by_name_substring() {
        let db = store();
        let hits = db.artists_by_name("mo").unwrap();
        let names: Vec<_> = hits.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Depeche Mode", "Moby"]);
    }

    #[test]
    fn test_artists_matching_tag_and_weight() {
        let db = store();
        let hits = db
            .artists_matching(&["electronic".to_string()], Some(100), MatchMode::All)
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 1);
    }

    #[test]
    fn test_artists_matching_any_mode_unions() {
        let db = store();
        let hits = db
            .artists_matching(
                &["electronic".to_string(), "ambient".to_string()],
                None,
                MatchMode::Any,
            )
            .unwrap();
        let ids: Vec<_> = hits.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_top_artists_order_and_tie_break() {
        let db = store();
        // totals: artist 1 = 150, artist 2 = 85
        let top = db.top_artists(1, None).unwrap();
        assert_eq!(top[0].artist_id, 1);
        assert_eq!(top[0].total_weight, 150);

        // Force a tie and check the id tie-break
        db.ensure_user(User::new(40)).unwrap();
        db.insert_listen(&ListenEvent::new(40, 2, 65), ConflictPolicy::Skip)
            .unwrap();
        let top = db.top_artists(2, None).unwrap();
        assert_eq!(top[0].artist_id, 1);
        assert_eq!(top[1].artist_id, 2);
        assert_eq!(top[0].total_weight, top[1].total_weight);
    }

    #[test]
    fn test_top_artists_within_tag() {
        let db = store();
        let top = db.top_artists(5, Some("ambient")).unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].artist_id, 2);
    }

    #[test]
    fn test_top_tags_ranked_by_application_count() {
        let db = store();
        // Second application of "electronic" pushes it ahead
        db.insert_tagging(&TaggingEvent::new(30, 1, 1, 9_000), ConflictPolicy::Skip)
            .unwrap();

        let tags = db.top_tags(5).unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].tag_value, "electronic");
        assert_eq!(tags[0].uses, 2);
        assert_eq!(tags[1].tag_value, "ambient");

        assert_eq!(db.top_tags(1).unwrap().len(), 1);
    }

    #[test]
    fn test_most_active_users_tie_breaks_by_id() {
        let db = store();
        // Users 10 and 20 both hold two listen rows; 30 holds none
        let users = db.most_active_users(5).unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(
            users[0],
            ActiveUser {
                user_id: 10,
                listen_count: 2
            }
        );
        assert_eq!(users[1].user_id, 20);
    }

    #[test]
    fn test_friend_circle_is_direction_agnostic() {
        let db = store();
        // Only (10, 20) is stored, yet both see each other
        assert_eq!(db.friend_circle(10).unwrap(), vec![20]);
        assert_eq!(db.friend_circle(20).unwrap(), vec![10]);
        assert!(db.friend_circle(30).unwrap().is_empty());
    }

    #[test]
    fn test_global_stats_counts() {
        let db = store();
        let stats = db.global_stats().unwrap();
        assert_eq!(stats.artists, 3);
        assert_eq!(stats.users, 3);
        assert_eq!(stats.listens, 4);
        assert_eq!(stats.total_weight, 235);
        assert!(stats.superstar_share > 0.0 && stats.superstar_share <= 1.0);
    }

    #[test]
    fn test_user_stats() {
        let db = store();
        let stats = db.user_stats(10).unwrap().unwrap();
        assert_eq!(stats.listen_count, 2);
        assert_eq!(stats.tagging_count, 1);
        assert_eq!(stats.friend_count, 1);
        assert_eq!(stats.top_artists[0].artist_id, 1);
        assert!(db.user_stats(99).unwrap().is_none());
    }

    #[test]
    fn test_artist_stats() {
        let db = store();
        let stats = db.artist_stats(2).unwrap().unwrap();
        assert_eq!(stats.total_weight, 85);
        assert_eq!(stats.listener_count, 2);
        assert_eq!(stats.top_tags, vec![("ambient".to_string(), 1)]);
    }

    #[test]
    fn test_taggers_sharing_applications() {
        let db = store();
        db.insert_tagging(&TaggingEvent::new(30, 1, 1, 7_000), ConflictPolicy::Skip)
            .unwrap();
        let shared = db.taggers_sharing_applications(10).unwrap();
        assert_eq!(shared.get(&30), Some(&1));
        assert!(!shared.contains_key(&20));
    }
}
