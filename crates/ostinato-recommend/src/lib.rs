//! Collaborative artist recommendations for ostinato.
//!
//! A deterministic, on-demand scoring function over the populated
//! store; no model training, no randomness. Neighbors are users who
//! applied the same tag to the same artist as the target, plus the
//! target's friend circle (friends are weighted up). Candidate artists
//! are scored from neighbor listening weight, damped by the target's
//! own weight, with a bonus for overlap with the target's tag
//! vocabulary.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

use ostinato_core::schema::Database;

/// Similarity multiplier for neighbors in the friend circle.
const FRIEND_BOOST: f64 = 2.0;
/// Similarity added per shared `(artist, tag)` application.
const SHARED_APPLICATION_WEIGHT: f64 = 0.25;
/// Score multiplier added per candidate tag in the target's vocabulary.
const VOCABULARY_BONUS: f64 = 0.1;

#[derive(Debug, Error)]
pub enum RecommendError {
    #[error("store error: {0}")]
    Store(#[from] ostinato_core::Error),
}

pub type Result<T> = std::result::Result<T, RecommendError>;

/// One recommended artist with its score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Recommendation {
    pub artist_id: i64,
    pub score: f64,
}

/// Rank suggested artists for a user.
///
/// Artists the target already plays are not excluded outright; their
/// score is divided by `1 + own weight`, so heavy rotation suppresses
/// an artist while one a close friend plays far more than the target
/// does can resurface. A user with no listens, no tags, and no friends
/// gets an empty list, not an error.
///
/// Ordering is fully deterministic: score descending, then global
/// listening weight descending, then artist id ascending.
pub fn recommend(db: &Database, user_id: i64, limit: usize) -> Result<Vec<Recommendation>> {
    let own_weights: HashMap<i64, i64> = db
        .user_listens(user_id)?
        .into_iter()
        .map(|listen| (listen.artist_id, listen.weight))
        .collect();
    let vocabulary = db.user_tag_vocabulary(user_id)?;
    let friends = db.friend_circle(user_id)?;
    let shared_taggers = db.taggers_sharing_applications(user_id)?;

    if own_weights.is_empty() && vocabulary.is_empty() && friends.is_empty() {
        log::debug!("user {user_id} has no history at all, nothing to recommend");
        return Ok(Vec::new());
    }

    // Neighbor similarity: tag-sharing users start at 1 plus their
    // shared-application count; friends multiply up, and a friend with
    // no tag overlap still counts.
    let mut similarity: HashMap<i64, f64> = shared_taggers
        .iter()
        .map(|(&neighbor, &shared)| {
            (neighbor, 1.0 + SHARED_APPLICATION_WEIGHT * shared as f64)
        })
        .collect();
    for friend in &friends {
        similarity
            .entry(*friend)
            .and_modify(|sim| *sim *= FRIEND_BOOST)
            .or_insert(FRIEND_BOOST);
    }

    // Accumulate neighbor listening weight per candidate artist.
    let mut base_scores: HashMap<i64, f64> = HashMap::new();
    for (&neighbor, &sim) in &similarity {
        for listen in db.user_listens(neighbor)? {
            *base_scores.entry(listen.artist_id).or_insert(0.0) += sim * listen.weight as f64;
        }
    }

    let global_weights = db.artist_total_weights()?;
    let mut ranked = Vec::with_capacity(base_scores.len());
    for (artist_id, base) in base_scores {
        let own = own_weights.get(&artist_id).copied().unwrap_or(0);
        let overlap = db
            .artist_tag_ids(artist_id)?
            .intersection(&vocabulary)
            .count();
        let score = base / (1.0 + own as f64) * (1.0 + VOCABULARY_BONUS * overlap as f64);
        ranked.push(Recommendation { artist_id, score });
    }

    ranked.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| {
                let ga = global_weights.get(&a.artist_id).copied().unwrap_or(0);
                let gb = global_weights.get(&b.artist_id).copied().unwrap_or(0);
                gb.cmp(&ga)
            })
            .then_with(|| a.artist_id.cmp(&b.artist_id))
    });
    ranked.truncate(limit);
    Ok(ranked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ostinato_core::model::{Artist, Friendship, ListenEvent, Tag, TaggingEvent, User};
    use ostinato_core::schema::ConflictPolicy;

    fn store() -> Database {
        let db = Database::open_in_memory().unwrap();
        for id in 1..=4 {
            db.insert_artist(&Artist::new(id, format!("artist-{id}")), ConflictPolicy::Skip)
                .unwrap();
        }
        db.insert_tag(&Tag::new(1, "electronic")).unwrap();
        for user in [10, 20, 30] {
            db.ensure_user(User::new(user)).unwrap();
        }
        db
    }

    fn listen(db: &Database, user: i64, artist: i64, weight: i64) {
        db.insert_listen(&ListenEvent::new(user, artist, weight), ConflictPolicy::Skip)
            .unwrap();
    }

    #[test]
    fn test_user_with_no_history_gets_empty_list() {
        let db = store();
        assert!(recommend(&db, 10, 10).unwrap().is_empty());
    }

    #[test]
    fn test_friend_weight_outranks_untouched_artists() {
        let db = store();
        // Target 10: heavy on artist 1, barely touched artist 2.
        listen(&db, 10, 1, 100);
        listen(&db, 10, 2, 5);
        // Friend 20: the other way around.
        listen(&db, 20, 1, 50);
        listen(&db, 20, 2, 80);
        db.insert_friendship(&Friendship::new(10, 20)).unwrap();

        let recs = recommend(&db, 10, 10).unwrap();
        assert_eq!(recs[0].artist_id, 2);
        // Artists neither user touched never appear
        assert!(recs.iter().all(|r| r.artist_id != 3 && r.artist_id != 4));
        // The target's heavy-rotation artist is damped below artist 2
        let artist_1 = recs.iter().find(|r| r.artist_id == 1).unwrap();
        assert!(recs[0].score > artist_1.score);
    }

    #[test]
    fn test_tag_sharing_users_are_neighbors() {
        let db = store();
        listen(&db, 10, 1, 10);
        listen(&db, 30, 3, 40);
        // 10 and 30 applied the same tag to the same artist
        db.insert_tagging(&TaggingEvent::new(10, 1, 1, 1_000), ConflictPolicy::Skip)
            .unwrap();
        db.insert_tagging(&TaggingEvent::new(30, 1, 1, 2_000), ConflictPolicy::Skip)
            .unwrap();

        let recs = recommend(&db, 10, 10).unwrap();
        assert!(recs.iter().any(|r| r.artist_id == 3));
    }

    #[test]
    fn test_friend_boost_beats_tag_only_neighbor() {
        let db = store();
        listen(&db, 10, 1, 10);
        // Equal listening weight from a friend and a tag-only neighbor
        listen(&db, 20, 2, 50);
        listen(&db, 30, 3, 50);
        db.insert_friendship(&Friendship::new(20, 10)).unwrap();
        db.insert_tagging(&TaggingEvent::new(10, 1, 1, 1_000), ConflictPolicy::Skip)
            .unwrap();
        db.insert_tagging(&TaggingEvent::new(30, 1, 1, 2_000), ConflictPolicy::Skip)
            .unwrap();

        let recs = recommend(&db, 10, 10).unwrap();
        let friend_pick = recs.iter().find(|r| r.artist_id == 2).unwrap();
        let tagger_pick = recs.iter().find(|r| r.artist_id == 3).unwrap();
        assert!(friend_pick.score > tagger_pick.score);
    }

    #[test]
    fn test_vocabulary_bonus_lifts_tagged_candidates() {
        let db = store();
        listen(&db, 10, 1, 10);
        listen(&db, 20, 2, 50);
        listen(&db, 20, 3, 50);
        db.insert_friendship(&Friendship::new(10, 20)).unwrap();
        // Target's vocabulary contains tag 1; artist 2 carries it
        db.insert_tagging(&TaggingEvent::new(10, 1, 1, 1_000), ConflictPolicy::Skip)
            .unwrap();
        db.insert_tagging(&TaggingEvent::new(20, 2, 1, 2_000), ConflictPolicy::Skip)
            .unwrap();

        let recs = recommend(&db, 10, 10).unwrap();
        let tagged = recs.iter().find(|r| r.artist_id == 2).unwrap();
        let untagged = recs.iter().find(|r| r.artist_id == 3).unwrap();
        assert!(tagged.score > untagged.score);
    }

    #[test]
    fn test_tie_breaks_are_deterministic() {
        let db = store();
        listen(&db, 10, 1, 10);
        // Two candidates with identical neighbor support
        listen(&db, 20, 2, 50);
        listen(&db, 20, 3, 50);
        db.insert_friendship(&Friendship::new(10, 20)).unwrap();

        let recs = recommend(&db, 10, 10).unwrap();
        let ids: Vec<_> = recs.iter().map(|r| r.artist_id).collect();
        // Equal score and equal global weight: ascending id wins
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn test_limit_truncates() {
        let db = store();
        listen(&db, 10, 1, 10);
        listen(&db, 20, 2, 50);
        listen(&db, 20, 3, 40);
        db.insert_friendship(&Friendship::new(10, 20)).unwrap();

        let recs = recommend(&db, 10, 1).unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].artist_id, 2);
    }
}
