//! End-to-end tests for the full five-file import pipeline.
//!
//! Fixture files are written into a temp directory so the tests cover
//! the real read/decode/parse/batch path, not just the row parsers.

use std::path::Path;

use ostinato_core::schema::{ConflictPolicy, Database};
use ostinato_etl::{Config, Importer};
use tempfile::TempDir;

fn write_fixture(dir: &Path) {
    std::fs::write(
        dir.join("artists.dat"),
        "id\tname\turl\tpictureURL\n\
         1\tDepeche Mode\thttp://www.last.fm/music/Depeche+Mode\t\n\
         2\tMoby\t\t\n\
         3\tEnigma\t\t\n",
    )
    .unwrap();

    // tagValue on line 3 is Latin-1 ("pop franc\xe9s")
    std::fs::write(
        dir.join("tags.dat"),
        b"tagID\ttagValue\n13\tchillout\n14\tpop franc\xe9s\n",
    )
    .unwrap();

    // One malformed weight, one unknown artist
    std::fs::write(
        dir.join("user_artists.dat"),
        "userID\tartistID\tweight\n\
         10\t1\t100\n\
         10\t2\t5\n\
         20\t1\t50\n\
         20\t2\t80\n\
         30\t1\tlots\n\
         10\t99\t7\n",
    )
    .unwrap();

    // One zero timestamp (kept, undated), one unknown tag
    std::fs::write(
        dir.join("user_taggedartists.dat"),
        "userID\tartistID\ttagID\ttimestamp\n\
         10\t1\t13\t1238536800000\n\
         10\t2\t13\t0\n\
         10\t1\t99\t5\n",
    )
    .unwrap();

    std::fs::write(
        dir.join("user_friends.dat"),
        "userID\tfriendID\n10\t20\n30\t10\n",
    )
    .unwrap();
}

fn config(policy: ConflictPolicy) -> Config {
    Config {
        on_conflict: policy,
        batch_size: 2, // small batches so flushing is exercised
        ..Config::default()
    }
}

#[test]
fn test_full_import() {
    let tmp = TempDir::new().unwrap();
    write_fixture(tmp.path());
    let db = Database::open_in_memory().unwrap();

    let importer = Importer::new(&db, config(ConflictPolicy::Skip));
    let report = importer.import_all(tmp.path()).unwrap();

    assert!(report.failed_stages.is_empty());
    assert_eq!(report.totals.artists, 3);
    assert_eq!(report.totals.tags, 2);
    assert_eq!(report.totals.listens, 4);
    assert_eq!(report.totals.taggings, 2);
    assert_eq!(report.totals.friendships, 2);
    // Users derived from listens (10, 20) and friendships (30)
    assert_eq!(report.totals.users, 3);
    assert_eq!(report.users_created, 3);

    assert_eq!(report.listens.malformed, 1);
    assert_eq!(report.listens.referential_violations, 1);
    assert_eq!(report.taggings.referential_violations, 1);
    assert_eq!(report.totals.undated_taggings, 1);
}

#[test]
fn test_reimport_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    write_fixture(tmp.path());
    let db = Database::open_in_memory().unwrap();
    let importer = Importer::new(&db, config(ConflictPolicy::Skip));

    let first = importer.import_all(tmp.path()).unwrap();
    let second = importer.import_all(tmp.path()).unwrap();

    assert_eq!(first.totals, second.totals);
    // Nothing new lands, everything resolves as a key conflict
    assert_eq!(second.artists.written, 0);
    assert_eq!(second.artists.conflicts, 3);
    assert_eq!(second.listens.written, 0);
    assert_eq!(second.listens.conflicts, 4);
    assert_eq!(second.users_created, 0);
}

#[test]
fn test_reimport_overwrite_updates_in_place() {
    let tmp = TempDir::new().unwrap();
    write_fixture(tmp.path());
    let db = Database::open_in_memory().unwrap();

    Importer::new(&db, config(ConflictPolicy::Skip))
        .import_all(tmp.path())
        .unwrap();

    // Same keys, new weight
    std::fs::write(
        tmp.path().join("user_artists.dat"),
        "userID\tartistID\tweight\n10\t1\t777\n",
    )
    .unwrap();
    let report = Importer::new(&db, config(ConflictPolicy::Overwrite))
        .import_all(tmp.path())
        .unwrap();

    // Row count unchanged, weight replaced
    assert_eq!(report.totals.listens, 4);
    let weight: i64 = db
        .conn()
        .query_row(
            "SELECT weight FROM user_artists WHERE user_id = 10 AND artist_id = 1",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(weight, 777);
}

#[test]
fn test_zero_timestamp_row_is_kept_undated() {
    let tmp = TempDir::new().unwrap();
    write_fixture(tmp.path());
    let db = Database::open_in_memory().unwrap();
    Importer::new(&db, config(ConflictPolicy::Skip))
        .import_all(tmp.path())
        .unwrap();

    let (timestamp, day): (i64, Option<i64>) = db
        .conn()
        .query_row(
            "SELECT timestamp, day FROM user_taggedartists
             WHERE user_id = 10 AND artist_id = 2 AND tag_id = 13",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(timestamp, 0);
    assert!(day.is_none());
}

#[test]
fn test_latin1_tag_survives_import() {
    let tmp = TempDir::new().unwrap();
    write_fixture(tmp.path());
    let db = Database::open_in_memory().unwrap();
    Importer::new(&db, config(ConflictPolicy::Skip))
        .import_all(tmp.path())
        .unwrap();

    let value: String = db
        .conn()
        .query_row(
            "SELECT tag_value FROM tags WHERE tag_id = 14",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(value, "pop francés");
}

#[test]
fn test_missing_file_fails_only_that_stage() {
    let tmp = TempDir::new().unwrap();
    write_fixture(tmp.path());
    std::fs::remove_file(tmp.path().join("user_artists.dat")).unwrap();
    let db = Database::open_in_memory().unwrap();

    let report = Importer::new(&db, config(ConflictPolicy::Skip))
        .import_all(tmp.path())
        .unwrap();

    assert_eq!(report.failed_stages.len(), 1);
    assert_eq!(report.failed_stages[0].0, "listens");
    // Independent stages still ran
    assert_eq!(report.totals.artists, 3);
    assert_eq!(report.totals.friendships, 2);
}

#[test]
fn test_missing_data_dir_is_fatal() {
    let tmp = TempDir::new().unwrap();
    let db = Database::open_in_memory().unwrap();
    let importer = Importer::new(&db, config(ConflictPolicy::Skip));
    let result = importer.import_all(&tmp.path().join("nope"));
    assert!(result.is_err());
}

#[test]
fn test_every_referenced_user_exists() {
    let tmp = TempDir::new().unwrap();
    write_fixture(tmp.path());
    let db = Database::open_in_memory().unwrap();
    Importer::new(&db, config(ConflictPolicy::Skip))
        .import_all(tmp.path())
        .unwrap();

    let orphans: i64 = db
        .conn()
        .query_row(
            "SELECT (SELECT COUNT(*) FROM user_artists ua
                     WHERE ua.user_id NOT IN (SELECT user_id FROM users))
                  + (SELECT COUNT(*) FROM user_taggedartists uta
                     WHERE uta.user_id NOT IN (SELECT user_id FROM users))
                  + (SELECT COUNT(*) FROM user_friends uf
                     WHERE uf.user_id NOT IN (SELECT user_id FROM users)
                        OR uf.friend_id NOT IN (SELECT user_id FROM users))",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(orphans, 0);
}

#[test]
fn test_friend_circle_symmetric_after_import() {
    let tmp = TempDir::new().unwrap();
    write_fixture(tmp.path());
    let db = Database::open_in_memory().unwrap();
    Importer::new(&db, config(ConflictPolicy::Skip))
        .import_all(tmp.path())
        .unwrap();

    // Only (10,20) and (30,10) are stored, directed
    assert_eq!(db.friend_circle(10).unwrap(), vec![20, 30]);
    assert_eq!(db.friend_circle(20).unwrap(), vec![10]);
    assert_eq!(db.friend_circle(30).unwrap(), vec![10]);
}

#[test]
fn test_comma_delimited_packaging() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("artists.dat"), "id,name,url,pictureURL\n1,Moby,,\n").unwrap();
    std::fs::write(tmp.path().join("tags.dat"), "tagID,tagValue\n1,ambient\n").unwrap();
    std::fs::write(
        tmp.path().join("user_artists.dat"),
        "userID,artistID,weight\n10,1,42\n",
    )
    .unwrap();
    std::fs::write(
        tmp.path().join("user_taggedartists.dat"),
        "userID,artistID,tagID,timestamp\n10,1,1,0\n",
    )
    .unwrap();
    std::fs::write(tmp.path().join("user_friends.dat"), "userID,friendID\n10,20\n").unwrap();

    let db = Database::open_in_memory().unwrap();
    let report = Importer::new(&db, config(ConflictPolicy::Skip))
        .import_all(tmp.path())
        .unwrap();

    assert!(report.failed_stages.is_empty());
    assert_eq!(report.totals.artists, 1);
    assert_eq!(report.totals.listens, 1);
    assert_eq!(report.totals.friendships, 1);
}
