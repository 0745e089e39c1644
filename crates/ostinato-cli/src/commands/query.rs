use anyhow::{bail, Result};
use std::path::Path;

use ostinato_core::query::MatchMode;
use ostinato_core::schema::Database;

pub fn show_artist(db_path: &Path, id: i64) -> Result<()> {
    let db = Database::open(db_path)?;
    let Some(stats) = db.artist_stats(id)? else {
        bail!("no artist with id {id}");
    };

    println!("\n{} (#{})", stats.name, stats.artist_id);
    println!("  total weight: {}", stats.total_weight);
    println!("  listeners:    {}", stats.listener_count);
    println!("  taggings:     {}", stats.tagging_count);
    if !stats.top_tags.is_empty() {
        println!("  top tags:");
        for (value, uses) in &stats.top_tags {
            println!("    {value} ({uses})");
        }
    }
    Ok(())
}

pub fn search_artists(db_path: &Path, fragment: &str) -> Result<()> {
    let db = Database::open(db_path)?;
    let artists = db.artists_by_name(fragment)?;

    if artists.is_empty() {
        println!("no artists matching {fragment:?}");
        return Ok(());
    }
    for artist in artists {
        println!("{:>8}  {}", artist.id, artist.name);
    }
    Ok(())
}

pub fn filter_artists(
    db_path: &Path,
    tags: &[String],
    any: bool,
    min_weight: Option<i64>,
) -> Result<()> {
    let db = Database::open(db_path)?;
    let mode = if any { MatchMode::Any } else { MatchMode::All };
    let artists = db.artists_matching(tags, min_weight, mode)?;

    println!("{} artists match", artists.len());
    for artist in artists {
        println!("{:>8}  {}", artist.id, artist.name);
    }
    Ok(())
}

pub fn top_artists(db_path: &Path, n: usize, tag: Option<&str>) -> Result<()> {
    let db = Database::open(db_path)?;
    let ranked = db.top_artists(n, tag)?;

    match tag {
        Some(tag) => println!("Top {n} artists tagged {tag:?}:"),
        None => println!("Top {n} artists:"),
    }
    for (rank, artist) in ranked.iter().enumerate() {
        println!(
            "{:>3}. {} (#{}) — weight {}",
            rank + 1,
            artist.name,
            artist.artist_id,
            artist.total_weight
        );
    }
    Ok(())
}

pub fn top_tags(db_path: &Path, n: usize) -> Result<()> {
    let db = Database::open(db_path)?;
    let tags = db.top_tags(n)?;

    println!("Top {n} tags:");
    for (rank, tag) in tags.iter().enumerate() {
        println!(
            "{:>3}. {} (#{}) — {} applications",
            rank + 1,
            tag.tag_value,
            tag.tag_id,
            tag.uses
        );
    }
    Ok(())
}

pub fn active_users(db_path: &Path, n: usize) -> Result<()> {
    let db = Database::open(db_path)?;
    let users = db.most_active_users(n)?;

    println!("Most active users:");
    for (rank, user) in users.iter().enumerate() {
        println!(
            "{:>3}. user {} — {} artists listened",
            rank + 1,
            user.user_id,
            user.listen_count
        );
    }
    Ok(())
}

pub fn show_friends(db_path: &Path, user_id: i64) -> Result<()> {
    let db = Database::open(db_path)?;
    if !db.user_exists(user_id)? {
        bail!("no user with id {user_id}");
    }
    let circle = db.friend_circle(user_id)?;

    println!("user {user_id} has {} friends", circle.len());
    for friend in circle {
        println!("  {friend}");
    }
    Ok(())
}
