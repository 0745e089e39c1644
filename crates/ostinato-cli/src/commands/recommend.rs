use anyhow::Result;
use std::path::Path;

use ostinato_core::schema::Database;

pub fn run_recommend(db_path: &Path, user_id: i64, limit: usize, json: bool) -> Result<()> {
    let db = Database::open(db_path)?;
    let recs = ostinato_recommend::recommend(&db, user_id, limit)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&recs)?);
        return Ok(());
    }

    if recs.is_empty() {
        println!("no recommendations for user {user_id} (no listening history)");
        return Ok(());
    }

    println!("Recommendations for user {user_id}:");
    for (rank, rec) in recs.iter().enumerate() {
        let name = db
            .artist(rec.artist_id)?
            .map_or_else(|| format!("#{}", rec.artist_id), |artist| artist.name);
        println!(
            "{:>3}. {} (#{}) — score {:.2}",
            rank + 1,
            name,
            rec.artist_id,
            rec.score
        );
    }
    Ok(())
}
