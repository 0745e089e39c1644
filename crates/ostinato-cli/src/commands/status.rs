use anyhow::Result;
use std::path::Path;

use ostinato_core::schema::Database;

pub fn show_status(db_path: &Path, json: bool) -> Result<()> {
    let db = Database::open(db_path)?;
    db.health_check()?;
    let stats = db.global_stats()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("\n📊 Ostinato Status\n");
    println!("  Database: {}", db_path.display());
    println!("  Health: ok (foreign keys enforced)");
    println!();
    println!("  Artists:          {:>10}", stats.artists);
    println!("  Users:            {:>10}", stats.users);
    println!("  Tags:             {:>10}", stats.tags);
    println!("  Listens:          {:>10}", stats.listens);
    println!("  Tag applications: {:>10}", stats.tag_applications);
    println!("  Friendships:      {:>10}", stats.friendships);
    println!();
    println!("  Total listen weight: {}", stats.total_weight);
    println!(
        "  Weight held by top decile of artists: {:.1}%",
        stats.superstar_share * 100.0
    );
    if stats.undated_taggings > 0 {
        println!(
            "\n  ⚠ {} tag applications have no decodable date",
            stats.undated_taggings
        );
    }
    Ok(())
}
