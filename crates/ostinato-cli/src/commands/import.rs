use anyhow::Result;
use std::path::Path;

use ostinato_core::schema::Database;
use ostinato_etl::{Config, Importer};

pub fn run_import(config: &Config, data_dir: &Path) -> Result<()> {
    log::info!("importing from {}", data_dir.display());

    let db = Database::open(&config.database_path)?;
    let importer = Importer::new(&db, config.clone());
    let report = importer.import_all(data_dir)?;

    println!("\n{report}");

    if report.failed_stages.is_empty() {
        println!("✓ Import complete");
    } else {
        println!("✗ Import finished with failed stages, see above");
    }
    Ok(())
}
