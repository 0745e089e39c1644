use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use ostinato_core::schema::ConflictPolicy;
use ostinato_etl::Config;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "ostinato", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the database (default: ~/.local/share/ostinato/ostinato.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Import the five source files from a data directory
    ///
    /// Expects artists.dat, tags.dat, user_artists.dat,
    /// user_taggedartists.dat, and user_friends.dat (tab- or
    /// comma-delimited, one header line each) and loads them in
    /// dependency order: artists and tags first, then the relation
    /// files. Users are synthesized on first reference.
    ///
    /// Rows are flushed in batched transactions; malformed rows are
    /// skipped and counted, a missing file fails only its own stage,
    /// and re-running the import against a populated store does not
    /// duplicate rows. The final statistics report printed at the end
    /// is the place to look for data-quality problems.
    Import {
        /// Directory containing the five .dat files
        path: PathBuf,

        /// Overwrite rows whose keys already exist instead of
        /// skipping them
        #[arg(long)]
        overwrite: bool,

        /// Rows per transaction (default from config, normally 1000)
        #[arg(long)]
        batch_size: Option<usize>,
    },
    /// Check store health and show global statistics
    Status {
        /// Emit the statistics as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one artist with its tags and popularity
    Artist {
        /// Artist id from the source data
        id: i64,
    },
    /// Search artists by name substring (case-insensitive)
    Search {
        /// Name fragment
        name: String,
    },
    /// Filter artists by tag values and/or minimum total listen weight
    Filter {
        /// Tag value the artists must carry (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Match artists carrying any of the tags instead of all
        #[arg(long)]
        any: bool,

        /// Minimum summed listen weight across all users
        #[arg(long)]
        min_weight: Option<i64>,
    },
    /// Top artists by summed listen weight, optionally within a tag
    Top {
        /// How many artists to show
        n: usize,

        /// Restrict to artists carrying this tag value
        #[arg(long)]
        tag: Option<String>,
    },
    /// Most-applied tags across the whole store
    Tags {
        /// How many tags to show
        #[arg(default_value_t = 10)]
        n: usize,
    },
    /// Users with the most listen rows
    Active {
        /// How many users to show
        #[arg(default_value_t = 10)]
        n: usize,
    },
    /// Show the friend circle of a user
    Friends {
        /// User id
        user_id: i64,
    },
    /// Recommend artists for a user
    Recommend {
        /// User id
        user_id: i64,

        /// Maximum number of suggestions
        #[arg(long, default_value_t = 10)]
        limit: usize,

        /// Emit the ranking as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show or manage the configuration file
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Debug, clap::Subcommand)]
enum ConfigAction {
    /// Print the config file path
    Path,
    /// Print an example config file
    Example,
    /// Create the config file with defaults if it does not exist
    Init,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match cli.db {
        Some(db) => Config::load_with_db_path(db)?,
        None => Config::load()?,
    };

    // Ensure database directory exists
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    match cli.command {
        Commands::Import {
            path,
            overwrite,
            batch_size,
        } => {
            let mut config = config;
            if overwrite {
                config.on_conflict = ConflictPolicy::Overwrite;
            }
            if let Some(batch_size) = batch_size {
                config.batch_size = batch_size;
            }
            commands::run_import(&config, &path)?;
        }
        Commands::Status { json } => {
            commands::show_status(&config.database_path, json)?;
        }
        Commands::Artist { id } => {
            commands::show_artist(&config.database_path, id)?;
        }
        Commands::Search { name } => {
            commands::search_artists(&config.database_path, &name)?;
        }
        Commands::Filter {
            tags,
            any,
            min_weight,
        } => {
            commands::filter_artists(&config.database_path, &tags, any, min_weight)?;
        }
        Commands::Top { n, tag } => {
            commands::top_artists(&config.database_path, n, tag.as_deref())?;
        }
        Commands::Tags { n } => {
            commands::top_tags(&config.database_path, n)?;
        }
        Commands::Active { n } => {
            commands::active_users(&config.database_path, n)?;
        }
        Commands::Friends { user_id } => {
            commands::show_friends(&config.database_path, user_id)?;
        }
        Commands::Recommend {
            user_id,
            limit,
            json,
        } => {
            commands::run_recommend(&config.database_path, user_id, limit, json)?;
        }
        Commands::Config { action } => match action {
            None => commands::show_config()?,
            Some(ConfigAction::Path) => commands::show_path()?,
            Some(ConfigAction::Example) => commands::show_example()?,
            Some(ConfigAction::Init) => commands::init_config()?,
        },
    }

    Ok(())
}
