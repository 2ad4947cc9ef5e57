use anyhow::{Context, Result};
use backtrack::settings::SettingsStore;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "backtrack", version, about = "Music catalog migration tool")]
struct Cli {
    /// Path to the SQLite database
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a legacy JSON song dump into the catalog
    Import {
        /// Path to the JSON file (defaults to config file source_path)
        source: Option<PathBuf>,

        /// Dry run — report what would be migrated without writing to DB
        #[arg(long)]
        dry_run: bool,
    },

    /// Backfill artist rows for artist ids referenced by songs
    Reconcile {
        /// Dry run — show what would be synthesized without writing to DB
        #[arg(long)]
        dry_run: bool,
    },

    /// Show catalog statistics
    Stats,

    /// Show schema version and optional-column capabilities
    Schema,

    /// Read or write application settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print the value of a key
    Get { key: String },
    /// Set a key to a value
    Set { key: String, value: String },
    /// List all settings
    List,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load config file (optional, defaults if missing)
    let config = backtrack::config::AppConfig::load();

    // Resolve database path: CLI > config > XDG default
    let db_path = cli
        .db_path
        .or(config.db_path.clone())
        .unwrap_or_else(backtrack::config::default_db_path);
    log::info!("Database: {}", db_path.display());

    let db = backtrack::db::Database::open(&db_path).context("Failed to open database")?;

    match cli.command {
        Commands::Import { source, dry_run } => {
            // Resolve source path: CLI arg > config source_path
            let source = match source.or(config.source_path.clone()) {
                Some(p) => p,
                None => anyhow::bail!(
                    "No source file. Pass a path as argument or set source_path in config."
                ),
            };

            if dry_run {
                println!("DRY RUN — no changes will be written to the database");
            }

            let records = backtrack::import::load_records(&source)
                .with_context(|| format!("Failed to load {}", source.display()))?;
            println!("Loaded {} records from {}", records.len(), source.display());

            let report =
                backtrack::import::migrate(&db, &records, dry_run).context("Import failed")?;

            println!(
                "Import complete: {} migrated, {} skipped, {} failed",
                report.migrated,
                report.skipped,
                report.failed.len()
            );
            for failure in &report.failed {
                let title = if failure.title.is_empty() {
                    "(untitled)"
                } else {
                    &failure.title
                };
                println!("  failed: {} — {}", title, failure.error);
            }
            if dry_run && report.migrated > 0 {
                println!("(dry run — re-run without --dry-run to write changes)");
            }
        }

        Commands::Reconcile { dry_run } => {
            if dry_run {
                println!("DRY RUN — no changes will be written to the database");
            }
            let report = backtrack::reconcile::reconcile_artists(&db, dry_run)
                .context("Reconcile failed")?;
            println!(
                "Reconcile complete: {} synced, {} skipped, {} failed",
                report.synced, report.skipped, report.failed
            );
            if dry_run && report.synced > 0 {
                println!("(dry run — re-run without --dry-run to write changes)");
            }
        }

        Commands::Stats => {
            let stats = db.stats().context("Failed to get stats")?;
            println!("Catalog Statistics");
            println!("==================");
            println!("Artists:          {}", stats.artists);
            println!("Albums:           {}", stats.albums);
            println!("Songs:            {}", stats.songs);
            println!("Total plays:      {}", stats.total_plays);
            println!("Total downloads:  {}", stats.total_downloads);
            println!("Total duration:   {:.1} hours", stats.total_duration_hours);

            if !stats.top_artists.is_empty() {
                println!();
                println!("Top artists:");
                for (name, count) in &stats.top_artists {
                    println!("  {:<30} {}", name, count);
                }
            }
        }

        Commands::Schema => {
            let version = db.schema_version().context("Failed to read schema version")?;
            println!("Schema version: {}", version);

            let cols =
                backtrack::db::SongColumns::probe(&db).context("Failed to probe songs table")?;
            let missing = cols.missing();
            if missing.is_empty() {
                println!("All optional song columns present");
            } else {
                println!("Missing optional song columns: {}", missing.join(", "));
            }
        }

        Commands::Settings { action } => {
            let settings = SettingsStore::new(&db);
            match action {
                SettingsAction::Get { key } => match settings.get(&key)? {
                    Some(value) => println!("{}", value),
                    None => println!("(not set)"),
                },
                SettingsAction::Set { key, value } => {
                    settings.set(&key, &value)?;
                    println!("{} = {}", key, value);
                }
                SettingsAction::List => {
                    let all = settings.list()?;
                    if all.is_empty() {
                        println!("No settings.");
                    } else {
                        for (key, value) in &all {
                            println!("{:<30} {}", key, value);
                        }
                    }
                }
            }
        }
    }

    Ok(())
}
