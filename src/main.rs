use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use catalog_migrate::{
    CatalogStore, Config, JsonLibrary, MigrationScope, MigrationStatistics, Migrator,
    SourceLibrary,
};

/// Bad command line or configuration.
const EXIT_INVALID_PARAMS: u8 = 1;
/// The migration was aborted.
const EXIT_MIGRATION_FAILED: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "catalog-migrate")]
#[command(about = "Migrate a media library export into a catalog")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Migrate tracks, play statistics, ratings and playlists
    Migrate {
        /// Path to the library export (JSON)
        export: PathBuf,

        /// Number of retries after the catalog refused to modify a track
        /// (or set MIGRATE_RETRIES env var)
        #[arg(short, long)]
        retries: Option<u32>,

        /// Backdate "date added" by setting the system clock before adding each
        /// track. Requires admin rights. Use with extreme care.
        #[arg(short = 'd', long = "dateadded")]
        date_added_workaround: bool,

        /// Names of the playlists to migrate. All playlists if not specified.
        #[arg(short = 'n', long = "playlist-names", num_args = 1..)]
        playlist_names: Vec<String>,

        /// Only migrate playlists and the tracks within them
        #[arg(short, long)]
        playlists_only: bool,

        /// Catalog file to migrate into (or set CATALOG_PATH env var)
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// List the playlists of a library export
    ListPlaylists {
        /// Path to the library export (JSON)
        export: PathBuf,
    },
}

fn setup_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = parse_error_code(&e);
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    setup_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ExitCode::from(EXIT_MIGRATION_FAILED)
        }
    }
}

/// Help and version requests are not errors.
fn parse_error_code(err: &clap::Error) -> u8 {
    if err.use_stderr() {
        EXIT_INVALID_PARAMS
    } else {
        0
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Migrate {
            export,
            retries,
            date_added_workaround,
            playlist_names,
            playlists_only,
            catalog,
        } => {
            let scope = MigrationScope {
                playlist_names,
                playlists_only,
            };
            migrate(&export, retries, date_added_workaround, &scope, catalog).await?;
        }
        Commands::ListPlaylists { export } => {
            list_playlists(&export).await?;
        }
    }

    Ok(())
}

async fn migrate(
    export: &Path,
    retries: Option<u32>,
    date_added_workaround: bool,
    scope: &MigrationScope,
    catalog: Option<PathBuf>,
) -> Result<()> {
    println!("{}", "Library to Catalog Migrator".cyan().bold());
    println!("{}", "=".repeat(50));

    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(catalog) = catalog {
        config.catalog_path = catalog;
    }

    let invalid = config.get_invalid_config();
    if !invalid.is_empty() {
        println!("{}", "Invalid configuration:".red());
        for item in &invalid {
            println!("   - {}", item);
        }
        std::process::exit(EXIT_INVALID_PARAMS.into());
    }

    if date_added_workaround && !confirm_workaround()? {
        println!("{}", "Aborted - restart without --dateadded".yellow());
        return Ok(());
    }

    let target = CatalogStore::open(&config.catalog_path).context("Failed to open catalog")?;

    let mut migrator = Migrator::from_export(
        export,
        target,
        retries.unwrap_or(config.retries),
        date_added_workaround,
        &config,
    )
    .context("Failed to initialize migrator")?
    .with_progress(true);

    let stats = migrator
        .migrate_and_save(scope)
        .await
        .context("Migration failed")?;

    print_stats(&stats);

    println!("\n{}", "Migration completed!".green());

    Ok(())
}

fn confirm_workaround() -> Result<bool> {
    println!(
        "{}",
        "You asked for the workaround that sets the \"date added\" in the catalog.".yellow()
    );
    println!("The catalog does not allow setting the \"date added\", so the system clock is set");
    println!("to the desired date right before each track is added. Make sure to");
    println!("   - run catalog-migrate with administrator rights,");
    println!("   - disable automatic time synchronization while the migration runs,");
    println!("   - not use the computer during the migration, the system date will be wrong.");
    print!("If you REALLY want to do this, type \"yes\": ");
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;

    Ok(answer.trim() == "yes")
}

fn print_stats(stats: &MigrationStatistics) {
    println!();
    println!("{}", "=".repeat(60));
    println!("{}", "MIGRATION SUMMARY".bold());
    println!("{}", "=".repeat(60));
    println!(
        "Tracks (total): {} processed, {} failed",
        stats.tracks_processed(),
        failed(stats.tracks_failed())
    );
    println!(
        "Playlists: {} processed, {} failed",
        stats.playlists_processed(),
        failed(stats.playlists_failed())
    );
    println!(
        "Tracks (playlist members): {} processed, {} failed",
        stats.playlist_tracks_processed(),
        failed(stats.playlist_tracks_failed())
    );
    println!("{}", "=".repeat(60));

    if stats.tracks_failed() > 0 || stats.playlist_tracks_failed() > 0 {
        println!(
            "\n{}",
            "Skipped tracks are listed as warnings in the log output".yellow()
        );
    }
}

fn failed(count: u64) -> colored::ColoredString {
    if count == 0 {
        count.to_string().green()
    } else {
        count.to_string().red()
    }
}

async fn list_playlists(export: &Path) -> Result<()> {
    println!("{}", "Library Playlists".cyan().bold());
    println!("{}", "=".repeat(50));

    let library = JsonLibrary::open(export).context("Failed to open library export")?;

    let playlists = library
        .playlists(true, true)
        .await
        .context("Failed to read playlists")?;

    if playlists.is_empty() {
        println!("{}", "No playlists found".yellow());
        return Ok(());
    }

    for (i, playlist) in playlists.iter().enumerate() {
        let mut flags = Vec::new();
        if playlist.smart {
            flags.push("smart");
        }
        if playlist.hidden {
            flags.push("hidden");
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", flags.join(", "))
        };

        println!(
            "{:2}. {} ({} tracks){}",
            i + 1,
            playlist.name.green(),
            playlist.members.len(),
            flags.cyan()
        );
    }

    println!("\n{}", format!("Total: {} playlists", playlists.len()).cyan());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_error_exit_code() {
        let err = Cli::try_parse_from(["catalog-migrate", "migrate"]).unwrap_err();
        assert_eq!(parse_error_code(&err), EXIT_INVALID_PARAMS);

        let err = Cli::try_parse_from(["catalog-migrate", "migrate", "x.json", "--retries", "many"])
            .unwrap_err();
        assert_eq!(parse_error_code(&err), EXIT_INVALID_PARAMS);
    }

    #[test]
    fn test_help_exit_code() {
        let err = Cli::try_parse_from(["catalog-migrate", "--help"]).unwrap_err();
        assert_eq!(parse_error_code(&err), 0);
    }

    #[test]
    fn test_exit_codes_are_distinct() {
        assert_ne!(EXIT_INVALID_PARAMS, EXIT_MIGRATION_FAILED);
    }

    #[test]
    fn test_parses_migrate_flags() {
        let cli = Cli::try_parse_from([
            "catalog-migrate",
            "migrate",
            "library.json",
            "-d",
            "-r",
            "3",
            "-n",
            "Best",
            "Rest",
        ])
        .unwrap();

        match cli.command {
            Commands::Migrate {
                retries,
                date_added_workaround,
                playlist_names,
                playlists_only,
                ..
            } => {
                assert_eq!(retries, Some(3));
                assert!(date_added_workaround);
                assert_eq!(playlist_names, vec!["Best", "Rest"]);
                assert!(!playlists_only);
            }
            Commands::ListPlaylists { .. } => panic!("expected migrate"),
        }
    }
}
