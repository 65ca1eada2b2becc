//! Binary entrypoint for the friendlist admin CLI.
//!
//! Commands:
//! - `init` - write a starter `friendlist.toml`
//! - `show <id>` - print one participant's list and who lists them
//! - `stats` - print record and relationship counts
//! - `verify` - rebuild the reverse index from the snapshot and check it
//!
//! The CLI works on persisted data only; nobody is connected, so names come
//! from the cached records.
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::{error, info};
use std::sync::Arc;

use friendlist::config::Config;
use friendlist::friends::{open_configured, FriendsService, ParticipantId, PresenceDirectory};

#[derive(Parser)]
#[command(name = "friendlist")]
#[command(about = "Inspect and maintain a persisted friend graph")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "friendlist.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init,
    /// Show a participant's friends and who lists them
    Show {
        /// Participant id
        id: String,
    },
    /// Print graph statistics
    Stats,
    /// Check that the reverse index matches the forward map
    Verify,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            init_logging(None, cli.verbose);
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);
        }
        Commands::Show { id } => {
            let friends = open_service(&cli.config, cli.verbose).await?;
            let id = ParticipantId::new(id)?;
            let listing = friends.friend_listing(&id);
            println!(
                "{} has {} friends ({} max.)",
                friends.resolve_name(&id),
                listing.count,
                listing.max
            );
            for friend in friends.get_friends(&id) {
                let mutual = if friends.are_friends(&id, &friend) { " [mutual]" } else { "" };
                println!("  {} ({}){}", friends.resolve_name(&friend), friend, mutual);
            }
            let listed_by = friends.get_friends_of(&id);
            println!("Listed by {}:", listed_by.len());
            for owner in listed_by {
                println!("  {} ({})", friends.resolve_name(&owner), owner);
            }
        }
        Commands::Stats => {
            let friends = open_service(&cli.config, cli.verbose).await?;
            let stats = friends.stats();
            let payload = serde_json::json!({
                "records": stats.records,
                "stubs": stats.stubs,
                "relationships": stats.relationships,
                "mutual_pairs": stats.mutual_pairs,
                "reverse_entries": stats.reverse_entries,
                "max_friends": friends.max_friends(),
            });
            println!("{}", payload);
        }
        Commands::Verify => {
            let friends = open_service(&cli.config, cli.verbose).await?;
            if let Err(e) = friends.verify_index() {
                error!("Index verification failed: {}", e);
                return Err(anyhow!("verification failed: {}", e));
            }
            println!("ok");
        }
    }

    Ok(())
}

/// Load config, start logging and open the persisted graph with an empty directory.
async fn open_service(config_path: &str, verbosity: u8) -> Result<FriendsService> {
    let config = Config::load(config_path).await?;
    init_logging(Some(&config), verbosity);
    let store = open_configured(&config.storage)?;
    let friends = FriendsService::builder(store, Arc::new(PresenceDirectory::new()))
        .config(config.friends.clone())
        .open()?;
    Ok(friends)
}

fn init_logging(config: Option<&Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let level = match (verbosity, config) {
        (0, Some(cfg)) => cfg.logging.level_filter(),
        (0, None) => log::LevelFilter::Info,
        (1, _) => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(level);

    let log_file = config
        .and_then(|cfg| cfg.logging.file.as_ref())
        .and_then(|path| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        });

    match log_file {
        Some(f) => {
            let file = std::sync::Arc::new(std::sync::Mutex::new(f));
            // foreground runs also echo to the console
            let is_tty = atty::is(atty::Stream::Stdout);
            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());
                if let Ok(mut guard) = file.lock() {
                    let _ = writeln!(guard, "{}", line);
                }
                if is_tty {
                    writeln!(fmt, "{}", line)
                } else {
                    Ok(())
                }
            });
        }
        None => {
            builder.format(|fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
            });
        }
    }
    let _ = builder.try_init();
}
