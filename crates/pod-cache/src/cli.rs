//! `pod cache` - direct access to the plain asset cache, addressed by
//! `s3://bucket/key`.
#![allow(clippy::print_stdout)]

use clap::{Args, Subcommand};

use crate::{AssetCache, CacheError};

#[derive(Args)]
pub struct CacheArgs {
    #[command(subcommand)]
    command: CacheCommand,
}

#[derive(Subcommand)]
enum CacheCommand {
    /// Cache a file, downloading it if it isn't already local and fresh.
    Cache {
        /// Key to cache: `s3://BUCKET/PATH/TO/FILE`.
        key: String,
        /// Always check the remote store for updates, even within the TTL.
        #[arg(short, long)]
        update: bool,
    },
    /// Remove a file from the cache.
    Del {
        /// Key to delete: `s3://BUCKET/PATH/TO/FILE`.
        key: String,
    },
    /// List everything in the cache.
    Ls {
        /// Print size and freshness alongside each entry.
        #[arg(short = 'l', long)]
        details: bool,
    },
    /// Print the location of the cache root.
    Loc,
}

pub fn run(cache: &AssetCache, args: CacheArgs) -> Result<(), CacheError> {
    match args.command {
        CacheCommand::Cache { key, update } => {
            cache.get(&key, None, update, None)?;
        }
        CacheCommand::Del { key } => {
            cache.delete(&key, None)?;
        }
        CacheCommand::Ls { details } => {
            let mut entries = cache.ls()?;
            entries.sort_by(|a, b| a.remote().cmp(&b.remote()));
            for entry in entries {
                if details {
                    let outdated = if entry.is_outdated(cache.config()) { "outdated " } else { "" };
                    let age_days = entry.age().map_or(0.0, |age| age.as_secs_f64() / 86_400.0);
                    let size = entry.size().unwrap_or(0);
                    println!("{} {size} {outdated}{age_days:.0} days", entry.remote());
                } else {
                    println!("{}", entry.remote());
                }
            }
        }
        CacheCommand::Loc => {
            println!("{}", cache.config().cache_dir().display());
        }
    }
    Ok(())
}
