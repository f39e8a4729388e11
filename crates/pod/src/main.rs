//! The `pod` command line tool: a thin front-end over `pod-cache`,
//! `pod-versioned`, `pod-pack`, and `pod-prefill`, one subcommand group per
//! crate.
//!
//! Printing to stdout is how every subcommand reports its result, so the
//! workspace-wide `print_stdout` lint is silenced here rather than at every
//! call site.
#![allow(clippy::print_stdout)]

mod cli;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use cli::{Cli, Commands, VersionedCacheArgs};
use owo_colors::OwoColorize;
use pod_cache::AssetCache;
use pod_config::Config;
use pod_store::reachability::NetworkReachability;
use pod_store::s3::{S3Config, S3Store};
use pod_versioned::VersionedCache;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::from_env();
    let store = S3Store::new(S3Config::default())?;
    let cache = Arc::new(AssetCache::new(config, store, NetworkReachability::default()));

    match cli.command {
        Commands::Cache(args) => cli::cache::run(&cache, args).map_err(anyhow::Error::from),
        Commands::Vc(args) => {
            let versioned = versioned_cache_from(&cache, &args.common);
            cli::vc::run(&versioned, args)
        }
        Commands::Pack(args) => {
            let versioned = versioned_cache_from(&cache, &args.common);
            cli::pack::run(&cache, &versioned, args)
        }
        Commands::Prefill(args) => {
            let versioned = versioned_cache_from(&cache, &args.common);
            cli::prefill::run(&cache, &versioned, args)
        }
    }
}

/// Every subcommand that touches the versioned cache needs the same
/// `--vc-bucket`/`--vc-manifest` pair; build one `VersionedCache` layered on
/// the same asset cache every other subcommand uses.
fn versioned_cache_from(cache: &Arc<AssetCache>, common: &VersionedCacheArgs) -> VersionedCache {
    VersionedCache::new(Arc::clone(cache), common.vc_manifest.as_str(), common.vc_bucket.clone())
}
