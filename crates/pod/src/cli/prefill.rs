//! `pod prefill` - warm the cache for a batch of assets ahead of time.

use std::path::PathBuf;

use clap::Args;
use pod_cache::AssetCache;
use pod_versioned::VersionedCache;

use super::VersionedCacheArgs;

#[derive(Args)]
pub struct PrefillArgs {
    #[command(flatten)]
    pub common: VersionedCacheArgs,
    /// YAML file containing a list of paths to prefill.
    #[arg(short, long)]
    file: PathBuf,
    /// Number of worker threads to prefill with; defaults to the
    /// configured `num_prefill_processes`.
    #[arg(long)]
    num_processes: Option<usize>,
    /// Print each path as it's fetched.
    #[arg(short, long)]
    verbose: bool,
}

pub fn run(cache: &AssetCache, vc: &VersionedCache, args: PrefillArgs) -> anyhow::Result<()> {
    let contents = fs_err::read_to_string(&args.file)?;
    let paths: Option<Vec<String>> = serde_yaml::from_str(&contents)?;

    let Some(paths) = paths else {
        println!("Nothing to prefill!");
        return Ok(());
    };

    let report = pod_prefill::prefill(cache, vc, &paths, args.num_processes, args.verbose);
    for path in &report.missing {
        println!("{path} is in the prefill manifest, but is not found!");
    }
    println!("prefill done in {:.1} seconds ({} fetched, {} missing)", report.elapsed.as_secs_f64(), report.fetched, report.missing.len());
    Ok(())
}
