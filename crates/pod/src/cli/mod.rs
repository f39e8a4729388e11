pub mod cache;
pub mod pack;
pub mod prefill;
pub mod vc;

use clap::{Parser, Subcommand};
pub use pod_versioned::VersionedCacheArgs;

#[derive(Parser)]
#[command(name = "pod", version, about = "A local cache for binary assets in S3")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch, invalidate, or inspect assets in the plain asset cache.
    Cache(cache::CacheArgs),
    /// Work with version-tracked assets.
    Vc(vc::VcArgs),
    /// Bundle cached assets into zip files, or unpack such a bundle.
    Pack(pack::PackArgs),
    /// Warm the cache for a batch of assets ahead of time.
    Prefill(prefill::PrefillArgs),
}
