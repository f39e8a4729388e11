//! `pod pack` - bundling cached assets into zip files, and unpacking them.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use pod_cache::AssetCache;
use pod_versioned::VersionedCache;

use super::VersionedCacheArgs;

#[derive(Args)]
pub struct PackArgs {
    #[command(flatten)]
    pub common: VersionedCacheArgs,
    #[command(subcommand)]
    command: PackCommand,
}

#[derive(Subcommand)]
enum PackCommand {
    /// Bundle the paths listed in a YAML file into one or more zip files.
    Dump {
        /// YAML file containing a list of `s3://...` and versioned paths to pack.
        file: PathBuf,
        /// Location to write the package to.
        save_to: PathBuf,
        /// Maximum size of each zip file, in MB.
        #[arg(long)]
        max_size: Option<u64>,
    },
    /// Unpack one or more asset pack zip files into the cache.
    Load {
        /// Zip files to unpack into the cache.
        files: Vec<PathBuf>,
    },
}

pub fn run(cache: &AssetCache, vc: &VersionedCache, args: PackArgs) -> anyhow::Result<()> {
    match args.command {
        PackCommand::Dump { file, save_to, max_size } => {
            let contents = fs_err::read_to_string(&file)?;
            let paths: Vec<String> = serde_yaml::from_str(&contents)?;
            let written = pod_pack::dump(cache, vc, &paths, &save_to, max_size)?;
            for zip_path in written {
                println!("wrote {}", zip_path.display());
            }
        }
        PackCommand::Load { files } => {
            pod_pack::load(cache, &files)?;
        }
    }
    Ok(())
}
