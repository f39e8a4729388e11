//! `pod vc` - the version-tracked asset front-end.

use std::io::Write;
use std::path::PathBuf;

use clap::{Args, Subcommand};
use pod_versioned::VersionedCache;

use super::VersionedCacheArgs;

#[derive(Args)]
pub struct VcArgs {
    #[command(flatten)]
    pub common: VersionedCacheArgs,
    #[command(subcommand)]
    command: VcCommand,
}

#[derive(Subcommand)]
enum VcCommand {
    /// Start versioning a file.
    Add { path: String, file: PathBuf },
    /// Publish a new version of an already-versioned file.
    Update {
        path: String,
        file: PathBuf,
        #[arg(long)]
        major: bool,
        #[arg(long)]
        minor: bool,
        #[arg(long)]
        patch: bool,
    },
    /// List every version available for a path.
    Versions { path: String },
    /// Sync every manifested file to a local directory.
    Sync {
        #[arg(default_value = "./versioned_assets")]
        destination: PathBuf,
    },
    /// List versioned paths in the manifest.
    Ls,
    /// List versioned paths found directly in the storage bucket.
    LsRemote,
    /// Download a file and copy it to a destination.
    Get { path: String, version: Option<String>, destination: PathBuf },
    /// Cache the file locally and print its path.
    Path { path: String, version: Option<String> },
    /// Cache the file locally and open it with the platform opener.
    ///
    /// Shells out to `/usr/bin/open`; only meaningful on macOS.
    Open { path: String, version: Option<String> },
    /// Print the file's remote `s3://...` path without downloading it.
    PathRemote { path: String, version: Option<String> },
    /// Write the contents of a file to stdout.
    Cat { path: String, version: Option<String> },
}

pub fn run(vc: &VersionedCache, args: VcArgs) -> anyhow::Result<()> {
    match args.command {
        VcCommand::Add { path, file } => {
            vc.add(&path, &file, None, true)?;
        }
        VcCommand::Update { path, file, major, minor, patch } => {
            vc.update(&path, &file, None, major, minor, patch, None, true)?;
        }
        VcCommand::Versions { path } => {
            for version in vc.versions_available(&path)? {
                println!("{version}");
            }
        }
        VcCommand::Sync { destination } => {
            println!("sync to {}", destination.display());
            vc.sync(&destination)?;
        }
        VcCommand::Ls => {
            let mut paths = vc.manifest_files()?;
            paths.sort();
            for path in paths {
                println!("{path}");
            }
        }
        VcCommand::LsRemote => {
            let mut paths = vc.ls_remote()?;
            paths.sort();
            for path in paths {
                println!("{path}");
            }
        }
        VcCommand::Get { path, version, destination } => {
            let local = vc.cached_file(&path, version.as_deref(), None)?;
            println!(
                "copying {path} version {} to {}",
                vc.manifest_version(&path)?,
                destination.display()
            );
            fs_err::copy(&local, &destination)?;
        }
        VcCommand::Path { path, version } => {
            println!("{}", vc.cached_file(&path, version.as_deref(), None)?);
        }
        VcCommand::Open { path, version } => {
            let local = vc.cached_file(&path, version.as_deref(), None)?;
            std::process::Command::new("open").arg(&*local).status()?;
        }
        VcCommand::PathRemote { path, version } => {
            println!("{}", vc.uri(&path, version.as_deref(), false, None)?);
        }
        VcCommand::Cat { path, version } => {
            let local = vc.cached_file(&path, version.as_deref(), None)?;
            let contents = fs_err::read(&local)?;
            std::io::stdout().write_all(&contents)?;
        }
    }
    Ok(())
}
