use clap::Args;

/// Shared by every subcommand that needs a [`crate::VersionedCache`]: the
/// bucket assets are published to, and the manifest that tracks what's
/// currently published for each path.
#[derive(Args, Clone, Debug)]
pub struct VersionedCacheArgs {
    /// S3 bucket that versioned assets are published to.
    #[arg(long = "vc-bucket", env = "STATIC_CACHE_VC_BUCKET")]
    pub vc_bucket: String,
    /// Path to the versioned cache's manifest file.
    #[arg(long = "vc-manifest", env = "STATIC_CACHE_VC_MANIFEST")]
    pub vc_manifest: String,
}
