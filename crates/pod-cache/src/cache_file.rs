use std::fmt;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use pod_config::Config;
use pod_store::{ObjectStore, ObjectUri};

use crate::CacheError;

/// A path inside the cache directory that has already been recognized as
/// such, e.g. one returned from [`crate::AssetCache::get`]. Passing a
/// `CachedPath` back into `get` is idempotent: the cache finds the bucket and
/// key it was originally downloaded under instead of treating it as a
/// brand-new local file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CachedPath(PathBuf);

impl CachedPath {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self(path)
    }

    #[must_use]
    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }
}

impl Deref for CachedPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for CachedPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for CachedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// A single tracked asset: the bucket and key it lives at remotely, and the
/// local cache root it's materialized under. Cheap to construct; all the
/// real work happens in `AssetCache`, which builds one of these per call.
#[derive(Debug, Clone)]
pub struct CacheFile {
    pub(crate) bucket: String,
    /// Always begins with `/`.
    pub(crate) path: String,
    pub(crate) cache_dir: PathBuf,
}

impl CacheFile {
    /// The path this asset is materialized at locally, regardless of
    /// whether it has been downloaded yet.
    #[must_use]
    pub fn local(&self) -> CachedPath {
        let relative = self.path.trim_start_matches('/');
        CachedPath::new(self.cache_dir.join(&self.bucket).join(relative))
    }

    /// The `s3://bucket/path` this asset is sourced from.
    #[must_use]
    pub fn remote(&self) -> String {
        ObjectUri { bucket: self.bucket.clone(), path: self.path.clone() }.to_uri_string()
    }

    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// The key to pass to an [`ObjectStore`], i.e. [`Self::path`] without its
    /// leading slash.
    #[must_use]
    pub fn key(&self) -> &str {
        self.path.trim_start_matches('/')
    }

    /// The sidecar file recording when this asset was last verified fresh.
    /// Kept in a parallel `.timestamps` tree rather than next to the asset
    /// itself, so invalidating never touches the asset's own mtime.
    #[must_use]
    pub fn timestamp_path(&self) -> PathBuf {
        self.cache_dir.join(".timestamps").join(&self.bucket).join(self.path.trim_start_matches('/'))
    }

    #[must_use]
    pub fn timestamp(&self) -> Option<SystemTime> {
        std::fs::metadata(self.timestamp_path()).ok()?.modified().ok()
    }

    /// How long ago this asset was last verified fresh, or `None` if it has
    /// never been verified (a brand-new download whose timestamp write
    /// failed, or a file dropped into the cache by hand).
    #[must_use]
    pub fn age(&self) -> Option<Duration> {
        SystemTime::now().duration_since(self.timestamp()?).ok()
    }

    #[must_use]
    pub fn size(&self) -> Option<u64> {
        std::fs::metadata(self.local()).ok().map(|m| m.len())
    }

    /// Mark this asset as freshly verified, right now.
    pub fn update_timestamp(&self) -> std::io::Result<()> {
        pod_fs::touch(self.timestamp_path())
    }

    /// Forget that this asset was ever verified, forcing the next `get` to
    /// revalidate it against the remote store.
    pub fn invalidate(&self) -> std::io::Result<pod_fs::Removal> {
        pod_fs::rm_rf(self.timestamp_path())
    }

    /// Whether this asset is due for revalidation, per `config`'s TTL policy
    /// and immutable-bucket list.
    #[must_use]
    pub fn is_outdated(&self, config: &Config) -> bool {
        if config.is_immutable_bucket(&self.bucket) {
            return false;
        }
        config.timeout().is_stale(self.age())
    }

    pub fn download(&self, store: &dyn ObjectStore) -> Result<(), CacheError> {
        store.copy_to_local(&self.bucket, self.key(), &self.local())?;
        self.update_timestamp()?;
        Ok(())
    }

    #[must_use]
    pub fn is_cached(&self) -> bool {
        self.local().exists()
    }

    pub fn remove_cached(&self) -> std::io::Result<pod_fs::Removal> {
        let mut removal = self.invalidate()?;
        removal += pod_fs::rm_rf(self.local())?;
        Ok(removal)
    }
}
