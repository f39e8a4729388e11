//! A local, on-disk cache for immutable-ish binary assets stored in a remote
//! object store.
//!
//! [`AssetCache::get`] is the whole contract: give it a path (either a plain
//! key plus an optional bucket, or a full `s3://bucket/key` URI, or a path
//! previously returned by `get` itself) and it hands back a
//! [`CachedPath`] that is guaranteed to exist on disk and be no staler than
//! the configured TTL allows. Everything else on this type (`invalidate`,
//! `delete`, `ls`, ...) is bookkeeping around that one guarantee.
//!
//! [`CacheFile`] owns the pure path algebra — where on disk an asset lives,
//! where its freshness sidecar lives — while `AssetCache` owns the policy of
//! when to trust what's on disk versus going back to the remote store.

mod cache_file;
#[cfg(feature = "clap")]
pub mod cli;
mod error;
mod journal;

use std::path::{Path, PathBuf};

use pod_config::Config;
use pod_store::{ObjectStore, ObjectUri, Reachability};
use tracing::debug;

pub use crate::cache_file::{CacheFile, CachedPath};
pub use crate::error::CacheError;
pub use pod_fs::Removal;

/// The local cache for individually-addressed remote assets.
///
/// Cheap to clone: the store and reachability check are held behind `Arc`
/// internally by whoever constructs them, same as the rest of this
/// workspace's pattern of sharing a `Cache`-like handle across threads.
pub struct AssetCache {
    config: Config,
    store: Box<dyn ObjectStore>,
    reachability: Box<dyn Reachability>,
}

impl AssetCache {
    /// Build a cache from its configuration, remote store, and reachability
    /// check. Most callers want [`pod_config::Config::from_env`] and a
    /// `pod_store::s3::S3Store` here; tests typically pass a
    /// `pod_store::memory::InMemoryStore` and
    /// `pod_store::reachability::AlwaysReachable`.
    pub fn new(
        config: Config,
        store: impl ObjectStore + 'static,
        reachability: impl Reachability + 'static,
    ) -> Self {
        Self { config, store: Box::new(store), reachability: Box::new(reachability) }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolve `path` (optionally paired with an explicit `bucket`) to a
    /// [`CacheFile`], without touching the filesystem or the network.
    ///
    /// `path` may be:
    /// - a full `s3://bucket/key` URI (in which case `bucket` must be `None`)
    /// - a path previously returned by [`Self::get`], i.e. one that lives
    ///   under this cache's root — the original bucket and key are recovered
    ///   from its location
    /// - a bare key, paired with `bucket` or falling back to the configured
    ///   default bucket
    fn cache_file(&self, path: &str, bucket: Option<&str>) -> Result<CacheFile, CacheError> {
        if ObjectUri::is_remote(path) {
            if bucket.is_some() {
                return Err(CacheError::AmbiguousBucket);
            }
            let uri = ObjectUri::parse(path).map_err(CacheError::Store)?;
            return Ok(CacheFile {
                bucket: uri.bucket,
                path: uri.path,
                cache_dir: self.config.cache_dir().to_path_buf(),
            });
        }

        if self.is_cachefile(path) {
            let bucket = bucket_of_cachefile_path(self.config.cache_dir(), path)
                .ok_or(CacheError::NoBucket)?;
            let relative = self.un_sc(path);
            return Ok(CacheFile {
                bucket,
                path: normalize_path(&relative),
                cache_dir: self.config.cache_dir().to_path_buf(),
            });
        }

        let bucket = bucket
            .map(str::to_string)
            .or_else(|| self.config.default_bucket().map(str::to_string))
            .ok_or(CacheError::NoBucket)?;
        Ok(CacheFile {
            bucket,
            path: normalize_path(path),
            cache_dir: self.config.cache_dir().to_path_buf(),
        })
    }

    /// Record that `cache_file` could not be retrieved, best-effort, and
    /// build the error to return to the caller.
    fn cannot_get_needed_file(&self, cache_file: &CacheFile, source: pod_store::StoreError) -> CacheError {
        let reason = match &source {
            pod_store::StoreError::Unreachable(_) => "but we can't contact the remote store.",
            pod_store::StoreError::CredentialsMissing => "but there are no access credentials.",
            _ => "but something went wrong.",
        };
        let message = format!(
            "Tried to access {} from cache but it was not in the cache (expected to see it at {}). \
             Tried to download it, {reason} We've recorded this in {}.",
            cache_file.remote(),
            cache_file.local(),
            journal::journal_path(self.config.cache_dir()).display(),
        );
        journal::record_missing(self.config.cache_dir(), &cache_file.remote());
        CacheError::Unavailable { message, remote: cache_file.remote(), source }
    }

    /// Fetch `path` (see [`Self::cache_file`] for the accepted forms),
    /// downloading or revalidating it against the remote store as needed,
    /// and return its local path.
    ///
    /// Algorithm:
    /// - No local copy: download it, mark it freshly verified, return its
    ///   path.
    /// - A local copy exists and is within the TTL (or the bucket is
    ///   immutable) and `force_check` is `false`: return its path as-is.
    /// - Otherwise: compare the remote ETag against the local file's. If
    ///   they match, just mark it freshly verified (no re-download). If they
    ///   differ, download the new copy.
    /// - If the remote store can't be reached during a revalidation (not an
    ///   initial download), the stale copy is served anyway and a warning is
    ///   logged — a degraded cache beats a hard failure on a flaky network.
    pub fn get(
        &self,
        path: &str,
        bucket: Option<&str>,
        force_check: bool,
        verbose: Option<bool>,
    ) -> Result<CachedPath, CacheError> {
        let verbose = verbose.unwrap_or(self.config.verbose());
        let cache_file = self.cache_file(path, bucket)?;

        if !cache_file.is_cached() {
            self.reachability.assert_reachable().map_err(|_| {
                self.cannot_get_needed_file(&cache_file, pod_store::StoreError::Unreachable(pod_store::InternetUnreachableError))
            })?;
            if verbose {
                debug!(remote = %cache_file.remote(), "downloading missing asset");
            }
            cache_file.download(self.store.as_ref()).map_err(|err| match err {
                CacheError::Store(
                    source @ (pod_store::StoreError::Unreachable(_) | pod_store::StoreError::CredentialsMissing),
                ) => self.cannot_get_needed_file(&cache_file, source),
                other => other,
            })?;
        } else if force_check || cache_file.is_outdated(&self.config) {
            match self.reachability.assert_reachable() {
                Ok(()) => match self.etags_match(&cache_file) {
                    Ok(true) => cache_file.update_timestamp()?,
                    Ok(false) => {
                        if verbose {
                            debug!(remote = %cache_file.remote(), "downloading outdated asset");
                        }
                        cache_file.download(self.store.as_ref())?;
                    }
                    Err(_) => {
                        if verbose {
                            debug!(
                                remote = %cache_file.remote(),
                                "could not compare checksums; assuming the cached copy is fine"
                            );
                        }
                    }
                },
                Err(_) => {
                    if verbose {
                        debug!(
                            remote = %cache_file.remote(),
                            "asset may be outdated but the remote store is unreachable; serving the stale copy"
                        );
                    }
                }
            }
        }

        Ok(cache_file.local())
    }

    fn etags_match(&self, cache_file: &CacheFile) -> Result<bool, CacheError> {
        let remote_etag = self.store.etag(&cache_file.bucket, cache_file.key())?;
        Ok(pod_store::etag::matches(&remote_etag, &cache_file.local())?)
    }

    /// Forget that `path` was ever verified fresh, forcing the next `get` to
    /// revalidate it. If `path` resolves to a directory (e.g. a whole
    /// prefix), its entire timestamp subtree is cleared instead.
    pub fn invalidate(&self, path: &str, bucket: Option<&str>) -> Result<Removal, CacheError> {
        let cache_file = self.cache_file(path, bucket)?;
        if cache_file.local().is_dir() {
            Ok(pod_fs::rm_rf(cache_file.timestamp_path())?)
        } else {
            Ok(cache_file.invalidate()?)
        }
    }

    /// Forget every asset's freshness, forcing a revalidation of the entire
    /// cache on next access.
    pub fn invalidate_all(&self) -> std::io::Result<Removal> {
        pod_fs::rm_rf(self.config.cache_dir().join(".timestamps"))
    }

    /// Remove `path` from local disk entirely (both the asset and its
    /// timestamp sidecar). A subsequent `get` re-downloads it.
    pub fn delete(&self, path: &str, bucket: Option<&str>) -> Result<Removal, CacheError> {
        Ok(self.cache_file(path, bucket)?.remove_cached()?)
    }

    /// Whether `path` names a location already inside this cache.
    #[must_use]
    pub fn is_cachefile(&self, path: &str) -> bool {
        path.starts_with(&cache_dir_with_trailing_sep(self.config.cache_dir()))
    }

    /// The inverse of caching: given a path inside the cache, recover the
    /// bucket-relative path it was downloaded from, stripped of its bucket
    /// component. `un_sc(sc(foo)) == foo`.
    #[must_use]
    pub fn un_sc(&self, path: &str) -> String {
        if !self.is_cachefile(path) {
            return path.to_string();
        }
        let cache_dir = cache_dir_with_trailing_sep(self.config.cache_dir());
        let stripped = path.replacen(&cache_dir, "", 1);
        stripped
            .split_once(std::path::MAIN_SEPARATOR)
            .map_or_else(|| stripped.clone(), |(_, rest)| rest.to_string())
    }

    /// List every remote key under `bucket` with the given prefix. Exposed
    /// so layers built on top of the cache (the versioned cache, in
    /// particular) can enumerate what's available remotely without being
    /// handed the underlying store directly.
    pub fn list_remote(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, CacheError> {
        Ok(self.store.list(bucket, prefix)?)
    }

    /// Whether `bucket`/`key` exists on the remote store, without
    /// downloading or caching it.
    pub fn exists_remote(&self, bucket: &str, key: &str) -> Result<bool, CacheError> {
        Ok(self.store.exists(bucket, key)?)
    }

    /// Publish a local file to `bucket`/`key` on the remote store. Exposed
    /// for the versioned cache's `add`/`update`, which is the only part of
    /// this workspace that ever writes to the remote store rather than just
    /// reading from it.
    pub fn publish(&self, local_path: &Path, bucket: &str, key: &str) -> Result<(), CacheError> {
        Ok(self.store.copy_from_local(local_path, bucket, key)?)
    }

    /// Enumerate every asset currently materialized on disk, across every
    /// bucket.
    pub fn ls(&self) -> std::io::Result<Vec<CacheFile>> {
        let mut entries = Vec::new();
        let cache_dir = self.config.cache_dir();
        for bucket_dir in pod_fs::directories(cache_dir) {
            let Some(bucket) = bucket_dir.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if bucket == ".timestamps" {
                continue;
            }
            for entry in walkdir::WalkDir::new(&bucket_dir).into_iter().filter_map(Result::ok) {
                if !entry.file_type().is_file() {
                    continue;
                }
                if entry.file_name() == ".DS_Store" {
                    continue;
                }
                let relative = entry.path().strip_prefix(&bucket_dir).unwrap_or(entry.path());
                entries.push(CacheFile {
                    bucket: bucket.to_string(),
                    path: normalize_path(&relative.to_string_lossy()),
                    cache_dir: cache_dir.to_path_buf(),
                });
            }
        }
        Ok(entries)
    }
}

fn cache_dir_with_trailing_sep(cache_dir: &Path) -> String {
    let mut s = cache_dir.to_string_lossy().into_owned();
    if !s.ends_with(std::path::MAIN_SEPARATOR) {
        s.push(std::path::MAIN_SEPARATOR);
    }
    s
}

fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

/// Extract the first path component after the cache root, which is the
/// bucket name a cached file lives under.
fn bucket_of_cachefile_path(cache_dir: &Path, path: &str) -> Option<String> {
    let relative = Path::new(path).strip_prefix(cache_dir).ok()?;
    relative.components().next().map(|c| c.as_os_str().to_string_lossy().to_string())
}

/// Initialize a directory for use as a cache: ensure it exists and is
/// tagged so tools like backup utilities and `du --exclude` can recognize
/// it as disposable, the same convention `pod-fs`'s sibling cache crates
/// use CACHEDIR.TAG for.
pub fn init_cache_dir(root: impl Into<PathBuf>) -> std::io::Result<PathBuf> {
    let root = root.into();
    fs_err::create_dir_all(&root)?;
    cachedir::ensure_tag(&root)?;
    fs_err::canonicalize(root)
}
