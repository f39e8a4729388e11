//! A repository of version-tracked files backed by a single bucket and a
//! manifest mapping logical paths to the version currently published for
//! them.
//!
//! [`VersionedCache`] is a thin layer over [`pod_cache::AssetCache`]: every
//! read goes through the asset cache (so downloads are still deduplicated
//! and revalidated against a TTL), but the *addressing* is by logical path
//! and semantic version rather than by bucket and key directly. Publishing a
//! new version (`add`/`update`) writes straight through to the remote store
//! and then records the new version in the manifest.

#[cfg(feature = "clap")]
mod cli;
mod error;
mod manifest;
mod version;

use std::path::Path;
use std::sync::{Arc, Mutex};

use pod_cache::{AssetCache, CachedPath};
use pod_store::ObjectUri;

#[cfg(feature = "clap")]
pub use crate::cli::VersionedCacheArgs;
pub use crate::error::VersionedError;
pub use crate::manifest::Manifest;
pub use crate::version::{apply_min_version, extract, is_valid, matches_spec, normalize, parse_exact};

type Result<T> = std::result::Result<T, VersionedError>;

pub struct VersionedCache {
    cache: Arc<AssetCache>,
    manifest_path: std::path::PathBuf,
    bucket: String,
    manifest: Mutex<Option<Manifest>>,
}

impl VersionedCache {
    #[must_use]
    pub fn new(cache: Arc<AssetCache>, manifest_path: impl Into<std::path::PathBuf>, bucket: impl Into<String>) -> Self {
        Self {
            cache,
            manifest_path: manifest_path.into(),
            bucket: bucket.into(),
            manifest: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Fetch the currently-manifested (or explicitly pinned) version of
    /// `path` through the underlying asset cache. In almost all cases,
    /// leave `version` as `None`.
    pub fn cached_file(&self, path: &str, version: Option<&str>, verbose: Option<bool>) -> Result<CachedPath> {
        let path = normalize_path(path);
        if !self.is_versioned(&path)? {
            return Err(VersionedError::NotVersioned(path));
        }
        let uri = self.uri(&path, version, true, None)?;
        self.cache.get(&uri, None, false, verbose).map_err(|err| match err {
            pod_cache::CacheError::KeyNotFound(_) => {
                VersionedError::KeyNotFound(path.clone(), version.unwrap_or("manifest").to_string())
            }
            other => VersionedError::Cache(other),
        })
    }

    fn load_manifest(&self) -> Result<Manifest> {
        let mut guard = self.manifest.lock().unwrap();
        if guard.is_none() {
            *guard = Some(manifest::load(&self.manifest_path)?);
        }
        Ok(guard.clone().unwrap())
    }

    /// Force the next read of the manifest to reload it from disk. Called
    /// after every write.
    fn invalidate_manifest_cache(&self) {
        *self.manifest.lock().unwrap() = None;
    }

    pub fn manifest_files(&self) -> Result<Vec<String>> {
        Ok(self.load_manifest()?.into_keys().collect())
    }

    pub fn manifest_version(&self, path: &str) -> Result<String> {
        let path = normalize_path(path);
        self.load_manifest()?.get(&path).cloned().ok_or(VersionedError::NotVersioned(path))
    }

    pub fn is_versioned(&self, path: &str) -> Result<bool> {
        let path = normalize_path(path);
        Ok(self.load_manifest()?.contains_key(&path))
    }

    fn update_manifest(&self, path: &str, version: &str) -> Result<()> {
        let path = normalize_path(path);
        let mut manifest = manifest::load(&self.manifest_path)?;
        manifest.insert(path, version.to_string());
        manifest::save(&self.manifest_path, &manifest)?;
        self.invalidate_manifest_cache();
        Ok(())
    }

    /// Build the `s3://...` URI for `path` at `version` (or the manifest's
    /// current version, if `None`). `suffixes` are inserted between the
    /// version and the file extension, e.g. `uri("/a.obj", Some("1.0.0"),
    /// true, Some(&["linux".into()]))` is `s3://bucket/a.1.0.0.linux.obj`.
    ///
    /// If `version` doesn't look like a version number at all, it's treated
    /// instead as a literal override path — local or remote — and returned
    /// as-is, provided `allow_local` is set and the path actually exists.
    /// This lets callers point at an exact build artifact outside the normal
    /// version sequence.
    pub fn uri(&self, path: &str, version: Option<&str>, allow_local: bool, suffixes: Option<&[String]>) -> Result<String> {
        let path = normalize_path(path);
        let version = match version {
            Some(v) => v.to_string(),
            None => self.manifest_version(&path)?,
        };

        if version::is_valid(&version) {
            let (base_path, ext) = splitext(&path);
            let suffix_part = suffixes
                .filter(|s| !s.is_empty())
                .map(|s| format!(".{}", s.join(".")))
                .unwrap_or_default();
            Ok(format!("s3://{}{base_path}.{version}{suffix_part}{ext}", self.bucket))
        } else if allow_local && self.path_or_uri_exists(&version)? {
            Ok(version)
        } else {
            Err(VersionedError::KeyNotFound(path, version))
        }
    }

    fn path_or_uri_exists(&self, candidate: &str) -> Result<bool> {
        if ObjectUri::is_remote(candidate) {
            let uri = ObjectUri::parse(candidate)?;
            Ok(self.cache.exists_remote(&uri.bucket, uri.key())?)
        } else {
            Ok(Path::new(candidate).exists())
        }
    }

    /// Publish `local_file` as the first version (`1.0.0`, unless
    /// `version` is given) of `path`. Fails if `path` is already versioned.
    pub fn add(&self, path: &str, local_file: &Path, version: Option<&str>, verbose: bool) -> Result<()> {
        let path = normalize_path(path);
        if self.is_versioned(&path)? {
            return Err(VersionedError::AlreadyVersioned(path));
        }

        let version = match version {
            None => "1.0.0".to_string(),
            Some(v) => {
                let normalized = version::normalize(v);
                if !version::is_valid(&normalized) {
                    return Err(VersionedError::InvalidVersion(normalized));
                }
                normalized
            }
        };

        self.publish(&path, local_file, &version, verbose)?;
        self.update_manifest(&path, &version)
    }

    fn publish(&self, path: &str, local_file: &Path, version: &str, verbose: bool) -> Result<()> {
        let uri = self.uri(path, Some(version), false, None)?;
        let object = ObjectUri::parse(&uri)?;
        if verbose {
            tracing::info!(local = %local_file.display(), remote = %uri, "publishing asset");
        }
        self.cache.publish(local_file, &object.bucket, object.key())?;
        Ok(())
    }

    /// List every key in the bucket, parsed back down to `(key, version)`
    /// pairs, deduplicated to the distinct set of keys.
    ///
    /// A remote key that doesn't embed a version is treated as a hard error
    /// rather than silently dropped: a versioned bucket is not supposed to
    /// hold anything else, so an unparseable key means something unexpected
    /// got published there.
    pub fn ls_remote(&self) -> Result<Vec<String>> {
        let paths = self.cache.list_remote(&self.bucket, "")?;
        let mut keys: Vec<String> = paths
            .iter()
            .map(|p| version::parse(&format!("/{p}")).map(|(key, _)| key))
            .collect::<Result<_>>()?;
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    /// Every version of `path` published to the remote store, oldest first.
    pub fn versions_available(&self, path: &str) -> Result<Vec<String>> {
        let path = normalize_path(path);
        let (base_path, ext) = splitext(&path);
        let prefix = base_path.trim_start_matches('/');
        let candidates = self.cache.list_remote(&self.bucket, prefix)?;

        let mut versions: Vec<semver::Version> = candidates
            .iter()
            .filter(|key| key.ends_with(ext.trim_start_matches('.')) || ext.is_empty())
            .filter_map(|key| version::extract(key).ok())
            .filter_map(|v| semver::Version::parse(&v).ok())
            .collect();
        versions.sort();
        Ok(versions.iter().map(ToString::to_string).collect())
    }

    pub fn latest_available_version(&self, path: &str) -> Result<Option<String>> {
        Ok(self.versions_available(path)?.into_iter().next_back())
    }

    /// Whether `version` satisfies a `semver::VersionReq`-style `spec`,
    /// e.g. `matches_spec("1.2.3", "^1.2")`.
    pub fn version_matches_spec(&self, version: &str, spec: &str) -> Result<bool> {
        version::matches_spec(version, spec)
    }

    pub fn manifest_matches_spec(&self, path: &str, spec: &str) -> Result<bool> {
        if !self.is_versioned(path)? {
            return Ok(false);
        }
        self.version_matches_spec(&self.manifest_version(path)?, spec)
    }

    pub fn latest_matches_spec(&self, path: &str, spec: &str) -> Result<bool> {
        match self.latest_available_version(path)? {
            Some(version) => self.version_matches_spec(&version, spec),
            None => Ok(false),
        }
    }

    /// The next version after the latest one published remotely: a patch
    /// bump, unless `min_version` pushes the result higher.
    pub fn next_version_number(&self, path: &str, min_version: Option<&str>) -> Result<String> {
        let latest = self
            .latest_available_version(path)?
            .ok_or_else(|| VersionedError::NotYetAdded(path.to_string()))?;
        let mut version = version::parse_exact(&latest)?;
        version.patch += 1;
        let bumped = version.to_string();
        match min_version {
            Some(min) => version::apply_min_version(&bumped, min),
            None => Ok(bumped),
        }
    }

    /// Publish `local_file` as a new version of an already-versioned
    /// `path`. Exactly one of `version`, `major`, `minor`, `patch` selects
    /// how the new version number is derived.
    #[allow(clippy::too_many_arguments)]
    pub fn update(
        &self,
        path: &str,
        local_file: &Path,
        version: Option<&str>,
        major: bool,
        minor: bool,
        patch: bool,
        min_version: Option<&str>,
        verbose: bool,
    ) -> Result<()> {
        let path = normalize_path(path);
        let latest = self
            .latest_available_version(&path)?
            .ok_or_else(|| VersionedError::NotYetAdded(path.clone()))?;

        let version = match version {
            Some(v) => version::normalize(v),
            None => {
                let mut bumped = version::parse_exact(&latest)?;
                if major {
                    bumped.major += 1;
                    bumped.minor = 0;
                    bumped.patch = 0;
                } else if minor {
                    bumped.minor += 1;
                    bumped.patch = 0;
                } else if patch {
                    bumped.patch += 1;
                } else {
                    return Err(VersionedError::NoBumpRequested(path));
                }
                let bumped = bumped.to_string();
                match min_version {
                    Some(min) => version::apply_min_version(&bumped, min)?,
                    None => bumped,
                }
            }
        };

        if !version::is_valid(&version) {
            return Err(VersionedError::InvalidVersion(version));
        }
        if version::parse_exact(&version)? <= version::parse_exact(&latest)? {
            return Err(VersionedError::VersionNotIncreasing { new: version, latest });
        }

        self.publish(&path, local_file, &version, verbose)?;
        self.update_manifest(&path, &version)
    }

    pub fn update_major(&self, path: &str, local_file: &Path, verbose: bool) -> Result<()> {
        self.update(path, local_file, None, true, false, false, None, verbose)
    }

    pub fn update_minor(&self, path: &str, local_file: &Path, verbose: bool) -> Result<()> {
        self.update(path, local_file, None, false, true, false, None, verbose)
    }

    pub fn update_patch(&self, path: &str, local_file: &Path, verbose: bool) -> Result<()> {
        self.update(path, local_file, None, false, false, true, None, verbose)
    }

    /// `add` if `path` isn't versioned yet, `update` (driven by
    /// major/minor/patch) if it already is.
    #[allow(clippy::too_many_arguments)]
    pub fn add_or_update(
        &self,
        path: &str,
        local_file: &Path,
        version: Option<&str>,
        major: bool,
        minor: bool,
        patch: bool,
        min_version: Option<&str>,
        verbose: bool,
    ) -> Result<()> {
        if self.is_versioned(path)? {
            self.update(path, local_file, version, major, minor, patch, min_version, verbose)
        } else {
            self.add(path, local_file, version.or(min_version), verbose)
        }
    }

    /// Open an [`Uploader`] for `path`: write to its handle, then call
    /// [`Uploader::finish`] to publish it as a new (or first) version,
    /// without ever writing the content to a named file yourself first.
    #[allow(clippy::too_many_arguments)]
    pub fn upload(
        &self,
        path: &str,
        version: Option<&str>,
        major: bool,
        minor: bool,
        patch: bool,
        min_version: Option<&str>,
        verbose: bool,
    ) -> Result<Uploader<'_>> {
        Uploader::new(self, path, version, major, minor, patch, min_version, verbose)
    }

    /// Mirror every manifested path to `destination` (a local directory or
    /// `s3://...` prefix), at its currently manifested version.
    pub fn sync(&self, destination: &Path) -> Result<()> {
        for path in self.manifest_files()? {
            let version = self.manifest_version(&path)?;
            let target = destination.join(path.trim_start_matches('/'));
            tracing::info!(%path, %version, target = %target.display(), "syncing asset");
            let local = self.cached_file(&path, None, Some(false))?;
            if let Some(parent) = target.parent() {
                fs_err::create_dir_all(parent)?;
            }
            fs_err::copy(&local, &target)?;
        }
        Ok(())
    }
}

/// Write-then-publish guard returned by [`VersionedCache::upload`]: write to
/// the handle, then call [`Uploader::finish`] to publish the result as a new
/// (or first) version of the path it was opened for.
///
/// Unlike the context manager it's modeled on, publication never happens
/// implicitly - Rust has no fallible `Drop`, so a dropped `Uploader` that was
/// never `finish`ed just discards its temp file instead of silently
/// publishing whatever was written to it.
pub struct Uploader<'a> {
    vc: &'a VersionedCache,
    path: String,
    file: tempfile::NamedTempFile,
    version: Option<String>,
    major: bool,
    minor: bool,
    patch: bool,
    min_version: Option<String>,
    verbose: bool,
}

impl<'a> Uploader<'a> {
    #[allow(clippy::too_many_arguments)]
    fn new(
        vc: &'a VersionedCache,
        path: &str,
        version: Option<&str>,
        major: bool,
        minor: bool,
        patch: bool,
        min_version: Option<&str>,
        verbose: bool,
    ) -> Result<Self> {
        Ok(Self {
            vc,
            path: path.to_string(),
            file: tempfile::NamedTempFile::new().map_err(VersionedError::Io)?,
            version: version.map(ToString::to_string),
            major,
            minor,
            patch,
            min_version: min_version.map(ToString::to_string),
            verbose,
        })
    }

    /// The temporary file to write the new content to before publishing.
    pub fn file(&mut self) -> &mut std::fs::File {
        self.file.as_file_mut()
    }

    /// Publish the file's current contents as the path's new version, the
    /// same way [`VersionedCache::add_or_update`] would from a file already
    /// on disk.
    pub fn finish(mut self) -> Result<()> {
        use std::io::Write;
        self.file.as_file_mut().flush().map_err(VersionedError::Io)?;
        self.file.as_file().sync_all().map_err(VersionedError::Io)?;
        self.vc.add_or_update(
            &self.path,
            self.file.path(),
            self.version.as_deref(),
            self.major,
            self.minor,
            self.patch,
            self.min_version.as_deref(),
            self.verbose,
        )
    }
}

fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

fn splitext(path: &str) -> (String, String) {
    let slash = path.rfind('/').unwrap_or(0);
    match path[slash..].rfind('.') {
        Some(rel_idx) => {
            let idx = slash + rel_idx;
            (path[..idx].to_string(), path[idx..].to_string())
        }
        None => (path.to_string(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pod_config::Config;
    use pod_store::memory::InMemoryStore;
    use pod_store::reachability::AlwaysReachable;
    use std::io::Write;

    fn versioned_cache(dir: &Path) -> (VersionedCache, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());

        struct SharedStore(Arc<InMemoryStore>);
        impl pod_store::ObjectStore for SharedStore {
            fn copy_to_local(&self, b: &str, k: &str, p: &Path) -> pod_store::Result<()> {
                self.0.copy_to_local(b, k, p)
            }
            fn copy_from_local(&self, p: &Path, b: &str, k: &str) -> pod_store::Result<()> {
                self.0.copy_from_local(p, b, k)
            }
            fn exists(&self, b: &str, k: &str) -> pod_store::Result<bool> {
                self.0.exists(b, k)
            }
            fn etag(&self, b: &str, k: &str) -> pod_store::Result<String> {
                self.0.etag(b, k)
            }
            fn list(&self, b: &str, p: &str) -> pod_store::Result<Vec<String>> {
                self.0.list(b, p)
            }
            fn remove(&self, b: &str, k: &str) -> pod_store::Result<()> {
                self.0.remove(b, k)
            }
        }

        let config = Config::default().with_cache_dir(dir.join("cache"));
        let asset_cache = Arc::new(AssetCache::new(config, SharedStore(store.clone()), AlwaysReachable));
        let manifest_path = dir.join("manifest.json");
        let vc = VersionedCache::new(asset_cache, manifest_path, "models".to_string());
        (vc, store)
    }

    fn write_local_file(dir: &Path, name: &str, contents: &[u8]) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::File::create(&path).unwrap().write_all(contents).unwrap();
        path
    }

    #[test]
    fn add_then_fetch_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let (vc, _store) = versioned_cache(dir.path());
        let local_file = write_local_file(dir.path(), "hero.obj", b"geometry-v1");

        vc.add("/characters/hero.obj", &local_file, None, false).unwrap();
        assert_eq!(vc.manifest_version("/characters/hero.obj").unwrap(), "1.0.0");

        let cached = vc.cached_file("/characters/hero.obj", None, Some(false)).unwrap();
        assert_eq!(std::fs::read(&cached).unwrap(), b"geometry-v1");
    }

    #[test]
    fn add_twice_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (vc, _store) = versioned_cache(dir.path());
        let local_file = write_local_file(dir.path(), "hero.obj", b"geometry-v1");

        vc.add("/characters/hero.obj", &local_file, None, false).unwrap();
        let err = vc.add("/characters/hero.obj", &local_file, None, false).unwrap_err();
        assert!(matches!(err, VersionedError::AlreadyVersioned(_)));
    }

    #[test]
    fn update_patch_bumps_and_republishes() {
        let dir = tempfile::tempdir().unwrap();
        let (vc, _store) = versioned_cache(dir.path());
        let v1 = write_local_file(dir.path(), "hero-v1.obj", b"geometry-v1");
        vc.add("/characters/hero.obj", &v1, None, false).unwrap();

        let v2 = write_local_file(dir.path(), "hero-v2.obj", b"geometry-v2");
        vc.update_patch("/characters/hero.obj", &v2, false).unwrap();

        assert_eq!(vc.manifest_version("/characters/hero.obj").unwrap(), "1.0.1");
        let cached = vc.cached_file("/characters/hero.obj", None, Some(false)).unwrap();
        assert_eq!(std::fs::read(&cached).unwrap(), b"geometry-v2");
    }

    #[test]
    fn update_major_resets_minor_and_patch() {
        let dir = tempfile::tempdir().unwrap();
        let (vc, _store) = versioned_cache(dir.path());
        let v1 = write_local_file(dir.path(), "hero-v1.obj", b"geometry-v1");
        vc.add("/characters/hero.obj", &v1, Some("1.2.3"), false).unwrap();

        let v2 = write_local_file(dir.path(), "hero-v2.obj", b"geometry-v2");
        vc.update_major("/characters/hero.obj", &v2, false).unwrap();
        assert_eq!(vc.manifest_version("/characters/hero.obj").unwrap(), "2.0.0");
    }

    #[test]
    fn fetching_an_unversioned_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let (vc, _store) = versioned_cache(dir.path());
        let err = vc.cached_file("/characters/missing.obj", None, Some(false)).unwrap_err();
        assert!(matches!(err, VersionedError::NotVersioned(_)));
    }

    #[test]
    fn next_version_number_bumps_patch_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let (vc, _store) = versioned_cache(dir.path());
        let v1 = write_local_file(dir.path(), "hero-v1.obj", b"geometry-v1");
        vc.add("/characters/hero.obj", &v1, Some("3.4.5"), false).unwrap();

        assert_eq!(vc.next_version_number("/characters/hero.obj", None).unwrap(), "3.4.6");
        assert_eq!(vc.next_version_number("/characters/hero.obj", Some("4")).unwrap(), "4.0.0");
    }

    #[test]
    fn uploader_publishes_on_finish() {
        use std::io::Write as _;

        let dir = tempfile::tempdir().unwrap();
        let (vc, _store) = versioned_cache(dir.path());

        let mut uploader = vc.upload("/characters/hero.obj", None, false, false, false, None, false).unwrap();
        uploader.file().write_all(b"uploaded-bytes").unwrap();
        uploader.finish().unwrap();

        assert_eq!(vc.manifest_version("/characters/hero.obj").unwrap(), "1.0.0");
        let cached = vc.cached_file("/characters/hero.obj", None, Some(false)).unwrap();
        assert_eq!(std::fs::read(&cached).unwrap(), b"uploaded-bytes");
    }

    #[test]
    fn uploader_dropped_without_finish_publishes_nothing() {
        use std::io::Write as _;

        let dir = tempfile::tempdir().unwrap();
        let (vc, _store) = versioned_cache(dir.path());

        let mut uploader = vc.upload("/characters/hero.obj", None, false, false, false, None, false).unwrap();
        uploader.file().write_all(b"never-published").unwrap();
        drop(uploader);

        assert!(!vc.is_versioned("/characters/hero.obj").unwrap());
    }

    #[test]
    fn version_matches_spec_checks_a_semver_requirement() {
        let dir = tempfile::tempdir().unwrap();
        let (vc, _store) = versioned_cache(dir.path());
        assert!(vc.version_matches_spec("1.2.3", "^1.2").unwrap());
        assert!(!vc.version_matches_spec("2.0.0", "^1.2").unwrap());
    }
}
