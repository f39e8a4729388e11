//! Bundling a set of already-cached assets into one or more zip files for
//! offline distribution, and unpacking such a bundle straight into a cache
//! root.
//!
//! `dump` pulls every requested asset through the asset cache (or the
//! versioned cache, for paths that are both immutable and versioned) so
//! that packing never talks to the remote store directly - whatever's
//! fresh in the cache is what gets bundled. `load` is the mirror image:
//! unzip straight over a cache directory and every bundled asset is now a
//! cache hit.

mod error;

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use pod_cache::AssetCache;
use pod_store::ObjectUri;
use pod_versioned::VersionedCache;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub use crate::error::PackError;

const BYTES_PER_MB: u64 = 1024 * 1024;

struct FileToPack {
    /// Where this asset lives inside the cache root.
    src: PathBuf,
    /// Where it should land inside the zip, relative to the cache root.
    dst: String,
    size: u64,
}

fn resolve(cache: &AssetCache, versioned: &VersionedCache, src: &str) -> Result<FileToPack, PackError> {
    let local = if let Ok(uri) = ObjectUri::parse(src) {
        if cache.config().is_immutable_bucket(&uri.bucket) && versioned.is_versioned(&uri.path)? {
            versioned.cached_file(&uri.path, None, Some(false))?
        } else {
            cache.get(src, None, false, Some(false))?
        }
    } else {
        cache.get(src, None, false, Some(false))?
    };

    let cache_dir = cache.config().cache_dir();
    let local_path = local.into_path_buf();
    let dst = local_path
        .strip_prefix(cache_dir)
        .unwrap_or(&local_path)
        .to_string_lossy()
        .trim_start_matches(std::path::MAIN_SEPARATOR)
        .replace(std::path::MAIN_SEPARATOR, "/");

    let size = fs_err::metadata(&local_path)?.len();
    Ok(FileToPack { src: local_path, dst, size })
}

/// Greedily assign `files` (already sorted largest-first) to the first zip
/// whose running total leaves enough headroom for one more file, opening a
/// new zip when none does. Optimal packing is a knapsack problem; this just
/// needs to run occasionally and not waste too much space.
fn first_fit_bins(files: Vec<FileToPack>, max_size: u64) -> Vec<Vec<FileToPack>> {
    let mut bins: Vec<Vec<FileToPack>> = Vec::new();
    let mut bin_totals: Vec<u64> = Vec::new();

    for file in files {
        let fit = bin_totals
            .iter()
            .position(|&total| file.size < max_size - total);
        match fit {
            Some(index) => {
                bin_totals[index] += file.size;
                bins[index].push(file);
            }
            None => {
                bin_totals.push(file.size);
                bins.push(vec![file]);
            }
        }
    }
    bins
}

/// Pack `paths` (a mix of plain `s3://bucket/key` references and versioned
/// logical paths) into one or more zip files derived from `save_to`.
///
/// Without `max_size_mb`, everything lands in a single `{save_to stem}.zip`.
/// With it, assets are greedily distributed (largest first) across as many
/// `{save_to stem}_{n}.zip` files as needed to keep each one under the
/// limit. Returns the zip files actually written, in order.
pub fn dump(
    cache: &AssetCache,
    versioned: &VersionedCache,
    paths: &[String],
    save_to: &Path,
    max_size_mb: Option<u64>,
) -> Result<Vec<PathBuf>, PackError> {
    if paths.is_empty() {
        return Err(PackError::Empty);
    }

    let mut files: Vec<FileToPack> =
        paths.iter().map(|p| resolve(cache, versioned, p)).collect::<Result<_, _>>()?;
    files.sort_by(|a, b| b.size.cmp(&a.size));

    let stem = save_to.with_extension("");
    let bins = if let Some(max_size_mb) = max_size_mb {
        let max_size = max_size_mb * BYTES_PER_MB;
        if let Some(biggest) = files.iter().map(|f| f.size).max() {
            if biggest > max_size {
                return Err(PackError::FileExceedsMaxSize {
                    path: files.iter().find(|f| f.size == biggest).unwrap().dst.clone(),
                    file_size_mb: biggest / BYTES_PER_MB,
                    max_size_mb,
                });
            }
        }
        first_fit_bins(files, max_size)
    } else {
        vec![files]
    };

    let mut written = Vec::with_capacity(bins.len());
    for (index, bin) in bins.iter().enumerate() {
        let zip_path = if max_size_mb.is_some() {
            path_with_suffix(&stem, &format!("_{}.zip", index + 1))
        } else {
            path_with_suffix(&stem, ".zip")
        };

        let total: u64 = bin.iter().map(|f| f.size).sum();
        tracing::info!(zip = %zip_path.display(), files = bin.len(), bytes = total, "building asset pack");

        let file = fs_err::File::create(&zip_path)?;
        let mut writer = ZipWriter::new(file);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated).large_file(true);
        for entry in bin {
            tracing::debug!(dst = %entry.dst, "adding asset to pack");
            writer.start_file(entry.dst.as_str(), options)?;
            let mut src = File::open(&entry.src)?;
            std::io::copy(&mut src, &mut writer)?;
        }
        writer.finish()?;
        written.push(zip_path);
    }

    Ok(written)
}

fn path_with_suffix(stem: &Path, suffix: &str) -> PathBuf {
    let mut s = stem.to_string_lossy().into_owned();
    s.push_str(suffix);
    PathBuf::from(s)
}

/// Extract every zip file in `asset_pack_paths` directly onto the cache's
/// root, so whatever they contain becomes cache hits.
pub fn load(cache: &AssetCache, asset_pack_paths: &[PathBuf]) -> Result<(), PackError> {
    let cache_dir = cache.config().cache_dir();
    for asset_pack_path in asset_pack_paths {
        let file = fs_err::File::open(asset_pack_path)?;
        let mut archive = ZipArchive::new(file)?;
        for index in 0..archive.len() {
            let mut entry = archive.by_index(index)?;
            let Some(relative) = entry.enclosed_name() else { continue };
            let target = cache_dir.join(relative);

            if entry.is_dir() {
                fs_err::create_dir_all(&target)?;
                continue;
            }
            if let Some(parent) = target.parent() {
                fs_err::create_dir_all(parent)?;
            }
            let mut contents = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut contents)?;
            let mut out = File::create(&target)?;
            out.write_all(&contents)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pod_config::Config;
    use pod_store::memory::InMemoryStore;
    use pod_store::reachability::AlwaysReachable;
    use pod_store::ObjectStore as _;
    use std::sync::Arc;

    fn cache_with(dir: &Path) -> (AssetCache, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());

        struct SharedStore(Arc<InMemoryStore>);
        impl ObjectStore for SharedStore {
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
        let cache = AssetCache::new(config, SharedStore(store.clone()), AlwaysReachable);
        (cache, store)
    }

    fn versioned_cache_over(cache: AssetCache, dir: &Path) -> VersionedCache {
        VersionedCache::new(Arc::new(cache), dir.join("manifest.json"), "models".to_string())
    }

    #[test]
    fn dump_without_max_size_writes_one_zip() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, store) = cache_with(dir.path());
        store.put("models", "a.obj", b"aaaa".to_vec());
        store.put("models", "b.obj", b"bb".to_vec());

        // None of the packed paths are versioned, so the versioned cache here
        // is never actually read from - it only needs to answer `is_versioned`.
        let unused_vc_backing = AssetCache::new(
            Config::default().with_cache_dir(dir.path().join("vc-cache")),
            InMemoryStore::new(),
            AlwaysReachable,
        );
        let vc = versioned_cache_over(unused_vc_backing, dir.path());

        let save_to = dir.path().join("bundle.zip");
        let written = dump(
            &cache,
            &vc,
            &["s3://models/a.obj".into(), "s3://models/b.obj".into()],
            &save_to,
            None,
        )
        .unwrap();
        assert_eq!(written, vec![dir.path().join("bundle.zip")]);
        assert!(written[0].exists());
    }

    #[test]
    fn load_extracts_into_the_cache_root() {
        let dir = tempfile::tempdir().unwrap();
        let cache_dir = dir.path().join("cache");
        let (cache, _store) = cache_with(dir.path());

        let zip_path = dir.path().join("bundle.zip");
        {
            let file = std::fs::File::create(&zip_path).unwrap();
            let mut writer = ZipWriter::new(file);
            let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
            writer.start_file("models/a.obj", options).unwrap();
            writer.write_all(b"geometry").unwrap();
            writer.finish().unwrap();
        }

        load(&cache, &[zip_path]).unwrap();
        assert_eq!(std::fs::read(cache_dir.join("models/a.obj")).unwrap(), b"geometry");
    }
}
