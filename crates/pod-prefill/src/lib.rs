//! Warming the cache ahead of time: fetch a batch of assets in parallel so
//! later reads are cache hits instead of one-at-a-time downloads.
//!
//! Dispatch per path is a single rule: a bare `s3://...` reference goes
//! through the asset cache directly, anything else is treated as a
//! versioned logical path and goes through the versioned cache. A path that
//! turns out not to exist is logged and skipped rather than aborting the
//! whole batch - one missing texture shouldn't block warming the other
//! thousand assets.

use std::time::{Duration, Instant};

use pod_cache::AssetCache;
use pod_versioned::VersionedCache;
use rayon::prelude::*;

/// What came of a prefill run.
#[derive(Debug)]
pub struct PrefillReport {
    pub fetched: usize,
    pub missing: Vec<String>,
    pub elapsed: Duration,
}

/// Fetch every path in `paths` into the cache, using up to `num_processes`
/// worker threads (falling back to `cache.config().num_prefill_processes()`
/// when `None`).
pub fn prefill(
    cache: &AssetCache,
    versioned: &VersionedCache,
    paths: &[String],
    num_processes: Option<usize>,
    verbose: bool,
) -> PrefillReport {
    let num_processes = num_processes.unwrap_or_else(|| cache.config().num_prefill_processes());
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_processes)
        .build()
        .expect("building a bounded rayon pool should not fail");

    let started = Instant::now();
    let results: Vec<Result<(), String>> = pool.install(|| {
        paths
            .par_iter()
            .map(|path| fetch_one(cache, versioned, path, verbose))
            .collect()
    });
    let elapsed = started.elapsed();

    let mut fetched = 0;
    let mut missing = Vec::new();
    for (path, result) in paths.iter().zip(results) {
        match result {
            Ok(()) => fetched += 1,
            Err(_) => missing.push(path.clone()),
        }
    }

    tracing::info!(fetched, missing = missing.len(), elapsed_s = elapsed.as_secs_f64(), "prefill done");
    PrefillReport { fetched, missing, elapsed }
}

fn fetch_one(cache: &AssetCache, versioned: &VersionedCache, path: &str, verbose: bool) -> Result<(), String> {
    let outcome = if path.starts_with("s3://") {
        cache.get(path, None, false, Some(verbose)).map(|_| ())
    } else {
        versioned.cached_file(path, None, Some(verbose)).map(|_| ())
    };

    outcome.map_err(|err| {
        tracing::warn!(%path, "in the prefill list but not found: {err}");
        path.to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pod_config::Config;
    use pod_store::memory::InMemoryStore;
    use pod_store::reachability::AlwaysReachable;
    use std::sync::Arc;

    fn cache_with(dir: &std::path::Path) -> (AssetCache, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());

        struct SharedStore(Arc<InMemoryStore>);
        impl pod_store::ObjectStore for SharedStore {
            fn copy_to_local(&self, b: &str, k: &str, p: &std::path::Path) -> pod_store::Result<()> {
                self.0.copy_to_local(b, k, p)
            }
            fn copy_from_local(&self, p: &std::path::Path, b: &str, k: &str) -> pod_store::Result<()> {
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

    #[test]
    fn fetches_every_existing_path_and_reports_the_rest_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, store) = cache_with(dir.path());
        store.put("models", "a.obj", b"aaaa".to_vec());
        store.put("models", "b.obj", b"bb".to_vec());

        // A versioned cache over an unrelated, empty cache directory: none of
        // the paths in this test are versioned, so it is never actually read.
        let vc_backing = AssetCache::new(
            Config::default().with_cache_dir(dir.path().join("vc-cache")),
            InMemoryStore::new(),
            AlwaysReachable,
        );
        let vc = VersionedCache::new(Arc::new(vc_backing), dir.path().join("manifest.json"), "models".to_string());

        let report = prefill(
            &cache,
            &vc,
            &["s3://models/a.obj".into(), "s3://models/missing.obj".into()],
            Some(2),
            false,
        );
        assert_eq!(report.fetched, 1);
        assert_eq!(report.missing, vec!["s3://models/missing.obj".to_string()]);
    }
}
