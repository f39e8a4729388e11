//! Runtime configuration for the asset cache, versioned cache, and prefill
//! tools.
//!
//! Every setting has a built-in default and can be overridden by an
//! environment variable, mirroring the original library's convention of a
//! configuration object whose properties fall back to `os.environ`. Call
//! [`Config::from_env`] to read the process environment, or build a
//! [`Config`] directly (e.g. in tests) to bypass it entirely.

use std::path::{Path, PathBuf};

mod ttl;

pub use ttl::Ttl;

/// `STATIC_CACHE_DIR` default: `~/.baiji_cache`.
const DEFAULT_CACHE_DIR_NAME: &str = ".baiji_cache";

/// `STATIC_CACHE_TIMEOUT` default: one day, in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 86_400;

/// `STATIC_CACHE_NUM_PREFILL_PROCESSES` default.
const DEFAULT_NUM_PREFILL_PROCESSES: usize = 12;

#[derive(Debug, Clone)]
pub struct Config {
    cache_dir: PathBuf,
    timeout: Ttl,
    immutable_buckets: Vec<String>,
    default_bucket: Option<String>,
    verbose: bool,
    num_prefill_processes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: home::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(DEFAULT_CACHE_DIR_NAME),
            timeout: Ttl::Seconds(DEFAULT_TIMEOUT_SECS),
            immutable_buckets: Vec::new(),
            default_bucket: None,
            verbose: true,
            num_prefill_processes: DEFAULT_NUM_PREFILL_PROCESSES,
        }
    }
}

impl Config {
    /// Build a configuration from the process environment, falling back to
    /// [`Config::default`] for anything unset.
    ///
    /// Recognized variables:
    /// - `STATIC_CACHE_DIR`
    /// - `STATIC_CACHE_TIMEOUT` (an integer number of seconds; set to
    ///   anything non-numeric, such as `never`, to disable freshness checks
    ///   entirely)
    /// - `STATIC_CACHE_IMMUTABLE_BUCKETS` (`:`-separated)
    /// - `STATIC_CACHE_DEFAULT_BUCKET`
    /// - `STATIC_CACHE_VERBOSE` (`0`/`false` to quiet activity logs)
    /// - `STATIC_CACHE_NUM_PREFILL_PROCESSES`
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let cache_dir = std::env::var("STATIC_CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.cache_dir);

        let timeout = std::env::var("STATIC_CACHE_TIMEOUT")
            .ok()
            .map_or(defaults.timeout, |raw| match raw.parse::<u64>() {
                Ok(0) => Ttl::Always,
                Ok(secs) => Ttl::Seconds(secs),
                Err(_) => Ttl::Never,
            });

        let immutable_buckets = std::env::var("STATIC_CACHE_IMMUTABLE_BUCKETS")
            .map(|raw| raw.split(':').map(str::to_string).filter(|s| !s.is_empty()).collect())
            .unwrap_or(defaults.immutable_buckets);

        let default_bucket =
            std::env::var("STATIC_CACHE_DEFAULT_BUCKET").ok().or(defaults.default_bucket);

        let verbose = std::env::var("STATIC_CACHE_VERBOSE")
            .map(|raw| !matches!(raw.as_str(), "0" | "false" | "False" | "FALSE"))
            .unwrap_or(defaults.verbose);

        let num_prefill_processes = std::env::var("STATIC_CACHE_NUM_PREFILL_PROCESSES")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(defaults.num_prefill_processes);

        Self {
            cache_dir,
            timeout,
            immutable_buckets,
            default_bucket,
            verbose,
            num_prefill_processes,
        }
    }

    /// Where the cache stores downloaded files, always trailing-slash
    /// normalized away (callers `join` onto it directly).
    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    #[must_use]
    pub fn timeout(&self) -> Ttl {
        self.timeout
    }

    #[must_use]
    pub fn immutable_buckets(&self) -> &[String] {
        &self.immutable_buckets
    }

    #[must_use]
    pub fn is_immutable_bucket(&self, bucket: &str) -> bool {
        self.immutable_buckets.iter().any(|b| b == bucket)
    }

    #[must_use]
    pub fn default_bucket(&self) -> Option<&str> {
        self.default_bucket.as_deref()
    }

    #[must_use]
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    #[must_use]
    pub fn num_prefill_processes(&self) -> usize {
        self.num_prefill_processes
    }

    /// Override the cache directory. Used by tests and by the CLI's
    /// `--cache-dir` flag.
    #[must_use]
    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Ttl) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_default_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.default_bucket = Some(bucket.into());
        self
    }

    #[must_use]
    pub fn with_immutable_buckets(mut self, buckets: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.immutable_buckets = buckets.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.timeout(), Ttl::Seconds(DEFAULT_TIMEOUT_SECS));
        assert!(config.immutable_buckets().is_empty());
        assert!(config.verbose());
        assert_eq!(config.num_prefill_processes(), DEFAULT_NUM_PREFILL_PROCESSES);
    }

    #[test]
    fn builder_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default()
            .with_cache_dir(dir.path())
            .with_timeout(Ttl::Never)
            .with_default_bucket("models");
        assert_eq!(config.cache_dir(), dir.path());
        assert_eq!(config.timeout(), Ttl::Never);
        assert_eq!(config.default_bucket(), Some("models"));
    }

    /// `STATIC_CACHE_TIMEOUT=0` means "always revalidate," not "never
    /// revalidate" — this is the one behavior the `Ttl` enum exists to get
    /// right, so it needs a test against `from_env` itself, not just against
    /// `Ttl` in isolation.
    #[test]
    fn env_timeout_of_zero_means_always_revalidate() {
        let previous = std::env::var("STATIC_CACHE_TIMEOUT").ok();
        std::env::set_var("STATIC_CACHE_TIMEOUT", "0");

        let config = Config::from_env();

        match previous {
            Some(value) => std::env::set_var("STATIC_CACHE_TIMEOUT", value),
            None => std::env::remove_var("STATIC_CACHE_TIMEOUT"),
        }

        assert_eq!(config.timeout(), Ttl::Always);
    }

    #[test]
    fn env_timeout_unset_falls_back_to_the_default() {
        let previous = std::env::var("STATIC_CACHE_TIMEOUT").ok();
        std::env::remove_var("STATIC_CACHE_TIMEOUT");

        let config = Config::from_env();

        if let Some(value) = previous {
            std::env::set_var("STATIC_CACHE_TIMEOUT", value);
        }

        assert_eq!(config.timeout(), Ttl::Seconds(DEFAULT_TIMEOUT_SECS));
    }
}
