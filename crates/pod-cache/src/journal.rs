//! A best-effort log of assets `get` could not retrieve.
//!
//! When a download fails because the remote store is unreachable or
//! credentials are missing, we still want the caller's original error to
//! propagate — but it's useful to leave behind a list of exactly which
//! assets were missing, so a user debugging "why didn't this build" doesn't
//! have to reconstruct it from scattered log lines. Writing that list is
//! itself allowed to fail (e.g. a read-only cache directory); if it does, we
//! log and move on rather than replacing the real error.

use std::path::{Path, PathBuf};

const JOURNAL_FILE_NAME: &str = "missing_assets.yaml";

#[must_use]
pub fn journal_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join(JOURNAL_FILE_NAME)
}

/// Append `remote_uri` to the journal, deduplicated and sorted. Never
/// returns an error; failures are logged and swallowed.
pub fn record_missing(cache_dir: &Path, remote_uri: &str) {
    if let Err(error) = try_record_missing(cache_dir, remote_uri) {
        tracing::warn!(%error, path = %journal_path(cache_dir).display(), "failed to update missing asset journal");
    }
}

fn try_record_missing(cache_dir: &Path, remote_uri: &str) -> std::io::Result<()> {
    let path = journal_path(cache_dir);

    let mut assets: Vec<String> = match fs_err::read(&path) {
        Ok(bytes) => serde_yaml::from_slice(&bytes).unwrap_or_default(),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(error) => return Err(error),
    };

    assets.push(remote_uri.to_string());
    assets.sort_unstable();
    assets.dedup();

    let serialized = serde_yaml::to_string(&assets)
        .map_err(|error| std::io::Error::new(std::io::ErrorKind::InvalidData, error))?;
    pod_fs::persist_atomic(&path, serialized.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_are_sorted_and_deduped() {
        let dir = tempfile::tempdir().unwrap();
        record_missing(dir.path(), "s3://bucket/b.bin");
        record_missing(dir.path(), "s3://bucket/a.bin");
        record_missing(dir.path(), "s3://bucket/b.bin");

        let contents = fs_err::read_to_string(journal_path(dir.path())).unwrap();
        let assets: Vec<String> = serde_yaml::from_str(&contents).unwrap();
        assert_eq!(assets, vec!["s3://bucket/a.bin", "s3://bucket/b.bin"]);
    }
}
