use crate::StoreError;

/// A parsed `s3://bucket/key` reference, mirroring what the original
/// `s3.path.parse`/`s3.path.isremote` pair did for baiji.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectUri {
    pub bucket: String,
    /// Always begins with `/`.
    pub path: String,
}

impl ObjectUri {
    pub const SCHEME: &'static str = "s3://";

    /// Whether `path` looks like a remote reference (`s3://...`) rather than
    /// a local filesystem path.
    #[must_use]
    pub fn is_remote(path: &str) -> bool {
        path.starts_with(Self::SCHEME)
    }

    /// Parse `s3://bucket/key/with/slashes` into bucket + path. The path
    /// component always keeps its leading slash, matching `CacheFile.path`.
    pub fn parse(uri: &str) -> Result<Self, StoreError> {
        let rest = uri
            .strip_prefix(Self::SCHEME)
            .ok_or_else(|| StoreError::InvalidUri(uri.to_string()))?;
        let (bucket, path) = rest.split_once('/').unwrap_or((rest, ""));
        if bucket.is_empty() {
            return Err(StoreError::InvalidUri(uri.to_string()));
        }
        Ok(Self {
            bucket: bucket.to_string(),
            path: format!("/{path}"),
        })
    }

    #[must_use]
    pub fn to_uri_string(&self) -> String {
        format!("{}{}{}", Self::SCHEME, self.bucket, self.path)
    }

    /// The path with its leading slash stripped, suitable for joining onto a
    /// local directory or an `object_store` key.
    #[must_use]
    pub fn key(&self) -> &str {
        self.path.trim_start_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bucket_and_path() {
        let uri = ObjectUri::parse("s3://my-bucket/some/nested/key.bin").unwrap();
        assert_eq!(uri.bucket, "my-bucket");
        assert_eq!(uri.path, "/some/nested/key.bin");
        assert_eq!(uri.key(), "some/nested/key.bin");
    }

    #[test]
    fn round_trips_to_uri_string() {
        let uri = ObjectUri::parse("s3://bucket/key").unwrap();
        assert_eq!(uri.to_uri_string(), "s3://bucket/key");
    }

    #[test]
    fn rejects_non_remote_paths() {
        assert!(!ObjectUri::is_remote("/local/path"));
        assert!(ObjectUri::parse("/local/path").is_err());
    }

    #[test]
    fn rejects_empty_bucket() {
        assert!(ObjectUri::parse("s3:///key").is_err());
    }
}
