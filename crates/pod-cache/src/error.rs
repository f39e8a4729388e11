use thiserror::Error;

/// Failures surfaced by [`crate::AssetCache`].
#[derive(Debug, Error)]
pub enum CacheError {
    /// An `s3://...` path was given alongside an explicit `bucket` argument.
    #[error("when providing an s3:// path, do not also pass a bucket")]
    AmbiguousBucket,

    /// A bare key was given with no bucket, and no default bucket is
    /// configured.
    #[error("no bucket given, and no default bucket is configured")]
    NoBucket,

    /// An asset could not be retrieved and there is no usable local copy to
    /// fall back on.
    #[error("{message}")]
    Unavailable {
        message: String,
        remote: String,
        #[source]
        source: pod_store::StoreError,
    },

    /// The remote store was reachable and answered, but the object itself
    /// doesn't exist. Distinct from [`Self::Unavailable`]: this is not
    /// recorded in the missing-asset journal, since the journal exists to
    /// track assets we couldn't even check for, not ones we confirmed are
    /// absent.
    #[error("{0} not found on the remote store")]
    KeyNotFound(String),

    #[error(transparent)]
    Store(pod_store::StoreError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<pod_store::StoreError> for CacheError {
    fn from(err: pod_store::StoreError) -> Self {
        match err {
            pod_store::StoreError::NotFound(remote) => Self::KeyNotFound(remote),
            other => Self::Store(other),
        }
    }
}

impl CacheError {
    /// The `s3://bucket/key` this error concerns, if it carries one.
    #[must_use]
    pub fn remote(&self) -> Option<&str> {
        match self {
            Self::Unavailable { remote, .. } => Some(remote),
            Self::KeyNotFound(remote) => Some(remote),
            _ => None,
        }
    }
}
