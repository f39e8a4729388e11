use thiserror::Error;

#[derive(Debug, Error)]
pub enum VersionedError {
    #[error("{0} is not a versioned path")]
    NotVersioned(String),

    #[error("{0} is not cached for version {1}")]
    KeyNotFound(String, String),

    #[error("{0} is already versioned; did you mean update()?")]
    AlreadyVersioned(String),

    #[error("{0} is not a versioned path; did you mean add()?")]
    NotYetAdded(String),

    #[error("no version string found in {0}")]
    NoVersionInPath(String),

    #[error("invalid version {0}, always use versions of the form N.N.N")]
    InvalidVersion(String),

    #[error("invalid version requirement {0}")]
    InvalidVersionSpec(String),

    #[error(
        "version numbers must be strictly increasing; you specified {new} but the latest is {latest}"
    )]
    VersionNotIncreasing { new: String, latest: String },

    #[error("nothing to update {0} to: pass a version, or one of major/minor/patch")]
    NoBumpRequested(String),

    #[error(transparent)]
    Cache(#[from] pod_cache::CacheError),

    #[error(transparent)]
    Store(#[from] pod_store::StoreError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
