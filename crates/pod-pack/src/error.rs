use thiserror::Error;

#[derive(Debug, Error)]
pub enum PackError {
    #[error("no files were given to pack")]
    Empty,

    #[error("max_size_mb is {max_size_mb} MB, but {path} alone is {file_size_mb} MB")]
    FileExceedsMaxSize { path: String, file_size_mb: u64, max_size_mb: u64 },

    #[error(transparent)]
    Cache(#[from] pod_cache::CacheError),

    #[error(transparent)]
    Versioned(#[from] pod_versioned::VersionedError),

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
