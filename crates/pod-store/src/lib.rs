//! A small, synchronous port onto a remote object store.
//!
//! Everything above this crate (the asset cache, the versioned cache, the
//! pack and prefill tools) only ever talks to the [`ObjectStore`] trait. That
//! keeps the higher-level cache logic testable against [`memory::InMemoryStore`]
//! and swappable onto any backend that can satisfy the trait, while the real
//! traffic goes over S3 via [`s3::S3Store`].
//!
//! The cache's public contract is synchronous (it is meant to be called from
//! plain threads, including from a `rayon` pool in `pod-prefill`), but the
//! `object_store` crate this is built on is async-only. [`s3::S3Store`] bridges
//! the two with a dedicated Tokio runtime and `block_on`.

pub mod etag;
pub mod memory;
pub mod reachability;
pub mod s3;
mod uri;

use std::io;
use thiserror::Error;

pub use crate::reachability::{InternetUnreachableError, Reachability};
pub use crate::uri::ObjectUri;

/// Failures surfaced by an [`ObjectStore`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found on the remote store")]
    NotFound(String),

    #[error("no AWS credentials are configured")]
    CredentialsMissing,

    #[error("the remote store could not be reached")]
    Unreachable(#[from] InternetUnreachableError),

    #[error("invalid object uri: {0}")]
    InvalidUri(String),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Backend(Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// A remote, bucket-and-key addressed blob store.
///
/// Every operation takes `bucket`/`key` rather than a pre-joined URI, leaving
/// URI parsing to callers via [`ObjectUri::parse`] — the same split the
/// original `s3.path` module made between `isremote`/`parse` and the
/// operations themselves.
pub trait ObjectStore: Send + Sync {
    /// Download the object at `bucket`/`key` to `local_path`, creating parent
    /// directories as needed. Overwrites `local_path` atomically on success.
    fn copy_to_local(&self, bucket: &str, key: &str, local_path: &std::path::Path) -> Result<()>;

    /// Upload the file at `local_path` to `bucket`/`key`, overwriting
    /// whatever was there.
    fn copy_from_local(&self, local_path: &std::path::Path, bucket: &str, key: &str) -> Result<()>;

    /// Whether an object exists at `bucket`/`key`.
    fn exists(&self, bucket: &str, key: &str) -> Result<bool>;

    /// The remote ETag of the object at `bucket`/`key`, normalized so it can
    /// be compared directly against [`etag::local_etag`] of a downloaded
    /// copy. Returns [`StoreError::NotFound`] if the object does not exist.
    fn etag(&self, bucket: &str, key: &str) -> Result<String>;

    /// List every key under `bucket` with the given prefix, without the
    /// leading slash `CacheFile` paths otherwise carry.
    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>>;

    /// Remove the object at `bucket`/`key`. Not an error if it is already
    /// absent.
    fn remove(&self, bucket: &str, key: &str) -> Result<()>;
}
