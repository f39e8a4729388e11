//! The real remote backend, built on the `object_store` crate's S3 client.
//!
//! `object_store`'s [`object_store::ObjectStore`] trait is async; the cache
//! above us is deliberately synchronous so it can be called from plain
//! threads (including from inside a `rayon` pool during prefill). We bridge
//! the two with a private Tokio runtime and `block_on`, the same trick
//! `cached-path`-style crates use when wrapping an async HTTP client behind a
//! blocking interface.

use std::path::Path;
use std::sync::Arc;

use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore as _;
use tokio::runtime::Runtime;

use crate::{ObjectStore, Result, StoreError};

/// Connection parameters for a single S3-compatible endpoint. One `S3Store`
/// talks to one account/region; the bucket is passed per-call so a single
/// store can serve every bucket `pod` is configured to see.
#[derive(Debug, Clone, Default)]
pub struct S3Config {
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub allow_http: bool,
}

pub struct S3Store {
    runtime: Runtime,
    config: S3Config,
}

impl S3Store {
    /// Build a store from explicit configuration, or fall back to the
    /// `object_store` crate's standard `AWS_*` environment variable
    /// discovery when a field is left unset.
    pub fn new(config: S3Config) -> Result<Self> {
        let runtime = Runtime::new().map_err(StoreError::Io)?;
        Ok(Self { runtime, config })
    }

    fn client(&self, bucket: &str) -> Result<Arc<dyn object_store::ObjectStore>> {
        let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);
        if let Some(region) = &self.config.region {
            builder = builder.with_region(region);
        }
        if let Some(endpoint) = &self.config.endpoint {
            builder = builder.with_endpoint(endpoint).with_allow_http(self.config.allow_http);
        }
        if let Some(key) = &self.config.access_key_id {
            builder = builder.with_access_key_id(key);
        }
        if let Some(secret) = &self.config.secret_access_key {
            builder = builder.with_secret_access_key(secret);
        }
        let store = builder
            .build()
            .map_err(|e| StoreError::Backend(Box::new(e)))?;
        Ok(Arc::new(store))
    }

    fn map_get_err(err: object_store::Error, bucket: &str, key: &str) -> StoreError {
        match err {
            object_store::Error::NotFound { .. } => {
                StoreError::NotFound(format!("s3://{bucket}/{key}"))
            }
            other => StoreError::Backend(Box::new(other)),
        }
    }
}

impl ObjectStore for S3Store {
    fn copy_to_local(&self, bucket: &str, key: &str, local_path: &Path) -> Result<()> {
        let client = self.client(bucket)?;
        let path = ObjectPath::from(key);
        let bytes = self.runtime.block_on(async {
            client
                .get(&path)
                .await
                .map_err(|e| Self::map_get_err(e, bucket, key))?
                .bytes()
                .await
                .map_err(|e| StoreError::Backend(Box::new(e)))
        })?;
        pod_fs::persist_atomic(local_path, &bytes)?;
        Ok(())
    }

    fn copy_from_local(&self, local_path: &Path, bucket: &str, key: &str) -> Result<()> {
        let client = self.client(bucket)?;
        let path = ObjectPath::from(key);
        let bytes = std::fs::read(local_path).map_err(StoreError::Io)?;
        self.runtime.block_on(async {
            client
                .put(&path, bytes.into())
                .await
                .map(|_| ())
                .map_err(|e| StoreError::Backend(Box::new(e)))
        })
    }

    fn exists(&self, bucket: &str, key: &str) -> Result<bool> {
        let client = self.client(bucket)?;
        let path = ObjectPath::from(key);
        self.runtime.block_on(async {
            match client.head(&path).await {
                Ok(_) => Ok(true),
                Err(object_store::Error::NotFound { .. }) => Ok(false),
                Err(other) => Err(StoreError::Backend(Box::new(other))),
            }
        })
    }

    fn etag(&self, bucket: &str, key: &str) -> Result<String> {
        let client = self.client(bucket)?;
        let path = ObjectPath::from(key);
        let meta = self.runtime.block_on(async {
            client
                .head(&path)
                .await
                .map_err(|e| Self::map_get_err(e, bucket, key))
        })?;
        meta.e_tag
            .map(|tag| tag.trim_matches('"').to_string())
            .ok_or_else(|| StoreError::Backend("remote object has no ETag".into()))
    }

    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>> {
        let client = self.client(bucket)?;
        let prefix_path = ObjectPath::from(prefix);
        self.runtime.block_on(async {
            let mut stream = client.list(Some(&prefix_path));
            let mut keys = Vec::new();
            while let Some(meta) = stream
                .try_next()
                .await
                .map_err(|e| StoreError::Backend(Box::new(e)))?
            {
                keys.push(meta.location.to_string());
            }
            Ok(keys)
        })
    }

    fn remove(&self, bucket: &str, key: &str) -> Result<()> {
        let client = self.client(bucket)?;
        let path = ObjectPath::from(key);
        self.runtime.block_on(async {
            match client.delete(&path).await {
                Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
                Err(other) => Err(StoreError::Backend(Box::new(other))),
            }
        })
    }
}
