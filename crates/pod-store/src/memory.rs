//! An in-process [`ObjectStore`] backed by a `Mutex<HashMap>`, for tests that
//! exercise cache logic without a real S3 endpoint.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use md5::{Digest, Md5};

use crate::{ObjectStore, Result, StoreError};

#[derive(Debug, Default)]
struct Bucket {
    objects: HashMap<String, Vec<u8>>,
}

/// A fake remote store, keyed by bucket name then object key.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object directly, as if it had already been uploaded.
    pub fn put(&self, bucket: &str, key: &str, contents: impl Into<Vec<u8>>) {
        let mut buckets = self.buckets.lock().unwrap();
        buckets
            .entry(bucket.to_string())
            .or_default()
            .objects
            .insert(key.to_string(), contents.into());
    }
}

impl ObjectStore for InMemoryStore {
    fn copy_to_local(&self, bucket: &str, key: &str, local_path: &Path) -> Result<()> {
        let buckets = self.buckets.lock().unwrap();
        let contents = buckets
            .get(bucket)
            .and_then(|b| b.objects.get(key))
            .ok_or_else(|| StoreError::NotFound(format!("s3://{bucket}/{key}")))?;
        pod_fs::persist_atomic(local_path, contents)?;
        Ok(())
    }

    fn copy_from_local(&self, local_path: &Path, bucket: &str, key: &str) -> Result<()> {
        let contents = std::fs::read(local_path)?;
        self.put(bucket, key, contents);
        Ok(())
    }

    fn exists(&self, bucket: &str, key: &str) -> Result<bool> {
        let buckets = self.buckets.lock().unwrap();
        Ok(buckets.get(bucket).is_some_and(|b| b.objects.contains_key(key)))
    }

    fn etag(&self, bucket: &str, key: &str) -> Result<String> {
        let buckets = self.buckets.lock().unwrap();
        let contents = buckets
            .get(bucket)
            .and_then(|b| b.objects.get(key))
            .ok_or_else(|| StoreError::NotFound(format!("s3://{bucket}/{key}")))?;
        let mut hasher = Md5::new();
        hasher.update(contents);
        Ok(hex::encode(hasher.finalize()))
    }

    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>> {
        let buckets = self.buckets.lock().unwrap();
        let Some(b) = buckets.get(bucket) else {
            return Ok(Vec::new());
        };
        let mut keys: Vec<String> = b
            .objects
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    fn remove(&self, bucket: &str, key: &str) -> Result<()> {
        let mut buckets = self.buckets.lock().unwrap();
        if let Some(b) = buckets.get_mut(bucket) {
            b.objects.remove(key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_an_object() {
        let store = InMemoryStore::new();
        store.put("bucket", "key.bin", b"hello".to_vec());
        assert!(store.exists("bucket", "key.bin").unwrap());
        assert!(!store.exists("bucket", "missing.bin").unwrap());

        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("key.bin");
        store.copy_to_local("bucket", "key.bin", &local).unwrap();
        assert_eq!(std::fs::read(&local).unwrap(), b"hello");
    }

    #[test]
    fn missing_object_is_not_found() {
        let store = InMemoryStore::new();
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("key.bin");
        let err = store.copy_to_local("bucket", "key.bin", &local).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn list_filters_by_prefix() {
        let store = InMemoryStore::new();
        store.put("bucket", "models/a.bin", b"a".to_vec());
        store.put("bucket", "models/b.bin", b"b".to_vec());
        store.put("bucket", "textures/c.bin", b"c".to_vec());

        let mut keys = store.list("bucket", "models/").unwrap();
        keys.sort();
        assert_eq!(keys, vec!["models/a.bin", "models/b.bin"]);
    }
}
