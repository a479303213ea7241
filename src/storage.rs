//! Blob storage for uploads and converted files.
//!
//! The handler talks to two logical buckets, INPUT and OUTPUT, through the
//! [`BlobStore`] trait. Each store is bound to one bucket.
//!
//! * [`ObjectBlobStore`] wraps any `object_store` backend that can also sign
//!   URLs (in practice `AmazonS3`); presigned GETs come from its `Signer`.
//! * [`MemoryBlobStore`] keeps objects in `object_store::memory::InMemory`
//!   and hands out `memory://` URLs, for local runs and tests.

use crate::error::StorageError;
use async_trait::async_trait;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::memory::InMemory;
use object_store::path::Path as StoragePath;
use object_store::signer::Signer;
use object_store::{Attribute, Attributes, ObjectStore, PutOptions};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Storage result type
pub type Result<T> = std::result::Result<T, StorageError>;

/// Metadata returned after upload
#[derive(Debug, Clone)]
pub struct UploadMetadata {
    pub key: String,
    pub etag: Option<String>,
    pub size: usize,
}

/// A single bucket of opaque blobs.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Bucket name, for logs.
    fn bucket(&self) -> &str;

    /// Store `data` under `key`, tagged with `content_type` when given.
    async fn put(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<UploadMetadata>;

    /// Fetch `key` into the local file at `dest`, returning the byte count.
    async fn download(&self, key: &str, dest: &Path) -> Result<usize>;

    /// Issue a GET URL for `key` that stays valid for `ttl`.
    async fn presign_get(&self, key: &str, ttl: Duration) -> Result<String>;
}

/// Put/get shared by every `object_store` backend.
async fn put_object(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &str,
    data: Vec<u8>,
    content_type: Option<&str>,
) -> Result<UploadMetadata> {
    let path = StoragePath::from(key);
    let size = data.len();

    let mut attributes = Attributes::new();
    if let Some(ct) = content_type {
        attributes.insert(Attribute::ContentType, ct.to_string().into());
    }
    let opts = PutOptions {
        attributes,
        ..Default::default()
    };

    let put_result = store.put_opts(&path, data.into(), opts).await?;

    tracing::info!(bucket, key, size, content_type, "Uploaded to storage");

    Ok(UploadMetadata {
        key: key.to_string(),
        etag: put_result.e_tag,
        size,
    })
}

async fn download_object(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &str,
    dest: &Path,
) -> Result<usize> {
    let path = StoragePath::from(key);
    let bytes = store.get(&path).await?.bytes().await?;

    tokio::fs::write(dest, &bytes)
        .await
        .map_err(|e| StorageError::LocalWrite {
            path: dest.to_path_buf(),
            source: e,
        })?;

    tracing::info!(bucket, key, size = bytes.len(), "Downloaded from storage");
    Ok(bytes.len())
}

/// A bucket on an `object_store` backend that supports URL signing.
#[derive(Debug, Clone)]
pub struct ObjectBlobStore<S> {
    store: Arc<S>,
    bucket: String,
}

impl<S> ObjectBlobStore<S>
where
    S: ObjectStore + Signer,
{
    pub fn new(store: Arc<S>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }
}

impl ObjectBlobStore<AmazonS3> {
    /// Build an S3 store for `bucket`, taking region and credentials from the
    /// standard `AWS_*` environment (the Lambda execution role).
    pub fn s3_from_env(bucket: &str) -> Result<Self> {
        let s3 = AmazonS3Builder::from_env()
            .with_bucket_name(bucket)
            .build()?;
        Ok(Self::new(Arc::new(s3), bucket))
    }
}

#[async_trait]
impl<S> BlobStore for ObjectBlobStore<S>
where
    S: ObjectStore + Signer,
{
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<UploadMetadata> {
        put_object(self.store.as_ref(), &self.bucket, key, data, content_type).await
    }

    async fn download(&self, key: &str, dest: &Path) -> Result<usize> {
        download_object(self.store.as_ref(), &self.bucket, key, dest).await
    }

    async fn presign_get(&self, key: &str, ttl: Duration) -> Result<String> {
        let path = StoragePath::from(key);
        let url = self
            .store
            .signed_url(http::Method::GET, &path, ttl)
            .await?;
        tracing::debug!(bucket = %self.bucket, key, ttl_secs = ttl.as_secs(), "Presigned GET");
        Ok(url.to_string())
    }
}

/// In-process bucket for local runs and tests.
#[derive(Debug, Clone)]
pub struct MemoryBlobStore {
    store: Arc<InMemory>,
    bucket: String,
}

impl MemoryBlobStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            store: Arc::new(InMemory::new()),
            bucket: bucket.into(),
        }
    }

    /// Raw object bytes, if present.
    pub async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = StoragePath::from(key);
        match self.store.get(&path).await {
            Ok(result) => Ok(Some(result.bytes().await?.to_vec())),
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Content type recorded for `key`, if any.
    pub async fn content_type(&self, key: &str) -> Result<Option<String>> {
        let path = StoragePath::from(key);
        let result = self.store.get(&path).await?;
        Ok(result
            .attributes
            .get(&Attribute::ContentType)
            .map(|v| v.to_string()))
    }

    /// Keys currently stored, sorted.
    pub async fn keys(&self) -> Result<Vec<String>> {
        let listed = self.store.list_with_delimiter(None).await?;
        let mut keys: Vec<String> = listed
            .objects
            .into_iter()
            .map(|meta| meta.location.to_string())
            .collect();
        keys.sort();
        Ok(keys)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<UploadMetadata> {
        put_object(self.store.as_ref(), &self.bucket, key, data, content_type).await
    }

    async fn download(&self, key: &str, dest: &Path) -> Result<usize> {
        download_object(self.store.as_ref(), &self.bucket, key, dest).await
    }

    async fn presign_get(&self, key: &str, ttl: Duration) -> Result<String> {
        let path = StoragePath::from(key);
        // Mirror S3: signing does not require the object, but a missing key
        // here is always a bug in the caller.
        self.store.head(&path).await?;
        Ok(format!(
            "memory://{}/{}?expires_in={}",
            self.bucket,
            path,
            ttl.as_secs()
        ))
    }
}
