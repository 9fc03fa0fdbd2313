//! Network operations the upload engine depends on.
//!
//! `s3::S3` implements them over HTTP, tests use in-memory recorders.

use crate::{
    s3::checksum::Checksum,
    stream::{
        error::TransportError, manifest::CompletedManifest, options::PutOptions,
        options::ServerSideEncryption,
    },
};
use async_trait::async_trait;
use bytes::Bytes;

/// Final object information returned by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadInfo {
    pub bucket: String,
    pub key: String,
    pub etag: String,
    pub version_id: Option<String>,
    pub size: u64,
}

/// One part write.
///
/// The body is owned so the HTTP layer sends it without another copy.
#[derive(Debug, Clone)]
pub struct PartUpload<'a> {
    pub bucket: &'a str,
    pub key: &'a str,
    pub session_id: &'a str,
    pub part_number: u16,
    pub body: Bytes,
    pub checksum: Option<&'a Checksum>,
    pub encryption: Option<&'a ServerSideEncryption>,
}

#[async_trait]
pub trait SessionTransport: Send + Sync {
    /// Start a multipart upload, returns the upload id.
    async fn initiate(
        &self,
        bucket: &str,
        key: &str,
        options: &PutOptions,
    ) -> Result<String, TransportError>;

    async fn abort(&self, bucket: &str, key: &str, session_id: &str)
    -> Result<(), TransportError>;

    async fn complete(
        &self,
        bucket: &str,
        key: &str,
        session_id: &str,
        manifest: &CompletedManifest,
    ) -> Result<UploadInfo, TransportError>;
}

#[async_trait]
pub trait PartTransport: Send + Sync {
    /// Write one part, returns its `ETag`.
    async fn upload_part(&self, part: PartUpload<'_>) -> Result<String, TransportError>;
}

#[async_trait]
pub trait ObjectTransport: Send + Sync {
    /// Write a whole object with one request.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        checksum: Option<&Checksum>,
        options: &PutOptions,
    ) -> Result<UploadInfo, TransportError>;
}

pub trait Transport: SessionTransport + PartTransport + ObjectTransport {}

impl<T> Transport for T where T: SessionTransport + PartTransport + ObjectTransport {}
