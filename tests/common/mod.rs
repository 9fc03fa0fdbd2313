//! In-memory object store used by the integration tests
//!
//! `MockTransport` records every call the upload engine makes and assembles
//! the uploaded object from the committed manifest.

#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::missing_panics_doc
)]

use async_trait::async_trait;
use bytes::Bytes;
use s3up::{
    s3::checksum::Checksum,
    stream::{
        CompletedManifest, ObjectTransport, PartTransport, PartUpload, PutOptions,
        SessionTransport, TransportError, UploadInfo,
    },
};
use std::{
    collections::BTreeMap,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

pub const MIB: u64 = 1024 * 1024;

#[derive(Default)]
pub struct MockTransport {
    /// part number -> body, checksum
    pub parts: Mutex<BTreeMap<u16, (Vec<u8>, Option<Checksum>)>>,
    /// part numbers in upload order
    pub order: Mutex<Vec<u16>>,
    /// committed manifests
    pub completed: Mutex<Vec<CompletedManifest>>,
    pub puts: Mutex<Vec<Bytes>>,
    pub initiated: AtomicUsize,
    pub aborted: AtomicUsize,
    /// this part number always fails
    pub fail_part: Option<u16>,
    /// initiate answers AccessDenied
    pub deny_multipart: bool,
    /// later parts finish first
    pub reverse_delay: bool,
}

impl MockTransport {
    pub fn initiated(&self) -> usize {
        self.initiated.load(Ordering::SeqCst)
    }

    pub fn aborted(&self) -> usize {
        self.aborted.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.completed.lock().unwrap().len()
    }

    /// Object assembled from the last committed manifest
    pub fn object(&self) -> Vec<u8> {
        let completed = self.completed.lock().unwrap();
        let manifest = completed.last().expect("no completed upload");
        let parts = self.parts.lock().unwrap();

        manifest
            .parts()
            .iter()
            .flat_map(|part| parts.get(&part.number).unwrap().0.clone())
            .collect()
    }

    pub fn part_sizes(&self) -> Vec<usize> {
        self.parts
            .lock()
            .unwrap()
            .values()
            .map(|(body, _)| body.len())
            .collect()
    }
}

#[async_trait]
impl SessionTransport for MockTransport {
    async fn initiate(
        &self,
        _bucket: &str,
        _key: &str,
        _options: &PutOptions,
    ) -> Result<String, TransportError> {
        if self.deny_multipart {
            return Err(TransportError::new("AccessDenied", "Access Denied").with_status(403));
        }

        let n = self.initiated.fetch_add(1, Ordering::SeqCst);

        Ok(format!("upload-{n}"))
    }

    async fn abort(
        &self,
        _bucket: &str,
        _key: &str,
        _session_id: &str,
    ) -> Result<(), TransportError> {
        self.aborted.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn complete(
        &self,
        bucket: &str,
        key: &str,
        _session_id: &str,
        manifest: &CompletedManifest,
    ) -> Result<UploadInfo, TransportError> {
        self.completed.lock().unwrap().push(manifest.clone());

        Ok(UploadInfo {
            bucket: bucket.to_string(),
            key: key.to_string(),
            etag: format!("\"multipart-{}\"", manifest.len()),
            ..Default::default()
        })
    }
}

#[async_trait]
impl PartTransport for MockTransport {
    async fn upload_part(&self, part: PartUpload<'_>) -> Result<String, TransportError> {
        if self.reverse_delay {
            let delay = 10_u64.saturating_sub(u64::from(part.part_number)) * 20;
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if self.fail_part == Some(part.part_number) {
            return Err(TransportError::new("InternalError", "part failed").with_status(500));
        }

        self.order.lock().unwrap().push(part.part_number);
        self.parts.lock().unwrap().insert(
            part.part_number,
            (part.body.to_vec(), part.checksum.cloned()),
        );

        Ok(format!("\"etag-{}\"", part.part_number))
    }
}

#[async_trait]
impl ObjectTransport for MockTransport {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        _checksum: Option<&Checksum>,
        _options: &PutOptions,
    ) -> Result<UploadInfo, TransportError> {
        let size = body.len() as u64;
        self.puts.lock().unwrap().push(body);

        Ok(UploadInfo {
            bucket: bucket.to_string(),
            key: key.to_string(),
            etag: "\"single\"".to_string(),
            size,
            ..Default::default()
        })
    }
}

#[allow(clippy::cast_possible_truncation)]
pub fn data(size: u64) -> Vec<u8> {
    (0..size).map(|i| (i % 251) as u8).collect()
}
