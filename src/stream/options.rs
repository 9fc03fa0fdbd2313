use crate::s3::{checksum::ChecksumAlgorithm, limits::DEFAULT_WORKERS, tools};
use base64ct::{Base64, Encoding};
use secrecy::{ExposeSecret, SecretString};
use std::collections::BTreeMap;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

/// Server-side encryption, passed through to the store untouched.
/// <https://docs.aws.amazon.com/AmazonS3/latest/userguide/serv-side-encryption.html>
#[derive(Debug, Clone)]
pub enum ServerSideEncryption {
    /// SSE-S3, keys managed by the store
    S3,
    /// SSE-KMS, optionally with a specific key
    Kms { key_id: Option<String> },
    /// SSE-C, the 256-bit key travels with every request carrying data
    Customer { key: SecretString },
}

impl ServerSideEncryption {
    /// Headers for the initiate and single put requests.
    #[must_use]
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::S3 => vec![("x-amz-server-side-encryption", "AES256".to_string())],
            Self::Kms { key_id } => {
                let mut headers = vec![("x-amz-server-side-encryption", "aws:kms".to_string())];
                if let Some(key_id) = key_id {
                    headers.push((
                        "x-amz-server-side-encryption-aws-kms-key-id",
                        key_id.clone(),
                    ));
                }
                headers
            }
            Self::Customer { .. } => self.part_headers(),
        }
    }

    /// Headers for every uploaded part, only SSE-C needs them.
    #[must_use]
    pub fn part_headers(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::Customer { key } => {
                let key = key.expose_secret().as_bytes();
                vec![
                    (
                        "x-amz-server-side-encryption-customer-algorithm",
                        "AES256".to_string(),
                    ),
                    (
                        "x-amz-server-side-encryption-customer-key",
                        Base64::encode_string(key),
                    ),
                    (
                        "x-amz-server-side-encryption-customer-key-md5",
                        tools::base64_md5(key),
                    ),
                ]
            }
            _ => Vec::new(),
        }
    }
}

/// Immutable options of one upload.
#[derive(Debug, Clone)]
pub struct PutOptions {
    /// Part size hint, `None` picks one from the object size
    pub part_size: Option<u64>,
    /// Number of parts uploaded concurrently by the parallel strategy
    pub workers: usize,
    /// Checksum every part, forces the sequential strategy
    pub checksum: Option<ChecksumAlgorithm>,
    pub encryption: Option<ServerSideEncryption>,
    pub acl: Option<String>,
    pub content_type: Option<String>,
    /// User metadata, sent as `x-amz-meta-*`
    pub meta: BTreeMap<String, String>,
    /// Receives the size of every uploaded part
    pub progress: Option<UnboundedSender<u64>>,
    pub cancel: CancellationToken,
}

impl Default for PutOptions {
    fn default() -> Self {
        Self {
            part_size: None,
            workers: DEFAULT_WORKERS,
            checksum: None,
            encryption: None,
            acl: None,
            content_type: None,
            meta: BTreeMap::new(),
            progress: None,
            cancel: CancellationToken::new(),
        }
    }
}

impl PutOptions {
    /// Headers describing the object, sent when the object is created.
    #[must_use]
    pub fn object_headers(&self) -> BTreeMap<String, String> {
        let mut headers: BTreeMap<String, String> = BTreeMap::new();

        if let Some(acl) = &self.acl {
            headers.insert("x-amz-acl".to_string(), acl.clone());
        }

        if let Some(content_type) = &self.content_type {
            headers.insert("content-type".to_string(), content_type.clone());
        }

        for (k, v) in &self.meta {
            let k = k.to_lowercase();
            if k.starts_with("x-amz-meta-") {
                headers.insert(k, v.clone());
            } else {
                headers.insert(format!("x-amz-meta-{k}"), v.clone());
            }
        }

        if let Some(sse) = &self.encryption {
            for (k, v) in sse.headers() {
                headers.insert(k.to_string(), v);
            }
        }

        headers
    }

    /// Never blocks, a dropped receiver is ignored.
    pub fn report_progress(&self, bytes: u64) {
        if let Some(progress) = &self.progress {
            let _ = progress.send(bytes);
        }
    }

    pub(crate) fn workers(&self) -> usize {
        self.workers.max(1)
    }
}
