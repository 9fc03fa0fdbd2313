use crate::{
    s3::{
        S3,
        actions::{Action, clean_path, response_header},
        checksum::Checksum,
        request,
    },
    stream::{error::TransportError, options::ServerSideEncryption},
};
use bytes::Bytes;
use reqwest::Method;
use std::collections::BTreeMap;

#[derive(Debug)]
pub struct UploadPart<'a> {
    key: &'a str,
    upload_id: &'a str,
    part_number: u16,
    checksum: Option<&'a Checksum>,
    encryption: Option<&'a ServerSideEncryption>,
}

impl<'a> UploadPart<'a> {
    #[must_use]
    pub const fn new(key: &'a str, upload_id: &'a str, part_number: u16) -> Self {
        Self {
            key,
            upload_id,
            part_number,
            checksum: None,
            encryption: None,
        }
    }

    #[must_use]
    pub const fn with_checksum(mut self, checksum: Option<&'a Checksum>) -> Self {
        self.checksum = checksum;
        self
    }

    #[must_use]
    pub const fn with_encryption(mut self, encryption: Option<&'a ServerSideEncryption>) -> Self {
        self.encryption = encryption;
        self
    }

    /// Upload the part, returns its `ETag`.
    ///
    /// # Errors
    ///
    /// Will return `Err` if can not make the request or the response has no
    /// `ETag`
    pub async fn request(&self, s3: &S3, bucket: &str, body: Bytes) -> Result<String, TransportError> {
        let response = request::request(s3, bucket, self, body).await?;

        response_header(&response, "ETag")
            .ok_or_else(|| TransportError::new("InvalidResponse", "missing ETag"))
    }
}

impl Action for UploadPart<'_> {
    fn http_method(&self) -> Method {
        Method::PUT
    }

    fn headers(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();

        if let Some(checksum) = self.checksum {
            map.insert(
                checksum.algorithm.as_amz().to_string(),
                checksum.checksum.clone(),
            );
        }

        if let Some(sse) = self.encryption {
            for (k, v) in sse.part_headers() {
                map.insert(k.to_string(), v);
            }
        }

        map
    }

    fn query_pairs(&self) -> BTreeMap<&str, String> {
        let mut map = BTreeMap::new();
        map.insert("partNumber", self.part_number.to_string());
        map.insert("uploadId", self.upload_id.to_string());
        map
    }

    fn path(&self) -> Vec<&str> {
        clean_path(self.key)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::s3::checksum::ChecksumAlgorithm;
    use secrecy::SecretString;

    #[test]
    fn test_query_pairs() {
        let action = UploadPart::new("key", "upload-id", 7);
        let pairs = action.query_pairs();
        assert_eq!(pairs.get("partNumber").unwrap(), "7");
        assert_eq!(pairs.get("uploadId").unwrap(), "upload-id");
        assert_eq!(Method::PUT, action.http_method());
    }

    #[test]
    fn test_headers() {
        let action = UploadPart::new("key", "upload-id", 1);
        assert!(action.headers().is_empty());

        let md5 = Checksum::digest(ChecksumAlgorithm::Md5, b"hello");
        let action = UploadPart::new("key", "upload-id", 1).with_checksum(Some(&md5));
        assert_eq!(
            action.headers().get("content-md5").unwrap(),
            "XUFAKrxLKna5cZ2REBfFkg=="
        );

        let crc = Checksum::digest(ChecksumAlgorithm::Crc32c, b"hello");
        let action = UploadPart::new("key", "upload-id", 1).with_checksum(Some(&crc));
        assert!(action.headers().contains_key("x-amz-checksum-crc32c"));
    }

    #[test]
    fn test_headers_encryption() {
        let sse = ServerSideEncryption::S3;
        let action = UploadPart::new("key", "upload-id", 1).with_encryption(Some(&sse));
        assert!(action.headers().is_empty());

        let sse = ServerSideEncryption::Customer {
            key: SecretString::from("0123456789abcdef0123456789abcdef"),
        };
        let action = UploadPart::new("key", "upload-id", 1).with_encryption(Some(&sse));
        let headers = action.headers();
        assert_eq!(
            headers
                .get("x-amz-server-side-encryption-customer-algorithm")
                .unwrap(),
            "AES256"
        );
        assert!(headers.contains_key("x-amz-server-side-encryption-customer-key"));
        assert!(headers.contains_key("x-amz-server-side-encryption-customer-key-md5"));
    }
}
