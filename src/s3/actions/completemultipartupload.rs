//! Amazon S3 multipart upload limits
//! Maximum object size 5 TB
//! Maximum number of parts per upload  10,000
//! <https://docs.aws.amazon.com/AmazonS3/latest/dev/qfacts.html>

use crate::{
    s3::{
        S3,
        actions::{Action, clean_path, parse_error, response_header},
        checksum::ChecksumAlgorithm,
        request,
        responses::CompleteMultipartUploadResult,
    },
    stream::{error::TransportError, manifest::CompletedManifest, part::CompletedPart},
};
use bytes::Bytes;
use quick_xml::{de::from_str, se::to_string};
use reqwest::Method;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug)]
pub struct CompleteMultipartUpload<'a> {
    key: &'a str,
    upload_id: &'a str,
    manifest: &'a CompletedManifest,
}

#[derive(Serialize)]
#[serde(rename = "CompleteMultipartUpload")]
struct Body<'a> {
    #[serde(rename = "Part")]
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    #[serde(rename = "PartNumber")]
    number: u16,
    #[serde(rename = "ETag")]
    etag: &'a str,
    #[serde(rename = "ChecksumCRC32", skip_serializing_if = "Option::is_none")]
    crc32: Option<&'a str>,
    #[serde(rename = "ChecksumCRC32C", skip_serializing_if = "Option::is_none")]
    crc32c: Option<&'a str>,
    #[serde(rename = "ChecksumSHA1", skip_serializing_if = "Option::is_none")]
    sha1: Option<&'a str>,
    #[serde(rename = "ChecksumSHA256", skip_serializing_if = "Option::is_none")]
    sha256: Option<&'a str>,
}

impl<'a> From<&'a CompletedPart> for Part<'a> {
    fn from(part: &'a CompletedPart) -> Self {
        let mut rs = Self {
            number: part.number,
            etag: &part.etag,
            crc32: None,
            crc32c: None,
            sha1: None,
            sha256: None,
        };

        if let Some(checksum) = &part.checksum {
            let value = Some(checksum.checksum.as_str());
            match checksum.algorithm {
                ChecksumAlgorithm::Crc32 => rs.crc32 = value,
                ChecksumAlgorithm::Crc32c => rs.crc32c = value,
                ChecksumAlgorithm::Sha1 => rs.sha1 = value,
                ChecksumAlgorithm::Sha256 => rs.sha256 = value,
                ChecksumAlgorithm::Md5 => {}
            }
        }

        rs
    }
}

impl<'a> CompleteMultipartUpload<'a> {
    #[must_use]
    pub const fn new(key: &'a str, upload_id: &'a str, manifest: &'a CompletedManifest) -> Self {
        Self {
            key,
            upload_id,
            manifest,
        }
    }

    /// XML body listing every part in ascending order
    ///
    /// # Errors
    ///
    /// Will return `Err` if the body can not be serialized
    pub fn body(&self) -> Result<String, TransportError> {
        let body = Body {
            parts: self.manifest.parts().iter().map(Part::from).collect(),
        };

        to_string(&body).map_err(|e| TransportError::new("InvalidRequest", &e.to_string()))
    }

    /// Returns the result and the `x-amz-version-id` header.
    ///
    /// # Errors
    ///
    /// Will return `Err` if can not make the request or the store reports an
    /// error
    pub async fn request(
        &self,
        s3: &S3,
        bucket: &str,
    ) -> Result<(CompleteMultipartUploadResult, Option<String>), TransportError> {
        let body = self.body()?;

        let response = request::request(s3, bucket, self, Bytes::from(body)).await?;

        let version_id = response_header(&response, "x-amz-version-id");

        let body = response
            .text()
            .await
            .map_err(|e| TransportError::new("RequestError", &e.to_string()))?;

        // the store may answer 200 OK with an error body
        match from_str::<CompleteMultipartUploadResult>(&body) {
            Ok(rs) => Ok((rs, version_id)),
            Err(e) => Err(parse_error(&body)
                .unwrap_or_else(|| TransportError::new("InvalidResponse", &e.to_string()))),
        }
    }
}

impl Action for CompleteMultipartUpload<'_> {
    fn http_method(&self) -> Method {
        Method::POST
    }

    fn headers(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    fn query_pairs(&self) -> BTreeMap<&str, String> {
        let mut map = BTreeMap::new();
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
    use crate::s3::checksum::Checksum;

    #[test]
    fn test_body() {
        let manifest = CompletedManifest::from_parts(vec![
            CompletedPart::new(1, "etag-1"),
            CompletedPart::new(2, "etag-2"),
        ])
        .unwrap();
        let action = CompleteMultipartUpload::new("key", "upload-id", &manifest);
        assert_eq!(
            action.body().unwrap(),
            "<CompleteMultipartUpload>\
             <Part><PartNumber>1</PartNumber><ETag>etag-1</ETag></Part>\
             <Part><PartNumber>2</PartNumber><ETag>etag-2</ETag></Part>\
             </CompleteMultipartUpload>"
        );
    }

    #[test]
    fn test_body_with_checksum() {
        let mut part = CompletedPart::new(1, "etag-1");
        part.checksum = Some(Checksum::digest(ChecksumAlgorithm::Crc32c, b"hello world"));
        let manifest = CompletedManifest::from_parts(vec![part]).unwrap();
        let action = CompleteMultipartUpload::new("key", "upload-id", &manifest);
        assert_eq!(
            action.body().unwrap(),
            "<CompleteMultipartUpload>\
             <Part><PartNumber>1</PartNumber><ETag>etag-1</ETag>\
             <ChecksumCRC32C>yZRlqg==</ChecksumCRC32C></Part>\
             </CompleteMultipartUpload>"
        );
    }

    #[test]
    fn test_action() {
        let manifest = CompletedManifest::from_parts(vec![CompletedPart::new(1, "e")]).unwrap();
        let action = CompleteMultipartUpload::new("key", "upload-id", &manifest);
        assert_eq!(Method::POST, action.http_method());
        assert_eq!(action.query_pairs().get("uploadId").unwrap(), "upload-id");
        assert_eq!(vec!["key"], action.path());
    }
}
