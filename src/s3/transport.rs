//! Upload engine transport over the S3 HTTP API

use crate::{
    s3::{
        S3,
        actions::{
            AbortMultipartUpload, CompleteMultipartUpload, CreateMultipartUpload, PutObject,
            UploadPart,
        },
        checksum::Checksum,
    },
    stream::{
        error::TransportError,
        manifest::CompletedManifest,
        options::PutOptions,
        transport::{ObjectTransport, PartTransport, PartUpload, SessionTransport, UploadInfo},
    },
};
use async_trait::async_trait;
use bytes::Bytes;

#[async_trait]
impl SessionTransport for S3 {
    async fn initiate(
        &self,
        bucket: &str,
        key: &str,
        options: &PutOptions,
    ) -> Result<String, TransportError> {
        let rs = CreateMultipartUpload::new(key, options)
            .request(self, bucket)
            .await?;

        Ok(rs.upload_id)
    }

    async fn abort(
        &self,
        bucket: &str,
        key: &str,
        session_id: &str,
    ) -> Result<(), TransportError> {
        AbortMultipartUpload::new(key, session_id)
            .request(self, bucket)
            .await
    }

    async fn complete(
        &self,
        bucket: &str,
        key: &str,
        session_id: &str,
        manifest: &CompletedManifest,
    ) -> Result<UploadInfo, TransportError> {
        let (rs, version_id) = CompleteMultipartUpload::new(key, session_id, manifest)
            .request(self, bucket)
            .await?;

        Ok(UploadInfo {
            bucket: rs.bucket,
            key: rs.key,
            etag: rs.e_tag,
            version_id,
            size: 0,
        })
    }
}

#[async_trait]
impl PartTransport for S3 {
    async fn upload_part(&self, part: PartUpload<'_>) -> Result<String, TransportError> {
        UploadPart::new(part.key, part.session_id, part.part_number)
            .with_checksum(part.checksum)
            .with_encryption(part.encryption)
            .request(self, part.bucket, part.body)
            .await
    }
}

#[async_trait]
impl ObjectTransport for S3 {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        checksum: Option<&Checksum>,
        options: &PutOptions,
    ) -> Result<UploadInfo, TransportError> {
        let size = body.len() as u64;

        let (etag, version_id) = PutObject::new(key, checksum, options)
            .request(self, bucket, body)
            .await?;

        Ok(UploadInfo {
            bucket: bucket.to_string(),
            key: key.to_string(),
            etag,
            version_id,
            size,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::{
        s3::{Credentials, Region},
        stream::part::CompletedPart,
    };
    use mockito::{Matcher, Server};
    use secrecy::SecretString;

    fn s3(server: &Server, retries: u32) -> S3 {
        S3::new(
            &Credentials::new("access", &SecretString::from("secret")),
            &Region::Custom {
                name: "us-east-1".to_string(),
                endpoint: server.url(),
            },
            retries,
        )
    }

    #[tokio::test]
    async fn test_initiate() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/bucket/dir/key")
            .match_query(Matcher::UrlEncoded("uploads".into(), String::new()))
            .match_header("x-amz-acl", "private")
            .match_header("authorization", Matcher::Regex("^AWS4-HMAC-SHA256 ".into()))
            .with_status(200)
            .with_body(
                r#"<?xml version="1.0" encoding="UTF-8"?>
<InitiateMultipartUploadResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Bucket>bucket</Bucket>
  <Key>dir/key</Key>
  <UploadId>upload-1</UploadId>
</InitiateMultipartUploadResult>"#,
            )
            .create_async()
            .await;

        let options = PutOptions {
            acl: Some("private".to_string()),
            ..Default::default()
        };
        let upload_id = s3(&server, 1)
            .initiate("bucket", "dir/key", &options)
            .await
            .unwrap();

        assert_eq!(upload_id, "upload-1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_initiate_access_denied() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/bucket/key")
            .match_query(Matcher::Any)
            .with_status(403)
            .with_header("x-amz-request-id", "REQ123")
            .with_body(
                r#"<?xml version="1.0" encoding="UTF-8"?>
<Error><Code>AccessDenied</Code><Message>Access Denied</Message></Error>"#,
            )
            .expect(1)
            .create_async()
            .await;

        let err = s3(&server, 3)
            .initiate("bucket", "key", &PutOptions::default())
            .await
            .unwrap_err();

        // client errors are not retried
        mock.assert_async().await;
        assert!(err.is_access_denied());
        assert_eq!(err.status, Some(403));
        assert_eq!(err.request_id.as_deref(), Some("REQ123"));
    }

    #[tokio::test]
    async fn test_upload_part() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PUT", "/bucket/key")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("partNumber".into(), "2".into()),
                Matcher::UrlEncoded("uploadId".into(), "upload-1".into()),
            ]))
            .match_header("content-md5", "XUFAKrxLKna5cZ2REBfFkg==")
            .match_body("hello")
            .with_status(200)
            .with_header("ETag", "\"5d41402abc4b2a76b9719d911017c592\"")
            .create_async()
            .await;

        let checksum = Checksum::digest(crate::s3::checksum::ChecksumAlgorithm::Md5, b"hello");
        let part = PartUpload {
            bucket: "bucket",
            key: "key",
            session_id: "upload-1",
            part_number: 2,
            body: Bytes::from_static(b"hello"),
            checksum: Some(&checksum),
            encryption: None,
        };

        let etag = s3(&server, 1).upload_part(part).await.unwrap();

        assert_eq!(etag, "\"5d41402abc4b2a76b9719d911017c592\"");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_upload_part_retry_server_error() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PUT", "/bucket/key")
            .match_query(Matcher::Any)
            .with_status(503)
            .with_body("<Error><Code>SlowDown</Code><Message>Reduce your request rate</Message></Error>")
            .expect(2)
            .create_async()
            .await;

        let part = PartUpload {
            bucket: "bucket",
            key: "key",
            session_id: "upload-1",
            part_number: 1,
            body: Bytes::from_static(b"data"),
            checksum: None,
            encryption: None,
        };

        let err = s3(&server, 2).upload_part(part).await.unwrap_err();

        mock.assert_async().await;
        assert_eq!(err.code, "SlowDown");
        assert_eq!(err.status, Some(503));
    }

    #[tokio::test]
    async fn test_complete() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/bucket/key")
            .match_query(Matcher::UrlEncoded("uploadId".into(), "upload-1".into()))
            .match_body(Matcher::Regex(
                "<Part><PartNumber>1</PartNumber>.*<Part><PartNumber>2</PartNumber>".into(),
            ))
            .with_status(200)
            .with_header("x-amz-version-id", "v1")
            .with_body(
                r#"<?xml version="1.0" encoding="UTF-8"?>
<CompleteMultipartUploadResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Location>http://bucket.s3.amazonaws.com/key</Location>
  <Bucket>bucket</Bucket>
  <Key>key</Key>
  <ETag>"3858f62230ac3c915f300c664312c11f-2"</ETag>
</CompleteMultipartUploadResult>"#,
            )
            .create_async()
            .await;

        let manifest = CompletedManifest::from_parts(vec![
            CompletedPart::new(1, "etag-1"),
            CompletedPart::new(2, "etag-2"),
        ])
        .unwrap();

        let info = s3(&server, 1)
            .complete("bucket", "key", "upload-1", &manifest)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(info.etag, "\"3858f62230ac3c915f300c664312c11f-2\"");
        assert_eq!(info.version_id.as_deref(), Some("v1"));
        assert_eq!(info.bucket, "bucket");
    }

    #[tokio::test]
    async fn test_complete_error_in_ok_response() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/bucket/key")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                "<Error><Code>InternalError</Code><Message>We encountered an internal error.</Message></Error>",
            )
            .create_async()
            .await;

        let manifest = CompletedManifest::from_parts(vec![CompletedPart::new(1, "e")]).unwrap();

        let err = s3(&server, 1)
            .complete("bucket", "key", "upload-1", &manifest)
            .await
            .unwrap_err();

        assert_eq!(err.code, "InternalError");
    }

    #[tokio::test]
    async fn test_abort() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("DELETE", "/bucket/key")
            .match_query(Matcher::UrlEncoded("uploadId".into(), "upload-1".into()))
            .with_status(204)
            .create_async()
            .await;

        s3(&server, 1)
            .abort("bucket", "key", "upload-1")
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_put_object() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PUT", "/bucket/key")
            .match_header("content-type", "text/plain")
            .match_body("hello world")
            .with_status(200)
            .with_header("ETag", "\"5eb63bbbe01eeed093cb22bb8f5acdc3\"")
            .create_async()
            .await;

        let options = PutOptions {
            content_type: Some("text/plain".to_string()),
            ..Default::default()
        };
        let info = s3(&server, 1)
            .put_object(
                "bucket",
                "key",
                Bytes::from_static(b"hello world"),
                None,
                &options,
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(info.etag, "\"5eb63bbbe01eeed093cb22bb8f5acdc3\"");
        assert_eq!(info.size, 11);
        assert!(info.version_id.is_none());
    }

    #[tokio::test]
    async fn test_put_object_error_without_body() {
        let mut server = Server::new_async().await;
        server
            .mock("PUT", "/bucket/key")
            .with_status(404)
            .create_async()
            .await;

        let err = s3(&server, 1)
            .put_object("bucket", "key", Bytes::new(), None, &PutOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.code, "Not Found");
        assert_eq!(err.status, Some(404));
    }
}
