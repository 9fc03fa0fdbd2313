use crate::{
    s3::{
        S3,
        actions::{Action, clean_path, response_header},
        checksum::Checksum,
        request,
    },
    stream::{error::TransportError, options::PutOptions},
};
use bytes::Bytes;
use reqwest::Method;
use std::collections::BTreeMap;

#[derive(Debug)]
pub struct PutObject<'a> {
    key: &'a str,
    checksum: Option<&'a Checksum>,
    options: &'a PutOptions,
}

impl<'a> PutObject<'a> {
    #[must_use]
    pub const fn new(key: &'a str, checksum: Option<&'a Checksum>, options: &'a PutOptions) -> Self {
        Self {
            key,
            checksum,
            options,
        }
    }

    /// Returns the `ETag` and the `x-amz-version-id` header.
    ///
    /// # Errors
    ///
    /// Will return `Err` if can not make the request or the response has no
    /// `ETag`
    pub async fn request(
        &self,
        s3: &S3,
        bucket: &str,
        body: Bytes,
    ) -> Result<(String, Option<String>), TransportError> {
        let response = request::request(s3, bucket, self, body).await?;

        let etag = response_header(&response, "ETag")
            .ok_or_else(|| TransportError::new("InvalidResponse", "missing ETag"))?;

        Ok((etag, response_header(&response, "x-amz-version-id")))
    }
}

impl Action for PutObject<'_> {
    fn http_method(&self) -> Method {
        Method::PUT
    }

    fn headers(&self) -> BTreeMap<String, String> {
        let mut map = self.options.object_headers();

        // <https://docs.aws.amazon.com/AmazonS3/latest/userguide/checking-object-integrity.html>
        if let Some(checksum) = self.checksum {
            map.insert(
                checksum.algorithm.as_amz().to_string(),
                checksum.checksum.clone(),
            );
        }

        map
    }

    fn query_pairs(&self) -> BTreeMap<&str, String> {
        BTreeMap::new()
    }

    fn path(&self) -> Vec<&str> {
        clean_path(self.key)
    }
}
