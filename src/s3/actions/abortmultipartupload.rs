use crate::{
    s3::{
        S3,
        actions::{Action, clean_path},
        request,
    },
    stream::error::TransportError,
};
use bytes::Bytes;
use reqwest::Method;
use std::collections::BTreeMap;

#[derive(Debug)]
pub struct AbortMultipartUpload<'a> {
    key: &'a str,
    upload_id: &'a str,
}

impl<'a> AbortMultipartUpload<'a> {
    #[must_use]
    pub const fn new(key: &'a str, upload_id: &'a str) -> Self {
        Self { key, upload_id }
    }

    /// # Errors
    ///
    /// Will return `Err` if can not make the request
    pub async fn request(&self, s3: &S3, bucket: &str) -> Result<(), TransportError> {
        request::request(s3, bucket, self, Bytes::new()).await?;
        Ok(())
    }
}

impl Action for AbortMultipartUpload<'_> {
    fn http_method(&self) -> Method {
        Method::DELETE
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
