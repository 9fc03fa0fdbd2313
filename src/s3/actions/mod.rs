//! Actions
//! <https://docs.aws.amazon.com/AmazonS3/latest/API/API_Operations.html>

use crate::{
    s3::{S3, Signature, responses::ErrorResponse},
    stream::error::TransportError,
};
use quick_xml::de::from_str;
use reqwest::{Method, Response};
use std::collections::BTreeMap;
use url::Url;

// <https://docs.aws.amazon.com/AmazonS3/latest/API/API_PutObject.html>
mod putobject;
pub use self::putobject::PutObject;

// <https://docs.aws.amazon.com/AmazonS3/latest/API/API_CreateMultipartUpload.html>
mod createmultipartupload;
pub use self::createmultipartupload::CreateMultipartUpload;

// <https://docs.aws.amazon.com/AmazonS3/latest/API/API_UploadPart.html>
mod uploadpart;
pub use self::uploadpart::UploadPart;

// <https://docs.aws.amazon.com/AmazonS3/latest/API/API_CompleteMultipartUpload.html>
mod completemultipartupload;
pub use self::completemultipartupload::CompleteMultipartUpload;

// <https://docs.aws.amazon.com/AmazonS3/latest/API/API_AbortMultipartUpload.html>
mod abortmultipartupload;
pub use self::abortmultipartupload::AbortMultipartUpload;

pub trait Action {
    // method to use GET/PUT...
    fn http_method(&self) -> Method;

    // headers to send in the request
    fn headers(&self) -> BTreeMap<String, String>;

    // URL query pairs
    fn query_pairs(&self) -> BTreeMap<&str, String>;

    // URL path after the bucket
    fn path(&self) -> Vec<&str>;

    /// # Errors
    ///
    /// Will return `Err` if the URL can not be built
    fn sign(
        &self,
        s3: &S3,
        bucket: &str,
        payload: &str,
    ) -> Result<(Url, BTreeMap<String, String>), TransportError> {
        let mut url = s3.endpoint()?;

        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| TransportError::new("InvalidEndpoint", "cannot be base"))?;
            segments.pop_if_empty().push(bucket);
            segments.extend(self.path());
        }

        let pairs = self.query_pairs();
        if !pairs.is_empty() {
            let mut query = url.query_pairs_mut();
            for (k, v) in &pairs {
                query.append_pair(k, v);
            }
        }

        let mut signature = Signature::new(s3.credentials(), s3.region(), "s3", self.http_method());
        let headers = signature.sign(&url, payload, &self.headers());

        Ok((url, headers))
    }
}

/// Object keys without empty segments, leading / or // are removed
#[must_use]
pub fn clean_path(key: &str) -> Vec<&str> {
    key.split('/').filter(|p| !p.is_empty()).collect()
}

/// Value of a response header, if present and valid ASCII
#[must_use]
pub fn response_header(response: &Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

/// Turn a non-success response into a [`TransportError`], using the XML
/// error body when there is one.
pub async fn response_error(response: Response) -> TransportError {
    let status = response.status();
    let request_id = response_header(&response, "x-amz-request-id");
    let body = response.text().await.unwrap_or_default();

    let mut error = parse_error(&body).unwrap_or_else(|| {
        TransportError::new(status.canonical_reason().unwrap_or("UnknownError"), &body)
    });

    error.status = Some(status.as_u16());

    if request_id.is_some() {
        error.request_id = request_id;
    }

    error
}

/// Parse an XML `<Error>` body.
#[must_use]
pub fn parse_error(body: &str) -> Option<TransportError> {
    from_str::<ErrorResponse>(body)
        .ok()
        .filter(|e| !e.code.is_empty())
        .map(|e| {
            let mut error = TransportError::new(&e.code, &e.message);
            error.request_id = e.request_id;
            error
        })
}
