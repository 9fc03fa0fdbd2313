//!  S3 signature v4
//! <https://docs.aws.amazon.com/AmazonS3/latest/API/sig-v4-header-based-auth.html>

use crate::s3::{
    Credentials, Region,
    tools::{sha256_digest, sha256_hmac, write_hex_bytes},
};
use chrono::{DateTime, Utc};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::Method;
use ring::hmac;
use std::collections::BTreeMap;
use url::Url;

#[derive(Debug)]
pub struct Signature<'a> {
    credentials: &'a Credentials,
    region: &'a Region,
    service: &'static str,
    method: Method,
    // headers to sign, lowercase keys
    headers: BTreeMap<String, String>,
    datetime: DateTime<Utc>,
}

impl<'a> Signature<'a> {
    #[must_use]
    pub fn new(
        credentials: &'a Credentials,
        region: &'a Region,
        service: &'static str,
        method: Method,
    ) -> Self {
        Self {
            credentials,
            region,
            service,
            method,
            headers: BTreeMap::new(),
            datetime: Utc::now(),
        }
    }

    #[must_use]
    pub const fn with_datetime(mut self, datetime: DateTime<Utc>) -> Self {
        self.datetime = datetime;
        self
    }

    /// Sign the request, returns every header to send including
    /// `authorization`.
    ///
    /// `payload` is the HexEncode(Hash(RequestPayload))
    pub fn sign(
        &mut self,
        url: &Url,
        payload: &str,
        headers: &BTreeMap<String, String>,
    ) -> BTreeMap<String, String> {
        let current_date = self.datetime.format("%Y%m%d").to_string();
        let current_datetime = self.datetime.format("%Y%m%dT%H%M%SZ").to_string();

        self.add_header("host", &host(url));
        self.add_header("x-amz-date", &current_datetime);
        self.add_header("x-amz-content-sha256", payload);

        for (k, v) in headers {
            self.add_header(k, v);
        }

        let signed_headers = signed_headers(&self.headers);

        // https://docs.aws.amazon.com/general/latest/gr/sigv4_signing.html
        // 1. Create a canonical request for Signature Version 4
        //
        //     CanonicalRequest =
        //         HTTPRequestMethod + '\n' +
        //         CanonicalURI + '\n' +
        //         CanonicalQueryString + '\n' +
        //         CanonicalHeaders + '\n' +
        //         SignedHeaders + '\n' +
        //         HexEncode(Hash(RequestPayload))
        let canonical_request = format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            self.method,
            canonical_uri(url),
            canonical_query_string(url),
            canonical_headers(&self.headers),
            signed_headers,
            payload
        );

        log::debug!("canonical request:\n{canonical_request}");

        // 2. Create a string to sign for Signature Version 4
        let scope = format!(
            "{current_date}/{}/{}/aws4_request",
            self.region.name(),
            self.service
        );
        let string_to_sign = string_to_sign(
            &current_datetime,
            &scope,
            &sha256_digest(&canonical_request),
        );

        // 3. Calculate the signature for AWS Signature Version 4
        let signing_key = signature_key(
            self.credentials.aws_secret_access_key(),
            &current_date,
            self.region.name(),
            self.service,
        );
        let signature = sha256_hmac(signing_key.as_ref(), string_to_sign.as_bytes());

        // 4. Add the signature to the HTTP request
        let authorization = format!(
            "AWS4-HMAC-SHA256 Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={}",
            self.credentials.aws_access_key_id(),
            write_hex_bytes(signature.as_ref())
        );

        let mut headers = self.headers.clone();
        headers.insert("authorization".to_string(), authorization);
        headers
    }

    pub fn add_header(&mut self, key: &str, value: &str) {
        self.headers
            .insert(key.to_ascii_lowercase(), value.trim().to_string());
    }
}

// host header, including the port when it is not the default one
fn host(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();

    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

// URI encode every byte except the unreserved characters:
// 'A'-'Z', 'a'-'z', '0'-'9', '-', '.', '_', and '~'.
// The path is already percent encoded by `Url`, decode it first so no byte is
// encoded twice.
#[must_use]
pub fn canonical_uri(url: &Url) -> String {
    const FRAGMENT: &AsciiSet = &NON_ALPHANUMERIC
        .remove(b'/')
        .remove(b'-')
        .remove(b'.')
        .remove(b'_')
        .remove(b'~');

    let path = percent_encoding::percent_decode_str(url.path()).decode_utf8_lossy();

    utf8_percent_encode(&path, FRAGMENT).to_string()
}

// Name and values are URI-encoded individually and sorted by key name after
// encoding.
#[must_use]
pub fn canonical_query_string(url: &Url) -> String {
    const FRAGMENT: &AsciiSet = &NON_ALPHANUMERIC
        .remove(b'-')
        .remove(b'.')
        .remove(b'_')
        .remove(b'~');

    let mut pairs = url
        .query_pairs()
        .map(|(key, value)| {
            format!(
                "{}={}",
                utf8_percent_encode(&key, FRAGMENT),
                utf8_percent_encode(&value, FRAGMENT)
            )
        })
        .collect::<Vec<String>>();

    pairs.sort();
    pairs.join("&")
}

fn canonical_headers(headers: &BTreeMap<String, String>) -> String {
    let mut canonical = String::new();
    for (key, value) in headers {
        canonical.push_str(key);
        canonical.push(':');
        canonical.push_str(value);
        canonical.push('\n');
    }
    canonical
}

fn signed_headers(headers: &BTreeMap<String, String>) -> String {
    headers
        .keys()
        .map(String::as_str)
        .collect::<Vec<&str>>()
        .join(";")
}

// https://docs.aws.amazon.com/general/latest/gr/sigv4-create-string-to-sign.html
#[must_use]
pub fn string_to_sign(timestamp: &str, scope: &str, hashed_canonical_request: &str) -> String {
    format!("AWS4-HMAC-SHA256\n{timestamp}\n{scope}\n{hashed_canonical_request}")
}

fn signature_key(secret_access_key: &str, date: &str, region: &str, service: &str) -> hmac::Tag {
    let k_date = sha256_hmac(
        format!("AWS4{secret_access_key}").as_bytes(),
        date.as_bytes(),
    );
    let k_region = sha256_hmac(k_date.as_ref(), region.as_bytes());
    let k_service = sha256_hmac(k_region.as_ref(), service.as_bytes());
    sha256_hmac(k_service.as_ref(), b"aws4_request")
}
