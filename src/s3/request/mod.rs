use crate::{
    s3::{
        S3,
        actions::{Action, response_error},
    },
    stream::error::TransportError,
};
use bytes::Bytes;
use reqwest::{
    Response,
    header::{HeaderMap, HeaderName, HeaderValue},
};
use std::collections::BTreeMap;
use tokio::time::{Duration, sleep};

const MAX_BACKOFF: u64 = 60;

/// Sign and send the action, retrying network and server errors with an
/// exponential backoff.
///
/// # Errors
///
/// Will return `Err` if the store rejects the request or every attempt failed
pub async fn request<A: Action + Sync>(
    s3: &S3,
    bucket: &str,
    action: &A,
    body: Bytes,
) -> Result<Response, TransportError> {
    let payload = crate::s3::tools::sha256_digest(&body);
    let retries = s3.retries();
    let mut last_error = TransportError::new("RequestError", "no attempt made");

    for attempt in 1..=retries {
        if attempt > 1 {
            let backoff_time = backoff(attempt);

            log::warn!(
                "{} request failed, retrying in {backoff_time} seconds: {last_error}",
                action.http_method()
            );

            sleep(Duration::from_secs(backoff_time)).await;
        }

        // signed on every attempt, the signature carries the request time
        let (url, headers) = action.sign(s3, bucket, &payload)?;

        let request = s3
            .client()
            .request(action.http_method(), url)
            .headers(header_map(&headers)?)
            .body(body.clone());

        match request.send().await {
            Ok(response) if response.status().is_success() => return Ok(response),

            Ok(response) if response.status().is_server_error() => {
                last_error = response_error(response).await;
            }

            Ok(response) => return Err(response_error(response).await),

            Err(e) => {
                last_error = TransportError::new("RequestError", &e.to_string());
            }
        }

        log::error!("attempt {attempt}/{retries} failed: {last_error}");
    }

    Err(last_error)
}

// seconds to wait before `attempt`: 1, 2, 4 ... capped at MAX_BACKOFF
fn backoff(attempt: u32) -> u64 {
    2_u64
        .checked_pow(attempt.saturating_sub(2))
        .map_or(MAX_BACKOFF, |secs| secs.min(MAX_BACKOFF))
}

fn header_map(headers: &BTreeMap<String, String>) -> Result<HeaderMap, TransportError> {
    headers
        .iter()
        .map(|(k, v)| {
            Ok((
                k.parse::<HeaderName>()
                    .map_err(|e| TransportError::new("InvalidHeader", &e.to_string()))?,
                v.parse::<HeaderValue>()
                    .map_err(|e| TransportError::new("InvalidHeader", &e.to_string()))?,
            ))
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_header_map() {
        let mut headers = BTreeMap::new();
        headers.insert("x-amz-acl".to_string(), "private".to_string());
        let map = header_map(&headers).unwrap();
        assert_eq!(map.get("x-amz-acl").unwrap(), "private");

        headers.insert("bad header".to_string(), "x".to_string());
        assert!(header_map(&headers).is_err());
    }

    #[test]
    fn test_backoff() {
        assert_eq!(backoff(2), 1);
        assert_eq!(backoff(3), 2);
        assert_eq!(backoff(6), 16);
        assert_eq!(backoff(8), MAX_BACKOFF);
        // 2^64 does not fit, large retry counts stay at the cap
        assert_eq!(backoff(66), MAX_BACKOFF);
        assert_eq!(backoff(u32::MAX), MAX_BACKOFF);
    }
}
