//! S3 HTTP client
//! <https://docs.aws.amazon.com/AmazonS3/latest/API/API_Operations.html>

pub mod actions;
pub mod checksum;
pub mod credentials;
pub mod limits;
pub mod region;
pub mod request;
pub mod responses;
pub mod signature;
pub mod tools;
pub mod transport;

pub use self::{credentials::Credentials, region::Region, signature::Signature};

use crate::stream::error::TransportError;
use reqwest::Client;
use url::Url;

static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct S3 {
    // AWS Credentials
    credentials: Credentials,
    // AWS Region
    region: Region,
    client: Client,
    // attempts per request
    retries: u32,
}

impl S3 {
    #[must_use]
    pub fn new(credentials: &Credentials, region: &Region, retries: u32) -> Self {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .build()
            .unwrap_or_default();

        Self {
            credentials: credentials.clone(),
            region: region.clone(),
            client,
            retries: retries.max(1),
        }
    }

    #[must_use]
    pub const fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    #[must_use]
    pub const fn region(&self) -> &Region {
        &self.region
    }

    #[must_use]
    pub const fn client(&self) -> &Client {
        &self.client
    }

    #[must_use]
    pub const fn retries(&self) -> u32 {
        self.retries
    }

    /// # Errors
    ///
    /// Will return `Err` if the region endpoint is not a valid URL
    pub fn endpoint(&self) -> Result<Url, TransportError> {
        Url::parse(&self.region.endpoint())
            .map_err(|e| TransportError::new("InvalidEndpoint", &e.to_string()))
    }
}
