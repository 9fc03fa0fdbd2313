use std::{fmt, str::FromStr};
use thiserror::Error;

// https://docs.aws.amazon.com/general/latest/gr/rande.html#regional-endpoints
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Region {
    // Asia Pacific (Tokyo)         ap-northeast-1
    ApNortheast1,

    // Asia Pacific (Singapore)     ap-southeast-1
    ApSoutheast1,

    // Asia Pacific (Sydney)        ap-southeast-2
    ApSoutheast2,

    // Canada (Central)             ca-central-1
    CaCentral1,

    // Europe (Frankfurt)           eu-central-1
    EuCentral1,

    // Europe (Stockholm)           eu-north-1
    EuNorth1,

    // Europe (Ireland)             eu-west-1
    EuWest1,

    // Europe (London)              eu-west-2
    EuWest2,

    // South America (São Paulo)    sa-east-1
    SaEast1,

    // US East (N. Virginia)        us-east-1
    UsEast1,

    // US East (Ohio)               us-east-2
    UsEast2,

    // US West (N. California)      us-west-1
    UsWest1,

    // US West (Oregon)             us-west-2
    UsWest2,

    // S3 compatible store, the endpoint may carry a scheme and port
    Custom { name: String, endpoint: String },
}

impl Region {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::ApNortheast1 => "ap-northeast-1",
            Self::ApSoutheast1 => "ap-southeast-1",
            Self::ApSoutheast2 => "ap-southeast-2",
            Self::CaCentral1 => "ca-central-1",
            Self::EuCentral1 => "eu-central-1",
            Self::EuNorth1 => "eu-north-1",
            Self::EuWest1 => "eu-west-1",
            Self::EuWest2 => "eu-west-2",
            Self::SaEast1 => "sa-east-1",
            Self::UsEast1 => "us-east-1",
            Self::UsEast2 => "us-east-2",
            Self::UsWest1 => "us-west-1",
            Self::UsWest2 => "us-west-2",
            Self::Custom { name, .. } => name,
        }
    }

    /// Base URL of the store, requests use path style `/bucket/key`.
    #[must_use]
    pub fn endpoint(&self) -> String {
        match self {
            Self::Custom { endpoint, .. } if endpoint.contains("://") => {
                endpoint.trim_end_matches('/').to_string()
            }
            Self::Custom { endpoint, .. } => {
                format!("https://{}", endpoint.trim_end_matches('/'))
            }
            _ => format!("https://s3.{}.amazonaws.com", self.name()),
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Region {
    type Err = ParseRegionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ap-northeast-1" => Ok(Self::ApNortheast1),
            "ap-southeast-1" => Ok(Self::ApSoutheast1),
            "ap-southeast-2" => Ok(Self::ApSoutheast2),
            "ca-central-1" => Ok(Self::CaCentral1),
            "eu-central-1" => Ok(Self::EuCentral1),
            "eu-north-1" => Ok(Self::EuNorth1),
            "eu-west-1" => Ok(Self::EuWest1),
            "eu-west-2" => Ok(Self::EuWest2),
            "sa-east-1" => Ok(Self::SaEast1),
            "us-east-1" => Ok(Self::UsEast1),
            "us-east-2" => Ok(Self::UsEast2),
            "us-west-1" => Ok(Self::UsWest1),
            "us-west-2" => Ok(Self::UsWest2),
            _ => Err(ParseRegionError(s.to_string())),
        }
    }
}

impl Default for Region {
    fn default() -> Self {
        std::env::var("AWS_DEFAULT_REGION")
            .or_else(|_| std::env::var("AWS_REGION"))
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(Self::UsEast1)
    }
}

/// An error produced when a `str` is not a known region.
#[derive(Debug, PartialEq, Eq, Error)]
#[error("Not a valid AWS region: {0}")]
pub struct ParseRegionError(String);

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str() {
        assert_eq!(
            "foo".parse::<Region>().unwrap_err().to_string(),
            "Not a valid AWS region: foo"
        );
        assert_eq!("us-east-1".parse(), Ok(Region::UsEast1));
        assert_eq!("EU-WEST-2".parse(), Ok(Region::EuWest2));
        assert_eq!("ap-southeast-2".parse(), Ok(Region::ApSoutheast2));
    }

    #[test]
    fn test_endpoint() {
        assert_eq!(
            Region::UsWest1.endpoint(),
            "https://s3.us-west-1.amazonaws.com"
        );

        let region = Region::Custom {
            name: "us-east-1".to_string(),
            endpoint: "http://localhost:9000/".to_string(),
        };
        assert_eq!(region.endpoint(), "http://localhost:9000");
        assert_eq!(region.name(), "us-east-1");

        let region = Region::Custom {
            name: "auto".to_string(),
            endpoint: "storage.example.com".to_string(),
        };
        assert_eq!(region.endpoint(), "https://storage.example.com");
    }

    #[test]
    fn test_default() {
        temp_env::with_vars(
            [("AWS_DEFAULT_REGION", Some("eu-north-1")), ("AWS_REGION", None)],
            || assert_eq!(Region::default(), Region::EuNorth1),
        );
        temp_env::with_vars(
            [("AWS_DEFAULT_REGION", None::<&str>), ("AWS_REGION", None)],
            || assert_eq!(Region::default(), Region::UsEast1),
        );
    }
}
