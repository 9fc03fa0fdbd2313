//! Content checksums sent along with the uploaded data
//! <https://docs.aws.amazon.com/AmazonS3/latest/userguide/checking-object-integrity.html>

use base64ct::{Base64, Encoding};
use ring::digest::{self, SHA1_FOR_LEGACY_USE_ONLY, SHA256};
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumAlgorithm {
    /// `Content-MD5`, verified by the store but not kept with the object
    Md5,
    Crc32,
    Crc32c,
    Sha1,
    Sha256,
}

impl ChecksumAlgorithm {
    /// Header carrying the checksum of the request body.
    #[must_use]
    pub const fn as_amz(&self) -> &'static str {
        match self {
            Self::Md5 => "content-md5",
            Self::Crc32 => "x-amz-checksum-crc32",
            Self::Crc32c => "x-amz-checksum-crc32c",
            Self::Sha1 => "x-amz-checksum-sha1",
            Self::Sha256 => "x-amz-checksum-sha256",
        }
    }

    /// Value of `x-amz-checksum-algorithm`, `None` for `Content-MD5` which is
    /// not an additional checksum.
    #[must_use]
    pub const fn as_algorithm(&self) -> Option<&'static str> {
        match self {
            Self::Md5 => None,
            Self::Crc32 => Some("CRC32"),
            Self::Crc32c => Some("CRC32C"),
            Self::Sha1 => Some("SHA1"),
            Self::Sha256 => Some("SHA256"),
        }
    }

    // raw digest, CRCs are big endian
    fn digest(self, bytes: &[u8]) -> Vec<u8> {
        match self {
            Self::Md5 => md5::compute(bytes).0.to_vec(),
            Self::Crc32 => crc32fast::hash(bytes).to_be_bytes().to_vec(),
            Self::Crc32c => crc32c::crc32c(bytes).to_be_bytes().to_vec(),
            Self::Sha1 => digest::digest(&SHA1_FOR_LEGACY_USE_ONLY, bytes)
                .as_ref()
                .to_vec(),
            Self::Sha256 => digest::digest(&SHA256, bytes).as_ref().to_vec(),
        }
    }
}

impl FromStr for ChecksumAlgorithm {
    type Err = ();

    fn from_str(algorithm: &str) -> Result<Self, Self::Err> {
        match algorithm.to_lowercase().as_str() {
            "md5" => Ok(Self::Md5),
            "crc32" => Ok(Self::Crc32),
            "crc32c" => Ok(Self::Crc32c),
            "sha1" => Ok(Self::Sha1),
            "sha256" => Ok(Self::Sha256),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Md5 => "md5",
            Self::Crc32 => "crc32",
            Self::Crc32c => "crc32c",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
        };
        write!(f, "{name}")
    }
}

/// Base64 encoded checksum of a part or object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checksum {
    pub algorithm: ChecksumAlgorithm,
    pub checksum: String,
}

impl Checksum {
    #[must_use]
    pub const fn new(algorithm: ChecksumAlgorithm) -> Self {
        Self {
            algorithm,
            checksum: String::new(),
        }
    }

    /// Checksum of a buffered body.
    #[must_use]
    pub fn digest(algorithm: ChecksumAlgorithm, bytes: &[u8]) -> Self {
        Self {
            algorithm,
            checksum: Base64::encode_string(&algorithm.digest(bytes)),
        }
    }
}
