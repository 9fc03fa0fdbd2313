//! AWS S3 service limits and constants
//!
//! This module centralizes all AWS S3 service limits to make updates easy
//! when AWS changes their quotas.
//!
//! # References
//! - [S3 Quotas](https://docs.aws.amazon.com/AmazonS3/latest/userguide/qfacts.html)
//! - [Multipart Upload Overview](https://docs.aws.amazon.com/AmazonS3/latest/userguide/mpuoverview.html)
//!
//! # When AWS Updates These Limits
//!
//! If AWS increases object size or part limits, update the constants below:
//!
//! 1. Update the constants (e.g., `MAX_OBJECT_SIZE_BYTES`)
//! 2. Update the doc comments with new values and date
//! 3. Run tests: `cargo test`

/// Maximum size of a single S3 object (5 TiB)
///
/// AWS limit: 5 TiB (5,497,558,138,880 bytes)
///
/// Streams of unknown length are planned against this size.
pub const MAX_OBJECT_SIZE_BYTES: u64 = 5_497_558_138_880;

/// Maximum size of a single multipart upload part (5 GiB)
///
/// Each part in a multipart upload (except the last) must be at least 5 MiB
/// and at most 5 GiB.
pub const MAX_PART_SIZE_BYTES: u64 = 5_368_709_120;

/// Maximum number of parts in a multipart upload (10,000)
///
/// Part numbers are `u16`, see `test_part_number_type_sufficient`.
pub const MAX_PARTS_PER_UPLOAD: usize = 10_000;

/// Minimum size of a multipart upload part (5 MiB)
///
/// The last part can be smaller than this minimum.
pub const MIN_PART_SIZE_BYTES: u64 = 5_242_880;

/// Default part size granularity when no part size is requested (16 MiB)
///
/// Planned part sizes are rounded up to a multiple of this value.
pub const DEFAULT_PART_SIZE_BYTES: u64 = 16_777_216;

/// Maximum size of an object written with a single PUT (5 GiB)
///
/// Bounds the fallback taken when the store refuses multipart uploads.
pub const MAX_SINGLE_PUT_SIZE_BYTES: u64 = 5_368_709_120;

/// Default number of parts uploaded concurrently
pub const DEFAULT_WORKERS: usize = 4;
