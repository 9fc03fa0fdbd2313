//! Multipart uploads to S3 compatible object stores.
//!
//! The [`stream`] module holds the upload engine: part planning, the upload
//! session lifecycle, the parallel and sequential strategies and the
//! coordinator tying them together. The [`s3`] module implements the engine's
//! transport traits over HTTP.

pub mod cli;
pub mod s3;
pub mod stream;
