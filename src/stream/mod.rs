//! Multipart upload engine.
//!
//! [`UploadCoordinator::put`] plans the parts of an object, starts the upload
//! session and sends the parts with one of two strategies:
//!
//! * parallel, a pool of workers reading a random-access source at each part
//!   offset ([`upload_multipart`])
//! * sequential, one part at a time from any reader ([`upload_stream`])
//!
//! The finished parts are ordered into a [`CompletedManifest`] and committed.
//! Any failure after the session started aborts it.

pub mod coordinator;
pub mod error;
pub mod manifest;
pub mod options;
pub mod part;
pub mod planner;
pub mod session;
pub mod source;
pub mod transport;
pub mod upload_default;
pub mod upload_multipart;
pub mod upload_stream;

pub use self::{
    coordinator::{Strategy, UploadCoordinator},
    error::{PlanError, TransportError, UploadError},
    manifest::CompletedManifest,
    options::{PutOptions, ServerSideEncryption},
    planner::UploadPlan,
    source::{FileSource, ReadAt, Source},
    transport::{ObjectTransport, PartTransport, PartUpload, SessionTransport, Transport, UploadInfo},
};
