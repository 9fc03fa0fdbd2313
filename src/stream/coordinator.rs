use crate::{
    s3::limits::MAX_SINGLE_PUT_SIZE_BYTES,
    stream::{
        error::UploadError,
        manifest,
        options::PutOptions,
        part::PartResult,
        planner::{self, UploadPlan},
        session::UploadSession,
        source::Source,
        transport::{Transport, UploadInfo},
        upload_default::upload_default,
        upload_multipart::upload_multipart,
        upload_stream::upload_stream,
    },
};
use std::sync::Arc;

/// How the parts of an upload are sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Worker pool reading the source at part offsets
    Parallel,
    /// One part at a time, front to back
    Sequential,
}

impl Strategy {
    /// Parallel needs positional reads, a known size and no per-part
    /// checksums.
    #[must_use]
    pub const fn select(source: &Source, options: &PutOptions) -> Self {
        match source {
            Source::RandomAccess { .. } if options.checksum.is_none() => Self::Parallel,
            _ => Self::Sequential,
        }
    }
}

/// Entry point of an upload: plans, picks a strategy and owns the session.
#[derive(Clone)]
pub struct UploadCoordinator {
    transport: Arc<dyn Transport>,
}

impl UploadCoordinator {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Upload `source` to `bucket/key`.
    ///
    /// Objects fitting in a single part are sent with one request. When the
    /// store refuses to start a multipart upload, objects up to 5 GiB are sent
    /// with one request instead. Any failure after the upload started aborts
    /// it before the error is returned.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the plan is invalid, the source can not be read or
    /// the store rejects the upload
    pub async fn put(
        &self,
        bucket: &str,
        key: &str,
        source: Source,
        options: &PutOptions,
    ) -> Result<UploadInfo, UploadError> {
        let plan = planner::plan(source.size(), options.part_size)?;

        if source.size().is_some_and(|size| size <= plan.part_size()) {
            return upload_default(&*self.transport, bucket, key, source, options).await;
        }

        let mut session =
            match UploadSession::create(&*self.transport, bucket, key, options).await {
                Ok(session) => session,

                Err(UploadError::SessionCreateFailed(e))
                    if e.is_access_denied()
                        && source
                            .size()
                            .is_some_and(|size| size <= MAX_SINGLE_PUT_SIZE_BYTES) =>
                {
                    log::warn!("Multipart upload denied, falling back to a single put: {e}");

                    return upload_default(&*self.transport, bucket, key, source, options).await;
                }

                Err(e) => return Err(e),
            };

        let strategy = Strategy::select(&source, options);

        log::debug!(
            "Upload {} of {bucket}/{key} using {strategy:?} strategy",
            session.session_id()
        );

        match self
            .upload_parts(&mut session, source, &plan, strategy, options)
            .await
        {
            Ok(info) => Ok(info),

            Err(e) => {
                session.abort(&*self.transport).await;
                Err(e)
            }
        }
    }

    async fn upload_parts(
        &self,
        session: &mut UploadSession,
        source: Source,
        plan: &UploadPlan,
        strategy: Strategy,
        options: &PutOptions,
    ) -> Result<UploadInfo, UploadError> {
        let (manifest, size) = match (strategy, source) {
            (Strategy::Parallel, Source::RandomAccess { reader, .. }) => {
                let results =
                    upload_multipart(&self.transport, session, reader, plan, options).await?;
                let size = total_size(&results);
                (manifest::assemble(results, Some(plan.part_count()))?, size)
            }

            (_, source) => {
                let results = upload_stream(
                    &*self.transport,
                    session,
                    source.into_reader(),
                    plan,
                    options,
                )
                .await?;
                let size = total_size(&results);
                (manifest::assemble(results, None)?, size)
            }
        };

        let mut info = session.complete(&*self.transport, &manifest).await?;
        info.size = size;

        Ok(info)
    }
}

fn total_size(results: &[PartResult]) -> u64 {
    results.iter().map(PartResult::get_size).sum()
}
