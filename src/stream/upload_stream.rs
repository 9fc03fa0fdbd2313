use crate::{
    s3::checksum::Checksum,
    stream::{
        error::{PlanError, UploadError},
        options::PutOptions,
        part::PartResult,
        planner::UploadPlan,
        session::UploadSession,
        source::SequentialReader,
        transport::{PartUpload, Transport},
    },
};
use bytes::Bytes;

/// Upload the source one part at a time, in order.
///
/// For unknown sizes the stream ends with the first short read, up to the
/// plan's part count ceiling. Known sizes read exactly the planned ranges.
///
/// # Errors
///
/// Will return `Err` if reading or uploading a part fails, the upload is
/// canceled, the stream has more parts than the plan allows or the uploaded
/// bytes differ from the declared size
pub async fn upload_stream<T: Transport + ?Sized>(
    transport: &T,
    session: &mut UploadSession,
    mut reader: SequentialReader,
    plan: &UploadPlan,
    options: &PutOptions,
) -> Result<Vec<PartResult>, UploadError> {
    log::debug!(
        "Starting sequential upload: {}, part size: {}, max parts: {}",
        session.session_id(),
        plan.part_size(),
        plan.part_count()
    );

    let capacity = usize::try_from(plan.part_size()).unwrap_or_default();
    let mut results: Vec<PartResult> = Vec::new();
    let mut uploaded: u64 = 0;
    let mut number: u16 = 1;

    loop {
        let len = if plan.is_bounded() {
            plan.part_range(number).1
        } else {
            plan.part_size()
        };

        // a reader waiting on an idle pipe must not block cancellation
        let buf = tokio::select! {
            biased;
            () = options.cancel.cancelled() => return Err(UploadError::Canceled),
            read = reader.read_full(Vec::with_capacity(capacity), len) => read?,
        };

        let size = buf.len() as u64;

        // end of stream
        if size == 0 && number > 1 {
            break;
        }

        if number > plan.part_count() {
            return Err(PlanError::TooManyParts(plan.part_count()).into());
        }

        let checksum = options
            .checksum
            .map(|algorithm| Checksum::digest(algorithm, &buf));

        let part = PartUpload {
            bucket: session.bucket(),
            key: session.key(),
            session_id: session.session_id(),
            part_number: number,
            body: Bytes::from(buf),
            checksum: checksum.as_ref(),
            encryption: options.encryption.as_ref(),
        };

        let etag = transport
            .upload_part(part)
            .await
            .map_err(|source| UploadError::PartFailed {
                part_number: number,
                source,
            })?;

        log::info!("Uploaded part: {number}, etag: {etag}");

        session.mark_active();
        options.report_progress(size);
        uploaded += size;

        results.push(PartResult::new(number, etag, size).set_checksum(checksum));

        // a short read is the last part, known sizes stop at the planned count
        if size < len || (plan.is_bounded() && number == plan.part_count()) {
            break;
        }

        number = number.saturating_add(1);
    }

    if let Some(expected) = plan.total_size().filter(|total| *total != uploaded) {
        return Err(UploadError::SizeMismatch { expected, uploaded });
    }

    Ok(results)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::cast_possible_truncation
)]
mod tests {
    use super::*;
    use crate::{
        s3::checksum::ChecksumAlgorithm,
        stream::{
            error::TransportError,
            manifest::CompletedManifest,
            planner,
            source::Source,
            transport::{ObjectTransport, PartTransport, SessionTransport, UploadInfo},
        },
    };
    use async_trait::async_trait;
    use std::{sync::Mutex, time::Duration};
    use tokio::time::timeout;

    const MIB: u64 = 1024 * 1024;

    #[derive(Default)]
    struct Recorder {
        parts: Mutex<Vec<(u16, usize, Option<Checksum>)>>,
        fail_part: Option<u16>,
    }

    #[async_trait]
    impl SessionTransport for Recorder {
        async fn initiate(&self, _: &str, _: &str, _: &PutOptions) -> Result<String, TransportError> {
            Ok("upload-1".to_string())
        }

        async fn abort(&self, _: &str, _: &str, _: &str) -> Result<(), TransportError> {
            Ok(())
        }

        async fn complete(
            &self,
            _: &str,
            _: &str,
            _: &str,
            _: &CompletedManifest,
        ) -> Result<UploadInfo, TransportError> {
            Ok(UploadInfo::default())
        }
    }

    #[async_trait]
    impl PartTransport for Recorder {
        async fn upload_part(&self, part: PartUpload<'_>) -> Result<String, TransportError> {
            if self.fail_part == Some(part.part_number) {
                return Err(TransportError::new("InternalError", "part failed"));
            }

            self.parts.lock().unwrap().push((
                part.part_number,
                part.body.len(),
                part.checksum.cloned(),
            ));

            Ok(format!("etag-{}", part.part_number))
        }
    }

    #[async_trait]
    impl ObjectTransport for Recorder {
        async fn put_object(
            &self,
            _: &str,
            _: &str,
            _: Bytes,
            _: Option<&Checksum>,
            _: &PutOptions,
        ) -> Result<UploadInfo, TransportError> {
            Ok(UploadInfo::default())
        }
    }

    fn data(size: u64) -> Vec<u8> {
        (0..size).map(|i| (i % 251) as u8).collect()
    }

    async fn upload(
        recorder: &Recorder,
        source: Source,
        plan: &UploadPlan,
        options: &PutOptions,
    ) -> Result<Vec<PartResult>, UploadError> {
        let mut session = UploadSession::create(recorder, "b", "k", options)
            .await
            .unwrap();
        upload_stream(recorder, &mut session, source.into_reader(), plan, options).await
    }

    #[tokio::test]
    async fn test_unknown_size_stream() {
        // 3.5 parts of data
        let recorder = Recorder::default();
        let body = data(17 * MIB + MIB / 2);
        let plan = planner::plan(None, Some(5 * MIB)).unwrap();
        let source = Source::stream(std::io::Cursor::new(body), None);

        let results = upload(&recorder, source, &plan, &PutOptions::default())
            .await
            .unwrap();

        let numbers: Vec<u16> = results.iter().map(PartResult::get_number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
        assert_eq!(results[3].get_size(), 2 * MIB + MIB / 2);
    }

    #[tokio::test]
    async fn test_unknown_size_exact_multiple() {
        let recorder = Recorder::default();
        let plan = planner::plan(None, Some(5 * MIB)).unwrap();
        let source = Source::stream(std::io::Cursor::new(data(10 * MIB)), None);

        let results = upload(&recorder, source, &plan, &PutOptions::default())
            .await
            .unwrap();

        // the empty read after part 2 ends the stream, no empty part 3
        assert_eq!(results.len(), 2);
        assert_eq!(recorder.parts.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_stream() {
        let recorder = Recorder::default();
        let plan = planner::plan(None, None).unwrap();
        let source = Source::stream(std::io::Cursor::new(Vec::new()), None);

        let results = upload(&recorder, source, &plan, &PutOptions::default())
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].get_size(), 0);
    }

    #[tokio::test]
    async fn test_random_access_read_in_order_with_checksum() {
        let recorder = Recorder::default();
        let body = data(17 * MIB);
        let plan = planner::plan(Some(17 * MIB), Some(5 * MIB)).unwrap();
        let options = PutOptions {
            checksum: Some(ChecksumAlgorithm::Crc32c),
            ..Default::default()
        };

        let results = upload(&recorder, Source::bytes(Bytes::from(body.clone())), &plan, &options)
            .await
            .unwrap();

        assert_eq!(results.len(), 4);

        let parts = recorder.parts.lock().unwrap();
        let sizes: Vec<usize> = parts.iter().map(|(_, size, _)| *size).collect();
        let mib = MIB as usize;
        assert_eq!(sizes, vec![5 * mib, 5 * mib, 5 * mib, 2 * mib]);

        let expected = Checksum::digest(ChecksumAlgorithm::Crc32c, &body[15 * mib..]);
        assert_eq!(parts[3].2.as_ref(), Some(&expected));
        assert_eq!(results[3].get_checksum(), Some(&expected));
    }

    #[tokio::test]
    async fn test_known_size_short_stream() {
        let recorder = Recorder::default();
        let plan = planner::plan(Some(12 * MIB), Some(5 * MIB)).unwrap();
        let source = Source::stream(std::io::Cursor::new(data(7 * MIB)), Some(12 * MIB));

        let result = upload(&recorder, source, &plan, &PutOptions::default()).await;

        assert!(matches!(
            result,
            Err(UploadError::SizeMismatch { expected, uploaded })
                if expected == 12 * MIB && uploaded == 7 * MIB
        ));
    }

    #[tokio::test]
    async fn test_too_many_parts() {
        let recorder = Recorder::default();
        let plan = UploadPlan::unbounded(MIB, 2);
        let source = Source::stream(std::io::Cursor::new(data(2 * MIB + 1)), None);

        let result = upload(&recorder, source, &plan, &PutOptions::default()).await;

        assert!(matches!(
            result,
            Err(UploadError::Plan(PlanError::TooManyParts(2)))
        ));
    }

    #[tokio::test]
    async fn test_known_size_ignores_trailing_bytes() {
        let recorder = Recorder::default();
        let plan = planner::plan(Some(5 * MIB), Some(5 * MIB)).unwrap();
        let source = Source::stream(std::io::Cursor::new(data(6 * MIB)), Some(5 * MIB));

        let results = upload(&recorder, source, &plan, &PutOptions::default())
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].get_size(), 5 * MIB);
    }

    #[tokio::test]
    async fn test_part_failure() {
        let recorder = Recorder {
            fail_part: Some(2),
            ..Default::default()
        };
        let plan = planner::plan(Some(10 * MIB), Some(5 * MIB)).unwrap();
        let source = Source::stream(std::io::Cursor::new(data(10 * MIB)), Some(10 * MIB));

        let result = upload(&recorder, source, &plan, &PutOptions::default()).await;

        assert!(matches!(
            result,
            Err(UploadError::PartFailed { part_number: 2, .. })
        ));
        assert_eq!(recorder.parts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_canceled() {
        let recorder = Recorder::default();
        let plan = planner::plan(None, None).unwrap();
        let options = PutOptions::default();
        options.cancel.cancel();
        let source = Source::stream(std::io::Cursor::new(data(10)), None);

        let result = upload(&recorder, source, &plan, &options).await;

        assert!(matches!(result, Err(UploadError::Canceled)));
        assert!(recorder.parts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_canceled_while_waiting_on_stream() {
        let recorder = Recorder::default();
        let plan = planner::plan(None, Some(5 * MIB)).unwrap();
        let options = PutOptions::default();

        // the writer stays open and never sends anything
        let (_writer, reader) = tokio::io::duplex(64);
        let source = Source::stream(reader, None);

        let cancel = options.cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            cancel.cancel();
        });

        let result = timeout(
            Duration::from_secs(3),
            upload(&recorder, source, &plan, &options),
        )
        .await
        .expect("cancel not observed while waiting on the stream");

        assert!(matches!(result, Err(UploadError::Canceled)));
        assert!(recorder.parts.lock().unwrap().is_empty());
    }
}
