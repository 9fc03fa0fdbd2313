use crate::{
    s3::limits::MAX_PARTS_PER_UPLOAD,
    stream::{
        error::UploadError,
        options::PutOptions,
        part::{PartResult, PartTask},
        planner::UploadPlan,
        session::UploadSession,
        source::ReadAt,
        transport::{PartUpload, Transport},
    },
};
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

type PartOutcome = Result<PartResult, UploadError>;

// shared, read-only state of the workers
struct Worker {
    transport: Arc<dyn Transport>,
    reader: Arc<dyn ReadAt>,
    bucket: String,
    key: String,
    session_id: String,
    plan: UploadPlan,
    options: PutOptions,
}

// https://docs.aws.amazon.com/AmazonS3/latest/dev/UsingRESTAPImpUpload.html
// * Upload Part, from a pool of workers reading the source at each part offset
/// Upload every part of the plan concurrently.
///
/// Returns the part results in completion order, the session is marked active
/// on the first uploaded part.
///
/// # Errors
///
/// Will return the first failed part, or `SizeMismatch` if the uploaded bytes
/// differ from the planned size
pub async fn upload_multipart(
    transport: &Arc<dyn Transport>,
    session: &mut UploadSession,
    reader: Arc<dyn ReadAt>,
    plan: &UploadPlan,
    options: &PutOptions,
) -> Result<Vec<PartResult>, UploadError> {
    let workers = options.workers().min(usize::from(plan.part_count()));

    log::debug!(
        "Starting parallel upload: {}, parts: {}, part size: {}, workers: {workers}",
        session.session_id(),
        plan.part_count(),
        plan.part_size()
    );

    // every task is queued upfront, then the queue is closed
    let (tasks_tx, tasks_rx) = mpsc::channel::<PartTask>(MAX_PARTS_PER_UPLOAD);
    for task in plan.tasks() {
        if tasks_tx.send(task).await.is_err() {
            break;
        }
    }
    drop(tasks_tx);

    let tasks = Arc::new(Mutex::new(tasks_rx));
    let (results_tx, mut results_rx) = mpsc::channel::<PartOutcome>(MAX_PARTS_PER_UPLOAD);

    // workers stop taking tasks once this function returns
    let halt = CancellationToken::new();
    let _halt = halt.clone().drop_guard();

    let worker = Arc::new(Worker {
        transport: Arc::clone(transport),
        reader,
        bucket: session.bucket().to_string(),
        key: session.key().to_string(),
        session_id: session.session_id().to_string(),
        plan: *plan,
        options: options.clone(),
    });

    for id in 0..workers {
        tokio::spawn(run_worker(
            id,
            Arc::clone(&worker),
            Arc::clone(&tasks),
            results_tx.clone(),
            halt.clone(),
        ));
    }
    drop(results_tx);

    let expected = usize::from(plan.part_count());
    let mut results: Vec<PartResult> = Vec::with_capacity(expected);

    while results.len() < expected {
        match results_rx.recv().await {
            Some(Ok(part)) => {
                session.mark_active();
                results.push(part);
            }

            Some(Err(e)) => {
                log::error!("Parallel upload {} failed: {e}", session.session_id());
                return Err(e);
            }

            // every worker is gone before all the parts arrived
            None => return Err(UploadError::MissingPart(first_missing(&results))),
        }
    }

    let uploaded: u64 = results.iter().map(PartResult::get_size).sum();

    if let Some(expected) = plan.total_size().filter(|total| *total != uploaded) {
        return Err(UploadError::SizeMismatch { expected, uploaded });
    }

    Ok(results)
}

async fn run_worker(
    id: usize,
    worker: Arc<Worker>,
    tasks: Arc<Mutex<mpsc::Receiver<PartTask>>>,
    results: mpsc::Sender<PartOutcome>,
    halt: CancellationToken,
) {
    loop {
        if halt.is_cancelled() {
            break;
        }

        let task = tasks.lock().await.recv().await;

        let Some(task) = task else {
            break;
        };

        if worker.options.cancel.is_cancelled() {
            let _ = results.send(Err(UploadError::Canceled)).await;
            break;
        }

        log::debug!("Worker {id} uploading part: {}", task.part_number());

        let outcome = worker.upload_part(task).await;

        let failed = outcome.is_err();

        if results.send(outcome).await.is_err() || failed {
            break;
        }
    }

    log::debug!("Worker {id} done");
}

impl Worker {
    async fn upload_part(&self, task: PartTask) -> PartOutcome {
        let number = task.part_number();
        let (offset, len) = self.plan.part_range(number);

        // each part gets its own buffer, the transport keeps it as the request body
        let capacity = usize::try_from(len).unwrap_or_default();
        let body = Bytes::from(
            self.reader
                .read_at(Vec::with_capacity(capacity), offset, len)
                .await?,
        );
        let size = body.len() as u64;

        let part = PartUpload {
            bucket: &self.bucket,
            key: &self.key,
            session_id: &self.session_id,
            part_number: number,
            body,
            checksum: None,
            encryption: self.options.encryption.as_ref(),
        };

        let etag = self
            .transport
            .upload_part(part)
            .await
            .map_err(|source| UploadError::PartFailed {
                part_number: number,
                source,
            })?;

        log::info!("Uploaded part: {number}, etag: {etag}");
        self.options.report_progress(size);

        Ok(PartResult::new(number, etag, size))
    }
}

fn first_missing(results: &[PartResult]) -> u16 {
    let mut numbers: Vec<u16> = results.iter().map(PartResult::get_number).collect();
    numbers.sort_unstable();

    (1_u16..)
        .zip(numbers)
        .find(|(expected, number)| expected != number)
        .map_or_else(
            || u16::try_from(results.len() + 1).unwrap_or(u16::MAX),
            |(expected, _)| expected,
        )
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
        s3::checksum::Checksum,
        stream::{
            error::TransportError,
            manifest::CompletedManifest,
            planner,
            transport::{ObjectTransport, PartTransport, SessionTransport, UploadInfo},
        },
    };
    use async_trait::async_trait;
    use std::{collections::BTreeMap, sync::Mutex as StdMutex, time::Duration};

    const MIB: u64 = 1024 * 1024;

    #[derive(Default)]
    struct Recorder {
        parts: StdMutex<BTreeMap<u16, Bytes>>,
        fail_part: Option<u16>,
    }

    #[async_trait]
    impl SessionTransport for Recorder {
        async fn initiate(
            &self,
            _bucket: &str,
            _key: &str,
            _options: &PutOptions,
        ) -> Result<String, TransportError> {
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
            // later parts finish first
            let delay = 20_u64.saturating_sub(u64::from(part.part_number) * 5);
            tokio::time::sleep(Duration::from_millis(delay)).await;

            if self.fail_part == Some(part.part_number) {
                return Err(TransportError::new("InternalError", "part failed").with_status(500));
            }

            self.parts
                .lock()
                .unwrap()
                .insert(part.part_number, part.body);

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

    fn data(size: u64) -> Bytes {
        (0..size).map(|i| (i % 251) as u8).collect::<Vec<u8>>().into()
    }

    #[tokio::test]
    async fn test_upload_multipart() {
        let recorder = Arc::new(Recorder::default());
        let transport: Arc<dyn Transport> = recorder.clone();
        let body = data(17 * MIB);
        let plan = planner::plan(Some(17 * MIB), Some(5 * MIB)).unwrap();
        let options = PutOptions::default();

        let mut session = UploadSession::create(&*transport, "b", "k", &options)
            .await
            .unwrap();

        let results = upload_multipart(
            &transport,
            &mut session,
            Arc::new(body.clone()),
            &plan,
            &options,
        )
        .await
        .unwrap();

        assert_eq!(results.len(), 4);
        assert_eq!(
            session.state(),
            crate::stream::session::SessionState::Active
        );

        let parts = recorder.parts.lock().unwrap();
        let uploaded: Vec<u8> = parts.values().flat_map(|part| part.to_vec()).collect();
        assert_eq!(uploaded, body.to_vec());
        assert_eq!(parts[&4].len() as u64, 2 * MIB);
    }

    #[tokio::test]
    async fn test_upload_multipart_part_failure() {
        let recorder = Arc::new(Recorder {
            fail_part: Some(2),
            ..Default::default()
        });
        let transport: Arc<dyn Transport> = recorder;
        let plan = planner::plan(Some(10 * MIB), Some(5 * MIB)).unwrap();
        let options = PutOptions::default();

        let mut session = UploadSession::create(&*transport, "b", "k", &options)
            .await
            .unwrap();

        let result = upload_multipart(
            &transport,
            &mut session,
            Arc::new(data(10 * MIB)),
            &plan,
            &options,
        )
        .await;

        assert!(matches!(
            result,
            Err(UploadError::PartFailed { part_number: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_upload_multipart_size_mismatch() {
        let transport: Arc<dyn Transport> = Arc::new(Recorder::default());
        // the plan says 12 MiB, the source only has 11 MiB
        let plan = planner::plan(Some(12 * MIB), Some(5 * MIB)).unwrap();
        let options = PutOptions::default();

        let mut session = UploadSession::create(&*transport, "b", "k", &options)
            .await
            .unwrap();

        let result = upload_multipart(
            &transport,
            &mut session,
            Arc::new(data(11 * MIB)),
            &plan,
            &options,
        )
        .await;

        assert!(matches!(
            result,
            Err(UploadError::SizeMismatch {
                expected,
                uploaded
            }) if expected == 12 * MIB && uploaded == 11 * MIB
        ));
    }

    #[tokio::test]
    async fn test_upload_multipart_canceled() {
        let transport: Arc<dyn Transport> = Arc::new(Recorder::default());
        let plan = planner::plan(Some(10 * MIB), Some(5 * MIB)).unwrap();
        let options = PutOptions::default();
        options.cancel.cancel();

        let mut session = UploadSession::create(&*transport, "b", "k", &options)
            .await
            .unwrap();

        let result = upload_multipart(
            &transport,
            &mut session,
            Arc::new(data(10 * MIB)),
            &plan,
            &options,
        )
        .await;

        assert!(matches!(result, Err(UploadError::Canceled)));
    }

    #[test]
    fn test_first_missing() {
        let results = vec![
            PartResult::new(1, String::new(), 1),
            PartResult::new(3, String::new(), 1),
        ];
        assert_eq!(first_missing(&results), 2);
        assert_eq!(first_missing(&results[..1]), 2);
        assert_eq!(first_missing(&[]), 1);
    }
}
