use crate::{
    s3::{checksum::Checksum, limits::MAX_SINGLE_PUT_SIZE_BYTES},
    stream::{
        error::{PlanError, UploadError},
        options::PutOptions,
        source::Source,
        transport::{ObjectTransport, UploadInfo},
    },
};
use bytes::Bytes;
use std::io;

// https://docs.aws.amazon.com/AmazonS3/latest/API/API_PutObject.html
/// Upload the whole object with a single request.
///
/// # Errors
///
/// Will return `Err` if the size is unknown or above the single request limit,
/// the source is shorter than declared or the store rejects the request
pub async fn upload_default<T: ObjectTransport + ?Sized>(
    transport: &T,
    bucket: &str,
    key: &str,
    source: Source,
    options: &PutOptions,
) -> Result<UploadInfo, UploadError> {
    let size = match source.size() {
        Some(size) if size <= MAX_SINGLE_PUT_SIZE_BYTES => size,
        Some(size) => {
            return Err(PlanError::PartSizeTooLarge {
                size,
                max: MAX_SINGLE_PUT_SIZE_BYTES,
            }
            .into());
        }
        None => {
            return Err(UploadError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                "single put requires a known object size",
            )));
        }
    };

    let capacity = usize::try_from(size).unwrap_or_default();
    let mut reader = source.into_reader();
    let body = tokio::select! {
        biased;
        () = options.cancel.cancelled() => return Err(UploadError::Canceled),
        read = reader.read_full(Vec::with_capacity(capacity), size) => read?,
    };

    let uploaded = body.len() as u64;

    if uploaded != size {
        return Err(UploadError::SizeMismatch {
            expected: size,
            uploaded,
        });
    }

    let checksum = options
        .checksum
        .map(|algorithm| Checksum::digest(algorithm, &body));

    log::debug!("Single put: {bucket}/{key}, size: {size}");

    let mut info = transport
        .put_object(bucket, key, Bytes::from(body), checksum.as_ref(), options)
        .await
        .map_err(UploadError::PutFailed)?;

    info.size = uploaded;
    options.report_progress(uploaded);

    log::info!("Uploaded object: {bucket}/{key}, etag: {}", info.etag);

    Ok(info)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::{
        s3::checksum::ChecksumAlgorithm,
        stream::error::TransportError,
    };
    use async_trait::async_trait;
    use std::{sync::Mutex, time::Duration};

    #[derive(Default)]
    struct Recorder {
        puts: Mutex<Vec<(Bytes, Option<Checksum>)>>,
        fail: bool,
    }

    #[async_trait]
    impl ObjectTransport for Recorder {
        async fn put_object(
            &self,
            bucket: &str,
            key: &str,
            body: Bytes,
            checksum: Option<&Checksum>,
            _options: &PutOptions,
        ) -> Result<UploadInfo, TransportError> {
            if self.fail {
                return Err(TransportError::new("EntityTooLarge", "too big").with_status(400));
            }

            self.puts.lock().unwrap().push((body, checksum.cloned()));

            Ok(UploadInfo {
                bucket: bucket.to_string(),
                key: key.to_string(),
                etag: "etag".to_string(),
                ..Default::default()
            })
        }
    }

    #[tokio::test]
    async fn test_upload_default() {
        let recorder = Recorder::default();
        let options = PutOptions {
            checksum: Some(ChecksumAlgorithm::Sha256),
            ..Default::default()
        };
        let source = Source::bytes(Bytes::from_static(b"hello world"));

        let info = upload_default(&recorder, "bucket", "key", source, &options)
            .await
            .unwrap();

        assert_eq!(info.size, 11);
        assert_eq!(info.etag, "etag");

        let puts = recorder.puts.lock().unwrap();
        assert_eq!(puts.len(), 1);
        assert_eq!(puts[0].0.as_ref(), b"hello world");
        assert_eq!(
            puts[0].1.as_ref().map(|c| c.checksum.as_str()),
            Some("uU0nuZNNPgilLlLX2n2r+sSE7+N6U4DukIj3rOLvzek=")
        );
    }

    #[tokio::test]
    async fn test_upload_default_empty_stream() {
        let recorder = Recorder::default();
        let source = Source::stream(&b""[..], Some(0));

        let info = upload_default(&recorder, "bucket", "key", source, &PutOptions::default())
            .await
            .unwrap();

        assert_eq!(info.size, 0);
        assert!(recorder.puts.lock().unwrap()[0].0.is_empty());
    }

    #[tokio::test]
    async fn test_upload_default_short_stream() {
        let recorder = Recorder::default();
        let source = Source::stream(&b"abc"[..], Some(10));

        let result = upload_default(&recorder, "bucket", "key", source, &PutOptions::default()).await;

        assert!(matches!(
            result,
            Err(UploadError::SizeMismatch {
                expected: 10,
                uploaded: 3
            })
        ));
        assert!(recorder.puts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upload_default_failed() {
        let recorder = Recorder {
            fail: true,
            ..Default::default()
        };
        let source = Source::bytes(Bytes::from_static(b"abc"));

        let result = upload_default(&recorder, "bucket", "key", source, &PutOptions::default()).await;

        assert!(matches!(result, Err(UploadError::PutFailed(_))));
    }

    #[tokio::test]
    async fn test_upload_default_unknown_size() {
        let recorder = Recorder::default();
        let source = Source::stream(&b"abc"[..], None);

        let result = upload_default(&recorder, "bucket", "key", source, &PutOptions::default()).await;

        assert!(matches!(result, Err(UploadError::Io(_))));
    }

    #[tokio::test]
    async fn test_upload_default_canceled_while_reading() {
        let recorder = Recorder::default();
        let options = PutOptions::default();
        let (_writer, reader) = tokio::io::duplex(64);
        let source = Source::stream(reader, Some(10));

        let cancel = options.cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            cancel.cancel();
        });

        let result = tokio::time::timeout(
            Duration::from_secs(3),
            upload_default(&recorder, "bucket", "key", source, &options),
        )
        .await
        .expect("single put kept waiting on the stream");

        assert!(matches!(result, Err(UploadError::Canceled)));
        assert!(recorder.puts.lock().unwrap().is_empty());
    }
}
