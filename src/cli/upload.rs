use crate::{
    cli::{globals::GlobalArgs, progressbar::Bar},
    s3::S3,
    stream::{PutOptions, Source, UploadCoordinator, UploadInfo},
};
use anyhow::{Context, Result};
use bytesize::ByteSize;
use std::{path::PathBuf, sync::Arc};
use tokio::sync::mpsc::unbounded_channel;

#[derive(Debug)]
pub enum Input {
    File(PathBuf),
    Stdin { size: Option<u64> },
}

/// Upload parsed from the command line
#[derive(Debug)]
pub struct Upload {
    pub bucket: String,
    pub key: String,
    pub input: Input,
    pub options: PutOptions,
}

impl Upload {
    /// # Errors
    ///
    /// Will return `Err` if the file can not be opened
    pub fn source(&self) -> Result<Source> {
        match &self.input {
            Input::File(path) => Source::file(path)
                .with_context(|| format!("unable to open: {}", path.display())),

            Input::Stdin { size } => Ok(Source::stream(tokio::io::stdin(), *size)),
        }
    }
}

/// Upload with a progress bar, Ctrl-C cancels the upload.
///
/// # Errors
///
/// Will return `Err` if the upload fails
pub async fn run(s3: S3, upload: Upload, globals: &GlobalArgs) -> Result<UploadInfo> {
    let source = upload.source()?;

    let (tx, rx) = unbounded_channel();
    let progress = Bar::new(source.size(), globals.quiet).follow(rx);

    let Upload {
        bucket,
        key,
        mut options,
        ..
    } = upload;

    options.progress = Some(tx);
    options.workers = globals.workers;

    let cancel = options.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Canceling upload");
            cancel.cancel();
        }
    });

    let coordinator = UploadCoordinator::new(Arc::new(s3));
    let result = coordinator.put(&bucket, &key, source, &options).await;

    // closes the progress channel
    drop(options);

    let uploaded = progress.await.unwrap_or_default();

    let info = result.with_context(|| format!("unable to upload {bucket}/{key}"))?;

    log::info!(
        "Uploaded {bucket}/{key} ({}), etag: {}",
        ByteSize(uploaded),
        info.etag
    );

    Ok(info)
}
