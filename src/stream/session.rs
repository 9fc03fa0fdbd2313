use crate::stream::{
    error::UploadError,
    manifest::CompletedManifest,
    options::PutOptions,
    transport::{SessionTransport, UploadInfo},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Active,
    Completed,
    Aborted,
}

impl SessionState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Aborted)
    }
}

/// Remote multipart upload handle, owned by one coordinator.
#[derive(Debug)]
pub struct UploadSession {
    session_id: String,
    bucket: String,
    key: String,
    state: SessionState,
}

impl UploadSession {
    /// Initiate the multipart upload.
    ///
    /// # Errors
    ///
    /// Will return `SessionCreateFailed` if the store rejects the request
    pub async fn create<T: SessionTransport + ?Sized>(
        transport: &T,
        bucket: &str,
        key: &str,
        options: &PutOptions,
    ) -> Result<Self, UploadError> {
        let session_id = transport
            .initiate(bucket, key, options)
            .await
            .map_err(UploadError::SessionCreateFailed)?;

        log::debug!("multipart upload {session_id} created for {bucket}/{key}");

        Ok(Self {
            session_id,
            bucket: bucket.to_string(),
            key: key.to_string(),
            state: SessionState::Created,
        })
    }

    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// First part landed.
    pub fn mark_active(&mut self) {
        if self.state == SessionState::Created {
            self.state = SessionState::Active;
        }
    }

    /// Best effort, errors are logged and dropped. Terminal sessions make no
    /// network call.
    pub async fn abort<T: SessionTransport + ?Sized>(&mut self, transport: &T) {
        if self.state.is_terminal() {
            return;
        }

        self.state = SessionState::Aborted;

        match transport
            .abort(&self.bucket, &self.key, &self.session_id)
            .await
        {
            Ok(()) => log::debug!("multipart upload {} aborted", self.session_id),
            Err(e) => log::warn!(
                "could not abort multipart upload {}: {e}",
                self.session_id
            ),
        }
    }

    /// Commit the manifest.
    ///
    /// # Errors
    ///
    /// Will return `SessionClosed` on a terminal session, `InvalidManifest` for
    /// an empty manifest and `CompletionFailed` if the store rejects it
    pub async fn complete<T: SessionTransport + ?Sized>(
        &mut self,
        transport: &T,
        manifest: &CompletedManifest,
    ) -> Result<UploadInfo, UploadError> {
        if self.state.is_terminal() {
            return Err(UploadError::SessionClosed(self.session_id.clone()));
        }

        if manifest.is_empty() {
            return Err(UploadError::InvalidManifest("no parts".to_string()));
        }

        let info = transport
            .complete(&self.bucket, &self.key, &self.session_id, manifest)
            .await
            .map_err(UploadError::CompletionFailed)?;

        self.state = SessionState::Completed;

        log::info!(
            "Completed multipart upload: {}, parts: {}, etag: {}",
            self.session_id,
            manifest.len(),
            info.etag
        );

        Ok(info)
    }
}
