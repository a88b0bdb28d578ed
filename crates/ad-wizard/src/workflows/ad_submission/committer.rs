use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::domain::{AdDraft, AdId};
use super::media::MediaFile;
use super::validation::{validate_for_submit, ValidationError};
use crate::config::WizardConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    Public,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadOptions {
    pub max_size_mb: u64,
    pub access_level: AccessLevel,
}

/// Storage boundary: puts a file in a bucket and returns its public URL.
#[async_trait]
pub trait MediaUploader: Send + Sync {
    async fn upload(
        &self,
        file: &MediaFile,
        bucket: &str,
        options: UploadOptions,
    ) -> Result<String, UploadError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    #[error("upload rejected: {0}")]
    Rejected(String),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// URLs of the uploaded media handed to the record committer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaUrls {
    pub avatar_url: Option<String>,
    pub video_url: Option<String>,
    pub video_thumbnail_url: Option<String>,
}

/// Persistence boundary. A committed record starts its moderation life as
/// pending.
#[async_trait]
pub trait RecordCommitter: Send + Sync {
    async fn commit(
        &self,
        draft: &AdDraft,
        media: &MediaUrls,
        is_super_admin: bool,
    ) -> Result<AdId, CommitError>;
}

/// Collapsed failure kinds reported by the record committer. Messages are
/// relayed as received.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommitError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("schema mismatch, missing column: {0}")]
    MissingColumn(String),
    #[error("required value missing (not-null constraint): {0}")]
    NotNullConstraint(String),
    #[error("commit failed: {0}")]
    Unavailable(String),
}

impl CommitError {
    /// Map a raw backend message onto one of the collapsed kinds.
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        let lowered = message.to_ascii_lowercase();
        if lowered.contains("permission denied") || lowered.contains("row-level security") {
            Self::PermissionDenied(message)
        } else if lowered.contains("column") && lowered.contains("does not exist") {
            Self::MissingColumn(message)
        } else if lowered.contains("not-null constraint") || lowered.contains("null value") {
            Self::NotNullConstraint(message)
        } else {
            Self::Unavailable(message)
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SubmitError {
    #[error("submit is only available from the review step")]
    NotOnReviewStep,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Commit(#[from] CommitError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Committed(AdId),
    /// Another submit was already running; this call did nothing.
    AlreadyInFlight,
}

type SuccessHook = Box<dyn Fn(&AdId) + Send + Sync>;
type FailureHook = Box<dyn Fn(&SubmitError) + Send + Sync>;

/// Optional hooks fired after each submit attempt resolves.
#[derive(Default)]
pub struct SubmissionCallbacks {
    on_success: Option<SuccessHook>,
    on_failure: Option<FailureHook>,
}

impl SubmissionCallbacks {
    pub fn on_success(mut self, hook: impl Fn(&AdId) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Box::new(hook));
        self
    }

    pub fn on_failure(mut self, hook: impl Fn(&SubmitError) + Send + Sync + 'static) -> Self {
        self.on_failure = Some(Box::new(hook));
        self
    }
}

impl fmt::Debug for SubmissionCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubmissionCallbacks")
            .field("on_success", &self.on_success.is_some())
            .field("on_failure", &self.on_failure.is_some())
            .finish()
    }
}

/// Resets the in-flight flag on every exit path.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Validates, uploads media, and commits the draft. At most one submit runs at
/// a time; the draft is left untouched so a failed attempt can be retried.
pub struct SubmissionCommitter<U, C> {
    uploader: Arc<U>,
    committer: Arc<C>,
    callbacks: SubmissionCallbacks,
    in_flight: AtomicBool,
    avatar_bucket: String,
    video_bucket: String,
    avatar_max_mb: u64,
    video_max_mb: u64,
}

impl<U, C> SubmissionCommitter<U, C>
where
    U: MediaUploader + 'static,
    C: RecordCommitter + 'static,
{
    pub fn new(
        uploader: Arc<U>,
        committer: Arc<C>,
        config: &WizardConfig,
        callbacks: SubmissionCallbacks,
    ) -> Self {
        Self {
            uploader,
            committer,
            callbacks,
            in_flight: AtomicBool::new(false),
            avatar_bucket: config.avatar_bucket.clone(),
            video_bucket: config.video_bucket.clone(),
            avatar_max_mb: config.avatar_max_mb(),
            video_max_mb: config.video_max_mb(),
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub async fn submit(
        &self,
        draft: &AdDraft,
        is_super_admin: bool,
    ) -> Result<SubmitOutcome, SubmitError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("submit already in flight, ignoring duplicate");
            return Ok(SubmitOutcome::AlreadyInFlight);
        }
        let _guard = InFlightGuard(&self.in_flight);

        info!(title = %draft.title, is_super_admin, "submitting ad");
        match self.commit_draft(draft, is_super_admin).await {
            Ok(id) => {
                info!(ad_id = %id.0, "ad committed, awaiting moderation");
                if let Some(hook) = &self.callbacks.on_success {
                    hook(&id);
                }
                Ok(SubmitOutcome::Committed(id))
            }
            Err(err) => {
                warn!(error = %err, "ad submission failed");
                if let Some(hook) = &self.callbacks.on_failure {
                    hook(&err);
                }
                Err(err)
            }
        }
    }

    async fn commit_draft(
        &self,
        draft: &AdDraft,
        is_super_admin: bool,
    ) -> Result<AdId, SubmitError> {
        validate_for_submit(draft)?;

        let mut urls = MediaUrls::default();
        if let Some(avatar) = &draft.avatar {
            let options = UploadOptions {
                max_size_mb: self.avatar_max_mb,
                access_level: AccessLevel::Public,
            };
            urls.avatar_url = Some(
                self.uploader
                    .upload(&avatar.file, &self.avatar_bucket, options)
                    .await?,
            );
        }
        if let Some(video) = &draft.video {
            let options = UploadOptions {
                max_size_mb: self.video_max_mb,
                access_level: AccessLevel::Public,
            };
            urls.video_url = Some(
                self.uploader
                    .upload(&video.file, &self.video_bucket, options)
                    .await?,
            );
            urls.video_thumbnail_url = video.thumbnail_url.clone();
        }

        let id = self.committer.commit(draft, &urls, is_super_admin).await?;
        Ok(id)
    }
}
