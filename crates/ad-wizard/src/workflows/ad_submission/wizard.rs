use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::access::{AccessDecision, AccessGate, AccessReason};
use super::committer::{
    MediaUploader, RecordCommitter, SubmissionCallbacks, SubmissionCommitter, SubmitError,
    SubmitOutcome,
};
use super::domain::{AdDraft, AdId, DraftPatch, ProfileLookup, Session};
use super::form::FormState;
use super::media::{
    AvatarLane, LaneError, MediaFile, PreviewUrls, VideoLane, VideoLaneState, VideoProbe,
    VideoSelection,
};
use super::navigator::{IgnoredReason, NavigationOutcome, StepNavigator, WizardStep};
use super::validation::{validate_basic_info, FieldError};
use crate::config::WizardConfig;

/// Top-level screen shown by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "screen", content = "detail", rename_all = "snake_case")]
pub enum WizardScreen {
    Unauthenticated,
    Blocked(AccessDecision),
    Editing,
    Success(AdId),
}

/// External collaborators a wizard instance needs.
pub struct WizardServices<U, C> {
    pub probe: Arc<dyn VideoProbe>,
    pub previews: Arc<dyn PreviewUrls>,
    pub uploader: Arc<U>,
    pub committer: Arc<C>,
}

type CompletionHook = Arc<dyn Fn(&AdId) + Send + Sync>;

/// Fires the completion hook after the post-success delay; aborted on drop.
struct CloseTimer(JoinHandle<()>);

impl Drop for CloseTimer {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// A submit detached from the wizard borrow, so the host can keep rendering
/// while it runs. Hand the result back through [`AdWizard::apply_submit`].
pub struct PendingSubmit<U, C> {
    submission: Arc<SubmissionCommitter<U, C>>,
    draft: AdDraft,
    is_super_admin: bool,
}

impl<U, C> PendingSubmit<U, C>
where
    U: MediaUploader + 'static,
    C: RecordCommitter + 'static,
{
    pub async fn run(self) -> Result<SubmitOutcome, SubmitError> {
        self.submission.submit(&self.draft, self.is_super_admin).await
    }
}

/// Snapshot of everything the host renders.
#[derive(Debug, Clone, Serialize)]
pub struct WizardView {
    pub screen: WizardScreen,
    pub step: WizardStep,
    pub step_index: usize,
    pub direction: i8,
    pub is_transitioning: bool,
    pub progress_percent: u8,
    pub draft: AdDraft,
    pub validation_errors: Vec<FieldError>,
    pub video_state: VideoLaneState,
    pub video_progress: Option<f32>,
    pub is_submitting: bool,
}

/// One ad-creation session: gate, navigator, form, media lanes, and submit.
/// All state is scoped to the instance.
pub struct AdWizard<U, C> {
    config: WizardConfig,
    access: AccessDecision,
    screen: WizardScreen,
    navigator: StepNavigator,
    form: FormState,
    avatar: AvatarLane,
    video: VideoLane,
    submission: Arc<SubmissionCommitter<U, C>>,
    validation_errors: Vec<FieldError>,
    /// Step the errors were produced on; they are hidden on any other step.
    errors_step: WizardStep,
    on_complete: Option<CompletionHook>,
    close_timer: Option<CloseTimer>,
}

impl<U, C> AdWizard<U, C>
where
    U: MediaUploader + 'static,
    C: RecordCommitter + 'static,
{
    pub fn open(
        gate: &AccessGate,
        session: Option<&Session>,
        profile: ProfileLookup,
        config: WizardConfig,
        services: WizardServices<U, C>,
        callbacks: SubmissionCallbacks,
    ) -> Self {
        let access = gate.evaluate(session, profile);
        let screen = if access.can_access {
            WizardScreen::Editing
        } else if access.has_reason(AccessReason::NotLoggedIn) {
            WizardScreen::Unauthenticated
        } else {
            WizardScreen::Blocked(access.clone())
        };

        let WizardServices {
            probe,
            previews,
            uploader,
            committer,
        } = services;

        Self {
            navigator: StepNavigator::new(config.settle_delay),
            form: FormState::default(),
            avatar: AvatarLane::new(previews.clone(), config.avatar_max_bytes),
            video: VideoLane::new(probe, previews, &config),
            submission: Arc::new(SubmissionCommitter::new(
                uploader,
                committer,
                &config,
                callbacks,
            )),
            config,
            access,
            screen,
            validation_errors: Vec::new(),
            errors_step: WizardStep::BasicInfo,
            on_complete: None,
            close_timer: None,
        }
    }

    /// Hook fired once the post-success delay has elapsed.
    pub fn with_completion(mut self, hook: impl Fn(&AdId) + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Arc::new(hook));
        self
    }

    pub fn access(&self) -> &AccessDecision {
        &self.access
    }

    pub fn screen(&self) -> &WizardScreen {
        &self.screen
    }

    pub fn navigator(&self) -> &StepNavigator {
        &self.navigator
    }

    pub fn current_step(&self) -> WizardStep {
        self.navigator.current()
    }

    pub fn draft(&self) -> &AdDraft {
        self.form.draft()
    }

    pub fn progress_percent(&self) -> u8 {
        self.form.progress_percent()
    }

    /// Errors for the active step only.
    pub fn validation_errors(&self) -> &[FieldError] {
        if self.navigator.current() == self.errors_step {
            self.validation_errors.as_slice()
        } else {
            &[]
        }
    }

    fn record_errors(&mut self, step: WizardStep, errors: Vec<FieldError>) {
        self.errors_step = step;
        self.validation_errors = errors;
    }

    pub fn is_submitting(&self) -> bool {
        self.submission.is_submitting()
    }

    fn is_editing(&self) -> bool {
        self.screen == WizardScreen::Editing
    }

    pub fn update_values(&mut self, patch: DraftPatch) {
        if !self.is_editing() {
            return;
        }
        self.form.update_values(patch);
        if self.navigator.current() == WizardStep::BasicInfo {
            let errors = validate_basic_info(self.form.draft());
            self.record_errors(WizardStep::BasicInfo, errors);
        }
    }

    pub fn next(&mut self) -> NavigationOutcome {
        if !self.is_editing() {
            return NavigationOutcome::Ignored(IgnoredReason::WorkflowLocked);
        }
        self.navigator.next()
    }

    pub fn prev(&mut self) -> NavigationOutcome {
        if !self.is_editing() {
            return NavigationOutcome::Ignored(IgnoredReason::WorkflowLocked);
        }
        self.navigator.prev()
    }

    pub fn jump_to(&mut self, index: usize) -> NavigationOutcome {
        if !self.is_editing() {
            return NavigationOutcome::Ignored(IgnoredReason::WorkflowLocked);
        }
        self.navigator.jump_to(index)
    }

    /// Wait out the settle delay of a pending transition. Transitions also
    /// settle on their own once the delay has elapsed.
    pub async fn settle(&mut self) -> Option<WizardStep> {
        self.navigator.settle().await
    }

    pub fn select_avatar(&mut self, file: MediaFile) -> Result<(), LaneError> {
        if !self.is_editing() {
            return Err(LaneError::WorkflowLocked);
        }
        let result = self.avatar.select(file).map(|_| ());
        self.form.set_avatar(self.avatar.attached().cloned());
        result.map_err(LaneError::from)
    }

    pub fn remove_avatar(&mut self) {
        if !self.is_editing() {
            return;
        }
        self.avatar.remove();
        self.form.set_avatar(None);
    }

    /// Handle to the video lane, for hosts that run a selection on their own
    /// task while navigation continues. Call [`sync_video`](Self::sync_video)
    /// once it resolves.
    pub fn video_lane(&self) -> VideoLane {
        self.video.clone()
    }

    pub async fn select_video(&mut self, file: MediaFile) -> Result<VideoSelection, LaneError> {
        if !self.is_editing() {
            return Err(LaneError::WorkflowLocked);
        }
        let result = self.video.select(file).await;
        self.sync_video();
        result
    }

    pub fn select_video_thumbnail(&mut self, index: usize) -> Result<(), LaneError> {
        if !self.is_editing() {
            return Err(LaneError::WorkflowLocked);
        }
        self.video.select_thumbnail(index)?;
        self.sync_video();
        Ok(())
    }

    pub fn remove_video(&mut self) {
        if !self.is_editing() {
            return;
        }
        self.video.clear();
        self.sync_video();
    }

    /// Copy the lane's attached video (or its absence) into the draft.
    pub fn sync_video(&mut self) {
        let attached = self.video.attached();
        if attached.as_ref() != self.form.draft().video.as_ref() {
            self.form.set_video(attached);
        }
    }

    /// Validate and commit from the Review step. On success the draft is
    /// discarded and the completion hook fires after the close delay; on
    /// failure the draft is kept for a retry.
    pub async fn submit(&mut self) -> Result<SubmitOutcome, SubmitError> {
        let outcome = self.prepare_submit()?.run().await;
        self.apply_submit(&outcome);
        outcome
    }

    /// Snapshot the draft for a submit that runs outside the wizard borrow.
    /// While it runs, [`is_submitting`](Self::is_submitting) reports true and
    /// any further submit resolves to [`SubmitOutcome::AlreadyInFlight`].
    pub fn prepare_submit(&mut self) -> Result<PendingSubmit<U, C>, SubmitError> {
        if !self.is_editing()
            || self.navigator.current() != WizardStep::Review
            || self.navigator.is_transitioning()
        {
            return Err(SubmitError::NotOnReviewStep);
        }
        self.sync_video();
        Ok(PendingSubmit {
            submission: self.submission.clone(),
            draft: self.form.draft().clone(),
            is_super_admin: self.access.admin_override,
        })
    }

    /// Fold the result of a [`PendingSubmit`] back into the wizard.
    pub fn apply_submit(&mut self, outcome: &Result<SubmitOutcome, SubmitError>) {
        if !self.is_editing() {
            return;
        }
        match outcome {
            Ok(SubmitOutcome::Committed(id)) => self.complete(id.clone()),
            Ok(SubmitOutcome::AlreadyInFlight) => {}
            Err(SubmitError::Validation(error)) => {
                self.record_errors(WizardStep::Review, error.errors().to_vec());
            }
            Err(_) => {}
        }
    }

    fn complete(&mut self, id: AdId) {
        self.validation_errors.clear();
        self.discard_media_and_draft();
        self.screen = WizardScreen::Success(id.clone());

        if let Some(hook) = self.on_complete.clone() {
            let delay = self.config.close_delay;
            debug!(ad_id = %id.0, ?delay, "scheduling wizard close");
            self.close_timer = Some(CloseTimer(tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                hook(&id);
            })));
        }
    }

    /// Tear down the instance state: draft, previews, timers.
    pub fn close(&mut self) {
        self.close_timer = None;
        self.discard_media_and_draft();
        info!("ad wizard closed");
    }

    fn discard_media_and_draft(&mut self) {
        self.avatar.remove();
        self.video.clear();
        self.form.reset();
    }

    pub fn view(&self) -> WizardView {
        WizardView {
            screen: self.screen.clone(),
            step: self.navigator.current(),
            step_index: self.navigator.current().index(),
            direction: self.navigator.direction(),
            is_transitioning: self.navigator.is_transitioning(),
            progress_percent: self.form.progress_percent(),
            draft: self.form.draft().clone(),
            validation_errors: self.validation_errors().to_vec(),
            video_state: self.video.state(),
            video_progress: self.video.progress(),
            is_submitting: self.submission.is_submitting(),
        }
    }
}
