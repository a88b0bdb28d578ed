//! Ad submission workflow: access gate, four-step wizard, media lanes,
//! commit, and the moderation feedback loop.

mod access;
mod committer;
mod domain;
mod form;
pub mod media;
mod moderation;
mod navigator;
mod validation;
mod wizard;

#[cfg(test)]
mod tests;

pub use access::{
    AccessDecision, AccessDenied, AccessGate, AccessReason, AdminAuthority, AllowlistAuthority,
    RoleClaimAuthority,
};
pub use committer::{
    AccessLevel, CommitError, MediaUploader, MediaUrls, RecordCommitter, SubmissionCallbacks,
    SubmissionCommitter, SubmitError, SubmitOutcome, UploadError, UploadOptions,
};
pub use domain::{
    AdDraft, AdId, AgeRange, AvatarMedia, BodyType, DraftPatch, ModerationEvent,
    ModerationRecord, ModerationStatus, Profile, ProfileLookup, RelationshipStatus, Session,
    VerificationStatus, VideoMedia, MAX_AGE, MIN_AGE,
};
pub use form::{progress_percent, FormState};
pub use media::{
    AvatarLane, FileSource, LaneError, MediaFile, MediaRejected, ObjectUrlRegistry, PreviewUrls,
    ProbeError, VideoLane, VideoLaneState, VideoProbe, VideoSelection,
};
pub use moderation::{
    signal_for, watch, ModerationError, ModerationFeed, ModerationSignal, ModerationWatcher,
};
pub use navigator::{
    IgnoredReason, NavigationOutcome, StepNavigator, TransitionPhase, WizardStep,
};
pub use validation::{
    validate_basic_info, validate_for_submit, DraftField, FieldError, ValidationError,
    LOOKING_FOR_MESSAGE, MEDIA_REQUIRED_MESSAGE, REQUIRED_FIELDS_MESSAGE,
};
pub use wizard::{AdWizard, PendingSubmit, WizardScreen, WizardServices, WizardView};
