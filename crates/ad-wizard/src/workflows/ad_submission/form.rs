use super::domain::{AdDraft, AvatarMedia, DraftPatch, VideoMedia};

/// Points each filled field contributes; the total is out of `PROGRESS_TOTAL`.
const TITLE_POINTS: u32 = 1;
const DESCRIPTION_POINTS: u32 = 1;
const LOOKING_FOR_POINTS: u32 = 1;
const LOCATION_POINTS: u32 = 1;
const BODY_TYPE_POINTS: u32 = 1;
const RELATIONSHIP_POINTS: u32 = 1;
const VIDEO_POINTS: u32 = 2;
const AVATAR_POINTS: u32 = 1;
const TAGS_POINTS: u32 = 1;
const PROGRESS_TOTAL: u32 = 10;

/// Weighted completion of a draft, `0..=100`.
pub fn progress_percent(draft: &AdDraft) -> u8 {
    let filled = |present: bool, points: u32| if present { points } else { 0 };

    let score = filled(!draft.title.trim().is_empty(), TITLE_POINTS)
        + filled(!draft.description.trim().is_empty(), DESCRIPTION_POINTS)
        + filled(!draft.looking_for.is_empty(), LOOKING_FOR_POINTS)
        + filled(!draft.location.trim().is_empty(), LOCATION_POINTS)
        + filled(draft.body_type.is_some(), BODY_TYPE_POINTS)
        + filled(draft.relationship_status.is_some(), RELATIONSHIP_POINTS)
        + filled(draft.video.is_some(), VIDEO_POINTS)
        + filled(draft.avatar.is_some(), AVATAR_POINTS)
        + filled(!draft.tags.is_empty(), TAGS_POINTS);

    let percent = (f64::from(score) / f64::from(PROGRESS_TOTAL) * 100.0).round();
    percent.min(100.0) as u8
}

/// Draft plus its derived progress, recomputed on every mutation.
#[derive(Debug, Clone, Default)]
pub struct FormState {
    draft: AdDraft,
    progress: u8,
}

impl FormState {
    pub fn new(draft: AdDraft) -> Self {
        let progress = progress_percent(&draft);
        Self { draft, progress }
    }

    pub fn draft(&self) -> &AdDraft {
        &self.draft
    }

    pub fn progress_percent(&self) -> u8 {
        self.progress
    }

    /// Shallow-merge `patch` into the draft.
    pub fn update_values(&mut self, patch: DraftPatch) {
        patch.apply_to(&mut self.draft);
        self.recompute();
    }

    pub fn set_avatar(&mut self, avatar: Option<AvatarMedia>) {
        self.draft.avatar = avatar;
        self.recompute();
    }

    pub fn set_video(&mut self, video: Option<VideoMedia>) {
        self.draft.video = video;
        self.recompute();
    }

    /// Drop the draft, e.g. after a successful submit or on close.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn recompute(&mut self) {
        self.progress = progress_percent(&self.draft);
    }
}
