use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::media::MediaFile;
use super::validation::{DraftField, ValidationError};

/// Identifier assigned by the record committer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AdId(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipStatus {
    Single,
    Taken,
    Complicated,
}

impl RelationshipStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Single => "Single",
            Self::Taken => "Taken",
            Self::Complicated => "It's complicated",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyType {
    Slim,
    Average,
    Curvy,
    Athletic,
}

impl BodyType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Slim => "Slim",
            Self::Average => "Average",
            Self::Curvy => "Curvy",
            Self::Athletic => "Athletic",
        }
    }
}

pub const MIN_AGE: u8 = 18;
pub const MAX_AGE: u8 = 99;

/// Inclusive age window, always within `MIN_AGE..=MAX_AGE` with `lower <= upper`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeRange {
    lower: u8,
    upper: u8,
}

impl AgeRange {
    pub fn new(lower: u8, upper: u8) -> Result<Self, ValidationError> {
        if lower < MIN_AGE || upper > MAX_AGE {
            return Err(ValidationError::for_field(
                DraftField::AgeRange,
                format!("Age range must stay between {MIN_AGE} and {MAX_AGE}"),
            ));
        }
        if lower > upper {
            return Err(ValidationError::for_field(
                DraftField::AgeRange,
                "Minimum age cannot exceed maximum age",
            ));
        }
        Ok(Self { lower, upper })
    }

    pub fn lower(&self) -> u8 {
        self.lower
    }

    pub fn upper(&self) -> u8 {
        self.upper
    }
}

impl Default for AgeRange {
    fn default() -> Self {
        Self {
            lower: MIN_AGE,
            upper: MAX_AGE,
        }
    }
}

/// Attached, validated avatar image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvatarMedia {
    pub file: MediaFile,
    pub preview_url: String,
}

/// Attached, validated video with its probed duration and chosen thumbnail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMedia {
    pub file: MediaFile,
    pub preview_url: String,
    pub duration_secs: f64,
    pub thumbnail_url: Option<String>,
}

/// In-progress listing assembled across the wizard steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdDraft {
    pub title: String,
    pub description: String,
    pub relationship_status: Option<RelationshipStatus>,
    pub looking_for: Vec<String>,
    pub tags: Vec<String>,
    pub location: String,
    pub age_range: AgeRange,
    pub body_type: Option<BodyType>,
    pub avatar: Option<AvatarMedia>,
    pub video: Option<VideoMedia>,
}

impl AdDraft {
    pub fn has_media(&self) -> bool {
        self.avatar.is_some() || self.video.is_some()
    }
}

/// Partial update merged into an [`AdDraft`]; `None` leaves a field untouched.
///
/// Collections and the age range replace the stored value wholesale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DraftPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub relationship_status: Option<RelationshipStatus>,
    pub looking_for: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub location: Option<String>,
    pub age_range: Option<AgeRange>,
    pub body_type: Option<BodyType>,
}

impl DraftPatch {
    pub fn apply_to(self, draft: &mut AdDraft) {
        if let Some(title) = self.title {
            draft.title = title;
        }
        if let Some(description) = self.description {
            draft.description = description;
        }
        if let Some(status) = self.relationship_status {
            draft.relationship_status = Some(status);
        }
        if let Some(looking_for) = self.looking_for {
            draft.looking_for = dedup_preserving_order(looking_for);
        }
        if let Some(tags) = self.tags {
            draft.tags = dedup_preserving_order(tags);
        }
        if let Some(location) = self.location {
            draft.location = location;
        }
        if let Some(range) = self.age_range {
            draft.age_range = range;
        }
        if let Some(body_type) = self.body_type {
            draft.body_type = Some(body_type);
        }
    }
}

fn dedup_preserving_order(values: Vec<String>) -> Vec<String> {
    let mut seen = Vec::with_capacity(values.len());
    for value in values {
        let value = value.trim().to_string();
        if !value.is_empty() && !seen.contains(&value) {
            seen.push(value);
        }
    }
    seen
}

/// Authenticated identity as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub email: String,
    pub is_authenticated: bool,
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Unverified,
    Pending,
    Verified,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub verification_status: VerificationStatus,
    pub is_premium: bool,
}

/// Profile fetch state; replaces a nullable profile plus a loading flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileLookup {
    Loading,
    NotFound,
    Ready(Profile),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ModerationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

/// Status-change notification published by the moderation authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationEvent {
    pub id: AdId,
    pub old_status: ModerationStatus,
    pub new_status: ModerationStatus,
}

/// Moderation state of a committed ad. Created pending at commit time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationRecord {
    pub id: AdId,
    pub status: ModerationStatus,
    pub created_at: DateTime<Utc>,
}

impl ModerationRecord {
    pub fn pending(id: AdId, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            status: ModerationStatus::Pending,
            created_at,
        }
    }
}
