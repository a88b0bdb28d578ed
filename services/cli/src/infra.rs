use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use ad_wizard::config::WizardConfig;
use ad_wizard::workflows::ad_submission::{
    AdDraft, AdId, AdminAuthority, AllowlistAuthority, CommitError, MediaFile, MediaUploader,
    MediaUrls, ModerationError, ModerationEvent, ModerationFeed, ModerationRecord,
    ModerationStatus, ProbeError, RecordCommitter, RoleClaimAuthority, Session, UploadError,
    UploadOptions, VerificationStatus, VideoProbe,
};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Probe that reports a fixed duration after a short simulated latency.
#[derive(Debug, Clone)]
pub(crate) struct StaticProbe {
    duration_secs: f64,
    latency: Duration,
}

impl StaticProbe {
    pub(crate) fn new(duration_secs: f64, latency: Duration) -> Self {
        Self {
            duration_secs,
            latency,
        }
    }
}

#[async_trait]
impl VideoProbe for StaticProbe {
    async fn is_decodable(&self, file: &MediaFile) -> Result<bool, ProbeError> {
        tokio::time::sleep(self.latency).await;
        Ok(file.is_video())
    }

    async fn duration_secs(&self, _file: &MediaFile) -> Result<f64, ProbeError> {
        Ok(self.duration_secs)
    }

    async fn thumbnails(&self, file: &MediaFile) -> Result<Vec<String>, ProbeError> {
        let step = (self.duration_secs / 4.0).max(1.0);
        Ok((1..=3)
            .map(|n| format!("{}#t={:.0}", file.name, step * f64::from(n)))
            .collect())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryUploader {
    objects: Arc<Mutex<Vec<String>>>,
}

impl InMemoryUploader {
    pub(crate) fn objects(&self) -> Vec<String> {
        lock(&self.objects).clone()
    }
}

#[async_trait]
impl MediaUploader for InMemoryUploader {
    async fn upload(
        &self,
        file: &MediaFile,
        bucket: &str,
        options: UploadOptions,
    ) -> Result<String, UploadError> {
        if file.size_bytes > options.max_size_mb * 1024 * 1024 {
            return Err(UploadError::Rejected(format!(
                "{} exceeds the {} MB bucket limit",
                file.name, options.max_size_mb
            )));
        }
        let url = format!("memory://{bucket}/{}-{}", Uuid::new_v4(), file.name);
        debug!(%url, access_level = ?options.access_level, "stored object");
        lock(&self.objects).push(url.clone());
        Ok(url)
    }
}

/// Per-user moderation event fan-out.
#[derive(Default, Clone)]
pub(crate) struct ChannelModerationFeed {
    subscribers: Arc<Mutex<HashMap<String, Vec<mpsc::Sender<ModerationEvent>>>>>,
}

impl ChannelModerationFeed {
    pub(crate) fn publish(&self, user_id: &str, event: ModerationEvent) {
        let mut subscribers = lock(&self.subscribers);
        if let Some(senders) = subscribers.get_mut(user_id) {
            senders.retain(|sender| match sender.try_send(event.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(%user_id, "moderation subscriber lagging, event dropped");
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            });
        }
    }

    /// Drop every subscription so watchers see the feed close.
    pub(crate) fn shutdown(&self) {
        lock(&self.subscribers).clear();
    }
}

impl ModerationFeed for ChannelModerationFeed {
    fn subscribe(&self, user_id: &str) -> mpsc::Receiver<ModerationEvent> {
        let (tx, rx) = mpsc::channel(32);
        lock(&self.subscribers)
            .entry(user_id.to_string())
            .or_default()
            .push(tx);
        rx
    }
}

#[derive(Debug, Clone)]
pub(crate) struct StoredAd {
    pub(crate) owner: String,
    pub(crate) draft: AdDraft,
    pub(crate) media: MediaUrls,
    pub(crate) moderation: ModerationRecord,
}

/// Ad table stand-in. Every committed record starts pending and moderation
/// decisions are published to the owner's feed.
#[derive(Clone)]
pub(crate) struct InMemoryAdStore {
    owner: String,
    ads: Arc<Mutex<HashMap<AdId, StoredAd>>>,
    feed: ChannelModerationFeed,
}

impl InMemoryAdStore {
    pub(crate) fn new(owner: impl Into<String>, feed: ChannelModerationFeed) -> Self {
        Self {
            owner: owner.into(),
            ads: Arc::new(Mutex::new(HashMap::new())),
            feed,
        }
    }

    pub(crate) fn get(&self, id: &AdId) -> Option<StoredAd> {
        lock(&self.ads).get(id).cloned()
    }

    /// Apply a moderation decision; `Ok(None)` when the ad is unknown.
    pub(crate) fn moderate(
        &self,
        id: &AdId,
        to: ModerationStatus,
    ) -> Result<Option<ModerationEvent>, ModerationError> {
        let (owner, event) = {
            let mut ads = lock(&self.ads);
            let Some(ad) = ads.get_mut(id) else {
                return Ok(None);
            };
            let old_status = ad.moderation.status;
            ad.moderation.transition(to)?;
            (
                ad.owner.clone(),
                ModerationEvent {
                    id: id.clone(),
                    old_status,
                    new_status: to,
                },
            )
        };
        self.feed.publish(&owner, event.clone());
        Ok(Some(event))
    }
}

#[async_trait]
impl RecordCommitter for InMemoryAdStore {
    async fn commit(
        &self,
        draft: &AdDraft,
        media: &MediaUrls,
        is_super_admin: bool,
    ) -> Result<AdId, CommitError> {
        if draft.location.trim().is_empty() {
            return Err(CommitError::classify(
                "null value in column \"location\" violates not-null constraint",
            ));
        }
        let id = AdId(Uuid::new_v4().to_string());
        let stored = StoredAd {
            owner: self.owner.clone(),
            draft: draft.clone(),
            media: media.clone(),
            moderation: ModerationRecord::pending(id.clone(), Utc::now()),
        };
        lock(&self.ads).insert(id.clone(), stored);
        info!(ad_id = %id.0, is_super_admin, "ad stored with pending moderation");
        Ok(id)
    }
}

/// Grants admin when any inner authority does.
pub(crate) struct AnyAuthority(Vec<Box<dyn AdminAuthority>>);

impl AdminAuthority for AnyAuthority {
    fn is_admin(&self, session: &Session) -> bool {
        self.0.iter().any(|authority| authority.is_admin(session))
    }
}

/// Configured allowlist plus the `admin` role claim.
pub(crate) fn admin_authority(config: &WizardConfig) -> Box<dyn AdminAuthority> {
    Box::new(AnyAuthority(vec![
        Box::new(AllowlistAuthority::new(&config.admin_emails)),
        Box::new(RoleClaimAuthority::default()),
    ]))
}

pub(crate) fn parse_decision(raw: &str) -> Result<ModerationStatus, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "pending" => Ok(ModerationStatus::Pending),
        "approved" => Ok(ModerationStatus::Approved),
        "rejected" => Ok(ModerationStatus::Rejected),
        other => Err(format!(
            "unknown moderation decision '{other}' (expected approved, rejected or pending)"
        )),
    }
}

pub(crate) fn parse_verification(raw: &str) -> Result<VerificationStatus, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "unverified" => Ok(VerificationStatus::Unverified),
        "pending" => Ok(VerificationStatus::Pending),
        "verified" => Ok(VerificationStatus::Verified),
        "rejected" => Ok(VerificationStatus::Rejected),
        other => Err(format!(
            "unknown verification status '{other}' (expected unverified, pending, verified or rejected)"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ad_wizard::workflows::ad_submission::FileSource;

    #[test]
    fn parses_verification_case_insensitively() {
        assert_eq!(parse_verification(" Verified "), Ok(VerificationStatus::Verified));
        assert!(parse_verification("maybe").is_err());
    }

    #[test]
    fn role_claim_or_allowlist_grants_admin() {
        let config = WizardConfig {
            admin_emails: vec!["ops@ads.test".to_string()],
            ..WizardConfig::default()
        };
        let authority = admin_authority(&config);
        let mut session = Session {
            id: "u".to_string(),
            email: "OPS@ads.test".to_string(),
            is_authenticated: true,
            roles: Vec::new(),
        };
        assert!(authority.is_admin(&session));

        session.email = "member@ads.test".to_string();
        assert!(!authority.is_admin(&session));
        session.roles.push("admin".to_string());
        assert!(authority.is_admin(&session));
    }

    #[tokio::test]
    async fn store_publishes_moderation_to_owner_feed() {
        let feed = ChannelModerationFeed::default();
        let mut events = feed.subscribe("user-1");
        let store = InMemoryAdStore::new("user-1", feed.clone());
        let draft = AdDraft {
            location: "Oslo".to_string(),
            ..AdDraft::default()
        };

        let id = store
            .commit(&draft, &MediaUrls::default(), false)
            .await
            .expect("commit");
        assert_eq!(
            store.get(&id).map(|ad| ad.moderation.status),
            Some(ModerationStatus::Pending)
        );

        let event = store
            .moderate(&id, ModerationStatus::Approved)
            .expect("legal")
            .expect("known ad");
        assert_eq!(events.recv().await, Some(event));
        assert!(store.moderate(&id, ModerationStatus::Pending).is_err());
        assert_eq!(
            store.moderate(&AdId("missing".to_string()), ModerationStatus::Rejected),
            Ok(None)
        );
    }

    #[tokio::test]
    async fn uploader_enforces_bucket_limit() {
        let uploader = InMemoryUploader::default();
        let file = MediaFile::new("big.mp4", "video/mp4", 6 * 1024 * 1024, FileSource::Picker);
        let options = UploadOptions {
            max_size_mb: 5,
            access_level: ad_wizard::workflows::ad_submission::AccessLevel::Public,
        };

        assert!(matches!(
            uploader.upload(&file, "ad-images", options).await,
            Err(UploadError::Rejected(_))
        ));
        assert!(uploader.objects().is_empty());
    }
}
