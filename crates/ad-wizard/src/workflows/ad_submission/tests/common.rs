use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::WizardConfig;
use crate::workflows::ad_submission::{
    AdDraft, AdId, AvatarMedia, CommitError, FileSource, MediaFile, MediaUploader, MediaUrls,
    ObjectUrlRegistry, ProbeError, RecordCommitter, RelationshipStatus, UploadError,
    UploadOptions, VideoLane, VideoProbe,
};

pub(super) const MIB: u64 = 1024 * 1024;

pub(super) fn config() -> WizardConfig {
    WizardConfig::default()
}

pub(super) fn jpeg(name: &str, size_bytes: u64) -> MediaFile {
    MediaFile::new(name, "image/jpeg", size_bytes, FileSource::Picker)
}

pub(super) fn mp4(name: &str, size_bytes: u64) -> MediaFile {
    MediaFile::new(name, "video/mp4", size_bytes, FileSource::DragDrop)
}

pub(super) fn complete_draft() -> AdDraft {
    AdDraft {
        title: "Weekend hikes".to_string(),
        description: "Looking for someone to explore trails with.".to_string(),
        relationship_status: Some(RelationshipStatus::Single),
        looking_for: vec!["Friendship".to_string()],
        location: "Denver".to_string(),
        avatar: Some(AvatarMedia {
            file: jpeg("me.jpg", MIB),
            preview_url: "blob:preview/test/me.jpg".to_string(),
        }),
        ..AdDraft::default()
    }
}

/// Scripted answers for one file name.
#[derive(Debug, Clone)]
pub(super) struct ProbeScript {
    pub delay: Duration,
    pub decodable: Result<bool, ProbeError>,
    pub duration: Result<f64, ProbeError>,
    pub thumbnails: Result<Vec<String>, ProbeError>,
}

impl ProbeScript {
    pub fn lasting(duration_secs: f64) -> Self {
        Self {
            duration: Ok(duration_secs),
            ..Self::default()
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl Default for ProbeScript {
    fn default() -> Self {
        Self {
            delay: Duration::ZERO,
            decodable: Ok(true),
            duration: Ok(30.0),
            thumbnails: Ok(vec![
                "thumb-0".to_string(),
                "thumb-1".to_string(),
                "thumb-2".to_string(),
            ]),
        }
    }
}

#[derive(Default)]
pub(super) struct FakeProbe {
    scripts: Mutex<HashMap<String, ProbeScript>>,
    decode_calls: AtomicUsize,
}

impl FakeProbe {
    pub fn with(self, name: &str, script: ProbeScript) -> Self {
        self.scripts
            .lock()
            .expect("scripts lock")
            .insert(name.to_string(), script);
        self
    }

    pub fn decode_calls(&self) -> usize {
        self.decode_calls.load(Ordering::SeqCst)
    }

    fn script(&self, file: &MediaFile) -> ProbeScript {
        self.scripts
            .lock()
            .expect("scripts lock")
            .get(&file.name)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl VideoProbe for FakeProbe {
    async fn is_decodable(&self, file: &MediaFile) -> Result<bool, ProbeError> {
        self.decode_calls.fetch_add(1, Ordering::SeqCst);
        let script = self.script(file);
        if !script.delay.is_zero() {
            tokio::time::sleep(script.delay).await;
        }
        script.decodable
    }

    async fn duration_secs(&self, file: &MediaFile) -> Result<f64, ProbeError> {
        self.script(file).duration
    }

    async fn thumbnails(&self, file: &MediaFile) -> Result<Vec<String>, ProbeError> {
        self.script(file).thumbnails
    }
}

pub(super) fn video_lane(probe: FakeProbe) -> (VideoLane, Arc<FakeProbe>, Arc<ObjectUrlRegistry>) {
    let probe = Arc::new(probe);
    let registry = Arc::new(ObjectUrlRegistry::default());
    let lane = VideoLane::new(probe.clone(), registry.clone(), &config());
    (lane, probe, registry)
}

#[derive(Debug, Clone, PartialEq)]
pub(super) struct UploadRecord {
    pub name: String,
    pub bucket: String,
    pub options: UploadOptions,
}

#[derive(Default)]
pub(super) struct MemoryUploader {
    uploads: Mutex<Vec<UploadRecord>>,
    failure: Mutex<Option<UploadError>>,
}

impl MemoryUploader {
    pub fn failing(error: UploadError) -> Self {
        Self {
            failure: Mutex::new(Some(error)),
            ..Self::default()
        }
    }

    pub fn uploads(&self) -> Vec<UploadRecord> {
        self.uploads.lock().expect("uploads lock").clone()
    }

    pub fn recover(&self) {
        *self.failure.lock().expect("failure lock") = None;
    }
}

#[async_trait]
impl MediaUploader for MemoryUploader {
    async fn upload(
        &self,
        file: &MediaFile,
        bucket: &str,
        options: UploadOptions,
    ) -> Result<String, UploadError> {
        if let Some(error) = self.failure.lock().expect("failure lock").clone() {
            return Err(error);
        }
        self.uploads.lock().expect("uploads lock").push(UploadRecord {
            name: file.name.clone(),
            bucket: bucket.to_string(),
            options,
        });
        Ok(format!("https://cdn.test/{bucket}/{}", file.name))
    }
}

#[derive(Debug, Clone)]
pub(super) struct CommitRecord {
    pub draft: AdDraft,
    pub media: MediaUrls,
    pub is_super_admin: bool,
}

#[derive(Default)]
pub(super) struct MemoryCommitter {
    commits: Mutex<Vec<CommitRecord>>,
    failure: Mutex<Option<CommitError>>,
    delay: Duration,
}

impl MemoryCommitter {
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn failing(error: CommitError) -> Self {
        Self {
            failure: Mutex::new(Some(error)),
            ..Self::default()
        }
    }

    pub fn commits(&self) -> Vec<CommitRecord> {
        self.commits.lock().expect("commits lock").clone()
    }

    pub fn recover(&self) {
        *self.failure.lock().expect("failure lock") = None;
    }
}

#[async_trait]
impl RecordCommitter for MemoryCommitter {
    async fn commit(
        &self,
        draft: &AdDraft,
        media: &MediaUrls,
        is_super_admin: bool,
    ) -> Result<AdId, CommitError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(error) = self.failure.lock().expect("failure lock").clone() {
            return Err(error);
        }
        let mut commits = self.commits.lock().expect("commits lock");
        commits.push(CommitRecord {
            draft: draft.clone(),
            media: media.clone(),
            is_super_admin,
        });
        Ok(AdId(format!("ad-{}", commits.len())))
    }
}
