use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::progress::{ProgressCell, ProgressTicker, PROGRESS_COMPLETE};
use super::{lock, LaneError, MediaFile, MediaRejected, PreviewUrls, ProbeError, VideoProbe};
use crate::config::WizardConfig;
use crate::workflows::ad_submission::domain::VideoMedia;

/// Idle -> Validating -> (Failed | Processing) -> (Ready | Failed).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum VideoLaneState {
    Idle,
    /// Local mime and size checks.
    Validating,
    /// Waiting on the external probes and thumbnail extraction.
    Processing,
    Ready,
    Failed(String),
}

impl VideoLaneState {
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Validating | Self::Processing)
    }
}

/// Result of a selection that was not rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum VideoSelection {
    Ready(VideoMedia),
    /// A newer selection or a clear happened while this one was in flight;
    /// its result was discarded.
    Superseded,
}

#[derive(Debug, Clone)]
struct VideoAsset {
    file: MediaFile,
    preview_url: String,
    duration_secs: f64,
    thumbnails: Vec<String>,
    selected_thumbnail: usize,
}

impl VideoAsset {
    fn to_media(&self) -> VideoMedia {
        VideoMedia {
            file: self.file.clone(),
            preview_url: self.preview_url.clone(),
            duration_secs: self.duration_secs,
            thumbnail_url: self.thumbnails.get(self.selected_thumbnail).cloned(),
        }
    }
}

struct ProbedVideo {
    duration_secs: f64,
    thumbnails: Vec<String>,
}

#[derive(Debug, Clone)]
struct VideoLimits {
    max_bytes: u64,
    max_seconds: f64,
    progress_tick: Duration,
}

struct LaneSlot {
    state: VideoLaneState,
    /// Bumped on every selection and clear; in-flight results carrying an
    /// older value are dropped.
    generation: u64,
    progress: ProgressCell,
    ticker: Option<ProgressTicker>,
    asset: Option<VideoAsset>,
}

struct LaneShared {
    slot: Mutex<LaneSlot>,
    previews: Arc<dyn PreviewUrls>,
}

impl LaneShared {
    fn release_asset(&self, slot: &mut LaneSlot) {
        if let Some(asset) = slot.asset.take() {
            self.previews.revoke(&asset.preview_url);
        }
    }
}

impl Drop for LaneShared {
    fn drop(&mut self) {
        let slot = self.slot.get_mut().unwrap_or_else(|poisoned| poisoned.into_inner());
        slot.ticker = None;
        if let Some(asset) = slot.asset.take() {
            self.previews.revoke(&asset.preview_url);
        }
    }
}

/// Resets the lane when a selection future is dropped before it resolves, so
/// a timed-out or aborted host task never leaves the lane busy.
struct AbandonGuard<'a> {
    shared: &'a LaneShared,
    generation: u64,
    armed: bool,
}

impl AbandonGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for AbandonGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut slot = lock(&self.shared.slot);
        if slot.generation != self.generation {
            return;
        }
        slot.ticker = None;
        *lock(&slot.progress) = None;
        slot.state = VideoLaneState::Idle;
        debug!(generation = self.generation, "video selection abandoned, lane reset");
    }
}

/// Video lane. Cloning yields another handle to the same lane, so a host can
/// keep navigating or clear the lane while a selection is awaiting probes.
#[derive(Clone)]
pub struct VideoLane {
    shared: Arc<LaneShared>,
    probe: Arc<dyn VideoProbe>,
    limits: VideoLimits,
}

impl VideoLane {
    pub fn new(
        probe: Arc<dyn VideoProbe>,
        previews: Arc<dyn PreviewUrls>,
        config: &WizardConfig,
    ) -> Self {
        Self {
            shared: Arc::new(LaneShared {
                slot: Mutex::new(LaneSlot {
                    state: VideoLaneState::Idle,
                    generation: 0,
                    progress: Arc::new(Mutex::new(None)),
                    ticker: None,
                    asset: None,
                }),
                previews,
            }),
            probe,
            limits: VideoLimits {
                max_bytes: config.video_max_bytes,
                max_seconds: config.video_max_seconds,
                progress_tick: config.progress_tick,
            },
        }
    }

    pub fn state(&self) -> VideoLaneState {
        lock(&self.shared.slot).state.clone()
    }

    pub fn is_busy(&self) -> bool {
        lock(&self.shared.slot).state.is_busy()
    }

    /// Simulated progress in percent, `None` when nothing is shown.
    pub fn progress(&self) -> Option<f32> {
        let slot = lock(&self.shared.slot);
        let value = *lock(&slot.progress);
        value
    }

    pub fn has_active_ticker(&self) -> bool {
        lock(&self.shared.slot)
            .ticker
            .as_ref()
            .map(ProgressTicker::is_running)
            .unwrap_or(false)
    }

    pub fn attached(&self) -> Option<VideoMedia> {
        lock(&self.shared.slot).asset.as_ref().map(VideoAsset::to_media)
    }

    pub fn thumbnails(&self) -> Vec<String> {
        lock(&self.shared.slot)
            .asset
            .as_ref()
            .map(|asset| asset.thumbnails.clone())
            .unwrap_or_default()
    }

    /// Validate and attach `file`. Inert while a previous file is still being
    /// validated or processed.
    pub async fn select(&self, file: MediaFile) -> Result<VideoSelection, LaneError> {
        let generation = self.begin(&file, false)?;
        self.run(generation, file).await
    }

    /// Like [`select`](Self::select) but supersedes an in-flight selection:
    /// its ticker is cancelled and its eventual result discarded.
    pub async fn replace(&self, file: MediaFile) -> Result<VideoSelection, LaneError> {
        let generation = self.begin(&file, true)?;
        self.run(generation, file).await
    }

    /// Pick another extracted thumbnail without re-running validation.
    pub fn select_thumbnail(&self, index: usize) -> Result<VideoMedia, LaneError> {
        let mut slot = lock(&self.shared.slot);
        let asset = slot.asset.as_mut().ok_or(LaneError::NotReady)?;
        if index >= asset.thumbnails.len() {
            return Err(LaneError::ThumbnailOutOfRange {
                index,
                available: asset.thumbnails.len(),
            });
        }
        asset.selected_thumbnail = index;
        Ok(asset.to_media())
    }

    /// Drop the attached video and invalidate anything in flight.
    pub fn clear(&self) {
        let mut slot = lock(&self.shared.slot);
        slot.generation += 1;
        slot.ticker = None;
        *lock(&slot.progress) = None;
        slot.state = VideoLaneState::Idle;
        self.shared.release_asset(&mut slot);
        debug!(generation = slot.generation, "video lane cleared");
    }

    fn begin(&self, file: &MediaFile, supersede: bool) -> Result<u64, LaneError> {
        let mut slot = lock(&self.shared.slot);
        if slot.state.is_busy() && !supersede {
            debug!(file = %file.name, "video lane busy, selection ignored");
            return Err(LaneError::Busy);
        }

        slot.generation += 1;
        // Replacing the ticker drops (and aborts) the previous one.
        slot.ticker = None;
        self.shared.release_asset(&mut slot);

        let progress: ProgressCell = Arc::new(Mutex::new(Some(0.0)));
        slot.ticker = Some(ProgressTicker::start(
            progress.clone(),
            self.limits.progress_tick,
        ));
        slot.progress = progress;
        slot.state = VideoLaneState::Validating;

        info!(
            file = %file.name,
            source = ?file.source,
            size_bytes = file.size_bytes,
            generation = slot.generation,
            "video validation started"
        );
        Ok(slot.generation)
    }

    async fn run(&self, generation: u64, file: MediaFile) -> Result<VideoSelection, LaneError> {
        let abandoned = AbandonGuard {
            shared: self.shared.as_ref(),
            generation,
            armed: true,
        };
        let outcome = self.pipeline(generation, &file).await;
        abandoned.disarm();
        self.finish(generation, file, outcome)
    }

    async fn pipeline(
        &self,
        generation: u64,
        file: &MediaFile,
    ) -> Result<ProbedVideo, MediaRejected> {
        if !file.is_video() {
            return Err(MediaRejected::InvalidType {
                expected: "video",
                found: file.mime.clone(),
            });
        }
        if file.size_bytes > self.limits.max_bytes {
            return Err(MediaRejected::TooLarge {
                size_bytes: file.size_bytes,
                limit_mb: self.limits.max_bytes / (1024 * 1024),
            });
        }

        self.mark_processing(generation);

        match self.probe.is_decodable(file).await {
            Ok(true) => {}
            Ok(false) => return Err(MediaRejected::InvalidFormat),
            Err(err) => return Err(probe_failure(err)),
        }

        let duration_secs = self
            .probe
            .duration_secs(file)
            .await
            .map_err(probe_failure)?;
        if !duration_secs.is_finite() {
            return Err(MediaRejected::InvalidFormat);
        }
        if duration_secs > self.limits.max_seconds {
            return Err(MediaRejected::TooLong {
                duration_secs,
                max_secs: self.limits.max_seconds,
            });
        }

        let thumbnails = match self.probe.thumbnails(file).await {
            Ok(candidates) => candidates,
            Err(err) => {
                warn!(file = %file.name, error = %err, "thumbnail extraction failed");
                Vec::new()
            }
        };

        Ok(ProbedVideo {
            duration_secs,
            thumbnails,
        })
    }

    fn mark_processing(&self, generation: u64) {
        let mut slot = lock(&self.shared.slot);
        if slot.generation == generation {
            slot.state = VideoLaneState::Processing;
        }
    }

    fn finish(
        &self,
        generation: u64,
        file: MediaFile,
        outcome: Result<ProbedVideo, MediaRejected>,
    ) -> Result<VideoSelection, LaneError> {
        let mut slot = lock(&self.shared.slot);
        if slot.generation != generation {
            debug!(
                file = %file.name,
                stale = generation,
                current = slot.generation,
                "discarding superseded video result"
            );
            return Ok(VideoSelection::Superseded);
        }

        slot.ticker = None;
        match outcome {
            Ok(probed) => {
                let preview_url = self.shared.previews.create(&file);
                let asset = VideoAsset {
                    file,
                    preview_url,
                    duration_secs: probed.duration_secs,
                    thumbnails: probed.thumbnails,
                    selected_thumbnail: 0,
                };
                let media = asset.to_media();
                slot.asset = Some(asset);
                slot.state = VideoLaneState::Ready;
                *lock(&slot.progress) = Some(PROGRESS_COMPLETE);
                info!(
                    file = %media.file.name,
                    duration_secs = media.duration_secs,
                    "video ready"
                );
                Ok(VideoSelection::Ready(media))
            }
            Err(rejection) => {
                slot.state = VideoLaneState::Failed(rejection.to_string());
                *lock(&slot.progress) = None;
                info!(file = %file.name, reason = rejection.kind(), "video rejected");
                Err(LaneError::Rejected(rejection))
            }
        }
    }
}

fn probe_failure(err: ProbeError) -> MediaRejected {
    debug!(error = %err, "probe failed, treating as undecodable");
    MediaRejected::InvalidFormat
}
