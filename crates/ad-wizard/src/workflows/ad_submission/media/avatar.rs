use std::sync::Arc;

use tracing::{debug, info};

use super::{MediaFile, MediaRejected, PreviewUrls};
use crate::workflows::ad_submission::domain::AvatarMedia;

const MIB: u64 = 1024 * 1024;

/// Image lane. Validation is synchronous; the lane owns the attached file and
/// its preview URL until replacement, removal, or drop.
pub struct AvatarLane {
    previews: Arc<dyn PreviewUrls>,
    max_bytes: u64,
    attached: Option<AvatarMedia>,
}

impl AvatarLane {
    pub fn new(previews: Arc<dyn PreviewUrls>, max_bytes: u64) -> Self {
        Self {
            previews,
            max_bytes,
            attached: None,
        }
    }

    pub fn attached(&self) -> Option<&AvatarMedia> {
        self.attached.as_ref()
    }

    /// Validate and attach `file`. A rejection clears whatever was attached.
    ///
    /// Size is checked before type so an oversized file is always reported as
    /// too large.
    pub fn select(&mut self, file: MediaFile) -> Result<&AvatarMedia, MediaRejected> {
        if let Err(rejection) = self.validate(&file) {
            info!(file = %file.name, reason = rejection.kind(), "avatar rejected");
            self.remove();
            return Err(rejection);
        }

        self.release_preview();
        let preview_url = self.previews.create(&file);
        debug!(file = %file.name, source = ?file.source, "avatar attached");
        Ok(self.attached.insert(AvatarMedia { file, preview_url }))
    }

    pub fn remove(&mut self) {
        self.release_preview();
    }

    fn validate(&self, file: &MediaFile) -> Result<(), MediaRejected> {
        if file.size_bytes > self.max_bytes {
            return Err(MediaRejected::TooLarge {
                size_bytes: file.size_bytes,
                limit_mb: self.max_bytes / MIB,
            });
        }
        if !file.is_image() {
            return Err(MediaRejected::InvalidType {
                expected: "image",
                found: file.mime.clone(),
            });
        }
        Ok(())
    }

    fn release_preview(&mut self) {
        if let Some(previous) = self.attached.take() {
            self.previews.revoke(&previous.preview_url);
        }
    }
}

impl Drop for AvatarLane {
    fn drop(&mut self) {
        self.release_preview();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::ad_submission::media::{FileSource, ObjectUrlRegistry};

    fn lane() -> (AvatarLane, Arc<ObjectUrlRegistry>) {
        let registry = Arc::new(ObjectUrlRegistry::default());
        (AvatarLane::new(registry.clone(), 5 * MIB), registry)
    }

    fn jpeg(name: &str, size_bytes: u64) -> MediaFile {
        MediaFile::new(name, "image/jpeg", size_bytes, FileSource::Picker)
    }

    #[test]
    fn attaches_valid_image_with_preview() {
        let (mut lane, registry) = lane();
        let url = lane
            .select(jpeg("me.jpg", 2 * MIB))
            .expect("valid avatar")
            .preview_url
            .clone();
        assert!(registry.is_live(&url));
    }

    #[test]
    fn exactly_five_mib_is_accepted() {
        let (mut lane, _) = lane();
        assert!(lane.select(jpeg("edge.jpg", 5 * MIB)).is_ok());
    }

    #[test]
    fn oversized_wins_over_bad_type() {
        let (mut lane, _) = lane();
        let file = MediaFile::new("doc.pdf", "application/pdf", 6 * MIB, FileSource::DragDrop);
        match lane.select(file) {
            Err(MediaRejected::TooLarge { limit_mb, .. }) => assert_eq!(limit_mb, 5),
            other => panic!("expected too large, got {other:?}"),
        }
    }

    #[test]
    fn rejects_non_images() {
        let (mut lane, _) = lane();
        let file = MediaFile::new("clip.mp4", "video/mp4", MIB, FileSource::Picker);
        let rejection = lane.select(file).expect_err("video is not an avatar");
        assert!(rejection.to_string().contains("invalid file type"));
        assert!(lane.attached().is_none());
    }

    #[test]
    fn replacement_revokes_previous_preview() {
        let (mut lane, registry) = lane();
        let first = lane.select(jpeg("a.jpg", MIB)).expect("first").preview_url.clone();
        let second = lane.select(jpeg("b.jpg", MIB)).expect("second").preview_url.clone();

        assert!(!registry.is_live(&first));
        assert!(registry.is_live(&second));
        assert_eq!(registry.live().len(), 1);
    }

    #[test]
    fn rejection_and_drop_release_previews() {
        let (mut lane, registry) = lane();
        lane.select(jpeg("a.jpg", MIB)).expect("first");
        lane.select(jpeg("huge.jpg", 50 * MIB))
            .expect_err("too large");
        assert!(registry.live().is_empty());

        lane.select(jpeg("b.jpg", MIB)).expect("second");
        drop(lane);
        assert!(registry.live().is_empty());
    }
}
