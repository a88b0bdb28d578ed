use serde::{Deserialize, Serialize};

/// How the file reached the lane. Both paths share one validation entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileSource {
    DragDrop,
    Picker,
}

/// Raw file handle as handed over by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaFile {
    pub name: String,
    pub mime: String,
    pub size_bytes: u64,
    pub source: FileSource,
}

impl MediaFile {
    pub fn new(
        name: impl Into<String>,
        mime: impl Into<String>,
        size_bytes: u64,
        source: FileSource,
    ) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            size_bytes,
            source,
        }
    }

    /// True when the declared mime parses and its top-level type is `kind`.
    pub fn is_kind(&self, kind: mime::Name<'_>) -> bool {
        self.mime
            .trim()
            .parse::<mime::Mime>()
            .map(|parsed| parsed.type_() == kind)
            .unwrap_or(false)
    }

    pub fn is_image(&self) -> bool {
        self.is_kind(mime::IMAGE)
    }

    pub fn is_video(&self) -> bool {
        self.is_kind(mime::VIDEO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_top_level_type() {
        let jpeg = MediaFile::new("a.jpg", "image/jpeg", 1, FileSource::Picker);
        let mp4 = MediaFile::new("a.mp4", "video/mp4", 1, FileSource::DragDrop);
        let pdf = MediaFile::new("a.pdf", "application/pdf", 1, FileSource::Picker);
        let junk = MediaFile::new("a", "not a mime", 1, FileSource::Picker);

        assert!(jpeg.is_image() && !jpeg.is_video());
        assert!(mp4.is_video() && !mp4.is_image());
        assert!(!pdf.is_image() && !pdf.is_video());
        assert!(!junk.is_image());
    }
}
