use async_trait::async_trait;

use super::MediaFile;

/// External video inspection. Calls are never cancelled mid-flight; a
/// superseded lane only discards their results.
#[async_trait]
pub trait VideoProbe: Send + Sync {
    /// Whether the container/codec can be decoded at all.
    async fn is_decodable(&self, file: &MediaFile) -> Result<bool, ProbeError>;

    async fn duration_secs(&self, file: &MediaFile) -> Result<f64, ProbeError>;

    /// Ordered thumbnail candidates; index 0 is the default pick.
    async fn thumbnails(&self, file: &MediaFile) -> Result<Vec<String>, ProbeError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    #[error("probe could not read media: {0}")]
    Unreadable(String),
    #[error("probe unavailable: {0}")]
    Unavailable(String),
}
