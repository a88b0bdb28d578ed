use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use super::{lock, MediaFile};

/// Host capability that hands out local preview URLs for raw files.
///
/// Every URL obtained from `create` must be passed to `revoke` exactly once,
/// when the media is replaced, removed, or the lane is torn down.
pub trait PreviewUrls: Send + Sync {
    fn create(&self, file: &MediaFile) -> String;
    fn revoke(&self, url: &str);
}

/// In-process registry that tracks which preview URLs are still live.
#[derive(Debug, Default)]
pub struct ObjectUrlRegistry {
    sequence: AtomicU64,
    live: Mutex<BTreeSet<String>>,
}

impl ObjectUrlRegistry {
    pub fn live(&self) -> Vec<String> {
        lock(&self.live).iter().cloned().collect()
    }

    pub fn is_live(&self, url: &str) -> bool {
        lock(&self.live).contains(url)
    }
}

impl PreviewUrls for ObjectUrlRegistry {
    fn create(&self, file: &MediaFile) -> String {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let url = format!("blob:preview/{id}/{}", file.name);
        lock(&self.live).insert(url.clone());
        url
    }

    fn revoke(&self, url: &str) {
        lock(&self.live).remove(url);
    }
}
