use bytes::Bytes;
use parking_lot::RwLock;
use std::{collections::HashMap, sync::Arc};
use tracing::info;
use uuid::Uuid;

/// Handle to locally held image bytes, renderable as an `<img src>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PreviewRef(Uuid);

impl PreviewRef {
    pub fn id(&self) -> Uuid { self.0 }

    pub fn url(&self) -> String { format!("/preview/{}", self.0) }
}

#[derive(Debug, Clone)]
pub struct PreviewImage {
    pub media_type: String,
    pub bytes: Bytes,
}

/// In-memory registry of live previews. Cloning shares the same registry.
#[derive(Debug, Clone, Default)]
pub struct PreviewStore {
    entries: Arc<RwLock<HashMap<Uuid, PreviewImage>>>,
}

impl PreviewStore {
    pub fn new() -> Self { Self::default() }

    pub fn create(&self, media_type: &str, bytes: Bytes) -> PreviewRef {
        let id = Uuid::new_v4();
        info!("🖼️ Registered preview {} ({}, {} bytes)", id, media_type, bytes.len());
        self.entries.write().insert(id, PreviewImage { media_type: media_type.to_string(), bytes });
        PreviewRef(id)
    }

    pub fn get(&self, id: Uuid) -> Option<PreviewImage> {
        self.entries.read().get(&id).cloned()
    }

    /// Releases the bytes behind `preview`. Later lookups miss.
    pub fn revoke(&self, preview: PreviewRef) -> bool {
        let removed = self.entries.write().remove(&preview.0).is_some();
        if removed {
            info!("🗑️ Revoked preview {}", preview.0);
        }
        removed
    }

    pub fn len(&self) -> usize { self.entries.read().len() }

    pub fn is_empty(&self) -> bool { self.entries.read().is_empty() }
}
