use crate::core::{
    entities::MediaType,
    error::Result,
    storage::{
        content_type, object_name, Method, ObjectStorage, SignedUrl,
        SIGNED_URL_TTL_SECS,
    },
};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;

/// Bucket stand-in keyed by object name.
#[derive(Debug, Clone, Default)]
pub(crate) struct MemoryStorage {
    pub(crate) objects: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryStorage {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn contains(&self, object: &str) -> bool {
        self.objects.read().await.contains_key(object)
    }
}

impl ObjectStorage for MemoryStorage {
    fn signed_url(
        &self,
        method: Method,
        media_type: MediaType,
        file_name: &str,
    ) -> Result<SignedUrl> {
        let object = object_name(media_type, file_name)?;
        Ok(SignedUrl {
            url: format!("memory://bucket/{}?method={}", object, method),
            object,
            content_type: content_type(media_type, file_name),
            method: method.to_string(),
            expires_in: SIGNED_URL_TTL_SECS,
        })
    }

    async fn upload(
        &self,
        media_type: MediaType,
        file_name: &str,
        data: Vec<u8>,
    ) -> Result<()> {
        let object = object_name(media_type, file_name)?;
        self.objects.write().await.insert(object, data);
        Ok(())
    }

    async fn delete(&self, media_type: MediaType, file_name: &str) -> Result<()> {
        let object = object_name(media_type, file_name)?;
        self.objects.write().await.remove(&object);
        Ok(())
    }
}
