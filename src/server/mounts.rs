//! Mount points
//!
//! Maps RTSP mount paths to the factory that builds their session pipelines.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::session::PipelineFactory;

/// Registry of mount paths
///
/// Lookups happen once per accepted session, so reads dominate.
#[derive(Default)]
pub struct MountPoints {
    factories: RwLock<HashMap<String, Arc<dyn PipelineFactory>>>,
}

impl MountPoints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `factory` at `path`, replacing any previous factory there
    pub async fn add_factory(&self, path: impl Into<String>, factory: Arc<dyn PipelineFactory>) {
        let path = normalize(path.into());
        let replaced = self
            .factories
            .write()
            .await
            .insert(path.clone(), factory)
            .is_some();

        tracing::info!(mount = %path, replaced = replaced, "Mount point added");
    }

    /// Detach the factory at `path`. Existing sessions are not affected.
    pub async fn remove_factory(&self, path: &str) -> Option<Arc<dyn PipelineFactory>> {
        let path = normalize(path.to_string());
        let removed = self.factories.write().await.remove(&path);
        if removed.is_some() {
            tracing::info!(mount = %path, "Mount point removed");
        }
        removed
    }

    pub async fn get(&self, path: &str) -> Option<Arc<dyn PipelineFactory>> {
        let path = normalize(path.to_string());
        self.factories.read().await.get(&path).cloned()
    }

    pub async fn contains(&self, path: &str) -> bool {
        self.get(path).await.is_some()
    }

    pub async fn len(&self) -> usize {
        self.factories.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.factories.read().await.is_empty()
    }
}

fn normalize(path: String) -> String {
    if path.starts_with('/') {
        path
    } else {
        format!("/{}", path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PipelineDescription;
    use crate::session::LaunchFactory;

    fn factory(name: &str) -> Arc<dyn PipelineFactory> {
        Arc::new(LaunchFactory::new(PipelineDescription::new(name)))
    }

    #[tokio::test]
    async fn test_add_and_get() {
        let mounts = MountPoints::new();
        mounts.add_factory("/test", factory("a")).await;

        assert!(mounts.contains("/test").await);
        assert!(mounts.contains("test").await);
        assert!(!mounts.contains("/other").await);
        assert_eq!(mounts.len().await, 1);
    }

    #[tokio::test]
    async fn test_replace_and_remove() {
        let mounts = MountPoints::new();
        mounts.add_factory("/test", factory("a")).await;
        mounts.add_factory("/test", factory("b")).await;
        assert_eq!(mounts.len().await, 1);

        assert!(mounts.remove_factory("/test").await.is_some());
        assert!(mounts.remove_factory("/test").await.is_none());
        assert!(mounts.is_empty().await);
    }
}
