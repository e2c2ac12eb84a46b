//! The model zoo: named pretrained artifacts that can be fetched on demand.
//! Virtual `models:` paths are rewritten under the datapath, and the matching
//! artifact is downloaded the first time anything asks for it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{info, warn};

use crate::core::agents::AgentError;

pub const ZOO_PATH_PREFIX: &str = "models:";

/// One downloadable artifact. `version` feeds the build marker, so bumping
/// it invalidates previously fetched copies.
#[async_trait]
pub trait ZooModel: Send + Sync {
    fn name(&self) -> &str;

    fn version(&self) -> Option<String> {
        None
    }

    /// Fetches the artifact's files into `target`, which already exists.
    /// The build marker is written by the caller afterwards.
    async fn download(&self, target: &Path) -> Result<(), AgentError>;
}

#[derive(Default)]
pub struct ZooRegistry {
    models: HashMap<String, Box<dyn ZooModel>>,
}

impl ZooRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, model: Box<dyn ZooModel>) -> Self {
        self.models.insert(model.name().to_owned(), model);
        self
    }

    pub fn get(&self, name: &str) -> Option<&dyn ZooModel> {
        self.models.get(name).map(|model| model.as_ref())
    }
}

/// Rewrites a virtual `models:` path to its on-disk location under
/// `<datapath>/models/`, downloading the artifact first if its build marker
/// is missing or stale. Paths without the prefix pass through untouched; an
/// unregistered artifact is rewritten but not fetched.
pub async fn modelzoo_path(
    zoo: &ZooRegistry,
    datapath: &Path,
    path: &str,
) -> Result<PathBuf, AgentError> {
    let rest = match path.strip_prefix(ZOO_PATH_PREFIX) {
        Some(rest) => rest,
        None => return Ok(PathBuf::from(path)),
    };
    let resolved = datapath.join("models").join(rest);

    let artifact = rest.split('/').next().unwrap_or(rest);
    let model = match zoo.get(artifact) {
        Some(model) => model,
        None => {
            warn!(artifact, "no downloader registered for this zoo path");
            return Ok(resolved);
        }
    };

    let target = datapath.join("models").join(artifact);
    let version = model.version();
    if !fetch_data::built(&target, version.as_deref()) {
        info!(artifact, "downloading model artifact");
        std::fs::create_dir_all(&target)?;
        model.download(&target).await?;
        fetch_data::mark_built(&target, version.as_deref())?;
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FakeModel {
        downloads: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ZooModel for FakeModel {
        fn name(&self) -> &str {
            "fake_retriever"
        }

        fn version(&self) -> Option<String> {
            Some("v1".to_owned())
        }

        async fn download(&self, target: &Path) -> Result<(), AgentError> {
            self.downloads.fetch_add(1, Ordering::SeqCst);
            std::fs::write(target.join("model"), b"weights")?;
            Ok(())
        }
    }

    fn fake_zoo(downloads: &Arc<AtomicUsize>) -> ZooRegistry {
        ZooRegistry::new().register(Box::new(FakeModel {
            downloads: Arc::clone(downloads),
        }))
    }

    #[tokio::test]
    async fn test_plain_paths_pass_through() {
        let zoo = ZooRegistry::new();
        let path = modelzoo_path(&zoo, Path::new("/data"), "/tmp/model")
            .await
            .expect("resolve");
        assert_eq!(path, PathBuf::from("/tmp/model"));
    }

    #[tokio::test]
    async fn test_zoo_path_is_rewritten_and_fetched_once() {
        let downloads = Arc::new(AtomicUsize::new(0));
        let zoo = fake_zoo(&downloads);
        let dir = tempfile::tempdir().expect("tempdir");

        let path = modelzoo_path(&zoo, dir.path(), "models:fake_retriever/model")
            .await
            .expect("resolve");
        assert_eq!(path, dir.path().join("models").join("fake_retriever/model"));
        assert!(path.exists());
        assert_eq!(downloads.load(Ordering::SeqCst), 1);

        // second resolution sees the build marker and skips the download
        modelzoo_path(&zoo, dir.path(), "models:fake_retriever/model")
            .await
            .expect("resolve");
        assert_eq!(downloads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stale_version_triggers_refetch() {
        let downloads = Arc::new(AtomicUsize::new(0));
        let zoo = fake_zoo(&downloads);
        let dir = tempfile::tempdir().expect("tempdir");

        // pretend an older fetch left a marker with a different version
        let target = dir.path().join("models").join("fake_retriever");
        std::fs::create_dir_all(&target).expect("mkdir");
        fetch_data::mark_built(&target, Some("v0")).expect("mark");

        modelzoo_path(&zoo, dir.path(), "models:fake_retriever/model")
            .await
            .expect("resolve");
        assert_eq!(downloads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unregistered_artifact_is_rewritten_but_not_fetched() {
        let zoo = ZooRegistry::new();
        let dir = tempfile::tempdir().expect("tempdir");
        let path = modelzoo_path(&zoo, dir.path(), "models:unknown/model")
            .await
            .expect("resolve");
        assert_eq!(path, dir.path().join("models").join("unknown/model"));
        assert!(!path.exists());
    }
}
