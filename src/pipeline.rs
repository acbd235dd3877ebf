//! Ties the artifact store to the executor: make sure the output directory
//! exists, then run the script once under the configured limit.

use std::time::Duration;

use tracing::{info, warn};

use crate::models::{ExecutionResult, GeneratedImage};
use crate::sandbox::Executor;
use crate::store::{ArtifactStore, StoreError};

#[derive(Debug, Clone)]
pub struct Pipeline {
    store: ArtifactStore,
    executor: Executor,
    timeout: Duration,
}

impl Pipeline {
    pub fn new(store: ArtifactStore, executor: Executor, timeout: Duration) -> Self {
        Self {
            store,
            executor,
            timeout,
        }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Render `code` into the artifact `output_filename`. Only a failure to
    /// prepare the output directory is an error; everything after that is
    /// reported through the [`ExecutionResult`]. No retries.
    pub async fn run(
        &self,
        code: &str,
        output_filename: &str,
    ) -> Result<ExecutionResult, StoreError> {
        self.store.ensure_ready()?;
        Ok(self
            .executor
            .execute(code, self.store.dir(), output_filename, self.timeout)
            .await)
    }

    /// Store an image produced directly by the model as the artifact `name`.
    pub fn save_image(
        &self,
        name: &str,
        image: &GeneratedImage,
    ) -> Result<ExecutionResult, StoreError> {
        if image.data.is_empty() {
            return Ok(ExecutionResult::failure("Model returned an empty image"));
        }
        if image.mime_type != "image/png" {
            warn!(mime_type = %image.mime_type, "image is not PNG, storing bytes as-is");
        }

        let path = self.store.write_artifact(name, &image.data)?;
        info!(path = %path.display(), bytes = image.data.len(), "saved generated image");
        Ok(ExecutionResult::success(path))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn pipeline(dir: &std::path::Path) -> Pipeline {
        Pipeline::new(
            ArtifactStore::new(dir),
            Executor::new("sh"),
            Duration::from_secs(10),
        )
    }

    #[tokio::test]
    async fn test_run_creates_output_dir_first() {
        let root = TempDir::new().unwrap();
        let out = root.path().join("nested").join("outputs");
        let pipeline = pipeline(&out);

        let result = pipeline.run(": > diag1.png\n", "diag1").await.unwrap();

        assert_eq!(result, ExecutionResult::success(out.join("diag1.png")));
        assert_eq!(pipeline.store().names().unwrap(), vec!["diag1"]);
    }

    #[tokio::test]
    async fn test_run_surfaces_directory_errors() {
        let root = TempDir::new().unwrap();
        let blocker = root.path().join("file");
        std::fs::write(&blocker, "not a dir").unwrap();

        let err = pipeline(&blocker.join("outputs"))
            .run(": > x.png\n", "x")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::CreateDir { .. }));
    }

    #[tokio::test]
    async fn test_run_reports_failures_as_results() {
        let root = TempDir::new().unwrap();
        let result = pipeline(root.path())
            .run("echo broken >&2\nexit 2\n", "diag")
            .await
            .unwrap();
        assert_eq!(result, ExecutionResult::failure("broken"));
    }

    #[test]
    fn test_save_image_writes_artifact() {
        let root = TempDir::new().unwrap();
        let pipeline = pipeline(root.path());
        let image = GeneratedImage {
            mime_type: "image/png".to_string(),
            data: vec![0x89, b'P', b'N', b'G'],
            caption: None,
        };

        let result = pipeline.save_image("picture", &image).unwrap();
        let path = root.path().join("picture.png");
        assert_eq!(result, ExecutionResult::success(&path));
        assert_eq!(std::fs::read(path).unwrap(), image.data);

        let empty = GeneratedImage {
            data: Vec::new(),
            ..image
        };
        assert!(!pipeline.save_image("empty", &empty).unwrap().is_success());
    }
}
