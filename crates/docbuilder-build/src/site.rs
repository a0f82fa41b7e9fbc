//! Site generation: the final pipeline stage that turns a populated
//! content directory into a built site.

use async_trait::async_trait;
use docbuilder_core::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::process::Command;

/// Renders a content directory into a generated site. The production
/// implementation shells out to an external Hugo-compatible binary;
/// `FakeSiteGenerator` just touches a marker file for tests.
#[async_trait]
pub trait SiteGenerator: Send + Sync {
    async fn generate(&self, content_dir: &Path, output_dir: &Path) -> Result<()>;
}

/// Invokes a configured external binary (e.g. `hugo`) with
/// `--source <content_dir> --destination <output_dir>`.
pub struct HugoSiteGenerator {
    binary_path: PathBuf,
}

impl HugoSiteGenerator {
    pub fn new(binary_path: impl Into<PathBuf>) -> Self {
        HugoSiteGenerator {
            binary_path: binary_path.into(),
        }
    }
}

#[async_trait]
impl SiteGenerator for HugoSiteGenerator {
    async fn generate(&self, content_dir: &Path, output_dir: &Path) -> Result<()> {
        let output = Command::new(&self.binary_path)
            .arg("--source")
            .arg(content_dir)
            .arg("--destination")
            .arg(output_dir)
            .output()
            .await
            .map_err(|e| Error::internal(format!("failed to run site generator: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::internal(format!(
                "site generator exited with failure: {stderr}"
            )));
        }
        Ok(())
    }
}

/// In-memory fake: records every `(content_dir, output_dir)` pair it
/// was called with and touches a marker file in `output_dir`, without
/// invoking any external binary.
#[derive(Default)]
pub struct FakeSiteGenerator {
    calls: Mutex<Vec<(PathBuf, PathBuf)>>,
    should_fail: Mutex<bool>,
}

impl FakeSiteGenerator {
    pub fn new() -> Self {
        FakeSiteGenerator::default()
    }

    pub fn failing(self) -> Self {
        *self.should_fail.lock().unwrap() = true;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl SiteGenerator for FakeSiteGenerator {
    async fn generate(&self, content_dir: &Path, output_dir: &Path) -> Result<()> {
        if *self.should_fail.lock().unwrap() {
            return Err(Error::internal("simulated site generation failure"));
        }
        self.calls
            .lock()
            .unwrap()
            .push((content_dir.to_path_buf(), output_dir.to_path_buf()));
        std::fs::create_dir_all(output_dir)?;
        std::fs::write(output_dir.join(".generated"), "")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fake_generator_touches_marker_file() {
        let tmp = tempfile::tempdir().unwrap();
        let content_dir = tmp.path().join("content");
        let output_dir = tmp.path().join("public");
        std::fs::create_dir_all(&content_dir).unwrap();

        let generator = FakeSiteGenerator::new();
        generator.generate(&content_dir, &output_dir).await.unwrap();
        assert!(output_dir.join(".generated").exists());
        assert_eq!(generator.call_count(), 1);
    }

    #[tokio::test]
    async fn failing_fake_generator_returns_error() {
        let tmp = tempfile::tempdir().unwrap();
        let generator = FakeSiteGenerator::new().failing();
        let result = generator.generate(tmp.path(), tmp.path()).await;
        assert!(result.is_err());
    }
}
