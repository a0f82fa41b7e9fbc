//! Content transformation: extract YAML frontmatter from markdown and
//! produce the bytes that get written to the site output tree.

use async_trait::async_trait;
use docbuilder_core::DocFile;
use docbuilder_core::error::Result;
use gray_matter::engine::YAML;
use gray_matter::Matter;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// One file after transformation: its canonical emitted path and
/// final bytes.
#[derive(Debug, Clone)]
pub struct TransformedFile {
    pub canonical_path: String,
    pub frontmatter: BTreeMap<String, serde_json::Value>,
    pub bytes: Vec<u8>,
}

/// Turns a discovered `DocFile` plus its canonical path into the
/// bytes written to the generated site. Assets pass through
/// unchanged; markdown files get frontmatter parsed and re-serialized
/// with repository metadata folded in.
#[async_trait]
pub trait TransformPipeline: Send + Sync {
    async fn transform(&self, file: &DocFile, canonical_path: &str) -> Result<TransformedFile>;
}

/// Parses YAML frontmatter with `gray_matter` and injects the owning
/// repository's configured tags as additional frontmatter keys
/// (without overwriting keys the document itself already sets).
pub struct MarkdownTransformPipeline {
    matter: Matter<YAML>,
}

impl MarkdownTransformPipeline {
    pub fn new() -> Self {
        MarkdownTransformPipeline {
            matter: Matter::<YAML>::new(),
        }
    }
}

impl Default for MarkdownTransformPipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransformPipeline for MarkdownTransformPipeline {
    async fn transform(&self, file: &DocFile, canonical_path: &str) -> Result<TransformedFile> {
        let content = file
            .content
            .as_ref()
            .ok_or_else(|| docbuilder_core::error::Error::internal("file content not loaded before transform"))?;

        if file.is_asset {
            return Ok(TransformedFile {
                canonical_path: canonical_path.to_string(),
                frontmatter: BTreeMap::new(),
                bytes: content.clone(),
            });
        }

        let text = String::from_utf8_lossy(content);
        let parsed = self.matter.parse(&text);

        let mut frontmatter: BTreeMap<String, serde_json::Value> = parsed
            .data
            .as_ref()
            .and_then(|pod| pod.clone().deserialize::<serde_json::Value>().ok())
            .and_then(|v| v.as_object().cloned())
            .map(|m| m.into_iter().collect())
            .unwrap_or_default();

        for (key, value) in &file.metadata {
            frontmatter
                .entry(key.clone())
                .or_insert_with(|| serde_json::Value::String(value.clone()));
        }

        let rendered = render_markdown(&frontmatter, &parsed.content);

        Ok(TransformedFile {
            canonical_path: canonical_path.to_string(),
            frontmatter,
            bytes: rendered.into_bytes(),
        })
    }
}

fn render_markdown(frontmatter: &BTreeMap<String, serde_json::Value>, body: &str) -> String {
    if frontmatter.is_empty() {
        return body.to_string();
    }
    let yaml = serde_yaml::to_string(frontmatter).unwrap_or_default();
    format!("---\n{yaml}---\n{body}")
}

/// In-memory fake: returns a deterministic transformation without
/// parsing anything, for orchestrator tests that don't exercise the
/// frontmatter pipeline itself.
#[derive(Default)]
pub struct FakeTransformPipeline {
    fail_for: Mutex<Vec<String>>,
}

impl FakeTransformPipeline {
    pub fn new() -> Self {
        FakeTransformPipeline::default()
    }

    pub fn failing_for(self, relative_path: impl Into<String>) -> Self {
        self.fail_for.lock().unwrap().push(relative_path.into());
        self
    }
}

#[async_trait]
impl TransformPipeline for FakeTransformPipeline {
    async fn transform(&self, file: &DocFile, canonical_path: &str) -> Result<TransformedFile> {
        if self.fail_for.lock().unwrap().contains(&file.relative_path) {
            return Err(docbuilder_core::error::Error::internal(format!(
                "simulated transform failure for {}",
                file.relative_path
            )));
        }
        Ok(TransformedFile {
            canonical_path: canonical_path.to_string(),
            frontmatter: BTreeMap::new(),
            bytes: file.content.clone().unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn markdown_file(content: &str) -> DocFile {
        DocFile {
            path: PathBuf::from("/tmp/a.md"),
            relative_path: "a.md".into(),
            docs_base: "docs".into(),
            repository: "repoa".into(),
            forge: None,
            section: "".into(),
            name: "a".into(),
            extension: "md".into(),
            is_asset: false,
            metadata: BTreeMap::new(),
            content: Some(content.as_bytes().to_vec()),
        }
    }

    #[tokio::test]
    async fn extracts_existing_frontmatter() {
        let file = markdown_file("---\ntitle: Hello\n---\nBody text\n");
        let pipeline = MarkdownTransformPipeline::new();
        let out = pipeline.transform(&file, "content/a.md").await.unwrap();
        assert_eq!(
            out.frontmatter.get("title"),
            Some(&serde_json::Value::String("Hello".to_string()))
        );
        assert!(String::from_utf8_lossy(&out.bytes).contains("Body text"));
    }

    #[tokio::test]
    async fn injects_repository_metadata_without_overwriting() {
        let mut file = markdown_file("---\nteam: docs\n---\nBody\n");
        file.metadata.insert("team".to_string(), "platform".to_string());
        file.metadata.insert("visibility".to_string(), "public".to_string());

        let pipeline = MarkdownTransformPipeline::new();
        let out = pipeline.transform(&file, "content/a.md").await.unwrap();
        assert_eq!(
            out.frontmatter.get("team"),
            Some(&serde_json::Value::String("docs".to_string()))
        );
        assert_eq!(
            out.frontmatter.get("visibility"),
            Some(&serde_json::Value::String("public".to_string()))
        );
    }

    #[tokio::test]
    async fn assets_pass_through_unchanged() {
        let mut file = markdown_file("ignored");
        file.is_asset = true;
        file.extension = "png".into();
        file.content = Some(vec![1, 2, 3]);
        let pipeline = MarkdownTransformPipeline::new();
        let out = pipeline.transform(&file, "content/a.png").await.unwrap();
        assert_eq!(out.bytes, vec![1, 2, 3]);
        assert!(out.frontmatter.is_empty());
    }

    #[tokio::test]
    async fn fake_pipeline_honors_failure_injection() {
        let pipeline = FakeTransformPipeline::new().failing_for("a.md");
        let file = markdown_file("body");
        let result = pipeline.transform(&file, "content/a.md").await;
        assert!(result.is_err());
    }
}
