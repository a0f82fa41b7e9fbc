//! `DocFile`: a single discovered documentation or asset file, owned by
//! the discovery pass that found it and discarded once its manifest
//! entry is persisted.

use std::collections::BTreeMap;
use std::path::PathBuf;

/// Markdown extensions recognized by the discovery walker.
pub const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown", "mdown", "mkd"];

/// Non-markdown asset extensions preserved alongside docs.
pub const ASSET_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "svg", "webp", "bmp", "ico", "pdf", "mp4", "webm", "ogv", "csv",
    "json", "yaml", "yml", "xml",
];

/// Returns true if `ext` (without leading dot) is a recognized markdown extension.
pub fn is_markdown_extension(ext: &str) -> bool {
    MARKDOWN_EXTENSIONS
        .iter()
        .any(|m| m.eq_ignore_ascii_case(ext))
}

/// Returns true if `ext` (without leading dot) is a recognized asset extension.
pub fn is_asset_extension(ext: &str) -> bool {
    ASSET_EXTENSIONS.iter().any(|a| a.eq_ignore_ascii_case(ext))
}

/// A single discovered documentation or asset file.
#[derive(Debug, Clone)]
pub struct DocFile {
    /// Absolute filesystem path.
    pub path: PathBuf,
    /// Path relative to `docs_base`.
    pub relative_path: String,
    /// The configured doc root this file was found under (e.g. `docs`).
    pub docs_base: String,
    /// Owning repository name.
    pub repository: String,
    /// Forge namespace (github/gitlab/forgejo/...), if namespacing is active.
    pub forge: Option<String>,
    /// Directory component of `relative_path` (empty if at doc root).
    pub section: String,
    /// File stem, without extension.
    pub name: String,
    /// File extension, without the leading dot, lowercased.
    pub extension: String,
    /// False for markdown content, true for binary/asset files.
    pub is_asset: bool,
    /// Metadata inherited from the owning repository's configured tags.
    pub metadata: BTreeMap<String, String>,
    /// Lazily loaded file content; `None` until `load_content` is called.
    pub content: Option<Vec<u8>>,
}

impl DocFile {
    /// Exactly one of `is_asset` or a markdown extension must hold.
    pub fn invariant_holds(&self) -> bool {
        self.is_asset != is_markdown_extension(&self.extension)
    }

    /// The lowercased collision key: `(forge, repository, section, name+extension)`.
    pub fn collision_key(&self) -> (String, String, String, String) {
        (
            self.forge.as_deref().unwrap_or("").to_lowercase(),
            self.repository.to_lowercase(),
            self.section.to_lowercase(),
            format!("{}.{}", self.name, self.extension).to_lowercase(),
        )
    }

    /// Load (or reload) this file's content from disk.
    pub fn load_content(&mut self) -> std::io::Result<&[u8]> {
        let bytes = std::fs::read(&self.path)?;
        self.content = Some(bytes);
        Ok(self.content.as_ref().unwrap())
    }
}
