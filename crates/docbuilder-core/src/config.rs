//! Repository configuration domain types shared by discovery, delta
//! analysis, and the build orchestrator. The on-disk YAML shape that
//! produces these lives in `docbuilder-build::config`; this module
//! only holds the types every crate downstream of it needs.

use std::collections::BTreeMap;

/// Doc roots checked when none are configured for a repository.
pub const DEFAULT_DOC_ROOTS: &[&str] = &["docs", "documentation"];

/// Forge-namespacing policy applied to emitted site paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForgeNamespacing {
    /// Always prefix emitted paths with the repository's forge type.
    Always,
    /// Never prefix emitted paths, regardless of how many forges are seen.
    Never,
    /// Prefix iff more than one distinct non-empty forge type is seen.
    Auto,
}

impl Default for ForgeNamespacing {
    fn default() -> Self {
        ForgeNamespacing::Auto
    }
}

/// One repository participating in a build.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RepositoryConfig {
    pub name: String,
    pub url: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Doc roots to walk; defaults to `DEFAULT_DOC_ROOTS` when empty.
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

fn default_branch() -> String {
    "main".to_string()
}

impl RepositoryConfig {
    pub fn doc_roots(&self) -> Vec<String> {
        if self.paths.is_empty() {
            DEFAULT_DOC_ROOTS.iter().map(|s| s.to_string()).collect()
        } else {
            self.paths.clone()
        }
    }

    pub fn forge_type(&self) -> Option<&str> {
        self.tags.get("forge_type").map(|s| s.as_str())
    }
}
