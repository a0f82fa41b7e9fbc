//! `DocsManifest`: the sorted, hashed list of discovered files used as
//! the corpus fingerprint.

use crate::fingerprint::{manifest_fingerprint, Fingerprint, ManifestEntry};
use serde::{Deserialize, Serialize};

/// One entry of a persisted manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestFileEntry {
    pub path: String,
    pub relative_path: String,
    pub repository: String,
    pub forge: Option<String>,
    pub section: String,
    pub content_hash: String,
    pub metadata: Option<Vec<(String, String)>>,
}

impl From<&ManifestFileEntry> for ManifestEntry {
    fn from(e: &ManifestFileEntry) -> Self {
        ManifestEntry {
            path: e.path.clone(),
            relative_path: e.relative_path.clone(),
            repository: e.repository.clone(),
            forge: e.forge.clone(),
            section: e.section.clone(),
            content_hash: e.content_hash.clone(),
            metadata: e.metadata.clone().unwrap_or_default(),
        }
    }
}

/// `{ Files: [manifest entries], Hash }`. `Hash` is deterministic over
/// the sorted entries; re-serializing and re-hashing a manifest always
/// yields the same `Hash`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocsManifest {
    pub files: Vec<ManifestFileEntry>,
    pub hash: String,
}

impl DocsManifest {
    /// Build a manifest from entries, computing its hash.
    pub fn new(files: Vec<ManifestFileEntry>) -> Self {
        let entries: Vec<ManifestEntry> = files.iter().map(ManifestEntry::from).collect();
        let hash = manifest_fingerprint(&entries).to_string();
        DocsManifest { files, hash }
    }

    /// Recompute the hash from the current `files` and compare against
    /// the stored `hash`.
    pub fn is_hash_consistent(&self) -> bool {
        let entries: Vec<ManifestEntry> = self.files.iter().map(ManifestEntry::from).collect();
        manifest_fingerprint(&entries).as_str() == self.hash
    }

    pub fn hash_fingerprint(&self) -> Fingerprint {
        Fingerprint::from_hex(self.hash.clone())
    }
}
