//! Deterministic fingerprints over ordered string sets.
//!
//! Every fingerprint input is sorted and canonicalized before hashing
//! so the same logical input always produces the same hash, regardless
//! of iteration order or platform locale.

use sha2::{Digest as Sha2Digest, Sha256};
use std::fmt;

/// SHA-256 hex digest used as a content/path fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    fn from_hasher(hasher: Sha256) -> Self {
        Fingerprint(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wrap an already-computed hex digest string (e.g. one loaded back
    /// from a persisted snapshot) as a `Fingerprint` without recomputing it.
    pub fn from_hex(hex: String) -> Self {
        Fingerprint(hex)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Fingerprint> for String {
    fn from(f: Fingerprint) -> Self {
        f.0
    }
}

/// Fixed, documented hash of an empty path sequence: SHA-256 of the
/// empty byte string.
pub fn empty_fingerprint() -> Fingerprint {
    Fingerprint::from_hasher(Sha256::new())
}

/// Content fingerprint over a single file's raw bytes.
pub fn bytes_fingerprint(bytes: &[u8]) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    Fingerprint::from_hasher(hasher)
}

/// Path fingerprint: sort the input ascending with a fixed
/// byte-lexicographic comparator, then feed each string followed by a
/// NUL separator into SHA-256.
pub fn path_fingerprint<I, S>(paths: I) -> Fingerprint
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut sorted: Vec<String> = paths.into_iter().map(|s| s.as_ref().to_string()).collect();
    sorted.sort_by(|a, b| a.as_bytes().cmp(b.as_bytes()));
    sorted.dedup();

    let mut hasher = Sha256::new();
    for p in sorted {
        hasher.update(p.as_bytes());
        hasher.update([0u8]);
    }
    Fingerprint::from_hasher(hasher)
}

/// One entry of a `DocsManifest`, ordered first by repository then by
/// path, as required for deterministic manifest hashing.
#[derive(Debug, Clone)]
pub struct ManifestEntry {
    pub path: String,
    pub relative_path: String,
    pub repository: String,
    pub forge: Option<String>,
    pub section: String,
    pub content_hash: String,
    pub metadata: Vec<(String, String)>,
}

/// Content fingerprint over a manifest's entries: sorted primarily by
/// `repository`, secondarily by `path`; each line is
/// `path|relative_path|repository|forge|section|content_hash\n`
/// followed by sorted `key=value\n` metadata lines.
pub fn manifest_fingerprint(entries: &[ManifestEntry]) -> Fingerprint {
    let mut sorted: Vec<&ManifestEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| {
        a.repository
            .as_bytes()
            .cmp(b.repository.as_bytes())
            .then_with(|| a.path.as_bytes().cmp(b.path.as_bytes()))
    });

    let mut hasher = Sha256::new();
    for entry in sorted {
        let line = format!(
            "{}|{}|{}|{}|{}|{}\n",
            entry.path,
            entry.relative_path,
            entry.repository,
            entry.forge.as_deref().unwrap_or(""),
            entry.section,
            entry.content_hash,
        );
        hasher.update(line.as_bytes());

        let mut meta = entry.metadata.clone();
        meta.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
        for (k, v) in meta {
            hasher.update(format!("{k}={v}\n").as_bytes());
        }
    }
    Fingerprint::from_hasher(hasher)
}
