//! DocBuilder core: fingerprint/path utilities, the shared classified
//! error taxonomy, and the docs domain types (`DocFile`, `DocsManifest`)
//! shared by every other crate in the workspace.

pub mod config;
pub mod docfile;
pub mod error;
pub mod fingerprint;
pub mod manifest;
pub mod path;
pub mod telemetry;

pub use config::{ForgeNamespacing, RepositoryConfig, DEFAULT_DOC_ROOTS};
pub use docfile::{is_asset_extension, is_markdown_extension, DocFile};
pub use error::{Error, ErrorCategory, ErrorSeverity, Result};
pub use fingerprint::{
    bytes_fingerprint, empty_fingerprint, manifest_fingerprint, path_fingerprint, Fingerprint,
};
pub use manifest::{DocsManifest, ManifestFileEntry};
pub use path::{find_collision, join_segments, normalize_emitted_path};
pub use telemetry::init_tracing;
