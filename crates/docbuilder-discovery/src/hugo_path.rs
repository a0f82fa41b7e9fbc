//! Hugo-style canonical content path mapping.
//!
//! The canonical output path is `content / [forge?] / repository /
//! section / filename`, with every segment lowercased and the
//! filename `index` rewritten to `_index`. Single-repo builds omit the
//! `repository` segment so the flag must be computed once (from the
//! count of participating repositories) and threaded to every call.

use docbuilder_core::join_segments;

/// Map one file's logical location to its canonical emitted path.
pub fn map_to_content_path(
    single_repo: bool,
    namespace_forges: bool,
    forge: Option<&str>,
    repository: &str,
    section: &str,
    filename: &str,
) -> String {
    let forge_segment = if namespace_forges {
        forge.unwrap_or("")
    } else {
        ""
    };
    let repo_segment = if single_repo { "" } else { repository };
    join_segments(["content", forge_segment, repo_segment, section, filename])
}
