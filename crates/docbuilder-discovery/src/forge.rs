//! Forge-namespacing mode resolution.

use docbuilder_core::config::{ForgeNamespacing, RepositoryConfig};
use std::collections::HashSet;

/// Whether emitted paths should carry a forge segment, given the
/// configured mode and the full set of repositories participating in
/// this build. `Auto` prefixes iff more than one distinct non-empty
/// `forge_type` is seen across all repositories.
pub fn should_namespace_forges(mode: ForgeNamespacing, repositories: &[RepositoryConfig]) -> bool {
    match mode {
        ForgeNamespacing::Always => true,
        ForgeNamespacing::Never => false,
        ForgeNamespacing::Auto => {
            let distinct: HashSet<&str> = repositories
                .iter()
                .filter_map(|r| r.forge_type())
                .filter(|f| !f.is_empty())
                .collect();
            distinct.len() > 1
        }
    }
}
