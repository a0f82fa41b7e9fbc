//! Docs discovery: locates documentation files across a multi-repo
//! workspace, resolves forge namespacing, maps each file to its
//! canonical Hugo-style content path, and detects path collisions.

pub mod forge;
pub mod hugo_path;
pub mod walk;

pub use forge::should_namespace_forges;
pub use hugo_path::map_to_content_path;
pub use walk::{has_docignore, walk_repository};

use docbuilder_core::config::{ForgeNamespacing, RepositoryConfig};
use docbuilder_core::error::{Error, Result};
use docbuilder_core::fingerprint::{bytes_fingerprint, path_fingerprint, Fingerprint};
use docbuilder_core::manifest::{DocsManifest, ManifestFileEntry};
use docbuilder_core::{find_collision, DocFile};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Everything a discovery pass produces for one build.
#[derive(Debug)]
pub struct DiscoveryOutput {
    /// The ordered, deterministic list of discovered files.
    pub files: Vec<DocFile>,
    /// The content manifest over `files`, with its own stable hash.
    pub manifest: DocsManifest,
    /// The global content hash over every file's canonical path.
    pub global_hash: Fingerprint,
    /// Sorted, deduplicated canonical paths per repository, suitable
    /// for persistence as `Repository.DocFilePaths`.
    pub repo_paths: BTreeMap<String, Vec<String>>,
}

/// Run discovery across every participating repository.
///
/// `workspaces` maps repository name to its local clone directory.
/// Repositories absent from the map, or carrying a `.docignore`
/// marker, are skipped (the former logged as a warning, the latter at
/// info level as the algorithm specifies).
pub fn discover(
    repositories: &[RepositoryConfig],
    workspaces: &BTreeMap<String, PathBuf>,
    namespace_mode: ForgeNamespacing,
) -> Result<DiscoveryOutput> {
    let single_repo = repositories.len() == 1;
    let namespace_forges = should_namespace_forges(namespace_mode, repositories);

    let mut files: Vec<DocFile> = Vec::new();
    for repo in repositories {
        let workspace = match workspaces.get(&repo.name) {
            Some(w) => w,
            None => {
                tracing::warn!(repository = %repo.name, "no workspace clone found; skipping discovery");
                continue;
            }
        };
        if has_docignore(workspace) {
            tracing::info!(repository = %repo.name, "skipping repository: .docignore present");
            continue;
        }
        files.extend(walk_repository(repo, workspace));
    }

    let mut canonical_paths: Vec<String> = Vec::with_capacity(files.len());
    let mut manifest_entries: Vec<ManifestFileEntry> = Vec::with_capacity(files.len());
    let mut repo_paths: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for file in &mut files {
        let filename = format!("{}.{}", file.name, file.extension);
        let canonical = map_to_content_path(
            single_repo,
            namespace_forges,
            file.forge.as_deref(),
            &file.repository,
            &file.section,
            &filename,
        );

        let bytes = file.load_content()?.to_vec();
        let content_hash = bytes_fingerprint(&bytes).to_string();

        repo_paths
            .entry(file.repository.clone())
            .or_default()
            .push(canonical.clone());

        manifest_entries.push(ManifestFileEntry {
            path: canonical.clone(),
            relative_path: file.relative_path.clone(),
            repository: file.repository.clone(),
            forge: file.forge.clone(),
            section: file.section.clone(),
            content_hash,
            metadata: Some(file.metadata.clone().into_iter().collect()),
        });

        canonical_paths.push(canonical);
    }

    if let Some(dup) = find_collision(&canonical_paths) {
        return Err(Error::path_collision(format!(
            "duplicate emitted content path: {dup}"
        ))
        .with_context("path", dup));
    }

    for paths in repo_paths.values_mut() {
        paths.sort();
        paths.dedup();
    }

    let manifest = DocsManifest::new(manifest_entries);
    let global_hash = path_fingerprint(canonical_paths.iter().map(|s| s.as_str()));

    Ok(DiscoveryOutput {
        files,
        manifest,
        global_hash,
        repo_paths,
    })
}

/// Quick hash used by the delta analyzer: the paths-only fingerprint
/// of a repository's walk, without reading file content.
pub fn quick_hash_repository(repo: &RepositoryConfig, workspace: &std::path::Path) -> Fingerprint {
    let files = walk_repository(repo, workspace);
    path_fingerprint(files.iter().map(|f| f.relative_path.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::fs;
    use tempfile::tempdir;

    fn repo(name: &str, forge: Option<&str>) -> RepositoryConfig {
        let mut tags = BTreeMap::new();
        if let Some(f) = forge {
            tags.insert("forge_type".to_string(), f.to_string());
        }
        RepositoryConfig {
            name: name.into(),
            url: format!("https://example.com/{name}.git"),
            branch: "main".into(),
            paths: vec![],
            tags,
        }
    }

    #[test]
    fn two_repos_full_build_emits_both_paths() {
        let root = tempdir().unwrap();
        let a = root.path().join("a");
        let b = root.path().join("b");
        fs::create_dir_all(a.join("docs")).unwrap();
        fs::create_dir_all(b.join("docs")).unwrap();
        fs::write(a.join("docs/a.md"), "A").unwrap();
        fs::write(b.join("docs/b.md"), "B").unwrap();

        let mut workspaces = BTreeMap::new();
        workspaces.insert("repoa".to_string(), a);
        workspaces.insert("repob".to_string(), b);

        let repos = vec![repo("repoa", None), repo("repob", None)];
        let out = discover(&repos, &workspaces, ForgeNamespacing::Auto).unwrap();

        let mut all: Vec<&String> = out.repo_paths.values().flatten().collect();
        all.sort();
        assert_eq!(
            all,
            vec!["content/repoa/a.md", "content/repob/b.md"]
                .iter()
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn single_repo_omits_repository_segment() {
        let root = tempdir().unwrap();
        let dir = root.path().join("my-docs");
        fs::create_dir_all(dir.join("docs/api")).unwrap();
        fs::write(dir.join("docs/index.md"), "home").unwrap();
        fs::write(dir.join("docs/api/guide.md"), "guide").unwrap();

        let mut workspaces = BTreeMap::new();
        workspaces.insert("my-docs".to_string(), dir);

        let repos = vec![repo("my-docs", None)];
        let out = discover(&repos, &workspaces, ForgeNamespacing::Auto).unwrap();
        let mut paths: Vec<&String> = out.repo_paths.values().flatten().collect();
        paths.sort();
        assert_eq!(
            paths,
            vec!["content/_index.md", "content/api/guide.md"]
                .iter()
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn case_distinct_filenames_collide() {
        let root = tempdir().unwrap();
        let dir = root.path().join("repoa");
        fs::create_dir_all(dir.join("docs")).unwrap();
        fs::write(dir.join("docs/Minutes.md"), "a").unwrap();
        fs::write(dir.join("docs/minutes.md"), "b").unwrap();

        let mut workspaces = BTreeMap::new();
        workspaces.insert("repoa".to_string(), dir);

        let repos = vec![repo("repoa", None)];
        let err = discover(&repos, &workspaces, ForgeNamespacing::Auto).unwrap_err();
        assert_eq!(err.category, docbuilder_core::ErrorCategory::PathCollision);
    }

    #[test]
    fn auto_namespace_adds_forge_segment_for_two_forges() {
        let root = tempdir().unwrap();
        let a = root.path().join("a");
        let b = root.path().join("b");
        fs::create_dir_all(a.join("docs")).unwrap();
        fs::create_dir_all(b.join("docs")).unwrap();
        fs::write(a.join("docs/a.md"), "A").unwrap();
        fs::write(b.join("docs/b.md"), "B").unwrap();

        let mut workspaces = BTreeMap::new();
        workspaces.insert("repoa".to_string(), a);
        workspaces.insert("repob".to_string(), b);

        let repos = vec![repo("repoa", Some("github")), repo("repob", Some("gitlab"))];
        let out = discover(&repos, &workspaces, ForgeNamespacing::Auto).unwrap();
        let mut paths: Vec<&String> = out.repo_paths.values().flatten().collect();
        paths.sort();
        assert_eq!(
            paths,
            vec!["content/github/repoa/a.md", "content/gitlab/repob/b.md"]
                .iter()
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn docignore_skips_entire_repository() {
        let root = tempdir().unwrap();
        let dir = root.path().join("repoa");
        fs::create_dir_all(dir.join("docs")).unwrap();
        fs::write(dir.join("docs/a.md"), "A").unwrap();
        fs::write(dir.join(".docignore"), "").unwrap();

        let mut workspaces = BTreeMap::new();
        workspaces.insert("repoa".to_string(), dir);

        let repos = vec![repo("repoa", None)];
        let out = discover(&repos, &workspaces, ForgeNamespacing::Auto).unwrap();
        assert!(out.files.is_empty());
        assert!(out.repo_paths.is_empty());
    }
}
