//! Per-repository filesystem walk: `.docignore` short-circuit,
//! extension filtering, root ignore-list, and hidden-file skipping.

use docbuilder_core::{is_asset_extension, is_markdown_extension, DocFile, RepositoryConfig};
use std::collections::BTreeMap;
use std::path::Path;
use walkdir::WalkDir;

/// Filenames ignored only when they sit directly at a configured doc root.
const ROOT_IGNORE_LIST: &[&str] = &["contributing.md", "changelog.md", "license.md"];

const ROOT_INDEX_FILE: &str = "readme.md";

fn is_root_ignored(filename_lower: &str) -> bool {
    ROOT_IGNORE_LIST.contains(&filename_lower)
}

/// `true` if `workspace` carries a `.docignore` marker at its root,
/// meaning the whole repository is excluded from discovery.
pub fn has_docignore(workspace: &Path) -> bool {
    workspace.join(".docignore").is_file()
}

/// Walk every configured doc root of `repo` inside `workspace`,
/// returning the discovered files with content not yet loaded.
pub fn walk_repository(repo: &RepositoryConfig, workspace: &Path) -> Vec<DocFile> {
    let mut files = Vec::new();
    let forge = repo.forge_type().map(|s| s.to_string());
    let tags: BTreeMap<String, String> = repo.tags.clone();

    for doc_root in repo.doc_roots() {
        let root_path = workspace.join(&doc_root);
        if !root_path.is_dir() {
            continue;
        }

        for entry in WalkDir::new(&root_path)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let Some(filename) = path.file_name().and_then(|f| f.to_str()) else {
                continue;
            };
            if filename.starts_with('.') {
                continue;
            }

            let extension = match path.extension().and_then(|e| e.to_str()) {
                Some(e) => e,
                None => continue,
            };
            let is_markdown = is_markdown_extension(extension);
            let is_asset = is_asset_extension(extension);
            if !is_markdown && !is_asset {
                continue;
            }

            let relative = path.strip_prefix(&root_path).unwrap_or(path);
            let relative_path = relative.to_string_lossy().replace('\\', "/");
            let at_root = relative
                .parent()
                .map(|p| p.as_os_str().is_empty())
                .unwrap_or(true);

            let filename_lower = filename.to_lowercase();
            if at_root && is_root_ignored(&filename_lower) {
                continue;
            }

            let section = relative
                .parent()
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .filter(|s| !s.is_empty())
                .unwrap_or_default();

            // A README.md sitting directly at a doc root becomes that
            // section's index page; the general index-stem rewrite
            // (C1) takes it from there.
            let stem = if at_root && filename_lower == ROOT_INDEX_FILE {
                "index".to_string()
            } else {
                path.file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("")
                    .to_string()
            };

            files.push(DocFile {
                path: path.to_path_buf(),
                relative_path,
                docs_base: doc_root.clone(),
                repository: repo.name.clone(),
                forge: forge.clone(),
                section,
                name: stem,
                extension: extension.to_string(),
                is_asset,
                metadata: tags.clone(),
                content: None,
            });
        }
    }

    files.sort_by(|a, b| {
        (a.repository.as_str(), a.relative_path.as_str())
            .cmp(&(b.repository.as_str(), b.relative_path.as_str()))
    });
    files
}
