//! Path normalization for emitted site paths.
//!
//! All emitted site paths are lowercase, use forward slashes, and
//! rewrite the single-character-stem filename `index` to `_index` so
//! the site generator treats it as a section landing page.

/// Normalize a single emitted path: lowercase, forward slashes, and
/// `index.<ext>` -> `_index.<ext>` stem rewrite.
pub fn normalize_emitted_path(raw: &str) -> String {
    let forward = raw.replace('\\', "/");
    let lower = forward.to_lowercase();

    let (dir, filename) = match lower.rsplit_once('/') {
        Some((d, f)) => (Some(d), f),
        None => (None, lower.as_str()),
    };

    let renamed = rewrite_index_stem(filename);

    match dir {
        Some(d) if !d.is_empty() => format!("{d}/{renamed}"),
        _ => renamed,
    }
}

fn rewrite_index_stem(filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if stem == "index" => format!("_index.{ext}"),
        None if filename == "index" => "_index".to_string(),
        _ => filename.to_string(),
    }
}

/// Join path segments with `/`, skipping empty segments, and normalize
/// the result.
pub fn join_segments<'a, I: IntoIterator<Item = &'a str>>(segments: I) -> String {
    let joined = segments
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    normalize_emitted_path(&joined)
}

/// Detect duplicate entries in an already-normalized path list.
/// Returns the first duplicate found, if any.
pub fn find_collision(paths: &[String]) -> Option<String> {
    let mut seen = std::collections::HashSet::with_capacity(paths.len());
    for p in paths {
        if !seen.insert(p.as_str()) {
            return Some(p.clone());
        }
    }
    None
}
