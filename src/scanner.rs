use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::engine::Engine;
use crate::models::Dependency;

/// Walk `root` and create a dependency for every file an active analyzer
/// accepts. Hidden directories below the root are skipped and symlinked
/// directories are not followed; a file passed as `root` is checked on its
/// own. Results are sorted by path.
pub fn collect_dependencies(root: &Path, engine: &Engine) -> Result<Vec<Dependency>> {
    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden_dir(e));

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) if e.depth() == 0 => {
                return Err(e).with_context(|| format!("cannot read {}", root.display()));
            }
            Err(e) => {
                warn!("Skipping entry under {}: {}", root.display(), e);
                continue;
            }
        };

        let path = entry.path();
        if !entry.file_type().is_dir() && path.is_file() && engine.accepts(path) {
            files.push(entry.into_path());
        }
    }

    files.sort();
    debug!("Found {} candidate file(s) under {}", files.len(), root.display());

    Ok(files.into_iter().map(Dependency::new).collect())
}

fn is_hidden_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir() && entry.file_name().to_string_lossy().starts_with('.')
}
