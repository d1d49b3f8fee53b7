use anyhow::{Context, Result};
use ignore::{Walk, WalkBuilder};
use std::path::{Path, PathBuf};

use crate::naming::is_class_file;

pub fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}

/// Walks `root` top-down in file name order and yields the `/`-separated
/// path of every regular `.class` file relative to `root`.
pub fn class_files_under(root: &Path) -> DirClassFiles {
    let walk = WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(true)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();
    DirClassFiles {
        root: root.to_path_buf(),
        walk,
    }
}

pub struct DirClassFiles {
    root: PathBuf,
    walk: Walk,
}

impl Iterator for DirClassFiles {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.walk.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    return Some(Err(err).with_context(|| {
                        format!("Failed to walk directory: {}", self.root.display())
                    }));
                }
            };
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let relative = match entry.path().strip_prefix(&self.root) {
                Ok(relative) => relative.to_string_lossy(),
                Err(_) => continue,
            };
            let class_path = normalize_separators(&relative);
            if is_class_file(&class_path) {
                return Some(Ok(class_path));
            }
        }
    }
}
