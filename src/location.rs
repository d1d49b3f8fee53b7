//! Classpath locations and their per-location class index.
//!
//! A location is classified once, when it is created, as a jar (any existing
//! regular file), a directory, or missing. The classification decides how
//! class file paths are resolved and enumerated for the rest of its life.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use crate::catalog::JarClassEntries;
use crate::probe::{JarHandles, jar_contains_entry, read_jar_entry};
use crate::scan::{DirClassFiles, class_files_under};

/// Position of a location in the classpath; doubles as its identity in the
/// jar handle table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocationId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationKind {
    Archive,
    Directory,
    Missing,
}

impl fmt::Display for LocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LocationKind::Archive => "archive",
            LocationKind::Directory => "directory",
            LocationKind::Missing => "missing",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct Location {
    id: LocationId,
    path: PathBuf,
    kind: LocationKind,
}

impl Location {
    pub fn classify(id: LocationId, path: PathBuf) -> Self {
        let kind = match std::fs::metadata(&path) {
            Ok(meta) if meta.is_dir() => LocationKind::Directory,
            Ok(meta) if meta.is_file() => LocationKind::Archive,
            _ => LocationKind::Missing,
        };
        debug!(location = id.0, path = %path.display(), %kind, "classified classpath location");
        Self { id, path, kind }
    }

    pub fn id(&self) -> LocationId {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> LocationKind {
        self.kind
    }

    /// Resolves a class file path against this location.
    ///
    /// Absent entries are `Ok(None)`. For jars the handle is opened on first
    /// use, so an unreadable jar surfaces here as an error.
    pub fn lookup<'a>(
        &'a self,
        handles: &'a JarHandles,
        class_path: &str,
    ) -> Result<Option<ByteSupplier<'a>>> {
        match self.kind {
            LocationKind::Archive => {
                let present = handles
                    .with_readable_jar(self, |jar| jar_contains_entry(jar, class_path))?
                    .unwrap_or(false);
                Ok(present.then(|| ByteSupplier::JarEntry {
                    handles,
                    location: self,
                    entry: class_path.to_string(),
                }))
            }
            LocationKind::Directory => {
                let Some(relative) = confined_relative_path(class_path) else {
                    return Ok(None);
                };
                let file = self.path.join(relative);
                Ok(file.is_file().then_some(ByteSupplier::File { path: file }))
            }
            LocationKind::Missing => Ok(None),
        }
    }

    /// Lazy sequence of every class file path under this location.
    pub fn class_paths<'a>(&'a self, handles: &'a JarHandles) -> ClassPaths<'a> {
        match self.kind {
            LocationKind::Archive => ClassPaths::Jar(JarClassEntries::new(handles, self)),
            LocationKind::Directory => ClassPaths::Dir(class_files_under(&self.path)),
            LocationKind::Missing => ClassPaths::Empty,
        }
    }
}

fn confined_relative_path(class_path: &str) -> Option<&Path> {
    let path = Path::new(class_path);
    path.components()
        .all(|c| matches!(c, Component::Normal(_)))
        .then_some(path)
}

pub enum ClassPaths<'a> {
    Jar(JarClassEntries<'a>),
    Dir(DirClassFiles),
    Empty,
}

impl Iterator for ClassPaths<'_> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            ClassPaths::Jar(entries) => entries.next(),
            ClassPaths::Dir(files) => files.next(),
            ClassPaths::Empty => None,
        }
    }
}

/// Deferred access to the bytes of one class file.
///
/// Every [`ByteSupplier::load`] performs the read again; nothing is cached.
pub enum ByteSupplier<'a> {
    JarEntry {
        handles: &'a JarHandles,
        location: &'a Location,
        entry: String,
    },
    File {
        path: PathBuf,
    },
}

impl ByteSupplier<'_> {
    pub fn load(&self) -> Result<Vec<u8>> {
        match self {
            ByteSupplier::JarEntry {
                handles,
                location,
                entry,
            } => handles
                .with_jar(location, |jar| read_jar_entry(jar, entry))
                .with_context(|| format!("Failed to load class bytes from jar: {}", location.path().display())),
            ByteSupplier::File { path } => std::fs::read(path)
                .with_context(|| format!("Failed to read class file: {}", path.display())),
        }
    }
}

impl fmt::Debug for ByteSupplier<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ByteSupplier::JarEntry {
                location, entry, ..
            } => f
                .debug_struct("JarEntry")
                .field("jar", &location.path())
                .field("entry", entry)
                .finish(),
            ByteSupplier::File { path } => f.debug_struct("File").field("path", path).finish(),
        }
    }
}
