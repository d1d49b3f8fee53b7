//! Class bytes lookup over an ordered classpath.

use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::location::{ByteSupplier, Location, LocationId, LocationKind};
use crate::naming::{candidate_paths, source_name_for};
use crate::probe::JarHandles;

pub struct ClassBytesRepository {
    locations: Vec<Location>,
    handles: JarHandles,
}

impl ClassBytesRepository {
    /// Classifies every classpath entry up front. Jars are not opened until a
    /// lookup or an enumeration reaches them.
    pub fn new<I, P>(classpath: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let locations = classpath
            .into_iter()
            .enumerate()
            .map(|(i, path)| Location::classify(LocationId(i), path.into()))
            .collect();
        Self {
            locations,
            handles: JarHandles::new(),
        }
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    /// Bytes of the first class file matching `source_name`.
    ///
    /// Candidates are tried in priority order, and each candidate against
    /// every location in classpath order, so a more specific candidate in a
    /// later location beats a less specific one in an earlier location.
    pub fn class_bytes_for(&self, source_name: &str) -> Result<Option<Vec<u8>>> {
        match self.find(source_name)? {
            Some((_, supplier)) => supplier.load().map(Some),
            None => Ok(None),
        }
    }

    /// Like [`Self::class_bytes_for`] but hands back the matching class file
    /// path and an unevaluated supplier.
    pub fn find(&self, source_name: &str) -> Result<Option<(String, ByteSupplier<'_>)>> {
        for class_path in candidate_paths(source_name) {
            for location in &self.locations {
                if let Some(supplier) = location.lookup(&self.handles, &class_path)? {
                    debug!(source_name, %class_path, location = location.id().0, "class found");
                    return Ok(Some((class_path, supplier)));
                }
            }
        }
        Ok(None)
    }

    /// Every class file on the classpath as `(source name, supplier)`, in
    /// classpath order and then per-location order.
    ///
    /// Several class files may share one source name. Entries that cannot be
    /// listed or resolved are skipped with a warning instead of ending the
    /// sequence.
    pub fn all_classes_bytes_by_source_name(
        &self,
    ) -> impl Iterator<Item = (String, ByteSupplier<'_>)> + '_ {
        self.locations.iter().flat_map(move |location| {
            location
                .class_paths(&self.handles)
                .filter_map(move |listed| {
                    let class_path = match listed {
                        Ok(class_path) => class_path,
                        Err(err) => {
                            warn!(location = %location.path().display(), "skipping unlistable entries: {err:#}");
                            return None;
                        }
                    };
                    match location.lookup(&self.handles, &class_path) {
                        Ok(Some(supplier)) => Some((source_name_for(&class_path), supplier)),
                        Ok(None) => {
                            warn!(location = %location.path().display(), %class_path, "listed class vanished");
                            None
                        }
                        Err(err) => {
                            warn!(location = %location.path().display(), %class_path, "skipping class: {err:#}");
                            None
                        }
                    }
                })
        })
    }

    pub fn stats(&self) -> RepositoryStats {
        let count = |kind: LocationKind| self.locations.iter().filter(|l| l.kind() == kind).count();
        RepositoryStats {
            locations: self.locations.len(),
            archives: count(LocationKind::Archive),
            directories: count(LocationKind::Directory),
            missing: count(LocationKind::Missing),
            open_archives: self.handles.open_count(),
            archives_opened: self.handles.opened_total(),
            archives_released: self.handles.released_total(),
        }
    }

    /// Releases every opened jar and returns how many were released.
    pub fn close(self) -> usize {
        let released = self.handles.release_all();
        debug!(released, "closed class bytes repository");
        released
    }
}

impl Drop for ClassBytesRepository {
    fn drop(&mut self) {
        self.handles.release_all();
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RepositoryStats {
    pub locations: usize,
    pub archives: usize,
    pub directories: usize,
    pub missing: usize,
    pub open_archives: usize,
    pub archives_opened: u64,
    pub archives_released: u64,
}
