use anyhow::{Context, Result};

use crate::location::Location;
use crate::naming::is_class_file;
use crate::probe::{JarArchive, JarHandles};

fn class_entry_at(archive: &mut JarArchive, index: usize) -> Result<Option<String>> {
    let entry = archive
        .by_index_raw(index)
        .with_context(|| format!("Failed to read jar entry #{index}"))?;
    let name = entry.name();
    if entry.is_dir() || !is_class_file(name) {
        return Ok(None);
    }
    Ok(Some(name.to_string()))
}

/// Lazily walks the `.class` entries of a jar location, going through the
/// shared handle table on every step so that the sequence itself holds no
/// handle and can be dropped at any point.
pub struct JarClassEntries<'a> {
    handles: &'a JarHandles,
    location: &'a Location,
    next_index: usize,
    done: bool,
}

impl<'a> JarClassEntries<'a> {
    pub fn new(handles: &'a JarHandles, location: &'a Location) -> Self {
        Self {
            handles,
            location,
            next_index: 0,
            done: false,
        }
    }
}

impl Iterator for JarClassEntries<'_> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let start = self.next_index;
        let step = self.handles.with_jar(self.location, |archive| {
            for index in start..archive.len() {
                if let Some(name) = class_entry_at(archive, index)? {
                    return Ok(Some((index, name)));
                }
            }
            Ok(None)
        });

        match step {
            Ok(Some((index, name))) => {
                self.next_index = index + 1;
                Some(Ok(name))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                // A broken jar or a corrupt entry header ends this jar's listing.
                self.done = true;
                Some(Err(err).with_context(|| {
                    format!("Failed to list jar: {}", self.location.path().display())
                }))
            }
        }
    }
}
