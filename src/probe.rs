//! Memory-mapped jar handles and the per-repository handle table.

use anyhow::{Context, Result};
use memmap2::Mmap;
use std::cell::{Cell, RefCell};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::{debug, warn};
use zip::ZipArchive;
use zip::result::ZipError;

use crate::location::{Location, LocationId};

pub type JarArchive = ZipArchive<Cursor<Mmap>>;

/// Upper bound on the buffer reserved from an entry's declared size; the
/// header is not trusted beyond this.
const MAX_PREALLOC: u64 = 1024 * 1024;

pub fn open_jar(jar_path: &Path) -> Result<JarArchive> {
    let file = File::open(jar_path)
        .with_context(|| format!("Failed to open jar: {}", jar_path.display()))?;
    // SAFETY: The file is opened read-only and the mapping owns its own view of
    // it; the archive is never written through this process.
    let mmap = unsafe { Mmap::map(&file) }
        .with_context(|| format!("Failed to mmap jar: {}", jar_path.display()))?;
    ZipArchive::new(Cursor::new(mmap))
        .with_context(|| format!("Failed to read zip structure: {}", jar_path.display()))
}

pub fn jar_contains_entry(archive: &mut JarArchive, entry_name: &str) -> Result<bool> {
    match archive.by_name(entry_name) {
        Ok(_) => Ok(true),
        Err(ZipError::FileNotFound) => Ok(false),
        Err(err) => Err(err).with_context(|| format!("Failed to look up jar entry: {entry_name}")),
    }
}

/// Reads one entry in full. The entry stream lives only for this call.
pub fn read_jar_entry(archive: &mut JarArchive, entry_name: &str) -> Result<Vec<u8>> {
    let mut entry = archive
        .by_name(entry_name)
        .with_context(|| format!("Failed to open jar entry: {entry_name}"))?;
    let hint = usize::try_from(entry.size().min(MAX_PREALLOC)).unwrap_or(0);
    let mut bytes = Vec::with_capacity(hint);
    entry
        .read_to_end(&mut bytes)
        .with_context(|| format!("Failed to read jar entry: {entry_name}"))?;
    Ok(bytes)
}

/// Opened jars keyed by location, opened on first use and kept until
/// [`JarHandles::release_all`].
///
/// Not thread safe; the table is shared through `&self` by the lookup path
/// and by every lazy sequence handed out by the repository.
#[derive(Default)]
pub struct JarHandles {
    open: RefCell<HashMap<LocationId, JarArchive>>,
    unreadable: RefCell<HashSet<LocationId>>,
    opened_total: Cell<u64>,
    released_total: Cell<u64>,
}

impl JarHandles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_jar<R>(
        &self,
        location: &Location,
        f: impl FnOnce(&mut JarArchive) -> Result<R>,
    ) -> Result<R> {
        let mut open = self.open.borrow_mut();
        let archive = self.checkout(&mut open, location)?;
        f(archive)
    }

    /// Like [`JarHandles::with_jar`], but a jar that cannot be opened counts
    /// as empty and yields `Ok(None)`. It is warned about once and not
    /// retried. Errors from `f` still propagate.
    pub fn with_readable_jar<R>(
        &self,
        location: &Location,
        f: impl FnOnce(&mut JarArchive) -> Result<R>,
    ) -> Result<Option<R>> {
        if self.unreadable.borrow().contains(&location.id()) {
            return Ok(None);
        }
        let mut open = self.open.borrow_mut();
        let archive = match self.checkout(&mut open, location) {
            Ok(archive) => archive,
            Err(err) => {
                warn!(jar = %location.path().display(), "treating unreadable jar as empty: {err:#}");
                self.unreadable.borrow_mut().insert(location.id());
                return Ok(None);
            }
        };
        f(archive).map(Some)
    }

    fn checkout<'t>(
        &self,
        open: &'t mut HashMap<LocationId, JarArchive>,
        location: &Location,
    ) -> Result<&'t mut JarArchive> {
        match open.entry(location.id()) {
            Entry::Occupied(slot) => Ok(slot.into_mut()),
            Entry::Vacant(slot) => {
                let archive = open_jar(location.path())?;
                self.opened_total.set(self.opened_total.get() + 1);
                debug!(jar = %location.path().display(), entries = archive.len(), "opened jar");
                Ok(slot.insert(archive))
            }
        }
    }

    pub fn unreadable_count(&self) -> usize {
        self.unreadable.borrow().len()
    }

    pub fn open_count(&self) -> usize {
        self.open.borrow().len()
    }

    pub fn opened_total(&self) -> u64 {
        self.opened_total.get()
    }

    pub fn released_total(&self) -> u64 {
        self.released_total.get()
    }

    /// Drops every open jar and returns how many were released.
    pub fn release_all(&self) -> usize {
        let released: Vec<(LocationId, JarArchive)> = self.open.borrow_mut().drain().collect();
        for (id, _archive) in &released {
            debug!(location = id.0, "released jar");
        }
        self.released_total
            .set(self.released_total.get() + released.len() as u64);
        released.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::LocationKind;
    use std::fs;
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU64, Ordering};
    use zip::write::{FileOptions, ZipWriter};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_jar_path() -> PathBuf {
        let mut p = std::env::temp_dir();
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        p.push(format!(
            "class-bytes-probe-{}-{}-{}.jar",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_millis(),
            n
        ));
        p
    }

    fn write_jar(entries: &[(&str, &[u8])]) -> PathBuf {
        let jar_path = temp_jar_path();
        let file = fs::File::create(&jar_path).unwrap();
        let mut zip = ZipWriter::new(file);
        for (name, content) in entries {
            zip.start_file(*name, FileOptions::default()).unwrap();
            zip.write_all(content).unwrap();
        }
        zip.finish().unwrap();
        jar_path
    }

    #[test]
    fn jar_contains_entry_and_read_jar_entry_work() {
        let jar_path = write_jar(&[("org/example/Widget.class", b"widget")]);
        let mut archive = open_jar(&jar_path).unwrap();

        assert!(jar_contains_entry(&mut archive, "org/example/Widget.class").unwrap());
        assert!(!jar_contains_entry(&mut archive, "org/example/Gadget.class").unwrap());
        assert_eq!(
            read_jar_entry(&mut archive, "org/example/Widget.class").unwrap(),
            b"widget"
        );
        assert!(read_jar_entry(&mut archive, "org/example/Gadget.class").is_err());

        let _ = fs::remove_file(&jar_path);
    }

    #[test]
    fn open_jar_rejects_non_zip_file() {
        let path = temp_jar_path();
        fs::write(&path, b"definitely not a zip").unwrap();

        assert!(open_jar(&path).is_err());

        let _ = fs::remove_file(&path);
    }

    fn crc32(data: &[u8]) -> u32 {
        let mut crc = 0xFFFF_FFFFu32;
        for &byte in data {
            crc ^= u32::from(byte);
            for _ in 0..8 {
                let mask = (crc & 1).wrapping_neg();
                crc = (crc >> 1) ^ (0xEDB8_8320 & mask);
            }
        }
        !crc
    }

    /// One stored entry whose central directory claims, through a zip64
    /// extra field, an uncompressed size far beyond the real data.
    fn write_jar_with_declared_size(name: &str, data: &[u8], declared: u64) -> PathBuf {
        let crc = crc32(data);
        let len = data.len() as u32;
        let mut out = Vec::new();

        out.extend_from_slice(&0x0403_4b50u32.to_le_bytes());
        out.extend_from_slice(&20u16.to_le_bytes());
        out.extend_from_slice(&[0; 8]); // flags, method (stored), time, date
        out.extend_from_slice(&crc.to_le_bytes());
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(&(name.len() as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(data);

        let cd_offset = out.len() as u32;
        out.extend_from_slice(&0x0201_4b50u32.to_le_bytes());
        out.extend_from_slice(&20u16.to_le_bytes());
        out.extend_from_slice(&20u16.to_le_bytes());
        out.extend_from_slice(&[0; 8]); // flags, method (stored), time, date
        out.extend_from_slice(&crc.to_le_bytes());
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(&u32::MAX.to_le_bytes());
        out.extend_from_slice(&(name.len() as u16).to_le_bytes());
        out.extend_from_slice(&12u16.to_le_bytes());
        out.extend_from_slice(&[0; 14]); // comment len, disk, attrs, local header offset
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&8u16.to_le_bytes());
        out.extend_from_slice(&declared.to_le_bytes());
        let cd_size = out.len() as u32 - cd_offset;

        out.extend_from_slice(&0x0605_4b50u32.to_le_bytes());
        out.extend_from_slice(&[0; 4]);
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&cd_size.to_le_bytes());
        out.extend_from_slice(&cd_offset.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());

        let path = temp_jar_path();
        fs::write(&path, out).unwrap();
        path
    }

    #[test]
    fn read_jar_entry_ignores_oversized_declared_length() {
        let jar_path = write_jar_with_declared_size("a/B.class", b"cafebabe", 1u64 << 63);
        let mut archive = open_jar(&jar_path).unwrap();
        assert_eq!(archive.by_index(0).unwrap().size(), 1u64 << 63);

        // Must come back as a value, never as an allocation panic.
        match read_jar_entry(&mut archive, "a/B.class") {
            Ok(bytes) => assert_eq!(bytes, b"cafebabe"),
            Err(err) => assert!(format!("{err:#}").contains("a/B.class")),
        }

        let _ = fs::remove_file(&jar_path);
    }

    #[test]
    fn with_readable_jar_treats_non_zip_as_empty_once() {
        let path = temp_jar_path();
        fs::write(&path, b"plain text notes").unwrap();
        let location = Location::classify(LocationId(0), path.clone());
        let handles = JarHandles::new();

        let first = handles
            .with_readable_jar(&location, |a| jar_contains_entry(a, "a/B.class"))
            .unwrap();
        assert_eq!(first, None);
        let second = handles
            .with_readable_jar(&location, |a| jar_contains_entry(a, "a/B.class"))
            .unwrap();
        assert_eq!(second, None);
        assert_eq!(handles.unreadable_count(), 1);
        assert_eq!(handles.opened_total(), 0);
        assert!(handles.with_jar(&location, |a| Ok(a.len())).is_err());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn with_jar_opens_once_and_release_all_drains() {
        let jar_path = write_jar(&[("a/B.class", b"b")]);
        let location = Location::classify(LocationId(0), jar_path.clone());
        assert_eq!(location.kind(), LocationKind::Archive);

        let handles = JarHandles::new();
        assert_eq!(handles.open_count(), 0);
        for _ in 0..3 {
            let bytes = handles
                .with_jar(&location, |a| read_jar_entry(a, "a/B.class"))
                .unwrap();
            assert_eq!(bytes, b"b");
        }
        assert_eq!(handles.opened_total(), 1);
        assert_eq!(handles.open_count(), 1);

        assert_eq!(handles.release_all(), 1);
        assert_eq!(handles.open_count(), 0);
        assert_eq!(handles.released_total(), 1);
        assert_eq!(handles.release_all(), 0);
        assert_eq!(handles.released_total(), 1);

        let _ = fs::remove_file(&jar_path);
    }
}
