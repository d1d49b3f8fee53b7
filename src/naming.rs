//! Mapping between dotted source names and class file paths.
//!
//! A class file path such as `org/example/Outer$Inner.class` decodes to exactly
//! one source name (`org.example.Outer.Inner`). The reverse direction is
//! ambiguous: a dotted name does not say where the package ends and nesting
//! begins, or whether the declaration lives in a `Kt` file facade. Encoding
//! therefore yields every plausible placement, starting with the plain package
//! path; each further candidate moves the nesting boundary one segment left.

use std::iter::FusedIterator;

pub const CLASS_SUFFIX: &str = ".class";
pub const FACADE_MARKER: &str = "Kt";

pub fn is_class_file(name: &str) -> bool {
    name.ends_with(CLASS_SUFFIX)
}

/// Decodes a class file path into its canonical source name.
pub fn source_name_for(class_path: &str) -> String {
    let stem = class_path.strip_suffix(CLASS_SUFFIX).unwrap_or(class_path);
    let stem = stem.strip_suffix(FACADE_MARKER).unwrap_or(stem);
    stem.replace(['/', '$'], ".")
}

/// Candidate class file paths for a source name, in lookup priority order.
pub fn candidate_paths(source_name: &str) -> CandidatePaths {
    CandidatePaths {
        base: Some(source_name.replace('.', "/")),
        facade_next: false,
    }
}

#[derive(Debug, Clone)]
pub struct CandidatePaths {
    base: Option<String>,
    facade_next: bool,
}

impl Iterator for CandidatePaths {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        let base = self.base.as_ref()?;
        if !self.facade_next {
            self.facade_next = true;
            return Some(format!("{base}{CLASS_SUFFIX}"));
        }

        let facade = format!("{base}{FACADE_MARKER}{CLASS_SUFFIX}");
        let shallower = base.rfind('/').map(|idx| {
            let mut nested = base.clone();
            nested.replace_range(idx..idx + 1, "$");
            nested
        });
        self.base = shallower;
        self.facade_next = false;
        Some(facade)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let Some(base) = self.base.as_ref() else {
            return (0, Some(0));
        };
        let levels = base.matches('/').count();
        let remaining = levels * 2 + if self.facade_next { 1 } else { 2 };
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for CandidatePaths {}

impl FusedIterator for CandidatePaths {}
