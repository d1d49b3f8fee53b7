use sha2::{Digest, Sha256};

/// Accepts names pasted from source code, e.g. `import a.b.C;` or `a.b. C`.
pub fn normalize_source_name(raw: &str) -> String {
    let mut s = raw.trim();
    if let Some(rest) = s.strip_prefix("import ") {
        s = rest.trim();
    }
    if let Some(rest) = s.strip_prefix("static ") {
        s = rest.trim();
    }
    if s.ends_with(';') {
        s = s.trim_end_matches(';').trim();
    }
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

pub fn hash_bytes(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    let digest = hasher.finalize();
    hex::encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_source_name_strips_import_whitespace_and_semicolon() {
        let raw = "import org.springframework.stereotype. Component ;";
        assert_eq!(
            normalize_source_name(raw),
            "org.springframework.stereotype.Component"
        );
        assert_eq!(normalize_source_name("import static a.b.C;"), "a.b.C");
        assert_eq!(normalize_source_name("  a.b.C  "), "a.b.C");
    }

    #[test]
    fn normalize_source_name_keeps_names_starting_with_import() {
        assert_eq!(normalize_source_name("importer.Main"), "importer.Main");
    }

    #[test]
    fn hash_bytes_is_hex_sha256() {
        assert_eq!(
            hash_bytes(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(hash_bytes(b"abc").len(), 64);
    }
}
