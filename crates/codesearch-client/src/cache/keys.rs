//! Fingerprint to file-name mapping.

use std::path::{Path, PathBuf};

use crate::fingerprint::Fingerprint;

pub const ENTRY_SUFFIX: &str = "json";
pub const MISSING_SUFFIX: &str = "missing";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FileKind {
    Entry,
    Missing,
}

pub(crate) fn entry_file_name(fingerprint: &Fingerprint) -> String {
    format!("{}.{}", fingerprint, ENTRY_SUFFIX)
}

pub(crate) fn entry_path(dir: &Path, fingerprint: &Fingerprint) -> PathBuf {
    dir.join(entry_file_name(fingerprint))
}

pub(crate) fn missing_path(dir: &Path, fingerprint: &Fingerprint) -> PathBuf {
    dir.join(format!("{}.{}", fingerprint, MISSING_SUFFIX))
}

/// Classify a directory entry. Anything that is not `{fingerprint}.json` or
/// `{fingerprint}.missing` belongs to someone else and yields `None`.
pub(crate) fn classify(file_name: &str) -> Option<(Fingerprint, FileKind)> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    let kind = match ext {
        ENTRY_SUFFIX => FileKind::Entry,
        MISSING_SUFFIX => FileKind::Missing,
        _ => return None,
    };
    let fingerprint = Fingerprint::parse(stem).ok()?;
    Some((fingerprint, kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp() -> Fingerprint {
        Fingerprint::parse(&"0f".repeat(32)).unwrap()
    }

    #[test]
    fn test_paths() {
        let dir = Path::new("/cache");
        assert_eq!(
            entry_path(dir, &fp()),
            PathBuf::from(format!("/cache/{}.json", "0f".repeat(32)))
        );
        assert_eq!(
            missing_path(dir, &fp()),
            PathBuf::from(format!("/cache/{}.missing", "0f".repeat(32)))
        );
    }

    #[test]
    fn test_classify() {
        let name = entry_file_name(&fp());
        assert_eq!(classify(&name), Some((fp(), FileKind::Entry)));
        assert_eq!(
            classify(&format!("{}.missing", fp())),
            Some((fp(), FileKind::Missing))
        );
        assert_eq!(classify("callers.json"), None);
        assert_eq!(classify(&format!(".{}.json.1234.tmp", fp())), None);
        assert_eq!(classify("README"), None);
    }
}
