//! Content identity for media files.
//!
//! Media files are renamed on disk during a build so equal content always
//! resolves to one module id regardless of how many specifiers point at it.
//! The identity is a short hex digest of the file bytes, spliced into the
//! file name between stem and extension with no separator.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

/// Length of the hex identity tag spliced into file names.
pub const TAG_LEN: usize = 8;

/// Short content digest: the first [`TAG_LEN`] hex characters of the
/// SHA-256 of `bytes`. Always lowercase hex.
pub fn content_digest(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(TAG_LEN);
    for byte in digest.iter().take(TAG_LEN / 2) {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// `photo.png` + `1a2b3c4d` -> `photo1a2b3c4d.png`, in the same directory.
pub fn tagged_path(path: &Path, digest: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let file = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}{digest}.{ext}"),
        None => format!("{stem}{digest}"),
    };
    path.with_file_name(file)
}

/// Reverse of [`tagged_path`]: strip a trailing identity tag from the stem.
///
/// Returns `None` when the stem carries no tag, so callers can use this as
/// an idempotence check before tagging.
pub fn untagged_path(path: &Path) -> Option<PathBuf> {
    let stem = path.file_stem()?.to_str()?;
    let original = strip_tag(stem)?;
    let file = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{original}.{ext}"),
        None => original.to_string(),
    };
    Some(path.with_file_name(file))
}

/// Extract the identity tag from a tagged file name (extension allowed).
///
/// ```
/// assert_eq!(cubby::digest_from_name("photo1a2b3c4d.png"), Some("1a2b3c4d"));
/// assert_eq!(cubby::digest_from_name("photo.png"), None);
/// ```
pub fn digest_from_name(name: &str) -> Option<&str> {
    let file = name.rsplit('/').next().unwrap_or(name);
    let stem = match file.rfind('.') {
        Some(idx) if idx > 0 => &file[..idx],
        _ => file,
    };
    let tag = tag_suffix(stem)?;
    Some(tag)
}

/// The trailing tag of a stem, if the stem ends in one.
fn tag_suffix(stem: &str) -> Option<&str> {
    if stem.len() <= TAG_LEN || !stem.is_char_boundary(stem.len() - TAG_LEN) {
        return None;
    }
    let tail = &stem[stem.len() - TAG_LEN..];
    let is_tag = tail
        .chars()
        .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
    is_tag.then_some(tail)
}

/// The stem with a trailing tag removed, or `None` if no tag is present.
fn strip_tag(stem: &str) -> Option<&str> {
    tag_suffix(stem).map(|tag| &stem[..stem.len() - tag.len()])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_eight_lowercase_hex_chars() {
        let digest = content_digest(b"hello world");
        assert_eq!(digest.len(), TAG_LEN);
        assert!(digest
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn equal_content_digests_equal() {
        assert_eq!(content_digest(b"abc"), content_digest(b"abc"));
        assert_ne!(content_digest(b"abc"), content_digest(b"abd"));
    }

    #[test]
    fn tag_splices_before_the_extension() {
        let tagged = tagged_path(Path::new("/assets/photo.png"), "1a2b3c4d");
        assert_eq!(tagged, PathBuf::from("/assets/photo1a2b3c4d.png"));
    }

    #[test]
    fn tag_handles_multi_dot_stems() {
        let tagged = tagged_path(Path::new("/a/photo.hero.png"), "1a2b3c4d");
        assert_eq!(tagged, PathBuf::from("/a/photo.hero1a2b3c4d.png"));
    }

    #[test]
    fn tag_round_trips() {
        let original = Path::new("/assets/photo.png");
        let digest = content_digest(b"pixels");
        let tagged = tagged_path(original, &digest);
        assert_eq!(untagged_path(&tagged), Some(original.to_path_buf()));
    }

    #[test]
    fn untag_rejects_untagged_names() {
        assert_eq!(untagged_path(Path::new("/assets/photo.png")), None);
        // Tag-length stems with non-hex characters are left alone.
        assert_eq!(untagged_path(Path::new("/assets/snapshots.png")), None);
    }

    #[test]
    fn digest_from_name_reads_the_tag() {
        assert_eq!(digest_from_name("photo1a2b3c4d.png"), Some("1a2b3c4d"));
        assert_eq!(digest_from_name("a/b/photo.hero00ff00ff.png"), Some("00ff00ff"));
        assert_eq!(digest_from_name("photo.png"), None);
        assert_eq!(digest_from_name("deadbeef.png"), None);
    }
}
