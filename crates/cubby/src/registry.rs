//! Build-scoped registries.
//!
//! [`MediaRegistry`] tracks the temporary on-disk renames applied to media
//! files and the placement decided for each of them. [`NameTable`] carries
//! group-key records from the grouping phase to the naming phase.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::identity::{content_digest, tagged_path};
use crate::{Error, Result};

/// Where a media file lands in the output tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPlacement {
    /// Owning section, `None` when no single section claims the file.
    pub section: Option<String>,
    /// Preserved directory path below the section, `/`-terminated or empty.
    pub subpath: String,
}

/// A media file renamed to carry its identity tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedFile {
    pub digest: String,
    pub original: PathBuf,
    pub tagged: PathBuf,
}

#[derive(Debug, Default)]
struct MediaInner {
    /// digest -> rename record
    tagged: FxHashMap<String, TaggedFile>,
    /// original path -> digest, for lookups that race with the rename
    by_original: FxHashMap<PathBuf, String>,
    /// digest -> decided placement
    placements: FxHashMap<String, MediaPlacement>,
    /// digests in tag order, for deterministic iteration
    order: Vec<String>,
}

/// Registry of tagged media files for one build.
///
/// Tagging is content-addressed: two files with equal bytes share one tag
/// record, so duplicate imports collapse onto a single module id. Every
/// rename is reversed by [`MediaRegistry::restore_all`]; sessions call it
/// on finish and again from `Drop` as a backstop.
#[derive(Debug, Clone, Default)]
pub struct MediaRegistry {
    inner: Arc<RwLock<MediaInner>>,
}

impl MediaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rename `path` to its tagged form and return the tagged path.
    ///
    /// Idempotent: re-tagging a path (or its tagged form, or another file
    /// with equal content) returns the existing tagged path. Concurrent
    /// calls for the same file are safe; losing a race at the read or the
    /// rename counts as success.
    pub fn tag(&self, path: &Path) -> Result<PathBuf> {
        if let Some(existing) = self.claimed(path) {
            return Ok(existing);
        }

        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(source) => {
                // A concurrent call may have registered and renamed the
                // file between the check above and this read. Registration
                // happens before the rename, so if the file is gone to a
                // duplicate call its record is already visible.
                if let Some(existing) = self.claimed(path) {
                    tracing::debug!(path = %path.display(), "media file already claimed concurrently");
                    return Ok(existing);
                }
                return Err(Error::Tagging {
                    path: path.display().to_string(),
                    source,
                });
            }
        };
        let digest = content_digest(&bytes);
        // A name already carrying this digest must not be tagged again.
        let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        let target = match crate::identity::digest_from_name(file_name) {
            Some(tag) if tag == digest => path.to_path_buf(),
            _ => tagged_path(path, &digest),
        };

        {
            let mut inner = self.inner.write();
            if let Some(existing) = inner.tagged.get(&digest) {
                return Ok(existing.tagged.clone());
            }
            inner.order.push(digest.clone());
            inner.by_original.insert(path.to_path_buf(), digest.clone());
            inner.tagged.insert(
                digest.clone(),
                TaggedFile {
                    digest: digest.clone(),
                    original: path.to_path_buf(),
                    tagged: target.clone(),
                },
            );
        }

        if path == target {
            // Asked to tag an already-tagged path; nothing to rename.
            return Ok(target);
        }
        if let Err(source) = std::fs::rename(path, &target) {
            if target.exists() && !path.exists() {
                // Lost the race to a concurrent call that already moved it.
                tracing::debug!(path = %path.display(), "media file already tagged concurrently");
                return Ok(target);
            }
            let mut inner = self.inner.write();
            inner.tagged.remove(&digest);
            inner.by_original.remove(path);
            inner.order.retain(|d| d != &digest);
            return Err(Error::Tagging {
                path: path.display().to_string(),
                source,
            });
        }
        tracing::debug!(from = %path.display(), to = %target.display(), "tagged media file");
        Ok(target)
    }

    /// The tagged path recorded for an original path, if any call has
    /// claimed it.
    fn claimed(&self, path: &Path) -> Option<PathBuf> {
        let inner = self.inner.read();
        let digest = inner.by_original.get(path)?;
        inner.tagged.get(digest).map(|file| file.tagged.clone())
    }

    /// Record the placement decided for a tagged file.
    pub fn record_placement(&self, digest: &str, placement: MediaPlacement) {
        self.inner.write().placements.insert(digest.to_string(), placement);
    }

    /// The placement recorded for `digest`, if any.
    pub fn placement(&self, digest: &str) -> Option<MediaPlacement> {
        self.inner.read().placements.get(digest).cloned()
    }

    /// All rename records, in tag order.
    pub fn tagged_files(&self) -> Vec<TaggedFile> {
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .filter_map(|digest| inner.tagged.get(digest).cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().tagged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reverse every recorded rename and drain the registry.
    ///
    /// Returns the number of files restored plus the failures. A tagged
    /// file that is already back at its original path counts as restored.
    pub fn restore_all(&self) -> (usize, Vec<(PathBuf, std::io::Error)>) {
        let drained: Vec<TaggedFile> = {
            let mut inner = self.inner.write();
            let order = std::mem::take(&mut inner.order);
            let mut tagged = std::mem::take(&mut inner.tagged);
            inner.by_original.clear();
            order
                .iter()
                .filter_map(|digest| tagged.remove(digest))
                .collect()
        };

        let mut restored = 0;
        let mut failures = Vec::new();
        for file in drained {
            if file.tagged == file.original {
                restored += 1;
                continue;
            }
            match std::fs::rename(&file.tagged, &file.original) {
                Ok(()) => {
                    tracing::debug!(path = %file.original.display(), "restored media file");
                    restored += 1;
                }
                Err(source) => {
                    if file.original.exists() && !file.tagged.exists() {
                        restored += 1;
                        continue;
                    }
                    tracing::warn!(
                        path = %file.tagged.display(),
                        error = %source,
                        "failed to restore media file"
                    );
                    failures.push((file.tagged, source));
                }
            }
        }
        (restored, failures)
    }
}

/// What the naming phase needs to know about a group key: the section that
/// prefixes the final path and the display name of the artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameEntry {
    pub section: Option<String>,
    pub name: String,
}

/// Concurrent map from group-key strings to [`NameEntry`] records.
///
/// First write wins: grouping decisions are deterministic, so a repeat
/// insert under the same key carries the same payload.
#[derive(Debug, Clone, Default)]
pub struct NameTable {
    inner: Arc<RwLock<FxHashMap<String, NameEntry>>>,
}

impl NameTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, key: impl Into<String>, entry: NameEntry) {
        self.inner.write().entry(key.into()).or_insert(entry);
    }

    pub fn lookup(&self, key: &str) -> Option<NameEntry> {
        self.inner.read().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn clear(&self) {
        self.inner.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagging_renames_and_registers() {
        let dir = tempfile::tempdir().expect("tempdir");
        let original = dir.path().join("photo.png");
        std::fs::write(&original, b"pixels").expect("write");

        let registry = MediaRegistry::new();
        let tagged = registry.tag(&original).expect("tag");

        assert!(!original.exists());
        assert!(tagged.exists());
        assert_eq!(registry.len(), 1);
        let name = tagged.file_name().and_then(|n| n.to_str()).expect("name");
        assert!(name.starts_with("photo"));
        assert!(name.ends_with(".png"));
        assert_eq!(name.len(), "photo.png".len() + 8);
    }

    #[test]
    fn tagging_is_idempotent_per_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let original = dir.path().join("photo.png");
        std::fs::write(&original, b"pixels").expect("write");

        let registry = MediaRegistry::new();
        let first = registry.tag(&original).expect("tag");
        let second = registry.tag(&original).expect("re-tag");
        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn tagging_the_tagged_path_is_a_no_op() {
        let dir = tempfile::tempdir().expect("tempdir");
        let original = dir.path().join("photo.png");
        std::fs::write(&original, b"pixels").expect("write");

        let registry = MediaRegistry::new();
        let tagged = registry.tag(&original).expect("tag");
        let again = registry.tag(&tagged).expect("tag tagged");
        assert_eq!(tagged, again);
        assert_eq!(registry.len(), 1);
        assert!(tagged.exists());
    }

    #[test]
    fn equal_content_shares_one_record() {
        let dir = tempfile::tempdir().expect("tempdir");
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        std::fs::write(&a, b"same bytes").expect("write");
        std::fs::write(&b, b"same bytes").expect("write");

        let registry = MediaRegistry::new();
        let tagged_a = registry.tag(&a).expect("tag a");
        let tagged_b = registry.tag(&b).expect("tag b");
        assert_eq!(tagged_a, tagged_b);
        assert_eq!(registry.len(), 1);
        // The second file was never renamed.
        assert!(b.exists());
    }

    #[test]
    fn missing_files_fail_to_tag() {
        let dir = tempfile::tempdir().expect("tempdir");
        let registry = MediaRegistry::new();
        let err = registry.tag(&dir.path().join("absent.png")).unwrap_err();
        assert!(matches!(err, Error::Tagging { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn concurrent_tags_collapse_onto_one_record() {
        let dir = tempfile::tempdir().expect("tempdir");
        let original = dir.path().join("photo.png");
        std::fs::write(&original, b"pixels").expect("write");

        let registry = MediaRegistry::new();
        let barrier = std::sync::Barrier::new(8);
        let results: Vec<PathBuf> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        registry.tag(&original).expect("tag")
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().expect("join")).collect()
        });

        let tagged = &results[0];
        assert!(results.iter().all(|p| p == tagged));
        assert!(tagged.exists());
        assert!(!original.exists());
        assert_eq!(registry.len(), 1);

        let (restored, failures) = registry.restore_all();
        assert_eq!(restored, 1);
        assert!(failures.is_empty());
        assert!(original.exists());
    }

    #[test]
    fn concurrent_duplicate_tags_never_fail() {
        let dir = tempfile::tempdir().expect("tempdir");
        let registry = MediaRegistry::new();

        // Fresh file per round so every round races the claim itself, not
        // the idempotent early return.
        for round in 0..256 {
            let original = dir.path().join(format!("photo-{round}.png"));
            std::fs::write(&original, format!("pixels {round}")).expect("write");

            let barrier = std::sync::Barrier::new(4);
            let results: Vec<Result<PathBuf>> = std::thread::scope(|scope| {
                let handles: Vec<_> = (0..4)
                    .map(|_| {
                        scope.spawn(|| {
                            barrier.wait();
                            registry.tag(&original)
                        })
                    })
                    .collect();
                handles.into_iter().map(|h| h.join().expect("join")).collect()
            });

            // A call that loses the race at any step gets the winner's
            // tagged path back, never an error.
            let first = results[0].as_ref().expect("tag");
            for result in &results {
                assert_eq!(result.as_ref().expect("tag"), first);
            }
        }

        assert_eq!(registry.len(), 256);
        let (restored, failures) = registry.restore_all();
        assert_eq!(restored, 256);
        assert!(failures.is_empty());
    }

    #[test]
    fn restore_reverses_renames() {
        let dir = tempfile::tempdir().expect("tempdir");
        let original = dir.path().join("photo.png");
        std::fs::write(&original, b"pixels").expect("write");

        let registry = MediaRegistry::new();
        let tagged = registry.tag(&original).expect("tag");
        let (restored, failures) = registry.restore_all();

        assert_eq!(restored, 1);
        assert!(failures.is_empty());
        assert!(original.exists());
        assert!(!tagged.exists());
        assert!(registry.is_empty());
    }

    #[test]
    fn restore_reports_missing_tagged_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let original = dir.path().join("photo.png");
        std::fs::write(&original, b"pixels").expect("write");

        let registry = MediaRegistry::new();
        let tagged = registry.tag(&original).expect("tag");
        std::fs::remove_file(&tagged).expect("remove");

        let (restored, failures) = registry.restore_all();
        assert_eq!(restored, 0);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, tagged);
    }

    #[test]
    fn restore_twice_is_a_no_op() {
        let dir = tempfile::tempdir().expect("tempdir");
        let original = dir.path().join("photo.png");
        std::fs::write(&original, b"pixels").expect("write");

        let registry = MediaRegistry::new();
        registry.tag(&original).expect("tag");
        let (first, _) = registry.restore_all();
        let (second, failures) = registry.restore_all();
        assert_eq!(first, 1);
        assert_eq!(second, 0);
        assert!(failures.is_empty());
    }

    #[test]
    fn placements_round_trip() {
        let registry = MediaRegistry::new();
        let placement = MediaPlacement {
            section: Some("pageA".to_string()),
            subpath: "photos/".to_string(),
        };
        registry.record_placement("1a2b3c4d", placement.clone());
        assert_eq!(registry.placement("1a2b3c4d"), Some(placement));
        assert_eq!(registry.placement("ffffffff"), None);
    }

    #[test]
    fn name_table_first_write_wins() {
        let table = NameTable::new();
        table.record(
            "intro/home",
            NameEntry { section: Some("intro".into()), name: "home".into() },
        );
        table.record(
            "intro/home",
            NameEntry { section: None, name: "other".into() },
        );
        let entry = table.lookup("intro/home").expect("entry");
        assert_eq!(entry.section.as_deref(), Some("intro"));
        assert_eq!(entry.name, "home");
        assert_eq!(table.lookup("missing"), None);
    }
}
