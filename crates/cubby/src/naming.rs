//! Artifact descriptors and final path composition.
//!
//! Final output paths always have the shape
//! `<static>/<section>/<kind>/<subpath><name>-<digest><ext>`: section
//! before kind, a content digest on every file, the original extension
//! preserved.

use serde::{Deserialize, Serialize};

use cubby_graph::ModuleId;

/// An emitted non-chunk artifact as the host bundler presents it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetDescriptor {
    /// Artifact name, typically a file name. Hosts occasionally emit
    /// nameless assets; those fall back to a literal placeholder.
    pub name: Option<String>,
    /// Artifact bytes, hashed into the final name.
    pub source: Vec<u8>,
}

impl AssetDescriptor {
    pub fn new(name: impl Into<String>, source: impl Into<Vec<u8>>) -> Self {
        Self { name: Some(name.into()), source: source.into() }
    }

    pub fn unnamed(source: impl Into<Vec<u8>>) -> Self {
        Self { name: None, source: source.into() }
    }
}

/// An emitted chunk as the host bundler presents it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkDescriptor {
    /// Chunk name; for grouped chunks this is the group key's string form.
    pub name: String,
    /// Whether the chunk is an entry chunk.
    pub is_entry: bool,
    /// The module the chunk was generated for, when the host knows it.
    pub facade_module: Option<ModuleId>,
    /// Ids of all modules bundled into the chunk.
    pub module_ids: Vec<ModuleId>,
    /// Chunk bytes, hashed into the final name.
    pub source: Vec<u8>,
}

impl ChunkDescriptor {
    pub fn new(name: impl Into<String>, source: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            is_entry: false,
            facade_module: None,
            module_ids: Vec::new(),
            source: source.into(),
        }
    }

    pub fn entry(mut self, is_entry: bool) -> Self {
        self.is_entry = is_entry;
        self
    }

    pub fn facade(mut self, id: ModuleId) -> Self {
        self.facade_module = Some(id.clone());
        if !self.module_ids.contains(&id) {
            self.module_ids.push(id);
        }
        self
    }

    pub fn module(mut self, id: ModuleId) -> Self {
        if !self.module_ids.contains(&id) {
            self.module_ids.push(id);
        }
        self
    }
}

/// A fully resolved output path, kept structured so the manifest can
/// record its parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedPath {
    pub section: String,
    pub kind: String,
    pub path: String,
}

/// Compose a final output path.
///
/// `subpath` is empty or `/`-terminated; `ext` is empty or starts with a
/// dot. The digest is spliced with a dash so restores and cache busting
/// stay greppable.
pub(crate) fn compose(
    static_root: &str,
    section: &str,
    kind: &str,
    subpath: &str,
    name: &str,
    digest: &str,
    ext: &str,
) -> PlacedPath {
    PlacedPath {
        section: section.to_string(),
        kind: kind.to_string(),
        path: format!("{static_root}/{section}/{kind}/{subpath}{name}-{digest}{ext}"),
    }
}

/// Split a name into (stem, extension) at the last dot of its final path
/// segment. The extension keeps its dot; names without one get `""`.
pub(crate) fn stem_and_ext(name: &str) -> (&str, &str) {
    let split_at = match name.rsplit('/').next() {
        Some(file) if !file.is_empty() => {
            let base = name.len() - file.len();
            match file.rfind('.') {
                Some(idx) if idx > 0 => Some(base + idx),
                _ => None,
            }
        }
        _ => None,
    };
    match split_at {
        Some(idx) => (&name[..idx], &name[idx..]),
        None => (name, ""),
    }
}

/// The final path segment of a name; group keys and chunk names may carry
/// directory-like prefixes that must not leak into file names.
pub(crate) fn last_segment(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}
