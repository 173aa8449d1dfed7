//! Source layout: mapping module ids to sections and entry labels.
//!
//! A section is the first directory component under the configured source
//! root. Everything downstream keys placement off it: chunk group records,
//! media placements and final output paths.

use std::path::Path;

use path_clean::PathClean;

use cubby_graph::ModuleId;

/// A cleaned source root and the path queries defined relative to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLayout {
    root: String,
}

impl SourceLayout {
    /// Build a layout for `root`. The root is cleaned and normalized to
    /// forward slashes; a trailing slash is ignored.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let cleaned = root.as_ref().to_path_buf().clean();
        let mut root = cleaned.to_string_lossy().replace('\\', "/");
        while root.len() > 1 && root.ends_with('/') {
            root.pop();
        }
        Self { root }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Whether `id` lives under the source root.
    pub fn contains(&self, id: &ModuleId) -> bool {
        self.relative(id).is_some()
    }

    /// The path of `id` relative to the root, queries stripped.
    ///
    /// `None` for ids outside the root and for the root itself. Prefix
    /// matching respects path boundaries: a root of `/src` does not
    /// contain `/srcx/a.js`.
    pub fn relative<'a>(&self, id: &'a ModuleId) -> Option<&'a str> {
        let path = strip_query(id.as_str());
        let rest = if self.root == "/" {
            path.strip_prefix('/')?
        } else {
            path.strip_prefix(self.root.as_str())?.strip_prefix('/')?
        };
        (!rest.is_empty()).then_some(rest)
    }

    /// The section owning `id`: the first directory component under the
    /// root. `None` outside the root and for files sitting directly in
    /// the root with no section directory above them.
    pub fn section_of(&self, id: &ModuleId) -> Option<String> {
        let rel = self.relative(id)?;
        let (first, _) = rel.split_once('/')?;
        (!first.is_empty()).then(|| first.to_string())
    }

    /// The single section shared by every id, or `None` when the ids span
    /// sections (or any id has no section).
    pub fn common_section<'a, I>(&self, ids: I) -> Option<String>
    where
        I: IntoIterator<Item = &'a ModuleId>,
    {
        let mut iter = ids.into_iter();
        let first = self.section_of(iter.next()?)?;
        for id in iter {
            if self.section_of(id).as_deref() != Some(first.as_str()) {
                return None;
            }
        }
        Some(first)
    }

    /// Human-readable label for an entry point: its directory path under
    /// the root joined with the file stem, with `index.*` stems collapsed
    /// into the directory name.
    ///
    /// `<root>/intro/home/index.html` -> `intro/home`
    /// `<root>/intro/about.js`        -> `intro/about`
    pub fn entry_label(&self, id: &ModuleId) -> Option<String> {
        let rel = self.relative(id)?;
        let mut parts: Vec<&str> = rel.split('/').filter(|p| !p.is_empty()).collect();
        let file = parts.pop()?;
        let stem = first_dot_stem(file);
        if stem.is_empty() {
            return None;
        }
        if stem != "index" {
            parts.push(stem);
        }
        if parts.is_empty() {
            // A root-level index file has no directory to borrow a name from.
            return Some(stem.to_string());
        }
        Some(parts.join("/"))
    }

    /// Directory path between the section and the file, used to keep media
    /// subdirectories intact in the output tree. Empty for files directly
    /// under their section; always `/`-terminated otherwise.
    pub fn media_subpath(&self, id: &ModuleId) -> String {
        let Some(rel) = self.relative(id) else {
            return String::new();
        };
        let mut parts: Vec<&str> = rel.split('/').collect();
        parts.pop();
        if parts.len() <= 1 {
            return String::new();
        }
        let mut subpath = parts[1..].join("/");
        subpath.push('/');
        subpath
    }
}

/// Drop a `?query` suffix from a module id string.
pub(crate) fn strip_query(id: &str) -> &str {
    match id.split_once('?') {
        Some((path, _)) => path,
        None => id,
    }
}

/// The display stem of a file name: everything before the first dot.
/// Virtual-id names like `App.svelte?svelte&lang.css` display as `App`.
pub(crate) fn first_dot_stem(name: &str) -> &str {
    let stem = name.split('.').next().unwrap_or(name);
    if stem.is_empty() { name } else { stem }
}

/// The display stem of a module id: file name up to the first dot,
/// queries stripped.
pub(crate) fn module_stem(id: &ModuleId) -> &str {
    let path = strip_query(id.as_str());
    let file = path.rsplit('/').next().unwrap_or(path);
    first_dot_stem(file)
}
