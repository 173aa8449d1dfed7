//! Module identifiers.
//!
//! Every module the host bundler discovers is keyed by a path-like id.
//! `ModuleId` keeps that id cheap to clone and separator-stable so that
//! section and naming logic behaves identically on every platform.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error produced when constructing a [`ModuleId`] from invalid input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModuleIdError {
    /// The supplied path was empty or whitespace-only.
    #[error("module id cannot be empty")]
    EmptyPath,
}

/// A unique, path-like module identifier.
///
/// Ids are `Arc<str>` inside, so cloning is a refcount bump. Backslashes
/// are normalized to forward slashes on construction.
///
/// # Examples
///
/// ```
/// use cubby_graph::ModuleId;
///
/// let id = ModuleId::new("/srv/app/src/intro/home/index.js")?;
/// assert_eq!(id.as_str(), "/srv/app/src/intro/home/index.js");
/// # Ok::<(), cubby_graph::ModuleIdError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleId(Arc<str>);

impl ModuleId {
    /// Create a module id from a path-like string.
    ///
    /// Rejects empty and whitespace-only input; normalizes `\` to `/`.
    pub fn new(path: impl AsRef<str>) -> Result<Self, ModuleIdError> {
        let raw = path.as_ref();
        if raw.trim().is_empty() {
            return Err(ModuleIdError::EmptyPath);
        }
        Ok(Self::normalized(raw))
    }

    /// Create a synthetic id without validation.
    ///
    /// Intended for virtual modules and tests where the id is not a real
    /// file system path.
    pub fn new_virtual(id: impl Into<String>) -> Self {
        let raw: String = id.into();
        Self::normalized(&raw)
    }

    fn normalized(raw: &str) -> Self {
        if raw.contains('\\') {
            ModuleId(Arc::from(raw.replace('\\', "/").as_str()))
        } else {
            ModuleId(Arc::from(raw))
        }
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The id as an owned string.
    pub fn path_string(&self) -> String {
        self.0.to_string()
    }

    /// The id viewed as a path.
    pub fn as_path(&self) -> &Path {
        Path::new(self.as_str())
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ModuleId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_input() {
        assert_eq!(ModuleId::new("").unwrap_err(), ModuleIdError::EmptyPath);
        assert_eq!(ModuleId::new("   ").unwrap_err(), ModuleIdError::EmptyPath);
    }

    #[test]
    fn normalizes_backslashes() {
        let id = ModuleId::new(r"C:\src\intro\home.js").unwrap();
        assert_eq!(id.as_str(), "C:/src/intro/home.js");
    }

    #[test]
    fn virtual_ids_skip_validation() {
        let id = ModuleId::new_virtual("virtual:entry");
        assert_eq!(id.as_str(), "virtual:entry");
    }

    #[test]
    fn clones_compare_equal() {
        let id = ModuleId::new("/src/a.js").unwrap();
        assert_eq!(id, id.clone());
        assert_eq!(id.to_string(), "/src/a.js");
    }
}
