//! Organizer configuration.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use cubby_graph::ModuleId;

use crate::section::SourceLayout;
use crate::{Error, Result};

/// Caller-supplied grouping override: maps a module id to a named bucket,
/// or `None` to leave the module to the automatic policy.
pub type ManualGroupFn = dyn Fn(&ModuleId) -> Option<String> + Send + Sync;

/// What to do with an artifact no single section claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Place it under a named catch-all section.
    Bucket(String),
    /// Fail the build instead of guessing.
    Error,
}

impl FallbackPolicy {
    /// The conventional `shared` catch-all.
    pub fn shared() -> Self {
        Self::Bucket("shared".to_string())
    }
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self::shared()
    }
}

/// Pin chunks containing a matching module to a fixed name.
///
/// Typical use: one stable chunk for a framework runtime whose internal
/// file layout changes between releases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkPin {
    /// Substring matched against the ids of the chunk's modules.
    pub needle: String,
    /// File stem of the pinned chunk.
    pub name: String,
    /// Section override; the fallback policy applies when absent.
    pub section: Option<String>,
}

impl ChunkPin {
    pub fn new(needle: impl Into<String>, name: impl Into<String>) -> Self {
        Self { needle: needle.into(), name: name.into(), section: None }
    }

    pub fn section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }
}

/// Options for [`Organizer`](crate::Organizer).
///
/// ```
/// use cubby::{FallbackPolicy, OrganizerOptions};
///
/// let options = OrganizerOptions::new("/app/src")
///     .entry("intro/home", "/app/src/intro/home/index.html")
///     .static_root("static")
///     .fallback(FallbackPolicy::shared());
/// assert!(options.validate().is_ok());
/// ```
#[derive(Clone)]
pub struct OrganizerOptions {
    /// Directory the section structure lives under.
    pub source_root: PathBuf,
    /// Prefix of every final output path.
    pub static_root: String,
    /// Declared entry points: label -> path. Insertion order is kept and
    /// used for entry chunks whose facade module the host does not report.
    pub entries: IndexMap<String, PathBuf>,
    /// Placement for artifacts without a single owning section.
    pub fallback: FallbackPolicy,
    /// Fixed-name chunk pins, matched in order.
    pub pins: Vec<ChunkPin>,
    /// Manual grouping override, evaluated once per build over the whole
    /// module graph.
    pub manual_groups: Option<Arc<ManualGroupFn>>,
}

impl OrganizerOptions {
    pub fn new(source_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            static_root: "static".to_string(),
            entries: IndexMap::new(),
            fallback: FallbackPolicy::default(),
            pins: Vec::new(),
            manual_groups: None,
        }
    }

    pub fn static_root(mut self, prefix: impl Into<String>) -> Self {
        self.static_root = prefix.into();
        self
    }

    pub fn entry(mut self, label: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.entries.insert(label.into(), path.into());
        self
    }

    pub fn fallback(mut self, policy: FallbackPolicy) -> Self {
        self.fallback = policy;
        self
    }

    pub fn pin(mut self, pin: ChunkPin) -> Self {
        self.pins.push(pin);
        self
    }

    pub fn manual_groups<F>(mut self, group_fn: F) -> Self
    where
        F: Fn(&ModuleId) -> Option<String> + Send + Sync + 'static,
    {
        self.manual_groups = Some(Arc::new(group_fn));
        self
    }

    /// Validate the options. Called by [`Organizer::new`](crate::Organizer::new).
    pub fn validate(&self) -> Result<()> {
        if self.source_root.as_os_str().is_empty() {
            return Err(Error::InvalidConfig("source root cannot be empty".to_string()));
        }

        if self.static_root.is_empty() {
            return Err(Error::InvalidConfig(
                "static root prefix cannot be empty".to_string(),
            ));
        }
        if self.static_root.starts_with('/') {
            return Err(Error::InvalidConfig(
                "static root prefix must be relative".to_string(),
            ));
        }
        if self.static_root.split('/').any(|part| part == "..") {
            return Err(Error::InvalidConfig(
                "static root prefix cannot traverse upward".to_string(),
            ));
        }

        if let FallbackPolicy::Bucket(bucket) = &self.fallback {
            if bucket.is_empty() {
                return Err(Error::InvalidConfig(
                    "fallback bucket name cannot be empty".to_string(),
                ));
            }
            if bucket.contains('/') {
                return Err(Error::InvalidConfig(
                    "fallback bucket name cannot contain '/'".to_string(),
                ));
            }
        }

        let layout = SourceLayout::new(&self.source_root);
        for (label, path) in &self.entries {
            if label.is_empty() {
                return Err(Error::InvalidConfig("entry label cannot be empty".to_string()));
            }
            let id = ModuleId::new(path.to_string_lossy()).map_err(|_| {
                Error::InvalidConfig(format!("entry '{label}' has an empty path"))
            })?;
            if !layout.contains(&id) {
                return Err(Error::InvalidConfig(format!(
                    "entry '{label}' is not under the source root"
                )));
            }
        }

        for pin in &self.pins {
            if pin.needle.is_empty() {
                return Err(Error::InvalidConfig("pin needle cannot be empty".to_string()));
            }
            if pin.name.is_empty() {
                return Err(Error::InvalidConfig("pin name cannot be empty".to_string()));
            }
        }

        Ok(())
    }
}

impl fmt::Debug for OrganizerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrganizerOptions")
            .field("source_root", &self.source_root)
            .field("static_root", &self.static_root)
            .field("entries", &self.entries)
            .field("fallback", &self.fallback)
            .field("pins", &self.pins)
            .field("manual_groups", &self.manual_groups.as_ref().map(|_| "<fn>"))
            .finish()
    }
}
