#![cfg_attr(docsrs, feature(doc_cfg))]

//! # cubby
//!
//! Cubby - section-aware output organizer for bundler pipelines.
//!
//! Multi-page builds flatten their output into one directory; cubby keeps
//! the source tree's top-level structure instead. Every emitted artifact
//! lands under `<static>/<section>/<kind>/`, where the section is the
//! first directory under the source root that owns the artifact and the
//! kind is derived from its file type. Ownership is computed from the
//! module graph: an artifact belongs to a section when every entry point
//! that transitively depends on it lives there.
//!
//! The crate is host-agnostic: it never talks to a bundler directly.
//! Hosts adapt their plugin hooks to a [`BuildSession`]'s phase methods
//! and hand it a [`ModuleGraph`] view of their module state.
//!
//! ## Quick Start
//!
//! ```
//! use cubby::{ChunkDescriptor, Organizer, OrganizerOptions};
//! use cubby_graph::{ImportKind, MemoryGraph, ModuleId, ModuleInfo};
//!
//! # fn main() -> cubby::Result<()> {
//! let graph = MemoryGraph::new();
//! let entry = ModuleId::new_virtual("/app/src/intro/home/index.html");
//! let util = ModuleId::new_virtual("/app/src/intro/home/util.js");
//! graph.add_module(ModuleInfo::new(entry.clone()).entry(true));
//! graph.add_module(ModuleInfo::new(util.clone()));
//! graph.add_import(&entry, &util, ImportKind::Static)?;
//!
//! let organizer = Organizer::new(OrganizerOptions::new("/app/src"))?;
//! let session = organizer.begin_build(&graph)?;
//!
//! // Chunking phase: modules owned by one entry group under its label.
//! let key = session.decide_chunk_group(&util, &graph)?.expect("grouped");
//! assert_eq!(key.as_str(), "intro/home");
//!
//! // Emission phase: the group key resolves to a sectioned path.
//! let chunk = ChunkDescriptor::new(key.as_str(), b"bundled".to_vec());
//! let path = session.name_chunk(&chunk)?;
//! assert!(path.starts_with("static/intro/js/home-"));
//!
//! let report = session.finish();
//! assert_eq!(report.manifest.len(), 1);
//! # Ok(()) }
//! ```

// Re-export everything from the foundation crate
pub use cubby_graph::*;

// Organizer modules
pub mod classify;
pub mod config;
pub mod grouping;
pub mod identity;
pub mod manifest;
pub mod naming;
pub mod registry;
pub mod section;
pub mod session;

pub use classify::ArtifactKind;
pub use config::{ChunkPin, FallbackPolicy, ManualGroupFn, OrganizerOptions};
pub use grouping::GroupKey;
pub use identity::{TAG_LEN, content_digest, digest_from_name, tagged_path, untagged_path};
pub use manifest::{MANIFEST_VERSION, ArtifactRecord, OutputManifest};
pub use naming::{AssetDescriptor, ChunkDescriptor, PlacedPath};
pub use registry::{MediaPlacement, MediaRegistry, NameEntry, NameTable, TaggedFile};
pub use section::SourceLayout;
pub use session::{BuildReport, BuildSession, OrganizeWarning, Organizer};

// Logging utilities (optional, enabled with "logging" feature)
#[cfg(feature = "logging")]
#[cfg_attr(docsrs, doc(cfg(feature = "logging")))]
pub mod logging;

#[cfg(feature = "logging")]
#[cfg_attr(docsrs, doc(cfg(feature = "logging")))]
pub use logging::{LogLevel, init_logging, init_logging_from_env};

/// Error types for cubby operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No section claims an artifact and the fallback policy forbids
    /// placing it in a catch-all bucket.
    #[error("No section claims artifact: {artifact}")]
    NoSection { artifact: String },

    /// Renaming a media file to its identity-tagged form failed.
    #[error("Media tagging failed for {path}: {source}")]
    Tagging {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Manifest serialization failed.
    #[error("Manifest serialization failed: {0}")]
    Manifest(#[from] serde_json::Error),

    /// Error from the foundation crate.
    #[error("Graph error: {0}")]
    Graph(#[from] cubby_graph::Error),
}

/// Result type alias for cubby operations.
pub type Result<T> = std::result::Result<T, Error>;

impl miette::Diagnostic for Error {
    fn code(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        Some(Box::new(match self {
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Io(_) => "IO_ERROR",
            Error::NoSection { .. } => "NO_SECTION",
            Error::Tagging { .. } => "TAGGING_FAILED",
            Error::Manifest(_) => "MANIFEST_ERROR",
            Error::Graph(_) => "GRAPH_DESYNC",
        }))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(miette::Severity::Error)
    }

    fn help(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        match self {
            Error::InvalidConfig(msg) => Some(Box::new(format!(
                "Check the organizer options.\nError: {}",
                msg
            ))),
            Error::NoSection { artifact } => Some(Box::new(format!(
                "No single section owns '{}'. Either move its importers into one section or allow a catch-all with FallbackPolicy::Bucket.",
                artifact
            ))),
            Error::Tagging { path, .. } => Some(Box::new(format!(
                "Could not rename '{}' to its content-tagged form. Check that the file exists and the directory is writable.",
                path
            ))),
            Error::Graph(_) => Some(Box::new(
                "The host bundler reported a module this build never saw. Ensure every resolution goes through the session before chunking starts."
                    .to_string(),
            )),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests;
