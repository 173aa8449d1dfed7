//! # cubby-graph
//!
//! Pure graph primitives for the cubby output organizer.
//!
//! This crate provides the small read-only surface the organizer needs
//! from a host bundler's module graph, without any I/O or bundling logic:
//!
//! - [`ModuleId`] / [`ModuleInfo`]: identity and the reverse-import view
//!   of a module.
//! - [`ModuleGraph`]: the capability trait hosts implement to expose
//!   call-scoped graph queries.
//! - [`MemoryGraph`]: an in-memory reference implementation used by hosts
//!   that assemble the graph themselves, and by tests.
//! - [`walk::dependent_entry_points`]: the reverse-import walker that
//!   reconstructs "which entry points depend on this module" from local
//!   queries.
//!
//! ## Quick start
//!
//! ```
//! use cubby_graph::{ImportKind, MemoryGraph, ModuleId, ModuleInfo, walk};
//!
//! # fn main() -> cubby_graph::Result<()> {
//! let graph = MemoryGraph::new();
//! let entry = ModuleId::new("/src/intro/home/index.js").unwrap();
//! let util = ModuleId::new("/src/intro/home/util.js").unwrap();
//! graph.add_module(ModuleInfo::new(entry.clone()).entry(true));
//! graph.add_module(ModuleInfo::new(util.clone()));
//! graph.add_import(&entry, &util, ImportKind::Static)?;
//!
//! let dependents = walk::dependent_entry_points(&graph, &util)?;
//! assert_eq!(dependents.entries, vec![entry]);
//! # Ok(())
//! # }
//! ```

pub mod graph;
pub mod memory;
pub mod module;
pub mod module_id;
pub mod walk;

pub use graph::ModuleGraph;
pub use memory::MemoryGraph;
pub use module::{ImportKind, ModuleInfo};
pub use module_id::{ModuleId, ModuleIdError};
pub use walk::{DependentEntries, dependent_entry_points};

/// Error types for cubby-graph operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A module id was queried that the graph does not know about. This
    /// signals that the organizer and the host bundler are out of sync,
    /// and later build phases cannot assume a consistent graph.
    #[error("unknown module id '{id}' (module graph out of sync)")]
    UnknownModule {
        /// The offending module id.
        id: ModuleId,
    },

    /// Invalid module id input.
    #[error(transparent)]
    InvalidId(#[from] ModuleIdError),
}

/// Result type alias for cubby-graph operations.
pub type Result<T> = std::result::Result<T, Error>;
