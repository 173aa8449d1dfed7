//! Reverse-import traversal: which entry points depend on a module?
//!
//! The host bundler only answers local queries ("who imports X?"), so
//! global knowledge is reconstructed by walking the reverse-import
//! relation backward from a module until every reachable importer has
//! been visited. This is the most expensive primitive in the crate;
//! callers are expected to memoize results per module within a build.

use std::collections::VecDeque;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::graph::ModuleGraph;
use crate::module_id::ModuleId;
use crate::{Error, Result};

/// Result of walking the reverse-import relation from one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependentEntries {
    /// Entry points that transitively depend on the module, in visit
    /// order, each listed once.
    pub entries: Vec<ModuleId>,
    /// Whether any traversed module is the target of a dynamic import.
    pub crossed_dynamic: bool,
}

impl DependentEntries {
    /// Convenience for the common single-owner check.
    pub fn sole_entry(&self) -> Option<&ModuleId> {
        match self.entries.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }
}

/// Compute the set of entry points that transitively import `start`,
/// following both static and dynamic importer edges.
///
/// Breadth-first with a visited set keyed by module id, so cyclic import
/// graphs terminate without a depth limit. The start module itself counts
/// when it is an entry. `crossed_dynamic` is set when any traversed
/// module (the start included) has dynamic importers; since every
/// importer is itself traversed, that is equivalent to "some traversed
/// edge was dynamic".
///
/// # Errors
///
/// Returns [`Error::UnknownModule`] if `start` or any importer reached
/// during the walk is not known to the graph. That means the organizer
/// and the host bundler disagree about the module set, and later phases
/// cannot be trusted, so the caller should abort the build.
pub fn dependent_entry_points(
    graph: &dyn ModuleGraph,
    start: &ModuleId,
) -> Result<DependentEntries> {
    let info = graph
        .module_info(start)
        .ok_or_else(|| Error::UnknownModule { id: start.clone() })?;

    let mut entries = Vec::new();
    let mut crossed_dynamic = !info.dynamic_importers.is_empty();
    if info.is_entry {
        entries.push(start.clone());
    }

    let mut visited: FxHashSet<ModuleId> = FxHashSet::default();
    visited.insert(start.clone());

    let mut queue: VecDeque<ModuleId> = VecDeque::new();
    for importer in info.dynamic_importers.iter().chain(info.importers.iter()) {
        if visited.insert(importer.clone()) {
            queue.push_back(importer.clone());
        }
    }

    while let Some(current) = queue.pop_front() {
        let info = graph
            .module_info(&current)
            .ok_or_else(|| Error::UnknownModule { id: current.clone() })?;

        if info.is_entry {
            entries.push(current.clone());
        }
        if !info.dynamic_importers.is_empty() {
            crossed_dynamic = true;
        }

        for importer in info.dynamic_importers.iter().chain(info.importers.iter()) {
            if visited.insert(importer.clone()) {
                queue.push_back(importer.clone());
            }
        }
    }

    Ok(DependentEntries {
        entries,
        crossed_dynamic,
    })
}
