//! In-memory [`ModuleGraph`] implementation.
//!
//! `MemoryGraph` is the reference graph for hosts that assemble module
//! information themselves, and the backbone of every test in the
//! workspace. It maintains reverse-import edges eagerly so the walker can
//! traverse importers without a separate indexing pass.

use std::sync::Arc;

use parking_lot::RwLock;
use path_clean::PathClean;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::graph::ModuleGraph;
use crate::module::{ImportKind, ModuleInfo};
use crate::module_id::ModuleId;
use crate::{Error, Result};

#[derive(Debug, Default)]
struct GraphInner {
    modules: FxHashMap<ModuleId, ModuleInfo>,
    entry_points: FxHashSet<ModuleId>,
    resolutions: FxHashMap<String, ModuleId>,
    /// Insertion order, so `module_ids()` is stable across calls.
    insertion: Vec<ModuleId>,
}

/// HashMap-backed module graph with interior mutability.
///
/// Cloning is cheap (`Arc` inside); clones observe the same graph.
/// Multiple threads may read concurrently; mutations take the write lock.
#[derive(Debug, Clone, Default)]
pub struct MemoryGraph {
    inner: Arc<RwLock<GraphInner>>,
}

impl MemoryGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a module record.
    pub fn add_module(&self, info: ModuleInfo) {
        let mut guard = self.inner.write();
        let inner = &mut *guard;
        if info.is_entry {
            inner.entry_points.insert(info.id.clone());
        }
        if !inner.modules.contains_key(&info.id) {
            inner.insertion.push(info.id.clone());
        }
        inner.modules.insert(info.id.clone(), info);
    }

    /// Record that `from` imports `to`, maintaining the reverse edge on
    /// the target module. Duplicate edges are ignored.
    pub fn add_import(&self, from: &ModuleId, to: &ModuleId, kind: ImportKind) -> Result<()> {
        let mut guard = self.inner.write();
        let inner = &mut *guard;
        if !inner.modules.contains_key(from) {
            return Err(Error::UnknownModule { id: from.clone() });
        }
        match inner.modules.get_mut(to) {
            Some(target) => {
                target.push_importer(from.clone(), kind);
                Ok(())
            }
            None => Err(Error::UnknownModule { id: to.clone() }),
        }
    }

    /// Mark an existing module as an entry point.
    pub fn mark_entry(&self, id: &ModuleId) -> Result<()> {
        let mut guard = self.inner.write();
        let inner = &mut *guard;
        match inner.modules.get_mut(id) {
            Some(module) => {
                module.is_entry = true;
                inner.entry_points.insert(id.clone());
                Ok(())
            }
            None => Err(Error::UnknownModule { id: id.clone() }),
        }
    }

    /// Register an exact specifier → id resolution.
    pub fn register_resolution(&self, specifier: impl Into<String>, id: ModuleId) {
        self.inner.write().resolutions.insert(specifier.into(), id);
    }

    /// Entry points in a stable (sorted) order.
    pub fn entry_points(&self) -> Vec<ModuleId> {
        let mut entries: Vec<_> = self.inner.read().entry_points.iter().cloned().collect();
        entries.sort();
        entries
    }

    /// Number of modules in the graph.
    pub fn len(&self) -> usize {
        self.inner.read().modules.len()
    }

    /// Whether the graph contains no modules.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ModuleGraph for MemoryGraph {
    fn module_info(&self, id: &ModuleId) -> Option<ModuleInfo> {
        self.inner.read().modules.get(id).cloned()
    }

    fn module_ids(&self) -> Vec<ModuleId> {
        self.inner.read().insertion.clone()
    }

    fn resolve(&self, specifier: &str, importer: Option<&ModuleId>) -> Option<ModuleId> {
        let inner = self.inner.read();
        if let Some(id) = inner.resolutions.get(specifier) {
            return Some(id.clone());
        }
        // A specifier that already names a known module resolves to itself.
        let direct = ModuleId::new_virtual(specifier);
        if inner.modules.contains_key(&direct) {
            return Some(direct);
        }
        // Relative specifiers resolve against the importer's directory.
        if specifier.starts_with('.') {
            if let Some(importer) = importer {
                let base = importer.as_path().parent()?;
                let joined = base.join(specifier).clean();
                let candidate = ModuleId::new_virtual(joined.to_string_lossy().into_owned());
                if inner.modules.contains_key(&candidate) {
                    return Some(candidate);
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(graph: &MemoryGraph, id: &str) -> ModuleId {
        let module_id = ModuleId::new_virtual(id);
        graph.add_module(ModuleInfo::new(module_id.clone()));
        module_id
    }

    #[test]
    fn add_import_maintains_reverse_edges() {
        let graph = MemoryGraph::new();
        let a = module(&graph, "/src/a.js");
        let b = module(&graph, "/src/b.js");
        graph.add_import(&a, &b, ImportKind::Static).unwrap();
        graph.add_import(&a, &b, ImportKind::Static).unwrap();

        let info = graph.module_info(&b).unwrap();
        assert_eq!(info.importers, vec![a]);
        assert!(info.dynamic_importers.is_empty());
    }

    #[test]
    fn add_import_rejects_unknown_modules() {
        let graph = MemoryGraph::new();
        let a = module(&graph, "/src/a.js");
        let ghost = ModuleId::new_virtual("/src/ghost.js");
        let err = graph.add_import(&a, &ghost, ImportKind::Dynamic).unwrap_err();
        assert!(matches!(err, Error::UnknownModule { id } if id == ghost));
    }

    #[test]
    fn module_ids_preserve_insertion_order() {
        let graph = MemoryGraph::new();
        let a = module(&graph, "/src/a.js");
        let b = module(&graph, "/src/b.js");
        let c = module(&graph, "/src/c.js");
        assert_eq!(graph.module_ids(), vec![a, b, c]);
    }

    #[test]
    fn mark_entry_updates_module_and_set() {
        let graph = MemoryGraph::new();
        let a = module(&graph, "/src/a.js");
        graph.mark_entry(&a).unwrap();
        assert!(graph.module_info(&a).unwrap().is_entry);
        assert_eq!(graph.entry_points(), vec![a]);
    }

    #[test]
    fn resolve_prefers_registered_resolutions() {
        let graph = MemoryGraph::new();
        let a = module(&graph, "/src/a.js");
        graph.register_resolution("pkg", a.clone());
        assert_eq!(graph.resolve("pkg", None), Some(a));
    }

    #[test]
    fn resolve_handles_relative_specifiers() {
        let graph = MemoryGraph::new();
        let util = module(&graph, "/src/common/util.js");
        let importer = module(&graph, "/src/pageA/index.js");
        assert_eq!(graph.resolve("../common/util.js", Some(&importer)), Some(util));
        assert_eq!(graph.resolve("./missing.js", Some(&importer)), None);
    }
}
