//! Module records as seen through the graph capability interface.

use serde::{Deserialize, Serialize};

use crate::module_id::ModuleId;

/// How one module imports another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImportKind {
    /// A static `import`/`require` edge, resolved at bundle time.
    Static,
    /// A dynamic `import()` edge, a chunk-splitting boundary.
    Dynamic,
}

/// The per-module view the organizer consumes.
///
/// This is intentionally the small read-only slice of module state the
/// host bundler exposes during its phases: identity, entry status, and the
/// reverse-import lists. The organizer never mutates a module's identity
/// except during the transient media rename protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInfo {
    /// Unique module identifier (usually an absolute source path).
    pub id: ModuleId,
    /// Whether this module is a designated entry point.
    pub is_entry: bool,
    /// Modules that statically import this module.
    pub importers: Vec<ModuleId>,
    /// Modules that dynamically import this module.
    pub dynamic_importers: Vec<ModuleId>,
}

impl ModuleInfo {
    /// Create a module record with no importers.
    pub fn new(id: ModuleId) -> Self {
        Self {
            id,
            is_entry: false,
            importers: Vec::new(),
            dynamic_importers: Vec::new(),
        }
    }

    /// Mark the module as an entry point.
    pub fn entry(mut self, is_entry: bool) -> Self {
        self.is_entry = is_entry;
        self
    }

    /// Record an importer edge of the given kind, skipping duplicates.
    pub fn push_importer(&mut self, importer: ModuleId, kind: ImportKind) {
        let list = match kind {
            ImportKind::Static => &mut self.importers,
            ImportKind::Dynamic => &mut self.dynamic_importers,
        };
        if !list.contains(&importer) {
            list.push(importer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_importer_deduplicates() {
        let mut info = ModuleInfo::new(ModuleId::new_virtual("a"));
        let b = ModuleId::new_virtual("b");
        info.push_importer(b.clone(), ImportKind::Static);
        info.push_importer(b.clone(), ImportKind::Static);
        info.push_importer(b, ImportKind::Dynamic);
        assert_eq!(info.importers.len(), 1);
        assert_eq!(info.dynamic_importers.len(), 1);
    }

    #[test]
    fn entry_builder_sets_flag() {
        let info = ModuleInfo::new(ModuleId::new_virtual("e")).entry(true);
        assert!(info.is_entry);
    }
}
