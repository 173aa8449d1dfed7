//! The graph capability trait.

use crate::module::ModuleInfo;
use crate::module_id::ModuleId;

/// Read-only module-graph introspection, as exposed by a host bundler
/// during its build phases.
///
/// The methods mirror the call-scoped query surface bundlers hand to
/// plugins: look up one module, snapshot all known ids, resolve a
/// specifier. Implementations return owned snapshots because the
/// underlying graph may be mutated by the host between calls; callers must
/// not assume two calls observe the same state unless the host's phase
/// ordering guarantees it.
pub trait ModuleGraph {
    /// Look up a single module. `None` when the id is unknown.
    fn module_info(&self, id: &ModuleId) -> Option<ModuleInfo>;

    /// Snapshot every module id currently known to the graph.
    ///
    /// Order is implementation-defined but must be stable within one
    /// build phase.
    fn module_ids(&self) -> Vec<ModuleId>;

    /// Resolve an import specifier, optionally relative to an importer.
    fn resolve(&self, specifier: &str, importer: Option<&ModuleId>) -> Option<ModuleId>;
}
