//! Build sessions: the phase-hook surface of the organizer.
//!
//! An [`Organizer`] holds validated options and mints one [`BuildSession`]
//! per build. The session carries all build-scoped state, so nothing leaks
//! between builds and the one-time work (the manual-override pass) runs
//! eagerly in [`Organizer::begin_build`] instead of hiding behind a
//! first-call flag in a hook.
//!
//! Hook order follows the host bundler's phases: `on_resolve` while the
//! graph is still being discovered, `on_build_end` once it is complete,
//! the `decide_*` hooks during chunking, the `name_*` hooks during
//! emission, and `finish` after the host closed the bundle.

use std::collections::BTreeMap;
use std::fmt;

use parking_lot::{Mutex, RwLock};
use rustc_hash::{FxHashMap, FxHashSet};

use cubby_graph::{dependent_entry_points, DependentEntries, ModuleGraph, ModuleId};

use crate::classify::ArtifactKind;
use crate::config::{FallbackPolicy, OrganizerOptions};
use crate::grouping::{self, GroupDecision, GroupKey};
use crate::identity;
use crate::manifest::{ArtifactRecord, OutputManifest};
use crate::naming::{self, AssetDescriptor, ChunkDescriptor, PlacedPath};
use crate::registry::{MediaPlacement, MediaRegistry, NameTable};
use crate::section::SourceLayout;
use crate::{Error, Result};

/// Non-fatal diagnostics collected over a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrganizeWarning {
    /// No section claimed an artifact; the fallback bucket was used.
    UnresolvedSection { artifact: String },
    /// The host emitted an artifact with no name.
    MissingArtifactName,
    /// A temporary media rename could not be reversed.
    RestoreFailed { path: String, reason: String },
}

impl fmt::Display for OrganizeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnresolvedSection { artifact } => {
                write!(f, "no section claims '{artifact}', placing it in the fallback bucket")
            }
            Self::MissingArtifactName => {
                write!(f, "artifact has no name, using a placeholder")
            }
            Self::RestoreFailed { path, reason } => {
                write!(f, "could not restore '{path}': {reason}")
            }
        }
    }
}

/// Everything a finished build hands back to the host.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub manifest: OutputManifest,
    pub warnings: Vec<OrganizeWarning>,
    /// Media files renamed back to their original paths.
    pub restored_renames: usize,
}

/// Validated configuration, ready to mint build sessions.
#[derive(Debug, Clone)]
pub struct Organizer {
    options: OrganizerOptions,
}

impl Organizer {
    pub fn new(options: OrganizerOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { options })
    }

    pub fn options(&self) -> &OrganizerOptions {
        &self.options
    }

    /// Start a build session over `graph`.
    ///
    /// The manual-override pass runs here, eagerly: the override function
    /// is evaluated once over the whole graph, bucket members are resolved
    /// to their dependent entries, and the resulting keys are fixed before
    /// any hook can observe the session. Walks computed for the pass seed
    /// the session's memo.
    pub fn begin_build(&self, graph: &dyn ModuleGraph) -> Result<BuildSession> {
        let layout = SourceLayout::new(&self.options.source_root);
        let names = NameTable::new();
        let mut walk_memo: FxHashMap<ModuleId, DependentEntries> = FxHashMap::default();
        let mut manual: FxHashMap<ModuleId, GroupKey> = FxHashMap::default();

        if let Some(group_fn) = &self.options.manual_groups {
            // Bucket names sorted so key records are deterministic.
            let mut buckets: BTreeMap<String, Vec<ModuleId>> = BTreeMap::new();
            for id in graph.module_ids() {
                if let Some(bucket) = group_fn(&id) {
                    buckets.entry(bucket).or_default().push(id);
                }
            }
            for (bucket, members) in &buckets {
                let mut union: Vec<ModuleId> = Vec::new();
                let mut seen: FxHashSet<ModuleId> = FxHashSet::default();
                for member in members {
                    let walk = memoized_walk(&mut walk_memo, graph, member)?;
                    for entry in walk.entries {
                        if seen.insert(entry.clone()) {
                            union.push(entry);
                        }
                    }
                }
                let decision = grouping::bucket_decision(&layout, bucket, &union);
                tracing::debug!(bucket = %bucket, key = %decision.key, members = members.len(), "manual bucket");
                names.record(decision.key.as_str(), decision.record.clone());
                for member in members {
                    manual.insert(member.clone(), decision.key.clone());
                }
            }
        }

        Ok(BuildSession {
            options: self.options.clone(),
            layout,
            media: MediaRegistry::new(),
            names,
            manual,
            walks: RwLock::new(walk_memo),
            warnings: Mutex::new(Vec::new()),
            manifest: Mutex::new(OutputManifest::new(&self.options.static_root)),
        })
    }
}

fn memoized_walk(
    memo: &mut FxHashMap<ModuleId, DependentEntries>,
    graph: &dyn ModuleGraph,
    id: &ModuleId,
) -> Result<DependentEntries> {
    if let Some(hit) = memo.get(id) {
        return Ok(hit.clone());
    }
    let computed = dependent_entry_points(graph, id)?;
    memo.insert(id.clone(), computed.clone());
    Ok(computed)
}

/// All state scoped to one build.
///
/// Hooks take `&self`; interior state is behind short-lived locks, so the
/// host may call them from parallel workers. Dropping the session restores
/// any media renames `finish` did not get to.
#[derive(Debug)]
pub struct BuildSession {
    options: OrganizerOptions,
    layout: SourceLayout,
    media: MediaRegistry,
    names: NameTable,
    manual: FxHashMap<ModuleId, GroupKey>,
    walks: RwLock<FxHashMap<ModuleId, DependentEntries>>,
    warnings: Mutex<Vec<OrganizeWarning>>,
    manifest: Mutex<OutputManifest>,
}

impl BuildSession {
    pub fn layout(&self) -> &SourceLayout {
        &self.layout
    }

    /// Resolution hook. Delegates to the graph's resolver, then gives
    /// media files their content-identity id: the file is renamed on disk
    /// to carry its digest and the tagged path becomes the module id.
    pub fn on_resolve(
        &self,
        specifier: &str,
        importer: Option<&ModuleId>,
        graph: &dyn ModuleGraph,
    ) -> Result<Option<ModuleId>> {
        let Some(resolved) = graph.resolve(specifier, importer) else {
            return Ok(None);
        };
        if !ArtifactKind::classify(resolved.as_str()).is_media() {
            return Ok(Some(resolved));
        }
        let tagged = self.media.tag(resolved.as_path())?;
        let id = ModuleId::new(tagged.to_string_lossy())
            .map_err(cubby_graph::Error::InvalidId)?;
        Ok(Some(id))
    }

    /// Graph-complete hook. Decides the placement of every tagged media
    /// file from its dependent entry points; after this the naming phase
    /// never touches the graph.
    pub fn on_build_end(&self, graph: &dyn ModuleGraph) -> Result<()> {
        for file in self.media.tagged_files() {
            let id = ModuleId::new(file.tagged.to_string_lossy())
                .map_err(cubby_graph::Error::InvalidId)?;
            let walk = self.dependents(graph, &id)?;
            let section = if walk.entries.is_empty() {
                self.warn(OrganizeWarning::UnresolvedSection {
                    artifact: file.original.display().to_string(),
                });
                None
            } else {
                self.layout.common_section(&walk.entries)
            };
            let subpath = self.layout.media_subpath(&id);
            self.media
                .record_placement(&file.digest, MediaPlacement { section, subpath });
        }
        tracing::debug!(placements = self.media.len(), "media placements decided");
        Ok(())
    }

    /// Chunking hook for a single module.
    ///
    /// Manual buckets always win, wherever the module lives. The automatic
    /// policy only applies to bundled source kinds under the source root;
    /// everything else is left to the host's defaults.
    pub fn decide_chunk_group(
        &self,
        id: &ModuleId,
        graph: &dyn ModuleGraph,
    ) -> Result<Option<GroupKey>> {
        if let Some(key) = self.manual.get(id) {
            return Ok(Some(key.clone()));
        }
        if !self.layout.contains(id) {
            return Ok(None);
        }
        if !ArtifactKind::classify(id.as_str()).is_source() {
            return Ok(None);
        }
        let walk = self.dependents(graph, id)?;
        Ok(self.apply(grouping::resolve_group(&self.layout, id, &walk)))
    }

    /// Chunking hook for modules that must land in one chunk together,
    /// e.g. all modules behind one style-emitting component. Dependent
    /// entries are unioned over the members; member order does not matter.
    pub fn decide_aggregate_group(
        &self,
        members: &[ModuleId],
        graph: &dyn ModuleGraph,
    ) -> Result<Option<GroupKey>> {
        if members.is_empty() {
            return Ok(None);
        }
        let mut sorted: Vec<ModuleId> = members.to_vec();
        sorted.sort();
        sorted.dedup();

        let mut entries: Vec<ModuleId> = Vec::new();
        let mut seen: FxHashSet<ModuleId> = FxHashSet::default();
        let mut crossed_dynamic = false;
        for member in &sorted {
            let walk = self.dependents(graph, member)?;
            crossed_dynamic |= walk.crossed_dynamic;
            for entry in walk.entries {
                if seen.insert(entry.clone()) {
                    entries.push(entry);
                }
            }
        }
        Ok(self.apply(grouping::resolve_aggregate(
            &self.layout,
            &sorted,
            &entries,
            crossed_dynamic,
        )))
    }

    /// Naming hook for non-chunk artifacts.
    ///
    /// Media artifacts resolve through the identity tag to the placement
    /// decided at build end. Other artifacts resolve through the name
    /// table via their group key. Anything unknown falls back to the
    /// fallback policy with a warning.
    pub fn name_asset(&self, asset: &AssetDescriptor) -> Result<String> {
        let name = match asset.name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                self.warn(OrganizeWarning::MissingArtifactName);
                "asset.bin".to_string()
            }
        };
        let kind = ArtifactKind::classify(&name);
        let (stem, ext) = naming::stem_and_ext(&name);

        if kind.is_media() {
            if let Some(tag) = identity::digest_from_name(&name) {
                if let Some(placement) = self.media.placement(tag) {
                    let section = self.resolve_section(placement.section.as_deref(), &name)?;
                    let file_stem = naming::last_segment(stem);
                    let original_stem = &file_stem[..file_stem.len() - identity::TAG_LEN];
                    let placed = naming::compose(
                        &self.options.static_root,
                        &section,
                        kind.dir_label(),
                        &placement.subpath,
                        original_stem,
                        tag,
                        ext,
                    );
                    return Ok(self.emit(&name, placed));
                }
            }
            // Media the resolver never saw, e.g. emitted by another plugin.
            self.warn(OrganizeWarning::UnresolvedSection { artifact: name.clone() });
            let section = self.resolve_section(None, &name)?;
            let digest = identity::content_digest(&asset.source);
            let placed = naming::compose(
                &self.options.static_root,
                &section,
                kind.dir_label(),
                "",
                naming::last_segment(stem),
                &digest,
                ext,
            );
            return Ok(self.emit(&name, placed));
        }

        let digest = identity::content_digest(&asset.source);
        if let Some(entry) = self.names.lookup(stem) {
            let section = self.resolve_section(entry.section.as_deref(), &name)?;
            let placed = naming::compose(
                &self.options.static_root,
                &section,
                kind.dir_label(),
                "",
                &entry.name,
                &digest,
                ext,
            );
            return Ok(self.emit(&name, placed));
        }

        self.warn(OrganizeWarning::UnresolvedSection { artifact: name.clone() });
        let section = self.resolve_section(None, &name)?;
        let placed = naming::compose(
            &self.options.static_root,
            &section,
            kind.dir_label(),
            "",
            naming::last_segment(stem),
            &digest,
            ext,
        );
        Ok(self.emit(&name, placed))
    }

    /// Naming hook for chunks. Pins are checked first, then entry chunks
    /// delegate to [`BuildSession::name_entry`], then the group key
    /// resolves through the name table.
    pub fn name_chunk(&self, chunk: &ChunkDescriptor) -> Result<String> {
        for pin in &self.options.pins {
            if chunk
                .module_ids
                .iter()
                .any(|id| id.as_str().contains(&pin.needle))
            {
                let section = self.resolve_section(pin.section.as_deref(), &chunk.name)?;
                let digest = identity::content_digest(&chunk.source);
                let placed = naming::compose(
                    &self.options.static_root,
                    &section,
                    "js",
                    "",
                    &pin.name,
                    &digest,
                    ".js",
                );
                tracing::debug!(chunk = %chunk.name, pin = %pin.name, "pinned chunk");
                return Ok(self.emit(&chunk.name, placed));
            }
        }

        if chunk.is_entry {
            return self.name_entry(chunk);
        }

        let digest = identity::content_digest(&chunk.source);
        if let Some(entry) = self.names.lookup(&chunk.name) {
            let section = self.resolve_section(entry.section.as_deref(), &chunk.name)?;
            let placed = naming::compose(
                &self.options.static_root,
                &section,
                "js",
                "",
                &entry.name,
                &digest,
                ".js",
            );
            return Ok(self.emit(&chunk.name, placed));
        }

        self.warn(OrganizeWarning::UnresolvedSection { artifact: chunk.name.clone() });
        let section = self.resolve_section(None, &chunk.name)?;
        let placed = naming::compose(
            &self.options.static_root,
            &section,
            "js",
            "",
            naming::last_segment(&chunk.name),
            &digest,
            ".js",
        );
        Ok(self.emit(&chunk.name, placed))
    }

    /// Naming hook for entry chunks. The entry's own label names the file;
    /// the facade module locates the entry, falling back to the declared
    /// entry table under the chunk's name.
    pub fn name_entry(&self, chunk: &ChunkDescriptor) -> Result<String> {
        let entry_id = chunk.facade_module.clone().or_else(|| {
            self.options
                .entries
                .get(&chunk.name)
                .map(|path| ModuleId::new_virtual(path.to_string_lossy()))
        });
        let labeled = entry_id.and_then(|id| {
            let label = self.layout.entry_label(&id)?;
            Some((id, label))
        });
        let digest = identity::content_digest(&chunk.source);

        match labeled {
            Some((id, label)) => {
                let section = self.resolve_section(
                    self.layout.section_of(&id).as_deref(),
                    &chunk.name,
                )?;
                let placed = naming::compose(
                    &self.options.static_root,
                    &section,
                    "js",
                    "",
                    naming::last_segment(&label),
                    &digest,
                    ".js",
                );
                Ok(self.emit(&chunk.name, placed))
            }
            None => {
                self.warn(OrganizeWarning::UnresolvedSection { artifact: chunk.name.clone() });
                let section = self.resolve_section(None, &chunk.name)?;
                let placed = naming::compose(
                    &self.options.static_root,
                    &section,
                    "js",
                    "",
                    naming::last_segment(&chunk.name),
                    &digest,
                    ".js",
                );
                Ok(self.emit(&chunk.name, placed))
            }
        }
    }

    /// Warnings collected so far, in emission order.
    pub fn warnings(&self) -> Vec<OrganizeWarning> {
        self.warnings.lock().clone()
    }

    /// End the build: restore all media renames and hand back the report.
    ///
    /// The session is consumed; `Drop` re-runs the restore as a backstop,
    /// which is a no-op after a clean finish.
    pub fn finish(self) -> BuildReport {
        let (restored, failures) = self.media.restore_all();
        for (path, reason) in failures {
            self.warn(OrganizeWarning::RestoreFailed {
                path: path.display().to_string(),
                reason: reason.to_string(),
            });
        }
        self.names.clear();
        let manifest = self.manifest.lock().clone();
        let warnings = self.warnings.lock().clone();
        tracing::debug!(
            artifacts = manifest.len(),
            warnings = warnings.len(),
            restored,
            "build session finished"
        );
        BuildReport { manifest, warnings, restored_renames: restored }
    }

    fn dependents(&self, graph: &dyn ModuleGraph, id: &ModuleId) -> Result<DependentEntries> {
        if let Some(hit) = self.walks.read().get(id) {
            return Ok(hit.clone());
        }
        let computed = dependent_entry_points(graph, id)?;
        self.walks
            .write()
            .entry(id.clone())
            .or_insert_with(|| computed.clone());
        Ok(computed)
    }

    fn apply(&self, decision: Option<GroupDecision>) -> Option<GroupKey> {
        decision.map(|decision| {
            self.names.record(decision.key.as_str(), decision.record);
            decision.key
        })
    }

    fn resolve_section(&self, section: Option<&str>, artifact: &str) -> Result<String> {
        match section {
            Some(section) => Ok(section.to_string()),
            None => match &self.options.fallback {
                FallbackPolicy::Bucket(bucket) => Ok(bucket.clone()),
                FallbackPolicy::Error => {
                    Err(Error::NoSection { artifact: artifact.to_string() })
                }
            },
        }
    }

    fn warn(&self, warning: OrganizeWarning) {
        tracing::warn!("{warning}");
        self.warnings.lock().push(warning);
    }

    fn emit(&self, input: &str, placed: PlacedPath) -> String {
        self.manifest.lock().record(ArtifactRecord {
            input: input.to_string(),
            kind: placed.kind,
            section: placed.section,
            output_path: placed.path.clone(),
        });
        placed.path
    }
}

impl Drop for BuildSession {
    fn drop(&mut self) {
        // Renames must be reversed even when the host never reaches finish.
        let (_, failures) = self.media.restore_all();
        for (path, reason) in failures {
            tracing::warn!(path = %path.display(), %reason, "failed to restore media rename");
        }
    }
}
