//! Chunk group keys and the grouping decision core.
//!
//! A grouping decision always produces two things together: the opaque
//! [`GroupKey`] handed back to the host bundler, and the [`NameEntry`]
//! recorded for the naming phase so artifacts emitted under that key can
//! be placed later. Keys are either readable entry labels (stable chunks
//! owned by one entry) or short hashes (shared and dynamic chunks, where a
//! readable name would collide or churn).

use std::fmt;

use serde::{Deserialize, Serialize};

use cubby_graph::{DependentEntries, ModuleId};

use crate::registry::NameEntry;
use crate::section::{self, SourceLayout};

/// Opaque chunk-group key. Compares and hashes as its string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupKey(String);

impl GroupKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for GroupKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Hash a seed string into a 16-hex-digit group key.
pub(crate) fn hash_key(seed: &str) -> GroupKey {
    GroupKey(format!("{:016x}", seahash::hash(seed.as_bytes())))
}

/// A group key plus the record the naming phase will need for it.
#[derive(Debug, Clone)]
pub(crate) struct GroupDecision {
    pub key: GroupKey,
    pub record: NameEntry,
}

impl GroupDecision {
    fn new(key: GroupKey, section: Option<String>, name: impl Into<String>) -> Self {
        Self { key, record: NameEntry { section, name: name.into() } }
    }
}

/// Decide the group for one module from its dependent entry points.
///
/// - no dependent entries: the module is orphaned, no group;
/// - one entry, static reach: the entry's label is the key, so the chunk
///   name stays readable and stable;
/// - one entry, dynamic reach: the module id is hashed, keeping distinct
///   lazy chunks apart even when their file stems collide;
/// - several entries, static reach: the sorted entry labels are hashed, so
///   every module shared by the same entry set lands in one chunk;
/// - several entries, dynamic reach: the module id is hashed.
pub(crate) fn resolve_group(
    layout: &SourceLayout,
    subject: &ModuleId,
    walk: &DependentEntries,
) -> Option<GroupDecision> {
    let stem = section::module_stem(subject).to_string();
    match walk.entries.as_slice() {
        [] => None,
        [entry] if !walk.crossed_dynamic => Some(label_decision(layout, entry).unwrap_or_else(
            || GroupDecision::new(hash_key(subject.as_str()), None, stem.clone()),
        )),
        [entry] => Some(GroupDecision::new(
            hash_key(subject.as_str()),
            layout.section_of(entry),
            stem,
        )),
        entries => {
            let key = if walk.crossed_dynamic {
                hash_key(subject.as_str())
            } else {
                hash_key(&joined_labels(layout, entries))
            };
            Some(GroupDecision::new(key, layout.common_section(entries), stem))
        }
    }
}

/// Decide the group for a set of modules treated as one unit (all modules
/// behind a style-emitting component, for instance). `members` must be
/// sorted; `entries` is the union of their dependent entry points.
pub(crate) fn resolve_aggregate(
    layout: &SourceLayout,
    members: &[ModuleId],
    entries: &[ModuleId],
    crossed_dynamic: bool,
) -> Option<GroupDecision> {
    let first = members.first()?;
    let stem = section::module_stem(first).to_string();
    match entries {
        [] => None,
        [entry] if !crossed_dynamic => Some(label_decision(layout, entry).unwrap_or_else(
            || GroupDecision::new(aggregate_hash_key(members), None, stem.clone()),
        )),
        [_] => Some(GroupDecision::new(
            aggregate_hash_key(members),
            layout.common_section(entries),
            stem,
        )),
        entries => {
            let key = if crossed_dynamic {
                aggregate_hash_key(members)
            } else {
                hash_key(&joined_labels(layout, entries))
            };
            Some(GroupDecision::new(key, layout.common_section(entries), stem))
        }
    }
}

/// Manual-override bucket: the bucket name, prefixed with a section when
/// every member's dependent entries agree on one.
pub(crate) fn bucket_decision(
    layout: &SourceLayout,
    bucket: &str,
    union_entries: &[ModuleId],
) -> GroupDecision {
    match layout.common_section(union_entries) {
        Some(section) => GroupDecision::new(
            GroupKey(format!("{section}/{bucket}")),
            Some(section),
            bucket,
        ),
        None => GroupDecision::new(GroupKey(bucket.to_string()), None, bucket),
    }
}

/// Entry-label key for a chunk owned by exactly one entry. `None` when the
/// entry sits outside the source root.
fn label_decision(layout: &SourceLayout, entry: &ModuleId) -> Option<GroupDecision> {
    let label = layout.entry_label(entry)?;
    let name = label.rsplit('/').next().unwrap_or(&label).to_string();
    Some(GroupDecision::new(
        GroupKey(label),
        layout.section_of(entry),
        name,
    ))
}

/// Sorted, deduplicated entry labels joined for hashing. Input order never
/// changes the resulting key.
fn joined_labels(layout: &SourceLayout, entries: &[ModuleId]) -> String {
    let mut labels: Vec<String> = entries
        .iter()
        .filter_map(|entry| layout.entry_label(entry))
        .collect();
    labels.sort();
    labels.dedup();
    labels.join(",")
}

/// Hash key for an aggregate: the sorted member ids joined.
fn aggregate_hash_key(members: &[ModuleId]) -> GroupKey {
    let joined = members
        .iter()
        .map(|id| id.as_str())
        .collect::<Vec<_>>()
        .join(",");
    hash_key(&joined)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(path: &str) -> ModuleId {
        ModuleId::new_virtual(path)
    }

    fn walk(entries: &[&str], crossed: bool) -> DependentEntries {
        DependentEntries {
            entries: entries.iter().map(|e| id(e)).collect(),
            crossed_dynamic: crossed,
        }
    }

    #[test]
    fn orphaned_modules_get_no_group() {
        let layout = SourceLayout::new("/src");
        assert!(resolve_group(&layout, &id("/src/a/x.js"), &walk(&[], false)).is_none());
    }

    #[test]
    fn single_static_owner_uses_the_entry_label() {
        let layout = SourceLayout::new("/src");
        let decision = resolve_group(
            &layout,
            &id("/src/intro/home/widget.js"),
            &walk(&["/src/intro/home/index.html"], false),
        )
        .expect("decision");
        assert_eq!(decision.key.as_str(), "intro/home");
        assert_eq!(decision.record.section.as_deref(), Some("intro"));
        assert_eq!(decision.record.name, "home");
    }

    #[test]
    fn single_dynamic_owner_hashes_the_module_id() {
        let layout = SourceLayout::new("/src");
        let a = resolve_group(
            &layout,
            &id("/src/intro/home/lazy.js"),
            &walk(&["/src/intro/home/index.html"], true),
        )
        .expect("decision");
        let b = resolve_group(
            &layout,
            &id("/src/intro/about/lazy.js"),
            &walk(&["/src/intro/home/index.html"], true),
        )
        .expect("decision");
        // Same stem, same owner, distinct modules: distinct keys.
        assert_ne!(a.key, b.key);
        assert_eq!(a.record.name, "lazy");
        assert_eq!(a.record.section.as_deref(), Some("intro"));
        assert_eq!(a.key.as_str().len(), 16);
    }

    #[test]
    fn shared_static_modules_key_on_the_entry_set() {
        let layout = SourceLayout::new("/src");
        let entries_one_order = walk(
            &["/src/intro/home/index.html", "/src/intro/about/index.html"],
            false,
        );
        let entries_other_order = walk(
            &["/src/intro/about/index.html", "/src/intro/home/index.html"],
            false,
        );
        let a = resolve_group(&layout, &id("/src/intro/util.js"), &entries_one_order)
            .expect("decision");
        let b = resolve_group(&layout, &id("/src/intro/other.js"), &entries_other_order)
            .expect("decision");
        // Two modules shared by the same entry set share one chunk.
        assert_eq!(a.key, b.key);
        assert_eq!(a.record.section.as_deref(), Some("intro"));
        assert_eq!(a.record.name, "util");
        assert_eq!(b.record.name, "other");
    }

    #[test]
    fn cross_section_sharing_drops_the_section() {
        let layout = SourceLayout::new("/src");
        let decision = resolve_group(
            &layout,
            &id("/src/common/util.js"),
            &walk(
                &["/src/intro/home/index.html", "/src/admin/index.html"],
                false,
            ),
        )
        .expect("decision");
        assert_eq!(decision.record.section, None);
        assert_eq!(decision.record.name, "util");
    }

    #[test]
    fn dynamic_crossing_forces_id_hash_keys() {
        let layout = SourceLayout::new("/src");
        let shared = walk(
            &["/src/intro/home/index.html", "/src/intro/about/index.html"],
            true,
        );
        let a = resolve_group(&layout, &id("/src/intro/util.js"), &shared).expect("decision");
        let b = resolve_group(&layout, &id("/src/intro/other.js"), &shared).expect("decision");
        assert_ne!(a.key, b.key);
    }

    #[test]
    fn bucket_decisions_prefix_the_common_section() {
        let layout = SourceLayout::new("/src");
        let same = [id("/src/intro/home/index.html"), id("/src/intro/about/index.html")];
        let spanning = [id("/src/intro/home/index.html"), id("/src/admin/index.html")];

        let scoped = bucket_decision(&layout, "vendor", &same);
        assert_eq!(scoped.key.as_str(), "intro/vendor");
        assert_eq!(scoped.record.section.as_deref(), Some("intro"));
        assert_eq!(scoped.record.name, "vendor");

        let bare = bucket_decision(&layout, "vendor", &spanning);
        assert_eq!(bare.key.as_str(), "vendor");
        assert_eq!(bare.record.section, None);

        let unreached = bucket_decision(&layout, "vendor", &[]);
        assert_eq!(unreached.key.as_str(), "vendor");
        assert_eq!(unreached.record.section, None);
    }

    #[test]
    fn aggregates_union_like_single_modules() {
        let layout = SourceLayout::new("/src");
        let members = [id("/src/intro/home/App.svelte"), id("/src/intro/home/Nav.svelte")];
        let decision = resolve_aggregate(
            &layout,
            &members,
            &[id("/src/intro/home/index.html")],
            false,
        )
        .expect("decision");
        assert_eq!(decision.key.as_str(), "intro/home");
        assert_eq!(decision.record.name, "home");

        let dynamic = resolve_aggregate(
            &layout,
            &members,
            &[id("/src/intro/home/index.html")],
            true,
        )
        .expect("decision");
        assert_eq!(dynamic.key.as_str().len(), 16);
        assert_eq!(dynamic.record.name, "App");
        assert_eq!(dynamic.record.section.as_deref(), Some("intro"));
    }

    #[test]
    fn aggregate_of_nothing_is_no_group() {
        let layout = SourceLayout::new("/src");
        assert!(resolve_aggregate(&layout, &[], &[], false).is_none());
        assert!(
            resolve_aggregate(&layout, &[id("/src/a/x.js")], &[], false).is_none()
        );
    }
}
