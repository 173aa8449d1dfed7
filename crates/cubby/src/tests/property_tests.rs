//! Property-based tests for cubby using proptest.
//!
//! These verify the laws the organizer's determinism rests on: content
//! digests are total and stable, identity tags round-trip through file
//! names, and group keys never depend on observation order.
//!
//! Run with: cargo test --features proptest --package cubby property_tests

#![cfg(feature = "proptest")]

use std::path::PathBuf;

use cubby_graph::{DependentEntries, ModuleId};
use proptest::prelude::*;

use crate::grouping::resolve_group;
use crate::identity::{TAG_LEN, content_digest, digest_from_name, tagged_path, untagged_path};
use crate::section::SourceLayout;
use crate::{ArtifactKind, GroupKey};

/// Strategy for file stems: no dots, no separators.
fn stem_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z0-9_-]{0,12}"
}

/// Strategy for short lowercase extensions.
fn ext_strategy() -> impl Strategy<Value = String> {
    "[a-z]{1,5}"
}

/// Strategy for entry-point paths under /src with distinct-ish locations.
fn entry_paths_strategy() -> impl Strategy<Value = Vec<ModuleId>> {
    prop::collection::vec("[a-z]{1,8}/[a-z]{1,8}", 2..6).prop_map(|dirs| {
        dirs.into_iter()
            .map(|dir| ModuleId::new_virtual(format!("/src/{dir}/index.html")))
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Property: digests are always TAG_LEN lowercase hex characters.
    #[test]
    fn prop_digest_shape(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let digest = content_digest(&bytes);
        prop_assert_eq!(digest.len(), TAG_LEN);
        prop_assert!(digest.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
        // Stable: hashing the same bytes twice gives the same digest.
        prop_assert_eq!(digest, content_digest(&bytes));
    }

    /// Property: tagging then untagging returns the original path, and the
    /// tag can be read back out of the tagged name.
    #[test]
    fn prop_tag_round_trip(
        stem in stem_strategy(),
        ext in ext_strategy(),
        bytes in prop::collection::vec(any::<u8>(), 0..64),
    ) {
        let original = PathBuf::from(format!("/assets/{stem}.{ext}"));
        let digest = content_digest(&bytes);
        let tagged = tagged_path(&original, &digest);

        prop_assert_eq!(untagged_path(&tagged), Some(original));
        let tagged_name = tagged.file_name().unwrap().to_str().unwrap();
        prop_assert_eq!(digest_from_name(tagged_name), Some(digest.as_str()));
    }

    /// Property: classification ignores case.
    #[test]
    fn prop_classification_is_case_insensitive(
        stem in stem_strategy(),
        ext in ext_strategy(),
    ) {
        let lower = format!("{stem}.{ext}");
        let upper = lower.to_ascii_uppercase();
        prop_assert_eq!(ArtifactKind::classify(&lower), ArtifactKind::classify(&upper));
    }

    /// Property: the key of a chunk shared by several entries does not
    /// depend on the order the entries were discovered in.
    #[test]
    fn prop_shared_keys_ignore_entry_order(entries in entry_paths_strategy()) {
        let layout = SourceLayout::new("/src");
        let subject = ModuleId::new_virtual("/src/common/util.js");

        let forward = DependentEntries { entries: entries.clone(), crossed_dynamic: false };
        let mut reversed_entries = entries.clone();
        reversed_entries.reverse();
        let reversed = DependentEntries { entries: reversed_entries, crossed_dynamic: false };
        let mut rotated_entries = entries;
        rotated_entries.rotate_left(1);
        let rotated = DependentEntries { entries: rotated_entries, crossed_dynamic: false };

        let key = |walk: &DependentEntries| -> Option<GroupKey> {
            resolve_group(&layout, &subject, walk).map(|decision| decision.key)
        };
        let forward_key = key(&forward);
        prop_assert!(forward_key.is_some());
        prop_assert_eq!(&forward_key, &key(&reversed));
        prop_assert_eq!(&forward_key, &key(&rotated));
    }
}
