//! Output manifest: the final placement of every named artifact.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Result;

pub const MANIFEST_VERSION: u32 = 1;

/// One named artifact and where it ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactRecord {
    /// The name the host bundler presented.
    pub input: String,
    /// Kind directory label (`img`, `js`, `css`, ...).
    pub kind: String,
    /// Resolved section, fallback bucket included.
    pub section: String,
    /// Final output path relative to the build output directory.
    pub output_path: String,
}

/// Mapping from build artifacts to final output paths.
///
/// Hosts typically serialize this next to the build output so a server can
/// resolve pages to hashed artifact paths without scanning the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputManifest {
    pub version: u32,
    pub static_root: String,
    pub artifacts: Vec<ArtifactRecord>,
}

impl OutputManifest {
    pub(crate) fn new(static_root: &str) -> Self {
        Self {
            version: MANIFEST_VERSION,
            static_root: static_root.to_string(),
            artifacts: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, record: ArtifactRecord) {
        self.artifacts.push(record);
    }

    /// Records for one section, in emission order.
    pub fn section(&self, section: &str) -> impl Iterator<Item = &ArtifactRecord> {
        self.artifacts.iter().filter(move |r| r.section == section)
    }

    /// The record for an input name, if one was emitted.
    pub fn find(&self, input: &str) -> Option<&ArtifactRecord> {
        self.artifacts.iter().find(|r| r.input == input)
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
