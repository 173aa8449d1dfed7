//! Artifact classification by file extension.
//!
//! Every placement decision starts here: the classifier maps an artifact
//! name to a coarse kind, and the kind supplies the per-type directory
//! label used in final output paths (`img/`, `js/`, `css/`, ...).

use serde::{Deserialize, Serialize};

/// Coarse artifact kind derived from a file name.
///
/// Unrecognized extensions are preserved verbatim in [`ArtifactKind::Other`]
/// so they still get a stable directory label instead of being rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Image,
    Video,
    Audio,
    Document,
    Script,
    Style,
    Markup,
    /// Anything else, carrying its lowercased extension (or whole name for
    /// extension-less files).
    Other(String),
}

impl ArtifactKind {
    /// Classify an artifact name. Case-insensitive, query-aware.
    ///
    /// ```
    /// use cubby::ArtifactKind;
    ///
    /// assert_eq!(ArtifactKind::classify("photo.PNG"), ArtifactKind::Image);
    /// assert_eq!(ArtifactKind::classify("app.svelte?type=style&lang.css"), ArtifactKind::Style);
    /// assert_eq!(ArtifactKind::classify("font.woff2"), ArtifactKind::Other("woff2".into()));
    /// ```
    pub fn classify(name: &str) -> Self {
        match effective_extension(name).as_str() {
            "png" | "jpg" | "jpeg" | "gif" | "svg" | "webp" | "avif" | "tiff" | "bmp"
            | "ico" => Self::Image,
            "mp4" | "m4v" | "m4p" | "webm" | "mkv" | "flv" | "vob" | "ogv" | "drc" | "mov"
            | "avi" => Self::Video,
            "mp3" | "wav" | "flac" | "aac" | "m4a" | "ogg" | "oga" | "opus" => Self::Audio,
            "txt" | "md" | "pdf" | "rtf" | "csv" => Self::Document,
            "js" | "mjs" | "cjs" | "ts" | "mts" | "cts" | "jsx" | "tsx" => Self::Script,
            "css" | "scss" | "sass" | "less" | "styl" | "pcss" => Self::Style,
            "html" | "htm" | "svelte" | "vue" => Self::Markup,
            other => Self::Other(other.to_string()),
        }
    }

    /// Kinds that are copied through as standalone files rather than
    /// bundled: images, video, audio and plain documents.
    pub fn is_media(&self) -> bool {
        matches!(
            self,
            Self::Image | Self::Video | Self::Audio | Self::Document
        )
    }

    /// Kinds that participate in chunk grouping.
    pub fn is_source(&self) -> bool {
        matches!(self, Self::Script | Self::Style | Self::Markup)
    }

    /// Directory label for final output paths.
    pub fn dir_label(&self) -> &str {
        match self {
            Self::Image => "img",
            Self::Video => "vid",
            Self::Audio => "aud",
            Self::Document => "txt",
            Self::Script => "js",
            Self::Style => "css",
            Self::Markup => "html",
            Self::Other(ext) => ext,
        }
    }
}

/// Extract the extension that should drive classification.
///
/// Compiler-emitted virtual ids often carry the real extension inside the
/// query string (`App.svelte?svelte&type=style&lang.css` is CSS, not a
/// Svelte component), so a trailing `.token` in the query wins over the
/// path extension when present.
fn effective_extension(name: &str) -> String {
    let (path_part, query) = match name.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (name, None),
    };

    if let Some(query) = query {
        if let Some(idx) = query.rfind('.') {
            let tail = &query[idx + 1..];
            let looks_like_extension = tail
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic())
                && tail.chars().all(|c| c.is_ascii_alphanumeric());
            if looks_like_extension {
                return tail.to_ascii_lowercase();
            }
        }
    }

    let file_name = path_part.rsplit('/').next().unwrap_or(path_part);
    match file_name.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < file_name.len() => {
            file_name[idx + 1..].to_ascii_lowercase()
        }
        // Extension-less and dotfile names pass their own name through as
        // the label, so they still sort into a stable directory.
        _ => {
            let cleaned = file_name.trim_matches('.').to_ascii_lowercase();
            if cleaned.is_empty() {
                "bin".to_string()
            } else {
                cleaned
            }
        }
    }
}
