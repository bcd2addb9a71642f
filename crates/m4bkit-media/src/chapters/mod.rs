//! Chapter extraction.
//!
//! Three strategies, tried in order by the extractor:
//! 1. the Nero `chpl` list under `moov > udta` ([`parse_chpl`])
//! 2. a timed-text chapter track ([`extract_text_track`])
//! 3. fixed-length synthetic parts ([`synthesize`])

mod chpl;
mod text_track;

pub use chpl::parse_chpl;
pub use text_track::{extract_text_track, find_text_track, parse_text_track, text_tracks};

/// A single chapter marker.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct Chapter {
    pub title: String,
    /// Start time in seconds.
    pub start_secs: f64,
    /// Duration in seconds, `None` until it can be derived.
    pub duration_secs: Option<f64>,
}

impl Chapter {
    pub fn new(title: impl Into<String>, start_secs: f64) -> Self {
        Self {
            title: title.into(),
            start_secs,
            duration_secs: None,
        }
    }

    /// End time in seconds, if the duration is known.
    pub fn end_secs(&self) -> Option<f64> {
        self.duration_secs.map(|d| self.start_secs + d)
    }
}

/// Where the returned chapters came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "serialize", serde(rename_all = "snake_case"))]
pub enum ChapterSource {
    /// `udta > chpl`.
    ChapterList,
    /// Timed-text track samples.
    TextTrack,
    /// Fixed-length parts generated from the duration.
    Synthetic,
    /// No chapters.
    #[default]
    None,
}

impl ChapterSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ChapterList => "chapter list",
            Self::TextTrack => "text track",
            Self::Synthetic => "synthetic",
            Self::None => "none",
        }
    }
}

impl std::fmt::Display for ChapterSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upper bound on generated parts, whatever the segment length.
const MAX_SYNTHETIC_PARTS: usize = 10_000;

/// Use `title` unless it is blank, otherwise `Chapter {number}`.
pub(crate) fn title_or_numbered(title: String, number: usize) -> String {
    if title.trim().is_empty() {
        format!("Chapter {number}")
    } else {
        title
    }
}

/// Set every chapter's duration from its successor's start. The last one is
/// left as `None`.
pub fn fill_durations(chapters: &mut [Chapter]) {
    let starts: Vec<f64> = chapters.iter().map(|c| c.start_secs).collect();
    for (chapter, next_start) in chapters.iter_mut().zip(starts.iter().skip(1)) {
        chapter.duration_secs = Some(next_start - chapter.start_secs);
    }
    if let Some(last) = chapters.last_mut() {
        last.duration_secs = None;
    }
}

/// One `Part N` chapter per `segment_secs` of `total_secs`.
///
/// Returns nothing when either value is non-positive or non-finite. The
/// final part is shortened to end at `total_secs`.
pub fn synthesize(total_secs: f64, segment_secs: f64) -> Vec<Chapter> {
    if !(total_secs.is_finite() && total_secs > 0.0 && segment_secs.is_finite() && segment_secs > 0.0) {
        return Vec::new();
    }

    let parts = ((total_secs / segment_secs).ceil() as usize).clamp(1, MAX_SYNTHETIC_PARTS);
    (0..parts)
        .map(|i| {
            let start = i as f64 * segment_secs;
            Chapter {
                title: format!("Part {}", i + 1),
                start_secs: start,
                duration_secs: Some(segment_secs.min(total_secs - start)),
            }
        })
        .filter(|c| c.start_secs < total_secs)
        .collect()
}

/// Sort by start time, drop repeated start times (first wins) and derive
/// durations. The last chapter runs to `total_secs` when that is known.
pub fn finalize(mut chapters: Vec<Chapter>, total_secs: f64) -> Vec<Chapter> {
    chapters.retain(|c| c.start_secs.is_finite());
    chapters.sort_by(|a, b| a.start_secs.total_cmp(&b.start_secs));
    chapters.dedup_by(|later, earlier| later.start_secs == earlier.start_secs);

    fill_durations(&mut chapters);
    if total_secs > 0.0 {
        if let Some(last) = chapters.last_mut() {
            last.duration_secs = Some((total_secs - last.start_secs).max(0.0));
        }
    }
    chapters
}
