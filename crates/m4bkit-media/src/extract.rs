//! Metadata and chapter extraction over a whole in-memory file.

use std::path::Path;

use tracing::{debug, instrument};

use crate::chapters::{self, Chapter, ChapterSource};
use crate::metadata::{self, MovieMetadata};
use crate::mp4::{find_moov, movie_duration_secs, Atom, AtomType, ByteSource};
use crate::Result;

/// Bounds applied to every extraction.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialize", serde(default))]
pub struct ExtractOptions {
    /// `trak` atoms inspected when looking for a text chapter track.
    pub max_tracks: usize,
    /// Samples read from a text chapter track.
    pub max_text_samples: usize,
    /// Largest `chpl` entry count accepted.
    pub max_chapter_entries: usize,
    /// Length of each synthetic part, in seconds.
    pub segment_secs: f64,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            max_tracks: 10,
            max_text_samples: 100,
            max_chapter_entries: 1000,
            segment_secs: 600.0,
        }
    }
}

/// Result of one extraction.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct Extraction {
    pub metadata: MovieMetadata,
    /// Sorted by start time, no repeated start times.
    pub chapters: Vec<Chapter>,
    pub source: ChapterSource,
}

/// Reads movie metadata and chapters from MP4/M4B files.
///
/// Extraction never fails on malformed input: every step that cannot read
/// its atoms is logged and skipped, and the next fallback runs.
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    options: ExtractOptions,
}

impl Extractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ExtractOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Read a file into memory and extract from it, using its name as the
    /// fallback title.
    pub fn extract_file<P: AsRef<Path>>(&self, path: P) -> Result<Extraction> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(self.extract_named(&name, &data))
    }

    /// Like [`Extractor::extract`], titling untagged files after `file_name`
    /// without its extension. Dot-files such as `.m4b` get no title.
    pub fn extract_named(&self, file_name: &str, data: &[u8]) -> Extraction {
        let mut extraction = self.extract(data);
        if extraction.metadata.title.is_none() {
            let stem = Path::new(file_name)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .filter(|s| !s.is_empty() && !s.starts_with('.'));
            extraction.metadata.title = stem;
        }
        extraction
    }

    /// Extract metadata and chapters from a complete file buffer.
    #[instrument(level = "debug", skip_all, fields(len = data.len()))]
    pub fn extract(&self, data: &[u8]) -> Extraction {
        let source = ByteSource::new(data);
        let Some(moov) = find_moov(source) else {
            debug!("no moov atom");
            return Extraction::default();
        };

        let mut meta = MovieMetadata {
            duration_secs: movie_duration_secs(source, &moov).unwrap_or_else(|e| {
                debug!(error = %e, "no movie duration");
                0.0
            }),
            ..Default::default()
        };

        let udta = moov.find_child(source, AtomType::UDTA);
        if let Some(udta) = &udta {
            match metadata::read_tags(source, udta) {
                Ok(items) => items.into_iter().for_each(|item| meta.apply(item)),
                Err(e) => debug!(error = %e, "no tags"),
            }
        }

        let (found, chapter_source) = self.find_chapters(source, &moov, udta.as_ref(), meta.duration_secs);
        let found = chapters::finalize(found, meta.duration_secs);
        debug!(count = found.len(), source = %chapter_source, "chapters extracted");

        Extraction {
            metadata: meta,
            chapters: found,
            source: chapter_source,
        }
    }

    fn find_chapters(
        &self,
        source: ByteSource<'_>,
        moov: &Atom,
        udta: Option<&Atom>,
        total_secs: f64,
    ) -> (Vec<Chapter>, ChapterSource) {
        let opts = &self.options;

        if let Some(chpl) = udta.and_then(|u| u.find_child(source, AtomType::CHPL)) {
            match chapters::parse_chpl(source, &chpl, opts.max_chapter_entries) {
                Ok(list) if !list.is_empty() => return (list, ChapterSource::ChapterList),
                Ok(_) => debug!("chpl has no entries"),
                Err(e) => debug!(error = %e, "chpl rejected"),
            }
        }

        match chapters::extract_text_track(source, moov, opts.max_tracks, opts.max_text_samples) {
            Ok(list) if !list.is_empty() => return (list, ChapterSource::TextTrack),
            Ok(_) => debug!("text track has no samples"),
            Err(e) => debug!(error = %e, "no text track chapters"),
        }

        let parts = chapters::synthesize(total_secs, opts.segment_secs);
        if parts.is_empty() {
            (parts, ChapterSource::None)
        } else {
            (parts, ChapterSource::Synthetic)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{chpl_with_count, ilst_item, M4bBuilder, TextTrack};

    fn sec(s: u64) -> u64 {
        s * 10_000_000
    }

    #[test]
    fn test_no_moov_yields_defaults() {
        let extraction = Extractor::new().extract(&[0u8; 1024]);
        assert_eq!(extraction, Extraction::default());
        assert_eq!(extraction.metadata.duration_secs, 0.0);
        assert!(extraction.metadata.title.is_none());
    }

    #[test]
    fn test_chpl_wins_over_text_track() {
        let data = M4bBuilder::new()
            .duration(1000, 20_000)
            .audio_track()
            .text_track(TextTrack::new(1000).sample(20_000, "From track"))
            .chapters(&[(0, "Intro"), (sec(5), "Part One"), (sec(12), "Part Two")])
            .build();
        let extraction = Extractor::new().extract(&data);

        assert_eq!(extraction.source, ChapterSource::ChapterList);
        let durations: Vec<_> = extraction.chapters.iter().map(|c| c.duration_secs).collect();
        assert_eq!(durations, vec![Some(5.0), Some(7.0), Some(8.0)]);
    }

    #[test]
    fn test_rejected_chpl_falls_back_to_text_track() {
        let data = M4bBuilder::new()
            .duration(1000, 20_000)
            .audio_track()
            .text_track(TextTrack::new(1000).sample(8000, "One").sample(12_000, "Two"))
            .chpl_atom(chpl_with_count(5000, &[(0, "Too many")]))
            .build();
        let extraction = Extractor::new().extract(&data);

        assert_eq!(extraction.source, ChapterSource::TextTrack);
        assert_eq!(extraction.chapters[1].title, "Two");
        assert_eq!(extraction.chapters[1].duration_secs, Some(12.0));
    }

    #[test]
    fn test_unreadable_text_track_is_passed_over() {
        let data = M4bBuilder::new()
            .duration(1000, 10_000)
            .audio_track()
            .tableless_text_track()
            .text_track(TextTrack::new(1000).sample(4000, "Real One").sample(6000, "Real Two"))
            .build();
        let extraction = Extractor::new().extract(&data);

        assert_eq!(extraction.source, ChapterSource::TextTrack);
        let titles: Vec<_> = extraction.chapters.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Real One", "Real Two"]);
        assert_eq!(extraction.chapters[1].duration_secs, Some(6.0));
    }

    #[test]
    fn test_synthetic_parts() {
        let data = M4bBuilder::new().duration(1000, 1_800_000).audio_track().build();
        let extraction = Extractor::new().extract(&data);
        assert_eq!(extraction.source, ChapterSource::Synthetic);
        let titles: Vec<_> = extraction.chapters.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Part 1", "Part 2", "Part 3"]);
    }

    #[test]
    fn test_custom_segment_length() {
        let data = M4bBuilder::new().duration(1, 300).build();
        let extractor = Extractor::with_options(ExtractOptions {
            segment_secs: 100.0,
            ..Default::default()
        });
        assert_eq!(extractor.extract(&data).chapters.len(), 3);
    }

    #[test]
    fn test_no_duration_no_chapters() {
        let data = M4bBuilder::new().text_tag(b"\xa9nam", "Untimed").build();
        let extraction = Extractor::new().extract(&data);
        assert_eq!(extraction.metadata.title.as_deref(), Some("Untimed"));
        assert_eq!(extraction.source, ChapterSource::None);
        assert!(extraction.chapters.is_empty());
    }

    #[test]
    fn test_tags_last_duplicate_wins() {
        let data = M4bBuilder::new()
            .duration(1000, 1000)
            .text_tag(b"\xa9nam", "First")
            .text_tag(b"\xa9ART", "Author")
            .text_tag(b"\xa9nam", "Second")
            .raw_tag(ilst_item(b"covr", 14, b"\x89PNG\r\n"))
            .build();
        let meta = Extractor::new().extract(&data).metadata;
        assert_eq!(meta.title.as_deref(), Some("Second"));
        assert_eq!(meta.artist.as_deref(), Some("Author"));
        assert_eq!(meta.cover.map(|c| c.len()), Some(6));
    }

    #[test]
    fn test_extract_named_title_fallback() {
        let extractor = Extractor::new();
        let untagged = extractor.extract_named("Dune.m4b", &[0u8; 64]);
        assert_eq!(untagged.metadata.title.as_deref(), Some("Dune"));

        assert_eq!(extractor.extract_named(".m4b", &[0u8; 64]).metadata.title, None);
        assert_eq!(extractor.extract_named(".hidden", &[0u8; 64]).metadata.title, None);

        let data = M4bBuilder::new().duration(1, 1).text_tag(b"\xa9nam", "Tagged").build();
        let tagged = extractor.extract_named("file.m4b", &data);
        assert_eq!(tagged.metadata.title.as_deref(), Some("Tagged"));
    }

    #[test]
    fn test_extract_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Book Title.m4b");
        std::fs::write(&path, M4bBuilder::new().duration(1000, 5000).build()).unwrap();

        let extraction = Extractor::new().extract_file(&path).unwrap();
        assert_eq!(extraction.metadata.title.as_deref(), Some("Book Title"));
        assert_eq!(extraction.metadata.duration_secs, 5.0);

        let missing = Extractor::new().extract_file(dir.path().join("missing.m4b"));
        assert!(matches!(missing, Err(crate::Error::Io(_))));
    }

    #[test]
    fn test_idempotent() {
        let data = M4bBuilder::new()
            .duration(1000, 20_000)
            .chapters(&[(0, "A"), (sec(10), "B")])
            .text_tag(b"\xa9alb", "Album")
            .build();
        let extractor = Extractor::new();
        assert_eq!(extractor.extract(&data), extractor.extract(&data));
    }
}
