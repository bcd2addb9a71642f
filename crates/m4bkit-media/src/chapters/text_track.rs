//! Timed-text chapter tracks.
//!
//! Some encoders store chapter titles as samples of a `tx3g`/`text` track
//! instead of writing a `chpl`. Each sample is a big-endian `u16` length
//! followed by the UTF-8 title, timed by the track's `stts`.

use tracing::debug;

use super::{fill_durations, Chapter};
use crate::mp4::{tracks, Atom, ByteSource, MediaHeader, SampleEntry, SampleTable, TrackAtoms};
use crate::{Error, Result};

/// Timescale assumed when the track has no `mdhd`.
const DEFAULT_TIMESCALE: u32 = 1000;

/// Sample text lengths at or above this are treated as garbage.
const MAX_TITLE_LEN: usize = 500;

/// Tracks among the first `max_tracks` whose sample description is timed
/// text, in file order.
pub fn text_tracks<'a>(
    source: ByteSource<'a>,
    moov: &Atom,
    max_tracks: usize,
) -> impl Iterator<Item = TrackAtoms> + 'a {
    tracks(source, moov, max_tracks).filter_map(move |trak| {
        let track = match TrackAtoms::locate(source, &trak) {
            Ok(track) => track,
            Err(e) => {
                debug!(offset = trak.offset, error = %e, "skipping incomplete track");
                return None;
            }
        };
        match track.handler_type(source) {
            Ok(handler) if handler.is_text() => Some(track),
            Ok(handler) => {
                debug!(offset = trak.offset, ?handler, "skipping non-text track");
                None
            }
            Err(e) => {
                debug!(offset = trak.offset, error = %e, "skipping track without stsd");
                None
            }
        }
    })
}

/// First timed-text track among the first `max_tracks`.
pub fn find_text_track(source: ByteSource<'_>, moov: &Atom, max_tracks: usize) -> Option<TrackAtoms> {
    text_tracks(source, moov, max_tracks).next()
}

/// Read up to `max_samples` chapter titles from a text track.
pub fn parse_text_track(source: ByteSource<'_>, track: &TrackAtoms, max_samples: usize) -> Result<Vec<Chapter>> {
    let timescale = match &track.mdhd {
        Some(mdhd) => MediaHeader::parse(source, mdhd)?.timescale,
        None => DEFAULT_TIMESCALE,
    };
    if timescale == 0 {
        return Err(Error::invalid_mp4("text track timescale is 0"));
    }

    let table = SampleTable::parse(source, &track.stbl, timescale, max_samples)?;
    debug!(
        declared = table.sample_count,
        resolved = table.len(),
        timescale,
        "text track sample table"
    );

    let mut chapters: Vec<Chapter> = table
        .iter()
        .map(|sample| {
            let title = sample_title(source, sample)
                .unwrap_or_else(|| format!("Chapter {}", sample.index + 1));
            Chapter::new(title, table.start_secs(sample))
        })
        .collect();

    fill_durations(&mut chapters);
    Ok(chapters)
}

/// Chapters from the first text track under `moov` that yields any.
///
/// A track that cannot be read, or has no samples, is passed over for the
/// next one. When none yields chapters the last failure is returned.
pub fn extract_text_track(
    source: ByteSource<'_>,
    moov: &Atom,
    max_tracks: usize,
    max_samples: usize,
) -> Result<Vec<Chapter>> {
    let mut outcome = Err(Error::invalid_mp4("no text track"));

    for track in text_tracks(source, moov, max_tracks) {
        match parse_text_track(source, &track, max_samples) {
            Ok(chapters) if !chapters.is_empty() => return Ok(chapters),
            Ok(chapters) => outcome = Ok(chapters),
            Err(e) => {
                debug!(offset = track.trak.offset, error = %e, "unreadable text track");
                outcome = Err(e);
            }
        }
    }

    outcome
}

fn sample_title(source: ByteSource<'_>, sample: &SampleEntry) -> Option<String> {
    let offset = usize::try_from(sample.offset).ok()?;
    let len = source.read_u16(offset).ok()? as usize;
    if len == 0 || len >= MAX_TITLE_LEN {
        return None;
    }
    let title = source.read_text(offset + 2, len).ok()?;
    (!title.is_empty()).then_some(title)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{M4bBuilder, TextTrack};
    use crate::mp4::{find_moov, HandlerType};

    fn chapters_of(data: &[u8], max_samples: usize) -> Result<Vec<Chapter>> {
        let src = ByteSource::new(data);
        let moov = find_moov(src).unwrap();
        extract_text_track(src, &moov, 10, max_samples)
    }

    fn book(track: TextTrack) -> Vec<u8> {
        M4bBuilder::new()
            .duration(1000, 3_600_000)
            .audio_track()
            .text_track(track)
            .build()
    }

    #[test]
    fn test_reads_titles_and_times() {
        let data = book(
            TextTrack::new(1000)
                .sample(90_000, "Opening Credits")
                .sample(1_200_000, "Chapter One")
                .sample(600_000, "Épilogue"),
        );
        let chapters = chapters_of(&data, 100).unwrap();

        let titles: Vec<_> = chapters.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Opening Credits", "Chapter One", "Épilogue"]);
        let starts: Vec<_> = chapters.iter().map(|c| c.start_secs).collect();
        assert_eq!(starts, vec![0.0, 90.0, 1290.0]);
        assert_eq!(chapters[1].duration_secs, Some(1200.0));
        assert_eq!(chapters[2].duration_secs, None);
    }

    #[test]
    fn test_audio_track_is_not_chosen() {
        let data = M4bBuilder::new().duration(1000, 1000).audio_track().build();
        let src = ByteSource::new(&data);
        let moov = find_moov(src).unwrap();
        assert!(find_text_track(src, &moov, 10).is_none());
        assert!(chapters_of(&data, 100).is_err());
    }

    #[test]
    fn test_track_cap_hides_later_text_track() {
        let data = book(TextTrack::new(1000).sample(1000, "Hidden"));
        let src = ByteSource::new(&data);
        let moov = find_moov(src).unwrap();
        assert!(find_text_track(src, &moov, 1).is_none());
        let track = find_text_track(src, &moov, 2).unwrap();
        assert_eq!(track.handler_type(src).unwrap(), HandlerType::Text);
    }

    #[test]
    fn test_unreadable_text_track_falls_through_to_next() {
        let data = M4bBuilder::new()
            .duration(1000, 4000)
            .audio_track()
            .tableless_text_track()
            .text_track(TextTrack::new(1000).sample(1500, "Real One").sample(2500, "Real Two"))
            .build();
        let src = ByteSource::new(&data);
        let moov = find_moov(src).unwrap();
        assert_eq!(text_tracks(src, &moov, 10).count(), 2);

        let first = find_text_track(src, &moov, 10).unwrap();
        assert!(matches!(
            parse_text_track(src, &first, 100),
            Err(Error::MissingAtom("stts"))
        ));

        let titles: Vec<_> = chapters_of(&data, 100)
            .unwrap()
            .into_iter()
            .map(|c| c.title)
            .collect();
        assert_eq!(titles, vec!["Real One", "Real Two"]);
    }

    #[test]
    fn test_only_unreadable_text_track_reports_its_error() {
        let data = M4bBuilder::new().duration(1000, 4000).tableless_text_track().build();
        assert!(matches!(chapters_of(&data, 100), Err(Error::MissingAtom("stts"))));
    }

    #[test]
    fn test_qt_text_format_and_v1_mdhd() {
        let mut track = TextTrack::new(600).sample(600, "A").sample(1200, "B");
        track.format = *b"text";
        track.mdhd_version = 1;
        let chapters = chapters_of(&book(track), 100).unwrap();
        assert_eq!(chapters[1].start_secs, 1.0);
    }

    #[test]
    fn test_blank_and_oversized_titles_are_numbered() {
        let long = "x".repeat(MAX_TITLE_LEN);
        let data = book(
            TextTrack::new(1000)
                .sample(1000, "Real")
                .sample(1000, "")
                .sample(1000, &long),
        );
        let chapters = chapters_of(&data, 100).unwrap();
        assert_eq!(chapters[0].title, "Real");
        assert_eq!(chapters[1].title, "Chapter 2");
        assert_eq!(chapters[2].title, "Chapter 3");
    }

    #[test]
    fn test_sample_cap() {
        let mut track = TextTrack::new(1);
        for i in 0..150 {
            track = track.sample(1, &format!("C{i}"));
        }
        let chapters = chapters_of(&book(track), 100).unwrap();
        assert_eq!(chapters.len(), 100);
        assert_eq!(chapters[99].title, "C99");
    }

    #[test]
    fn test_multiple_samples_per_chunk_and_co64() {
        let mut track = TextTrack::new(10)
            .sample(10, "One")
            .sample(10, "Two")
            .sample(10, "Three");
        track.samples_per_chunk = 2;
        track.co64 = true;
        let chapters = chapters_of(&book(track), 100).unwrap();
        let titles: Vec<_> = chapters.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["One", "Two", "Three"]);
    }

    #[test]
    fn test_zero_timescale_is_rejected() {
        let data = book(TextTrack::new(0).sample(1, "A"));
        assert!(matches!(chapters_of(&data, 100), Err(Error::InvalidMp4(_))));
    }

    #[test]
    fn test_out_of_bounds_sample_is_numbered() {
        let sample = SampleEntry {
            index: 4,
            offset: u64::MAX,
            size: 10,
            dts: 0,
            duration: 1,
        };
        let data = [0u8; 4];
        assert_eq!(sample_title(ByteSource::new(&data), &sample), None);
    }
}
