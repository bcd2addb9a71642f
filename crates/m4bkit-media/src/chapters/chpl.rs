//! Nero chapter list (`udta > chpl`).
//!
//! Layout after the atom header:
//! version(1) + flags(3) + reserved(4) + entry_count(4), then per entry
//! start(8, 100ns ticks) + title_len(1) + title.

use tracing::debug;

use super::{fill_durations, title_or_numbered, Chapter};
use crate::mp4::{Atom, ByteSource};
use crate::{Error, Result};

const TICKS_PER_SECOND: f64 = 10_000_000.0;

/// Timestamp + title length.
const ENTRY_HEADER_SIZE: usize = 9;

/// Version/flags, reserved word and entry count.
const LIST_HEADER_SIZE: usize = 12;

/// Parse a `chpl` atom.
///
/// An entry count of zero or above `max_entries` is rejected. A title that
/// would run past the atom ends the list early with the entries read so far.
pub fn parse_chpl(source: ByteSource<'_>, chpl: &Atom, max_entries: usize) -> Result<Vec<Chapter>> {
    let base = chpl.data_offset();
    let end = chpl.end();

    if chpl.data_size() < LIST_HEADER_SIZE {
        return Err(Error::invalid_mp4(format!(
            "chpl payload of {} bytes has no entry count",
            chpl.data_size()
        )));
    }

    let count = source.read_u32(base + 8)? as usize;
    if count == 0 || count > max_entries {
        return Err(Error::invalid_mp4(format!(
            "chpl entry count {count} outside 1..={max_entries}"
        )));
    }

    let mut chapters = Vec::with_capacity(count);
    let mut pos = base + LIST_HEADER_SIZE;

    for index in 0..count {
        if pos + ENTRY_HEADER_SIZE > end {
            debug!(index, "chpl truncated before entry header");
            break;
        }
        let ticks = source.read_u64(pos)?;
        let title_len = source.read_u8(pos + 8)? as usize;
        let title_start = pos + ENTRY_HEADER_SIZE;
        if title_start + title_len > end {
            debug!(index, title_len, "chpl title overruns atom");
            break;
        }

        let title = source.read_text(title_start, title_len)?;
        chapters.push(Chapter::new(
            title_or_numbered(title, index + 1),
            ticks as f64 / TICKS_PER_SECOND,
        ));
        pos = title_start + title_len;
    }

    fill_durations(&mut chapters);
    Ok(chapters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{atom, chpl, chpl_with_count, full_atom};
    use crate::mp4::{find_atom, AtomType};

    fn parse(data: &[u8], max: usize) -> Result<Vec<Chapter>> {
        let src = ByteSource::new(data);
        let atom = find_atom(src, AtomType::CHPL, 0, data.len()).unwrap();
        parse_chpl(src, &atom, max)
    }

    #[test]
    fn test_three_entries() {
        let data = chpl(&[(0, "Intro"), (50_000_000, "Part One"), (120_000_000, "Part Two")]);
        let chapters = parse(&data, 1000).unwrap();

        let starts: Vec<_> = chapters.iter().map(|c| c.start_secs).collect();
        assert_eq!(starts, vec![0.0, 5.0, 12.0]);
        assert_eq!(chapters[0].title, "Intro");
        assert_eq!(chapters[0].duration_secs, Some(5.0));
        assert_eq!(chapters[1].duration_secs, Some(7.0));
        assert_eq!(chapters[2].duration_secs, None);
    }

    #[test]
    fn test_blank_titles_are_numbered() {
        let data = chpl(&[(0, "Opening"), (10_000_000, "   "), (20_000_000, "")]);
        let chapters = parse(&data, 1000).unwrap();
        assert_eq!(chapters[1].title, "Chapter 2");
        assert_eq!(chapters[2].title, "Chapter 3");
    }

    #[test]
    fn test_entry_count_bounds() {
        assert!(parse(&chpl(&[]), 1000).is_err());
        let entries = [(0, "a"), (1, "b"), (2, "c")];
        assert!(parse(&chpl(&entries), 2).is_err());
        assert!(parse(&chpl_with_count(1001, &entries), 1000).is_err());
    }

    #[test]
    fn test_overrunning_title_stops_early() {
        // Declares four entries but only carries two.
        let data = chpl_with_count(4, &[(0, "One"), (30_000_000, "Two")]);
        let chapters = parse(&data, 1000).unwrap();
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[1].title, "Two");

        // Title length byte claims more than the atom holds.
        let mut data = chpl(&[(0, "One"), (30_000_000, "Two")]);
        let len_pos = data.len() - 4;
        data[len_pos] = 200;
        let chapters = parse(&data, 1000).unwrap();
        assert_eq!(chapters.len(), 1);
    }

    #[test]
    fn test_truncated_header() {
        let data = full_atom(b"chpl", 1, 0, &[0, 0]);
        assert!(matches!(parse(&data, 1000), Err(Error::InvalidMp4(_))));
    }

    #[test]
    fn test_count_is_not_read_from_next_sibling() {
        // 8-byte payload; the following atom's size word would read as 12.
        let mut data = full_atom(b"chpl", 1, 0, &[0; 4]);
        data.extend(atom(b"free", &[0; 4]));
        assert!(matches!(parse(&data, 1000), Err(Error::InvalidMp4(_))));
    }
}
