//! MP4 atom definitions and scanning.

use super::ByteSource;
use tracing::trace;

/// An atom's four-byte type, e.g. `moov` or `©nam`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AtomType(pub [u8; 4]);

impl AtomType {
    pub const FTYP: Self = Self(*b"ftyp");
    pub const MOOV: Self = Self(*b"moov");
    pub const MDAT: Self = Self(*b"mdat");
    pub const MVHD: Self = Self(*b"mvhd");
    pub const TRAK: Self = Self(*b"trak");
    pub const MDIA: Self = Self(*b"mdia");
    pub const MDHD: Self = Self(*b"mdhd");
    pub const MINF: Self = Self(*b"minf");
    pub const STBL: Self = Self(*b"stbl");
    pub const STSD: Self = Self(*b"stsd");
    pub const STTS: Self = Self(*b"stts");
    pub const STSC: Self = Self(*b"stsc");
    pub const STSZ: Self = Self(*b"stsz");
    pub const STCO: Self = Self(*b"stco");
    pub const CO64: Self = Self(*b"co64");
    pub const UDTA: Self = Self(*b"udta");
    pub const META: Self = Self(*b"meta");
    pub const ILST: Self = Self(*b"ilst");
    pub const DATA: Self = Self(*b"data");
    pub const CHPL: Self = Self(*b"chpl");

    /// Wrap a raw type code.
    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// The code as text, or `????` when it is not UTF-8.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or("????")
    }
}

impl std::fmt::Display for AtomType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // iTunes keys start with 0xA9, which is not valid UTF-8 on its own.
        for &b in &self.0 {
            match b {
                0xA9 => write!(f, "\u{a9}")?,
                b if b.is_ascii_graphic() || b == b' ' => write!(f, "{}", b as char)?,
                _ => write!(f, "?")?,
            }
        }
        Ok(())
    }
}

/// A located atom.
///
/// Atoms produced by [`Atoms`] always satisfy
/// `offset + size <= ByteSource::len()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Atom {
    /// Type read from the header.
    pub atom_type: AtomType,
    /// File offset of the atom header.
    pub offset: usize,
    /// Total size in bytes, header included.
    pub size: usize,
    /// 16 when the atom uses an extended size, otherwise 8.
    pub header_size: usize,
}

impl Atom {
    /// Position of the first payload byte.
    pub fn data_offset(&self) -> usize {
        self.offset + self.header_size
    }

    /// Payload size, excluding the header.
    pub fn data_size(&self) -> usize {
        self.size.saturating_sub(self.header_size)
    }

    /// File offset one past the last byte of this atom.
    pub fn end(&self) -> usize {
        self.offset + self.size
    }

    /// Iterate the atoms nested directly inside this one.
    pub fn children<'a>(&self, source: ByteSource<'a>) -> Atoms<'a> {
        Atoms::new(source, self.data_offset(), self.data_size())
    }

    /// Find the first direct child with the given type.
    pub fn find_child(&self, source: ByteSource<'_>, atom_type: AtomType) -> Option<Atom> {
        find_atom(source, atom_type, self.data_offset(), self.data_size())
    }

    /// Follow a chain of child types, e.g. `[MDIA, MINF, STBL]`.
    pub fn find_path(&self, source: ByteSource<'_>, path: &[AtomType]) -> Option<Atom> {
        path.iter()
            .try_fold(*self, |parent, &ty| parent.find_child(source, ty))
    }
}

/// Iterator over sibling atoms inside a byte range.
///
/// Malformed sizes never cause a panic or an out-of-bounds read:
/// - size 0 extends the atom to the end of the range and ends the scan,
/// - a declared size below the header length advances one byte and retries,
/// - an atom overrunning the range, or an extended size that cannot be read,
///   ends the scan.
///
/// [`Atoms::skip_overruns`] changes the overrun case to skip the 8-byte
/// header and keep scanning.
#[derive(Debug, Clone)]
pub struct Atoms<'a> {
    source: ByteSource<'a>,
    pos: usize,
    end: usize,
    skip_overruns: bool,
}

impl<'a> Atoms<'a> {
    /// Scan `len` bytes starting at `start`, clamped to the buffer.
    pub fn new(source: ByteSource<'a>, start: usize, len: usize) -> Self {
        let end = start.saturating_add(len).min(source.len());
        Self {
            source,
            pos: start,
            end,
            skip_overruns: false,
        }
    }

    /// Step over an atom whose declared size runs past the range instead of
    /// ending the scan. Siblings after a corrupt entry stay reachable.
    pub fn skip_overruns(mut self) -> Self {
        self.skip_overruns = true;
        self
    }

    fn stop(&mut self) -> Option<Atom> {
        self.pos = self.end;
        None
    }
}

impl Iterator for Atoms<'_> {
    type Item = Atom;

    fn next(&mut self) -> Option<Atom> {
        while self.pos.checked_add(8).is_some_and(|h| h <= self.end) {
            let pos = self.pos;
            let (Ok(declared), Ok(atom_type)) =
                (self.source.read_u32(pos), self.source.read_fourcc(pos + 4))
            else {
                return self.stop();
            };

            let remaining = self.end - pos;
            let (size, header_size) = match declared {
                0 => (remaining, 8),
                1 => {
                    if remaining < 16 {
                        return self.stop();
                    }
                    match self.source.read_u64(pos + 8) {
                        Ok(ext) => (usize::try_from(ext).unwrap_or(usize::MAX), 16),
                        Err(_) => return self.stop(),
                    }
                }
                n => (n as usize, 8),
            };

            if size < header_size {
                trace!(offset = pos, size, "invalid atom size, resyncing");
                self.pos += 1;
                continue;
            }

            if size > remaining {
                trace!(offset = pos, %atom_type, size, remaining, "atom overruns parent");
                if self.skip_overruns {
                    self.pos = pos + 8;
                    continue;
                }
                return self.stop();
            }

            self.pos = pos + size;
            trace!(offset = pos, %atom_type, size, "atom");
            return Some(Atom {
                atom_type,
                offset: pos,
                size,
                header_size,
            });
        }

        None
    }
}

/// Find the first atom of `atom_type` within `search_len` bytes from
/// `search_start`.
pub fn find_atom(
    source: ByteSource<'_>,
    atom_type: AtomType,
    search_start: usize,
    search_len: usize,
) -> Option<Atom> {
    Atoms::new(source, search_start, search_len).find(|atom| atom.atom_type == atom_type)
}

/// Codec of a track's first sample description entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerType {
    /// Timed text (`tx3g`, `text`), used for chapter tracks.
    Text,
    /// Audio sample entry.
    Audio,
    Unknown([u8; 4]),
}

impl HandlerType {
    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        match &bytes {
            b"tx3g" | b"text" => Self::Text,
            b"mp4a" | b"alac" | b"ac-3" | b"ec-3" | b"Opus" | b"fLaC" => Self::Audio,
            _ => Self::Unknown(bytes),
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text)
    }
}
