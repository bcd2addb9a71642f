//! MP4 container parsing.
//!
//! Box scanning, header decoding and sample tables over an in-memory file.
//! The navigation helpers here locate the well-known paths an audiobook
//! uses: `moov > mvhd`, `moov > udta`, and `moov > trak > mdia > minf > stbl`.

mod atoms;
mod reader;
mod sample_table;

pub use atoms::{find_atom, Atom, AtomType, Atoms, HandlerType};
pub use reader::ByteSource;
pub use sample_table::{
    parse_co64, parse_stco, parse_stsc, parse_stsz, parse_stts, SampleEntry, SampleTable,
    SampleTableBuilder,
};

use crate::{Error, Result};

/// Locate the top-level `moov` atom.
pub fn find_moov(source: ByteSource<'_>) -> Option<Atom> {
    find_atom(source, AtomType::MOOV, 0, source.len())
}

/// Timescale and duration from an `mvhd` or `mdhd`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaHeader {
    pub version: u8,
    /// Time units per second.
    pub timescale: u32,
    /// Duration in timescale units.
    pub duration: u64,
}

impl MediaHeader {
    /// Parse either header version.
    ///
    /// Version 1 uses 64-bit creation/modification/duration fields, version 0
    /// uses 32-bit ones. Both share the same leading version/flags word.
    pub fn parse(source: ByteSource<'_>, atom: &Atom) -> Result<Self> {
        let base = atom.data_offset();
        let version = source.read_u8(base)?;
        let (timescale, duration) = if version == 1 {
            (source.read_u32(base + 20)?, source.read_u64(base + 24)?)
        } else {
            (source.read_u32(base + 12)?, source.read_u32(base + 16)? as u64)
        };
        Ok(Self {
            version,
            timescale,
            duration,
        })
    }

    /// Get the duration in seconds, 0 when the timescale is 0.
    pub fn duration_secs(&self) -> f64 {
        if self.timescale == 0 {
            0.0
        } else {
            self.duration as f64 / self.timescale as f64
        }
    }
}

/// Movie duration from `moov > mvhd`.
pub fn movie_duration_secs(source: ByteSource<'_>, moov: &Atom) -> Result<f64> {
    let mvhd = moov
        .find_child(source, AtomType::MVHD)
        .ok_or(Error::MissingAtom("mvhd"))?;
    Ok(MediaHeader::parse(source, &mvhd)?.duration_secs())
}

/// Iterate up to `max` `trak` atoms directly under `moov`.
pub fn tracks<'a>(source: ByteSource<'a>, moov: &Atom, max: usize) -> impl Iterator<Item = Atom> + 'a {
    moov.children(source)
        .filter(|atom| atom.atom_type == AtomType::TRAK)
        .take(max)
}

/// The atoms of one track needed to read its samples.
#[derive(Debug, Clone, Copy)]
pub struct TrackAtoms {
    pub trak: Atom,
    pub mdia: Atom,
    pub mdhd: Option<Atom>,
    pub stbl: Atom,
}

impl TrackAtoms {
    /// Resolve `mdia`, `mdhd` and `mdia > minf > stbl` under a `trak`.
    pub fn locate(source: ByteSource<'_>, trak: &Atom) -> Result<Self> {
        let mdia = trak
            .find_child(source, AtomType::MDIA)
            .ok_or(Error::MissingAtom("mdia"))?;
        let stbl = mdia
            .find_path(source, &[AtomType::MINF, AtomType::STBL])
            .ok_or(Error::MissingAtom("stbl"))?;
        Ok(Self {
            trak: *trak,
            mdia,
            mdhd: mdia.find_child(source, AtomType::MDHD),
            stbl,
        })
    }

    /// Codec of the first sample description entry.
    pub fn handler_type(&self, source: ByteSource<'_>) -> Result<HandlerType> {
        let stsd = self
            .stbl
            .find_child(source, AtomType::STSD)
            .ok_or(Error::MissingAtom("stsd"))?;
        // version/flags(4) + entry_count(4) + entry size(4), then the format.
        let format = source.read_fourcc(stsd.data_offset() + 12)?;
        Ok(HandlerType::from_bytes(format.0))
    }
}
