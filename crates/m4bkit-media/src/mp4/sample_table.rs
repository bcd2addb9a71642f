//! Resolving `stbl` tables into sample positions and times.
//!
//! Durations come from `stts`, sizes from `stsz`, and file positions from
//! `stco`/`co64` combined with the chunk runs in `stsc`.
//!
//! Only the first `limit` samples are ever resolved, so a table declaring
//! billions of samples costs no more than a small one.

use super::{Atom, AtomType, ByteSource};
use crate::{Error, Result};

/// A resolved sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleEntry {
    /// Position in decode order, from 0.
    pub index: u32,
    /// Absolute byte position in the file.
    pub offset: u64,
    pub size: u32,
    /// Decode time, in timescale ticks.
    pub dts: u64,
    /// Duration in media timescale.
    pub duration: u32,
}

/// The resolved samples of one track.
#[derive(Debug, Clone, Default)]
pub struct SampleTable {
    /// Media timescale (ticks per second).
    pub timescale: u32,
    /// Samples described by stts, before the resolve limit is applied.
    pub sample_count: u64,
    /// At most `limit` samples, in decode order.
    pub samples: Vec<SampleEntry>,
}

impl SampleTable {
    /// Parse stts/stsc/stsz/stco (or co64) from an `stbl` atom.
    ///
    /// `stts`, `stsz` and a chunk offset table are required; a missing
    /// `stsc` maps every sample to the first chunk.
    pub fn parse(source: ByteSource<'_>, stbl: &Atom, timescale: u32, limit: usize) -> Result<Self> {
        let mut builder = SampleTableBuilder::new().with_limit(limit);

        let stts = stbl
            .find_child(source, AtomType::STTS)
            .ok_or(Error::MissingAtom("stts"))?;
        builder.set_stts(parse_stts(source, &stts)?);

        let stsz = stbl
            .find_child(source, AtomType::STSZ)
            .ok_or(Error::MissingAtom("stsz"))?;
        let (uniform_size, sizes) = parse_stsz(source, &stsz, limit)?;
        builder.set_stsz(uniform_size, sizes);

        let offsets = if let Some(stco) = stbl.find_child(source, AtomType::STCO) {
            parse_stco(source, &stco)?
        } else if let Some(co64) = stbl.find_child(source, AtomType::CO64) {
            parse_co64(source, &co64)?
        } else {
            return Err(Error::MissingAtom("stco"));
        };
        builder.set_chunk_offsets(offsets);

        if let Some(stsc) = stbl.find_child(source, AtomType::STSC) {
            builder.set_stsc(parse_stsc(source, &stsc)?);
        }

        Ok(builder.build(timescale))
    }

    pub fn get(&self, index: u32) -> Option<&SampleEntry> {
        self.samples.get(index as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SampleEntry> {
        self.samples.iter()
    }

    /// Decode time of a sample in seconds, 0 when the timescale is 0.
    pub fn start_secs(&self, sample: &SampleEntry) -> f64 {
        if self.timescale == 0 {
            0.0
        } else {
            sample.dts as f64 / self.timescale as f64
        }
    }

    /// Number of resolved samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Samples preallocated up front, whatever the limit.
const PREALLOC_SAMPLES: usize = 4096;

/// Collects raw table entries and resolves them into a [`SampleTable`].
#[derive(Debug, Clone)]
pub struct SampleTableBuilder {
    /// stts runs: (sample_count, sample_delta)
    stts_entries: Vec<(u32, u32)>,
    /// stsc runs: (first_chunk, samples_per_chunk), 1-based chunks
    stsc_entries: Vec<(u32, u32)>,
    /// Non-zero when every sample has this size
    uniform_size: u32,
    sample_sizes: Vec<u32>,
    chunk_offsets: Vec<u64>,
    limit: usize,
}

impl SampleTableBuilder {
    /// A builder with no entries and no practical limit.
    pub fn new() -> Self {
        Self {
            stts_entries: Vec::new(),
            stsc_entries: Vec::new(),
            uniform_size: 0,
            sample_sizes: Vec::new(),
            chunk_offsets: Vec::new(),
            limit: u32::MAX as usize,
        }
    }

    /// Resolve at most `limit` samples.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn set_stts(&mut self, entries: Vec<(u32, u32)>) {
        self.stts_entries = entries;
    }

    pub fn set_stsc(&mut self, entries: Vec<(u32, u32)>) {
        self.stsc_entries = entries;
    }

    /// `uniform_size` of 0 means per-sample `sizes`.
    pub fn set_stsz(&mut self, uniform_size: u32, sizes: Vec<u32>) {
        self.uniform_size = uniform_size;
        self.sample_sizes = sizes;
    }

    pub fn set_chunk_offsets(&mut self, offsets: Vec<u64>) {
        self.chunk_offsets = offsets;
    }

    /// Walk the stts runs once, placing each sample in its chunk.
    ///
    /// A sample's offset is its chunk's offset plus the sizes of the samples
    /// before it in that chunk.
    pub fn build(self, timescale: u32) -> SampleTable {
        let sample_count: u64 = self.stts_entries.iter().map(|&(count, _)| u64::from(count)).sum();
        let wanted = usize::try_from(sample_count).unwrap_or(usize::MAX).min(self.limit);

        let durations = self
            .stts_entries
            .iter()
            .flat_map(|&(count, delta)| std::iter::repeat(delta).take(count as usize));
        let mut chunks = self.chunk_indices();

        let mut samples = Vec::with_capacity(wanted.min(PREALLOC_SAMPLES));
        let mut dts = 0u64;
        // (chunk, offset of the next sample in it)
        let mut fill: Option<(usize, u64)> = None;

        for (index, duration) in durations.take(wanted).enumerate() {
            let chunk = chunks.next().unwrap_or(0);
            let size = self.sample_size(index);
            let offset = match fill {
                Some((current, next)) if current == chunk => next,
                _ => self.chunk_offsets.get(chunk).copied().unwrap_or(0),
            };
            fill = Some((chunk, offset.saturating_add(u64::from(size))));

            samples.push(SampleEntry {
                index: index as u32,
                offset,
                size,
                dts,
                duration,
            });
            dts = dts.saturating_add(u64::from(duration));
        }

        SampleTable {
            timescale,
            sample_count,
            samples,
        }
    }

    fn sample_size(&self, index: usize) -> u32 {
        match self.uniform_size {
            0 => self.sample_sizes.get(index).copied().unwrap_or(0),
            size => size,
        }
    }

    /// 0-based chunk of each successive sample, following the stsc runs.
    ///
    /// Never ends: once the runs are used up the last chunk repeats, and
    /// without stsc every sample is in chunk 0.
    fn chunk_indices(&self) -> impl Iterator<Item = usize> + '_ {
        let runs = &self.stsc_entries;
        let past_last = (self.chunk_offsets.len() as u32).saturating_add(1);

        let mut mapped = runs.iter().enumerate().flat_map(move |(i, &(first, per_chunk))| {
            let next = runs.get(i + 1).map_or(past_last, |&(n, _)| n.min(past_last));
            (first.max(1)..next)
                .flat_map(move |chunk| std::iter::repeat((chunk - 1) as usize).take(per_chunk as usize))
        });

        let mut last = 0;
        std::iter::from_fn(move || {
            if let Some(chunk) = mapped.next() {
                last = chunk;
            }
            Some(last)
        })
    }
}

impl Default for SampleTableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Entry count of a full-atom table, capped by how many entries of
/// `entry_size` bytes actually fit in the atom.
fn table_entries(source: ByteSource<'_>, atom: &Atom, header: usize, entry_size: usize) -> Result<(usize, usize)> {
    let base = atom.data_offset();
    if atom.data_size() < header {
        return Err(Error::invalid_mp4(format!(
            "{} too small: {} bytes",
            atom.atom_type,
            atom.data_size()
        )));
    }
    let declared = source.read_u32(base + header - 4)? as usize;
    let fits = (atom.data_size() - header) / entry_size;
    Ok((base + header, declared.min(fits)))
}

/// Parse stts (decoding time to sample) into `(count, delta)` runs.
pub fn parse_stts(source: ByteSource<'_>, atom: &Atom) -> Result<Vec<(u32, u32)>> {
    let (start, count) = table_entries(source, atom, 8, 8)?;
    (0..count)
        .map(|i| {
            let offset = start + i * 8;
            Ok((source.read_u32(offset)?, source.read_u32(offset + 4)?))
        })
        .collect()
}

/// Parse stsc (sample to chunk) into `(first_chunk, samples_per_chunk)` runs.
pub fn parse_stsc(source: ByteSource<'_>, atom: &Atom) -> Result<Vec<(u32, u32)>> {
    let (start, count) = table_entries(source, atom, 8, 12)?;
    (0..count)
        .map(|i| {
            let offset = start + i * 12;
            Ok((source.read_u32(offset)?, source.read_u32(offset + 4)?))
        })
        .collect()
}

/// Parse stsz (sample size), reading at most `limit` per-sample sizes.
pub fn parse_stsz(source: ByteSource<'_>, atom: &Atom, limit: usize) -> Result<(u32, Vec<u32>)> {
    let (start, count) = table_entries(source, atom, 12, 4)?;
    let uniform_size = source.read_u32(atom.data_offset() + 4)?;
    if uniform_size > 0 {
        return Ok((uniform_size, Vec::new()));
    }
    let sizes = (0..count.min(limit))
        .map(|i| source.read_u32(start + i * 4))
        .collect::<Result<_>>()?;
    Ok((0, sizes))
}

/// Parse stco (chunk offset, 32-bit).
pub fn parse_stco(source: ByteSource<'_>, atom: &Atom) -> Result<Vec<u64>> {
    let (start, count) = table_entries(source, atom, 8, 4)?;
    (0..count)
        .map(|i| source.read_u32(start + i * 4).map(u64::from))
        .collect()
}

/// Parse co64 (chunk offset, 64-bit).
pub fn parse_co64(source: ByteSource<'_>, atom: &Atom) -> Result<Vec<u64>> {
    let (start, count) = table_entries(source, atom, 8, 8)?;
    (0..count).map(|i| source.read_u64(start + i * 8)).collect()
}
