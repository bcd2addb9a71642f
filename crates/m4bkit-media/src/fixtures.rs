//! Synthetic MP4 builders for tests and benchmarks.
//!
//! Produces small but structurally faithful M4B buffers: `ftyp`, an `mdat`
//! holding timed-text samples, and a `moov` with any combination of movie
//! header, audio track, text chapter track, `chpl` and iTunes tags.

/// Build a plain atom.
pub fn atom(atom_type: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + payload.len());
    out.extend_from_slice(&(8 + payload.len() as u32).to_be_bytes());
    out.extend_from_slice(atom_type);
    out.extend_from_slice(payload);
    out
}

/// Build a full atom (version + 24-bit flags before the payload).
pub fn full_atom(atom_type: &[u8; 4], version: u8, flags: u32, payload: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(4 + payload.len());
    body.push(version);
    body.extend_from_slice(&flags.to_be_bytes()[1..]);
    body.extend_from_slice(payload);
    atom(atom_type, &body)
}

/// Build an `mvhd` (version 0 or 1).
pub fn mvhd(version: u8, timescale: u32, duration: u64) -> Vec<u8> {
    let mut p = Vec::new();
    if version == 1 {
        p.extend_from_slice(&0u64.to_be_bytes()); // creation
        p.extend_from_slice(&0u64.to_be_bytes()); // modification
        p.extend_from_slice(&timescale.to_be_bytes());
        p.extend_from_slice(&duration.to_be_bytes());
    } else {
        p.extend_from_slice(&0u32.to_be_bytes());
        p.extend_from_slice(&0u32.to_be_bytes());
        p.extend_from_slice(&timescale.to_be_bytes());
        p.extend_from_slice(&(duration as u32).to_be_bytes());
    }
    // rate, volume, reserved, matrix, pre_defined, next_track_ID
    p.extend_from_slice(&[0; 80]);
    full_atom(b"mvhd", version, 0, &p)
}

/// Build an `mdhd` (version 0 or 1).
pub fn mdhd(version: u8, timescale: u32, duration: u64) -> Vec<u8> {
    let mut p = Vec::new();
    if version == 1 {
        p.extend_from_slice(&0u64.to_be_bytes());
        p.extend_from_slice(&0u64.to_be_bytes());
        p.extend_from_slice(&timescale.to_be_bytes());
        p.extend_from_slice(&duration.to_be_bytes());
    } else {
        p.extend_from_slice(&0u32.to_be_bytes());
        p.extend_from_slice(&0u32.to_be_bytes());
        p.extend_from_slice(&timescale.to_be_bytes());
        p.extend_from_slice(&(duration as u32).to_be_bytes());
    }
    p.extend_from_slice(&[0x55, 0xC4, 0, 0]); // language "und", quality
    full_atom(b"mdhd", version, 0, &p)
}

/// Build a `chpl` from `(100ns ticks, title)` pairs.
pub fn chpl(entries: &[(u64, &str)]) -> Vec<u8> {
    chpl_with_count(entries.len() as u32, entries)
}

/// Build a `chpl` whose declared entry count may disagree with `entries`.
pub fn chpl_with_count(count: u32, entries: &[(u64, &str)]) -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(&0u32.to_be_bytes()); // reserved
    p.extend_from_slice(&count.to_be_bytes());
    for (ticks, title) in entries {
        p.extend_from_slice(&ticks.to_be_bytes());
        p.push(title.len() as u8);
        p.extend_from_slice(title.as_bytes());
    }
    full_atom(b"chpl", 1, 0, &p)
}

/// Build a `data` atom with the given well-known type code.
pub fn data_atom(type_code: u32, value: &[u8]) -> Vec<u8> {
    let mut p = Vec::with_capacity(8 + value.len());
    p.extend_from_slice(&type_code.to_be_bytes());
    p.extend_from_slice(&0u32.to_be_bytes()); // locale
    p.extend_from_slice(value);
    atom(b"data", &p)
}

/// Build an `ilst` item such as `©nam` wrapping a `data` atom.
pub fn ilst_item(key: &[u8; 4], type_code: u32, value: &[u8]) -> Vec<u8> {
    atom(key, &data_atom(type_code, value))
}

/// Build `udta > meta > ilst` around already-encoded items.
pub fn udta_with_ilst(items: &[Vec<u8>]) -> Vec<u8> {
    atom(b"udta", &meta_with_ilst(items))
}

/// Build `meta > ilst`, including the `meta` version/flags word.
pub fn meta_with_ilst(items: &[Vec<u8>]) -> Vec<u8> {
    let mut body = full_atom(b"hdlr", 0, 0, &[0, 0, 0, 0, b'm', b'd', b'i', b'r', 0, 0, 0, 0, 0]);
    body.extend(atom(b"ilst", &items.concat()));
    full_atom(b"meta", 0, 0, &body)
}

fn stsd(format: &[u8; 4]) -> Vec<u8> {
    // SampleEntry: reserved(6) + data_reference_index(2)
    let entry = atom(format, &[0, 0, 0, 0, 0, 0, 0, 1]);
    let mut p = 1u32.to_be_bytes().to_vec();
    p.extend(entry);
    full_atom(b"stsd", 0, 0, &p)
}

fn stts(deltas: &[u32]) -> Vec<u8> {
    let mut runs: Vec<(u32, u32)> = Vec::new();
    for &delta in deltas {
        match runs.last_mut() {
            Some((count, d)) if *d == delta => *count += 1,
            _ => runs.push((1, delta)),
        }
    }
    let mut p = (runs.len() as u32).to_be_bytes().to_vec();
    for (count, delta) in runs {
        p.extend_from_slice(&count.to_be_bytes());
        p.extend_from_slice(&delta.to_be_bytes());
    }
    full_atom(b"stts", 0, 0, &p)
}

fn stsz(sizes: &[u32]) -> Vec<u8> {
    let mut p = 0u32.to_be_bytes().to_vec();
    p.extend_from_slice(&(sizes.len() as u32).to_be_bytes());
    for size in sizes {
        p.extend_from_slice(&size.to_be_bytes());
    }
    full_atom(b"stsz", 0, 0, &p)
}

fn stsc(samples_per_chunk: &[u32]) -> Vec<u8> {
    let mut runs: Vec<(u32, u32)> = Vec::new();
    for (i, &n) in samples_per_chunk.iter().enumerate() {
        if runs.last().map(|(_, last)| *last) != Some(n) {
            runs.push((i as u32 + 1, n));
        }
    }
    let mut p = (runs.len() as u32).to_be_bytes().to_vec();
    for (first_chunk, n) in runs {
        p.extend_from_slice(&first_chunk.to_be_bytes());
        p.extend_from_slice(&n.to_be_bytes());
        p.extend_from_slice(&1u32.to_be_bytes());
    }
    full_atom(b"stsc", 0, 0, &p)
}

fn chunk_offsets(offsets: &[u64], wide: bool) -> Vec<u8> {
    let mut p = (offsets.len() as u32).to_be_bytes().to_vec();
    for &offset in offsets {
        if wide {
            p.extend_from_slice(&offset.to_be_bytes());
        } else {
            p.extend_from_slice(&(offset as u32).to_be_bytes());
        }
    }
    if wide {
        full_atom(b"co64", 0, 0, &p)
    } else {
        full_atom(b"stco", 0, 0, &p)
    }
}

/// A timed-text chapter track.
#[derive(Debug, Clone)]
pub struct TextTrack {
    pub timescale: u32,
    pub mdhd_version: u8,
    pub format: [u8; 4],
    pub samples_per_chunk: u32,
    pub co64: bool,
    /// `(duration in track timescale, title)` per sample.
    pub samples: Vec<(u32, String)>,
}

impl TextTrack {
    pub fn new(timescale: u32) -> Self {
        Self {
            timescale,
            mdhd_version: 0,
            format: *b"tx3g",
            samples_per_chunk: 1,
            co64: false,
            samples: Vec::new(),
        }
    }

    pub fn sample(mut self, duration: u32, title: &str) -> Self {
        self.samples.push((duration, title.to_string()));
        self
    }

    /// Encoded text samples (`u16` length + UTF-8).
    fn payloads(&self) -> Vec<Vec<u8>> {
        self.samples
            .iter()
            .map(|(_, title)| {
                let mut s = (title.len() as u16).to_be_bytes().to_vec();
                s.extend_from_slice(title.as_bytes());
                s
            })
            .collect()
    }

    fn build(&self, sample_offsets: &[u64]) -> Vec<u8> {
        let payloads = self.payloads();
        let spc = self.samples_per_chunk.max(1) as usize;
        let per_chunk: Vec<u32> = payloads.chunks(spc).map(|c| c.len() as u32).collect();
        let offsets: Vec<u64> = sample_offsets.iter().step_by(spc).copied().collect();
        let deltas: Vec<u32> = self.samples.iter().map(|(d, _)| *d).collect();
        let sizes: Vec<u32> = payloads.iter().map(|p| p.len() as u32).collect();
        let total: u64 = deltas.iter().map(|&d| d as u64).sum();

        let mut stbl = stsd(&self.format);
        stbl.extend(stts(&deltas));
        stbl.extend(stsc(&per_chunk));
        stbl.extend(stsz(&sizes));
        stbl.extend(chunk_offsets(&offsets, self.co64));

        let minf = atom(b"minf", &atom(b"stbl", &stbl));
        let mut mdia = mdhd(self.mdhd_version, self.timescale, total);
        mdia.extend(minf);
        atom(b"trak", &atom(b"mdia", &mdia))
    }
}

/// Assembles a complete synthetic M4B file.
#[derive(Debug, Clone, Default)]
pub struct M4bBuilder {
    movie_header: Option<Vec<u8>>,
    audio_track: bool,
    tableless_text_track: bool,
    text_track: Option<TextTrack>,
    chpl: Option<Vec<u8>>,
    tags: Vec<Vec<u8>>,
}

impl M4bBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Version 0 `mvhd`.
    pub fn duration(mut self, timescale: u32, duration: u32) -> Self {
        self.movie_header = Some(mvhd(0, timescale, duration as u64));
        self
    }

    /// Version 1 `mvhd`.
    pub fn duration_v1(mut self, timescale: u32, duration: u64) -> Self {
        self.movie_header = Some(mvhd(1, timescale, duration));
        self
    }

    /// Include an AAC audio track ahead of any text track.
    pub fn audio_track(mut self) -> Self {
        self.audio_track = true;
        self
    }

    /// Include a `tx3g` track with no sample tables, ahead of any usable
    /// text track.
    pub fn tableless_text_track(mut self) -> Self {
        self.tableless_text_track = true;
        self
    }

    pub fn text_track(mut self, track: TextTrack) -> Self {
        self.text_track = Some(track);
        self
    }

    /// `chpl` from `(100ns ticks, title)` pairs.
    pub fn chapters(mut self, entries: &[(u64, &str)]) -> Self {
        self.chpl = Some(chpl(entries));
        self
    }

    /// Raw `chpl` atom bytes.
    pub fn chpl_atom(mut self, raw: Vec<u8>) -> Self {
        self.chpl = Some(raw);
        self
    }

    /// UTF-8 text tag.
    pub fn text_tag(self, key: &[u8; 4], value: &str) -> Self {
        self.raw_tag(ilst_item(key, 1, value.as_bytes()))
    }

    /// Encoded `ilst` item.
    pub fn raw_tag(mut self, item: Vec<u8>) -> Self {
        self.tags.push(item);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = atom(b"ftyp", b"M4B \0\0\x02\0isomM4B mp42");

        // mdat comes first so chunk offsets are known before moov is written.
        let mut sample_offsets = Vec::new();
        let mut mdat_payload = vec![0xFF; 16]; // stand-in audio
        if let Some(track) = &self.text_track {
            let base = out.len() + 8;
            for payload in track.payloads() {
                sample_offsets.push((base + mdat_payload.len()) as u64);
                mdat_payload.extend(payload);
            }
        }
        out.extend(atom(b"mdat", &mdat_payload));

        let mut moov = self.movie_header.clone().unwrap_or_default();
        if self.audio_track {
            let mut stbl = stsd(b"mp4a");
            stbl.extend(stts(&[1024]));
            stbl.extend(stsc(&[1]));
            stbl.extend(stsz(&[16]));
            stbl.extend(chunk_offsets(&[36], false));
            let mut mdia = mdhd(0, 44100, 1024);
            mdia.extend(atom(b"minf", &atom(b"stbl", &stbl)));
            moov.extend(atom(b"trak", &atom(b"mdia", &mdia)));
        }
        if self.tableless_text_track {
            let mut mdia = mdhd(0, 1000, 0);
            mdia.extend(atom(b"minf", &atom(b"stbl", &stsd(b"tx3g"))));
            moov.extend(atom(b"trak", &atom(b"mdia", &mdia)));
        }
        if let Some(track) = &self.text_track {
            moov.extend(track.build(&sample_offsets));
        }
        if self.chpl.is_some() || !self.tags.is_empty() {
            let mut udta = self.chpl.clone().unwrap_or_default();
            if !self.tags.is_empty() {
                udta.extend(meta_with_ilst(&self.tags));
            }
            moov.extend(atom(b"udta", &udta));
        }
        out.extend(atom(b"moov", &moov));
        out
    }
}
