//! iTunes-style item list (`udta > meta > ilst`).
//!
//! Each item atom is keyed by its type (`©nam`, `covr`, ...) and wraps a
//! `data` atom: type code (4) + locale (4) + value.

use bytes::Bytes;
use tracing::{debug, trace};

use super::{CoverArt, ImageFormat};
use crate::mp4::{find_atom, Atom, AtomType, ByteSource};
use crate::{Error, Result};

/// Well-known `data` type codes.
const TYPE_IMPLICIT: u32 = 0;
const TYPE_UTF8: u32 = 1;
const TYPE_JPEG: u32 = 13;
const TYPE_PNG: u32 = 14;
const TYPE_BE_SIGNED: u32 = 21;

/// Header + type code + locale.
const DATA_ATOM_MIN_SIZE: usize = 16;

const COVR: AtomType = AtomType(*b"covr");

/// Tags this crate understands. Everything else is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKey {
    Title,
    Artist,
    Album,
    AlbumArtist,
    Cover,
}

impl TagKey {
    pub fn from_atom_type(atom_type: AtomType) -> Option<Self> {
        match &atom_type.0 {
            b"\xa9nam" => Some(Self::Title),
            b"\xa9ART" => Some(Self::Artist),
            b"\xa9alb" => Some(Self::Album),
            b"aART" => Some(Self::AlbumArtist),
            b"covr" => Some(Self::Cover),
            _ => None,
        }
    }
}

/// A decoded `data` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagValue {
    Text(String),
    Image(CoverArt),
    Signed(i64),
    Unsigned(u64),
}

/// One recognized item from `ilst`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagItem {
    pub key: TagKey,
    pub value: TagValue,
}

/// Decode a `data` atom belonging to the item `item_type`.
///
/// Returns `Ok(None)` for well-formed values this crate does not use: empty
/// text, images outside `covr`, integers of odd widths and unknown types.
pub fn decode_data(source: ByteSource<'_>, data: &Atom, item_type: AtomType) -> Result<Option<TagValue>> {
    if data.size < DATA_ATOM_MIN_SIZE || data.data_size() < 8 {
        return Err(Error::invalid_mp4(format!(
            "data atom for {item_type} too small: {} bytes",
            data.size
        )));
    }

    let type_code = source.read_u32(data.data_offset())?;
    let value_offset = data.data_offset() + 8;
    let value_len = data.data_size() - 8;

    let value = match (type_code, value_len) {
        (TYPE_UTF8, len) => {
            let text = source.read_text(value_offset, len)?;
            (!text.is_empty()).then_some(TagValue::Text(text))
        }
        (TYPE_JPEG | TYPE_PNG, len) if item_type == COVR && len > 0 => {
            let format = if type_code == TYPE_JPEG {
                ImageFormat::Jpeg
            } else {
                ImageFormat::Png
            };
            let bytes = source.slice(value_offset, len)?;
            Some(TagValue::Image(CoverArt {
                format,
                data: Bytes::copy_from_slice(bytes),
            }))
        }
        (TYPE_BE_SIGNED, 1) => Some(TagValue::Signed(source.read_u8(value_offset)? as i8 as i64)),
        (TYPE_BE_SIGNED, 2) => Some(TagValue::Signed(source.read_i16(value_offset)? as i64)),
        (TYPE_BE_SIGNED, 4) => Some(TagValue::Signed(source.read_i32(value_offset)? as i64)),
        (TYPE_IMPLICIT, 1) => Some(TagValue::Unsigned(source.read_u8(value_offset)? as u64)),
        (TYPE_IMPLICIT, 2) => Some(TagValue::Unsigned(source.read_u16(value_offset)? as u64)),
        (TYPE_IMPLICIT, 4) => Some(TagValue::Unsigned(source.read_u32(value_offset)? as u64)),
        _ => None,
    };

    Ok(value)
}

/// Decode every recognized item in an `ilst`.
///
/// A malformed item is logged and skipped; the scan continues with the
/// next sibling, even past an item whose size overruns the list.
pub fn parse_ilst(source: ByteSource<'_>, ilst: &Atom) -> Vec<TagItem> {
    let mut items = Vec::new();

    for item in ilst.children(source).skip_overruns() {
        let Some(key) = TagKey::from_atom_type(item.atom_type) else {
            trace!(item = %item.atom_type, "unrecognized tag discarded");
            continue;
        };
        let Some(data) = item.find_child(source, AtomType::DATA) else {
            debug!(item = %item.atom_type, "tag without data atom");
            continue;
        };

        match decode_data(source, &data, item.atom_type) {
            Ok(Some(value)) => items.push(TagItem { key, value }),
            Ok(None) => trace!(item = %item.atom_type, "tag value not used"),
            Err(e) => debug!(item = %item.atom_type, error = %e, "skipping malformed tag"),
        }
    }

    items
}

/// Locate `meta > ilst` under `udta` and decode it.
pub fn read_tags(source: ByteSource<'_>, udta: &Atom) -> Result<Vec<TagItem>> {
    let meta = udta
        .find_child(source, AtomType::META)
        .ok_or(Error::MissingAtom("meta"))?;

    // meta is a full atom: skip its version/flags word. QuickTime writers
    // omit it, so retry from the payload start.
    let ilst = find_atom(
        source,
        AtomType::ILST,
        meta.data_offset() + 4,
        meta.data_size().saturating_sub(4),
    )
    .or_else(|| meta.find_child(source, AtomType::ILST))
    .ok_or(Error::MissingAtom("ilst"))?;

    Ok(parse_ilst(source, &ilst))
}
