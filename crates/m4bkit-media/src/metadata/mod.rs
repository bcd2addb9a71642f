//! Movie-level metadata: duration, iTunes tags and cover art.

mod ilst;

pub use ilst::{decode_data, parse_ilst, read_tags, TagItem, TagKey, TagValue};

use bytes::Bytes;

/// Embedded cover image format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialize", serde(rename_all = "lowercase"))]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mime_type())
    }
}

/// Cover art copied out of the `covr` item.
///
/// The bytes are owned by whoever holds the [`MovieMetadata`]; nothing else
/// references them, so dropping the metadata releases the image.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct CoverArt {
    pub format: ImageFormat,
    #[cfg_attr(feature = "serialize", serde(skip))]
    pub data: Bytes,
}

impl CoverArt {
    /// Image size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Metadata extracted from one file.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct MovieMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub album_artist: Option<String>,
    pub cover: Option<CoverArt>,
    /// Total duration in seconds, 0 when unknown.
    pub duration_secs: f64,
}

impl MovieMetadata {
    /// Artist, falling back to the album artist.
    pub fn display_artist(&self) -> Option<&str> {
        self.artist.as_deref().or(self.album_artist.as_deref())
    }

    /// Store a decoded tag in its field; values of the wrong kind are dropped.
    pub fn apply(&mut self, item: TagItem) {
        match (item.key, item.value) {
            (TagKey::Title, TagValue::Text(s)) => self.title = Some(s),
            (TagKey::Artist, TagValue::Text(s)) => self.artist = Some(s),
            (TagKey::Album, TagValue::Text(s)) => self.album = Some(s),
            (TagKey::AlbumArtist, TagValue::Text(s)) => self.album_artist = Some(s),
            (TagKey::Cover, TagValue::Image(cover)) => self.cover = Some(cover),
            (key, value) => {
                tracing::trace!(?key, ?value, "tag value of unexpected kind ignored");
            }
        }
    }
}
