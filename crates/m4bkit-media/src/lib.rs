//! M4bkit-Media: audiobook metadata and chapters from MP4/M4B containers
//!
//! This crate reads iTunes-style tags, cover art, movie duration and chapter
//! markers out of an ISO-BMFF file held entirely in memory. Parsing is
//! read-only and bounded: box scans never read past the buffer, track and
//! sample iteration are capped, and malformed input degrades to "nothing
//! found" instead of an error.
//!
//! # Modules
//!
//! - `mp4` - Box scanning, movie/media headers, sample tables
//! - `metadata` - `udta > meta > ilst` tags and cover art
//! - `chapters` - `chpl` lists, timed-text chapter tracks, synthetic parts
//! - `extract` - The orchestrator tying the above together
//!
//! # Example
//!
//! ```no_run
//! use m4bkit_media::Extractor;
//!
//! let extraction = Extractor::new().extract_file("book.m4b")?;
//! for chapter in &extraction.chapters {
//!     println!("{:>8.1}  {}", chapter.start_secs, chapter.title);
//! }
//! # Ok::<(), m4bkit_media::Error>(())
//! ```
//!
//! Diagnostics are emitted through `tracing` and cost nothing unless the
//! host installs a subscriber.

pub mod chapters;
pub mod error;
pub mod extract;
pub mod metadata;
pub mod mp4;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

pub use chapters::{Chapter, ChapterSource};
pub use error::{Error, Result};
pub use extract::{ExtractOptions, Extraction, Extractor};
pub use metadata::{CoverArt, ImageFormat, MovieMetadata};
