//! Probe reports: what an extraction found, shaped for printing.

use anyhow::{Context, Result};
use m4bkit_media::{ChapterSource, ExtractOptions, Extraction, Extractor};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Extract metadata and chapters from a file on disk
pub fn probe_file(path: &Path, options: &ExtractOptions) -> Result<Extraction> {
    if !path.exists() {
        anyhow::bail!("File does not exist: {:?}", path);
    }

    Extractor::with_options(options.clone())
        .extract_file(path)
        .with_context(|| format!("Failed to read {:?}", path))
}

/// Format seconds as `M:SS`, or `H:MM:SS` from one hour up.
pub fn format_time(secs: f64) -> String {
    if !secs.is_finite() || secs <= 0.0 {
        return "0:00".to_string();
    }

    let total = secs.floor() as u64;
    let hours = total / 3600;
    let mins = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{}:{:02}", mins, secs)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub file: PathBuf,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub album_artist: Option<String>,
    pub duration_secs: f64,
    pub duration: String,
    pub cover: Option<CoverReport>,
    pub chapter_source: ChapterSource,
    pub chapters: Vec<ChapterReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CoverReport {
    pub mime_type: &'static str,
    pub size: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChapterReport {
    pub index: usize,
    pub title: String,
    pub start_secs: f64,
    pub duration_secs: Option<f64>,
    pub start: String,
}

impl ProbeReport {
    pub fn new(file: &Path, extraction: &Extraction) -> Self {
        let meta = &extraction.metadata;
        Self {
            file: file.to_path_buf(),
            title: meta.title.clone(),
            artist: meta.display_artist().map(str::to_string),
            album: meta.album.clone(),
            album_artist: meta.album_artist.clone(),
            duration_secs: meta.duration_secs,
            duration: format_time(meta.duration_secs),
            cover: meta.cover.as_ref().map(|c| CoverReport {
                mime_type: c.format.mime_type(),
                size: c.len(),
            }),
            chapter_source: extraction.source,
            chapters: extraction
                .chapters
                .iter()
                .enumerate()
                .map(|(i, c)| ChapterReport {
                    index: i + 1,
                    title: c.title.clone(),
                    start_secs: c.start_secs,
                    duration_secs: c.duration_secs,
                    start: format_time(c.start_secs),
                })
                .collect(),
        }
    }

    /// Human-readable summary followed by the chapter table
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let or_dash = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());

        let _ = writeln!(out, "File: {}", self.file.display());
        let _ = writeln!(out, "Title: {}", or_dash(&self.title));
        let _ = writeln!(out, "Artist: {}", or_dash(&self.artist));
        let _ = writeln!(out, "Album: {}", or_dash(&self.album));
        let _ = writeln!(out, "Duration: {}", self.duration);
        match &self.cover {
            Some(cover) => {
                let _ = writeln!(out, "Cover: {} ({} bytes)", cover.mime_type, cover.size);
            }
            None => {
                let _ = writeln!(out, "Cover: none");
            }
        }

        let _ = writeln!(
            out,
            "\nChapters: {} ({})",
            self.chapters.len(),
            self.chapter_source
        );
        out.push_str(&self.render_chapters());
        out
    }

    /// One `start  duration  title` line per chapter
    pub fn render_chapters(&self) -> String {
        let mut out = String::new();
        for chapter in &self.chapters {
            let duration = chapter
                .duration_secs
                .map(format_time)
                .unwrap_or_else(|| "?".to_string());
            let _ = writeln!(
                out,
                "  [{:>3}] {:>9}  {:>9}  {}",
                chapter.index, chapter.start, duration, chapter.title
            );
        }
        out
    }
}
