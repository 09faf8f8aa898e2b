use super::lines::{ScanDirection, SdpLines};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Audio,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "audio" => Ok(MediaKind::Audio),
            "video" => Ok(MediaKind::Video),
            _ => Err(anyhow::anyhow!("unknown media kind: {}", s)),
        }
    }
}

/// Half-open line range `[media_line, next_media_line)` of one media section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaRange {
    pub media_line: usize,
    pub next_media_line: usize,
}

impl MediaRange {
    pub fn contains(&self, index: usize) -> bool {
        index >= self.media_line && index < self.next_media_line
    }
}

pub fn media_line(lines: &SdpLines, kind: MediaKind) -> Option<usize> {
    lines.find("m=", Some(kind.as_str()))
}

pub fn media_range(lines: &SdpLines, kind: MediaKind) -> Option<MediaRange> {
    let media_line = media_line(lines, kind)?;
    let next_media_line = lines
        .find_in_range(
            Some(media_line + 1),
            None,
            "m=",
            None,
            ScanDirection::Ascending,
        )
        .unwrap_or(lines.len());
    Some(MediaRange {
        media_line,
        next_media_line,
    })
}

pub fn connection_line(lines: &SdpLines, range: &MediaRange) -> Option<usize> {
    lines.find_in_range(
        Some(range.media_line + 1),
        Some(range.next_media_line),
        "c=",
        None,
        ScanDirection::Ascending,
    )
}
