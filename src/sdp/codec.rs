use super::lines::{ScanDirection, SdpLines};
use super::media::{media_line, media_range, MediaKind};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static RTPMAP_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"a=rtpmap:(\d+) ([a-zA-Z0-9-]+)/(\d+)").expect("rtpmap pattern compiles")
});

/// Number of leading fields on an `m=` line before the format list.
const MEDIA_LINE_PREFIX_FIELDS: usize = 3;

/// RTP payload type kept in its textual form so it round-trips unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PayloadType(String);

impl PayloadType {
    pub fn new(value: &str) -> Option<Self> {
        if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
            Some(Self(value.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PayloadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PayloadType {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpMap {
    pub payload_type: PayloadType,
    pub codec_name: String,
    pub clock_rate: String,
}

impl RtpMap {
    pub fn parse(line: &str) -> Option<Self> {
        let caps = RTPMAP_PATTERN.captures(line)?;
        Some(Self {
            payload_type: PayloadType::new(caps.get(1)?.as_str())?,
            codec_name: caps.get(2)?.as_str().to_string(),
            clock_rate: caps.get(3)?.as_str().to_string(),
        })
    }

    /// `name/rate`, the form accepted by the codec lookups.
    pub fn codec(&self) -> String {
        format!("{}/{}", self.codec_name, self.clock_rate)
    }
}

pub fn payload_type_from_line(line: &str) -> Option<PayloadType> {
    RtpMap::parse(line).map(|rtpmap| rtpmap.payload_type)
}

/// Payload type of the first `a=rtpmap` line mentioning `codec`.
pub fn payload_type_for_codec(lines: &SdpLines, codec: &str) -> Option<PayloadType> {
    let index = lines.find("a=rtpmap", Some(codec))?;
    payload_type_from_line(&lines[index])
}

pub fn rtpmap_line_for_payload_type(lines: &SdpLines, payload_type: &PayloadType) -> Option<usize> {
    lines.find(&format!("a=rtpmap:{} ", payload_type), None)
}

/// Codec name/rate bound to `payload_type`, e.g. `VP8/90000`.
pub fn codec_for_payload_type(lines: &SdpLines, payload_type: &PayloadType) -> Option<String> {
    let index = rtpmap_line_for_payload_type(lines, payload_type)?;
    RtpMap::parse(&lines[index]).map(|rtpmap| rtpmap.codec())
}

pub fn payload_types(media_line: &str) -> impl Iterator<Item = &str> {
    media_line.split(' ').skip(MEDIA_LINE_PREFIX_FIELDS)
}

pub fn first_payload_type(media_line: &str) -> Option<PayloadType> {
    payload_types(media_line).find_map(PayloadType::new)
}

/// Drops every occurrence of `payload_type` from the format list of an `m=` line.
pub fn remove_payload_type(media_line: &str, payload_type: &PayloadType) -> String {
    media_line
        .split(' ')
        .enumerate()
        .filter(|(i, field)| *i < MEDIA_LINE_PREFIX_FIELDS || *field != payload_type.as_str())
        .map(|(_, field)| field)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Moves `payload_type` to the head of the format list of an `m=` line.
pub fn set_default_codec(media_line: &str, payload_type: &PayloadType) -> String {
    let fields: Vec<&str> = media_line.split(' ').collect();
    let split = fields.len().min(MEDIA_LINE_PREFIX_FIELDS);
    let mut reordered: Vec<&str> = fields[..split].to_vec();
    reordered.push(payload_type.as_str());
    reordered.extend(
        fields[split..]
            .iter()
            .filter(|field| **field != payload_type.as_str()),
    );
    reordered.join(" ")
}

fn rtpmap_in_section(lines: &SdpLines, kind: MediaKind, prefix: &str, codec: Option<&str>) -> Option<usize> {
    let range = media_range(lines, kind)?;
    lines.find_in_range(
        Some(range.media_line + 1),
        Some(range.next_media_line),
        prefix,
        codec,
        ScanDirection::Ascending,
    )
}

fn remove_rtpmap_line(lines: &mut SdpLines, kind: MediaKind, index: usize) -> Option<PayloadType> {
    let payload_type = payload_type_from_line(&lines[index])?;
    lines.remove(index);
    if let Some(m_index) = media_line(lines, kind) {
        let updated = remove_payload_type(&lines[m_index], &payload_type);
        lines.replace(m_index, updated);
    }
    Some(payload_type)
}

/// Like [`payload_type_for_codec`] but limited to the `kind` media section.
pub fn payload_type_in_section(lines: &SdpLines, kind: MediaKind, codec: &str) -> Option<PayloadType> {
    let index = rtpmap_in_section(lines, kind, "a=rtpmap", Some(codec))?;
    payload_type_from_line(&lines[index])
}

/// Removes the first `a=rtpmap` of the `kind` section mentioning `codec` and
/// strips its payload type from the section's `m=` line. Returns the removed
/// payload type.
pub fn remove_codec_by_name(lines: &mut SdpLines, kind: MediaKind, codec: &str) -> Option<PayloadType> {
    let index = rtpmap_in_section(lines, kind, "a=rtpmap", Some(codec))?;
    remove_rtpmap_line(lines, kind, index)
}

/// Same as [`remove_codec_by_name`] but keyed on the exact payload type.
pub fn remove_codec_by_payload_type(
    lines: &mut SdpLines,
    kind: MediaKind,
    payload_type: &PayloadType,
) -> bool {
    let prefix = format!("a=rtpmap:{} ", payload_type);
    match rtpmap_in_section(lines, kind, &prefix, None) {
        Some(index) => remove_rtpmap_line(lines, kind, index).is_some(),
        None => false,
    }
}
