use super::codec::{payload_type_for_codec, payload_type_from_line, PayloadType};
use super::lines::SdpLines;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static FMTP_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"a=fmtp:(\d+)").expect("fmtp pattern compiles"));

/// Parsed `a=fmtp:<pt> key=value;key=value` line. Keys are unique and keep
/// the order in which they were first seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FmtpRecord {
    pub payload_type: PayloadType,
    params: Vec<(String, String)>,
}

impl FmtpRecord {
    pub fn new(payload_type: PayloadType) -> Self {
        Self {
            payload_type,
            params: Vec::new(),
        }
    }

    pub fn parse(line: &str) -> Option<Self> {
        let caps = FMTP_PATTERN.captures(line)?;
        let payload_type = PayloadType::new(caps.get(1)?.as_str())?;
        let values = line.split_once(' ').map(|(_, values)| values).unwrap_or("");
        let mut record = Self::new(payload_type);
        // values may carry '=' themselves, e.g. base64 sprop-parameter-sets
        for (key, value) in values.split(';').filter_map(|pair| pair.split_once('=')) {
            record.set(key, value);
        }
        Some(record)
    }

    /// `None` when there is nothing left to write, meaning the line should go.
    pub fn serialize(&self) -> Option<String> {
        if self.params.is_empty() {
            return None;
        }
        let values = self
            .params
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join(";");
        Some(format!("a=fmtp:{} {}", self.payload_type, values))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set(&mut self, key: &str, value: &str) {
        match self.params.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value.to_string(),
            None => self.params.push((key.to_string(), value.to_string())),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let pos = self.params.iter().position(|(k, _)| k == key)?;
        Some(self.params.remove(pos).1)
    }

    pub fn params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// Index of the `a=fmtp` line for exactly `payload_type`.
pub fn fmtp_line_for_payload_type(lines: &SdpLines, payload_type: &PayloadType) -> Option<usize> {
    let prefix = format!("a=fmtp:{}", payload_type);
    lines.iter().position(|line| {
        line.strip_prefix(&prefix)
            .map(|rest| rest.is_empty() || rest.starts_with(' '))
            .unwrap_or(false)
    })
}

pub fn find_fmtp_line(lines: &SdpLines, codec: &str) -> Option<usize> {
    let payload_type = payload_type_for_codec(lines, codec)?;
    fmtp_line_for_payload_type(lines, &payload_type)
}

/// Sets `param=value` on the fmtp line of `codec`, creating the line right
/// after the codec's rtpmap when there is none.
pub fn set_codec_param(sdp: &str, codec: &str, param: &str, value: &str) -> String {
    let mut lines = SdpLines::parse(sdp);

    match find_fmtp_line(&lines, codec) {
        Some(index) => {
            let Some(mut record) = FmtpRecord::parse(&lines[index]) else {
                return sdp.to_string();
            };
            record.set(param, value);
            if let Some(line) = record.serialize() {
                lines.replace(index, line);
            }
        }
        None => {
            let Some(index) = lines.find("a=rtpmap", Some(codec)) else {
                debug!("no rtpmap for {}, skip setting {}", codec, param);
                return sdp.to_string();
            };
            let Some(payload_type) = payload_type_from_line(&lines[index]) else {
                return sdp.to_string();
            };
            let mut record = FmtpRecord::new(payload_type);
            record.set(param, value);
            if let Some(line) = record.serialize() {
                lines.insert(index + 1, line);
            }
        }
    }
    lines.into()
}

/// Removes `param` from the fmtp line of `codec`; the line is dropped when it
/// has no params left.
pub fn remove_codec_param(sdp: &str, codec: &str, param: &str) -> String {
    let mut lines = SdpLines::parse(sdp);

    let Some(index) = find_fmtp_line(&lines, codec) else {
        return sdp.to_string();
    };
    let Some(mut record) = FmtpRecord::parse(&lines[index]) else {
        return sdp.to_string();
    };
    if record.remove(param).is_none() {
        return sdp.to_string();
    }
    match record.serialize() {
        Some(line) => lines.replace(index, line),
        None => {
            lines.remove(index);
        }
    }
    lines.into()
}
