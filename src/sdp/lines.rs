use std::ops::Index;

pub const CRLF: &str = "\r\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanDirection {
    #[default]
    Ascending,
    Descending,
}

/// An SDP body split on CRLF. Bodies using bare `\n` stay a single line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SdpLines {
    lines: Vec<String>,
}

impl SdpLines {
    pub fn parse(sdp: &str) -> Self {
        Self {
            lines: sdp.split(CRLF).map(|line| line.to_string()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(|line| line.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(|line| line.as_str())
    }

    pub fn replace(&mut self, index: usize, line: String) {
        if let Some(slot) = self.lines.get_mut(index) {
            *slot = line;
        }
    }

    pub fn insert(&mut self, index: usize, line: String) {
        let index = index.min(self.lines.len());
        self.lines.insert(index, line);
    }

    pub fn remove(&mut self, index: usize) -> Option<String> {
        if index < self.lines.len() {
            Some(self.lines.remove(index))
        } else {
            None
        }
    }

    /// First line starting with `prefix` that also contains `substr`, ignoring case.
    pub fn find(&self, prefix: &str, substr: Option<&str>) -> Option<usize> {
        self.find_in_range(Some(0), None, prefix, substr, ScanDirection::Ascending)
    }

    /// Searches a sub-range of the body.
    ///
    /// Ascending scans `[start, end)` where a missing `start` is the first line and
    /// a missing `end` is the body length. Descending scans from `start` (or the
    /// last line) down to `end` (or the first line), both inclusive.
    pub fn find_in_range(
        &self,
        start: Option<usize>,
        end: Option<usize>,
        prefix: &str,
        substr: Option<&str>,
        direction: ScanDirection,
    ) -> Option<usize> {
        if self.lines.is_empty() {
            return None;
        }
        let needle = substr.map(|s| s.to_lowercase());
        let matches = |index: &usize| {
            let line = &self.lines[*index];
            line_matches(line, prefix, needle.as_deref())
        };
        match direction {
            ScanDirection::Ascending => {
                let end = end.unwrap_or(self.lines.len()).min(self.lines.len());
                let start = start.unwrap_or(0);
                (start..end).find(matches)
            }
            ScanDirection::Descending => {
                let last = self.lines.len() - 1;
                let start = start.unwrap_or(last).min(last);
                let end = end.unwrap_or(0);
                if end > start {
                    return None;
                }
                (end..=start).rev().find(matches)
            }
        }
    }
}

fn line_matches(line: &str, prefix: &str, lowered_substr: Option<&str>) -> bool {
    if !line.starts_with(prefix) {
        return false;
    }
    match lowered_substr {
        Some(substr) => line.to_lowercase().contains(substr),
        None => true,
    }
}

impl Index<usize> for SdpLines {
    type Output = str;

    fn index(&self, index: usize) -> &Self::Output {
        &self.lines[index]
    }
}

impl std::fmt::Display for SdpLines {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.lines.join(CRLF))
    }
}

impl From<SdpLines> for String {
    fn from(lines: SdpLines) -> Self {
        lines.lines.join(CRLF)
    }
}
