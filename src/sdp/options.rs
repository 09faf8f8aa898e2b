use clap::Args;
use serde::{Deserialize, Serialize};

/// Caller-supplied negotiation preferences. Every field is optional and an
/// absent value leaves the SDP untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Args)]
#[serde(rename_all = "camelCase")]
pub struct NegotiationOptions {
    /// "true" forces stereo Opus, "false" clears it
    #[arg(long)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opus_stereo: Option<String>,
    /// "true" enables Opus in-band FEC, "false" clears it
    #[arg(long)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opus_fec: Option<String>,
    /// "true" enables Opus DTX, "false" clears it
    #[arg(long)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opus_dtx: Option<String>,
    /// Opus maxplaybackrate, set verbatim
    #[arg(long)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opus_max_pbr: Option<String>,
    #[arg(long)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_send_bitrate: Option<String>,
    #[arg(long)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_recv_bitrate: Option<String>,
    #[arg(long)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_send_bitrate: Option<String>,
    #[arg(long)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_recv_bitrate: Option<String>,
    #[arg(long)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_send_initial_bitrate: Option<String>,
    /// codec as name/rate, e.g. VP9/90000
    #[arg(long)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_send_codec: Option<String>,
    #[arg(long)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_send_codec: Option<String>,
    #[arg(long)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_recv_codec: Option<String>,
    #[arg(long)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_recv_codec: Option<String>,
    /// "false" strips red/ulpfec from the video section
    #[arg(long)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_fec: Option<String>,
}

impl NegotiationOptions {
    /// Options the signaling client applies when nothing else is configured.
    pub fn stereo_opus() -> Self {
        Self {
            opus_stereo: Some("true".to_string()),
            ..Default::default()
        }
    }

    /// Right-biased merge: any value present in `other` wins.
    pub fn merge(self, other: NegotiationOptions) -> Self {
        Self {
            opus_stereo: other.opus_stereo.or(self.opus_stereo),
            opus_fec: other.opus_fec.or(self.opus_fec),
            opus_dtx: other.opus_dtx.or(self.opus_dtx),
            opus_max_pbr: other.opus_max_pbr.or(self.opus_max_pbr),
            audio_send_bitrate: other.audio_send_bitrate.or(self.audio_send_bitrate),
            audio_recv_bitrate: other.audio_recv_bitrate.or(self.audio_recv_bitrate),
            video_send_bitrate: other.video_send_bitrate.or(self.video_send_bitrate),
            video_recv_bitrate: other.video_recv_bitrate.or(self.video_recv_bitrate),
            video_send_initial_bitrate: other
                .video_send_initial_bitrate
                .or(self.video_send_initial_bitrate),
            video_send_codec: other.video_send_codec.or(self.video_send_codec),
            audio_send_codec: other.audio_send_codec.or(self.audio_send_codec),
            audio_recv_codec: other.audio_recv_codec.or(self.audio_recv_codec),
            video_recv_codec: other.video_recv_codec.or(self.video_recv_codec),
            video_fec: other.video_fec.or(self.video_fec),
        }
    }
}

/// Reads a `"true"`/`"false"` flag; any other value means "leave alone".
pub fn toggle(value: Option<&str>) -> Option<bool> {
    match value {
        Some("true") => Some(true),
        Some("false") => Some(false),
        _ => None,
    }
}

/// Leading decimal digits of `value`, ignoring surrounding whitespace.
/// Zero and unparsable values count as unset.
pub fn parse_kbps(value: Option<&str>) -> Option<u32> {
    let value = value?.trim();
    let digits: String = value.chars().take_while(|c| c.is_ascii_digit()).collect();
    match digits.parse::<u32>() {
        Ok(0) | Err(_) => None,
        Ok(kbps) => Some(kbps),
    }
}
