use super::codec::{
    codec_for_payload_type, first_payload_type, payload_type_from_line, payload_type_in_section,
    remove_codec_by_name, remove_codec_by_payload_type, set_default_codec, PayloadType,
};
use super::fmtp::{fmtp_line_for_payload_type, remove_codec_param, set_codec_param};
use super::lines::{ScanDirection, SdpLines};
use super::media::{connection_line, media_line, media_range, MediaKind};
use super::options::{parse_kbps, toggle, NegotiationOptions};
use serde_json::{Map, Value};
use std::fmt;
use tracing::{debug, info};

pub const OPUS: &str = "opus/48000";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecDirection {
    Send,
    Receive,
}

impl fmt::Display for CodecDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecDirection::Send => f.write_str("send"),
            CodecDirection::Receive => f.write_str("receive"),
        }
    }
}

fn toggle_opus_param(sdp: String, flag: Option<&str>, param: &str) -> String {
    match toggle(flag) {
        Some(true) => set_codec_param(&sdp, OPUS, param, "1"),
        Some(false) => remove_codec_param(&sdp, OPUS, param),
        None => sdp,
    }
}

/// Applies the stereo, in-band FEC, DTX and maxplaybackrate options to Opus.
pub fn set_opus_options(sdp: &str, options: &NegotiationOptions) -> String {
    let mut sdp = sdp.to_string();
    sdp = toggle_opus_param(sdp, options.opus_stereo.as_deref(), "stereo");
    sdp = toggle_opus_param(sdp, options.opus_fec.as_deref(), "useinbandfec");
    sdp = toggle_opus_param(sdp, options.opus_dtx.as_deref(), "usedtx");
    if let Some(max_pbr) = options.opus_max_pbr.as_deref().filter(|v| !v.is_empty()) {
        sdp = set_codec_param(&sdp, OPUS, "maxplaybackrate", max_pbr);
    }
    sdp
}

/// Puts a `b=AS:<kbps>` line right after the `c=` line of the `kind` section,
/// replacing any existing one there.
pub fn prefer_bitrate(sdp: &str, kbps: u32, kind: MediaKind) -> String {
    let mut lines = SdpLines::parse(sdp);

    let Some(range) = media_range(&lines, kind) else {
        debug!("no m={} line, skip bandwidth line", kind);
        return sdp.to_string();
    };
    let Some(c_line) = connection_line(&lines, &range) else {
        debug!("no c= line for m={}, skip bandwidth line", kind);
        return sdp.to_string();
    };

    if let Some(b_line) = lines.find_in_range(
        Some(c_line + 1),
        Some(range.next_media_line),
        "b=AS",
        None,
        ScanDirection::Ascending,
    ) {
        lines.remove(b_line);
    }

    // RFC 4566: b= follows c=
    lines.insert(c_line + 1, format!("b=AS:{}", kbps));
    lines.into()
}

fn maybe_prefer_bitrate(sdp: &str, value: Option<&str>, kind: MediaKind, dir: CodecDirection) -> String {
    let Some(kbps) = parse_kbps(value) else {
        return sdp.to_string();
    };
    debug!("prefer {} {} bitrate: {}", kind, dir, kbps);
    prefer_bitrate(sdp, kbps, kind)
}

pub fn maybe_set_audio_send_bitrate(sdp: &str, options: &NegotiationOptions) -> String {
    maybe_prefer_bitrate(
        sdp,
        options.audio_send_bitrate.as_deref(),
        MediaKind::Audio,
        CodecDirection::Send,
    )
}

pub fn maybe_set_audio_receive_bitrate(sdp: &str, options: &NegotiationOptions) -> String {
    maybe_prefer_bitrate(
        sdp,
        options.audio_recv_bitrate.as_deref(),
        MediaKind::Audio,
        CodecDirection::Receive,
    )
}

pub fn maybe_set_video_send_bitrate(sdp: &str, options: &NegotiationOptions) -> String {
    maybe_prefer_bitrate(
        sdp,
        options.video_send_bitrate.as_deref(),
        MediaKind::Video,
        CodecDirection::Send,
    )
}

pub fn maybe_set_video_receive_bitrate(sdp: &str, options: &NegotiationOptions) -> String {
    maybe_prefer_bitrate(
        sdp,
        options.video_recv_bitrate.as_deref(),
        MediaKind::Video,
        CodecDirection::Receive,
    )
}

/// Sets `x-google-min-bitrate`/`x-google-max-bitrate` on the video send codec.
///
/// `initial_kbps` is clamped to `max_kbps` when it exceeds it; without a max the
/// initial value is used for both bounds. The codec defaults to the first
/// payload type on the video `m=` line. Returns the new body and the clamped
/// initial bitrate.
pub fn set_video_send_initial_bitrate(
    sdp: &str,
    initial_kbps: u32,
    max_kbps: Option<u32>,
    codec: Option<&str>,
) -> (String, u32) {
    let mut initial = initial_kbps;
    let mut max = initial_kbps;
    if let Some(cap) = max_kbps {
        if initial > cap {
            debug!("clamping initial bitrate to max bitrate of {} kbps", cap);
            initial = cap;
        }
        max = cap;
    }

    let lines = SdpLines::parse(sdp);
    let Some(index) = media_line(&lines, MediaKind::Video) else {
        debug!("no m=video line, skip initial bitrate");
        return (sdp.to_string(), initial);
    };

    let codec = match codec {
        Some(codec) => codec.to_string(),
        None => {
            let resolved = first_payload_type(&lines[index])
                .and_then(|pt| codec_for_payload_type(&lines, &pt));
            match resolved {
                Some(codec) => codec,
                None => {
                    debug!("no rtpmap for the first video payload type");
                    return (sdp.to_string(), initial);
                }
            }
        }
    };

    let sdp = set_codec_param(sdp, &codec, "x-google-min-bitrate", &initial.to_string());
    let sdp = set_codec_param(&sdp, &codec, "x-google-max-bitrate", &max.to_string());
    (sdp, initial)
}

/// Applies `videoSendInitialBitrate`, writing the clamped value back into `options`.
pub fn maybe_set_video_send_initial_bitrate(sdp: &str, options: &mut NegotiationOptions) -> String {
    let Some(initial) = parse_kbps(options.video_send_initial_bitrate.as_deref()) else {
        return sdp.to_string();
    };
    let max = parse_kbps(options.video_send_bitrate.as_deref());
    let (sdp, clamped) = set_video_send_initial_bitrate(
        sdp,
        initial,
        max,
        options.video_send_codec.as_deref(),
    );
    if clamped != initial {
        options.video_send_initial_bitrate = Some(clamped.to_string());
    }
    sdp
}

/// Payload type referenced by a red fmtp line, `a=fmtp:<red> <pt>` or
/// `a=fmtp:<red> <pt>/<pt>`.
fn associated_payload_type(fmtp_line: &str) -> Option<PayloadType> {
    let (_, value) = fmtp_line.split_once(' ')?;
    let token = value.split(['/', ';', ' ']).next()?;
    PayloadType::new(token)
}

/// Strips red, ulpfec and red's associated payload type from the video section.
/// Without an `a=fmtp:<red>` line naming the associated payload type the input
/// comes back unchanged.
pub fn remove_video_fec(sdp: &str) -> String {
    let mut lines = SdpLines::parse(sdp);

    let Some(red) = payload_type_in_section(&lines, MediaKind::Video, "red") else {
        return sdp.to_string();
    };
    remove_codec_by_payload_type(&mut lines, MediaKind::Video, &red);
    if let Some(ulpfec) = remove_codec_by_name(&mut lines, MediaKind::Video, "ulpfec") {
        debug!("removed ulpfec payload type {}", ulpfec);
    }

    let Some(index) = fmtp_line_for_payload_type(&lines, &red) else {
        debug!("no fmtp line for red payload type {}", red);
        return sdp.to_string();
    };
    let Some(associated) = associated_payload_type(&lines[index]) else {
        return sdp.to_string();
    };
    lines.remove(index);
    remove_codec_by_payload_type(&mut lines, MediaKind::Video, &associated);
    lines.into()
}

pub fn maybe_remove_video_fec(sdp: &str, options: &NegotiationOptions) -> String {
    if toggle(options.video_fec.as_deref()) != Some(false) {
        return sdp.to_string();
    }
    info!("removing video fec");
    remove_video_fec(sdp)
}

/// Promotes `codec` (`name/rate`) to the first payload type of the `kind` section.
///
/// `a=rtpmap` lines are walked from the bottom of the body up: each search
/// resumes just above the previous match and the walk ends on the first search
/// that comes back empty. With several matches the topmost ends up first.
pub fn prefer_codec(sdp: &str, kind: MediaKind, codec: &str) -> String {
    let mut lines = SdpLines::parse(sdp);

    let Some(m_index) = media_line(&lines, kind) else {
        return sdp.to_string();
    };

    let mut start = lines.len().checked_sub(1);
    while let Some(from) = start {
        let Some(index) = lines.find_in_range(
            Some(from),
            Some(0),
            "a=rtpmap",
            Some(codec),
            ScanDirection::Descending,
        ) else {
            break;
        };
        if let Some(payload_type) = payload_type_from_line(&lines[index]) {
            let updated = set_default_codec(&lines[m_index], &payload_type);
            lines.replace(m_index, updated);
        }
        start = index.checked_sub(1);
    }
    lines.into()
}

pub fn maybe_prefer_codec(
    sdp: &str,
    kind: MediaKind,
    dir: CodecDirection,
    codec: Option<&str>,
) -> String {
    match codec.filter(|c| !c.is_empty()) {
        Some(codec) => {
            debug!("prefer {} {} codec: {}", kind, dir, codec);
            prefer_codec(sdp, kind, codec)
        }
        None => {
            debug!("no preference on {} {} codec", kind, dir);
            sdp.to_string()
        }
    }
}

pub fn maybe_prefer_audio_send_codec(sdp: &str, options: &NegotiationOptions) -> String {
    maybe_prefer_codec(
        sdp,
        MediaKind::Audio,
        CodecDirection::Send,
        options.audio_send_codec.as_deref(),
    )
}

pub fn maybe_prefer_audio_receive_codec(sdp: &str, options: &NegotiationOptions) -> String {
    maybe_prefer_codec(
        sdp,
        MediaKind::Audio,
        CodecDirection::Receive,
        options.audio_recv_codec.as_deref(),
    )
}

pub fn maybe_prefer_video_send_codec(sdp: &str, options: &NegotiationOptions) -> String {
    maybe_prefer_codec(
        sdp,
        MediaKind::Video,
        CodecDirection::Send,
        options.video_send_codec.as_deref(),
    )
}

pub fn maybe_prefer_video_receive_codec(sdp: &str, options: &NegotiationOptions) -> String {
    maybe_prefer_codec(
        sdp,
        MediaKind::Video,
        CodecDirection::Receive,
        options.video_recv_codec.as_deref(),
    )
}

/// Shallow merge where keys of `second` win. A missing side yields the other.
pub fn merge_constraints(
    first: Option<Map<String, Value>>,
    second: Option<Map<String, Value>>,
) -> Option<Map<String, Value>> {
    match (first, second) {
        (Some(mut merged), Some(second)) => {
            for (key, value) in second {
                merged.insert(key, value);
            }
            Some(merged)
        }
        (first, second) => first.or(second),
    }
}

/// Munging applied to our own offer/answer before it is set locally and sent.
pub fn munge_local_description(sdp: &str, options: &NegotiationOptions) -> String {
    let sdp = set_opus_options(sdp, options);
    let sdp = maybe_prefer_audio_receive_codec(&sdp, options);
    let sdp = maybe_prefer_video_receive_codec(&sdp, options);
    let sdp = maybe_set_audio_receive_bitrate(&sdp, options);
    let sdp = maybe_set_video_receive_bitrate(&sdp, options);
    maybe_remove_video_fec(&sdp, options)
}

/// Munging applied to the peer's description before it is set as remote.
pub fn munge_remote_description(sdp: &str, options: &mut NegotiationOptions) -> String {
    let sdp = set_opus_options(sdp, options);
    let sdp = maybe_prefer_audio_send_codec(&sdp, options);
    let sdp = maybe_prefer_video_send_codec(&sdp, options);
    let sdp = maybe_set_audio_send_bitrate(&sdp, options);
    let sdp = maybe_set_video_send_bitrate(&sdp, options);
    let sdp = maybe_set_video_send_initial_bitrate(&sdp, options);
    maybe_remove_video_fec(&sdp, options)
}
