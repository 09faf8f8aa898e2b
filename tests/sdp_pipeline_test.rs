use rtcsignal::sdp::{
    munge_local_description, munge_remote_description, NegotiationOptions, SdpLines, CRLF,
};

const CHROME_OFFER: &[&str] = &[
    "v=0",
    "o=- 3924590436133126541 2 IN IP4 127.0.0.1",
    "s=-",
    "t=0 0",
    "a=group:BUNDLE 0 1",
    "m=audio 9 UDP/TLS/RTP/SAVPF 111 63 9 0 8",
    "c=IN IP4 0.0.0.0",
    "a=mid:0",
    "a=rtpmap:111 opus/48000/2",
    "a=fmtp:111 minptime=10;useinbandfec=1",
    "a=rtpmap:63 red/48000/2",
    "a=fmtp:63 111/111",
    "a=rtpmap:9 G722/8000",
    "a=rtpmap:0 PCMU/8000",
    "a=rtpmap:8 PCMA/8000",
    "m=video 9 UDP/TLS/RTP/SAVPF 96 97 98 99 45 116 117 118",
    "c=IN IP4 0.0.0.0",
    "a=mid:1",
    "a=rtpmap:96 VP8/90000",
    "a=rtpmap:97 rtx/90000",
    "a=fmtp:97 apt=96",
    "a=rtpmap:98 VP9/90000",
    "a=fmtp:98 profile-id=0",
    "a=rtpmap:99 rtx/90000",
    "a=fmtp:99 apt=98",
    "a=rtpmap:45 AV1/90000",
    "a=rtpmap:116 red/90000",
    "a=rtpmap:117 ulpfec/90000",
    "a=fmtp:116 117",
    "a=rtpmap:118 rtx/90000",
    "a=fmtp:118 apt=116",
    "",
];

fn chrome_offer() -> String {
    CHROME_OFFER.join(CRLF)
}

fn position(lines: &SdpLines, line: &str) -> usize {
    lines
        .iter()
        .position(|l| l == line)
        .unwrap_or_else(|| panic!("missing line {}", line))
}

#[test]
fn test_local_pipeline_on_chrome_offer() {
    let options = NegotiationOptions {
        opus_stereo: Some("true".to_string()),
        audio_recv_codec: Some("PCMU/8000".to_string()),
        video_recv_codec: Some("VP9/90000".to_string()),
        video_recv_bitrate: Some("2000".to_string()),
        video_fec: Some("false".to_string()),
        ..Default::default()
    };

    let munged = munge_local_description(&chrome_offer(), &options);
    let lines = SdpLines::parse(&munged);

    assert!(lines
        .iter()
        .any(|l| l == "a=fmtp:111 minptime=10;useinbandfec=1;stereo=1"));
    assert!(lines.iter().any(|l| l == "m=audio 9 UDP/TLS/RTP/SAVPF 0 111 63 9 8"));
    assert!(lines
        .iter()
        .any(|l| l == "m=video 9 UDP/TLS/RTP/SAVPF 98 96 97 99 45 118"));

    let video_m = position(&lines, "m=video 9 UDP/TLS/RTP/SAVPF 98 96 97 99 45 118");
    assert_eq!(&lines[video_m + 1], "c=IN IP4 0.0.0.0");
    assert_eq!(&lines[video_m + 2], "b=AS:2000");
    assert_eq!(&lines[video_m + 3], "a=mid:1");

    assert!(!munged.contains("a=rtpmap:116 red/90000"));
    assert!(!munged.contains("ulpfec"));
    assert!(!munged.contains("a=fmtp:116"));
    // audio red belongs to opus, not to video fec
    assert!(munged.contains("a=rtpmap:63 red/48000/2"));
    assert!(munged.contains("a=fmtp:63 111/111"));
    assert!(munged.ends_with(CRLF));
}

#[test]
fn test_remote_pipeline_on_chrome_offer() {
    let mut options = NegotiationOptions {
        audio_send_bitrate: Some("64".to_string()),
        video_send_bitrate: Some("500".to_string()),
        video_send_initial_bitrate: Some("800".to_string()),
        ..Default::default()
    };

    let munged = munge_remote_description(&chrome_offer(), &mut options);
    let lines = SdpLines::parse(&munged);

    let audio_m = position(&lines, "m=audio 9 UDP/TLS/RTP/SAVPF 111 63 9 0 8");
    assert_eq!(&lines[audio_m + 1], "c=IN IP4 0.0.0.0");
    assert_eq!(&lines[audio_m + 2], "b=AS:64");

    let video_m = position(&lines, "m=video 9 UDP/TLS/RTP/SAVPF 96 97 98 99 45 116 117 118");
    assert_eq!(&lines[video_m + 2], "b=AS:500");

    let vp8 = position(&lines, "a=rtpmap:96 VP8/90000");
    assert_eq!(
        &lines[vp8 + 1],
        "a=fmtp:96 x-google-min-bitrate=500;x-google-max-bitrate=500"
    );
    assert_eq!(options.video_send_initial_bitrate.as_deref(), Some("500"));

    // untouched without the matching options
    assert!(munged.contains("a=fmtp:111 minptime=10;useinbandfec=1\r\n"));
    assert!(munged.contains("a=rtpmap:117 ulpfec/90000"));
}

#[test]
fn test_pipelines_without_options_are_identity() {
    let offer = chrome_offer();
    let mut options = NegotiationOptions::default();
    assert_eq!(munge_local_description(&offer, &options), offer);
    assert_eq!(munge_remote_description(&offer, &mut options), offer);
    assert_eq!(options, NegotiationOptions::default());

    let audio_only = CHROME_OFFER[..15].join(CRLF);
    let options = NegotiationOptions {
        video_recv_codec: Some("VP9/90000".to_string()),
        video_recv_bitrate: Some("1000".to_string()),
        video_fec: Some("false".to_string()),
        ..Default::default()
    };
    assert_eq!(munge_local_description(&audio_only, &options), audio_only);
}
