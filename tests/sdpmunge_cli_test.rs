use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

const OFFER: &str = "v=0
o=- 1 2 IN IP4 127.0.0.1
s=-
t=0 0
m=audio 9 UDP/TLS/RTP/SAVPF 111 0
c=IN IP4 0.0.0.0
a=rtpmap:111 opus/48000/2
a=fmtp:111 minptime=10
a=rtpmap:0 PCMU/8000
m=video 9 UDP/TLS/RTP/SAVPF 96 116 117
c=IN IP4 0.0.0.0
a=rtpmap:96 VP8/90000
a=rtpmap:116 red/90000
a=rtpmap:117 ulpfec/90000
a=fmtp:116 117
";

fn offer_file() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(OFFER.as_bytes()).unwrap();
    file
}

#[test]
fn test_sdpmunge_local_pipeline() {
    let file = offer_file();
    let output = Command::new(env!("CARGO_BIN_EXE_sdpmunge"))
        .arg(file.path())
        .args(["--opus-stereo", "true", "--video-fec", "false"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("a=fmtp:111 minptime=10;stereo=1\r\n"));
    assert!(stdout.contains("m=video 9 UDP/TLS/RTP/SAVPF 96\r\n"));
    assert!(!stdout.contains("ulpfec"));
}

#[test]
fn test_sdpmunge_remote_pipeline_with_conf() {
    let file = offer_file();
    let mut conf = NamedTempFile::new().unwrap();
    writeln!(
        conf,
        r#"
[signaling]
url = "ws://127.0.0.1:8086"
name = "cli"

[sdp]
audioSendCodec = "PCMU/8000"
"#
    )
    .unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_sdpmunge"))
        .arg(file.path())
        .arg("--conf")
        .arg(conf.path())
        .arg("--remote")
        .args(["--video-send-bitrate", "300"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("m=audio 9 UDP/TLS/RTP/SAVPF 0 111\r\n"));
    assert!(stdout.contains("m=video 9 UDP/TLS/RTP/SAVPF 96 116 117\r\nc=IN IP4 0.0.0.0\r\nb=AS:300\r\n"));
    // the conf table replaces the stereo default
    assert!(stdout.contains("a=fmtp:111 minptime=10\r\n"));
}

#[test]
fn test_sdpmunge_missing_input() {
    let output = Command::new(env!("CARGO_BIN_EXE_sdpmunge"))
        .arg("/nonexistent/offer.sdp")
        .output()
        .unwrap();
    assert!(!output.status.success());
}
