use crate::sdp::NegotiationOptions;
use anyhow::{anyhow, Error};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

pub const DEFAULT_STUN_SERVER: &str = "stun:stun.l.google.com:19302";

#[derive(Parser, Debug)]
#[command(version)]
pub struct Cli {
    #[clap(long, help = "Path to the configuration file (TOML format)")]
    pub conf: Option<String>,
    #[clap(long, help = "Signaling server url, overrides the configuration file")]
    pub url: Option<String>,
    #[clap(long, help = "Peer id to call once connected")]
    pub call: Option<String>,
    #[clap(long, help = "Call with video as well as audio")]
    pub video: bool,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub log_level: Option<String>,
    pub log_file: Option<String>,
    #[serde(default)]
    pub signaling: SignalingConfig,
    #[serde(default = "NegotiationOptions::stereo_opus")]
    pub sdp: NegotiationOptions,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SignalingConfig {
    pub url: String,
    pub name: String,
    pub keepalive_secs: Option<u64>,
    pub ice_servers: Option<Vec<String>>,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8086".to_string(),
            name: "rtcsignal".to_string(),
            keepalive_secs: Some(12),
            ice_servers: None,
        }
    }
}

impl SignalingConfig {
    pub fn keepalive(&self) -> Duration {
        Duration::from_secs(self.keepalive_secs.unwrap_or(12).max(1))
    }

    pub fn ice_servers(&self) -> Vec<String> {
        match self.ice_servers {
            Some(ref servers) if !servers.is_empty() => servers.clone(),
            _ => vec![DEFAULT_STUN_SERVER.to_string()],
        }
    }

    pub fn validate(&self) -> Result<Url, Error> {
        let url = Url::parse(&self.url).map_err(|e| anyhow!("{}: {}", e, self.url))?;
        match url.scheme() {
            "ws" | "wss" => Ok(url),
            scheme => Err(anyhow!("unsupported signaling scheme: {}", scheme)),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            log_file: None,
            signaling: SignalingConfig::default(),
            sdp: NegotiationOptions::stereo_opus(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self, Error> {
        let config: Config = toml::from_str(
            &std::fs::read_to_string(path).map_err(|e| anyhow!("{}: {}", e, path))?,
        )?;
        config.signaling.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level.as_deref(), Some("info"));
        assert_eq!(config.signaling.keepalive(), Duration::from_secs(12));
        assert_eq!(config.signaling.ice_servers(), vec![DEFAULT_STUN_SERVER]);
        assert_eq!(config.sdp.opus_stereo.as_deref(), Some("true"));
        assert!(config.signaling.validate().is_ok());
    }

    #[test]
    fn test_load_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
log_level = "debug"

[signaling]
url = "wss://signal.example.com:4443"
name = "desk"
keepalive_secs = 30
ice_servers = ["stun:stun.example.com:3478"]

[sdp]
opusStereo = "false"
videoSendCodec = "VP9/90000"
videoSendInitialBitrate = "300"
videoFec = "false"
"#
        )
        .unwrap();

        let config = Config::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.signaling.name, "desk");
        assert_eq!(config.signaling.keepalive(), Duration::from_secs(30));
        assert_eq!(
            config.signaling.ice_servers(),
            vec!["stun:stun.example.com:3478"]
        );
        assert_eq!(config.sdp.opus_stereo.as_deref(), Some("false"));
        assert_eq!(config.sdp.video_send_codec.as_deref(), Some("VP9/90000"));
        assert_eq!(config.sdp.video_send_initial_bitrate.as_deref(), Some("300"));
        assert_eq!(config.sdp.video_fec.as_deref(), Some("false"));
        assert_eq!(config.sdp.audio_send_codec, None);
    }

    #[test]
    fn test_load_config_defaults_sections() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"log_file = "/tmp/rtcsignal.log""#).unwrap();

        let config = Config::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.log_level, None);
        assert_eq!(config.signaling.url, "ws://127.0.0.1:8086");
        assert_eq!(config.sdp, NegotiationOptions::stereo_opus());
    }

    #[test]
    fn test_load_config_errors() {
        let err = Config::load("/nonexistent/rtcsignal.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/rtcsignal.toml"));

        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[signaling]
url = "http://signal.example.com"
name = "desk"
"#
        )
        .unwrap();
        assert!(Config::load(file.path().to_str().unwrap()).is_err());
    }
}
