use anyhow::{anyhow, Result};
use clap::Parser;
use rtcsignal::config::Config;
use rtcsignal::sdp::{munge_local_description, munge_remote_description, NegotiationOptions, CRLF};
use rtcsignal::version;
use std::io::{Read, Write};
use tracing::{debug, level_filters::LevelFilter};

#[derive(Parser, Debug)]
#[command(
    author,
    version = version::get_short_version(),
    about = "Rewrites an SDP the way rtcsignal does before setting a description"
)]
struct Cli {
    /// SDP file to read, `-` for stdin
    input: String,
    #[clap(long, help = "Take negotiation options from the [sdp] table of this file")]
    conf: Option<String>,
    #[clap(long, help = "Apply the remote description pipeline instead of the local one")]
    remote: bool,
    #[clap(long, help = "Log engine decisions to stderr")]
    verbose: bool,
    #[command(flatten)]
    options: NegotiationOptions,
}

fn read_input(input: &str) -> Result<String> {
    let mut sdp = String::new();
    if input == "-" {
        std::io::stdin().read_to_string(&mut sdp)?;
    } else {
        sdp = std::fs::read_to_string(input).map_err(|e| anyhow!("{}: {}", e, input))?;
    }
    // files saved on unix often lose the carriage returns
    if !sdp.contains(CRLF) {
        sdp = sdp.replace('\n', CRLF);
    }
    Ok(sdp)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();

    let base = match cli.conf {
        Some(ref conf) => Config::load(conf)?.sdp,
        None => NegotiationOptions::default(),
    };
    let mut options = base.merge(cli.options);
    debug!("options: {}", serde_json::to_string(&options)?);

    let sdp = read_input(&cli.input)?;
    let munged = if cli.remote {
        munge_remote_description(&sdp, &mut options)
    } else {
        munge_local_description(&sdp, &options)
    };

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(munged.as_bytes())?;
    stdout.flush()?;
    Ok(())
}
