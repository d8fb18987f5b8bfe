//! skycast receiver entrypoint.
//!
//! By default skycast listens on a UDP socket for broadcast frames; with a
//! capture argument it replays a KISS recording instead. Reconstructed
//! files land in the output directory; announcements, block progress, time
//! beacons, and drop counters are logged to stdout.

#![forbid(unsafe_code)]

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use skycast_core::ReceiverConfig;
use skycast_pipeline::{CaptureFrameSource, DirectorySink, Receiver, UdpFrameSource};

/// Receiver for a one-way satellite file-broadcast service.
#[derive(Parser)]
#[command(name = "skycast")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// KISS capture to replay; listens on UDP when omitted.
    capture: Option<PathBuf>,

    /// Directory reconstructed files are written to.
    #[arg(short, long, default_value = "./downloads")]
    output: PathBuf,

    /// UDP listen address for live reception.
    #[arg(short, long, default_value = "[::]:10000")]
    listen: String,
}

fn main() -> anyhow::Result<()> {
    // Log lines are part of the output contract, so they go to stdout.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let sink = DirectorySink::new(&cli.output);
    let mut receiver = Receiver::new(ReceiverConfig::default(), sink);

    match cli.capture {
        Some(path) => {
            let file = File::open(&path)
                .with_context(|| format!("cannot open capture {}", path.display()))?;
            tracing::info!(capture = %path.display(), output = %cli.output.display(), "replaying capture");
            let mut source =
                CaptureFrameSource::new(BufReader::new(file), receiver.counters().clone());
            receiver.run(&mut source).context("replay failed")?;
        }
        None => {
            let mut source = UdpFrameSource::bind(&cli.listen)
                .with_context(|| format!("cannot bind {}", cli.listen))?;
            tracing::info!(listen = %cli.listen, output = %cli.output.display(), "listening for broadcast frames");
            receiver.run(&mut source).context("receive failed")?;
        }
    }

    Ok(())
}
