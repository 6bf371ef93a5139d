//! vcsaudio-soak - exercise a fragment queue under real thread timing
//!
//! Builds a queue from the audio configuration, then runs an emulation-like
//! producer thread (a sine tone written through `FragmentProducer`) against
//! a device-like consumer thread (`FragmentConsumer::fill` once per period).
//! When both threads stop, the queue statistics must reconcile.
//!
//! # Usage
//!
//! ```bash
//! # Defaults from ~/.config/VcsAudio/config.toml
//! vcsaudio-soak
//!
//! # Overproduce by 50% into a small queue and print JSON stats
//! vcsaudio-soak --capacity 2 --produce-ratio 1.5 --json
//!
//! # Custom layout with verbose queue logging
//! RUST_LOG=debug vcsaudio-soak --fragment-size 256 --period 128
//! ```

mod soak;
mod tone;

use anyhow::Result;
use clap::Parser;

/// Soak test for the audio fragment queue
#[derive(Parser)]
#[command(name = "vcsaudio-soak")]
#[command(about = "Drive a fragment queue from producer and consumer threads")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    soak: soak::SoakArgs,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    soak::execute(cli.soak)
}
