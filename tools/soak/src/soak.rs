//! Soak command - producer and consumer threads around one queue

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, ValueEnum};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use tracing::{debug, info, warn};

use vcsaudio_core::config::{self, Preset};
use vcsaudio_core::stream::{self, FragmentConsumer, FragmentProducer};
use vcsaudio_core::{QueueStats, StatsReporter};

use crate::tone::Tone;

/// Preset names accepted on the command line
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PresetArg {
    Custom,
    LowQualityMediumLag,
    HighQualityMediumLag,
    HighQualityLowLag,
    VeryHighQualityVeryLowLag,
}

impl From<PresetArg> for Preset {
    fn from(arg: PresetArg) -> Self {
        match arg {
            PresetArg::Custom => Preset::Custom,
            PresetArg::LowQualityMediumLag => Preset::LowQualityMediumLag,
            PresetArg::HighQualityMediumLag => Preset::HighQualityMediumLag,
            PresetArg::HighQualityLowLag => Preset::HighQualityLowLag,
            PresetArg::VeryHighQualityVeryLowLag => Preset::VeryHighQualityVeryLowLag,
        }
    }
}

/// Arguments for the soak command
#[derive(Args)]
pub struct SoakArgs {
    /// Path to a config.toml (defaults to the platform config directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override the configured preset
    #[arg(long, value_enum)]
    pub preset: Option<PresetArg>,

    /// Frames per fragment (switches to the custom preset)
    #[arg(long)]
    pub fragment_size: Option<u32>,

    /// Override the queue capacity derived from buffer size and headroom
    #[arg(long)]
    pub capacity: Option<usize>,

    /// Number of fragments to produce
    #[arg(short = 'n', long, default_value = "200")]
    pub fragments: u64,

    /// Producer speed relative to real time (>1 overproduces, <1 underproduces)
    #[arg(long, default_value = "1.0")]
    pub produce_ratio: f64,

    /// Consumer callback size in frames
    #[arg(long, default_value = "256")]
    pub period: usize,

    /// Seed for pacing jitter
    #[arg(long, default_value = "0")]
    pub seed: u64,

    /// Print final statistics as JSON
    #[arg(long)]
    pub json: bool,
}

/// What each thread reports when it stops
struct ProducerReport {
    fragments: u64,
}

struct ConsumerReport {
    callbacks: u64,
    underrun_callbacks: u64,
}

/// Execute the soak command
pub fn execute(args: SoakArgs) -> Result<()> {
    if !(args.produce_ratio > 0.0 && args.produce_ratio.is_finite()) {
        bail!("--produce-ratio must be a positive number");
    }
    if args.period == 0 {
        bail!("--period must be at least one frame");
    }

    let mut config = match &args.config {
        Some(path) => config::load_from(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => config::load(),
    };

    let audio = &mut config.audio;
    if let Some(preset) = args.preset {
        audio.preset = preset.into();
    }
    if let Some(fragment_size) = args.fragment_size {
        audio.preset = Preset::Custom;
        audio.fragment_size = fragment_size;
    }
    for correction in audio.normalize() {
        warn!("{}", correction);
    }

    let mut params = audio.queue_params();
    if let Some(capacity) = args.capacity {
        params.capacity = capacity;
    }

    info!(
        "Soaking {:?}: {} frames x {} fragments, {}Hz {}, policy {:?}",
        audio.preset,
        params.fragment_size,
        params.capacity,
        params.sample_rate,
        if params.is_stereo { "stereo" } else { "mono" },
        audio.underrun
    );

    let (producer, consumer) = stream::channel(params.build(), audio.underrun);
    let queue = producer.queue().clone();
    let done = Arc::new(AtomicBool::new(false));
    let max_size = Arc::new(AtomicUsize::new(0));

    let started = Instant::now();

    let producing = {
        let done = done.clone();
        let mut rng = Pcg32::seed_from_u64(args.seed);
        let fragments = args.fragments;
        let ratio = args.produce_ratio;
        thread::Builder::new()
            .name("soak-producer".into())
            .spawn(move || {
                let result = produce(producer, fragments, ratio, &mut rng);
                done.store(true, Ordering::Release);
                result
            })
            .context("Failed to spawn producer thread")?
    };

    let consuming = {
        let done = done.clone();
        let max_size = max_size.clone();
        let mut rng = Pcg32::seed_from_u64(args.seed.wrapping_add(1));
        let period = args.period;
        thread::Builder::new()
            .name("soak-consumer".into())
            .spawn(move || consume(consumer, period, &done, &max_size, &mut rng))
            .context("Failed to spawn consumer thread")?
    };

    let produced = producing
        .join()
        .map_err(|_| anyhow!("Producer thread panicked"))?
        .context("Producer failed")?;
    let consumed = consuming
        .join()
        .map_err(|_| anyhow!("Consumer thread panicked"))?
        .context("Consumer failed")?;

    let stats = queue.stats();
    info!(
        "Finished in {:.2?}: produced {} fragments, {} callbacks ({} with underrun)",
        started.elapsed(),
        produced.fragments,
        consumed.callbacks,
        consumed.underrun_callbacks
    );
    info!(
        "Queue: enqueued={}, dequeued={}, evicted={}, underruns={}, size={}/{}",
        stats.enqueued,
        stats.dequeued,
        stats.evicted,
        stats.underruns,
        stats.size,
        stats.capacity
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    }

    check(&stats, max_size.load(Ordering::Relaxed))
}

/// Generate a tone at `ratio` times real time until `fragments` have been submitted
fn produce(
    mut producer: FragmentProducer,
    fragments: u64,
    ratio: f64,
    rng: &mut Pcg32,
) -> Result<ProducerReport, vcsaudio_core::QueueError> {
    let queue = producer.queue().clone();
    let channels = queue.channels();
    let mut tone = Tone::new(440.0, queue.sample_rate(), 0.25);

    // Emit roughly a video frame's worth of audio per step, like an emulator tick
    let frames_per_step = (queue.sample_rate() as usize / 60).max(1);
    let mut chunk = vec![0i16; frames_per_step * channels];
    let step =
        Duration::from_secs_f64(frames_per_step as f64 / queue.sample_rate() as f64 / ratio);

    let mut submitted = 0;
    let mut deadline = Instant::now();
    while submitted < fragments {
        tone.render(&mut chunk, channels);

        let remaining =
            (fragments - submitted) as usize * queue.samples_per_fragment() - producer.pending();
        let count = chunk.len().min(remaining);
        submitted += producer.write(&chunk[..count])? as u64;

        // +-20% jitter around the nominal step, but never drift
        let wake = deadline + step.mul_f64(rng.random_range(0.8..1.2));
        deadline += step;
        if let Some(wait) = wake.checked_duration_since(Instant::now()) {
            thread::sleep(wait);
        }
    }

    debug!("Producer finished after {} fragments", submitted);
    Ok(ProducerReport {
        fragments: submitted,
    })
}

/// Pull one device period at a time until the producer is done and the queue is dry
fn consume(
    mut consumer: FragmentConsumer,
    period: usize,
    done: &AtomicBool,
    max_size: &AtomicUsize,
    rng: &mut Pcg32,
) -> Result<ConsumerReport, vcsaudio_core::QueueError> {
    let queue = consumer.queue().clone();
    let mut buffer = vec![0i16; period * queue.channels()];
    let interval = Duration::from_secs_f64(period as f64 / queue.sample_rate() as f64);
    let mut reporter = StatsReporter::default();

    let mut callbacks = 0;
    let mut underrun_callbacks = 0;
    let mut deadline = Instant::now();

    loop {
        let finished = done.load(Ordering::Acquire);
        let outcome = consumer.fill(&mut buffer)?;
        callbacks += 1;
        if outcome.underrun {
            underrun_callbacks += 1;
            if finished {
                break;
            }
        }

        let stats = queue.stats();
        max_size.fetch_max(stats.size, Ordering::Relaxed);
        reporter.observe(stats);

        // Device callbacks are periodic; small scheduling noise only
        deadline += interval;
        let wake = deadline + Duration::from_micros(rng.random_range(0..200));
        if let Some(wait) = wake.checked_duration_since(Instant::now()) {
            thread::sleep(wait);
        }
    }

    Ok(ConsumerReport {
        callbacks,
        underrun_callbacks,
    })
}

/// Verify the queue kept its bounds and accounted for every fragment
fn check(stats: &QueueStats, max_size: usize) -> Result<()> {
    if max_size > stats.capacity {
        bail!(
            "Queue held {} fragments, more than its capacity of {}",
            max_size,
            stats.capacity
        );
    }
    if !stats.reconciles() {
        bail!(
            "Queue statistics do not reconcile: enqueued {} != evicted {} + dequeued {} + size {}",
            stats.enqueued,
            stats.evicted,
            stats.dequeued,
            stats.size
        );
    }
    info!("Queue statistics reconcile");
    Ok(())
}
