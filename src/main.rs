// src/main.rs
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use log::info;

use physio_psth::drivers::{AcquisitionPipeline, PlaybackSource, SampleSource, SimulatedSource};
use physio_psth::engine::{spawn_thread, DEFAULT_POLL_INTERVAL};
use physio_psth::psth::{Configuration, PsthProcessor, SessionEvent};
use physio_psth::types::{ControlCommand, EngineMessage};

// How long the front-end waits on the engine before giving up
const REPLY_TIMEOUT: Duration = Duration::from_secs(60);

/// Record a bounded PSTH session and save the histogram as time/value columns
#[derive(Parser, Debug)]
#[command(name = "physio-psth")]
struct Args {
    /// JSON configuration file; missing fields take their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Trials to record, overriding the configuration (0 = until end of input)
    #[arg(long)]
    trials: Option<u32>,

    /// Output histogram file
    #[arg(long, default_value = "psth.tsv")]
    out: PathBuf,

    /// Seed for the simulated source
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Replay samples from a text file instead of simulating
    #[arg(long)]
    input: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Configuration::load(path)?,
        None => Configuration::default(),
    };
    if let Some(trials) = args.trials {
        config.num_trials = trials;
    }
    if config.num_trials == 0 && args.input.is_none() {
        bail!("a simulated session needs --trials greater than zero");
    }
    let processor = PsthProcessor::new(config.clone()).context("invalid configuration")?;

    // ~10 ms of samples per batch
    let batch_len = ((config.sample_rate_hz / 100.0) as usize).max(1);
    match &args.input {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("opening {}", path.display()))?;
            let source =
                PlaybackSource::from_reader(BufReader::new(file), config.sample_rate_hz, batch_len)
                    .with_context(|| format!("reading {}", path.display()))?;
            info!(
                "replaying {} samples per channel from {}",
                source.remaining_rows(),
                path.display()
            );
            run_session(source, processor, &config, &args)
        }
        None => {
            let channels = config.channel + 1;
            let source = SimulatedSource::new(
                channels,
                config.sample_rate_hz,
                batch_len,
                config.trial_length,
                args.seed,
            );
            info!("simulating {} channels, seed {}", channels, args.seed);
            run_session(source, processor, &config, &args)
        }
    }
}

fn run_session<S>(
    source: S,
    processor: PsthProcessor,
    config: &Configuration,
    args: &Args,
) -> Result<()>
where
    S: SampleSource + Send + 'static,
{
    let (tx, rx) = channel();
    let (tx_cmd, rx_cmd) = channel();
    let pipeline = AcquisitionPipeline::new(source, processor);
    let handle = spawn_thread(pipeline, tx, rx_cmd, DEFAULT_POLL_INTERVAL);
    let send = |cmd| tx_cmd.send(cmd).map_err(|_| anyhow!("acquisition thread has exited"));

    send(ControlCommand::StartRecording(config.num_trials))?;
    let trials = wait_for_end(&rx)?;
    println!("recorded {} trials ({:?} mode)", trials, config.mode);

    send(ControlCommand::SaveHistogram(args.out.clone()))?;
    loop {
        match rx.recv_timeout(REPLY_TIMEOUT).context("no reply to save request")? {
            EngineMessage::Saved(path) => {
                println!("histogram written to {}", path.display());
                break;
            }
            EngineMessage::SaveFailed { path, reason } => {
                bail!("could not write {}: {}", path.display(), reason)
            }
            _ => {}
        }
    }

    send(ControlCommand::Shutdown)?;
    let processor = handle.join().map_err(|_| anyhow!("acquisition thread panicked"))?;
    info!("{} threshold crossings seen", processor.session().spikes_detected);
    Ok(())
}

// Returns the trial count once the bounded recording stops or the input runs out.
fn wait_for_end(rx: &Receiver<EngineMessage>) -> Result<u32> {
    let mut trials = 0;
    loop {
        match rx.recv_timeout(REPLY_TIMEOUT).context("engine stopped reporting")? {
            EngineMessage::Session(SessionEvent::SessionStopped { trials_completed }) => {
                return Ok(trials_completed)
            }
            EngineMessage::Session(SessionEvent::TrialCompleted { trials_completed }) => {
                trials = trials_completed
            }
            EngineMessage::SourceFinished => return Ok(trials),
            EngineMessage::SourceError(e) => bail!("acquisition failed: {}", e),
            EngineMessage::ConfigRejected(e) => bail!("configuration rejected: {}", e),
            EngineMessage::Log(line) => info!("engine: {}", line),
            _ => {}
        }
    }
}
