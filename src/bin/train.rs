use std::error::Error;
use std::fs::File;
use std::path::PathBuf;

use clap::Parser;
use steernet::codec::{PatternCodec, RawVector};
use steernet::config::Config;
use steernet::controller::Controller;
use steernet::{scenarios, transport};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Trains the steering network on the canned scenarios, then scores its
/// decisions on a second pass.
#[derive(Parser, Debug)]
#[command(name = "train")]
struct Args {
    /// JSON configuration file. The reference 25/7 layout is used if absent.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for weight initialisation and perturbation.
    #[arg(long)]
    seed: Option<u64>,

    /// Give up training after this many epochs.
    #[arg(long)]
    max_epochs: Option<u64>,

    /// Log every unit of the trained network.
    #[arg(long)]
    display: bool,

    /// Write the trained network as JSON to this file.
    #[arg(long)]
    dump: Option<PathBuf>,

    /// Log every cycle.
    #[arg(short, long)]
    verbose: bool,
}

/// Compares each decision with the targets of the scenario it answered.
fn score(codec: &PatternCodec, vectors: &[RawVector], offset: u64, decisions: &[RawVector]) {
    let mut num_correct = 0;
    for (n, decision) in decisions.iter().enumerate() {
        let index = (offset as usize + n) % vectors.len();
        if codec.decode(decision).targets == codec.decode(&vectors[index]).targets {
            num_correct += 1;
        }
    }
    info!(
        correct = num_correct,
        total = decisions.len(),
        "inference results"
    );
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if args.max_epochs.is_some() {
        config.schedule.max_epochs = args.max_epochs;
    }

    let vectors = scenarios::canned_vectors();
    let (producer, transport) = transport::channel();
    let replay = scenarios::spawn_replay(producer, vectors.clone());

    let mut controller = Controller::new(transport);
    controller.configure(config)?;

    let mut offset = 0;
    if controller.training_enabled() {
        let summary = controller.start()?;
        info!(
            reason = ?summary.reason,
            epochs = summary.epochs,
            last_epoch_error = ?summary.last_epoch_error,
            "training finished"
        );
        offset = summary.cycles;
        controller.set_training_enabled(false);
    }
    controller.start()?;

    if args.display {
        controller.display()?;
    }
    let codec = match controller.network() {
        Some(network) => {
            if let Some(path) = &args.dump {
                serde_json::to_writer_pretty(File::create(path)?, network)?;
                info!(path = %path.display(), "wrote network");
            }
            PatternCodec::for_dimensions(&network.dimensions())
        }
        None => return Err("controller lost its network".into()),
    };

    drop(controller);
    let stats = replay.join().map_err(|_| "replay thread panicked")?;
    score(&codec, &vectors, offset, &stats.decisions);
    Ok(())
}
