//! dicetray - roll dice notation from the command line

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use dicetray::{Config, EventBus, RollCoordinator, TimedAnimator};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Dice roller with a simulated dice animation
#[derive(Parser, Debug)]
#[command(
    name = "dicetray",
    version,
    about = "Roll dice notation such as 3D20 or 2xD6+1"
)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Name recorded with each roll
    #[arg(short, long)]
    actor: Option<String>,

    /// Die color handed to the animation
    #[arg(long)]
    color: Option<String>,

    /// Seed for reproducible rolls
    #[arg(long)]
    seed: Option<u64>,

    /// Animation length in milliseconds
    #[arg(long)]
    animation_ms: Option<u64>,

    /// Print the log as JSON lines
    #[arg(long)]
    json: bool,

    /// Notations to roll; read from stdin, one per line, when empty
    notations: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so the roll log owns stdout
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dicetray=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(actor) = args.actor {
        config.actor = actor;
    }
    if let Some(color) = args.color {
        config.color = color;
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(animation_ms) = args.animation_ms {
        config.animation_ms = animation_ms;
    }
    config.validate()?;
    debug!(?config, "configuration loaded");

    let bus = EventBus::new();
    let animator = TimedAnimator::new(config.animation_duration());
    let subscription = animator.attach(&bus);
    let coordinator = RollCoordinator::new(bus, &config);

    let mut tickets = Vec::new();
    if args.notations.is_empty() {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            tickets.extend(coordinator.submit(line, &config.actor));
        }
    } else {
        for notation in &args.notations {
            tickets.extend(coordinator.submit(notation, &config.actor));
        }
    }

    let submitted = tickets.len();
    for ticket in tickets {
        ticket.wait().await;
    }
    subscription.unsubscribe();
    info!(submitted, logged = coordinator.log().len(), "all rolls settled");

    for entry in coordinator.log().entries() {
        if args.json {
            println!("{}", serde_json::to_string(&entry)?);
        } else {
            println!("{}", entry);
        }
    }

    Ok(())
}
