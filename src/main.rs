use anyhow::{Context, Result};
use clap::Parser;
use epigrid::{Config, Engine, stats};
use std::{io, path::PathBuf};

#[derive(Debug, Parser)]
#[command(version, about)]
struct CLI {
    /// TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Number of ticks to simulate.
    #[arg(long)]
    n_ticks: u64,

    /// Seed of the random number generator (seeded by the OS if omitted).
    #[arg(long)]
    seed: Option<u64>,
}

fn main() {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(error) = run_cli() {
        log::error!("{error:#?}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let args = CLI::parse();
    log::info!("{args:#?}");

    let cfg = Config::from_file(&args.config).context("failed to construct cfg")?;
    log::info!("{cfg:#?}");

    let mut engine = match args.seed {
        Some(seed) => Engine::from_seed(cfg, seed),
        None => Engine::from_os_rng(cfg),
    }
    .context("failed to construct engine")?;

    engine
        .run(args.n_ticks)
        .context("failed to run simulation")?;

    let stdout = io::stdout();
    stats::write_table(engine.metrics(), &mut stdout.lock())
        .context("failed to write metrics table")?;

    for (name, report) in stats::summarize(engine.metrics()) {
        log::info!("{name}: mean {:.6}, std_dev {:.6}", report.mean, report.std_dev);
    }
    log::info!(
        "finished after {} ticks: {} alive, {} dead",
        engine.tick(),
        engine.population(),
        engine.deaths()
    );

    Ok(())
}
