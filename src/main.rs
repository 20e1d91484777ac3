//! Dynamic Casino - headless slot machine simulator
//!
//! Main entry point: loads settings and symbols, runs spins and prints
//! each settled result.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use dc_core::{DefaultRandomSource, RandomSource, SeededRandomSource, format_probability};
use dc_reels::{GameSettings, SpinCoordinator, SymbolHandle, SymbolPool};
use dc_stage::SpinStage;

#[derive(Debug, Parser)]
#[command(name = "dynamic-casino", version, about = "Slot machine reel simulator")]
struct Cli {
    /// Settings file (.json, .yaml or .yml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory of symbol images
    #[arg(long)]
    images: Option<PathBuf>,

    /// Number of reels (1-10)
    #[arg(long)]
    columns: Option<u32>,

    /// Symbols to draw from (0 = all)
    #[arg(long)]
    symbols: Option<u32>,

    /// Spin speed multiplier
    #[arg(long)]
    intensity: Option<f64>,

    /// Seconds until the cutoff
    #[arg(long)]
    duration: Option<f64>,

    /// Spins to run
    #[arg(long, default_value_t = 1)]
    spins: u32,

    /// Seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,
}

impl Cli {
    fn settings(&self) -> anyhow::Result<GameSettings> {
        let mut settings = match &self.config {
            Some(path) => GameSettings::load(path)
                .with_context(|| format!("loading settings from {}", path.display()))?,
            None => GameSettings::default(),
        };

        if let Some(images) = &self.images {
            settings.images_directory = images.clone();
        }
        if let Some(columns) = self.columns {
            settings.columns = columns;
        }
        if let Some(symbols) = self.symbols {
            settings.symbols_to_use = symbols;
        }
        if let Some(intensity) = self.intensity {
            settings.spin_intensity = intensity;
        }
        if let Some(duration) = self.duration {
            settings.simulation_seconds = duration;
        }

        settings.validate().context("invalid settings")?;
        Ok(settings)
    }

    fn random_source(&self) -> Box<dyn RandomSource> {
        match self.seed {
            Some(seed) => {
                log::info!("Using seed {seed}");
                Box::new(SeededRandomSource::new(seed))
            }
            None => Box::new(DefaultRandomSource::new()),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    log::info!("Starting Dynamic Casino...");

    let cli = Cli::parse();
    let settings = cli.settings()?;
    let pool = SymbolPool::load_or_bundled(&settings.images_directory);
    if pool.iter().all(SymbolHandle::is_bundled) {
        println!("Using {} bundled symbols", pool.len());
    } else {
        println!(
            "Loaded {} symbols from {}",
            pool.len(),
            settings.images_directory.display()
        );
    }
    let coordinator = SpinCoordinator::new(settings, pool, cli.random_source())
        .context("building reel grid")?;

    let snapshot = coordinator.snapshot();
    println!(
        "{} reels on {} row(s), win probability {}",
        snapshot.reels.len(),
        snapshot.layout.row_count(),
        snapshot.probability_text
    );

    let mut events = coordinator.subscribe();
    let logger = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let SpinStage::StepFailed { reel_index, reason } = &event.stage {
                log::warn!("Spin {} reel {}: {}", event.spin_id, reel_index, reason);
            } else {
                log::debug!("[{:>8.1} ms] {}", event.elapsed_ms, event.type_name());
            }
        }
    });

    let mut wins = 0u32;
    for _ in 0..cli.spins {
        let Some(spin) = coordinator.start_spin() else {
            anyhow::bail!("cannot start a spin: no symbols available");
        };
        let Some(outcome) = spin.wait().await else {
            anyhow::bail!("spin was aborted");
        };

        let names: Vec<&str> = outcome.symbols.iter().map(|s| s.name.as_str()).collect();
        println!(
            "#{:<4} {:<40} {}",
            outcome.spin_id,
            names.join(" | "),
            outcome.message
        );
        if outcome.win() == Some(true) {
            wins += 1;
        }
    }

    if cli.spins > 1 {
        println!(
            "{} / {} wins ({} observed, {} expected)",
            wins,
            cli.spins,
            format_probability(wins as f64 / cli.spins as f64),
            format_probability(coordinator.probability())
        );
    }

    drop(coordinator);
    logger.abort();
    Ok(())
}
