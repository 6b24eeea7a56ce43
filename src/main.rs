use std::io::Write;
use std::path::PathBuf;

use clap::Parser;

use borescope_rig::batch::{BatchRunner, write_artifacts};
use borescope_rig::config;
use borescope_rig::geometry::HoleGeometry;
use borescope_rig::records::InputRecordSet;
use borescope_rig::solver::ProbeConfig;
use borescope_rig::solver::validate::{Uniqueness, check_uniqueness};

#[derive(Parser, Debug)]
#[command(
    name = "rig-planner",
    about = "Solve borescope mount poses and generate rig command sequences"
)]
struct Cli {
    /// Input record set name, without the .json extension. Prompted for if
    /// omitted.
    name: Option<String>,

    /// Rig configuration file.
    #[arg(long, default_value = "rig.toml")]
    config: PathBuf,

    /// Re-solve each hole from perturbed initial guesses and report
    /// ambiguous geometries before running the batch.
    #[arg(long)]
    verify: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    tracing::info!("Starting borescope rig planner");

    let cli = Cli::parse();

    let config = config::load_or_default(&cli.config).map_err(|e| {
        tracing::error!("failed to load config from '{}': {}", cli.config.display(), e);
        Box::new(e) as Box<dyn std::error::Error + Send + Sync + 'static>
    })?;

    let name = match cli.name {
        Some(name) => name,
        None => prompt_name()?,
    };

    let input_path = PathBuf::from(&config.input_dir).join(format!("{name}.json"));
    tracing::info!("Loading hole records from: {}", input_path.display());
    let input = InputRecordSet::load(&input_path)?;
    tracing::info!(
        "Probe length: {} mm, travel height: {} mm, {} holes",
        input.endoscope_length,
        input.starting_height,
        input.holes.len()
    );

    if cli.verify {
        verify_holes(&input);
    }

    let outcome = BatchRunner::new(&config).run(&input)?;
    tracing::info!("Solved {} holes, {} failed", outcome.solved, outcome.failed);

    for path in write_artifacts(&outcome, &name, &config)? {
        tracing::info!("Wrote {}", path.display());
    }

    Ok(())
}

fn prompt_name() -> Result<String, std::io::Error> {
    print!("Input record set name: ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Diagnostic pass: checks that the mount-point system is well-posed for
/// every hole before any command is generated.
fn verify_holes(input: &InputRecordSet) {
    let probe = ProbeConfig {
        length: input.endoscope_length,
    };
    for (id, hole) in &input.holes {
        let geometry = HoleGeometry::new(hole.start, hole.end);
        match check_uniqueness(&geometry, probe, probe.length, probe.length + geometry.depth) {
            Ok(Uniqueness::Unique(p)) => {
                tracing::info!("{id}: unique solution at ({}, {}, {})", p.x, p.y, p.z);
            }
            Ok(Uniqueness::Ambiguous(candidates)) => {
                tracing::warn!(
                    "{id}: {} distinct candidates from perturbed guesses: {candidates:?}",
                    candidates.len()
                );
            }
            Err(e) => tracing::warn!("{id}: uniqueness check skipped: {e}"),
        }
    }
}
