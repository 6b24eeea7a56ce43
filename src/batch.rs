//! Batch runner: drives the solver and command builders over every hole in an
//! input record set, interleaving calibration per the measurement schedule.
//!
//! Holes are processed strictly sequentially in input order; the calibration
//! schedule and the measurement counter are order-dependent state owned by the
//! per-run [`BatchState`].

use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::commands::{BlockKind, CommandBlock, CommandSequenceBuilder, calibration};
use crate::config::RigConfig;
use crate::geometry::HoleGeometry;
use crate::records::{
    HoleSolution, InputError, InputRecordSet, MissingOrientation, OutputRecordSet, SolutionRecord,
};
use crate::solver::{Pose, PoseSolver, ProbeConfig};

#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Record(#[from] MissingOrientation),
    #[error("failed to serialize results: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to write output artifact '{path}': {source}")]
    Output {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Mutable per-run state: the measurement counter and the growing command
/// script. Owned exclusively by [`BatchRunner::run`].
#[derive(Debug, Default)]
struct BatchState {
    measurement_count: u32,
    script: Vec<CommandBlock>,
    motion_program: Vec<CommandBlock>,
}

/// Everything a finished batch produces, ready for serialization.
#[derive(Debug)]
pub struct BatchOutcome {
    /// Terminal-dialect script: calibration and per-hole blocks in schedule
    /// order.
    pub script: Vec<CommandBlock>,
    /// Motion-dialect program, one block per solved hole. Only written to
    /// disk when the `nc-output` feature is enabled.
    pub motion_program: Vec<CommandBlock>,
    pub results: OutputRecordSet,
    pub solved: usize,
    pub failed: usize,
}

pub struct BatchRunner<'a> {
    config: &'a RigConfig,
}

impl<'a> BatchRunner<'a> {
    pub fn new(config: &'a RigConfig) -> Self {
        Self { config }
    }

    /// Processes every hole in input order. A solve failure is recorded
    /// against its hole and the batch continues; only malformed input aborts
    /// the run (and that is rejected before the first hole is touched).
    pub fn run(&self, input: &InputRecordSet) -> Result<BatchOutcome, BatchError> {
        let probe = ProbeConfig {
            length: input.endoscope_length,
        };
        let mut state = BatchState::default();
        let mut results = OutputRecordSet::new();
        let mut solved = 0usize;
        let mut failed = 0usize;

        for (id, hole) in &input.holes {
            let geometry = HoleGeometry::new(hole.start, hole.end);
            let solver = PoseSolver::new(id.clone(), geometry, probe)
                .with_strategy(self.config.solver.strategy)
                .with_options(self.config.solver.solve_options());
            let length = probe.length;
            let depth = geometry.depth;

            let poses = solver.solve_angles(length, length + depth).and_then(|start| {
                solver
                    .solve_position(length - depth, length)
                    .map(|end| (start, Pose::position_only(end)))
            });

            match poses {
                Ok((start, end)) => {
                    let solution = HoleSolution::new(id.clone(), start, end).rounded();
                    let record = SolutionRecord::from_solution(&solution)?;
                    tracing::info!(
                        "{id}: start ({}, {}, {}) phi {} psi {}, end ({}, {}, {})",
                        record.start.position.x,
                        record.start.position.y,
                        record.start.position.z,
                        record.start.phi,
                        record.start.psi,
                        record.end.x,
                        record.end.y,
                        record.end.z,
                    );
                    let label = id.rsplit('_').next().unwrap_or(id.as_str());
                    let builder = CommandSequenceBuilder::new(
                        &record,
                        label,
                        input.starting_height,
                        self.config,
                    );
                    self.schedule_hole(&mut state, &builder);
                    results.push_record(id.clone(), record);
                    solved += 1;
                }
                Err(e) => {
                    tracing::warn!("{e}; hole recorded as failed");
                    results.push_failed(id.clone(), e.to_string());
                    failed += 1;
                }
            }
        }

        Ok(BatchOutcome {
            script: state.script,
            motion_program: state.motion_program,
            results,
            solved,
            failed,
        })
    }

    /// Appends one measured hole to the script, prepending calibration per the
    /// schedule: the full template before the first measurement and again
    /// whenever the counter reaches 10, the light template before every one.
    fn schedule_hole(&self, state: &mut BatchState, builder: &CommandSequenceBuilder<'_>) {
        if state.measurement_count == 0 {
            state.script.push(calibration::full_calibration(self.config));
        }
        if state.measurement_count == 10 {
            state.script.push(calibration::full_calibration(self.config));
            // The counter restarts at 1 after a mid-run recalibration, so the
            // template re-fires every ten measurements from here on.
            state.measurement_count = 1;
        }
        state
            .script
            .push(calibration::light_calibration(self.config));
        state.script.push(builder.terminal_block());
        state.motion_program.push(builder.motion_block());
        state.measurement_count += 1;
    }
}

/// Serializes a finished batch: appends the terminal script, overwrites the
/// results record set, and (with `nc-output`) appends the motion program.
/// Returns the paths written.
pub fn write_artifacts(
    outcome: &BatchOutcome,
    name: &str,
    config: &RigConfig,
) -> Result<Vec<PathBuf>, BatchError> {
    let out_dir = PathBuf::from(&config.output_dir);
    std::fs::create_dir_all(&out_dir).map_err(|source| BatchError::Output {
        path: out_dir.clone(),
        source,
    })?;
    let mut written = Vec::new();

    let script_path = out_dir.join(format!("commands_sequence_for_{name}.tsc"));
    append_blocks(&script_path, &outcome.script)?;
    written.push(script_path);

    let results_path = out_dir.join(format!("endoscope_coordinates_for_{name}.json"));
    let json = outcome.results.to_pretty_json()?;
    std::fs::write(&results_path, json).map_err(|source| BatchError::Output {
        path: results_path.clone(),
        source,
    })?;
    written.push(results_path);

    #[cfg(feature = "nc-output")]
    {
        use crate::commands::motion::PROGRAM_END;

        let nc_path = out_dir.join(format!("{name}.nc"));
        let mut file = open_append(&nc_path)?;
        for block in &outcome.motion_program {
            write!(file, "{block}").map_err(|source| BatchError::Output {
                path: nc_path.clone(),
                source,
            })?;
        }
        writeln!(file, "{PROGRAM_END}").map_err(|source| BatchError::Output {
            path: nc_path.clone(),
            source,
        })?;
        written.push(nc_path);
    }

    Ok(written)
}

fn append_blocks(path: &Path, blocks: &[CommandBlock]) -> Result<(), BatchError> {
    let mut file = open_append(path)?;
    for block in blocks {
        write!(file, "{block}").map_err(|source| BatchError::Output {
            path: path.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

fn open_append(path: &Path) -> Result<std::fs::File, BatchError> {
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| BatchError::Output {
            path: path.to_path_buf(),
            source,
        })
}

/// Counts blocks of one kind, for schedule accounting.
pub fn count_blocks(script: &[CommandBlock], kind: BlockKind) -> usize {
    script.iter().filter(|b| b.kind() == kind).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::HoleOutcome;

    fn input_with_holes(n: usize) -> InputRecordSet {
        let holes = (1..=n)
            .map(|i| {
                let id = format!("hole_{i}");
                let y = i as f64 * 40.0;
                let record = serde_json::json!({
                    "start": {"X": 0.0, "Y": y, "Z": 0.0},
                    "end": {"X": 0.0, "Y": y + 20.0, "Z": 0.0},
                });
                format!("\"{id}\": {record}")
            })
            .collect::<Vec<_>>()
            .join(",");
        let text = format!(
            r#"{{"endoscope_length": 300, "starting_height": 50, "holes": {{{holes}}}}}"#
        );
        InputRecordSet::from_str(&text).unwrap()
    }

    #[test]
    fn full_calibration_fires_before_holes_one_and_eleven() {
        let config = RigConfig::default();
        let outcome = BatchRunner::new(&config).run(&input_with_holes(11)).unwrap();

        assert_eq!(outcome.solved, 11);
        assert_eq!(count_blocks(&outcome.script, BlockKind::FullCalibration), 2);
        assert_eq!(
            count_blocks(&outcome.script, BlockKind::LightCalibration),
            11
        );
        assert_eq!(count_blocks(&outcome.script, BlockKind::Hole), 11);

        // First block of the run, then again after ten measured holes:
        // 3 blocks for hole 1, 2 for each of holes 2..=10.
        assert_eq!(outcome.script[0].kind(), BlockKind::FullCalibration);
        assert_eq!(outcome.script[21].kind(), BlockKind::FullCalibration);
    }

    #[test]
    fn ten_holes_get_a_single_full_calibration() {
        let config = RigConfig::default();
        let outcome = BatchRunner::new(&config).run(&input_with_holes(10)).unwrap();
        assert_eq!(count_blocks(&outcome.script, BlockKind::FullCalibration), 1);
        assert_eq!(
            count_blocks(&outcome.script, BlockKind::LightCalibration),
            10
        );
    }

    #[test]
    fn results_keep_input_order_and_numbering() {
        let config = RigConfig::default();
        let input = InputRecordSet::from_str(
            r#"{
                "endoscope_length": 300,
                "starting_height": 50,
                "holes": {
                    "hole_7": {"start": {"X": 0, "Y": 0, "Z": 0}, "end": {"X": 0, "Y": 20, "Z": 0}},
                    "hole_2": {"start": {"X": 0, "Y": 100, "Z": 0}, "end": {"X": 0, "Y": 120, "Z": 0}}
                }
            }"#,
        )
        .unwrap();
        let outcome = BatchRunner::new(&config).run(&input).unwrap();

        let ids: Vec<&str> = outcome
            .results
            .iter()
            .map(|(id, _)| id.as_str())
            .collect();
        assert_eq!(ids, ["hole_7", "hole_2"]);

        // Block labels carry the identifier suffix in schedule order.
        let headers: Vec<&String> = outcome
            .script
            .iter()
            .filter(|b| b.kind() == BlockKind::Hole)
            .map(|b| &b.lines()[0])
            .collect();
        assert_eq!(headers, ["// Hole 7", "// Hole 2"]);
    }

    #[test]
    fn failed_hole_is_recorded_and_skipped_by_the_schedule() {
        let config = RigConfig::default();
        let input = InputRecordSet::from_str(
            r#"{
                "endoscope_length": 300,
                "starting_height": 50,
                "holes": {
                    "hole_1": {"start": {"X": 0, "Y": 0, "Z": 0}, "end": {"X": 0, "Y": 20, "Z": 0}},
                    "hole_2": {"start": {"X": 5, "Y": 5, "Z": 5}, "end": {"X": 5, "Y": 5, "Z": 5}},
                    "hole_3": {"start": {"X": 0, "Y": 200, "Z": 0}, "end": {"X": 0, "Y": 220, "Z": 0}}
                }
            }"#,
        )
        .unwrap();
        let outcome = BatchRunner::new(&config).run(&input).unwrap();

        assert_eq!(outcome.solved, 2);
        assert_eq!(outcome.failed, 1);
        assert_eq!(count_blocks(&outcome.script, BlockKind::Hole), 2);
        assert_eq!(count_blocks(&outcome.script, BlockKind::LightCalibration), 2);

        match outcome.results.get("hole_2") {
            Some(HoleOutcome::Failed { failed }) => {
                assert!(failed.contains("degenerate"), "reason: {failed}")
            }
            other => panic!("expected failed entry for hole_2, got {other:?}"),
        }
    }

    #[test]
    fn end_to_end_scenario_matches_the_reference_geometry() {
        let config = RigConfig::default();
        let input = InputRecordSet::from_str(
            r#"{
                "endoscope_length": 300,
                "starting_height": 50,
                "holes": {
                    "hole_1": {"start": {"X": 0, "Y": 0, "Z": 0}, "end": {"X": 0, "Y": 20, "Z": 0}}
                }
            }"#,
        )
        .unwrap();
        let outcome = BatchRunner::new(&config).run(&input).unwrap();

        let Some(HoleOutcome::Solved(record)) = outcome.results.get("hole_1") else {
            panic!("expected a solved record for hole_1");
        };
        assert_eq!(record.start.position.y, -300.0);
        assert_eq!(record.start.phi, 0.0);
        assert_eq!(record.start.psi, 0.0);
        assert_eq!(record.end.y, -280.0);
    }
}
