// borescope-rig: offline pose solving and command generation for a
// borescope positioning rig.

pub mod batch;
pub mod commands;
pub mod config;
pub mod geometry;
pub mod records;
pub mod solver;

// --- Flat re-exports for the common surface ---

pub use batch::{BatchError, BatchOutcome, BatchRunner, write_artifacts};
pub use commands::{BlockKind, CommandBlock, CommandSequenceBuilder};
pub use config::{ConfigError, RigConfig};
pub use geometry::{HoleGeometry, Point3};
pub use records::{HoleSolution, InputError, InputRecordSet, OutputRecordSet};
pub use solver::validate::{Uniqueness, check_uniqueness};
pub use solver::{Pose, PoseSolver, ProbeConfig, SolveError, SolverStrategy};
