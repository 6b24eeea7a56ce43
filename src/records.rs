//! Input and output record sets for a batch run.
//!
//! The input set maps hole identifiers to raw endpoint coordinates; the
//! output set maps the same identifiers, in the same order, to solved poses
//! rounded to 3 decimal places (or to a failure marker). serde_json runs with
//! `preserve_order`, so both sets iterate in file order.

use std::path::Path;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::Point3;
use crate::solver::Pose;

/// Rounds to 3 decimal places, the precision of every value in the output
/// artifacts and the command files.
pub fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to read input records: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed input record set: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed record for {id}: {source}")]
    MalformedHole {
        id: String,
        source: serde_json::Error,
    },
    #[error("endoscope_length must be > 0, got {0}")]
    NonPositiveLength(f64),
}

/// Raw endpoints of one hole as written in the input file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HoleRecord {
    pub start: Point3,
    pub end: Point3,
}

/// Fully validated input record set. Hole iteration order is the file's
/// insertion order, which drives numbering and emission order downstream.
#[derive(Debug, Clone)]
pub struct InputRecordSet {
    pub endoscope_length: f64,
    pub starting_height: f64,
    pub holes: Vec<(String, HoleRecord)>,
}

#[derive(Debug, Deserialize)]
struct RawInput {
    endoscope_length: f64,
    starting_height: f64,
    holes: serde_json::Map<String, serde_json::Value>,
}

impl InputRecordSet {
    /// Parses and shape-checks every hole record up front; any malformed
    /// record fails the whole set before a single hole is processed.
    pub fn from_str(text: &str) -> Result<Self, InputError> {
        let raw: RawInput = serde_json::from_str(text)?;
        if raw.endoscope_length <= 0.0 {
            return Err(InputError::NonPositiveLength(raw.endoscope_length));
        }
        let mut holes = Vec::with_capacity(raw.holes.len());
        for (id, value) in raw.holes {
            let record: HoleRecord = serde_json::from_value(value)
                .map_err(|source| InputError::MalformedHole {
                    id: id.clone(),
                    source,
                })?;
            holes.push((id, record));
        }
        Ok(Self {
            endoscope_length: raw.endoscope_length,
            starting_height: raw.starting_height,
            holes,
        })
    }

    pub fn load(path: &Path) -> Result<Self, InputError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            tracing::error!("failed to read input file '{}': {}", path.display(), e);
            e
        })?;
        Self::from_str(&text)
    }
}

/// One hole's solved start and end poses. Produced once per hole per batch
/// run; never mutated after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct HoleSolution {
    pub id: String,
    pub start: Pose,
    pub end: Pose,
}

impl HoleSolution {
    pub fn new(id: impl Into<String>, start: Pose, end: Pose) -> Self {
        Self {
            id: id.into(),
            start,
            end,
        }
    }

    /// Rounds every coordinate and angle to 3 decimal places.
    pub fn rounded(mut self) -> Self {
        for pose in [&mut self.start, &mut self.end] {
            pose.position = Point3::new(
                round3(pose.position.x),
                round3(pose.position.y),
                round3(pose.position.z),
            );
            pose.azimuth = pose.azimuth.map(round3);
            pose.elevation = pose.elevation.map(round3);
        }
        self
    }
}

#[derive(Debug, Error)]
#[error("start pose for {0} is missing orientation angles")]
pub struct MissingOrientation(pub String);

/// Start-pose record: position plus the two tilt angles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StartPoseRecord {
    #[serde(flatten)]
    pub position: Point3,
    pub phi: f64,
    pub psi: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolutionRecord {
    pub start: StartPoseRecord,
    pub end: Point3,
}

impl SolutionRecord {
    pub fn from_solution(solution: &HoleSolution) -> Result<Self, MissingOrientation> {
        let (Some(phi), Some(psi)) = (solution.start.azimuth, solution.start.elevation) else {
            return Err(MissingOrientation(solution.id.clone()));
        };
        Ok(Self {
            start: StartPoseRecord {
                position: solution.start.position,
                phi,
                psi,
            },
            end: solution.end.position,
        })
    }
}

/// Per-hole output entry: the solved record, or a failure marker so the hole
/// is never silently omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HoleOutcome {
    Solved(SolutionRecord),
    Failed { failed: String },
}

/// Ordered results record set, keyed by hole identifier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputRecordSet {
    entries: Vec<(String, HoleOutcome)>,
}

impl OutputRecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_solution(&mut self, solution: &HoleSolution) -> Result<(), MissingOrientation> {
        let record = SolutionRecord::from_solution(solution)?;
        self.push_record(solution.id.clone(), record);
        Ok(())
    }

    pub fn push_record(&mut self, id: impl Into<String>, record: SolutionRecord) {
        self.entries.push((id.into(), HoleOutcome::Solved(record)));
    }

    pub fn push_failed(&mut self, id: impl Into<String>, reason: impl Into<String>) {
        self.entries.push((
            id.into(),
            HoleOutcome::Failed {
                failed: reason.into(),
            },
        ));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, HoleOutcome)> {
        self.entries.iter()
    }

    pub fn get(&self, id: &str) -> Option<&HoleOutcome> {
        self.entries
            .iter()
            .find_map(|(k, v)| (k == id).then_some(v))
    }

    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl Serialize for OutputRecordSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, outcome) in &self.entries {
            map.serialize_entry(id, outcome)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for OutputRecordSet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Map::deserialize(deserializer)?;
        let mut entries = Vec::with_capacity(raw.len());
        for (id, value) in raw {
            let outcome = serde_json::from_value(value).map_err(serde::de::Error::custom)?;
            entries.push((id, outcome));
        }
        Ok(Self { entries })
    }
}
