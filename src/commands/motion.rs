//! Motion-dialect block: absolute metric coordinates with working-frame
//! rotations about the hole entry point.

use crate::config::RigConfig;
use crate::records::SolutionRecord;

use super::{BlockKind, CommandBlock};

/// Program-end marker appended once per emitted motion program.
pub const PROGRAM_END: &str = "M30";

pub fn build(
    record: &SolutionRecord,
    label: &str,
    travel_height: f64,
    config: &RigConfig,
) -> CommandBlock {
    let start = record.start.position;
    let end = record.end;
    let feeds = &config.feeds;

    let lines = vec![
        format!("(Hole {label})"),
        // Absolute positioning, metric units.
        "G90 G21".to_string(),
        format!(
            "G0 X{} Y{} Z{} F{}",
            start.x, start.y, travel_height, feeds.rapid
        ),
        // Rotate the working frame about the entry point: azimuth in the
        // X-Y plane, elevation in the Z-X plane.
        "G17".to_string(),
        format!("G68 X{} Y{} R{}", start.x, start.y, record.start.phi),
        "G18".to_string(),
        format!("G68 X{} Z{} R{}", start.x, start.z, record.start.psi),
        format!(
            "G0 X{} Y{} Z{} F{}",
            start.x, start.y, start.z, feeds.rapid
        ),
        format!("G1 X{} Y{} Z{} F{}", end.x, end.y, end.z, feeds.traverse),
        format!(
            "G1 X{} Y{} Z{} F{}",
            start.x, start.y, start.z, feeds.rapid
        ),
        // Cancel the frame rotation.
        "G69".to_string(),
    ];
    CommandBlock::new(BlockKind::Hole, lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point3;
    use crate::records::StartPoseRecord;

    fn sample_record() -> SolutionRecord {
        SolutionRecord {
            start: StartPoseRecord {
                position: Point3::new(0.0, -300.0, 0.0),
                phi: 0.0,
                psi: 0.0,
            },
            end: Point3::new(0.0, -280.0, 0.0),
        }
    }

    #[test]
    fn block_brackets_moves_with_frame_rotation() {
        let config = RigConfig::default();
        let block = build(&sample_record(), "1", 50.0, &config);
        let lines = block.lines();

        assert_eq!(lines[0], "(Hole 1)");
        assert_eq!(lines[1], "G90 G21");
        assert_eq!(lines[2], "G0 X0 Y-300 Z50 F300");
        assert_eq!(lines[4], "G68 X0 Y-300 R0");
        assert_eq!(lines[8], "G1 X0 Y-280 Z0 F100");
        assert_eq!(lines.last().unwrap(), "G69");
    }

    #[test]
    fn traverse_and_return_use_distinct_feeds() {
        let config = RigConfig::default();
        let block = build(&sample_record(), "1", 50.0, &config);
        let traverse = &block.lines()[8];
        let ret = &block.lines()[9];
        assert!(traverse.ends_with("F100"), "traverse line: {traverse}");
        assert!(ret.ends_with("F300"), "return line: {ret}");
    }
}
