//! Terminal-dialect block: `ComSendmacro`/`Delay` lines that orient the
//! rotary head, then position the probe over the hole entry.

use crate::config::RigConfig;
use crate::records::SolutionRecord;

use super::{BlockKind, CommandBlock, SEPARATOR, delay_line, macro_line};

pub fn build(
    record: &SolutionRecord,
    label: &str,
    travel_height: f64,
    config: &RigConfig,
) -> CommandBlock {
    let start = record.start.position;
    let feeds = &config.feeds;
    let delays = &config.delays;

    let mut lines = vec![
        format!("// Hole {label}"),
        "// Lift to travel height".to_string(),
        macro_line(format_args!(
            "G1 Z{} F{}",
            travel_height, feeds.vertical
        )),
        "// Point the lens straight down".to_string(),
        macro_line(format_args!(
            "G1 Q{} F{}",
            config.terminal.lens_down_angle, feeds.rotary
        )),
        delay_line(delays.settle_ms),
        "// Azimuth axis".to_string(),
        macro_line(format_args!("G1 W{} F{}", record.start.phi, feeds.rotary)),
        delay_line(delays.settle_ms),
        "// Elevation axis".to_string(),
        macro_line(format_args!("G1 Q{} F{}", record.start.psi, feeds.rotary)),
        delay_line(delays.settle_ms),
        "// Move over the hole entry".to_string(),
        macro_line(format_args!(
            "G1 X{} Y{} F{}",
            start.x, start.y, feeds.lateral
        )),
        macro_line(format_args!("G1 Z{} F{}", start.z, feeds.vertical)),
        delay_line(delays.position_ms),
    ];

    if config.terminal.emit_traversal {
        let end = record.end;
        lines.push("// Traverse to the exit pose and return".to_string());
        lines.push(macro_line(format_args!(
            "G1 X{} Y{} F{}",
            end.x, end.y, feeds.lateral
        )));
        lines.push(macro_line(format_args!("G1 Z{} F{}", end.z, feeds.vertical)));
        lines.push(macro_line(format_args!(
            "G1 X{} Y{} F{}",
            start.x, start.y, feeds.lateral
        )));
        lines.push(macro_line(format_args!(
            "G1 Z{} F{}",
            start.z, feeds.vertical
        )));
    }

    lines.push(SEPARATOR.to_string());
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
                position: Point3::new(12.5, -7.0, 3.0),
                phi: 45.0,
                psi: -10.5,
            },
            end: Point3::new(14.0, -4.0, 3.0),
        }
    }

    #[test]
    fn block_orients_then_positions() {
        let config = RigConfig::default();
        let block = build(&sample_record(), "3", 50.0, &config);
        let lines = block.lines();

        assert_eq!(lines[0], "// Hole 3");
        assert_eq!(lines[2], "ComSendmacro('G1 Z50 F2000$0A');");
        assert_eq!(lines[4], "ComSendmacro('G1 Q-91 F2000$0A');");
        assert_eq!(lines[7], "ComSendmacro('G1 W45 F2000$0A');");
        assert_eq!(lines[10], "ComSendmacro('G1 Q-10.5 F2000$0A');");
        assert_eq!(lines[13], "ComSendmacro('G1 X12.5 Y-7 F200$0A');");
        assert_eq!(lines[14], "ComSendmacro('G1 Z3 F2000$0A');");
        assert_eq!(lines[15], "Delay(5000);");
        assert_eq!(lines.last().unwrap(), SEPARATOR);
    }

    #[test]
    fn settle_delays_follow_every_rotary_move() {
        let config = RigConfig::default();
        let block = build(&sample_record(), "3", 50.0, &config);
        let delays = block
            .lines()
            .iter()
            .filter(|l| l.starts_with("Delay("))
            .count();
        assert_eq!(delays, 4);
    }

    #[test]
    fn traversal_block_is_off_by_default_and_toggleable() {
        let mut config = RigConfig::default();
        let without = build(&sample_record(), "3", 50.0, &config);
        assert!(!without.lines().iter().any(|l| l.contains("X14")));

        config.terminal.emit_traversal = true;
        let with = build(&sample_record(), "3", 50.0, &config);
        assert!(with.lines().iter().any(|l| l.contains("G1 X14 Y-4")));
        assert_eq!(with.lines().len(), without.lines().len() + 5);
    }
}
