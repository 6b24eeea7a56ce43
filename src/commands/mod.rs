//! Command-sequence generation for the positioning rig.
//!
//! Two textual dialects are produced per hole: an absolute-coordinate motion
//! program (`motion`) and a terminal macro/delay script (`terminal`), plus the
//! two static calibration templates (`calibration`). Blocks are immutable once
//! built; the batch runner owns their ordering.

use std::fmt;

use crate::config::RigConfig;
use crate::records::SolutionRecord;

pub mod calibration;
pub mod motion;
pub mod terminal;

/// What a block is, so the batch runner and tests can account for the
/// calibration schedule without re-parsing command text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    FullCalibration,
    LightCalibration,
    Hole,
}

/// Ordered sequence of command lines in one dialect.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandBlock {
    kind: BlockKind,
    lines: Vec<String>,
}

impl CommandBlock {
    pub fn new(kind: BlockKind, lines: Vec<String>) -> Self {
        Self { kind, lines }
    }

    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl fmt::Display for CommandBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

/// Builds both per-hole dialect blocks for one solved hole.
pub struct CommandSequenceBuilder<'a> {
    record: &'a SolutionRecord,
    label: &'a str,
    travel_height: f64,
    config: &'a RigConfig,
}

impl<'a> CommandSequenceBuilder<'a> {
    pub fn new(
        record: &'a SolutionRecord,
        label: &'a str,
        travel_height: f64,
        config: &'a RigConfig,
    ) -> Self {
        Self {
            record,
            label,
            travel_height,
            config,
        }
    }

    /// Absolute-coordinate motion program block (`.nc` dialect).
    pub fn motion_block(&self) -> CommandBlock {
        motion::build(self.record, self.label, self.travel_height, self.config)
    }

    /// Terminal macro/delay script block.
    pub fn terminal_block(&self) -> CommandBlock {
        terminal::build(self.record, self.label, self.travel_height, self.config)
    }
}

/// Separator line closing every terminal-dialect block.
pub(crate) const SEPARATOR: &str = "// .........................................................";

pub(crate) fn macro_line(command: impl fmt::Display) -> String {
    format!("ComSendmacro('{command}$0A');")
}

pub(crate) fn delay_line(ms: u32) -> String {
    format!("Delay({ms});")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macro_line_wraps_the_terminal_envelope() {
        assert_eq!(
            macro_line("G1 Z50 F2000"),
            "ComSendmacro('G1 Z50 F2000$0A');"
        );
        assert_eq!(delay_line(3000), "Delay(3000);");
    }

    #[test]
    fn display_terminates_every_line() {
        let block = CommandBlock::new(
            BlockKind::Hole,
            vec!["G90 G21".to_string(), "G69".to_string()],
        );
        assert_eq!(block.to_string(), "G90 G21\nG69\n");
    }
}
