//! Static calibration templates. Parameterized only by the fixed device
//! offsets in [`CalibrationConfig`]; nothing here is derived per hole.
//!
//! Homing drives an axis into its limit switch with an overshoot command
//! (`O` suffix zeroes the counter on contact), then the axis is moved to a
//! known reference offset and `G10` re-zeroes the frame there.

use crate::config::RigConfig;

use super::{BlockKind, CommandBlock, SEPARATOR, delay_line, macro_line};

/// Homing sequence for the two rotary axes (Q, W).
pub fn light_calibration(config: &RigConfig) -> CommandBlock {
    let cal = &config.calibration;
    let delays = &config.delays;

    let lines = vec![
        "// CALIBRATION (Q W)".to_string(),
        "// Park at the frame origin".to_string(),
        macro_line("G1 X0 Y0 Z0"),
        delay_line(delays.light_park_ms),
        "// Drive the rotary axes into the limit switches, zero the counters".to_string(),
        macro_line(format_args!("G1 Q{} O", cal.rotary_overshoot)),
        macro_line(format_args!("G1 W{} O", cal.rotary_overshoot)),
        delay_line(delays.light_step_ms),
        "// Back off and home a second time".to_string(),
        macro_line(format_args!("G1 Q{}", cal.rotary_sweep)),
        macro_line(format_args!("G1 W{}", cal.rotary_sweep)),
        delay_line(delays.light_step_ms),
        macro_line(format_args!("G1 Q{} O", cal.rotary_overshoot)),
        macro_line(format_args!("G1 W{} O", cal.rotary_overshoot)),
        delay_line(delays.light_step_ms),
        "// Reference angles".to_string(),
        macro_line(format_args!("G1 Q{}", cal.rotary_reference_q)),
        macro_line(format_args!("G1 W{}", cal.rotary_reference_w)),
        delay_line(delays.light_step_ms),
        "// Zero the reference position".to_string(),
        macro_line("G10"),
        SEPARATOR.to_string(),
    ];
    CommandBlock::new(BlockKind::LightCalibration, lines)
}

/// Homing sequence for the three linear axes (X, Y, Z).
pub fn full_calibration(config: &RigConfig) -> CommandBlock {
    let cal = &config.calibration;
    let delays = &config.delays;

    let lines = vec![
        "// CALIBRATION (X Y Z)".to_string(),
        "// Drive the linear axes into the limit switches, zero the counters".to_string(),
        macro_line(format_args!("G1 Z{} O", cal.linear_overshoot_z)),
        delay_line(delays.full_step_ms),
        macro_line(format_args!("G1 Y{} O", cal.linear_overshoot_y)),
        delay_line(delays.full_step_ms),
        macro_line(format_args!("G1 X{} O", cal.linear_overshoot_x)),
        delay_line(delays.full_step_ms),
        "// Reference offsets".to_string(),
        macro_line(format_args!("G1 Z{}", cal.linear_reference_z)),
        delay_line(delays.full_step_ms),
        macro_line(format_args!("G1 Y{}", cal.linear_reference_y)),
        delay_line(delays.full_step_ms),
        macro_line(format_args!("G1 X{}", cal.linear_reference_x)),
        delay_line(delays.full_step_ms),
        "// Zero the reference position".to_string(),
        macro_line("G10"),
        SEPARATOR.to_string(),
    ];
    CommandBlock::new(BlockKind::FullCalibration, lines)
}
