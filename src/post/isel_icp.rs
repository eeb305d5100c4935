//! ISEL ICP CNC post-processor
//!
//! Industrial router motion language. Positions and times are machine steps:
//! every value is scaled by 1000 and truncated, so no decimal point ever
//! reaches the controller. Velocities are given in µm/s.

use crate::codegen::Result;
use crate::context::{MachiningContext, SpindleDirection};
use crate::format::{fixed, scaled};
use crate::post::{comment_text, header_lines, PostProcessor, ToolSelection};

pub struct IselIcpPost;

/// Units to machine steps
const STEPS: f64 = 1000.0;

impl IselIcpPost {
    fn steps(field: &'static str, value: f64) -> Result<String> {
        Ok(scaled(field, value, STEPS)?)
    }

    /// Feed in units/min to controller velocity in steps/s
    fn velocity(field: &'static str, per_minute: f64) -> Result<String> {
        Ok(scaled(field, per_minute / 60.0, STEPS)?)
    }
}

impl PostProcessor for IselIcpPost {
    fn name(&self) -> &str {
        "ISEL ICP CNC"
    }

    fn supports_line_numbers(&self) -> bool {
        false
    }

    fn step_scale(&self) -> Option<f64> {
        Some(STEPS)
    }

    fn comment(&self, text: &str) -> String {
        format!("; {}", comment_text(text, false))
    }

    fn start_code(&self, ctx: &MachiningContext) -> Result<String> {
        let mut lines = Vec::new();
        if ctx.include_header {
            lines.push(self.comment("This program is for an ISEL ICP CNC router."));
            lines.push(String::new());
        }
        lines.push("IMF_PBL kerf".to_string());
        if ctx.include_header {
            lines.push(String::new());
            for line in header_lines(ctx, self.name())? {
                lines.push(if line.is_empty() { line } else { self.comment(&line) });
            }
        }
        Ok(lines.join("\n"))
    }

    fn startz_code(&self, ctx: &MachiningContext) -> Result<String> {
        match ctx.startz {
            Some(z) => Ok(format!("FASTABS Z{}", Self::steps("startz", z)?)),
            None => Ok(String::new()),
        }
    }

    fn lift_code(&self, ctx: &MachiningContext) -> Result<String> {
        Ok(format!("FASTABS Z{}", Self::steps("z_move", ctx.z_move)?))
    }

    fn down_code(&self, _ctx: &MachiningContext, z: f64) -> Result<String> {
        Ok(format!("MOVEABS Z{}", Self::steps("z_cut", z)?))
    }

    fn toolchange_code(&self, ctx: &MachiningContext, tool: &ToolSelection) -> Result<String> {
        let mut lines = vec![
            format!("GETTOOL {}", tool.tool_id),
            self.comment(&format!(
                "Changed to Tool Dia = {}",
                fixed("tool_diameter", tool.diameter, ctx.coords_decimals)?
            )),
        ];
        if let Some(note) = tool.drill_count_note(ctx) {
            lines.push(self.comment(&note));
        }
        if ctx.fast_plunge {
            lines.push(self.lift_code(ctx)?);
        }
        Ok(lines.join("\n"))
    }

    fn up_to_zero_code(&self, _ctx: &MachiningContext) -> Result<String> {
        Ok("MOVEABS Z0".to_string())
    }

    fn position_code(&self, _ctx: &MachiningContext, x: f64, y: f64) -> Result<String> {
        Ok(format!("X{} Y{}", Self::steps("x", x)?, Self::steps("y", y)?))
    }

    fn rapid_code(&self, ctx: &MachiningContext, x: f64, y: f64) -> Result<String> {
        Ok(format!("FASTABS {}", self.position_code(ctx, x, y)?))
    }

    /// Feed comes from the modal `VEL` set by `feedrate_code`.
    fn linear_code(&self, ctx: &MachiningContext, x: f64, y: f64) -> Result<String> {
        Ok(format!("MOVEABS {}", self.position_code(ctx, x, y)?))
    }

    fn end_code(&self, ctx: &MachiningContext) -> Result<String> {
        let mut lines = vec![
            "WPCLEAR".to_string(),
            format!("FASTABS Z{}", Self::steps("z_end", ctx.z_end.unwrap_or(0.0))?),
        ];
        if let Some(p) = ctx.toolchange_xy {
            lines.push(self.rapid_code(ctx, p.x, p.y)?);
        }
        lines.push("PROGEND".to_string());
        Ok(lines.join("\n"))
    }

    fn feedrate_code(&self, ctx: &MachiningContext) -> Result<String> {
        Ok(format!("VEL {}", Self::velocity("feedrate", ctx.feedrate)?))
    }

    fn z_feedrate_code(&self, ctx: &MachiningContext) -> Result<String> {
        Ok(format!("VEL {}", Self::velocity("z_feedrate", ctx.z_feedrate)?))
    }

    fn spindle_code(&self, ctx: &MachiningContext) -> Result<String> {
        let sdir = match ctx.spindle_direction {
            SpindleDirection::CW => "SPINDLE CW",
            SpindleDirection::CCW => "SPINDLE CCW",
        };
        Ok(match ctx.spindle_speed {
            Some(rpm) => format!("{} RPM{}", sdir, rpm),
            None => sdir.to_string(),
        })
    }

    fn dwell_code(&self, ctx: &MachiningContext) -> Result<String> {
        match (ctx.dwell_enabled, ctx.dwell_time) {
            (true, Some(t)) => Ok(format!("WAIT {}", Self::steps("dwell_time", t)?)),
            _ => Ok(String::new()),
        }
    }

    fn spindle_stop_code(&self, _ctx: &MachiningContext) -> Result<String> {
        Ok("SPINDLE OFF".to_string())
    }
}
