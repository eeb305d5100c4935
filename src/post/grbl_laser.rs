//! GRBL laser post-processor
//!
//! Output for almost any Grbl version driving a laser head. The laser is
//! switched with the spindle words, so "down" turns the beam on and "lift"
//! turns it off; there is no Z axis to move and no tool changer.

use crate::codegen::Result;
use crate::context::{MachiningContext, SpindleDirection};
use crate::format::fixed;
use crate::post::{comment_text, preprocessor_line, range_lines, PostProcessor, ToolSelection};

pub struct GrblLaserPost;

const DWELL_DECIMALS: usize = 2;

impl PostProcessor for GrblLaserPost {
    fn name(&self) -> &str {
        "GRBL Laser"
    }

    fn supports_line_numbers(&self) -> bool {
        false
    }

    fn step_scale(&self) -> Option<f64> {
        None
    }

    fn comment(&self, text: &str) -> String {
        format!("({})", comment_text(text, true))
    }

    fn start_code(&self, ctx: &MachiningContext) -> Result<String> {
        let units = ctx.units.suffix();
        let fd = ctx.feedrate_decimals;
        let mut lines = Vec::new();

        if ctx.include_header {
            lines.push(self.comment(&format!(
                "Feedrate: {} {}/min",
                fixed("feedrate", ctx.feedrate, fd)?,
                units
            )));
            lines.push(self.comment(&format!(
                "Feedrate rapids {} {}/min",
                fixed("feedrate_rapid", ctx.feedrate_rapid, fd)?,
                units
            )));
            lines.push(String::new());
            if let Some(passes) = ctx.pass_count() {
                lines.push(self.comment(&format!("Passes: {}", passes)));
            }
            lines.push(self.comment(&format!("Steps per circle: {}", ctx.steps_per_circle)));
            lines.push(self.comment(&preprocessor_line(ctx, self.name())));
            lines.push(String::new());
            for range in range_lines(ctx)? {
                lines.push(self.comment(&range));
            }
            lines.push(String::new());
        }

        lines.push(ctx.units.gcode().to_string());
        lines.push("G90".to_string());
        lines.push("G17".to_string());
        lines.push("G94".to_string());
        Ok(lines.join("\n"))
    }

    fn startz_code(&self, _ctx: &MachiningContext) -> Result<String> {
        // no Z axis on a laser
        Ok(String::new())
    }

    fn lift_code(&self, _ctx: &MachiningContext) -> Result<String> {
        Ok("M05 S0".to_string())
    }

    fn down_code(&self, ctx: &MachiningContext, _z: f64) -> Result<String> {
        Ok(match ctx.spindle_speed {
            Some(power) => format!("M03 S{}", power),
            None => "M03".to_string(),
        })
    }

    fn toolchange_code(&self, ctx: &MachiningContext, tool: &ToolSelection) -> Result<String> {
        let mut lines = vec![self.comment(&format!(
            "Tool Dia = {} {}",
            fixed("tool_diameter", tool.diameter, ctx.coords_decimals)?,
            ctx.units.suffix()
        ))];
        if let Some(note) = tool.drill_count_note(ctx) {
            lines.push(self.comment(&note));
        }
        Ok(lines.join("\n"))
    }

    fn up_to_zero_code(&self, _ctx: &MachiningContext) -> Result<String> {
        Ok("M05".to_string())
    }

    fn position_code(&self, ctx: &MachiningContext, x: f64, y: f64) -> Result<String> {
        Ok(format!(
            "X{} Y{}",
            fixed("x", x, ctx.coords_decimals)?,
            fixed("y", y, ctx.coords_decimals)?
        ))
    }

    fn rapid_code(&self, ctx: &MachiningContext, x: f64, y: f64) -> Result<String> {
        Ok(format!("G00 {}", self.position_code(ctx, x, y)?))
    }

    fn linear_code(&self, ctx: &MachiningContext, x: f64, y: f64) -> Result<String> {
        Ok(format!(
            "G01 {} F{}",
            self.position_code(ctx, x, y)?,
            fixed("feedrate", ctx.feedrate, ctx.feedrate_decimals)?
        ))
    }

    fn end_code(&self, ctx: &MachiningContext) -> Result<String> {
        let z_end = ctx.z_end.unwrap_or(ctx.z_move);
        let mut lines = vec![format!("G00 Z{}", fixed("z_end", z_end, ctx.coords_decimals)?)];
        if let Some(p) = ctx.toolchange_xy {
            lines.push(self.rapid_code(ctx, p.x, p.y)?);
        }
        Ok(lines.join("\n"))
    }

    fn feedrate_code(&self, ctx: &MachiningContext) -> Result<String> {
        Ok(format!("G01 F{}", fixed("feedrate", ctx.feedrate, ctx.feedrate_decimals)?))
    }

    fn z_feedrate_code(&self, ctx: &MachiningContext) -> Result<String> {
        Ok(format!("G01 F{}", fixed("z_feedrate", ctx.z_feedrate, ctx.feedrate_decimals)?))
    }

    fn spindle_code(&self, ctx: &MachiningContext) -> Result<String> {
        let word = match ctx.spindle_direction {
            SpindleDirection::CW => "M03",
            SpindleDirection::CCW => "M04",
        };
        Ok(match ctx.spindle_speed {
            Some(power) => format!("{} S{}", word, power),
            None => word.to_string(),
        })
    }

    fn dwell_code(&self, ctx: &MachiningContext) -> Result<String> {
        match (ctx.dwell_enabled, ctx.dwell_time) {
            (true, Some(t)) => Ok(format!("G4 P{}", fixed("dwell_time", t, DWELL_DECIMALS)?)),
            _ => Ok(String::new()),
        }
    }

    fn spindle_stop_code(&self, _ctx: &MachiningContext) -> Result<String> {
        Ok("M05".to_string())
    }
}
