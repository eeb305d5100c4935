//! Haas post-processor
//!
//! Haas is Fanuc-compatible with Haas-specific extensions: `%` tape markers
//! around the program and `G43 H` tool length compensation after each change.

use crate::codegen::Result;
use crate::context::{MachiningContext, SpindleDirection};
use crate::format::fixed;
use crate::post::{comment_text, header_lines, PostProcessor, ToolSelection};

pub struct HaasPost;

const DWELL_DECIMALS: usize = 2;

impl HaasPost {
    fn z(ctx: &MachiningContext, field: &'static str, z: f64) -> Result<String> {
        Ok(format!("Z{}", fixed(field, z, ctx.coords_decimals)?))
    }
}

impl PostProcessor for HaasPost {
    fn name(&self) -> &str {
        "Haas"
    }

    fn supports_line_numbers(&self) -> bool {
        true
    }

    fn step_scale(&self) -> Option<f64> {
        None
    }

    fn comment(&self, text: &str) -> String {
        format!("({})", comment_text(text, true))
    }

    fn start_code(&self, ctx: &MachiningContext) -> Result<String> {
        let mut lines = vec!["%".to_string()];
        if ctx.include_header {
            lines.push(self.comment("HAAS CNC PROGRAM"));
            for line in header_lines(ctx, self.name())? {
                lines.push(if line.is_empty() { line } else { self.comment(&line) });
            }
            lines.push(String::new());
        }
        lines.push(ctx.units.gcode().to_string());
        lines.push("G17".to_string());
        lines.push("G40".to_string());
        lines.push("G49".to_string());
        lines.push("G80".to_string());
        lines.push("G90".to_string());
        lines.push("G94".to_string());
        lines.push("G98".to_string());
        Ok(lines.join("\n"))
    }

    fn startz_code(&self, ctx: &MachiningContext) -> Result<String> {
        match ctx.startz {
            Some(z) => Ok(format!("G00 {}", Self::z(ctx, "startz", z)?)),
            None => Ok(String::new()),
        }
    }

    fn lift_code(&self, ctx: &MachiningContext) -> Result<String> {
        Ok(format!("G00 {}", Self::z(ctx, "z_move", ctx.z_move)?))
    }

    fn down_code(&self, ctx: &MachiningContext, z: f64) -> Result<String> {
        Ok(format!(
            "G01 {} F{}",
            Self::z(ctx, "z_cut", z)?,
            fixed("z_feedrate", ctx.z_feedrate, ctx.feedrate_decimals)?
        ))
    }

    fn toolchange_code(&self, ctx: &MachiningContext, tool: &ToolSelection) -> Result<String> {
        let mut lines = vec![
            "M05".to_string(),
            format!("G00 {}", Self::z(ctx, "z_toolchange", ctx.z_toolchange)?),
        ];
        if let Some(p) = ctx.toolchange_xy {
            lines.push(self.rapid_code(ctx, p.x, p.y)?);
        }
        lines.push(format!("T{} M06", tool.tool_id));
        lines.push(self.comment(&format!(
            "TOOL DIA {}",
            fixed("tool_diameter", tool.diameter, ctx.coords_decimals)?
        )));
        if let Some(note) = tool.drill_count_note(ctx) {
            lines.push(self.comment(&note));
        }
        lines.push(format!("G43 H{:02}", tool.tool_id));
        if ctx.fast_plunge {
            lines.push(self.lift_code(ctx)?);
        }
        Ok(lines.join("\n"))
    }

    fn up_to_zero_code(&self, ctx: &MachiningContext) -> Result<String> {
        Ok(format!("G00 Z{}", fixed("z", 0.0, ctx.coords_decimals)?))
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
        let mut lines = vec![format!("G00 {}", Self::z(ctx, "z_end", z_end)?), "M05".to_string()];
        if let Some(p) = ctx.toolchange_xy {
            lines.push(self.rapid_code(ctx, p.x, p.y)?);
        }
        lines.push("M30".to_string());
        lines.push("%".to_string());
        Ok(lines.join("\n"))
    }

    fn feedrate_code(&self, ctx: &MachiningContext) -> Result<String> {
        Ok(format!("F{}", fixed("feedrate", ctx.feedrate, ctx.feedrate_decimals)?))
    }

    fn z_feedrate_code(&self, ctx: &MachiningContext) -> Result<String> {
        Ok(format!("F{}", fixed("z_feedrate", ctx.z_feedrate, ctx.feedrate_decimals)?))
    }

    fn spindle_code(&self, ctx: &MachiningContext) -> Result<String> {
        let word = match ctx.spindle_direction {
            SpindleDirection::CW => "M03",
            SpindleDirection::CCW => "M04",
        };
        Ok(match ctx.spindle_speed {
            Some(rpm) => format!("S{} {}", rpm, word),
            None => word.to_string(),
        })
    }

    fn dwell_code(&self, ctx: &MachiningContext) -> Result<String> {
        match (ctx.dwell_enabled, ctx.dwell_time) {
            (true, Some(t)) => Ok(format!("G04 P{}", fixed("dwell_time", t, DWELL_DECIMALS)?)),
            _ => Ok(String::new()),
        }
    }

    fn spindle_stop_code(&self, _ctx: &MachiningContext) -> Result<String> {
        Ok("M05".to_string())
    }
}
