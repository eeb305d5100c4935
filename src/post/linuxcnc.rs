//! LinuxCNC post-processor
//!
//! LinuxCNC is mostly Fanuc-compatible. Tool changes apply the tool length
//! offset in the same block.

use crate::codegen::Result;
use crate::context::{MachiningContext, SpindleDirection};
use crate::format::fixed;
use crate::post::{comment_text, header_lines, PostProcessor, ToolSelection};

pub struct LinuxCncPost;

const DWELL_DECIMALS: usize = 2;

fn z_word(ctx: &MachiningContext, field: &'static str, z: f64) -> Result<String> {
    Ok(format!("Z{}", fixed(field, z, ctx.coords_decimals)?))
}

impl PostProcessor for LinuxCncPost {
    fn name(&self) -> &str {
        "LinuxCNC"
    }

    fn supports_line_numbers(&self) -> bool {
        true
    }

    fn step_scale(&self) -> Option<f64> {
        None
    }

    fn comment(&self, text: &str) -> String {
        format!("; {}", comment_text(text, false))
    }

    fn start_code(&self, ctx: &MachiningContext) -> Result<String> {
        let mut lines = Vec::new();
        if ctx.include_header {
            lines.push(self.comment("LinuxCNC compatible output"));
            for line in header_lines(ctx, self.name())? {
                lines.push(if line.is_empty() { line } else { self.comment(&line) });
            }
            lines.push(String::new());
        }
        lines.push(format!("{} ; {}", ctx.units.gcode(), ctx.units.suffix()));
        lines.push("G17 ; XY plane".to_string());
        lines.push("G40 ; Cancel cutter comp".to_string());
        lines.push("G49 ; Cancel tool length comp".to_string());
        lines.push("G80 ; Cancel canned cycles".to_string());
        lines.push("G90 ; Absolute positioning".to_string());
        lines.push("G94 ; Feed per minute".to_string());
        Ok(lines.join("\n"))
    }

    fn startz_code(&self, ctx: &MachiningContext) -> Result<String> {
        match ctx.startz {
            Some(z) => Ok(format!("G0 {}", z_word(ctx, "startz", z)?)),
            None => Ok(String::new()),
        }
    }

    fn lift_code(&self, ctx: &MachiningContext) -> Result<String> {
        Ok(format!("G0 {}", z_word(ctx, "z_move", ctx.z_move)?))
    }

    fn down_code(&self, ctx: &MachiningContext, z: f64) -> Result<String> {
        Ok(format!("G1 {}", z_word(ctx, "z_cut", z)?))
    }

    fn toolchange_code(&self, ctx: &MachiningContext, tool: &ToolSelection) -> Result<String> {
        let mut lines = vec![format!("G0 {}", z_word(ctx, "z_toolchange", ctx.z_toolchange)?)];
        if let Some(p) = ctx.toolchange_xy {
            lines.push(self.rapid_code(ctx, p.x, p.y)?);
        }
        lines.push(format!("T{} M6 G43", tool.tool_id));
        lines.push(self.comment(&format!(
            "Tool Dia = {}",
            fixed("tool_diameter", tool.diameter, ctx.coords_decimals)?
        )));
        if let Some(note) = tool.drill_count_note(ctx) {
            lines.push(self.comment(&note));
        }
        if ctx.fast_plunge {
            lines.push(self.lift_code(ctx)?);
        }
        Ok(lines.join("\n"))
    }

    fn up_to_zero_code(&self, ctx: &MachiningContext) -> Result<String> {
        Ok(format!("G1 Z{}", fixed("z", 0.0, ctx.coords_decimals)?))
    }

    fn position_code(&self, ctx: &MachiningContext, x: f64, y: f64) -> Result<String> {
        Ok(format!(
            "X{} Y{}",
            fixed("x", x, ctx.coords_decimals)?,
            fixed("y", y, ctx.coords_decimals)?
        ))
    }

    fn rapid_code(&self, ctx: &MachiningContext, x: f64, y: f64) -> Result<String> {
        Ok(format!("G0 {}", self.position_code(ctx, x, y)?))
    }

    fn linear_code(&self, ctx: &MachiningContext, x: f64, y: f64) -> Result<String> {
        Ok(format!(
            "G1 {} F{}",
            self.position_code(ctx, x, y)?,
            fixed("feedrate", ctx.feedrate, ctx.feedrate_decimals)?
        ))
    }

    fn end_code(&self, ctx: &MachiningContext) -> Result<String> {
        let z_end = ctx.z_end.unwrap_or(ctx.z_move);
        let mut lines = vec![format!("G0 {}", z_word(ctx, "z_end", z_end)?)];
        if let Some(p) = ctx.toolchange_xy {
            lines.push(self.rapid_code(ctx, p.x, p.y)?);
        }
        lines.push("M5".to_string());
        lines.push("M2".to_string());
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
            SpindleDirection::CW => "M3",
            SpindleDirection::CCW => "M4",
        };
        Ok(match ctx.spindle_speed {
            Some(rpm) => format!("{} S{}", word, rpm),
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
        Ok("M5".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linuxcnc_toolchange_applies_length_offset() {
        let ctx = MachiningContext::default().with_toolchange_xy(0.0, 50.0);
        let tool = ToolSelection::resolve(&ctx, 1);
        let code = LinuxCncPost.toolchange_code(&ctx, &tool).unwrap();

        assert!(code.contains("T1 M6 G43"));
        assert!(code.contains("G0 X0.0000 Y50.0000"));
        assert!(code.contains("; Tool Dia = 1.0000"));
    }

    #[test]
    fn test_linuxcnc_program_end() {
        let code = LinuxCncPost.end_code(&MachiningContext::default()).unwrap();
        assert_eq!(code, "G0 Z2.0000\nM5\nM2");
    }

    #[test]
    fn test_linuxcnc_units_block() {
        let mut ctx = MachiningContext::default();
        ctx.include_header = false;
        let code = LinuxCncPost.start_code(&ctx).unwrap();
        assert!(code.starts_with("G21 ; mm\nG17 ; XY plane"));
    }
}
