//! Mach3/Mach4 post-processor
//!
//! Mach3 has no use for canned cycles here; every move is spelled out. Lines
//! are numbered when the context asks for it, comments never are.

use crate::codegen::Result;
use crate::context::{MachiningContext, SpindleDirection};
use crate::format::fixed;
use crate::post::{comment_text, header_lines, PostProcessor, ToolSelection};

pub struct Mach3Post;

const DWELL_DECIMALS: usize = 2;

impl Mach3Post {
    fn z(ctx: &MachiningContext, field: &'static str, z: f64) -> Result<String> {
        Ok(format!("Z{}", fixed(field, z, ctx.coords_decimals)?))
    }
}

impl PostProcessor for Mach3Post {
    fn name(&self) -> &str {
        "Mach3/Mach4"
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
        let mut lines = Vec::new();
        if ctx.include_header {
            lines.push(self.comment("PROGRAM START"));
            for line in header_lines(ctx, self.name())? {
                lines.push(if line.is_empty() { line } else { self.comment(&line) });
            }
            lines.push(String::new());
        }
        // Absolute, XY plane, cancel comp, cancel length, cancel cycles
        lines.push("G90 G17 G40 G49 G80".to_string());
        lines.push(ctx.units.gcode().to_string());
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
            format!("G00 {}", Self::z(ctx, "z_toolchange", ctx.z_toolchange)?),
            "M05".to_string(),
        ];
        if let Some(p) = ctx.toolchange_xy {
            lines.push(self.rapid_code(ctx, p.x, p.y)?);
        }
        lines.push(format!("T{} M06", tool.tool_id));
        lines.push(self.comment(&format!(
            "TOOL {} DIA {}",
            tool.tool_id,
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

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_mach3_toolchange() {
        let ctx = MachiningContext::default().with_decimals(3, 1);
        let tool = ToolSelection::resolve(&ctx, 4);

        assert_eq!(
            Mach3Post.toolchange_code(&ctx, &tool).unwrap(),
            "G00 Z15.000\n\
             M05\n\
             T4 M06\n\
             (TOOL 4 DIA 1.000)"
        );
    }

    #[test]
    fn test_mach3_plunge_carries_z_feed() {
        let ctx = MachiningContext::default().with_decimals(3, 1);
        assert_eq!(Mach3Post.down_code(&ctx, -0.25).unwrap(), "G01 Z-0.250 F60.0");
    }

    #[test]
    fn test_mach3_spindle_speed_first() {
        let ctx = MachiningContext::default().with_spindle(Some(2500), SpindleDirection::CW);
        assert_eq!(Mach3Post.spindle_code(&ctx).unwrap(), "S2500 M03");
    }

    #[test]
    fn test_mach3_dwell() {
        let ctx = MachiningContext::default().with_dwell(0.5);
        assert_eq!(Mach3Post.dwell_code(&ctx).unwrap(), "G04 P0.50");
    }
}
