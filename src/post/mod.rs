//! Post-processors for machine-specific control code
//!
//! Each controller family speaks its own dialect. A dialect is a stateless
//! value implementing [`PostProcessor`]: one method per code fragment, each a
//! pure function of the machining context and the operation's own fields.

use std::fmt;
use std::str::FromStr;

use crate::codegen::Result;
use crate::context::MachiningContext;
use crate::format::fixed;
use crate::validator::ConfigError;

pub mod grbl_laser;
pub mod haas;
pub mod isel_icp;
pub mod linuxcnc;
pub mod mach3;

/// Post-processor trait - implemented for each controller type
///
/// An empty string is a valid fragment meaning "nothing to emit here".
/// Implementations hold no per-run state, so one instance may serve many
/// generation runs on many threads at once.
pub trait PostProcessor: Send + Sync {
    /// Machine/controller name
    fn name(&self) -> &str;

    /// Whether `N` words may be prefixed to output lines
    fn supports_line_numbers(&self) -> bool;

    /// Factor that turns real units into integer machine steps, for
    /// dialects that never print a decimal point
    fn step_scale(&self) -> Option<f64>;

    /// Wrap free text in the dialect's comment syntax
    fn comment(&self, text: &str) -> String;

    /// File header: informational comments (when `include_header`) and
    /// unit/plane/mode setup
    fn start_code(&self, ctx: &MachiningContext) -> Result<String>;

    /// Initial height move; empty when `startz` is unset
    fn startz_code(&self, ctx: &MachiningContext) -> Result<String>;

    /// Retract to safe height before traversal
    fn lift_code(&self, ctx: &MachiningContext) -> Result<String>;

    /// Plunge/engage to `z`
    fn down_code(&self, ctx: &MachiningContext, z: f64) -> Result<String>;

    fn toolchange_code(&self, ctx: &MachiningContext, tool: &ToolSelection) -> Result<String>;

    /// Return to the controller's reference height
    fn up_to_zero_code(&self, ctx: &MachiningContext) -> Result<String>;

    fn position_code(&self, ctx: &MachiningContext, x: f64, y: f64) -> Result<String>;

    fn rapid_code(&self, ctx: &MachiningContext, x: f64, y: f64) -> Result<String>;

    fn linear_code(&self, ctx: &MachiningContext, x: f64, y: f64) -> Result<String>;

    /// Program termination, with a return move to `toolchange_xy` when set
    fn end_code(&self, ctx: &MachiningContext) -> Result<String>;

    fn feedrate_code(&self, ctx: &MachiningContext) -> Result<String>;

    fn z_feedrate_code(&self, ctx: &MachiningContext) -> Result<String>;

    fn spindle_code(&self, ctx: &MachiningContext) -> Result<String>;

    /// Timed pause; empty when dwell is disabled
    fn dwell_code(&self, ctx: &MachiningContext) -> Result<String>;

    fn spindle_stop_code(&self, ctx: &MachiningContext) -> Result<String>;
}

/// The tool a `ToolChange` selects, resolved against the job's tool table.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSelection {
    pub tool_id: u32,
    pub diameter: f64,
    pub drill_count: Option<u32>,
}

impl ToolSelection {
    /// Resolve `tool_id` through `tools_in_use`, falling back to the
    /// context's own tool diameter.
    pub fn resolve(ctx: &MachiningContext, tool_id: u32) -> Self {
        match ctx.tool_usage(tool_id) {
            Some(usage) => Self {
                tool_id,
                diameter: usage.diameter,
                drill_count: usage.drill_count,
            },
            None => Self {
                tool_id,
                diameter: ctx.tool_diameter,
                drill_count: None,
            },
        }
    }

    /// Drill-count line for Excellon jobs, when the count is known
    pub fn drill_count_note(&self, ctx: &MachiningContext) -> Option<String> {
        match self.drill_count {
            Some(count) if ctx.job_kind.is_excellon() => {
                Some(format!("Tool {} drills: {}", self.tool_id, count))
            }
            _ => None,
        }
    }
}

/// Comment body safe for a single line: line breaks become spaces, and
/// with `parens` set, parentheses are dropped so they cannot close the
/// comment early.
pub fn comment_text(text: &str, parens: bool) -> String {
    text.chars()
        .filter(|c| !(parens && matches!(c, '(' | ')')))
        .map(|c| if matches!(c, '\r' | '\n') { ' ' } else { c })
        .collect()
}

/// Informational header lines, without comment delimiters. Empty strings
/// stand for blank separator lines.
pub fn header_lines(ctx: &MachiningContext, preprocessor: &str) -> Result<Vec<String>> {
    let units = ctx.units.suffix();
    let cd = ctx.coords_decimals;
    let fd = ctx.feedrate_decimals;
    let geometry = !ctx.job_kind.is_excellon();
    let mut lines = Vec::new();

    if geometry {
        lines.push(format!(
            "TOOL DIAMETER: {} {}",
            fixed("tool_diameter", ctx.tool_diameter, cd)?,
            units
        ));
    }
    lines.push(match ctx.spindle_speed {
        Some(rpm) => format!("Spindle Speed: {} RPM", rpm),
        None => "Spindle Speed: None".to_string(),
    });
    lines.push(format!("Feedrate: {} {}/min", fixed("feedrate", ctx.feedrate, fd)?, units));
    if geometry {
        lines.push(format!(
            "Feedrate_Z: {} {}/min",
            fixed("z_feedrate", ctx.z_feedrate, fd)?,
            units
        ));
    }
    lines.push(format!(
        "Feedrate rapids: {} {}/min",
        fixed("feedrate_rapid", ctx.feedrate_rapid, fd)?,
        units
    ));
    lines.push(String::new());

    lines.push(format!("Z_Cut: {} {}", fixed("z_cut", ctx.z_cut, cd)?, units));
    if let (Some(per_cut), Some(passes)) = (ctx.depth_per_cut, ctx.pass_count()) {
        lines.push(format!(
            "DepthPerCut: {} {} <=> {} passes",
            fixed("depth_per_cut", per_cut, cd)?,
            units,
            passes
        ));
    }
    lines.push(format!("Z_Move: {} {}", fixed("z_move", ctx.z_move, cd)?, units));
    lines.push(format!(
        "Z Toolchange: {} {}",
        fixed("z_toolchange", ctx.z_toolchange, cd)?,
        units
    ));
    lines.push(match ctx.toolchange_xy {
        Some(p) => format!(
            "X,Y Toolchange: {}, {} {}",
            fixed("toolchange_x", p.x, cd)?,
            fixed("toolchange_y", p.y, cd)?,
            units
        ),
        None => "X,Y Toolchange: None".to_string(),
    });
    lines.push(optional_height("Z Start", ctx.startz, cd, units)?);
    lines.push(optional_height("Z End", ctx.z_end, cd, units)?);
    lines.push(format!("Steps per circle: {}", ctx.steps_per_circle));
    lines.push(preprocessor_line(ctx, preprocessor));
    lines.push(String::new());

    lines.extend(range_lines(ctx)?);
    Ok(lines)
}

/// "Preprocessor Geometry: …" or "Preprocessor Excellon: …"
pub fn preprocessor_line(ctx: &MachiningContext, preprocessor: &str) -> String {
    if ctx.job_kind.is_excellon() {
        format!("Preprocessor Excellon: {}", preprocessor)
    } else {
        format!("Preprocessor Geometry: {}", preprocessor)
    }
}

/// Job extents, right-aligned so the two lines read as a table
pub fn range_lines(ctx: &MachiningContext) -> Result<[String; 2]> {
    let cd = ctx.coords_decimals;
    let bb = &ctx.bounding_box;
    let units = ctx.units.suffix();
    Ok([
        format!(
            "X range: {:>9} ... {:>9} {}",
            fixed("xmin", bb.xmin, cd)?,
            fixed("xmax", bb.xmax, cd)?,
            units
        ),
        format!(
            "Y range: {:>9} ... {:>9} {}",
            fixed("ymin", bb.ymin, cd)?,
            fixed("ymax", bb.ymax, cd)?,
            units
        ),
    ])
}

fn optional_height(label: &str, z: Option<f64>, decimals: usize, units: &str) -> Result<String> {
    Ok(match z {
        Some(z) => format!("{}: {} {}", label, fixed("z", z, decimals)?, units),
        None => format!("{}: None", label),
    })
}

/// Available post-processors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostProcessorType {
    #[default]
    Generic, // plain G-code (default)
    GrblLaser,
    IselIcpCnc,
    Mach3,    // Mach3/Mach4
    LinuxCNC, // LinuxCNC
    Haas,     // Haas (Fanuc + Haas specifics)
}

impl PostProcessorType {
    pub const ALL: [PostProcessorType; 6] = [
        PostProcessorType::Generic,
        PostProcessorType::GrblLaser,
        PostProcessorType::IselIcpCnc,
        PostProcessorType::Mach3,
        PostProcessorType::LinuxCNC,
        PostProcessorType::Haas,
    ];

    /// Registry key, as accepted by `from_str`
    pub fn key(&self) -> &'static str {
        match self {
            PostProcessorType::Generic => "default",
            PostProcessorType::GrblLaser => "grbl_laser",
            PostProcessorType::IselIcpCnc => "isel_icp_cnc",
            PostProcessorType::Mach3 => "mach3",
            PostProcessorType::LinuxCNC => "linuxcnc",
            PostProcessorType::Haas => "haas",
        }
    }

    /// Get the post-processor implementation
    pub fn get_processor(&self) -> Box<dyn PostProcessor> {
        match self {
            PostProcessorType::Generic => Box::new(GenericPost),
            PostProcessorType::GrblLaser => Box::new(grbl_laser::GrblLaserPost),
            PostProcessorType::IselIcpCnc => Box::new(isel_icp::IselIcpPost),
            PostProcessorType::Mach3 => Box::new(mach3::Mach3Post),
            PostProcessorType::LinuxCNC => Box::new(linuxcnc::LinuxCncPost),
            PostProcessorType::Haas => Box::new(haas::HaasPost),
        }
    }
}

impl FromStr for PostProcessorType {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.to_ascii_lowercase();
        PostProcessorType::ALL
            .into_iter()
            .find(|t| t.key() == wanted)
            .ok_or_else(|| ConfigError::UnknownValue {
                kind: "dialect",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for PostProcessorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Plain G-code post-processor (default)
pub struct GenericPost;

const GENERIC_DWELL_DECIMALS: usize = 2;

impl GenericPost {
    fn z(ctx: &MachiningContext, field: &'static str, z: f64) -> Result<String> {
        Ok(format!("Z{}", fixed(field, z, ctx.coords_decimals)?))
    }
}

impl PostProcessor for GenericPost {
    fn name(&self) -> &str {
        "Generic G-code"
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
            for line in header_lines(ctx, self.name())? {
                lines.push(if line.is_empty() { line } else { self.comment(&line) });
            }
            lines.push(String::new());
        }
        lines.push(ctx.units.gcode().to_string());
        lines.push("G90".to_string());
        lines.push("G94".to_string());
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
        Ok(format!("G01 {}", Self::z(ctx, "z_cut", z)?))
    }

    fn toolchange_code(&self, ctx: &MachiningContext, tool: &ToolSelection) -> Result<String> {
        let mut lines = vec![format!("G00 {}", Self::z(ctx, "z_toolchange", ctx.z_toolchange)?)];
        if let Some(p) = ctx.toolchange_xy {
            lines.push(self.rapid_code(ctx, p.x, p.y)?);
        }
        lines.push(format!("T{}", tool.tool_id));
        lines.push("M5".to_string());
        lines.push("M6".to_string());
        lines.push(self.comment(&format!(
            "MSG, Change to Tool Dia = {}",
            fixed("tool_diameter", tool.diameter, ctx.coords_decimals)?
        )));
        if let Some(note) = tool.drill_count_note(ctx) {
            lines.push(self.comment(&note));
        }
        lines.push("M0".to_string());
        if ctx.fast_plunge {
            lines.push(self.lift_code(ctx)?);
        }
        Ok(lines.join("\n"))
    }

    fn up_to_zero_code(&self, ctx: &MachiningContext) -> Result<String> {
        Ok(format!("G01 Z{}", fixed("z", 0.0, ctx.coords_decimals)?))
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
        let mut lines = vec![format!("G00 {}", Self::z(ctx, "z_end", z_end)?)];
        if let Some(p) = ctx.toolchange_xy {
            lines.push(self.rapid_code(ctx, p.x, p.y)?);
        }
        lines.push("M2".to_string());
        Ok(lines.join("\n"))
    }

    fn feedrate_code(&self, ctx: &MachiningContext) -> Result<String> {
        Ok(format!("G01 F{}", fixed("feedrate", ctx.feedrate, ctx.feedrate_decimals)?))
    }

    fn z_feedrate_code(&self, ctx: &MachiningContext) -> Result<String> {
        Ok(format!("G01 F{}", fixed("z_feedrate", ctx.z_feedrate, ctx.feedrate_decimals)?))
    }

    fn spindle_code(&self, ctx: &MachiningContext) -> Result<String> {
        use crate::context::SpindleDirection;

        let word = match ctx.spindle_direction {
            SpindleDirection::CW => "M03",
            SpindleDirection::CCW => "M04",
        };
        Ok(match ctx.spindle_speed {
            Some(rpm) => format!("{} S{}", word, rpm),
            None => word.to_string(),
        })
    }

    fn dwell_code(&self, ctx: &MachiningContext) -> Result<String> {
        match (ctx.dwell_enabled, ctx.dwell_time) {
            (true, Some(t)) => Ok(format!("G4 P{}", fixed("dwell_time", t, GENERIC_DWELL_DECIMALS)?)),
            _ => Ok(String::new()),
        }
    }

    fn spindle_stop_code(&self, _ctx: &MachiningContext) -> Result<String> {
        Ok("M05".to_string())
    }
}
