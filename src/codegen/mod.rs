//! Code assembler
//! Walks an operation sequence once and stitches the active dialect's
//! fragments into one control program.

use thiserror::Error;
use tracing::{debug, warn};

use crate::context::{LineNumbering, MachiningContext};
use crate::format::{fixed, FormatError};
use crate::operation::Operation;
use crate::post::{PostProcessor, ToolSelection};
use crate::validator::{ConfigError, Validator};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerateError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("invalid machining context: {}", join_errors(.0))]
    InvalidContext(Vec<ConfigError>),

    #[error("formatting error: {0}")]
    Formatting(#[from] FormatError),

    #[error("line numbers exceed N{}", u32::MAX)]
    LineNumberOverflow,
}

impl GenerateError {
    /// True for every error caused by the context rather than by a value
    /// that could not be rendered.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            GenerateError::Configuration(_)
                | GenerateError::InvalidContext(_)
                | GenerateError::LineNumberOverflow
        )
    }
}

fn join_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, GenerateError>;

#[derive(Debug, Clone, PartialEq)]
pub struct GCodeOutput {
    pub lines: Vec<String>,
    /// Next `N` number; `None` once the counter has run past `u32::MAX`
    next_number: Option<u32>,
    pub step: u32,
    numbered: bool,
}

impl GCodeOutput {
    pub fn new(numbering: Option<LineNumbering>) -> Self {
        let LineNumbering { start, step } = numbering.unwrap_or_default();
        Self {
            lines: Vec::new(),
            next_number: Some(start),
            step,
            numbered: numbering.is_some(),
        }
    }

    /// Append a fragment. Empty fragments leave no trace; blank lines inside
    /// a fragment are kept.
    pub fn emit(&mut self, fragment: &str) -> Result<()> {
        if fragment.is_empty() {
            return Ok(());
        }
        for line in fragment.lines() {
            self.push_line(line)?;
        }
        Ok(())
    }

    fn push_line(&mut self, line: &str) -> Result<()> {
        // Comments, blank lines and tape markers don't get line numbers
        let bare = line.is_empty()
            || line.starts_with(';')
            || line.starts_with('(')
            || line.starts_with('%');
        if self.numbered && !bare {
            let number = self.next_number.ok_or(GenerateError::LineNumberOverflow)?;
            self.lines.push(format!("N{:04} {}", number, line));
            self.next_number = number.checked_add(self.step);
        } else {
            self.lines.push(line.to_string());
        }
        Ok(())
    }

    /// The program text, newline-terminated
    pub fn to_text(&self) -> String {
        let mut text = self.lines.join("\n");
        text.push('\n');
        text
    }
}

impl std::fmt::Display for GCodeOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.lines.join("\n"))
    }
}

/// Where the tool sits between operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Height {
    /// At `z_move`, clear to traverse
    Safe,
    /// At the reference height; must lift before traversing
    Reference,
    /// Down at the current pass depth
    Cutting,
}

/// Per-run walk state. Lives on the stack of one `generate` call, so a
/// single generator can serve concurrent runs.
struct RunState {
    height: Height,
    tool_id: u32,
    depth: f64,
}

pub struct CodeGenerator<'a> {
    post: &'a dyn PostProcessor,
    validator: Validator,
}

impl<'a> CodeGenerator<'a> {
    pub fn new(post: &'a dyn PostProcessor) -> Self {
        Self {
            post,
            validator: Validator::new(),
        }
    }

    pub fn generate(&self, ctx: &MachiningContext, operations: &[Operation]) -> Result<String> {
        Ok(self.generate_output(ctx, operations)?.to_text())
    }

    /// Generate the whole program. Any failing fragment aborts the run; no
    /// partial output is returned.
    pub fn generate_output(
        &self,
        ctx: &MachiningContext,
        operations: &[Operation],
    ) -> Result<GCodeOutput> {
        self.validator
            .validate_context(ctx)
            .map_err(GenerateError::InvalidContext)?;

        debug!(
            dialect = self.post.name(),
            operations = operations.len(),
            "generating control code"
        );

        let numbering = match ctx.line_numbers {
            Some(numbering) if self.post.supports_line_numbers() => Some(numbering),
            Some(_) => {
                debug!(dialect = self.post.name(), "dialect has no line numbers, ignoring");
                None
            }
            None => None,
        };

        let mut output = GCodeOutput::new(numbering);
        let mut run = RunState {
            height: Height::Safe,
            tool_id: ctx.tool_id,
            depth: ctx.z_cut,
        };

        output.emit(&self.post.start_code(ctx)?)?;
        output.emit(&self.post.startz_code(ctx)?)?;
        output.emit(&self.post.feedrate_code(ctx)?)?;

        for op in operations {
            self.emit_operation(ctx, &mut run, &mut output, op)?;
        }

        // Skip the closing lift when the end sequence opens with the same retract
        let end = self.post.end_code(ctx)?;
        if run.height != Height::Safe {
            let lift = self.post.lift_code(ctx)?;
            if end.lines().next() != Some(lift.as_str()) {
                output.emit(&lift)?;
            }
        }
        output.emit(&end)?;

        Ok(output)
    }

    fn emit_operation(
        &self,
        ctx: &MachiningContext,
        run: &mut RunState,
        output: &mut GCodeOutput,
        op: &Operation,
    ) -> Result<()> {
        match op {
            Operation::RapidMove { x, y } => {
                self.lift(ctx, run, output)?;
                output.emit(&self.post.rapid_code(ctx, *x, *y)?)?;
            }
            Operation::LinearMove { x, y } => {
                if run.height != Height::Cutting {
                    self.plunge(ctx, run, output)?;
                }
                output.emit(&self.post.linear_code(ctx, *x, *y)?)?;
            }
            Operation::ToolChange { tool_id } => {
                self.lift(ctx, run, output)?;
                if run.tool_id == *tool_id {
                    debug!(tool_id, "tool change to the tool already loaded");
                }
                if !ctx.tools_in_use.is_empty() && ctx.tool_usage(*tool_id).is_none() {
                    warn!(tool_id, "tool change to a tool missing from the tool table");
                }
                let tool = ToolSelection::resolve(ctx, *tool_id);
                output.emit(&self.post.toolchange_code(ctx, &tool)?)?;
                run.tool_id = *tool_id;
            }
            Operation::DepthPassBoundary { pass_index, z } => {
                run.depth = *z;
                match ctx.pass_count() {
                    Some(passes) => {
                        if *pass_index > passes {
                            warn!(pass_index, passes, "depth pass beyond computed pass count");
                        }
                        output.emit(&self.post.comment(&format!(
                            "Pass {}/{} Z={}",
                            pass_index,
                            passes,
                            fixed("z", *z, ctx.coords_decimals)?
                        )))?;
                    }
                    None => {
                        warn!(pass_index, "depth pass boundary while multi-depth cutting is off");
                    }
                }
                if run.height == Height::Cutting {
                    self.plunge(ctx, run, output)?;
                }
            }
            Operation::SpindleOn => output.emit(&self.post.spindle_code(ctx)?)?,
            Operation::SpindleOff => output.emit(&self.post.spindle_stop_code(ctx)?)?,
            Operation::Dwell => output.emit(&self.post.dwell_code(ctx)?)?,
            Operation::Drill { x, y } => {
                self.lift(ctx, run, output)?;
                output.emit(&self.post.rapid_code(ctx, *x, *y)?)?;
                self.plunge(ctx, run, output)?;
                output.emit(&self.post.dwell_code(ctx)?)?;
                output.emit(&self.post.up_to_zero_code(ctx)?)?;
                run.height = Height::Reference;
                self.lift(ctx, run, output)?;
            }
            Operation::ReturnToReference => {
                output.emit(&self.post.up_to_zero_code(ctx)?)?;
                run.height = Height::Reference;
            }
            Operation::Comment { text } => output.emit(&self.post.comment(text))?,
        }
        Ok(())
    }

    /// Engage at the current pass depth, switching to the plunge feed and
    /// back when the two feeds differ.
    fn plunge(&self, ctx: &MachiningContext, run: &mut RunState, output: &mut GCodeOutput) -> Result<()> {
        if ctx.z_feedrate != ctx.feedrate {
            output.emit(&self.post.z_feedrate_code(ctx)?)?;
            output.emit(&self.post.down_code(ctx, run.depth)?)?;
            output.emit(&self.post.feedrate_code(ctx)?)?;
        } else {
            output.emit(&self.post.down_code(ctx, run.depth)?)?;
        }
        run.height = Height::Cutting;
        Ok(())
    }

    /// Retract to `z_move` unless the tool is already there
    fn lift(&self, ctx: &MachiningContext, run: &mut RunState, output: &mut GCodeOutput) -> Result<()> {
        if run.height != Height::Safe {
            output.emit(&self.post.lift_code(ctx)?)?;
            run.height = Height::Safe;
        }
        Ok(())
    }
}

/// Generate a complete program with `post` in one call.
pub fn generate(
    post: &dyn PostProcessor,
    ctx: &MachiningContext,
    operations: &[Operation],
) -> Result<String> {
    CodeGenerator::new(post).generate(ctx, operations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{SpindleDirection, Units};
    use crate::lexer::{check_precision, Expectation};
    use crate::post::{grbl_laser::GrblLaserPost, isel_icp::IselIcpPost, GenericPost, PostProcessorType};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn laser_ctx() -> MachiningContext {
        MachiningContext::new(Units::Metric)
            .with_decimals(3, 2)
            .with_feedrates(500.0, 500.0)
    }

    fn square() -> Vec<Operation> {
        vec![
            Operation::rapid(0.0, 0.0),
            Operation::SpindleOn,
            Operation::linear(10.0, 0.0),
            Operation::linear(10.0, 10.0),
            Operation::linear(0.0, 10.0),
            Operation::linear(0.0, 0.0),
            Operation::SpindleOff,
        ]
    }

    fn line_index(text: &str, wanted: &str) -> usize {
        text.lines()
            .position(|l| l == wanted)
            .unwrap_or_else(|| panic!("missing line {:?} in:\n{}", wanted, text))
    }

    #[test]
    fn test_grbl_laser_end_to_end() {
        let ops = vec![Operation::rapid(0.0, 0.0), Operation::linear(10.0, 10.0)];
        let gcode = generate(&GrblLaserPost, &laser_ctx(), &ops).unwrap();

        let rapid = line_index(&gcode, "G00 X0.000 Y0.000");
        let linear = line_index(&gcode, "G01 X10.000 Y10.000 F500.00");
        assert!(rapid < linear);
    }

    #[test]
    fn test_grbl_laser_program_body() {
        let mut ctx = laser_ctx();
        ctx.include_header = false;
        let ops = vec![Operation::rapid(0.0, 0.0), Operation::linear(10.0, 10.0)];

        assert_eq!(
            generate(&GrblLaserPost, &ctx, &ops).unwrap(),
            "G21\n\
             G90\n\
             G17\n\
             G94\n\
             G01 F500.00\n\
             G00 X0.000 Y0.000\n\
             M03\n\
             G01 X10.000 Y10.000 F500.00\n\
             M05 S0\n\
             G00 Z2.000\n"
        );
    }

    #[test]
    fn test_isel_program_body() {
        let mut ctx = MachiningContext::default()
            .with_depths(-0.1, 5.0)
            .with_feedrates(600.0, 60.0)
            .with_spindle(Some(10000), SpindleDirection::CW);
        ctx.include_header = false;

        let ops = vec![
            Operation::SpindleOn,
            Operation::rapid(1.0, 1.0),
            Operation::linear(2.0, 1.0),
            Operation::rapid(5.0, 5.0),
            Operation::SpindleOff,
        ];

        assert_eq!(
            generate(&IselIcpPost, &ctx, &ops).unwrap(),
            "IMF_PBL kerf\n\
             VEL 10000\n\
             SPINDLE CW RPM10000\n\
             FASTABS X1000 Y1000\n\
             VEL 1000\n\
             MOVEABS Z-100\n\
             VEL 10000\n\
             MOVEABS X2000 Y1000\n\
             FASTABS Z5000\n\
             FASTABS X5000 Y5000\n\
             SPINDLE OFF\n\
             WPCLEAR\n\
             FASTABS Z0\n\
             PROGEND\n"
        );
    }

    #[test]
    fn test_isel_lift_token() {
        let ctx = MachiningContext::default().with_depths(-1.0, 5.0);
        let ops = vec![Operation::linear(1.0, 1.0)];
        let gcode = generate(&IselIcpPost, &ctx, &ops).unwrap();
        assert!(gcode.lines().any(|l| l == "FASTABS Z5000"));
    }

    #[test]
    fn test_generation_is_deterministic() {
        let ctx = laser_ctx().with_toolchange_xy(12.5, 7.0);
        for kind in PostProcessorType::ALL {
            let post = kind.get_processor();
            let first = generate(post.as_ref(), &ctx, &square()).unwrap();
            let second = generate(post.as_ref(), &ctx, &square()).unwrap();
            assert_eq!(first, second, "{} output differs between runs", kind);
        }
    }

    #[test]
    fn test_precision_holds_for_every_dialect() {
        for decimals in 0..=6 {
            let ctx = MachiningContext::default()
                .with_decimals(decimals, decimals)
                .with_multidepth(0.5)
                .with_toolchange_xy(12.5, 7.0)
                .with_dwell(1.0);
            let mut ops = vec![Operation::ToolChange { tool_id: 2 }];
            ops.push(Operation::DepthPassBoundary { pass_index: 1, z: -0.6 });
            ops.extend(square());
            ops.push(Operation::DepthPassBoundary { pass_index: 2, z: -1.2 });
            ops.extend(square());
            ops.push(Operation::Drill { x: 3.333333, y: 4.25 });

            for kind in PostProcessorType::ALL {
                let post = kind.get_processor();
                let gcode = generate(post.as_ref(), &ctx, &ops).unwrap();
                let expect = Expectation::new(post.as_ref(), &ctx);
                let violations = check_precision(&gcode, &expect).unwrap();
                assert!(
                    violations.is_empty(),
                    "{} at {} decimals: {:?}",
                    kind,
                    decimals,
                    violations
                );
            }
        }
    }

    #[test]
    fn test_toolchange_return_move_omitted_when_unset() {
        for kind in PostProcessorType::ALL {
            let post = kind.get_processor();
            let end = post.end_code(&laser_ctx()).unwrap();
            assert!(!end.contains('X'), "{} emitted a return move: {}", kind, end);
        }
    }

    #[test]
    fn test_toolchange_return_move_when_set() {
        let ctx = laser_ctx().with_toolchange_xy(12.5, 7.0);
        let post = GrblLaserPost;
        let end = post.end_code(&ctx).unwrap();
        let line = end.lines().find(|l| l.contains('X')).unwrap();
        assert_eq!(line, "G00 X12.500 Y7.000");

        let isel = IselIcpPost.end_code(&ctx).unwrap();
        assert!(isel.lines().any(|l| l == "FASTABS X12500 Y7000"));
    }

    #[test]
    fn test_multidepth_pass_comments() {
        let mut ctx = MachiningContext::default()
            .with_decimals(1, 1)
            .with_depths(-6.0, 5.0)
            .with_multidepth(2.5)
            .with_feedrates(100.0, 100.0);
        ctx.include_header = false;

        let ops = vec![
            Operation::rapid(0.0, 0.0),
            Operation::DepthPassBoundary { pass_index: 1, z: -2.5 },
            Operation::linear(5.0, 0.0),
            Operation::DepthPassBoundary { pass_index: 2, z: -5.0 },
            Operation::linear(0.0, 0.0),
            Operation::DepthPassBoundary { pass_index: 3, z: -6.0 },
            Operation::linear(5.0, 0.0),
        ];

        let gcode = generate(&GenericPost, &ctx, &ops).unwrap();
        assert_eq!(
            gcode,
            "G21\n\
             G90\n\
             G94\n\
             G01 F100.0\n\
             G00 X0.0 Y0.0\n\
             (Pass 1/3 Z=-2.5)\n\
             G01 Z-2.5\n\
             G01 X5.0 Y0.0 F100.0\n\
             (Pass 2/3 Z=-5.0)\n\
             G01 Z-5.0\n\
             G01 X0.0 Y0.0 F100.0\n\
             (Pass 3/3 Z=-6.0)\n\
             G01 Z-6.0\n\
             G01 X5.0 Y0.0 F100.0\n\
             G00 Z5.0\n\
             M2\n"
        );
    }

    #[test]
    fn test_toolchange_lifts_engaged_tool_first() {
        let mut ctx = MachiningContext::default().with_decimals(1, 1);
        ctx.include_header = false;
        ctx.z_feedrate = ctx.feedrate;

        let ops = vec![
            Operation::linear(1.0, 0.0),
            Operation::ToolChange { tool_id: 2 },
        ];
        let gcode = generate(&IselIcpPost, &ctx, &ops).unwrap();
        let lift = line_index(&gcode, "FASTABS Z2000");
        let change = line_index(&gcode, "GETTOOL 2");
        assert_eq!(lift + 1, change);
    }

    #[test]
    fn test_return_to_reference_lifts_before_next_rapid() {
        let mut ctx = MachiningContext::default().with_decimals(1, 1);
        ctx.include_header = false;

        let ops = vec![
            Operation::linear(1.0, 0.0),
            Operation::ReturnToReference,
            Operation::rapid(50.0, 50.0),
        ];
        let gcode = generate(&GenericPost, &ctx, &ops).unwrap();
        let zero = line_index(&gcode, "G01 Z0.0");
        let lift = line_index(&gcode, "G00 Z2.0");
        let rapid = line_index(&gcode, "G00 X50.0 Y50.0");
        assert_eq!((zero + 1, lift + 1), (lift, rapid));
    }

    #[test]
    fn test_return_to_reference_at_end_still_retracts() {
        let mut ctx = laser_ctx();
        ctx.include_header = false;
        let ops = vec![Operation::linear(1.0, 0.0), Operation::ReturnToReference];

        let gcode = generate(&IselIcpPost, &ctx, &ops).unwrap();
        let zero = line_index(&gcode, "MOVEABS Z0");
        let lift = line_index(&gcode, "FASTABS Z2000");
        assert_eq!(zero + 1, lift);
    }

    #[test]
    fn test_program_end_retracts_once() {
        let mut ctx = MachiningContext::default().with_decimals(1, 1);
        ctx.include_header = false;
        let ops = vec![Operation::linear(1.0, 0.0)];

        let gcode = generate(&GenericPost, &ctx, &ops).unwrap();
        assert_eq!(gcode.lines().filter(|l| *l == "G00 Z2.0").count(), 1);

        ctx.z_end = Some(10.0);
        let gcode = generate(&GenericPost, &ctx, &ops).unwrap();
        let lift = line_index(&gcode, "G00 Z2.0");
        assert_eq!(line_index(&gcode, "G00 Z10.0"), lift + 1);
    }

    #[test]
    fn test_laser_switched_off_before_program_end() {
        let ops = vec![Operation::linear(1.0, 0.0)];
        let gcode = generate(&GrblLaserPost, &laser_ctx(), &ops).unwrap();
        let off = line_index(&gcode, "M05 S0");
        assert_eq!(line_index(&gcode, "G00 Z2.000"), off + 1);
    }

    #[test]
    fn test_disabled_dwell_leaves_no_blank_line() {
        let ctx = laser_ctx();
        let with_dwell = vec![Operation::rapid(1.0, 1.0), Operation::Dwell];
        let without = vec![Operation::rapid(1.0, 1.0)];

        assert_eq!(
            generate(&GenericPost, &ctx, &with_dwell).unwrap(),
            generate(&GenericPost, &ctx, &without).unwrap()
        );
    }

    #[test]
    fn test_drill_hit_sequence() {
        let mut ctx = MachiningContext::default()
            .with_decimals(2, 1)
            .with_depths(-1.5, 2.0)
            .with_dwell(0.25);
        ctx.include_header = false;
        ctx.z_feedrate = ctx.feedrate;

        let output = CodeGenerator::new(&GenericPost)
            .generate_output(&ctx, &[Operation::Drill { x: 3.0, y: 4.0 }])
            .unwrap();
        let body: Vec<_> = output.lines[4..9].iter().map(String::as_str).collect();
        assert_eq!(
            body,
            vec!["G00 X3.00 Y4.00", "G01 Z-1.50", "G4 P0.25", "G01 Z0.00", "G00 Z2.00"]
        );
    }

    #[test]
    fn test_line_numbers_skip_comments() {
        let mut ctx = MachiningContext::default()
            .with_decimals(1, 1)
            .with_line_numbers(10, 5);
        ctx.include_header = false;

        let ops = vec![Operation::comment("outline"), Operation::rapid(1.0, 2.0)];
        let gcode = generate(&crate::post::mach3::Mach3Post, &ctx, &ops).unwrap();
        assert_eq!(
            gcode,
            "N0010 G90 G17 G40 G49 G80\n\
             N0015 G21\n\
             N0020 F120.0\n\
             (outline)\n\
             N0025 G00 X1.0 Y2.0\n\
             N0030 G00 Z2.0\n\
             N0035 M05\n\
             N0040 M30\n"
        );
    }

    #[test]
    fn test_comment_text_cannot_break_out_of_comment() {
        let mut ctx = MachiningContext::default()
            .with_decimals(1, 1)
            .with_line_numbers(10, 10);
        ctx.include_header = false;

        let ops = vec![Operation::comment("note\nM30 (stop)")];
        let gcode = generate(&crate::post::mach3::Mach3Post, &ctx, &ops).unwrap();
        assert!(gcode.lines().any(|l| l == "(note M30 stop)"));
        assert!(!gcode.lines().any(|l| l.ends_with("M30 (stop)") || l.ends_with("M30)")));
        assert_eq!(gcode.lines().filter(|l| l.ends_with(" M30")).count(), 1);
    }

    #[test]
    fn test_line_number_overflow_is_an_error() {
        let mut output = GCodeOutput::new(Some(LineNumbering {
            start: u32::MAX - 15,
            step: 10,
        }));
        output.emit("G00 X0.0 Y0.0").unwrap();
        output.emit("(comments are free)\nG01 X1.0 Y0.0").unwrap();
        assert_eq!(output.emit("M2"), Err(GenerateError::LineNumberOverflow));
        assert_eq!(output.lines[2], format!("N{} G01 X1.0 Y0.0", u32::MAX - 5));
    }

    #[test]
    fn test_line_numbers_ignored_without_dialect_support() {
        let ctx = laser_ctx().with_line_numbers(10, 10);
        let gcode = generate(&GrblLaserPost, &ctx, &[]).unwrap();
        assert!(!gcode.lines().any(|l| l.starts_with('N')));
    }

    #[test]
    fn test_invalid_context_produces_no_output() {
        let mut ctx = laser_ctx();
        ctx.multidepth = true;

        let err = generate(&GrblLaserPost, &ctx, &square()).unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(
            err,
            GenerateError::InvalidContext(vec![ConfigError::MissingField {
                field: "depth_per_cut"
            }])
        );
    }

    #[test]
    fn test_non_finite_coordinate_aborts_run() {
        let ops = vec![Operation::rapid(0.0, 0.0), Operation::linear(f64::INFINITY, 1.0)];
        let err = generate(&GrblLaserPost, &laser_ctx(), &ops).unwrap_err();
        assert_eq!(
            err,
            GenerateError::Formatting(FormatError::NonFinite {
                field: "x",
                value: f64::INFINITY
            })
        );
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_spindle_direction_tokens() {
        let cases: [(PostProcessorType, &str, &str); 6] = [
            (PostProcessorType::Generic, "M03", "M04"),
            (PostProcessorType::GrblLaser, "M03", "M04"),
            (PostProcessorType::IselIcpCnc, "SPINDLE CW", "SPINDLE CCW"),
            (PostProcessorType::Mach3, "M03", "M04"),
            (PostProcessorType::LinuxCNC, "M3", "M4"),
            (PostProcessorType::Haas, "M03", "M04"),
        ];
        for (kind, cw, ccw) in cases {
            let post = kind.get_processor();
            let ctx = laser_ctx().with_spindle(None, SpindleDirection::CW);
            assert_eq!(post.spindle_code(&ctx).unwrap(), cw);
            let ctx = ctx.with_spindle(None, SpindleDirection::CCW);
            assert_eq!(post.spindle_code(&ctx).unwrap(), ccw);
        }
    }

    #[test]
    fn test_shared_dialect_across_threads() {
        let post: Arc<dyn PostProcessor> = Arc::from(PostProcessorType::Haas.get_processor());
        let expected = generate(post.as_ref(), &laser_ctx(), &square()).unwrap();

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let post = Arc::clone(&post);
                    scope.spawn(move || generate(post.as_ref(), &laser_ctx(), &square()).unwrap())
                })
                .collect();
            for handle in handles {
                assert_eq!(handle.join().unwrap(), expected);
            }
        });
    }
}
