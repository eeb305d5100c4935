//! Machining context: the per-run parameter bag every dialect formats from.
//!
//! A context is built once per generation request and read, never written,
//! by the assembler and the dialects.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::validator::ConfigError;

/// Deserialized through `FromStr`, so any spelling `parse` accepts is
/// accepted in a job file too.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(try_from = "String")]
pub enum Units {
    #[serde(rename = "MM")]
    #[default]
    Metric, // G21
    #[serde(rename = "IN")]
    Imperial, // G20
}

impl Units {
    /// Lowercase unit annotation used in header comments.
    pub fn suffix(self) -> &'static str {
        match self {
            Units::Metric => "mm",
            Units::Imperial => "in",
        }
    }

    /// Unit-mode G-code word.
    pub fn gcode(self) -> &'static str {
        match self {
            Units::Metric => "G21",
            Units::Imperial => "G20",
        }
    }
}

impl FromStr for Units {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mm" | "metric" => Ok(Units::Metric),
            "in" | "imperial" => Ok(Units::Imperial),
            _ => Err(ConfigError::UnknownValue {
                kind: "units",
                value: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for Units {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "String")]
pub enum SpindleDirection {
    CW,  // M03
    CCW, // M04
}

impl FromStr for SpindleDirection {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CW" => Ok(SpindleDirection::CW),
            "CCW" => Ok(SpindleDirection::CCW),
            _ => Err(ConfigError::UnknownValue {
                kind: "spindle direction",
                value: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for SpindleDirection {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// What kind of object the operation sequence was planned from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(try_from = "String")]
pub enum JobKind {
    #[default]
    Geometry,
    Excellon,
    #[serde(rename = "Excellon Geometry")]
    ExcellonGeometry,
}

impl JobKind {
    pub fn is_excellon(self) -> bool {
        matches!(self, JobKind::Excellon | JobKind::ExcellonGeometry)
    }
}

impl FromStr for JobKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(' ', "_").as_str() {
            "geometry" => Ok(JobKind::Geometry),
            "excellon" => Ok(JobKind::Excellon),
            "excellon_geometry" => Ok(JobKind::ExcellonGeometry),
            _ => Err(ConfigError::UnknownValue {
                kind: "job kind",
                value: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for JobKind {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// 2D position (X, Y)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Job extents, reported in header comments only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct BoundingBox {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

/// One row of the job's tool table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolUsage {
    pub tool_id: u32,
    pub diameter: f64,
    /// Number of drill hits planned with this tool (Excellon jobs)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drill_count: Option<u32>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LineNumbering {
    pub start: u32,
    pub step: u32,
}

impl Default for LineNumbering {
    fn default() -> Self {
        Self { start: 10, step: 10 }
    }
}

fn default_true() -> bool {
    true
}

/// Everything a dialect needs to know about the current job.
///
/// Required fields carry no serde default, so a job file that omits one is
/// rejected when it is loaded. Fields that are legitimately optional
/// deserialize to `None`/`false`/empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MachiningContext {
    pub units: Units,
    #[serde(default)]
    pub job_kind: JobKind,

    pub coords_decimals: usize,
    pub feedrate_decimals: usize,

    /// Cutting depth, negative below the material surface
    pub z_cut: f64,
    /// Safe travel height
    pub z_move: f64,
    pub z_toolchange: f64,
    #[serde(default)]
    pub startz: Option<f64>,
    #[serde(default)]
    pub z_end: Option<f64>,

    pub feedrate: f64,
    pub z_feedrate: f64,
    pub feedrate_rapid: f64,

    #[serde(default)]
    pub spindle_speed: Option<u32>,
    pub spindle_direction: SpindleDirection,

    #[serde(default)]
    pub multidepth: bool,
    #[serde(default)]
    pub depth_per_cut: Option<f64>,

    pub tool_id: u32,
    pub tool_diameter: f64,
    #[serde(default)]
    pub toolchange_xy: Option<Position>,
    /// Lift to `z_move` right after a tool change
    #[serde(default)]
    pub fast_plunge: bool,
    #[serde(default)]
    pub tools_in_use: Vec<ToolUsage>,

    pub bounding_box: BoundingBox,
    pub steps_per_circle: u32,

    #[serde(default)]
    pub dwell_enabled: bool,
    #[serde(default)]
    pub dwell_time: Option<f64>,

    #[serde(default = "default_true")]
    pub include_header: bool,
    #[serde(default)]
    pub line_numbers: Option<LineNumbering>,
}

impl Default for MachiningContext {
    fn default() -> Self {
        Self {
            units: Units::Metric,
            job_kind: JobKind::Geometry,
            coords_decimals: 4,
            feedrate_decimals: 2,
            z_cut: -1.2,
            z_move: 2.0,
            z_toolchange: 15.0,
            startz: None,
            z_end: None,
            feedrate: 120.0,
            z_feedrate: 60.0,
            feedrate_rapid: 1500.0,
            spindle_speed: None,
            spindle_direction: SpindleDirection::CW,
            multidepth: false,
            depth_per_cut: None,
            tool_id: 1,
            tool_diameter: 1.0,
            toolchange_xy: None,
            fast_plunge: false,
            tools_in_use: Vec::new(),
            bounding_box: BoundingBox::default(),
            steps_per_circle: 64,
            dwell_enabled: false,
            dwell_time: None,
            include_header: true,
            line_numbers: None,
        }
    }
}

impl MachiningContext {
    pub fn new(units: Units) -> Self {
        Self {
            units,
            ..Self::default()
        }
    }

    pub fn with_decimals(mut self, coords: usize, feedrate: usize) -> Self {
        self.coords_decimals = coords;
        self.feedrate_decimals = feedrate;
        self
    }

    pub fn with_depths(mut self, z_cut: f64, z_move: f64) -> Self {
        self.z_cut = z_cut;
        self.z_move = z_move;
        self
    }

    pub fn with_feedrates(mut self, feedrate: f64, z_feedrate: f64) -> Self {
        self.feedrate = feedrate;
        self.z_feedrate = z_feedrate;
        self
    }

    pub fn with_spindle(mut self, speed: Option<u32>, direction: SpindleDirection) -> Self {
        self.spindle_speed = speed;
        self.spindle_direction = direction;
        self
    }

    pub fn with_multidepth(mut self, depth_per_cut: f64) -> Self {
        self.multidepth = true;
        self.depth_per_cut = Some(depth_per_cut);
        self
    }

    pub fn with_toolchange_xy(mut self, x: f64, y: f64) -> Self {
        self.toolchange_xy = Some(Position::new(x, y));
        self
    }

    pub fn with_dwell(mut self, seconds: f64) -> Self {
        self.dwell_enabled = true;
        self.dwell_time = Some(seconds);
        self
    }

    pub fn with_line_numbers(mut self, start: u32, step: u32) -> Self {
        self.line_numbers = Some(LineNumbering { start, step });
        self
    }

    /// Number of depth passes needed to reach `z_cut`, or `None` when
    /// multi-depth cutting is off.
    pub fn pass_count(&self) -> Option<u32> {
        if !self.multidepth {
            return None;
        }
        let per_cut = self.depth_per_cut?;
        if per_cut <= 0.0 || !per_cut.is_finite() || !self.z_cut.is_finite() {
            return None;
        }
        // Absorb float noise so 1.1 / 0.1 stays 11 passes, not 12
        let passes = (self.z_cut.abs() / per_cut - 1e-9).ceil();
        Some(passes.max(1.0) as u32)
    }

    /// Look up a tool in the job's tool table.
    pub fn tool_usage(&self, tool_id: u32) -> Option<&ToolUsage> {
        self.tools_in_use.iter().find(|t| t.tool_id == tool_id)
    }
}
