//! Abstract machining steps, as handed over by the toolpath planner.
//! Order is significant: the assembler never reorders or deduplicates.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    RapidMove { x: f64, y: f64 },
    LinearMove { x: f64, y: f64 },
    ToolChange { tool_id: u32 },
    /// Start of depth pass `pass_index` (1-based) at height `z`
    DepthPassBoundary { pass_index: u32, z: f64 },
    SpindleOn,
    SpindleOff,
    Dwell,
    /// Full drill hit at (x, y): position, plunge, retract
    Drill { x: f64, y: f64 },
    ReturnToReference,
    Comment { text: String },
}

pub type OperationSequence = Vec<Operation>;

impl Operation {
    pub fn rapid(x: f64, y: f64) -> Self {
        Operation::RapidMove { x, y }
    }

    pub fn linear(x: f64, y: f64) -> Self {
        Operation::LinearMove { x, y }
    }

    pub fn comment(text: impl Into<String>) -> Self {
        Operation::Comment { text: text.into() }
    }
}
