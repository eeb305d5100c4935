//! Job files
//!
//! A job bundles one machining context with the operation sequence to
//! render, as JSON. The dialect may be named in the file or chosen by the
//! caller.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::context::{JobKind, MachiningContext, SpindleDirection, Units};
use crate::operation::OperationSequence;
use crate::post::PostProcessorType;
use crate::validator::ConfigError;

#[derive(Error, Debug)]
pub enum JobError {
    #[error("cannot read job file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed job: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    /// Registry key of the dialect, e.g. "grbl_laser"
    #[serde(default)]
    pub dialect: Option<String>,
    pub context: MachiningContext,
    #[serde(default)]
    pub operations: OperationSequence,
}

impl Job {
    pub fn from_json(json: &str) -> Result<Self, JobError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        if let Some(ctx) = value.get("context") {
            check_enum_fields(ctx)?;
        }
        let job: Job = serde_json::from_value(value)?;
        debug!(
            operations = job.operations.len(),
            dialect = job.dialect.as_deref().unwrap_or("unset"),
            "loaded job"
        );
        Ok(job)
    }

    /// Load job from JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, JobError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// The dialect to use: `requested` wins over the job's own choice, and
    /// the generic dialect is the fallback.
    pub fn post_type(&self, requested: Option<&str>) -> Result<PostProcessorType, JobError> {
        match requested.or(self.dialect.as_deref()) {
            Some(name) => Ok(name.parse::<PostProcessorType>()?),
            None => Ok(PostProcessorType::default()),
        }
    }
}

/// Enumerated context fields are parsed up front so a bad spelling is
/// reported as a configuration error rather than as malformed JSON.
fn check_enum_fields(ctx: &serde_json::Value) -> Result<(), ConfigError> {
    if let Some(s) = str_field(ctx, "units") {
        s.parse::<Units>()?;
    }
    if let Some(s) = str_field(ctx, "spindle_direction") {
        s.parse::<SpindleDirection>()?;
    }
    if let Some(s) = str_field(ctx, "job_kind") {
        s.parse::<JobKind>()?;
    }
    Ok(())
}

fn str_field<'a>(value: &'a serde_json::Value, name: &str) -> Option<&'a str> {
    value.get(name).and_then(serde_json::Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::Operation;
    use pretty_assertions::assert_eq;

    const CONTEXT: &str = r#"{
        "units": "mm",
        "coords_decimals": 3,
        "feedrate_decimals": 2,
        "z_cut": -0.1,
        "z_move": 5.0,
        "z_toolchange": 15.0,
        "feedrate": 500.0,
        "z_feedrate": 500.0,
        "feedrate_rapid": 1500.0,
        "spindle_speed": 255,
        "spindle_direction": "CW",
        "tool_id": 1,
        "tool_diameter": 0.2,
        "bounding_box": {"xmin": 0.0, "ymin": 0.0, "xmax": 10.0, "ymax": 10.0},
        "steps_per_circle": 64
    }"#;

    fn job_json(dialect: &str, operations: &str) -> String {
        format!(
            r#"{{ {} "context": {}, "operations": {} }}"#,
            dialect, CONTEXT, operations
        )
    }

    #[test]
    fn test_load_job() {
        let json = job_json(
            r#""dialect": "grbl_laser","#,
            r#"[{"op": "rapid_move", "x": 0.0, "y": 0.0},
                {"op": "spindle_on"},
                {"op": "linear_move", "x": 10.0, "y": 10.0}]"#,
        );
        let job = Job::from_json(&json).unwrap();

        assert_eq!(job.context.spindle_direction, SpindleDirection::CW);
        assert_eq!(
            job.operations,
            vec![
                Operation::rapid(0.0, 0.0),
                Operation::SpindleOn,
                Operation::linear(10.0, 10.0)
            ]
        );
        assert_eq!(job.post_type(None).unwrap(), PostProcessorType::GrblLaser);
        assert_eq!(job.post_type(Some("haas")).unwrap(), PostProcessorType::Haas);
    }

    #[test]
    fn test_dialect_defaults_to_generic() {
        let job = Job::from_json(&job_json("", "[]")).unwrap();
        assert_eq!(job.post_type(None).unwrap(), PostProcessorType::Generic);
    }

    #[test]
    fn test_unknown_dialect_is_config_error() {
        let job = Job::from_json(&job_json(r#""dialect": "fanuc","#, "[]")).unwrap();
        let err = job.post_type(None).unwrap_err();
        assert!(matches!(
            err,
            JobError::Config(ConfigError::UnknownValue { kind: "dialect", .. })
        ));
    }

    #[test]
    fn test_bad_spindle_direction_is_config_error() {
        let json = job_json("", "[]").replace(r#""CW""#, r#""REVERSE""#);
        let err = Job::from_json(&json).unwrap_err();
        match err {
            JobError::Config(e) => assert_eq!(
                e,
                ConfigError::UnknownValue {
                    kind: "spindle direction",
                    value: "REVERSE".to_string()
                }
            ),
            other => panic!("expected a configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_units_is_config_error() {
        let json = job_json("", "[]").replace(r#""mm""#, r#""furlongs""#);
        let err = Job::from_json(&json).unwrap_err();
        assert!(matches!(
            err,
            JobError::Config(ConfigError::UnknownValue { kind: "units", .. })
        ));
    }

    #[test]
    fn test_enum_spelling_ignores_case() {
        let json = job_json("", "[]")
            .replace(r#""CW""#, r#""Ccw""#)
            .replace(r#""mm""#, r#""Metric""#);
        let job = Job::from_json(&json).unwrap();
        assert_eq!(job.context.spindle_direction, SpindleDirection::CCW);
    }

    #[test]
    fn test_unknown_operation_rejected() {
        let err = Job::from_json(&job_json("", r#"[{"op": "arc_move"}]"#)).unwrap_err();
        assert!(matches!(err, JobError::Json(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = Job::from_file("/nonexistent/job.json").unwrap_err();
        assert!(matches!(err, JobError::Io(_)));
    }
}
