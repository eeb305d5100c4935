use thiserror::Error;

use crate::context::MachiningContext;
use crate::format::MAX_DECIMALS;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("missing required field `{field}`")]
    MissingField { field: &'static str },

    #[error("unrecognized {kind}: `{value}`")]
    UnknownValue { kind: &'static str, value: String },

    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Checks a context for the fields the dialects rely on before any output
/// is produced.
pub struct Validator {
    max_decimals: usize,
}

impl Default for Validator {
    fn default() -> Self {
        Self {
            max_decimals: MAX_DECIMALS,
        }
    }
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate_context(&self, ctx: &MachiningContext) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();

        for (field, decimals) in [
            ("coords_decimals", ctx.coords_decimals),
            ("feedrate_decimals", ctx.feedrate_decimals),
        ] {
            if decimals > self.max_decimals {
                errors.push(ConfigError::InvalidValue {
                    field,
                    reason: format!("{} digits exceeds the maximum of {}", decimals, self.max_decimals),
                });
            }
        }

        for (field, rate) in [
            ("feedrate", ctx.feedrate),
            ("z_feedrate", ctx.z_feedrate),
            ("feedrate_rapid", ctx.feedrate_rapid),
        ] {
            if let Err(e) = positive(field, rate) {
                errors.push(e);
            }
        }

        if let Err(e) = positive("tool_diameter", ctx.tool_diameter) {
            errors.push(e);
        }

        if ctx.spindle_speed == Some(0) {
            errors.push(ConfigError::InvalidValue {
                field: "spindle_speed",
                reason: "must be positive when set".to_string(),
            });
        }

        if ctx.multidepth {
            match ctx.depth_per_cut {
                None => errors.push(ConfigError::MissingField {
                    field: "depth_per_cut",
                }),
                Some(depth) => {
                    if let Err(e) = positive("depth_per_cut", depth) {
                        errors.push(e);
                    }
                }
            }
        }

        if ctx.dwell_enabled {
            match ctx.dwell_time {
                None => errors.push(ConfigError::MissingField { field: "dwell_time" }),
                Some(time) => {
                    if let Err(e) = positive("dwell_time", time) {
                        errors.push(e);
                    }
                }
            }
        }

        if let Some(numbering) = ctx.line_numbers {
            if numbering.step == 0 {
                errors.push(ConfigError::InvalidValue {
                    field: "line_numbers.step",
                    reason: "must be at least 1".to_string(),
                });
            } else if numbering.start.checked_add(numbering.step).is_none() {
                errors.push(ConfigError::InvalidValue {
                    field: "line_numbers.start",
                    reason: format!("no room for a second line number below {}", u32::MAX),
                });
            }
        }

        for tool in &ctx.tools_in_use {
            if let Err(e) = positive("tools_in_use.diameter", tool.diameter) {
                errors.push(e);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field,
            reason: format!("{} (must be a positive number)", value),
        })
    }
}
