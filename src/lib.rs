//! kerf - machining-dialect code generator
//!
//! Turns an ordered sequence of abstract machining operations into the
//! control program of one specific controller family.

pub mod codegen;
pub mod context;
pub mod format;
pub mod job;
pub mod lexer;
pub mod operation;
pub mod post;
pub mod validator;

pub use codegen::{generate, CodeGenerator, GCodeOutput, GenerateError};
pub use context::{MachiningContext, SpindleDirection, Units};
pub use job::{Job, JobError};
pub use operation::{Operation, OperationSequence};
pub use post::{PostProcessor, PostProcessorType, ToolSelection};
pub use validator::{ConfigError, Validator};

/// Initialize logging
///
/// Logs go to stderr so generated code can be piped from stdout. `RUST_LOG`
/// overrides the default `info` level.
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
