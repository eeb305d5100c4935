use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use kerf::lexer::{check_precision, Expectation};
use kerf::{CodeGenerator, Job, MachiningContext, PostProcessorType};

#[derive(Parser)]
#[command(name = "kerf")]
#[command(about = "Render machining jobs as controller-specific G-code", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a control program from a JSON job file
    Generate {
        /// Job file: machining context plus operation sequence
        job: PathBuf,
        /// Dialect key, overriding the one named in the job
        #[arg(short, long)]
        dialect: Option<String>,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List the available dialects
    Dialects,
    /// Check the numeric precision of a generated program
    Check {
        file: PathBuf,
        #[arg(short, long, default_value = "default")]
        dialect: String,
        #[arg(long, default_value_t = 4)]
        coords_decimals: usize,
        #[arg(long, default_value_t = 2)]
        feedrate_decimals: usize,
    },
}

fn main() -> Result<()> {
    kerf::init_logging()?;
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            job,
            dialect,
            output,
        } => generate(&job, dialect.as_deref(), output)?,
        Commands::Dialects => {
            for kind in PostProcessorType::ALL {
                println!("{:<14} {}", kind.key(), kind.get_processor().name());
            }
        }
        Commands::Check {
            file,
            dialect,
            coords_decimals,
            feedrate_decimals,
        } => check(&file, &dialect, coords_decimals, feedrate_decimals)?,
    }

    Ok(())
}

fn generate(path: &Path, dialect: Option<&str>, output: Option<PathBuf>) -> Result<()> {
    let job = Job::from_file(path).with_context(|| format!("loading {}", path.display()))?;
    let kind = job.post_type(dialect)?;
    let post = kind.get_processor();

    let gcode = CodeGenerator::new(post.as_ref()).generate(&job.context, &job.operations)?;

    match output {
        Some(out) => {
            fs::write(&out, &gcode).with_context(|| format!("writing {}", out.display()))?;
            info!(dialect = %kind, output = %out.display(), "generated");
        }
        None => print!("{}", gcode),
    }
    Ok(())
}

fn check(path: &Path, dialect: &str, coords_decimals: usize, feedrate_decimals: usize) -> Result<()> {
    let source = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let post = dialect.parse::<PostProcessorType>()?.get_processor();
    let ctx = MachiningContext::default().with_decimals(coords_decimals, feedrate_decimals);
    let expect = Expectation::new(post.as_ref(), &ctx);

    let violations = check_precision(&source, &expect)?;
    if violations.is_empty() {
        info!(file = %path.display(), "precision ok");
        return Ok(());
    }
    for v in &violations {
        warn!("{}", v);
    }
    bail!("{} word(s) with wrong precision", violations.len())
}
