use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use epmforge_core::{GenerationConfig, config_json_schema, validate_config_json};
use epmforge_generate::output::csv::write_frame_csv;
use epmforge_generate::{GenerationEngine, GenerationError, LogSink, stream_chunks};

#[derive(Debug, Error)]
enum CliError {
    #[error("core error: {0}")]
    Core(#[from] epmforge_core::Error),
    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[derive(Parser, Debug)]
#[command(name = "epmforge", version, about = "EPM Forge CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a dataset from a config document.
    Generate(GenerateArgs),
    /// Print the JSON Schema for config documents.
    Schema(SchemaArgs),
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Path to the generation config JSON document.
    config: PathBuf,
    /// Output directory for run artifacts.
    #[arg(long, default_value = "out")]
    out_dir: PathBuf,
    /// Output format for the generated rows.
    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,
    /// Stream rows in bounded chunks instead of one batch (JSONL output).
    #[arg(long, default_value_t = false)]
    stream: bool,
    /// Rows per chunk in streaming mode.
    #[arg(long, default_value_t = 10_000)]
    chunk_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Csv,
    Jsonl,
}

#[derive(Args, Debug)]
struct SchemaArgs {
    /// Optional output path; prints to stdout when omitted.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Generate(args) => run_generate(args),
        Command::Schema(args) => run_schema(args),
    }
}

fn load_config(path: &Path) -> Result<GenerationConfig, CliError> {
    let raw = fs::read_to_string(path)?;
    let doc: serde_json::Value = serde_json::from_str(&raw)?;
    let violations = validate_config_json(&doc)?;
    if !violations.is_empty() {
        return Err(CliError::InvalidConfig(violations.join("; ")));
    }
    Ok(serde_json::from_value(doc)?)
}

fn run_generate(args: GenerateArgs) -> Result<(), CliError> {
    let config = load_config(&args.config)?;
    fs::create_dir_all(&args.out_dir)?;

    if args.stream {
        return run_stream(&config, &args);
    }

    let engine = GenerationEngine::with_progress(Arc::new(LogSink));
    let outcome = engine.run(&config)?;

    match args.format {
        OutputFormat::Csv => {
            let path = args.out_dir.join("rows.csv");
            let bytes = write_frame_csv(&path, &outcome.frame)?;
            info!(path = %path.display(), bytes, "rows written");
        }
        OutputFormat::Jsonl => {
            let path = args.out_dir.join("rows.jsonl");
            let mut buffer = String::new();
            for row in outcome.rows() {
                buffer.push_str(&serde_json::to_string(&row)?);
                buffer.push('\n');
            }
            fs::write(&path, buffer)?;
            info!(path = %path.display(), "rows written");
        }
    }

    let report_path = args.out_dir.join("generation_report.json");
    let report_doc = serde_json::json!({
        "report": outcome.report,
        "issues": outcome.issues,
    });
    fs::write(&report_path, serde_json::to_vec_pretty(&report_doc)?)?;
    info!(
        path = %report_path.display(),
        issues = outcome.issues.len(),
        "report written"
    );

    Ok(())
}

fn run_stream(config: &GenerationConfig, args: &GenerateArgs) -> Result<(), CliError> {
    if args.format != OutputFormat::Jsonl {
        info!("streaming mode always writes JSONL chunks");
    }

    let path = args.out_dir.join("chunks.jsonl");
    let mut file = std::io::BufWriter::new(fs::File::create(&path)?);
    let mut rows = 0_usize;
    for chunk in stream_chunks(config, args.chunk_size)? {
        let chunk = chunk?;
        rows += chunk.rows.len();
        file.write_all(chunk.to_jsonl()?.as_bytes())?;
    }
    file.flush()?;
    info!(path = %path.display(), rows, "chunks written");

    Ok(())
}

fn run_schema(args: SchemaArgs) -> Result<(), CliError> {
    let schema = config_json_schema()?;
    let rendered = serde_json::to_string_pretty(&schema)?;
    match args.out {
        Some(path) => {
            fs::write(&path, rendered)?;
            info!(path = %path.display(), "schema written");
        }
        None => println!("{rendered}"),
    }
    Ok(())
}
