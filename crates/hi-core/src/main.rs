//! handinput core CLI
//!
//! - `check`: validate a trained model and print its summary
//! - `replay`: run recorded frames through a gesture session
//! - `version`: print version information

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use hi_core::config::{load_config, ConfigOptions, ResolvedConfig, CONFIG_SCHEMA_VERSION};
use hi_core::events::EventKind;
use hi_core::exit_codes::ExitCode;
use hi_core::logging::{
    event_names, generate_run_id, init_logging, LogConfig, LogContext, LogFormat, LogLevel, Stage,
};
use hi_core::{load_model, Error, GestureProcessor, HandFrame, TrainedModel};
use hi_model::MODEL_SCHEMA_VERSION;
use serde_json::{json, Map, Value};

/// handinput - real-time hand gesture recognition
#[derive(Parser)]
#[command(name = "hi-core")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Engine config file (overrides HI_CONFIG and the XDG config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log format on stderr (human or jsonl)
    #[arg(long, global = true, env = "HI_LOG_FORMAT")]
    log_format: Option<LogFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a trained model and print a JSON summary
    Check(ModelArgs),

    /// Replay recorded frames (JSON lines) and print one record per frame
    Replay(ReplayArgs),

    /// Print version information
    Version,
}

#[derive(Args, Debug)]
struct ModelArgs {
    /// Trained model file (defaults to model_path from the engine config)
    #[arg(long, short = 'm')]
    model: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ReplayArgs {
    #[command(flatten)]
    model: ModelArgs,

    /// Frames file, one JSON object per line (default: stdin)
    #[arg(long, short = 'i')]
    input: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    let cli_level = if cli.global.quiet {
        Some(LogLevel::Error)
    } else {
        match cli.global.verbose {
            0 => None,
            1 => Some(LogLevel::Debug),
            _ => Some(LogLevel::Trace),
        }
    };
    init_logging(&LogConfig::from_env(cli_level, cli.global.log_format));

    let run_id = generate_run_id();
    let context = LogContext::new(run_id.clone());
    let _run = context.span().entered();
    tracing::debug!(
        target: "hi_core::cli",
        event = event_names::RUN_STARTED,
        run_id = %run_id,
        stage = %Stage::Init,
        "run started"
    );

    let exit_code = match &cli.command {
        Commands::Check(args) => run_check(&cli.global, args),
        Commands::Replay(args) => run_replay(&cli.global, args, &context),
        Commands::Version => print_version(),
    };

    tracing::debug!(
        target: "hi_core::cli",
        event = event_names::RUN_FINISHED,
        run_id = %run_id,
        exit_code = %exit_code,
        "run finished"
    );
    std::process::exit(exit_code.as_i32());
}

fn resolve_config(global: &GlobalOpts) -> Result<ResolvedConfig, ExitCode> {
    let options = ConfigOptions {
        config_dir: None,
        config_path: global.config.clone(),
    };
    match load_config(&options) {
        Ok(config) => {
            let event = if config.path.is_some() {
                event_names::CONFIG_LOADED
            } else {
                event_names::CONFIG_DEFAULT_USED
            };
            tracing::debug!(target: "hi_core::cli", event, path = ?config.path, "config ready");
            Ok(config)
        }
        Err(e) => Err(report_error(&Error::from(e))),
    }
}

fn resolve_model(args: &ModelArgs, config: &ResolvedConfig) -> Result<TrainedModel, ExitCode> {
    let path = match args.model.clone().or_else(|| config.model_path()) {
        Some(path) => path,
        None => {
            emit_error(
                ExitCode::ArgsError,
                "no model given: pass --model or set model_path in the engine config",
            );
            return Err(ExitCode::ArgsError);
        }
    };
    load_model(&path).map_err(|e| report_error(&Error::from(e)))
}

fn run_check(global: &GlobalOpts, args: &ModelArgs) -> ExitCode {
    let config = match resolve_config(global) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let model = match resolve_model(args, &config) {
        Ok(m) => m,
        Err(code) => return code,
    };

    let output = json!({
        "status": "ok",
        "model": model.summary(),
        "config": config.snapshot(),
    });
    match write_line(&mut io::stdout().lock(), &output) {
        Ok(()) => ExitCode::Clean,
        Err(_) => ExitCode::IoError,
    }
}

fn run_replay(global: &GlobalOpts, args: &ReplayArgs, context: &LogContext) -> ExitCode {
    let config = match resolve_config(global) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let model = match resolve_model(&args.model, &config) {
        Ok(m) => Arc::new(m),
        Err(code) => return code,
    };
    let mut processor = match GestureProcessor::with_model(model, config.engine.clone()) {
        Ok(p) => p,
        Err(e) => return report_error(&e),
    };
    let _session = context
        .clone()
        .with_session_id(processor.session_id())
        .span()
        .entered();

    let reader: Box<dyn BufRead> = match &args.input {
        Some(path) => match File::open(path) {
            Ok(f) => Box::new(BufReader::new(f)),
            Err(e) => {
                emit_error(
                    ExitCode::ArgsError,
                    &format!("cannot open {}: {}", path.display(), e),
                );
                return ExitCode::ArgsError;
            }
        },
        None => Box::new(BufReader::new(io::stdin())),
    };

    match replay(&mut processor, reader, args.input.as_deref()) {
        Ok(0) => ExitCode::Clean,
        Ok(_) => ExitCode::GesturesDetected,
        Err(code) => code,
    }
}

/// Feed every non-blank line to the processor. Returns the number of
/// gesture starts.
fn replay(
    processor: &mut GestureProcessor,
    reader: impl BufRead,
    source: Option<&Path>,
) -> Result<usize, ExitCode> {
    let origin = source
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<stdin>".to_string());
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut starts = 0;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|_| ExitCode::IoError)?;
        if line.trim().is_empty() {
            continue;
        }
        let frame: HandFrame = serde_json::from_str(&line).map_err(|e| {
            emit_error(
                ExitCode::InputError,
                &format!("{}:{}: invalid frame: {}", origin, line_no + 1, e),
            );
            ExitCode::InputError
        })?;

        let mut record = Map::new();
        let detection = processor.process(&frame, &mut record).map_err(|e| {
            tracing::error!(
                target: "hi_core::cli",
                event = event_names::FRAME_REJECTED,
                stage = %Stage::Replay,
                line = line_no + 1,
                error = %e,
                "frame rejected"
            );
            report_error(&e)
        })?;
        if let Some(d) = detection {
            starts += d.events().filter(|e| e.kind == EventKind::Start).count();
        }
        write_line(&mut out, &Value::Object(record)).map_err(|_| ExitCode::IoError)?;
    }

    tracing::info!(
        target: "hi_core::cli",
        stage = %Stage::Replay,
        session_id = %processor.session_id(),
        starts,
        "replay finished"
    );
    Ok(starts)
}

fn print_version() -> ExitCode {
    let info = json!({
        "hi_core_version": env!("CARGO_PKG_VERSION"),
        "model_schema_version": MODEL_SCHEMA_VERSION,
        "config_schema_version": CONFIG_SCHEMA_VERSION,
        "rust_version": env!("CARGO_PKG_RUST_VERSION"),
    });
    match write_line(&mut io::stdout().lock(), &info) {
        Ok(()) => ExitCode::Clean,
        Err(_) => ExitCode::IoError,
    }
}

fn write_line(out: &mut impl Write, value: &Value) -> io::Result<()> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)
}

/// Log an error, print it as JSON on stdout, and return its exit code.
fn report_error(err: &Error) -> ExitCode {
    let code = ExitCode::from(err);
    tracing::error!(target: "hi_core::cli", error = %err, code = err.code(), "command failed");
    emit_error(code, &err.to_string());
    code
}

fn emit_error(code: ExitCode, message: &str) {
    let output = json!({
        "status": "error",
        "code": code.code_name(),
        "message": message,
    });
    // Nothing more to do if stdout itself is gone.
    let _ = write_line(&mut io::stdout().lock(), &output);
}
