use std::path::PathBuf;

use anyhow::anyhow;
use bastian::config::EngineConfig;
use bastian::{Engine, ExportBuilder, FunctionContext, Value, BACKEND};
use clap::Parser;
use log::{debug, LevelFilter};
use simple_logger::SimpleLogger;

#[derive(Debug, Parser)]
#[clap(name = "run-js", version = "0.1.0", author = "Bastian", about = "Run a javascript file")]
struct Cli {
    #[clap(short = 'c', long = "config", help = "Engine configuration (json)")]
    config: Option<PathBuf>,

    #[clap(short = 'l', long = "log-level", default_value = "warn")]
    log_level: LogLevel,

    #[clap(required = true, help = "The script to run")]
    script: PathBuf,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

fn globals(obj: &mut ExportBuilder) {
    obj.export("version", Value::string(env!("CARGO_PKG_VERSION")));
    obj.export_fn("print", |cb: &mut FunctionContext| {
        let line = cb
            .arguments()
            .iter()
            .map(|arg| arg.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        println!("{line}");
    });
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    SimpleLogger::new()
        .with_level(args.log_level.into())
        .init()
        .map_err(|e| anyhow!("failed to initialise logging: {e}"))?;

    let config = match &args.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };

    let code = std::fs::read_to_string(&args.script)
        .map_err(|e| anyhow!("cannot read {}: {e}", args.script.display()))?;

    debug!("running {} on {BACKEND}", args.script.display());

    let engine = Engine::with_config(config, globals);
    let value = engine.run(&code)?;

    if !value.is_undefined() {
        println!("{value}");
    }

    Ok(())
}
