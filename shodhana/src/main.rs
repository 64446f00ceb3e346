//! Shodhana viewer backend
//!
//! Reads operator events as JSON lines on stdin and writes viewer messages as
//! JSON lines on stdout. Logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! # Default config (shodhana.toml if present)
//! shodhana --data-dir /data/maps/office
//!
//! # Custom config file, start in reference mode
//! shodhana --config office.toml --mode ref
//! ```

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use shodhana::{Config, JsonLinesPublisher, LoadOutcome, OperatorEvent, SelectionMode, Session};

const DEFAULT_CONFIG_PATH: &str = "shodhana.toml";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Map data folder (overrides [data] folder)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Reference frame label (overrides [frame] base_frame)
    #[arg(long)]
    base_frame: Option<String>,

    /// Initial selection mode
    #[arg(short, long, value_enum)]
    mode: Option<SelectionMode>,
}

/// Load config from `--config`, else the default path, else defaults.
fn load_config(args: &Args) -> Result<Config, shodhana::ConfigError> {
    let mut config = match &args.config {
        Some(path) => {
            let cfg = Config::from_file(path)?;
            log::info!("Loaded config from {}", path.display());
            cfg
        }
        None => match Config::from_file(Path::new(DEFAULT_CONFIG_PATH)) {
            Ok(cfg) => {
                log::info!("Loaded config from {}", DEFAULT_CONFIG_PATH);
                cfg
            }
            Err(shodhana::ConfigError::Read { .. }) => Config::default(),
            Err(e) => return Err(e),
        },
    };

    if let Some(dir) = &args.data_dir {
        config.data.folder = dir.clone();
    }
    if let Some(frame) = &args.base_frame {
        config.frame.base_frame = frame.clone();
    }
    if let Some(mode) = args.mode {
        config.selection.initial_mode = mode;
    }
    config.validate()?;
    Ok(config)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {} - {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();

    let args = Args::parse();
    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    log::info!("shodhana starting");
    log::info!("  Data folder: {}", config.data.folder.display());
    log::info!("  Frame: {}", config.frame.base_frame);
    log::info!("  Initial mode: {}", config.selection.initial_mode);

    let publisher = JsonLinesPublisher::new(io::stdout().lock());
    let mut session = Session::new(config, publisher);

    match session.start() {
        Ok(LoadOutcome::Loaded(summary)) if !summary.missing_scans.is_empty() => {
            log::warn!("Scans missing for ids {:?}", summary.missing_scans);
        }
        Ok(_) => {}
        Err(e) => log::error!("Starting with an empty store: {}", e),
    }

    for (line_no, line) in io::stdin().lock().lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                log::error!("Failed to read stdin: {}", e);
                return ExitCode::FAILURE;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<OperatorEvent>(&line) {
            Ok(event) => session.dispatch(event),
            Err(e) => log::warn!("Ignoring malformed event on line {}: {}", line_no + 1, e),
        }
    }

    log::info!(
        "Input closed, {} messages written",
        session.viewer().messages_written()
    );
    ExitCode::SUCCESS
}
