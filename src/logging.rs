use crate::config::{LogTarget, Options};
use anyhow::{Context, Result};
use log::LevelFilter;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

const LOG_FILE: &str = ".twitter_sms-log";
const TIMESTAMP_FORMAT: &str = "(%b %d - %H:%M:%S)";

/// `~/.twitter_sms-log`
pub fn default_log_path() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(LOG_FILE))
        .unwrap_or_else(|| PathBuf::from(LOG_FILE))
}

/// Builds the logger the options ask for. With `debug` on, debug records
/// are kept and every line is timestamped. `RUST_LOG` still wins.
pub fn builder(options: &Options, log_path: PathBuf) -> Result<env_logger::Builder> {
    let level = if options.debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level).parse_default_env();

    let target = match options.log_to {
        LogTarget::Console => env_logger::Target::Stdout,
        LogTarget::File => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_path)
                .with_context(|| format!("Couldn't open log file {}", log_path.display()))?;
            env_logger::Target::Pipe(Box::new(file))
        }
    };
    builder.target(target);

    let timestamped = options.debug;
    builder.format(move |buf, record| {
        if timestamped {
            writeln!(
                buf,
                "{} {}",
                chrono::Local::now().format(TIMESTAMP_FORMAT),
                record.args()
            )
        } else {
            writeln!(buf, "{}", record.args())
        }
    });

    Ok(builder)
}

/// Installs the global logger. Only the first call has any effect; later
/// config reloads don't move the log.
pub fn init(options: &Options) -> Result<()> {
    builder(options, default_log_path())?
        .try_init()
        .context("Couldn't install the logger")?;
    Ok(())
}
