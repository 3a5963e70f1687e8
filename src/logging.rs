use chrono::Utc;
use env_logger::{ Builder, Env, Logger, Target, WriteStyle };
use log::{ Log, Metadata, Record };
use serde_json::{ json, Value as JsonValue };
use std::error::Error;
use std::io::Write;
use std::path::Path;
use tracing_appender::rolling::{ RollingFileAppender, Rotation };

const LOG_FILE_SUFFIX: &str = "application.log";

/// Fans every record out to a human-readable console logger and a JSON-lines
/// logger writing to the daily rotating file. Both honour `RUST_LOG`.
struct TeeLogger {
    console: Logger,
    file: Logger,
}

impl Log for TeeLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.console.enabled(metadata) || self.file.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        self.console.log(record);
        self.file.log(record);
    }

    fn flush(&self) {
        self.console.flush();
        self.file.flush();
    }
}

fn json_line(record: &Record) -> JsonValue {
    json!({
        "timestamp": Utc::now().to_rfc3339(),
        "level": record.level().to_string(),
        "target": record.target(),
        "message": record.args().to_string(),
    })
}

/// JSON-lines logger over a daily rolling file named `YYYY-MM-DD.application.log`
/// in `log_dir`. At most `max_files` files are kept.
fn file_logger(
    log_dir: &Path,
    max_files: usize,
    env: Env<'_>
) -> Result<Logger, Box<dyn Error + Send + Sync>> {
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_suffix(LOG_FILE_SUFFIX)
        .max_log_files(max_files.max(1))
        .build(log_dir)?;

    Ok(
        Builder::from_env(env)
            .format(|buf, record| writeln!(buf, "{}", json_line(record)))
            .write_style(WriteStyle::Never)
            .target(Target::Pipe(Box::new(appender)))
            .build()
    )
}

/// Installs the global logger: console output plus the rotating JSON file.
pub fn init(log_dir: &Path, max_files: usize) -> Result<(), Box<dyn Error + Send + Sync>> {
    let console = Builder::from_env(Env::default().default_filter_or("info")).build();
    let file = file_logger(log_dir, max_files, Env::default().default_filter_or("info"))?;

    let max_level = console.filter().max(file.filter());
    log::set_boxed_logger(Box::new(TeeLogger { console, file }))?;
    log::set_max_level(max_level);
    Ok(())
}
