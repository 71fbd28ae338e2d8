//! Tally Clock
//!
//! Reads the reporting time printed on photographed election tally sheets,
//! falls back to larger and rotated crops when the first read fails, and keeps
//! the results in a CSV that a human can review and correct.

mod analysis;
mod automation;
mod cli;
mod correction;
mod ocr;
mod paths;
mod store;

use chrono::Local;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// Sends every log line to stderr and, when available, the log file.
struct LogTee {
    file: Option<File>,
}

impl LogTee {
    fn open(path: &Path) -> Self {
        let file = path
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|_| OpenOptions::new().create(true).append(true).open(path));
        match file {
            Ok(file) => Self { file: Some(file) },
            Err(e) => {
                eprintln!("Cannot open log file {}: {}", path.display(), e);
                Self { file: None }
            }
        }
    }
}

impl Write for LogTee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        if let Some(file) = &mut self.file {
            // Console output continues once the file stops accepting writes
            if file.write_all(buf).is_err() {
                self.file = None;
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Some(file) = &mut self.file {
            file.flush()?;
        }
        io::stderr().flush()
    }
}

/// Sets up logging as `[HH:MM:SS.mmm] LEVEL message` to the console and the
/// log file under the data directory.
///
/// `RUST_LOG` takes precedence over the `-v` default.
fn init_logging() {
    let default_level = if cli::is_verbose() {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .target(env_logger::Target::Pipe(Box::new(LogTee::open(
            &paths::get_log_path(),
        ))))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {:<5} {}",
                Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                record.args()
            )
        })
        .init();
}

fn main() -> anyhow::Result<()> {
    init_logging();

    // Route panics through the logger so they land next to the run's output
    std::panic::set_hook(Box::new(|panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = panic_info
            .location()
            .map(|loc| format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column()))
            .unwrap_or_default();
        log::error!("[PANIC]{} {}", location, msg);
    }));

    cli::run()
}
