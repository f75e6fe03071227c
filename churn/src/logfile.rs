//! The log backend behind the `log` facade: newline-terminated UTF-8
//! lines to stderr, mirrored into an append-mode file when one was asked
//! for. Each line goes out as a single write so output from forked
//! children stays line-atomic.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::sync::Mutex;

use log::{LevelFilter, Log, Metadata, Record};

use crate::params::Params;

struct ChurnLogger {
    file: Option<Mutex<File>>,
}

impl Log for ChurnLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let pid = unsafe { churn_syscall::getpid() };
        let line = format!("[{}] {}\n", pid, record.args());
        // One raw write straight to stderr; no libc buffer to end up
        // duplicated across forks.
        unsafe {
            let _ = churn_syscall::write(
                2,
                line.as_ptr() as *const churn_syscall::void,
                line.len(),
            );
        }
        if let Some(file) = &self.file {
            if let Ok(mut f) = file.lock() {
                let _ = f.write_all(line.as_bytes());
            }
        }
    }

    fn flush(&self) {
        if let Some(file) = &self.file {
            if let Ok(mut f) = file.lock() {
                let _ = f.flush();
            }
        }
    }
}

fn level_for(quiet_level: u8) -> LevelFilter {
    match quiet_level {
        0 => LevelFilter::Trace,
        1 => LevelFilter::Info,
        2 => LevelFilter::Warn,
        _ => LevelFilter::Error,
    }
}

/// Install the logger. Called once, before any fork.
pub fn init(params: &Params) -> std::io::Result<()> {
    let file = match &params.logfile {
        Some(path) => Some(Mutex::new(
            OpenOptions::new().create(true).append(true).open(path)?,
        )),
        None => None,
    };
    let logger = ChurnLogger { file };
    log::set_boxed_logger(Box::new(logger))
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::AlreadyExists, e.to_string()))?;
    log::set_max_level(level_for(params.quiet_level));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_levels_map_to_filters() {
        assert_eq!(level_for(0), LevelFilter::Trace);
        assert_eq!(level_for(1), LevelFilter::Info);
        assert_eq!(level_for(2), LevelFilter::Warn);
        assert_eq!(level_for(3), LevelFilter::Error);
        assert_eq!(level_for(200), LevelFilter::Error);
    }
}
