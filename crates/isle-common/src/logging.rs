use chrono::Local;
use log::{Level, LevelFilter, Metadata, Record};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::paths::isle_log_dir;

static SESSION_DIR: Mutex<Option<PathBuf>> = Mutex::new(None);

/// Per-session logger. Info and above land in `isle.log`, debug and trace in
/// `isle.dbg.log`; every line is mirrored to stderr.
pub struct FileLogger {
    level: LevelFilter,
    main_file: Mutex<File>,
    debug_file: Mutex<File>,
}

impl FileLogger {
    pub fn init(level: LevelFilter) -> Result<(), Box<dyn std::error::Error>> {
        Self::init_in(&isle_log_dir(), level)
    }

    pub fn init_in(log_dir: &Path, level: LevelFilter) -> Result<(), Box<dyn std::error::Error>> {
        fs::create_dir_all(log_dir)?;

        let session_num = next_session_number(log_dir);
        let session_dir = log_dir.join(format!("session-{}", session_num));
        fs::create_dir_all(&session_dir)?;

        if let Ok(mut guard) = SESSION_DIR.lock() {
            *guard = Some(session_dir.clone());
        }

        let main_file = Self::open_log_file(&session_dir, "isle.log")?;
        let debug_file = Self::open_log_file(&session_dir, "isle.dbg.log")?;

        let logger = FileLogger {
            level,
            main_file: Mutex::new(main_file),
            debug_file: Mutex::new(debug_file),
        };

        log::set_max_level(level);
        log::set_logger(Box::leak(Box::new(logger)))
            .map_err(|e| format!("Failed to set logger: {}", e))?;

        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        log::info!("=== Isle Session {} ===", session_num);
        log::info!("Log directory: {}", session_dir.display());
        log::info!("Started at: {}", timestamp);

        Ok(())
    }

    fn open_log_file(dir: &Path, name: &str) -> Result<File, Box<dyn std::error::Error>> {
        let path = dir.join(name);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;
        Ok(file)
    }
}

impl log::Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let timestamp = Local::now().format("%H:%M:%S%.3f");
        let level_char = match record.level() {
            Level::Error => 'E',
            Level::Warn => 'W',
            Level::Info => 'I',
            Level::Debug => 'D',
            Level::Trace => 'T',
        };

        let log_line = format!("{} {} {}\n", timestamp, record.target(), record.args());

        let file_mutex = if record.level() == Level::Debug || record.level() == Level::Trace {
            &self.debug_file
        } else {
            &self.main_file
        };

        if let Ok(mut file) = file_mutex.lock() {
            let _ = file.write_all(log_line.as_bytes());
            let _ = file.flush();
        }

        eprint!("{} {} {}", timestamp, level_char, log_line);
    }

    fn flush(&self) {
        let _ = self.main_file.lock().map(|mut f| f.flush());
        let _ = self.debug_file.lock().map(|mut f| f.flush());
    }
}

pub fn current_session_dir() -> Option<PathBuf> {
    SESSION_DIR.lock().ok()?.clone()
}

/// Accepts the usual level names, case-insensitively.
pub fn parse_level(s: &str) -> Option<LevelFilter> {
    match s.trim().to_lowercase().as_str() {
        "off" | "none" => Some(LevelFilter::Off),
        "error" | "err" => Some(LevelFilter::Error),
        "warn" | "warning" => Some(LevelFilter::Warn),
        "info" => Some(LevelFilter::Info),
        "debug" | "dbg" => Some(LevelFilter::Debug),
        "trace" => Some(LevelFilter::Trace),
        _ => None,
    }
}

fn next_session_number(log_dir: &Path) -> u32 {
    let mut max_num = 0u32;

    if let Ok(entries) = fs::read_dir(log_dir) {
        for entry in entries.flatten() {
            let name = entry.file_name();
            let name_str = name.to_string_lossy();

            if let Some(rest) = name_str.strip_prefix("session-") {
                if let Ok(num) = rest.parse::<u32>() {
                    max_num = max_num.max(num);
                }
            }
        }
    }

    max_num + 1
}
