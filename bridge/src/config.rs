//! Command-line configuration

use clap::Parser;
use rov_autopilot::{Result, Settings, DEFAULT_EVENT_CAPACITY};
use std::path::PathBuf;

/// Default number of days of log files to keep
pub const DEFAULT_LOG_KEEP_DAYS: i64 = 7;

#[derive(Parser, Debug, Clone)]
#[command(name = "rov-bridge")]
#[command(about = "ROV autopilot over JSON lines on stdin/stdout", long_about = None)]
pub struct Args {
    /// Initial autopilot settings (JSON). Without it, movement waits for a settings-change event.
    #[arg(long, value_name = "PATH", env = "ROV_AUTOPILOT_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Directory for daily rolling log files. Console logging only when absent.
    #[arg(long, value_name = "DIR", env = "ROV_BRIDGE_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Log files older than this many days are deleted at startup
    #[arg(long, default_value_t = DEFAULT_LOG_KEEP_DAYS)]
    pub log_keep_days: i64,

    /// Capacity of the outbound event buffer
    #[arg(long, default_value_t = DEFAULT_EVENT_CAPACITY)]
    pub event_buffer: usize,
}

impl Args {
    pub fn load_settings(&self) -> Result<Option<Settings>> {
        match &self.settings {
            Some(path) => Settings::load(path).map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["rov-bridge"]).unwrap();
        assert_eq!(args.log_keep_days, 7);
        assert_eq!(args.event_buffer, 256);
        assert!(args.log_dir.is_none());
        assert_eq!(args.load_settings().unwrap(), None);
    }

    #[test]
    fn test_loads_settings_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"rov_current_speed": 1.5, "stabilization_time": 2000}}"#).unwrap();

        let path = file.path().to_string_lossy().to_string();
        let args = Args::try_parse_from(["rov-bridge", "--settings", path.as_str(), "--event-buffer", "64"]).unwrap();
        let settings = args.load_settings().unwrap().unwrap();
        assert_eq!(settings.rov_speed, 1.5);
        assert_eq!(settings.stabilization_ms, 2000);
        assert_eq!(settings.poll_interval_ms, 100);
        assert_eq!(args.event_buffer, 64);
    }

    #[test]
    fn test_missing_settings_file_is_an_error() {
        let args = Args::try_parse_from(["rov-bridge", "--settings", "/nonexistent/rov.json"]).unwrap();
        assert!(args.load_settings().is_err());
    }
}
