use std::fs::File;

use chrono::Local;
use log::info;
use simplelog::*;

/// `debug`, `info`, `warn`, `error` or `off`; anything else is `None`.
pub fn parse_level(level: &str) -> Option<LevelFilter> {
    match level.trim().to_lowercase().as_str() {
        "debug" => Some(LevelFilter::Debug),
        "info" => Some(LevelFilter::Info),
        "warn" => Some(LevelFilter::Warn),
        "error" => Some(LevelFilter::Error),
        "off" => Some(LevelFilter::Off),
        _ => None,
    }
}

/// `odesolve_<date>_<time>.log`
pub fn default_log_name() -> String {
    let date_and_time = Local::now().format("%Y-%m-%d_%H-%M-%S");
    format!("odesolve_{}.log", date_and_time)
}

/// Terminal logger plus an optional file logger. A second call leaves the first logger in place.
pub fn init_logger(level: &str, file: Option<&str>) -> Result<(), String> {
    let filter = parse_level(level).ok_or_else(|| {
        format!("log level must be debug, info, warn, error or off, got '{}'", level)
    })?;
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        filter,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];
    if let Some(name) = file {
        let name = if name.is_empty() {
            default_log_name()
        } else {
            name.to_string()
        };
        let target = File::create(&name).map_err(|e| format!("cannot create {}: {}", name, e))?;
        loggers.push(WriteLogger::new(filter, Config::default(), target));
    }
    if CombinedLogger::init(loggers).is_ok() {
        info!("logging at level {}", filter);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("INFO"), Some(LevelFilter::Info));
        assert_eq!(parse_level(" debug "), Some(LevelFilter::Debug));
        assert_eq!(parse_level("verbose"), None);
        assert!(init_logger("verbose", None).is_err());
    }

    #[test]
    fn test_default_log_name() {
        let name = default_log_name();
        assert!(name.starts_with("odesolve_") && name.ends_with(".log"));
    }

    #[test]
    fn test_repeated_init_is_harmless() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        let path = path.to_str().unwrap();
        assert!(init_logger("warn", Some(path)).is_ok());
        assert!(init_logger("info", None).is_ok());
    }
}
