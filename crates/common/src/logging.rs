//! Logging and tracing initialization.

use std::path::Path;

use tracing_subscriber::fmt::writer::BoxMakeWriter;

use crate::config::LoggingConfig;

/// Initialize the tracing subscriber with the given configuration.
///
/// Output goes to `config.file` when set, stderr otherwise. A log file that
/// cannot be opened falls back to stderr and is reported once logging is up.
pub fn init_logging(config: &LoggingConfig) {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let (writer, to_file, open_error) = match &config.file {
        Some(path) => match file_writer(path) {
            Ok(writer) => (writer, true, None),
            Err(e) => (BoxMakeWriter::new(std::io::stderr), false, Some((path, e))),
        },
        None => (BoxMakeWriter::new(std::io::stderr), false, None),
    };

    if config.json {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_writer(writer)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    } else {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_writer(writer)
            .with_ansi(!to_file)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    }

    if let Some((path, error)) = open_error {
        tracing::warn!(path = %path.display(), error = %error, "Cannot open log file; logging to stderr");
    }
}

/// Appending writer for a log file.
fn file_writer(path: &Path) -> std::io::Result<BoxMakeWriter> {
    let file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
    Ok(BoxMakeWriter::new(std::sync::Mutex::new(file)))
}

/// Initialize logging with defaults (useful for tests and quick scripts).
pub fn init_default_logging() {
    init_logging(&LoggingConfig::default());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_writer_appends_and_reports_bad_paths() {
        let dir = std::env::temp_dir().join(format!("mosaic-logging-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("mosaic.log");
        assert!(file_writer(&path).is_ok());
        assert!(path.exists());

        let missing = dir.join("no-such-dir").join("mosaic.log");
        assert!(file_writer(&missing).is_err());
        std::fs::remove_dir_all(&dir).ok();
    }
}
