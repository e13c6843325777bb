use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

/// Initialise logging. With `debug` the level is `debug` and `RUST_LOG` may
/// override it; otherwise it is fixed at `info`. When `log_file` is given the
/// output goes there instead of stderr. Calling this twice is harmless.
pub fn init(debug: bool, log_file: Option<PathBuf>) {
    let level = if debug { "debug" } else { "info" };

    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    } else {
        EnvFilter::new(level)
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."));
            let name = path
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_else(|| crate::settings::LOG_FILE.into());
            let appender = tracing_appender::rolling::never(dir, name);
            builder.with_ansi(false).with_writer(appender).try_init()
        }
        None => builder.try_init(),
    };

    if result.is_err() {
        tracing::debug!("logging already initialised");
    }
}
