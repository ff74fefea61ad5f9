use std::path::{Path, PathBuf};
use tracing::Subscriber;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// Build the application subscriber without installing it. In debug mode the
/// default level is `debug` and `RUST_LOG` may override it; otherwise `info`
/// is forced. When `log_file` is given, output is also appended to that file.
pub fn subscriber(debug: bool, log_file: Option<PathBuf>) -> Box<dyn Subscriber + Send + Sync> {
    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::new("info")
    };

    let file_writer = log_file.and_then(|path| {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let name = path.file_name()?.to_owned();
        Some(tracing_appender::rolling::never(dir, name))
    });

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match file_writer {
        // Plain text so the file stays free of escape codes.
        Some(file) => Box::new(
            builder
                .with_ansi(false)
                .with_writer(std::io::stderr.and(file))
                .finish(),
        ),
        None => Box::new(builder.with_writer(std::io::stderr).finish()),
    }
}

/// Install [`subscriber`] as the process-wide default. Only the first call
/// takes effect.
pub fn init(debug: bool, log_file: Option<PathBuf>) {
    if tracing::subscriber::set_global_default(subscriber(debug, log_file)).is_err() {
        tracing::debug!("logging already initialised");
    }
}
