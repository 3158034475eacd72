use color_eyre::Result;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber: human readable logs on stdout, filtered by
/// `RUST_LOG` (default `info`). With the `bunyan` feature, JSON logs are also
/// written to `.logs/`.
///
/// # Errors
///
/// Returns an error if the log directory cannot be created or a subscriber
/// is already installed.
pub fn setup_logger() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false));

    #[cfg(feature = "bunyan")]
    let registry = registry.with(bunyan::layers()?);

    registry.try_init()?;
    Ok(())
}

#[cfg(feature = "bunyan")]
mod bunyan {
    use color_eyre::Result;
    use std::{fs::create_dir_all, path::PathBuf};
    use tracing::Subscriber;
    use tracing_appender::rolling;
    use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
    use tracing_subscriber::{Layer, registry::LookupSpan};

    const APP_NAME: &str = "tg-format-bot";

    pub fn layers<S>() -> Result<impl Layer<S>>
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        let log_dir_path = PathBuf::from(".logs");
        create_dir_all(&log_dir_path)?;

        let file_name = format!("{APP_NAME}.log");
        let logfile = if cfg!(debug_assertions) {
            rolling::daily(log_dir_path, file_name)
        } else {
            rolling::never(log_dir_path, file_name)
        };

        let formatter = BunyanFormattingLayer::new(APP_NAME.into(), logfile);
        Ok(JsonStorageLayer.and_then(formatter))
    }
}
