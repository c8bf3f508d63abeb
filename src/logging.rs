//! Application-wide structured logging.
//!
//! Logs are emitted as Bunyan-formatted JSON so every gate decision carries its
//! `path`, `decision` and `user_id` fields into whatever collector reads stdout.
//! Records produced through the `log` facade (actix's `Logger` middleware) are
//! bridged into `tracing` by [`init_subscriber`].

use tracing::Subscriber;
use tracing::subscriber::set_global_default;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_subscriber::{EnvFilter, Registry, fmt::MakeWriter, layer::SubscriberExt};

/// Composes the subscriber without installing it.
///
/// `env_filter` is the fallback directive used when `RUST_LOG` is unset. `sink`
/// receives the formatted records, `std::io::stdout` in production and
/// `std::io::sink` in tests.
///
/// # Example
/// ```rust
/// use storefront_admin::logging::get_subscriber;
///
/// let subscriber = get_subscriber("storefront_admin".into(), "info".into(), std::io::sink);
/// # drop(subscriber);
/// ```
pub fn get_subscriber<Sink>(
    name: String,
    env_filter: String,
    sink: Sink,
) -> impl Subscriber + Send + Sync
where
    Sink: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(env_filter));
    let formatting_layer = BunyanFormattingLayer::new(name, sink);

    Registry::default()
        .with(env_filter)
        .with(JsonStorageLayer)
        .with(formatting_layer)
}

/// Installs `subscriber` as the global default and routes `log` records into it.
///
/// # Errors
/// Fails if a global subscriber or logger has already been set.
pub fn init_subscriber(subscriber: impl Subscriber + Send + Sync) -> anyhow::Result<()> {
    LogTracer::init()?;
    set_global_default(subscriber)?;
    Ok(())
}
