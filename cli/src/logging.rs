use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes console logging.
///
/// The run's own status log is written separately by the service layer; this
/// covers diagnostics from the crates themselves.
///
/// Default log level is "info", overridable with RUST_LOG:
/// - RUST_LOG=debug hostback
/// - RUST_LOG=service=trace hostback
pub fn init_logging() {
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(false)
        .with_level(true)
        .compact();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,service=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .init();
}
