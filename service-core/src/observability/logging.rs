use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber with an env-filter and fmt layer.
///
/// `RUST_LOG` takes precedence over the configured log level. Safe to call
/// more than once; later calls are no-ops (needed by the test harness, which
/// spawns several applications in one process).
pub fn init_tracing(service_name: &str, log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    let initialized = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_file(true)
                .with_line_number(true),
        )
        .try_init()
        .is_ok();

    if initialized {
        tracing::info!(service = service_name, "Tracing initialized");
    }
}
