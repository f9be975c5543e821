use tracing_subscriber::{
    fmt::format::Format, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Prefix match: covers every `filevault_*` crate.
const DEFAULT_FILTER: &str = "filevault=debug,tower_http=debug";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into())
}

/// Install the global subscriber: compact console output, or JSON lines when
/// `log_format` is `json`. `RUST_LOG` overrides the default filter.
///
/// Calling this twice is harmless; the second subscriber is simply not installed.
pub fn init_telemetry(log_format: &str, environment: &str) -> Result<(), anyhow::Error> {
    let registry = tracing_subscriber::registry().with(env_filter());

    let result = if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false),
            )
            .try_init()
    } else {
        let console_fmt = tracing_subscriber::fmt::layer().event_format(
            Format::default()
                .compact()
                .with_target(false)
                .without_time(),
        );
        registry.with(console_fmt).try_init()
    };

    if let Err(e) = result {
        // Already installed (tests, embedding); keep the existing one
        tracing::debug!(error = %e, "Tracing subscriber already set");
        return Ok(());
    }

    tracing::info!(log_format, environment, "Tracing initialized");
    Ok(())
}
