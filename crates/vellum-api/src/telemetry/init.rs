use tracing_subscriber::{
    fmt::format::Format, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};
use vellum_core::LogFormat;

const DEFAULT_FILTER: &str = "vellum=debug,tower_http=debug";
const PRODUCTION_FILTER: &str = "vellum=info,tower_http=info";

/// Initialize tracing. `RUST_LOG` overrides the default filter.
pub fn init_telemetry(
    format: LogFormat,
    is_production: bool,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let default_filter = if is_production {
        PRODUCTION_FILTER
    } else {
        DEFAULT_FILTER
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    match format {
        LogFormat::Compact => {
            // Console: compact format (message string for convenience)
            let console_fmt = tracing_subscriber::fmt::layer().event_format(
                Format::default()
                    .compact()
                    .with_target(false)
                    .without_time(),
            );
            tracing_subscriber::registry()
                .with(filter)
                .with(console_fmt)
                .try_init()?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
                .try_init()?;
        }
    }

    tracing::info!(format = ?format, "Tracing initialized");
    Ok(())
}
