use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "palaver_cache_hits_total",
            Unit::Count,
            "Total number of cache hits."
        );
        describe_counter!(
            "palaver_cache_misses_total",
            Unit::Count,
            "Total number of cache misses."
        );
        describe_counter!(
            "palaver_cache_invalidations_total",
            Unit::Count,
            "Total number of cache entries dropped by invalidation."
        );
        describe_counter!(
            "palaver_cache_singleflight_waits_total",
            Unit::Count,
            "Reads that waited on another caller's in-flight computation."
        );
        describe_counter!(
            "palaver_capture_events_total",
            Unit::Count,
            "Change events applied by the capture router."
        );
        describe_counter!(
            "palaver_capture_resubscribes_total",
            Unit::Count,
            "Change stream resubscriptions after failure or stream end."
        );
        describe_counter!(
            "palaver_vote_retries_total",
            Unit::Count,
            "Vote casts replanned after losing a ledger race."
        );
        describe_histogram!(
            "palaver_vote_cast_ms",
            Unit::Milliseconds,
            "Vote cast latency in milliseconds."
        );
    });
}
