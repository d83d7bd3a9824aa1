use std::time::Instant;

use once_cell::sync::Lazy;
use opentelemetry::global;
use opentelemetry::metrics::Histogram;
use shared::utilities::config::Config;

struct OltpMetrics {
    comp_search_histogram: Histogram<u64>,
    comp_version_histogram: Histogram<u64>,
}

static OLTP_METRICS: Lazy<OltpMetrics> = Lazy::new(|| {
    let meter = global::meter("components-api");
    OltpMetrics {
        comp_search_histogram: meter
            .u64_histogram("comp.search.req.time")
            .with_unit("ms")
            .with_description("The time taken to run a component search request")
            .build(),
        comp_version_histogram: meter
            .u64_histogram("comp.version.req.time")
            .with_unit("ms")
            .with_description("The time taken to run a component versions request")
            .build(),
    }
});

pub fn record_search_request_time(config: &Config, request_start: Instant) {
    if config.telemetry_enabled {
        OLTP_METRICS
            .comp_search_histogram
            .record(request_start.elapsed().as_millis() as u64, &[]);
    }
}

pub fn record_version_request_time(config: &Config, request_start: Instant) {
    if config.telemetry_enabled {
        OLTP_METRICS
            .comp_version_histogram
            .record(request_start.elapsed().as_millis() as u64, &[]);
    }
}
