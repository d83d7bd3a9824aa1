use crate::utilities::config::Config;
use opentelemetry::{KeyValue, global, trace::TracerProvider as _};
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::{
    Resource,
    metrics::{PeriodicReader, SdkMeterProvider},
    trace::{RandomIdGenerator, Sampler, SdkTracerProvider},
};
use opentelemetry_semantic_conventions::{
    SCHEMA_URL,
    attribute::{DEPLOYMENT_ENVIRONMENT_NAME, SERVICE_NAME, SERVICE_VERSION},
};
use time::macros::format_description;
use tracing_opentelemetry::{MetricsLayer, OpenTelemetryLayer};
use tracing_subscriber::{
    EnvFilter, fmt::time::LocalTime, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Holds the OTLP providers so they can be flushed on shutdown. Both are
/// None when telemetry is disabled and only the fmt layer is installed.
pub struct OtelGuard {
    pub tracer_provider: Option<SdkTracerProvider>,
    pub meter_provider: Option<SdkMeterProvider>,
}

impl Drop for OtelGuard {
    fn drop(&mut self) {
        if let Some(tracer_provider) = &self.tracer_provider {
            if let Err(err) = tracer_provider.shutdown() {
                eprintln!("{err:?}");
            }
        }
        if let Some(meter_provider) = &self.meter_provider {
            if let Err(err) = meter_provider.shutdown() {
                eprintln!("{err:?}");
            }
        }
    }
}

fn get_resource(config: &Config) -> Resource {
    Resource::builder()
        .with_schema_url(
            [
                KeyValue::new(SERVICE_NAME, config.cargo_pkg_name.clone()),
                KeyValue::new(SERVICE_VERSION, config.cargo_pkg_version.clone()),
                KeyValue::new(DEPLOYMENT_ENVIRONMENT_NAME, config.environment.clone()),
            ],
            SCHEMA_URL,
        )
        .build()
}

fn init_tracer_provider(
    otel_exporter_otlp_endpoint: String,
    resource: Resource,
) -> SdkTracerProvider {
    let trace_exporter = SpanExporter::builder()
        .with_tonic()
        .with_endpoint(otel_exporter_otlp_endpoint)
        .build()
        .expect("Failed to create trace exporter");

    let tracer_provider = SdkTracerProvider::builder()
        .with_id_generator(RandomIdGenerator::default())
        .with_batch_exporter(trace_exporter)
        .with_sampler(Sampler::AlwaysOn)
        .with_resource(resource)
        .build();

    global::set_tracer_provider(tracer_provider.clone());

    tracer_provider
}

fn init_metric_provider(
    otel_exporter_otlp_endpoint: String,
    resource: Resource,
) -> SdkMeterProvider {
    let metric_exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .with_endpoint(otel_exporter_otlp_endpoint)
        .build()
        .expect("Failed to create metric exporter");

    let reader = PeriodicReader::builder(metric_exporter)
        .with_interval(std::time::Duration::from_secs(30))
        .build();

    let metric_provider = SdkMeterProvider::builder()
        .with_resource(resource)
        .with_reader(reader)
        .build();

    global::set_meter_provider(metric_provider.clone());

    metric_provider
}

/// Initialize tracing-subscriber. With telemetry enabled the OTLP trace and
/// metric layers are added on top of the fmt layer.
pub fn init_observability(config: &Config) -> OtelGuard {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("components_api=debug,shared=debug,tower_http=warn,hyper=warn")
    });

    let timer = LocalTime::new(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second]"
    ));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_timer(timer);

    let registry = tracing_subscriber::registry().with(env_filter).with(fmt_layer);

    if !config.telemetry_enabled {
        registry.init();
        return OtelGuard {
            tracer_provider: None,
            meter_provider: None,
        };
    }

    let resource = get_resource(config);
    let tracer_provider =
        init_tracer_provider(config.otel_exporter_otlp_endpoint.clone(), resource.clone());
    let meter_provider = init_metric_provider(config.otel_exporter_otlp_endpoint.clone(), resource);

    let tracer = tracer_provider.tracer("tracing-otel-subscriber");
    registry
        .with(MetricsLayer::new(meter_provider.clone()))
        .with(OpenTelemetryLayer::new(tracer))
        .init();

    OtelGuard {
        tracer_provider: Some(tracer_provider),
        meter_provider: Some(meter_provider),
    }
}
