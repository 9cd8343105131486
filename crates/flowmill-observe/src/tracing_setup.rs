//! Global tracing subscriber for the workflow engine.
//!
//! Installs a structured `fmt` layer and, when requested, bridges spans
//! into OpenTelemetry through a stdout exporter so locally-run executions
//! can be inspected span by span.
//!
//! ```no_run
//! flowmill_observe::tracing_setup::init_tracing(false).unwrap();
//! // ... run workflows ...
//! flowmill_observe::tracing_setup::shutdown_tracing();
//! ```

use std::sync::OnceLock;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::Registry;
use tracing_subscriber::util::SubscriberInitExt;

/// Held so the exporter can be flushed at shutdown.
static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

fn otel_layer() -> OpenTelemetryLayer<Registry, opentelemetry_sdk::trace::SdkTracer> {
    let provider = SdkTracerProvider::builder()
        .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
        .build();
    let tracer = provider.tracer("flowmill");

    let _ = TRACER_PROVIDER.set(provider.clone());
    opentelemetry::global::set_tracer_provider(provider);

    tracing_opentelemetry::layer().with_tracer(tracer)
}

/// Install the global subscriber.
///
/// Filtering honors `RUST_LOG` and falls back to `info`. Span close events
/// are emitted so node and execution timings show up in the log stream.
/// With `enable_otel`, spans are additionally exported through a stdout
/// OpenTelemetry pipeline (swap the exporter for OTLP in a deployment).
///
/// # Errors
///
/// Fails when a global subscriber is already installed.
pub fn init_tracing(enable_otel: bool) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry();
    if enable_otel {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE);
        let otel = otel_layer();
        registry.with(otel).with(env_filter).with(fmt_layer).init();
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE);
        registry.with(env_filter).with(fmt_layer).init();
    }

    Ok(())
}

/// Flush and shut down the OpenTelemetry pipeline. No-op when
/// `init_tracing` ran without OTel.
pub fn shutdown_tracing() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        if let Err(err) = provider.shutdown() {
            eprintln!("otel tracer provider shutdown failed: {err}");
        }
    }
}
