//! Tracer setup and management

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::{SimpleSpanProcessor, TracerProvider};
use std::sync::{Arc, Mutex, OnceLock};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Global tracer provider holder
static TRACER_PROVIDER: OnceLock<Arc<TracerProvider>> = OnceLock::new();

/// Span processor builders registered before initialization
type ProcessorBuilder = Box<dyn FnOnce() -> SimpleSpanProcessor + Send>;
static SPAN_PROCESSOR_BUILDERS: Mutex<Option<Vec<ProcessorBuilder>>> = Mutex::new(Some(Vec::new()));

const DEFAULT_FILTER: &str = "info";

/// Register a span processor builder to be used when telemetry is initialized.
///
/// Must be called BEFORE `init_telemetry()`; later registrations are dropped
/// with a warning.
///
/// # Example
///
/// ```ignore
/// use sqlh_telemetry::{register_span_processor, init_telemetry};
/// use opentelemetry_sdk::trace::SimpleSpanProcessor;
///
/// register_span_processor(Box::new(|| {
///     SimpleSpanProcessor::new(Box::new(/* your exporter */))
/// }));
/// init_telemetry();
/// ```
pub fn register_span_processor(builder: ProcessorBuilder) {
    let mut builders = match SPAN_PROCESSOR_BUILDERS.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };

    if let Some(ref mut vec) = *builders {
        vec.push(builder);
    } else {
        tracing::warn!("Attempted to register span processor after telemetry initialization");
    }
}

/// Initialize logging and tracing, honouring `RUST_LOG`.
///
/// ```rust,no_run
/// sqlh_telemetry::init_telemetry();
/// ```
pub fn init_telemetry() {
    init_telemetry_with_filter(DEFAULT_FILTER);
}

/// Initialize logging and tracing; `default_filter` applies when `RUST_LOG`
/// is unset.
///
/// Installs:
/// - a tracer provider with any registered span processors
/// - the OpenTelemetry layer
/// - formatted log output
///
/// Calling it again after a subscriber is installed is a no-op.
pub fn init_telemetry_with_filter(default_filter: &str) {
    // Processors can only be consumed once
    let builders = match SPAN_PROCESSOR_BUILDERS.lock() {
        Ok(mut guard) => guard.take().unwrap_or_default(),
        Err(poisoned) => poisoned.into_inner().take().unwrap_or_default(),
    };

    let mut provider_builder = TracerProvider::builder();
    for builder in builders {
        provider_builder = provider_builder.with_span_processor(builder());
    }
    let tracer_provider = provider_builder.build();
    let tracer = tracer_provider.tracer(crate::attributes::SYSTEM_NAME);

    let _ = TRACER_PROVIDER.set(Arc::new(tracer_provider));

    let telemetry_layer = tracing_opentelemetry::layer().with_tracer(tracer);
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let installed = tracing_subscriber::registry()
        .with(telemetry_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .with_line_number(true),
        )
        .with(filter)
        .try_init();

    if installed.is_err() {
        tracing::debug!("Global subscriber already installed, keeping it");
    }
}

/// Get the global tracer provider if initialized
pub fn tracer_provider() -> Option<Arc<TracerProvider>> {
    TRACER_PROVIDER.get().cloned()
}
