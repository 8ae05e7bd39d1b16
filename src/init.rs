use crate::config::PipelineConfig;
use crate::error::InitError;
use crate::layer::RecordLayer;
use crate::sink::LogSink;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Install a global `tracing` subscriber that feeds `sink`.
///
/// **Parameters**
/// - `sink`: implementation of [`LogSink`] that will receive sanitized
///   [`LogRecord`](crate::record::LogRecord)s.
/// - `config`: [`PipelineConfig`] controlling identity, minimum severity
///   and buffering.
///
/// **Returns**
/// - The handle of the forwarding task.
/// - `Err(InitError::AlreadyInstalled)` if a global subscriber exists.
///
/// Must be called within a Tokio runtime.
pub fn init_tracing_with_config(
    sink: Arc<dyn LogSink>,
    config: PipelineConfig,
) -> Result<JoinHandle<()>, InitError> {
    let (layer, handle) = RecordLayer::new(sink, &config);

    // Registry types differ with and without the fmt layer, so both
    // variants are built explicitly.
    if config.enable_stdout {
        let fmt_layer = tracing_subscriber::fmt::layer();
        let subscriber = Registry::default().with(layer).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber)?;
    }
    Ok(handle)
}

/// Equivalent to [`init_tracing_with_config`] with [`PipelineConfig::default`].
pub fn init_tracing(sink: Arc<dyn LogSink>) -> Result<JoinHandle<()>, InitError> {
    init_tracing_with_config(sink, PipelineConfig::default())
}
