use log_record_pipeline::builder::RecordBuilder;
use log_record_pipeline::config::PipelineConfig;
use log_record_pipeline::diagnostics::{CollectingDiagnostics, DIAGNOSTICS_TARGET};
use log_record_pipeline::layer::RecordLayer;
use log_record_pipeline::record::{EncodableValue, Severity};
use log_record_pipeline::sanitizer::RecordSanitizer;
use log_record_pipeline::sink::MemorySink;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

fn config(min_severity: Severity) -> PipelineConfig {
    PipelineConfig {
        service_name: "checkout".into(),
        min_severity,
        channel_buffer: 16,
        enable_stdout: false,
        ..PipelineConfig::default()
    }
}

fn layer(
    config: &PipelineConfig,
) -> (
    RecordLayer,
    tokio::task::JoinHandle<()>,
    Arc<MemorySink>,
    Arc<CollectingDiagnostics>,
) {
    let sink = Arc::new(MemorySink::new());
    let diagnostics = Arc::new(CollectingDiagnostics::new());
    let (layer, handle) = RecordLayer::with_parts(
        sink.clone(),
        RecordBuilder::new(config),
        RecordSanitizer::new(diagnostics.clone()),
        config,
    );
    (layer, handle, sink, diagnostics)
}

#[tokio::test]
async fn forwards_sanitized_records() {
    let config = config(Severity::Warn);
    let (layer, handle, sink, diagnostics) = layer(&config);
    let total = layer.total_events.clone();
    let enqueued = layer.enqueued_events.clone();

    tracing::subscriber::with_default(Registry::default().with(layer), || {
        tracing::info!("below minimum severity");
        tracing::warn!(
            user_id = 7,
            host = "web-1",
            tags = "Env:Prod, host:x",
            "payment retried"
        );
    });
    handle.await.unwrap();

    assert_eq!(total.load(Ordering::Relaxed), 2);
    assert_eq!(enqueued.load(Ordering::Relaxed), 1);

    let records = sink.records();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.severity, Severity::Warn);
    assert_eq!(record.message, "payment retried");
    assert_eq!(record.service_name, "checkout");
    assert_eq!(
        record.attributes.user_attributes.get("user_id"),
        Some(&EncodableValue::from(7i64))
    );
    assert!(!record.attributes.user_attributes.contains_key("host"));
    assert_eq!(record.tags, Some(vec!["env:prod".to_string()]));

    let internal = record.attributes.internal_attributes.as_ref().unwrap();
    assert_eq!(internal.get("logger.target"), Some(&EncodableValue::from("layer")));
    assert!(internal.contains_key("logger.line"));

    assert_eq!(diagnostics.diagnostics().len(), 2);
}

#[tokio::test]
async fn drops_records_when_channel_is_full() {
    let config = config(Severity::Error);
    let (layer, handle, sink, _) = layer(&config);
    let dropped = layer.dropped_events.clone();

    // The forwarding task cannot run until this closure returns.
    tracing::subscriber::with_default(Registry::default().with(layer), || {
        for i in 0..20 {
            tracing::error!(iteration = i, "burst");
        }
    });
    handle.await.unwrap();

    assert_eq!(sink.len(), 16);
    assert_eq!(dropped.load(Ordering::Relaxed), 4);
}

#[tokio::test]
async fn ignores_pipeline_diagnostics() {
    let config = config(Severity::Debug);
    let (layer, handle, sink, _) = layer(&config);
    let total = layer.total_events.clone();

    tracing::subscriber::with_default(Registry::default().with(layer), || {
        tracing::error!(target: DIAGNOSTICS_TARGET, "tag dropped");
    });
    handle.await.unwrap();

    assert_eq!(total.load(Ordering::Relaxed), 0);
    assert!(sink.is_empty());
}

#[tokio::test]
async fn captures_error_values() {
    let config = config(Severity::Error);
    let (layer, handle, sink, _) = layer(&config);

    tracing::subscriber::with_default(Registry::default().with(layer), || {
        let err = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        tracing::error!(error = &err as &(dyn std::error::Error + 'static), "write failed");
    });
    handle.await.unwrap();

    let records = sink.records();
    assert_eq!(records.len(), 1);
    let error = records[0].error.as_ref().unwrap();
    assert_eq!(error.message.as_deref(), Some("disk gone"));
    assert!(!records[0].attributes.user_attributes.contains_key("error"));
}

#[tokio::test]
async fn accepts_tag_sequences() {
    let config = config(Severity::Error);
    let (layer, handle, sink, _) = layer(&config);

    tracing::subscriber::with_default(Registry::default().with(layer), || {
        tracing::error!(tags = ?vec!["Env:Prod", "team:core"], "sequence tags");
    });
    handle.await.unwrap();

    let records = sink.records();
    assert_eq!(
        records[0].tags,
        Some(vec!["env:prod".to_string(), "team:core".to_string()])
    );
}

#[tokio::test]
async fn drops_fields_shadowing_source_location() {
    let config = config(Severity::Error);
    let (layer, handle, sink, diagnostics) = layer(&config);

    tracing::subscriber::with_default(Registry::default().with(layer), || {
        tracing::error!(logger.line = 1u64, attempt = 2u64, "shadowed");
    });
    handle.await.unwrap();

    let records = sink.records();
    let record = &records[0];
    assert!(!record.attributes.user_attributes.contains_key("logger.line"));
    assert!(record.attributes.user_attributes.contains_key("attempt"));
    let reported = diagnostics.diagnostics();
    assert_eq!(reported.len(), 1);
    assert!(reported[0].message.contains("'logger.line'"));
}
