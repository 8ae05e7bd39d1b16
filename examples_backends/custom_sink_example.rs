use std::sync::Arc;

use async_trait::async_trait;
use log_record_pipeline::{
    builder::RecordBuilder,
    config::PipelineConfig,
    init::init_tracing_with_config,
    record::{Attributes, EncodableValue, LogRecord, Severity},
    sanitizer::RecordSanitizer,
    sink::LogSink,
};
use serde_json::json;
use tokio::time::{sleep, Duration};
use tracing::error;

/// Example of plugging in a custom transport by implementing `LogSink`
/// directly. Here it just prints each record in its wire layout.
struct StdoutJsonSink;

#[async_trait]
impl LogSink for StdoutJsonSink {
    async fn send(&self, record: &LogRecord) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        println!("{}", record.to_json()?);
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    let config = match PipelineConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("invalid configuration: {e}");
            return;
        }
    };

    let sink: Arc<dyn LogSink> = Arc::new(StdoutJsonSink);
    let builder = RecordBuilder::new(&config);
    if let Err(e) = init_tracing_with_config(sink.clone(), config) {
        eprintln!("failed to install subscriber: {e}");
        return;
    }

    error!(
        order_id = 1001,
        host = "ignored: reserved attribute",
        a.b.c.d.e.f.g.h.i.j.k = "deeply nested",
        tags = "Env:Staging,host:web-1,1invalid,team:payments::",
        "payment capture failed"
    );

    // Records can also be built directly, e.g. from a JSON payload.
    let payload = json!({
        "cart": {"items": 3, "total": 42.5},
        "coupon": null,
        "version": "shadows a record field and is dropped",
    });
    let attributes = match EncodableValue::from(payload) {
        EncodableValue::Map(map) => map,
        _ => Attributes::new(),
    };
    let record = RecordSanitizer::default().sanitize(builder.create_record(
        Severity::Notice,
        "cart updated",
        attributes,
        vec!["Env:Staging".to_string()],
    ));
    if let Err(e) = sink.send(&record).await {
        eprintln!("failed to send record: {e}");
    }

    sleep(Duration::from_millis(200)).await;
}
