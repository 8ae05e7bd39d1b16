use crate::builder::RecordBuilder;
use crate::config::PipelineConfig;
use crate::diagnostics::DIAGNOSTICS_TARGET;
use crate::record::{Attributes, EncodableValue, ErrorInfo, LogRecord, Severity};
use crate::sanitizer::RecordSanitizer;
use crate::sink::LogSink;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// `tracing_subscriber` layer that turns events into sanitized
/// [`LogRecord`]s and forwards them to a [`LogSink`] via a bounded channel
/// and background task.
///
/// Events below the configured minimum severity are ignored, as are the
/// pipeline's own diagnostics. Building and sanitizing happen on the
/// emitting thread so the record carries that thread's name; transport
/// happens on the forwarding task. A full channel drops the record.
pub struct RecordLayer {
    builder: RecordBuilder,
    sanitizer: RecordSanitizer,
    min_severity: Severity,
    sender: mpsc::Sender<LogRecord>,
    /// Total events seen by the layer (before filtering by severity).
    pub total_events: Arc<AtomicU64>,
    /// Successfully enqueued into channel.
    pub enqueued_events: Arc<AtomicU64>,
    /// Dropped because the channel was full or closed.
    pub dropped_events: Arc<AtomicU64>,
}

impl RecordLayer {
    /// Create a layer with a builder and a sanitizer derived from `config`.
    ///
    /// Must be called within a Tokio runtime.
    pub fn new(sink: Arc<dyn LogSink>, config: &PipelineConfig) -> (Self, JoinHandle<()>) {
        Self::with_parts(
            sink,
            RecordBuilder::new(config),
            RecordSanitizer::default(),
            config,
        )
    }

    /// Create a layer from an explicit builder and sanitizer and spawn the
    /// task that forwards records to `sink`.
    ///
    /// The task ends, after flushing the sink, once the layer is dropped.
    pub fn with_parts(
        sink: Arc<dyn LogSink>,
        builder: RecordBuilder,
        sanitizer: RecordSanitizer,
        config: &PipelineConfig,
    ) -> (Self, JoinHandle<()>) {
        let buffer = config.channel_buffer.max(16);
        let (tx, mut rx) = mpsc::channel::<LogRecord>(buffer);

        let handle = tokio::spawn(async move {
            while let Some(record) = rx.recv().await {
                if let Err(e) = sink.send(&record).await {
                    tracing::warn!(target: DIAGNOSTICS_TARGET, error = %e, "log sink failed to send record");
                }
            }
            if let Err(e) = sink.flush().await {
                tracing::warn!(target: DIAGNOSTICS_TARGET, error = %e, "log sink failed to flush");
            }
        });

        let layer = Self {
            builder,
            sanitizer,
            min_severity: config.min_severity,
            sender: tx,
            total_events: Arc::new(AtomicU64::new(0)),
            enqueued_events: Arc::new(AtomicU64::new(0)),
            dropped_events: Arc::new(AtomicU64::new(0)),
        };
        (layer, handle)
    }
}

impl<S> Layer<S> for RecordLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        if meta.target() == DIAGNOSTICS_TARGET {
            return;
        }
        self.total_events.fetch_add(1, Ordering::Relaxed);

        let severity = Severity::from(*meta.level());
        if severity < self.min_severity {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let mut internal = Attributes::new();
        internal.insert("logger.target".into(), meta.target().into());
        if let Some(module_path) = meta.module_path() {
            internal.insert("logger.module_path".into(), module_path.into());
        }
        if let Some(file) = meta.file() {
            internal.insert("logger.file".into(), file.into());
        }
        if let Some(line) = meta.line() {
            internal.insert("logger.line".into(), line.into());
        }

        let mut record = self.builder.create_record_with_internal(
            severity,
            visitor.message.unwrap_or_default(),
            visitor.attributes,
            internal,
            visitor.tags,
        );
        record.error = visitor.error;
        let record = self.sanitizer.sanitize(record);

        match self.sender.try_send(record) {
            Ok(()) => {
                self.enqueued_events.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                self.dropped_events.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

/// Collects event fields into record parts.
///
/// `message` becomes the record message and `tags` becomes the tag list.
/// `tags` is either a comma-separated string or a sequence of strings
/// recorded with `?`. An error value fills the record's error block;
/// every other field becomes a user attribute.
#[derive(Default)]
pub struct FieldVisitor {
    pub message: Option<String>,
    pub attributes: Attributes,
    pub tags: Vec<String>,
    pub error: Option<ErrorInfo>,
}

impl FieldVisitor {
    fn insert(&mut self, field: &Field, value: EncodableValue) {
        self.attributes.insert(field.name().to_string(), value);
    }
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => self.message = Some(value.to_string()),
            "tags" => self.tags.extend(split_tags(value)),
            _ => self.insert(field, value.into()),
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, value.into());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, value.into());
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, value.into());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, value.into());
    }

    fn record_error(&mut self, _field: &Field, value: &(dyn std::error::Error + 'static)) {
        let mut causes = Vec::new();
        let mut source = value.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }
        self.error = Some(ErrorInfo {
            kind: None,
            message: Some(value.to_string()),
            stack: if causes.is_empty() { None } else { Some(causes.join("\n")) },
        });
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let rendered = format!("{:?}", value);
        match field.name() {
            "message" => self.message = Some(rendered),
            "tags" => self.tags.extend(split_tags(&rendered)),
            _ => self.insert(field, rendered.into()),
        }
    }
}

/// Split a `tags` field into individual tags.
///
/// Accepts `a,b` as well as the `Debug` rendering of a sequence of
/// strings, `["a", "b"]`.
fn split_tags(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    let raw = raw
        .strip_prefix('[')
        .and_then(|r| r.strip_suffix(']'))
        .unwrap_or(raw);
    raw.split(',')
        .map(|t| t.trim().trim_matches('"').trim())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::split_tags;

    #[test]
    fn splits_comma_separated_tags() {
        assert_eq!(split_tags("env:prod, team:core,,"), vec!["env:prod", "team:core"]);
    }

    #[test]
    fn splits_debug_rendered_sequence() {
        let rendered = format!("{:?}", vec!["env:prod", "team:core"]);
        assert_eq!(split_tags(&rendered), vec!["env:prod", "team:core"]);
        assert_eq!(split_tags("\"single\""), vec!["single"]);
        assert!(split_tags("[]").is_empty());
    }
}
