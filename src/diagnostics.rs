use std::sync::Mutex;

/// `tracing` target used for diagnostics. The [`RecordLayer`](crate::layer::RecordLayer)
/// ignores events under this target.
pub const DIAGNOSTICS_TARGET: &str = "log_record_pipeline::diagnostics";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    /// Data was altered but kept.
    Warning,
    /// Data was discarded.
    Error,
}

/// A human-readable report of something the pipeline dropped or changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(message: impl Into<String>) -> Self {
        Self { level: DiagnosticLevel::Warning, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: DiagnosticLevel::Error, message: message.into() }
    }
}

/// Side channel receiving [`Diagnostic`]s.
///
/// Reporting is best-effort: implementations must not block for long and
/// must not panic.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);
}

impl<F> DiagnosticSink for F
where
    F: Fn(Diagnostic) + Send + Sync,
{
    fn report(&self, diagnostic: Diagnostic) {
        self(diagnostic)
    }
}

/// Emits diagnostics as `tracing` events under [`DIAGNOSTICS_TARGET`].
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingDiagnostics;

impl DiagnosticSink for TracingDiagnostics {
    fn report(&self, diagnostic: Diagnostic) {
        match diagnostic.level {
            DiagnosticLevel::Warning => {
                tracing::warn!(target: DIAGNOSTICS_TARGET, "{}", diagnostic.message)
            }
            DiagnosticLevel::Error => {
                tracing::error!(target: DIAGNOSTICS_TARGET, "{}", diagnostic.message)
            }
        }
    }
}

/// Keeps every reported diagnostic in memory.
#[derive(Debug, Default)]
pub struct CollectingDiagnostics {
    reported: Mutex<Vec<Diagnostic>>,
}

impl CollectingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything reported so far, in order.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.reported
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn count(&self, level: DiagnosticLevel) -> usize {
        self.diagnostics().iter().filter(|d| d.level == level).count()
    }

    pub fn clear(&self) {
        self.reported
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}

impl DiagnosticSink for CollectingDiagnostics {
    fn report(&self, diagnostic: Diagnostic) {
        self.reported
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    #[test]
    fn collects_in_order() {
        let sink = CollectingDiagnostics::new();
        sink.report(Diagnostic::error("dropped"));
        sink.report(Diagnostic::warning("renamed"));

        assert_eq!(
            sink.diagnostics(),
            vec![Diagnostic::error("dropped"), Diagnostic::warning("renamed")]
        );
        assert_eq!(sink.count(DiagnosticLevel::Warning), 1);

        sink.clear();
        assert!(sink.diagnostics().is_empty());
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<(tracing::Level, String, String)>>>);

    struct MessageVisitor(String);

    impl tracing::field::Visit for MessageVisitor {
        fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
            if field.name() == "message" {
                self.0 = format!("{:?}", value);
            }
        }
    }

    impl<S: tracing::Subscriber> Layer<S> for Captured {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            let mut visitor = MessageVisitor(String::new());
            event.record(&mut visitor);
            let meta = event.metadata();
            self.0
                .lock()
                .unwrap()
                .push((*meta.level(), meta.target().to_string(), visitor.0));
        }
    }

    #[test]
    fn tracing_diagnostics_emit_under_target() {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::registry().with(captured.clone());

        tracing::subscriber::with_default(subscriber, || {
            TracingDiagnostics.report(Diagnostic::warning("tag changed"));
            TracingDiagnostics.report(Diagnostic::error("tag dropped"));
        });

        let events = captured.0.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                (tracing::Level::WARN, DIAGNOSTICS_TARGET.to_string(), "tag changed".to_string()),
                (tracing::Level::ERROR, DIAGNOSTICS_TARGET.to_string(), "tag dropped".to_string()),
            ]
        );
    }

    #[test]
    fn closures_are_sinks() {
        let seen = AtomicUsize::new(0);
        let sink = |_d: Diagnostic| {
            seen.fetch_add(1, Ordering::Relaxed);
        };
        sink.report(Diagnostic::warning("x"));
        assert_eq!(seen.load(Ordering::Relaxed), 1);
    }
}
