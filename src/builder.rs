use crate::config::PipelineConfig;
use crate::context::{
    ContextSnapshot, CurrentThread, DateProvider, ExecutionContext, StaticContext,
    SystemDateProvider,
};
use crate::record::{Attributes, ErrorInfo, LogAttributes, LogRecord, Severity};
use std::sync::Arc;

/// Turns a logging call into a fully populated [`LogRecord`].
///
/// The builder only enriches: it never validates caller input and cannot
/// fail. Identity and application version are resolved once at
/// construction; timestamp, thread name and the [`ContextSnapshot`] are
/// read on every call.
#[derive(Clone)]
pub struct RecordBuilder {
    service_name: String,
    logger_name: String,
    logger_version: String,
    application_version: String,
    date_provider: Arc<dyn DateProvider>,
    execution_context: Arc<dyn ExecutionContext>,
    context: Arc<dyn ContextSnapshot>,
}

impl RecordBuilder {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            service_name: config.service_name.clone(),
            logger_name: config.logger_name.clone(),
            logger_version: config.logger_version.clone(),
            application_version: config.app.resolved_version(),
            date_provider: Arc::new(SystemDateProvider),
            execution_context: Arc::new(CurrentThread::new()),
            context: Arc::new(StaticContext::default()),
        }
    }

    pub fn with_date_provider(mut self, provider: Arc<dyn DateProvider>) -> Self {
        self.date_provider = provider;
        self
    }

    pub fn with_execution_context(mut self, context: Arc<dyn ExecutionContext>) -> Self {
        self.execution_context = context;
        self
    }

    pub fn with_context_snapshot(mut self, context: Arc<dyn ContextSnapshot>) -> Self {
        self.context = context;
        self
    }

    pub fn create_record(
        &self,
        severity: Severity,
        message: impl Into<String>,
        attributes: Attributes,
        tags: Vec<String>,
    ) -> LogRecord {
        self.build(severity, message.into(), None, LogAttributes::new(attributes), tags)
    }

    pub fn create_record_with_error(
        &self,
        severity: Severity,
        message: impl Into<String>,
        error: ErrorInfo,
        attributes: Attributes,
        tags: Vec<String>,
    ) -> LogRecord {
        self.build(
            severity,
            message.into(),
            Some(error),
            LogAttributes::new(attributes),
            tags,
        )
    }

    /// Like [`create_record`](Self::create_record), with internal
    /// attributes that bypass sanitization.
    pub fn create_record_with_internal(
        &self,
        severity: Severity,
        message: impl Into<String>,
        attributes: Attributes,
        internal_attributes: Attributes,
        tags: Vec<String>,
    ) -> LogRecord {
        let attributes = LogAttributes {
            user_attributes: attributes,
            internal_attributes: Some(internal_attributes),
        };
        self.build(severity, message.into(), None, attributes, tags)
    }

    fn build(
        &self,
        severity: Severity,
        message: String,
        error: Option<ErrorInfo>,
        attributes: LogAttributes,
        tags: Vec<String>,
    ) -> LogRecord {
        LogRecord {
            timestamp: self.date_provider.now(),
            severity,
            message,
            error,
            service_name: self.service_name.clone(),
            logger_name: self.logger_name.clone(),
            logger_version: self.logger_version.clone(),
            thread_name: self.execution_context.current().resolved_name(),
            application_version: self.application_version.clone(),
            user_info: self.context.user_info(),
            network_connection_info: self.context.network_connection_info(),
            carrier_info: self.context.carrier_info(),
            attributes,
            tags: if tags.is_empty() { None } else { Some(tags) },
        }
    }
}
