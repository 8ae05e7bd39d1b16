//! Structured log records for a remote log intake.
//!
//! A logging call goes through two stages before it reaches a transport:
//! [`RecordBuilder`](builder::RecordBuilder) enriches it with ambient context,
//! then [`RecordSanitizer`](sanitizer::RecordSanitizer) enforces the intake's
//! naming, size and reserved-keyword constraints. [`layer::RecordLayer`] wires
//! both behind `tracing` and hands the result to a [`sink::LogSink`].

pub mod record;
pub mod encoding;
pub mod context;
pub mod diagnostics;
pub mod builder;
pub mod sanitizer;
pub mod sink;
pub mod layer;

pub mod config;
pub mod error;
pub mod init;
