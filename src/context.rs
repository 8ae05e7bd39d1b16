//! Ambient context consumed by the [`RecordBuilder`](crate::builder::RecordBuilder).
//!
//! Every provider here is read-only and must be safe to call from any
//! thread; the builder resolves them once per logging call.

use crate::record::{CarrierInfo, NetworkConnectionInfo, UserInfo};
use chrono::{DateTime, Utc};
use std::thread::{self, ThreadId};

/// Source of the record timestamp.
pub trait DateProvider: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemDateProvider;

impl DateProvider for SystemDateProvider {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Identity of the execution unit a logging call runs on.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecutionUnit {
    pub is_main: bool,
    pub name: Option<String>,
}

impl ExecutionUnit {
    /// Name reported on the record: `"main"` for the main context, the
    /// assigned name if there is one, `"background"` otherwise.
    pub fn resolved_name(&self) -> String {
        if self.is_main {
            return "main".to_string();
        }
        match &self.name {
            Some(name) => name.clone(),
            None => "background".to_string(),
        }
    }
}

/// Resolves the [`ExecutionUnit`] of the calling thread or task.
pub trait ExecutionContext: Send + Sync {
    fn current(&self) -> ExecutionUnit;
}

/// [`ExecutionContext`] backed by `std::thread::current()`.
///
/// Without a designated main thread, the thread named `"main"` is treated
/// as the main context, which is the name Rust gives the process main
/// thread.
#[derive(Clone, Debug, Default)]
pub struct CurrentThread {
    main: Option<ThreadId>,
}

impl CurrentThread {
    pub fn new() -> Self {
        Self::default()
    }

    /// Designate `id` as the main execution context.
    pub fn with_main(id: ThreadId) -> Self {
        Self { main: Some(id) }
    }
}

impl ExecutionContext for CurrentThread {
    fn current(&self) -> ExecutionUnit {
        let current = thread::current();
        let name = current.name().map(str::to_string);
        let is_main = match self.main {
            Some(id) => current.id() == id,
            None => name.as_deref() == Some("main"),
        };
        ExecutionUnit { is_main, name }
    }
}

/// Application version metadata; both fields are optional.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AppMetadata {
    pub short_version: Option<String>,
    pub full_version: Option<String>,
}

impl AppMetadata {
    /// Short version if present and non-empty, else full version, else `""`.
    pub fn resolved_version(&self) -> String {
        if let Some(short) = self.short_version.as_deref().filter(|v| !v.is_empty()) {
            return short.to_string();
        }
        self.full_version.clone().unwrap_or_default()
    }
}

/// Optional user, network and carrier context attached to each record.
pub trait ContextSnapshot: Send + Sync {
    fn user_info(&self) -> Option<UserInfo> {
        None
    }

    fn network_connection_info(&self) -> Option<NetworkConnectionInfo> {
        None
    }

    fn carrier_info(&self) -> Option<CarrierInfo> {
        None
    }
}

/// [`ContextSnapshot`] returning fixed values.
#[derive(Clone, Debug, Default)]
pub struct StaticContext {
    pub user_info: Option<UserInfo>,
    pub network_connection_info: Option<NetworkConnectionInfo>,
    pub carrier_info: Option<CarrierInfo>,
}

impl ContextSnapshot for StaticContext {
    fn user_info(&self) -> Option<UserInfo> {
        self.user_info.clone()
    }

    fn network_connection_info(&self) -> Option<NetworkConnectionInfo> {
        self.network_connection_info.clone()
    }

    fn carrier_info(&self) -> Option<CarrierInfo> {
        self.carrier_info.clone()
    }
}
