use chrono::{DateTime, Utc};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

/// Caller-supplied attributes, keyed by attribute name.
///
/// Iteration is in ascending key order, which is also the order the
/// sanitizer uses when it has to drop attributes over the count limit.
pub type Attributes = BTreeMap<String, EncodableValue>;

/// Severity of a [`LogRecord`], ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    Notice,
    Warn,
    Error,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Notice => "notice",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }

    /// Parse a lowercase or mixed-case severity name.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "notice" => Some(Self::Notice),
            "warn" | "warning" => Some(Self::Warn),
            "error" => Some(Self::Error),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

impl From<tracing::Level> for Severity {
    fn from(level: tracing::Level) -> Self {
        if level == tracing::Level::ERROR {
            Self::Error
        } else if level == tracing::Level::WARN {
            Self::Warn
        } else if level == tracing::Level::INFO {
            Self::Info
        } else {
            Self::Debug
        }
    }
}

/// Numeric payload of an [`EncodableValue`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    UInt(u64),
    Float(f64),
}

/// Type-erased attribute value.
///
/// Two values are equal iff the wrapped values are equal, and a value
/// serializes exactly like the value it wraps, without any variant tag.
#[derive(Debug, Clone, PartialEq)]
pub enum EncodableValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Map(BTreeMap<String, EncodableValue>),
    Array(Vec<EncodableValue>),
}

impl Serialize for EncodableValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(Number::Int(n)) => serializer.serialize_i64(*n),
            Self::Number(Number::UInt(n)) => serializer.serialize_u64(*n),
            Self::Number(Number::Float(n)) => serializer.serialize_f64(*n),
            Self::String(s) => serializer.serialize_str(s),
            Self::Map(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map {
                    out.serialize_entry(key, value)?;
                }
                out.end()
            }
            Self::Array(items) => {
                let mut out = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    out.serialize_element(item)?;
                }
                out.end()
            }
        }
    }
}

impl From<&str> for EncodableValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for EncodableValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for EncodableValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

macro_rules! from_signed {
    ($($t:ty),*) => {
        $(impl From<$t> for EncodableValue {
            fn from(value: $t) -> Self {
                Self::Number(Number::Int(value as i64))
            }
        })*
    };
}

macro_rules! from_unsigned {
    ($($t:ty),*) => {
        $(impl From<$t> for EncodableValue {
            fn from(value: $t) -> Self {
                Self::Number(Number::UInt(value as u64))
            }
        })*
    };
}

from_signed!(i8, i16, i32, i64, isize);
from_unsigned!(u8, u16, u32, u64, usize);

impl From<f32> for EncodableValue {
    fn from(value: f32) -> Self {
        Self::Number(Number::Float(value as f64))
    }
}

impl From<f64> for EncodableValue {
    fn from(value: f64) -> Self {
        Self::Number(Number::Float(value))
    }
}

impl<T: Into<EncodableValue>> From<Option<T>> for EncodableValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Null)
    }
}

impl<T: Into<EncodableValue>> From<Vec<T>> for EncodableValue {
    fn from(value: Vec<T>) -> Self {
        Self::Array(value.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, EncodableValue>> for EncodableValue {
    fn from(value: BTreeMap<String, EncodableValue>) -> Self {
        Self::Map(value)
    }
}

impl From<serde_json::Value> for EncodableValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Number(Number::Int(i))
                } else if let Some(u) = n.as_u64() {
                    Self::Number(Number::UInt(u))
                } else {
                    Self::Number(Number::Float(n.as_f64().unwrap_or(f64::NAN)))
                }
            }
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Into::into).collect())
            }
            serde_json::Value::Object(map) => {
                Self::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

/// Attributes attached to a record.
///
/// `user_attributes` come from the logging call and are subject to
/// sanitization. `internal_attributes` are set by this crate's own
/// integrations and are passed through unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogAttributes {
    pub user_attributes: Attributes,
    pub internal_attributes: Option<Attributes>,
}

impl LogAttributes {
    pub fn new(user_attributes: Attributes) -> Self {
        Self {
            user_attributes,
            internal_attributes: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserInfo {
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub extra_info: Attributes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Reachability {
    Yes,
    Maybe,
    No,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NetworkConnectionInfo {
    pub reachability: Reachability,
    pub available_interfaces: Vec<String>,
    pub supports_ipv4: Option<bool>,
    pub supports_ipv6: Option<bool>,
    pub is_expensive: Option<bool>,
    pub is_constrained: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CarrierInfo {
    pub carrier_name: Option<String>,
    pub carrier_iso_country_code: Option<String>,
    pub carrier_allows_voip: bool,
    pub radio_access_technology: Option<String>,
}

/// Error details attached to a record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorInfo {
    pub kind: Option<String>,
    pub message: Option<String>,
    pub stack: Option<String>,
}

/// A single structured log event, rebuilt rather than mutated at each
/// pipeline stage.
///
/// Only records returned by
/// [`RecordSanitizer::sanitize`](crate::sanitizer::RecordSanitizer::sanitize)
/// are guaranteed to satisfy the intake constraints.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub message: String,
    pub error: Option<ErrorInfo>,
    pub service_name: String,
    pub logger_name: String,
    pub logger_version: String,
    pub thread_name: String,
    pub application_version: String,
    pub user_info: Option<UserInfo>,
    pub network_connection_info: Option<NetworkConnectionInfo>,
    pub carrier_info: Option<CarrierInfo>,
    pub attributes: LogAttributes,
    pub tags: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn severity_is_ordered() {
        assert!(Severity::Debug < Severity::Info);
        assert!(Severity::Notice < Severity::Warn);
        assert!(Severity::Error < Severity::Critical);
    }

    #[test]
    fn severity_parses_names() {
        assert_eq!(Severity::parse("NOTICE"), Some(Severity::Notice));
        assert_eq!(Severity::parse("warning"), Some(Severity::Warn));
        assert_eq!(Severity::parse("verbose"), None);
    }

    #[test]
    fn value_encodes_like_wrapped_type() {
        let mut nested = BTreeMap::new();
        nested.insert("count".to_string(), EncodableValue::from(3u32));
        nested.insert("ratio".to_string(), EncodableValue::from(0.5));

        let value = EncodableValue::Array(vec![
            EncodableValue::from("text"),
            EncodableValue::from(-7),
            EncodableValue::from(true),
            EncodableValue::Null,
            EncodableValue::Map(nested),
        ]);

        assert_eq!(
            serde_json::to_value(&value).unwrap(),
            json!(["text", -7, true, null, {"count": 3, "ratio": 0.5}])
        );
    }

    #[test]
    fn value_equality_is_structural() {
        assert_eq!(EncodableValue::from("a"), EncodableValue::from("a".to_string()));
        assert_ne!(EncodableValue::from(1), EncodableValue::from("1"));
        assert_eq!(EncodableValue::from(None::<bool>), EncodableValue::Null);
    }

    #[test]
    fn value_converts_from_json() {
        let value = EncodableValue::from(json!({"a": [1, "b", null], "c": 1.5}));
        assert_eq!(
            serde_json::to_value(&value).unwrap(),
            json!({"a": [1, "b", null], "c": 1.5})
        );
    }
}
