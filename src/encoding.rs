//! Wire layout of a [`LogRecord`].
//!
//! A record encodes as one flat object: fixed fields first, then
//! internal attributes, then user attributes as top-level keys. Tags are
//! joined into a single comma-separated `ddtags` value.

use crate::record::{Attributes, CarrierInfo, LogRecord, NetworkConnectionInfo, UserInfo};
use chrono::SecondsFormat;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::HashSet;

mod keys {
    pub const DATE: &str = "date";
    pub const STATUS: &str = "status";
    pub const MESSAGE: &str = "message";
    pub const SERVICE: &str = "service";
    pub const TAGS: &str = "ddtags";
    pub const LOGGER_NAME: &str = "logger.name";
    pub const LOGGER_VERSION: &str = "logger.version";
    pub const THREAD_NAME: &str = "logger.thread_name";
    pub const APPLICATION_VERSION: &str = "version";
    pub const ERROR_KIND: &str = "error.kind";
    pub const ERROR_MESSAGE: &str = "error.message";
    pub const ERROR_STACK: &str = "error.stack";
    pub const USER_ID: &str = "usr.id";
    pub const USER_NAME: &str = "usr.name";
    pub const USER_EMAIL: &str = "usr.email";
    pub const NETWORK_REACHABILITY: &str = "network.client.reachability";
    pub const NETWORK_INTERFACES: &str = "network.client.available_interfaces";
    pub const NETWORK_IPV4: &str = "network.client.supports_ipv4";
    pub const NETWORK_IPV6: &str = "network.client.supports_ipv6";
    pub const NETWORK_EXPENSIVE: &str = "network.client.is_expensive";
    pub const NETWORK_CONSTRAINED: &str = "network.client.is_constrained";
    pub const CARRIER_NAME: &str = "network.client.sim_carrier.name";
    pub const CARRIER_ISO_COUNTRY: &str = "network.client.sim_carrier.iso_country";
    pub const CARRIER_TECHNOLOGY: &str = "network.client.sim_carrier.technology";
    pub const CARRIER_ALLOWS_VOIP: &str = "network.client.sim_carrier.allows_voip";
}

/// Keys the encoder writes for record fields, ahead of any attribute.
pub const FIXED_KEYS: [&str; 25] = [
    keys::DATE,
    keys::STATUS,
    keys::MESSAGE,
    keys::SERVICE,
    keys::TAGS,
    keys::LOGGER_NAME,
    keys::LOGGER_VERSION,
    keys::THREAD_NAME,
    keys::APPLICATION_VERSION,
    keys::ERROR_KIND,
    keys::ERROR_MESSAGE,
    keys::ERROR_STACK,
    keys::USER_ID,
    keys::USER_NAME,
    keys::USER_EMAIL,
    keys::NETWORK_REACHABILITY,
    keys::NETWORK_INTERFACES,
    keys::NETWORK_IPV4,
    keys::NETWORK_IPV6,
    keys::NETWORK_EXPENSIVE,
    keys::NETWORK_CONSTRAINED,
    keys::CARRIER_NAME,
    keys::CARRIER_ISO_COUNTRY,
    keys::CARRIER_TECHNOLOGY,
    keys::CARRIER_ALLOWS_VOIP,
];

/// Keys taken by this particular record before user attributes are
/// written: user extra info (`usr.<key>`) and internal attributes.
pub fn occupied_keys(record: &LogRecord) -> HashSet<String> {
    let mut occupied = HashSet::new();
    if let Some(user) = &record.user_info {
        occupied.extend(user.extra_info.keys().map(|k| format!("usr.{k}")));
    }
    if let Some(internal) = &record.attributes.internal_attributes {
        occupied.extend(internal.keys().cloned());
    }
    occupied
}

/// Tracks emitted keys so attributes cannot shadow fixed fields.
/// Sanitized records never hit this: the sanitizer drops colliding
/// attributes and reports them.
struct Writer<M> {
    map: M,
    written: HashSet<String>,
}

impl<M: SerializeMap> Writer<M> {
    fn entry<V: Serialize + ?Sized>(&mut self, key: &str, value: &V) -> Result<(), M::Error> {
        if !self.written.insert(key.to_string()) {
            return Ok(());
        }
        self.map.serialize_entry(key, value)
    }

    fn optional<V: Serialize>(&mut self, key: &str, value: &Option<V>) -> Result<(), M::Error> {
        match value {
            Some(value) => self.entry(key, value),
            None => Ok(()),
        }
    }

    fn attributes(&mut self, prefix: &str, attributes: &Attributes) -> Result<(), M::Error> {
        for (key, value) in attributes {
            self.entry(&format!("{prefix}{key}"), value)?;
        }
        Ok(())
    }

    fn user(&mut self, user: &UserInfo) -> Result<(), M::Error> {
        self.optional(keys::USER_ID, &user.id)?;
        self.optional(keys::USER_NAME, &user.name)?;
        self.optional(keys::USER_EMAIL, &user.email)?;
        self.attributes("usr.", &user.extra_info)
    }

    fn network(&mut self, network: &NetworkConnectionInfo) -> Result<(), M::Error> {
        self.entry(keys::NETWORK_REACHABILITY, &network.reachability)?;
        self.entry(keys::NETWORK_INTERFACES, &network.available_interfaces)?;
        self.optional(keys::NETWORK_IPV4, &network.supports_ipv4)?;
        self.optional(keys::NETWORK_IPV6, &network.supports_ipv6)?;
        self.optional(keys::NETWORK_EXPENSIVE, &network.is_expensive)?;
        self.optional(keys::NETWORK_CONSTRAINED, &network.is_constrained)
    }

    fn carrier(&mut self, carrier: &CarrierInfo) -> Result<(), M::Error> {
        self.optional(keys::CARRIER_NAME, &carrier.carrier_name)?;
        self.optional(keys::CARRIER_ISO_COUNTRY, &carrier.carrier_iso_country_code)?;
        self.optional(keys::CARRIER_TECHNOLOGY, &carrier.radio_access_technology)?;
        self.entry(keys::CARRIER_ALLOWS_VOIP, &carrier.carrier_allows_voip)
    }
}

impl Serialize for LogRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut w = Writer {
            map: serializer.serialize_map(None)?,
            written: HashSet::new(),
        };

        w.entry(
            keys::DATE,
            &self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        )?;
        w.entry(keys::STATUS, self.severity.as_str())?;
        w.entry(keys::MESSAGE, &self.message)?;
        w.entry(keys::SERVICE, &self.service_name)?;
        w.entry(keys::LOGGER_NAME, &self.logger_name)?;
        w.entry(keys::LOGGER_VERSION, &self.logger_version)?;
        w.entry(keys::THREAD_NAME, &self.thread_name)?;
        w.entry(keys::APPLICATION_VERSION, &self.application_version)?;

        if let Some(error) = &self.error {
            w.optional(keys::ERROR_KIND, &error.kind)?;
            w.optional(keys::ERROR_MESSAGE, &error.message)?;
            w.optional(keys::ERROR_STACK, &error.stack)?;
        }
        if let Some(user) = &self.user_info {
            w.user(user)?;
        }
        if let Some(network) = &self.network_connection_info {
            w.network(network)?;
        }
        if let Some(carrier) = &self.carrier_info {
            w.carrier(carrier)?;
        }
        if let Some(tags) = &self.tags {
            if !tags.is_empty() {
                w.entry(keys::TAGS, &tags.join(","))?;
            }
        }
        if let Some(internal) = &self.attributes.internal_attributes {
            w.attributes("", internal)?;
        }
        w.attributes("", &self.attributes.user_attributes)?;

        w.map.end()
    }
}

impl LogRecord {
    /// Encode the record in its wire layout.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use crate::record::{
        EncodableValue, ErrorInfo, LogAttributes, LogRecord, Reachability, Severity,
    };
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn record() -> LogRecord {
        let mut attributes = crate::record::Attributes::new();
        attributes.insert("user.count".into(), EncodableValue::from(2));
        attributes.insert("status".into(), EncodableValue::from("shadowed"));

        LogRecord {
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
            severity: Severity::Warn,
            message: "disk almost full".into(),
            error: Some(ErrorInfo {
                kind: Some("IoError".into()),
                message: Some("no space".into()),
                stack: None,
            }),
            service_name: "billing".into(),
            logger_name: "app".into(),
            logger_version: "0.1.0".into(),
            thread_name: "main".into(),
            application_version: "1.2".into(),
            user_info: None,
            network_connection_info: Some(crate::record::NetworkConnectionInfo {
                reachability: Reachability::Yes,
                available_interfaces: vec!["wifi".into()],
                supports_ipv4: Some(true),
                supports_ipv6: None,
                is_expensive: None,
                is_constrained: None,
            }),
            carrier_info: None,
            attributes: LogAttributes::new(attributes),
            tags: Some(vec!["env:prod".into(), "team:core".into()]),
        }
    }

    #[test]
    fn encodes_flat_layout() {
        let value: serde_json::Value = serde_json::from_str(&record().to_json().unwrap()).unwrap();

        assert_eq!(value["date"], json!("2024-05-01T12:30:00.000Z"));
        assert_eq!(value["status"], json!("warn"));
        assert_eq!(value["service"], json!("billing"));
        assert_eq!(value["logger.thread_name"], json!("main"));
        assert_eq!(value["error.kind"], json!("IoError"));
        assert!(value.get("error.stack").is_none());
        assert_eq!(value["network.client.available_interfaces"], json!(["wifi"]));
        assert_eq!(value["ddtags"], json!("env:prod,team:core"));
        assert_eq!(value["user.count"], json!(2));
    }

    #[test]
    fn attributes_do_not_shadow_fixed_fields() {
        let value = serde_json::to_value(record()).unwrap();
        assert_eq!(value["status"], json!("warn"));
    }
}
