//! Envelope exchanged with the reply service
//!
//! Every request carries exactly two top-level fields: a `service` name
//! identifying the operation, and a `data` object with string keys. The
//! reply service answers with the same shape.
//!
//! Response handling is deliberately lenient: an absent or oddly typed
//! field reads as absence, never as a parse error. The success literal is
//! per-operation (`"sucesso"` for login and channel creation, `"OK"` for
//! publish) and must not be unified; both are part of the wire contract.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Success literal for `login` and `channel` responses
pub const STATUS_SUCESSO: &str = "sucesso";

/// Success literal for `publish` responses
pub const STATUS_OK: &str = "OK";

/// Operation identifier carried in the `service` field
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    Login,
    Channels,
    Channel,
    Publish,
}

/// Request/response unit exchanged with the reply service
///
/// # Examples
/// ```
/// use chatfabric::protocol::{Envelope, Service};
///
/// let request = Envelope::login("Bot1", "2024-01-01T12:00:00Z");
/// assert_eq!(request.service, Service::Login);
/// assert_eq!(request.data["user"], "Bot1");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    /// Operation this envelope requests or answers
    pub service: Service,
    /// Structured payload; keys depend on the operation
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl Envelope {
    /// Build an envelope from explicit parts
    pub fn new(service: Service, data: Map<String, Value>) -> Self {
        Self { service, data }
    }

    /// Login handshake request
    pub fn login(user: &str, timestamp: &str) -> Self {
        Self::from_pairs(
            Service::Login,
            [("user", json!(user)), ("timestamp", json!(timestamp))],
        )
    }

    /// Channel discovery request
    pub fn channels(timestamp: &str) -> Self {
        Self::from_pairs(Service::Channels, [("timestamp", json!(timestamp))])
    }

    /// Channel creation request
    pub fn create_channel(channel: &str, timestamp: &str) -> Self {
        Self::from_pairs(
            Service::Channel,
            [("channel", json!(channel)), ("timestamp", json!(timestamp))],
        )
    }

    /// Message publication request
    pub fn publish(user: &str, channel: &str, message: &str, timestamp: &str) -> Self {
        Self::from_pairs(
            Service::Publish,
            [
                ("user", json!(user)),
                ("channel", json!(channel)),
                ("message", json!(message)),
                ("timestamp", json!(timestamp)),
            ],
        )
    }

    fn from_pairs<const N: usize>(service: Service, pairs: [(&str, Value); N]) -> Self {
        let mut data = Map::new();
        for (key, value) in pairs {
            data.insert(key.to_string(), value);
        }
        Self { service, data }
    }

    /// Serialize to the UTF-8 JSON wire form
    pub fn to_wire(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse from the UTF-8 JSON wire form
    pub fn from_wire(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// `data.status` as a string, if present
    pub fn status(&self) -> Option<&str> {
        self.data.get("status").and_then(Value::as_str)
    }

    /// Whether `data.status` equals the given success literal
    pub fn has_status(&self, literal: &str) -> bool {
        self.status() == Some(literal)
    }

    /// Channel names from `data.users`, if present
    ///
    /// The reply service historically lists channel names under the `users`
    /// key. Non-string entries are skipped rather than rejected.
    pub fn channel_names(&self) -> Option<Vec<String>> {
        let entries = self.data.get("users")?.as_array()?;
        Some(
            entries
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_wire_names() {
        assert_eq!(serde_json::to_string(&Service::Login).unwrap(), "\"login\"");
        assert_eq!(
            serde_json::to_string(&Service::Channels).unwrap(),
            "\"channels\""
        );
        assert_eq!(
            serde_json::to_string(&Service::Channel).unwrap(),
            "\"channel\""
        );
        assert_eq!(
            serde_json::to_string(&Service::Publish).unwrap(),
            "\"publish\""
        );
    }

    #[test]
    fn test_publish_round_trip_preserves_data() {
        let request = Envelope::publish("Bot42", "geral", "hello", "2024-01-01T12:00:00Z");
        let wire = request.to_wire().unwrap();
        let parsed = Envelope::from_wire(&wire).unwrap();

        assert_eq!(parsed.service, Service::Publish);
        assert_eq!(parsed.data, request.data);
    }

    #[test]
    fn test_wire_shape_has_exactly_two_top_level_fields() {
        let wire = Envelope::login("Bot1", "2024-01-01T12:00:00Z")
            .to_wire()
            .unwrap();
        let value: Value = serde_json::from_str(&wire).unwrap();
        let object = value.as_object().unwrap();

        assert_eq!(object.len(), 2);
        assert!(object.contains_key("service"));
        assert!(object.contains_key("data"));
    }

    #[test]
    fn test_status_accessor() {
        let response = Envelope::from_wire(r#"{"service":"login","data":{"status":"sucesso"}}"#)
            .unwrap();
        assert_eq!(response.status(), Some("sucesso"));
        assert!(response.has_status(STATUS_SUCESSO));
        assert!(!response.has_status(STATUS_OK));
    }

    #[test]
    fn test_missing_fields_read_as_absence() {
        let response = Envelope::from_wire(r#"{"service":"channels","data":{}}"#).unwrap();
        assert_eq!(response.status(), None);
        assert_eq!(response.channel_names(), None);
        assert!(!response.has_status(STATUS_SUCESSO));
    }

    #[test]
    fn test_missing_data_object_is_tolerated() {
        // A lenient reply service may omit data entirely.
        let response = Envelope::from_wire(r#"{"service":"publish"}"#).unwrap();
        assert!(response.data.is_empty());
        assert_eq!(response.status(), None);
    }

    #[test]
    fn test_status_of_wrong_type_reads_as_absence() {
        let response =
            Envelope::from_wire(r#"{"service":"publish","data":{"status":42}}"#).unwrap();
        assert_eq!(response.status(), None);
    }

    #[test]
    fn test_channel_names_skip_non_strings() {
        let response = Envelope::from_wire(
            r#"{"service":"channels","data":{"users":["geral",7,"tech",null]}}"#,
        )
        .unwrap();
        assert_eq!(
            response.channel_names(),
            Some(vec!["geral".to_string(), "tech".to_string()])
        );
    }

    #[test]
    fn test_empty_users_list_is_present_but_empty() {
        let response =
            Envelope::from_wire(r#"{"service":"channels","data":{"users":[]}}"#).unwrap();
        assert_eq!(response.channel_names(), Some(vec![]));
    }

    #[test]
    fn test_unknown_service_is_a_parse_error() {
        // Unknown services cannot be paired with a handler, so this is the
        // one place strictness is wanted.
        assert!(Envelope::from_wire(r#"{"service":"gossip","data":{}}"#).is_err());
    }
}
