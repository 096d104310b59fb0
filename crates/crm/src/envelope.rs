//! Normalized view of an upstream response body.
//!
//! The upstream is inconsistent about where it puts payloads: the same
//! entity may arrive as `{contact: {...}}`, `{data: {contact: {...}}}` or as
//! the bare entity. Every wrapper goes through [`Envelope::locate`] and
//! [`Envelope::entity`] instead of probing the JSON itself.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::CrmError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    Parsed,
    Malformed,
    Transport,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Envelope {
    body: Map<String, Value>,
    origin: Origin,
    http_status: Option<u16>,
    status_injected: bool,
}

/// Where a field was found.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Located<'a> {
    Direct(&'a Value),
    Nested(&'a Value),
}

impl<'a> Located<'a> {
    pub fn value(self) -> &'a Value {
        match self {
            Self::Direct(value) | Self::Nested(value) => value,
        }
    }
}

impl Envelope {
    pub fn from_response(http_status: u16, text: &str) -> Self {
        let (mut body, origin) = if text.trim().is_empty() {
            (Map::new(), Origin::Parsed)
        } else {
            match serde_json::from_str::<Value>(text) {
                Ok(Value::Object(map)) => (map, Origin::Parsed),
                Ok(other) => {
                    let mut map = Map::new();
                    map.insert("data".to_string(), other);
                    (map, Origin::Parsed)
                }
                Err(error) => (error_body(error.to_string()), Origin::Malformed),
            }
        };

        let mut status_injected = false;
        if origin == Origin::Parsed && (200..300).contains(&http_status) && !body.contains_key("status")
        {
            body.insert("status".to_string(), Value::String("success".to_string()));
            status_injected = true;
        }

        Self { body, origin, http_status: Some(http_status), status_injected }
    }

    pub fn transport_error(message: impl Into<String>) -> Self {
        Self {
            body: error_body(message.into()),
            origin: Origin::Transport,
            http_status: None,
            status_injected: false,
        }
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn http_status(&self) -> Option<u16> {
        self.http_status
    }

    pub fn is_malformed(&self) -> bool {
        self.origin == Origin::Malformed
    }

    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.body)
    }

    pub fn status(&self) -> Option<&str> {
        self.body.get("status").and_then(Value::as_str)
    }

    pub fn message(&self) -> Option<&str> {
        ["message", "msg", "error"]
            .iter()
            .find_map(|key| self.body.get(*key).and_then(Value::as_str))
            .or_else(|| self.nested().and_then(|data| data.get("message")).and_then(Value::as_str))
    }

    /// `field` at top level, then under `data`. Null counts as absent.
    pub fn locate(&self, field: &str) -> Option<Located<'_>> {
        if let Some(value) = self.body.get(field).filter(|value| !value.is_null()) {
            return Some(Located::Direct(value));
        }
        self.nested()
            .and_then(|data| data.get(field))
            .filter(|value| !value.is_null())
            .map(Located::Nested)
    }

    /// A single entity: `field`, `data.field`, then the body itself when it
    /// carries a top-level `id`.
    pub fn entity(&self, field: &str) -> Option<Value> {
        if let Some(located) = self.locate(field) {
            if located.value().is_object() {
                return Some(located.value().clone());
            }
        }
        self.bare_entity()
    }

    /// Record-shaped payloads where `data.id` wins over a top-level `id`.
    pub fn record(&self) -> Option<Value> {
        if let Some(data) = self.nested() {
            if data.get("id").is_some_and(|id| !id.is_null()) {
                return Some(Value::Object(data.clone()));
            }
        }
        self.bare_entity()
    }

    pub fn list(&self, field: &str) -> Option<&Vec<Value>> {
        match self.locate(field) {
            Some(Located::Direct(Value::Array(items))) | Some(Located::Nested(Value::Array(items))) => {
                Some(items)
            }
            _ => self.nested_array(field),
        }
    }

    pub fn flag(&self, field: &str) -> Option<bool> {
        self.locate(field).and_then(|located| located.value().as_bool())
    }

    /// Outcome of a delete call: an explicit `success` flag wins, then
    /// `deleted`, then a success status.
    pub fn delete_outcome(&self) -> bool {
        if let Some(success) = self.flag("success") {
            return success;
        }
        if let Some(deleted) = self.flag("deleted") {
            return deleted;
        }
        let status_code = self.body.get("statusCode").and_then(Value::as_u64);
        self.status() == Some("success") || status_code == Some(200)
    }

    pub fn decode_entity<T: DeserializeOwned>(&self, field: &str, context: &str) -> Result<T, CrmError> {
        let value = self.entity(field).ok_or_else(|| self.failure(context))?;
        decode(value, context)
    }

    pub fn decode_list<T: DeserializeOwned>(&self, field: &str, context: &str) -> Result<Vec<T>, CrmError> {
        let items = self.list(field).ok_or_else(|| self.failure(context))?;
        items.iter().cloned().map(|item| decode(item, context)).collect()
    }

    /// Error for "none of the expected shapes matched".
    pub fn failure(&self, context: &str) -> CrmError {
        if self.is_malformed() {
            return CrmError::MalformedResponse(
                self.message().unwrap_or("response body is not valid JSON").to_string(),
            );
        }
        match self.message() {
            Some(message) => CrmError::OperationFailed(format!("{context}: {message}")),
            None => CrmError::OperationFailed(context.to_string()),
        }
    }

    fn nested(&self) -> Option<&Map<String, Value>> {
        self.body.get("data").and_then(Value::as_object)
    }

    fn nested_array(&self, field: &str) -> Option<&Vec<Value>> {
        self.nested().and_then(|data| data.get(field)).and_then(Value::as_array)
    }

    fn bare_entity(&self) -> Option<Value> {
        if !self.body.get("id").is_some_and(|id| !id.is_null()) {
            return None;
        }
        let mut entity = self.body.clone();
        if self.status_injected {
            entity.remove("status");
        }
        Some(Value::Object(entity))
    }
}

fn error_body(message: String) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("status".to_string(), Value::String("error".to_string()));
    map.insert("message".to_string(), Value::String(message));
    map
}

fn decode<T: DeserializeOwned>(value: Value, context: &str) -> Result<T, CrmError> {
    serde_json::from_value(value)
        .map_err(|error| CrmError::OperationFailed(format!("{context}: unexpected shape ({error})")))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Envelope, Located, Origin};
    use crate::error::CrmError;

    #[test]
    fn empty_success_body_becomes_bare_success_status() {
        let envelope = Envelope::from_response(200, "");

        assert_eq!(envelope.into_value(), json!({"status": "success"}));
    }

    #[test]
    fn non_json_body_becomes_error_envelope() {
        let envelope = Envelope::from_response(200, "<html>gateway</html>");

        assert_eq!(envelope.origin(), Origin::Malformed);
        assert_eq!(envelope.status(), Some("error"));
        assert!(envelope.message().is_some_and(|message| !message.is_empty()));
        assert_eq!(envelope.body().len(), 2);
    }

    #[test]
    fn upstream_status_field_is_not_overwritten() {
        let envelope = Envelope::from_response(200, r#"{"status":"queued"}"#);
        assert_eq!(envelope.status(), Some("queued"));
    }

    #[test]
    fn failed_response_gets_no_injected_status() {
        let envelope = Envelope::from_response(400, r#"{"message":"bad"}"#);
        assert_eq!(envelope.status(), None);
        assert_eq!(envelope.message(), Some("bad"));
    }

    #[test]
    fn direct_field_wins_over_nested_field() {
        let envelope = Envelope::from_response(
            200,
            r#"{"contact":{"id":"direct"},"data":{"contact":{"id":"nested"}}}"#,
        );

        let located = envelope.locate("contact");
        assert!(matches!(located, Some(Located::Direct(_))));
        assert_eq!(envelope.entity("contact"), Some(json!({"id": "direct"})));
    }

    #[test]
    fn nested_field_is_used_when_direct_is_missing() {
        let envelope = Envelope::from_response(200, r#"{"data":{"contact":{"id":"nested"}}}"#);

        assert!(matches!(envelope.locate("contact"), Some(Located::Nested(_))));
    }

    #[test]
    fn bare_entity_drops_only_injected_status() {
        let envelope = Envelope::from_response(201, r#"{"id":"c1","firstName":"A"}"#);
        assert_eq!(envelope.entity("contact"), Some(json!({"id": "c1", "firstName": "A"})));

        let envelope = Envelope::from_response(200, r#"{"id":"c1","status":"active"}"#);
        assert_eq!(envelope.entity("contact"), Some(json!({"id": "c1", "status": "active"})));
    }

    #[test]
    fn record_prefers_nested_id() {
        let envelope = Envelope::from_response(200, r#"{"id":"outer","data":{"id":"inner"}}"#);
        assert_eq!(envelope.record(), Some(json!({"id": "inner"})));
    }

    #[test]
    fn delete_success_flag_beats_injected_status() {
        assert!(!Envelope::from_response(200, r#"{"success":false}"#).delete_outcome());
        assert!(Envelope::from_response(200, r#"{"data":{"success":true}}"#).delete_outcome());
        assert!(Envelope::from_response(200, r#"{"deleted":true}"#).delete_outcome());
        assert!(Envelope::from_response(200, "").delete_outcome());
        assert!(Envelope::from_response(404, r#"{"statusCode":200}"#).delete_outcome());
        assert!(!Envelope::from_response(404, r#"{"message":"gone"}"#).delete_outcome());
    }

    #[test]
    fn missing_shape_reports_upstream_message() {
        let envelope = Envelope::from_response(200, r#"{"message":"location mismatch"}"#);

        assert_eq!(
            envelope.failure("failed to fetch contact"),
            CrmError::OperationFailed("failed to fetch contact: location mismatch".to_owned())
        );
    }

    #[test]
    fn missing_shape_on_malformed_body_is_reported_as_malformed() {
        let envelope = Envelope::from_response(200, "not json");

        assert!(matches!(envelope.failure("failed to fetch contact"), CrmError::MalformedResponse(_)));
    }

    #[test]
    fn list_accepts_direct_and_nested_arrays() {
        let direct = Envelope::from_response(200, r#"{"contacts":[{"id":"a"}]}"#);
        let nested = Envelope::from_response(200, r#"{"data":{"contacts":[{"id":"b"}]}}"#);

        assert_eq!(direct.list("contacts").map(Vec::len), Some(1));
        assert_eq!(nested.list("contacts").map(Vec::len), Some(1));
        assert!(Envelope::from_response(200, r#"{"contacts":{}}"#).list("contacts").is_none());
    }

    #[test]
    fn top_level_array_is_placed_under_data() {
        let envelope = Envelope::from_response(200, r#"[{"id":"t1"}]"#);
        assert_eq!(envelope.body().get("data"), Some(&json!([{"id": "t1"}])));
    }
}
