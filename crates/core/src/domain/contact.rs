use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Payload for create/update/upsert. Unknown keys ride along in `extra` so
/// callers can pass upstream fields this type does not name.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ContactInput {
    pub fn has_location(&self) -> bool {
        self.location_id.as_deref().map(|value| !value.trim().is_empty()).unwrap_or(false)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BusinessContactsQuery {
    pub limit: Option<u32>,
    pub skip: Option<u32>,
    pub query: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Contact, ContactInput};

    #[test]
    fn unknown_contact_fields_are_preserved() {
        let contact: Contact = serde_json::from_value(json!({
            "id": "c1",
            "firstName": "Ada",
            "customFields": [{"id": "f1", "value": "x"}]
        }))
        .expect("contact should deserialize");

        assert_eq!(contact.first_name.as_deref(), Some("Ada"));
        assert!(contact.extra.contains_key("customFields"));

        let back = serde_json::to_value(&contact).expect("contact should serialize");
        assert_eq!(back["customFields"][0]["id"], "f1");
    }

    #[test]
    fn null_tags_decode_as_absent() {
        let contact: Contact = serde_json::from_value(json!({"id": "c1", "tags": null}))
            .expect("null tags should deserialize");
        assert_eq!(contact.tags, None);

        let tagged: Contact = serde_json::from_value(json!({"id": "c2", "tags": ["vip"]}))
            .expect("tags should deserialize");
        assert_eq!(tagged.tags, Some(vec!["vip".to_owned()]));
    }

    #[test]
    fn blank_location_is_not_a_location() {
        let input = ContactInput { location_id: Some("  ".to_owned()), ..ContactInput::default() };
        assert!(!input.has_location());
    }
}
