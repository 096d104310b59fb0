use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const CUSTOM_OBJECT_KEY_PREFIX: &str = "custom_objects.";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomObjectSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Records are schema-defined, so they stay untyped apart from the id.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomObjectRecord {
    pub id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

pub fn is_custom_object_key(key: &str) -> bool {
    key.strip_prefix(CUSTOM_OBJECT_KEY_PREFIX).map(|rest| !rest.is_empty()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::is_custom_object_key;

    #[test]
    fn schema_keys_need_the_custom_objects_prefix() {
        assert!(is_custom_object_key("custom_objects.pets"));
        assert!(!is_custom_object_key("custom_objects."));
        assert!(!is_custom_object_key("pets"));
    }
}
