use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Link type between two object kinds, owned by the upstream.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Association {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_object_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second_object_key: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A concrete link between two records under an [`Association`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub association_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_record_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second_record_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RelationQuery {
    pub skip: u32,
    pub limit: u32,
    pub association_ids: Vec<String>,
}
