use serde::{Deserialize, Serialize};

/// Directed parent -> child edge as stored in `stakeholder_relation`.
///
/// Duplicates are allowed; readers deduplicate endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub id: i64,
    pub parent_id: String,
    pub child_id: String,
    pub role: String,
    #[serde(rename = "type")]
    pub relation_type: String,
}

/// Edge to insert. `role` and `type` default to the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRelation {
    pub parent_id: String,
    pub child_id: String,
    #[serde(default)]
    pub role: String,
    #[serde(default, rename = "type")]
    pub relation_type: String,
}

impl NewRelation {
    #[must_use]
    pub fn new(parent_id: impl Into<String>, child_id: impl Into<String>) -> Self {
        Self {
            parent_id: parent_id.into(),
            child_id: child_id.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }

    #[must_use]
    pub fn with_type(mut self, relation_type: impl Into<String>) -> Self {
        self.relation_type = relation_type.into();
        self
    }
}
