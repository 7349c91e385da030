use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::ErrorCode;

/// An organization or an individual.
///
/// `id` is the only value relation edges reference; everything else is
/// optional free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stakeholder {
    pub id: String,
    pub org_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub map: Option<String>,
    pub owner_id: Option<String>,
}

impl Stakeholder {
    /// Human label: org name, else "first last", else the id.
    #[must_use]
    pub fn display_name(&self) -> String {
        if let Some(org) = self.org_name.as_deref().filter(|s| !s.is_empty()) {
            return org.to_string();
        }
        let person = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if person.is_empty() {
            self.id.clone()
        } else {
            person
        }
    }
}

/// A stakeholder with its one-hop neighbourhood attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StakeholderTree {
    #[serde(flatten)]
    pub stakeholder: Stakeholder,
    pub parents: Vec<Stakeholder>,
    pub children: Vec<Stakeholder>,
}

/// Mutable stakeholder attributes. Unset fields are left alone on update
/// and stored as NULL on create.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StakeholderFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
}

impl StakeholderFields {
    /// Set fields paired with their column, in column order.
    #[must_use]
    pub fn assignments(&self) -> Vec<(StakeholderColumn, &str)> {
        [
            (StakeholderColumn::OrgName, &self.org_name),
            (StakeholderColumn::FirstName, &self.first_name),
            (StakeholderColumn::LastName, &self.last_name),
            (StakeholderColumn::Email, &self.email),
            (StakeholderColumn::Phone, &self.phone),
            (StakeholderColumn::Website, &self.website),
            (StakeholderColumn::Map, &self.map),
            (StakeholderColumn::OwnerId, &self.owner_id),
        ]
        .into_iter()
        .filter_map(|(column, value)| value.as_deref().map(|v| (column, v)))
        .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assignments().is_empty()
    }
}

/// Create payload. A missing `id` lets the store generate one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeholderDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub fields: StakeholderFields,
}

// ---------------------------------------------------------------------------
// Columns
// ---------------------------------------------------------------------------

/// Closed set of stakeholder columns accepted in filter criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StakeholderColumn {
    Id,
    OrgName,
    FirstName,
    LastName,
    Email,
    Phone,
    Website,
    Map,
    OwnerId,
}

impl StakeholderColumn {
    pub const ALL: [Self; 9] = [
        Self::Id,
        Self::OrgName,
        Self::FirstName,
        Self::LastName,
        Self::Email,
        Self::Phone,
        Self::Website,
        Self::Map,
        Self::OwnerId,
    ];

    /// Columns a free-text search looks at.
    pub const SEARCHABLE: [Self; 7] = [
        Self::OrgName,
        Self::FirstName,
        Self::LastName,
        Self::Email,
        Self::Phone,
        Self::Website,
        Self::Map,
    ];

    /// SQL identifier; never derived from user input.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::OrgName => "org_name",
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Website => "website",
            Self::Map => "map",
            Self::OwnerId => "owner_id",
        }
    }
}

impl fmt::Display for StakeholderColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for StakeholderColumn {
    type Err = ParseColumnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|column| column.as_sql() == normalized)
            .ok_or_else(|| ParseColumnError {
                expected: "stakeholder column",
                got: s.to_string(),
            })
    }
}

/// Exact `column = value` predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMatch {
    pub column: StakeholderColumn,
    pub value: String,
}

impl ColumnMatch {
    #[must_use]
    pub fn new(column: StakeholderColumn, value: impl Into<String>) -> Self {
        Self {
            column,
            value: value.into(),
        }
    }
}

impl FromStr for ColumnMatch {
    type Err = ParseColumnError;

    /// Parse `column=value`; the value may be empty.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (column, value) = s.split_once('=').ok_or_else(|| ParseColumnError {
            expected: "column=value pair",
            got: s.to_string(),
        })?;
        Ok(Self {
            column: column.parse()?,
            value: value.to_string(),
        })
    }
}

/// Error returned when parsing a column name or predicate from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseColumnError {
    pub expected: &'static str,
    pub got: String,
}

impl ParseColumnError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::InvalidColumn
    }
}

impl fmt::Display for ParseColumnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: '{}'", self.expected, self.got)
    }
}

impl std::error::Error for ParseColumnError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn acme() -> Stakeholder {
        Stakeholder {
            id: "1".to_string(),
            org_name: Some("Acme".to_string()),
            first_name: None,
            last_name: None,
            email: None,
            phone: None,
            website: None,
            map: None,
            owner_id: None,
        }
    }

    #[test]
    fn column_names_round_trip() {
        for column in StakeholderColumn::ALL {
            let parsed: StakeholderColumn = column.to_string().parse().expect("parse");
            assert_eq!(parsed, column);
        }
    }

    #[test]
    fn column_parse_normalizes_case_and_dashes() {
        assert_eq!(
            "Org-Name".parse::<StakeholderColumn>().expect("parse"),
            StakeholderColumn::OrgName
        );
    }

    #[test]
    fn unknown_column_is_rejected() {
        let err = "name; DROP TABLE stakeholder"
            .parse::<StakeholderColumn>()
            .expect_err("must reject");
        assert_eq!(err.code(), ErrorCode::InvalidColumn);
        assert!(err.to_string().contains("stakeholder column"));
    }

    #[test]
    fn column_match_parses_pairs() {
        let m: ColumnMatch = "email=a=b@example.com".parse().expect("parse");
        assert_eq!(m.column, StakeholderColumn::Email);
        assert_eq!(m.value, "a=b@example.com");

        let empty: ColumnMatch = "phone=".parse().expect("empty value");
        assert_eq!(empty.value, "");

        assert!("email".parse::<ColumnMatch>().is_err());
    }

    #[test]
    fn searchable_excludes_identifiers() {
        assert!(!StakeholderColumn::SEARCHABLE.contains(&StakeholderColumn::Id));
        assert!(!StakeholderColumn::SEARCHABLE.contains(&StakeholderColumn::OwnerId));
    }

    #[test]
    fn assignments_skip_unset_fields() {
        let fields = StakeholderFields {
            email: Some("x@example.com".to_string()),
            org_name: Some(String::new()),
            ..StakeholderFields::default()
        };
        assert_eq!(
            fields.assignments(),
            vec![
                (StakeholderColumn::OrgName, ""),
                (StakeholderColumn::Email, "x@example.com"),
            ]
        );
        assert!(StakeholderFields::default().is_empty());
    }

    #[test]
    fn draft_deserializes_flat_payload() {
        let draft: StakeholderDraft =
            serde_json::from_str(r#"{"id":"9","org_name":"Zenith","email":"z@x.io"}"#)
                .expect("deserialize");
        assert_eq!(draft.id.as_deref(), Some("9"));
        assert_eq!(draft.fields.org_name.as_deref(), Some("Zenith"));
        assert_eq!(draft.fields.email.as_deref(), Some("z@x.io"));
    }

    #[test]
    fn display_name_falls_back_to_person_then_id() {
        let mut s = acme();
        assert_eq!(s.display_name(), "Acme");

        s.org_name = None;
        s.first_name = Some("Ada".to_string());
        s.last_name = Some("Lovelace".to_string());
        assert_eq!(s.display_name(), "Ada Lovelace");

        s.first_name = None;
        s.last_name = None;
        assert_eq!(s.display_name(), "1");
    }

    #[test]
    fn tree_serializes_flat_with_neighbours() {
        let tree = StakeholderTree {
            stakeholder: acme(),
            parents: Vec::new(),
            children: vec![acme()],
        };
        let json = serde_json::to_value(&tree).expect("serialize");
        assert_eq!(json["id"], "1");
        assert_eq!(json["children"].as_array().map(Vec::len), Some(1));
    }
}
