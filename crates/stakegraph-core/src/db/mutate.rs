//! Single-statement writes used by the coordinator.
//!
//! None of these open a transaction; callers run them inside one.

use rusqlite::{Connection, OptionalExtension, params, params_from_iter};

use super::query::{row_to_relation, row_to_stakeholder};
use crate::model::{NewRelation, Relation, Stakeholder, StakeholderDraft, StakeholderFields};

const RETURNING_STAKEHOLDER: &str =
    "RETURNING id, org_name, first_name, last_name, email, phone, website, map, owner_id";

/// Insert a stakeholder; `None` if the statement returned no row.
///
/// # Errors
///
/// Returns the store error, e.g. a duplicate id.
pub fn insert_stakeholder(
    conn: &Connection,
    draft: &StakeholderDraft,
) -> rusqlite::Result<Option<Stakeholder>> {
    let mut columns: Vec<&str> = Vec::new();
    let mut values: Vec<&str> = Vec::new();
    if let Some(id) = draft.id.as_deref() {
        columns.push("id");
        values.push(id);
    }
    for (column, value) in draft.fields.assignments() {
        columns.push(column.as_sql());
        values.push(value);
    }

    let sql = if columns.is_empty() {
        format!("INSERT INTO stakeholder DEFAULT VALUES {RETURNING_STAKEHOLDER}")
    } else {
        let placeholders = (1..=values.len())
            .map(|n| format!("?{n}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "INSERT INTO stakeholder ({}) VALUES ({placeholders}) {RETURNING_STAKEHOLDER}",
            columns.join(", ")
        )
    };

    conn.query_row(&sql, params_from_iter(values), row_to_stakeholder)
        .optional()
}

/// Overwrite the set fields of `id`; `None` if no row matched.
///
/// # Errors
///
/// Returns the store error.
pub fn update_stakeholder(
    conn: &Connection,
    id: &str,
    patch: &StakeholderFields,
) -> rusqlite::Result<Option<Stakeholder>> {
    let assignments = patch.assignments();
    let mut values: Vec<&str> = vec![id];
    let set_clause = if assignments.is_empty() {
        "id = id".to_string()
    } else {
        assignments
            .into_iter()
            .map(|(column, value)| {
                values.push(value);
                format!("{} = ?{}", column.as_sql(), values.len())
            })
            .collect::<Vec<_>>()
            .join(", ")
    };

    let sql = format!("UPDATE stakeholder SET {set_clause} WHERE id = ?1 {RETURNING_STAKEHOLDER}");
    conn.query_row(&sql, params_from_iter(values), row_to_stakeholder)
        .optional()
}

/// Delete the stakeholder row only; `None` if no row matched.
///
/// # Errors
///
/// Returns the store error.
pub fn delete_stakeholder(conn: &Connection, id: &str) -> rusqlite::Result<Option<Stakeholder>> {
    let sql = format!("DELETE FROM stakeholder WHERE id = ?1 {RETURNING_STAKEHOLDER}");
    conn.query_row(&sql, params![id], row_to_stakeholder)
        .optional()
}

/// # Errors
///
/// Returns the store error.
pub fn insert_relation(conn: &Connection, edge: &NewRelation) -> rusqlite::Result<Relation> {
    conn.query_row(
        "INSERT INTO stakeholder_relation (parent_id, child_id, role, type) \
         VALUES (?1, ?2, ?3, ?4) \
         RETURNING id, parent_id, child_id, role, type",
        params![edge.parent_id, edge.child_id, edge.role, edge.relation_type],
        row_to_relation,
    )
}

/// Delete every edge touching `id`, restricted to `relation_type` when
/// given. Returns the number of rows removed.
///
/// # Errors
///
/// Returns the store error.
pub fn delete_relations(
    conn: &Connection,
    id: &str,
    relation_type: Option<&str>,
) -> rusqlite::Result<usize> {
    match relation_type {
        Some(kind) => conn.execute(
            "DELETE FROM stakeholder_relation \
             WHERE (parent_id = ?1 OR child_id = ?1) AND type = ?2",
            params![id, kind],
        ),
        None => conn.execute(
            "DELETE FROM stakeholder_relation WHERE parent_id = ?1 OR child_id = ?1",
            params![id],
        ),
    }
}

/// Delete edges from `parent_id` to `child_id`, restricted to
/// `relation_type` when given.
///
/// # Errors
///
/// Returns the store error.
pub fn delete_edge(
    conn: &Connection,
    parent_id: &str,
    child_id: &str,
    relation_type: Option<&str>,
) -> rusqlite::Result<usize> {
    match relation_type {
        Some(kind) => conn.execute(
            "DELETE FROM stakeholder_relation \
             WHERE parent_id = ?1 AND child_id = ?2 AND type = ?3",
            params![parent_id, child_id, kind],
        ),
        None => conn.execute(
            "DELETE FROM stakeholder_relation WHERE parent_id = ?1 AND child_id = ?2",
            params![parent_id, child_id],
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{open_in_memory, query};

    fn draft(id: Option<&str>, org: &str) -> StakeholderDraft {
        StakeholderDraft {
            id: id.map(str::to_string),
            fields: StakeholderFields {
                org_name: Some(org.to_string()),
                ..StakeholderFields::default()
            },
        }
    }

    #[test]
    fn insert_returns_the_stored_row() {
        let conn = open_in_memory().unwrap();
        let row = insert_stakeholder(&conn, &draft(Some("1"), "Acme"))
            .unwrap()
            .unwrap();
        assert_eq!(row.id, "1");
        assert_eq!(row.org_name.as_deref(), Some("Acme"));
        assert!(row.email.is_none());
    }

    #[test]
    fn insert_without_fields_generates_an_id() {
        let conn = open_in_memory().unwrap();
        let row = insert_stakeholder(&conn, &StakeholderDraft::default())
            .unwrap()
            .unwrap();
        assert!(!row.id.is_empty());
        assert!(query::stakeholder_exists(&conn, &row.id).unwrap());
    }

    #[test]
    fn insert_duplicate_id_is_a_store_error() {
        let conn = open_in_memory().unwrap();
        insert_stakeholder(&conn, &draft(Some("1"), "Acme")).unwrap();
        assert!(insert_stakeholder(&conn, &draft(Some("1"), "Other")).is_err());
    }

    #[test]
    fn update_touches_only_set_fields() {
        let conn = open_in_memory().unwrap();
        insert_stakeholder(&conn, &draft(Some("1"), "Acme")).unwrap();

        let patch = StakeholderFields {
            email: Some("hi@acme.io".to_string()),
            ..StakeholderFields::default()
        };
        let row = update_stakeholder(&conn, "1", &patch).unwrap().unwrap();
        assert_eq!(row.org_name.as_deref(), Some("Acme"));
        assert_eq!(row.email.as_deref(), Some("hi@acme.io"));

        let untouched = update_stakeholder(&conn, "1", &StakeholderFields::default())
            .unwrap()
            .unwrap();
        assert_eq!(untouched, row);

        assert!(update_stakeholder(&conn, "ghost", &patch).unwrap().is_none());
    }

    #[test]
    fn delete_returns_removed_row_or_none() {
        let conn = open_in_memory().unwrap();
        insert_stakeholder(&conn, &draft(Some("1"), "Acme")).unwrap();

        let removed = delete_stakeholder(&conn, "1").unwrap().unwrap();
        assert_eq!(removed.id, "1");
        assert!(delete_stakeholder(&conn, "1").unwrap().is_none());
    }

    #[test]
    fn delete_relations_filters_by_type() {
        let conn = open_in_memory().unwrap();
        for (id, org) in [("a", "A"), ("b", "B"), ("c", "C")] {
            insert_stakeholder(&conn, &draft(Some(id), org)).unwrap();
        }
        insert_relation(&conn, &NewRelation::new("a", "b").with_type("x")).unwrap();
        insert_relation(&conn, &NewRelation::new("c", "b").with_type("y")).unwrap();
        insert_relation(&conn, &NewRelation::new("b", "c").with_type("x")).unwrap();

        assert_eq!(delete_relations(&conn, "b", Some("x")).unwrap(), 2);
        assert_eq!(query::get_parent_ids(&conn, "b").unwrap(), vec!["c"]);
        assert_eq!(delete_relations(&conn, "b", None).unwrap(), 1);
        assert_eq!(delete_relations(&conn, "b", None).unwrap(), 0);
    }

    #[test]
    fn delete_edge_targets_one_direction() {
        let conn = open_in_memory().unwrap();
        for (id, org) in [("a", "A"), ("b", "B")] {
            insert_stakeholder(&conn, &draft(Some(id), org)).unwrap();
        }
        let edge = insert_relation(&conn, &NewRelation::new("a", "b").with_role("lead")).unwrap();
        assert_eq!(edge.role, "lead");
        insert_relation(&conn, &NewRelation::new("b", "a")).unwrap();

        assert_eq!(delete_edge(&conn, "a", "b", None).unwrap(), 1);
        assert_eq!(query::get_children_ids(&conn, "b").unwrap(), vec!["a"]);
        assert_eq!(delete_edge(&conn, "b", "a", Some("other")).unwrap(), 0);
    }
}
