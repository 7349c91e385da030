//! Read-only bridge to the legacy `entity` / `entity_relationship` tables.

use anyhow::{Context, Result};
use rusqlite::{Connection, params};
use serde::Serialize;

use super::query::{Page, Pagination};

/// Pagination applied when the caller does not supply one.
pub const DEFAULT_PAGINATION: Pagination = Pagination {
    limit: Some(100),
    offset: Some(0),
};

/// A row of the legacy `entity` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entity {
    pub id: String,
    #[serde(rename = "type")]
    pub entity_type: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
}

/// Entities that are one-hop children of `org_id`, ordered by name then id.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_entity_children(
    conn: &Connection,
    org_id: &str,
    page: Option<Pagination>,
) -> Result<Page<Entity>> {
    let page = page.unwrap_or(DEFAULT_PAGINATION);
    let limit = page.limit.map_or(-1, i64::from);
    let offset = page.offset.map_or(0, i64::from);

    let sql = "SELECT e.id, e.type, e.name, e.email, e.phone, e.website \
               FROM entity e \
               WHERE e.id IN (SELECT child_id FROM entity_relationship WHERE parent_id = ?1) \
               ORDER BY e.name ASC, e.id ASC \
               LIMIT ?2 OFFSET ?3";
    let mut stmt = conn
        .prepare(sql)
        .context("prepare list_entity_children")?;
    let rows = stmt
        .query_map(params![org_id, limit, offset], |row| {
            Ok(Entity {
                id: row.get(0)?,
                entity_type: row.get(1)?,
                name: row.get(2)?,
                email: row.get(3)?,
                phone: row.get(4)?,
                website: row.get(5)?,
            })
        })
        .with_context(|| format!("execute list_entity_children for '{org_id}'"))?;

    let mut records = Vec::new();
    for row in rows {
        records.push(row.context("read entity row")?);
    }

    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM entity \
             WHERE id IN (SELECT child_id FROM entity_relationship WHERE parent_id = ?1)",
            params![org_id],
            |row| row.get(0),
        )
        .context("count list_entity_children")?;

    Ok(Page {
        records,
        total_count: u64::try_from(count).unwrap_or(0),
    })
}
