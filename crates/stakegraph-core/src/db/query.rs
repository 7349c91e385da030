//! Graph access layer over the `stakeholder` / `stakeholder_relation` tables.
//!
//! Every traversal is one hop: parents, children and related sets are
//! rebuilt from the flat edge table on each call and never cached. Callers
//! compose hops themselves.
//!
//! All functions take a shared `&Connection` reference and return
//! `anyhow::Result<T>` with typed structs (never raw rows). Listings are
//! ordered by `org_name ASC` (binary collation, NULL first) then `id ASC`.

use anyhow::{Context, Result};
use rusqlite::{Connection, params, params_from_iter};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use super::FOLD_FUNCTION;
use crate::model::{ColumnMatch, Relation, Stakeholder, StakeholderColumn, StakeholderTree};

const STAKEHOLDER_COLUMNS: &str = "s.id, s.org_name, s.first_name, s.last_name, s.email, \
                                   s.phone, s.website, s.map, s.owner_id";

const ORDER_BY_NAME: &str = "ORDER BY s.org_name ASC, s.id ASC";

// ---------------------------------------------------------------------------
// Pages
// ---------------------------------------------------------------------------

/// Optional `LIMIT` / `OFFSET`; an unset axis is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl Pagination {
    /// No bound on either axis.
    pub const UNBOUNDED: Self = Self {
        limit: None,
        offset: None,
    };

    #[must_use]
    pub const fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self { limit, offset }
    }

    fn sql_clause(self) -> String {
        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => format!(" LIMIT {limit} OFFSET {offset}"),
            (Some(limit), None) => format!(" LIMIT {limit}"),
            (None, Some(offset)) => format!(" LIMIT -1 OFFSET {offset}"),
            (None, None) => String::new(),
        }
    }
}

/// One page of a listing plus the size of the unpaginated result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub records: Vec<T>,
    pub total_count: u64,
}

impl<T> Page<T> {
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            records: Vec::new(),
            total_count: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// Criteria for [`filter`]. Set parts are combined with AND; empty strings
/// count as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    /// Case-insensitive substring matched against every searchable column
    /// (OR-ed).
    pub search: Option<String>,
    /// Case-insensitive substring on `org_name`.
    pub org_name: Option<String>,
    /// Exact `column = value` pairs.
    pub equals: Vec<ColumnMatch>,
}

/// Accumulates `WHERE` fragments with positional `?n` parameters.
#[derive(Debug, Default)]
struct Conditions {
    clauses: Vec<String>,
    params: Vec<String>,
}

impl Conditions {
    fn bind(&mut self, value: impl Into<String>) -> usize {
        self.params.push(value.into());
        self.params.len()
    }

    fn push_search(&mut self, term: &str) {
        let n = self.bind(like_pattern(term));
        let ors = StakeholderColumn::SEARCHABLE
            .into_iter()
            .map(|column| fold_like(column, n))
            .collect::<Vec<_>>()
            .join(" OR ");
        self.clauses.push(format!("({ors})"));
    }

    fn push_like(&mut self, column: StakeholderColumn, term: &str) {
        let n = self.bind(like_pattern(term));
        self.clauses.push(fold_like(column, n));
    }

    fn push_equals(&mut self, matches: &[ColumnMatch]) {
        for m in matches {
            let n = self.bind(m.value.clone());
            self.clauses.push(format!("s.{} = ?{n}", m.column.as_sql()));
        }
    }

    fn push_id_in(&mut self, ids: &[String]) {
        let placeholders = ids
            .iter()
            .map(|id| format!("?{}", self.bind(id.clone())))
            .collect::<Vec<_>>()
            .join(", ");
        self.clauses.push(format!("s.id IN ({placeholders})"));
    }

    fn where_clause(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    fn for_criteria(criteria: &FilterCriteria) -> Self {
        let mut conditions = Self::default();
        if let Some(term) = non_empty(criteria.search.as_deref()) {
            conditions.push_search(term);
        }
        if let Some(term) = non_empty(criteria.org_name.as_deref()) {
            conditions.push_like(StakeholderColumn::OrgName, term);
        }
        conditions.push_equals(&criteria.equals);
        conditions
    }
}

/// Case-insensitive `LIKE` of `column` against parameter `?n`, folded on
/// both sides.
fn fold_like(column: StakeholderColumn, n: usize) -> String {
    format!(
        "{FOLD_FUNCTION}(s.{}) LIKE {FOLD_FUNCTION}(?{n}) ESCAPE '\\'",
        column.as_sql()
    )
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// `%term%` with LIKE wildcards in `term` escaped by `\`.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

// ---------------------------------------------------------------------------
// Lookups
// ---------------------------------------------------------------------------

/// Fetch a single stakeholder by exact id.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn get_stakeholder(conn: &Connection, id: &str) -> Result<Option<Stakeholder>> {
    let sql = format!("SELECT {STAKEHOLDER_COLUMNS} FROM stakeholder s WHERE s.id = ?1");
    let mut stmt = conn
        .prepare(&sql)
        .context("prepare get_stakeholder query")?;

    match stmt.query_row(params![id], row_to_stakeholder) {
        Ok(stakeholder) => Ok(Some(stakeholder)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context(format!("get_stakeholder for '{id}'")),
    }
}

/// # Errors
///
/// Returns an error if the query fails.
pub fn stakeholder_exists(conn: &Connection, id: &str) -> Result<bool> {
    let exists: bool = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM stakeholder WHERE id = ?1)",
            params![id],
            |row| row.get(0),
        )
        .context("check stakeholder_exists")?;
    Ok(exists)
}

/// Total number of stakeholder rows.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn count_stakeholders(conn: &Connection) -> Result<u64> {
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM stakeholder", [], |row| row.get(0))
        .context("execute count_stakeholders")?;
    Ok(u64::try_from(count).unwrap_or(0))
}

/// Fetch full records for `ids`, sorted by name. Unknown ids are skipped.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn fetch_many(conn: &Connection, ids: &[String]) -> Result<Vec<Stakeholder>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut conditions = Conditions::default();
    conditions.push_id_in(ids);
    select_stakeholders(conn, "", &conditions, Pagination::UNBOUNDED, "fetch_many")
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

/// Stakeholders that are nobody's child.
///
/// `total_count` is the number of **all** stakeholders, not of roots; list
/// consumers page against the whole population.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_roots(conn: &Connection, page: Pagination) -> Result<Page<Stakeholder>> {
    let mut conditions = Conditions::default();
    conditions.clauses.push("r.child_id IS NULL".to_string());
    let records = select_stakeholders(
        conn,
        " LEFT JOIN stakeholder_relation r ON r.child_id = s.id",
        &conditions,
        page,
        "list_roots",
    )?;
    let total_count = count_stakeholders(conn)?;
    Ok(Page {
        records,
        total_count,
    })
}

/// The stakeholder matching `id`, left-joined against the edges where it is
/// the child and deduplicated.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_by_id(conn: &Connection, id: &str, page: Pagination) -> Result<Page<Stakeholder>> {
    let sql = format!(
        "SELECT DISTINCT {STAKEHOLDER_COLUMNS} FROM stakeholder s \
         LEFT JOIN stakeholder_relation r ON r.child_id = s.id \
         WHERE s.id = ?1 {ORDER_BY_NAME}{}",
        page.sql_clause()
    );
    let records = query_stakeholders(conn, &sql, &[id.to_string()], "list_by_id")?;

    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM stakeholder WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .context("count list_by_id")?;

    Ok(Page {
        records,
        total_count: u64::try_from(count).unwrap_or(0),
    })
}

// ---------------------------------------------------------------------------
// One-hop traversal
// ---------------------------------------------------------------------------

/// Distinct parent ids of `id`, sorted.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_parent_ids(conn: &Connection, id: &str) -> Result<Vec<String>> {
    query_ids(
        conn,
        "SELECT DISTINCT parent_id FROM stakeholder_relation \
         WHERE child_id = ?1 ORDER BY parent_id",
        id,
        "get_parent_ids",
    )
}

/// One-hop parents of `id`.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_parents(conn: &Connection, id: &str) -> Result<Vec<Stakeholder>> {
    let ids = get_parent_ids(conn, id)?;
    fetch_many(conn, &ids)
}

/// Child ids of `id` in edge insertion order, each id once.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_children_ids(conn: &Connection, id: &str) -> Result<Vec<String>> {
    let raw = query_ids(
        conn,
        "SELECT child_id FROM stakeholder_relation WHERE parent_id = ?1 ORDER BY id",
        id,
        "get_children_ids",
    )?;
    Ok(dedup_first_seen(raw))
}

/// One-hop children of `id`.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_children(conn: &Connection, id: &str) -> Result<Vec<Stakeholder>> {
    let ids = get_children_ids(conn, id)?;
    fetch_many(conn, &ids)
}

/// Every endpoint of every edge touching `id`, in first-seen order.
///
/// `id` itself is included iff it has at least one edge.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_related_ids(conn: &Connection, id: &str) -> Result<Vec<String>> {
    let edges = list_edges(conn, id)?;
    let endpoints = edges
        .into_iter()
        .flat_map(|edge| [edge.parent_id, edge.child_id])
        .collect();
    Ok(dedup_first_seen(endpoints))
}

/// Full records for the related set of `id` plus `id` itself.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_relations(conn: &Connection, id: &str) -> Result<Page<Stakeholder>> {
    let mut ids = get_related_ids(conn, id)?;
    if !ids.iter().any(|related| related == id) {
        ids.push(id.to_string());
    }
    debug!(id, related = ids.len(), "get_relations");

    let records = fetch_many(conn, &ids)?;
    let total_count = u64::try_from(records.len()).unwrap_or(u64::MAX);
    Ok(Page {
        records,
        total_count,
    })
}

/// A stakeholder with its one-hop parents and children.
///
/// # Errors
///
/// Returns an error if a query fails.
pub fn get_tree_by_id(conn: &Connection, id: &str) -> Result<Option<StakeholderTree>> {
    let Some(stakeholder) = get_stakeholder(conn, id)? else {
        return Ok(None);
    };
    Ok(Some(StakeholderTree {
        parents: get_parents(conn, id)?,
        children: get_children(conn, id)?,
        stakeholder,
    }))
}

/// Raw edges where `id` is either endpoint, in insertion order.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_edges(conn: &Connection, id: &str) -> Result<Vec<Relation>> {
    let sql = "SELECT id, parent_id, child_id, role, type FROM stakeholder_relation \
               WHERE parent_id = ?1 OR child_id = ?1 ORDER BY id";
    let mut stmt = conn.prepare(sql).context("prepare list_edges")?;
    let rows = stmt
        .query_map(params![id], row_to_relation)
        .context("execute list_edges")?;

    let mut edges = Vec::new();
    for row in rows {
        edges.push(row.context("read relation row")?);
    }
    Ok(edges)
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

/// Stakeholders matching `criteria`; `total_count` ignores pagination.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn filter(
    conn: &Connection,
    criteria: &FilterCriteria,
    page: Pagination,
) -> Result<Page<Stakeholder>> {
    let conditions = Conditions::for_criteria(criteria);
    debug!(clauses = conditions.clauses.len(), "filter");
    filtered_page(conn, &conditions, page, "filter")
}

/// Related set of `id` narrowed by exact-match pairs.
///
/// Only exact matches are accepted here; substring search is not applied to
/// related sets. Empty when `id` has no edges.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn filter_by_id(
    conn: &Connection,
    id: &str,
    equals: &[ColumnMatch],
    page: Pagination,
) -> Result<Page<Stakeholder>> {
    let related = get_related_ids(conn, id)?;
    if related.is_empty() {
        return Ok(Page::empty());
    }

    let mut conditions = Conditions::default();
    conditions.push_id_in(&related);
    conditions.push_equals(equals);
    filtered_page(conn, &conditions, page, "filter_by_id")
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn filtered_page(
    conn: &Connection,
    conditions: &Conditions,
    page: Pagination,
    label: &str,
) -> Result<Page<Stakeholder>> {
    let records = select_stakeholders(conn, "", conditions, page, label)?;

    let sql = format!(
        "SELECT COUNT(*) FROM stakeholder s{}",
        conditions.where_clause()
    );
    let count: i64 = conn
        .query_row(&sql, params_from_iter(conditions.params.iter()), |row| {
            row.get(0)
        })
        .with_context(|| format!("count {label}: {sql}"))?;

    Ok(Page {
        records,
        total_count: u64::try_from(count).unwrap_or(0),
    })
}

fn select_stakeholders(
    conn: &Connection,
    joins: &str,
    conditions: &Conditions,
    page: Pagination,
    label: &str,
) -> Result<Vec<Stakeholder>> {
    let sql = format!(
        "SELECT {STAKEHOLDER_COLUMNS} FROM stakeholder s{joins}{} {ORDER_BY_NAME}{}",
        conditions.where_clause(),
        page.sql_clause()
    );
    query_stakeholders(conn, &sql, &conditions.params, label)
}

fn query_stakeholders(
    conn: &Connection,
    sql: &str,
    params: &[String],
    label: &str,
) -> Result<Vec<Stakeholder>> {
    let mut stmt = conn
        .prepare(sql)
        .with_context(|| format!("prepare {label} query: {sql}"))?;
    let rows = stmt
        .query_map(params_from_iter(params.iter()), row_to_stakeholder)
        .with_context(|| format!("execute {label} query"))?;

    let mut records = Vec::new();
    for row in rows {
        records.push(row.with_context(|| format!("read {label} row"))?);
    }
    Ok(records)
}

fn query_ids(conn: &Connection, sql: &str, id: &str, label: &str) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare(sql)
        .with_context(|| format!("prepare {label}"))?;
    let rows = stmt
        .query_map(params![id], |row| row.get::<_, String>(0))
        .with_context(|| format!("execute {label}"))?;

    let mut ids = Vec::new();
    for row in rows {
        ids.push(row.with_context(|| format!("read {label} row"))?);
    }
    Ok(ids)
}

fn dedup_first_seen(ids: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.into_iter()
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

pub(crate) fn row_to_stakeholder(row: &rusqlite::Row<'_>) -> rusqlite::Result<Stakeholder> {
    Ok(Stakeholder {
        id: row.get(0)?,
        org_name: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        email: row.get(4)?,
        phone: row.get(5)?,
        website: row.get(6)?,
        map: row.get(7)?,
        owner_id: row.get(8)?,
    })
}

pub(crate) fn row_to_relation(row: &rusqlite::Row<'_>) -> rusqlite::Result<Relation> {
    Ok(Relation {
        id: row.get(0)?,
        parent_id: row.get(1)?,
        child_id: row.get(2)?,
        role: row.get(3)?,
        relation_type: row.get(4)?,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
