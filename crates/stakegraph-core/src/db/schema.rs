//! Canonical SQLite schema for stakegraph.
//!
//! - `stakeholder` holds one row per organization or person
//! - `stakeholder_relation` is a flat, directed edge table; duplicates are
//!   allowed and both endpoints reference `stakeholder(id)` through foreign
//!   keys checked at commit time
//! - `entity` / `entity_relationship` is the legacy companion schema read by
//!   [`crate::db::legacy`]

/// Migration v1: stakeholders and their relation edges.
///
/// The foreign keys are `DEFERRABLE INITIALLY DEFERRED` and carry no
/// `ON DELETE` action: a stakeholder delete must remove its own edges in the
/// same transaction or the commit fails.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS stakeholder (
    id TEXT PRIMARY KEY NOT NULL DEFAULT (lower(hex(randomblob(16)))),
    org_name TEXT,
    first_name TEXT,
    last_name TEXT,
    email TEXT,
    phone TEXT,
    website TEXT,
    map TEXT,
    owner_id TEXT,
    CHECK (length(trim(id)) > 0)
);

CREATE TABLE IF NOT EXISTS stakeholder_relation (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    parent_id TEXT NOT NULL
        REFERENCES stakeholder(id) DEFERRABLE INITIALLY DEFERRED,
    child_id TEXT NOT NULL
        REFERENCES stakeholder(id) DEFERRABLE INITIALLY DEFERRED,
    role TEXT NOT NULL DEFAULT '',
    type TEXT NOT NULL DEFAULT ''
);

CREATE INDEX IF NOT EXISTS idx_stakeholder_org_name
    ON stakeholder(org_name, id);

CREATE INDEX IF NOT EXISTS idx_stakeholder_relation_parent
    ON stakeholder_relation(parent_id, type);

CREATE INDEX IF NOT EXISTS idx_stakeholder_relation_child
    ON stakeholder_relation(child_id, type);
";

/// Migration v2: legacy entity tables.
pub const MIGRATION_V2_SQL: &str = r"
CREATE TABLE IF NOT EXISTS entity (
    id TEXT PRIMARY KEY NOT NULL,
    type TEXT,
    name TEXT,
    email TEXT,
    phone TEXT,
    website TEXT
);

CREATE TABLE IF NOT EXISTS entity_relationship (
    parent_id TEXT NOT NULL,
    child_id TEXT NOT NULL,
    type TEXT NOT NULL DEFAULT '',
    role TEXT,
    PRIMARY KEY (parent_id, child_id, type)
);

CREATE INDEX IF NOT EXISTS idx_entity_relationship_child
    ON entity_relationship(child_id);
";

/// Indexes expected after all migrations.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_stakeholder_org_name",
    "idx_stakeholder_relation_parent",
    "idx_stakeholder_relation_child",
    "idx_entity_relationship_child",
];

#[cfg(test)]
mod tests {
    use crate::db::migrations;
    use rusqlite::{Connection, params};

    fn seeded_conn() -> rusqlite::Result<Connection> {
        let mut conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::migrate(&mut conn)?;

        for idx in 0..24_u32 {
            conn.execute(
                "INSERT INTO stakeholder (id, org_name) VALUES (?1, ?2)",
                params![format!("s-{idx:02}"), format!("Org {}", idx % 7)],
            )?;
        }
        for idx in 1..24_u32 {
            conn.execute(
                "INSERT INTO stakeholder_relation (parent_id, child_id, type)
                 VALUES (?1, ?2, 'member')",
                params![format!("s-{:02}", idx / 4), format!("s-{idx:02}")],
            )?;
        }

        Ok(conn)
    }

    fn query_plan_details(conn: &Connection, sql: &str) -> rusqlite::Result<Vec<String>> {
        let mut stmt = conn.prepare(&format!("EXPLAIN QUERY PLAN {sql}"))?;
        stmt.query_map([], |row| row.get::<_, String>(3))?
            .collect::<Result<Vec<_>, _>>()
    }

    #[test]
    fn generated_ids_are_non_empty_and_unique() -> rusqlite::Result<()> {
        let conn = seeded_conn()?;
        let a: String = conn.query_row(
            "INSERT INTO stakeholder DEFAULT VALUES RETURNING id",
            [],
            |row| row.get(0),
        )?;
        let b: String = conn.query_row(
            "INSERT INTO stakeholder DEFAULT VALUES RETURNING id",
            [],
            |row| row.get(0),
        )?;

        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
        Ok(())
    }

    #[test]
    fn blank_ids_are_rejected() -> rusqlite::Result<()> {
        let conn = seeded_conn()?;
        let result = conn.execute("INSERT INTO stakeholder (id) VALUES ('  ')", []);
        assert!(result.is_err(), "blank id must violate the check");
        Ok(())
    }

    #[test]
    fn relation_defaults_role_and_type_to_empty() -> rusqlite::Result<()> {
        let conn = seeded_conn()?;
        let (role, kind): (String, String) = conn.query_row(
            "INSERT INTO stakeholder_relation (parent_id, child_id)
             VALUES ('s-00', 's-05')
             RETURNING role, type",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        assert_eq!(role, "");
        assert_eq!(kind, "");
        Ok(())
    }

    #[test]
    fn query_plan_uses_parent_index() -> rusqlite::Result<()> {
        let conn = seeded_conn()?;
        let details = query_plan_details(
            &conn,
            "SELECT child_id FROM stakeholder_relation WHERE parent_id = 's-01'",
        )?;

        assert!(
            details
                .iter()
                .any(|detail| detail.contains("idx_stakeholder_relation_parent")),
            "expected parent index in plan, got: {details:?}"
        );

        Ok(())
    }

    #[test]
    fn query_plan_uses_child_index() -> rusqlite::Result<()> {
        let conn = seeded_conn()?;
        let details = query_plan_details(
            &conn,
            "SELECT parent_id FROM stakeholder_relation WHERE child_id = 's-05'",
        )?;

        assert!(
            details
                .iter()
                .any(|detail| detail.contains("idx_stakeholder_relation_child")),
            "expected child index in plan, got: {details:?}"
        );

        Ok(())
    }
}
