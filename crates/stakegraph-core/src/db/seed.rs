//! Fixed bootstrap fixtures for development stores.

use anyhow::{Context, Result};
use rusqlite::{Connection, params};
use serde::Serialize;
use tracing::info;

const ROOT_ORG: &str = "792a4eee-8e18-4750-a56f-91bdec383aa6";
const CHILD_A: &str = "1a05ec87-3c38-4395-b9f3-aa15becedc31";
const CHILD_B: &str = "1d2fb06e-e8f7-40de-8e13-ed3eba1abb3a";

/// `(id, org_name)` rows the fixture edges reference.
pub const SEED_STAKEHOLDERS: &[(&str, &str)] = &[
    (ROOT_ORG, "Greenstand Foundation"),
    (CHILD_A, "Freetown Planting Group"),
    (CHILD_B, "Highland Nursery Cooperative"),
];

/// `(id, parent_id, child_id)` edges; rows 3 and 4 duplicate 1 and 2.
pub const SEED_RELATIONS: &[(i64, &str, &str)] = &[
    (1, ROOT_ORG, CHILD_A),
    (2, ROOT_ORG, CHILD_B),
    (3, ROOT_ORG, CHILD_A),
    (4, ROOT_ORG, CHILD_B),
];

/// What [`seed`] wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub stakeholders_inserted: usize,
    pub relations_inserted: usize,
}

/// Clear all relation edges and reinsert the fixtures in one transaction.
///
/// Existing stakeholders with a fixture id are kept as they are.
///
/// # Errors
///
/// Returns an error if any statement fails; nothing is written then.
pub fn seed(conn: &Connection) -> Result<SeedReport> {
    let tx = conn
        .unchecked_transaction()
        .context("begin seed transaction")?;

    tx.execute("DELETE FROM stakeholder_relation", [])
        .context("clear stakeholder_relation")?;

    let mut stakeholders_inserted = 0;
    for (id, org_name) in SEED_STAKEHOLDERS {
        stakeholders_inserted += tx
            .execute(
                "INSERT INTO stakeholder (id, org_name) VALUES (?1, ?2) \
                 ON CONFLICT(id) DO NOTHING",
                params![id, org_name],
            )
            .with_context(|| format!("seed stakeholder {id}"))?;
    }

    let mut relations_inserted = 0;
    for (id, parent_id, child_id) in SEED_RELATIONS {
        relations_inserted += tx
            .execute(
                "INSERT INTO stakeholder_relation (id, parent_id, child_id, role, type) \
                 VALUES (?1, ?2, ?3, '', '')",
                params![id, parent_id, child_id],
            )
            .with_context(|| format!("seed relation {id}"))?;
    }

    tx.commit().context("commit seed transaction")?;
    info!(stakeholders_inserted, relations_inserted, "seeded store");

    Ok(SeedReport {
        stakeholders_inserted,
        relations_inserted,
    })
}
