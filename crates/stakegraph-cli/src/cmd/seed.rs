//! `sg seed`: load the development fixture graph.

use crate::cmd;
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};
use stakegraph_core::db::seed;
use std::io::Write;
use std::path::Path;

/// Execute `sg seed`. Existing relation edges are replaced.
///
/// # Errors
///
/// Returns an error if the store cannot be opened or the fixtures cannot be
/// written.
pub fn run_seed(output: OutputMode, project_root: &Path, db_url: Option<&str>) -> anyhow::Result<()> {
    let store = cmd::open_store(output, project_root, db_url)?;
    let report = seed::seed(store.session.connection())?;

    render_mode(
        output,
        &report,
        |r, w| {
            writeln!(
                w,
                "stakeholders {}  relations {}",
                r.stakeholders_inserted, r.relations_inserted
            )
        },
        |r, w| {
            pretty_section(w, "Seeded store")?;
            pretty_kv(w, "Stakeholders", r.stakeholders_inserted.to_string())?;
            pretty_kv(w, "Relations", r.relations_inserted.to_string())
        },
    )
}
