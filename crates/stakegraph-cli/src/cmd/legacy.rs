//! `sg legacy-children`: read children from the legacy entity tables.

use crate::cmd;
use crate::output::{OutputMode, pretty_section, render_mode};
use clap::Args;
use stakegraph_core::db::legacy::{self, Entity};
use stakegraph_core::db::query::{Page, Pagination};
use std::io::{self, Write};
use std::path::Path;

#[derive(Args, Debug)]
pub struct LegacyChildrenArgs {
    /// Organization entity id.
    pub org_id: String,

    /// Maximum number of entities (default 100 when neither bound is given).
    #[arg(long)]
    pub limit: Option<u32>,

    /// Number of entities to skip.
    #[arg(long)]
    pub offset: Option<u32>,
}

impl LegacyChildrenArgs {
    fn pagination(&self) -> Option<Pagination> {
        if self.limit.is_none() && self.offset.is_none() {
            None
        } else {
            Some(Pagination::new(self.limit, self.offset))
        }
    }
}

fn entity_row(e: &Entity, w: &mut dyn Write) -> io::Result<()> {
    writeln!(
        w,
        "{}  {}  {}",
        e.id,
        e.name.as_deref().unwrap_or("-"),
        e.entity_type.as_deref().unwrap_or("-")
    )
}

/// Execute `sg legacy-children <org_id>`.
///
/// # Errors
///
/// Returns an error if the store cannot be opened or queried.
pub fn run_legacy_children(
    args: &LegacyChildrenArgs,
    output: OutputMode,
    project_root: &Path,
    db_url: Option<&str>,
) -> anyhow::Result<()> {
    let store = cmd::open_store(output, project_root, db_url)?;
    let page = legacy::list_entity_children(
        store.session.connection(),
        &args.org_id,
        args.pagination(),
    )?;

    render_mode(
        output,
        &page,
        |p: &Page<Entity>, w| {
            for entity in &p.records {
                entity_row(entity, w)?;
            }
            writeln!(w, "total {}", p.total_count)
        },
        |p: &Page<Entity>, w| {
            pretty_section(w, &format!("Entities under {}", args.org_id))?;
            if p.records.is_empty() {
                writeln!(w, "(none)")?;
            }
            for entity in &p.records {
                entity_row(entity, w)?;
            }
            Ok(())
        },
    )
}
