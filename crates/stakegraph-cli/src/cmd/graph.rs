//! One-hop neighbourhood commands: `sg parents`, `sg children`,
//! `sg related`, and `sg relations`.

use crate::cmd;
use crate::output::{OutputMode, render, render_list, render_page};
use clap::Args;
use stakegraph_core::db::query;
use std::io::Write;
use std::path::Path;

#[derive(Args, Debug)]
pub struct NodeArgs {
    /// Stakeholder id.
    pub id: String,
}

#[derive(Args, Debug)]
pub struct RelatedArgs {
    /// Stakeholder id.
    pub id: String,

    /// List the raw edges touching the id instead of the endpoint ids.
    #[arg(long)]
    pub edges: bool,
}

/// Which side of the edge table to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Parents,
    Children,
}

/// Execute `sg parents <id>` / `sg children <id>`.
///
/// An unknown or isolated id yields an empty list.
///
/// # Errors
///
/// Returns an error if the store cannot be opened or queried.
pub fn run_neighbours(
    direction: Direction,
    args: &NodeArgs,
    output: OutputMode,
    project_root: &Path,
    db_url: Option<&str>,
) -> anyhow::Result<()> {
    let store = cmd::open_store(output, project_root, db_url)?;
    let conn = store.session.connection();
    let records = match direction {
        Direction::Parents => query::get_parents(conn, &args.id)?,
        Direction::Children => query::get_children(conn, &args.id)?,
    };
    render_list(&records, output)?;
    Ok(())
}

/// Execute `sg related <id>`: ids on either end of an edge touching `id`.
///
/// # Errors
///
/// Returns an error if the store cannot be opened or queried.
pub fn run_related(
    args: &RelatedArgs,
    output: OutputMode,
    project_root: &Path,
    db_url: Option<&str>,
) -> anyhow::Result<()> {
    let store = cmd::open_store(output, project_root, db_url)?;
    let conn = store.session.connection();

    if args.edges {
        let edges = query::list_edges(conn, &args.id)?;
        return render(output, &edges, |edges, w| {
            for edge in edges {
                let role = if edge.role.is_empty() { "-" } else { edge.role.as_str() };
                let kind = if edge.relation_type.is_empty() {
                    "-"
                } else {
                    edge.relation_type.as_str()
                };
                writeln!(
                    w,
                    "{}  {} -> {}  {role}  {kind}",
                    edge.id, edge.parent_id, edge.child_id
                )?;
            }
            Ok(())
        });
    }

    let ids = query::get_related_ids(conn, &args.id)?;
    render(output, &ids, |ids, w| {
        for id in ids {
            writeln!(w, "{id}")?;
        }
        Ok(())
    })
}

/// Execute `sg relations <id>`: the related set plus the id itself.
///
/// # Errors
///
/// Returns an error if the store cannot be opened or queried.
pub fn run_relations(
    args: &NodeArgs,
    output: OutputMode,
    project_root: &Path,
    db_url: Option<&str>,
) -> anyhow::Result<()> {
    let store = cmd::open_store(output, project_root, db_url)?;
    let page = query::get_relations(store.session.connection(), &args.id)?;
    render_page(&format!("Relations of {}", args.id), &page, output)?;
    Ok(())
}
