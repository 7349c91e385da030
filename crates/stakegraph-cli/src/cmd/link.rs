//! `sg link` / `sg unlink`: edge-only writes between existing stakeholders.

use crate::cmd;
use crate::output::{OutputMode, render, render_success};
use clap::Args;
use stakegraph_core::model::NewRelation;
use stakegraph_core::service::StakeholderService;
use std::io::Write;
use std::path::Path;

#[derive(Args, Debug)]
pub struct LinkArgs {
    /// Parent stakeholder id.
    pub parent: String,

    /// Child stakeholder id.
    pub child: String,

    /// Role stored on the edge.
    #[arg(long, default_value = "")]
    pub role: String,

    /// Type stored on the edge.
    #[arg(long = "type", value_name = "TYPE", default_value = "")]
    pub relation_type: String,
}

#[derive(Args, Debug)]
pub struct UnlinkArgs {
    /// Parent stakeholder id.
    pub parent: String,

    /// Child stakeholder id.
    pub child: String,

    /// Only remove edges of this type.
    #[arg(long = "type", value_name = "TYPE")]
    pub relation_type: Option<String>,
}

/// Execute `sg link <parent> <child>`.
///
/// Duplicate edges are accepted.
///
/// # Errors
///
/// Returns an error if either endpoint does not exist or the write fails.
pub fn run_link(
    args: &LinkArgs,
    output: OutputMode,
    project_root: &Path,
    db_url: Option<&str>,
) -> anyhow::Result<()> {
    let store = cmd::open_store(output, project_root, db_url)?;
    let edge = NewRelation::new(args.parent.clone(), args.child.clone())
        .with_role(args.role.clone())
        .with_type(args.relation_type.clone());

    let relation = match StakeholderService::new(&store.session).link(&edge) {
        Ok(relation) => relation,
        Err(e) => return cmd::write_failed(output, &e),
    };

    render(output, &relation, |r, w| {
        writeln!(w, "{}  {} -> {}", r.id, r.parent_id, r.child_id)
    })
}

/// Execute `sg unlink <parent> <child>`.
///
/// # Errors
///
/// Returns an error if no edge matched or the write fails.
pub fn run_unlink(
    args: &UnlinkArgs,
    output: OutputMode,
    project_root: &Path,
    db_url: Option<&str>,
) -> anyhow::Result<()> {
    let store = cmd::open_store(output, project_root, db_url)?;
    let removed = match StakeholderService::new(&store.session).unlink(
        &args.parent,
        &args.child,
        args.relation_type.as_deref(),
    ) {
        Ok(removed) => removed,
        Err(e) => return cmd::write_failed(output, &e),
    };

    render_success(
        output,
        &format!(
            "removed {removed} edge(s) {} -> {}",
            args.parent, args.child
        ),
    )
}
