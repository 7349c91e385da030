//! `sg show` and `sg tree`: a single stakeholder, optionally with its
//! one-hop neighbourhood.

use crate::cmd;
use crate::output::{
    CliError, OutputMode, Renderable, pretty_kv, pretty_rule, pretty_section, render_error,
    render_mode,
};
use clap::Args;
use stakegraph_core::db::query;
use stakegraph_core::error::ErrorCode;
use stakegraph_core::model::{Stakeholder, StakeholderTree};
use std::io::{self, Write};
use std::path::Path;

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Stakeholder id.
    pub id: String,
}

fn not_found(output: OutputMode, id: &str) -> anyhow::Result<()> {
    render_error(
        output,
        &CliError::with_code(
            format!("stakeholder '{id}' not found"),
            ErrorCode::StakeholderNotFound,
        ),
    )?;
    anyhow::bail!("stakeholder '{id}' not found")
}

fn pretty_stakeholder(s: &Stakeholder, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, &s.display_name())?;
    pretty_kv(w, "ID", &s.id)?;
    let fields = [
        ("Org", &s.org_name),
        ("First name", &s.first_name),
        ("Last name", &s.last_name),
        ("Email", &s.email),
        ("Phone", &s.phone),
        ("Website", &s.website),
        ("Map", &s.map),
        ("Owner", &s.owner_id),
    ];
    for (key, value) in fields {
        if let Some(value) = value {
            pretty_kv(w, key, value)?;
        }
    }
    Ok(())
}

/// Execute `sg show <id>`.
///
/// # Errors
///
/// Returns an error if the store cannot be read or the id is unknown.
pub fn run_show(
    args: &ShowArgs,
    output: OutputMode,
    project_root: &Path,
    db_url: Option<&str>,
) -> anyhow::Result<()> {
    let store = cmd::open_store(output, project_root, db_url)?;
    let Some(stakeholder) = query::get_stakeholder(store.session.connection(), &args.id)? else {
        return not_found(output, &args.id);
    };

    render_mode(
        output,
        &stakeholder,
        |s, w| s.render_table(w),
        pretty_stakeholder,
    )
}

/// Execute `sg tree <id>`: the stakeholder with its parents and children.
///
/// # Errors
///
/// Returns an error if the store cannot be read or the id is unknown.
pub fn run_tree(
    args: &ShowArgs,
    output: OutputMode,
    project_root: &Path,
    db_url: Option<&str>,
) -> anyhow::Result<()> {
    let store = cmd::open_store(output, project_root, db_url)?;
    let Some(tree) = query::get_tree_by_id(store.session.connection(), &args.id)? else {
        return not_found(output, &args.id);
    };

    render_mode(
        output,
        &tree,
        |t: &StakeholderTree, w| {
            t.stakeholder.render_table(w)?;
            for parent in &t.parents {
                write!(w, "parent  ")?;
                parent.render_table(w)?;
            }
            for child in &t.children {
                write!(w, "child  ")?;
                child.render_table(w)?;
            }
            Ok(())
        },
        |t: &StakeholderTree, w| {
            pretty_stakeholder(&t.stakeholder, w)?;
            writeln!(w)?;
            writeln!(w, "Parents ({})", t.parents.len())?;
            pretty_rule(w)?;
            for parent in &t.parents {
                parent.render_human(w)?;
            }
            writeln!(w)?;
            writeln!(w, "Children ({})", t.children.len())?;
            pretty_rule(w)?;
            for child in &t.children {
                child.render_human(w)?;
            }
            Ok(())
        },
    )
}
