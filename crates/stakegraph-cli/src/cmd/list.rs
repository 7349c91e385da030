//! `sg roots` and `sg filter`: paginated stakeholder listings.

use crate::cmd::{self, PageArgs};
use crate::output::{OutputMode, render_page};
use clap::Args;
use stakegraph_core::db::query::{self, FilterCriteria};
use stakegraph_core::model::ColumnMatch;
use std::path::Path;

#[derive(Args, Debug)]
pub struct RootsArgs {
    #[command(flatten)]
    pub page: PageArgs,
}

#[derive(Args, Debug)]
pub struct FilterArgs {
    /// Case-insensitive substring matched against every text column.
    #[arg(long)]
    pub search: Option<String>,

    /// Case-insensitive substring matched against the organization name.
    #[arg(long)]
    pub org_name: Option<String>,

    /// Exact `column=value` match (repeatable).
    #[arg(long = "where", value_name = "COLUMN=VALUE")]
    pub equals: Vec<ColumnMatch>,

    /// Restrict to stakeholders related to this id (exact matches only).
    #[arg(long, value_name = "ID", conflicts_with_all = ["search", "org_name"])]
    pub related_to: Option<String>,

    #[command(flatten)]
    pub page: PageArgs,
}

/// Execute `sg roots`: stakeholders that are nobody's child.
///
/// # Errors
///
/// Returns an error if the store cannot be opened or queried.
pub fn run_roots(
    args: &RootsArgs,
    output: OutputMode,
    project_root: &Path,
    db_url: Option<&str>,
) -> anyhow::Result<()> {
    let store = cmd::open_store(output, project_root, db_url)?;
    let page = query::list_roots(
        store.session.connection(),
        args.page.pagination(&store.config),
    )?;
    render_page("Roots", &page, output)?;
    Ok(())
}

/// Execute `sg filter`.
///
/// With `--related-to` only `--where` pairs apply and the candidate set is
/// the related set of that id.
///
/// # Errors
///
/// Returns an error if the store cannot be opened or queried.
pub fn run_filter(
    args: &FilterArgs,
    output: OutputMode,
    project_root: &Path,
    db_url: Option<&str>,
) -> anyhow::Result<()> {
    let store = cmd::open_store(output, project_root, db_url)?;
    let conn = store.session.connection();
    let pagination = args.page.pagination(&store.config);

    let page = match args.related_to.as_deref() {
        Some(id) => query::filter_by_id(conn, id, &args.equals, pagination)?,
        None => {
            let criteria = FilterCriteria {
                search: args.search.clone(),
                org_name: args.org_name.clone(),
                equals: args.equals.clone(),
            };
            query::filter(conn, &criteria, pagination)?
        }
    };

    render_page("Matches", &page, output)?;
    Ok(())
}
