//! `sg delete`: remove a stakeholder and the edges touching it.

use crate::cmd;
use crate::output::{OutputMode, render_page};
use clap::Args;
use stakegraph_core::service::{DeleteRequest, StakeholderService};
use std::path::Path;

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Stakeholder id to delete.
    pub id: String,

    /// Only remove edges of this type. Edges of other types that still
    /// reference the id make the delete fail.
    #[arg(long = "type", value_name = "TYPE")]
    pub relation_type: Option<String>,

    /// Print the listing of this id afterwards instead of the roots.
    #[arg(long, value_name = "ID")]
    pub list: Option<String>,
}

/// Execute `sg delete <id>`.
///
/// # Errors
///
/// Returns an error if the store cannot be opened, the id is unknown, or the
/// transaction is rolled back.
pub fn run_delete(
    args: &DeleteArgs,
    output: OutputMode,
    project_root: &Path,
    db_url: Option<&str>,
) -> anyhow::Result<()> {
    let store = cmd::open_store(output, project_root, db_url)?;
    let request = DeleteRequest::new(args.id.clone(), args.relation_type.clone());

    let page = match StakeholderService::new(&store.session)
        .delete_with_relation(args.list.as_deref(), &request)
    {
        Ok(page) => page,
        Err(e) => return cmd::write_failed(output, &e),
    };

    let heading = args
        .list
        .as_deref()
        .map_or_else(|| "Roots".to_string(), |id| format!("Listing of {id}"));
    render_page(&heading, &page, output)?;
    Ok(())
}
