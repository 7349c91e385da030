//! `sg update`: overwrite stakeholder attributes.

use crate::cmd::{self, FieldArgs};
use crate::output::{OutputMode, Renderable, render};
use clap::Args;
use stakegraph_core::model::StakeholderFields;
use stakegraph_core::service::StakeholderService;
use std::path::Path;

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Stakeholder id.
    pub id: String,

    #[command(flatten)]
    pub fields: FieldArgs,
}

/// Execute `sg update <id>`. Only the given flags are written.
///
/// # Errors
///
/// Returns an error if the store cannot be opened, the id is unknown, or the
/// write fails.
pub fn run_update(
    args: &UpdateArgs,
    output: OutputMode,
    project_root: &Path,
    db_url: Option<&str>,
) -> anyhow::Result<()> {
    let store = cmd::open_store(output, project_root, db_url)?;
    let patch = StakeholderFields::from(args.fields.clone());
    if patch.is_empty() {
        tracing::debug!(id = %args.id, "update without fields");
    }

    let updated = match StakeholderService::new(&store.session).update(&args.id, &patch) {
        Ok(updated) => updated,
        Err(e) => return cmd::write_failed(output, &e),
    };

    render(output, &updated, |s, w| s.render_human(w))
}
