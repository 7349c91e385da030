//! `sg create`: insert a stakeholder, optionally under a parent.

use crate::cmd::{self, FieldArgs};
use crate::output::{OutputMode, render_page};
use clap::Args;
use stakegraph_core::model::StakeholderDraft;
use stakegraph_core::service::{CreateRequest, StakeholderService};
use std::path::Path;

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Parent stakeholder id; an edge parent -> new is inserted with the row.
    #[arg(long)]
    pub parent: Option<String>,

    /// Explicit id. The store generates one when omitted.
    #[arg(long)]
    pub id: Option<String>,

    #[command(flatten)]
    pub fields: FieldArgs,

    /// Role stored on the edge to the parent.
    #[arg(long, default_value = "", requires = "parent")]
    pub role: String,

    /// Type stored on the edge to the parent.
    #[arg(long, default_value = "", requires = "parent")]
    pub relation: String,
}

impl CreateArgs {
    fn request(&self) -> CreateRequest {
        CreateRequest {
            stakeholder: StakeholderDraft {
                id: self.id.clone(),
                fields: self.fields.clone().into(),
            },
            role: self.role.clone(),
            relation_type: self.relation.clone(),
        }
    }
}

/// Execute `sg create`.
///
/// Prints the parent's listing when `--parent` is given, else the roots.
///
/// # Errors
///
/// Returns an error if the store cannot be opened or the write fails.
pub fn run_create(
    args: &CreateArgs,
    output: OutputMode,
    project_root: &Path,
    db_url: Option<&str>,
) -> anyhow::Result<()> {
    let store = cmd::open_store(output, project_root, db_url)?;
    let service = StakeholderService::new(&store.session);

    let page = match service.create_with_relation(args.parent.as_deref(), &args.request()) {
        Ok(page) => page,
        Err(e) => return cmd::write_failed(output, &e),
    };

    let heading = args
        .parent
        .as_deref()
        .map_or_else(|| "Roots".to_string(), |parent| format!("Listing of {parent}"));
    render_page(&heading, &page, output)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: CreateArgs,
    }

    #[test]
    fn create_args_build_request() {
        let w = Wrapper::parse_from([
            "test",
            "--parent",
            "1",
            "--id",
            "2",
            "--org-name",
            "Zenith",
            "--role",
            "partner",
            "--relation",
            "org",
        ]);
        let request = w.args.request();
        assert_eq!(request.stakeholder.id.as_deref(), Some("2"));
        assert_eq!(request.stakeholder.fields.org_name.as_deref(), Some("Zenith"));
        assert_eq!(request.role, "partner");
        assert_eq!(request.relation_type, "org");
    }

    #[test]
    fn create_args_default_edge_labels_are_empty() {
        let w = Wrapper::parse_from(["test", "--org-name", "Solo"]);
        let request = w.args.request();
        assert!(request.stakeholder.id.is_none());
        assert!(request.role.is_empty());
        assert!(request.relation_type.is_empty());
    }

    #[test]
    fn role_without_parent_is_rejected() {
        assert!(Wrapper::try_parse_from(["test", "--role", "partner"]).is_err());
    }
}
