//! Subcommand handlers. Each module exposes clap `Args` and a `run_*` entry
//! point taking the resolved [`OutputMode`] and the project root.

pub mod create;
pub mod delete;
pub mod graph;
pub mod init;
pub mod legacy;
pub mod link;
pub mod list;
pub mod seed;
pub mod show;
pub mod update;

use crate::output::{CliError, OutputMode, render_error};
use clap::Args;
use stakegraph_core::config::{self, ConfigError, EffectiveConfig, StoreLocation};
use stakegraph_core::db::{self, query::Pagination};
use stakegraph_core::error::{ErrorCode, WriteError};
use stakegraph_core::model::StakeholderFields;
use stakegraph_core::session::Session;
use std::path::Path;

/// An open session plus the config it was opened with.
pub struct Store {
    pub session: Session,
    pub config: EffectiveConfig,
}

/// Resolve config and open the store without creating it.
///
/// Renders `E1001` when a file-backed store has not been initialized.
pub fn open_store(
    output: OutputMode,
    project_root: &Path,
    db_url: Option<&str>,
) -> anyhow::Result<Store> {
    let config = resolve(output, project_root, db_url)?;

    if let StoreLocation::File(path) = &config.location {
        if !db::is_initialized(path)? {
            render_error(
                output,
                &CliError::with_code(
                    format!("no store at {}", path.display()),
                    ErrorCode::NotInitialized,
                ),
            )?;
            anyhow::bail!("store not initialized");
        }
    }

    let session = Session::open(&config.location, config.project.store.busy_timeout())?;
    Ok(Store { session, config })
}

/// Resolve config, rendering config failures with their error code.
pub fn resolve(
    output: OutputMode,
    project_root: &Path,
    db_url: Option<&str>,
) -> anyhow::Result<EffectiveConfig> {
    match config::resolve_config(project_root, db_url) {
        Ok(config) => Ok(config),
        Err(e) => {
            let code = e
                .downcast_ref::<ConfigError>()
                .map_or(ErrorCode::ConfigParseError, ConfigError::code);
            render_error(output, &CliError::with_code(format!("{e:#}"), code))?;
            Err(e)
        }
    }
}

/// Render a write failure and turn it into the command's error.
pub fn write_failed<T>(output: OutputMode, err: &WriteError) -> anyhow::Result<T> {
    render_error(output, &CliError::from(err))?;
    anyhow::bail!("{err}")
}

/// `--limit` / `--offset` shared by listing commands.
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct PageArgs {
    /// Maximum number of records (defaults to `[paging] default_limit`).
    #[arg(long)]
    pub limit: Option<u32>,

    /// Number of records to skip.
    #[arg(long)]
    pub offset: Option<u32>,
}

impl PageArgs {
    /// Apply the configured default limit when none was given.
    pub fn pagination(self, config: &EffectiveConfig) -> Pagination {
        Pagination::new(
            self.limit.or(config.project.paging.default_limit),
            self.offset,
        )
    }
}

/// Stakeholder attribute flags shared by `create` and `update`.
#[derive(Args, Debug, Clone, Default)]
pub struct FieldArgs {
    #[arg(long)]
    pub org_name: Option<String>,
    #[arg(long)]
    pub first_name: Option<String>,
    #[arg(long)]
    pub last_name: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub website: Option<String>,
    #[arg(long)]
    pub map: Option<String>,
    #[arg(long)]
    pub owner_id: Option<String>,
}

impl From<FieldArgs> for StakeholderFields {
    fn from(args: FieldArgs) -> Self {
        Self {
            org_name: args.org_name,
            first_name: args.first_name,
            last_name: args.last_name,
            email: args.email,
            phone: args.phone,
            website: args.website,
            map: args.map,
            owner_id: args.owner_id,
        }
    }
}
