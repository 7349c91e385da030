//! `sg init`: create the project config and migrate the store.

use crate::cmd;
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};
use anyhow::Context as _;
use clap::Args;
use serde::Serialize;
use stakegraph_core::config::{self, PROJECT_DIR, ProjectConfig};
use stakegraph_core::db::migrations;
use stakegraph_core::session::Session;
use std::io::Write;
use std::path::Path;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing `.stakegraph/config.toml` with defaults.
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
struct InitReport {
    config_path: String,
    config_written: bool,
    location: String,
    schema_version: u32,
}

/// Execute `sg init`.
///
/// Writes `.stakegraph/config.toml` unless it exists (or `--force`), then
/// opens the resolved store, which creates the file and applies migrations.
/// Running it again on an initialized project is a no-op.
///
/// # Errors
///
/// Returns an error if the config cannot be written or the store cannot be
/// opened.
pub fn run_init(
    args: &InitArgs,
    output: OutputMode,
    project_root: &Path,
    db_url: Option<&str>,
) -> anyhow::Result<()> {
    let config_path = config::config_path(project_root);
    let config_written = args.force || !config_path.exists();
    if config_written {
        let dir = project_root.join(PROJECT_DIR);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        let content = toml::to_string_pretty(&ProjectConfig::default())
            .context("Failed to serialize default config")?;
        std::fs::write(&config_path, content)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
    }

    let effective = cmd::resolve(output, project_root, db_url)?;
    let session = Session::open(&effective.location, effective.project.store.busy_timeout())?;
    let schema_version = migrations::current_schema_version(session.connection())
        .context("read schema version")?;
    session.close()?;

    tracing::info!(location = %effective.location, schema_version, "initialized store");

    let report = InitReport {
        config_path: config_path.display().to_string(),
        config_written,
        location: effective.location.to_string(),
        schema_version,
    };

    render_mode(
        output,
        &report,
        |r, w| writeln!(w, "{}  schema v{}", r.location, r.schema_version),
        |r, w| {
            pretty_section(w, "Initialized stakegraph")?;
            pretty_kv(w, "Store", &r.location)?;
            pretty_kv(w, "Schema", format!("v{}", r.schema_version))?;
            let config_state = if r.config_written { "written" } else { "kept" };
            pretty_kv(w, "Config", format!("{} ({config_state})", r.config_path))
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: InitArgs,
    }

    #[test]
    fn init_args_default_keeps_config() {
        let w = Wrapper::parse_from(["test"]);
        assert!(!w.args.force);
    }

    #[test]
    fn init_writes_config_and_store() {
        let dir = tempfile::tempdir().unwrap();
        run_init(
            &InitArgs { force: false },
            OutputMode::Json,
            dir.path(),
            Some("sqlite:graph.db"),
        )
        .unwrap();

        assert!(config::config_path(dir.path()).exists());
        assert!(stakegraph_core::db::is_initialized(&dir.path().join("graph.db")).unwrap());
    }

    #[test]
    fn init_keeps_existing_config_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = config::config_path(dir.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[paging]\ndefault_limit = 7\n").unwrap();

        run_init(
            &InitArgs { force: false },
            OutputMode::Json,
            dir.path(),
            Some("sqlite::memory:"),
        )
        .unwrap();

        let loaded = config::load_project_config(dir.path()).unwrap();
        assert_eq!(loaded.paging.default_limit, Some(7));
    }
}
