#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{Parser, Subcommand};
use output::OutputMode;
use std::env;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "sg: stakeholder relationship graph",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Output format (pretty, text, json). Defaults to pretty on a TTY.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Shorthand for `--format json`.
    #[arg(long, global = true, hide = true)]
    json: bool,

    /// Connection url (`sqlite:<path>` or `sqlite::memory:`). Overrides
    /// `DATABASE_URL` and `.stakegraph/config.toml`.
    #[arg(long, global = true, value_name = "URL")]
    db: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        output::resolve_output_mode(self.format, self.json)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Setup",
        about = "Initialize the store",
        long_about = "Write .stakegraph/config.toml and create or migrate the store.",
        after_help = "EXAMPLES:\n    # Initialize in the current directory\n    sg init\n\n    # Use an explicit store file\n    sg --db sqlite:graph.db init"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Load fixture stakeholders",
        long_about = "Replace all relation edges with the development fixtures.",
        after_help = "EXAMPLES:\n    sg seed"
    )]
    Seed,

    #[command(
        next_help_heading = "Read",
        about = "List root stakeholders",
        long_about = "List stakeholders that are not the child of any edge.",
        after_help = "EXAMPLES:\n    # First page of roots\n    sg roots --limit 20\n\n    # Emit machine-readable output\n    sg roots --json"
    )]
    Roots(cmd::list::RootsArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show one stakeholder",
        after_help = "EXAMPLES:\n    sg show 792a4eee-8e18-4750-a56f-91bdec383aa6"
    )]
    Show(cmd::show::ShowArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show a stakeholder with parents and children",
        after_help = "EXAMPLES:\n    sg tree 792a4eee-8e18-4750-a56f-91bdec383aa6 --json"
    )]
    Tree(cmd::show::ShowArgs),

    #[command(next_help_heading = "Graph", about = "List direct parents")]
    Parents(cmd::graph::NodeArgs),

    #[command(next_help_heading = "Graph", about = "List direct children")]
    Children(cmd::graph::NodeArgs),

    #[command(
        next_help_heading = "Graph",
        about = "List ids related by any edge",
        after_help = "EXAMPLES:\n    # Endpoint ids\n    sg related 1\n\n    # Raw edges\n    sg related 1 --edges"
    )]
    Related(cmd::graph::RelatedArgs),

    #[command(
        next_help_heading = "Graph",
        about = "List related stakeholders including the id itself"
    )]
    Relations(cmd::graph::NodeArgs),

    #[command(
        next_help_heading = "Read",
        about = "Search and filter stakeholders",
        long_about = "Filter stakeholders by free-text search, organization name, and exact column matches.",
        after_help = "EXAMPLES:\n    # Free-text search\n    sg filter --search zen\n\n    # Exact matches\n    sg filter --where email=ops@acme.io --where org_name=Acme\n\n    # Exact matches within the related set of an id\n    sg filter --related-to 1 --where org_name=Zenith"
    )]
    Filter(cmd::list::FilterArgs),

    #[command(
        next_help_heading = "Write",
        about = "Create a stakeholder",
        after_help = "EXAMPLES:\n    # A root organization\n    sg create --org-name Acme\n\n    # A child with a typed edge\n    sg create --parent 1 --org-name Zenith --role partner --relation org"
    )]
    Create(cmd::create::CreateArgs),

    #[command(
        next_help_heading = "Write",
        about = "Update stakeholder fields",
        after_help = "EXAMPLES:\n    sg update 2 --email ops@zenith.io"
    )]
    Update(cmd::update::UpdateArgs),

    #[command(
        next_help_heading = "Write",
        about = "Delete a stakeholder and its edges",
        after_help = "EXAMPLES:\n    # Remove the row and every edge touching it\n    sg delete 2\n\n    # Only remove edges of one type\n    sg delete 2 --type org"
    )]
    Delete(cmd::delete::DeleteArgs),

    #[command(next_help_heading = "Write", about = "Add an edge")]
    Link(cmd::link::LinkArgs),

    #[command(next_help_heading = "Write", about = "Remove edges")]
    Unlink(cmd::link::UnlinkArgs),

    #[command(
        next_help_heading = "Legacy",
        about = "List children from the legacy entity tables",
        after_help = "EXAMPLES:\n    sg legacy-children org-1 --limit 50"
    )]
    LegacyChildren(cmd::legacy::LegacyChildrenArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("STAKEGRAPH_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "stakegraph=debug,info"
        } else {
            "stakegraph=info,warn"
        })
    });

    let format = env::var("STAKEGRAPH_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let project_root = env::current_dir()?;
    let output = cli.output_mode();
    let db = cli.db.as_deref();

    match &cli.command {
        Commands::Init(args) => cmd::init::run_init(args, output, &project_root, db),
        Commands::Seed => cmd::seed::run_seed(output, &project_root, db),
        Commands::Roots(args) => cmd::list::run_roots(args, output, &project_root, db),
        Commands::Show(args) => cmd::show::run_show(args, output, &project_root, db),
        Commands::Tree(args) => cmd::show::run_tree(args, output, &project_root, db),
        Commands::Parents(args) => cmd::graph::run_neighbours(
            cmd::graph::Direction::Parents,
            args,
            output,
            &project_root,
            db,
        ),
        Commands::Children(args) => cmd::graph::run_neighbours(
            cmd::graph::Direction::Children,
            args,
            output,
            &project_root,
            db,
        ),
        Commands::Related(args) => cmd::graph::run_related(args, output, &project_root, db),
        Commands::Relations(args) => cmd::graph::run_relations(args, output, &project_root, db),
        Commands::Filter(args) => cmd::list::run_filter(args, output, &project_root, db),
        Commands::Create(args) => cmd::create::run_create(args, output, &project_root, db),
        Commands::Update(args) => cmd::update::run_update(args, output, &project_root, db),
        Commands::Delete(args) => cmd::delete::run_delete(args, output, &project_root, db),
        Commands::Link(args) => cmd::link::run_link(args, output, &project_root, db),
        Commands::Unlink(args) => cmd::link::run_unlink(args, output, &project_root, db),
        Commands::LegacyChildren(args) => {
            cmd::legacy::run_legacy_children(args, output, &project_root, db)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn json_flag_sets_output_mode() {
        let cli = Cli::parse_from(["sg", "--json", "roots"]);
        assert!(cli.json);
        assert!(cli.output_mode().is_json());
    }

    #[test]
    fn json_flag_after_subcommand() {
        let cli = Cli::parse_from(["sg", "roots", "--json"]);
        assert!(cli.output_mode().is_json());
    }

    #[test]
    fn format_flag_wins() {
        let cli = Cli::parse_from(["sg", "roots", "--format", "text", "--json"]);
        assert_eq!(cli.output_mode(), OutputMode::Text);
    }

    #[test]
    fn db_flag_is_global() {
        let cli = Cli::parse_from(["sg", "children", "1", "--db", "sqlite::memory:"]);
        assert_eq!(cli.db.as_deref(), Some("sqlite::memory:"));
        assert!(matches!(cli.command, Commands::Children(ref a) if a.id == "1"));
    }

    #[test]
    fn legacy_children_is_kebab_case() {
        let cli = Cli::parse_from(["sg", "legacy-children", "org-1", "--limit", "5"]);
        assert!(matches!(
            cli.command,
            Commands::LegacyChildren(ref a) if a.org_id == "org-1" && a.limit == Some(5)
        ));
    }

    #[test]
    fn delete_accepts_type() {
        let cli = Cli::parse_from(["sg", "delete", "1", "--type", "org"]);
        assert!(matches!(
            cli.command,
            Commands::Delete(ref a) if a.relation_type.as_deref() == Some("org")
        ));
    }
}
