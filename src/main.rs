use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use family_tree_graph::{
    config::{Config, DEFAULT_CONFIG_FILE},
    kinship::{FamilyGraph, FamilyTree},
    relations::RelationKind,
    reports::ReportGenerator,
    session::TreeSession,
    store::{FileStore, MemberStore},
    types::{ChangeSet, Gender, Member},
};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "family-tree")]
#[command(about = "Keep a family tree connected and consistent")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Snapshot file (JSON or YAML, by extension)
    #[arg(short, long)]
    store: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Log level
    #[arg(short, long)]
    log_level: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file and an empty snapshot
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Add the first member of an empty tree
    AddFirst {
        #[command(flatten)]
        member: MemberArgs,
    },

    /// Add a new member related to an existing one
    Add {
        #[command(flatten)]
        member: MemberArgs,

        /// Existing member the new one is related to
        #[arg(long)]
        to: String,

        /// What the new member is to the existing one (father, wife, son, ...)
        #[arg(long = "as")]
        relation: RelationKind,

        /// Add even if a member with the same name exists
        #[arg(long)]
        allow_duplicate: bool,
    },

    /// Record that SOURCE is the RELATION of TARGET
    Connect {
        source: String,
        target: String,
        relation: RelationKind,
    },

    /// Remove the relationship between two members
    Unlink { first: String, second: String },

    /// Remove a member from the tree
    Remove { id: String },

    /// Shortest chain of relations between two members
    Path { from: String, to: String },

    /// Report on connectivity and invariants of the stored tree
    Check,

    /// Find members by name
    Search { term: String },

    /// Render the tree as Graphviz DOT
    ExportDot {
        /// Output file path (defaults to stdout)
        #[arg(short = 'f', long)]
        output_file: Option<PathBuf>,
    },
}

#[derive(Args)]
struct MemberArgs {
    #[arg(long)]
    first_name: String,

    #[arg(long, default_value = "")]
    last_name: String,

    /// male or female
    #[arg(long)]
    gender: Gender,

    /// Explicit id (a UUID is generated otherwise)
    #[arg(long)]
    id: Option<String>,

    /// Member of the yeshiva
    #[arg(long)]
    yeshiva: bool,

    /// Yeshiva cohort number
    #[arg(long)]
    machzor: Option<u32>,

    #[arg(long)]
    rabbi: bool,

    #[arg(long)]
    yeshiva_rabbi: bool,

    /// Birth date (YYYY-MM-DD)
    #[arg(long)]
    born: Option<NaiveDate>,

    /// Date of death (YYYY-MM-DD)
    #[arg(long)]
    died: Option<NaiveDate>,
}

impl MemberArgs {
    fn into_member(self) -> Member {
        let mut member = match self.id {
            Some(id) => Member::with_id(id, self.first_name, self.last_name, self.gender),
            None => Member::new(self.first_name, self.last_name, self.gender),
        };
        if self.yeshiva || self.machzor.is_some() {
            member = member.yeshiva(self.machzor);
        }
        if self.rabbi || self.yeshiva_rabbi {
            member = member.rabbi(self.yeshiva_rabbi);
        }
        member.lifespan(self.born, self.died)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load_layered(Some(cli.config.as_path()))?;
    if let Some(store) = cli.store.clone() {
        config.store.path = store;
    }
    if let Some(level) = cli.log_level.clone() {
        config.logging.level = level;
    }

    // Initialize tracing
    init_tracing(&config.logging.level)?;
    config.validate()?;

    info!("Using snapshot {:?}", config.store.path);
    let output = cli.output;

    match cli.command {
        Commands::Init { force } => {
            init(&config, cli.config, force).await?;
        }

        Commands::AddFirst { member } => {
            let mut session = open_session(&config).await?;
            let id = session.add_first_member(member.into_member()).await?;
            print_added(&session, &id, output)?;
        }

        Commands::Add {
            member,
            to,
            relation,
            allow_duplicate,
        } => {
            let mut session = open_session(&config).await?;
            let id = session
                .add_related_member(member.into_member(), &to, relation, allow_duplicate)
                .await?;
            print_added(&session, &id, output)?;
            print_suggestions(session.tree(), output)?;
        }

        Commands::Connect {
            source,
            target,
            relation,
        } => {
            let mut session = open_session(&config).await?;
            session.connect(&source, &target, relation).await?;
            if output == OutputFormat::Text {
                println!("{} is now the {} of {}", source, relation, target);
            }
            print_suggestions(session.tree(), output)?;
        }

        Commands::Unlink { first, second } => {
            let mut session = open_session(&config).await?;
            let removed = session.remove_relationship(&first, &second).await?;
            match output {
                OutputFormat::Json => print_json(&removed)?,
                OutputFormat::Text => println!(
                    "Removed {} between {} and {}",
                    join_relations(&removed),
                    first,
                    second
                ),
            }
        }

        Commands::Remove { id } => {
            let mut session = open_session(&config).await?;
            let member = session.remove_member(&id).await?;
            match output {
                OutputFormat::Json => print_json(&member)?,
                OutputFormat::Text => println!("Removed {} ({})", member.display_name(), member.id),
            }
        }

        Commands::Path { from, to } => {
            let session = open_session(&config).await?;
            let path = session.tree().find_shortest_connection(&from, &to)?;
            match output {
                OutputFormat::Json => print_json(&path)?,
                OutputFormat::Text => {
                    println!("{}", path.describe());
                    println!("{} steps", path.len());
                }
            }
        }

        Commands::Check => {
            check(&config, output).await?;
        }

        Commands::Search { term } => {
            let session = open_session(&config).await?;
            let found = session.tree().search(&term);
            match output {
                OutputFormat::Json => print_json(&found)?,
                OutputFormat::Text => {
                    if found.is_empty() {
                        println!("No members match '{}'", term);
                    }
                    for member in found {
                        println!("{}  {}", member.id, member.display_name());
                    }
                }
            }
        }

        Commands::ExportDot { output_file } => {
            let session = open_session(&config).await?;
            let dot = FamilyGraph::from_members(session.tree().members()).to_dot();
            write_output(&dot, output_file.as_ref()).await?;
        }
    }

    Ok(())
}

/// Initialize tracing with the specified log level
fn init_tracing(log_level: &str) -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(log_level))
        .context("Failed to create env filter")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_level(true),
        )
        .with(env_filter)
        .init();

    Ok(())
}

async fn open_session(config: &Config) -> Result<TreeSession<FileStore>> {
    TreeSession::open(config.file_store(), config.tree_options())
        .await
        .with_context(|| format!("Failed to open family tree at {:?}", config.store.path))
}

/// Write the configuration file and an empty snapshot
async fn init(config: &Config, config_file: PathBuf, force: bool) -> Result<()> {
    info!("Initializing configuration file: {:?}", config_file);

    if config_file.exists() && !force {
        warn!("Configuration file already exists: {:?}", config_file);
        bail!("{:?} already exists; pass --force to overwrite it", config_file);
    }
    config.save_to_file(&config_file).await?;
    println!("Configuration file created: {:?}", config_file);

    let store = config.file_store();
    if store.exists().await? {
        println!("Snapshot already present: {:?}", store.path());
    } else {
        store
            .persist(&Default::default(), &ChangeSet::default())
            .await?;
        println!("Empty snapshot created: {:?}", store.path());
    }

    Ok(())
}

/// Load the snapshot without refusing broken data, then report on it
async fn check(config: &Config, output: OutputFormat) -> Result<()> {
    let members = config.file_store().load_members().await?;
    let tree = FamilyTree::from_members(members, config.tree_options());

    let generator = ReportGenerator::new();
    let report = generator.generate(&tree);
    let format = match output {
        OutputFormat::Json => "json",
        OutputFormat::Text => "text",
    };
    println!("{}", generator.render(&report, format)?);

    if !report.is_healthy() {
        bail!("Family tree has {} invariant violations", report.violations.len());
    }
    Ok(())
}

fn print_added(session: &TreeSession<FileStore>, id: &str, output: OutputFormat) -> Result<()> {
    let Some(member) = session.tree().member(id) else {
        return Ok(());
    };
    match output {
        OutputFormat::Json => print_json(member)?,
        OutputFormat::Text => println!("Added {} ({})", member.display_name(), member.id),
    }
    Ok(())
}

/// Follow-up relationships the tree proposes. They are only printed; the
/// user applies them with `connect`.
fn print_suggestions(tree: &FamilyTree, output: OutputFormat) -> Result<()> {
    let suggestions: Vec<_> = tree.pending_suggestions().collect();
    if suggestions.is_empty() {
        return Ok(());
    }

    match output {
        OutputFormat::Json => print_json(&suggestions)?,
        OutputFormat::Text => {
            println!("\nSuggested connections:");
            for suggestion in suggestions {
                let name = |id: &str| {
                    tree.member(id)
                        .map(|m| m.display_name())
                        .unwrap_or_else(|| id.to_string())
                };
                println!(
                    "  {} may be the {} of {}  (family-tree connect {} {} {})",
                    name(&suggestion.source),
                    suggestion.kind,
                    name(&suggestion.target),
                    suggestion.source,
                    suggestion.target,
                    suggestion.kind
                );
            }
        }
    }
    Ok(())
}

fn join_relations(relations: &[RelationKind]) -> String {
    relations
        .iter()
        .map(|kind| kind.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn write_output(content: &str, output_file: Option<&PathBuf>) -> Result<()> {
    if let Some(file_path) = output_file {
        tokio::fs::write(file_path, content)
            .await
            .with_context(|| format!("Failed to write output to: {:?}", file_path))?;
        info!("Output written to: {:?}", file_path);
    } else {
        println!("{}", content);
    }
    Ok(())
}
