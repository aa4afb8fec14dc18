use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use gitpr::commands::validators;
use gitpr::commands::*;
use gitpr::config::{Config, ProviderOverrides};
use gitpr::constants;
use gitpr::factory::ProviderFactory;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gitpr")]
#[command(about = "Open pull requests with generated file changes on any git host")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(
        short,
        long,
        global = true,
        default_value_t = constants::cli::DEFAULT_CONFIG_FILE.to_string()
    )]
    config: String,

    /// Hostname of the git provider, overrides the configuration file
    #[arg(long, global = true)]
    hostname: Option<String>,

    /// Access token, overrides the configured environment variable
    #[arg(long, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Arguments shared by every command that talks to one repository
#[derive(Args)]
struct RepoArgs {
    /// Repository URL (SSH, SCP style or HTTPS)
    #[arg(long)]
    repo: String,

    /// Hosting provider, detected from the repository host when omitted
    #[arg(short, long)]
    provider: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Commit files to a new branch and open a pull request
    CreatePr {
        #[command(flatten)]
        target: RepoArgs,

        /// Branch the pull request targets
        #[arg(long)]
        base: String,

        /// Branch to write to (default: gitpr-<random>)
        #[arg(long)]
        head: Option<String>,

        /// Title for the pull request
        #[arg(long)]
        title: String,

        /// Body text for the pull request
        #[arg(long, default_value = "")]
        body: String,

        /// Commit message
        #[arg(short, long)]
        message: Option<String>,

        /// Local directory whose files are committed
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Remote directory the files of --dir are placed under
        #[arg(long)]
        prefix: Option<String>,

        /// Single file as <local>:<remote> (can be specified multiple times)
        #[arg(long = "file")]
        files: Vec<String>,

        /// Remote path to delete (can be specified multiple times)
        #[arg(long = "delete")]
        deletes: Vec<String>,
    },

    /// List pull requests of a repository
    ListPrs {
        #[command(flatten)]
        target: RepoArgs,

        /// Output in JSON format for machine consumption
        #[arg(long)]
        json: bool,
    },

    /// List files of a repository at a ref
    Tree {
        #[command(flatten)]
        target: RepoArgs,

        /// Commit SHA or branch name
        #[arg(long = "ref")]
        reference: String,

        /// Directory to list
        #[arg(long, default_value = "")]
        path: String,

        /// Output in JSON format for machine consumption
        #[arg(long)]
        json: bool,
    },

    /// Resolve a repository URL
    Repo {
        #[command(flatten)]
        target: RepoArgs,

        /// Output in JSON format for machine consumption
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let context = CommandContext {
        config: Config::load(&cli.config)?,
        overrides: ProviderOverrides {
            hostname: cli.hostname,
            token: cli.token,
        },
        factory: ProviderFactory::new(),
    };

    execute_command(cli.command, &context).await
}

fn validate_target(target: &RepoArgs) -> Result<()> {
    validators::validate_repo_url(&target.repo)?;
    validators::validate_provider_name(&target.provider)
}

async fn execute_command(command: Commands, context: &CommandContext) -> Result<()> {
    match command {
        Commands::CreatePr {
            target,
            base,
            head,
            title,
            body,
            message,
            dir,
            prefix,
            files,
            deletes,
        } => {
            validate_target(&target)?;
            validators::validate_branch_name(&Some(base.clone()))?;
            validators::validate_branch_name(&head)?;
            validators::validate_commit_message(&message)?;
            validators::validate_create_pr_sources(&dir, &prefix, &files, &deletes)?;

            CreatePrCommand {
                provider: target.provider,
                repo: target.repo,
                base,
                head,
                title,
                body,
                message,
                dir,
                prefix,
                files,
                deletes,
            }
            .execute(context)
            .await
        }
        Commands::ListPrs { target, json } => {
            validate_target(&target)?;
            ListPrsCommand {
                provider: target.provider,
                repo: target.repo,
                json,
            }
            .execute(context)
            .await
        }
        Commands::Tree {
            target,
            reference,
            path,
            json,
        } => {
            validate_target(&target)?;
            validators::validate_branch_name(&Some(reference.clone()))?;
            TreeCommand {
                provider: target.provider,
                repo: target.repo,
                reference,
                path,
                json,
            }
            .execute(context)
            .await
        }
        Commands::Repo { target, json } => {
            validate_target(&target)?;
            RepoCommand {
                provider: target.provider,
                repo: target.repo,
                json,
            }
            .execute(context)
            .await
        }
    }
}
