//! CLI for the GitOps promotion engine.
//!
//! Publishes a dependency-manifest change to an environment repository as a
//! pull request and waits for it to merge, close, or time out.

use clap::{Args, Parser, Subcommand};
use gitops_promotion::{
    connect, CommandGit, Credentials, GitProvider, ManifestMutation, PromotionEngine,
    PromotionRequest, PromotionResult, ProviderKind, PullRequestHandle, RepositorySlug,
    StaticCredentials,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// GitOps Promotion - land application version changes on environment repositories.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Promote an application version through a pull request.
    Promote(PromoteArgs),

    /// Add a comment to an existing pull request.
    Comment(CommentArgs),

    /// Register a webhook on the environment repository.
    Webhook(WebhookArgs),
}

/// Flags shared by every subcommand that talks to a git-hosting backend.
#[derive(Args, Debug)]
struct ProviderArgs {
    /// Git provider kind (github, gitlab, gitea, bitbucket). Detected from
    /// the server URL when omitted.
    #[arg(long)]
    git_kind: Option<String>,

    /// Git server URL.
    #[arg(long, default_value = "https://github.com")]
    git_server: String,

    /// Repository owner (user or organization).
    #[arg(long)]
    owner: String,

    /// Repository name.
    #[arg(long)]
    repository: String,

    /// Git API token.
    #[arg(long, env = "GIT_API_TOKEN", hide_env_values = true)]
    token: String,

    /// Username for backends that authenticate with basic auth.
    #[arg(long, default_value = "promotion-bot")]
    username: String,
}

#[derive(Args, Debug)]
struct PromoteArgs {
    /// Path to a local checkout of the environment repository.
    #[arg(long)]
    checkout: PathBuf,

    /// Manifest file, relative to the checkout root.
    #[arg(long, default_value = "requirements.yaml")]
    manifest: PathBuf,

    /// Application to add, remove or upgrade.
    #[arg(long)]
    app: String,

    /// Target version; required unless the operation is a removal.
    #[arg(long)]
    app_version: Option<String>,

    /// What to do with the application entry.
    #[arg(long, value_enum, default_value_t = Operation::Upgrade)]
    operation: Operation,

    /// Branch the change is pushed to.
    #[arg(long)]
    branch: String,

    /// Branch the pull request targets.
    #[arg(long, default_value = "master")]
    base: String,

    /// Pull request title; derived from the operation when omitted.
    #[arg(long)]
    title: Option<String>,

    /// Pull request body; defaults to the title.
    #[arg(long)]
    description: Option<String>,

    /// Seconds between polls of the pull request.
    #[arg(long, default_value_t = 20)]
    poll_time_secs: u64,

    /// Seconds before giving up on the pull request merging.
    #[arg(long, default_value_t = 3600)]
    timeout_secs: u64,

    /// Observe the pull request without ever merging it.
    #[arg(long)]
    no_merge: bool,

    #[command(flatten)]
    provider: ProviderArgs,
}

#[derive(Args, Debug)]
struct CommentArgs {
    /// Pull request number.
    #[arg(long)]
    pull_request: u64,

    /// Comment text.
    #[arg(long)]
    comment: String,

    #[command(flatten)]
    provider: ProviderArgs,
}

#[derive(Args, Debug)]
struct WebhookArgs {
    /// URL the webhook should deliver to.
    #[arg(long)]
    url: String,

    /// Shared secret for webhook deliveries.
    #[arg(long)]
    secret: Option<String>,

    #[command(flatten)]
    provider: ProviderArgs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum Operation {
    Add,
    Remove,
    Upgrade,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    init_tracing();

    // Parse arguments
    let cli = Cli::parse();

    // Run the main logic
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "Critical failure");
            ExitCode::from(2)
        }
    }
}

/// Initializes tracing with environment filter support.
///
/// Sets up the global tracing subscriber with:
/// - Compact log formatting (single-line output)
/// - Log level filtering via `RUST_LOG` env var (defaults to "info")
fn init_tracing() {
    tracing_subscriber::registry()
        // Use compact formatting without module target paths for cleaner output
        .with(fmt::layer().compact().with_target(false))
        // Falls back to "info" level if RUST_LOG is not set or invalid
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

/// Main execution logic.
async fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    match cli.command {
        Command::Promote(args) => promote(args).await,
        Command::Comment(args) => comment(args).await,
        Command::Webhook(args) => webhook(args).await,
    }
}

async fn promote(args: PromoteArgs) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let mutation = match args.operation {
        Operation::Remove => {
            if args.app_version.is_some() {
                return Err("--app-version cannot be combined with a removal".into());
            }
            ManifestMutation::remove(&args.app)
        }
        Operation::Add | Operation::Upgrade => {
            let version = args
                .app_version
                .as_deref()
                .ok_or("--app-version is required for add and upgrade operations")?;
            match args.operation {
                Operation::Add => ManifestMutation::add(&args.app, version),
                _ => ManifestMutation::upgrade(&args.app, version),
            }
        }
    };

    let title = args.title.unwrap_or_else(|| default_title(&mutation));
    let mut request = PromotionRequest::new(args.checkout, &args.branch, title, mutation)
        .with_manifest_path(args.manifest)
        .with_base_branch(args.base)
        .with_poll_interval(Duration::from_secs(args.poll_time_secs))
        .with_timeout(Duration::from_secs(args.timeout_secs))
        .with_auto_merge(!args.no_merge);
    if let Some(description) = args.description {
        request = request.with_description(description);
    }

    let provider = provider_from_args(&args.provider)?;
    let engine = PromotionEngine::new(provider, Arc::new(CommandGit));
    let result = engine.promote(&request).await?;

    print_result(&result);

    if result.merged() || result.skipped() {
        Ok(ExitCode::from(0))
    } else {
        Ok(ExitCode::from(1))
    }
}

async fn comment(args: CommentArgs) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let provider = provider_from_args(&args.provider)?;
    let handle = PullRequestHandle::new(
        pull_request_url(&args.provider, args.pull_request),
        args.pull_request,
    );
    provider.add_comment(&handle, &args.comment).await?;
    println!("Commented on {}", handle.url);
    Ok(ExitCode::from(0))
}

async fn webhook(args: WebhookArgs) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let provider = provider_from_args(&args.provider)?;
    provider
        .register_webhook(&args.url, args.secret.as_deref())
        .await?;
    println!("Registered webhook delivering to {}", args.url);
    Ok(ExitCode::from(0))
}

/// Builds the backend adapter from the shared provider flags.
fn provider_from_args(
    args: &ProviderArgs,
) -> Result<Arc<dyn GitProvider>, Box<dyn std::error::Error>> {
    let kind = match &args.git_kind {
        Some(kind) => kind.parse::<ProviderKind>()?,
        None => ProviderKind::from_server_url(&args.git_server).ok_or_else(|| {
            format!(
                "Cannot detect the provider kind from '{}'; pass --git-kind",
                args.git_server
            )
        })?,
    };
    let resolver = StaticCredentials::new(Credentials::new(&args.username, &args.token));
    let provider = connect(
        kind,
        &args.git_server,
        RepositorySlug::new(&args.owner, &args.repository),
        &resolver,
    )?;
    Ok(provider)
}

/// Derives a pull request title from the mutation.
fn default_title(mutation: &ManifestMutation) -> String {
    match &mutation.target_version {
        Some(version) => format!("Promote {} to version {version}", mutation.dependency_name),
        None => format!("Remove {} from this environment", mutation.dependency_name),
    }
}

/// Best-effort web URL for a pull request addressed by number.
fn pull_request_url(args: &ProviderArgs, number: u64) -> String {
    format!(
        "{}/{}/{}/pull/{number}",
        args.git_server.trim_end_matches('/'),
        args.owner,
        args.repository
    )
}

/// Prints the final promotion summary.
fn print_result(result: &PromotionResult) {
    println!("\nPromotion:");
    println!("  Outcome: {}", result.outcome.as_str());
    if let Some(handle) = &result.handle {
        println!("  Pull request: {}", handle.url);
    }
    if let Some(error) = &result.publish_error {
        println!("  Reason: {error}");
    }
    if let Some(status) = result.last_commit_status {
        println!("  Last commit status: {}", status.as_str());
    }
    println!("  Elapsed: {}s", result.elapsed.as_secs());
}
