mod cmd;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "retracer-ctl",
    about = "Lifecycle controller for a Launchpad retracer host",
    version,
    propagate_version = true
)]
struct Cli {
    /// Filesystem root the retracer layout lives under (tests use a tempdir)
    #[arg(long, global = true, env = "RETRACER_ROOT", default_value = "/")]
    root: PathBuf,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Service account owning the retracer's files
    #[arg(long, global = true, env = "RETRACER_OWNER", default_value = "ubuntu:ubuntu")]
    owner: String,

    /// Skip chown calls (for unprivileged runs)
    #[arg(long, global = true)]
    no_chown: bool,

    /// Outbound HTTP proxy URL
    #[arg(long, global = true, env = "RETRACER_HTTP_PROXY")]
    http_proxy: Option<String>,

    /// Outbound HTTPS proxy URL
    #[arg(long, global = true, env = "RETRACER_HTTPS_PROXY")]
    https_proxy: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// One-time environment setup: packages, checkout, directories,
    /// crash database, units, reverse proxy
    Install {
        /// Whitespace-separated architecture list (e.g. "amd64 arm64")
        #[arg(long, env = "RETRACER_ARCHITECTURES")]
        architectures: String,
    },

    /// Import credentials and reconcile directories and units
    Configure {
        /// Whitespace-separated architecture list (e.g. "amd64 arm64")
        #[arg(long, env = "RETRACER_ARCHITECTURES")]
        architectures: String,

        /// Identifier of the granted credentials secret
        #[arg(long, env = "RETRACER_CREDENTIALS_ID")]
        credentials_id: String,

        /// Directory holding granted secrets (default: under --root)
        #[arg(long, env = "RETRACER_SECRETS_DIR")]
        secrets_dir: Option<PathBuf>,
    },

    /// Refresh the config checkout and restart the reverse proxy
    Start,

    /// Show the last recorded status
    Status,

    /// Import the credential blob without the rest of the configure flow
    ImportCredentials {
        /// Identifier of the granted credentials secret
        #[arg(long, env = "RETRACER_CREDENTIALS_ID")]
        credentials_id: String,

        /// Directory holding granted secrets (default: under --root)
        #[arg(long, env = "RETRACER_SECRETS_DIR")]
        secrets_dir: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let ctx = cmd::Context {
        root: cli.root,
        owner: if cli.no_chown {
            None
        } else {
            Some(retracer_core::Account::parse(&cli.owner))
        },
        proxies: retracer_core::ProxyConfig::new(cli.http_proxy, cli.https_proxy),
        json: cli.json,
    };

    let result = match cli.command {
        Commands::Install { architectures } => cmd::install::run(&ctx, &architectures),
        Commands::Configure {
            architectures,
            credentials_id,
            secrets_dir,
        } => cmd::configure::run(&ctx, &architectures, &credentials_id, secrets_dir.as_deref()),
        Commands::Start => cmd::start::run(&ctx),
        Commands::Status => cmd::status::run(&ctx),
        Commands::ImportCredentials {
            credentials_id,
            secrets_dir,
        } => cmd::credentials::run(&ctx, &credentials_id, secrets_dir.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
