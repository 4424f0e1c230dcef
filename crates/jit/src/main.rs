//! duplo-jit - just-in-time credentials from a Duplo broker
//!
//! Main entry point. Prints exactly one credential document on stdout;
//! everything else goes to stderr.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use jit_cache::CacheConfig;
use jit_config::JitConfig;
use jit_login::SystemBrowser;
use jit_types::APP_NAME;

mod commands;
mod session;

use commands::{aws, duplo, k8s};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// duplo-jit - just-in-time AWS, Kubernetes and Duplo credentials
#[derive(Parser)]
#[command(name = "duplo-jit")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Duplo API base URL
    #[arg(long, global = true, env = "DUPLO_HOST")]
    pub host: Option<String>,

    /// Duplo API token
    #[arg(long, global = true, env = "DUPLO_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Allow getting Duplo credentials via an interactive browser session
    #[arg(long, global = true)]
    pub interactive: bool,

    /// Port to use for the local web server
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Disable caching (not recommended)
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Turn on verbose (debugging) output
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Get AWS credentials (credential_process format)
    Aws(aws::AwsArgs),

    /// Get a Duplo session token
    Duplo,

    /// Get Kubernetes credentials (ExecCredential format)
    K8s(k8s::K8sArgs),

    /// Output version information and exit
    Version,
}

impl Cli {
    /// Command-line layer of the configuration. Unset flags do not override the file.
    fn overrides(&self) -> JitConfig {
        JitConfig {
            host: self.host.clone(),
            interactive: self.interactive.then_some(true),
            port: self.port,
            no_cache: self.no_cache.then_some(true),
            ..JitConfig::default()
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

fn init_tracing(debug: bool) {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::prelude::*;

    let default = if debug {
        "duplo_jit=trace,jit_cache=trace,jit_client=trace,jit_config=trace,jit_login=trace,info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // stdout carries the credential document, so logs only ever go to stderr.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(debug)
                .with_filter(filter),
        )
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}: {:#}", APP_NAME, err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    if let Commands::Version = cli.command {
        println!("{} version {}", APP_NAME, env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let loaded = jit_config::load_config(None);
    for warning in &loaded.warnings {
        tracing::warn!("{}", warning);
    }
    if let Some(source) = &loaded.source {
        tracing::debug!(path = %source.display(), "loaded config file");
    }

    let mut config = loaded.config;
    config.merge(cli.overrides());
    let settings = config.resolve()?;

    let cache = match CacheConfig::init(APP_NAME, settings.no_cache) {
        Ok(cache) => cache,
        Err(e) => {
            tracing::warn!(error = %e, "credential cache unavailable, continuing without it");
            CacheConfig::disabled()
        }
    };

    let ctx = commands::Context {
        settings,
        token: cli.token.filter(|t| !t.is_empty()),
        cache,
        browser: Arc::new(SystemBrowser),
    };

    match cli.command {
        Commands::Aws(args) => aws::run(args, &ctx).await,
        Commands::Duplo => duplo::run(&ctx).await,
        Commands::K8s(args) => k8s::run(args, &ctx).await,
        Commands::Version => Ok(()),
    }
}
