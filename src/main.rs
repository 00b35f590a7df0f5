//! Marksmith main entry point
//!
//! This is the command-line interface for scraping web pages to Markdown
//! through a locally hosted backend stack.

use clap::{Parser, Subcommand};
use marksmith::backend::BackendClient;
use marksmith::config::{load_config_with_hash, validate, Config};
use marksmith::orchestrator::{run_scrape, RunPlan, RunSummary, ServerPolicy, ShutdownPolicy};
use marksmith::server::{probe_version, ServiceManager};
use marksmith::url::{resolve_input, resolve_output_dir};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Marksmith: web pages to Markdown at scale
///
/// Marksmith drives a locally hosted scraping backend to convert web
/// pages into Markdown files, with retries, resumable batches, and
/// hands-off management of the backend's container stack.
#[derive(Parser, Debug)]
#[command(name = "marksmith")]
#[command(version)]
#[command(about = "Scrape web pages to Markdown through a local backend", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape one URL, or a file of URLs, to Markdown
    Scrape(ScrapeArgs),

    /// Manage the local scraping backend
    Server {
        #[command(subcommand)]
        command: ServerCommand,
    },
}

#[derive(clap::Args, Debug)]
struct ScrapeArgs {
    /// URL to scrape, or path to a file of URLs (one per line)
    #[arg(value_name = "INPUT")]
    input: String,

    /// Output directory (default: cwd for a URL, ./<file-stem>/ for a file)
    #[arg(short, long, value_name = "DIR")]
    out: Option<PathBuf>,

    /// Prepend a YAML front matter block to each Markdown file
    #[arg(long)]
    front_matter: bool,

    /// Re-scrape URLs the manifest already marks done
    #[arg(short = 'f', long)]
    overwrite: bool,

    /// Backend API URL
    #[arg(long, value_name = "URL")]
    api: Option<String>,

    /// When to start the backend: auto, never, or always
    #[arg(long, value_name = "POLICY", default_value_t = ServerPolicy::Auto)]
    server: ServerPolicy,

    /// What to do with a backend this run started: stop, down, or keep
    #[arg(long, value_name = "POLICY", default_value_t = ShutdownPolicy::Stop)]
    shutdown: ShutdownPolicy,

    /// Send all URLs through the backend's batch endpoint
    #[arg(long)]
    batch: bool,

    /// Retries per URL after the first attempt
    #[arg(long, value_name = "N")]
    max_retries: Option<u32>,

    /// Base backoff delay in seconds
    #[arg(long, value_name = "SECS")]
    base_delay: Option<f64>,

    /// Backoff ceiling in seconds
    #[arg(long, value_name = "SECS")]
    max_backoff: Option<f64>,

    /// Upper bound for the random politeness delay between URLs (seconds)
    #[arg(long, value_name = "SECS")]
    delay: Option<f64>,

    /// Concurrent scrape lanes (1 = strictly sequential)
    #[arg(long, value_name = "N")]
    concurrency: Option<usize>,

    /// Path to a TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum ServerCommand {
    /// Clone the backend checkout and write its env file
    Install {
        /// Re-clone even if an install already exists
        #[arg(long)]
        force: bool,
    },

    /// Start the backend containers
    Up {
        /// Force an image rebuild
        #[arg(long)]
        build: bool,
    },

    /// Stop the backend containers, keeping them for a fast restart
    Stop,

    /// Stop and remove the backend containers
    Down {
        /// Also remove named volumes
        #[arg(long)]
        volumes: bool,
    },

    /// Show install, container, and health status
    Status,

    /// Show backend container logs
    Logs {
        /// Follow log output
        #[arg(short, long)]
        follow: bool,

        /// Number of trailing lines to show
        #[arg(long, value_name = "N")]
        tail: Option<u32>,
    },

    /// Check prerequisites and backend reachability
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let exit_code = match cli.command {
        Command::Scrape(args) => handle_scrape(args).await?,
        Command::Server { command } => handle_server(command).await?,
    };

    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("marksmith=info,warn"),
            1 => EnvFilter::new("marksmith=debug,info"),
            2 => EnvFilter::new("marksmith=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the scrape subcommand: resolve input, run the plan, report
async fn handle_scrape(args: ScrapeArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            match load_config_with_hash(path) {
                Ok((config, hash)) => {
                    tracing::info!("Configuration loaded successfully (hash: {})", hash);
                    config
                }
                Err(e) => {
                    tracing::error!("Failed to load configuration: {}", e);
                    return Ok(2);
                }
            }
        }
        None => Config::default(),
    };

    apply_overrides(&mut config, &args);
    if let Err(e) = validate(&config) {
        tracing::error!("Invalid settings: {}", e);
        return Ok(2);
    }

    let urls = match resolve_input(&args.input) {
        Ok(urls) => urls,
        Err(e) => {
            tracing::error!("{}", e);
            return Ok(2);
        }
    };
    let out_dir = resolve_output_dir(&args.input, args.out.as_deref());

    let mut plan = RunPlan::new(urls, out_dir, &config);
    plan.overwrite = args.overwrite;
    plan.front_matter = args.front_matter;
    plan.server_policy = args.server;
    plan.shutdown_policy = args.shutdown;
    if args.batch {
        plan.batch = true;
    }

    match run_scrape(plan, &config).await {
        Ok(summary) => {
            print_summary(&summary);
            Ok(summary.exit_code())
        }
        Err(e) => {
            tracing::error!("Scrape run failed: {}", e);
            Ok(2)
        }
    }
}

/// Applies CLI flags over the file configuration (flags win)
fn apply_overrides(config: &mut Config, args: &ScrapeArgs) {
    if let Some(api) = &args.api {
        config.backend.api_url = api.trim_end_matches('/').to_string();
    }
    if let Some(max_retries) = args.max_retries {
        config.retry.max_retries = max_retries;
    }
    if let Some(base_delay) = args.base_delay {
        config.retry.base_delay_secs = base_delay;
    }
    if let Some(max_backoff) = args.max_backoff {
        config.retry.max_backoff_secs = max_backoff;
    }
    if let Some(delay) = args.delay {
        config.run.delay_secs = delay;
    }
    if let Some(concurrency) = args.concurrency {
        config.run.concurrency = concurrency;
    }
}

/// Prints the end-of-run summary block
fn print_summary(summary: &RunSummary) {
    println!();
    if summary.interrupted {
        println!("Run interrupted before finishing.");
    }
    println!("=== Scrape Summary ===");
    println!("  Saved:     {}", summary.ok);
    println!("  Failed:    {}", summary.permanent);
    println!("  Exhausted: {}", summary.exhausted);
    println!("  Skipped:   {}", summary.skipped);

    if summary.failed() == 0 && !summary.interrupted {
        println!("\n✓ All URLs processed");
    }
}

/// Handles the server subcommand family
async fn handle_server(command: ServerCommand) -> Result<i32, Box<dyn std::error::Error>> {
    let config = Config::default();
    match run_server_command(command, &config).await {
        Ok(code) => Ok(code),
        Err(e) => {
            tracing::error!("{}", e);
            Ok(2)
        }
    }
}

async fn run_server_command(command: ServerCommand, config: &Config) -> marksmith::Result<i32> {
    let client = Arc::new(BackendClient::new(&config.backend)?);
    let mut manager = ServiceManager::new(config.server.clone(), Arc::clone(&client)).await;

    match command {
        ServerCommand::Install { force } => {
            manager.install(force).await?;
            println!(
                "✓ Backend installed at {}",
                config.server.install_dir.display()
            );
            println!("  Run `marksmith server up` to start it");
        }
        ServerCommand::Up { build } => {
            manager.up(build).await?;
            println!("Waiting for the backend to become ready...");
            let timeout = Duration::from_secs(config.server.readiness_timeout_secs);
            if manager.wait_ready(timeout).await {
                println!("✓ Backend is ready at {}", client.api_url());
            } else {
                println!(
                    "Backend started but is not answering yet; check `marksmith server logs`"
                );
            }
        }
        ServerCommand::Stop => {
            manager.stop().await?;
            println!("✓ Backend stopped");
        }
        ServerCommand::Down { volumes } => {
            manager.down(volumes).await?;
            println!("✓ Backend containers removed");
        }
        ServerCommand::Status => {
            let status = manager.status().await;
            println!("=== Backend Status ===");
            println!("  Installed:  {}", check_mark(status.installed));
            println!(
                "  Containers: {}",
                if status.containers_running {
                    "running"
                } else if status.containers_exist {
                    "stopped"
                } else {
                    "none"
                }
            );
            println!("  Healthy:    {}", check_mark(status.healthy));
            println!("  API URL:    {}", status.api_url);
            if !status.is_ready() {
                println!("\nBackend is not ready; try `marksmith server doctor`");
            }
        }
        ServerCommand::Logs { follow, tail } => {
            manager.logs(follow, tail).await?;
        }
        ServerCommand::Doctor => {
            return Ok(run_doctor(config, &manager, &client).await);
        }
    }
    Ok(0)
}

fn check_mark(ok: bool) -> &'static str {
    if ok {
        "yes"
    } else {
        "no"
    }
}

/// Runs the doctor checks and prints one line per check
///
/// Returns 1 when any check fails so scripts can gate on it.
async fn run_doctor(
    config: &Config,
    manager: &ServiceManager,
    client: &BackendClient,
) -> i32 {
    println!("=== Backend Doctor ===\n");
    let mut problems = 0;

    match probe_version("docker", &["--version"]).await {
        Some(version) => println!("✓ docker binary: {}", version),
        None => {
            println!("✗ docker binary not found on PATH");
            problems += 1;
        }
    }

    if manager.docker_available().await {
        println!("✓ docker daemon is running");
    } else {
        println!("✗ docker daemon is not responding (is Docker running?)");
        problems += 1;
    }

    match probe_version("docker", &["compose", "version"]).await {
        Some(version) => println!("✓ docker compose: {}", version),
        None => {
            println!("✗ docker compose plugin not available");
            problems += 1;
        }
    }

    match probe_version("git", &["--version"]).await {
        Some(version) => println!("✓ git binary: {}", version),
        None => {
            println!("✗ git binary not found on PATH");
            problems += 1;
        }
    }

    if manager.is_installed() {
        println!(
            "✓ backend installed at {}",
            config.server.install_dir.display()
        );
    } else {
        println!("✗ backend not installed; run `marksmith server install`");
        problems += 1;
    }

    let address = format!("{}:{}", config.server.api_host, config.server.api_port);
    let port_open = matches!(
        tokio::time::timeout(
            Duration::from_secs(2),
            tokio::net::TcpStream::connect(&address),
        )
        .await,
        Ok(Ok(_))
    );
    if client.health().await {
        println!("✓ backend is healthy at {}", client.api_url());
    } else if port_open {
        println!("✗ something is listening on {} but the health check fails", address);
        problems += 1;
    } else {
        println!("✗ nothing is listening on {}; run `marksmith server up`", address);
        problems += 1;
    }

    if problems == 0 {
        println!("\n✓ All checks passed");
        0
    } else {
        println!("\n{} problem(s) found", problems);
        1
    }
}
