//! Planrun - plan-then-execute coding agent for your terminal.
//!
//! Turns a request into a dependency-ordered plan and carries it out against
//! the configured completion backend.

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use planrun::core::Config;

/// Plan-then-execute coding agent for your terminal
#[derive(Parser)]
#[command(name = "planrun")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Dry run mode - record file changes without writing them
    #[arg(long, global = true)]
    dry_run: bool,

    /// Workspace root (defaults to the configured root or the current directory)
    #[arg(short, long, global = true)]
    workspace: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan a request and execute it
    Run {
        /// The request to carry out
        request: String,

        /// Print the execution summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Plan a request without executing it
    Plan {
        /// The request to plan
        request: String,

        /// Print the plan as JSON instead of markdown
        #[arg(long)]
        json: bool,
    },

    /// Show configuration
    Config {
        /// Show config file path
        #[arg(long)]
        path: bool,

        /// Write the default configuration to the global config file
        #[arg(long, conflicts_with = "path")]
        init: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Run { ref request, json } => cmd_run(&cli, request, json)?,
        Commands::Plan { ref request, json } => cmd_plan(&cli, request, json)?,
        Commands::Config { path, init } => cmd_config(path, init)?,
        Commands::Completions { shell } => cmd_completions(shell),
    }

    Ok(())
}

/// Load the configuration with command-line overrides applied.
#[cfg_attr(not(feature = "ai"), allow(dead_code))]
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load()?;
    if cli.dry_run {
        config.general.dry_run = true;
    }
    if let Some(ref root) = cli.workspace {
        config.general.workspace_root = Some(root.clone());
    }
    Ok(config)
}

/// Plan and execute a request.
#[cfg(feature = "ai")]
fn cmd_run(cli: &Cli, request: &str, json: bool) -> Result<()> {
    use std::sync::Arc;

    use planrun::workflow::Interrupt;

    let config = load_config(cli)?;

    // Ctrl+C before execution starts cancels the request; afterwards it exits
    let interrupt = Arc::new(Interrupt::new());
    let handler = Arc::clone(&interrupt);
    ctrlc::set_handler(move || {
        if handler.signal() {
            eprintln!("\nInterrupted");
            std::process::exit(130);
        }
    })?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let engine = build_engine(&config).await?.with_cancel_check(interrupt.cancel_check());

        if json {
            if interrupt.begin() {
                return Err(anyhow::Error::new(planrun::WorkflowError::Cancelled));
            }
            let mut plan = engine.synthesize(request).await?;
            let summary = engine.execute_plan(&mut plan).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            let summary = engine.process_request(request).await;
            println!("{summary}");
        }

        Ok(())
    })
}

#[cfg(not(feature = "ai"))]
fn cmd_run(_cli: &Cli, _request: &str, _json: bool) -> Result<()> {
    anyhow::bail!("Planrun was built without the `ai` feature; no completion backend is available")
}

/// Plan a request and print the plan.
#[cfg(feature = "ai")]
fn cmd_plan(cli: &Cli, request: &str, json: bool) -> Result<()> {
    let config = load_config(cli)?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let engine = build_engine(&config).await?;
        let plan = engine.synthesize(request).await?;

        if json {
            println!("{}", serde_json::to_string_pretty(&plan)?);
        } else {
            println!("{}", plan.to_markdown());
        }

        Ok(())
    })
}

#[cfg(not(feature = "ai"))]
fn cmd_plan(_cli: &Cli, _request: &str, _json: bool) -> Result<()> {
    anyhow::bail!("Planrun was built without the `ai` feature; no completion backend is available")
}

/// Wire the engine to the configured provider chain and workspace.
#[cfg(feature = "ai")]
async fn build_engine(config: &Config) -> Result<planrun::PlanEngine> {
    use std::sync::Arc;

    use planrun::{AIManager, FileBlockApplier, LocalWorkspace, PlanEngine, Workspace};

    let ai = AIManager::from_config(&config.ai).await;
    if !ai.has_providers() {
        anyhow::bail!(
            "No AI provider available.\n\
             Set ANTHROPIC_API_KEY for Claude, or run Ollama locally."
        );
    }
    tracing::info!(provider = ai.active_provider().unwrap_or("none"), "Using AI provider");

    let workspace = match config.general.workspace_root {
        Some(ref root) => LocalWorkspace::new(root),
        None => LocalWorkspace::from_current_dir()?,
    };
    let operations =
        FileBlockApplier::new(workspace.root()).with_dry_run(config.general.dry_run);

    Ok(PlanEngine::new(Arc::new(ai), Arc::new(workspace), Arc::new(operations))
        .with_config(config.executor_config()))
}

/// Show configuration.
fn cmd_config(show_path: bool, init: bool) -> Result<()> {
    if show_path {
        if let Some(path) = Config::global_config_path() {
            println!("{}", path.display());
        }
        return Ok(());
    }

    if init {
        if let Some(path) = Config::global_config_path().filter(|p| p.exists()) {
            anyhow::bail!("Config file already exists: {}", path.display());
        }
        let path = Config::default().save()?;
        println!("Wrote default configuration to {}", path.display());
        return Ok(());
    }

    let config = Config::load()?;
    let toml = toml::to_string_pretty(&config)?;
    println!("{toml}");

    Ok(())
}

/// Generate shell completions.
fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "planrun", &mut io::stdout());
}
