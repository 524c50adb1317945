//! Deepsift CLI - Command-line interface for Deepsift
//!
//! Runs deep research from the terminal and exposes the tool layer for inspection

use clap::{Parser, Subcommand};
use deepsift_core::{
    init_logging, log_operation_error, log_operation_start, log_operation_success, DeepsiftConfig,
    DeepsiftError, DeepsiftResult, ErrorContext,
};
use deepsift_research::{build_research_stack, ResearchReport};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "deepsift")]
#[command(about = "Iterative multi-source deep research from the command line")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Research a question across all configured sources
    Research {
        /// The question to research
        query: String,

        /// Maximum research rounds
        #[arg(long)]
        max_depth: Option<usize>,

        /// Token budget for accumulated evidence
        #[arg(long)]
        max_tokens: Option<usize>,

        /// Memory namespace for this run
        #[arg(short, long)]
        namespace: Option<String>,

        /// Print the full research report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the tool definitions as JSON
    Tools,

    /// Invoke a single tool by name
    Tool {
        /// Tool name, as listed by `deepsift tools`
        name: String,

        /// Arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,
    },

    /// Manage configuration
    Config {
        /// Write a default configuration file (defaults to the user config dir)
        #[arg(long, value_name = "PATH", num_args = 0..=1)]
        init: Option<Option<PathBuf>>,

        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Validate current configuration
        #[arg(long)]
        validate: bool,
    },
}

#[tokio::main]
async fn main() -> DeepsiftResult<()> {
    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_ref())?;

    let mut logging_config = config.logging.clone();
    if cli.verbose {
        logging_config.level = "debug".to_string();
        logging_config.filter_directives.clear();
    }

    init_logging(&logging_config).map_err(|e| DeepsiftError::Config {
        message: format!("Failed to initialize logging: {}", e),
        source: Some(e),
        context: ErrorContext::new("cli")
            .with_operation("init_logging")
            .with_suggestion("Check the [logging] section of the configuration"),
    })?;

    info!("Starting Deepsift CLI v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Research {
            query,
            max_depth,
            max_tokens,
            namespace,
            json,
        } => {
            if let Some(max_depth) = max_depth {
                config.research.max_depth = max_depth;
            }
            if let Some(max_tokens) = max_tokens {
                config.research.max_tokens = max_tokens;
            }
            if let Some(namespace) = namespace {
                config.research.namespace = namespace;
            }
            handle_research(&query, json, &config).await?;
        }
        Commands::Tools => {
            handle_tools(&config).await?;
        }
        Commands::Tool { name, args } => {
            handle_tool(&name, &args, &config).await?;
        }
        Commands::Config {
            init,
            show,
            validate,
        } => {
            handle_config(init, show, validate, &config)?;
        }
    }

    Ok(())
}

fn load_config(config_path: Option<&PathBuf>) -> DeepsiftResult<DeepsiftConfig> {
    if let Some(path) = config_path {
        return DeepsiftConfig::from_file(path);
    }

    let default_paths = [
        Some(DeepsiftConfig::default_path()),
        dirs::home_dir().map(|d| d.join(".deepsift").join("config.toml")),
        Some(PathBuf::from("deepsift.toml")),
    ];

    for path in default_paths.iter().flatten() {
        if path.exists() {
            return DeepsiftConfig::from_file(path);
        }
    }

    Ok(DeepsiftConfig::default())
}

async fn handle_research(query: &str, json: bool, config: &DeepsiftConfig) -> DeepsiftResult<()> {
    log_operation_start!("research_command", query = query);

    let stack = build_research_stack(config).await?;
    if !json {
        println!("🔬 Researching: {}", query);
        println!(
            "📚 Sources: {}",
            stack.agent.retriever_names().join(", ")
        );
    }

    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling research");
            ctrl_c_token.cancel();
        }
    });

    let report = stack
        .agent
        .run_with(query, &config.research.namespace, &cancel)
        .await
        .map_err(|e| {
            log_operation_error!("research_command", e, query = query);
            e
        })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    log_operation_success!(
        "research_command",
        rounds = report.rounds.len(),
        duration_ms = report.duration_ms
    );
    Ok(())
}

fn print_report(report: &ResearchReport) {
    for round in &report.rounds {
        println!(
            "\n🔄 Round {}: {} sub-queries, {} new chunks, {} tokens",
            round.depth + 1,
            round.sub_queries.len(),
            round.evidence_chunks_added,
            round.tokens_after
        );
        for sub_query in &round.sub_queries {
            println!("  • {}", sub_query);
        }
    }

    println!("\n💡 **Answer:**");
    if report.answer.trim().is_empty() {
        println!("No evidence was found for this question.");
    } else {
        println!("{}", report.answer);
    }

    println!("\n📊 **Stats:**");
    println!("  • Rounds: {}", report.rounds.len());
    println!("  • Stopped: {}", report.termination);
    println!("  • Evidence tokens: {}", report.total_tokens);
    println!("  • Namespace: {}", report.namespace);
    println!("  • Total time: {}ms", report.duration_ms);
}

async fn handle_tools(config: &DeepsiftConfig) -> DeepsiftResult<()> {
    let stack = build_research_stack(config).await?;
    let definitions = stack.tools.definitions();
    println!("{}", serde_json::to_string_pretty(&definitions)?);
    Ok(())
}

async fn handle_tool(name: &str, args: &str, config: &DeepsiftConfig) -> DeepsiftResult<()> {
    let args: serde_json::Value = serde_json::from_str(args).map_err(|e| DeepsiftError::Validation {
        message: format!("Tool arguments are not valid JSON: {}", e),
        field: Some("args".to_string()),
        context: ErrorContext::new("cli")
            .with_operation("parse_tool_args")
            .with_suggestion("Pass a JSON object, e.g. --args '{\"query\": \"rust async\"}'"),
    })?;

    let stack = build_research_stack(config).await?;
    match stack.tools.invoke(name, args).await {
        Ok(output) => {
            println!("{}", output);
            Ok(())
        }
        Err(e) => {
            println!("❌ {}", e);
            Err(DeepsiftError::Internal {
                message: e.to_string(),
                source: Some(Box::new(e)),
                context: ErrorContext::new("cli").with_operation("invoke_tool"),
            })
        }
    }
}

fn handle_config(
    init: Option<Option<PathBuf>>,
    show: bool,
    validate: bool,
    config: &DeepsiftConfig,
) -> DeepsiftResult<()> {
    if let Some(path) = init {
        let path = path.unwrap_or_else(DeepsiftConfig::default_path);
        DeepsiftConfig::default().save_to_file(&path)?;
        println!("✅ Configuration initialized at: {:?}", path);
        println!("📝 Please edit the file to add your API keys and customize settings.");
    }

    if show {
        let rendered = toml::to_string_pretty(config).map_err(|e| DeepsiftError::Config {
            message: format!("Failed to render configuration: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("cli").with_operation("show_config"),
        })?;
        println!("📋 Current configuration:");
        println!("{}", rendered);
    }

    if validate {
        match config.validate() {
            Ok(()) => println!("✅ Configuration is valid"),
            Err(e) => {
                println!("❌ Configuration validation failed: {}", e);
                return Err(e);
            }
        }
    }

    Ok(())
}
