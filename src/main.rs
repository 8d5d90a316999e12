// file: src/main.rs
// description: commandline application entry point with command handling
// reference: application bootstrap and orchestration

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use news_graph::output::{speak_all, speaker_from_config};
use news_graph::utils::logging::{
    format_error, format_info, format_step, format_success, format_warning,
};
use news_graph::{
    ArticleRecord, CategoryPolicy, CollaboratorError, Config, JsonExporter, LlmClient,
    NewsPipeline, NewsReport, ProgressTracker, SearchProvider, TerminalRenderer, Validator,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "news_graph")]
#[command(version = "0.1.0")]
#[command(about = "Search, summarize and categorize news for a topic", long_about = None)]
struct Cli {
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "config/default.toml"
    )]
    config: PathBuf,

    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    color: bool,

    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, summarize and categorize news for a topic
    Run {
        /// Topic to search for
        topic: String,

        #[arg(long, value_name = "NUM")]
        max_results: Option<usize>,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        #[arg(short, long)]
        pretty: bool,

        /// Read each item aloud with the configured tts command
        #[arg(long)]
        speak: bool,

        /// Map model answers onto the configured labels
        #[arg(long)]
        coerce_categories: bool,

        #[arg(long)]
        no_progress: bool,

        /// Also write the JSON report into this directory
        #[arg(long, value_name = "DIR")]
        export: Option<PathBuf>,

        /// Print per-stage timings after the results
        #[arg(long)]
        stats: bool,
    },

    /// Compile the news pipeline and print its stage order
    Graph {
        #[arg(long)]
        json: bool,
    },

    /// Validate configuration and report whether credentials are present
    Check,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

struct RunArgs {
    topic: String,
    max_results: Option<usize>,
    format: OutputFormat,
    pretty: bool,
    speak: bool,
    coerce_categories: bool,
    no_progress: bool,
    export: Option<PathBuf>,
    stats: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    news_graph::utils::logging::init_logger(cli.color, cli.verbose);
    if !cli.color {
        colored::control::set_override(false);
    }

    info!("Loading configuration from: {}", cli.config.display());

    let config = if cli.config.exists() {
        Config::load(Some(cli.config.as_path())).context("Failed to load configuration")?
    } else {
        warn!(
            "Config file {} not found, using default configuration",
            cli.config.display()
        );
        Config::load(None).unwrap_or_else(|e| {
            warn!("Falling back to built-in defaults: {}", e);
            let mut config = Config::default_config();
            config.llm.api_key = std::env::var("GROQ_API_KEY").ok();
            config
        })
    };

    let outcome = match cli.command {
        Commands::Run {
            topic,
            max_results,
            format,
            pretty,
            speak,
            coerce_categories,
            no_progress,
            export,
            stats,
        } => {
            let args = RunArgs {
                topic,
                max_results,
                format,
                pretty,
                speak,
                coerce_categories,
                no_progress,
                export,
                stats,
            };
            cmd_run(config, args, cli.color).await
        }
        Commands::Graph { json } => cmd_graph(&config, json),
        Commands::Check => cmd_check(&config),
    };

    if let Err(e) = outcome {
        eprintln!("{}", format_error(&format!("{:#}", e)));
        std::process::exit(1);
    }

    Ok(())
}

async fn cmd_run(mut config: Config, args: RunArgs, color: bool) -> Result<()> {
    if let Some(max_results) = args.max_results {
        config.search.max_results = max_results;
    }
    if args.coerce_categories {
        config.pipeline.category_policy = CategoryPolicy::Coerce;
    }

    let topic = Validator::validate_topic(&args.topic)?;

    let mut pipeline =
        NewsPipeline::from_config(&config).context("Failed to build news pipeline")?;

    let total_stages = pipeline.plan().len();
    let tracker = if args.no_progress || args.format == OutputFormat::Json {
        Arc::new(ProgressTracker::hidden(total_stages))
    } else {
        Arc::new(ProgressTracker::with_color(total_stages, color))
    };
    pipeline = pipeline.with_observer(tracker.clone());

    let result = pipeline.run_with_stats(&topic).await;
    tracker.finish();
    info!(
        "{}/{} stages completed, {} records produced",
        tracker.completed_stages(),
        total_stages,
        tracker.records_produced()
    );

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            let notice = e.failure_notice(&topic);
            return Err(e).context(notice);
        }
    };

    let state = &report.state;
    let json_report = NewsReport::new(state, Some(&report.stats));

    match args.format {
        OutputFormat::Text => {
            let renderer = TerminalRenderer::new(config.output.preview_chars);
            print!("{}", renderer.render(state));
        }
        OutputFormat::Json => {
            println!("{}", json_report.to_json(args.pretty)?);
        }
    }

    if args.stats {
        for line in report.stats.summary_lines() {
            eprintln!("{}", format_info(&line));
        }
    }

    if let Some(dir) = args.export {
        let exporter = JsonExporter::new(&dir).context("Failed to create export directory")?;
        let path = exporter
            .export(&json_report, true)
            .context("Failed to export report")?;
        eprintln!(
            "{}",
            format_success(&format!("Report written to {}", path.display()))
        );
    }

    if args.speak || config.output.speech_enabled {
        let speaker = speaker_from_config(&config.output, args.speak);
        let queued = speak_all(speaker.as_ref(), &state.categorized);
        info!("Queued speech for {} items", queued);
        speaker.finish().await;
    }

    Ok(())
}

/// Stands in for the real collaborators when only the graph shape is needed.
struct Unwired;

#[async_trait]
impl SearchProvider for Unwired {
    async fn search(
        &self,
        _query: &str,
        _max_results: usize,
    ) -> std::result::Result<Vec<ArticleRecord>, CollaboratorError> {
        Err(CollaboratorError::search("search is not wired in graph mode"))
    }
}

#[async_trait]
impl LlmClient for Unwired {
    async fn complete(&self, _prompt: &str) -> std::result::Result<String, CollaboratorError> {
        Err(CollaboratorError::llm("llm is not wired in graph mode"))
    }
}

fn cmd_graph(config: &Config, json: bool) -> Result<()> {
    let collaborators = Arc::new(Unwired);
    let pipeline = NewsPipeline::new(config, collaborators.clone(), collaborators)
        .context("News pipeline graph is invalid")?;
    let summary = pipeline.plan().summary();

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let total = summary.order.len();
    for (index, name) in summary.order.iter().enumerate() {
        println!("{}", format_step(index + 1, total, name));
    }
    println!(
        "{}",
        format_success(&format!(
            "entry: {}, finish: {}",
            summary.entry, summary.finish
        ))
    );

    Ok(())
}

fn cmd_check(config: &Config) -> Result<()> {
    config.validate().context("Configuration is invalid")?;
    println!("{}", format_success("Configuration is valid"));

    if config.has_llm_credentials() {
        println!("{}", format_success("Groq API key present"));
    } else {
        println!(
            "{}",
            format_warning("No Groq API key: set GROQ_API_KEY or llm.api_key")
        );
    }

    println!("{}", format_info(&format!("Model: {}", config.llm.model)));
    println!("{}", format_info(&format!("LLM endpoint: {}", config.llm.endpoint)));
    println!(
        "{}",
        format_info(&format!(
            "Search: {} (max {} results, region {})",
            config.search.base_url, config.search.max_results, config.search.region
        ))
    );
    println!(
        "{}",
        format_info(&format!(
            "Categories: {} (policy {:?}, fallback {})",
            config.pipeline.categories.join(", "),
            config.pipeline.category_policy,
            config.pipeline.fallback_category
        ))
    );
    println!(
        "{}",
        format_info(&format!(
            "Record concurrency: {}",
            config.pipeline.record_concurrency
        ))
    );

    Ok(())
}
