mod config;
mod output;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;

use contentloops_core::RefinementController;
use contentloops_docs::{CorpusRetriever, MarkdownExporter};
use contentloops_llm::{BackendConfig, LlmBackend, OllamaBackend, RetryPolicy};
use contentloops_logging::{init_tracing, LogFormat, Logger};
use contentloops_writer::{Language, RunRequest, RunRequestBuilder, Topic};

use crate::config::ProjectConfig;

/// Request used by `--demo`
const DEMO_REQUEST: &str = "☀️ 5 dấu hiệu có thể là ung thư dạ dày giai đoạn đầu";

/// Pass threshold when neither the command line nor the config sets one
const DEFAULT_PASS_THRESHOLD: f64 = 0.8;

/// Export directory when neither the command line nor the config sets one
const DEFAULT_OUTPUT_DIR: &str = "outputs";

#[derive(Parser, Debug)]
#[command(
    name = "contentloops",
    about = "Plan, generate and evaluate marketing posts with a local language model",
    version,
    author
)]
struct Cli {
    /// What the post should be about
    request: Option<String>,

    /// Read the request from a file instead
    #[arg(long, conflicts_with = "request")]
    prompt_file: Option<PathBuf>,

    /// Run the built-in demo request
    #[arg(long, conflicts_with_all = ["request", "prompt_file"])]
    demo: bool,

    /// Output language (vietnamese, english)
    #[arg(short, long)]
    language: Option<Language>,

    /// Topic category
    #[arg(short, long)]
    topic: Option<Topic>,

    /// Target audience
    #[arg(long)]
    audience: Option<String>,

    /// Hashtag to include (repeatable)
    #[arg(long = "hashtag")]
    hashtags: Vec<String>,

    /// Criterion weight as name=weight (repeatable, replaces the defaults)
    #[arg(long = "criterion", value_parser = parse_criterion)]
    criteria: Vec<(String, f64)>,

    /// Extra instruction for the evaluator
    #[arg(long)]
    focus: Option<String>,

    /// Maximum iterations
    #[arg(short = 'n', long)]
    max_iterations: Option<usize>,

    /// Pass threshold between 0 and 1
    #[arg(long)]
    threshold: Option<f64>,

    /// Retrieve context from --context-dir
    #[arg(long, conflicts_with = "no_search")]
    search: bool,

    /// Skip context retrieval
    #[arg(long)]
    no_search: bool,

    /// Directory of .md/.txt reference documents
    #[arg(long)]
    context_dir: Option<PathBuf>,

    /// Directory for exported posts
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Do not write the final post to a file
    #[arg(long)]
    no_export: bool,

    /// Ollama model
    #[arg(short, long)]
    model: Option<String>,

    /// Ollama base URL
    #[arg(long)]
    ollama_url: Option<String>,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty")]
    log_format: LogFormatChoice,

    /// Also append JSON log lines to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Show debug diagnostics
    #[arg(short, long)]
    verbose: bool,

    /// Output final result as JSON
    #[arg(long)]
    json_output: bool,

    /// Dry run: show the resolved settings without calling the model
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatChoice {
    Pretty,
    Json,
    Compact,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Pretty => LogFormat::Pretty,
            LogFormatChoice::Json => LogFormat::Json,
            LogFormatChoice::Compact => LogFormat::Compact,
        }
    }
}

fn parse_criterion(s: &str) -> Result<(String, f64), String> {
    let (name, weight) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=weight, got '{}'", s))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing criterion name in '{}'", s));
    }
    let weight = weight
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid weight in '{}': {}", s, e))?;
    Ok((name.to_string(), weight))
}

/// Command line merged over `contentloops.toml` merged over built-in defaults
#[derive(Debug)]
struct Settings {
    request: String,
    language: Language,
    topic: Topic,
    audience: Option<String>,
    hashtags: Vec<String>,
    criteria: BTreeMap<String, f64>,
    focus: Option<String>,
    max_iterations: usize,
    pass_threshold: f64,
    enable_search: bool,
    context_dir: Option<PathBuf>,
    /// `None` when export is disabled
    output_dir: Option<PathBuf>,
    backend: BackendConfig,
    retry: RetryPolicy,
}

impl Settings {
    fn resolve(cli: &Cli, config: &ProjectConfig, working_dir: &Path) -> Result<Self> {
        let request = get_request(cli, working_dir)?;
        let run = &config.run;

        let language = match (cli.language, &run.language) {
            (Some(language), _) => language,
            (None, Some(name)) => name
                .parse::<Language>()
                .context("Invalid [run].language")?,
            (None, None) => Language::default(),
        };
        let topic = match (cli.topic, &run.topic) {
            (Some(topic), _) => topic,
            (None, Some(name)) => name
                .parse::<Topic>()
                .context("Invalid [run].topic")?,
            (None, None) if cli.demo => Topic::DiseaseWarning,
            (None, None) => Topic::default(),
        };

        let criteria = if cli.criteria.is_empty() {
            config.criteria.clone()
        } else {
            cli.criteria.iter().cloned().collect()
        };

        let hashtags = if cli.hashtags.is_empty() {
            run.hashtags.clone().unwrap_or_default()
        } else {
            cli.hashtags.clone()
        };

        let enable_search = if cli.no_search {
            false
        } else if cli.search {
            true
        } else {
            run.enable_search.unwrap_or(true)
        };

        let output_dir = if cli.no_export {
            None
        } else {
            let dir = cli
                .output_dir
                .clone()
                .or_else(|| run.output_dir.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
            Some(working_dir.join(dir))
        };

        let context_dir = cli
            .context_dir
            .clone()
            .or_else(|| run.context_dir.clone())
            .map(|dir| working_dir.join(dir));

        let mut backend = BackendConfig::default();
        if let Some(url) = cli.ollama_url.clone().or_else(|| config.ollama_url.clone()) {
            backend = backend.with_base_url(url);
        }
        if let Some(model) = cli.model.clone().or_else(|| config.model.clone()) {
            backend = backend.with_model(model);
        }
        if let Some(temperature) = config.backend.temperature {
            backend = backend.with_temperature(temperature);
        }
        if let Some(secs) = config.backend.timeout_secs {
            backend = backend.with_timeout(Duration::from_secs(secs));
        }

        let default_retry = RetryPolicy::default();
        let retry = RetryPolicy::new(
            config
                .backend
                .max_retries
                .unwrap_or(default_retry.max_retries()),
            config
                .backend
                .retry_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(default_retry.base_delay()),
        );

        Ok(Self {
            request,
            language,
            topic,
            audience: cli.audience.clone().or_else(|| run.target_audience.clone()),
            hashtags,
            criteria,
            focus: cli.focus.clone().or_else(|| run.evaluation_focus.clone()),
            max_iterations: cli
                .max_iterations
                .or(run.max_iterations)
                .unwrap_or(RunRequest::DEFAULT_MAX_ITERATIONS),
            pass_threshold: cli
                .threshold
                .or(run.pass_threshold)
                .unwrap_or(DEFAULT_PASS_THRESHOLD),
            enable_search,
            context_dir,
            output_dir,
            backend,
            retry,
        })
    }

    fn request_builder(&self) -> RunRequestBuilder {
        let mut builder = RunRequest::builder(self.request.clone())
            .language(self.language)
            .topic(self.topic)
            .hashtags(self.hashtags.clone())
            .max_iterations(self.max_iterations)
            .pass_threshold(self.pass_threshold)
            .enable_search(self.enable_search);
        if let Some(audience) = &self.audience {
            builder = builder.target_audience(audience.clone());
        }
        if let Some(focus) = &self.focus {
            builder = builder.evaluation_focus(focus.clone());
        }
        if !self.criteria.is_empty() {
            builder = builder.criteria(self.criteria.clone());
        }
        builder
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_format: LogFormat = cli.log_format.into();
    init_tracing(if cli.verbose { "debug" } else { "warn" }, log_format);

    let working_dir = std::env::current_dir().context("Failed to get current directory")?;
    let config = ProjectConfig::load(&working_dir)?.unwrap_or_default();
    let settings = Settings::resolve(&cli, &config, &working_dir)?;
    let request = settings
        .request_builder()
        .build()
        .context("Invalid run request")?;

    if cli.dry_run {
        print_dry_run(&settings, &request);
        return Ok(());
    }

    let backend = OllamaBackend::new(settings.backend.clone())
        .context("Failed to create Ollama client")?;
    if !backend.is_available().await {
        anyhow::bail!(
            "Ollama is not reachable at {}. Start it with `ollama serve` and pull '{}'.",
            settings.backend.base_url,
            backend.model()
        );
    }

    let retriever = match &settings.context_dir {
        Some(dir) if request.enable_search() => match CorpusRetriever::load(dir) {
            Ok(retriever) => Some(retriever),
            Err(e) => {
                eprintln!(
                    "{} Could not load context from {}: {}",
                    "⚠".bright_yellow(),
                    dir.display(),
                    e
                );
                None
            }
        },
        _ => None,
    };
    let exporter = settings.output_dir.clone().map(MarkdownExporter::new);

    let logger = match &cli.log_file {
        Some(path) => Logger::with_file(log_format, path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?,
        None => Logger::new(log_format),
    };

    let mut controller = RefinementController::new(&backend, &backend, Arc::new(logger))
        .with_retry_policy(settings.retry);
    if let Some(retriever) = &retriever {
        controller = controller.with_retriever(retriever);
    }
    if let Some(exporter) = &exporter {
        controller = controller.with_exporter(exporter);
    }

    let outcome = controller.run(&request).await;

    if cli.json_output {
        let json = serde_json::to_string_pretty(&outcome)?;
        println!("{}", json);
    } else {
        output::print_outcome(&outcome);
    }

    std::process::exit(outcome.exit_code());
}

fn get_request(cli: &Cli, working_dir: &Path) -> Result<String> {
    if cli.demo {
        return Ok(DEMO_REQUEST.to_string());
    }
    if let Some(ref request) = cli.request {
        return Ok(request.clone());
    }
    if let Some(ref prompt_file) = cli.prompt_file {
        let path = if prompt_file.is_absolute() {
            prompt_file.clone()
        } else {
            working_dir.join(prompt_file)
        };
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read prompt file {}", path.display()))?;
        return Ok(content.trim().to_string());
    }
    anyhow::bail!("No request provided. Pass REQUEST, --prompt-file or --demo")
}

fn print_dry_run(settings: &Settings, request: &RunRequest) {
    let preview: String = request.user_request().chars().take(100).collect();
    println!("=== Dry Run ===");
    println!("Request: {}", preview);
    println!("Language: {}", request.language());
    println!("Topic: {} (post type: {})", request.topic(), request.post_type());
    println!(
        "Audience: {}",
        request.target_audience().unwrap_or("general readers")
    );
    if !request.hashtags().is_empty() {
        println!("Hashtags: {}", request.hashtags().join(", "));
    }
    if let Some(criteria) = request.criteria() {
        let rendered: Vec<String> = criteria
            .iter()
            .map(|(name, weight)| format!("{}={}", name, weight))
            .collect();
        println!("Criteria: {}", rendered.join(", "));
    } else {
        println!("Criteria: defaults");
    }
    if let Some(focus) = request.evaluation_focus() {
        println!("Focus: {}", focus);
    }
    println!("Max iterations: {}", request.max_iterations());
    println!("Pass threshold: {:.2}", request.pass_threshold());
    println!(
        "Search: {}",
        match (&settings.context_dir, request.enable_search()) {
            (Some(dir), true) => format!("on ({})", dir.display()),
            (None, true) => "on (no context directory)".to_string(),
            (_, false) => "off".to_string(),
        }
    );
    match &settings.output_dir {
        Some(dir) => println!("Export: {}", dir.display()),
        None => println!("Export: disabled"),
    }
    println!(
        "Model: {} at {}",
        settings.backend.model, settings.backend.base_url
    );
    println!(
        "Retries: {} (base delay {}ms)",
        settings.retry.max_retries(),
        settings.retry.base_delay().as_millis()
    );
}
