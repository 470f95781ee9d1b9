use clap::{Args, Parser, Subcommand};
use longform_tts::domain::narration::{read_input, NarrationService, NarrationServiceApi, RunReport};
use longform_tts::domain::synthesis::{EventSink, FanoutSink, TracingEventSink};
use longform_tts::error::{AppError, AppResult};
use longform_tts::infrastructure::codec::WavCodec;
use longform_tts::infrastructure::config::{Config, LogFormat, RunSettings, SessionProvider};
use longform_tts::infrastructure::events::JsonLinesEventSink;
use longform_tts::infrastructure::sessions::{
    FolderSessionFactory, OpenAiSessionFactory, PollySessionFactory, SessionFactory,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "longform-tts")]
#[command(about = "Narrate long documents one chunk at a time and merge the audio")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Synthesize every missing chunk and merge the result
    Run(RunArgs),
    /// Show which chunks are still missing, without synthesizing
    Plan(PlanArgs),
    /// Merge chunks already in the output directory
    Merge(PlanArgs),
}

#[derive(Debug, Args)]
struct Target {
    #[arg(long, short, help = "UTF-8 text file to narrate")]
    input: PathBuf,
    #[arg(long, short, default_value = "output")]
    output_dir: PathBuf,
    #[arg(long, default_value_t = false, help = "Print the result as JSON on stdout")]
    json: bool,
}

/// Per-invocation overrides of the run settings from the environment
#[derive(Debug, Args)]
struct Overrides {
    #[arg(long)]
    max_length: Option<usize>,
    #[arg(long, help = "Chunk filename template, e.g. audio_chunk_{index:04d}.wav")]
    template: Option<String>,
    #[arg(long)]
    final_name: Option<String>,
    #[arg(long)]
    delay_secs: Option<u64>,
    #[arg(long)]
    max_attempts: Option<u32>,
    #[arg(long)]
    max_restarts: Option<u32>,
    #[arg(long)]
    timeout_secs: Option<u64>,
    #[arg(long)]
    poll_interval_ms: Option<u64>,
}

impl Overrides {
    fn apply(&self, settings: &mut RunSettings) {
        if let Some(max_length) = self.max_length {
            settings.max_length = max_length;
        }
        if let Some(template) = &self.template {
            settings.filename_template = template.clone();
        }
        if let Some(final_name) = &self.final_name {
            settings.final_filename = final_name.clone();
        }
        if let Some(delay) = self.delay_secs {
            settings.inter_chunk_delay = Duration::from_secs(delay);
        }
        if let Some(max_attempts) = self.max_attempts {
            settings.max_attempts = max_attempts;
        }
        if let Some(max_restarts) = self.max_restarts {
            settings.max_restarts = max_restarts;
        }
        if let Some(timeout) = self.timeout_secs {
            settings.artifact_timeout = Duration::from_secs(timeout);
        }
        if let Some(poll) = self.poll_interval_ms {
            settings.poll_interval = Duration::from_millis(poll);
        }
    }
}

#[derive(Debug, Args)]
struct RunArgs {
    #[command(flatten)]
    target: Target,
    #[command(flatten)]
    overrides: Overrides,
    #[arg(long, help = "polly, openai or folder; overrides TTS_PROVIDER")]
    provider: Option<SessionProvider>,
    #[arg(long, help = "Also append run events as JSON lines to this file")]
    events: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct PlanArgs {
    #[command(flatten)]
    target: Target,
    #[command(flatten)]
    overrides: Overrides,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load configuration
    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            std::process::exit(AppError::from(e).exit_code());
        }
    };

    // Initialize logging
    init_logging(&config);

    if let Err(e) = execute(cli, &mut config).await {
        tracing::error!(error = %e, exit_code = e.exit_code(), "longform-tts failed");
        std::process::exit(e.exit_code());
    }
}

async fn execute(cli: Cli, config: &mut Config) -> AppResult<()> {
    match cli.command {
        Commands::Run(args) => {
            args.overrides.apply(&mut config.run);
            if let Some(provider) = args.provider {
                config.provider = provider;
            }

            let text = read_input(&args.target.input).await?;
            let service = build_service(config, args.events.as_ref())
                .await?
                .with_interrupt(interrupt_on_ctrl_c());
            let report = service.synthesize(&text, &args.target.output_dir).await?;

            report.log_summary();
            if args.target.json {
                print_json(&report)?;
            }
            outcome(&report)
        }
        Commands::Plan(args) => {
            args.overrides.apply(&mut config.run);
            let text = read_input(&args.target.input).await?;
            let service = build_service(config, None).await?;
            let summary = service.plan(&text, &args.target.output_dir)?;

            if args.target.json {
                print_json(&summary)?;
            } else {
                println!(
                    "{} chunks, {} already done, pending: {:?}",
                    summary.total,
                    summary.already_done.len(),
                    summary.pending
                );
            }
            Ok(())
        }
        Commands::Merge(args) => {
            args.overrides.apply(&mut config.run);
            let text = read_input(&args.target.input).await?;
            let service = build_service(config, None).await?;
            let path = service.merge_existing(&text, &args.target.output_dir)?;

            if args.target.json {
                print_json(&serde_json::json!({ "merged": path }))?;
            } else {
                println!("{}", path.display());
            }
            Ok(())
        }
    }
}

/// Exit status of a finished run
fn outcome(report: &RunReport) -> AppResult<()> {
    if report.is_complete() {
        return Ok(());
    }
    if report.missing.is_empty() {
        if let Some(reason) = &report.merge_error {
            return Err(AppError::Merge(reason.clone()));
        }
    }
    Err(AppError::Incomplete {
        completed: report.completed,
        expected: report.expected,
        missing: report.missing.clone(),
    })
}

/// Notified on the first Ctrl-C, so a run can close its session and report before exiting
fn interrupt_on_ctrl_c() -> Arc<Notify> {
    let interrupt = Arc::new(Notify::new());
    let notify = interrupt.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current step");
            notify.notify_one();
        }
    });
    interrupt
}

fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| AppError::Internal(e.to_string()))?;
    println!("{json}");
    Ok(())
}

async fn build_service(
    config: &Config,
    events_path: Option<&PathBuf>,
) -> AppResult<NarrationService> {
    let mut sinks: Vec<Arc<dyn EventSink>> = vec![Arc::new(TracingEventSink)];
    if let Some(path) = events_path {
        let sink = JsonLinesEventSink::create(path).map_err(|e| {
            AppError::Config(format!("cannot open event log {}: {e}", path.display()))
        })?;
        sinks.push(Arc::new(sink));
    }

    Ok(NarrationService::new(
        build_factory(config).await,
        Arc::new(WavCodec::new()),
        config.run.clone(),
        Arc::new(FanoutSink::new(sinks)),
    ))
}

async fn build_factory(config: &Config) -> Arc<dyn SessionFactory> {
    match config.provider {
        SessionProvider::Polly => {
            tracing::info!("Initializing AWS Polly client with region: {}", config.aws_region);

            let has_access_key = std::env::var("AWS_ACCESS_KEY_ID").is_ok();
            let has_secret_key = std::env::var("AWS_SECRET_ACCESS_KEY").is_ok();
            if !has_access_key || !has_secret_key {
                tracing::warn!("AWS credentials not found in environment variables. Will attempt to use other credential providers (instance metadata, etc.)");
            }

            let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
                .region(aws_config::Region::new(config.aws_region.clone()))
                .load()
                .await;
            let polly_client = Arc::new(aws_sdk_polly::Client::new(&aws_config));

            Arc::new(PollySessionFactory::new(polly_client, config.polly_voice.clone()))
        }
        SessionProvider::OpenAi => {
            tracing::info!(model = %config.openai_model, "Initializing OpenAI client");
            Arc::new(OpenAiSessionFactory::new(
                Arc::new(async_openai::Client::new()),
                config.openai_model.clone(),
                config.openai_voice.clone(),
            ))
        }
        SessionProvider::Folder => {
            tracing::info!(
                request = %config.folder_request_path.display(),
                downloads = %config.folder_download_dir.display(),
                "Using folder driver session"
            );
            Arc::new(FolderSessionFactory::new(
                config.folder_request_path.clone(),
                config.folder_download_dir.clone(),
                config.run.poll_interval,
            ))
        }
    }
}

fn init_logging(config: &Config) {
    if config.log_format == LogFormat::Json {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "longform_tts=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "longform_tts=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
            .init();
    }
}
