//! CLI entrypoint for delegate
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use delegate_application::{
    DispatchConfig, DispatchObserver, EventLogger, NoProgress, RouteRequestUseCase, SharedRegistry,
};
use delegate_domain::{AggregatedResponse, HandlerRegistry, OverallStatus, Request};
use delegate_infrastructure::{
    ConfigLoader, FileConfig, FileOutputFormat, HandlerFactory, JsonlEventLogger,
};
use delegate_presentation::{
    Cli, ConsoleFormatter, OutputFormat, ProgressReporter, SimpleProgress,
};
use std::fs::OpenOptions;
use std::io::IsTerminal;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let _log_guard = init_logging(&cli)?;

    info!("Starting delegate");

    if cli.show_config {
        ConfigLoader::print_config_sources();
        return Ok(ExitCode::SUCCESS);
    }

    // === Configuration ===
    let config = load_config(&cli)?;
    config.validate().context("invalid configuration")?;
    ConsoleFormatter::set_color(config.output.color);

    let registry = HandlerRegistry::from_descriptors(config.descriptors())
        .context("invalid handler definition")?;

    if cli.list_handlers {
        println!("{}", ConsoleFormatter::format_handlers(registry.all()));
        return Ok(ExitCode::SUCCESS);
    }

    let Some(text) = cli.request.clone() else {
        bail!("A request is required. Use --list-handlers to see available handlers.");
    };
    let request = Request::new(text).with_domain_hints(&cli.domain);

    // === Dependency Injection ===
    let dispatch_config = dispatch_config(&cli, &config)?;

    let handlers = Arc::new(HandlerFactory::new().build(&config));
    let shared_registry = Arc::new(SharedRegistry::new(registry));
    let cancel = CancellationToken::new();

    let mut use_case = RouteRequestUseCase::new(shared_registry, handlers, dispatch_config)
        .with_cancellation(cancel.clone());
    if let Some(logger) = event_logger(&config) {
        use_case = use_case.with_event_logger(logger);
    }

    if cli.plan_only {
        let route = use_case.prepare(&request)?;
        println!(
            "{}",
            ConsoleFormatter::format_plan(&route.plan, &route.matches, route.used_fallback)
        );
        return Ok(ExitCode::SUCCESS);
    }

    // Cancel the in-flight plan on Ctrl-C
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling plan");
            signal_token.cancel();
        }
    });

    let observer: Box<dyn DispatchObserver> = if cli.quiet {
        Box::new(NoProgress)
    } else if std::io::stderr().is_terminal() {
        Box::new(ProgressReporter::new())
    } else {
        Box::new(SimpleProgress)
    };
    let response = use_case
        .execute_with_progress(&request, observer.as_ref())
        .await?;

    let output = match output_format(&cli, &config) {
        OutputFormat::Full => ConsoleFormatter::format(request.text(), &response),
        OutputFormat::Summary => ConsoleFormatter::format_summary(&response),
        OutputFormat::Json => ConsoleFormatter::format_json(&response),
    };
    println!("{}", output);

    Ok(exit_code(&response))
}

/// Initialize tracing based on verbosity, optionally writing to a file
fn init_logging(cli: &Cli) -> Result<Option<WorkerGuard>> {
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    match &cli.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(writer)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
            Ok(None)
        }
    }
}

/// Dispatch settings from the config file with CLI overrides applied
fn dispatch_config(cli: &Cli, config: &FileConfig) -> Result<DispatchConfig> {
    let mut dispatch = config.dispatch_config();
    if let Some(seconds) = cli.timeout {
        if seconds == 0 {
            bail!("--timeout must be greater than 0");
        }
        dispatch = dispatch.with_timeout_seconds(seconds);
    }
    Ok(dispatch)
}

fn load_config(cli: &Cli) -> Result<FileConfig> {
    let loaded = match (&cli.config, cli.no_config) {
        (Some(path), true) => ConfigLoader::load_file(path),
        (None, true) => Ok(ConfigLoader::load_defaults()),
        (path, false) => ConfigLoader::load(path.as_ref()),
    };
    loaded.map_err(|e| anyhow!("failed to load configuration: {}", e))
}

fn event_logger(config: &FileConfig) -> Option<Arc<dyn EventLogger>> {
    let path = config.logging.event_log.as_ref()?;
    let logger = JsonlEventLogger::new(path)?;
    info!(path = %logger.path().display(), "Routing event log enabled");
    Some(Arc::new(logger))
}

fn output_format(cli: &Cli, config: &FileConfig) -> OutputFormat {
    if let Some(format) = cli.output {
        return format;
    }
    match config.output.format {
        Some(FileOutputFormat::Full) => OutputFormat::Full,
        Some(FileOutputFormat::Json) => OutputFormat::Json,
        Some(FileOutputFormat::Summary) | None => OutputFormat::Summary,
    }
}

fn exit_code(response: &AggregatedResponse) -> ExitCode {
    if response.was_cancelled() {
        return ExitCode::from(130);
    }
    match response.status {
        OverallStatus::Success => ExitCode::SUCCESS,
        OverallStatus::Partial => ExitCode::from(2),
        OverallStatus::Failure => ExitCode::FAILURE,
    }
}
