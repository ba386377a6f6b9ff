use anyhow::{Context, Result};
use course_runner::cli::commands::{BatchCommand, HistoryCommand, RunCommand, ValidateCommand};
use course_runner::cli::output::*;
use course_runner::cli::terminal_output::{print_separator, TerminalOutputCallback};
use course_runner::cli::{Cli, Command};
use course_runner::core::config::HarnessConfig;
use course_runner::core::{RunOutcome, EXIT_INVOCATION_ERROR, EXIT_SUCCESS};
use course_runner::execution::{
    read_course_ids, BatchRunner, Harness, HarnessEvent, HarnessSettings, RunReport,
};
use course_runner::persistence::{HistoryBackend, InMemoryHistory, RunRecord};
use course_runner::pipeline::{OutputCallback, PipelineCommand, SubprocessPipeline};
use indicatif::ProgressBar;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::from_args();

    // Initialize logging
    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("{} {:#}", WARN, e);
    }

    // Execute command
    let result = match &cli.command {
        Command::Run(cmd) => run_course(cmd, &cli).await,
        Command::Batch(cmd) => run_batch(cmd, &cli).await,
        Command::Validate(cmd) => validate_config(cmd, &cli),
        Command::History(cmd) => show_history(cmd).await,
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{:#}", e);
            eprintln!("{} {:#}", CROSS, e);
            ExitCode::from(EXIT_INVOCATION_ERROR)
        }
    }
}

fn init_logging(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("course_runner={}", default_level)));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")
}

fn load_config(cli: &Cli) -> Result<HarnessConfig> {
    match &cli.config {
        Some(path) => HarnessConfig::from_file(path).context("Failed to load harness config"),
        None => Ok(HarnessConfig::default()),
    }
}

fn build_harness(config: &HarnessConfig) -> Result<Harness<SubprocessPipeline>> {
    let settings = HarnessSettings::from_config(config)?;
    let pipeline = SubprocessPipeline::new(PipelineCommand::from_config(&config.pipeline));
    Ok(Harness::new(pipeline, settings))
}

/// Open the history store; the flag is false when runs are only kept in memory
async fn open_history(no_history: bool) -> (Arc<dyn HistoryBackend>, bool) {
    if no_history {
        return (Arc::new(InMemoryHistory::new()), false);
    }

    #[cfg(feature = "sqlite")]
    {
        match course_runner::persistence::SqliteHistoryStore::with_default_path().await {
            Ok(store) => return (Arc::new(store), true),
            Err(e) => warn!("Run history unavailable, keeping it in memory: {:#}", e),
        }
    }

    (Arc::new(InMemoryHistory::new()), false)
}

/// History is best effort: failures are logged and never change the exit code
async fn save_history(store: &dyn HistoryBackend, reports: &[RunReport]) {
    for report in reports {
        if let Err(e) = store.save_run(&RunRecord::from_report(report)).await {
            warn!("Failed to save run {} to history: {:#}", report.run_id, e);
        }
    }
}

async fn run_course(cmd: &RunCommand, cli: &Cli) -> Result<u8> {
    let config = load_config(cli)?;
    let mut harness = build_harness(&config)?;

    // Set up event handler for console output
    let quiet = cli.quiet || cmd.json;
    let terminal = if cmd.json {
        TerminalOutputCallback::new().stderr_only()
    } else {
        TerminalOutputCallback::new()
    };
    harness.add_event_handler(move |event| {
        if let HarnessEvent::PipelineOutput { line, .. } = event {
            terminal.on_line(line);
        } else if !quiet {
            if let Some(text) = format_harness_event(event) {
                println!("{}", text);
            }
        }
    });

    let report = harness.run(&cmd.invocation()).await;

    if let RunOutcome::Failure { message, .. } = &report.outcome {
        eprintln!("{} {}", CROSS, style(message).red());
    }

    let (store, persistent) = open_history(cmd.no_history).await;
    save_history(store.as_ref(), std::slice::from_ref(&report)).await;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if !cli.quiet && persistent {
        println!(
            "{} Run saved to history (ID: {})",
            INFO,
            style(report.run_id.short()).dim()
        );
    }

    Ok(report.exit_code())
}

async fn run_batch(cmd: &BatchCommand, cli: &Cli) -> Result<u8> {
    let config = load_config(cli)?;
    let course_ids = read_course_ids(&cmd.file)?;
    if course_ids.is_empty() {
        eprintln!(
            "{} No course ids found in {}",
            CROSS,
            cmd.file.display()
        );
        return Ok(EXIT_INVOCATION_ERROR);
    }

    let mut harness = build_harness(&config)?;
    let quiet = cli.quiet || cmd.json;
    let progress = if quiet {
        ProgressBar::hidden()
    } else {
        create_progress_bar(course_ids.len())
    };

    let bar = progress.clone();
    let json = cmd.json;
    harness.add_event_handler(move |event| match event {
        HarnessEvent::PipelineOutput {
            course_id, line, ..
        } => {
            let mut terminal = TerminalOutputCallback::with_prefix(course_id.to_string());
            if json {
                terminal = terminal.stderr_only();
            }
            bar.suspend(|| terminal.on_line(line));
        }
        HarnessEvent::RunStarted { course_id, .. } => {
            bar.set_message(course_id.to_string());
        }
        HarnessEvent::RunFinished {
            course_id, outcome, ..
        } => {
            bar.inc(1);
            if !outcome.is_success() {
                let course = course_id
                    .as_ref()
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "<no course>".to_string());
                bar.println(format_outcome(&course, outcome));
            }
        }
        HarnessEvent::RunSkipped { .. } => {}
    });

    let runner = BatchRunner::new(&harness, cmd.strategy());
    let report = runner.run(&course_ids, &cmd.template()).await;
    progress.finish_and_clear();

    let (store, _) = open_history(cmd.no_history).await;
    save_history(store.as_ref(), &report.runs).await;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if !cli.quiet {
        print_separator();
        println!("{}", format_batch_summary(&report));
    }

    Ok(report.exit_code())
}

fn validate_config(cmd: &ValidateCommand, cli: &Cli) -> Result<u8> {
    if !cmd.json {
        println!("{} Validating configuration...", INFO);
    }

    let result = load_config(cli).and_then(|config| {
        let settings = HarnessSettings::from_config(&config)?;
        Ok((config, settings))
    });

    match result {
        Ok((config, _)) if cmd.json => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(EXIT_SUCCESS)
        }
        Ok((config, settings)) => {
            println!("{} Configuration is valid!", CHECK);
            println!("  Program: {}", style(&config.pipeline.program).bold());
            println!("  Args: {}", style(config.pipeline.args.join(" ")).cyan());
            println!("  Data root: {}", style(&config.data_root).cyan());
            println!("  Success markers: {}", style(config.success_flags).cyan());
            println!("  Calendar courses: {}", style(settings.calendar.len()).cyan());
            if let Some(secs) = config.pipeline.timeout_secs {
                println!(
                    "  Timeout: {}",
                    style(format_duration(std::time::Duration::from_secs(secs))).cyan()
                );
            }
            Ok(EXIT_SUCCESS)
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(format!("{:#}", e)).red());
            Ok(EXIT_INVOCATION_ERROR)
        }
    }
}

#[cfg(feature = "sqlite")]
async fn show_history(cmd: &HistoryCommand) -> Result<u8> {
    let store = course_runner::persistence::SqliteHistoryStore::with_default_path().await?;

    // If specific run ID is requested
    if let Some(run_id) = &cmd.run_id {
        let run_id = uuid::Uuid::parse_str(run_id).context("Invalid run ID format")?;
        match store.load_run(run_id).await? {
            Some(record) => print_run_details(&record)?,
            None => println!("{} Run not found", WARN),
        }
        return Ok(EXIT_SUCCESS);
    }

    let mut runs = match &cmd.course {
        Some(course) => store.list_runs(course).await?,
        None => store.recent_runs(cmd.limit).await?,
    };
    runs.truncate(cmd.limit);

    if cmd.json {
        let data = serde_json::json!({ "runs": runs });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(EXIT_SUCCESS);
    }

    if runs.is_empty() {
        println!("{} No runs found", INFO);
        return Ok(EXIT_SUCCESS);
    }

    println!("{} Run history (showing latest {}):", INFO, runs.len());
    for record in &runs {
        println!("  {}", format_run_record(record));
    }

    Ok(EXIT_SUCCESS)
}

#[cfg(not(feature = "sqlite"))]
async fn show_history(_cmd: &HistoryCommand) -> Result<u8> {
    anyhow::bail!("run history requires the `sqlite` feature")
}

#[cfg(feature = "sqlite")]
fn print_run_details(record: &RunRecord) -> Result<()> {
    println!("{} Run Details", INFO);
    println!("  ID: {}", style(record.run_id).cyan());
    println!("  Course: {}", style(&record.course_id).bold());
    println!("  Status: {}", format_status(record.status));
    println!("  Exit code: {}", record.exit_code);
    if let Some(week) = record.week {
        println!("  Week: {}", style(week).cyan());
    }
    println!("  Started: {}", style(record.started_at.to_rfc3339()).dim());
    println!("  Finished: {}", style(record.finished_at.to_rfc3339()).dim());
    println!("  Duration: {}", style(format_duration(record.duration())).dim());
    if let Some(error) = &record.error {
        println!("  Error:");
        for line in error.lines() {
            println!("    {}", style(line).red());
        }
    }
    Ok(())
}
