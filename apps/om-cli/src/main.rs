use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use om_app::{
    AppResult, OrchestratorConfig, RunProgressEvent, SimulationOrchestrator, SimulationResponse,
    SimulationResult, query,
};
use om_core::{SimulationRequest, extract_model_name};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "om-cli")]
#[command(about = "omsim CLI - run Modelica models through OpenModelica", long_about = None)]
struct Cli {
    /// Orchestrator config file (YAML); environment variables override it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate a Modelica source file
    Simulate {
        /// Path to the .mo file
        file: PathBuf,
        /// Model class to simulate (defaults to the first `model` in the file)
        #[arg(long)]
        model: Option<String>,
        /// Print the JSON response instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// Report whether the engine is installed and usable
    Health {
        #[arg(long)]
        json: bool,
    },
    /// List archived runs
    Runs {
        /// Only runs of this model
        model: Option<String>,
    },
    /// Show details of an archived run
    ShowRun {
        /// Run ID to display
        run_id: String,
    },
    /// Export one variable of an archived run as CSV
    ExportSeries {
        /// Run ID
        run_id: String,
        /// Variable name as it appears in the result header
        variable: String,
        /// Output CSV file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// `Ok(false)` when the command ran but the simulation or engine failed.
async fn run(cli: Cli) -> AppResult<bool> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Simulate { file, model, json } => {
            cmd_simulate(&config, &file, model.as_deref(), json).await
        }
        Commands::Health { json } => cmd_health(&config, json).await,
        Commands::Runs { model } => cmd_runs(&config, model.as_deref()).map(|_| true),
        Commands::ShowRun { run_id } => cmd_show_run(&config, &run_id).map(|_| true),
        Commands::ExportSeries {
            run_id,
            variable,
            output,
        } => cmd_export_series(&config, &run_id, &variable, output.as_deref()).map(|_| true),
    }
}

fn load_config(path: Option<&Path>) -> AppResult<OrchestratorConfig> {
    let config = match path {
        Some(path) => {
            debug!(path = %path.display(), "loading config file");
            OrchestratorConfig::load(path)?
        }
        None => OrchestratorConfig::default(),
    };
    config.with_env_overrides()
}

async fn cmd_simulate(
    config: &OrchestratorConfig,
    file: &Path,
    model: Option<&str>,
    json: bool,
) -> AppResult<bool> {
    let source = std::fs::read_to_string(file)?;
    let model = match model {
        Some(name) => name.to_string(),
        None => extract_model_name(&source)?.to_string(),
    };
    let request = SimulationRequest::new(source, &model)?;
    let orch = SimulationOrchestrator::from_config(config)?;

    if json {
        let outcome = orch.simulate(&request).await;
        let response = SimulationResponse::from_outcome(&outcome);
        print_json(&response)?;
        return Ok(matches!(outcome, Ok(ref r) if r.is_success()));
    }

    eprintln!("Simulating model: {}", model);
    let mut last_emit = Instant::now();
    let mut last_stage = None;
    let result = orch
        .simulate_with_progress(
            &request,
            Some(&mut |event: RunProgressEvent| {
                let emit_now =
                    last_stage != Some(event.stage) || last_emit.elapsed().as_millis() >= 100;
                if emit_now {
                    render_cli_progress(&event);
                    last_stage = Some(event.stage);
                    last_emit = Instant::now();
                }
            }),
        )
        .await;
    clear_progress_line();
    let result = result?;

    match &result {
        SimulationResult::Success {
            run_id,
            artifact,
            performance,
            archived,
            ..
        } => {
            println!("✓ Simulation completed: {}", run_id);
            println!("  Samples:   {}", artifact.sample_count());
            if let Some((t0, t1)) = artifact.time_range() {
                println!("  Time:      {:.3} - {:.3} s", t0, t1);
            }
            println!("  Variables: {}", artifact.variables().join(", "));
            if let Some(perf) = performance {
                if let Some(t) = perf.simulation_time_s {
                    println!("  Engine simulation time: {:.3}s", t);
                }
                if let Some(t) = perf.total_time_s {
                    println!("  Engine total time:      {:.3}s", t);
                }
            }
            println!("  Archived:  {}", archived.artifact_path.display());
            Ok(true)
        }
        SimulationResult::Failure { run_id, error } => {
            println!("✗ Simulation failed ({})", error.category);
            if let Some(run_id) = run_id {
                println!("  Run:     {}", run_id);
            }
            println!("  Message: {}", error.message);
            if !error.raw_output.trim().is_empty() {
                println!("\nEngine output:\n{}", error.raw_output.trim_end());
            }
            Ok(false)
        }
    }
}

async fn cmd_health(config: &OrchestratorConfig, json: bool) -> AppResult<bool> {
    let orch = SimulationOrchestrator::from_config(config)?;
    let health = orch.health().await;

    if json {
        print_json(&health)?;
        return Ok(health.is_available);
    }

    let mark = if health.is_available { "✓" } else { "✗" };
    println!("{} {}", mark, health.status_message);
    if let Some(path) = &health.installation_path {
        println!("  Installation: {}", path);
    }
    if let Some(version) = &health.version {
        println!("  Version:      {}", version);
    }
    if let Some(dirs) = &health.details.directories {
        println!("  bin: {} (exists: {})", dirs.bin.path, dirs.bin.exists);
        println!("  lib: {} (exists: {})", dirs.lib.path, dirs.lib.exists);
    }
    if let Some(err) = &health.details.check_error {
        println!("  Check error:  {}", err);
    }
    Ok(health.is_available)
}

fn clear_progress_line() {
    eprint!("\r{}\r", " ".repeat(100));
    let _ = io::stderr().flush();
}

fn render_cli_progress(event: &RunProgressEvent) {
    let spinner = ['|', '/', '-', '\\'];
    let spin_idx = ((event.elapsed_wall_s * 10.0) as usize) % spinner.len();
    let mut line = format!(
        "\r{} {}  elapsed={:.2}s",
        spinner[spin_idx],
        event.stage.label(),
        event.elapsed_wall_s
    );
    if let Some(msg) = &event.message {
        line.push_str(&format!("  {}", msg));
    }
    eprint!("{}", line);
    let _ = io::stderr().flush();
}

fn cmd_runs(config: &OrchestratorConfig, model: Option<&str>) -> AppResult<()> {
    let store = config.archive_store()?;
    let runs = query::list_runs(&store, model)?;

    if runs.is_empty() {
        match model {
            Some(model) => println!("No archived runs found for model: {}", model),
            None => println!("No archived runs found"),
        }
    } else {
        println!("Archived runs:");
        for manifest in runs {
            println!(
                "  {} ({}, {} samples, {})",
                manifest.run_id, manifest.model, manifest.sample_count, manifest.timestamp
            );
        }
    }
    Ok(())
}

fn cmd_show_run(config: &OrchestratorConfig, run_id: &str) -> AppResult<()> {
    println!("Loading run: {}", run_id);

    let store = config.archive_store()?;
    let summary = query::get_run_summary(&store, run_id)?;

    println!("\nRun Summary:");
    println!("  Model: {}", summary.model);
    println!("  Archived at: {}", summary.timestamp);
    println!("  Samples: {}", summary.sample_count);
    println!(
        "  Time range: {:.3} - {:.3} s",
        summary.time_range.0, summary.time_range.1
    );
    println!(
        "  Setup: start={} stop={} intervals={} tolerance={:e} method={}",
        summary.setup.start_time,
        summary.setup.stop_time,
        summary.setup.number_of_intervals,
        summary.setup.tolerance,
        summary.setup.method
    );
    if let Some(perf) = &summary.performance {
        if let Some(t) = perf.total_time_s {
            println!("  Engine total time: {:.3}s", t);
        }
    }
    println!("  SHA-256: {}", summary.artifact_sha256);

    println!("\nVariables:");
    for name in &summary.variables {
        println!("  {}", name);
    }

    Ok(())
}

fn cmd_export_series(
    config: &OrchestratorConfig,
    run_id: &str,
    variable: &str,
    output: Option<&Path>,
) -> AppResult<()> {
    let store = config.archive_store()?;
    let csv = query::export_series_csv(&store, run_id, variable)?;

    if let Some(path) = output {
        std::fs::write(path, &csv)?;
        println!(
            "✓ Exported {} data points to {}",
            csv.lines().count().saturating_sub(1),
            path.display()
        );
    } else {
        print!("{}", csv);
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
