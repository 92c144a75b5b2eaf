// Earthworks Haulage Simulator - Main Entry Point
//
// You can run it via Cargo:
//
// ```console
// $ cargo build --release
// $ ./target/release/earthworks-sim
// ```
//
// Or with custom configuration:
//
// ```console
// $ ./target/release/earthworks-sim --fleet-size 6 --crew-capacity 3 --horizon 2000 --verbose
// ```

use anyhow::{Context, Result};
use clap::Parser;
use earthworks_sim::simulation::{LoggingConfig, ReportEnvelope, Simulation, SimulationReport};
use earthworks_sim::types::{Activity, CliArgs, DurationDistribution, SimulationConfig};
use std::fs::File;
use std::io::{self, BufWriter};
use std::process;
use tracing::{error, info};

fn main() {
    // Parse CLI arguments first to check for special flags
    let args = CliArgs::parse();

    // Handle special CLI flags that don't require full initialization
    if args.print_config {
        match SimulationConfig::default().print_json() {
            Ok(json) => {
                println!("{}", json);
                return;
            }
            Err(e) => {
                eprintln!("Failed to serialize default configuration: {}", e);
                process::exit(1);
            }
        }
    }

    // Initialize logging based on CLI flags
    let logging_result = if args.debug {
        LoggingConfig::init_debug()
    } else if args.verbose {
        LoggingConfig::init_verbose()
    } else {
        LoggingConfig::new().with_level(tracing::Level::WARN).init()
    };

    if let Err(e) = logging_result {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    info!("Starting Earthworks Haulage Simulator");

    // Load configuration from CLI arguments and optional config file
    let config = match SimulationConfig::from_cli_args(args.clone()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            eprintln!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        eprintln!("Configuration validation failed: {}", e);
        process::exit(1);
    }

    info!("Configuration loaded and validated successfully");

    if args.dry_run {
        eprintln!("Configuration validation successful!");
        eprintln!("Dry run mode - simulation will not be executed.");
        print_configuration_summary(&config);
        return;
    }

    print_startup_banner(&config);

    if let Err(e) = run(config, &args) {
        error!("Simulation failed: {:#}", e);
        eprintln!("Simulation failed: {:#}", e);
        process::exit(1);
    }

    info!("Earthworks Haulage Simulator completed successfully");
}

/// Run the simulation and write every requested output
fn run(config: SimulationConfig, args: &CliArgs) -> Result<()> {
    let mut simulation =
        Simulation::new(config.clone()).context("Failed to initialize simulation")?;
    let report = simulation.run().context("Simulation run aborted")?;

    if simulation.trace().is_enabled() {
        write_trace(&simulation, args.trace_output.as_deref())?;
    }

    if let Some(path) = &args.output {
        write_report(config, &report, path)?;
        eprintln!("Report written to: {}", path);
    }

    eprintln!("{}", report.summary_text());
    Ok(())
}

/// Write the transition trace to a file or stderr
fn write_trace(simulation: &Simulation, path: Option<&str>) -> Result<()> {
    match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create trace file '{}'", path))?;
            simulation
                .trace()
                .write_to(BufWriter::new(file))
                .with_context(|| format!("Failed to write trace file '{}'", path))?;
            info!("Wrote {} trace lines to {}", simulation.trace().len(), path);
        }
        None => simulation.trace().write_to(io::stderr().lock()).context("Failed to write trace")?,
    }
    Ok(())
}

/// Write the JSON report envelope
fn write_report(config: SimulationConfig, report: &SimulationReport, path: &str) -> Result<()> {
    let envelope = ReportEnvelope::new(config, report.clone());
    envelope
        .save_to_file(path)
        .with_context(|| format!("Failed to write report to '{}'", path))?;
    info!("Report {} written to {}", envelope.run_id, path);
    Ok(())
}

/// Print startup banner and configuration summary
fn print_startup_banner(config: &SimulationConfig) {
    eprintln!("Earthworks Haulage Simulator");
    eprintln!("============================");
    eprintln!("Discrete-event model of pile forming, loading and hauling");
    eprintln!();

    print_configuration_summary(config);
}

fn describe_timing(config: &SimulationConfig, activity: Activity) -> String {
    let timing = config.timing(activity);
    if !timing.stochastic {
        return format!("fixed {:.2}", timing.fixed_value());
    }
    match timing.distribution {
        DurationDistribution::Exponential { mean } => format!("exponential, mean {:.2}", mean),
        DurationDistribution::Uniform { min, max } => format!("uniform {:.2} - {:.2}", min, max),
    }
}

/// Print configuration summary
fn print_configuration_summary(config: &SimulationConfig) {
    eprintln!("Configuration:");
    eprintln!("  Forming Machines: {}", config.forming_machines);
    eprintln!("  Loading Crews: {}", config.crew_capacity);
    eprintln!("  Fleet Size: {}", config.fleet_size);
    eprintln!("  Initial Piles: {}", config.initial_piles);
    eprintln!("  Horizon: {}", config.horizon);
    if let Some(target) = config.cycle_target {
        eprintln!("  Cycle Target: {}", target);
    }
    eprintln!("  Report Interval: {}", config.report_interval);
    eprintln!("  Admission: {}", config.admission);
    for activity in Activity::ALL {
        eprintln!("  {} Duration: {}", activity, describe_timing(config, activity));
    }
    if let Some(orders) = &config.orders {
        eprintln!(
            "  Orders: up to {} orders of {} - {} pile-pairs",
            orders.max_orders, orders.min_pairs, orders.max_pairs
        );
    }
    if let Some(seed) = config.seed {
        eprintln!("  Random Seed: {}", seed);
    }
    eprintln!();
}
