mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::Scenario;
use decay_core::{
    check_convergence, export_csv, timestep_study, AnalyticReference, ConvergenceSettings,
    DecayError, DecayNetwork, ExportSettings, TimeSpec, TimeUnit,
};
use log::info;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "decay")]
#[command(about = "Explicit-Euler simulation of radioactive decay chains", long_about = None)]
struct Cli {
    /// Scenario JSON file
    #[arg(short, long)]
    scenario: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the scenario and print final populations
    Run {
        /// Directory for the exported table
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Base name of the exported file (<NAME>_data.csv)
        #[arg(long)]
        name: Option<String>,
    },
    /// Halve the scenario timestep until successive runs agree
    Converge {
        #[arg(long)]
        tolerance: f64,

        /// Query time (defaults to the scenario duration)
        #[arg(long)]
        query: Option<f64>,

        /// Unit of the query time (defaults to the scenario output unit)
        #[arg(long, requires = "query")]
        query_unit: Option<String>,

        #[arg(long, default_value_t = 40)]
        max_halvings: usize,

        /// Smallest timestep in seconds the halving may reach
        #[arg(long)]
        min_timestep: Option<f64>,
    },
    /// Error at a query time across timesteps, against closed-form populations
    Study {
        /// Comma-separated timesteps
        #[arg(long, value_delimiter = ',', required = true)]
        timesteps: Vec<f64>,

        #[arg(long, default_value = "seconds")]
        timestep_unit: String,

        #[arg(long)]
        qoi: f64,

        #[arg(long, default_value = "seconds")]
        qoi_unit: String,

        /// Report the timestep each fit predicts for this absolute error
        #[arg(long)]
        target_error: Option<f64>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let scenario = Scenario::load(&cli.scenario)?;

    match cli.command {
        Commands::Run { output_dir, name } => run(&scenario, output_dir, name),
        Commands::Converge {
            tolerance,
            query,
            query_unit,
            max_halvings,
            min_timestep,
        } => {
            let settings = ConvergenceSettings {
                tolerance,
                max_halvings,
                min_timestep_seconds: min_timestep,
                ..ConvergenceSettings::default()
            };
            converge(&scenario, &settings, query, query_unit)
        }
        Commands::Study {
            timesteps,
            timestep_unit,
            qoi,
            qoi_unit,
            target_error,
        } => study(
            &scenario,
            &timesteps,
            &timestep_unit,
            &TimeSpec::new(qoi, qoi_unit),
            target_error,
        ),
    }
}

fn run(scenario: &Scenario, output_dir: Option<PathBuf>, name: Option<String>) -> Result<()> {
    let unit = scenario.output_unit()?;
    let network = DecayNetwork::from_config(&scenario.network).context("Invalid scenario")?;
    info!(
        "Running {} nuclides for {} steps of {} s",
        network.len(),
        network.total_steps(),
        network.timestep_seconds()
    );
    let run = network.run();
    let table = run.compile(unit)?;

    let end = unit.from_seconds(network.sample_time(network.total_steps()));
    println!("Populations at {end} {unit}:");
    for (nuclide, value) in run.final_values() {
        println!("  {nuclide:<12} {value:.6e}");
    }

    if output_dir.is_some() || name.is_some() {
        let settings = ExportSettings {
            directory: output_dir,
            name,
        };
        let path = export_csv(&table, &settings).context("Export failed")?;
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn converge(
    scenario: &Scenario,
    settings: &ConvergenceSettings,
    query: Option<f64>,
    query_unit: Option<String>,
) -> Result<()> {
    let timestep = scenario
        .network
        .timestep
        .as_ref()
        .ok_or(DecayError::MissingParameter("timestep"))?;
    let duration = scenario
        .network
        .duration
        .as_ref()
        .ok_or(DecayError::MissingParameter("duration"))?;
    let query_time = match query {
        Some(value) => TimeSpec::new(value, query_unit.unwrap_or_else(|| scenario.output_unit.clone())),
        None => duration.clone(),
    };

    let report = check_convergence(
        &scenario.network.nuclides,
        timestep,
        duration,
        &query_time,
        settings,
    )?;

    println!(
        "Converged at dt = {} s after {} halvings (max difference {:.3e})",
        report.timestep_seconds,
        report.halvings(),
        report.max_difference
    );
    println!("Populations at {} {}:", query_time.value, query_time.unit);
    for entry in &report.values {
        println!("  {:<12} {:.6e}", entry.name, entry.value);
    }
    Ok(())
}

fn study(
    scenario: &Scenario,
    timesteps: &[f64],
    timestep_unit: &str,
    qoi: &TimeSpec,
    target_error: Option<f64>,
) -> Result<()> {
    let unit: TimeUnit = timestep_unit.parse()?;
    let timesteps: Vec<f64> = timesteps.iter().map(|dt| unit.to_seconds(*dt)).collect();
    let duration = scenario.duration_seconds()?;
    let specs = &scenario.network.nuclides;
    let reference = AnalyticReference::from_specs(specs)?;

    let report = timestep_study(specs, duration, &timesteps, qoi.to_seconds()?, |name, t| {
        reference.value(name, t)
    })?;

    for point in &report.points {
        println!("dt = {} s", point.timestep_seconds);
        for error in &point.errors {
            println!(
                "  {:<12} numerical {:.6e}  reference {:.6e}  error {:.3e}",
                error.name, error.numerical, error.reference, error.abs_error
            );
        }
    }
    for entry in &report.fits {
        print!(
            "{}: error ≈ {:.4e} · dt^{:.3}",
            entry.name, entry.fit.coefficient, entry.fit.order
        );
        match target_error {
            Some(target) => println!(
                "  (dt ≈ {:.4e} s for error {target})",
                entry.fit.timestep_for(target)
            ),
            None => println!(),
        }
    }
    Ok(())
}
