//! trendpath CLI: spike-aware demand forecasting over a supply network.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use trendpath::config::TrendConfig;
use trendpath::pipeline::{self, RunReport};

#[derive(Parser)]
#[command(name = "trendpath", version, about = "Spike-aware demand forecasting")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline once over an input document.
    Run {
        /// JSON file with products and supply edges.
        #[arg(long)]
        input: PathBuf,

        /// TOML configuration file (defaults apply when omitted).
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print the full report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print or write the default configuration.
    Config {
        /// Write to this file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            input,
            config,
            json,
        } => {
            let report = pipeline::run_files(&input, config.as_deref())?;

            if json {
                println!("{}", report.to_json().into_diagnostic()?);
            } else {
                print_summary(&report);
            }
        }

        Commands::Config { output } => {
            let config = TrendConfig::default();
            match output {
                Some(path) => {
                    config.save(&path)?;
                    println!("Wrote default configuration to {}", path.display());
                }
                None => print!("{}", config.to_toml()?),
            }
        }
    }

    Ok(())
}

fn print_summary(report: &RunReport) {
    let spiking: Vec<&str> = report.spiking.iter().collect();
    if !spiking.is_empty() {
        println!("Spiking: {}", spiking.join(", "));
    }
    println!("Depletion warning: {}", report.depletion_warning);
    if let Some(earliest) = &report.earliest_depletion {
        println!(
            "Earliest depletion: {} in {} periods",
            earliest.product, earliest.periods
        );
    }

    println!("\nProducts:");
    for p in &report.products {
        let marker = if p.is_spike { " [spike]" } else { "" };
        println!(
            "  {}{}: forecast {:.2} (baseline {:.2}), depletion {}",
            p.name, marker, p.adjusted_forecast, p.baseline_forecast, p.depletion
        );
        println!("    route: {}", p.route);
    }

    if !report.failures.is_empty() {
        println!("\nExcluded:");
        for f in &report.failures {
            println!("  {}: {}", f.product, f.reason);
        }
    }
}
