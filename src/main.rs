use anyhow::{Context, Result, bail};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use resmatch::config::{AreaRatioBand, FileConfig};
use resmatch::domain::Round;
use resmatch::io::{load_dams, load_reservoirs, write_assignments};
use resmatch::retrieval::{RetrievalOutcome, Retriever};

/// Associate dam points with reservoir polygons
///
/// Examples:
///   # Match dams against a lake layer with default tolerances (500 m, then 1000 m)
///   resmatch --dams dams.geojson --reservoirs lakes.geojson -o matches.json
///
///   # Wider second round and an area plausibility check
///   resmatch --dams dams.geojson --reservoirs lakes.geojson --round2 1500 --area-band 0.2,5
///
///   # Use a config file
///   resmatch --config my-settings.toml
#[derive(Parser, Debug)]
#[command(name = "resmatch")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to config file (optional, auto-searches resmatch.toml if not provided)
    #[arg(long)]
    config: Option<PathBuf>,

    /// GeoJSON file of dam points
    #[arg(short = 'd', long)]
    dams: Option<PathBuf>,

    /// GeoJSON file of reservoir polygons
    #[arg(short = 'r', long)]
    reservoirs: Option<PathBuf>,

    /// Output JSON file path (defaults to assignments.json)
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Round 1 tolerance in meters
    #[arg(long)]
    round1: Option<f64>,

    /// Round 2 tolerance in meters
    #[arg(long)]
    round2: Option<f64>,

    /// Accepted polygon/reported area ratio as MIN,MAX (enables the plausibility check)
    #[arg(long, value_parser = parse_area_band)]
    area_band: Option<AreaRatioBand>,

    /// Nearest candidates kept per dam
    #[arg(long)]
    max_candidates: Option<usize>,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let total_start = Instant::now();

    let (file_config, config_errors) = if let Some(ref config_path) = args.config {
        if config_path.exists() {
            let contents = std::fs::read_to_string(config_path)
                .context(format!("Failed to read config file: {:?}", config_path))?;
            let parsed: FileConfig =
                toml::from_str(&contents).context("Failed to parse config file")?;
            (parsed, Vec::new())
        } else {
            bail!("Config file not found: {:?}", config_path);
        }
    } else {
        let (found, errors) = FileConfig::load();
        (found.unwrap_or_default(), errors)
    };

    let verbose = args.verbose || file_config.verbose;
    enable_tracing(verbose);
    for error in &config_errors {
        tracing::warn!("{}, file ignored", error);
    }

    let Some(dams_path) = args.dams.clone().or_else(|| file_config.dams.clone()) else {
        bail!("Must provide --dams or set `dams` in the config file");
    };
    let Some(reservoirs_path) = args
        .reservoirs
        .clone()
        .or_else(|| file_config.reservoirs.clone())
    else {
        bail!("Must provide --reservoirs or set `reservoirs` in the config file");
    };
    let output_path = args
        .output
        .clone()
        .or_else(|| file_config.output.clone())
        .unwrap_or_else(|| PathBuf::from("assignments.json"));

    let mut retrieval = file_config.retrieval.clone();
    if let Some(round1) = args.round1 {
        retrieval.round1_tolerance_m = round1;
    }
    if let Some(round2) = args.round2 {
        retrieval.round2_tolerance_m = round2;
    }
    if let Some(band) = args.area_band {
        retrieval.area_ratio_band = Some(band);
    }
    if let Some(max) = args.max_candidates {
        retrieval.max_candidates_per_dam = max;
    }
    let retriever = Retriever::new(retrieval).context("Invalid retrieval settings")?;

    println!("resmatch - Dam to Reservoir Matching");
    println!("====================================");
    println!();

    if verbose {
        let config = retriever.config();
        println!("Configuration:");
        println!("  Dams: {}", dams_path.display());
        println!("  Reservoirs: {}", reservoirs_path.display());
        println!(
            "  Tolerances: {}m, then {}m",
            config.round1_tolerance_m, config.round2_tolerance_m
        );
        match config.area_ratio_band {
            Some(band) => println!("  Area ratio band: [{}, {}]", band.min, band.max),
            None => println!("  Area ratio band: disabled"),
        }
        println!("  Max candidates per dam: {}", config.max_candidates_per_dam);
        println!("  Output: {}", output_path.display());
        println!();
    }

    let spinner = create_spinner("Reading dam points...");
    let start = Instant::now();
    let dams = load_dams(&dams_path, &file_config.dam_fields())?;
    spinner.finish_with_message(format!(
        "Read {} dams, skipped {} features [{:.1}s]",
        dams.records.len(),
        dams.skipped.len(),
        start.elapsed().as_secs_f32()
    ));
    for note in &dams.skipped {
        tracing::warn!("{}", note);
    }

    let spinner = create_spinner("Reading reservoir polygons...");
    let start = Instant::now();
    let reservoirs = load_reservoirs(&reservoirs_path, &file_config.polygon_fields())?;
    spinner.finish_with_message(format!(
        "Read {} reservoirs, skipped {} features [{:.1}s]",
        reservoirs.records.len(),
        reservoirs.skipped.len(),
        start.elapsed().as_secs_f32()
    ));
    for note in &reservoirs.skipped {
        tracing::warn!("{}", note);
    }

    let spinner = create_spinner("Matching dams to reservoirs...");
    let start = Instant::now();
    let outcome = retriever
        .retrieve(&dams.records, &reservoirs.records)
        .context("Retrieval failed")?;
    spinner.finish_with_message(format!(
        "Matched {} of {} dams [{:.1}s]",
        outcome.table.len(),
        outcome.dam_order().len(),
        start.elapsed().as_secs_f32()
    ));

    let spinner = create_spinner("Writing assignments...");
    let start = Instant::now();
    write_assignments(&output_path, &outcome).context("Failed to write assignments")?;
    spinner.finish_with_message(format!(
        "Wrote {} rows [{:.1}s]",
        outcome.dam_order().len(),
        start.elapsed().as_secs_f32()
    ));

    println!();
    println!(
        "Done! Total time: {:.1}s",
        total_start.elapsed().as_secs_f32()
    );
    println!();
    println!("Output: {}", output_path.display());
    println!();
    print_summary(&outcome);

    Ok(())
}

fn print_summary(outcome: &RetrievalOutcome) {
    println!("Summary");
    println!("=======");
    println!(
        "  Round 1:    {} dams matched",
        outcome.assigned_in(Round::First)
    );
    println!(
        "  Round 2:    {} dams matched",
        outcome.assigned_in(Round::Second)
    );
    println!("  Unassigned: {} dams", outcome.unassigned.len());

    let contained = outcome.table.iter().filter(|a| a.contained).count();
    let contested = outcome.table.iter().filter(|a| a.contested).count();
    println!("  Inside their reservoir: {}", contained);
    println!("  Resolved from a shared claim: {}", contested);
    println!();
    println!("Input issues: {}", outcome.diagnostics.summary());
}

fn parse_area_band(s: &str) -> Result<AreaRatioBand, String> {
    let (min, max) = s
        .split_once(',')
        .ok_or_else(|| format!("expected MIN,MAX, got '{}'", s))?;
    let min: f64 = min
        .trim()
        .parse()
        .map_err(|e| format!("invalid minimum '{}': {}", min, e))?;
    let max: f64 = max
        .trim()
        .parse()
        .map_err(|e| format!("invalid maximum '{}': {}", max, e))?;
    Ok(AreaRatioBand::new(min, max))
}

fn enable_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}
