use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

use burn_ndarray::NdArray;
use lesionkit_core::Dataset;
use lesionkit_io::{load_cohort, CohortPaths};
use lesionkit_report::{histogram, SizeBins, VolumeSummary};

type Backend = NdArray<f32>;

#[derive(Parser)]
#[command(name = "lesionkit")]
#[command(about = "Cohort lesion geometry pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CohortArgs {
    /// Directory containing image volumes (<id>_0000.nii.gz)
    #[arg(long)]
    images: PathBuf,

    /// Directory containing label masks (<id>.nii.gz)
    #[arg(long)]
    labels: PathBuf,

    /// Directory containing region masks (<id>.nii.gz)
    #[arg(long)]
    regions: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Check spatial consistency for every patient
    Verify(CohortArgs),

    /// Extract per-label lesion masks
    Extract(CohortArgs),

    /// Compute lesion volumes (mm^3)
    Volumes(CohortArgs),

    /// Compute world-space lesion centroids (mm)
    Centroids(CohortArgs),

    /// Summarize the cohort lesion volume distribution
    Report {
        #[command(flatten)]
        cohort: CohortArgs,

        /// Emit the summary as JSON instead of text
        #[arg(long)]
        json: bool,

        /// Number of histogram bins
        #[arg(long, default_value_t = 20)]
        bins: usize,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Verify(args) => {
            let dataset = load_verified(&args)?;
            println!("Geometry valid for {} patients.", dataset.len());
        }
        Commands::Extract(args) => {
            let dataset = extract(&args)?;
            let total: usize = dataset.iter().map(|p| p.lesions().len()).sum();
            println!("Extracted {total} lesions.");
        }
        Commands::Volumes(args) => {
            let dataset = measure_volumes(&args)?;
            let volumes = collect_volumes(&dataset);
            println!("Computed volumes for {} lesions.", volumes.len());
            for volume in volumes.iter().take(5) {
                println!("  {volume:.1} mm^3");
            }
        }
        Commands::Centroids(args) => {
            let dataset = measure_centroids(&args)?;
            println!("Computed lesion centroids.");
            let examples = dataset
                .iter()
                .flat_map(|p| p.lesions())
                .filter_map(|l| l.centroid().map(|c| (l.patient_id().to_string(), l.id(), c)))
                .take(5);
            for (patient, lesion, c) in examples {
                println!(
                    "  Patient {patient}, lesion {lesion}: ({:.1}, {:.1}, {:.1}) mm",
                    c.x, c.y, c.z
                );
            }
        }
        Commands::Report { cohort, json, bins } => {
            let dataset = measure_centroids(&cohort)?;
            let volumes = collect_volumes(&dataset);
            report(&volumes, bins, json)?;
        }
    }

    Ok(())
}

fn load(args: &CohortArgs) -> Result<Dataset<Backend>> {
    let paths = CohortPaths::new(
        args.images.clone(),
        args.labels.clone(),
        args.regions.clone(),
    );
    let device = Default::default();
    let dataset = load_cohort::<Backend>(&paths, &device)?;
    info!(patients = dataset.len(), "cohort loaded");
    Ok(dataset)
}

fn load_verified(args: &CohortArgs) -> Result<Dataset<Backend>> {
    let dataset = load(args)?;
    dataset.verify_all_geometry()?;
    Ok(dataset)
}

fn extract(args: &CohortArgs) -> Result<Dataset<Backend>> {
    let mut dataset = load_verified(args)?;
    dataset.extract_all_lesions();
    Ok(dataset)
}

fn measure_volumes(args: &CohortArgs) -> Result<Dataset<Backend>> {
    let mut dataset = extract(args)?;
    dataset.compute_all_lesion_volumes();
    Ok(dataset)
}

fn measure_centroids(args: &CohortArgs) -> Result<Dataset<Backend>> {
    let mut dataset = measure_volumes(args)?;
    dataset.compute_all_lesion_centroids()?;
    Ok(dataset)
}

fn collect_volumes(dataset: &Dataset<Backend>) -> Vec<f64> {
    dataset
        .iter()
        .flat_map(|p| p.lesions())
        .filter_map(|l| l.volume())
        .collect()
}

#[derive(Serialize)]
struct ReportOutput {
    summary: VolumeSummary,
    size_bins: SizeBins,
    histogram: Vec<usize>,
}

fn report(volumes: &[f64], bins: usize, json: bool) -> Result<()> {
    let (Some(summary), Some(size_bins)) = (
        VolumeSummary::from_volumes(volumes),
        SizeBins::from_volumes(volumes),
    ) else {
        println!("No lesions in cohort.");
        return Ok(());
    };

    let output = ReportOutput {
        summary,
        size_bins,
        histogram: histogram(volumes, bins),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Total lesions: {}", output.summary.count);
    println!("Min volume:    {:.1} mm^3", output.summary.min);
    println!("Median volume: {:.1} mm^3", output.summary.median);
    println!("Max volume:    {:.1} mm^3", output.summary.max);
    println!();
    println!("Size bins (quantile-based):");
    println!(
        "  Small  : < {:.1} mm^3 ({} lesions)",
        output.size_bins.small_below, output.size_bins.small
    );
    println!(
        "  Medium : {:.1} - {:.1} mm^3 ({} lesions)",
        output.size_bins.small_below, output.size_bins.large_above, output.size_bins.medium
    );
    println!(
        "  Large  : > {:.1} mm^3 ({} lesions)",
        output.size_bins.large_above, output.size_bins.large
    );
    println!();
    println!("Histogram ({} bins): {:?}", bins, output.histogram);
    Ok(())
}
