//! Process command - extract data from a single receipt.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use recibo_core::AssistOutcome;

use super::output::{format_extraction, OutputFormat};
use super::{build_pipeline, extract_file, load_config, resolve_model_dir, InputKind};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (image or recognized .txt)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Model directory
    #[arg(short, long)]
    model_dir: Option<PathBuf>,

    /// Use rule-based extraction only
    #[arg(long)]
    no_assist: bool,

    /// Show processing details
    #[arg(long)]
    show_details: bool,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    if args.no_assist {
        config.assist.enabled = false;
    }
    config.models.model_dir = resolve_model_dir(args.model_dir.clone(), &config);

    // Check input file exists
    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let Some(kind) = InputKind::of(&args.input) else {
        anyhow::bail!("Unsupported file format: {}", args.input.display());
    };

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );
    pb.set_message(match kind {
        InputKind::Image => "Running OCR and extraction...",
        InputKind::Text => "Extracting fields...",
    });
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    // The OCR engine and the blocking HTTP client stay on a blocking thread.
    let input = args.input.clone();
    let extraction = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
        let pipeline = build_pipeline(&config, kind == InputKind::Image)?;
        extract_file(&pipeline, &input)
    })
    .await??;

    pb.finish_and_clear();

    if let AssistOutcome::Degraded(e) = &extraction.assist {
        eprintln!(
            "{} Assisted extraction unavailable ({}), using rule-based result",
            style("⚠").yellow(),
            e
        );
    }

    let output = format_extraction(&extraction, args.format)?;

    // Write output
    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    if args.show_details {
        let missing = extraction.record.missing_fields();
        println!();
        println!(
            "{} Source: {} (assist {})",
            style("ℹ").blue(),
            extraction.record.provenance,
            extraction.assist
        );
        if !missing.is_empty() {
            println!("{} Not found: {}", style("ℹ").blue(), missing.join(", "));
        }
        println!(
            "{} Processing time: {}ms",
            style("ℹ").blue(),
            extraction.processing_time_ms
        );
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}
