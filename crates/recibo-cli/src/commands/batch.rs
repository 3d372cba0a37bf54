//! Batch processing command for multiple receipts.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use parking_lot::Mutex;
use tracing::{debug, error, warn};

use recibo_core::{AssistOutcome, Extraction, ExtractionPipeline};

use super::output::{format_extraction, record_cells, OutputFormat, RECORD_COLUMNS};
use super::{build_pipeline, extract_file, load_config, resolve_model_dir, InputKind};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input files or glob pattern
    #[arg(required = true)]
    input: String,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Number of parallel workers
    #[arg(short = 'j', long, default_value = "4")]
    jobs: usize,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,

    /// Model directory
    #[arg(short, long)]
    model_dir: Option<PathBuf>,

    /// Use rule-based extraction only
    #[arg(long)]
    no_assist: bool,
}

/// Result of processing a single file.
struct ProcessResult {
    path: PathBuf,
    extraction: Option<Extraction>,
    error: Option<String>,
    duplicate: bool,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    if args.no_assist {
        config.assist.enabled = false;
    }
    config.models.model_dir = resolve_model_dir(args.model_dir.clone(), &config);

    // Expand glob pattern
    let mut files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| InputKind::of(p).is_some())
        .collect();
    files.sort();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    // Create output directory if specified
    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let overall_pb = ProgressBar::new(files.len() as u64);
    overall_pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let needs_ocr = files.iter().any(|p| InputKind::of(p) == Some(InputKind::Image));
    let jobs = args.jobs.max(1);
    let continue_on_error = args.continue_on_error;
    let pb = overall_pb.clone();

    let mut results = tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<ProcessResult>> {
        let pipeline = build_pipeline(&config, needs_ocr)?;
        run_workers(&pipeline, files, jobs, continue_on_error, &pb)
    })
    .await??;

    overall_pb.finish_with_message("Complete");

    mark_duplicates(&mut results);

    // Write outputs
    let successful: Vec<_> = results.iter().filter(|r| r.extraction.is_some()).collect();
    let failed: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();

    if let Some(output_dir) = &args.output_dir {
        for result in &successful {
            if let Some(extraction) = &result.extraction {
                let output_name = result
                    .path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("receipt");

                let output_path =
                    output_dir.join(format!("{}.{}", output_name, args.format.extension()));

                fs::write(&output_path, format_extraction(extraction, args.format)?)?;
                debug!("Wrote output to {}", output_path.display());
            }
        }
    }

    // Generate summary if requested
    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &results)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let duplicates = results.iter().filter(|r| r.duplicate).count();
    let degraded = successful
        .iter()
        .filter(|r| {
            r.extraction
                .as_ref()
                .is_some_and(|e| matches!(e.assist, AssistOutcome::Degraded(_)))
        })
        .count();

    // Print summary
    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed, {} duplicates",
        style(successful.len()).green(),
        style(failed.len()).red(),
        style(duplicates).yellow()
    );
    if degraded > 0 {
        println!(
            "   {} files fell back to rule-based extraction",
            style(degraded).yellow()
        );
    }

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for result in &failed {
            println!(
                "  - {}: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

/// Process `files` on `jobs` threads sharing one pipeline.
///
/// Results come back in input order. Without `continue_on_error` the first
/// failure stops the remaining work and is returned.
fn run_workers(
    pipeline: &ExtractionPipeline,
    files: Vec<PathBuf>,
    jobs: usize,
    continue_on_error: bool,
    pb: &ProgressBar,
) -> anyhow::Result<Vec<ProcessResult>> {
    let next = AtomicUsize::new(0);
    let stop = AtomicBool::new(false);
    let slots: Mutex<Vec<Option<ProcessResult>>> =
        Mutex::new((0..files.len()).map(|_| None).collect());
    let first_error: Mutex<Option<String>> = Mutex::new(None);

    std::thread::scope(|s| {
        for _ in 0..jobs.min(files.len()) {
            s.spawn(|| {
                while !stop.load(Ordering::SeqCst) {
                    let idx = next.fetch_add(1, Ordering::SeqCst);
                    let Some(path) = files.get(idx) else {
                        break;
                    };

                    let result = process_single_file(pipeline, path);
                    if let Some(error_msg) = &result.error {
                        if continue_on_error {
                            warn!("Failed to process {}: {}", path.display(), error_msg);
                        } else {
                            error!("Failed to process {}: {}", path.display(), error_msg);
                            first_error.lock().get_or_insert_with(|| error_msg.clone());
                            stop.store(true, Ordering::SeqCst);
                        }
                    }

                    slots.lock()[idx] = Some(result);
                    pb.inc(1);
                }
            });
        }
    });

    if let Some(error_msg) = first_error.into_inner() {
        anyhow::bail!("Processing failed: {}", error_msg);
    }

    Ok(slots.into_inner().into_iter().flatten().collect())
}

fn process_single_file(pipeline: &ExtractionPipeline, path: &Path) -> ProcessResult {
    let file_start = Instant::now();
    let outcome = extract_file(pipeline, path);
    let processing_time_ms = file_start.elapsed().as_millis() as u64;

    match outcome {
        Ok(extraction) => ProcessResult {
            path: path.to_path_buf(),
            extraction: Some(extraction),
            error: None,
            duplicate: false,
            processing_time_ms,
        },
        Err(e) => ProcessResult {
            path: path.to_path_buf(),
            extraction: None,
            error: Some(e.to_string()),
            duplicate: false,
            processing_time_ms,
        },
    }
}

/// Flag every file whose content was already seen earlier in the batch.
fn mark_duplicates(results: &mut [ProcessResult]) {
    let mut seen = HashSet::new();
    for result in results.iter_mut() {
        if let Some(extraction) = &result.extraction {
            result.duplicate = !seen.insert(extraction.fingerprint.clone());
        }
    }
}

fn write_summary(path: &Path, results: &[ProcessResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    let mut header = vec!["filename", "status", "fingerprint", "duplicate"];
    header.extend(RECORD_COLUMNS);
    header.extend(["assist", "processing_time_ms", "error"]);
    wtr.write_record(&header)?;

    for result in results {
        let filename = result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_string();

        let mut row = vec![filename];
        match &result.extraction {
            Some(extraction) => {
                row.push("success".to_string());
                row.push(extraction.fingerprint.to_string());
                row.push(result.duplicate.to_string());
                row.extend(record_cells(&extraction.record));
                row.push(extraction.assist.to_string());
            }
            None => {
                row.push("error".to_string());
                row.extend(std::iter::repeat_n(String::new(), 2 + RECORD_COLUMNS.len() + 1));
            }
        }
        row.push(result.processing_time_ms.to_string());
        row.push(result.error.clone().unwrap_or_default());

        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}
