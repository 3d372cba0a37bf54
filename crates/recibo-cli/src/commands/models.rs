//! Models command - download and manage OCR models.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use console::style;
use futures_util::StreamExt;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Arguments for the models command.
#[derive(Args)]
pub struct ModelsArgs {
    #[command(subcommand)]
    command: ModelsCommand,
}

#[derive(Subcommand)]
enum ModelsCommand {
    /// Download models
    Download(DownloadArgs),

    /// Check model status
    Status(DirArgs),

    /// Remove downloaded models
    Clean(DirArgs),
}

#[derive(Args)]
struct DownloadArgs {
    /// Output directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Force re-download even if files exist
    #[arg(long)]
    force: bool,
}

#[derive(Args)]
struct DirArgs {
    /// Model directory
    #[arg(short, long)]
    dir: Option<PathBuf>,
}

/// Model information with download URL.
struct ModelInfo {
    filename: &'static str,
    size_bytes: u64,
    description: &'static str,
    url: &'static str,
}

/// Detection model, Latin-script recognition model and its dictionary.
const MODELS: [ModelInfo; 3] = [
    ModelInfo {
        filename: "det.onnx",
        size_bytes: 4_500_000,
        description: "PP-OCRv3 mobile detection",
        url: "https://github.com/jakubmatias/incr/raw/main/models/mobile/det.onnx",
    },
    ModelInfo {
        filename: "latin_rec.onnx",
        size_bytes: 7_500_000,
        description: "Latin recognition (Spanish)",
        url: "https://github.com/jakubmatias/incr/raw/main/models/mobile/latin_rec.onnx",
    },
    ModelInfo {
        filename: "latin_dict.txt",
        size_bytes: 2_000,
        description: "Latin character dictionary",
        url: "https://github.com/jakubmatias/incr/raw/main/models/mobile/latin_dict.txt",
    },
];

/// Where `download` puts models by default.
pub fn default_model_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("recibo")
        .join("models")
}

pub async fn run(args: ModelsArgs) -> anyhow::Result<()> {
    match args.command {
        ModelsCommand::Download(download_args) => download_models(download_args).await,
        ModelsCommand::Status(dir_args) => {
            check_status(&dir_args.dir.unwrap_or_else(default_model_dir)).map(|_| ())
        }
        ModelsCommand::Clean(dir_args) => clean_models(&dir_args.dir.unwrap_or_else(default_model_dir)),
    }
}

async fn download_models(args: DownloadArgs) -> anyhow::Result<()> {
    let output_dir = args.output.unwrap_or_else(default_model_dir);
    fs::create_dir_all(&output_dir)?;

    println!(
        "{} Downloading OCR models to {}",
        style("ℹ").blue(),
        output_dir.display()
    );
    println!();

    let client = reqwest::Client::builder()
        .user_agent(concat!("recibo-cli/", env!("CARGO_PKG_VERSION")))
        .timeout(std::time::Duration::from_secs(300))
        .build()?;

    let multi_progress = MultiProgress::new();
    let mut success_count = 0;
    let mut skip_count = 0;
    let mut error_count = 0;

    for model in &MODELS {
        let path = output_dir.join(model.filename);

        // Check if already exists
        if path.exists() && !args.force {
            let metadata = fs::metadata(&path)?;
            // Check if file size is reasonable (at least 50% of expected)
            if metadata.len() > model.size_bytes / 2 {
                println!(
                    "  {} {} (already exists, {})",
                    style("✓").green(),
                    model.filename,
                    format_size(metadata.len())
                );
                skip_count += 1;
                continue;
            }
        }

        let pb = multi_progress.add(ProgressBar::new(model.size_bytes));
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  {spinner:.green} {msg:<30} [{bar:25.cyan/blue}] {bytes}/{total_bytes}")?
                .progress_chars("=>-"),
        );
        pb.set_message(model.filename.to_string());

        match download_file(&client, model.url, &path, &pb).await {
            Ok(()) => {
                pb.finish_with_message(format!("{} {}", style("✓").green(), model.filename));
                success_count += 1;
            }
            Err(e) => {
                pb.finish_with_message(format!("{} {} - {}", style("✗").red(), model.filename, e));
                error_count += 1;
            }
        }
    }

    println!();

    if error_count == 0 {
        println!("{} Models downloaded successfully!", style("✓").green().bold());
        if skip_count > 0 {
            println!(
                "   {} downloaded, {} already present",
                success_count, skip_count
            );
        }
    } else {
        println!(
            "{} Download completed with errors",
            style("⚠").yellow().bold()
        );
        println!(
            "   {} downloaded, {} skipped, {} failed",
            success_count, skip_count, error_count
        );
        println!();
        println!("Retry with: recibo models download --force");
    }

    println!();
    check_status(&output_dir)?;

    if error_count > 0 {
        anyhow::bail!("{} model files failed to download", error_count);
    }

    Ok(())
}

async fn download_file(
    client: &reqwest::Client,
    url: &str,
    path: &Path,
    pb: &ProgressBar,
) -> anyhow::Result<()> {
    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        anyhow::bail!("HTTP {}", response.status());
    }

    if let Some(content_length) = response.content_length() {
        pb.set_length(content_length);
    }

    // Write to a temp file first so an interrupted download never looks complete
    let temp_path = path.with_extension("tmp");
    let mut file = File::create(&temp_path)?;

    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk)?;
        downloaded += chunk.len() as u64;
        pb.set_position(downloaded);
    }

    file.flush()?;
    drop(file);

    fs::rename(&temp_path, path)?;

    Ok(())
}

/// Print the state of each model file; returns whether all are usable.
fn check_status(model_dir: &Path) -> anyhow::Result<bool> {
    println!("{}", style("Model Status").bold());
    println!("{}", model_dir.display());

    let mut all_present = true;
    let mut total_size: u64 = 0;

    for model in &MODELS {
        let path = model_dir.join(model.filename);
        let (status, size_str) = if path.exists() {
            let size = fs::metadata(&path)?.len();
            total_size += size;

            if size > model.size_bytes / 2 {
                (style("✓").green(), format_size(size))
            } else {
                all_present = false;
                (
                    style("⚠").yellow(),
                    format!("{} (incomplete?)", format_size(size)),
                )
            }
        } else {
            all_present = false;
            (style("✗").red(), "missing".to_string())
        };

        println!(
            "    {} {:<20} {:>16}  {}",
            status,
            model.filename,
            size_str,
            style(model.description).dim()
        );
    }

    if all_present {
        println!(
            "    {} Ready ({} total)",
            style("✓").green(),
            format_size(total_size)
        );
    } else {
        println!(
            "    {} Run 'recibo models download' to download",
            style("⚠").yellow()
        );
    }

    Ok(all_present)
}

fn clean_models(model_dir: &Path) -> anyhow::Result<()> {
    let mut total_removed = 0;
    let mut total_freed: u64 = 0;

    if model_dir.exists() {
        for model in &MODELS {
            let path = model_dir.join(model.filename);
            if path.exists() {
                let size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
                fs::remove_file(&path)?;
                total_removed += 1;
                total_freed += size;
                println!("  {} Removed {}", style("✓").green(), model.filename);
            }
        }

        // Leftovers from interrupted downloads
        for entry in fs::read_dir(model_dir)?.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|e| e == "tmp") {
                fs::remove_file(&path)?;
            }
        }
    }

    if total_removed > 0 {
        println!();
        println!(
            "{} Removed {} files, freed {}",
            style("✓").green(),
            total_removed,
            format_size(total_freed)
        );
    } else {
        println!("{} No model files to remove.", style("ℹ").blue());
    }

    Ok(())
}

fn format_size(bytes: u64) -> String {
    if bytes >= 1_000_000_000 {
        format!("{:.1}GB", bytes as f64 / 1_000_000_000.0)
    } else if bytes >= 1_000_000 {
        format!("{:.1}MB", bytes as f64 / 1_000_000.0)
    } else if bytes >= 1_000 {
        format!("{:.1}KB", bytes as f64 / 1_000.0)
    } else {
        format!("{}B", bytes)
    }
}
