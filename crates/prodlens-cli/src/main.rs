use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use prodlens_contracts::analysis::ImageAsset;
use prodlens_engine::codec::read_image_asset;
use prodlens_engine::{AnalysisService, BatchConfig, BatchProcessor, ProviderConfig};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Parser)]
#[command(
    name = "prodlens",
    version,
    about = "Product image analysis with vision models"
)]
struct Cli {
    /// Repeat for more log output on stderr (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Provider name: anthropic, openai or dryrun. Defaults to PRODLENS_PROVIDER.
    #[arg(long, global = true)]
    provider: Option<String>,
    /// Model name, overriding the provider preset and PRODLENS_MODEL.
    #[arg(long, global = true)]
    model: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Structured product analysis as JSON.
    Analyze(AnalyzeArgs),
    /// Compare two product images.
    Compare(CompareArgs),
    /// Extract visible text.
    Ocr(ImageArgs),
    /// Accessibility alt text, three lengths.
    AltText(AltTextArgs),
    /// Title, description and features per language.
    Multilingual(MultilingualArgs),
    /// Analysis, alt text and OCR of one image written to analysis_<stem>.json.
    Report(ReportArgs),
    /// Analyze every image under a directory.
    Batch(BatchArgs),
}

#[derive(Debug, Args)]
struct ImageArgs {
    #[arg(long)]
    image: PathBuf,
}

#[derive(Debug, Args)]
struct AnalyzeArgs {
    #[arg(long)]
    image: PathBuf,
    #[arg(long)]
    category: Option<String>,
}

#[derive(Debug, Args)]
struct CompareArgs {
    #[arg(long)]
    image_a: PathBuf,
    #[arg(long)]
    image_b: PathBuf,
}

#[derive(Debug, Args)]
struct AltTextArgs {
    #[arg(long)]
    image: PathBuf,
    #[arg(long)]
    context: Option<String>,
}

#[derive(Debug, Args)]
struct MultilingualArgs {
    #[arg(long)]
    image: PathBuf,
    #[arg(long, value_delimiter = ',', default_value = "en,es,fr")]
    languages: Vec<String>,
}

#[derive(Debug, Args)]
struct ReportArgs {
    #[arg(long)]
    image: PathBuf,
    /// Directory for the report file.
    #[arg(long, default_value = ".")]
    out: PathBuf,
}

#[derive(Debug, Args)]
struct BatchArgs {
    #[arg(long)]
    input: PathBuf,
    #[arg(long)]
    out: PathBuf,
    #[arg(long, default_value_t = prodlens_engine::batch::DEFAULT_WORKERS)]
    workers: usize,
    #[arg(long)]
    category: Option<String>,
    /// Append batch events as JSON lines to this file.
    #[arg(long)]
    events: Option<PathBuf>,
}

fn main() {
    match run() {
        Ok(()) => std::process::exit(0),
        Err(err) => {
            eprintln!("prodlens error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = resolve_provider_config(cli.provider.as_deref(), cli.model.as_deref());
    info!(provider = %config.provider, model = %config.model, "provider configured");
    let service = AnalysisService::from_config(&config)?;

    match cli.command {
        Command::Analyze(args) => {
            let image = load_image(&args.image)?;
            let analysis = service.analyze_product(&image, args.category.as_deref())?;
            print_json(&analysis)?;
        }
        Command::Compare(args) => {
            let first = load_image(&args.image_a)?;
            let second = load_image(&args.image_b)?;
            println!("{}", service.compare_products(&first, &second)?);
        }
        Command::Ocr(args) => {
            let image = load_image(&args.image)?;
            println!("{}", service.extract_text(&image)?);
        }
        Command::AltText(args) => {
            let image = load_image(&args.image)?;
            println!(
                "{}",
                service.generate_alt_text(&image, args.context.as_deref())?
            );
        }
        Command::Multilingual(args) => {
            let image = load_image(&args.image)?;
            let languages = clean_languages(&args.languages);
            print_json(&service.generate_multilingual(&image, &languages)?)?;
        }
        Command::Report(args) => {
            let image = load_image(&args.image)?;
            let report = service.full_report(&image)?;
            let path = args.out.join(report_file_name(&args.image));
            fs::create_dir_all(&args.out)
                .with_context(|| format!("failed to create {}", args.out.display()))?;
            fs::write(&path, serde_json::to_string_pretty(&report)?)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("{}", path.display());
        }
        Command::Batch(args) => {
            let processor = BatchProcessor::new(
                Arc::new(service),
                BatchConfig {
                    workers: args.workers,
                    category: args.category,
                    events_path: args.events,
                },
            );
            let report = processor.process_directory(&args.input, &args.out)?;
            println!(
                "processed {} images: {} succeeded, {} failed",
                report.total(),
                report.succeeded(),
                report.failed()
            );
            println!("summary: {}", report.summary_path.display());
        }
    }
    Ok(())
}

fn init_tracing(verbose: u8) {
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::new(verbosity_directive(verbose)))
        .try_init();
}

fn verbosity_directive(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn resolve_provider_config(provider: Option<&str>, model: Option<&str>) -> ProviderConfig {
    let mut config = match provider.map(str::trim).filter(|name| !name.is_empty()) {
        Some(name) => ProviderConfig::from_env_for(name),
        None => ProviderConfig::from_env(),
    };
    if let Some(model) = model.map(str::trim).filter(|model| !model.is_empty()) {
        config.model = model.to_string();
    }
    config
}

fn load_image(path: &Path) -> Result<ImageAsset> {
    Ok(read_image_asset(path)?)
}

fn clean_languages(raw: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for code in raw {
        let code = code.trim().to_lowercase();
        if !code.is_empty() && !out.contains(&code) {
            out.push(code);
        }
    }
    out
}

fn report_file_name(image: &Path) -> String {
    let stem = image
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| "image".to_string());
    format!("analysis_{stem}.json")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
