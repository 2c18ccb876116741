use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use mathdoc::core::config::ConversionConfig;
use mathdoc::equation::Translator;
use mathdoc::layout::regions::page_regions;
use mathdoc::layout::LayoutDocument;
use mathdoc::pipeline::{convert, CancelToken, PipelineConfig};
use mathdoc::recognition::CommandRecognizer;

#[derive(Parser, Debug)]
#[command(name = "mathdoc")]
#[command(version, about = "Reconcile layout regions with recognized formulas and rebuild the document with native equations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert a layout analysis plus page images into the final document
    Convert {
        /// Layout JSON produced by the layout detector
        layout: PathBuf,

        /// Directory holding the page images
        #[arg(short, long)]
        images: PathBuf,

        /// Output directory (default: ./<layout_name>_output)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Formula recognizer program; receives crop image paths, prints JSON
        #[arg(short, long)]
        recognizer: PathBuf,

        /// Extra argument passed to the recognizer before the image paths
        #[arg(long = "recognizer-arg", allow_hyphen_values = true)]
        recognizer_args: Vec<String>,

        /// JSON config file with conversion settings
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Crops sent to the recognizer per call
        #[arg(long)]
        batch_size: Option<usize>,

        /// Pages processed in parallel
        #[arg(long)]
        page_concurrency: Option<usize>,

        /// Seconds before a hung recognizer call is killed
        #[arg(long)]
        recognizer_timeout: Option<u64>,

        /// Do not keep formula crops in the output directory
        #[arg(long)]
        no_crops: bool,

        /// Only log warnings and errors
        #[arg(short, long)]
        quiet: bool,
    },

    /// Translate one LaTeX formula and print the tree, canonical LaTeX and OMML
    Translate {
        latex: String,

        /// Render as a display (block) equation
        #[arg(long)]
        display: bool,
    },

    /// Show page and region counts of a layout file
    Info {
        layout: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let quiet = matches!(cli.command, Commands::Convert { quiet: true, .. });
    init_logging(quiet);

    match cli.command {
        Commands::Convert {
            layout,
            images,
            output,
            recognizer,
            recognizer_args,
            config,
            batch_size,
            page_concurrency,
            recognizer_timeout,
            no_crops,
            quiet,
        } => {
            let mut conversion = match config {
                Some(path) => ConversionConfig::from_path(&path)?,
                None => ConversionConfig::default(),
            };
            if let Some(batch_size) = batch_size {
                conversion.batch_size = batch_size;
            }
            if let Some(page_concurrency) = page_concurrency {
                conversion.page_concurrency = page_concurrency;
            }
            if let Some(secs) = recognizer_timeout {
                conversion.recognizer_timeout_secs = secs;
            }
            conversion.validate()?;

            let output_dir = output.unwrap_or_else(|| {
                let stem = layout
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "layout".to_string());
                PathBuf::from(format!("{stem}_output"))
            });

            let mut pipeline = PipelineConfig::new(layout, images, output_dir)
                .with_conversion(conversion);
            pipeline.save_crops = !no_crops;

            let recognizer = CommandRecognizer::new(recognizer, pipeline.output.join(".recognizer"))
                .with_args(recognizer_args)
                .with_timeout(Duration::from_secs(pipeline.conversion.recognizer_timeout_secs));
            convert_document(&pipeline, &recognizer, quiet)
        }
        Commands::Translate { latex, display } => translate(&latex, display),
        Commands::Info { layout } => show_info(layout),
    }
}

fn init_logging(quiet: bool) {
    let default_filter = if quiet { "warn" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn convert_document(
    config: &PipelineConfig,
    recognizer: &CommandRecognizer,
    quiet: bool,
) -> Result<()> {
    if !config.layout.is_file() {
        anyhow::bail!("Layout file does not exist: {}", config.layout.display());
    }
    if !config.images.is_dir() {
        anyhow::bail!("Images directory does not exist: {}", config.images.display());
    }

    if !quiet {
        println!("[*] Layout: {}", config.layout.display());
        println!("[*] Images: {}", config.images.display());
        println!("[*] Recognizer: {}", recognizer.program().display());
        println!("[*] Output: {}", config.output.display());
    }

    let report = convert(config, recognizer, &CancelToken::new())
        .with_context(|| format!("Failed to convert {}", config.layout.display()))?;

    if !quiet {
        let totals = &report.totals;
        println!(
            "\n[+] {} pages, {} blocks ({} recovered, {} low confidence, {} fallback formulas)",
            report.pages.len(),
            totals.blocks,
            totals.recovered,
            totals.low_confidence,
            totals.fallback_formulas
        );
        if totals.unsupported_fragments > 0 {
            println!("[!] {} LaTeX fragments kept verbatim", totals.unsupported_fragments);
        }
        for failure in &report.failures {
            println!("[✗] Page {} not converted: {}", failure.page_index + 1, failure.error);
        }
        if report.needs_review() {
            println!("[!] Review crossref.json for degraded content");
        }
        println!("\n[✓] Done! Results saved to: {}", config.output.display());
    }

    Ok(())
}

fn translate(latex: &str, display: bool) -> Result<()> {
    let translation = Translator::default().translate(latex, display);
    let tree = serde_json::to_string_pretty(&translation.tree)
        .context("Failed to serialize equation tree")?;

    println!("Tree");
    println!("====");
    println!("{tree}");
    println!("\nCanonical LaTeX: {}", translation.canonical_latex);
    println!("Unsupported fragments: {}", translation.unsupported_fragments);
    println!("\nOMML");
    println!("====");
    println!("{}", translation.omml);
    Ok(())
}

fn show_info(layout_path: PathBuf) -> Result<()> {
    if !layout_path.exists() {
        anyhow::bail!("Layout file does not exist: {}", layout_path.display());
    }

    let layout = LayoutDocument::load(&layout_path)?;

    println!("Layout Information");
    println!("==================");
    println!("File: {}", layout_path.display());
    println!("Pages: {}", layout.pages.len());
    println!("Regions: {}", layout.region_count());

    for page in &layout.pages {
        match page_regions(page) {
            Ok(regions) => {
                let mut by_kind: BTreeMap<String, usize> = BTreeMap::new();
                for region in &regions {
                    *by_kind.entry(format!("{:?}", region.kind).to_lowercase()).or_default() += 1;
                }
                let counts = by_kind
                    .iter()
                    .map(|(kind, count)| format!("{kind}={count}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                println!("  page {}: {}", page.page_index + 1, counts);
            }
            Err(err) => println!("  page {}: invalid ({err})", page.page_index + 1),
        }
    }

    Ok(())
}
