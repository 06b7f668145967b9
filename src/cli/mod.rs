//! # CLI Module
//!
//! Command-line interface for the PDF pair comparison tool.
//!
//! ## Usage
//! ```bash
//! # Compare the text layers of every pair
//! pdf-compare compare input/from input/to output
//!
//! # Page-by-page pixel diff
//! pdf-compare compare input/from input/to output --extractor raster --comparator pixel-diff --pages all
//!
//! # Everything from a settings file, JSON summary
//! pdf-compare compare --config run.json --output json
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use pdf_pair_compare::config::Settings;
use pdf_pair_compare::core::comparator::{ComparatorKind, EmbeddingModelKind, ScoreDetails};
use pdf_pair_compare::core::extract::{ExtractorKind, PageSelection};
use pdf_pair_compare::core::pipeline::{Pipeline, PipelineResult};
use pdf_pair_compare::core::report::format_score;
use pdf_pair_compare::events::{event_channel, Event, PairEvent, PairingEvent, PipelineEvent};
use pdf_pair_compare::Result;
use std::path::PathBuf;
use std::thread;

/// PDF Pair Compare - See what changed between two sets of documents
#[derive(Parser, Debug)]
#[command(name = "pdf-compare")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compare documents that share a file name across two directories
    Compare(CompareArgs),
}

#[derive(clap::Args, Debug)]
struct CompareArgs {
    /// Directory of reference documents
    from: Option<PathBuf>,

    /// Directory of documents to compare against
    to: Option<PathBuf>,

    /// Output directory for the report
    result: Option<PathBuf>,

    /// Settings file (defaults to the one in the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// How to turn each PDF into comparable content
    #[arg(short, long)]
    extractor: Option<Extractor>,

    /// How to score the difference
    #[arg(short = 'm', long)]
    comparator: Option<Metric>,

    /// Which pages take part
    #[arg(short, long)]
    pages: Option<Pages>,

    /// File name suffix of documents to pair
    #[arg(long)]
    extension: Option<String>,

    /// Number of pairs processed at once
    #[arg(short, long)]
    workers: Option<usize>,

    /// OCR languages, e.g. eng,deu
    #[arg(long, value_delimiter = ',')]
    languages: Option<Vec<String>>,

    /// Rasterization resolution
    #[arg(long)]
    dpi: Option<u32>,

    /// Write a side-by-side HTML page per pair
    #[arg(long)]
    html: bool,

    /// Keep rendered pages and text dumps in the output directory
    #[arg(long)]
    keep_intermediate: bool,

    /// Pair and report in file name order
    #[arg(long)]
    sort: bool,

    /// Compare the embedded text without font markup
    #[arg(long)]
    only_diff_text: bool,

    /// Per-channel difference still counted as a match (pixel diff)
    #[arg(long)]
    pixel_tolerance: Option<u8>,

    /// Model behind the embedding comparator
    #[arg(long)]
    embedding_model: Option<Model>,

    /// Output format
    #[arg(short, long, default_value = "pretty")]
    output: OutputFormat,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Extractor {
    /// Render pages to images (needs pdftoppm)
    Raster,
    /// Render pages, then OCR them (needs pdftoppm and tesseract)
    Ocr,
    /// Read the PDF text layer
    EmbeddedText,
}

impl From<Extractor> for ExtractorKind {
    fn from(extractor: Extractor) -> Self {
        match extractor {
            Extractor::Raster => ExtractorKind::Raster,
            Extractor::Ocr => ExtractorKind::Ocr,
            Extractor::EmbeddedText => ExtractorKind::EmbeddedText,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Metric {
    /// Percentage of differing pixels
    PixelDiff,
    /// Cosine distance between page embeddings
    EmbeddingSimilarity,
    /// Correlation of page intensities
    StructuralSimilarity,
    /// Characters inserted or deleted
    CharDiff,
}

impl From<Metric> for ComparatorKind {
    fn from(metric: Metric) -> Self {
        match metric {
            Metric::PixelDiff => ComparatorKind::PixelDiff,
            Metric::EmbeddingSimilarity => ComparatorKind::EmbeddingSimilarity,
            Metric::StructuralSimilarity => ComparatorKind::StructuralSimilarity,
            Metric::CharDiff => ComparatorKind::CharDiff,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Pages {
    /// First page only (default)
    First,
    /// Every page
    All,
}

impl From<Pages> for PageSelection {
    fn from(pages: Pages) -> Self {
        match pages {
            Pages::First => PageSelection::First,
            Pages::All => PageSelection::All,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Model {
    /// Built-in grayscale thumbnail
    Thumbnail,
    /// CLIP ViT-B/32 (needs the `clip` feature)
    Clip,
}

impl From<Model> for EmbeddingModelKind {
    fn from(model: Model) -> Self {
        match model {
            Model::Thumbnail => EmbeddingModelKind::Thumbnail,
            Model::Clip => EmbeddingModelKind::Clip,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
    /// Minimal output (ids of pairs that differ)
    Minimal,
}

impl CompareArgs {
    /// Flags given on the command line, as settings overrides.
    /// Switches left off stay unset so the settings file can turn them on.
    fn overrides(&self) -> Settings {
        Settings {
            from: self.from.clone(),
            to: self.to.clone(),
            result: self.result.clone(),
            only_diff_text: self.only_diff_text.then_some(true),
            extractor: self.extractor.map(Into::into),
            comparator: self.comparator.map(Into::into),
            pages: self.pages.map(Into::into),
            extension: self.extension.clone(),
            workers: self.workers,
            languages: self.languages.clone(),
            dpi: self.dpi,
            html: self.html.then_some(true),
            keep_intermediate: self.keep_intermediate.then_some(true),
            sort: self.sort.then_some(true),
            pixel_tolerance: self.pixel_tolerance,
            embedding_model: self.embedding_model.map(Into::into),
            pdftoppm_path: None,
            tesseract_path: None,
        }
    }
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Compare(args) => {
            pdf_pair_compare::init_tracing(args.verbose);
            run_compare(args)
        }
    }
}

fn run_compare(args: CompareArgs) -> Result<()> {
    let term = Term::stderr();
    let output = args.output;
    let verbose = args.verbose;

    // Print header
    if matches!(output, OutputFormat::Pretty) {
        term.write_line(&format!(
            "{} {}",
            style("PDF Pair Compare").bold().cyan(),
            style(concat!("v", env!("CARGO_PKG_VERSION"))).dim()
        ))
        .ok();
        term.write_line("").ok();
    }

    let settings = Settings::discover(args.config.as_deref())?.merge(args.overrides());
    let config = settings.into_pipeline_config()?;

    if verbose && matches!(output, OutputFormat::Pretty) {
        term.write_line(&format!(
            "  {} {} -> {} ({} pages, {} workers)",
            style("Strategy:").dim(),
            config.extractor,
            config.comparator,
            config.pages,
            config.workers
        ))
        .ok();
    }

    let pipeline = Pipeline::builder().config(config).build();

    // Set up event handling
    let (sender, receiver) = event_channel();

    // Progress bar for pretty output
    let progress = if matches!(output, OutputFormat::Pretty) {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        Some(pb)
    } else {
        None
    };

    let progress_clone = progress.clone();

    // Handle events in a separate thread
    let event_thread = thread::spawn(move || {
        for event in receiver.iter() {
            let Some(ref pb) = progress_clone else {
                continue;
            };
            match event {
                Event::Pipeline(PipelineEvent::PhaseChanged { phase }) => {
                    pb.set_message(format!("{}", phase));
                }
                Event::Pairing(PairingEvent::CountMismatch {
                    from_count,
                    to_count,
                }) => {
                    pb.println(format!(
                        "{} Number of files differ: from has {}, to has {}",
                        style("!").yellow().bold(),
                        from_count,
                        to_count
                    ));
                }
                Event::Pair(PairEvent::Started { total_pairs }) => {
                    pb.set_length(total_pairs as u64);
                }
                Event::Pair(PairEvent::Progress(p)) => {
                    pb.set_position(p.completed as u64);
                    if verbose {
                        pb.set_message(format!("{} (failed: {})", p.pair_id, p.failed));
                    }
                }
                Event::Pair(PairEvent::Failed {
                    pair_id,
                    kind,
                    message,
                }) if verbose => {
                    pb.println(format!(
                        "{} {} {}: {}",
                        style("✗").red(),
                        pair_id,
                        style(kind).red(),
                        message
                    ));
                }
                Event::Pipeline(PipelineEvent::Completed { .. })
                | Event::Pipeline(PipelineEvent::Error { .. }) => {
                    pb.finish_and_clear();
                }
                _ => {}
            }
        }
    });

    // Run the pipeline
    let result = pipeline.run_with_events(&sender);

    // Drop sender to signal event thread to finish
    drop(sender);
    event_thread.join().ok();
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    let result = result?;

    // Output results
    match output {
        OutputFormat::Pretty => print_pretty_results(&term, &result, verbose),
        OutputFormat::Json => print_json_results(&result),
        OutputFormat::Minimal => print_minimal_results(&result),
    }

    Ok(())
}

fn print_pretty_results(term: &Term, result: &PipelineResult, verbose: bool) {
    term.write_line("").ok();
    term.write_line(&format!(
        "{} Comparison {}",
        style("✓").green().bold(),
        result.state
    ))
    .ok();
    term.write_line("").ok();

    // Summary
    term.write_line(&format!(
        "  {} pairs compared in {:.1}s",
        style(result.total_pairs).cyan(),
        result.duration_ms as f64 / 1000.0
    ))
    .ok();

    let differing = result.results.iter().filter(|r| r.score > 0.0).count();
    term.write_line(&format!(
        "  {} pairs differ",
        style(differing).cyan()
    ))
    .ok();

    if !result.failures.is_empty() {
        term.write_line(&format!(
            "  {} pairs failed",
            style(result.failures.len()).red()
        ))
        .ok();
    }

    if let Some(mismatch) = &result.count_mismatch {
        term.write_line(&format!("  {} {}", style("!").yellow().bold(), mismatch))
            .ok();
    }

    term.write_line("").ok();

    if result.results.is_empty() && result.failures.is_empty() {
        term.write_line(&format!(
            "  {} No documents share a file name",
            style("○").dim()
        ))
        .ok();
    }

    if !result.results.is_empty() {
        term.write_line(&format!("{}", style("Scores:").bold().underlined()))
            .ok();
        term.write_line("").ok();

        for row in &result.results {
            let score = format!("{:>7}%", format_score(row.score));
            let score = if row.score == 0.0 {
                style(score).green()
            } else {
                style(score).yellow()
            };
            term.write_line(&format!("    {} {}", score, row.pair_id)).ok();

            if verbose {
                if let Some(details) = describe(&row.details) {
                    term.write_line(&format!("             {}", style(details).dim()))
                        .ok();
                }
            }
        }
        term.write_line("").ok();
    }

    if !result.failures.is_empty() {
        term.write_line(&format!("{}", style("Failures:").bold().underlined()))
            .ok();
        term.write_line("").ok();

        for row in &result.failures {
            if let Some(failure) = &row.error {
                term.write_line(&format!(
                    "    {} {} {}",
                    style("✗").red(),
                    row.pair_id,
                    style(failure.kind).red()
                ))
                .ok();
                if verbose {
                    term.write_line(&format!("      {}", style(&failure.message).dim()))
                        .ok();
                }
            }
        }
        term.write_line("").ok();
    }

    // Footer
    term.write_line(&format!(
        "{} {}",
        style("Report written to").dim(),
        result.report_dir.display()
    ))
    .ok();
}

fn describe(details: &ScoreDetails) -> Option<String> {
    match details {
        ScoreDetails::Text {
            from_len,
            to_len,
            inserted,
            deleted,
        } => Some(format!(
            "{} -> {} chars, +{} -{}",
            from_len, to_len, inserted, deleted
        )),
        ScoreDetails::Pixel { mismatched, total } => {
            Some(format!("{} of {} pixels differ", mismatched, total))
        }
        ScoreDetails::Embedding { cosine } => Some(format!("cosine {:.4}", cosine)),
        ScoreDetails::Structural { correlation } => Some(format!("correlation {:.4}", correlation)),
        ScoreDetails::None => None,
    }
}

fn print_json_results(result: &PipelineResult) {
    let output = serde_json::json!({
        "state": result.state,
        "total_pairs": result.total_pairs,
        "compared": result.results.len(),
        "failed": result.failures.len(),
        "count_mismatch": result.count_mismatch.as_ref().map(|m| m.to_string()),
        "duration_ms": result.duration_ms,
        "report_dir": result.report_dir,
        "results": result.results.iter().map(|r| {
            serde_json::json!({
                "pair_id": r.pair_id,
                "metric": r.metric,
                "score": r.score,
                "pages": r.pages,
                "details": r.details,
            })
        }).collect::<Vec<_>>(),
        "failures": result.failures.iter().map(|r| {
            serde_json::json!({
                "pair_id": r.pair_id,
                "kind": r.error.as_ref().map(|e| e.kind),
                "message": r.error.as_ref().map(|e| e.message.as_str()),
            })
        }).collect::<Vec<_>>()
    });

    println!("{:#}", output);
}

fn print_minimal_results(result: &PipelineResult) {
    for row in result.results.iter().filter(|r| r.score > 0.0) {
        println!("{}", row.pair_id);
    }
}
