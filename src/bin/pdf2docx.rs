//! CLI binary for edgequake-pdf2docx.
//!
//! A thin shim over the library crate: validates the input, picks the output
//! path, confirms overwrites, then runs the job as a background task and
//! renders its events.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdf2docx::{
    inspect, is_ocr_available, resolve_output_path, validate_input, ConversionConfig,
    ConversionEvent, ConversionMode, ConversionResult, ConversionStats, Converter, PageOrigin,
    Strategy,
};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── Terminal progress rendering ──────────────────────────────────────────────

/// Renders task events: a spinner until the page count is known, then a bar
/// with one log line per page.
struct EventRenderer {
    bar: Option<ProgressBar>,
    quiet: bool,
    strategy: Option<Strategy>,
}

impl EventRenderer {
    fn new(show_progress: bool, quiet: bool) -> Self {
        let bar = show_progress.then(|| {
            let bar = ProgressBar::new(0);
            bar.set_style(
                ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner())
                    .tick_strings(TICKS),
            );
            bar.set_prefix("Preparing");
            bar.set_message("Opening PDF…");
            bar.enable_steady_tick(Duration::from_millis(80));
            bar
        });
        Self {
            bar,
            quiet,
            strategy: None,
        }
    }

    fn println(&self, line: String) {
        match &self.bar {
            Some(bar) => bar.println(line),
            None if !self.quiet => eprintln!("{line}"),
            None => {}
        }
    }

    fn activate_bar(&self, total: usize) {
        let Some(bar) = &self.bar else { return };
        if bar.length() == Some(total as u64) {
            return;
        }
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  \
                 [{bar:42.green/238}] {pos:>3}/{len} pages  \
                 ⏱ {elapsed_precise}  ETA {eta_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(TICKS),
        );
        bar.set_length(total as u64);
        bar.set_prefix("Converting");
        bar.reset_eta();
    }

    fn handle(&mut self, event: &ConversionEvent) {
        match event {
            ConversionEvent::Strategy(strategy) => {
                if let Some(previous) = self.strategy {
                    self.println(format!(
                        "{} {} did not succeed; trying {}",
                        yellow("⚠"),
                        previous,
                        bold(&strategy.to_string())
                    ));
                } else {
                    self.println(format!("{} {}", cyan("◆"), bold(&format!("Trying {strategy}…"))));
                }
                self.strategy = Some(*strategy);
                if let Some(bar) = &self.bar {
                    bar.set_position(0);
                    bar.set_length(0);
                }
            }
            ConversionEvent::Progress {
                current_page,
                total_pages,
                origin,
            } => {
                self.activate_bar(*total_pages);
                let mark = match origin {
                    PageOrigin::TextLayer => green("✓"),
                    PageOrigin::Ocr => cyan("✓"),
                    PageOrigin::Placeholder => yellow("⚠"),
                };
                let label = match origin {
                    PageOrigin::TextLayer => "text layer",
                    PageOrigin::Ocr => "OCR",
                    PageOrigin::Placeholder => "placeholder",
                };
                self.println(format!(
                    "  {} Page {:>3}/{:<3}  {}",
                    mark,
                    current_page,
                    total_pages,
                    dim(label)
                ));
                if let Some(bar) = &self.bar {
                    bar.set_position(*current_page as u64);
                }
            }
            ConversionEvent::Succeeded { .. } | ConversionEvent::Failed { .. } => {
                if let Some(bar) = &self.bar {
                    bar.finish_and_clear();
                }
            }
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert next to the input (report.docx, or report_1.docx if taken)
  pdf2docx report.pdf

  # Scanned document in English and Bengali
  pdf2docx --mode ocr --lang eng+ben scan.pdf

  # Text-based PDF only, explicit output, no questions asked
  pdf2docx --mode text paper.pdf -o paper.docx --overwrite

  # Inspect a PDF (page count, text-layer pages, metadata)
  pdf2docx --inspect-only document.pdf

  # Is OCR available on this machine?
  pdf2docx --check-ocr

MODES:
  auto   Auto (Best Quality)     layout reconstruction, per-page + OCR if that fails
  text   Text-based PDF only     layout reconstruction only
  ocr    Scanned PDF with OCR    per-page text layer, OCR for pages without one

ENVIRONMENT VARIABLES:
  TESSERACT_CMD      Path to the tesseract executable
  PDFIUM_LIB_PATH    Path to libpdfium (file or directory)
  PDF2DOCX_*         Defaults for most flags (PDF2DOCX_MODE, PDF2DOCX_DPI, …)
  RUST_LOG           Log filter, e.g. RUST_LOG=edgequake_pdf2docx=debug
"#;

/// Convert PDF files to editable Word documents, with OCR for scanned pages.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2docx",
    version,
    about = "Convert PDF files to editable Word documents, with OCR for scanned pages",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF file to convert.
    #[arg(required_unless_present = "check_ocr")]
    input: Option<PathBuf>,

    /// Write the document here instead of `<input stem>.docx`.
    #[arg(short, long, env = "PDF2DOCX_OUTPUT")]
    output: Option<PathBuf>,

    /// Conversion mode: auto, text, ocr.
    #[arg(long, env = "PDF2DOCX_MODE", default_value = "auto", value_parser = parse_mode)]
    mode: ConversionMode,

    /// Rasterisation DPI for OCR (72–600).
    #[arg(long, env = "PDF2DOCX_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// OCR language set, e.g. eng or eng+ben.
    #[arg(long = "lang", env = "PDF2DOCX_LANG", default_value = "eng")]
    languages: String,

    /// Path to the tesseract executable.
    #[arg(long, env = "TESSERACT_CMD")]
    tesseract_cmd: Option<PathBuf>,

    /// Path to libpdfium (file or directory).
    #[arg(long = "pdfium-lib", env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2DOCX_PASSWORD")]
    password: Option<String>,

    /// Keep each page's text as a single paragraph.
    #[arg(long, env = "PDF2DOCX_NO_SPLIT_PARAGRAPHS")]
    no_split_paragraphs: bool,

    /// Body font size in points (6–72).
    #[arg(long, env = "PDF2DOCX_FONT_SIZE", default_value_t = 12,
          value_parser = clap::value_parser!(u32).range(6..=72))]
    font_size: u32,

    /// Replace an existing output file without asking.
    #[arg(long, env = "PDF2DOCX_OVERWRITE")]
    overwrite: bool,

    /// Print the result as JSON.
    #[arg(long, env = "PDF2DOCX_JSON")]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, env = "PDF2DOCX_NO_PROGRESS")]
    no_progress: bool,

    /// Print PDF metadata only, no conversion.
    #[arg(long)]
    inspect_only: bool,

    /// Report whether the OCR engine can run, then exit.
    #[arg(long)]
    check_ocr: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2DOCX_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2DOCX_QUIET")]
    quiet: bool,
}

fn parse_mode(s: &str) -> Result<ConversionMode, String> {
    s.parse::<ConversionMode>().map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;

    // ── OCR probe ────────────────────────────────────────────────────────
    if cli.check_ocr {
        let available = is_ocr_available(&config);
        if cli.json {
            println!("{}", serde_json::json!({ "ocr_available": available }));
        } else if available {
            println!("{} OCR engine available", green("✔"));
        } else {
            println!(
                "{} OCR engine not found. Install tesseract-ocr or set TESSERACT_CMD.",
                red("✘")
            );
        }
        if !available {
            std::process::exit(1);
        }
        return Ok(());
    }

    let input = cli
        .input
        .as_deref()
        .context("An input PDF is required")?;
    let input = validate_input(input).context("Invalid input")?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let meta = inspect(&input, &config).context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", input.display());
            if let Some(ref t) = meta.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = meta.author {
                println!("Author:       {}", a);
            }
            if let Some(ref s) = meta.subject {
                println!("Subject:      {}", s);
            }
            println!("Pages:        {}", meta.page_count);
            println!(
                "Text layer:   {} of {} pages",
                meta.text_layer_pages, meta.page_count
            );
            println!("PDF Version:  {}", meta.pdf_version);
            if let Some(ref p) = meta.producer {
                println!("Producer:     {}", p);
            }
            if let Some(ref c) = meta.creator {
                println!("Creator:      {}", c);
            }
        }
        return Ok(());
    }

    // ── Output path & overwrite confirmation ─────────────────────────────
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| resolve_output_path(&input));
    if output.exists() && !cli.overwrite && !confirm_overwrite(&output)? {
        anyhow::bail!("Not overwriting '{}'", output.display());
    }

    let converter = Converter::new(config);

    if cli.mode != ConversionMode::TextOnly && !converter.is_ocr_available() && !cli.quiet {
        eprintln!(
            "{} OCR engine not found; pages without a text layer will get placeholder text.\n  \
             Install tesseract-ocr or set TESSERACT_CMD.",
            yellow("⚠")
        );
    }

    // ── Run conversion ───────────────────────────────────────────────────
    let task = converter
        .start(&input, &output, cli.mode)
        .context("Failed to start conversion")?;

    let mut renderer = EventRenderer::new(show_progress, cli.quiet || cli.json);
    let mut terminal = None;
    let mut events = task.into_stream();
    while let Some(event) = events.next().await {
        renderer.handle(&event);
        if event.is_terminal() {
            terminal = Some(event);
            break;
        }
    }

    let result = match terminal {
        Some(ConversionEvent::Succeeded {
            output_path,
            strategy,
            stats,
        }) => ConversionResult::succeeded(output_path, strategy, stats),
        Some(ConversionEvent::Failed { message }) => {
            ConversionResult::failed(output.clone(), message, ConversionStats::default())
        }
        _ => ConversionResult::failed(
            output.clone(),
            "conversion worker exited without a result",
            ConversionStats::default(),
        ),
    };

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("Failed to serialise result")?
        );
    } else if !cli.quiet && result.success {
        print_summary(&result);
    }

    if !result.success {
        anyhow::bail!(
            "Conversion failed: {}",
            result.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

fn print_summary(result: &ConversionResult) {
    let s = &result.stats;
    eprintln!(
        "{}  {} pages  {}ms  →  {}",
        if s.recovered_pages == 0 {
            green("✔")
        } else {
            yellow("⚠")
        },
        s.total_pages,
        s.duration_ms,
        bold(&result.output_path.display().to_string()),
    );
    if let Some(strategy) = result.strategy {
        eprintln!(
            "   {}  {} text layer  /  {} OCR  /  {} placeholder  —  {} paragraphs",
            dim(&strategy.to_string()),
            s.text_layer_pages,
            s.ocr_pages,
            s.recovered_pages,
            s.paragraphs,
        );
    }
}

/// Ask before replacing `path`. Without a terminal there is nobody to ask.
fn confirm_overwrite(path: &Path) -> Result<bool> {
    let stdin = io::stdin();
    if !stdin.is_terminal() {
        anyhow::bail!(
            "Output '{}' already exists; pass --overwrite to replace it",
            path.display()
        );
    }
    eprint!("'{}' already exists. Overwrite? [y/N] ", path.display());
    io::stderr().flush().ok();

    let mut answer = String::new();
    stdin
        .lock()
        .read_line(&mut answer)
        .context("Failed to read answer")?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .dpi(cli.dpi)
        .ocr_language(cli.languages.clone())
        .split_paragraphs(!cli.no_split_paragraphs)
        .font_size_pt(cli.font_size);

    if let Some(ref cmd) = cli.tesseract_cmd {
        builder = builder.tesseract_cmd(cmd);
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_library_path(lib);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd);
    }

    builder.build().context("Invalid configuration")
}
