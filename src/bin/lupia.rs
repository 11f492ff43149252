//! CLI binary for lupia.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ReviewConfig`, runs the review and writes the report.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use lupia::{
    run_review_files, write_report, Credential, ProgressCallback, ReviewConfig,
    ReviewProgressCallback, RunResult, StageKind,
};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner plus one log line per stage. Stage
/// events can interleave when the technical reviews run concurrently.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<StageKind, Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading documents…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
        })
    }

    fn elapsed(&self, stage: StageKind) -> f64 {
        self.start_times
            .lock()
            .map(|mut m| m.remove(&stage))
            .ok()
            .flatten()
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ReviewProgressCallback for CliProgressCallback {
    fn on_documents_ready(&self, pliego_chars: usize, oferta_chars: usize) {
        self.bar.println(format!(
            "{} {}  {}",
            cyan("◆"),
            bold("Documents extracted"),
            dim(&format!("pliego {pliego_chars} chars, oferta {oferta_chars} chars")),
        ));
        self.bar.set_prefix("Reviewing");
    }

    fn on_stage_start(&self, stage: StageKind) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(stage, Instant::now());
        }
        self.bar.set_message(stage.report_title().to_string());
    }

    fn on_stage_complete(&self, stage: StageKind, output_chars: usize) {
        let secs = self.elapsed(stage);
        self.bar.println(format!(
            "  {} {:<30}  {:<12}  {}",
            green("✓"),
            stage.report_title(),
            dim(&format!("{output_chars:>6} chars")),
            dim(&format!("{secs:.1}s")),
        ));
    }

    fn on_stage_error(&self, stage: StageKind, error: &str) {
        let secs = self.elapsed(stage);
        // Truncate very long error messages to keep output tidy.
        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} {:<30}  {}  {}",
            red("✗"),
            stage.report_title(),
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
    }

    fn on_report_built(&self, report_bytes: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} Report built ({})",
            green("✔"),
            dim(&format!("{report_bytes} bytes"))
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Review a bid against its specification
  lupia pliego.pdf oferta.pdf

  # Choose where the report goes
  lupia pliego.pdf oferta.pdf -o informes/licitacion-42.pdf

  # Also keep the three reviews as Markdown
  lupia pliego.pdf oferta.pdf --markdown-dir informes/

  # Technical reviews in parallel
  lupia pliego.pdf oferta.pdf --concurrent

  # Machine-readable output
  lupia --json pliego.pdf oferta.pdf > resultado.json

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY     API key (never logged or stored)
  LUPIA_MODEL        Override the model (default gpt-4o-mini)
  LUPIA_BASE_URL     OpenAI-compatible endpoint
  RUST_LOG           Override the log filter (e.g. lupia=debug)
"#;

/// Review a procurement bid (oferta) against its specification (pliego).
#[derive(Parser, Debug)]
#[command(
    name = "lupia",
    version,
    about = "Review a procurement bid against its specification with three LLM reviewers",
    long_about = "Extract the text of a pliego and an oferta, run two independent technical \
reviews and a consensus review through an OpenAI-compatible model, and write a PDF report.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Pliego (requirements specification): local PDF path.
    pliego: PathBuf,

    /// Oferta (vendor bid): local PDF path.
    oferta: PathBuf,

    /// Provider API key.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model ID used for all three stages.
    #[arg(long, env = "LUPIA_MODEL", default_value = lupia::config::DEFAULT_MODEL)]
    model: String,

    /// Base URL of an OpenAI-compatible API.
    #[arg(long, env = "LUPIA_BASE_URL")]
    base_url: Option<String>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "LUPIA_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Max LLM output tokens per stage.
    #[arg(long, env = "LUPIA_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// Characters of each document sent to the reviewers.
    #[arg(long, env = "LUPIA_CHAR_LIMIT", default_value_t = lupia::config::DEFAULT_CHAR_LIMIT)]
    char_limit: usize,

    /// Per-call LLM timeout in seconds.
    #[arg(long, env = "LUPIA_API_TIMEOUT", default_value_t = 180)]
    api_timeout: u64,

    /// Retries per stage on LLM failure (0 or 1).
    #[arg(
        long,
        env = "LUPIA_MAX_RETRIES",
        default_value_t = 1,
        value_parser = clap::value_parser!(u32).range(0..=1)
    )]
    max_retries: u32,

    /// Run the two technical reviews concurrently.
    #[arg(long, env = "LUPIA_CONCURRENT")]
    concurrent: bool,

    /// Where to write the PDF report.
    #[arg(short, long, env = "LUPIA_OUTPUT", default_value = lupia::config::DEFAULT_REPORT_FILENAME)]
    output: PathBuf,

    /// Also write the three reviews as Markdown files into this directory.
    #[arg(long, env = "LUPIA_MARKDOWN_DIR")]
    markdown_dir: Option<PathBuf>,

    /// Print the run result as JSON instead of the review texts.
    #[arg(long)]
    json: bool,

    /// Disable progress output.
    #[arg(long, env = "LUPIA_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "LUPIA_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "LUPIA_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress spinner is active.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
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

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ReviewProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;
    let credential = cli.api_key.clone().map(Credential::from);

    // ── Run review ───────────────────────────────────────────────────────
    let result = run_review_files(&cli.pliego, &cli.oferta, credential, &config)
        .await
        .context("Review failed")?;

    write_report(&result, &cli.output)
        .await
        .context("Failed to write report")?;

    if let Some(ref dir) = cli.markdown_dir {
        write_markdown(&result, dir).await?;
    }

    if cli.json {
        let json = serde_json::to_string_pretty(&result).context("Failed to serialise result")?;
        println!("{json}");
    } else if !cli.quiet {
        print_reviews(&result).context("Failed to write to stdout")?;
    }

    if !cli.quiet && !cli.json {
        eprintln!(
            "{}  report  →  {}",
            green("✔"),
            bold(&cli.output.display().to_string()),
        );
        eprintln!(
            "   {} tokens in  /  {} tokens out  —  {}ms total",
            dim(&result.stats.total_input_tokens.to_string()),
            dim(&result.stats.total_output_tokens.to_string()),
            result.stats.total_duration_ms,
        );
    }

    Ok(())
}

/// Map CLI args to `ReviewConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ReviewConfig> {
    let mut builder = ReviewConfig::builder()
        .model(cli.model.clone())
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .char_limit(cli.char_limit)
        .api_timeout_secs(cli.api_timeout)
        .max_retries(cli.max_retries)
        .concurrent_reviews(cli.concurrent);

    if let Some(ref url) = cli.base_url {
        builder = builder.base_url(url.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Print the three reviews the way the web front-end showed them.
fn print_reviews(result: &RunResult) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    for stage in result.stages() {
        writeln!(handle, "## {}\n", stage.stage.display_heading())?;
        handle.write_all(stage.output_text.as_bytes())?;
        if !stage.output_text.ends_with('\n') {
            handle.write_all(b"\n")?;
        }
        writeln!(handle)?;
    }
    Ok(())
}

/// One Markdown file per stage, named after the stage label.
async fn write_markdown(result: &RunResult, dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {:?}", dir))?;
    for stage in result.stages() {
        let path = dir.join(format!("{}.md", stage.stage.label()));
        let body = format!("# {}\n\n{}\n", stage.stage.display_heading(), stage.output_text);
        tokio::fs::write(&path, body)
            .await
            .with_context(|| format!("Failed to write {:?}", path))?;
    }
    Ok(())
}
