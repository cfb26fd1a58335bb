//! CLI binary for doc2json.
//!
//! A thin shim over the library crate: maps flags to `GenerationConfig`,
//! drives one `Session` either once (document + schema from the command line)
//! or interactively, and prints results.

mod repl;

use anyhow::{bail, Context, Result};
use clap::Parser;
use doc2json::{
    write_artifact, ChatCompletionsClient, Doc2JsonError, GenerationConfig, ModelId, Session,
    WorkflowObserver,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
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

// ── Busy indicator using indicatif ───────────────────────────────────────────

/// Spinner shown while text is extracted or the model is working.
///
/// A fresh spinner is started for every stage. Extraction failures fire no
/// completion event, so callers also [`clear`](Self::clear) after each step.
struct CliObserver {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliObserver {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            bar: Mutex::new(None),
        })
    }

    fn start(&self, prefix: &'static str, message: String) {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix(prefix);
        bar.set_message(message);
        bar.enable_steady_tick(Duration::from_millis(80));

        if let Ok(mut slot) = self.bar.lock() {
            if let Some(previous) = slot.replace(bar) {
                previous.finish_and_clear();
            }
        }
    }

    fn clear(&self) {
        if let Ok(mut slot) = self.bar.lock() {
            if let Some(bar) = slot.take() {
                bar.finish_and_clear();
            }
        }
    }
}

impl WorkflowObserver for CliObserver {
    fn on_extraction_start(&self, document_name: &str) {
        self.start("Extracting", format!("{document_name}…"));
    }

    fn on_extraction_complete(&self, _elements: usize, _chars: usize) {
        self.clear();
    }

    fn on_generation_start(&self, model: &str) {
        self.start("Generating", format!("waiting for {model}…"));
    }

    fn on_generation_complete(&self, _success: bool) {
        self.clear();
    }
}

fn clear_spinner(spinner: Option<&CliObserver>) {
    if let Some(s) = spinner {
        s.clear();
    }
}

/// Print the extra detail a failure carries: a warning line for
/// non-fatal conditions, the model's raw reply for parse failures.
fn report_failure(err: &Doc2JsonError) {
    if err.is_warning() {
        eprintln!("{} {}", yellow("⚠"), err);
        return;
    }
    eprintln!("{} {}", red("✘"), err);
    if let Some(raw) = err.raw_output() {
        eprintln!("{}", bold("Raw model output:"));
        eprintln!("{raw}");
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Generate JSON for an invoice (printed to stdout)
  doc2json invoice.pdf --schema invoice_schema.json

  # Save as invoice_structured.json in the current directory
  doc2json invoice.pdf --schema invoice_schema.json -o .

  # Use a larger model and show what was sent
  doc2json --model llama3-70b-8192 --show-text --show-schema report.docx -s schema.json

  # Pipe clean JSON into another tool
  doc2json --json-only --quiet data.xlsx -s schema.json | jq .

  # Interactive session
  doc2json --interactive

SUPPORTED DOCUMENTS:
  .pdf .docx .csv .xlsx .html .md .txt

MODELS:
  llama3-8b-8192 (default)   llama3-70b-8192   mixtral-8x7b-32768   gemma-7b-it

ENVIRONMENT VARIABLES:
  GROQ_API_KEY            API key for the hosted model
  DOC2JSON_MODEL          Override model ID
  DOC2JSON_BASE_URL       OpenAI-compatible API root (default: Groq)
  PDFIUM_LIB_PATH         Path to libpdfium (otherwise the system library is used)
  RUST_LOG                Log filter, e.g. doc2json=debug
"#;

/// Turn a document into JSON that follows your schema, using a hosted LLM.
#[derive(Parser, Debug)]
#[command(
    name = "doc2json",
    version,
    about = "Turn a document into JSON that follows your schema, using a hosted LLM",
    long_about = "Extract the text of a document (PDF, DOCX, CSV, XLSX, HTML, Markdown or \
plain text), send it with an example JSON schema to a hosted language model, and print or \
save the JSON the model returns.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Document to extract text from.
    #[arg(required_unless_present = "interactive")]
    document: Option<PathBuf>,

    /// JSON file whose shape the output should follow.
    #[arg(short, long, required_unless_present = "interactive")]
    schema: Option<PathBuf>,

    /// Model used for generation.
    #[arg(long, env = "DOC2JSON_MODEL", value_enum, default_value = "llama3-8b-8192")]
    model: ModelArg,

    /// API key for the hosted model.
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// OpenAI-compatible API root.
    #[arg(long, env = "DOC2JSON_BASE_URL")]
    base_url: Option<String>,

    /// Sampling temperature (0.0–2.0). Provider default when unset.
    #[arg(long, env = "DOC2JSON_TEMPERATURE")]
    temperature: Option<f32>,

    /// Write the JSON to this file (or into this directory as
    /// `<document>_structured.json`) instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the extracted text before generating.
    #[arg(long, conflicts_with = "json_only")]
    show_text: bool,

    /// Print the loaded schema before generating.
    #[arg(long, conflicts_with = "json_only")]
    show_schema: bool,

    /// Print only the generated JSON, without section headings.
    #[arg(long)]
    json_only: bool,

    /// Start an interactive session instead of a one-shot run.
    #[arg(short, long, conflicts_with_all = ["document", "schema", "output"])]
    interactive: bool,

    /// Disable the busy spinner.
    #[arg(long, env = "DOC2JSON_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOC2JSON_VERBOSE")]
    verbose: bool,

    /// Suppress all output except the result and errors.
    #[arg(short, long, env = "DOC2JSON_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ModelArg {
    #[value(name = "llama3-8b-8192")]
    Llama3_8b,
    #[value(name = "llama3-70b-8192")]
    Llama3_70b,
    #[value(name = "mixtral-8x7b-32768")]
    Mixtral8x7b,
    #[value(name = "gemma-7b-it")]
    Gemma7b,
}

impl From<ModelArg> for ModelId {
    fn from(v: ModelArg) -> Self {
        match v {
            ModelArg::Llama3_8b => ModelId::Llama3_8b,
            ModelArg::Llama3_70b => ModelId::Llama3_70b,
            ModelArg::Mixtral8x7b => ModelId::Mixtral8x7b,
            ModelArg::Gemma7b => ModelId::Gemma7b,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner gives all the feedback that matters; keep library INFO
    // logs out of its way unless the user asked for them.
    let show_progress = !cli.quiet && !cli.no_progress;
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

    // ── Build config and session ─────────────────────────────────────────
    let config = build_config(&cli)?;
    let client =
        ChatCompletionsClient::from_config(&config).context("Failed to create HTTP client")?;

    let spinner = show_progress.then(CliObserver::new);
    let mut session = Session::new();
    if let Some(ref s) = spinner {
        session = session.with_observer(s.clone());
    }

    if cli.interactive {
        return repl::run_repl(&mut session, &client, config, spinner.as_deref()).await;
    }

    run_once(&cli, &mut session, &client, &config, spinner.as_deref()).await
}

/// Map CLI args to `GenerationConfig`.
fn build_config(cli: &Cli) -> Result<GenerationConfig> {
    let mut builder = GenerationConfig::builder().model(cli.model.into());
    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key.clone());
    }
    if let Some(ref url) = cli.base_url {
        builder = builder.base_url(url.clone());
    }
    if let Some(t) = cli.temperature {
        builder = builder.temperature(t);
    }
    builder.build().context("Invalid configuration")
}

/// Document upload, schema upload, generate, then print or save.
async fn run_once(
    cli: &Cli,
    session: &mut Session,
    client: &ChatCompletionsClient,
    config: &GenerationConfig,
    spinner: Option<&CliObserver>,
) -> Result<()> {
    let (Some(document), Some(schema)) = (cli.document.as_ref(), cli.schema.as_ref()) else {
        bail!("Both a document and --schema are required (or use --interactive)");
    };

    // ── Document ─────────────────────────────────────────────────────────
    let loaded = session.load_document_file(document).await.map(|t| t.chars().count());
    clear_spinner(spinner);
    let chars = loaded
        .with_context(|| format!("Failed to extract text from {}", document.display()))?;
    if !cli.quiet {
        eprintln!(
            "{} Extracted text from {}  {}",
            green("✓"),
            bold(&document.display().to_string()),
            dim(&format!("{chars} chars")),
        );
    }

    // ── Schema ───────────────────────────────────────────────────────────
    session
        .load_schema_file(schema)
        .await
        .with_context(|| format!("Failed to load schema from {}", schema.display()))?;
    if !cli.quiet {
        eprintln!(
            "{} Loaded schema {}",
            green("✓"),
            bold(&schema.display().to_string())
        );
    }

    if cli.show_text {
        print_section("Extracted Text", session.extracted_text().unwrap_or_default());
    }
    if cli.show_schema {
        if let Some(rendered) = session.render_schema() {
            print_section("JSON Schema", &rendered);
        }
    }

    // ── Generate ─────────────────────────────────────────────────────────
    let outcome = session.generate(client, config).await.map(|_| ());
    clear_spinner(spinner);
    if let Err(e) = outcome {
        // already reported; exit without the anyhow trailer
        report_failure(&e);
        std::process::exit(if e.is_warning() { 2 } else { 1 });
    }

    let artifact = session
        .download()
        .context("Generation reported success but produced no JSON")?;

    // ── Output ───────────────────────────────────────────────────────────
    if let Some(ref dest) = cli.output {
        let path = write_artifact(&artifact, dest)
            .await
            .context("Failed to write output")?;
        if !cli.quiet {
            eprintln!(
                "{} Saved {}  {}",
                green("✔"),
                bold(&path.display().to_string()),
                dim(artifact.mime_type),
            );
        }
    } else if cli.json_only {
        println!("{}", artifact.contents);
    } else {
        print_section("Generated JSON", &artifact.contents);
    }

    Ok(())
}

fn print_section(title: &str, body: &str) {
    println!("{}", bold(title));
    println!("{body}");
    if !body.ends_with('\n') {
        println!();
    }
}
