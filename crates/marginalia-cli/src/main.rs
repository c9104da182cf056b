use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use marginalia_core::{DocumentCache, EngineConfig, Highlight, PreparedDocument, RenderSurface};
use marginalia_lint::{HttpChunkAnalyzer, LineQuery, LintConfig, LintDocument, analyze_document, locate};
use miette::{IntoDiagnostic, Result, WrapErr};
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(version, about = "Marginalia - attach source-offset highlights to rendered markdown", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the plain-text projection of a markdown file and its leaf spans
    Project {
        /// Markdown file
        file: PathBuf,
    },
    /// Render a markdown file to HTML with highlights attached
    Render {
        /// Markdown file
        file: PathBuf,

        /// JSON file holding an array of highlights
        #[arg(long)]
        highlights: PathBuf,

        /// Tag drawn as the active highlight
        #[arg(long)]
        active: Option<String>,
    },
    /// Find a quoted string within a range of lines
    Locate {
        /// Document file
        file: PathBuf,

        /// First line to search (1-based)
        #[arg(long)]
        line_start: usize,

        /// Last line to search (1-based, inclusive)
        #[arg(long)]
        line_end: usize,

        /// Text to find
        #[arg(long)]
        text: String,
    },
    /// Run the spelling and grammar pipeline against a model endpoint
    Analyze {
        /// Document file
        file: PathBuf,

        /// Analyzer endpoint URL
        #[arg(long, env = "MARGINALIA_LINT_ENDPOINT")]
        endpoint: String,

        /// Model name sent with each request
        #[arg(long, env = "MARGINALIA_LINT_MODEL")]
        model: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_miette();
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Project { file } => project(&file)?,
        Commands::Render {
            file,
            highlights,
            active,
        } => render(&file, &highlights, active.as_deref())?,
        Commands::Locate {
            file,
            line_start,
            line_end,
            text,
        } => locate_text(&file, line_start, line_end, &text)?,
        Commands::Analyze {
            file,
            endpoint,
            model,
        } => analyze(&file, endpoint, model).await?,
    }

    Ok(())
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to read {}", path.display()))
}

fn project(file: &Path) -> Result<()> {
    let content = read_file(file)?;
    let config = EngineConfig::from_env()?;
    let doc = PreparedDocument::prepare(&content, &config);
    let projection = doc.projection();

    println!("{}", projection.plain_text());
    println!("---");
    for span in projection.spans() {
        println!("{:?}\t{}..{}", span.node_path, span.start, span.end);
    }
    Ok(())
}

fn render(file: &Path, highlights: &Path, active: Option<&str>) -> Result<()> {
    let content = read_file(file)?;
    let highlights: Vec<Highlight> = serde_json::from_str(&read_file(highlights)?)
        .into_diagnostic()
        .wrap_err("highlights must be a JSON array of {startOffset, endOffset, tag, color}")?;

    let config = EngineConfig::from_env()?;
    let cache = DocumentCache::new(config.clone());
    let mut surface = RenderSurface::new(config);
    surface.set_content(&content, &cache);
    surface.set_highlights(highlights);
    surface.set_active_tag(active);

    tracing::info!(
        target: "marginalia::surface",
        decorations = surface.decorations().len(),
        "rendered document"
    );
    println!("{}", surface.render_html());
    Ok(())
}

fn locate_text(file: &Path, line_start: usize, line_end: usize, text: &str) -> Result<()> {
    let content = read_file(file)?;
    let doc = LintDocument::new(content);
    let query = LineQuery {
        line_start,
        line_end,
        text,
    };
    match locate(&query, &doc) {
        Some(span) => println!(
            "{}..{} ({:?})",
            span.start_offset, span.end_offset, span.matched
        ),
        None => {
            return Err(miette::miette!(
                help = "line numbers are 1-based and the start line must exist",
                "{text:?} not found in lines {line_start}-{line_end}"
            ));
        }
    }
    Ok(())
}

async fn analyze(file: &Path, endpoint: String, model: Option<String>) -> Result<()> {
    let content = read_file(file)?;
    let mut config = LintConfig::from_env()?;
    config.endpoint = Some(endpoint);
    if let Some(model) = model {
        config.model = model;
    }

    let analyzer = HttpChunkAnalyzer::from_config(&config)?;
    let report = analyze_document(&content, &analyzer, &config).await;
    for task in report.failed_tasks() {
        tracing::warn!(
            target: "marginalia::lint",
            chunk = task.chunk,
            attempts = task.attempts,
            "chunk produced no comments"
        );
    }

    let json = serde_json::to_string_pretty(&report).into_diagnostic()?;
    println!("{json}");
    Ok(())
}

fn init_tracing() {
    let default_level = if cfg!(debug_assertions) { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .with_filter(env_filter);

    tracing_subscriber::registry().with(console_layer).init();
}

fn init_miette() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))
    .expect("couldn't set the miette hook");
    miette::set_panic_hook();
}
