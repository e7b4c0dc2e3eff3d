//! Command-line interface for franx.
//!
//! Provides commands for annotating articles, rendering per-role sentence
//! views, summarising framing, running the prediction models and showing
//! the resolved configuration.

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::adapters::{fetch_article, HttpClassifier, HttpExtractor};
use crate::annotate::{render_page, Annotator, SentenceOptions};
use crate::config::{self, ResolvedConfig};
use crate::core::{
    fine_role_breakdown, framing_rows, render_sentence_report, role_distribution, Predictor,
};
use crate::domain::{LabelSet, RoleFilter};
use crate::ingest::{load_labels, to_jsonl, write_jsonl, LoadOptions};

/// franx - Entity framing annotator
#[derive(Parser, Debug)]
#[command(name = "franx")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Label selection shared by the label-reading commands
#[derive(clap::Args, Debug, Clone)]
pub struct LabelArgs {
    /// Label file (.csv, .json or .jsonl)
    #[arg(short, long)]
    pub labels: PathBuf,

    /// Only use labels for this article ID
    #[arg(short, long)]
    pub article: Option<String>,

    /// Comma-separated main roles to show (default from config)
    #[arg(short, long, value_parser = parse_roles)]
    pub roles: Option<RoleFilter>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Highlight every labelled mention in an article
    Annotate {
        /// Article text file ("-" for stdin)
        #[arg(short, long, default_value = "-")]
        text: PathBuf,

        /// Fetch the article from a web page instead
        #[arg(long, conflicts_with = "text")]
        url: Option<String>,

        #[command(flatten)]
        labels: LabelArgs,

        /// Only highlight the first mention of each entity
        #[arg(long)]
        hide_repeat: bool,

        /// Emit a standalone HTML page instead of a fragment
        #[arg(long)]
        page: bool,

        /// Output file (stdout if not provided)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Annotated sentences grouped by main role
    Sentences {
        #[command(flatten)]
        labels: LabelArgs,

        /// Minimum mention confidence (default from config)
        #[arg(long)]
        threshold: Option<f64>,

        /// Only highlight the first mention of each entity per role
        #[arg(long)]
        hide_repeat: bool,

        /// Fine role names only in tooltips
        #[arg(long)]
        compact: bool,

        /// Also list the sentences of this fine role under each main role
        #[arg(long)]
        fine_role: Option<String>,

        /// Emit a standalone HTML page instead of a fragment
        #[arg(long)]
        page: bool,

        /// Output file (stdout if not provided)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Summarise role distribution and fine roles
    Framing {
        #[command(flatten)]
        labels: LabelArgs,

        /// Minimum mention confidence (default from config)
        #[arg(long)]
        threshold: Option<f64>,

        /// Print JSON instead of tables
        #[arg(long)]
        json: bool,
    },

    /// Run both models over an article and write label records
    Predict {
        /// Article text file ("-" for stdin)
        #[arg(short, long, default_value = "-")]
        text: PathBuf,

        /// Fetch the article from a web page instead
        #[arg(long, conflicts_with = "text")]
        url: Option<String>,

        /// Article ID stored on every label
        #[arg(long)]
        article_id: String,

        /// Output JSONL file (stdout if not provided)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show resolved configuration (debug)
    Config,
}

fn parse_roles(s: &str) -> Result<RoleFilter, String> {
    RoleFilter::parse_list(s).map_err(|e| e.to_string())
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let cfg = config::config()?;
        match self.command {
            Commands::Annotate {
                text,
                url,
                labels,
                hide_repeat,
                page,
                output,
            } => {
                let article = read_article(cfg, &text, url.as_deref()).await?;
                annotate(cfg, &article, &labels, hide_repeat, page, output).await
            }
            Commands::Sentences {
                labels,
                threshold,
                hide_repeat,
                compact,
                fine_role,
                page,
                output,
            } => {
                let options = SentenceOptions {
                    threshold: threshold.unwrap_or(cfg.display.threshold),
                    hide_repeat: hide_repeat || cfg.display.hide_repeat,
                    compact,
                };
                sentences(cfg, &labels, options, fine_role.as_deref(), page, output).await
            }
            Commands::Framing {
                labels,
                threshold,
                json,
            } => framing(cfg, &labels, threshold.unwrap_or(cfg.display.threshold), json),
            Commands::Predict {
                text,
                url,
                article_id,
                output,
            } => {
                let article = read_article(cfg, &text, url.as_deref()).await?;
                predict(cfg, &article, &article_id, output).await
            }
            Commands::Config => {
                show_config(cfg);
                Ok(())
            }
        }
    }
}

/// Read text from a file, or stdin for "-"
fn read_text(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read from stdin")?;
        Ok(buffer)
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read text file: {}", path.display()))
    }
}

/// Article text from a URL when given, else from the text file or stdin
async fn read_article(cfg: &ResolvedConfig, text: &Path, url: Option<&str>) -> Result<String> {
    match url {
        Some(url) => {
            let limit = Duration::from_secs(cfg.prediction.timeout_seconds);
            fetch_article(url, limit).await
        }
        None => read_text(text),
    }
}

/// Load labels and apply the role filter
fn select_labels(cfg: &ResolvedConfig, args: &LabelArgs) -> Result<LabelSet> {
    let options = LoadOptions {
        article_id: args.article.clone(),
    };
    let labels = load_labels(&args.labels, &options)
        .with_context(|| format!("Failed to load labels: {}", args.labels.display()))?;

    let filter = args.roles.as_ref().unwrap_or(&cfg.display.roles);
    let selected = labels.filter_by_role(filter);
    tracing::debug!(
        loaded = labels.len(),
        selected = selected.len(),
        "Applied role filter"
    );
    Ok(selected)
}

async fn write_output(output: Option<PathBuf>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            tokio::fs::write(&path, content)
                .await
                .with_context(|| format!("Failed to write output: {}", path.display()))?;
            eprintln!("[Wrote {}]", path.display());
        }
        None => print!("{}", content),
    }
    Ok(())
}

fn page_title(args: &LabelArgs) -> String {
    match &args.article {
        Some(id) => format!("franx: {}", id),
        None => "franx".to_string(),
    }
}

/// Annotate a whole article
async fn annotate(
    cfg: &ResolvedConfig,
    text: &str,
    args: &LabelArgs,
    hide_repeat: bool,
    page: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let labels = select_labels(cfg, args)?;

    let annotator = Annotator::new(cfg.colors.clone());
    let markup = annotator
        .annotate_document(text, labels.mentions(), hide_repeat || cfg.display.hide_repeat)
        .context("Failed to annotate article")?;

    let content = if page {
        render_page(&page_title(args), &markup, annotator.colors())
    } else {
        markup
    };
    write_output(output, &content).await
}

/// Render per-role sentence lists
async fn sentences(
    cfg: &ResolvedConfig,
    args: &LabelArgs,
    options: SentenceOptions,
    fine_role: Option<&str>,
    page: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let labels = select_labels(cfg, args)?;
    let annotator = Annotator::new(cfg.colors.clone());
    let report = render_sentence_report(&annotator, &labels, options, fine_role)
        .context("Failed to annotate sentences")?;

    if report.is_empty() {
        eprintln!("No sentences at threshold {}", options.threshold);
    }

    let content = if page {
        render_page(&page_title(args), &report, annotator.colors())
    } else {
        report
    };
    write_output(output, &content).await
}

/// Print framing summary tables
fn framing(cfg: &ResolvedConfig, args: &LabelArgs, threshold: f64, json: bool) -> Result<()> {
    let labels = select_labels(cfg, args)?;
    let rows = framing_rows(&labels, threshold);
    let distribution = role_distribution(&rows);
    let breakdown = fine_role_breakdown(&rows);

    if json {
        let summary = serde_json::json!({
            "threshold": threshold,
            "rows": rows,
            "distribution": distribution
                .iter()
                .map(|(role, count)| serde_json::json!({ "main_role": role, "count": count }))
                .collect::<Vec<_>>(),
            "fine_roles": breakdown,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("No labels at threshold {}", threshold);
        return Ok(());
    }

    println!("{:<30} {:<12} {:>6}  {}", "ENTITY", "ROLE", "CONF", "FINE ROLES");
    println!("{}", "-".repeat(75));
    for row in &rows {
        println!(
            "{:<30} {:<12} {:>6.3}  {}",
            row.entity,
            row.main_role.as_str(),
            row.confidence,
            row.fine_roles.join(", ")
        );
    }

    println!();
    println!("Role distribution:");
    for (role, count) in &distribution {
        println!("  {:<12} {}", role.as_str(), count);
    }

    println!();
    println!("Fine roles:");
    for entry in &breakdown {
        println!(
            "  {:<12} {:<24} {}",
            entry.main_role.as_str(),
            entry.fine_role,
            entry.count
        );
    }

    Ok(())
}

/// Run both model stages and emit label records
async fn predict(
    cfg: &ResolvedConfig,
    text: &str,
    article_id: &str,
    output: Option<PathBuf>,
) -> Result<()> {
    if text.trim().is_empty() {
        anyhow::bail!("Input is empty");
    }

    let predictor = Predictor::new(
        Box::new(HttpExtractor::new(&cfg.models.extractor_url)),
        Box::new(HttpClassifier::new(&cfg.models.classifier_url)),
        cfg.prediction.into(),
    );
    let prediction = predictor.predict(article_id, text).await?;

    match output {
        Some(path) => write_jsonl(&path, &prediction.labels).await?,
        None => print!("{}", to_jsonl(&prediction.labels)?),
    }

    eprintln!(
        "[{} entities found, {} with specific roles, {} classifier failures]",
        prediction.labels.len(),
        prediction.non_unknown,
        prediction.classifier_failures
    );
    Ok(())
}

fn show_config(cfg: &ResolvedConfig) {
    println!("franx configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Display:");
    println!("  Threshold:   {}", cfg.display.threshold);
    println!("  Hide repeat: {}", cfg.display.hide_repeat);
    println!(
        "  Roles:       {}",
        cfg.display
            .roles
            .iter()
            .map(|r| r.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!();
    println!("Colors:");
    for role in crate::domain::MainRole::ALL {
        println!("  {:<12} {}", role.as_str(), cfg.colors.color_for(role));
    }
    println!("  {:<12} {}", "default", cfg.colors.fallback());
    println!();
    println!("Prediction:");
    println!("  Score threshold: {}", cfg.prediction.score_threshold);
    println!("  Margin:          {}", cfg.prediction.margin);
    println!("  Timeout:         {}s", cfg.prediction.timeout_seconds);
    println!();
    println!("Models:");
    println!("  Extractor:  {}", cfg.models.extractor_url);
    println!("  Classifier: {}", cfg.models.classifier_url);
}
