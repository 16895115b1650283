//! labdash CLI - Laboratory sample register dashboard
//!
//! Command-line interface for loading the register, filtering it by facet and
//! rendering metrics, timelines and exports.

mod config;

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use labdash_core::filter::FilterSelection;
use labdash_core::normalize::parse_day_first;
use labdash_core::timeline::{sort_for_display, TimelineRow};
use labdash_core::visibility::{Role, RoleGate};
use labdash_core::{
    Dashboard, DashboardConfig, DashboardRequest, DashboardView, DataSource, Renderer, Table,
};
use labdash_render::{ExcelRenderer, MermaidRenderer, SvgRenderer, TextRenderer};
use labdash_source::{open_location, CachedSource, SheetExport};

#[derive(Parser)]
#[command(name = "labdash")]
#[command(author, version, about = "Laboratory sample register dashboard", long_about = None)]
struct Cli {
    /// Verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file (TOML)
    #[arg(short, long, global = true, env = "LABDASH_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that derives a view
#[derive(Args, Debug, Clone)]
struct ViewArgs {
    /// CSV file path or URL; overrides the configured source
    #[arg(short, long, value_name = "PATH|URL")]
    source: Option<String>,

    /// Facet filter, repeatable; values of the same facet are alternatives
    #[arg(short, long = "filter", value_name = "FACET=VALUE")]
    filters: Vec<String>,

    /// Editor secret
    #[arg(long, env = "LABDASH_SECRET", hide_env_values = true)]
    secret: Option<String>,

    /// Detail columns for editors, comma separated; "" hides all columns
    #[arg(long, value_name = "A,B,...")]
    columns: Option<String>,

    /// Reference date (DD/MM/YYYY or YYYY-MM-DD); defaults to today
    #[arg(long, value_name = "DATE")]
    today: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum TimelineFormat {
    Text,
    Mermaid,
    Svg,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the dashboard: metrics, breakdowns and detail table
    Show {
        #[command(flatten)]
        view: ViewArgs,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Limit the detail table to N rows
        #[arg(long, value_name = "N")]
        max_rows: Option<usize>,

        /// Re-render every N seconds until interrupted
        #[arg(long, value_name = "SECS")]
        watch: Option<u64>,
    },

    /// List the filter options of every facet
    Facets {
        #[command(flatten)]
        view: ViewArgs,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show only the summary metrics
    Metrics {
        #[command(flatten)]
        view: ViewArgs,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Render the sample timeline
    Timeline {
        #[command(flatten)]
        view: ViewArgs,

        #[arg(long, value_enum, default_value = "text")]
        format: TimelineFormat,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Export the filtered samples to an Excel workbook
    Export {
        #[command(flatten)]
        view: ViewArgs,

        /// Output file
        #[arg(short, long, default_value = "amostras.xlsx")]
        output: PathBuf,
    },

    /// Write a configuration file with the default settings
    Init {
        /// Output file
        #[arg(short, long, default_value = "labdash.toml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    if let Commands::Init { output, force } = &cli.command {
        return cmd_init(output, *force);
    }

    let config = config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Show {
            view,
            format,
            max_rows,
            watch,
        } => cmd_show(&config, &view, format, max_rows, watch),
        Commands::Facets { view, format } => cmd_facets(&config, &view, format),
        Commands::Metrics { view, format } => cmd_metrics(&config, &view, format),
        Commands::Timeline { view, format, output } => cmd_timeline(&config, &view, format, output.as_deref()),
        Commands::Export { view, output } => cmd_export(&config, &view, &output),
        Commands::Init { .. } => Ok(()),
    }
}

// ============================================================================
// View derivation
// ============================================================================

/// Pick the data source: `--source`, then `source.location`, then the sheet
fn open_source(config: &DashboardConfig, args: &ViewArgs) -> Result<Box<dyn DataSource>> {
    let timeout = Duration::from_secs(config.source.timeout_secs);
    if let Some(location) = args.source.as_deref().or(config.source.location.as_deref()) {
        return Ok(open_location(location, timeout)?);
    }
    if let Some(sheet_id) = &config.source.sheet_id {
        let export = SheetExport::new(sheet_id, &config.source.sheet_name);
        return Ok(Box::new(export.into_source(timeout)?));
    }
    bail!("No data source: pass --source or set source.sheet_id in the config file")
}

fn cached_source(config: &DashboardConfig, args: &ViewArgs) -> Result<CachedSource<Box<dyn DataSource>>> {
    let source = open_source(config, args)?;
    Ok(CachedSource::new(source, Duration::from_secs(config.source.cache_ttl_secs)))
}

fn fetch(source: &CachedSource<Box<dyn DataSource>>) -> Result<Arc<Table>> {
    source
        .snapshot()
        .with_context(|| format!("Could not load the sample register from {}", source.inner().describe()))
}

fn parse_filters(filters: &[String]) -> Result<FilterSelection> {
    let mut selection = FilterSelection::new();
    for filter in filters {
        let Some((facet, value)) = filter.split_once('=') else {
            bail!("Invalid filter {filter:?}: expected FACET=VALUE");
        };
        selection.insert(facet.trim(), value);
    }
    Ok(selection)
}

fn parse_columns(columns: &str) -> Vec<String> {
    columns
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(String::from)
        .collect()
}

fn reference_date(today: Option<&str>) -> Result<NaiveDate> {
    match today {
        Some(text) => parse_day_first(text).with_context(|| format!("Invalid --today {text:?}")),
        None => Ok(Local::now().date_naive()),
    }
}

fn build_request(config: &DashboardConfig, args: &ViewArgs) -> Result<DashboardRequest> {
    let selection = parse_filters(&args.filters)?;
    for facet in selection.facets() {
        if !config.facets.iter().any(|f| f.name == facet) {
            warn!(facet, "unknown facet, filter ignored");
        }
    }

    let role = RoleGate::new(config.access.editor_secret.clone()).role_for(args.secret.as_deref());
    if args.secret.is_some() && role == Role::Viewer {
        warn!("editor secret not accepted, continuing as viewer");
    }
    let column_override = args.columns.as_deref().map(parse_columns);
    if column_override.is_some() && role == Role::Viewer {
        warn!("--columns requires the editor role and was ignored");
    }

    Ok(DashboardRequest {
        selection,
        role,
        column_override,
    })
}

fn derive_view(config: &DashboardConfig, args: &ViewArgs) -> Result<DashboardView> {
    let source = cached_source(config, args)?;
    derive_from(config, args, &source)
}

fn derive_from(
    config: &DashboardConfig,
    args: &ViewArgs,
    source: &CachedSource<Box<dyn DataSource>>,
) -> Result<DashboardView> {
    let request = build_request(config, args)?;
    let today = reference_date(args.today.as_deref())?;
    let table = fetch(source)?;
    debug!(rows = table.len(), %today, "deriving view");
    Ok(Dashboard::new(config).derive(&table, &request, today))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn write_output(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(content.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

// ============================================================================
// Commands
// ============================================================================

fn cmd_show(
    config: &DashboardConfig,
    args: &ViewArgs,
    format: OutputFormat,
    max_rows: Option<usize>,
    watch: Option<u64>,
) -> Result<()> {
    let mut renderer = TextRenderer::new();
    renderer.max_rows = max_rows;

    let source = cached_source(config, args)?;
    loop {
        let view = derive_from(config, args, &source)?;
        match format {
            OutputFormat::Text => print!("{}", renderer.render(&view)?),
            OutputFormat::Json => print_json(&view)?,
        }

        let Some(secs) = watch else {
            return Ok(());
        };
        std::thread::sleep(Duration::from_secs(secs.max(1)));
        println!();
    }
}

fn cmd_facets(config: &DashboardConfig, args: &ViewArgs, format: OutputFormat) -> Result<()> {
    let view = derive_view(config, args)?;
    match format {
        OutputFormat::Json => print_json(&view.facets),
        OutputFormat::Text => {
            for facet in view.facets.iter() {
                if facet.offered {
                    println!("{} ({} options)", facet.name, facet.options.len());
                    for option in &facet.options {
                        println!("  {option}");
                    }
                } else {
                    println!("{} (not in this sheet)", facet.name);
                }
            }
            Ok(())
        }
    }
}

fn cmd_metrics(config: &DashboardConfig, args: &ViewArgs, format: OutputFormat) -> Result<()> {
    let view = derive_view(config, args)?;
    match format {
        OutputFormat::Json => print_json(&view.metrics),
        OutputFormat::Text => {
            print!("{}", TextRenderer::new().summary_only().render(&view)?);
            Ok(())
        }
    }
}

#[derive(Serialize)]
struct TimelineReport<'a> {
    reference_now: NaiveDate,
    rows: &'a [TimelineRow],
}

fn timeline_text(view: &DashboardView) -> String {
    if view.timeline.is_empty() {
        return "No samples with both a start date and a deadline.\n".to_string();
    }
    let mut rows = view.timeline.clone();
    sort_for_display(&mut rows);
    let width = rows.iter().map(|r| r.row_key.chars().count()).max().unwrap_or(0).max(7);
    let mut out = format!("{:<width$}  {:<10}  {:<10}  {}\n", "Amostra", "Início", "Prazo", "Situação");
    for row in &rows {
        out.push_str(&format!(
            "{:<width$}  {}  {}  {}\n",
            row.row_key,
            row.start.format("%d/%m/%Y"),
            row.end.format("%d/%m/%Y"),
            row.classification
        ));
    }
    out
}

fn cmd_timeline(
    config: &DashboardConfig,
    args: &ViewArgs,
    format: TimelineFormat,
    output: Option<&Path>,
) -> Result<()> {
    let view = derive_view(config, args)?;
    let content = match format {
        TimelineFormat::Text => timeline_text(&view),
        TimelineFormat::Mermaid => MermaidRenderer::new().render(&view)?,
        TimelineFormat::Svg => SvgRenderer::new().render(&view)?,
        TimelineFormat::Json => {
            let report = TimelineReport {
                reference_now: view.reference_now,
                rows: &view.timeline,
            };
            format!("{}\n", serde_json::to_string_pretty(&report)?)
        }
    };
    write_output(output, &content)
}

fn cmd_export(config: &DashboardConfig, args: &ViewArgs, output: &Path) -> Result<()> {
    let view = derive_view(config, args)?;
    let bytes = ExcelRenderer::new().render(&view)?;
    std::fs::write(output, bytes).with_context(|| format!("Failed to write {}", output.display()))?;
    println!("Exported {} rows to {}", view.filtered.len(), output.display());
    Ok(())
}

fn cmd_init(output: &Path, force: bool) -> Result<()> {
    config::write_default(output, force)?;
    println!("Created: {}", output.display());
    Ok(())
}
