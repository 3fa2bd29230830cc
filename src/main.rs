use anyhow::{Context, Result};
use chartdispatch::data::Dataset;
use chartdispatch::graph;
use chartdispatch::{ChartDescriptor, ChartKind, ColumnOutcome, DispatchEngine, RenderOptions};
use clap::Parser;
use serde_json::json;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "chartdispatch")]
#[command(about = "Pick columns from a dataset and chart each one by its data type", long_about = None)]
struct Args {
    /// Dataset file (CSV, or JSON array of objects with --json); stdin when omitted
    input: Option<PathBuf>,

    /// Columns to chart, comma-separated (default: every column)
    #[arg(short, long, value_delimiter = ',')]
    columns: Vec<String>,

    /// Chart kind: bar, pie or line
    #[arg(short, long, default_value = "bar")]
    kind: ChartKind,

    /// Parse the input as a JSON array of objects
    #[arg(long)]
    json: bool,

    /// Render one image per column into this directory instead of printing descriptors
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// JSON file with render options (width, height, type)
    #[arg(long)]
    options: Option<PathBuf>,

    /// Print the first N rows of the dataset to stderr before charting
    #[arg(long)]
    preview: Option<usize>,

    /// Evaluate columns in parallel
    #[arg(long)]
    parallel: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let args = Args::parse();

    let dataset = load_dataset(&args).context("Failed to load dataset")?;
    info!(columns = dataset.columns().len(), rows = dataset.row_count(), "dataset loaded");

    if let Some(rows) = args.preview {
        eprint!("{}", dataset.preview(rows));
    }

    let engine = DispatchEngine::new();
    let outcomes = if args.columns.is_empty() {
        if args.parallel {
            engine.run_parallel(dataset.columns(), args.kind)
        } else {
            engine.run(dataset.columns(), args.kind)
        }
    } else {
        engine.run_selection(&dataset, args.columns.as_slice(), args.kind)
    };

    for err in outcomes.iter().filter_map(|o| o.as_ref().err()) {
        eprintln!(
            "Warning: Column {} cannot be visualized with the selected options. ({})",
            err.column(),
            err
        );
    }

    let charted = match &args.out_dir {
        Some(dir) => {
            let options = match &args.options {
                Some(path) => RenderOptions::from_path(path)?,
                None => RenderOptions::default(),
            };
            write_images(&outcomes, dir, &options)?
        }
        None => {
            print_descriptors(&outcomes)?;
            outcomes.iter().filter(|o| o.is_ok()).count()
        }
    };

    if !outcomes.is_empty() && charted == 0 {
        anyhow::bail!("None of the selected columns can be visualized as a {}", args.kind.label());
    }

    Ok(())
}

fn load_dataset(args: &Args) -> Result<Dataset> {
    match (&args.input, args.json) {
        (Some(path), false) => Dataset::from_csv_path(path),
        (Some(path), true) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read '{}'", path.display()))?;
            let value: serde_json::Value = serde_json::from_str(&text).context("Invalid JSON input")?;
            Dataset::from_json(&value)
        }
        (None, false) => Dataset::from_csv_reader(io::stdin().lock()),
        (None, true) => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read stdin")?;
            let value: serde_json::Value = serde_json::from_str(&text).context("Invalid JSON input")?;
            Dataset::from_json(&value)
        }
    }
}

/// Render and write each descriptor; returns how many images were written.
fn write_images(outcomes: &[ColumnOutcome], dir: &Path, options: &RenderOptions) -> Result<usize> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory '{}'", dir.display()))?;

    let mut written = 0;
    for descriptor in outcomes.iter().filter_map(|o| o.as_ref().ok()) {
        match write_image(descriptor, dir, options) {
            Ok(path) => {
                info!(path = %path.display(), "wrote chart");
                written += 1;
            }
            Err(err) => {
                warn!(column = %descriptor.column, "render failed: {:#}", err);
                eprintln!(
                    "Warning: Column {} cannot be visualized with the selected options. ({:#})",
                    descriptor.column, err
                );
            }
        }
    }
    Ok(written)
}

fn write_image(descriptor: &ChartDescriptor, dir: &Path, options: &RenderOptions) -> Result<PathBuf> {
    let bytes = graph::render_descriptor(descriptor, options)
        .with_context(|| format!("Failed to render {}", descriptor.title))?;
    let path = dir.join(graph::output_file_name(descriptor, options));
    std::fs::write(&path, bytes).with_context(|| format!("Failed to write '{}'", path.display()))?;
    Ok(path)
}

fn print_descriptors(outcomes: &[ColumnOutcome]) -> Result<()> {
    let report: Vec<serde_json::Value> = outcomes
        .iter()
        .map(|outcome| match outcome {
            Ok(descriptor) => json!({ "column": descriptor.column, "descriptor": descriptor }),
            Err(err) => json!({ "column": err.column(), "error": err.to_string() }),
        })
        .collect();

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    serde_json::to_writer_pretty(&mut handle, &report).context("Failed to write descriptors")?;
    writeln!(handle).context("Failed to write descriptors")?;
    handle.flush().context("Failed to flush stdout")?;
    Ok(())
}
