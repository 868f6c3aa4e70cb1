//! nmrplot: headless driver for the plotter core.
//!
//! Covers the scripted uses of the tool without the GUI: probe and
//! scan a spectra directory (keeping the scan cache current), list
//! the cache, and run a workspace of datasets through the transform
//! pipeline into a plain-text export a plotting tool can ingest.

use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use nmr_plotter::config::{default_prefs_path, Preferences};
use nmr_plotter::data::cache;
use nmr_plotter::data::loader::{self, XAxisUnit};
use nmr_plotter::data::scan::{from_cached_paths, DatasetKind, ScanResult};
use nmr_plotter::data::validate::ValidateLimits;
use nmr_plotter::params::template::read_template;
use nmr_plotter::params::{colors, PlotParameters};
use nmr_plotter::pipeline::transform::transform_batch;
use nmr_plotter::worker::spawn_scan;

#[derive(Parser)]
#[command(
    name = "nmrplot",
    version,
    about = "Scan NMR spectra directories and export stacked/overlaid line data"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate and scan a spectra directory, updating the scan cache
    Scan {
        /// Directory holding the samples (one level above experiments)
        dir: PathBuf,
        /// Look for binary processed data instead of ASCII exports
        #[arg(long)]
        binary: bool,
        /// Print the tree as JSON
        #[arg(long)]
        json: bool,
        /// Do not update the scan cache store
        #[arg(long)]
        no_cache: bool,
    },
    /// List everything in the scan cache store
    Cached {
        /// Use the binary-mode store
        #[arg(long)]
        binary: bool,
    },
    /// Load datasets, run the transform pipeline, write x/y columns
    Export {
        /// Output text file
        out: PathBuf,
        /// Dataset paths, in workspace (stacking) order
        #[arg(required = true)]
        datasets: Vec<PathBuf>,
        /// X-axis unit: ppm, Hz or kHz
        #[arg(long, default_value = "ppm")]
        unit: String,
        /// Plot mode override: stack or overlay
        #[arg(long)]
        mode: Option<String>,
        /// Plot template to apply before overrides
        #[arg(long)]
        template: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Scan {
            dir,
            binary,
            json,
            no_cache,
        } => run_scan(&dir, kind_for(binary), json, no_cache),
        Command::Cached { binary } => run_cached(kind_for(binary)),
        Command::Export {
            out,
            datasets,
            unit,
            mode,
            template,
        } => run_export(&out, &datasets, &unit, mode.as_deref(), template.as_deref()),
    }
}

fn kind_for(binary: bool) -> DatasetKind {
    if binary {
        DatasetKind::Binary
    } else {
        DatasetKind::Ascii
    }
}

fn run_scan(
    dir: &std::path::Path,
    kind: DatasetKind,
    json: bool,
    no_cache: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let root = std::fs::canonicalize(dir)?;
    let prefs = Preferences::load(&default_prefs_path());

    let job = spawn_scan(root.clone(), kind, ValidateLimits::default());
    let outcome = job.wait().ok_or("scan worker died without reporting")?;
    let tree = outcome.result?;

    if tree.is_empty() {
        eprintln!("No {} datasets found under {}", kind, root.display());
        return Ok(());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&tree)?);
    } else {
        print_tree(&tree);
    }

    if !no_cache {
        let store = prefs.cache_store(kind);
        let kept = cache::save_cache(&store, &root, &tree.all_paths(), kind)?;
        eprintln!("Cache updated: {} path(s) in {}", kept, store.display());
    }
    Ok(())
}

fn print_tree(tree: &ScanResult) {
    println!("{}", tree.root_label);
    for (sample, entries) in &tree.samples {
        println!("  {}", sample);
        for entry in entries {
            println!("    {}  [{}]", entry.label, entry.path.display());
        }
    }
}

fn run_cached(kind: DatasetKind) -> Result<(), Box<dyn std::error::Error>> {
    let prefs = Preferences::load(&default_prefs_path());
    let store = prefs.cache_store(kind);

    match cache::load_cache(&store) {
        None => eprintln!("No cached {} scans in {}", kind, store.display()),
        Some(blocks) => {
            for (top, paths) in blocks {
                print_tree(&from_cached_paths(&top, &paths));
            }
        }
    }
    Ok(())
}

fn run_export(
    out: &std::path::Path,
    datasets: &[PathBuf],
    unit: &str,
    mode: Option<&str>,
    template: Option<&std::path::Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut params = PlotParameters::new();
    if let Some(path) = template {
        let report = read_template(path, &mut params)?;
        eprintln!(
            "Template {}: {} applied, {} skipped",
            path.display(),
            report.applied,
            report.skipped
        );
    }
    params.set("x_axis_unit", unit)?;
    if let Some(mode) = mode {
        params.set("mode", mode)?;
    }

    let unit: XAxisUnit = params.unit();
    let batch = loader::load_batch(datasets, unit);
    for (path, err) in &batch.skipped {
        eprintln!("Skipped {}: {}", path.display(), err);
    }
    if batch.series.is_empty() {
        return Err("no dataset could be loaded; nothing to export".into());
    }

    let outcome = transform_batch(batch.series, &params.transform_options());
    if outcome.series.is_empty() {
        return Err("mask window left no data points; nothing to export".into());
    }
    for index in &outcome.dropped {
        eprintln!(
            "Dropped {}: no points inside the mask window",
            batch.sources[*index].display()
        );
    }

    let palette = colors::resolve_colors(&params)?;
    let mut writer = BufWriter::new(File::create(out)?);
    if let Some(title) = colors::axis_title(params.get("nucleus"), unit) {
        writeln!(writer, "# axis: {}", title)?;
    }
    for (i, series) in outcome.series.iter().enumerate() {
        writeln!(
            writer,
            "# series {} ({}), color {}",
            i,
            unit,
            colors::color_for(&palette, i)
        )?;
        for (x, y) in series.x.iter().zip(&series.y) {
            writeln!(writer, "{:.6}\t{:.6}", x, y)?;
        }
        writeln!(writer)?;
    }
    writer.flush()?;

    eprintln!(
        "Exported {} series ({} mode) to {}",
        outcome.series.len(),
        params.mode(),
        out.display()
    );
    Ok(())
}
