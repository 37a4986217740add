use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use confmeta_core::config_file;
use confmeta_core::{
    Config, ConferenceRow, ExtractionCache, Extractor, Gazetteer, InstructionTemplate,
    OllamaGenerator, Pipeline, ProgressEvent, SeriesMatcher, TextGenerator,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

mod output;

use output::{ColorMode, RowPrinter};

/// Conference metadata normalizer - turn free-form conference listings into
/// structured name, place and date records
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Read settings from this TOML file instead of the usual cascade
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Settings shared by every command that talks to the generator.
#[derive(Args, Debug, Default)]
struct ExtractArgs {
    /// Generate endpoint URL [env: OLLAMA_URL]
    #[arg(long)]
    url: Option<String>,

    /// Model name [env: CONFMETA_MODEL]
    #[arg(long)]
    model: Option<String>,

    /// Per-request timeout in seconds (0 waits forever)
    #[arg(long)]
    timeout: Option<u64>,

    /// Use the detailed instructions and keep the model's note
    #[arg(long)]
    include_note: bool,

    /// GeoNames cities file [env: GEONAMES_PATH]
    #[arg(long)]
    gazetteer: Option<PathBuf>,

    /// Persistent extraction cache (SQLite)
    #[arg(long)]
    cache: Option<PathBuf>,

    /// Match records against a dblp series index built with `build-series`
    #[arg(long)]
    series_db: Option<PathBuf>,

    /// Empty the extraction cache before running
    #[arg(long)]
    clear_cache: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a sample of listings from the input table into the output table
    Parse {
        /// SQLite database holding the listing table [env: CONFMETA_DB]
        #[arg(long)]
        db: Option<PathBuf>,

        /// Number of rows to sample
        #[arg(long)]
        max_rows: Option<usize>,

        #[arg(long)]
        input_table: Option<String>,

        #[arg(long)]
        output_table: Option<String>,

        /// Where to write the CSV copy of the output
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Skip the CSV copy
        #[arg(long, conflicts_with = "csv")]
        no_csv: bool,

        /// Stream the model output of every n-th row (0 disables)
        #[arg(long)]
        show_every: Option<usize>,

        #[command(flatten)]
        extract: ExtractArgs,
    },

    /// Run a single listing through the pipeline and print the record as JSON
    ParseOne {
        /// The raw conference listing
        raw: String,

        #[command(flatten)]
        extract: ExtractArgs,
    },

    /// Build the dblp conference-series index from a dblp N-Triples dump
    BuildSeries {
        /// Path to dblp.nt.gz
        nt_gz: PathBuf,

        /// Path of the SQLite index to (re)build
        db: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let color = ColorMode(!cli.no_color);

    match cli.command {
        Command::BuildSeries { nt_gz, db } => build_series(nt_gz, db).await,
        Command::ParseOne { raw, extract } => {
            let mut config = base_config(cli.config.as_deref())?;
            apply_extract_args(&mut config, &extract);
            parse_one(&config, raw, color).await
        }
        Command::Parse {
            db,
            max_rows,
            input_table,
            output_table,
            csv,
            no_csv,
            show_every,
            extract,
        } => {
            let mut config = base_config(cli.config.as_deref())?;
            apply_extract_args(&mut config, &extract);
            if let Some(db) = db {
                config.db_path = Some(db);
            }
            if let Some(n) = max_rows {
                config.max_rows = n;
            }
            if let Some(t) = input_table {
                config.input_table = t;
            }
            if let Some(t) = output_table {
                config.output_table = t;
            }
            if let Some(p) = csv {
                config.csv_sample_path = Some(p);
            }
            if no_csv {
                config.csv_sample_path = None;
            }
            if let Some(n) = show_every {
                config.show_every = n;
            }
            parse(&config, color).await
        }
    }
}

/// Defaults, then the config file(s), then environment variables. Command
/// line flags are applied on top by the caller.
fn base_config(explicit: Option<&Path>) -> anyhow::Result<Config> {
    let file = match explicit {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            config_file::load_from_path(path)
                .ok_or_else(|| anyhow::anyhow!("Could not parse config file {}", path.display()))?
        }
        None => config_file::load_config(),
    };
    let mut config = Config::default();
    file.apply(&mut config);
    apply_env(&mut config);
    Ok(config)
}

fn apply_env(config: &mut Config) {
    let env = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());
    if let Some(url) = env("OLLAMA_URL") {
        config.llm_url = url;
    }
    if let Some(model) = env("CONFMETA_MODEL") {
        config.model = model;
    }
    if let Some(db) = env("CONFMETA_DB") {
        config.db_path = Some(PathBuf::from(db));
    }
    if let Some(path) = env("GEONAMES_PATH") {
        config.gazetteer_path = PathBuf::from(path);
    }
}

fn apply_extract_args(config: &mut Config, args: &ExtractArgs) {
    if let Some(url) = &args.url {
        config.llm_url = url.clone();
    }
    if let Some(model) = &args.model {
        config.model = model.clone();
    }
    if let Some(secs) = args.timeout {
        config.timeout = (secs > 0).then(|| Duration::from_secs(secs));
    }
    if args.include_note {
        config.include_note = true;
    }
    if let Some(path) = &args.gazetteer {
        config.gazetteer_path = path.clone();
    }
    if let Some(path) = &args.cache {
        config.cache_path = Some(path.clone());
    }
    if let Some(path) = &args.series_db {
        config.series_db_path = Some(path.clone());
        config.series_matching = true;
    }
    if args.clear_cache {
        config.clear_cache = true;
    }
}

/// Wire generator, gazetteer, cache and optional series matcher into a
/// pipeline. Gazetteer and series index failures are fatal here.
fn build_pipeline(config: &Config) -> anyhow::Result<Pipeline> {
    let ollama = OllamaGenerator::new(config.llm_url.clone(), config.model.clone())
        .with_timeout(config.timeout);
    tracing::info!(url = ollama.url(), model = %config.model, "generator configured");
    let generator: Arc<dyn TextGenerator> = Arc::new(ollama);

    let gazetteer = Gazetteer::load(&config.gazetteer_path).map_err(|e| {
        anyhow::anyhow!(
            "{e}. Download cities5000.zip from GeoNames or set GEONAMES_PATH / --gazetteer"
        )
    })?;

    let cache = match &config.cache_path {
        Some(path) => Arc::new(ExtractionCache::open(path)?),
        None => Arc::new(ExtractionCache::new()),
    };
    if config.clear_cache {
        cache.clear();
        tracing::info!(persistent = cache.has_persistence(), "extraction cache cleared");
    }

    let extractor = Extractor::new(Arc::clone(&generator), Arc::new(gazetteer))
        .with_cache(cache)
        .with_template(InstructionTemplate::for_note(config.include_note));

    let series = if config.series_matching {
        let Some(path) = &config.series_db_path else {
            anyhow::bail!("Series matching is on but no series index is configured (--series-db)");
        };
        if !path.exists() {
            anyhow::bail!(
                "Series index not found at {}. Build it with: confmeta build-series <dblp.nt.gz> {}",
                path.display(),
                path.display()
            );
        }
        log_series_index(path)?;
        Some(SeriesMatcher::open(
            path,
            generator,
            config.max_series_candidates,
        )?)
    } else {
        None
    };

    Ok(Pipeline::new(extractor)
        .with_series(series)
        .with_show_every(config.show_every))
}

fn log_series_index(path: &Path) -> anyhow::Result<()> {
    let index = confmeta_dblp::SeriesIndex::open(path)?;
    let series = index.series_count()?;
    let built = index.build_date()?.unwrap_or_else(|| "unknown".to_string());
    tracing::info!(path = %path.display(), series, built, "series index opened");
    Ok(())
}

fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_clone.cancel();
        }
    });
    cancel
}

async fn parse(config: &Config, color: ColorMode) -> anyhow::Result<()> {
    let Some(db_path) = &config.db_path else {
        anyhow::bail!("No database given. Pass --db or set CONFMETA_DB");
    };
    let conn = confmeta_store::open(db_path)?;
    let pipeline = build_pipeline(config)?;

    let rows = confmeta_store::fetch_rows(&conn, &config.input_table, config.max_rows)?;
    let mut stdout = std::io::stdout();
    writeln!(stdout, "Fetched {} conference rows for parsing", rows.len())?;

    let printer = Mutex::new((RowPrinter::new(color), std::io::stdout()));
    let progress = |event: ProgressEvent| {
        if let Ok(mut guard) = printer.lock() {
            let (p, w) = &mut *guard;
            let _ = p.print(w, &event);
            let _ = w.flush();
        }
    };

    let cancel = cancel_on_ctrl_c();
    let (records, stats) = pipeline.run(rows, progress, &cancel).await;

    output::print_summary(&mut stdout, &stats, color)?;

    confmeta_store::write_parsed(&conn, &config.output_table, &records)?;
    writeln!(
        stdout,
        "Wrote {} rows to '{}'",
        records.len(),
        config.output_table
    )?;
    if let Some(csv_path) = &config.csv_sample_path {
        confmeta_store::write_csv(csv_path, &records)?;
        writeln!(stdout, "Wrote CSV to {}", csv_path.display())?;
    }

    let cache = pipeline.extractor().cache();
    tracing::info!(
        hits = cache.hits(),
        misses = cache.misses(),
        persisted = cache.disk_len(),
        "extraction cache"
    );
    Ok(())
}

async fn parse_one(config: &Config, raw: String, color: ColorMode) -> anyhow::Result<()> {
    let pipeline = build_pipeline(config)?;
    let row = ConferenceRow {
        pid: 0,
        name_seq: 0,
        raw: Some(raw),
    };

    let printer = Mutex::new((RowPrinter::new(color), std::io::stderr()));
    let progress = |event: ProgressEvent| {
        if let Ok(mut guard) = printer.lock() {
            let (p, w) = &mut *guard;
            let _ = p.print(w, &event);
            let _ = w.flush();
        }
    };

    // always stream for a single listing
    let pipeline = pipeline.with_show_every(1);
    let (record, outcome) = pipeline.parse_row(1, 1, &row, &progress).await;
    progress(ProgressEvent::Parsed {
        index: 1,
        total: 1,
        outcome,
        record: Box::new(record.clone()),
    });
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

async fn build_series(nt_gz: PathBuf, db: PathBuf) -> anyhow::Result<()> {
    use indicatif::{HumanCount, ProgressBar, ProgressStyle};
    use std::time::Instant;

    if !nt_gz.exists() {
        anyhow::bail!("dblp dump not found: {}", nt_gz.display());
    }

    let spinner_style = ProgressStyle::with_template("{spinner:.green} {msg} ({elapsed})")?;
    let bar = ProgressBar::new_spinner();
    bar.set_style(spinner_style);
    bar.set_message("Opening dblp dump...");
    bar.enable_steady_tick(Duration::from_millis(120));

    let start = Instant::now();
    let progress_bar = bar.clone();
    let db_path = db.clone();
    let series = tokio::task::spawn_blocking(move || {
        confmeta_dblp::build_index_from_file(&db_path, &nt_gz, |event| match event {
            confmeta_dblp::BuildProgress::ScanningTypes {
                lines_read,
                series_found,
            } => progress_bar.set_message(format!(
                "Pass 1/2: {} lines, {} conference series",
                HumanCount(lines_read),
                HumanCount(series_found)
            )),
            confmeta_dblp::BuildProgress::Labeling {
                lines_read,
                labels_written,
            } => progress_bar.set_message(format!(
                "Pass 2/2: {} lines, {} labels",
                HumanCount(lines_read),
                HumanCount(labels_written)
            )),
            confmeta_dblp::BuildProgress::Complete { series } => {
                progress_bar.set_message(format!("Indexed {} series", HumanCount(series)))
            }
        })
    })
    .await??;

    bar.finish_with_message(format!(
        "Indexed {} conference series in {:.0?}",
        HumanCount(series),
        start.elapsed()
    ));
    let index = confmeta_dblp::SeriesIndex::open(&db)?;
    if let Some(built) = index.build_date()? {
        println!("Index build timestamp: {built}");
    }
    let canonical = std::fs::canonicalize(&db).unwrap_or(db);
    println!("Series index saved to: {}", canonical.display());
    Ok(())
}
