use album_reconcile::config::{parse_strategy, Settings, CONFIG_PATH_ENV};
use album_reconcile::progress::{format_duration, Reporter};
use album_reconcile::report::{AlbumInput, AlbumReport, BatchStats};
use album_reconcile::safety::{validate_output_dir, validate_output_path};
use album_reconcile::{confidence, Direction, MatchStrategy, Reconciler, ScriptedRefiner};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "album-reconcile")]
#[command(about = "Pair local audio files with a remote album tracklist")]
struct Args {
    /// TOML settings file
    #[arg(long, global = true, env = CONFIG_PATH_ENV)]
    config: Option<PathBuf>,

    /// Hide progress bars and log periodic progress lines instead
    #[arg(long, global = true)]
    log_only: bool,

    /// Rayon worker threads (0 = one per core)
    #[arg(long, global = true, default_value = "0")]
    workers: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Reconcile one album with a single strategy, or the best automatic one
    Match {
        album: PathBuf,

        /// Strategy name, or "auto"
        #[arg(long)]
        strategy: Option<String>,

        #[arg(long)]
        direction: Option<Direction>,

        /// JSON overrides replayed by the manual strategy
        #[arg(long)]
        manual: Option<PathBuf>,

        /// Write the report here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Compare every automatic strategy on one album
    Select {
        album: PathBuf,

        #[arg(long)]
        direction: Option<Direction>,
    },

    /// Print the confidence breakdown for every local/remote combination
    Explain { album: PathBuf },

    /// Reconcile every *.json album in a directory
    Batch {
        input_dir: PathBuf,

        #[arg(long)]
        output_dir: PathBuf,

        /// Strategy name, or "auto"
        #[arg(long)]
        strategy: Option<String>,

        #[arg(long)]
        direction: Option<Direction>,

        /// Also write run statistics to this JSON file
        #[arg(long)]
        stats: Option<PathBuf>,
    },
}

/// Settings resolved once per run, with CLI flags applied on top.
struct Engine {
    reconciler: Reconciler,
    strategy: Option<MatchStrategy>,
    direction: Direction,
    parallel: bool,
}

impl Engine {
    fn from_settings(settings: &Settings) -> Result<Self> {
        let catalog = settings
            .catalog_patterns()
            .context("Invalid catalog settings")?;
        debug!(schemes = ?catalog.labels().collect::<Vec<_>>(), "catalog patterns");
        Ok(Self {
            reconciler: Reconciler::new(catalog),
            strategy: settings.strategy().context("Invalid matching.strategy")?,
            direction: settings.direction().context("Invalid matching.direction")?,
            parallel: settings.matching.parallel,
        })
    }

    fn with_overrides(mut self, strategy: Option<&str>, direction: Option<Direction>) -> Result<Self> {
        if let Some(name) = strategy {
            self.strategy = parse_strategy(name).context("Invalid --strategy")?;
        }
        if let Some(direction) = direction {
            self.direction = direction;
        }
        Ok(self)
    }

    fn reconcile(&self, album: &AlbumInput, manual: Option<&Path>) -> Result<AlbumReport> {
        let (local, remote) = (album.local.as_slice(), album.remote.as_slice());

        match (self.strategy, manual) {
            (Some(MatchStrategy::Manual), Some(path)) => {
                let seed = self
                    .reconciler
                    .select_best(local, remote, self.direction, self.parallel)
                    .pairs;
                let mut refiner = ScriptedRefiner::from_file(path)
                    .with_context(|| format!("Failed to load overrides {}", path.display()))?;
                info!(overrides = refiner.overrides().len(), "replaying manual overrides");
                let pairs = self
                    .reconciler
                    .refine(&mut refiner, local, remote, seed, self.direction)
                    .context("Manual refinement failed")?;
                Ok(AlbumReport::new(MatchStrategy::Manual, self.direction, &pairs, Vec::new()))
            }
            (Some(MatchStrategy::Manual), None) => {
                bail!("The manual strategy needs --manual <overrides.json>")
            }
            (_, Some(_)) => bail!("--manual is only valid with --strategy manual"),
            (Some(strategy), None) => {
                let pairs = self.reconciler.run(strategy, local, remote, self.direction)?;
                Ok(AlbumReport::new(strategy, self.direction, &pairs, Vec::new()))
            }
            (None, None) => {
                let selection = self
                    .reconciler
                    .select_best(local, remote, self.direction, self.parallel);
                Ok(AlbumReport::new(
                    selection.winner,
                    self.direction,
                    &selection.pairs,
                    selection.summaries,
                ))
            }
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("album_reconcile=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_match(
    engine: &Engine,
    album_path: &Path,
    manual: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    let album = AlbumInput::read(album_path)?;
    let report = engine.reconcile(&album, manual)?;

    info!(
        strategy = %report.strategy,
        matched = report.matched,
        unmatched_local = report.unmatched_local,
        unmatched_remote = report.unmatched_remote,
        average = report.average_confidence,
        "album reconciled"
    );

    match output {
        Some(path) => {
            validate_output_path(path, &[album_path])?;
            report.write_to_file(path)?;
            println!("Report written: {:?}", path);
        }
        None => println!("{}", report.to_json()?),
    }
    Ok(())
}

fn run_select(engine: &Engine, album_path: &Path) -> Result<()> {
    let album = AlbumInput::read(album_path)?;
    let selection = engine.reconciler.select_best(
        &album.local,
        &album.remote,
        engine.direction,
        engine.parallel,
    );

    println!(
        "  {:<14} {:>8} {:>8} {:>5} {:>7} {:>5} {:>8} {:>9}",
        "strategy", "average", "matched", "high", "medium", "low", "local", "remote"
    );
    println!("{:-<74}", "");
    for s in &selection.summaries {
        let marker = if s.strategy == selection.winner { "*" } else { " " };
        println!(
            "{} {:<14} {:>8.2} {:>8} {:>5} {:>7} {:>5} {:>8} {:>9}",
            marker,
            s.strategy.name(),
            s.average_confidence,
            s.matched,
            s.high,
            s.medium,
            s.low,
            s.unmatched_local,
            s.unmatched_remote
        );
    }
    println!("\nSelected: {}", selection.winner);
    Ok(())
}

fn run_explain(engine: &Engine, album_path: &Path) -> Result<()> {
    let album = AlbumInput::read(album_path)?;
    let catalog = engine.reconciler.catalog();

    for remote in &album.remote {
        println!("\n{} [{}]", remote.name, remote.id);
        let mut rows: Vec<_> = album
            .local
            .iter()
            .map(|local| (local, confidence(remote, local, catalog)))
            .collect();
        rows.sort_by(|a, b| b.1.score.total_cmp(&a.1.score));

        for (local, c) in rows {
            println!(
                "  {:>6.2} {:<6} title={:.2} (sim {:.2}) duration={:.2} catalog={:.0}  {}",
                c.score,
                c.level.to_string(),
                c.factors.title,
                c.factors.title_similarity,
                c.factors.duration,
                c.factors.catalog,
                local.file_name()
            );
        }
    }
    Ok(())
}

fn list_albums(input_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut albums = Vec::new();
    let entries = std::fs::read_dir(input_dir)
        .with_context(|| format!("Failed to read directory {}", input_dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        let is_album = path.extension().is_some_and(|e| e == "json")
            && !path.to_string_lossy().ends_with(".report.json");
        if path.is_file() && is_album {
            albums.push(path);
        }
    }
    albums.sort();
    Ok(albums)
}

fn report_path(output_dir: &Path, album: &Path) -> PathBuf {
    let stem = album
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "album".to_string());
    output_dir.join(format!("{}.report.json", stem))
}

fn run_batch(
    engine: &Engine,
    reporter: Reporter,
    input_dir: &Path,
    output_dir: &Path,
    stats_path: Option<&Path>,
) -> Result<()> {
    let start = Instant::now();

    validate_output_dir(output_dir, input_dir)?;
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let spinner = reporter.spinner("Scanning albums");
    let albums = list_albums(input_dir)?;
    spinner.finish_and_clear();
    info!(albums = albums.len(), dir = %input_dir.display(), "found albums");

    let total = albums.len() as u64;
    let pb = reporter.progress_bar(total, "Reconciling");
    let done = AtomicUsize::new(0);

    let results: Vec<(PathBuf, Result<AlbumReport>)> = albums
        .par_iter()
        .map(|path| {
            let result = AlbumInput::read(path).and_then(|album| {
                let report = engine.reconcile(&album, None)?;
                let out = report_path(output_dir, path);
                validate_output_path(&out, &[path.as_path()])?;
                report.write_to_file(&out)?;
                Ok(report)
            });

            let n = done.fetch_add(1, Ordering::Relaxed) + 1;
            reporter.log_progress("BATCH", n as u64, total, 100);
            pb.inc(1);
            (path.clone(), result)
        })
        .collect();
    pb.finish_and_clear();

    let mut stats = BatchStats::default();
    for (path, result) in &results {
        match result {
            Ok(report) => stats.record(report),
            Err(e) => {
                warn!(album = %path.display(), error = %format!("{:#}", e), "album failed");
                stats.record_failure();
            }
        }
    }
    stats.elapsed_seconds = start.elapsed().as_secs_f64();
    stats.log_phase("batch");

    if let Some(path) = stats_path {
        validate_output_path(path, &[])?;
        stats
            .write_to_file(path)
            .with_context(|| format!("Failed to write stats {}", path.display()))?;
    }

    println!("\n{:=<60}", "");
    println!("Batch complete!");
    println!("  Albums: {} ({} failed)", stats.albums, stats.failed);
    println!("  Matched pairs: {} ({:.1}% high)", stats.matched, stats.high_rate());
    println!("  Elapsed: {}", format_duration(start.elapsed()));
    println!("{:=<60}", "");

    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    if args.workers > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(args.workers)
            .build_global()
            .context("Failed to set thread pool size")?;
    }

    let settings = Settings::load(args.config.as_deref()).context("Failed to load settings")?;
    let engine = Engine::from_settings(&settings)?;
    let reporter = Reporter::new(args.log_only);

    match args.command {
        Command::Match {
            album,
            strategy,
            direction,
            manual,
            output,
        } => {
            let engine = engine.with_overrides(strategy.as_deref(), direction)?;
            run_match(&engine, &album, manual.as_deref(), output.as_deref())
        }
        Command::Select { album, direction } => {
            let engine = engine.with_overrides(None, direction)?;
            run_select(&engine, &album)
        }
        Command::Explain { album } => run_explain(&engine, &album),
        Command::Batch {
            input_dir,
            output_dir,
            strategy,
            direction,
            stats,
        } => {
            let engine = engine.with_overrides(strategy.as_deref(), direction)?;
            if engine.strategy.is_some_and(|s| !s.is_automatic()) {
                bail!("Batch mode cannot replay manual overrides; pick an automatic strategy");
            }
            run_batch(&engine, reporter, &input_dir, &output_dir, stats.as_deref())
        }
    }
}
