//! CLI utility to retrain the spam classifiers on curator-labelled data.

use std::path::PathBuf;

use modsieve::config::PipelineConfig;
use modsieve::ml::metrics::ModelMetrics;
use modsieve::spam::SpamDetector;
use modsieve::store;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let Some(options) = parse_args(std::env::args().skip(1).collect())? else {
        return Ok(());
    };
    if let Err(err) = modsieve::logging::init() {
        eprintln!("Logging degraded to stderr only: {err}");
    }

    let mut config = PipelineConfig::load().map_err(|err| err.to_string())?;
    if let Some(db_path) = options.db_path {
        config.db_path = db_path;
    }
    if let Some(artifact_dir) = options.artifact_dir {
        config.artifact_dir = artifact_dir;
    }

    let mut conn = store::open(&config.db_path).map_err(|err| err.to_string())?;
    let detector = SpamDetector::new(&config);
    let report = detector.refine(&mut conn).map_err(|err| err.to_string())?;

    println!("Curator-labelled training rows: {}", report.training_rows);
    println!("Newly consumed for training: {}", report.newly_consumed);
    print_metrics("text classifier", report.text.as_ref());
    print_metrics("user classifier", report.user.as_ref());
    Ok(())
}

fn print_metrics(name: &str, metrics: Option<&ModelMetrics>) {
    match metrics {
        Some(metrics) => println!(
            "{name}: accuracy={:.3} precision={:.3} recall={:.3} f1={:.3} (held out {})",
            metrics.accuracy,
            metrics.precision,
            metrics.recall,
            metrics.f1,
            metrics.test_user_ids.len()
        ),
        None => println!("{name}: skipped (insufficient labelled data)"),
    }
}

#[derive(Debug, Default)]
struct Options {
    db_path: Option<PathBuf>,
    artifact_dir: Option<PathBuf>,
}

fn parse_args(args: Vec<String>) -> Result<Option<Options>, String> {
    let mut options = Options::default();
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => {
                println!("{}", help_text());
                return Ok(None);
            }
            "--db" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--db requires a value".to_string())?;
                options.db_path = Some(PathBuf::from(value));
            }
            "--artifacts" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--artifacts requires a value".to_string())?;
                options.artifact_dir = Some(PathBuf::from(value));
            }
            unknown => {
                return Err(format!("Unknown argument: {unknown}\n\n{}", help_text()));
            }
        }
        idx += 1;
    }
    Ok(Some(options))
}

fn help_text() -> String {
    [
        "modsieve-refine",
        "",
        "Retrains both spam classifiers on the curator-labelled rows. The",
        "boosted metadata model continues from its saved ensemble; consumed",
        "rows are marked as training data. Curator labels are never changed.",
        "",
        "Usage:",
        "  modsieve-refine [--db <path>] [--artifacts <dir>]",
        "",
        "Options:",
        "  --db <path>        Curation database.",
        "  --artifacts <dir>  Model artifact directory.",
    ]
    .join("\n")
}
