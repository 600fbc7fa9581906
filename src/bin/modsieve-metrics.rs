//! CLI utility to print persisted classifier metrics without retraining.

use std::path::PathBuf;

use modsieve::config::PipelineConfig;
use modsieve::ml::metrics::ModelMetrics;
use modsieve::spam::SpamDetector;

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

    let mut config = PipelineConfig::load().map_err(|err| err.to_string())?;
    if let Some(artifact_dir) = options.artifact_dir {
        config.artifact_dir = artifact_dir;
    }

    let detector = SpamDetector::new(&config);
    let metrics = detector.get_metrics().map_err(|err| err.to_string())?;
    print_metrics("text classifier", &metrics.text);
    print_metrics("user classifier", &metrics.user);
    Ok(())
}

fn print_metrics(name: &str, metrics: &ModelMetrics) {
    println!("{name}:");
    println!("  accuracy : {:.4}", metrics.accuracy);
    println!("  precision: {:.4}", metrics.precision);
    println!("  recall   : {:.4}", metrics.recall);
    println!("  f1       : {:.4}", metrics.f1);
    println!("  held-out : {} record(s)", metrics.test_user_ids.len());
}

#[derive(Debug, Default)]
struct Options {
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
        "modsieve-metrics",
        "",
        "Prints the persisted evaluation metrics for both spam classifiers.",
        "This is a pure read: when no metrics artifact exists the command",
        "fails with `train first` instead of silently retraining.",
        "",
        "Usage:",
        "  modsieve-metrics [--artifacts <dir>]",
        "",
        "Options:",
        "  --artifacts <dir>  Model artifact directory.",
    ]
    .join("\n")
}
