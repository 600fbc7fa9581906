//! CLI utility to import curator spam labels from a CSV file.

use std::path::PathBuf;

use modsieve::config::PipelineConfig;
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

    let mut conn = store::open(&config.db_path).map_err(|err| err.to_string())?;
    let detector = SpamDetector::new(&config);
    let import = detector
        .load_labels(&mut conn, &options.csv_path)
        .map_err(|err| err.to_string())?;

    println!(
        "Imported {} curator label(s); {} unknown id(s) skipped.",
        import.updated.len(),
        import.skipped
    );
    Ok(())
}

#[derive(Debug, Default)]
struct Options {
    csv_path: PathBuf,
    db_path: Option<PathBuf>,
}

fn parse_args(args: Vec<String>) -> Result<Option<Options>, String> {
    let mut csv_path: Option<PathBuf> = None;
    let mut db_path: Option<PathBuf> = None;
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => {
                println!("{}", help_text());
                return Ok(None);
            }
            "--csv" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--csv requires a value".to_string())?;
                csv_path = Some(PathBuf::from(value));
            }
            "--db" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--db requires a value".to_string())?;
                db_path = Some(PathBuf::from(value));
            }
            unknown => {
                return Err(format!("Unknown argument: {unknown}\n\n{}", help_text()));
            }
        }
        idx += 1;
    }

    let csv_path = csv_path.ok_or_else(help_text)?;
    Ok(Some(Options { csv_path, db_path }))
}

fn help_text() -> String {
    [
        "modsieve-import-labels",
        "",
        "Imports curator spam labels from a CSV with header `user_id,is_spam`.",
        "Rows whose user id is unknown are skipped. Curator labels are",
        "authoritative and are never overwritten by classifier predictions.",
        "",
        "Usage:",
        "  modsieve-import-labels --csv <file> [--db <path>]",
        "",
        "Options:",
        "  --csv <file>   Label CSV to import (required).",
        "  --db <path>    Curation database (defaults to the app data location).",
    ]
    .join("\n")
}
