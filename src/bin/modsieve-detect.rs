//! CLI utility to run the spam pipeline and print current verdicts.

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
    if let Some(artifact_dir) = options.artifact_dir {
        config.artifact_dir = artifact_dir;
    }
    if let Some(threshold) = options.text_threshold {
        config.text_threshold = threshold;
    }
    if let Some(threshold) = options.user_threshold {
        config.user_threshold = threshold;
    }

    let mut conn = store::open(&config.db_path).map_err(|err| err.to_string())?;
    let detector = SpamDetector::new(&config);
    let verdicts = detector.execute(&mut conn).map_err(|err| err.to_string())?;

    println!("Curator-confirmed spam: {}", verdicts.curator_confirmed.len());
    println!(
        "Text classifier flags (confidence > {:.2}): {}",
        config.text_threshold,
        verdicts.text_flagged.len()
    );
    println!(
        "User classifier flags (confidence > {:.2}): {}",
        config.user_threshold,
        verdicts.user_flagged.len()
    );
    let combined = verdicts.combined();
    println!("Combined spam records: {}", combined.len());
    if options.list {
        for user_id in &verdicts.curator_confirmed {
            println!("  {user_id}  curator");
        }
        for (user_id, confidence) in &verdicts.text_flagged {
            println!("  {user_id}  text {confidence:.3}");
        }
        for (user_id, confidence) in &verdicts.user_flagged {
            println!("  {user_id}  user {confidence:.3}");
        }
    }
    Ok(())
}

#[derive(Debug, Default)]
struct Options {
    db_path: Option<PathBuf>,
    artifact_dir: Option<PathBuf>,
    text_threshold: Option<f64>,
    user_threshold: Option<f64>,
    list: bool,
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
            "--text-threshold" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--text-threshold requires a value".to_string())?;
                options.text_threshold = Some(
                    value
                        .parse::<f64>()
                        .map_err(|_| format!("Invalid --text-threshold value: {value}"))?,
                );
            }
            "--user-threshold" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--user-threshold requires a value".to_string())?;
                options.user_threshold = Some(
                    value
                        .parse::<f64>()
                        .map_err(|_| format!("Invalid --user-threshold value: {value}"))?,
                );
            }
            "--list" => {
                options.list = true;
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
        "modsieve-detect",
        "",
        "Runs spam prediction for records that need it (training lazily when",
        "no model artifact exists) and prints the current verdicts: the union",
        "of curator-confirmed spam and classifier flags above threshold.",
        "",
        "Usage:",
        "  modsieve-detect [--db <path>] [--artifacts <dir>] [options]",
        "",
        "Options:",
        "  --db <path>             Curation database.",
        "  --artifacts <dir>       Model artifact directory.",
        "  --text-threshold <f64>  Text classifier spam threshold (default 0.5).",
        "  --user-threshold <f64>  User classifier spam threshold (default 0.5).",
        "  --list                  Print each flagged record id.",
    ]
    .join("\n")
}
