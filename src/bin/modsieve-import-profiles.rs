//! CLI utility to load member-profile records from a JSON export.

use std::path::PathBuf;

use modsieve::config::PipelineConfig;
use modsieve::extract::ProfileRecord;
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

    let text = std::fs::read_to_string(&options.json_path)
        .map_err(|err| format!("Read {} failed: {err}", options.json_path.display()))?;
    let records: Vec<ProfileRecord> =
        serde_json::from_str(&text).map_err(|err| format!("Parse profile JSON failed: {err}"))?;

    let conn = store::open(&config.db_path).map_err(|err| err.to_string())?;
    let mut imported = 0usize;
    let mut skipped = 0usize;
    for record in records {
        let user_id = record.user_id;
        match record.into_store_row() {
            Ok(row) => {
                store::spam::upsert_row(&conn, &row).map_err(|err| err.to_string())?;
                imported += 1;
            }
            Err(err) => {
                if options.strict {
                    return Err(err.to_string());
                }
                eprintln!("Skipping user {user_id}: {err}");
                skipped += 1;
            }
        }
    }

    println!("Imported {imported} profile(s); {skipped} malformed row(s) skipped.");
    Ok(())
}

#[derive(Debug, Default)]
struct Options {
    json_path: PathBuf,
    db_path: Option<PathBuf>,
    strict: bool,
}

fn parse_args(args: Vec<String>) -> Result<Option<Options>, String> {
    let mut json_path: Option<PathBuf> = None;
    let mut db_path: Option<PathBuf> = None;
    let mut strict = false;
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => {
                println!("{}", help_text());
                return Ok(None);
            }
            "--json" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--json requires a value".to_string())?;
                json_path = Some(PathBuf::from(value));
            }
            "--db" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--db requires a value".to_string())?;
                db_path = Some(PathBuf::from(value));
            }
            "--strict" => {
                strict = true;
            }
            unknown => {
                return Err(format!("Unknown argument: {unknown}\n\n{}", help_text()));
            }
        }
        idx += 1;
    }

    let json_path = json_path.ok_or_else(help_text)?;
    Ok(Some(Options {
        json_path,
        db_path,
        strict,
    }))
}

fn help_text() -> String {
    [
        "modsieve-import-profiles",
        "",
        "Loads member profiles from a JSON array of records into the curation",
        "database. Affiliation entries must be structured objects; malformed",
        "rows are skipped with a warning unless --strict is set.",
        "",
        "Usage:",
        "  modsieve-import-profiles --json <file> [--db <path>] [--strict]",
        "",
        "Options:",
        "  --json <file>  Profile export to import (required).",
        "  --db <path>    Curation database (defaults to the app data location).",
        "  --strict       Abort the whole import on the first malformed row.",
    ]
    .join("\n")
}
