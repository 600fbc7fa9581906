//! CLI utility to inspect curation-pipeline state: record label coverage
//! and tag vocabulary totals.

use std::path::PathBuf;

use modsieve::config::PipelineConfig;
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

    let mut config = PipelineConfig::load().map_err(|err| err.to_string())?;
    if let Some(db_path) = options.db_path {
        config.db_path = db_path;
    }

    let conn = store::open(&config.db_path).map_err(|err| err.to_string())?;
    let counts = store::spam::status_counts(&conn).map_err(|err| err.to_string())?;
    println!("records: {}", counts.total);
    println!("  curator-labelled : {}", counts.curator_labelled);
    println!("  curator spam     : {}", counts.curator_spam);
    println!("  predicted only   : {}", counts.predicted_only);
    println!("  untouched        : {}", counts.untouched);
    println!("  used for training: {}", counts.training_data);

    let tags = store::tags::all_tag_names(&conn).map_err(|err| err.to_string())?;
    let canon = store::tags::all_canonical_names(&conn).map_err(|err| err.to_string())?;
    let mappings = store::tags::all_mappings(&conn).map_err(|err| err.to_string())?;
    let pending = store::tags::pending_cleanups(&conn).map_err(|err| err.to_string())?;
    println!("tags: {}", tags.len());
    println!("  canonical        : {}", canon.len());
    println!("  mapped           : {}", mappings.len());
    println!("  pending cleanups : {}", pending.len());
    Ok(())
}

#[derive(Debug, Default)]
struct Options {
    db_path: Option<PathBuf>,
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
        "modsieve-status",
        "",
        "Prints read-only curation counters: label coverage per record state",
        "and tag vocabulary totals.",
        "",
        "Usage:",
        "  modsieve-status [--db <path>]",
        "",
        "Options:",
        "  --db <path>  Curation database (defaults to the app data location).",
    ]
    .join("\n")
}
