//! CLI utility to match unmapped raw tags against the existing canonical
//! vocabulary.

use std::path::PathBuf;

use modsieve::artifacts::ArtifactStore;
use modsieve::config::PipelineConfig;
use modsieve::dedupe::{PAIR_MODEL_KEY, PairModel, match_tags};
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
    if let Some(threshold) = options.threshold {
        config.search_threshold = threshold;
    }

    let conn = store::open(&config.db_path).map_err(|err| err.to_string())?;
    let canon = store::tags::all_canonical_names(&conn).map_err(|err| err.to_string())?;
    if canon.is_empty() {
        return Err("No canonical tags exist yet; run modsieve-tag-cluster first.".to_string());
    }
    let unmapped = store::tags::unmapped_tag_names(&conn).map_err(|err| err.to_string())?;
    if unmapped.is_empty() {
        println!("Every tag is already mapped.");
        return Ok(());
    }

    let artifacts = ArtifactStore::new(config.artifact_dir.clone());
    let model = if artifacts.exists(PAIR_MODEL_KEY) {
        artifacts.load(PAIR_MODEL_KEY).map_err(|err| err.to_string())?
    } else {
        PairModel::default()
    };

    let outcome = match_tags(&model, &unmapped, &canon, config.search_threshold);
    if !options.dry_run {
        for matched in &outcome.matched {
            store::tags::upsert_mapping(&conn, &matched.tag, &matched.canonical, matched.confidence)
                .map_err(|err| err.to_string())?;
        }
    }

    println!(
        "Matched {} of {} unmapped tag(s) above threshold {:.2}{}.",
        outcome.matched.len(),
        unmapped.len(),
        config.search_threshold,
        if options.dry_run { " (dry run)" } else { "" }
    );
    for matched in &outcome.matched {
        println!("  {:?} -> {:?} ({:.3})", matched.tag, matched.canonical, matched.confidence);
    }
    if !outcome.unmatched.is_empty() {
        println!("Unmatched (left for a human to decide):");
        for tag in &outcome.unmatched {
            println!("  {tag:?}");
        }
    }
    Ok(())
}

#[derive(Debug, Default)]
struct Options {
    db_path: Option<PathBuf>,
    artifact_dir: Option<PathBuf>,
    threshold: Option<f64>,
    dry_run: bool,
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
            "--threshold" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--threshold requires a value".to_string())?;
                options.threshold = Some(
                    value
                        .parse::<f64>()
                        .map_err(|_| format!("Invalid --threshold value: {value}"))?,
                );
            }
            "--dry-run" => {
                options.dry_run = true;
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
        "modsieve-tag-gazetteer",
        "",
        "Searches the canonical vocabulary for each unmapped raw tag and",
        "writes a mapping when the best similarity exceeds the threshold.",
        "Tags with no qualifying canon are reported unmatched, never",
        "force-assigned.",
        "",
        "Usage:",
        "  modsieve-tag-gazetteer [--db <path>] [--artifacts <dir>] [options]",
        "",
        "Options:",
        "  --db <path>        Curation database.",
        "  --artifacts <dir>  Model artifact directory.",
        "  --threshold <f64>  Search threshold (default 0.5).",
        "  --dry-run          Print matches without writing mappings.",
    ]
    .join("\n")
}
