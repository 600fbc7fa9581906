//! CLI utility to manage batch tag renames: propose cleanups from the
//! deterministic heuristics, list or drop pending ones, and process the
//! pending batch atomically.

use std::path::PathBuf;

use modsieve::config::PipelineConfig;
use modsieve::dedupe::heuristics::{platform_renames, stem_group_renames};
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

    match options.action {
        Action::Propose => {
            let tags = store::tags::all_tag_names(&conn).map_err(|err| err.to_string())?;
            let mut renames = stem_group_renames(&tags);
            renames.extend(platform_renames(&tags));
            renames.sort();
            renames.dedup();
            let created = store::tags::create_cleanups(&mut conn, &renames)
                .map_err(|err| err.to_string())?;
            println!("Queued {created} cleanup proposal(s) from heuristics.");
        }
        Action::List => {
            let pending = store::tags::pending_cleanups(&conn).map_err(|err| err.to_string())?;
            println!("{} pending cleanup(s):", pending.len());
            for cleanup in &pending {
                println!("  [{}] {:?} -> {:?}", cleanup.id, cleanup.old_name, cleanup.new_name);
            }
        }
        Action::Drop(ids) => {
            let deleted = store::tags::delete_pending_cleanups(&mut conn, &ids)
                .map_err(|err| err.to_string())?;
            println!("Dropped {deleted} pending cleanup(s).");
        }
        Action::Process => {
            match store::tags::process_cleanups(&mut conn).map_err(|err| err.to_string())? {
                Some(report) => {
                    println!("Processed batch as transaction {}.", report.transaction_id);
                    println!("  cleanups applied : {}", report.cleanups_processed);
                    println!("  tags created     : {}", report.tags_created);
                    println!("  tags deleted     : {}", report.tags_deleted);
                    println!("  references moved : {}", report.items_rewritten);
                }
                None => println!("No pending cleanups to process."),
            }
        }
    }
    Ok(())
}

#[derive(Debug)]
enum Action {
    Propose,
    List,
    Drop(Vec<i64>),
    Process,
}

#[derive(Debug)]
struct Options {
    db_path: Option<PathBuf>,
    action: Action,
}

fn parse_args(args: Vec<String>) -> Result<Option<Options>, String> {
    let mut db_path: Option<PathBuf> = None;
    let mut action: Option<Action> = None;
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
                db_path = Some(PathBuf::from(value));
            }
            "--heuristics" => set_action(&mut action, Action::Propose)?,
            "--list" => set_action(&mut action, Action::List)?,
            "--process" => set_action(&mut action, Action::Process)?,
            "--drop" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--drop requires a value".to_string())?;
                let ids = value
                    .split(',')
                    .map(|token| {
                        token
                            .trim()
                            .parse::<i64>()
                            .map_err(|_| format!("Invalid --drop id: {token}"))
                    })
                    .collect::<Result<Vec<i64>, String>>()?;
                set_action(&mut action, Action::Drop(ids))?;
            }
            unknown => {
                return Err(format!("Unknown argument: {unknown}\n\n{}", help_text()));
            }
        }
        idx += 1;
    }

    let action = action.ok_or_else(help_text)?;
    Ok(Some(Options { db_path, action }))
}

fn set_action(slot: &mut Option<Action>, action: Action) -> Result<(), String> {
    if slot.is_some() {
        return Err("Choose exactly one of --heuristics, --list, --drop, --process".to_string());
    }
    *slot = Some(action);
    Ok(())
}

fn help_text() -> String {
    [
        "modsieve-tag-cleanup",
        "",
        "Manages batch tag renames. Unprocessed cleanups are mutable; once a",
        "batch is processed its cleanups become immutable history. Processing",
        "rewrites every reference from each old tag to all of its new tags,",
        "deletes the old tag, and rolls the whole batch back on any failure.",
        "",
        "Usage:",
        "  modsieve-tag-cleanup --heuristics [--db <path>]",
        "  modsieve-tag-cleanup --list | --process | --drop <ids>",
        "",
        "Options:",
        "  --db <path>    Curation database.",
        "  --heuristics   Queue rename proposals from stemmed-token grouping",
        "                 and the platform alias table.",
        "  --list         Show pending (unprocessed) cleanups.",
        "  --drop <ids>   Delete pending cleanups by comma-separated id.",
        "  --process      Apply the entire pending batch in one transaction.",
    ]
    .join("\n")
}
