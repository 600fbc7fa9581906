//! CLI utility to discover canonical tags from scratch.
//!
//! Drives the active-learning session on the console: the most uncertain
//! tag pair is shown, the operator answers match/distinct, and the
//! similarity model retrains. Once labelling stops, the full tag set is
//! clustered at the configured threshold and canonical tags plus mappings
//! are written back.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use modsieve::artifacts::ArtifactStore;
use modsieve::config::PipelineConfig;
use modsieve::dedupe::{ActiveSession, PAIR_MODEL_KEY, PairModel, cluster_tags};
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
        config.cluster_threshold = threshold;
    }

    let conn = store::open(&config.db_path).map_err(|err| err.to_string())?;
    let tags = store::tags::all_tag_names(&conn).map_err(|err| err.to_string())?;
    if tags.is_empty() {
        println!("No tags to cluster.");
        return Ok(());
    }

    let artifacts = ArtifactStore::new(config.artifact_dir.clone());
    let model = if artifacts.exists(PAIR_MODEL_KEY) {
        artifacts.load(PAIR_MODEL_KEY).map_err(|err| err.to_string())?
    } else {
        PairModel::default()
    };
    let labels = ActiveSession::load_labels(&artifacts).map_err(|err| err.to_string())?;
    let mut session = ActiveSession::with_labels(&tags, model, labels);

    if !options.auto {
        label_on_console(&mut session, options.max_labels)?;
        session.save_labels(&artifacts).map_err(|err| err.to_string())?;
        artifacts
            .save(PAIR_MODEL_KEY, session.model())
            .map_err(|err| err.to_string())?;
    }

    let clusters = cluster_tags(session.model(), &tags, config.cluster_threshold);
    let mut mappings_written = 0usize;
    for cluster in &clusters {
        store::tags::ensure_canonical_tag(&conn, &cluster.canonical)
            .map_err(|err| err.to_string())?;
        for (member, confidence) in &cluster.members {
            store::tags::upsert_mapping(&conn, member, &cluster.canonical, *confidence)
                .map_err(|err| err.to_string())?;
            mappings_written += 1;
        }
    }

    let merged = clusters.iter().filter(|c| !c.members.is_empty()).count();
    println!(
        "Clustered {} tag(s) into {} group(s) ({} with duplicates) at threshold {:.2}.",
        tags.len(),
        clusters.len(),
        merged,
        config.cluster_threshold
    );
    println!("Wrote {mappings_written} canonical mapping(s).");
    Ok(())
}

/// Blocking console loop over uncertain pairs: y = match, n = distinct,
/// u = unsure (set aside), f = finish labelling.
fn label_on_console(session: &mut ActiveSession, max_labels: usize) -> Result<(), String> {
    let stdin = std::io::stdin();
    let mut line = String::new();
    let mut answered = 0usize;
    while answered < max_labels {
        let Some(pair) = session.next_uncertain_pair() else {
            break;
        };
        println!();
        println!("  {:?}  <->  {:?}   (score {:.3})", pair.left, pair.right, pair.score);
        print!("Same tag? (y)es / (n)o / (u)nsure / (f)inish: ");
        std::io::stdout().flush().map_err(|err| err.to_string())?;

        line.clear();
        stdin
            .lock()
            .read_line(&mut line)
            .map_err(|err| err.to_string())?;
        match line.trim().to_lowercase().as_str() {
            "y" | "yes" => {
                session.record_label(&pair.left, &pair.right, true);
                answered += 1;
            }
            "n" | "no" => {
                session.record_label(&pair.left, &pair.right, false);
                answered += 1;
            }
            "u" | "unsure" => session.skip(&pair.left, &pair.right),
            "f" | "finish" | "" => break,
            other => println!("Unrecognized answer {other:?}; expected y/n/u/f."),
        }
    }
    println!("Labelled {answered} pair(s) this session.");
    Ok(())
}

#[derive(Debug, Default)]
struct Options {
    db_path: Option<PathBuf>,
    artifact_dir: Option<PathBuf>,
    threshold: Option<f64>,
    auto: bool,
    max_labels: usize,
}

fn parse_args(args: Vec<String>) -> Result<Option<Options>, String> {
    let mut options = Options {
        max_labels: 50,
        ..Options::default()
    };
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
            "--max-labels" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--max-labels requires a value".to_string())?;
                options.max_labels = value
                    .parse::<usize>()
                    .map_err(|_| format!("Invalid --max-labels value: {value}"))?;
            }
            "--auto" => {
                options.auto = true;
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
        "modsieve-tag-cluster",
        "",
        "Interactively labels uncertain tag pairs, retrains the similarity",
        "model, then clusters the full tag set at the configured threshold.",
        "Each cluster's shortest member becomes the canonical tag; the other",
        "members are mapped to it with the model's confidence.",
        "",
        "Usage:",
        "  modsieve-tag-cluster [--db <path>] [--artifacts <dir>] [options]",
        "",
        "Options:",
        "  --db <path>        Curation database.",
        "  --artifacts <dir>  Model artifact directory.",
        "  --threshold <f64>  Cluster membership threshold (default 0.5).",
        "  --max-labels <n>   Stop asking after n labels (default 50).",
        "  --auto             Skip labelling; cluster with the saved model.",
    ]
    .join("\n")
}
