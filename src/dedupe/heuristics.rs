//! Deterministic pre-clustering heuristics used to bootstrap cleanup before
//! the learned model: stemmed-token grouping and a fixed table of known
//! platform/language aliases.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use regex::Regex;

/// Proposed rename `old_name` -> `new_name`.
pub type Rename = (String, String);

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "based", "for", "in", "of", "on", "or", "the", "to", "using", "with",
];

// Order matters: earlier rules win, so the more specific alias comes first
// (JavaScript before Java).
const PLATFORM_RULES: &[(&str, &str)] = &[
    ("NetLogo", r"(?i)\bnet\s*logo\b"),
    ("Repast", r"(?i)\brepast(\s+simphony)?\b"),
    ("Mesa", r"(?i)\bmesa\b"),
    ("GAMA", r"(?i)\bgama\b"),
    ("AnyLogic", r"(?i)\bany\s*logic\b"),
    ("MATLAB", r"(?i)\bmat\s*lab\b"),
    ("Python", r"(?i)\bpython\b"),
    ("JavaScript", r"(?i)\bjava\s*script\b"),
    ("Java", r"(?i)\bjava\b"),
    ("C++", r"(?i)\bc\s*\+\+"),
    ("Julia", r"(?i)\bjulia\b"),
    ("Stata", r"(?i)\bstata\b"),
    ("R", r"(?i)^r$|\br[\s-]+(language|project|stats)\b"),
    ("Linux", r"(?i)\bgnu[/\s-]*linux\b|\blinux\b"),
];

fn platform_rules() -> &'static [(&'static str, Regex)] {
    static RULES: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    RULES.get_or_init(|| {
        PLATFORM_RULES
            .iter()
            .map(|(canonical, pattern)| {
                (
                    *canonical,
                    Regex::new(pattern).expect("platform alias regex must compile"),
                )
            })
            .collect()
    })
}

/// True for tags that are nothing but a version number (`6`, `6.0.4`,
/// `v2.1`); those never participate in alias normalization.
pub fn is_version_string(tag: &str) -> bool {
    static VERSION_RE: OnceLock<Regex> = OnceLock::new();
    let re = VERSION_RE
        .get_or_init(|| Regex::new(r"^[vV]?\d+(\.\d+)*$").expect("version regex must compile"));
    re.is_match(tag.trim())
}

/// Normalize known platform/language aliases to their canonical names.
/// First matching rule wins; tags already canonical and pure version
/// strings are left alone.
pub fn platform_renames(tags: &[String]) -> Vec<Rename> {
    let mut renames = Vec::new();
    for tag in tags {
        if is_version_string(tag) {
            continue;
        }
        for (canonical, regex) in platform_rules() {
            if regex.is_match(tag) {
                if tag != canonical {
                    renames.push((tag.clone(), canonical.to_string()));
                }
                break;
            }
        }
    }
    renames
}

/// Group tags whose stop-word-filtered, stemmed token sets match exactly;
/// the shortest surviving name (ties broken lexicographically) becomes the
/// target of the group's renames. The proposed names are always drawn from
/// the input set, so grouping can only reduce the distinct-name count.
pub fn stem_group_renames(tags: &[String]) -> Vec<Rename> {
    let mut groups: BTreeMap<String, Vec<&String>> = BTreeMap::new();
    for tag in tags {
        let key = stemmed_key(tag);
        if key.is_empty() {
            continue;
        }
        groups.entry(key).or_default().push(tag);
    }

    let mut renames = Vec::new();
    for members in groups.into_values() {
        if members.len() < 2 {
            continue;
        }
        let canonical = members
            .iter()
            .min_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)))
            .expect("non-empty group");
        for member in &members {
            if member != canonical {
                renames.push(((*member).clone(), (*canonical).clone()));
            }
        }
    }
    renames
}

/// Canonical grouping key: lowercased tokens, stop words dropped, stemmed,
/// sorted, joined by a space.
pub fn stemmed_key(tag: &str) -> String {
    static TOKEN_RE: OnceLock<Regex> = OnceLock::new();
    let re = TOKEN_RE.get_or_init(|| Regex::new(r"\w+").expect("token regex must compile"));
    let stop_words: BTreeSet<&str> = STOP_WORDS.iter().copied().collect();
    let mut stems: BTreeSet<String> = re
        .find_iter(&tag.to_lowercase())
        .map(|token| token.as_str())
        .filter(|token| !stop_words.contains(token))
        .map(stem)
        .collect();
    stems.remove("");
    stems.into_iter().collect::<Vec<_>>().join(" ")
}

/// Simple suffix-stripping stemmer; strips to a fixpoint so plural and
/// derivational variants of the same word land on one stem.
fn stem(word: &str) -> String {
    const SUFFIXES: &[&str] = &[
        "ization", "ational", "ation", "ment", "ness", "ings", "ing", "ies", "ity", "ed", "es",
        "ly", "s",
    ];
    let mut current = word.to_string();
    loop {
        let stripped = SUFFIXES.iter().find_map(|suffix| {
            (current.len() > suffix.len() + 2 && current.ends_with(suffix))
                .then(|| current[..current.len() - suffix.len()].to_string())
        });
        match stripped {
            Some(shorter) => current = shorter,
            None => return current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn stem_grouping_collapses_inflected_variants() {
        let input = tags(&[
            "agent-based model",
            "agent-based models",
            "agent based modeling",
            "network theory",
        ]);
        let renames = stem_group_renames(&input);
        assert_eq!(renames.len(), 2);
        for (old, new) in &renames {
            assert_eq!(new, "agent-based model");
            assert!(input.contains(old));
        }
    }

    #[test]
    fn stem_grouping_never_invents_names_or_grows_the_set() {
        let input = tags(&["simulations", "simulation", "ecology", "economies"]);
        let renames = stem_group_renames(&input);
        let mut distinct: BTreeSet<String> = input.iter().cloned().collect();
        for (old, new) in &renames {
            assert!(input.contains(old));
            assert!(input.contains(new));
            distinct.remove(old);
        }
        assert!(distinct.len() <= input.len());
        assert!(distinct.contains("simulation"));
    }

    #[test]
    fn platform_aliases_normalize_to_canonical_names() {
        let input = tags(&["netlogo 6.0", "Net Logo", "javascript", "java", "GNU/Linux"]);
        let renames = platform_renames(&input);
        let expect = |old: &str, new: &str| {
            assert!(
                renames
                    .iter()
                    .any(|(o, n)| o == old && n == new),
                "missing {old} -> {new} in {renames:?}"
            );
        };
        expect("netlogo 6.0", "NetLogo");
        expect("Net Logo", "NetLogo");
        expect("javascript", "JavaScript");
        expect("java", "Java");
        expect("GNU/Linux", "Linux");
    }

    #[test]
    fn pure_version_strings_are_excluded() {
        assert!(is_version_string("6.0"));
        assert!(is_version_string("v2.1.3"));
        assert!(!is_version_string("NetLogo 6.0"));
        let renames = platform_renames(&tags(&["6.0", "2.1"]));
        assert!(renames.is_empty());
    }

    #[test]
    fn canonical_tags_are_left_alone() {
        let renames = platform_renames(&tags(&["NetLogo", "Python"]));
        assert!(renames.is_empty());
    }
}
