//! Gazetteer matching: assign unmapped raw tags to an existing canonical
//! vocabulary.
//!
//! Each tag is scored against every canonical name; the best score above
//! the search threshold wins. Tags with no qualifying canon are reported
//! unmatched rather than force-assigned, so a human can decide whether to
//! lower the threshold, add training pairs, or leave them unmapped.

use super::similarity::PairModel;

/// A successful gazetteer match.
#[derive(Debug, Clone, PartialEq)]
pub struct GazetteerMatch {
    pub tag: String,
    pub canonical: String,
    pub confidence: f64,
}

/// Outcome of a gazetteer run over a batch of unmapped tags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GazetteerOutcome {
    pub matched: Vec<GazetteerMatch>,
    pub unmatched: Vec<String>,
}

/// Match each unmapped tag against the canonical list.
pub fn match_tags(
    model: &PairModel,
    unmapped: &[String],
    canon: &[String],
    threshold: f64,
) -> GazetteerOutcome {
    let mut outcome = GazetteerOutcome::default();
    for tag in unmapped {
        let mut best: Option<(usize, f64)> = None;
        for (idx, canonical) in canon.iter().enumerate() {
            let score = model.score(tag, canonical);
            if score > threshold && best.map(|(_, current)| score > current).unwrap_or(true) {
                best = Some((idx, score));
            }
        }
        match best {
            Some((idx, confidence)) => outcome.matched.push(GazetteerMatch {
                tag: tag.clone(),
                canonical: canon[idx].clone(),
                confidence,
            }),
            None => outcome.unmatched.push(tag.clone()),
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn versioned_tag_matches_its_canonical_name() {
        let model = PairModel::default();
        let outcome = match_tags(
            &model,
            &names(&["NetLogo 6.0"]),
            &names(&["NetLogo", "Python"]),
            0.5,
        );
        assert_eq!(outcome.matched.len(), 1);
        assert_eq!(outcome.matched[0].canonical, "NetLogo");
        assert!(outcome.matched[0].confidence > 0.5);
        assert!(outcome.unmatched.is_empty());
    }

    #[test]
    fn nonsense_tag_is_reported_unmatched_never_forced() {
        let model = PairModel::default();
        let outcome = match_tags(
            &model,
            &names(&["xyzzyzzy123"]),
            &names(&["NetLogo", "Python"]),
            0.5,
        );
        assert!(outcome.matched.is_empty());
        assert_eq!(outcome.unmatched, names(&["xyzzyzzy123"]));
    }

    #[test]
    fn best_scoring_canon_wins_when_several_qualify() {
        let model = PairModel::default();
        let outcome = match_tags(
            &model,
            &names(&["NetLogo 6"]),
            &names(&["NetLogo 6.0", "NetLogo"]),
            0.3,
        );
        assert_eq!(outcome.matched.len(), 1);
        let chosen = &outcome.matched[0];
        let alternative = if chosen.canonical == "NetLogo" {
            "NetLogo 6.0"
        } else {
            "NetLogo"
        };
        assert!(chosen.confidence >= model.score("NetLogo 6", alternative));
    }
}
