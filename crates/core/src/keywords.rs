//! Confidence-ranked keyword sets with containment deduplication.

use crate::models::ScoredTerm;
use std::cmp::Ordering;

/// True when one text contains the other, ignoring case. Two candidates in
/// that relation name the same thing ("XGBoost" vs "XGBoost classifier").
pub fn overlaps(a: &str, b: &str) -> bool {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    a.contains(&b) || b.contains(&a)
}

fn already_kept(text: &str, kept: &[ScoredTerm]) -> bool {
    kept.iter().any(|t| overlaps(&t.text, text))
}

/// Stable descending sort by confidence; ties keep discovery order.
pub fn sort_ranked(terms: &mut [ScoredTerm]) {
    terms.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });
}

/// Sort candidates by confidence and drop every term that overlaps a
/// higher-ranked one. The highest-confidence occurrence wins.
pub fn dedup_ranked(mut terms: Vec<ScoredTerm>) -> Vec<ScoredTerm> {
    sort_ranked(&mut terms);
    let mut kept: Vec<ScoredTerm> = Vec::new();
    for term in terms {
        if term.text.trim().is_empty() || already_kept(&term.text, &kept) {
            continue;
        }
        kept.push(term);
    }
    kept
}

/// Insert an externally known algorithm at rank 0 with full confidence,
/// unless the pool already carries it.
pub fn seed_known_algorithm(terms: &mut Vec<ScoredTerm>, algorithm: &str) {
    if algorithm.trim().is_empty() || already_kept(algorithm, terms) {
        return;
    }
    terms.insert(0, ScoredTerm::new(1.0, algorithm));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term(confidence: f64, text: &str) -> ScoredTerm {
        ScoredTerm::new(confidence, text)
    }

    #[test]
    fn containment_drops_lower_ranked_overlaps() {
        let terms = vec![
            term(0.4, "XGBoost classifier"),
            term(0.9, "XGBoost"),
            term(0.5, "U-Net"),
        ];
        let kept = dedup_ranked(terms);
        let texts: Vec<&str> = kept.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["XGBoost", "U-Net"]);
    }

    #[test]
    fn no_kept_term_overlaps_a_higher_ranked_one() {
        let terms = vec![
            term(0.9, "deep neural network"),
            term(0.8, "neural network"),
            term(0.7, "network"),
            term(0.6, "random forest"),
            term(0.5, "forest"),
        ];
        let kept = dedup_ranked(terms);
        for (i, t) in kept.iter().enumerate() {
            for earlier in &kept[..i] {
                assert!(
                    !overlaps(&earlier.text, &t.text),
                    "{} overlaps {}",
                    earlier.text,
                    t.text
                );
            }
        }
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn equal_confidence_keeps_discovery_order() {
        let terms = vec![term(0.5, "alpha"), term(0.5, "bravo"), term(0.9, "top")];
        let kept = dedup_ranked(terms);
        let texts: Vec<&str> = kept.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["top", "alpha", "bravo"]);
    }

    #[test]
    fn dedup_is_idempotent() {
        let terms = vec![term(0.5, "bravo"), term(0.9, "alpha")];
        let once = dedup_ranked(terms.clone());
        let twice = dedup_ranked(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn containment_compare_ignores_case() {
        let kept = dedup_ranked(vec![term(0.9, "XGBoost"), term(0.5, "xgboost model")]);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn seed_goes_first_when_new() {
        let mut terms = vec![term(0.8, "U-Net")];
        seed_known_algorithm(&mut terms, "ResNet-50");
        assert_eq!(terms[0].text, "ResNet-50");
        assert!((terms[0].confidence - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn seed_skips_already_present_algorithm() {
        let mut terms = vec![term(0.8, "ResNet-50 backbone")];
        seed_known_algorithm(&mut terms, "ResNet-50");
        assert_eq!(terms.len(), 1);
    }

    #[test]
    fn blank_terms_are_discarded() {
        let kept = dedup_ranked(vec![term(0.9, "  "), term(0.5, "U-Net")]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].text, "U-Net");
    }
}
