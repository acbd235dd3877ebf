use strsim::normalized_levenshtein;

const MIN_SIMILARITY: f64 = 0.6;

/// Find the candidate most similar to `target`, ignoring case.
/// Candidates that contain the target outright are preferred.
pub fn find_similar(target: &str, candidates: &[&str]) -> Option<String> {
    let target = target.trim().to_lowercase();
    if target.is_empty() {
        return None;
    }

    let mut best: Option<(&str, f64)> = None;

    for &candidate in candidates {
        let lower = candidate.to_lowercase();
        let mut score = normalized_levenshtein(&target, &lower);
        if lower.contains(&target) {
            score = score.max(0.9);
        }

        if score >= MIN_SIMILARITY && best.map_or(true, |(_, s)| score > s) {
            best = Some((candidate, score));
        }
    }

    best.map(|(candidate, _)| candidate.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_similar() {
        let candidates = [
            "diagram-t8zwaROl",
            "diagram-xYz9Kp2m",
            "Data Pipeline (AWS)",
            "CI/CD Pipeline",
        ];

        assert_eq!(
            find_similar("diagram-t8zwaRO1", &candidates),
            Some("diagram-t8zwaROl".to_string())
        );
        assert_eq!(
            find_similar("data pipeline", &candidates),
            Some("Data Pipeline (AWS)".to_string())
        );
        assert_eq!(
            find_similar("ci/cd pipelin", &candidates),
            Some("CI/CD Pipeline".to_string())
        );

        // Very different input should return None
        assert_eq!(find_similar("zzzzz", &candidates), None);
        assert_eq!(find_similar("", &candidates), None);
    }
}
