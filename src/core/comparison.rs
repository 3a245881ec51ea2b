use super::models::{CandidateRecord, ComparisonResult};

struct Category {
    name: &'static str,
    first_wins: &'static str,
    second_wins: &'static str,
    value: fn(&CandidateRecord) -> f64,
}

const CATEGORIES: &[Category] = &[
    Category {
        name: "Overall Score",
        first_wins: "Higher credibility and technical assessment",
        second_wins: "Better overall evaluation metrics",
        value: |c| c.score(),
    },
    Category {
        name: "Technical Breadth",
        first_wins: "Demonstrates proficiency in more technologies",
        second_wins: "Shows expertise across diverse technical areas",
        value: |c| c.skills().len() as f64,
    },
    Category {
        name: "Experience Level",
        first_wins: "More years of professional experience",
        second_wins: "Greater industry experience and exposure",
        value: |c| f64::from(c.experience_years()),
    },
];

/// Head-to-head results in fixed category order. The first candidate only
/// wins a category with a strictly greater value, so ties go to the second.
pub fn compare_candidates(first: &CandidateRecord, second: &CandidateRecord) -> Vec<ComparisonResult> {
    CATEGORIES
        .iter()
        .map(|category| {
            let score1 = (category.value)(first);
            let score2 = (category.value)(second);
            let first_wins = score1 > score2;

            ComparisonResult {
                winner: if first_wins { first.name() } else { second.name() }.to_string(),
                category: category.name.to_string(),
                reason: if first_wins {
                    category.first_wins
                } else {
                    category.second_wins
                }
                .to_string(),
                score1,
                score2,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::github::mock_candidates;
    use crate::core::models::{Candidate, CandidateSource, ScoreBreakdown};

    fn internal(name: &str, score: f64, skills: &[&str], experience: &str) -> CandidateRecord {
        CandidateRecord::Internal(Candidate {
            id: name.to_string(),
            name: name.to_string(),
            title: "Engineer".to_string(),
            email: None,
            phone: None,
            location: None,
            linked_in: None,
            git_hub: None,
            skills: skills.iter().map(|s| s.to_string()).collect(),
            summary: String::new(),
            experience: experience.to_string(),
            score,
            score_breakdown: ScoreBreakdown::default(),
            red_flags: Vec::new(),
            timeline: Vec::new(),
            source: CandidateSource::Spreadsheet { row: 1 },
        })
    }

    #[test]
    fn higher_score_wins_overall() {
        let a = internal("Ada", 8.7, &["Rust"], "3 years");
        let b = internal("Bob", 7.1, &["Go", "Python"], "6+ years");

        let results = compare_candidates(&a, &b);
        let categories: Vec<&str> = results.iter().map(|r| r.category.as_str()).collect();
        assert_eq!(
            categories,
            vec!["Overall Score", "Technical Breadth", "Experience Level"]
        );

        assert_eq!(results[0].winner, "Ada");
        assert_eq!(results[0].reason, "Higher credibility and technical assessment");
        assert_eq!((results[0].score1, results[0].score2), (8.7, 7.1));

        assert_eq!(results[1].winner, "Bob");
        assert_eq!(results[1].reason, "Shows expertise across diverse technical areas");

        assert_eq!(results[2].winner, "Bob");
        assert_eq!((results[2].score1, results[2].score2), (3.0, 6.0));
    }

    #[test]
    fn ties_go_to_the_second_candidate() {
        let a = internal("Ada", 8.0, &["Rust"], "5 years");
        let b = internal("Bob", 8.0, &["Go"], "5 years");

        for result in compare_candidates(&a, &b) {
            assert_eq!(result.winner, "Bob");
        }
    }

    #[test]
    fn external_candidates_use_account_age() {
        let sarah = CandidateRecord::External(mock_candidates("sarah").remove(0));
        let alex = CandidateRecord::External(mock_candidates("alex").remove(0));

        let results = compare_candidates(&sarah, &alex);
        assert_eq!(results[0].winner, "Alex Rodriguez");
        assert_eq!((results[2].score1, results[2].score2), (4.0, 6.0));
    }
}
