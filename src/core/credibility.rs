use std::collections::BTreeMap;

use super::field_extractor;
use super::models::{RedFlag, ScoreBreakdown};

const TECHNICAL_KEYWORDS: &[&str] = &[
    "api",
    "database",
    "algorithm",
    "architecture",
    "performance",
    "scalable",
];
const BUZZWORDS: &[&str] = &["rockstar", "ninja", "guru", "synergy", "leverage", "paradigm"];

pub const GRAMMAR: &str = "grammar";
pub const TECHNICAL: &str = "technical";
pub const CONSISTENCY: &str = "consistency";
pub const BUZZWORDS_KEY: &str = "buzzwords";
pub const VERIFIABILITY: &str = "verifiability";

/// Local, offline estimate of how trustworthy a resume reads. Every
/// sub-score is on a 1–10 scale.
#[derive(Debug, Clone, PartialEq)]
pub struct CredibilityAssessment {
    pub overall: f64,
    pub grammar: f64,
    pub technical: f64,
    pub consistency: f64,
    pub buzzwords: f64,
    pub verifiability: f64,
    pub red_flags: Vec<RedFlag>,
}

impl CredibilityAssessment {
    /// Sub-scores keyed the way the resume analyzer keys them, so buzzwords
    /// is reported as density where lower is better.
    pub fn breakdown(&self) -> ScoreBreakdown {
        let scores = BTreeMap::from([
            (GRAMMAR.to_string(), self.grammar),
            (TECHNICAL.to_string(), self.technical),
            (CONSISTENCY.to_string(), self.consistency),
            (BUZZWORDS_KEY.to_string(), round1(10.0 - self.buzzwords)),
            (VERIFIABILITY.to_string(), self.verifiability),
        ]);
        let explanations = BTreeMap::from([
            (
                GRAMMAR.to_string(),
                "Writing clarity, penalised for run-on text and corporate filler".to_string(),
            ),
            (
                TECHNICAL.to_string(),
                "Depth of technical vocabulary such as APIs, databases and architecture"
                    .to_string(),
            ),
            (
                CONSISTENCY.to_string(),
                "Date ranges that run forwards and do not end in the future".to_string(),
            ),
            (
                BUZZWORDS_KEY.to_string(),
                "Lower is better; rises with each buzzword like ninja or guru".to_string(),
            ),
            (
                VERIFIABILITY.to_string(),
                "How much contact and profile information can be checked".to_string(),
            ),
        ]);
        ScoreBreakdown {
            scores,
            explanations,
        }
    }
}

/// Scores `text` (resume body, or the spreadsheet summary when no resume
/// exists). `contact_confidence` is the 0–1 completeness of extracted
/// contact details.
pub fn assess(text: &str, contact_confidence: f64) -> CredibilityAssessment {
    let lowered = text.to_lowercase();

    let segments = text.split(['.', '!', '?']).count();
    let mut grammar = 10.0;
    if segments > 20 {
        grammar -= 2.0;
    }
    if text.contains("utilize") || text.contains("synergize") {
        grammar -= 1.0;
    }
    let grammar: f64 = f64::clamp(grammar, 1.0, 10.0);

    let technical_matches = TECHNICAL_KEYWORDS
        .iter()
        .filter(|keyword| lowered.contains(*keyword))
        .count();
    let technical = f64::min(10.0, technical_matches as f64 * 1.5 + 3.0);

    let buzzword_count = BUZZWORDS
        .iter()
        .filter(|word| lowered.contains(*word))
        .count();
    let buzzwords = f64::max(1.0, 10.0 - buzzword_count as f64 * 2.0);

    let inconsistencies = field_extractor::inconsistent_date_ranges(text);
    let consistency = f64::max(1.0, 10.0 - inconsistencies as f64 * 2.0);

    let verifiability = round1((5.0 + contact_confidence.clamp(0.0, 1.0) * 5.0).clamp(1.0, 10.0));

    let overall = round1((grammar + technical + consistency + buzzwords + verifiability) / 5.0);

    let mut red_flags = Vec::new();
    if grammar < 6.0 {
        red_flags.push(RedFlag {
            issue: "Weak writing quality".to_string(),
            description: format!("Grammar score of {grammar}/10 suggests unclear or padded writing"),
        });
    }
    if technical < 5.0 {
        red_flags.push(RedFlag {
            issue: "Limited technical depth".to_string(),
            description: format!(
                "Only {technical_matches} technical keyword(s) found in the resume"
            ),
        });
    }
    if buzzwords < 7.0 {
        red_flags.push(RedFlag {
            issue: "Buzzword overuse".to_string(),
            description: format!("{buzzword_count} buzzwords found, e.g. ninja, guru or synergy"),
        });
    }
    if consistency < 7.0 {
        red_flags.push(RedFlag {
            issue: "Inconsistent dates".to_string(),
            description: format!(
                "{inconsistencies} date range(s) run backwards or end in the future"
            ),
        });
    }

    CredibilityAssessment {
        overall,
        grammar,
        technical,
        consistency,
        buzzwords,
        verifiability,
        red_flags,
    }
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
