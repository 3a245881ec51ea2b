use std::collections::BTreeMap;

use super::credibility::round1;
use super::models::{BreakdownBar, CandidateRecord, ScoreBreakdown, SkillCount, TalentAnalytics};

pub const QUALIFIED_SCORE: f64 = 7.5;
const TOP_SKILL_COUNT: usize = 10;

// Categories where a low score is the good outcome.
const LOWER_IS_BETTER: &[&str] = &["buzzwords"];

pub fn talent_analytics(candidates: &[CandidateRecord]) -> TalentAnalytics {
    let total = candidates.len();
    let average = if total == 0 {
        0.0
    } else {
        round1(candidates.iter().map(CandidateRecord::score).sum::<f64>() / total as f64)
    };

    let external = candidates.iter().filter(|c| c.is_external()).count();
    let candidates_by_source = BTreeMap::from([
        ("Resume Upload".to_string(), total - external),
        ("GitHub Search".to_string(), external),
    ]);

    let count_where = |predicate: fn(f64) -> bool| {
        candidates.iter().filter(|c| predicate(c.score())).count()
    };
    let score_distribution = BTreeMap::from([
        ("High (8.5+)".to_string(), count_where(|s| s >= 8.5)),
        ("Medium (7-8.4)".to_string(), count_where(|s| (7.0..8.5).contains(&s))),
        ("Low (<7)".to_string(), count_where(|s| s < 7.0)),
    ]);

    TalentAnalytics {
        total_candidates: total,
        qualified_candidates: count_where(|s| s >= QUALIFIED_SCORE),
        average_score: average,
        top_skills: top_skills(candidates),
        candidates_by_source,
        score_distribution,
    }
}

/// Most frequent skills, ties kept in first-seen order.
pub fn top_skills(candidates: &[CandidateRecord]) -> Vec<SkillCount> {
    let mut counts: Vec<SkillCount> = Vec::new();
    for skill in candidates.iter().flat_map(|c| c.skills()) {
        match counts.iter_mut().find(|entry| &entry.skill == skill) {
            Some(entry) => entry.count += 1,
            None => counts.push(SkillCount {
                skill: skill.clone(),
                count: 1,
            }),
        }
    }

    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(TOP_SKILL_COUNT);
    counts
}

/// Chart rows for a score breakdown, inverted where lower is better so that
/// a taller bar always reads as better.
pub fn breakdown_bars(breakdown: &ScoreBreakdown) -> Vec<BreakdownBar> {
    breakdown
        .scores
        .iter()
        .map(|(key, value)| {
            let score = if LOWER_IS_BETTER.contains(&key.as_str()) {
                round1(10.0 - value)
            } else {
                *value
            };
            BreakdownBar {
                category: display_category(key),
                score,
                color: score_color(score).to_string(),
            }
        })
        .collect()
}

pub fn score_color(score: f64) -> &'static str {
    if score >= 8.0 {
        "#22c55e"
    } else if score >= 6.0 {
        "#eab308"
    } else if score >= 4.0 {
        "#f97316"
    } else {
        "#ef4444"
    }
}

fn display_category(key: &str) -> String {
    let spaced = key.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Highest score first, optionally keeping only candidates at or above
/// `min_score` and with a skill containing `skill` (case-insensitive).
pub fn rank_candidates(
    mut candidates: Vec<CandidateRecord>,
    min_score: Option<f64>,
    skill: Option<&str>,
) -> Vec<CandidateRecord> {
    let needle = skill
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());

    candidates.retain(|candidate| {
        let score_ok = min_score.map_or(true, |min| candidate.score() >= min);
        let skill_ok = needle.as_deref().map_or(true, |needle| {
            candidate
                .skills()
                .iter()
                .any(|s| s.to_lowercase().contains(needle))
        });
        score_ok && skill_ok
    });
    candidates.sort_by(|a, b| b.score().total_cmp(&a.score()));
    candidates
}
