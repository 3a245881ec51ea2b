use super::models::{Assessment, CandidateInsights, CandidateRecord, Insight, InsightKind};

pub fn overall_assessment(score: f64) -> Assessment {
    if score >= 8.5 {
        Assessment::Excellent
    } else if score >= 7.0 {
        Assessment::Good
    } else if score >= 5.5 {
        Assessment::Average
    } else {
        Assessment::Poor
    }
}

/// Rule-based report for one candidate. Deterministic and offline.
pub fn analyze_candidate(candidate: &CandidateRecord) -> CandidateInsights {
    CandidateInsights {
        insights: generate_insights(candidate),
        summary: generate_summary(candidate),
        recommendations: generate_recommendations(candidate),
        risk_factors: generate_risk_factors(candidate),
        overall_assessment: overall_assessment(candidate.score()),
    }
}

fn experience_text(candidate: &CandidateRecord) -> &str {
    match candidate {
        CandidateRecord::Internal(c) => &c.experience,
        CandidateRecord::External(_) => "",
    }
}

fn has_skill(candidate: &CandidateRecord, skill: &str) -> bool {
    candidate.skills().iter().any(|s| s == skill)
}

fn generate_insights(candidate: &CandidateRecord) -> Vec<Insight> {
    let score = candidate.score();
    let mut insights = Vec::new();

    if score >= 8.5 {
        insights.push(Insight {
            kind: InsightKind::Strength,
            title: "Exceptional Candidate".to_string(),
            description: "This candidate demonstrates outstanding qualifications and would be an excellent addition to any team.".to_string(),
            confidence: 0.95,
        });
    }

    if has_skill(candidate, "React") && has_skill(candidate, "TypeScript") {
        insights.push(Insight {
            kind: InsightKind::Strength,
            title: "Modern Frontend Expertise".to_string(),
            description: "Strong proficiency in current industry-standard frontend technologies."
                .to_string(),
            confidence: 0.88,
        });
    }

    if candidate.red_flag_count() > 0 {
        insights.push(Insight {
            kind: InsightKind::RedFlag,
            title: "Potential Concerns Detected".to_string(),
            description: "Some inconsistencies or gaps identified that may require further investigation.".to_string(),
            confidence: 0.75,
        });
    }

    insights.push(Insight {
        kind: InsightKind::Recommendation,
        title: "Interview Recommendation".to_string(),
        description: if score >= 7.5 {
            "Highly recommended for technical interview"
        } else {
            "Consider for initial screening call"
        }
        .to_string(),
        confidence: 0.82,
    });

    insights
}

fn generate_summary(candidate: &CandidateRecord) -> String {
    let score = candidate.score();
    let tier = if score >= 8.5 {
        "exceptional"
    } else if score >= 7.0 {
        "strong"
    } else {
        "moderate"
    };
    let level = if candidate.experience_years() >= 5 {
        "senior"
    } else {
        "mid-level"
    };
    let top_skills = candidate
        .skills()
        .iter()
        .take(3)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    let flags = if candidate.red_flag_count() == 0 {
        "no significant red flags"
    } else {
        "some areas of concern"
    };

    format!(
        "{} is a {tier} candidate with {level} experience. They demonstrate proficiency in {top_skills} and show {flags} in their background.",
        candidate.name()
    )
}

fn generate_recommendations(candidate: &CandidateRecord) -> Vec<String> {
    let score = candidate.score();
    let mut recommendations: Vec<String> = if score >= 8.0 {
        vec![
            "Fast-track for senior role consideration".into(),
            "Schedule technical deep-dive interview".into(),
        ]
    } else if score >= 7.0 {
        vec![
            "Proceed with standard interview process".into(),
            "Assess technical skills through coding challenge".into(),
        ]
    } else {
        vec![
            "Consider for junior or mid-level positions".into(),
            "Provide additional training and mentorship".into(),
        ]
    };

    if has_skill(candidate, "Leadership") || experience_text(candidate).contains("Lead") {
        recommendations.push("Evaluate for team lead or management track".to_string());
    }

    recommendations
}

fn generate_risk_factors(candidate: &CandidateRecord) -> Vec<String> {
    let mut risks = Vec::new();

    if candidate.red_flag_count() > 1 {
        risks.push("Multiple inconsistencies in background information".to_string());
    }
    if experience_text(candidate).contains("gap") {
        risks.push("Employment gaps may indicate career instability".to_string());
    }
    if candidate.score() < 6.0 {
        risks.push("Below-average assessment scores may indicate skill gaps".to_string());
    }
    if risks.is_empty() {
        risks.push("No significant risk factors identified".to_string());
    }

    risks
}
