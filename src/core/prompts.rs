use super::models::CandidateRecord;

/// Categories the analyzer scores from 0 to 10. `buzzwords` and
/// `ai_generated` are lower-is-better.
pub const ANALYSIS_CATEGORIES: &[&str] = &[
    "grammar",
    "technical",
    "consistency",
    "buzzwords",
    "verifiability",
    "realism",
    "detailing",
    "education",
    "employers",
    "external_presence",
    "professionalism",
    "ai_generated",
];

pub fn resume_analysis_prompt() -> String {
    let category_list = ANALYSIS_CATEGORIES
        .iter()
        .map(|c| {
            if *c == "buzzwords" {
                format!("- {c} (lower is better)")
            } else {
                format!("- {c}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n");
    let score_fields = json_fields("number");
    let explanation_fields = json_fields("string");

    format!(
        r#"You are an expert in resume analysis and verification. Your task is to analyze the provided resume (attached image or PDF) for authenticity and provide:

A credibility score between 0–100, where 0 indicates a highly suspicious/fabricated resume and 100 indicates a highly credible resume.

A list of possible red flags or areas of concern with brief explanations.

A structured breakdown of the resume's content, including extracted information about the candidate's experience, education, skills, and career progression.

A summary of the reasoning behind your credibility score.

**Additionally, provide a detailed breakdown of the following categories, each scored from 0–10, and a one-sentence explanation for each:**
{category_list}

**Also, provide data for charts:**
- radar_chart_data: an array of objects with category and score for the radar chart (use the above categories)
- bar_chart_data: an array of objects with category and score for the bar chart (use the above categories)

**Return your response in the following JSON format:**
{{
  "credibility_score": number,
  "red_flags": [
    {{ "issue": string, "description": string }}
  ],
  "extracted_resume_data": {{
    "name": string,
    "contact_info": string,
    "education": [
      {{ "degree": string, "institution": string, "graduation_year": number }}
    ],
    "experience": [
      {{ "company": string, "role": string, "start_date": string, "end_date": string, "description": string }}
    ],
    "skills": string[]
  }},
  "reasoning": string[],
  "category_scores": {{
{score_fields}
  }},
  "category_explanations": {{
{explanation_fields}
  }},
  "radar_chart_data": [
    {{ "category": string, "score": number }}
  ],
  "bar_chart_data": [
    {{ "category": string, "score": number }}
  ]
}}"#
    )
}

fn json_fields(value_type: &str) -> String {
    ANALYSIS_CATEGORIES
        .iter()
        .map(|c| format!("    \"{c}\": {value_type}"))
        .collect::<Vec<_>>()
        .join(",\n")
}

pub fn interview_questions_prompt(candidate: &CandidateRecord) -> String {
    let experience = match candidate {
        CandidateRecord::Internal(c) => c.experience.clone(),
        CandidateRecord::External(c) => match c.account_age_years {
            Some(years) => format!("{years} years of public GitHub activity"),
            None => "Not specified".to_string(),
        },
    };
    let summary = match candidate.blurb().trim() {
        "" => "Not provided",
        blurb => blurb,
    };

    format!(
        r#"You are an expert HR interviewer. Generate 8-10 personalized interview questions for the candidate "{name}" based on their profile.

CANDIDATE PROFILE:
- Skills: {skills}
- Experience: {experience}
- Summary: {summary}

REQUIREMENTS:
1. Generate exactly 8-10 questions
2. Mix of technical, behavioral, and situational questions
3. Questions should be relevant to their specific skills and experience
4. Include different difficulty levels (Easy, Medium, Hard)
5. Cover different categories: Technical, Behavioral, Experience, Problem-Solving, Culture Fit

Return ONLY a valid JSON array with this exact format:
[
  {{
    "question": "Can you walk me through your experience with [specific technology from their skills]?",
    "category": "Technical",
    "difficulty": "Medium",
    "focus_area": "Technology Experience"
  }}
]

Make questions specific to their background, not generic. Use their actual skills and experience in the questions."#,
        name = candidate.name(),
        skills = candidate.skills().join(", "),
    )
}
