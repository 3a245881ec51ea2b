use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TimelineKind {
    Work,
    Education,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    #[serde(rename = "type")]
    pub kind: TimelineKind,
    pub title: String,
    pub organization: String,
    pub start_date: String,
    pub end_date: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RedFlag {
    pub issue: String,
    pub description: String,
}

/// Sub-scores keyed by category name, with optional one-line explanations.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScoreBreakdown {
    pub scores: BTreeMap<String, f64>,
    #[serde(default)]
    pub explanations: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CandidateSource {
    Spreadsheet { row: usize },
    Resume { file_name: String },
    Merged { row: usize, file_name: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: String,
    pub name: String,
    pub title: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub linked_in: Option<String>,
    pub git_hub: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    pub summary: String,
    pub experience: String,
    pub score: f64,
    #[serde(default)]
    pub score_breakdown: ScoreBreakdown,
    #[serde(default)]
    pub red_flags: Vec<RedFlag>,
    #[serde(default)]
    pub timeline: Vec<TimelineEntry>,
    pub source: CandidateSource,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryStats {
    pub total_commits: Option<u64>,
    pub total_stars: u64,
    pub total_forks: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalCandidate {
    pub id: String,
    pub name: String,
    pub username: String,
    pub avatar_url: String,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub email: Option<String>,
    pub blog: Option<String>,
    pub profile_url: String,
    pub score: f64,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub stats: RepositoryStats,
    pub account_age_years: Option<i64>,
    pub last_activity: Option<NaiveDate>,
    pub contribution_score: Option<f64>,
    pub code_quality_score: Option<f64>,
    pub project_diversity_score: Option<f64>,
}

/// Either kind of candidate, tagged so consumers branch explicitly instead of
/// probing for fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CandidateRecord {
    Internal(Candidate),
    External(ExternalCandidate),
}

impl CandidateRecord {
    pub fn name(&self) -> &str {
        match self {
            CandidateRecord::Internal(c) => &c.name,
            CandidateRecord::External(c) => &c.name,
        }
    }

    pub fn score(&self) -> f64 {
        match self {
            CandidateRecord::Internal(c) => c.score,
            CandidateRecord::External(c) => c.score,
        }
    }

    pub fn skills(&self) -> &[String] {
        match self {
            CandidateRecord::Internal(c) => &c.skills,
            CandidateRecord::External(c) => &c.skills,
        }
    }

    /// Title for resume candidates, username for GitHub candidates.
    pub fn headline(&self) -> &str {
        match self {
            CandidateRecord::Internal(c) => &c.title,
            CandidateRecord::External(c) => &c.username,
        }
    }

    /// Summary for resume candidates, bio for GitHub candidates.
    pub fn blurb(&self) -> &str {
        match self {
            CandidateRecord::Internal(c) => &c.summary,
            CandidateRecord::External(c) => c.bio.as_deref().unwrap_or_default(),
        }
    }

    pub fn red_flag_count(&self) -> usize {
        match self {
            CandidateRecord::Internal(c) => c.red_flags.len(),
            CandidateRecord::External(_) => 0,
        }
    }

    pub fn experience_years(&self) -> u32 {
        match self {
            CandidateRecord::Internal(c) => parse_experience_years(&c.experience),
            CandidateRecord::External(c) => c
                .account_age_years
                .map(|years| years.clamp(0, i64::from(u32::MAX)) as u32)
                .unwrap_or(0),
        }
    }

    pub fn is_external(&self) -> bool {
        matches!(self, CandidateRecord::External(_))
    }
}

impl From<Candidate> for CandidateRecord {
    fn from(candidate: Candidate) -> Self {
        CandidateRecord::Internal(candidate)
    }
}

impl From<ExternalCandidate> for CandidateRecord {
    fn from(candidate: ExternalCandidate) -> Self {
        CandidateRecord::External(candidate)
    }
}

/// First run of digits in a free-text experience description, e.g. "5+ years".
pub fn parse_experience_years(experience: &str) -> u32 {
    experience
        .split(|c: char| !c.is_ascii_digit())
        .find(|part| !part.is_empty())
        .and_then(|digits| digits.parse().ok())
        .unwrap_or(0)
}

#[derive(Debug, Clone)]
pub struct ResumeUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct SpreadsheetUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct UploadBatch {
    pub spreadsheet: Option<SpreadsheetUpload>,
    pub resumes: Vec<ResumeUpload>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    pub language: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeExtractionResult {
    pub text: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub linked_in: Option<String>,
    pub git_hub: Option<String>,
    pub confidence: f64,
    pub ocr_used: bool,
    #[serde(default)]
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResumeAnalysis {
    #[serde(default)]
    pub credibility_score: f64,
    #[serde(default)]
    pub red_flags: Vec<RedFlag>,
    #[serde(default)]
    pub extracted_resume_data: ExtractedResumeData,
    #[serde(default)]
    pub reasoning: Vec<String>,
    #[serde(default)]
    pub category_scores: BTreeMap<String, f64>,
    #[serde(default)]
    pub category_explanations: BTreeMap<String, String>,
    #[serde(default)]
    pub radar_chart_data: Vec<ChartPoint>,
    #[serde(default)]
    pub bar_chart_data: Vec<ChartPoint>,
}

impl ResumeAnalysis {
    /// Per-category scores. `category_scores` wins; the chart arrays fill in
    /// categories it leaves out. Non-finite values are dropped.
    pub fn category_breakdown(&self) -> BTreeMap<String, f64> {
        let mut scores = BTreeMap::new();
        let points = self.radar_chart_data.iter().chain(&self.bar_chart_data);
        for point in points {
            let category = point.category.trim();
            if !category.is_empty() && point.score.is_finite() {
                scores.insert(category.to_string(), point.score);
            }
        }
        for (category, score) in &self.category_scores {
            if score.is_finite() {
                scores.insert(category.clone(), *score);
            }
        }
        scores
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedResumeData {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub contact_info: String,
    #[serde(default)]
    pub education: Vec<EducationEntry>,
    #[serde(default)]
    pub experience: Vec<ExperienceEntry>,
    #[serde(default)]
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EducationEntry {
    #[serde(default)]
    pub degree: String,
    #[serde(default)]
    pub institution: String,
    #[serde(default, deserialize_with = "lenient_year")]
    pub graduation_year: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExperienceEntry {
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartPoint {
    pub category: String,
    pub score: f64,
}

// Models sometimes quote years ("2018") or send null.
fn lenient_year<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_i64().and_then(|v| i32::try_from(v).ok()),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Difficulty {
    #[serde(alias = "easy")]
    Easy,
    #[serde(alias = "medium")]
    Medium,
    #[serde(alias = "hard")]
    Hard,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewQuestion {
    pub question: String,
    #[serde(default)]
    pub category: String,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub focus_area: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    pub winner: String,
    pub category: String,
    pub reason: String,
    pub score1: f64,
    pub score2: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    Strength,
    Weakness,
    Recommendation,
    RedFlag,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub title: String,
    pub description: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Assessment {
    Excellent,
    Good,
    Average,
    Poor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateInsights {
    pub insights: Vec<Insight>,
    pub summary: String,
    pub recommendations: Vec<String>,
    pub risk_factors: Vec<String>,
    pub overall_assessment: Assessment,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersonalizedEmail {
    pub subject: String,
    pub body: String,
    pub recipient: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkillCount {
    pub skill: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TalentAnalytics {
    pub total_candidates: usize,
    pub qualified_candidates: usize,
    pub average_score: f64,
    pub top_skills: Vec<SkillCount>,
    pub candidates_by_source: BTreeMap<String, usize>,
    pub score_distribution: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakdownBar {
    pub category: String,
    pub score: f64,
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuntimeSettings {
    pub gemini_model: String,
    pub gemini_api_base: String,
    pub github_api_base: String,
    pub tesseract_path: String,
    pub ocr_timeout_seconds: u64,
    pub export_dir: String,
    pub sender_name: String,
    pub company_name: String,
    pub search_page_size: usize,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            gemini_model: "gemini-2.0-flash".to_string(),
            gemini_api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            github_api_base: "https://api.github.com".to_string(),
            tesseract_path: "tesseract".to_string(),
            ocr_timeout_seconds: 120,
            export_dir: ".".to_string(),
            sender_name: "Hiring Team".to_string(),
            company_name: "Our Company".to_string(),
            search_page_size: 20,
        }
    }
}
