use anyhow::Context;
use chrono::{Datelike, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};
use uuid::Uuid;

use super::credibility;
use super::document_parser::ResumeDocumentParser;
use super::errors::CoreError;
use super::field_extractor::{self, ContactFields};
use super::gemini::ResumeAnalyzer;
use super::models::{
    Candidate, CandidateSource, ExtractedResumeData, ResumeAnalysis, ResumeExtractionResult,
    ResumeUpload, ScoreBreakdown, TimelineEntry, TimelineKind, UploadBatch,
};
use super::spreadsheet::{self, SpreadsheetRow};

pub const PLACEHOLDER_TITLE: &str = "Position To Be Determined";
pub const PENDING_SUMMARY: &str = "Resume analysis pending";
pub const PENDING_EXPERIENCE: &str = "To be determined";

const RESUME_EXTENSIONS: &[&str] = &[".pdf", ".docx", ".doc", ".txt"];

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").unwrap());

struct ProcessedResume {
    file_name: String,
    display_name: String,
    extraction: ResumeExtractionResult,
    analysis: Option<ResumeAnalysis>,
}

impl ProcessedResume {
    fn matches_row(&self, row_name: &str) -> bool {
        let row_name = normalize_name(row_name);
        normalize_name(&self.display_name) == row_name
            || self
                .extraction
                .name
                .as_deref()
                .is_some_and(|guess| normalize_name(guess) == row_name)
    }
}

/// Turns one upload batch into candidate records. The batch succeeds or
/// fails as a whole.
pub struct CandidateNormalizer<'a> {
    parser: &'a ResumeDocumentParser,
    analyzer: Option<&'a dyn ResumeAnalyzer>,
}

impl<'a> CandidateNormalizer<'a> {
    pub fn new(parser: &'a ResumeDocumentParser, analyzer: Option<&'a dyn ResumeAnalyzer>) -> Self {
        Self { parser, analyzer }
    }

    pub async fn process_uploads(&self, batch: &UploadBatch) -> anyhow::Result<Vec<Candidate>> {
        if batch.spreadsheet.is_none() && batch.resumes.is_empty() {
            return Err(
                CoreError::InvalidRequest("no spreadsheet or resumes provided".to_string()).into(),
            );
        }

        let rows = match &batch.spreadsheet {
            Some(upload) => spreadsheet::read_rows(upload)?,
            None => Vec::new(),
        };

        let mut resumes = Vec::with_capacity(batch.resumes.len());
        for upload in &batch.resumes {
            let processed = self
                .process_resume(upload)
                .await
                .with_context(|| format!("failed to process resume {}", upload.file_name))?;
            resumes.push(processed);
        }

        let mut matched = vec![false; resumes.len()];
        let mut candidates = Vec::with_capacity(rows.len() + resumes.len());

        for row in &rows {
            let resume_index =
                (0..resumes.len()).find(|&i| !matched[i] && resumes[i].matches_row(&row.name));
            let resume = resume_index.map(|i| {
                matched[i] = true;
                &resumes[i]
            });
            if let Some(resume) = resume {
                debug!(row = row.row, file_name = %resume.file_name, "matched resume to row");
            }

            let mut candidate = candidate_from_row(row, resume);
            enrich(&mut candidate, resume);
            candidates.push(candidate);
        }

        for (resume, _) in resumes.iter().zip(&matched).filter(|(_, used)| !**used) {
            let mut candidate = candidate_from_resume(resume);
            enrich(&mut candidate, Some(resume));
            candidates.push(candidate);
        }

        info!(
            rows = rows.len(),
            resumes = resumes.len(),
            candidates = candidates.len(),
            analyzed = self.analyzer.is_some(),
            "normalized upload batch"
        );
        Ok(candidates)
    }

    async fn process_resume(&self, upload: &ResumeUpload) -> anyhow::Result<ProcessedResume> {
        let extraction = self
            .parser
            .parse_resume_bytes(&upload.file_name, &upload.bytes)
            .await?;

        let analysis = match self.analyzer {
            Some(analyzer) => Some(analyzer.analyze_resume(upload).await?),
            None => None,
        };

        Ok(ProcessedResume {
            file_name: upload.file_name.clone(),
            display_name: name_from_file_name(&upload.file_name),
            extraction,
            analysis,
        })
    }
}

/// `jane_doe-cv.pdf` -> `jane doe cv`.
pub fn name_from_file_name(file_name: &str) -> String {
    let base = std::path::Path::new(file_name)
        .file_name()
        .and_then(|v| v.to_str())
        .unwrap_or(file_name);
    let lower = base.to_ascii_lowercase();
    let stem = RESUME_EXTENSIONS
        .iter()
        .find(|ext| lower.ends_with(*ext))
        .map(|ext| &base[..base.len() - ext.len()])
        .unwrap_or(base);

    stem.replace(['-', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn candidate_from_row(row: &SpreadsheetRow, resume: Option<&ProcessedResume>) -> Candidate {
    let source = match resume {
        Some(resume) => CandidateSource::Merged {
            row: row.row,
            file_name: resume.file_name.clone(),
        },
        None => CandidateSource::Spreadsheet { row: row.row },
    };

    Candidate {
        id: Uuid::new_v4().to_string(),
        name: row.name.clone(),
        title: if row.title.is_empty() {
            PLACEHOLDER_TITLE.to_string()
        } else {
            row.title.clone()
        },
        email: row.email.clone(),
        phone: row.phone.clone(),
        location: row.location.clone(),
        linked_in: None,
        git_hub: None,
        skills: row.skills.clone(),
        summary: row.summary.clone(),
        experience: row.experience.clone(),
        score: 0.0,
        score_breakdown: ScoreBreakdown::default(),
        red_flags: Vec::new(),
        timeline: Vec::new(),
        source,
    }
}

fn candidate_from_resume(resume: &ProcessedResume) -> Candidate {
    Candidate {
        id: Uuid::new_v4().to_string(),
        name: resume.display_name.clone(),
        title: PLACEHOLDER_TITLE.to_string(),
        email: None,
        phone: None,
        location: None,
        linked_in: None,
        git_hub: None,
        skills: Vec::new(),
        summary: PENDING_SUMMARY.to_string(),
        experience: PENDING_EXPERIENCE.to_string(),
        score: 0.0,
        score_breakdown: ScoreBreakdown::default(),
        red_flags: Vec::new(),
        timeline: Vec::new(),
        source: CandidateSource::Resume {
            file_name: resume.file_name.clone(),
        },
    }
}

fn enrich(candidate: &mut Candidate, resume: Option<&ProcessedResume>) {
    if let Some(resume) = resume {
        fill_contacts(candidate, &resume.extraction);
    }

    match resume.and_then(|r| r.analysis.as_ref()) {
        Some(analysis) => apply_analysis(candidate, analysis),
        None => apply_heuristics(candidate, resume.map(|r| &r.extraction)),
    }

    if candidate.title.is_empty() || candidate.title == PLACEHOLDER_TITLE {
        if let Some(work) = candidate
            .timeline
            .iter()
            .find(|entry| entry.kind == TimelineKind::Work && !entry.title.is_empty())
        {
            candidate.title = work.title.clone();
        }
    }
    if candidate.experience.is_empty() || candidate.experience == PENDING_EXPERIENCE {
        if let Some(experience) = experience_from_timeline(&candidate.timeline) {
            candidate.experience = experience;
        }
    }

    if !candidate.score.is_finite() {
        candidate.score = 0.0;
    }
    if candidate.name.trim().is_empty() {
        candidate.name = match &candidate.source {
            CandidateSource::Spreadsheet { row } | CandidateSource::Merged { row, .. } => {
                format!("Candidate {row}")
            }
            CandidateSource::Resume { file_name } => file_name.clone(),
        };
    }
}

fn fill_contacts(candidate: &mut Candidate, extraction: &ResumeExtractionResult) {
    if candidate.email.is_none() {
        candidate.email = extraction.email.clone();
    }
    if candidate.phone.is_none() {
        candidate.phone = extraction.phone.clone();
    }
    if candidate.linked_in.is_none() {
        candidate.linked_in = extraction.linked_in.clone();
    }
    if candidate.git_hub.is_none() {
        candidate.git_hub = extraction.git_hub.clone();
    }
}

fn apply_analysis(candidate: &mut Candidate, analysis: &ResumeAnalysis) {
    let data = &analysis.extracted_resume_data;

    candidate.score = analysis.credibility_score / 10.0;
    candidate.red_flags = analysis.red_flags.clone();
    merge_skills(&mut candidate.skills, &data.skills);
    candidate.timeline = timeline_from_analysis(data);
    candidate.score_breakdown = ScoreBreakdown {
        scores: analysis.category_breakdown(),
        explanations: analysis.category_explanations.clone(),
    };

    if !analysis.reasoning.is_empty() {
        candidate.summary = analysis.reasoning.join(" ");
    }
    if matches!(candidate.source, CandidateSource::Resume { .. }) && !data.name.trim().is_empty() {
        candidate.name = data.name.trim().to_string();
    }
}

fn apply_heuristics(candidate: &mut Candidate, extraction: Option<&ResumeExtractionResult>) {
    let resume_text = extraction
        .map(|e| e.text.as_str())
        .filter(|text| !text.trim().is_empty());

    let confidence = match extraction {
        Some(extraction) => extraction.confidence,
        None => {
            let contacts = ContactFields {
                email: candidate.email.clone(),
                phone: candidate.phone.clone(),
                linked_in: candidate.linked_in.clone(),
                git_hub: candidate.git_hub.clone(),
            };
            field_extractor::contact_confidence(Some(candidate.name.as_str()), &contacts, false)
        }
    };

    let assessment = credibility::assess(resume_text.unwrap_or(&candidate.summary), confidence);
    candidate.score = assessment.overall;
    candidate.score_breakdown = assessment.breakdown();
    candidate.red_flags = assessment.red_flags;

    if let Some(text) = resume_text {
        candidate.timeline = field_extractor::parse_timeline(text);
        merge_skills(&mut candidate.skills, &field_extractor::detect_skills(text));
    }
}

// Appends skills not already present, compared case-insensitively.
fn merge_skills(skills: &mut Vec<String>, extra: &[String]) {
    for skill in extra {
        let skill = skill.trim();
        if !skill.is_empty() && !skills.iter().any(|s| s.eq_ignore_ascii_case(skill)) {
            skills.push(skill.to_string());
        }
    }
}

fn timeline_from_analysis(data: &ExtractedResumeData) -> Vec<TimelineEntry> {
    let work = data.experience.iter().map(|entry| TimelineEntry {
        kind: TimelineKind::Work,
        title: entry.role.clone(),
        organization: entry.company.clone(),
        start_date: entry.start_date.clone(),
        end_date: entry.end_date.clone(),
        description: entry.description.clone(),
    });
    let education = data.education.iter().map(|entry| TimelineEntry {
        kind: TimelineKind::Education,
        title: entry.degree.clone(),
        organization: entry.institution.clone(),
        start_date: String::new(),
        end_date: entry
            .graduation_year
            .map(|year| year.to_string())
            .unwrap_or_default(),
        description: String::new(),
    });
    work.chain(education).collect()
}

/// Span of the work entries in whole years, e.g. "5 years".
fn experience_from_timeline(timeline: &[TimelineEntry]) -> Option<String> {
    let current_year = Utc::now().year();
    let year_of = |value: &str| -> Option<i32> {
        if value.trim().eq_ignore_ascii_case("present") {
            return Some(current_year);
        }
        YEAR_RE.find(value).and_then(|m| m.as_str().parse().ok())
    };

    let work = timeline.iter().filter(|e| e.kind == TimelineKind::Work);
    let start = work.clone().filter_map(|e| year_of(&e.start_date)).min()?;
    let end = work.filter_map(|e| year_of(&e.end_date)).max()?;
    if end < start {
        return None;
    }

    let years = end - start;
    Some(if years == 1 {
        "1 year".to_string()
    } else {
        format!("{years} years")
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use async_trait::async_trait;

    use super::*;
    use crate::core::models::{
        ChartPoint, EducationEntry, ExperienceEntry, RedFlag, SpreadsheetUpload,
    };
    use crate::core::pdf::PdfTextExtractor;

    const JANE_RESUME: &str = "Jane Doe\njane.doe@example.com\nlinkedin.com/in/janedoe\n\
        Built a scalable API and tuned database performance with Python and Docker.\n\
        Senior Engineer at Acme (2018-2022)\n";

    struct CannedAnalyzer(ResumeAnalysis);

    #[async_trait]
    impl ResumeAnalyzer for CannedAnalyzer {
        async fn analyze_resume(&self, _upload: &ResumeUpload) -> anyhow::Result<ResumeAnalysis> {
            Ok(self.0.clone())
        }
    }

    struct FailingAnalyzer;

    #[async_trait]
    impl ResumeAnalyzer for FailingAnalyzer {
        async fn analyze_resume(&self, _upload: &ResumeUpload) -> anyhow::Result<ResumeAnalysis> {
            Err(CoreError::AnalysisParse.into())
        }
    }

    fn parser() -> ResumeDocumentParser {
        ResumeDocumentParser::new(PdfTextExtractor::new(None))
    }

    fn resume(file_name: &str, text: &str) -> ResumeUpload {
        ResumeUpload {
            file_name: file_name.to_string(),
            bytes: text.as_bytes().to_vec(),
        }
    }

    fn sheet(body: &str) -> SpreadsheetUpload {
        SpreadsheetUpload {
            file_name: "candidates.csv".to_string(),
            bytes: body.as_bytes().to_vec(),
        }
    }

    fn analysis() -> ResumeAnalysis {
        ResumeAnalysis {
            credibility_score: 82.0,
            red_flags: vec![RedFlag {
                issue: "Employment gap".to_string(),
                description: "No role listed for 2016".to_string(),
            }],
            extracted_resume_data: ExtractedResumeData {
                name: "Jane Q. Doe".to_string(),
                contact_info: String::new(),
                education: vec![EducationEntry {
                    degree: "BSc Computer Science".to_string(),
                    institution: "State University".to_string(),
                    graduation_year: Some(2015),
                }],
                experience: vec![ExperienceEntry {
                    company: "Acme".to_string(),
                    role: "Staff Engineer".to_string(),
                    start_date: "2016".to_string(),
                    end_date: "2021".to_string(),
                    description: "Platform team".to_string(),
                }],
                skills: vec!["Rust".to_string(), "python".to_string()],
            },
            reasoning: vec!["Consistent history.".to_string(), "Verifiable links.".to_string()],
            category_scores: BTreeMap::from([("technical".to_string(), 8.0)]),
            category_explanations: BTreeMap::from([(
                "technical".to_string(),
                "Solid depth".to_string(),
            )]),
            radar_chart_data: Vec::new(),
            bar_chart_data: vec![ChartPoint {
                category: "experience".to_string(),
                score: 7.5,
            }],
        }
    }

    #[tokio::test]
    async fn spreadsheet_rows_become_scored_candidates() {
        let parser = parser();
        let normalizer = CandidateNormalizer::new(&parser, None);
        let batch = UploadBatch {
            spreadsheet: Some(sheet(
                "name,title,skills,summary\nAda,Engineer,Rust;Go,Designs scalable API architecture\n,,Python,\n",
            )),
            resumes: Vec::new(),
        };

        let candidates = normalizer.process_uploads(&batch).await.unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].name, "Ada");
        assert_eq!(candidates[1].name, "Candidate 2");
        assert_eq!(candidates[1].title, PLACEHOLDER_TITLE);
        assert!(candidates.iter().all(|c| c.score.is_finite() && c.score > 0.0));
        assert_eq!(candidates[0].score_breakdown.scores.len(), 5);
        assert_eq!(candidates[0].source, CandidateSource::Spreadsheet { row: 1 });
    }

    #[tokio::test]
    async fn resume_only_candidates_use_file_names_and_text() {
        let parser = parser();
        let normalizer = CandidateNormalizer::new(&parser, None);
        let batch = UploadBatch {
            spreadsheet: None,
            resumes: vec![resume("jane_doe.txt", JANE_RESUME)],
        };

        let candidates = normalizer.process_uploads(&batch).await.unwrap();
        let jane = &candidates[0];
        assert_eq!(jane.name, "jane doe");
        assert_eq!(jane.email.as_deref(), Some("jane.doe@example.com"));
        assert_eq!(jane.timeline.len(), 1);
        assert_eq!(jane.title, "Senior Engineer");
        assert_eq!(jane.experience, "4 years");
        assert_eq!(jane.summary, PENDING_SUMMARY);
        assert!(jane.skills.contains(&"Python".to_string()));
        assert!(jane.skills.contains(&"Docker".to_string()));
    }

    #[tokio::test]
    async fn resumes_merge_into_matching_rows_and_the_rest_are_appended() {
        let parser = parser();
        let normalizer = CandidateNormalizer::new(&parser, None);
        let batch = UploadBatch {
            spreadsheet: Some(sheet("Name,Email\nJane Doe,\nBob Stone,bob@example.com\n")),
            resumes: vec![
                resume("Jane-Doe.txt", JANE_RESUME),
                resume("carl.txt", "Carl Rivers\ncarl@example.com"),
            ],
        };

        let candidates = normalizer.process_uploads(&batch).await.unwrap();
        assert_eq!(candidates.len(), 3);

        assert_eq!(
            candidates[0].source,
            CandidateSource::Merged {
                row: 1,
                file_name: "Jane-Doe.txt".to_string()
            }
        );
        assert_eq!(candidates[0].email.as_deref(), Some("jane.doe@example.com"));
        assert_eq!(
            candidates[0].linked_in.as_deref(),
            Some("https://www.linkedin.com/in/janedoe")
        );
        assert_eq!(candidates[1].source, CandidateSource::Spreadsheet { row: 2 });
        assert_eq!(candidates[2].name, "carl");
    }

    #[tokio::test]
    async fn analysis_is_merged_into_the_record() {
        let parser = parser();
        let analyzer = CannedAnalyzer(analysis());
        let normalizer = CandidateNormalizer::new(&parser, Some(&analyzer));
        let batch = UploadBatch {
            spreadsheet: None,
            resumes: vec![resume("jane_doe.txt", JANE_RESUME)],
        };

        let candidates = normalizer.process_uploads(&batch).await.unwrap();
        let jane = &candidates[0];
        assert_eq!(jane.name, "Jane Q. Doe");
        assert!((jane.score - 8.2).abs() < 1e-9);
        assert_eq!(jane.red_flags.len(), 1);
        assert_eq!(jane.skills, vec!["Rust", "python"]);
        assert_eq!(jane.timeline.len(), 2);
        assert_eq!(jane.timeline[1].kind, TimelineKind::Education);
        assert_eq!(jane.timeline[1].end_date, "2015");
        assert_eq!(jane.title, "Staff Engineer");
        assert_eq!(jane.experience, "5 years");
        assert_eq!(jane.summary, "Consistent history. Verifiable links.");
        assert_eq!(jane.score_breakdown.scores["technical"], 8.0);
        assert_eq!(jane.score_breakdown.scores["experience"], 7.5);
    }

    #[tokio::test]
    async fn legacy_doc_resume_is_scored_by_the_analyzer() {
        let parser = parser();
        let analyzer = CannedAnalyzer(analysis());
        let normalizer = CandidateNormalizer::new(&parser, Some(&analyzer));
        let batch = UploadBatch {
            spreadsheet: Some(sheet("name\nAda\n")),
            resumes: vec![ResumeUpload {
                file_name: "jane_doe.doc".to_string(),
                bytes: b"\xd0\xcf\x11\xe0legacy".to_vec(),
            }],
        };

        let candidates = normalizer.process_uploads(&batch).await.unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].name, "Ada");

        let jane = &candidates[1];
        assert_eq!(jane.name, "Jane Q. Doe");
        assert!((jane.score - 8.2).abs() < 1e-9);
        assert_eq!(
            jane.source,
            CandidateSource::Resume {
                file_name: "jane_doe.doc".to_string()
            }
        );
    }

    #[tokio::test]
    async fn legacy_doc_resume_without_analyzer_keeps_the_file_name() {
        let parser = parser();
        let normalizer = CandidateNormalizer::new(&parser, None);
        let batch = UploadBatch {
            spreadsheet: None,
            resumes: vec![resume("jane_doe.doc", "not really text")],
        };

        let candidates = normalizer.process_uploads(&batch).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].name, "jane doe");
        assert!(candidates[0].score.is_finite());
    }

    #[tokio::test]
    async fn non_finite_scores_are_zeroed() {
        let parser = parser();
        let mut broken = analysis();
        broken.credibility_score = f64::NAN;
        let analyzer = CannedAnalyzer(broken);
        let normalizer = CandidateNormalizer::new(&parser, Some(&analyzer));
        let batch = UploadBatch {
            spreadsheet: None,
            resumes: vec![resume("x.txt", "text")],
        };

        let candidates = normalizer.process_uploads(&batch).await.unwrap();
        assert_eq!(candidates[0].score, 0.0);
    }

    #[tokio::test]
    async fn one_failed_analysis_aborts_the_batch() {
        let parser = parser();
        let analyzer = FailingAnalyzer;
        let normalizer = CandidateNormalizer::new(&parser, Some(&analyzer));
        let batch = UploadBatch {
            spreadsheet: Some(sheet("name\nAda\n")),
            resumes: vec![resume("ada.txt", "Ada"), resume("bob.txt", "Bob")],
        };

        let err = normalizer.process_uploads(&batch).await.unwrap_err();
        assert!(format!("{err:#}").contains("ada.txt"));
        assert!(format!("{err:#}").contains("Failed to parse resume analysis response"));
    }

    #[tokio::test]
    async fn empty_batch_is_rejected() {
        let parser = parser();
        let normalizer = CandidateNormalizer::new(&parser, None);
        assert!(normalizer
            .process_uploads(&UploadBatch::default())
            .await
            .is_err());
    }

    #[test]
    fn file_names_become_display_names() {
        assert_eq!(name_from_file_name("jane_doe-cv.PDF"), "jane doe cv");
        assert_eq!(name_from_file_name("/tmp/resumes/Tom--Baker.docx"), "Tom Baker");
        assert_eq!(name_from_file_name("notes.md"), "notes.md");
    }
}
