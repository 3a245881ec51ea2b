use std::path::{Path, PathBuf};

use anyhow::Context;
use askama::Template;
use chrono::NaiveDate;
use tracing::info;

use super::credibility::round1;
use super::models::CandidateRecord;

const CSV_HEADERS: [&str; 5] = ["Name", "Score", "Title/Username", "Skills", "Summary/Bio"];
const TOP_TIER_SCORE: f64 = 8.0;

/// Every field quoted, one line per record. Embedded line breaks are
/// flattened so the line count stays at records + 1.
pub fn candidates_to_csv(candidates: &[CandidateRecord]) -> anyhow::Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADERS)?;
    for candidate in candidates {
        writer.write_record([
            flatten(candidate.name()),
            candidate.score().to_string(),
            flatten(candidate.headline()),
            flatten(&candidate.skills().join("; ")),
            flatten(candidate.blurb()),
        ])?;
    }

    let bytes = writer.into_inner().map_err(|err| err.into_error())?;
    String::from_utf8(bytes).context("CSV export produced invalid UTF-8")
}

fn flatten(value: &str) -> String {
    value.replace("\r\n", " ").replace(['\n', '\r'], " ")
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportSummary {
    pub total_candidates: usize,
    pub average_score: f64,
    pub top_tier_candidates: usize,
}

pub fn report_summary(candidates: &[CandidateRecord]) -> ReportSummary {
    let total = candidates.len();
    let average = if total == 0 {
        0.0
    } else {
        candidates.iter().map(CandidateRecord::score).sum::<f64>() / total as f64
    };

    ReportSummary {
        total_candidates: total,
        average_score: round1(average),
        top_tier_candidates: candidates
            .iter()
            .filter(|c| c.score() >= TOP_TIER_SCORE)
            .count(),
    }
}

#[derive(Template)]
#[template(path = "report.html")]
struct ReportPage<'a> {
    title: &'a str,
    generated: String,
    total_candidates: usize,
    average_score: String,
    top_tier_candidates: usize,
    cards: Vec<ReportCard<'a>>,
}

struct ReportCard<'a> {
    name: &'a str,
    score: f64,
    headline: &'a str,
    blurb: &'a str,
    skills: &'a [String],
}

impl<'a> ReportCard<'a> {
    fn new(candidate: &'a CandidateRecord) -> Self {
        let headline = match candidate.headline().trim() {
            "" => "N/A",
            value => value,
        };
        let blurb = match candidate.blurb().trim() {
            "" => "No summary available",
            value => value,
        };
        Self {
            name: candidate.name(),
            score: candidate.score(),
            headline,
            blurb,
            skills: candidate.skills(),
        }
    }
}

/// Standalone HTML report, highest score first. Every interpolated value is
/// HTML-escaped by the template.
pub fn html_report(
    candidates: &[CandidateRecord],
    title: &str,
    generated: NaiveDate,
) -> anyhow::Result<String> {
    let summary = report_summary(candidates);

    let mut sorted: Vec<&CandidateRecord> = candidates.iter().collect();
    sorted.sort_by(|a, b| b.score().total_cmp(&a.score()));

    let page = ReportPage {
        title,
        generated: generated.format("%Y-%m-%d").to_string(),
        total_candidates: summary.total_candidates,
        average_score: format!("{:.1}", summary.average_score),
        top_tier_candidates: summary.top_tier_candidates,
        cards: sorted.into_iter().map(ReportCard::new).collect(),
    };
    page.render().context("failed to render HTML report")
}

pub fn csv_file_name(date: NaiveDate) -> String {
    format!("candidates-export-{}.csv", date.format("%Y-%m-%d"))
}

pub fn html_file_name(title: &str, date: NaiveDate) -> String {
    let slug = title
        .to_lowercase()
        .replace(['/', '\\'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-");
    let slug = if slug.is_empty() { "candidate-report".to_string() } else { slug };
    format!("{slug}-{}.html", date.format("%Y-%m-%d"))
}

/// Writes `contents` under `dir`, creating the directory if needed.
pub async fn write_export(dir: &Path, file_name: &str, contents: &str) -> anyhow::Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("failed to create export dir {}", dir.display()))?;

    let path = dir.join(file_name);
    tokio::fs::write(&path, contents)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;

    info!(path = %path.display(), bytes = contents.len(), "export written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::github::mock_candidates;
    use crate::core::models::{Candidate, CandidateSource, ScoreBreakdown};

    fn internal(name: &str, score: f64, summary: &str) -> CandidateRecord {
        CandidateRecord::Internal(Candidate {
            id: name.to_string(),
            name: name.to_string(),
            title: "Data \"Wizard\"".to_string(),
            email: None,
            phone: None,
            location: None,
            linked_in: None,
            git_hub: None,
            skills: vec!["SQL".to_string(), "dbt".to_string()],
            summary: summary.to_string(),
            experience: String::new(),
            score,
            score_breakdown: ScoreBreakdown::default(),
            red_flags: Vec::new(),
            timeline: Vec::new(),
            source: CandidateSource::Spreadsheet { row: 1 },
        })
    }

    fn sample() -> Vec<CandidateRecord> {
        let mut records = vec![
            internal("Priya Shah", 7.4, "Builds pipelines.\nLikes <b>tags</b>"),
            internal("Tom O'Neil", 8.6, ""),
        ];
        records.extend(mock_candidates("alex").into_iter().map(CandidateRecord::from));
        records
    }

    #[test]
    fn csv_has_one_line_per_candidate_plus_header() {
        let records = sample();
        let csv = candidates_to_csv(&records).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), records.len() + 1);
        assert_eq!(
            lines[0],
            r#""Name","Score","Title/Username","Skills","Summary/Bio""#
        );
        assert_eq!(
            lines[1],
            r#""Priya Shah","7.4","Data ""Wizard""","SQL; dbt","Builds pipelines. Likes <b>tags</b>""#
        );
        assert!(lines[3].starts_with(r#""Alex Rodriguez","9.1","alexcodes","#));

        for (line, record) in lines[1..].iter().zip(&records) {
            let first = line.replace('"', "");
            assert_eq!(first.split(',').next(), Some(record.name()));
        }
    }

    #[test]
    fn html_is_sorted_and_escaped() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let html = html_report(&sample(), "Q2 <Shortlist>", date).unwrap();

        assert!(html.contains("<h1>Q2 &lt;Shortlist&gt;</h1>"));
        assert!(html.contains("Generated on: 2024-06-01"));
        assert!(html.contains("<strong>Total Candidates:</strong> 3"));
        assert!(html.contains("<strong>Average Score:</strong> 8.4"));
        assert!(html.contains("<strong>Top Tier Candidates:</strong> 2"));
        assert!(html.contains("Likes &lt;b&gt;tags&lt;"));
        assert!(!html.contains("<b>tags"));
        assert!(!html.contains("O'Neil"));
        assert!(html.contains("<strong>Summary:</strong> No summary available"));
        assert!(html.contains("<strong>Title:</strong> Data &quot;Wizard&quot;"));
        assert!(html.contains(r#"<span class="skill">SQL</span>"#));

        let alex = html.find("Alex Rodriguez").unwrap();
        let tom = html.find("<h3>Tom O").unwrap();
        let priya = html.find("Priya Shah").unwrap();
        assert!(alex < tom && tom < priya);
    }

    #[test]
    fn empty_report_still_renders() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let html = html_report(&[], "Empty", date).unwrap();

        assert!(html.contains("<strong>Total Candidates:</strong> 0"));
        assert!(html.contains("<strong>Average Score:</strong> 0.0"));
        assert!(!html.contains(r#"class="candidate""#));
    }

    #[test]
    fn empty_report_has_zero_average() {
        let summary = report_summary(&[]);
        assert_eq!(summary.total_candidates, 0);
        assert_eq!(summary.average_score, 0.0);
    }

    #[test]
    fn export_file_names() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 9).unwrap();
        assert_eq!(csv_file_name(date), "candidates-export-2024-01-09.csv");
        assert_eq!(
            html_file_name("Senior  Backend Shortlist", date),
            "senior-backend-shortlist-2024-01-09.html"
        );
        assert_eq!(html_file_name("  ", date), "candidate-report-2024-01-09.html");
    }

    #[tokio::test]
    async fn exports_are_written_into_nested_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("reports/2024");

        let path = write_export(&target, "out.csv", "a,b\n").await.unwrap();
        assert_eq!(path, target.join("out.csv"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "a,b\n");
    }
}
