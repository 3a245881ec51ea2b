use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use super::document_parser::mime_type_for;
use super::errors::CoreError;
use super::models::{CandidateRecord, InterviewQuestion, ResumeAnalysis, ResumeUpload};
use super::prompts;

/// Anything that can turn resume bytes into a structured analysis. The
/// normalizer only sees this seam, so tests swap in a canned analyzer.
#[async_trait]
pub trait ResumeAnalyzer: Send + Sync {
    async fn analyze_resume(&self, upload: &ResumeUpload) -> anyhow::Result<ResumeAnalysis>;
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
}

#[derive(Debug, Deserialize)]
struct ResponseCandidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    api_base: String,
    model: String,
}

impl GeminiClient {
    pub fn new(client: Client, api_key: String, api_base: &str, model: &str) -> Self {
        Self {
            client,
            api_key,
            api_base: api_base.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    pub async fn generate_interview_questions(
        &self,
        candidate: &CandidateRecord,
    ) -> anyhow::Result<Vec<InterviewQuestion>> {
        let prompt = prompts::interview_questions_prompt(candidate);
        let text = self.generate(vec![json!({ "text": prompt })]).await?;
        parse_questions(&text)
    }

    async fn generate(&self, parts: Vec<serde_json::Value>) -> anyhow::Result<String> {
        let url = format!("{}/models/{}:generateContent", self.api_base, self.model);
        let payload = json!({
            "contents": [
                { "role": "user", "parts": parts }
            ]
        });

        debug!(model = %self.model, "calling Gemini generateContent");
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(CoreError::GeminiApi {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let parsed = serde_json::from_str::<GenerateContentResponse>(&body)
            .map_err(|_| CoreError::EmptyModelResponse)?;
        first_candidate_text(parsed).ok_or_else(|| CoreError::EmptyModelResponse.into())
    }
}

#[async_trait]
impl ResumeAnalyzer for GeminiClient {
    async fn analyze_resume(&self, upload: &ResumeUpload) -> anyhow::Result<ResumeAnalysis> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&upload.bytes);
        let parts = vec![
            json!({ "text": prompts::resume_analysis_prompt() }),
            json!({
                "inline_data": {
                    "mime_type": mime_type_for(&upload.file_name),
                    "data": encoded,
                }
            }),
        ];

        let text = self.generate(parts).await?;
        parse_analysis(&text)
    }
}

fn first_candidate_text(response: GenerateContentResponse) -> Option<String> {
    response
        .candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .find_map(|part| part.text)
        .filter(|text| !text.trim().is_empty())
}

/// Body of the first ```json fence, else of the first plain ``` fence, else
/// the whole text.
pub fn strip_code_fences(text: &str) -> &str {
    let body = if let Some((_, rest)) = text.split_once("```json") {
        rest.split("```").next().unwrap_or(rest)
    } else if let Some((_, rest)) = text.split_once("```") {
        rest.split("```").next().unwrap_or(rest)
    } else {
        text
    };
    body.trim()
}

pub fn parse_analysis(text: &str) -> anyhow::Result<ResumeAnalysis> {
    serde_json::from_str::<ResumeAnalysis>(strip_code_fences(text)).map_err(|err| {
        warn!(error = %err, raw = %text, "unparseable resume analysis");
        CoreError::AnalysisParse.into()
    })
}

/// Keeps entries that carry every required field and drops the rest.
pub fn parse_questions(text: &str) -> anyhow::Result<Vec<InterviewQuestion>> {
    let values: Vec<serde_json::Value> = serde_json::from_str(strip_code_fences(text))
        .map_err(|err| {
            warn!(error = %err, raw = %text, "interview questions were not a JSON array");
            CoreError::EmptyModelResponse
        })?;

    let questions: Vec<InterviewQuestion> = values
        .into_iter()
        .filter_map(|value| serde_json::from_value(value).ok())
        .filter(|q: &InterviewQuestion| {
            !q.question.trim().is_empty() && !q.category.is_empty() && !q.focus_area.is_empty()
        })
        .collect();

    if questions.is_empty() {
        anyhow::bail!("No valid questions generated");
    }
    Ok(questions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::Difficulty;

    #[test]
    fn strips_json_tagged_fence() {
        let input = "Here you go:\n```json\n{\"credibility_score\": 80}\n```\nThanks";
        assert_eq!(strip_code_fences(input), "{\"credibility_score\": 80}");
    }

    #[test]
    fn strips_plain_fence() {
        let input = "```\n[1, 2]\n```";
        assert_eq!(strip_code_fences(input), "[1, 2]");
    }

    #[test]
    fn leaves_unfenced_text() {
        assert_eq!(strip_code_fences("  {\"a\": 1} "), "{\"a\": 1}");
    }

    #[test]
    fn analysis_parse_failure_is_typed() {
        let err = parse_analysis("the resume looks fine").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CoreError>(),
            Some(CoreError::AnalysisParse)
        ));
        assert_eq!(err.to_string(), "Failed to parse resume analysis response");
    }

    #[test]
    fn fenced_analysis_parses() {
        let analysis = parse_analysis(
            "```json\n{\"credibility_score\": 64, \"red_flags\": [{\"issue\": \"Gap\", \"description\": \"2019-2021\"}]}\n```",
        )
        .unwrap();
        assert_eq!(analysis.credibility_score, 64.0);
        assert_eq!(analysis.red_flags[0].issue, "Gap");
    }

    #[test]
    fn questions_missing_fields_are_dropped() {
        let text = r#"```json
        [
          {"question": "How do you structure React state?", "category": "Technical", "difficulty": "Medium", "focus_area": "Frontend"},
          {"question": "Tell me about a conflict", "category": "Behavioral"},
          {"question": "Design a rate limiter", "category": "Problem-Solving", "difficulty": "hard", "focus_area": "System Design"}
        ]
        ```"#;

        let questions = parse_questions(text).unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[1].difficulty, Difficulty::Hard);
    }

    #[test]
    fn response_without_text_is_empty() {
        let response: GenerateContentResponse =
            serde_json::from_str(r#"{"candidates": [{"content": {"parts": [{}]}}]}"#).unwrap();
        assert!(first_candidate_text(response).is_none());

        let response: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "{}"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(first_candidate_text(response).as_deref(), Some("{}"));
    }

    #[tokio::test]
    async fn unreachable_endpoint_surfaces_an_error() {
        let client = GeminiClient::new(Client::new(), "key".to_string(), "http://127.0.0.1:1", "m");
        let upload = ResumeUpload {
            file_name: "a.pdf".to_string(),
            bytes: b"%PDF".to_vec(),
        };
        assert!(client.analyze_resume(&upload).await.is_err());
    }
}
