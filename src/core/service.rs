use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use chrono::Local;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::document_parser::ResumeDocumentParser;
use super::email;
use super::errors::CoreError;
use super::export;
use super::gemini::{GeminiClient, ResumeAnalyzer};
use super::github::GitHubClient;
use super::models::{
    Candidate, CandidateRecord, ExternalCandidate, InterviewQuestion, PersonalizedEmail,
    ResumeUpload, RuntimeSettings, SearchFilters, SpreadsheetUpload, UploadBatch,
};
use super::normalizer::CandidateNormalizer;
use super::ocr::TesseractCliOcrService;
use super::pdf::PdfTextExtractor;
use super::secret_store::{SecretKind, SecretStore};
use super::settings_store::{self, SettingsStore};

const USER_AGENT: &str = "HireAI/1.0";
const DEFAULT_REPORT_TITLE: &str = "Candidate Report";

/// Everything one CLI invocation needs: loaded settings, resolved API keys
/// and a shared HTTP client.
pub struct CoreService {
    settings_store: SettingsStore,
    secret_store: SecretStore,
    settings: RuntimeSettings,
    gemini_key: Option<String>,
    github_token: Option<String>,
    client: reqwest::Client,
}

impl CoreService {
    pub async fn new() -> anyhow::Result<Self> {
        let settings_store = SettingsStore::new();
        let settings = settings_store.load().await?;
        let secret_store = SecretStore::new();
        let gemini_key = resolve_secret(&secret_store, SecretKind::Gemini);
        let github_token = resolve_secret(&secret_store, SecretKind::GitHub);

        let mut service = Self::with_settings(settings_store, settings)?;
        service.secret_store = secret_store;
        service.gemini_key = gemini_key;
        service.github_token = github_token;
        Ok(service)
    }

    /// Service without any stored credentials.
    pub fn with_settings(
        settings_store: SettingsStore,
        settings: RuntimeSettings,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            settings_store,
            secret_store: SecretStore::new(),
            settings,
            gemini_key: None,
            github_token: None,
            client,
        })
    }

    pub fn settings(&self) -> &RuntimeSettings {
        &self.settings
    }

    pub fn settings_path(&self) -> &Path {
        self.settings_store.path()
    }

    pub async fn update_setting(&mut self, key: &str, value: &str) -> anyhow::Result<&RuntimeSettings> {
        let mut updated = self.settings.clone();
        settings_store::apply(&mut updated, key, value)?;
        self.settings_store.save(&updated).await?;
        info!(key, path = %self.settings_store.path().display(), "setting saved");

        self.settings = updated;
        Ok(&self.settings)
    }

    pub fn set_secret(&mut self, kind: SecretKind, value: &str) -> anyhow::Result<()> {
        if value.trim().is_empty() {
            return Err(CoreError::InvalidRequest("secret value must not be empty".to_string()).into());
        }
        self.secret_store.save(kind, value)?;
        match kind {
            SecretKind::Gemini => self.gemini_key = Some(value.trim().to_string()),
            SecretKind::GitHub => self.github_token = Some(value.trim().to_string()),
        }
        Ok(())
    }

    pub fn clear_secret(&mut self, kind: SecretKind) -> anyhow::Result<()> {
        self.secret_store.clear(kind)?;
        match kind {
            SecretKind::Gemini => self.gemini_key = None,
            SecretKind::GitHub => self.github_token = None,
        }
        Ok(())
    }

    /// Normalizes one upload batch. The resume analyzer is used when
    /// `analyze` is set and a Gemini key is configured; otherwise resumes are
    /// scored locally.
    pub async fn ingest(&self, batch: &UploadBatch, analyze: bool) -> anyhow::Result<Vec<Candidate>> {
        let parser = self.build_parser();
        let gemini = if analyze { self.gemini_client().ok() } else { None };
        if analyze && gemini.is_none() && !batch.resumes.is_empty() {
            info!("no Gemini API key configured, scoring resumes locally");
        }

        let analyzer = gemini.as_ref().map(|client| client as &dyn ResumeAnalyzer);
        CandidateNormalizer::new(&parser, analyzer)
            .process_uploads(batch)
            .await
    }

    pub async fn search(&self, query: &str, filters: &SearchFilters) -> Vec<ExternalCandidate> {
        self.github_client().search_talent(query, filters).await
    }

    pub async fn profile(&self, login: &str) -> Option<ExternalCandidate> {
        self.github_client().user_details(login.trim()).await
    }

    pub async fn interview_questions(
        &self,
        candidate: &CandidateRecord,
    ) -> anyhow::Result<Vec<InterviewQuestion>> {
        let questions = self
            .gemini_client()?
            .generate_interview_questions(candidate)
            .await
            .with_context(|| format!("failed to generate interview questions for {}", candidate.name()))?;
        info!(candidate = candidate.name(), count = questions.len(), "interview questions generated");
        Ok(questions)
    }

    pub fn email(&self, candidate: &CandidateRecord) -> PersonalizedEmail {
        email::generate_email(
            candidate,
            &self.settings.sender_name,
            &self.settings.company_name,
        )
    }

    pub async fn export_csv(
        &self,
        candidates: &[CandidateRecord],
        dir: Option<&Path>,
    ) -> anyhow::Result<PathBuf> {
        let contents = export::candidates_to_csv(candidates)?;
        let file_name = export::csv_file_name(Local::now().date_naive());
        export::write_export(&self.export_dir(dir), &file_name, &contents).await
    }

    pub async fn export_html(
        &self,
        candidates: &[CandidateRecord],
        title: Option<&str>,
        dir: Option<&Path>,
    ) -> anyhow::Result<PathBuf> {
        let title = title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_REPORT_TITLE);
        let today = Local::now().date_naive();
        let contents = export::html_report(candidates, title, today)?;
        let file_name = export::html_file_name(title, today);
        export::write_export(&self.export_dir(dir), &file_name, &contents).await
    }

    fn export_dir(&self, override_dir: Option<&Path>) -> PathBuf {
        override_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(&self.settings.export_dir))
    }

    fn gemini_client(&self) -> anyhow::Result<GeminiClient> {
        let key = self.gemini_key.clone().ok_or(CoreError::MissingGeminiKey)?;
        Ok(GeminiClient::new(
            self.client.clone(),
            key,
            &self.settings.gemini_api_base,
            &self.settings.gemini_model,
        ))
    }

    fn github_client(&self) -> GitHubClient {
        GitHubClient::new(
            self.client.clone(),
            &self.settings.github_api_base,
            self.github_token.clone(),
            self.settings.search_page_size,
        )
    }

    fn build_parser(&self) -> ResumeDocumentParser {
        let path = self.settings.tesseract_path.trim();
        let ocr = (!path.is_empty()).then(|| {
            TesseractCliOcrService::new(
                path.to_string(),
                Duration::from_secs(self.settings.ocr_timeout_seconds.max(1)),
            )
        });

        ResumeDocumentParser::new(PdfTextExtractor::new(ocr))
    }
}

fn resolve_secret(store: &SecretStore, kind: SecretKind) -> Option<String> {
    match store.resolve(kind) {
        Ok(value) => value,
        Err(err) => {
            warn!(?kind, error = %err, "keychain unavailable, continuing without secret");
            None
        }
    }
}

/// Reads the files of one ingest request from disk.
pub async fn read_upload_batch(
    spreadsheet: Option<&Path>,
    resumes: &[PathBuf],
) -> anyhow::Result<UploadBatch> {
    let spreadsheet = match spreadsheet {
        Some(path) => Some(SpreadsheetUpload {
            file_name: file_name_of(path),
            bytes: read_file(path).await?,
        }),
        None => None,
    };

    let mut uploads = Vec::with_capacity(resumes.len());
    for path in resumes {
        uploads.push(ResumeUpload {
            file_name: file_name_of(path),
            bytes: read_file(path).await?,
        });
    }

    Ok(UploadBatch {
        spreadsheet,
        resumes: uploads,
    })
}

async fn read_file(path: &Path) -> anyhow::Result<Vec<u8>> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    debug!(path = %path.display(), bytes = bytes.len(), "read upload");
    Ok(bytes)
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<CandidateRecord>),
    One(Box<CandidateRecord>),
}

/// Candidate records as printed by `ingest` or `search`: a JSON array or a
/// single object.
pub async fn read_records(path: &Path) -> anyhow::Result<Vec<CandidateRecord>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_records(&content).with_context(|| format!("invalid candidate JSON in {}", path.display()))
}

pub fn parse_records(content: &str) -> anyhow::Result<Vec<CandidateRecord>> {
    Ok(match serde_json::from_str::<OneOrMany>(content)? {
        OneOrMany::Many(records) => records,
        OneOrMany::One(record) => vec![*record],
    })
}
