use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("GitHub API request failed with status {status}: {body}")]
    GitHubApi { status: u16, body: String },
    #[error("Gemini API request failed with status {status}: {body}")]
    GeminiApi { status: u16, body: String },
    #[error("Gemini API key is not configured. Run `hireai secrets set gemini` first.")]
    MissingGeminiKey,
    #[error("Failed to parse resume analysis response")]
    AnalysisParse,
    #[error("Gemini returned no text content")]
    EmptyModelResponse,
    #[error("Unsupported file type: {0}")]
    UnsupportedFile(String),
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl CoreError {
    /// Whether this error came back from a remote service rather than local input.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            CoreError::GitHubApi { .. } | CoreError::GeminiApi { .. }
        )
    }
}
