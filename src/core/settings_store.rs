use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;
use url::Url;

use super::errors::CoreError;
use super::models::RuntimeSettings;

const SETTINGS_PATH_ENV: &str = "HIREAI_SETTINGS_PATH";
const SETTINGS_FILE: &str = "settings.json";

pub const SETTING_KEYS: [&str; 9] = [
    "geminiModel",
    "geminiApiBase",
    "githubApiBase",
    "tesseractPath",
    "ocrTimeoutSeconds",
    "exportDir",
    "senderName",
    "companyName",
    "searchPageSize",
];

pub struct SettingsStore {
    file_path: PathBuf,
}

impl SettingsStore {
    pub fn new() -> Self {
        Self::at(settings_path())
    }

    pub fn at(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Missing file means defaults; a present but broken file is an error.
    pub async fn load(&self) -> anyhow::Result<RuntimeSettings> {
        if !tokio::fs::try_exists(&self.file_path)
            .await
            .unwrap_or(false)
        {
            debug!(path = %self.file_path.display(), "no settings file, using defaults");
            return Ok(RuntimeSettings::default());
        }

        let content = tokio::fs::read_to_string(&self.file_path)
            .await
            .with_context(|| {
                format!("failed to read settings file {}", self.file_path.display())
            })?;

        let parsed = serde_json::from_str::<RuntimeSettings>(&content).with_context(|| {
            format!("invalid JSON in settings file {}", self.file_path.display())
        })?;

        Ok(sanitized(parsed))
    }

    pub async fn save(&self, settings: &RuntimeSettings) -> anyhow::Result<()> {
        if let Some(parent) = self.file_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(settings)?;
        tokio::fs::write(&self.file_path, json)
            .await
            .with_context(|| format!("failed to write {}", self.file_path.display()))?;
        Ok(())
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Sets one field by its camelCase key. Values are trimmed and validated
/// before anything is changed.
pub fn apply(settings: &mut RuntimeSettings, key: &str, value: &str) -> anyhow::Result<()> {
    let value = value.trim();
    let invalid = |reason: &str| CoreError::InvalidRequest(format!("{key}: {reason}"));

    match key {
        "geminiModel" => {
            settings.gemini_model = non_empty(value).ok_or_else(|| invalid("must not be empty"))?
        }
        "geminiApiBase" => settings.gemini_api_base = api_base(key, value)?,
        "githubApiBase" => settings.github_api_base = api_base(key, value)?,
        "tesseractPath" => settings.tesseract_path = value.to_string(),
        "ocrTimeoutSeconds" => {
            settings.ocr_timeout_seconds = value
                .parse::<u64>()
                .map_err(|_| invalid("expected a whole number of seconds"))?
                .max(1)
        }
        "exportDir" => settings.export_dir = non_empty(value).unwrap_or_else(|| ".".to_string()),
        "senderName" => {
            settings.sender_name = non_empty(value).ok_or_else(|| invalid("must not be empty"))?
        }
        "companyName" => {
            settings.company_name = non_empty(value).ok_or_else(|| invalid("must not be empty"))?
        }
        "searchPageSize" => {
            settings.search_page_size = value
                .parse::<usize>()
                .map_err(|_| invalid("expected a number between 1 and 100"))?
                .clamp(1, 100)
        }
        _ => {
            return Err(CoreError::InvalidRequest(format!(
                "unknown setting `{key}`, expected one of: {}",
                SETTING_KEYS.join(", ")
            ))
            .into())
        }
    }

    Ok(())
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Base URLs are stored without a trailing slash so paths can be appended.
fn api_base(key: &str, value: &str) -> anyhow::Result<String> {
    let parsed = Url::parse(value)
        .map_err(|err| CoreError::InvalidRequest(format!("{key}: invalid URL: {err}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(CoreError::InvalidRequest(format!("{key}: URL must use http or https")).into());
    }
    Ok(value.trim_end_matches('/').to_string())
}

fn sanitized(mut settings: RuntimeSettings) -> RuntimeSettings {
    let defaults = RuntimeSettings::default();
    if settings.gemini_model.trim().is_empty() {
        settings.gemini_model = defaults.gemini_model;
    }
    if Url::parse(&settings.gemini_api_base).is_err() {
        settings.gemini_api_base = defaults.gemini_api_base;
    }
    if Url::parse(&settings.github_api_base).is_err() {
        settings.github_api_base = defaults.github_api_base;
    }
    if settings.export_dir.trim().is_empty() {
        settings.export_dir = defaults.export_dir;
    }
    settings.gemini_api_base = settings.gemini_api_base.trim_end_matches('/').to_string();
    settings.github_api_base = settings.github_api_base.trim_end_matches('/').to_string();
    settings.ocr_timeout_seconds = settings.ocr_timeout_seconds.max(1);
    settings.search_page_size = settings.search_page_size.clamp(1, 100);
    settings
}

fn settings_path() -> PathBuf {
    match std::env::var(SETTINGS_PATH_ENV) {
        Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
        _ => app_data_root().join(SETTINGS_FILE),
    }
}

pub fn app_data_root() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Ok(local_app_data) = std::env::var("LOCALAPPDATA") {
            return PathBuf::from(local_app_data).join("HireAI");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = dirs::home_dir() {
            return home
                .join("Library")
                .join("Application Support")
                .join("HireAI");
        }
    }

    if let Some(path) = dirs::data_local_dir() {
        return path.join("HireAI");
    }

    PathBuf::from(".").join("HireAI")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::at(dir.path().join("settings.json"));

        let settings = store.load().await.unwrap();
        assert_eq!(settings.gemini_model, "gemini-2.0-flash");
        assert_eq!(settings.search_page_size, 20);
    }

    #[tokio::test]
    async fn save_then_load_keeps_changes() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::at(dir.path().join("nested/settings.json"));

        let mut settings = RuntimeSettings::default();
        apply(&mut settings, "companyName", "  Acme Robotics ").unwrap();
        apply(&mut settings, "githubApiBase", "http://localhost:8080/api/").unwrap();
        store.save(&settings).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.company_name, "Acme Robotics");
        assert_eq!(loaded.github_api_base, "http://localhost:8080/api");
    }

    #[tokio::test]
    async fn partial_and_out_of_range_files_are_sanitized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"senderName":"Jo","searchPageSize":0,"githubApiBase":"not a url"}"#,
        )
        .unwrap();

        let loaded = SettingsStore::at(&path).load().await.unwrap();
        assert_eq!(loaded.sender_name, "Jo");
        assert_eq!(loaded.search_page_size, 1);
        assert_eq!(loaded.github_api_base, "https://api.github.com");
        assert_eq!(loaded.ocr_timeout_seconds, 120);
    }

    #[tokio::test]
    async fn broken_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = SettingsStore::at(&path).load().await.unwrap_err();
        assert!(err.to_string().contains("invalid JSON in settings file"));
    }

    #[test]
    fn apply_rejects_bad_values() {
        let mut settings = RuntimeSettings::default();

        assert!(apply(&mut settings, "geminiApiBase", "ftp://example.com").is_err());
        assert!(apply(&mut settings, "geminiApiBase", "nope").is_err());
        assert!(apply(&mut settings, "ocrTimeoutSeconds", "soon").is_err());
        assert!(apply(&mut settings, "senderName", "   ").is_err());

        let err = apply(&mut settings, "apiKey", "x").unwrap_err();
        assert!(err.to_string().contains("unknown setting `apiKey`"));
        assert_eq!(settings.sender_name, "Hiring Team");
    }

    #[test]
    fn apply_clamps_numbers() {
        let mut settings = RuntimeSettings::default();
        apply(&mut settings, "searchPageSize", "500").unwrap();
        apply(&mut settings, "ocrTimeoutSeconds", "0").unwrap();
        apply(&mut settings, "exportDir", "").unwrap();

        assert_eq!(settings.search_page_size, 100);
        assert_eq!(settings.ocr_timeout_seconds, 1);
        assert_eq!(settings.export_dir, ".");
    }
}
