use tracing::debug;

const KEYRING_SERVICE: &str = "com.hireai.cli";

/// API credentials the tool knows how to keep in the OS keychain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretKind {
    Gemini,
    GitHub,
}

impl SecretKind {
    fn account(self) -> &'static str {
        match self {
            SecretKind::Gemini => "gemini-api-key",
            SecretKind::GitHub => "github-token",
        }
    }

    /// Environment variables checked before the keychain, first match wins.
    fn env_overrides(self) -> &'static [&'static str] {
        match self {
            SecretKind::Gemini => &["HIREAI_GEMINI_API_KEY", "GEMINI_API_KEY"],
            SecretKind::GitHub => &["GITHUB_TOKEN"],
        }
    }
}

pub struct SecretStore;

impl SecretStore {
    pub fn new() -> Self {
        Self
    }

    /// Environment first, then keychain. Blank values count as absent.
    pub fn resolve(&self, kind: SecretKind) -> anyhow::Result<Option<String>> {
        for name in kind.env_overrides() {
            if let Some(value) = env_value(name) {
                debug!(variable = name, "using secret from environment");
                return Ok(Some(value));
            }
        }
        self.load(kind)
    }

    pub fn load(&self, kind: SecretKind) -> anyhow::Result<Option<String>> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, kind.account())?;
        let value = match entry.get_password() {
            Ok(v) => v,
            Err(keyring::Error::NoEntry) => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        if value.trim().is_empty() {
            return Ok(None);
        }

        Ok(Some(value))
    }

    pub fn save(&self, kind: SecretKind, secret: &str) -> anyhow::Result<()> {
        let trimmed = secret.trim();
        if trimmed.is_empty() {
            return Ok(());
        }

        let entry = keyring::Entry::new(KEYRING_SERVICE, kind.account())?;
        entry.set_password(trimmed)?;
        Ok(())
    }

    pub fn clear(&self, kind: SecretKind) -> anyhow::Result<()> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, kind.account())?;
        match entry.delete_credential() {
            Ok(_) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

impl Default for SecretStore {
    fn default() -> Self {
        Self::new()
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gemini_key_prefers_the_namespaced_variable() {
        assert_eq!(
            SecretKind::Gemini.env_overrides(),
            &["HIREAI_GEMINI_API_KEY", "GEMINI_API_KEY"]
        );
        assert_eq!(SecretKind::GitHub.env_overrides(), &["GITHUB_TOKEN"]);
    }

    #[test]
    fn accounts_are_distinct() {
        assert_ne!(SecretKind::Gemini.account(), SecretKind::GitHub.account());
    }

    #[test]
    fn unset_variables_resolve_to_none() {
        assert_eq!(env_value("HIREAI_TEST_SURELY_UNSET_VARIABLE"), None);
    }
}
