use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::credibility::round1;
use super::errors::CoreError;
use super::models::{ExternalCandidate, RepositoryStats, SearchFilters};

pub const NO_BIO: &str = "No bio available";
pub const LOCATION_UNSPECIFIED: &str = "Not specified";
pub const EMAIL_NOT_PUBLIC: &str = "Not public";

const MAX_SKILLS: usize = 8;
const DETAIL_REPO_COUNT: u32 = 10;

static LOGIN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9-]{1,39}$").unwrap());

#[derive(Debug, Deserialize)]
struct SearchUsersResponse {
    #[serde(default)]
    items: Vec<SearchUser>,
}

#[derive(Debug, Deserialize)]
struct SearchUser {
    id: u64,
    login: String,
    #[serde(default)]
    avatar_url: String,
    #[serde(default)]
    html_url: String,
}

#[derive(Debug, Deserialize)]
pub struct GitHubUser {
    pub id: u64,
    pub login: String,
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default)]
    pub html_url: String,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub email: Option<String>,
    pub blog: Option<String>,
    pub public_repos: Option<u64>,
    pub followers: Option<u64>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct GitHubRepo {
    pub language: Option<String>,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct CommitSearchResponse {
    total_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileScores {
    pub contribution: f64,
    pub code_quality: f64,
    pub project_diversity: f64,
    pub overall: f64,
}

#[derive(Clone)]
pub struct GitHubClient {
    client: Client,
    api_base: String,
    token: Option<String>,
    page_size: usize,
}

impl GitHubClient {
    pub fn new(client: Client, api_base: &str, token: Option<String>, page_size: usize) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
            page_size: page_size.clamp(1, 100),
        }
    }

    /// Search that never fails: a blank query returns nothing without a
    /// request, and any error falls back to the built-in sample profiles.
    pub async fn search_talent(
        &self,
        query: &str,
        filters: &SearchFilters,
    ) -> Vec<ExternalCandidate> {
        if query.trim().is_empty() {
            return Vec::new();
        }

        match self.search_users(query, filters).await {
            Ok(candidates) => {
                info!(query, count = candidates.len(), "GitHub search finished");
                candidates
            }
            Err(err) => {
                warn!(query, error = %err, "GitHub search failed, using sample profiles");
                mock_candidates(query)
            }
        }
    }

    pub async fn search_users(
        &self,
        query: &str,
        filters: &SearchFilters,
    ) -> anyhow::Result<Vec<ExternalCandidate>> {
        let q = build_search_query(query, filters);
        let per_page = self.page_size.to_string();
        let url = format!("{}/search/users", self.api_base);
        let response: SearchUsersResponse = self
            .get_json(
                self.get(&url)
                    .query(&[("q", q.as_str()), ("per_page", per_page.as_str())]),
            )
            .await
            .context("GitHub user search failed")?;

        Ok(response
            .items
            .into_iter()
            .map(|user| ExternalCandidate {
                id: user.id.to_string(),
                name: user.login.clone(),
                username: user.login,
                avatar_url: user.avatar_url,
                bio: None,
                location: None,
                email: None,
                blog: None,
                profile_url: user.html_url,
                score: 0.0,
                skills: Vec::new(),
                stats: RepositoryStats::default(),
                account_age_years: None,
                last_activity: None,
                contribution_score: None,
                code_quality_score: None,
                project_diversity_score: None,
            })
            .collect())
    }

    /// Full profile with derived scores, or `None` when either lookup fails.
    pub async fn user_details(&self, login: &str) -> Option<ExternalCandidate> {
        match self.fetch_user_details(login).await {
            Ok(candidate) => Some(candidate),
            Err(err) => {
                warn!(login, error = %err, "GitHub profile lookup failed");
                None
            }
        }
    }

    async fn fetch_user_details(&self, login: &str) -> anyhow::Result<ExternalCandidate> {
        if !LOGIN_RE.is_match(login) {
            return Err(CoreError::InvalidRequest(format!("not a GitHub login: {login}")).into());
        }

        let user_url = format!("{}/users/{login}", self.api_base);
        let repos_url = format!("{}/users/{login}/repos", self.api_base);
        let user_request = self.get_json::<GitHubUser>(self.get(&user_url));
        let repos_request = self.get_json::<Vec<GitHubRepo>>(self.get(&repos_url).query(&[
            ("sort", "updated".to_string()),
            ("per_page", DETAIL_REPO_COUNT.to_string()),
        ]));

        let (user, repos) = futures::try_join!(user_request, repos_request)?;
        let total_commits = self.total_commits(login).await;

        Ok(build_profile(user, &repos, total_commits, Utc::now()))
    }

    async fn total_commits(&self, login: &str) -> Option<u64> {
        let url = format!("{}/search/commits", self.api_base);
        let query = format!("author:{login}");
        let request = self
            .get(&url)
            .query(&[("q", query.as_str()), ("per_page", "1")]);

        match self.get_json::<CommitSearchResponse>(request).await {
            Ok(response) => Some(response.total_count),
            Err(err) => {
                debug!(login, error = %err, "commit count unavailable");
                None
            }
        }
    }

    fn get(&self, url: &str) -> RequestBuilder {
        let request = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json");
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> anyhow::Result<T> {
        let response = request.send().await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(CoreError::GitHubApi {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        serde_json::from_str::<T>(&body).context("failed to parse GitHub response")
    }
}

/// `query [language:L] [location:X]`, quoting multi-word locations.
pub fn build_search_query(query: &str, filters: &SearchFilters) -> String {
    let mut q = query.trim().to_string();
    if let Some(language) = filters.language.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
        q.push_str(&format!(" language:{language}"));
    }
    if let Some(location) = filters.location.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
        if location.contains(char::is_whitespace) {
            q.push_str(&format!(" location:\"{location}\""));
        } else {
            q.push_str(&format!(" location:{location}"));
        }
    }
    q
}

pub fn build_profile(
    user: GitHubUser,
    repos: &[GitHubRepo],
    total_commits: Option<u64>,
    now: DateTime<Utc>,
) -> ExternalCandidate {
    let scores = score_profile(&user, repos);

    ExternalCandidate {
        id: user.id.to_string(),
        name: non_empty(user.name).unwrap_or_else(|| user.login.clone()),
        username: user.login,
        avatar_url: user.avatar_url,
        bio: Some(non_empty(user.bio).unwrap_or_else(|| NO_BIO.to_string())),
        location: Some(non_empty(user.location).unwrap_or_else(|| LOCATION_UNSPECIFIED.to_string())),
        email: Some(non_empty(user.email).unwrap_or_else(|| EMAIL_NOT_PUBLIC.to_string())),
        blog: non_empty(user.blog),
        profile_url: user.html_url,
        score: scores.overall,
        skills: skills_from_repos(repos),
        stats: RepositoryStats {
            total_commits,
            total_stars: repos.iter().map(|r| r.stargazers_count).sum(),
            total_forks: repos.iter().map(|r| r.forks_count).sum(),
        },
        account_age_years: user.created_at.map(|created| account_age_years(created, now)),
        last_activity: last_activity(repos),
        contribution_score: Some(scores.contribution),
        code_quality_score: Some(scores.code_quality),
        project_diversity_score: Some(scores.project_diversity),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub fn score_profile(user: &GitHubUser, repos: &[GitHubRepo]) -> ProfileScores {
    let repos_count = user.public_repos.unwrap_or(0) as f64;
    let followers = user.followers.unwrap_or(0) as f64;
    let contribution = f64::min(10.0, repos_count * 0.1 + followers * 0.05);

    let stars: u64 = repos.iter().map(|r| r.stargazers_count).sum();
    let code_quality = f64::min(10.0, stars as f64 * 0.01);

    let languages = distinct_languages(repos).len();
    let project_diversity = f64::min(10.0, languages as f64 * 0.5);

    let overall = (contribution + code_quality + project_diversity) / 3.0;

    ProfileScores {
        contribution: round1(contribution),
        code_quality: round1(code_quality),
        project_diversity: round1(project_diversity),
        overall: round1(overall),
    }
}

pub fn skills_from_repos(repos: &[GitHubRepo]) -> Vec<String> {
    let mut skills = distinct_languages(repos);
    skills.truncate(MAX_SKILLS);
    skills
}

// Distinct languages in first-seen order.
fn distinct_languages(repos: &[GitHubRepo]) -> Vec<String> {
    let mut languages: Vec<String> = Vec::new();
    for language in repos.iter().filter_map(|r| r.language.as_deref()) {
        if !languages.iter().any(|l| l == language) {
            languages.push(language.to_string());
        }
    }
    languages
}

pub fn account_age_years(created_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - created_at).num_days().max(0) / 365
}

fn last_activity(repos: &[GitHubRepo]) -> Option<NaiveDate> {
    repos
        .iter()
        .filter_map(|r| r.updated_at)
        .max()
        .map(|updated| updated.date_naive())
}

/// Sample profiles served when the search API is unreachable, filtered by a
/// case-insensitive substring match on name or any skill.
pub fn mock_candidates(query: &str) -> Vec<ExternalCandidate> {
    let needle = query.trim().to_lowercase();
    sample_profiles()
        .into_iter()
        .filter(|candidate| {
            candidate.name.to_lowercase().contains(&needle)
                || candidate
                    .skills
                    .iter()
                    .any(|skill| skill.to_lowercase().contains(&needle))
        })
        .collect()
}

fn sample_profiles() -> Vec<ExternalCandidate> {
    vec![
        ExternalCandidate {
            id: "ext1".to_string(),
            name: "Sarah Chen".to_string(),
            username: "sarahdev".to_string(),
            avatar_url: "https://images.unsplash.com/photo-1494790108755-2616b612b547?w=150"
                .to_string(),
            bio: Some("Full-stack developer passionate about React and Node.js".to_string()),
            location: Some("San Francisco, CA".to_string()),
            email: Some("sarah@example.com".to_string()),
            blog: Some("https://sarahdev.blog".to_string()),
            profile_url: "https://github.com/sarahdev".to_string(),
            score: 8.7,
            skills: ["React", "Node.js", "TypeScript", "Python", "Docker"]
                .map(String::from)
                .to_vec(),
            stats: RepositoryStats {
                total_commits: Some(1247),
                total_stars: 234,
                total_forks: 45,
            },
            account_age_years: Some(4),
            last_activity: NaiveDate::from_ymd_opt(2024, 5, 30),
            contribution_score: Some(8.9),
            code_quality_score: Some(8.5),
            project_diversity_score: Some(8.7),
        },
        ExternalCandidate {
            id: "ext2".to_string(),
            name: "Alex Rodriguez".to_string(),
            username: "alexcodes".to_string(),
            avatar_url: "https://images.unsplash.com/photo-1507003211169-0a1dd7228f2d?w=150"
                .to_string(),
            bio: Some("Machine Learning Engineer & Open Source Contributor".to_string()),
            location: Some("Austin, TX".to_string()),
            email: Some("alex@example.com".to_string()),
            blog: None,
            profile_url: "https://github.com/alexcodes".to_string(),
            score: 9.1,
            skills: ["Python", "TensorFlow", "PyTorch", "Go", "Kubernetes"]
                .map(String::from)
                .to_vec(),
            stats: RepositoryStats {
                total_commits: Some(2156),
                total_stars: 567,
                total_forks: 89,
            },
            account_age_years: Some(6),
            last_activity: NaiveDate::from_ymd_opt(2024, 5, 29),
            contribution_score: Some(9.3),
            code_quality_score: Some(8.9),
            project_diversity_score: Some(9.1),
        },
    ]
}
