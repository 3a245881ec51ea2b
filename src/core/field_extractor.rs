use chrono::{Datelike, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use super::models::{TimelineEntry, TimelineKind};

/// Prefix applied to bare ten-digit numbers before validation.
const DEFAULT_COUNTRY_PREFIX: &str = "+1";

static MAILTO_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"mailto:\s*([A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,})").unwrap()
});
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap());
static PHONE_CLEAN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s\-\(\)\.]").unwrap());
static DIGIT_SEQ_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\+?\d{7,15}").unwrap());
static NAME_STARTS_WITH_PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?\d").unwrap());

static LINKEDIN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:https?://)?(?:www\.)?linkedin\.com/in/([a-zA-Z0-9\-]+)").unwrap()
});
static GITHUB_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:https?://)?(?:www\.)?github\.com/([A-Za-z0-9-]{1,39})").unwrap()
});

static WORK_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^[\s\-•*]*(?P<title>[A-Z][^\n]*?)\s+at\s+(?P<org>[^\n(]+?)\s*\((?P<start>\d{4})\s*[-–]\s*(?P<end>\d{4}|[Pp]resent)\)",
    )
    .unwrap()
});
static EDUCATION_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^[\s\-•*]*(?P<org>[^\n(]*(?:University|College|Institute|School)[^\n(]*?)\s*\((?P<start>\d{4})\s*[-–]\s*(?P<end>\d{4})\)",
    )
    .unwrap()
});
static DEGREE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(bachelor|master|ph\.?d|degree|diploma|b\.?sc?|m\.?sc?)\b").unwrap());
static DATE_RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b((?:19|20)\d{2})\s*[-–]\s*((?:19|20)\d{2}|present)\b").unwrap()
});

/// (display name, match case-sensitively)
const KNOWN_SKILLS: &[(&str, bool)] = &[
    ("JavaScript", false),
    ("TypeScript", false),
    ("Python", false),
    ("Java", false),
    ("Rust", false),
    ("Go", true),
    ("C++", false),
    ("C#", false),
    ("Ruby", false),
    ("PHP", false),
    ("Kotlin", false),
    ("Swift", false),
    ("React", false),
    ("Node.js", false),
    ("Django", false),
    ("Flask", false),
    ("Spring", false),
    ("GraphQL", false),
    ("PostgreSQL", false),
    ("MySQL", false),
    ("MongoDB", false),
    ("Redis", false),
    ("AWS", true),
    ("Azure", false),
    ("GCP", true),
    ("Docker", false),
    ("Kubernetes", false),
    ("Terraform", false),
    ("TensorFlow", false),
    ("PyTorch", false),
];

static SKILL_RES: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    KNOWN_SKILLS
        .iter()
        .map(|(skill, case_sensitive)| {
            let flags = if *case_sensitive { "" } else { "(?i)" };
            let pattern = format!(
                r"{flags}(?:^|[^A-Za-z0-9]){}(?:$|[^A-Za-z0-9+#])",
                regex::escape(skill)
            );
            (*skill, Regex::new(&pattern).unwrap())
        })
        .collect()
});

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactFields {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub linked_in: Option<String>,
    pub git_hub: Option<String>,
}

pub fn extract_email(text: &str) -> Option<String> {
    if let Some(email) = MAILTO_RE.captures(text).and_then(|c| c.get(1)) {
        return Some(email.as_str().to_lowercase());
    }

    EMAIL_RE.find(text).map(|m| m.as_str().to_lowercase())
}

pub fn normalize_phone(text: &str) -> Option<String> {
    if let Some(normalized) = format_if_valid_phone(text) {
        return Some(normalized);
    }

    let cleaned = PHONE_CLEAN_RE.replace_all(text, "");
    for m in DIGIT_SEQ_RE.find_iter(&cleaned) {
        let digits = m.as_str();
        let candidate = if digits.starts_with('+') {
            digits.to_string()
        } else if digits.len() == 10 {
            format!("{DEFAULT_COUNTRY_PREFIX}{digits}")
        } else {
            format!("+{digits}")
        };

        if let Some(normalized) = format_if_valid_phone(&candidate) {
            return Some(normalized);
        }
    }

    None
}

pub fn extract_linkedin(text: &str) -> Option<String> {
    LINKEDIN_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|handle| format!("https://www.linkedin.com/in/{}", handle.as_str()))
}

pub fn extract_github(text: &str) -> Option<String> {
    GITHUB_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|handle| format!("https://github.com/{}", handle.as_str()))
}

pub fn extract_contacts(text: &str) -> ContactFields {
    ContactFields {
        email: extract_email(text),
        phone: normalize_phone(text),
        linked_in: extract_linkedin(text),
        git_hub: extract_github(text),
    }
}

pub fn guess_name(text: &str) -> Option<String> {
    let lines: Vec<&str> = text.lines().collect();
    let mut candidate_lines: Vec<&str> = lines.iter().take(30).copied().collect();

    let keywords = ["email", "phone", "contact", "mobile", "tel"];
    for i in 1..lines.len().min(50) {
        let lower = lines[i].to_lowercase();
        if keywords.iter().any(|k| lower.contains(k)) {
            candidate_lines.push(lines[i - 1]);
        }
    }

    for raw in candidate_lines {
        let line = raw.trim();
        if line.is_empty()
            || line.contains('@')
            || line.len() > 50
            || NAME_STARTS_WITH_PHONE_RE.is_match(line)
        {
            continue;
        }

        let words: Vec<&str> = line.split_whitespace().collect();
        if words.len() < 2 || words.len() > 4 {
            continue;
        }

        let all_capitalized = words
            .iter()
            .all(|w| w.chars().next().is_some_and(|c| c.is_uppercase()));
        let all_caps_heading = words
            .iter()
            .all(|w| w.chars().all(|c| !c.is_lowercase()));

        if all_capitalized && !all_caps_heading {
            return Some(line.to_string());
        }
    }

    None
}

/// Share of contact channels present, in 0.0..=1.0.
pub fn contact_confidence(name: Option<&str>, contacts: &ContactFields, ocr_used: bool) -> f64 {
    let present = |v: Option<&str>| v.is_some_and(|v| !v.trim().is_empty());
    let mut score: f64 = 0.0;

    if present(contacts.email.as_deref()) {
        score += 0.4;
    }
    if present(contacts.phone.as_deref()) {
        score += 0.25;
    }
    if present(name) {
        score += 0.15;
    }
    if present(contacts.linked_in.as_deref()) {
        score += 0.1;
    }
    if present(contacts.git_hub.as_deref()) {
        score += 0.05;
    }
    if !ocr_used {
        score += 0.05;
    }

    score.min(1.0)
}

/// Known technologies mentioned in the text, in list order.
pub fn detect_skills(text: &str) -> Vec<String> {
    SKILL_RES
        .iter()
        .filter(|(_, re)| re.is_match(text))
        .map(|(skill, _)| skill.to_string())
        .collect()
}

/// Work lines shaped like `Role at Company (2018-2020)` and education lines
/// naming a university or college with a year range.
pub fn parse_timeline(text: &str) -> Vec<TimelineEntry> {
    let mut entries = Vec::new();

    for caps in WORK_LINE_RE.captures_iter(text) {
        entries.push(TimelineEntry {
            kind: TimelineKind::Work,
            title: caps["title"].trim().to_string(),
            organization: caps["org"].trim().to_string(),
            start_date: caps["start"].to_string(),
            end_date: normalize_end(&caps["end"]),
            description: String::new(),
        });
    }

    let lines: Vec<&str> = text.lines().collect();
    for caps in EDUCATION_LINE_RE.captures_iter(text) {
        let org = caps["org"].trim().to_string();
        let title = lines
            .iter()
            .position(|line| line.contains(org.as_str()))
            .and_then(|idx| idx.checked_sub(1))
            .map(|idx| lines[idx].trim())
            .filter(|line| DEGREE_RE.is_match(line))
            .unwrap_or("Education")
            .to_string();

        entries.push(TimelineEntry {
            kind: TimelineKind::Education,
            title,
            organization: org,
            start_date: caps["start"].to_string(),
            end_date: caps["end"].to_string(),
            description: String::new(),
        });
    }

    entries
}

/// Year ranges that run backwards or end in the future.
pub fn inconsistent_date_ranges(text: &str) -> usize {
    let current_year = Utc::now().year();
    DATE_RANGE_RE
        .captures_iter(text)
        .filter(|caps| {
            let start: i32 = caps[1].parse().unwrap_or(0);
            match caps[2].parse::<i32>() {
                Ok(end) => end < start || end > current_year,
                Err(_) => start > current_year,
            }
        })
        .count()
}

fn normalize_end(value: &str) -> String {
    if value.eq_ignore_ascii_case("present") {
        "Present".to_string()
    } else {
        value.to_string()
    }
}

fn format_if_valid_phone(input: &str) -> Option<String> {
    let parsed = phonenumber::parse(None, input).ok()?;
    if !phonenumber::is_valid(&parsed) {
        return None;
    }

    Some(parsed.format().mode(phonenumber::Mode::E164).to_string())
}
