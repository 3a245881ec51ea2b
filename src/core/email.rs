use super::github::{EMAIL_NOT_PUBLIC, NO_BIO};
use super::models::{CandidateRecord, PersonalizedEmail};

pub fn generate_email(
    candidate: &CandidateRecord,
    sender_name: &str,
    company_name: &str,
) -> PersonalizedEmail {
    let name = candidate.name();
    let skills = candidate
        .skills()
        .iter()
        .take(3)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    let (position, experience, summary, recipient, source) = match candidate {
        CandidateRecord::Internal(c) => (
            c.title.clone(),
            c.experience.clone(),
            c.summary.clone(),
            c.email
                .clone()
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| placeholder_address(name)),
            "resume",
        ),
        CandidateRecord::External(c) => (
            format!("{} (GitHub Developer)", c.username),
            format!(
                "{} years on GitHub with {} stars",
                c.account_age_years.unwrap_or(0),
                c.stats.total_stars
            ),
            c.bio.clone().unwrap_or_default(),
            c.email
                .clone()
                .filter(|e| !e.trim().is_empty() && e != EMAIL_NOT_PUBLIC)
                .unwrap_or_else(|| format!("{}@github-email.com", c.username)),
            "GitHub profile",
        ),
    };

    let subject = format!("Exciting Opportunity for {name} - {position} Role");

    let experience_note = if experience.trim().is_empty() {
        String::new()
    } else {
        format!("Your experience ({experience}) aligns perfectly with what we're looking for.")
    };
    let summary_note = if summary.trim().is_empty() || summary == NO_BIO {
        String::new()
    } else {
        format!("I was particularly drawn to your background: \"{summary}\"")
    };

    let parts = [
        format!("Dear {name},"),
        String::new(),
        format!(
            "I hope this email finds you well. I came across your {source} and was impressed by your background in {position}."
        ),
        String::new(),
        format!(
            "Your expertise in {skills} particularly caught our attention, and your overall profile scored {}/10 in our evaluation system.",
            candidate.score()
        ),
        experience_note,
        summary_note,
        String::new(),
        format!(
            "We have an exciting opportunity at {company_name} that I believe would be a great match for your skills and career goals."
        ),
        String::new(),
        "Would you be interested in a brief conversation to discuss this opportunity further? I'd love to learn more about your career aspirations and share details about our company culture and this role.".to_string(),
        String::new(),
        "Please let me know if you'd be available for a 15-20 minute call this week or next. I'm happy to work around your schedule.".to_string(),
        String::new(),
        format!("Best regards,\n{sender_name}\n{company_name}"),
    ];

    // Empty parts are dropped entirely, so blank spacer lines vanish too.
    let body = parts
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    PersonalizedEmail {
        subject,
        body,
        recipient,
    }
}

/// `jane doe` -> `jane.doe@email.com`, used when no address is on file.
fn placeholder_address(name: &str) -> String {
    let local = name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(".")
        .to_lowercase();
    format!("{local}@email.com")
}

pub fn mailto_url(email: &PersonalizedEmail) -> String {
    format!(
        "mailto:{}?subject={}&body={}",
        email.recipient,
        percent_encode(&email.subject),
        percent_encode(&email.body)
    )
}

// Mail clients expect %20 rather than the form encoding's `+`.
fn percent_encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
