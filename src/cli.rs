use std::io::BufRead;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::info;

use crate::core::analytics;
use crate::core::comparison::compare_candidates;
use crate::core::email::mailto_url;
use crate::core::errors::CoreError;
use crate::core::insights::analyze_candidate;
use crate::core::models::{CandidateRecord, SearchFilters};
use crate::core::secret_store::SecretKind;
use crate::core::service::{read_records, read_upload_batch, CoreService};

#[derive(Parser, Debug)]
#[command(name = "hireai")]
#[command(about = "Score, enrich and export recruiting candidates", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log level used when RUST_LOG is not set
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Normalize a spreadsheet and/or resumes into candidate records
    Ingest {
        /// CSV or XLSX file with one candidate per row
        #[arg(short, long)]
        spreadsheet: Option<PathBuf>,

        /// Resume files (PDF, DOCX, TXT)
        resumes: Vec<PathBuf>,

        /// Score resumes locally even when a Gemini key is configured
        #[arg(long)]
        offline: bool,
    },

    /// Search GitHub for developers
    Search {
        query: String,

        #[arg(long)]
        language: Option<String>,

        #[arg(long)]
        location: Option<String>,
    },

    /// Fetch a scored GitHub profile
    Profile { login: String },

    /// Sort and filter candidate records by score
    Rank {
        records: PathBuf,

        #[arg(long)]
        min_score: Option<f64>,

        /// Keep candidates with a skill containing this text
        #[arg(long)]
        skill: Option<String>,
    },

    /// Compare two candidates category by category
    Compare {
        records: PathBuf,
        /// Name or GitHub username of the first candidate
        first: String,
        /// Name or GitHub username of the second candidate
        second: String,
    },

    /// Rule-based insight report for one candidate
    Insights {
        records: PathBuf,
        name: Option<String>,
    },

    /// Write a CSV or HTML export
    Export {
        records: PathBuf,

        #[arg(short, long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,

        /// Report title (HTML only)
        #[arg(short, long)]
        title: Option<String>,

        /// Directory to write into instead of the configured export dir
        #[arg(short, long)]
        out_dir: Option<PathBuf>,

        /// Open the written file afterwards
        #[arg(long)]
        open: bool,
    },

    /// Draft an outreach email for one candidate
    Email {
        records: PathBuf,
        name: Option<String>,

        /// Hand the draft to the system mail client
        #[arg(long)]
        open: bool,
    },

    /// Generate interview questions with Gemini
    Questions {
        records: PathBuf,
        name: Option<String>,
    },

    /// Summary statistics over a candidate pool
    Analytics { records: PathBuf },

    /// Chart rows for one candidate's score breakdown
    Breakdown {
        records: PathBuf,
        name: Option<String>,
    },

    /// Show or change runtime settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// Manage API keys in the OS keychain
    Secrets {
        #[command(subcommand)]
        action: SecretsAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum SettingsAction {
    /// Print the current settings as JSON
    Show,
    /// Print the settings file location
    Path,
    /// Change one setting by its camelCase key
    Set { key: String, value: String },
}

#[derive(Subcommand, Debug)]
pub enum SecretsAction {
    /// Store a key; reads it from stdin when no value is given
    Set {
        kind: SecretName,
        value: Option<String>,
    },
    /// Remove a stored key
    Clear { kind: SecretName },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Html,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SecretName {
    Gemini,
    Github,
}

impl From<SecretName> for SecretKind {
    fn from(name: SecretName) -> Self {
        match name {
            SecretName::Gemini => SecretKind::Gemini,
            SecretName::Github => SecretKind::GitHub,
        }
    }
}

pub async fn run(command: Commands) -> anyhow::Result<()> {
    let mut service = CoreService::new().await?;

    match command {
        Commands::Ingest {
            spreadsheet,
            resumes,
            offline,
        } => {
            let batch = read_upload_batch(spreadsheet.as_deref(), &resumes).await?;
            let candidates = service.ingest(&batch, !offline).await?;
            let records: Vec<CandidateRecord> =
                candidates.into_iter().map(CandidateRecord::from).collect();
            print_json(&records)
        }
        Commands::Search {
            query,
            language,
            location,
        } => {
            let filters = SearchFilters { language, location };
            let records: Vec<CandidateRecord> = service
                .search(&query, &filters)
                .await
                .into_iter()
                .map(CandidateRecord::from)
                .collect();
            print_json(&records)
        }
        Commands::Profile { login } => match service.profile(&login).await {
            Some(profile) => print_json(&CandidateRecord::from(profile)),
            None => Err(CoreError::InvalidRequest(format!(
                "could not load GitHub profile `{login}`"
            ))
            .into()),
        },
        Commands::Rank {
            records,
            min_score,
            skill,
        } => {
            let records = read_records(&records).await?;
            print_json(&analytics::rank_candidates(records, min_score, skill.as_deref()))
        }
        Commands::Compare {
            records,
            first,
            second,
        } => {
            let records = read_records(&records).await?;
            let a = select_record(&records, Some(&first))?;
            let b = select_record(&records, Some(&second))?;
            print_json(&compare_candidates(a, b))
        }
        Commands::Insights { records, name } => {
            let records = read_records(&records).await?;
            print_json(&analyze_candidate(select_record(&records, name.as_deref())?))
        }
        Commands::Export {
            records,
            format,
            title,
            out_dir,
            open,
        } => {
            let records = read_records(&records).await?;
            let path = match format {
                ExportFormat::Csv => service.export_csv(&records, out_dir.as_deref()).await?,
                ExportFormat::Html => {
                    service
                        .export_html(&records, title.as_deref(), out_dir.as_deref())
                        .await?
                }
            };
            if open {
                open_target(&path.display().to_string())?;
            }
            println!("{}", path.display());
            Ok(())
        }
        Commands::Email {
            records,
            name,
            open,
        } => {
            let records = read_records(&records).await?;
            let email = service.email(select_record(&records, name.as_deref())?);
            if open {
                open_target(&mailto_url(&email))?;
            }
            print_json(&email)
        }
        Commands::Questions { records, name } => {
            let records = read_records(&records).await?;
            let candidate = select_record(&records, name.as_deref())?;
            print_json(&service.interview_questions(candidate).await?)
        }
        Commands::Analytics { records } => {
            let records = read_records(&records).await?;
            print_json(&analytics::talent_analytics(&records))
        }
        Commands::Breakdown { records, name } => {
            let records = read_records(&records).await?;
            match select_record(&records, name.as_deref())? {
                CandidateRecord::Internal(candidate) => {
                    print_json(&analytics::breakdown_bars(&candidate.score_breakdown))
                }
                CandidateRecord::External(candidate) => Err(CoreError::InvalidRequest(format!(
                    "{} is a GitHub candidate without a score breakdown",
                    candidate.username
                ))
                .into()),
            }
        }
        Commands::Settings { action } => match action {
            SettingsAction::Show => print_json(service.settings()),
            SettingsAction::Path => {
                println!("{}", service.settings_path().display());
                Ok(())
            }
            SettingsAction::Set { key, value } => {
                let updated = service.update_setting(&key, &value).await?;
                print_json(updated)
            }
        },
        Commands::Secrets { action } => match action {
            SecretsAction::Set { kind, value } => {
                let value = match value {
                    Some(value) => value,
                    None => read_stdin_line()?,
                };
                service.set_secret(kind.into(), &value)?;
                info!(?kind, "secret stored in keychain");
                Ok(())
            }
            SecretsAction::Clear { kind } => {
                service.clear_secret(kind.into())?;
                info!(?kind, "secret removed from keychain");
                Ok(())
            }
        },
    }
}

/// Picks a record by name or GitHub username (case-insensitive). With no
/// name the file must hold exactly one record.
pub fn select_record<'a>(
    records: &'a [CandidateRecord],
    name: Option<&str>,
) -> anyhow::Result<&'a CandidateRecord> {
    let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
        return match records {
            [only] => Ok(only),
            _ => Err(CoreError::InvalidRequest(format!(
                "{} candidates in file, name one of them",
                records.len()
            ))
            .into()),
        };
    };

    records
        .iter()
        .find(|record| {
            record.name().eq_ignore_ascii_case(name)
                || (record.is_external() && record.headline().eq_ignore_ascii_case(name))
        })
        .ok_or_else(|| CoreError::InvalidRequest(format!("no candidate named `{name}`")).into())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}

fn open_target(target: &str) -> anyhow::Result<()> {
    open::that(target).with_context(|| format!("failed to open {target}"))?;
    info!(target, "handed off to system opener");
    Ok(())
}

fn read_stdin_line() -> anyhow::Result<String> {
    eprintln!("Enter value, then press Enter:");
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read secret from stdin")?;
    Ok(line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::github::mock_candidates;

    fn pool() -> Vec<CandidateRecord> {
        mock_candidates("")
            .into_iter()
            .map(CandidateRecord::from)
            .collect()
    }

    #[test]
    fn cli_parses_ingest() {
        let cli = Cli::try_parse_from([
            "hireai",
            "ingest",
            "--spreadsheet",
            "people.xlsx",
            "a.pdf",
            "b.docx",
            "--offline",
        ])
        .unwrap();

        match cli.command {
            Commands::Ingest {
                spreadsheet,
                resumes,
                offline,
            } => {
                assert_eq!(spreadsheet, Some(PathBuf::from("people.xlsx")));
                assert_eq!(resumes.len(), 2);
                assert!(offline);
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn cli_parses_export_and_secrets() {
        let cli = Cli::try_parse_from([
            "hireai", "export", "out.json", "--format", "html", "--title", "Q3", "-l", "debug",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Export {
                format: ExportFormat::Html,
                ..
            }
        ));
        assert_eq!(cli.log_level, "debug");

        let cli = Cli::try_parse_from(["hireai", "secrets", "clear", "github"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Secrets {
                action: SecretsAction::Clear {
                    kind: SecretName::Github
                }
            }
        ));
        assert!(Cli::try_parse_from(["hireai", "secrets", "set", "openai"]).is_err());
    }

    #[test]
    fn records_are_selected_by_name_or_username() {
        let records = pool();
        assert_eq!(
            select_record(&records, Some("sarah chen")).unwrap().name(),
            "Sarah Chen"
        );
        assert_eq!(
            select_record(&records, Some("ALEXCODES")).unwrap().name(),
            "Alex Rodriguez"
        );
        assert!(select_record(&records, Some("nobody")).is_err());
        assert!(select_record(&records, None).is_err());
        assert!(select_record(&records[..1], None).is_ok());
    }
}
