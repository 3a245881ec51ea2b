use std::io::{Cursor, Read};

use anyhow::Context;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesRef, Event};
use quick_xml::Reader;
use tracing::debug;

use super::errors::CoreError;
use super::field_extractor;
use super::models::ResumeExtractionResult;
use super::pdf::PdfTextExtractor;

pub struct ResumeDocumentParser {
    pdf_text_extractor: PdfTextExtractor,
}

impl ResumeDocumentParser {
    pub fn new(pdf_text_extractor: PdfTextExtractor) -> Self {
        Self { pdf_text_extractor }
    }

    pub async fn parse_resume_bytes(
        &self,
        file_name: &str,
        data: &[u8],
    ) -> anyhow::Result<ResumeExtractionResult> {
        let mut ocr_used = false;
        let mut errors = Vec::new();

        let text = match file_extension(file_name).as_str() {
            "pdf" => {
                let (text, used_ocr) = self
                    .pdf_text_extractor
                    .extract_text_with_ocr_fallback(data)
                    .await
                    .with_context(|| format!("failed to read PDF {file_name}"))?;
                ocr_used = used_ocr;
                text
            }
            "docx" => extract_docx_text(data)
                .with_context(|| format!("failed to read DOCX {file_name}"))?,
            "txt" | "md" => String::from_utf8_lossy(data).into_owned(),
            // Legacy Word binaries are only readable by the analyzer, which
            // receives the raw bytes.
            "doc" => {
                errors.push(format!(
                    "Legacy .doc file {file_name} is not read locally; convert to DOCX or PDF for contact extraction"
                ));
                String::new()
            }
            _ => return Err(CoreError::UnsupportedFile(file_name.to_string()).into()),
        };

        debug!(file_name, chars = text.len(), ocr_used, "extracted resume text");

        if text.trim().is_empty() {
            errors.push(format!("No readable text found in {file_name}"));
        }

        let contacts = field_extractor::extract_contacts(&text);
        let name = field_extractor::guess_name(&text);
        let confidence = field_extractor::contact_confidence(name.as_deref(), &contacts, ocr_used);

        Ok(ResumeExtractionResult {
            text,
            name,
            email: contacts.email,
            phone: contacts.phone,
            linked_in: contacts.linked_in,
            git_hub: contacts.git_hub,
            confidence,
            ocr_used,
            errors,
        })
    }
}

pub fn file_extension(file_name: &str) -> String {
    std::path::Path::new(file_name)
        .extension()
        .and_then(|v| v.to_str())
        .map(|v| v.to_ascii_lowercase())
        .unwrap_or_default()
}

/// MIME type sent alongside inline resume bytes.
pub fn mime_type_for(file_name: &str) -> &'static str {
    match file_extension(file_name).as_str() {
        "pdf" => "application/pdf",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "doc" => "application/msword",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        _ => "text/plain",
    }
}

fn extract_docx_text(data: &[u8]) -> anyhow::Result<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")?
        .read_to_string(&mut xml)?;

    Ok(paragraphs_from_xml(&xml, b"w:p")?.join("\n"))
}

/// Text content of every `paragraph_tag` element, one string per element,
/// skipping empty ones.
pub(crate) fn paragraphs_from_xml(xml: &str, paragraph_tag: &[u8]) -> anyhow::Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut current = String::new();
    let mut paragraphs = Vec::new();
    let mut in_paragraph = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == paragraph_tag => {
                in_paragraph = true;
                current.clear();
            }
            Event::End(e) if e.name().as_ref() == paragraph_tag => {
                let trimmed = current.trim();
                if !trimmed.is_empty() {
                    paragraphs.push(trimmed.to_string());
                }
                current.clear();
                in_paragraph = false;
            }
            Event::Text(e) if in_paragraph => {
                current.push_str(&e.xml_content()?);
            }
            Event::GeneralRef(e) if in_paragraph => push_entity(&mut current, &e)?,
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}

/// Appends the character behind `&amp;`, `&#39;` and friends. Unknown
/// entities are dropped.
pub(crate) fn push_entity(out: &mut String, entity: &BytesRef<'_>) -> anyhow::Result<()> {
    if let Some(ch) = entity.resolve_char_ref()? {
        out.push(ch);
    } else if let Some(value) = resolve_predefined_entity(&entity.decode()?) {
        out.push_str(value);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn parser() -> ResumeDocumentParser {
        ResumeDocumentParser::new(PdfTextExtractor::new(None))
    }

    fn docx_bytes(body: &str) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        writer.start_file("word/document.xml", options).unwrap();
        writer.write_all(body.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[tokio::test]
    async fn plain_text_resume_yields_contacts() {
        let text = "Maria Garcia\nPhone: (201) 555-0123\nmaria@example.com\ngithub.com/mgarcia";
        let parsed = parser()
            .parse_resume_bytes("maria.txt", text.as_bytes())
            .await
            .unwrap();

        assert_eq!(parsed.name.as_deref(), Some("Maria Garcia"));
        assert_eq!(parsed.email.as_deref(), Some("maria@example.com"));
        assert_eq!(parsed.git_hub.as_deref(), Some("https://github.com/mgarcia"));
        assert!(parsed.errors.is_empty());
        assert!(!parsed.ocr_used);
    }

    #[tokio::test]
    async fn docx_paragraphs_are_joined_with_newlines() {
        let xml = r#"<w:document><w:body>
            <w:p><w:r><w:t>Tom Baker</w:t></w:r></w:p>
            <w:p><w:r><w:t>R&amp;D Engineer at Acme (2019-2022)</w:t></w:r></w:p>
        </w:body></w:document>"#;

        let parsed = parser()
            .parse_resume_bytes("tom.docx", &docx_bytes(xml))
            .await
            .unwrap();

        assert_eq!(parsed.text, "Tom Baker\nR&D Engineer at Acme (2019-2022)");
        assert_eq!(parsed.name.as_deref(), Some("Tom Baker"));
    }

    #[tokio::test]
    async fn unsupported_extension_is_an_error() {
        let err = parser()
            .parse_resume_bytes("resume.rtf", b"{\\rtf1}")
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Unsupported file type"));
    }

    #[tokio::test]
    async fn legacy_doc_parses_without_text() {
        let parsed = parser()
            .parse_resume_bytes("Resume.DOC", b"\xd0\xcf\x11\xe0binary")
            .await
            .unwrap();

        assert!(parsed.text.is_empty());
        assert_eq!(parsed.name, None);
        assert!((parsed.confidence - 0.05).abs() < 0.001);
        assert!(parsed.errors[0].contains("Legacy .doc file Resume.DOC"));
        assert!(parsed.errors.iter().any(|e| e.contains("No readable text found")));
    }

    #[test]
    fn mime_type_follows_extension() {
        assert_eq!(mime_type_for("CV.PDF"), "application/pdf");
        assert_eq!(mime_type_for("notes"), "text/plain");
    }
}
