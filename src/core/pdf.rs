use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use super::ocr::TesseractCliOcrService;

static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"https?://[^\s<>'"\)]+"#).unwrap());

// Below this many characters the text layer is treated as a scan.
const MIN_TEXT_LAYER_CHARS: usize = 50;

pub struct PdfTextExtractor {
    ocr_service: Option<TesseractCliOcrService>,
}

impl PdfTextExtractor {
    pub fn new(ocr_service: Option<TesseractCliOcrService>) -> Self {
        Self { ocr_service }
    }

    /// Text of the PDF plus whether OCR produced it. Link annotations are
    /// appended because profile URLs often live only in the link layer.
    pub async fn extract_text_with_ocr_fallback(
        &self,
        data: &[u8],
    ) -> anyhow::Result<(String, bool)> {
        let text = match pdf_extract::extract_text_from_mem(data) {
            Ok(mut text) => {
                let links = extract_hyperlinks(data);
                if !links.is_empty() {
                    text.push('\n');
                    text.push_str(&links.join("\n"));
                }
                text
            }
            Err(err) => {
                warn!(error = %err, "PDF text layer unreadable");
                String::new()
            }
        };

        if text.trim().len() >= MIN_TEXT_LAYER_CHARS {
            return Ok((text, false));
        }

        match &self.ocr_service {
            Some(ocr) => {
                debug!("falling back to OCR");
                let ocr_text = ocr.extract_text(data).await?;
                if ocr_text.trim().is_empty() {
                    Ok((text, false))
                } else {
                    Ok((ocr_text, true))
                }
            }
            None => Ok((text, false)),
        }
    }
}

fn extract_hyperlinks(data: &[u8]) -> Vec<String> {
    let raw = String::from_utf8_lossy(data);
    let mut links: Vec<String> = Vec::new();
    for m in URL_RE.find_iter(&raw) {
        let value = m.as_str().to_string();
        if !links.iter().any(|existing| existing.eq_ignore_ascii_case(&value)) {
            links.push(value);
        }
    }

    links
}
