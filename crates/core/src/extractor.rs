use crate::error::IngestError;
use crate::models::FileFormat;
use crate::normalize::TextNormalizer;
use base64::{engine::general_purpose::STANDARD, Engine};
use lopdf::Document as PdfDocument;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// Result of extraction: normalized text plus a best-effort page count.
#[derive(Debug, Clone)]
pub struct ExtractedText {
    pub text: String,
    pub pages_count: u32,
}

/// Converts stored files into normalized plain text. Extraction never fails
/// upward: each backend error is logged and the best text obtained so far
/// (possibly empty) is returned to the caller.
pub struct TextExtractor {
    normalizer: TextNormalizer,
}

impl TextExtractor {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            normalizer: TextNormalizer::new()?,
        })
    }

    pub fn extract_file(&self, path: &Path, format: FileFormat) -> ExtractedText {
        let (text, pages_count) = match format {
            FileFormat::Txt => (read_plain_text(path), 1),
            FileFormat::Pdf => (extract_pdf_text(path), count_pdf_pages(path)),
            FileFormat::Docx | FileFormat::Doc => (extract_word_text(path), 1),
            FileFormat::Unsupported => (String::new(), 1),
        };

        ExtractedText {
            text: self.normalizer.normalize(&text),
            pages_count,
        }
    }
}

fn read_plain_text(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(error) => {
            warn!(path = %path.display(), %error, "plain text read failed");
            String::new()
        }
    }
}

/// A PDF text backend either produces text, reports itself unavailable
/// (`Ok(None)`), or fails. Failures never propagate past the chain.
type PdfBackend = fn(&Path) -> Result<Option<String>, IngestError>;

/// Fixed priority order: the layout-aware content-stream decoder first, the
/// remote layout-analysis endpoint second, the per-page baseline last.
const PDF_BACKENDS: [(&str, PdfBackend); 3] = [
    ("pdf-extract", extract_with_pdf_extract),
    ("layout-endpoint", extract_with_layout_endpoint),
    ("lopdf", extract_with_lopdf),
];

fn extract_pdf_text(path: &Path) -> String {
    run_backend_chain(&PDF_BACKENDS, path)
}

/// Stops at the first backend that yields non-blank text; unavailable or
/// failing backends are logged and skipped.
fn run_backend_chain(backends: &[(&str, PdfBackend)], path: &Path) -> String {
    for &(name, backend) in backends {
        match backend(path) {
            Ok(Some(text)) if !text.trim().is_empty() => {
                debug!(backend = name, path = %path.display(), "pdf text extracted");
                return text;
            }
            Ok(Some(_)) => debug!(backend = name, "backend produced no text"),
            Ok(None) => debug!(backend = name, "backend unavailable"),
            Err(error) => warn!(backend = name, %error, "pdf backend failed"),
        }
    }

    String::new()
}

/// Page count comes from the baseline page reader regardless of which
/// backend supplied the text.
fn count_pdf_pages(path: &Path) -> u32 {
    match PdfDocument::load(path) {
        Ok(document) => document.get_pages().len().max(1) as u32,
        Err(error) => {
            warn!(path = %path.display(), %error, "pdf page count failed, defaulting to 1");
            1
        }
    }
}

fn extract_with_pdf_extract(path: &Path) -> Result<Option<String>, IngestError> {
    let text = pdf_extract::extract_text(path)
        .map_err(|error| IngestError::PdfParse(error.to_string()))?;
    Ok(Some(text))
}

fn extract_with_lopdf(path: &Path) -> Result<Option<String>, IngestError> {
    let document =
        PdfDocument::load(path).map_err(|error| IngestError::PdfParse(error.to_string()))?;

    let mut text = String::new();
    for (page_no, _page_id) in document.get_pages() {
        match document.extract_text(&[page_no]) {
            Ok(page_text) if !page_text.trim().is_empty() => {
                text.push_str(&page_text);
                text.push('\n');
            }
            Ok(_) => {}
            Err(error) => debug!(page = page_no, %error, "skipping unreadable pdf page"),
        }
    }

    Ok(Some(text))
}

#[derive(Debug, Clone, Serialize)]
struct LayoutExtractRequest {
    pdf_base64: String,
    source_path: String,
}

#[derive(Debug, Clone, Deserialize)]
struct LayoutExtractResponse {
    pages: Option<Vec<LayoutExtractPage>>,
    text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct LayoutExtractPage {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Clone)]
struct LayoutEndpointConfig {
    endpoint: String,
    api_key: Option<String>,
}

fn non_empty_env(name: &str) -> Option<String> {
    let value = std::env::var(name).ok()?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn parse_layout_endpoint_config() -> Option<LayoutEndpointConfig> {
    Some(LayoutEndpointConfig {
        endpoint: non_empty_env("LAYOUT_EXTRACT_ENDPOINT")?,
        api_key: non_empty_env("LAYOUT_EXTRACT_API_KEY"),
    })
}

/// Posts the PDF to a layout-analysis service that handles tables and
/// multi-column pages. Unavailable unless `LAYOUT_EXTRACT_ENDPOINT` is set.
fn extract_with_layout_endpoint(path: &Path) -> Result<Option<String>, IngestError> {
    tokio::task::block_in_place(|| extract_with_layout_endpoint_blocking(path))
}

fn extract_with_layout_endpoint_blocking(path: &Path) -> Result<Option<String>, IngestError> {
    let cfg = match parse_layout_endpoint_config() {
        Some(cfg) => cfg,
        None => return Ok(None),
    };

    let pdf = std::fs::read(path).map_err(IngestError::Io)?;
    let payload = LayoutExtractRequest {
        pdf_base64: STANDARD.encode(pdf),
        source_path: path.to_string_lossy().to_string(),
    };

    let mut request = Client::new()
        .post(&cfg.endpoint)
        .header("content-type", "application/json")
        .json(&payload);

    if let Some(api_key) = cfg.api_key {
        request = request.bearer_auth(api_key);
    }

    let response = request.send()?;

    if !response.status().is_success() {
        return Err(IngestError::LayoutExtract(format!(
            "layout extraction request to {} returned {}",
            cfg.endpoint,
            response.status()
        )));
    }

    let payload: LayoutExtractResponse = response.json()?;
    Ok(Some(layout_response_text(&payload)))
}

fn layout_response_text(payload: &LayoutExtractResponse) -> String {
    if let Some(pages) = &payload.pages {
        let joined = pages
            .iter()
            .filter_map(|page| page.text.as_deref())
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        if !joined.is_empty() {
            return joined;
        }
    }

    payload
        .text
        .as_deref()
        .map(|text| text.replace('\u{000c}', "\n"))
        .unwrap_or_default()
}

fn extract_word_text(path: &Path) -> String {
    match read_word_paragraphs(path) {
        Ok(paragraphs) => paragraphs.join("\n\n"),
        Err(error) => {
            warn!(path = %path.display(), %error, "word document extraction failed");
            String::new()
        }
    }
}

/// Non-blank paragraphs in document order. `.doc` files are fed through the
/// same reader as `.docx`, a known approximation.
fn read_word_paragraphs(path: &Path) -> Result<Vec<String>, IngestError> {
    let data = std::fs::read(path)?;
    let docx =
        docx_rs::read_docx(&data).map_err(|error| IngestError::DocParse(error.to_string()))?;

    let mut paragraphs = Vec::new();
    for child in docx.document.children {
        if let docx_rs::DocumentChild::Paragraph(paragraph) = child {
            let mut text = String::new();
            for child in paragraph.children {
                if let docx_rs::ParagraphChild::Run(run) = child {
                    for child in run.children {
                        if let docx_rs::RunChild::Text(t) = child {
                            text.push_str(&t.text);
                        }
                    }
                }
            }

            let text = text.trim().to_string();
            if !text.is_empty() {
                paragraphs.push(text);
            }
        }
    }

    Ok(paragraphs)
}

#[cfg(test)]
mod tests {
    use super::{layout_response_text, LayoutExtractPage, LayoutExtractResponse, TextExtractor};
    use crate::models::FileFormat;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn plain_text_file_extracts_with_one_page() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("note.txt");
        fs::write(&path, "A short note about nothing much.")?;

        let extractor = TextExtractor::new()?;
        let extracted = extractor.extract_file(&path, FileFormat::Txt);

        assert_eq!(extracted.text, "A short note about nothing much.");
        assert_eq!(extracted.pages_count, 1);
        Ok(())
    }

    #[test]
    fn empty_file_extracts_to_empty_text() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("empty.txt");
        fs::write(&path, "")?;

        let extractor = TextExtractor::new()?;
        let extracted = extractor.extract_file(&path, FileFormat::Txt);

        assert!(extracted.text.is_empty());
        assert_eq!(extracted.pages_count, 1);
        Ok(())
    }

    #[test]
    fn unrecognized_format_extracts_to_empty_text() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("archive.zip");
        fs::write(&path, b"PK\x03\x04")?;

        let extractor = TextExtractor::new()?;
        let extracted = extractor.extract_file(&path, FileFormat::Unsupported);

        assert!(extracted.text.is_empty());
        assert_eq!(extracted.pages_count, 1);
        Ok(())
    }

    #[test]
    fn extraction_normalizes_artifacts() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("resume.txt");
        fs::write(&path, "Jane   Doe /envel\u{2322}pe jane@doe.dev\n\n\n\nSkills")?;

        let extractor = TextExtractor::new()?;
        let extracted = extractor.extract_file(&path, FileFormat::Txt);

        assert!(extracted.text.contains("| Email: jane@doe.dev"));
        assert!(!extracted.text.contains("   "));
        Ok(())
    }

    #[test]
    fn backend_chain_stops_at_first_nonblank_text() {
        use super::{run_backend_chain, PdfBackend};
        use crate::error::IngestError;
        use std::path::Path;

        fn failing(_path: &Path) -> Result<Option<String>, IngestError> {
            Err(IngestError::PdfParse("corrupt xref table".to_string()))
        }

        fn unavailable(_path: &Path) -> Result<Option<String>, IngestError> {
            Ok(None)
        }

        fn baseline(_path: &Path) -> Result<Option<String>, IngestError> {
            Ok(Some("baseline text".to_string()))
        }

        let chain: [(&str, PdfBackend); 3] = [
            ("failing", failing),
            ("unavailable", unavailable),
            ("baseline", baseline),
        ];

        assert_eq!(run_backend_chain(&chain, Path::new("x.pdf")), "baseline text");

        let empty_chain: [(&str, PdfBackend); 2] =
            [("failing", failing), ("unavailable", unavailable)];
        assert_eq!(run_backend_chain(&empty_chain, Path::new("x.pdf")), "");
    }

    #[test]
    fn layout_response_prefers_listed_pages() {
        let response = LayoutExtractResponse {
            pages: Some(vec![
                LayoutExtractPage {
                    text: Some("  ".to_string()),
                },
                LayoutExtractPage {
                    text: Some("Second page".to_string()),
                },
            ]),
            text: Some("ignored".to_string()),
        };

        assert_eq!(layout_response_text(&response), "Second page");
    }

    #[test]
    fn layout_response_falls_back_to_form_feed_text() {
        let response = LayoutExtractResponse {
            pages: None,
            text: Some("First\u{000c}Second".to_string()),
        };

        assert_eq!(layout_response_text(&response), "First\nSecond");
    }
}
