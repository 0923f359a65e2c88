//! PDF text extraction into a single normalized corpus.

use std::fmt::Display;
use std::io::Read;

use lopdf::Document;
use tracing::{debug, info, warn};

use crate::error::ExtractionError;
use crate::models::{CorpusReport, DocumentOutcome, ExtractedCorpus, PdfSource};
use crate::utils::{calculate_checksum, clean_text};

/// Extracts and joins the text of a list of PDFs.
#[derive(Debug, Clone)]
pub struct PdfExtractor {
    separator: String,
}

/// Text of one document plus page accounting.
#[derive(Debug, Clone, PartialEq)]
struct DocumentText {
    text: String,
    pages: usize,
    pages_skipped: usize,
}

impl PdfExtractor {
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
        }
    }

    /// Extract every source in order. Unreadable or empty documents are dropped
    /// and recorded in the report; fails only when nothing is left.
    pub fn extract(&self, sources: Vec<PdfSource>) -> Result<ExtractedCorpus, ExtractionError> {
        let total = sources.len();
        let mut report = CorpusReport::default();
        let mut texts = Vec::with_capacity(total);

        for (i, source) in sources.into_iter().enumerate() {
            let name = source.name();
            debug!(document = %name, "extracting {}/{}", i + 1, total);

            match extract_document(source, &name) {
                Ok(doc) if doc.text.is_empty() => {
                    warn!(document = %name, "no text extracted, dropping document");
                    report.push(DocumentOutcome::Dropped {
                        name,
                        reason: "no extractable text".to_string(),
                    });
                }
                Ok(doc) => {
                    info!(
                        document = %name,
                        pages = doc.pages,
                        characters = doc.text.chars().count(),
                        "document extracted"
                    );
                    report.push(DocumentOutcome::Loaded {
                        checksum: calculate_checksum(&doc.text),
                        characters: doc.text.chars().count(),
                        pages: doc.pages,
                        pages_skipped: doc.pages_skipped,
                        name,
                    });
                    texts.push(doc.text);
                }
                Err(e) => {
                    warn!(document = %name, error = %e, "dropping document");
                    report.push(DocumentOutcome::Dropped {
                        name,
                        reason: e.to_string(),
                    });
                }
            }
        }

        if texts.is_empty() {
            return Err(ExtractionError::EmptyCorpus);
        }

        let text = texts.join(&self.separator);
        info!(
            documents = texts.len(),
            characters = text.chars().count(),
            "corpus assembled"
        );
        Ok(ExtractedCorpus { text, report })
    }
}

fn read_source(source: PdfSource, name: &str) -> Result<Vec<u8>, ExtractionError> {
    let read_err = |source| ExtractionError::Read {
        name: name.to_string(),
        source,
    };
    match source {
        PdfSource::Path(path) => std::fs::read(&path).map_err(read_err),
        PdfSource::Stream { mut reader, .. } => {
            let mut bytes = Vec::new();
            reader.read_to_end(&mut bytes).map_err(read_err)?;
            Ok(bytes)
        }
    }
}

fn extract_document(source: PdfSource, name: &str) -> Result<DocumentText, ExtractionError> {
    let bytes = read_source(source, name)?;
    let document = Document::load_mem(&bytes).map_err(|e| ExtractionError::Parse {
        name: name.to_string(),
        message: e.to_string(),
    })?;
    let page_numbers: Vec<u32> = document.get_pages().keys().copied().collect();

    // pdf-extract decodes ToUnicode/CID fonts; lopdf alone only handles simple encodings.
    let pages: Vec<(u32, Result<String, String>)> =
        match pdf_extract::extract_text_from_mem_by_pages(&bytes) {
            Ok(texts) if texts.len() == page_numbers.len() => page_numbers
                .into_iter()
                .zip(texts.into_iter().map(Ok))
                .collect(),
            Ok(texts) => {
                warn!(
                    document = %name,
                    expected = page_numbers.len(),
                    found = texts.len(),
                    "page count mismatch in text layer, extracting page by page"
                );
                lopdf_pages(&document, page_numbers)
            }
            Err(e) => {
                warn!(document = %name, error = %e, "text layer extraction failed, extracting page by page");
                lopdf_pages(&document, page_numbers)
            }
        };

    Ok(assemble_pages(name, pages))
}

/// Placeholder lopdf emits for font encodings it cannot decode.
const UNSUPPORTED_ENCODING_MARKER: &str = "Unimplemented?";

/// Per-page fallback. Pages whose font encoding lopdf cannot decode count as failed.
fn lopdf_pages(document: &Document, page_numbers: Vec<u32>) -> Vec<(u32, Result<String, String>)> {
    page_numbers
        .into_iter()
        .map(|number| {
            let page = document
                .extract_text(&[number])
                .map_err(|e| e.to_string())
                .and_then(|text| {
                    if text.contains(UNSUPPORTED_ENCODING_MARKER) {
                        Err("unsupported font encoding".to_string())
                    } else {
                        Ok(text)
                    }
                });
            (number, page)
        })
        .collect()
}

/// Join page texts in order, skipping pages that failed, and normalize the result.
fn assemble_pages<E: Display>(name: &str, pages: Vec<(u32, Result<String, E>)>) -> DocumentText {
    let page_count = pages.len();
    let mut pages_skipped = 0;
    let mut raw = String::new();

    for (number, page) in pages {
        match page {
            Ok(text) => {
                if !text.trim().is_empty() {
                    raw.push_str(&text);
                    raw.push('\n');
                }
            }
            Err(e) => {
                warn!(document = %name, page = number, error = %e, "skipping unreadable page");
                pages_skipped += 1;
            }
        }
    }

    DocumentText {
        text: clean_text(&raw),
        pages: page_count,
        pages_skipped,
    }
}
