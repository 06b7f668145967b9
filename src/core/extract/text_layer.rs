//! Embedded text-layer extraction using lopdf.
//!
//! Walks each page's content stream and collects the strings shown by
//! `Tj`, `TJ`, `'` and `"`, remembering the font selected by `Tf`.

use super::{ContentExtractor, ExtractedContent, ExtractedDocument, ExtractorKind, PageSelection};
use crate::error::ExtractError;
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::BTreeMap;
use std::path::Path;

/// Kerning (thousandths of an em) below which a TJ gap reads as a space
const TJ_SPACE_THRESHOLD: f32 = -250.0;

/// One run of text and the font that drew it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextItem {
    pub text: String,
    pub font: String,
}

/// Embedded-text extraction strategy
#[derive(Debug, Clone)]
pub struct EmbeddedTextExtractor {
    pages: PageSelection,
    only_diff_text: bool,
}

impl EmbeddedTextExtractor {
    pub fn new(pages: PageSelection) -> Self {
        Self {
            pages,
            only_diff_text: false,
        }
    }

    /// Drop font-name markup and join items with plain newlines
    pub fn only_diff_text(mut self, only: bool) -> Self {
        self.only_diff_text = only;
        self
    }

    /// Text items of each selected page, in document order
    pub fn read_items(&self, pdf: &Path) -> Result<Vec<Vec<TextItem>>, ExtractError> {
        let parse_error = |reason: String| ExtractError::Parse {
            path: pdf.to_path_buf(),
            reason,
        };

        let document = Document::load(pdf).map_err(|e| parse_error(e.to_string()))?;

        if document.trailer.get(b"Encrypt").is_ok() {
            return Err(parse_error("document is encrypted".to_string()));
        }

        let page_ids: Vec<ObjectId> = document.get_pages().into_values().collect();
        let limit = self.pages.limit().unwrap_or(page_ids.len());

        let mut pages = Vec::new();
        for (index, page_id) in page_ids.into_iter().take(limit).enumerate() {
            let items = page_items(&document, page_id)
                .map_err(|e| parse_error(format!("page {}: {}", index + 1, e)))?;
            pages.push(items);
        }

        if pages.iter().all(Vec::is_empty) {
            return Err(parse_error("no extractable text layer".to_string()));
        }

        Ok(pages)
    }

    fn render_page(&self, items: &[TextItem]) -> String {
        items
            .iter()
            .map(|item| {
                if self.only_diff_text {
                    item.text.clone()
                } else {
                    format!("[{}] {}", item.font, item.text)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl ContentExtractor for EmbeddedTextExtractor {
    fn extract(&self, pdf: &Path, _workdir: &Path) -> Result<ExtractedDocument, ExtractError> {
        let pages = self
            .read_items(pdf)?
            .iter()
            .map(|items| ExtractedContent::EmbeddedText(self.render_page(items)))
            .collect();

        Ok(ExtractedDocument::new(pdf, pages))
    }

    fn kind(&self) -> ExtractorKind {
        ExtractorKind::EmbeddedText
    }
}

fn page_items(document: &Document, page_id: ObjectId) -> lopdf::Result<Vec<TextItem>> {
    let fonts = document.get_page_fonts(page_id);
    let content = Content::decode(&document.get_page_content(page_id)?)?;

    let mut items = Vec::new();
    let mut font = String::new();

    for operation in &content.operations {
        let text = match operation.operator.as_str() {
            "Tf" => {
                if let Some(Object::Name(name)) = operation.operands.first() {
                    font = font_name(&fonts, name);
                }
                continue;
            }
            "Tj" | "'" | "\"" => match operation.operands.last() {
                Some(Object::String(bytes, _)) => decode_pdf_string(bytes),
                _ => continue,
            },
            "TJ" => match operation.operands.first() {
                Some(Object::Array(parts)) => join_tj_parts(parts),
                _ => continue,
            },
            _ => continue,
        };

        if !text.trim().is_empty() {
            items.push(TextItem {
                text,
                font: font.clone(),
            });
        }
    }

    Ok(items)
}

/// Resolve a font resource name to its BaseFont, without subset prefix
fn font_name(fonts: &BTreeMap<Vec<u8>, &Dictionary>, resource: &[u8]) -> String {
    fonts
        .get(resource)
        .and_then(|dict| dict.get(b"BaseFont").ok())
        .and_then(|base| base.as_name_str().ok())
        .map(|base| match base.split_once('+') {
            Some((prefix, name)) if prefix.len() == 6 => name.to_string(),
            _ => base.to_string(),
        })
        .unwrap_or_else(|| String::from_utf8_lossy(resource).into_owned())
}

fn join_tj_parts(parts: &[Object]) -> String {
    let mut text = String::new();
    for part in parts {
        match part {
            Object::String(bytes, _) => text.push_str(&decode_pdf_string(bytes)),
            other => {
                if let Ok(kerning) = other.as_float() {
                    if kerning < TJ_SPACE_THRESHOLD && !text.ends_with(' ') {
                        text.push(' ');
                    }
                }
            }
        }
    }
    text
}

/// Decode a PDF string: UTF-16BE with BOM, otherwise one char per byte
fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE_u8, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }

    bytes.iter().map(|&b| b as char).collect()
}
