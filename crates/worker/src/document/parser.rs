//! Parser Registry: dispatches by file extension to a
//! vendor-specific reader, each producing the vendor-agnostic
//! `docint_core::chunking::DocElement` stream the smart chunker consumes.

use docint_core::chunking::DocElement;
use std::path::Path;

use crate::utils::error::WorkerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfKind {
    Digital,
    Scanned,
}

/// Parses a document at `path` into reading-order elements. The extension
/// picks the vendor; unsupported extensions are a hard error rather than a
/// silent plain-text fallback.
pub fn parse_document(path: &Path) -> Result<Vec<DocElement>, WorkerError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .ok_or_else(|| WorkerError::UnsupportedFileType("no extension".to_string()))?;

    match ext.as_str() {
        "pdf" => parse_pdf(path),
        "docx" => parse_docx(path),
        "md" | "markdown" => parse_markdown(path),
        "html" | "htm" => parse_html(path),
        "xlsx" | "xls" => parse_spreadsheet(path),
        "pptx" => parse_pptx(path),
        "rtf" => parse_rtf(path),
        "txt" => parse_plain_text(path),
        other => Err(WorkerError::UnsupportedFileType(other.to_string())),
    }
}

/// Digital PDFs have an extractable text layer; scanned PDFs are image-only
/// and require a higher parser tier (OCR) this registry does not provide.
pub fn detect_pdf_kind(path: &Path) -> Result<PdfKind, WorkerError> {
    let doc = lopdf::Document::load(path).map_err(|e| WorkerError::ParsingError(e.to_string()))?;
    for (page_num, _) in doc.get_pages() {
        let text = doc
            .extract_text(&[page_num])
            .unwrap_or_default();
        if !text.trim().is_empty() {
            return Ok(PdfKind::Digital);
        }
    }
    Ok(PdfKind::Scanned)
}

fn parse_pdf(path: &Path) -> Result<Vec<DocElement>, WorkerError> {
    if detect_pdf_kind(path)? == PdfKind::Scanned {
        return Err(WorkerError::ParsingError(
            "scanned PDF requires an OCR-tier parser not installed in this worker".to_string(),
        ));
    }
    let doc = lopdf::Document::load(path).map_err(|e| WorkerError::ParsingError(e.to_string()))?;
    let mut elements = Vec::new();
    for (page_num, _) in doc.get_pages() {
        let text = doc
            .extract_text(&[page_num])
            .map_err(|e| WorkerError::ParsingError(e.to_string()))?;
        for para in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
            elements.push(DocElement::Paragraph {
                text: para.to_string(),
                page: page_num as i32,
            });
        }
    }
    Ok(elements)
}

fn parse_docx(path: &Path) -> Result<Vec<DocElement>, WorkerError> {
    let bytes = std::fs::read(path)?;
    let docx = docx_rs::read_docx(&bytes).map_err(|e| WorkerError::ParsingError(format!("{e:?}")))?;
    let mut elements = Vec::new();

    for child in docx.document.children {
        if let docx_rs::DocumentChild::Paragraph(p) = child {
            let mut text = String::new();
            for pc in &p.children {
                if let docx_rs::ParagraphChild::Run(r) = pc {
                    for rc in &r.children {
                        if let docx_rs::RunChild::Text(t) = rc {
                            text.push_str(&t.text);
                        }
                    }
                }
            }
            let text = text.trim().to_string();
            if text.is_empty() {
                continue;
            }
            let heading_level = p.property.style.as_ref().and_then(|s| heading_level_from_style(&s.val));
            match heading_level {
                Some(level) => elements.push(DocElement::Heading { level, text, page: 1 }),
                None => elements.push(DocElement::Paragraph { text, page: 1 }),
            }
        }
    }
    Ok(elements)
}

fn heading_level_from_style(style: &str) -> Option<u8> {
    let lower = style.to_ascii_lowercase();
    lower.strip_prefix("heading").and_then(|n| n.trim().parse::<u8>().ok())
}

fn parse_markdown(path: &Path) -> Result<Vec<DocElement>, WorkerError> {
    let text = std::fs::read_to_string(path)?;
    let parser = pulldown_cmark::Parser::new(&text);
    let mut elements = Vec::new();
    let mut buf = String::new();
    let mut current_heading_level: Option<u8> = None;

    for event in parser {
        match event {
            pulldown_cmark::Event::Start(pulldown_cmark::Tag::Heading { level, .. }) => {
                current_heading_level = Some(level as u8);
                buf.clear();
            }
            pulldown_cmark::Event::End(pulldown_cmark::TagEnd::Heading(_)) => {
                if let Some(level) = current_heading_level.take() {
                    elements.push(DocElement::Heading { level, text: buf.trim().to_string(), page: 1 });
                }
                buf.clear();
            }
            pulldown_cmark::Event::Start(pulldown_cmark::Tag::Paragraph) => buf.clear(),
            pulldown_cmark::Event::End(pulldown_cmark::TagEnd::Paragraph) => {
                let text = buf.trim().to_string();
                if !text.is_empty() {
                    elements.push(DocElement::Paragraph { text, page: 1 });
                }
                buf.clear();
            }
            pulldown_cmark::Event::Text(t) | pulldown_cmark::Event::Code(t) => buf.push_str(&t),
            pulldown_cmark::Event::SoftBreak | pulldown_cmark::Event::HardBreak => buf.push(' '),
            _ => {}
        }
    }
    Ok(elements)
}

fn parse_html(path: &Path) -> Result<Vec<DocElement>, WorkerError> {
    let html = std::fs::read_to_string(path)?;
    let document = scraper::Html::parse_document(&html);
    let mut elements = Vec::new();

    for node in document.root_element().descendants() {
        let Some(el) = scraper::ElementRef::wrap(node) else { continue };
        let tag = el.value().name();
        let text: String = el.text().collect::<Vec<_>>().join(" ").trim().to_string();
        if text.is_empty() {
            continue;
        }
        match tag {
            "h1" => elements.push(DocElement::Heading { level: 1, text, page: 1 }),
            "h2" => elements.push(DocElement::Heading { level: 2, text, page: 1 }),
            "h3" => elements.push(DocElement::Heading { level: 3, text, page: 1 }),
            "h4" | "h5" | "h6" => elements.push(DocElement::Heading { level: 4, text, page: 1 }),
            "p" => elements.push(DocElement::Paragraph { text, page: 1 }),
            "table" => {
                let rows: Vec<Vec<String>> = el
                    .select(&scraper::Selector::parse("tr").unwrap())
                    .map(|row| {
                        row.select(&scraper::Selector::parse("td, th").unwrap())
                            .map(|cell| cell.text().collect::<Vec<_>>().join(" ").trim().to_string())
                            .collect()
                    })
                    .collect();
                if !rows.is_empty() {
                    elements.push(DocElement::Table { rows, caption: None, page: 1 });
                }
            }
            _ => {}
        }
    }
    Ok(elements)
}

fn parse_spreadsheet(path: &Path) -> Result<Vec<DocElement>, WorkerError> {
    use calamine::Reader;
    let mut workbook: calamine::Sheets<_> =
        calamine::open_workbook_auto(path).map_err(|e| WorkerError::ParsingError(e.to_string()))?;
    let mut elements = Vec::new();

    for sheet_name in workbook.sheet_names() {
        let Ok(range) = workbook.worksheet_range(&sheet_name) else { continue };
        let rows: Vec<Vec<String>> = range
            .rows()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect();
        if rows.is_empty() {
            continue;
        }
        elements.push(DocElement::Heading { level: 1, text: sheet_name.clone(), page: 1 });
        elements.push(DocElement::Table { rows, caption: Some(sheet_name), page: 1 });
    }
    Ok(elements)
}

/// Minimal text-run extraction from slide XML; preserves reading order
/// across slides but not layout (text boxes are read in document order).
fn parse_pptx(path: &Path) -> Result<Vec<DocElement>, WorkerError> {
    let file = std::fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| WorkerError::ParsingError(e.to_string()))?;
    let mut slide_names: Vec<String> = (0..archive.len())
        .filter_map(|i| archive.by_index(i).ok().map(|f| f.name().to_string()))
        .filter(|name| name.starts_with("ppt/slides/slide") && name.ends_with(".xml"))
        .collect();
    slide_names.sort();

    let mut elements = Vec::new();
    for (idx, name) in slide_names.iter().enumerate() {
        let mut entry = archive.by_name(name).map_err(|e| WorkerError::ParsingError(e.to_string()))?;
        let mut xml = String::new();
        std::io::Read::read_to_string(&mut entry, &mut xml)?;
        let texts = extract_pptx_text_runs(&xml);
        for text in texts {
            elements.push(DocElement::Paragraph { text, page: idx as i32 + 1 });
        }
    }
    Ok(elements)
}

fn extract_pptx_text_runs(xml: &str) -> Vec<String> {
    use quick_xml::events::Event;
    use quick_xml::reader::Reader;

    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut in_text = false;
    let mut runs = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::End(e)) if e.local_name().as_ref() == b"t" => in_text = false,
            Ok(Event::Text(t)) if in_text => {
                if let Ok(text) = t.unescape() {
                    let text = text.trim().to_string();
                    if !text.is_empty() {
                        runs.push(text);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    runs
}

fn parse_rtf(path: &Path) -> Result<Vec<DocElement>, WorkerError> {
    let raw = std::fs::read_to_string(path)?;
    let doc = rtf_parser::document::RtfDocument::try_from(raw.as_str())
        .map_err(|e| WorkerError::ParsingError(format!("{e:?}")))?;
    let text = doc.get_text();
    let elements = text
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| DocElement::Paragraph { text: p.to_string(), page: 1 })
        .collect();
    Ok(elements)
}

fn parse_plain_text(path: &Path) -> Result<Vec<DocElement>, WorkerError> {
    let (text, _, _) = encoding_rs::UTF_8.decode(&std::fs::read(path)?);
    let elements = text
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| DocElement::Paragraph { text: p.to_string(), page: 1 })
        .collect();
    Ok(elements)
}
