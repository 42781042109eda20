//! DOCX rewriting.
//!
//! A DOCX file is a ZIP container of XML parts. The rewriter touches only
//! the parts that carry body text (`word/document.xml` plus any
//! `word/headerN.xml` / `word/footerN.xml`); every other entry, including
//! `word/media/*` images, is copied through byte for byte.
//!
//! Within a part, translation operates per paragraph (`w:p`): all `w:t`
//! text in the paragraph is gathered into one unit so sentences split
//! across runs translate coherently. On rewrite the first `w:t` receives
//! the full translation and the rest are emptied. Run-level formatting
//! boundaries inside a paragraph collapse to the first run's formatting;
//! paragraph-level styling is untouched.

use std::io::{Cursor, Read, Write};

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use tracing::{debug, warn};
use zip::ZipArchive;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use super::RewriteControl;
use crate::error::{Error, Result};
use crate::segment::should_translate;
use crate::translator::TranslationClient;

pub struct DocxRewriter<'a> {
    client: &'a TranslationClient,
}

/// One XML part's collected paragraph texts, in document order.
struct PartText {
    name: String,
    paragraphs: Vec<String>,
}

impl<'a> DocxRewriter<'a> {
    pub const fn new(client: &'a TranslationClient) -> Self {
        Self { client }
    }

    /// Translate all body text in a DOCX, returning the rewritten container.
    pub async fn rewrite(&self, bytes: &[u8], ctrl: &RewriteControl) -> Result<Vec<u8>> {
        let entries = read_entries(bytes)?;

        // Gather paragraph texts from every translatable part first, so the
        // progress total is known before any translation starts
        let mut part_texts = Vec::new();
        for (name, data) in &entries {
            if !is_translatable_part(name) {
                continue;
            }
            let xml = std::str::from_utf8(data).map_err(|e| Error::DocxXml {
                part: name.clone(),
                reason: format!("part is not valid UTF-8: {e}"),
            })?;
            part_texts.push(PartText {
                name: name.clone(),
                paragraphs: collect_paragraphs(xml, name)?,
            });
        }

        if !part_texts.iter().any(|p| p.name == "word/document.xml") {
            return Err(Error::DocxContainer(
                "missing word/document.xml".to_string(),
            ));
        }

        let total: usize = part_texts
            .iter()
            .flat_map(|p| p.paragraphs.iter())
            .map(|t| self.client.segment_count(t))
            .sum();
        let baseline = self.client.translated_segments();
        ctrl.report(0, total);

        // Translate paragraph by paragraph, checking for cancellation at
        // each unit boundary
        let mut part_translations = Vec::with_capacity(part_texts.len());
        for part in &part_texts {
            let mut translations = Vec::with_capacity(part.paragraphs.len());
            for text in &part.paragraphs {
                ctrl.check_cancelled()?;
                let translation = if should_translate(text) {
                    let translated = self.client.translate_text(text).await;
                    if translated == *text {
                        None
                    } else {
                        Some(translated)
                    }
                } else {
                    None
                };
                translations.push(translation);
                ctrl.report(
                    self.client.translated_segments().saturating_sub(baseline),
                    total,
                );
            }
            debug!(
                "Part {}: {} paragraphs, {} translated",
                part.name,
                part.paragraphs.len(),
                translations.iter().filter(|t| t.is_some()).count()
            );
            part_translations.push(translations);
        }

        // Repack, substituting the rewritten XML parts
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        let mut part_idx = 0;

        for (name, data) in &entries {
            writer
                .start_file(name.as_str(), options)
                .map_err(|e| Error::DocxContainer(format!("failed to write {name}: {e}")))?;

            if is_translatable_part(name) {
                let xml = std::str::from_utf8(data).map_err(|e| Error::DocxXml {
                    part: name.clone(),
                    reason: format!("part is not valid UTF-8: {e}"),
                })?;
                let rewritten = rewrite_part(xml, name, &part_translations[part_idx])?;
                part_idx += 1;
                writer.write_all(&rewritten)?;
            } else {
                writer.write_all(data)?;
            }
        }

        let output = writer
            .finish()
            .map_err(|e| Error::DocxContainer(format!("failed to finish container: {e}")))?
            .into_inner();

        verify_media_preserved(&entries, &output);

        Ok(output)
    }
}

/// Parts whose paragraph text gets translated.
fn is_translatable_part(name: &str) -> bool {
    name == "word/document.xml"
        || ((name.starts_with("word/header") || name.starts_with("word/footer"))
            && name.ends_with(".xml"))
}

fn read_entries(bytes: &[u8]) -> Result<Vec<(String, Vec<u8>)>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| Error::DocxContainer(format!("not a valid DOCX container: {e}")))?;

    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| Error::DocxContainer(format!("failed to read entry {i}: {e}")))?;
        if file.is_dir() {
            continue;
        }
        let name = file.name().to_string();
        let mut data = Vec::with_capacity(usize::try_from(file.size()).unwrap_or(0));
        file.read_to_end(&mut data)?;
        entries.push((name, data));
    }

    Ok(entries)
}

fn xml_error(part: &str, e: &quick_xml::Error) -> Error {
    Error::DocxXml {
        part: part.to_string(),
        reason: e.to_string(),
    }
}

/// Pass 1: collect the concatenated `w:t` text of every `w:p`, in order.
/// Paragraphs inside tables and nested structures appear here too since
/// `w:p` elements do not nest.
fn collect_paragraphs(xml: &str, part: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut in_paragraph = false;
    let mut in_text = false;
    let mut current = String::new();

    loop {
        match reader.read_event().map_err(|e| xml_error(part, &e))? {
            Event::Start(e) => match e.name().as_ref() {
                b"w:p" => {
                    in_paragraph = true;
                    current.clear();
                }
                b"w:t" if in_paragraph => in_text = true,
                _ => {}
            },
            Event::End(e) => match e.name().as_ref() {
                b"w:p" => {
                    paragraphs.push(std::mem::take(&mut current));
                    in_paragraph = false;
                }
                b"w:t" => in_text = false,
                _ => {}
            },
            Event::Text(t) => {
                if in_text {
                    current.push_str(&t.unescape().map_err(|e| xml_error(part, &e))?);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}

/// Pass 2: re-emit the part with translated paragraphs rewritten. The first
/// `w:t` of a translated paragraph carries the full translation; subsequent
/// `w:t` elements are emptied so no stale source text remains.
fn rewrite_part(xml: &str, part: &str, translations: &[Option<String>]) -> Result<Vec<u8>> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));

    let mut para_idx = 0usize;
    let mut replacing: Option<&str> = None;
    let mut first_pending = false;
    let mut skip_text = false;

    loop {
        let event = reader.read_event().map_err(|e| xml_error(part, &e))?;
        match event {
            Event::Start(ref e) if e.name().as_ref() == b"w:p" => {
                replacing = translations
                    .get(para_idx)
                    .and_then(|t| t.as_deref());
                first_pending = replacing.is_some();
                writer
                    .write_event(event.borrow())
                    .map_err(|e| Error::DocxXml {
                        part: part.to_string(),
                        reason: e.to_string(),
                    })?;
            }
            Event::End(ref e) if e.name().as_ref() == b"w:p" => {
                para_idx += 1;
                replacing = None;
                write_through(&mut writer, event.borrow(), part)?;
            }
            Event::Start(ref e) if e.name().as_ref() == b"w:t" => {
                if let Some(translated) = replacing {
                    skip_text = true;
                    if first_pending {
                        first_pending = false;
                        write_through(
                            &mut writer,
                            Event::Start(with_space_preserve(e)),
                            part,
                        )?;
                        write_through(
                            &mut writer,
                            Event::Text(BytesText::new(translated)),
                            part,
                        )?;
                    } else {
                        write_through(&mut writer, event.borrow(), part)?;
                    }
                } else {
                    write_through(&mut writer, event.borrow(), part)?;
                }
            }
            Event::Empty(ref e) if e.name().as_ref() == b"w:t" => {
                if let Some(translated) = replacing
                    && first_pending
                {
                    first_pending = false;
                    write_through(&mut writer, Event::Start(with_space_preserve(e)), part)?;
                    write_through(&mut writer, Event::Text(BytesText::new(translated)), part)?;
                    write_through(&mut writer, Event::End(BytesEnd::new("w:t")), part)?;
                } else {
                    write_through(&mut writer, event.borrow(), part)?;
                }
            }
            Event::End(ref e) if e.name().as_ref() == b"w:t" => {
                skip_text = false;
                write_through(&mut writer, event.borrow(), part)?;
            }
            Event::Text(_) if skip_text => {}
            Event::Eof => break,
            other => write_through(&mut writer, other, part)?,
        }
    }

    Ok(writer.into_inner())
}

fn write_through(writer: &mut Writer<Vec<u8>>, event: Event<'_>, part: &str) -> Result<()> {
    writer.write_event(event).map_err(|e| Error::DocxXml {
        part: part.to_string(),
        reason: e.to_string(),
    })
}

/// Clone a `w:t` start tag, ensuring `xml:space="preserve"` so leading and
/// trailing whitespace in the translation survives.
fn with_space_preserve(e: &BytesStart<'_>) -> BytesStart<'static> {
    let mut elem = e.to_owned();
    let has_space_attr = e
        .attributes()
        .flatten()
        .any(|a| a.key.as_ref() == b"xml:space");
    if !has_space_attr {
        elem.push_attribute(("xml:space", "preserve"));
    }
    elem
}

/// Rewriting must never lose embedded media; a count mismatch means the
/// container round-trip went wrong.
fn verify_media_preserved(input_entries: &[(String, Vec<u8>)], output: &[u8]) {
    let input_media = input_entries
        .iter()
        .filter(|(name, _)| name.starts_with("word/media/"))
        .count();
    if input_media == 0 {
        return;
    }

    let output_media = ZipArchive::new(Cursor::new(output))
        .map(|mut archive| {
            (0..archive.len())
                .filter(|&i| {
                    archive
                        .by_index(i)
                        .is_ok_and(|f| f.name().starts_with("word/media/"))
                })
                .count()
        })
        .unwrap_or(0);

    if input_media != output_media {
        warn!(
            "Media count changed during rewrite: {} before, {} after",
            input_media, output_media
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const DOC_XML: &str = concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
        r#"<w:body>"#,
        r#"<w:p><w:r><w:t>Hello </w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:t>world</w:t></w:r></w:p>"#,
        r#"<w:p><w:r><w:t>support@example.com</w:t></w:r></w:p>"#,
        r#"<w:tbl><w:tr><w:tc><w:p><w:r><w:t>Cell text</w:t></w:r></w:p></w:tc></w:tr></w:tbl>"#,
        r#"</w:body></w:document>"#,
    );

    #[test]
    fn test_collect_paragraphs_spanning_runs_and_tables() {
        let paragraphs = collect_paragraphs(DOC_XML, "word/document.xml").unwrap();
        assert_eq!(
            paragraphs,
            vec!["Hello world", "support@example.com", "Cell text"]
        );
    }

    #[test]
    fn test_rewrite_first_run_gets_translation_rest_blanked() {
        let translations = vec![Some("Hola mundo".to_string()), None, None];
        let out = rewrite_part(DOC_XML, "word/document.xml", &translations).unwrap();
        let out = String::from_utf8(out).unwrap();

        assert!(out.contains(r#"<w:t xml:space="preserve">Hola mundo</w:t>"#));
        // Second run keeps its formatting but loses its text
        assert!(out.contains("<w:rPr><w:b/></w:rPr><w:t></w:t>"));
        assert!(!out.contains("Hello"));
        assert!(!out.contains(">world<"));
        // Untranslated paragraphs pass through
        assert!(out.contains("support@example.com"));
        assert!(out.contains("Cell text"));
    }

    #[test]
    fn test_rewrite_preserves_structure_when_nothing_translated() {
        let translations = vec![None, None, None];
        let out = rewrite_part(DOC_XML, "word/document.xml", &translations).unwrap();
        let out = String::from_utf8(out).unwrap();
        let reparsed = collect_paragraphs(&out, "word/document.xml").unwrap();
        assert_eq!(
            reparsed,
            vec!["Hello world", "support@example.com", "Cell text"]
        );
    }

    #[test]
    fn test_rewrite_escapes_markup_in_translation() {
        let translations = vec![Some("a < b & c".to_string()), None, None];
        let out = rewrite_part(DOC_XML, "word/document.xml", &translations).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("a &lt; b &amp; c"));

        let reparsed = collect_paragraphs(&out, "word/document.xml").unwrap();
        assert_eq!(reparsed[0], "a < b & c");
    }

    #[test]
    fn test_translatable_part_names() {
        assert!(is_translatable_part("word/document.xml"));
        assert!(is_translatable_part("word/header1.xml"));
        assert!(is_translatable_part("word/footer2.xml"));
        assert!(!is_translatable_part("word/styles.xml"));
        assert!(!is_translatable_part("word/media/image1.png"));
        assert!(!is_translatable_part("[Content_Types].xml"));
    }

    #[test]
    fn test_empty_first_wt_receives_translation() {
        let xml = concat!(
            r#"<w:document xmlns:w="http://x"><w:body>"#,
            r#"<w:p><w:r><w:t/></w:r><w:r><w:t>Actual text here.</w:t></w:r></w:p>"#,
            r#"</w:body></w:document>"#,
        );
        let translations = vec![Some("Texto real.".to_string())];
        let out = rewrite_part(xml, "word/document.xml", &translations).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains(r#"<w:t xml:space="preserve">Texto real.</w:t>"#));
        assert!(!out.contains("Actual text here."));
    }
}
