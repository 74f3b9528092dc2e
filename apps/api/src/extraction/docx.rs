//! DOCX text extraction: body paragraphs of `word/document.xml`, newline-joined.
//!
//! Only paragraphs that sit directly under `w:body` count. Table cells, headers,
//! footers and text boxes are skipped. Empty paragraphs are kept as empty lines.

use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader;
use zip::result::ZipError;
use zip::ZipArchive;

use super::ExtractError;

const DOCUMENT_PART: &str = "word/document.xml";

/// Elements a run may be nested in while still belonging to its paragraph.
const RUN_WRAPPERS: &[&[u8]] = &[b"hyperlink", b"ins", b"smartTag", b"fldSimple"];

pub fn extract_docx_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let mut xml = String::new();
    match archive.by_name(DOCUMENT_PART) {
        Ok(mut part) => {
            part.read_to_string(&mut xml)?;
        }
        Err(ZipError::FileNotFound) => return Err(ExtractError::MissingPart(DOCUMENT_PART)),
        Err(e) => return Err(e.into()),
    }

    Ok(body_paragraphs(&xml)?.join("\n"))
}

fn body_paragraphs(xml: &str) -> Result<Vec<String>, ExtractError> {
    let mut reader = Reader::from_str(xml);

    // Local names of the currently open elements.
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut paragraphs = Vec::new();
    let mut current: Option<String> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.local_name().as_ref().to_vec();
                if name == b"p" && parent_is(&stack, b"body") {
                    current = Some(String::new());
                }
                stack.push(name);
            }
            Event::End(_) => {
                if let Some(name) = stack.pop() {
                    if name == b"p" && parent_is(&stack, b"body") {
                        paragraphs.extend(current.take());
                    }
                }
            }
            Event::Empty(e) => match e.local_name().as_ref() {
                b"p" if parent_is(&stack, b"body") => paragraphs.push(String::new()),
                b"tab" if in_body_run(&stack) => push_char(&mut current, '\t'),
                b"br" | b"cr" if in_body_run(&stack) => push_char(&mut current, '\n'),
                _ => {}
            },
            Event::Text(t) => {
                if let Some((last, parents)) = stack.split_last() {
                    if last.as_slice() == b"t" && in_body_run(parents) {
                        if let Some(text) = current.as_mut() {
                            text.push_str(&t.unescape()?);
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}

fn parent_is(stack: &[Vec<u8>], name: &[u8]) -> bool {
    stack.last().is_some_and(|n| n.as_slice() == name)
}

/// True when the innermost open element is a run of a top-level body paragraph.
fn in_body_run(stack: &[Vec<u8>]) -> bool {
    match stack {
        [_, body, p, wrappers @ .., r] => {
            body.as_slice() == b"body"
                && p.as_slice() == b"p"
                && r.as_slice() == b"r"
                && wrappers
                    .iter()
                    .all(|w| RUN_WRAPPERS.contains(&w.as_slice()))
        }
        _ => false,
    }
}

fn push_char(current: &mut Option<String>, c: char) {
    if let Some(text) = current.as_mut() {
        text.push(c);
    }
}
