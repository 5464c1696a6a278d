//! WordprocessingML writer and package assembly.

use std::borrow::Cow;
use std::io::{Cursor, Write};

use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::blocks::Inline;
use super::styles::{self, ParagraphStyle};
use super::RenderError;

// ─── Namespaces ──────────────────────────────────────────────────────────────

pub const NS_W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
pub const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_CONTENT_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
const NS_PKG_RELS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const NS_CORE: &str = "http://schemas.openxmlformats.org/package/2006/metadata/core-properties";
const NS_APP: &str = "http://schemas.openxmlformats.org/officeDocument/2006/extended-properties";

const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const REL_CORE: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";
const REL_APP: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties";
const REL_STYLES: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";

const APPLICATION: &str = "demand-letter-server";

// ─── Page geometry (twips) ───────────────────────────────────────────────────

pub const PAGE_WIDTH: u32 = 12_240;
pub const PAGE_HEIGHT: u32 = 15_840;
pub const PAGE_MARGIN: u32 = 1_440;

/// Part names in the order they are written to the archive.
pub const PARTS: [&str; 7] = [
    "[Content_Types].xml",
    "_rels/.rels",
    "docProps/core.xml",
    "docProps/app.xml",
    "word/_rels/document.xml.rels",
    "word/styles.xml",
    "word/document.xml",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Center,
}

/// One output paragraph.
#[derive(Debug, Clone, PartialEq)]
pub struct DocParagraph {
    pub style: ParagraphStyle,
    pub alignment: Alignment,
    /// Left indent override for nested list items.
    pub indent: Option<u32>,
    /// Forces bold on every run (letterhead).
    pub bold: bool,
    /// Forces italic on every run (quotes).
    pub italic: bool,
    pub inlines: Vec<Inline>,
}

impl DocParagraph {
    pub fn new(style: ParagraphStyle, inlines: Vec<Inline>) -> Self {
        Self {
            style,
            alignment: Alignment::Left,
            indent: None,
            bold: false,
            italic: false,
            inlines,
        }
    }
}

/// Characters XML 1.0 allows in element content.
fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r')
        || ('\u{20}'..='\u{D7FF}').contains(&c)
        || ('\u{E000}'..='\u{FFFD}').contains(&c)
        || c >= '\u{10000}'
}

/// Drop characters XML 1.0 forbids; vertical tab and form feed become a space.
pub(crate) fn xml_safe(text: &str) -> Cow<'_, str> {
    if text.chars().all(is_xml_char) {
        return Cow::Borrowed(text);
    }
    Cow::Owned(
        text.chars()
            .filter_map(|c| match c {
                '\u{0B}' | '\u{0C}' => Some(' '),
                c if is_xml_char(c) => Some(c),
                _ => None,
            })
            .collect(),
    )
}

/// Thin wrapper over the quick-xml writer that maps failures to `RenderError`.
pub(crate) struct XmlOut {
    writer: Writer<Cursor<Vec<u8>>>,
}

impl XmlOut {
    pub fn new() -> Result<Self, RenderError> {
        let mut out = Self {
            writer: Writer::new(Cursor::new(Vec::new())),
        };
        out.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        Ok(out)
    }

    fn event(&mut self, event: Event<'_>) -> Result<(), RenderError> {
        self.writer
            .write_event(event)
            .map_err(|e| RenderError::Xml(e.to_string()))
    }

    fn start_tag<'a>(name: &'a str, attrs: &[(&'a str, &'a str)]) -> BytesStart<'a> {
        let mut start = BytesStart::new(name);
        for attr in attrs {
            start.push_attribute(*attr);
        }
        start
    }

    pub fn open(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), RenderError> {
        self.event(Event::Start(Self::start_tag(name, attrs)))
    }

    pub fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), RenderError> {
        self.event(Event::Empty(Self::start_tag(name, attrs)))
    }

    pub fn close(&mut self, name: &str) -> Result<(), RenderError> {
        self.event(Event::End(BytesEnd::new(name)))
    }

    pub fn text(&mut self, text: &str) -> Result<(), RenderError> {
        let text = xml_safe(text);
        self.event(Event::Text(BytesText::new(&text)))
    }

    /// `<name attrs>text</name>`
    pub fn leaf(&mut self, name: &str, attrs: &[(&str, &str)], text: &str) -> Result<(), RenderError> {
        self.open(name, attrs)?;
        self.text(text)?;
        self.close(name)
    }

    pub fn finish(self) -> Vec<u8> {
        self.writer.into_inner().into_inner()
    }
}

fn write_run(
    out: &mut XmlOut,
    text: &str,
    bold: bool,
    italic: bool,
) -> Result<(), RenderError> {
    out.open("w:r", &[])?;
    if bold || italic {
        out.open("w:rPr", &[])?;
        if bold {
            out.empty("w:b", &[])?;
        }
        if italic {
            out.empty("w:i", &[])?;
        }
        out.close("w:rPr")?;
    }
    for (i, segment) in text.split('\t').enumerate() {
        if i > 0 {
            out.empty("w:tab", &[])?;
        }
        if !segment.is_empty() {
            out.leaf("w:t", &[("xml:space", "preserve")], segment)?;
        }
    }
    out.close("w:r")
}

fn write_paragraph(out: &mut XmlOut, paragraph: &DocParagraph) -> Result<(), RenderError> {
    out.open("w:p", &[])?;

    out.open("w:pPr", &[])?;
    out.empty("w:pStyle", &[("w:val", paragraph.style.style_id())])?;
    if let Some(left) = paragraph.indent {
        let left = left.to_string();
        let hanging = styles::LIST_HANGING.to_string();
        out.empty("w:ind", &[("w:left", left.as_str()), ("w:hanging", hanging.as_str())])?;
    }
    if paragraph.alignment == Alignment::Center {
        out.empty("w:jc", &[("w:val", "center")])?;
    }
    out.close("w:pPr")?;

    for inline in &paragraph.inlines {
        match inline {
            Inline::Run { text, bold, italic } => write_run(
                out,
                text,
                *bold || paragraph.bold,
                *italic || paragraph.italic,
            )?,
            Inline::Break => {
                out.open("w:r", &[])?;
                out.empty("w:br", &[])?;
                out.close("w:r")?;
            }
        }
    }

    out.close("w:p")
}

/// `word/document.xml`: paragraphs followed by the single section definition.
pub fn document_xml(paragraphs: &[DocParagraph]) -> Result<Vec<u8>, RenderError> {
    let mut out = XmlOut::new()?;
    out.open("w:document", &[("xmlns:w", NS_W), ("xmlns:r", NS_R)])?;
    out.open("w:body", &[])?;

    for paragraph in paragraphs {
        write_paragraph(&mut out, paragraph)?;
    }

    let width = PAGE_WIDTH.to_string();
    let height = PAGE_HEIGHT.to_string();
    let margin = PAGE_MARGIN.to_string();
    out.open("w:sectPr", &[])?;
    out.empty("w:pgSz", &[("w:w", width.as_str()), ("w:h", height.as_str())])?;
    out.empty(
        "w:pgMar",
        &[
            ("w:top", margin.as_str()),
            ("w:right", margin.as_str()),
            ("w:bottom", margin.as_str()),
            ("w:left", margin.as_str()),
            ("w:header", "720"),
            ("w:footer", "720"),
            ("w:gutter", "0"),
        ],
    )?;
    out.close("w:sectPr")?;

    out.close("w:body")?;
    out.close("w:document")?;
    Ok(out.finish())
}

fn content_types_xml() -> Result<Vec<u8>, RenderError> {
    let mut out = XmlOut::new()?;
    out.open("Types", &[("xmlns", NS_CONTENT_TYPES)])?;
    out.empty(
        "Default",
        &[
            ("Extension", "rels"),
            ("ContentType", "application/vnd.openxmlformats-package.relationships+xml"),
        ],
    )?;
    out.empty("Default", &[("Extension", "xml"), ("ContentType", "application/xml")])?;

    let overrides = [
        (
            "/word/document.xml",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml",
        ),
        (
            "/word/styles.xml",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml",
        ),
        (
            "/docProps/core.xml",
            "application/vnd.openxmlformats-package.core-properties+xml",
        ),
        (
            "/docProps/app.xml",
            "application/vnd.openxmlformats-officedocument.extended-properties+xml",
        ),
    ];
    for (part, content_type) in overrides {
        out.empty("Override", &[("PartName", part), ("ContentType", content_type)])?;
    }

    out.close("Types")?;
    Ok(out.finish())
}

fn relationships_xml(rels: &[(&str, &str, &str)]) -> Result<Vec<u8>, RenderError> {
    let mut out = XmlOut::new()?;
    out.open("Relationships", &[("xmlns", NS_PKG_RELS)])?;
    for &(id, kind, target) in rels {
        out.empty("Relationship", &[("Id", id), ("Type", kind), ("Target", target)])?;
    }
    out.close("Relationships")?;
    Ok(out.finish())
}

/// `docProps/core.xml`. The only part that depends on the clock.
fn core_xml(created: DateTime<Utc>) -> Result<Vec<u8>, RenderError> {
    let stamp = created.to_rfc3339_opts(SecondsFormat::Secs, true);
    let mut out = XmlOut::new()?;
    out.open(
        "cp:coreProperties",
        &[
            ("xmlns:cp", NS_CORE),
            ("xmlns:dc", "http://purl.org/dc/elements/1.1/"),
            ("xmlns:dcterms", "http://purl.org/dc/terms/"),
            ("xmlns:dcmitype", "http://purl.org/dc/dcmitype/"),
            ("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"),
        ],
    )?;
    out.leaf("dc:title", &[], "Demand Letter")?;
    out.leaf("dc:creator", &[], APPLICATION)?;
    out.leaf("dcterms:created", &[("xsi:type", "dcterms:W3CDTF")], &stamp)?;
    out.leaf("dcterms:modified", &[("xsi:type", "dcterms:W3CDTF")], &stamp)?;
    out.close("cp:coreProperties")?;
    Ok(out.finish())
}

fn app_xml() -> Result<Vec<u8>, RenderError> {
    let mut out = XmlOut::new()?;
    out.open("Properties", &[("xmlns", NS_APP)])?;
    out.leaf("Application", &[], APPLICATION)?;
    out.close("Properties")?;
    Ok(out.finish())
}

/// Zip every part into a `.docx` archive. Entry timestamps are fixed so the
/// archive only varies with `created`.
pub fn package(paragraphs: &[DocParagraph], created: DateTime<Utc>) -> Result<Vec<u8>, RenderError> {
    let parts: [(&str, Vec<u8>); 7] = [
        (PARTS[0], content_types_xml()?),
        (
            PARTS[1],
            relationships_xml(&[
                ("rId1", REL_OFFICE_DOCUMENT, "word/document.xml"),
                ("rId2", REL_CORE, "docProps/core.xml"),
                ("rId3", REL_APP, "docProps/app.xml"),
            ])?,
        ),
        (PARTS[2], core_xml(created)?),
        (PARTS[3], app_xml()?),
        (PARTS[4], relationships_xml(&[("rId1", REL_STYLES, "styles.xml")])?),
        (PARTS[5], styles::styles_xml()?),
        (PARTS[6], document_xml(paragraphs)?),
    ];

    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default());

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, bytes) in parts {
        zip.start_file(name, options.clone())
            .map_err(|e| RenderError::Zip(e.to_string()))?;
        zip.write_all(&bytes)?;
    }

    let cursor = zip.finish().map_err(|e| RenderError::Zip(e.to_string()))?;
    Ok(cursor.into_inner())
}
