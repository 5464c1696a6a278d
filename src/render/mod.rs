//! Draft markdown to `.docx`.
//!
//! `render` never fails: malformed markdown degrades to raw lines, a
//! packaging failure degrades to a plain-text document of the same lines,
//! then to an empty document, and finally to the bundled [`BLANK_DOCX`].

pub mod blocks;
pub mod docx;
pub mod styles;

use chrono::{DateTime, Utc};
use thiserror::Error;

use self::blocks::{Block, BlockKind, Inline};
use self::docx::{Alignment, DocParagraph};
use self::styles::{ParagraphStyle, LIST_INDENT};

pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Minimal valid document: one empty body with the standard page setup.
pub const BLANK_DOCX: &[u8] = include_bytes!("blank.docx");

type PackageAttempt<'a> = (&'a str, &'a dyn Fn() -> Result<Vec<u8>, RenderError>);

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("xml write failed: {0}")]
    Xml(String),
    #[error("zip write failed: {0}")]
    Zip(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

fn letterhead_paragraph(letterhead: Option<&str>) -> Option<DocParagraph> {
    let text = letterhead.map(str::trim).filter(|t| !t.is_empty())?;
    let mut paragraph = DocParagraph::new(ParagraphStyle::Body, vec![Inline::plain(text)]);
    paragraph.alignment = Alignment::Center;
    paragraph.bold = true;
    Some(paragraph)
}

fn paragraph_for_block(block: Block) -> DocParagraph {
    let style = ParagraphStyle::for_block(&block.kind);
    match block.kind {
        BlockKind::ListItem { depth, marker } => {
            let mut inlines = Vec::with_capacity(block.inlines.len() + 1);
            if let Some(marker) = marker {
                inlines.push(Inline::plain(format!("{marker} ")));
            }
            inlines.extend(block.inlines);

            let mut paragraph = DocParagraph::new(style, inlines);
            if depth > 0 {
                paragraph.indent = Some(LIST_INDENT * (depth as u32 + 1));
            }
            paragraph
        }
        BlockKind::Quote => {
            let mut paragraph = DocParagraph::new(style, block.inlines);
            paragraph.italic = true;
            paragraph
        }
        BlockKind::Heading(_) | BlockKind::Paragraph => DocParagraph::new(style, block.inlines),
    }
}

/// Styled paragraphs for `markdown`, letterhead first.
pub fn build_paragraphs(markdown: &str, letterhead: Option<&str>) -> Vec<DocParagraph> {
    letterhead_paragraph(letterhead)
        .into_iter()
        .chain(blocks::blocks_or_raw_lines(markdown).into_iter().map(paragraph_for_block))
        .collect()
}

fn plain_paragraphs(markdown: &str, letterhead: Option<&str>) -> Vec<DocParagraph> {
    letterhead_paragraph(letterhead)
        .into_iter()
        .chain(
            markdown
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(|line| DocParagraph::new(ParagraphStyle::Body, vec![Inline::plain(line)])),
        )
        .collect()
}

/// Bytes of the first attempt that packages, else [`BLANK_DOCX`].
fn first_packaged(attempts: &[PackageAttempt<'_>]) -> Vec<u8> {
    for (label, attempt) in attempts {
        match attempt() {
            Ok(bytes) => return bytes,
            Err(e) => log::warn!("{} docx packaging failed: {}", label, e),
        }
    }
    log::error!("every docx packaging attempt failed; returning the blank document");
    BLANK_DOCX.to_vec()
}

/// Render with an explicit document timestamp.
pub fn render_at(markdown: &str, letterhead: Option<&str>, created: DateTime<Utc>) -> Vec<u8> {
    let paragraphs = build_paragraphs(markdown, letterhead);
    log::debug!("rendering {} paragraph(s) to docx", paragraphs.len());

    let styled = || docx::package(&paragraphs, created);
    let plain = || docx::package(&plain_paragraphs(markdown, letterhead), created);
    let empty = || docx::package(&[], created);
    let attempts: [PackageAttempt<'_>; 3] =
        [("styled", &styled), ("plain", &plain), ("empty", &empty)];
    first_packaged(&attempts)
}

/// Render draft markdown into a `.docx` buffer.
pub fn render(markdown: &str, letterhead: Option<&str>) -> Vec<u8> {
    render_at(markdown, letterhead, Utc::now())
}
